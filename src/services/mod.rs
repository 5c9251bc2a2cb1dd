//! Pipeline components: receive, invoke, extract, normalize
//!
//! One request flows through these strictly in sequence; the only shared
//! state between requests is the staging directory, which tolerates
//! concurrent writers through collision-resistant names.

pub mod extractor;
pub mod invoker;
pub mod normalizer;
pub mod receiver;

pub use extractor::{extract_payload, ExtractError};
pub use invoker::{ExitOutcome, InvokeError, PipelineInvocation, PipelineInvoker};
pub use normalizer::normalize;
pub use receiver::{ArtifactReceiver, MediaType, ReceiveError, UploadedArtifact, MAX_ARTIFACT_BYTES};
