//! Canonical result schema for the dataset analysis pipeline
//!
//! Mirrors the consumer-facing JSON contract: every model evaluated by the
//! analysis program produces one `ModelResult` with an overall accuracy and
//! a per-label classification report.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Placeholder used when a raw result entry carries no model name
pub const DEFAULT_MODEL_NAME: &str = "Unknown Model";

/// Per-label (or aggregate) classification metrics
///
/// `f1_score` serializes as `"f1-score"` to match the consumer contract.
/// Values are documented to lie in [0,1] (support is a sample count) but
/// are passed through unvalidated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassificationMetrics {
    pub precision: f64,
    pub recall: f64,
    #[serde(rename = "f1-score")]
    pub f1_score: f64,
    pub support: u64,
}

/// Mapping from label key (class index as string, `macro avg`, or
/// `weighted avg`) to its metrics block
pub type ClassificationReport = BTreeMap<String, ClassificationMetrics>;

/// Normalized result for one evaluated model
///
/// Immutable once constructed; a pipeline run yields these in the order
/// the analysis program emitted them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelResult {
    pub model: String,
    pub accuracy: f64,
    pub classification_report: ClassificationReport,
}

/// Canonical minimum label set consumers assume when a report must be
/// synthesized from nothing
pub const DEFAULT_REPORT_LABELS: [&str; 5] = ["0", "1", "2", "macro avg", "weighted avg"];

/// Build the zero-valued default report used when a raw result carries no
/// `classification_report` at all
pub fn default_report() -> ClassificationReport {
    DEFAULT_REPORT_LABELS
        .iter()
        .map(|label| (label.to_string(), ClassificationMetrics::default()))
        .collect()
}
