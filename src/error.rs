//! Error types for mlingest
//!
//! Every pipeline failure is terminal for its request and surfaces as one
//! `ApiError` kind; none are retried internally. The error envelope carries
//! the raw diagnostic text (stderr or raw stdout) where one exists, so an
//! operator can triage without server-side log access.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::services::{InvokeError, ReceiveError, MAX_ARTIFACT_BYTES};

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Bearer token missing or wrong (401)
    #[error("unauthorized request")]
    Unauthorized,

    /// Multipart body carried no `file` field (400)
    #[error("no file uploaded")]
    MissingFile,

    /// Malformed request (400)
    #[error("invalid request: {0}")]
    BadRequest(String),

    /// Declared media type is not CSV or JSON (400)
    #[error("unsupported media type: {0}")]
    InvalidMediaType(String),

    /// Artifact over the 10 MiB ceiling (413)
    #[error("artifact too large: {0} bytes")]
    ArtifactTooLarge(u64),

    /// Staging write failed (500)
    #[error("failed to stage artifact: {0}")]
    StagingWriteFailed(#[source] std::io::Error),

    /// Analysis program could not be started (500)
    #[error("failed to start analysis program: {0}")]
    SpawnFailed(String),

    /// Analysis program exited non-zero; carries its stderr (500)
    #[error("analysis program failed")]
    ProcessingFailed { stderr: String },

    /// Analysis program exceeded the configured deadline (504)
    #[error("analysis program exceeded {0}s deadline")]
    ProcessingTimeout(u64),

    /// No JSON payload in the program's stdout (500)
    #[error("no valid JSON object found in output")]
    NoPayloadFound { raw_output: String },

    /// Payload span did not parse (500)
    #[error("invalid JSON output: {detail}")]
    MalformedPayload { detail: String, raw_output: String },

    /// Anything else (500)
    #[error("internal server error: {0}")]
    Internal(String),
}

impl From<ReceiveError> for ApiError {
    fn from(err: ReceiveError) -> Self {
        match err {
            ReceiveError::InvalidMediaType(ct) => ApiError::InvalidMediaType(ct),
            ReceiveError::TooLarge(size) => ApiError::ArtifactTooLarge(size),
            ReceiveError::StagingWrite(io) => ApiError::StagingWriteFailed(io),
        }
    }
}

impl From<InvokeError> for ApiError {
    fn from(err: InvokeError) -> Self {
        match err {
            InvokeError::Spawn { .. } => ApiError::SpawnFailed(err.to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, error, raw_output) = match self {
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "Unauthorized",
                "missing or invalid bearer token".to_string(),
                None,
            ),
            ApiError::MissingFile => (
                StatusCode::BAD_REQUEST,
                "No file uploaded",
                "missing multipart field 'file'".to_string(),
                None,
            ),
            ApiError::BadRequest(detail) => {
                (StatusCode::BAD_REQUEST, "Invalid request", detail, None)
            }
            ApiError::InvalidMediaType(content_type) => (
                StatusCode::BAD_REQUEST,
                "Upload rejected",
                format!("unsupported media type: {content_type} (expected CSV or JSON)"),
                None,
            ),
            ApiError::ArtifactTooLarge(size) => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "Upload rejected",
                format!("artifact of {size} bytes exceeds the {MAX_ARTIFACT_BYTES} byte ceiling"),
                None,
            ),
            ApiError::StagingWriteFailed(ref io) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Upload failed",
                format!("failed to stage artifact: {io}"),
                None,
            ),
            ApiError::SpawnFailed(detail) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Processing failed",
                detail,
                None,
            ),
            ApiError::ProcessingFailed { stderr } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Processing failed",
                stderr,
                None,
            ),
            ApiError::ProcessingTimeout(seconds) => (
                StatusCode::GATEWAY_TIMEOUT,
                "Processing failed",
                format!("analysis program exceeded the {seconds}s deadline and was killed"),
                None,
            ),
            ApiError::NoPayloadFound { raw_output } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Processing failed: Invalid JSON output",
                "No valid JSON object found in output".to_string(),
                Some(raw_output),
            ),
            ApiError::MalformedPayload { detail, raw_output } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Processing failed: Invalid JSON output",
                detail,
                Some(raw_output),
            ),
            ApiError::Internal(detail) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error",
                detail,
                None,
            ),
        };

        let mut body = json!({
            "message": message,
            "error": error,
        });
        if let Some(raw) = raw_output {
            body["rawOutput"] = raw.into();
        }

        (status, Json(body)).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
