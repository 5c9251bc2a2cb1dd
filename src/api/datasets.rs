//! Dataset API handlers
//!
//! `POST /datasets/uploads` runs the full ingestion pipeline: stage the
//! uploaded artifact, invoke the analysis program against it, extract the
//! result payload from its stdout, normalize, and emit the response
//! envelope. `GET /datasets` is a listing stub kept for interface parity;
//! artifact retention is out of scope.

use axum::{
    extract::{Multipart, State},
    middleware,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::api::auth::require_bearer_token;
use crate::error::{ApiError, ApiResult};
use crate::models::ModelResult;
use crate::services::{
    extract_payload, normalize, ArtifactReceiver, ExtractError, PipelineInvocation,
    PipelineInvoker,
};
use crate::AppState;

/// Multipart field the artifact must arrive under
pub const UPLOAD_FIELD: &str = "file";

/// Success envelope for a processed upload
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub message: String,
    /// Original filename as declared by the uploader
    pub filename: String,
    /// Staged artifact path
    pub path: String,
    /// Normalized per-model results, in program order
    pub results: Vec<ModelResult>,
}

/// GET /datasets response (always empty; retention is a non-goal)
#[derive(Debug, Serialize)]
pub struct DatasetListResponse {
    pub datasets: Vec<String>,
}

/// POST /datasets/uploads
///
/// Strictly sequential per request: Receiver, Invoker, Extractor,
/// Normalizer, Emitter. Any failure is terminal and yields the error
/// envelope; nothing is retried.
pub async fn upload_dataset(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<UploadResponse>> {
    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("invalid multipart body: {e}")))?
    {
        if field.name() == Some(UPLOAD_FIELD) {
            let filename = field.file_name().unwrap_or("dataset.csv").to_string();
            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::BadRequest(format!("failed to read upload: {e}")))?;
            upload = Some((filename, content_type, bytes));
            break;
        }
    }
    let (filename, content_type, bytes) = upload.ok_or(ApiError::MissingFile)?;

    let receiver = ArtifactReceiver::new(&state.config.staging.dir);
    let artifact = receiver
        .receive(UPLOAD_FIELD, &filename, &content_type, &bytes)
        .await?;

    info!(
        filename = %artifact.original_filename,
        staged_path = %artifact.staged_path.display(),
        size = artifact.size,
        "Artifact accepted; invoking analysis program"
    );

    let invocation = run_invocation(&state, &artifact.staged_path).await?;

    if !invocation.exit.is_success() {
        warn!(exit = ?invocation.exit, "Analysis program failed");
        state
            .record_error(format!(
                "analysis program exited with {:?}: {}",
                invocation.exit, invocation.stderr
            ))
            .await;
        return Err(ApiError::ProcessingFailed {
            stderr: invocation.stderr,
        });
    }

    let raw_results = extract_payload(&invocation.stdout).map_err(|err| match err {
        ExtractError::NoPayloadFound => ApiError::NoPayloadFound {
            raw_output: invocation.stdout.clone(),
        },
        ExtractError::Malformed(parse_err) => ApiError::MalformedPayload {
            detail: parse_err.to_string(),
            raw_output: invocation.stdout.clone(),
        },
    })?;

    let results = normalize(raw_results);

    info!(
        model_count = results.len(),
        "Upload processed successfully"
    );

    Ok(Json(UploadResponse {
        message: "File uploaded and processed successfully".to_string(),
        filename: artifact.original_filename,
        path: artifact.staged_path.display().to_string(),
        results,
    }))
}

/// Invoke the analysis program, honoring the configured deadline if one is
/// set. Deadline expiry drops the invoke future, which kills the child.
async fn run_invocation(
    state: &AppState,
    artifact_path: &std::path::Path,
) -> ApiResult<PipelineInvocation> {
    let pipeline = &state.config.pipeline;
    let invoker = PipelineInvoker::new(&pipeline.program);
    let cancel = CancellationToken::new();

    let invoke = invoker.invoke(
        artifact_path,
        &pipeline.target_column,
        pipeline.top_features,
        &cancel,
    );

    match pipeline.timeout_seconds {
        Some(seconds) => {
            match tokio::time::timeout(Duration::from_secs(seconds), invoke).await {
                Ok(result) => Ok(result?),
                Err(_) => {
                    cancel.cancel();
                    warn!(seconds, "Analysis program exceeded deadline; killed");
                    state
                        .record_error(format!("analysis program exceeded {seconds}s deadline"))
                        .await;
                    Err(ApiError::ProcessingTimeout(seconds))
                }
            }
        }
        None => Ok(invoke.await?),
    }
}

/// GET /datasets
pub async fn list_datasets() -> Json<DatasetListResponse> {
    Json(DatasetListResponse {
        datasets: Vec::new(),
    })
}

/// Build dataset routes, gated by the bearer-token middleware
pub fn dataset_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/datasets/uploads", post(upload_dataset))
        .route("/datasets", get(list_datasets))
        .route_layer(middleware::from_fn_with_state(state, require_bearer_token))
}
