//! Bearer-token gate for the dataset routes
//!
//! A pre-condition in front of the pipeline entry point; the pipeline
//! itself assumes requests were already authorized. When no token is
//! configured the gate is disabled, mirroring the shared-secret-zero
//! convention. Session handling and user identity are external concerns.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use tracing::warn;

use crate::error::ApiError;
use crate::AppState;

pub async fn require_bearer_token(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(expected) = state.config.auth.token.as_deref() else {
        return Ok(next.run(request).await);
    };

    let provided = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));

    match provided {
        Some(token) if token == expected => Ok(next.run(request).await),
        _ => {
            warn!(uri = %request.uri(), "Rejected unauthorized request");
            Err(ApiError::Unauthorized)
        }
    }
}
