//! HTTP API handlers for mlingest

pub mod auth;
pub mod datasets;
pub mod health;

pub use datasets::{dataset_routes, DatasetListResponse, UploadResponse, UPLOAD_FIELD};
pub use health::health_routes;
