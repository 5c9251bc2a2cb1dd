//! mlingest - Dataset Ingest Microservice
//!
//! Accepts an uploaded tabular dataset, runs the external analysis program
//! against it, and returns normalized per-model classification metrics.

use anyhow::Result;
use tracing::info;

use mlingest::config::Config;
use mlingest::{build_router, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("Starting mlingest (Dataset Ingest) v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::load()?;

    // Staging directory must exist before the first upload arrives.
    tokio::fs::create_dir_all(&config.staging.dir).await?;
    info!(staging_dir = %config.staging.dir.display(), "Staging directory ready");
    info!(
        program = %config.pipeline.program.display(),
        target_column = %config.pipeline.target_column,
        top_features = config.pipeline.top_features,
        "Analysis pipeline configured"
    );

    let addr = config.bind_addr();
    let state = AppState::new(config);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
