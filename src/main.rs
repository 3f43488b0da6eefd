//! complaint-triage - HTTP server entry point

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

use complaint_triage::core::ServerConfig;
use complaint_triage::pipelines::sentiment_analysis_pipeline::SentimentAnalysisPipelineBuilder;
use complaint_triage::{build_router, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let config = ServerConfig::parse();
    info!("Starting complaint-triage v{}", env!("CARGO_PKG_VERSION"));

    // Weights are loaded once; a load failure stops startup.
    let pipeline = SentimentAnalysisPipelineBuilder::complaint_bert(config.model_options())
        .device_request(config.device_request())
        .batch_size(config.batch_size)
        .build()
        .await?;
    info!(
        model = %config.model_id,
        device = ?pipeline.device().location(),
        batch_size = pipeline.batch_size(),
        "Classifier loaded"
    );

    let state = AppState::new(Arc::new(pipeline))
        .with_static_dir(config.static_dir.clone())
        .with_max_upload_bytes(config.max_upload_bytes);
    let app = build_router(state);

    let addr = config.bind_addr();
    let listener = TcpListener::bind(&addr).await?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    info!("Shutdown signal received");
}
