// Main entry point for API server

use anyhow::{Context, Result};
use server_core::{server::build_app, Config};
use site_pipeline::Pipeline;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,site_pipeline=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting site generator API");

    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;
    let pipeline = Pipeline::new(config.pipeline_config());
    tracing::info!(
        content_dir = %config.content_dir.display(),
        image_dir = %config.image_dir.display(),
        rewriter = pipeline.rewriter_enabled(),
        "Configuration loaded"
    );

    // Build application
    let app = build_app(pipeline);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("Starting server on {}", addr);
    tracing::info!("Health check: http://localhost:{}/health", config.port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
