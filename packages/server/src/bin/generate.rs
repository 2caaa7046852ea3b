//! Generate one site record from the command line.
//!
//! ```text
//! generate https://www.example-bistro.com --ai
//! ```
//!
//! Prints `{"slug": ..., "artifactPath": ...}` on success.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use server_core::Config;
use site_pipeline::Pipeline;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "generate")]
#[command(about = "Turn a restaurant website into a site content record")]
struct Cli {
    /// Absolute http(s) URL of the restaurant's current website
    url: String,

    /// Polish copy with the language model (needs OPENAI_API_KEY)
    #[arg(long)]
    ai: bool,

    /// Where to write <slug>.json (overrides CONTENT_DIR)
    #[arg(long)]
    content_dir: Option<PathBuf>,

    /// Where to download images (overrides IMAGE_DIR)
    #[arg(long)]
    image_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so stdout stays machine-readable.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,site_pipeline=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let mut config = Config::from_env().context("Failed to load configuration")?;
    if let Some(dir) = cli.content_dir {
        config.content_dir = dir;
    }
    if let Some(dir) = cli.image_dir {
        config.image_dir = dir;
    }

    let pipeline = Pipeline::new(config.pipeline_config());
    if cli.ai && !pipeline.rewriter_enabled() {
        tracing::warn!("--ai given but OPENAI_API_KEY is not set; copy will not be rewritten");
    }

    let output = pipeline
        .generate(&cli.url, cli.ai)
        .await
        .with_context(|| format!("Failed to generate site for {}", cli.url))?;

    println!(
        "{}",
        serde_json::to_string_pretty(&output).context("Failed to encode output")?
    );

    Ok(())
}
