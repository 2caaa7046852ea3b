use anyhow::{Context, Result};
use dotenvy::dotenv;
use site_pipeline::types::config::{
    DEFAULT_CONTENT_DIR, DEFAULT_IMAGE_DIR, DEFAULT_IMAGE_URL_PREFIX,
};
use site_pipeline::{AICredentials, PipelineConfig, RewriterConfig, SecretString};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_OPENAI_MODEL: &str = "gpt-4o";

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub content_dir: PathBuf,
    pub image_dir: PathBuf,
    pub image_url_prefix: String,
    pub openai_api_key: Option<SecretString>,
    pub openai_model: String,
    pub openai_base_url: Option<String>,
    pub fetch_timeout: Option<Duration>,
    pub image_concurrency: Option<usize>,
    pub max_page_bytes: Option<u64>,
    pub max_image_bytes: Option<u64>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Ok(Self {
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("PORT must be a valid number")?,
            content_dir: env::var("CONTENT_DIR")
                .unwrap_or_else(|_| DEFAULT_CONTENT_DIR.to_string())
                .into(),
            image_dir: env::var("IMAGE_DIR")
                .unwrap_or_else(|_| DEFAULT_IMAGE_DIR.to_string())
                .into(),
            image_url_prefix: env::var("IMAGE_URL_PREFIX")
                .unwrap_or_else(|_| DEFAULT_IMAGE_URL_PREFIX.to_string()),
            openai_api_key: non_empty("OPENAI_API_KEY").map(SecretString::from),
            openai_model: non_empty("OPENAI_MODEL")
                .unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
            openai_base_url: non_empty("OPENAI_BASE_URL"),
            fetch_timeout: non_empty("FETCH_TIMEOUT_SECS")
                .map(|v| v.parse().context("FETCH_TIMEOUT_SECS must be a whole number of seconds"))
                .transpose()?
                .map(Duration::from_secs),
            image_concurrency: non_empty("IMAGE_CONCURRENCY")
                .map(|v| v.parse().context("IMAGE_CONCURRENCY must be a valid number"))
                .transpose()?,
            max_page_bytes: non_empty("MAX_PAGE_BYTES")
                .map(|v| v.parse().context("MAX_PAGE_BYTES must be a whole number of bytes"))
                .transpose()?,
            max_image_bytes: non_empty("MAX_IMAGE_BYTES")
                .map(|v| v.parse().context("MAX_IMAGE_BYTES must be a whole number of bytes"))
                .transpose()?,
        })
    }

    /// Settings for the pipeline. No API key means the rewrite stage is off.
    pub fn pipeline_config(&self) -> PipelineConfig {
        let mut config = PipelineConfig::new()
            .with_content_dir(self.content_dir.clone())
            .with_image_dir(self.image_dir.clone())
            .with_image_url_prefix(self.image_url_prefix.clone());

        if let Some(timeout) = self.fetch_timeout {
            config = config.with_fetch_timeout(timeout);
        }
        if let Some(limit) = self.image_concurrency {
            config = config.with_image_concurrency(limit);
        }
        if let Some(limit) = self.max_page_bytes {
            config = config.with_max_page_bytes(limit);
        }
        if let Some(limit) = self.max_image_bytes {
            config = config.with_max_image_bytes(limit);
        }
        if let Some(key) = &self.openai_api_key {
            let mut credentials = AICredentials::new(key.expose(), self.openai_model.clone());
            if let Some(base_url) = &self.openai_base_url {
                credentials = credentials.with_base_url(base_url.clone());
            }
            config = config.with_rewriter(RewriterConfig::new(credentials));
        }

        config
    }
}

fn non_empty(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}
