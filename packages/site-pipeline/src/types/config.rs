//! Pipeline configuration.
//!
//! Built once by the caller and handed to `Pipeline::new`. No stage reads
//! the environment.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::security::AICredentials;

pub const DEFAULT_CONTENT_DIR: &str = "content/sites";
pub const DEFAULT_IMAGE_DIR: &str = "public/images";
pub const DEFAULT_IMAGE_URL_PREFIX: &str = "/images";
pub const DEFAULT_USER_AGENT: &str = "SiteContentBot/1.0 (+https://github.com/site-pipeline)";
pub const DEFAULT_MAX_PAGE_BYTES: u64 = 5 * 1024 * 1024;
pub const DEFAULT_MAX_IMAGE_BYTES: u64 = 10 * 1024 * 1024;
pub const DEFAULT_FALLBACK_MODELS: [&str; 3] = ["gpt-4o", "gpt-4-turbo", "gpt-4"];

/// Configuration for a pipeline instance.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Directory holding one `<slug>.json` artifact per site.
    pub content_dir: PathBuf,

    /// Public directory images are written under (`<image_dir>/<slug>/`).
    pub image_dir: PathBuf,

    /// Root-relative URL prefix that serves `image_dir`.
    pub image_url_prefix: String,

    /// Client signature sent with every request.
    pub user_agent: String,

    /// Deadline for fetching the source page.
    pub fetch_timeout: Duration,

    /// Deadline for each image download.
    pub image_timeout: Duration,

    /// Largest source page body accepted.
    pub max_page_bytes: u64,

    /// Largest image body accepted.
    pub max_image_bytes: u64,

    /// Maximum image downloads in flight.
    pub image_concurrency: usize,

    /// Rewriter settings. `None` disables the stage.
    pub rewriter: Option<RewriterConfig>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            content_dir: PathBuf::from(DEFAULT_CONTENT_DIR),
            image_dir: PathBuf::from(DEFAULT_IMAGE_DIR),
            image_url_prefix: DEFAULT_IMAGE_URL_PREFIX.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            fetch_timeout: Duration::from_secs(15),
            image_timeout: Duration::from_secs(20),
            max_page_bytes: DEFAULT_MAX_PAGE_BYTES,
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
            image_concurrency: 4,
            rewriter: None,
        }
    }
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_content_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.content_dir = dir.into();
        self
    }

    pub fn with_image_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.image_dir = dir.into();
        self
    }

    pub fn with_image_url_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.image_url_prefix = prefix.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn with_image_timeout(mut self, timeout: Duration) -> Self {
        self.image_timeout = timeout;
        self
    }

    pub fn with_max_page_bytes(mut self, limit: u64) -> Self {
        self.max_page_bytes = limit;
        self
    }

    pub fn with_max_image_bytes(mut self, limit: u64) -> Self {
        self.max_image_bytes = limit;
        self
    }

    /// Set the download limit. Zero is treated as one.
    pub fn with_image_concurrency(mut self, limit: usize) -> Self {
        self.image_concurrency = limit.max(1);
        self
    }

    pub fn with_rewriter(mut self, rewriter: RewriterConfig) -> Self {
        self.rewriter = Some(rewriter);
        self
    }

    /// Whether a rewriter credential is configured.
    pub fn rewriter_enabled(&self) -> bool {
        self.rewriter
            .as_ref()
            .is_some_and(|r| !r.credentials.api_key.is_blank())
    }

    pub fn content_dir(&self) -> &Path {
        &self.content_dir
    }

    pub fn image_dir(&self) -> &Path {
        &self.image_dir
    }
}

/// Settings for the optional rewrite stage.
#[derive(Debug, Clone)]
pub struct RewriterConfig {
    pub credentials: AICredentials,

    /// Models tried in order after `credentials.model`.
    pub fallback_models: Vec<String>,

    /// Deadline for each model call.
    pub timeout: Duration,
}

impl RewriterConfig {
    pub fn new(credentials: AICredentials) -> Self {
        Self {
            credentials,
            fallback_models: DEFAULT_FALLBACK_MODELS.iter().map(|m| m.to_string()).collect(),
            timeout: Duration::from_secs(60),
        }
    }

    pub fn with_fallback_models(
        mut self,
        models: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.fallback_models = models.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Configured model first, then fallbacks, without duplicates.
    pub fn model_chain(&self) -> Vec<String> {
        let mut chain = vec![self.credentials.model.clone()];
        for model in &self.fallback_models {
            if !chain.contains(model) {
                chain.push(model.clone());
            }
        }
        chain.retain(|m| !m.trim().is_empty());
        chain
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.content_dir(), Path::new("content/sites"));
        assert_eq!(config.image_url_prefix, "/images");
        assert_eq!(config.fetch_timeout, Duration::from_secs(15));
        assert_eq!(config.max_page_bytes, 5 * 1024 * 1024);
        assert_eq!(config.max_image_bytes, 10 * 1024 * 1024);
        assert!(!config.rewriter_enabled());
    }

    #[test]
    fn test_builder() {
        let config = PipelineConfig::new()
            .with_content_dir("/tmp/content")
            .with_image_url_prefix("/media/")
            .with_image_concurrency(0);

        assert_eq!(config.content_dir(), Path::new("/tmp/content"));
        assert_eq!(config.image_url_prefix, "/media");
        assert_eq!(config.image_concurrency, 1);
    }

    #[test]
    fn test_blank_key_disables_rewriter() {
        let config = PipelineConfig::new()
            .with_rewriter(RewriterConfig::new(AICredentials::new("  ", "gpt-4o")));
        assert!(!config.rewriter_enabled());

        let config = PipelineConfig::new()
            .with_rewriter(RewriterConfig::new(AICredentials::new("sk-test", "gpt-4o")));
        assert!(config.rewriter_enabled());
    }

    #[test]
    fn test_model_chain_dedupes() {
        let rewriter = RewriterConfig::new(AICredentials::new("sk-test", "gpt-4-turbo"));
        assert_eq!(rewriter.model_chain(), vec!["gpt-4-turbo", "gpt-4o", "gpt-4"]);
    }

    #[test]
    fn test_debug_redacts_key() {
        let config = PipelineConfig::new()
            .with_rewriter(RewriterConfig::new(AICredentials::new("sk-live-xyz", "gpt-4o")));
        assert!(!format!("{:?}", config).contains("sk-live-xyz"));
    }
}
