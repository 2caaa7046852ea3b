//! The end-to-end `generate` run.
//!
//! Fetch → extract → normalize → (rewrite) → localize images → persist.
//! Only fetch, extract, normalize and persist can abort a run; rewrite and
//! image failures degrade to the unmodified record.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tracing::{info, instrument};
use url::Url;

use crate::error::{PipelineError, Result};
use crate::extract::extract;
use crate::fetcher::{Fetcher, HttpFetcher};
use crate::images::ImageLocalizer;
use crate::normalize::normalize;
use crate::persist::Persister;
use crate::rewrite::{ContentModel, Rewriter};
use crate::types::{PipelineConfig, Site};

/// What a successful run hands back to its trigger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateOutput {
    pub slug: String,
    pub artifact_path: PathBuf,
}

pub struct Pipeline {
    config: PipelineConfig,
    fetcher: Arc<dyn Fetcher>,
    rewriter: Rewriter,
    persister: Persister,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        let fetcher: Arc<dyn Fetcher> = Arc::new(HttpFetcher::from_config(&config));
        let rewriter = Rewriter::from_config(config.rewriter.as_ref());
        let persister = Persister::new(config.content_dir.clone());
        Self {
            config,
            fetcher,
            rewriter,
            persister,
        }
    }

    /// Swap the network layer (tests, proxies).
    pub fn with_fetcher(mut self, fetcher: Arc<dyn Fetcher>) -> Self {
        self.fetcher = fetcher;
        self
    }

    /// Swap the rewrite backend. Enables the rewrite stage.
    pub fn with_content_model(mut self, model: Arc<dyn ContentModel>) -> Self {
        let timeout = self
            .config
            .rewriter
            .as_ref()
            .map(|r| r.timeout)
            .unwrap_or(Duration::from_secs(60));
        self.rewriter = Rewriter::with_model(model, timeout);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Whether `use_ai` requests will actually be rewritten.
    pub fn rewriter_enabled(&self) -> bool {
        self.rewriter.is_enabled()
    }

    /// Run the whole pipeline for `url` and persist the result.
    #[instrument(skip(self), fields(slug))]
    pub async fn generate(&self, url: &str, use_ai: bool) -> Result<GenerateOutput> {
        let source = validate_url(url)?;

        let html = self.fetcher.fetch_html(source.as_str()).await?;
        let scraped = extract(&html, &source)?;
        let site = normalize(scraped, url.trim(), Utc::now())?;
        tracing::Span::current().record("slug", site.slug.as_str());

        let site = if use_ai {
            self.rewriter.rewrite(site).await
        } else {
            site
        };

        let localizer = ImageLocalizer::new(self.fetcher.clone(), &self.config);
        let (site, report) = localizer.localize(site).await;

        let artifact_path = self.persister.save(&site).await?;

        info!(
            slug = %site.slug,
            path = %artifact_path.display(),
            images_localized = report.localized,
            images_failed = report.failed,
            menu_items = site.menu_item_count(),
            "Site generated"
        );

        Ok(GenerateOutput {
            slug: site.slug,
            artifact_path,
        })
    }

    /// Read back a previously generated artifact.
    pub async fn load(&self, slug: &str) -> Result<Option<Site>> {
        Ok(self.persister.load(slug).await?)
    }
}

/// Accept only absolute http(s) URLs with a host.
pub fn validate_url(raw: &str) -> Result<Url> {
    let invalid = |reason: &str| PipelineError::InvalidUrl {
        url: raw.to_string(),
        reason: reason.to_string(),
    };

    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(invalid("URL is empty"));
    }

    let url = Url::parse(trimmed).map_err(|e| invalid(&e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid("only http and https URLs are supported"));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(invalid("URL has no host"));
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_url_accepts_http_and_https() {
        assert!(validate_url("https://example.com").is_ok());
        assert!(validate_url("  http://www.example.com/menu  ").is_ok());
    }

    #[test]
    fn test_validate_url_rejects_bad_input() {
        for raw in ["", "example.com", "ftp://example.com", "file:///etc/passwd", "mailto:a@b.c"] {
            let err = validate_url(raw).unwrap_err();
            assert!(err.is_client_error(), "{:?} gave {}", raw, err);
        }
    }

    #[test]
    fn test_generate_output_serializes_camel_case() {
        let out = GenerateOutput {
            slug: "example-com".into(),
            artifact_path: PathBuf::from("content/sites/example-com.json"),
        };
        let json = serde_json::to_value(&out).unwrap();
        assert_eq!(json["slug"], "example-com");
        assert_eq!(json["artifactPath"], "content/sites/example-com.json");
    }
}
