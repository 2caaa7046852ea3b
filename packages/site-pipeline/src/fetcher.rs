//! Network retrieval for source pages and images.
//!
//! The `Fetcher` trait is the seam between the pipeline and the network;
//! `HttpFetcher` is the production implementation and
//! `testing::MockFetcher` stands in for it in tests. No retries happen here.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE, USER_AGENT};
use tracing::{debug, warn};

use crate::error::{FetchError, FetchResult};
use crate::types::config::{DEFAULT_MAX_IMAGE_BYTES, DEFAULT_MAX_PAGE_BYTES};
use crate::types::PipelineConfig;

/// Retrieves raw documents over the network.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch a page and return its body as HTML text.
    async fn fetch_html(&self, url: &str) -> FetchResult<String>;

    /// Fetch a binary resource (an image).
    async fn fetch_bytes(&self, url: &str) -> FetchResult<Vec<u8>>;
}

/// Fetcher backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    user_agent: String,
    page_timeout: Duration,
    image_timeout: Duration,
    max_page_bytes: u64,
    max_image_bytes: u64,
}

impl HttpFetcher {
    pub fn new(user_agent: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            user_agent: user_agent.into(),
            page_timeout: Duration::from_secs(15),
            image_timeout: Duration::from_secs(20),
            max_page_bytes: DEFAULT_MAX_PAGE_BYTES,
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.user_agent.clone())
            .with_page_timeout(config.fetch_timeout)
            .with_image_timeout(config.image_timeout)
            .with_max_page_bytes(config.max_page_bytes)
            .with_max_image_bytes(config.max_image_bytes)
    }

    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    pub fn with_page_timeout(mut self, timeout: Duration) -> Self {
        self.page_timeout = timeout;
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

    async fn get(&self, url: &str, accept: &str, timeout: Duration) -> FetchResult<reqwest::Response> {
        debug!(url = %url, "HTTP fetch starting");

        let response = self
            .client
            .get(url)
            .header(USER_AGENT, &self.user_agent)
            .header(ACCEPT, accept)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| request_error(url, timeout, e))?;

        let status = response.status();
        if !status.is_success() {
            warn!(url = %url, status = %status, "HTTP fetch returned error status");
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
                text: status.canonical_reason().unwrap_or("unknown").to_string(),
            });
        }

        Ok(response)
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch_html(&self, url: &str) -> FetchResult<String> {
        let response = self
            .get(url, "text/html,application/xhtml+xml", self.page_timeout)
            .await?;

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        if let Some(ct) = content_type {
            if !is_html_content_type(&ct) {
                return Err(FetchError::NotHtml {
                    url: url.to_string(),
                    content_type: ct,
                });
            }
        }

        let body = read_limited(url, response, self.max_page_bytes, self.page_timeout).await?;
        let html = String::from_utf8_lossy(&body).into_owned();

        debug!(url = %url, bytes = html.len(), "HTTP fetch complete");
        Ok(html)
    }

    async fn fetch_bytes(&self, url: &str) -> FetchResult<Vec<u8>> {
        let response = self.get(url, "image/*,*/*;q=0.8", self.image_timeout).await?;

        read_limited(url, response, self.max_image_bytes, self.image_timeout).await
    }
}

/// Read the body chunk by chunk, giving up as soon as it passes `limit`.
async fn read_limited(
    url: &str,
    mut response: reqwest::Response,
    limit: u64,
    timeout: Duration,
) -> FetchResult<Vec<u8>> {
    if let Some(declared) = response.content_length() {
        ensure_within(url, declared, limit)?;
    }

    let mut body = Vec::new();
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| request_error(url, timeout, e))?
    {
        ensure_within(url, (body.len() + chunk.len()) as u64, limit)?;
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}

fn ensure_within(url: &str, len: u64, limit: u64) -> FetchResult<()> {
    if len > limit {
        warn!(url = %url, bytes = len, limit, "Response body over size limit");
        return Err(FetchError::TooLarge {
            url: url.to_string(),
            limit,
        });
    }
    Ok(())
}

fn request_error(url: &str, timeout: Duration, error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        warn!(url = %url, timeout = ?timeout, "HTTP request timed out");
        FetchError::Timeout {
            url: url.to_string(),
            timeout,
        }
    } else {
        warn!(url = %url, error = %error, "HTTP request failed");
        FetchError::Network {
            url: url.to_string(),
            message: error.to_string(),
        }
    }
}

/// Whether a `Content-Type` header value denotes an HTML document.
pub fn is_html_content_type(content_type: &str) -> bool {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    mime == "text/html" || mime == "application/xhtml+xml"
}
