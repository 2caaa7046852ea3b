//! Testing utilities including mock implementations.
//!
//! Lets applications and tests drive the pipeline without network access or
//! model calls.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{FetchError, FetchResult, RewriteError};
use crate::fetcher::Fetcher;
use crate::rewrite::ContentModel;

/// Canned answer for one URL.
#[derive(Debug, Clone)]
pub enum MockResponse {
    Html(String),
    Bytes(Vec<u8>),
    /// Non-success HTTP status.
    Status(u16),
    /// Success, but with this non-HTML content type.
    NotHtml(String),
    /// Request never completes (DNS, TLS, reset).
    Network(String),
}

/// A `Fetcher` that serves canned responses by URL.
///
/// Unknown URLs answer 404.
#[derive(Debug, Clone, Default)]
pub struct MockFetcher {
    responses: Arc<RwLock<HashMap<String, MockResponse>>>,
    delays: Arc<RwLock<HashMap<String, Duration>>>,
    calls: Arc<RwLock<Vec<String>>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response(self, url: impl Into<String>, response: MockResponse) -> Self {
        self.responses
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(url.into(), response);
        self
    }

    pub fn with_html(self, url: impl Into<String>, html: impl Into<String>) -> Self {
        self.with_response(url, MockResponse::Html(html.into()))
    }

    pub fn with_bytes(self, url: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.with_response(url, MockResponse::Bytes(bytes.into()))
    }

    pub fn with_status(self, url: impl Into<String>, status: u16) -> Self {
        self.with_response(url, MockResponse::Status(status))
    }

    /// Hold the response for `url` for `delay` before answering.
    pub fn with_delay(self, url: impl Into<String>, delay: Duration) -> Self {
        self.delays
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(url.into(), delay);
        self
    }

    /// URLs requested so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn call_count(&self, url: &str) -> usize {
        self.calls().iter().filter(|u| *u == url).count()
    }

    async fn respond(&self, url: &str) -> FetchResult<MockResponse> {
        self.calls
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(url.to_string());

        let delay = self
            .delays
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(url)
            .copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let response = self
            .responses
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(url)
            .cloned();

        match response {
            Some(MockResponse::Status(status)) => Err(mock_status(url, status)),
            None => Err(mock_status(url, 404)),
            Some(MockResponse::Network(message)) => Err(FetchError::Network {
                url: url.to_string(),
                message,
            }),
            Some(other) => Ok(other),
        }
    }
}

fn mock_status(url: &str, status: u16) -> FetchError {
    FetchError::Status {
        url: url.to_string(),
        status,
        text: "mock status".to_string(),
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    async fn fetch_html(&self, url: &str) -> FetchResult<String> {
        match self.respond(url).await? {
            MockResponse::Html(html) => Ok(html),
            MockResponse::NotHtml(content_type) => Err(FetchError::NotHtml {
                url: url.to_string(),
                content_type,
            }),
            _ => Err(FetchError::NotHtml {
                url: url.to_string(),
                content_type: "application/octet-stream".to_string(),
            }),
        }
    }

    async fn fetch_bytes(&self, url: &str) -> FetchResult<Vec<u8>> {
        match self.respond(url).await? {
            MockResponse::Bytes(bytes) => Ok(bytes),
            MockResponse::Html(html) => Ok(html.into_bytes()),
            MockResponse::NotHtml(_) => Ok(Vec::new()),
            _ => Err(FetchError::Network {
                url: url.to_string(),
                message: "unexpected mock response".to_string(),
            }),
        }
    }
}

/// Record of a call made to the mock model.
#[derive(Debug, Clone)]
pub struct MockModelCall {
    pub system: String,
    pub user: String,
}

/// A `ContentModel` that replays queued responses.
///
/// Each call takes the next queued response; an empty queue fails the call.
#[derive(Debug, Clone, Default)]
pub struct MockContentModel {
    responses: Arc<RwLock<VecDeque<Result<String, String>>>>,
    delay: Option<Duration>,
    calls: Arc<RwLock<Vec<MockModelCall>>>,
}

impl MockContentModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful completion.
    pub fn with_response(self, text: impl Into<String>) -> Self {
        self.responses
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(Ok(text.into()));
        self
    }

    /// Queue a model failure.
    pub fn with_failure(self, message: impl Into<String>) -> Self {
        self.responses
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(Err(message.into()));
        self
    }

    /// Delay every answer.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<MockModelCall> {
        self.calls
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl ContentModel for MockContentModel {
    async fn complete(&self, system: &str, user: &str) -> Result<String, RewriteError> {
        self.calls
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(MockModelCall {
                system: system.to_string(),
                user: user.to_string(),
            });

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let next = self
            .responses
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();

        match next {
            Some(Ok(text)) => Ok(text),
            Some(Err(message)) => Err(RewriteError::Model(message)),
            None => Err(RewriteError::Model("no canned response".to_string())),
        }
    }
}
