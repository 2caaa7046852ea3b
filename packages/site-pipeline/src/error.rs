//! Typed errors for the site pipeline.
//!
//! Uses `thiserror` for library errors (not `anyhow`) so callers can tell
//! fatal run failures apart from the ones the pipeline recovers locally.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Errors that abort a pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The trigger was given something that is not an absolute http(s) URL.
    #[error("invalid URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// The source page could not be retrieved.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// The source page could not be parsed at all.
    #[error("extraction failed: {0}")]
    Extraction(#[from] ExtractionError),

    /// The scraped record could not be mapped to a `Site`.
    #[error("normalization failed: {0}")]
    Normalization(#[from] NormalizationError),

    /// The final artifact could not be written.
    #[error("could not persist artifact: {0}")]
    Persist(#[from] PersistError),
}

impl PipelineError {
    /// Whether the caller supplied bad input (as opposed to the run failing).
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidUrl { .. })
    }
}

/// Errors from network retrieval (page or image).
#[derive(Debug, Error)]
pub enum FetchError {
    /// The request could not complete (DNS, connect, TLS, body read).
    #[error("request to {url} could not complete: {message}")]
    Network { url: String, message: String },

    /// The request exceeded its deadline.
    #[error("request to {url} timed out after {timeout:?}")]
    Timeout { url: String, timeout: Duration },

    /// The server answered with a non-success status.
    #[error("{url} returned HTTP {status}: {text}")]
    Status {
        url: String,
        status: u16,
        text: String,
    },

    /// The server answered with something other than HTML.
    #[error("{url} returned non-HTML content ({content_type})")]
    NotHtml { url: String, content_type: String },

    /// The response body is larger than the configured limit.
    #[error("{url} returned more than {limit} bytes")]
    TooLarge { url: String, limit: u64 },
}

impl FetchError {
    /// True for failures where the request never produced a response.
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network { .. } | Self::Timeout { .. })
    }

    /// HTTP status, when the server answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// The document is not parseable as HTML.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("document is empty")]
    EmptyDocument,

    #[error("document does not contain HTML markup")]
    NotMarkup,
}

/// The scraped record cannot be turned into a `Site`.
#[derive(Debug, Error)]
pub enum NormalizationError {
    #[error("source URL {url:?} is not parseable: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("source URL {url:?} has no hostname")]
    MissingHost { url: String },
}

/// Failures of the optional rewrite stage. Never surfaced to callers.
#[derive(Debug, Error)]
pub enum RewriteError {
    /// The model service rejected or failed the request.
    #[error("content model failed: {0}")]
    Model(String),

    /// The model service did not answer in time.
    #[error("content model timed out after {0:?}")]
    Timeout(Duration),

    /// The response was not a JSON `Site` record.
    #[error("model response is not a valid site record: {0}")]
    MalformedJson(#[from] serde_json::Error),

    /// The response parsed but violates a `Site` invariant.
    #[error("model response failed validation: {0}")]
    Validation(#[from] ValidationError),

    /// The response contains facts that were not in the input.
    #[error("model response adds content not present in the input: {0}")]
    InventedContent(String),
}

/// A `Site` invariant that does not hold.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("slug is empty")]
    EmptySlug,

    #[error("name is empty")]
    EmptyName,

    #[error("hours entry for {day:?} has an empty open or close time")]
    IncompleteHour { day: String },

    #[error("review rating {0} is outside 1..=5")]
    RatingOutOfRange(u8),

    #[error("review text is empty")]
    EmptyReview,

    #[error("menu category {category:?} has an item without a name")]
    UnnamedMenuItem { category: String },

    #[error("section title is empty")]
    UntitledSection,
}

/// Failure to localize a single image. Recovered per image.
#[derive(Debug, Error)]
pub enum ImageDownloadError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("could not write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failure to write or read a content artifact.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not serialize site record: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("slug {0:?} is not a valid artifact key")]
    InvalidSlug(String),
}

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Result type alias for fetch operations.
pub type FetchResult<T> = std::result::Result<T, FetchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_url_is_client_error() {
        let err = PipelineError::InvalidUrl {
            url: "nope".into(),
            reason: "relative URL without a base".into(),
        };
        assert!(err.is_client_error());

        let err = PipelineError::Extraction(ExtractionError::EmptyDocument);
        assert!(!err.is_client_error());
    }

    #[test]
    fn test_fetch_error_classification() {
        let network = FetchError::Network {
            url: "https://example.com".into(),
            message: "dns error".into(),
        };
        assert!(network.is_network());
        assert_eq!(network.status(), None);

        let status = FetchError::Status {
            url: "https://example.com".into(),
            status: 404,
            text: "Not Found".into(),
        };
        assert!(!status.is_network());
        assert_eq!(status.status(), Some(404));
        assert!(status.to_string().contains("HTTP 404"));
    }
}
