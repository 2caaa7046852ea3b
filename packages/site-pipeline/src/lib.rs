//! Restaurant website ingestion.
//!
//! Turns a restaurant's existing website into one canonical JSON content
//! record that a static site generator can render.
//!
//! # Usage
//!
//! ```rust,ignore
//! use site_pipeline::{Pipeline, PipelineConfig};
//!
//! let pipeline = Pipeline::new(PipelineConfig::new());
//! let out = pipeline.generate("https://www.example-bistro.com", false).await?;
//! println!("{} -> {}", out.slug, out.artifact_path.display());
//! ```
//!
//! # Modules
//!
//! - [`fetcher`] - Page and image retrieval behind the `Fetcher` trait
//! - [`extract`] - HTML to `ScrapedData` with ordered fallback sources
//! - [`normalize`] - `ScrapedData` to `Site`, slugs and hours parsing
//! - [`rewrite`] - Optional model-backed copy polishing
//! - [`images`] - Download remote images next to the site
//! - [`persist`] - One JSON artifact per slug
//! - [`pipeline`] - The `generate` run tying the stages together
//! - [`testing`] - Mock fetcher and content model

pub mod error;
pub mod extract;
pub mod fetcher;
pub mod images;
pub mod normalize;
pub mod persist;
pub mod pipeline;
pub mod rewrite;
pub mod security;
pub mod testing;
pub mod types;

pub use error::{
    ExtractionError, FetchError, ImageDownloadError, NormalizationError, PersistError,
    PipelineError, Result, RewriteError, ValidationError,
};
pub use fetcher::{Fetcher, HttpFetcher};
pub use images::{ImageLocalizer, LocalizeReport};
pub use persist::Persister;
pub use pipeline::{validate_url, GenerateOutput, Pipeline};
pub use rewrite::{ContentModel, OpenAIContentModel, Rewriter};
pub use security::{AICredentials, SecretString};
pub use types::{
    Address, DietaryTag, Hour, MenuCategory, MenuItem, PipelineConfig, Review, RewriterConfig,
    ScrapedData, Section, Site, SocialLinks, SocialPlatform, Theme,
};
