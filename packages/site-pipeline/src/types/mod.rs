//! Core types for the site pipeline.

pub mod config;
pub mod scraped;
pub mod site;

pub use config::{PipelineConfig, RewriterConfig};
pub use scraped::ScrapedData;
pub use site::{
    Address, DietaryTag, Hour, MenuCategory, MenuItem, Review, Section, Site, SocialLinks,
    SocialPlatform, Theme,
};
