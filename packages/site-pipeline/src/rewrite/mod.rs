//! Optional language-model cleanup of a normalized `Site`.
//!
//! The stage never fails the run. Any problem (no credential, model error,
//! timeout, malformed JSON, a record that breaks an invariant or adds facts)
//! is logged and the input record is returned untouched.

mod prompts;

pub use prompts::{rewrite_user_prompt, REWRITE_SYSTEM_PROMPT};

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use openai_client::{ChatRequest, DocumentSchema, Message, OpenAIClient, OpenAIError};
use tracing::{debug, info, warn};

use crate::error::RewriteError;
use crate::types::{MenuItem, RewriterConfig, Site, SocialPlatform};

/// Upper bound on a rewritten record; longer completions fail to parse.
const COMPLETION_TOKEN_LIMIT: u32 = 8192;

/// A language model that turns a prompt into text.
#[async_trait]
pub trait ContentModel: Send + Sync {
    /// Run one completion and return the raw response text.
    async fn complete(&self, system: &str, user: &str) -> Result<String, RewriteError>;
}

/// `ContentModel` backed by the OpenAI chat completions API.
///
/// Tries each model in the configured chain until one answers with a
/// non-empty completion.
pub struct OpenAIContentModel {
    client: OpenAIClient,
    models: Vec<String>,
    schema: serde_json::Value,
}

impl OpenAIContentModel {
    pub fn new(config: &RewriterConfig) -> Self {
        let mut client = OpenAIClient::new(config.credentials.api_key.expose())
            .with_timeout(config.timeout);
        if let Some(base_url) = &config.credentials.base_url {
            client = client.with_base_url(base_url);
        }

        Self {
            client,
            models: config.model_chain(),
            schema: Site::inline_schema(),
        }
    }

    pub fn models(&self) -> &[String] {
        &self.models
    }
}

#[async_trait]
impl ContentModel for OpenAIContentModel {
    async fn complete(&self, system: &str, user: &str) -> Result<String, RewriteError> {
        let mut last_error = RewriteError::Model("no model configured".to_string());

        for model in &self.models {
            let request = ChatRequest::new(model)
                .message(Message::system(system))
                .message(Message::user(user))
                .temperature(0.2)
                .token_limit(COMPLETION_TOKEN_LIMIT)
                .json_schema(Site::type_name(), self.schema.clone(), false);

            match self.client.chat_completion(request).await {
                Ok(response) if !response.content.trim().is_empty() => {
                    debug!(model = %response.model, "Rewrite completion received");
                    return Ok(response.content);
                }
                Ok(_) => {
                    warn!(model = %model, "Model returned an empty completion, trying next");
                    last_error = RewriteError::Model(format!("{} returned no content", model));
                }
                Err(OpenAIError::Timeout(timeout)) => {
                    warn!(model = %model, timeout = ?timeout, "Model timed out, trying next");
                    last_error = RewriteError::Timeout(timeout);
                }
                Err(e) => {
                    warn!(model = %model, error = %e, "Model failed, trying next");
                    last_error = RewriteError::Model(e.to_string());
                }
            }
        }

        Err(last_error)
    }
}

/// The rewrite stage.
#[derive(Clone)]
pub struct Rewriter {
    model: Option<Arc<dyn ContentModel>>,
    timeout: Duration,
}

impl Rewriter {
    /// A rewriter that passes every record through unchanged.
    pub fn disabled() -> Self {
        Self {
            model: None,
            timeout: Duration::from_secs(60),
        }
    }

    /// Build from configuration. No config, or a blank key, disables the stage.
    pub fn from_config(config: Option<&RewriterConfig>) -> Self {
        match config {
            Some(config) if !config.credentials.api_key.is_blank() => Self {
                model: Some(Arc::new(OpenAIContentModel::new(config))),
                timeout: config.timeout,
            },
            _ => Self::disabled(),
        }
    }

    pub fn with_model(model: Arc<dyn ContentModel>, timeout: Duration) -> Self {
        Self {
            model: Some(model),
            timeout,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.model.is_some()
    }

    /// Rewrite `site`, or return it unchanged if anything goes wrong.
    pub async fn rewrite(&self, site: Site) -> Site {
        if !self.is_enabled() {
            debug!(slug = %site.slug, "No rewriter credential configured, skipping");
            return site;
        }

        match self.try_rewrite(&site).await {
            Ok(rewritten) => {
                info!(slug = %site.slug, "Rewrite accepted");
                rewritten
            }
            Err(e) => {
                warn!(slug = %site.slug, error = %e, "Rewrite failed, keeping normalized record");
                site
            }
        }
    }

    /// Rewrite `site`, surfacing the reason for any rejection.
    pub async fn try_rewrite(&self, site: &Site) -> Result<Site, RewriteError> {
        let Some(model) = &self.model else {
            return Ok(site.clone());
        };

        let user = rewrite_user_prompt(site)?;
        let raw = tokio::time::timeout(self.timeout, model.complete(REWRITE_SYSTEM_PROMPT, &user))
            .await
            .map_err(|_| RewriteError::Timeout(self.timeout))??;

        let mut candidate: Site = serde_json::from_str(openai_client::strip_code_blocks(&raw))?;

        candidate.slug = site.slug.clone();
        candidate.theme = site.theme.clone();
        candidate.source_url = site.source_url.clone();
        candidate.last_scraped_at = site.last_scraped_at;

        candidate.validate()?;
        check_invented(site, &candidate)?;

        Ok(candidate)
    }
}

/// Reject a candidate that carries facts the input record did not have, or
/// that changes one it did. Prose may change; hours, prices, addresses,
/// reviews and every URL must match the input or be dropped.
pub fn check_invented(original: &Site, candidate: &Site) -> Result<(), RewriteError> {
    let added = |field: &str, before: bool, after: bool| -> Result<(), RewriteError> {
        if !before && after {
            Err(invented(format!("added {}", field)))
        } else {
            Ok(())
        }
    };

    added("tagline", original.tagline.is_some(), candidate.tagline.is_some())?;
    added("phone", original.phone.is_some(), candidate.phone.is_some())?;
    added("address", original.address.is_some(), candidate.address.is_some())?;
    added("social links", original.social.is_some(), candidate.social.is_some())?;

    kept("hero image", original.hero_image.as_deref(), candidate.hero_image.as_deref())?;
    kept("logo", original.logo.as_deref(), candidate.logo.as_deref())?;
    kept("email", original.email.as_deref(), candidate.email.as_deref())?;
    kept(
        "reservation link",
        original.reservation_url.as_deref(),
        candidate.reservation_url.as_deref(),
    )?;
    kept(
        "order link",
        original.order_online_url.as_deref(),
        candidate.order_online_url.as_deref(),
    )?;

    let grew = |field: &str, before: usize, after: usize| -> Result<(), RewriteError> {
        if after > before {
            Err(invented(format!("{} grew from {} to {}", field, before, after)))
        } else {
            Ok(())
        }
    };

    grew("hours", len_of(&original.hours), len_of(&candidate.hours))?;
    grew("reviews", len_of(&original.reviews), len_of(&candidate.reviews))?;
    grew("sections", len_of(&original.sections), len_of(&candidate.sections))?;
    grew("images", len_of(&original.images), len_of(&candidate.images))?;
    grew("menu categories", len_of(&original.menu), len_of(&candidate.menu))?;
    grew("menu items", original.menu_item_count(), candidate.menu_item_count())?;

    if let (Some(before), Some(after)) = (&original.phone, &candidate.phone) {
        if digits(before) != digits(after) {
            return Err(invented("changed phone number".to_string()));
        }
    }

    if let Some(after) = &candidate.address {
        let before = original.address.clone().unwrap_or_default();
        for (field, before, after) in [
            ("street", &before.street, &after.street),
            ("city", &before.city, &after.city),
            ("state", &before.state, &after.state),
            ("postal code", &before.postal_code, &after.postal_code),
            ("country", &before.country, &after.country),
            ("maps link", &before.maps_url, &after.maps_url),
        ] {
            kept(field, before.as_deref(), after.as_deref())?;
        }
    }

    if let Some(after) = &candidate.social {
        for platform in SocialPlatform::ALL {
            let before = original.social.as_ref().and_then(|s| s.get(platform));
            kept(
                platform.brand(),
                before.map(String::as_str),
                after.get(platform).map(String::as_str),
            )?;
        }
    }

    for hour in candidate.hours.iter().flatten() {
        if !original.hours.iter().flatten().any(|h| h == hour) {
            return Err(invented(format!("changed hours for {}", hour.day)));
        }
    }

    for review in candidate.reviews.iter().flatten() {
        if !original.reviews.iter().flatten().any(|r| r == review) {
            return Err(invented("changed a review".to_string()));
        }
    }

    for image in candidate.images.iter().flatten() {
        if !original.images.iter().flatten().any(|i| i == image) {
            return Err(invented(format!("changed gallery image {}", image)));
        }
    }

    let section_images: Vec<&str> = original
        .sections
        .iter()
        .flatten()
        .filter_map(|s| s.image.as_deref())
        .collect();
    for image in candidate.sections.iter().flatten().filter_map(|s| s.image.as_deref()) {
        if !section_images.contains(&image) {
            return Err(invented(format!("changed section image {}", image)));
        }
    }

    let items: Vec<&MenuItem> = original
        .menu
        .iter()
        .flatten()
        .flat_map(|c| &c.items)
        .collect();
    for item in candidate.menu.iter().flatten().flat_map(|c| &c.items) {
        let key = fold(&item.name);
        let Some(source) = items.iter().find(|o| fold(&o.name) == key) else {
            return Err(invented(format!("unknown menu item {:?}", item.name)));
        };
        kept("menu price", source.price.as_deref(), item.price.as_deref())?;
        kept("menu image", source.image.as_deref(), item.image.as_deref())?;
    }

    Ok(())
}

/// `after` may drop `before` but not replace or add it.
fn kept(field: &str, before: Option<&str>, after: Option<&str>) -> Result<(), RewriteError> {
    match after {
        Some(after) if before != Some(after) => Err(invented(match before {
            Some(_) => format!("changed {}", field),
            None => format!("added {}", field),
        })),
        _ => Ok(()),
    }
}

fn invented(reason: String) -> RewriteError {
    RewriteError::InventedContent(reason)
}

fn len_of<T>(items: &Option<Vec<T>>) -> usize {
    items.as_ref().map_or(0, Vec::len)
}

fn digits(s: &str) -> String {
    s.chars().filter(char::is_ascii_digit).collect()
}

/// Lowercased letters and digits only, so recapitalized names still match.
fn fold(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}
