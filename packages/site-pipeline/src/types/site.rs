//! The canonical `Site` record and its parts.
//!
//! This is the contract between the pipeline and the rendering layer. Field
//! names serialize in camelCase and absent optionals are omitted, so a
//! reader must treat a missing key as "feature absent".

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Postal address. Every part is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub street: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maps_url: Option<String>,
}

impl Address {
    pub fn is_empty(&self) -> bool {
        self.street.is_none()
            && self.city.is_none()
            && self.state.is_none()
            && self.postal_code.is_none()
            && self.country.is_none()
            && self.maps_url.is_none()
    }
}

/// One opening-hours entry. `day` is a free-text label ("Monday",
/// "Monday - Friday"); `open`/`close` are kept as written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Hour {
    pub day: String,
    pub open: String,
    pub close: String,
}

impl Hour {
    pub fn new(day: impl Into<String>, open: impl Into<String>, close: impl Into<String>) -> Self {
        Self {
            day: day.into(),
            open: open.into(),
            close: close.into(),
        }
    }
}

/// Dietary markers a menu item can carry.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "kebab-case")]
pub enum DietaryTag {
    Vegetarian,
    Vegan,
    GlutenFree,
    DairyFree,
    NutFree,
    Spicy,
    Halal,
    Kosher,
}

impl DietaryTag {
    pub const ALL: [DietaryTag; 8] = [
        DietaryTag::Vegetarian,
        DietaryTag::Vegan,
        DietaryTag::GlutenFree,
        DietaryTag::DairyFree,
        DietaryTag::NutFree,
        DietaryTag::Spicy,
        DietaryTag::Halal,
        DietaryTag::Kosher,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Vegetarian => "vegetarian",
            Self::Vegan => "vegan",
            Self::GlutenFree => "gluten-free",
            Self::DairyFree => "dairy-free",
            Self::NutFree => "nut-free",
            Self::Spicy => "spicy",
            Self::Halal => "halal",
            Self::Kosher => "kosher",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct MenuItem {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Kept as text ("$12", "12 / 18", "MP").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dietary: Option<Vec<DietaryTag>>,
}

impl MenuItem {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            price: None,
            image: None,
            dietary: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct MenuCategory {
    pub name: String,
    pub items: Vec<MenuItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Review {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub text: String,
    /// 1 to 5 inclusive.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
}

/// Freeform narrative block ("Our Story", "Private Dining").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Section {
    pub title: String,
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// Platforms recognised in social links.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SocialPlatform {
    Facebook,
    Instagram,
    Twitter,
    TikTok,
    Yelp,
    TripAdvisor,
    YouTube,
}

impl SocialPlatform {
    pub const ALL: [SocialPlatform; 7] = [
        SocialPlatform::Facebook,
        SocialPlatform::Instagram,
        SocialPlatform::Twitter,
        SocialPlatform::TikTok,
        SocialPlatform::Yelp,
        SocialPlatform::TripAdvisor,
        SocialPlatform::YouTube,
    ];

    /// Brand label that appears in every regional variant of the
    /// platform's hostname (`yelp.ca`, `tripadvisor.co.uk`).
    pub fn brand(&self) -> &'static str {
        match self {
            Self::Facebook => "facebook",
            Self::Instagram => "instagram",
            Self::Twitter => "twitter",
            Self::TikTok => "tiktok",
            Self::Yelp => "yelp",
            Self::TripAdvisor => "tripadvisor",
            Self::YouTube => "youtube",
        }
    }

    /// Short and alternate domains that do not carry the brand label.
    pub fn domains(&self) -> &'static [&'static str] {
        match self {
            Self::Facebook => &["fb.com", "fb.me"],
            Self::Instagram => &["instagr.am"],
            Self::Twitter => &["x.com"],
            Self::TikTok => &[],
            Self::Yelp => &["yelp.to"],
            Self::TripAdvisor => &[],
            Self::YouTube => &["youtu.be"],
        }
    }

    /// Find the platform a hostname belongs to. Any subdomain of a known
    /// domain matches, as does any host with the brand as one of its labels.
    pub fn from_host(host: &str) -> Option<Self> {
        let host = host.trim_end_matches('.').to_ascii_lowercase();
        Self::ALL.into_iter().find(|platform| {
            host.split('.').any(|label| label == platform.brand())
                || platform
                    .domains()
                    .iter()
                    .any(|d| host == *d || host.ends_with(&format!(".{}", d)))
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SocialLinks {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub facebook: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instagram: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub twitter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tiktok: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub yelp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tripadvisor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub youtube: Option<String>,
}

impl SocialLinks {
    pub fn get(&self, platform: SocialPlatform) -> Option<&String> {
        self.slot(platform).as_ref()
    }

    pub fn set(&mut self, platform: SocialPlatform, url: impl Into<String>) {
        *self.slot_mut(platform) = Some(url.into());
    }

    pub fn is_empty(&self) -> bool {
        SocialPlatform::ALL.iter().all(|p| self.get(*p).is_none())
    }

    fn slot(&self, platform: SocialPlatform) -> &Option<String> {
        match platform {
            SocialPlatform::Facebook => &self.facebook,
            SocialPlatform::Instagram => &self.instagram,
            SocialPlatform::Twitter => &self.twitter,
            SocialPlatform::TikTok => &self.tiktok,
            SocialPlatform::Yelp => &self.yelp,
            SocialPlatform::TripAdvisor => &self.tripadvisor,
            SocialPlatform::YouTube => &self.youtube,
        }
    }

    fn slot_mut(&mut self, platform: SocialPlatform) -> &mut Option<String> {
        match platform {
            SocialPlatform::Facebook => &mut self.facebook,
            SocialPlatform::Instagram => &mut self.instagram,
            SocialPlatform::Twitter => &mut self.twitter,
            SocialPlatform::TikTok => &mut self.tiktok,
            SocialPlatform::Yelp => &mut self.yelp,
            SocialPlatform::TripAdvisor => &mut self.tripadvisor,
            SocialPlatform::YouTube => &mut self.youtube,
        }
    }
}

pub const DEFAULT_PRIMARY_COLOR: &str = "#1f2937";
pub const DEFAULT_ACCENT_COLOR: &str = "#b45309";
pub const DEFAULT_HERO_OVERLAY: &str = "rgba(0, 0, 0, 0.45)";

/// Color tokens for the rendered site. Always concrete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Theme {
    pub primary_color: String,
    pub accent_color: String,
    pub hero_overlay: String,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            primary_color: DEFAULT_PRIMARY_COLOR.to_string(),
            accent_color: DEFAULT_ACCENT_COLOR.to_string(),
            hero_overlay: DEFAULT_HERO_OVERLAY.to_string(),
        }
    }
}

/// The canonical content record written for each source domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Site {
    pub slug: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tagline: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hero_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hours: Option<Vec<Hour>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reservation_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_online_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub social: Option<SocialLinks>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sections: Option<Vec<Section>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviews: Option<Vec<Review>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub menu: Option<Vec<MenuCategory>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<String>>,
    #[serde(default)]
    pub theme: Theme,
    pub source_url: String,
    pub last_scraped_at: DateTime<Utc>,
}

impl Site {
    /// Check the invariants a record must hold before it is accepted.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.slug.trim().is_empty() {
            return Err(ValidationError::EmptySlug);
        }
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }

        for hour in self.hours.iter().flatten() {
            if hour.open.trim().is_empty() || hour.close.trim().is_empty() {
                return Err(ValidationError::IncompleteHour {
                    day: hour.day.clone(),
                });
            }
        }

        for review in self.reviews.iter().flatten() {
            if review.text.trim().is_empty() {
                return Err(ValidationError::EmptyReview);
            }
            if let Some(rating) = review.rating {
                if !(1..=5).contains(&rating) {
                    return Err(ValidationError::RatingOutOfRange(rating));
                }
            }
        }

        for category in self.menu.iter().flatten() {
            if category.items.iter().any(|i| i.name.trim().is_empty()) {
                return Err(ValidationError::UnnamedMenuItem {
                    category: category.name.clone(),
                });
            }
        }

        if self.sections.iter().flatten().any(|s| s.title.trim().is_empty()) {
            return Err(ValidationError::UntitledSection);
        }

        Ok(())
    }

    /// Total number of menu items across all categories.
    pub fn menu_item_count(&self) -> usize {
        self.menu
            .iter()
            .flatten()
            .map(|c| c.items.len())
            .sum()
    }
}
