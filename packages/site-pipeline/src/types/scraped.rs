//! The loosely-typed record produced by extraction.

use serde::{Deserialize, Serialize};

use super::site::{Address, MenuCategory, Review, Section, SocialLinks};

/// Everything the extractor managed to find on a page.
///
/// Every field is optional. Only the normalizer decides what a missing
/// value becomes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapedData {
    pub name: Option<String>,
    pub tagline: Option<String>,
    pub hero_image: Option<String>,
    pub logo: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<Address>,
    /// Raw opening-hours lines, one entry per line.
    pub hours_text: Option<String>,
    pub reservation_url: Option<String>,
    pub order_online_url: Option<String>,
    pub social: Option<SocialLinks>,
    pub sections: Option<Vec<Section>>,
    pub reviews: Option<Vec<Review>>,
    pub menu: Option<Vec<MenuCategory>>,
    pub images: Option<Vec<String>>,
    /// Value of `<meta name="theme-color">`.
    pub theme_color: Option<String>,
}

impl ScrapedData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count of fields that carry a value. Used for extraction logging.
    pub fn populated_fields(&self) -> usize {
        [
            self.name.is_some(),
            self.tagline.is_some(),
            self.hero_image.is_some(),
            self.logo.is_some(),
            self.phone.is_some(),
            self.email.is_some(),
            self.address.is_some(),
            self.hours_text.is_some(),
            self.reservation_url.is_some(),
            self.order_online_url.is_some(),
            self.social.is_some(),
            self.sections.is_some(),
            self.reviews.is_some(),
            self.menu.is_some(),
            self.images.is_some(),
            self.theme_color.is_some(),
        ]
        .into_iter()
        .filter(|set| *set)
        .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_populated_fields() {
        let mut data = ScrapedData::new();
        assert_eq!(data.populated_fields(), 0);

        data.name = Some("Luigi's".into());
        data.hours_text = Some("Monday: 11am-10pm".into());
        assert_eq!(data.populated_fields(), 2);
    }
}
