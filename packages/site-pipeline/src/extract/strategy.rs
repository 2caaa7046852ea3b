//! Per-field evidence ordering.
//!
//! Each field is resolved independently by walking its source list in order
//! and taking the first source that yields a value.

/// Where a piece of evidence comes from, strongest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Source {
    /// JSON-LD restaurant or local-business block.
    StructuredData,
    /// Open Graph / Twitter card / description meta tags.
    SocialMeta,
    /// Class, id and tag heuristics over the document.
    Dom,
    /// Regex over the visible page text.
    TextPattern,
}

use Source::*;

pub const NAME_SOURCES: &[Source] = &[StructuredData, SocialMeta, Dom];
pub const TAGLINE_SOURCES: &[Source] = &[StructuredData, SocialMeta];
pub const HERO_SOURCES: &[Source] = &[StructuredData, SocialMeta, Dom];
pub const LOGO_SOURCES: &[Source] = &[StructuredData, Dom];
pub const PHONE_SOURCES: &[Source] = &[StructuredData, Dom, TextPattern];
pub const EMAIL_SOURCES: &[Source] = &[StructuredData, Dom, TextPattern];
pub const HOURS_SOURCES: &[Source] = &[StructuredData, Dom, TextPattern];
pub const ADDRESS_SOURCES: &[Source] = &[StructuredData, Dom];
pub const MENU_SOURCES: &[Source] = &[StructuredData, Dom];
pub const REVIEW_SOURCES: &[Source] = &[StructuredData, Dom];
/// Applied per platform.
pub const SOCIAL_SOURCES: &[Source] = &[StructuredData, Dom];
pub const RESERVATION_SOURCES: &[Source] = &[StructuredData, Dom];
pub const ORDER_ONLINE_SOURCES: &[Source] = &[Dom];

/// Walk `sources` in order and return the first value produced.
pub fn resolve<T>(sources: &[Source], mut pick: impl FnMut(Source) -> Option<T>) -> Option<T> {
    sources.iter().find_map(|source| pick(*source))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_takes_first_hit() {
        let value = resolve(PHONE_SOURCES, |source| match source {
            StructuredData => None,
            Dom => Some("dom"),
            TextPattern => Some("text"),
            SocialMeta => Some("meta"),
        });
        assert_eq!(value, Some("dom"));
    }

    #[test]
    fn test_resolve_ignores_sources_not_listed() {
        let value = resolve(ORDER_ONLINE_SOURCES, |source| match source {
            StructuredData => Some("structured"),
            _ => None,
        });
        assert_eq!(value, None);
    }

    #[test]
    fn test_structured_data_always_leads() {
        for sources in [
            NAME_SOURCES,
            HERO_SOURCES,
            PHONE_SOURCES,
            HOURS_SOURCES,
            MENU_SOURCES,
        ] {
            assert_eq!(sources.first(), Some(&StructuredData));
        }
        assert_eq!(HOURS_SOURCES.last(), Some(&TextPattern));
    }
}
