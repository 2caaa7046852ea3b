//! `ScrapedData` to canonical `Site`.
//!
//! Pure and deterministic apart from the timestamp, which the caller
//! passes in. Missing content never fails normalization; only a source URL
//! without a usable hostname does.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use url::Url;

use crate::error::NormalizationError;
use crate::types::{Hour, ScrapedData, Site, Theme};

/// Name used when the page gave us nothing better.
pub const PLACEHOLDER_NAME: &str = "Untitled Restaurant";

/// Line shapes recognised in opening-hours text, tried in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HourShape {
    /// `Monday: 11am - 10pm`
    SingleDay,
    /// `Mon - Fri 11:00 - 22:00`
    DayRange,
}

pub const HOUR_SHAPES: [HourShape; 2] = [HourShape::SingleDay, HourShape::DayRange];

const DAY: &str = r"(monday|tuesday|wednesday|thursday|friday|saturday|sunday|mon|tues|tue|wed|thurs|thur|thu|fri|sat|sun)\.?";
const TIME: &str = r"(\d{1,2}(?:[:.]\d{2})?\s*(?:[ap]\.?m\.?)?|noon|midnight)";
const TIME_SEP: &str = r"\s*(?:-|–|—|to)\s*";
const DAY_SEP: &str = r"\s*(?:-|–|—|to|through|thru)\s*";

static SINGLE_DAY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)^\s*{DAY}\s*:?\s*{TIME}{TIME_SEP}{TIME}\s*$")).unwrap()
});

static DAY_RANGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)^\s*{DAY}{DAY_SEP}{DAY}\s*:?\s*{TIME}{TIME_SEP}{TIME}\s*$"
    ))
    .unwrap()
});

static HEX_COLOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#(?:[0-9a-fA-F]{3}|[0-9a-fA-F]{6})$").unwrap());

impl HourShape {
    /// Parse one line as this shape.
    pub fn parse(&self, line: &str) -> Option<Hour> {
        match self {
            Self::SingleDay => {
                let caps = SINGLE_DAY.captures(line)?;
                Some(Hour::new(
                    day_name(&caps[1])?,
                    caps[2].trim(),
                    caps[3].trim(),
                ))
            }
            Self::DayRange => {
                let caps = DAY_RANGE.captures(line)?;
                Some(Hour::new(
                    format!("{} - {}", day_name(&caps[1])?, day_name(&caps[2])?),
                    caps[3].trim(),
                    caps[4].trim(),
                ))
            }
        }
    }
}

/// Parse hours text line by line. The first matching shape wins; lines
/// that match no shape are dropped.
pub fn parse_hours(text: &str) -> Vec<Hour> {
    text.lines()
        .filter_map(|line| HOUR_SHAPES.iter().find_map(|shape| shape.parse(line)))
        .collect()
}

fn day_name(token: &str) -> Option<&'static str> {
    let prefix: String = token.chars().take(3).collect::<String>().to_ascii_lowercase();
    match prefix.as_str() {
        "mon" => Some("Monday"),
        "tue" => Some("Tuesday"),
        "wed" => Some("Wednesday"),
        "thu" => Some("Thursday"),
        "fri" => Some("Friday"),
        "sat" => Some("Saturday"),
        "sun" => Some("Sunday"),
        _ => None,
    }
}

/// Deterministic artifact key for a source URL.
///
/// `http://www.Example.com/menu` and `https://example.com` both give
/// `example-com`.
pub fn slug_for(source_url: &str) -> Result<String, NormalizationError> {
    let url = Url::parse(source_url).map_err(|e| NormalizationError::InvalidUrl {
        url: source_url.to_string(),
        reason: e.to_string(),
    })?;

    let host = url
        .host_str()
        .ok_or_else(|| NormalizationError::MissingHost {
            url: source_url.to_string(),
        })?
        .to_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host);

    let slug = slugify(host);
    if slug.is_empty() {
        return Err(NormalizationError::MissingHost {
            url: source_url.to_string(),
        });
    }
    Ok(slug)
}

/// Lowercase, runs of non-alphanumerics collapsed to single hyphens.
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_hyphen = false;

    for ch in input.chars().flat_map(char::to_lowercase) {
        if ch.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(ch);
        } else {
            pending_hyphen = true;
        }
    }

    slug
}

/// Map extracted data onto the canonical record.
pub fn normalize(
    data: ScrapedData,
    source_url: &str,
    scraped_at: DateTime<Utc>,
) -> Result<Site, NormalizationError> {
    let slug = slug_for(source_url)?;

    let name = clean(data.name).unwrap_or_else(|| PLACEHOLDER_NAME.to_string());

    let hours = data
        .hours_text
        .as_deref()
        .map(parse_hours)
        .filter(|hours| !hours.is_empty());

    let mut theme = Theme::default();
    if let Some(color) = data.theme_color.as_deref().map(str::trim) {
        if HEX_COLOR.is_match(color) {
            theme.primary_color = color.to_lowercase();
        }
    }

    Ok(Site {
        slug,
        name,
        tagline: clean(data.tagline),
        hero_image: clean(data.hero_image),
        logo: clean(data.logo),
        phone: clean(data.phone),
        email: clean(data.email),
        address: data.address.filter(|a| !a.is_empty()),
        hours,
        reservation_url: clean(data.reservation_url),
        order_online_url: clean(data.order_online_url),
        social: data.social.filter(|s| !s.is_empty()),
        sections: data.sections.filter(|s| !s.is_empty()),
        reviews: data.reviews.filter(|r| !r.is_empty()),
        menu: data
            .menu
            .map(|menu| {
                menu.into_iter()
                    .filter(|c| !c.items.is_empty())
                    .collect::<Vec<_>>()
            })
            .filter(|m| !m.is_empty()),
        images: data.images.filter(|i| !i.is_empty()),
        theme,
        source_url: source_url.to_string(),
        last_scraped_at: scraped_at,
    })
}

fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::site::DEFAULT_PRIMARY_COLOR;
    use chrono::TimeZone;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 9, 30, 0).unwrap()
    }

    #[test]
    fn test_slug_strips_www_and_scheme() {
        assert_eq!(slug_for("http://www.example.com/").unwrap(), "example-com");
        assert_eq!(slug_for("https://example.com").unwrap(), "example-com");
        assert_eq!(
            slug_for("https://WWW.Blue-Door.Cafe/menu?x=1").unwrap(),
            "blue-door-cafe"
        );
    }

    #[test]
    fn test_slug_rejects_unparseable_url() {
        assert!(matches!(
            slug_for("not a url"),
            Err(NormalizationError::InvalidUrl { .. })
        ));
        assert!(matches!(
            slug_for("mailto:someone@example.com"),
            Err(NormalizationError::MissingHost { .. })
        ));
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Crème Brûlée!"), "cr-me-br-l-e");
        assert_eq!(slugify("  Fish & Chips  "), "fish-chips");
        assert_eq!(slugify("---"), "");
    }

    #[test]
    fn test_single_day_line_and_unmatched_line() {
        let hours = parse_hours("Monday: 11am-10pm\nClosed");
        assert_eq!(hours, vec![Hour::new("Monday", "11am", "10pm")]);
    }

    #[test]
    fn test_day_range_line() {
        let hours = parse_hours("Mon - Fri 11:00 - 22:00\nSat: 10 am to 2 pm");
        assert_eq!(
            hours,
            vec![
                Hour::new("Monday - Friday", "11:00", "22:00"),
                Hour::new("Saturday", "10 am", "2 pm"),
            ]
        );
    }

    #[test]
    fn test_shapes_are_tried_in_order() {
        assert_eq!(HOUR_SHAPES[0], HourShape::SingleDay);
        assert!(HourShape::SingleDay.parse("Monday - Friday: 9am-5pm").is_none());
        assert!(HourShape::DayRange.parse("Monday - Friday: 9am-5pm").is_some());
    }

    #[test]
    fn test_missing_name_uses_placeholder() {
        let site = normalize(ScrapedData::default(), "https://example.com", at()).unwrap();
        assert_eq!(site.name, PLACEHOLDER_NAME);
        assert_eq!(site.theme, Theme::default());
        assert_eq!(site.source_url, "https://example.com");
        assert!(site.validate().is_ok());
    }

    #[test]
    fn test_normalize_is_deterministic() {
        let data = ScrapedData {
            name: Some("  Luca  ".into()),
            hours_text: Some("Tuesday: 5pm - 9pm".into()),
            theme_color: Some("#7A1F1F".into()),
            ..Default::default()
        };

        let a = normalize(data.clone(), "https://luca.example", at()).unwrap();
        let b = normalize(data, "https://luca.example", at()).unwrap();

        assert_eq!(
            serde_json::to_string_pretty(&a).unwrap(),
            serde_json::to_string_pretty(&b).unwrap()
        );
        assert_eq!(a.name, "Luca");
        assert_eq!(a.theme.primary_color, "#7a1f1f");
    }

    #[test]
    fn test_invalid_theme_color_keeps_default() {
        let data = ScrapedData {
            theme_color: Some("red".into()),
            ..Default::default()
        };
        let site = normalize(data, "https://example.com", at()).unwrap();
        assert_eq!(site.theme.primary_color, DEFAULT_PRIMARY_COLOR);
    }

    #[test]
    fn test_hours_with_no_matching_lines_are_omitted() {
        let data = ScrapedData {
            hours_text: Some("Call for hours".into()),
            ..Default::default()
        };
        let site = normalize(data, "https://example.com", at()).unwrap();
        assert_eq!(site.hours, None);
    }
}
