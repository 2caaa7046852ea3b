//! Free-text fallbacks over the visible page text.

use std::sync::LazyLock;

use regex::Regex;
use scraper::Html;

static PHONE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:\+?1[\s.\-]?)?\(?\b\d{3}\)?[\s.\-]?\d{3}[\s.\-]\d{4}\b").unwrap()
});

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}\b").unwrap()
});

/// A line that mentions a weekday and contains a digit.
static HOURS_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:mon|tue|wed|thu|fri|sat|sun)[a-z]*\.?\b.*\d").unwrap()
});

const ASSET_SUFFIXES: &[&str] = &[".png", ".jpg", ".jpeg", ".gif", ".webp", ".svg"];
const MAX_HOURS_LINES: usize = 14;
const NON_VISIBLE: &[&str] = &["script", "style", "noscript", "template"];

/// Visible text of the document, one text node per line.
pub fn page_text(document: &Html) -> String {
    let mut lines = Vec::new();

    for node in document.root_element().descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|el| NON_VISIBLE.contains(&el.name()))
        });
        if hidden {
            continue;
        }

        let line = collapse_whitespace(text);
        if !line.is_empty() {
            lines.push(line);
        }
    }

    lines.join("\n")
}

pub fn find_phone(text: &str) -> Option<String> {
    PHONE.find(text).map(|m| m.as_str().trim().to_string())
}

pub fn find_email(text: &str) -> Option<String> {
    EMAIL
        .find_iter(text)
        .map(|m| m.as_str())
        .find(|email| {
            let lower = email.to_ascii_lowercase();
            !ASSET_SUFFIXES.iter().any(|suffix| lower.ends_with(suffix))
        })
        .map(str::to_string)
}

/// Lines that look like opening hours, joined with newlines.
pub fn find_hours(text: &str) -> Option<String> {
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|line| HOURS_LINE.is_match(line))
        .take(MAX_HOURS_LINES)
        .collect();
    (!lines.is_empty()).then(|| lines.join("\n"))
}

pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_text_skips_scripts_and_styles() {
        let document = Html::parse_document(
            r#"<html><head><style>body { color: red }</style></head>
               <body><p>Call   us</p><script>var phone = "555";</script>
               <noscript>Enable JS</noscript><p>today</p></body></html>"#,
        );
        assert_eq!(page_text(&document), "Call us\ntoday");
    }

    #[test]
    fn test_find_phone() {
        assert_eq!(
            find_phone("Reservations: (612) 555-0199 or walk in").as_deref(),
            Some("(612) 555-0199")
        );
        assert_eq!(find_phone("+1 612.555.0199").as_deref(), Some("+1 612.555.0199"));
        assert_eq!(find_phone("Open since 1998"), None);
    }

    #[test]
    fn test_find_email_skips_retina_assets() {
        assert_eq!(
            find_email("logo@2x.png hello@bistro.com").as_deref(),
            Some("hello@bistro.com")
        );
        assert_eq!(find_email("no contact here"), None);
    }

    #[test]
    fn test_find_hours() {
        let text = "Welcome\nMonday: 11am-10pm\nSat & Sun 9am - 3pm\nClosed holidays";
        assert_eq!(
            find_hours(text).as_deref(),
            Some("Monday: 11am-10pm\nSat & Sun 9am - 3pm")
        );
        assert_eq!(find_hours("Welcome to our kitchen"), None);
    }
}
