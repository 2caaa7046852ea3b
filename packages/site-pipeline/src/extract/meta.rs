//! Page-level social preview metadata.

use scraper::{Html, Selector};

/// Open Graph, Twitter card and description tags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SocialMeta {
    pub site_name: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub theme_color: Option<String>,
}

impl SocialMeta {
    pub fn from_document(document: &Html) -> Self {
        Self {
            site_name: meta_content(document, &[r#"meta[property="og:site_name"]"#]),
            title: meta_content(
                document,
                &[
                    r#"meta[property="og:title"]"#,
                    r#"meta[name="twitter:title"]"#,
                ],
            ),
            description: meta_content(
                document,
                &[
                    r#"meta[property="og:description"]"#,
                    r#"meta[name="twitter:description"]"#,
                    r#"meta[name="description"]"#,
                ],
            ),
            image: meta_content(
                document,
                &[
                    r#"meta[property="og:image"]"#,
                    r#"meta[property="og:image:url"]"#,
                    r#"meta[name="twitter:image"]"#,
                ],
            ),
            theme_color: meta_content(document, &[r#"meta[name="theme-color"]"#]),
        }
    }

    /// Business name from the preview tags, site name before page title.
    pub fn name(&self) -> Option<String> {
        self.site_name
            .clone()
            .or_else(|| self.title.as_deref().and_then(clean_title))
    }
}

/// First non-empty `content` attribute among `selectors`, in order.
fn meta_content(document: &Html, selectors: &[&str]) -> Option<String> {
    selectors.iter().find_map(|selector_str| {
        let selector = Selector::parse(selector_str).ok()?;
        document
            .select(&selector)
            .filter_map(|el| el.value().attr("content"))
            .map(str::trim)
            .find(|content| !content.is_empty())
            .map(str::to_string)
    })
}

/// Strip the trailing "| Home" / "- Official Site" part of a page title.
pub fn clean_title(title: &str) -> Option<String> {
    let head = [" | ", " – ", " — ", " - ", " · "]
        .iter()
        .filter_map(|sep| title.find(sep))
        .min()
        .map_or(title, |idx| &title[..idx])
        .trim();
    (!head.is_empty()).then(|| head.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_og_tags_in_priority_order() {
        let document = Html::parse_document(
            r##"<html><head>
                <meta name="description" content="Plain description">
                <meta property="og:description" content="Wood-fired pizza since 1998">
                <meta property="og:title" content="Pizzeria Uno | Home">
                <meta name="twitter:image" content="https://cdn.example.com/tw.jpg">
                <meta name="theme-color" content="#8b0000">
            </head></html>"##,
        );
        let meta = SocialMeta::from_document(&document);

        assert_eq!(meta.description.as_deref(), Some("Wood-fired pizza since 1998"));
        assert_eq!(meta.image.as_deref(), Some("https://cdn.example.com/tw.jpg"));
        assert_eq!(meta.theme_color.as_deref(), Some("#8b0000"));
        assert_eq!(meta.name().as_deref(), Some("Pizzeria Uno"));
    }

    #[test]
    fn test_site_name_beats_title() {
        let document = Html::parse_document(
            r#"<head><meta property="og:site_name" content="Uno">
               <meta property="og:title" content="Menu - Uno"></head>"#,
        );
        assert_eq!(SocialMeta::from_document(&document).name().as_deref(), Some("Uno"));
    }

    #[test]
    fn test_clean_title() {
        assert_eq!(clean_title("Cafe Rio - Order Online | Home").as_deref(), Some("Cafe Rio"));
        assert_eq!(clean_title("Noodle Bar").as_deref(), Some("Noodle Bar"));
        assert_eq!(clean_title(" | Home"), None);
    }
}
