//! Heuristic DOM pattern matching.
//!
//! Everything here works off tag names and class/id substrings. Results are
//! best effort: a page that does not use the conventional names simply
//! yields nothing for that field.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use super::dietary;
use super::meta::clean_title;
use super::text::collapse_whitespace;
use crate::types::{Address, MenuCategory, MenuItem, Review, Section, SocialLinks, SocialPlatform};

/// Smallest `width * height` an image needs to be considered the hero.
pub const HERO_MIN_AREA: u64 = 40_000;
/// Shortest body a narrative section may have.
pub const SECTION_MIN_BODY: usize = 60;
/// Shortest text a menu block may have.
pub const MENU_MIN_TEXT: usize = 40;
/// Shortest text a review may have.
pub const REVIEW_MIN_TEXT: usize = 20;
pub const MAX_SECTIONS: usize = 8;

const MAX_ITEM_NAME: usize = 120;
const CHROME_TAGS: &[&str] = &["nav", "header", "footer"];

pub const RESERVATION_HOSTS: &[&str] = &[
    "opentable.com",
    "resy.com",
    "exploretock.com",
    "sevenrooms.com",
];
pub const ORDER_HOSTS: &[&str] = &[
    "doordash.com",
    "ubereats.com",
    "grubhub.com",
    "toasttab.com",
    "chownow.com",
    "seamless.com",
];

static PRICE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[$€£]\s?\d+(?:[.,]\d{2})?").unwrap());
static RATING: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b([1-5])(?:\.\d)?\b").unwrap());

/// Runs DOM heuristics over one parsed document.
pub struct DomScanner<'a> {
    document: &'a Html,
    base_url: &'a Url,
}

impl<'a> DomScanner<'a> {
    pub fn new(document: &'a Html, base_url: &'a Url) -> Self {
        Self { document, base_url }
    }

    fn root(&self) -> ElementRef<'a> {
        self.document.root_element()
    }

    /// Resolve a reference against the page URL. `data:` URIs and
    /// non-web schemes are dropped.
    pub fn absolute(&self, raw: &str) -> Option<String> {
        absolute_url(self.base_url, raw)
    }

    pub fn name(&self) -> Option<String> {
        select_all(self.root(), "title")
            .into_iter()
            .find_map(|el| clean_title(&element_text(el)))
            .or_else(|| {
                select_all(self.root(), "h1")
                    .into_iter()
                    .map(element_text)
                    .find(|t| !t.is_empty())
            })
    }

    /// Largest image by declared area, if it clears `HERO_MIN_AREA`.
    pub fn hero_image(&self) -> Option<String> {
        let mut best: Option<(u64, String)> = None;

        for img in select_all(self.root(), "img") {
            let (Some(w), Some(h)) = (dimension(img, "width"), dimension(img, "height")) else {
                continue;
            };
            let area = w.saturating_mul(h);
            if area < HERO_MIN_AREA || best.as_ref().is_some_and(|(a, _)| area <= *a) {
                continue;
            }
            if let Some(src) = image_src(img).and_then(|s| self.absolute(s)) {
                best = Some((area, src));
            }
        }

        best.map(|(_, src)| src)
    }

    pub fn logo(&self) -> Option<String> {
        select_all(self.root(), "img")
            .into_iter()
            .filter(|img| {
                let value = img.value();
                let haystack = format!(
                    "{} {} {}",
                    hint(*img),
                    value.attr("alt").unwrap_or_default(),
                    image_src(*img).unwrap_or_default()
                )
                .to_lowercase();
                haystack.contains("logo")
            })
            .find_map(|img| image_src(img).and_then(|s| self.absolute(s)))
    }

    pub fn phone(&self) -> Option<String> {
        select_all(self.root(), r#"a[href^="tel:"]"#)
            .into_iter()
            .find_map(|a| {
                let text = element_text(a);
                if text.chars().filter(char::is_ascii_digit).count() >= 7 {
                    return Some(text);
                }
                let number = a.value().attr("href")?.trim_start_matches("tel:").trim();
                (!number.is_empty()).then(|| number.to_string())
            })
    }

    pub fn email(&self) -> Option<String> {
        select_all(self.root(), r#"a[href^="mailto:"]"#)
            .into_iter()
            .find_map(|a| {
                let href = a.value().attr("href")?.trim_start_matches("mailto:");
                let address = href.split('?').next().unwrap_or_default().trim();
                address.contains('@').then(|| address.to_string())
            })
    }

    /// Lines from blocks whose class or id mentions "hours".
    pub fn hours_text(&self) -> Option<String> {
        let containers = outermost(
            select_all(self.root(), r#"[class*="hours"], [id*="hours"]"#),
        );

        let mut lines = Vec::new();
        for container in containers {
            let terms = select_all(container, "dt");
            let details = select_all(container, "dd");
            if !terms.is_empty() && terms.len() == details.len() {
                for (dt, dd) in terms.into_iter().zip(details) {
                    lines.push(format!("{} {}", element_text(dt), element_text(dd)));
                }
                continue;
            }

            let rows = select_all(container, "li, tr, p");
            if rows.is_empty() {
                lines.extend(
                    container
                        .text()
                        .map(collapse_whitespace)
                        .filter(|l| !l.is_empty()),
                );
            } else {
                lines.extend(rows.into_iter().map(element_text).filter(|l| !l.is_empty()));
            }
        }

        (!lines.is_empty()).then(|| lines.join("\n"))
    }

    pub fn address(&self) -> Option<Address> {
        let maps_url = select_all(
            self.root(),
            r#"a[href*="maps.google"], a[href*="google.com/maps"], a[href*="goo.gl/maps"], a[href*="maps.apple.com"]"#,
        )
        .into_iter()
        .find_map(|a| a.value().attr("href").and_then(|h| self.absolute(h)));

        let container = select_all(
            self.root(),
            r#"address, [itemprop="address"], [class*="address"]"#,
        )
        .into_iter()
        .find(|el| !element_text(*el).is_empty());

        let mut address = match container {
            Some(el) => {
                let part = |prop: &str| {
                    select_all(el, &format!(r#"[itemprop="{}"]"#, prop))
                        .into_iter()
                        .map(element_text)
                        .find(|t| !t.is_empty())
                };
                let structured = Address {
                    street: part("streetAddress"),
                    city: part("addressLocality"),
                    state: part("addressRegion"),
                    postal_code: part("postalCode"),
                    country: part("addressCountry"),
                    maps_url: None,
                };
                if structured.is_empty() {
                    let lines: Vec<String> = el
                        .text()
                        .map(collapse_whitespace)
                        .filter(|l| !l.is_empty())
                        .collect();
                    Address {
                        street: Some(lines.join(", ")),
                        ..Default::default()
                    }
                } else {
                    structured
                }
            }
            None => Address::default(),
        };

        address.maps_url = maps_url;
        (!address.is_empty()).then_some(address)
    }

    pub fn menu(&self) -> Option<Vec<MenuCategory>> {
        let containers = outermost(
            select_all(self.root(), r#"[class*="menu"], [id*="menu"]"#)
                .into_iter()
                .filter(|el| !in_chrome(*el) && !CHROME_TAGS.contains(&el.value().name()))
                .filter(|el| element_text(*el).chars().count() >= MENU_MIN_TEXT)
                .collect(),
        );

        let mut categories = Vec::new();
        for container in containers {
            let groups: Vec<MenuCategory> = outermost(select_all(
                container,
                r#"[class*="category"], [class*="menu-section"], [class*="menu-group"]"#,
            ))
            .into_iter()
            .filter_map(|group| self.menu_category(group))
            .collect();

            if groups.is_empty() {
                categories.extend(self.menu_category(container));
            } else {
                categories.extend(groups);
            }
        }

        (!categories.is_empty()).then_some(categories)
    }

    fn menu_category(&self, scope: ElementRef<'a>) -> Option<MenuCategory> {
        let mut item_elements = outermost(
            scope
                .descendants()
                .filter_map(ElementRef::wrap)
                .filter(|el| is_item_element(*el))
                .collect(),
        );
        if item_elements.is_empty() {
            item_elements = select_all(scope, "li")
                .into_iter()
                .filter(|li| PRICE.is_match(&element_text(*li)))
                .collect();
        }

        let items: Vec<MenuItem> = item_elements
            .iter()
            .filter_map(|el| self.menu_item(*el))
            .collect();
        if items.is_empty() {
            return None;
        }

        let item_ids: Vec<_> = item_elements.iter().map(|el| el.id()).collect();
        let name = select_all(scope, "h1, h2, h3, h4")
            .into_iter()
            .filter(|h| !h.ancestors().any(|a| item_ids.contains(&a.id())))
            .map(element_text)
            .find(|t| !t.is_empty())
            .unwrap_or_else(|| "Menu".to_string());

        Some(MenuCategory { name, items })
    }

    fn menu_item(&self, el: ElementRef<'a>) -> Option<MenuItem> {
        let name = select_all(
            el,
            r#"[class*="name"], [class*="title"], h3, h4, h5, h6, strong, b, dt"#,
        )
        .into_iter()
        .map(element_text)
        .find(|t| !t.is_empty())
        .or_else(|| el.text().map(collapse_whitespace).find(|t| !t.is_empty()))?;

        if name.len() > MAX_ITEM_NAME {
            return None;
        }

        let full_text = element_text(el);
        let price = select_all(el, r#"[class*="price"]"#)
            .into_iter()
            .map(element_text)
            .find(|t| !t.is_empty())
            .or_else(|| PRICE.find(&full_text).map(|m| m.as_str().to_string()));

        let description = select_all(el, r#"[class*="desc"], p"#)
            .into_iter()
            .map(element_text)
            .find(|t| !t.is_empty() && *t != name);

        let image = select_all(el, "img")
            .into_iter()
            .find_map(|img| image_src(img).and_then(|s| self.absolute(s)));

        let mut markers = vec![hint(el)];
        for child in el.descendants().filter_map(ElementRef::wrap) {
            for attr in ["title", "alt", "aria-label"] {
                if let Some(value) = child.value().attr(attr) {
                    markers.push(value.to_string());
                }
            }
        }
        let tags = dietary::detect(
            [name.as_str()]
                .into_iter()
                .chain(description.as_deref())
                .chain(markers.iter().map(String::as_str)),
        );

        Some(MenuItem {
            name,
            description,
            price,
            image,
            dietary: dietary::into_field(tags),
        })
    }

    pub fn reviews(&self) -> Option<Vec<Review>> {
        let mut containers = outermost(
            self.root()
                .descendants()
                .filter_map(ElementRef::wrap)
                .filter(|el| is_review_element(*el))
                .collect(),
        );
        if containers.is_empty() {
            containers = select_all(
                self.root(),
                r#"[class*="review"] blockquote, [class*="testimonial"] blockquote"#,
            );
        }

        let mut reviews: Vec<Review> = Vec::new();
        for el in containers {
            let Some(review) = parse_review(el) else {
                continue;
            };
            if reviews.iter().any(|r| r.text == review.text) {
                continue;
            }
            reviews.push(review);
        }

        (!reviews.is_empty()).then_some(reviews)
    }

    /// Narrative blocks with a heading and a body of at least
    /// `SECTION_MIN_BODY` characters. Innermost qualifying blocks win.
    pub fn sections(&self) -> Option<Vec<Section>> {
        let candidates: Vec<(ElementRef<'a>, Section)> = select_all(
            self.root(),
            r#"section, [class*="section"], [id*="section"]"#,
        )
        .into_iter()
        .filter(|el| !in_chrome(*el))
        .filter(|el| {
            let h = hint(*el);
            !["menu", "review", "testimonial", "hours"]
                .iter()
                .any(|skip| h.contains(skip))
        })
        .filter_map(|el| self.section(el).map(|s| (el, s)))
        .collect();

        let ids: Vec<_> = candidates.iter().map(|(el, _)| el.id()).collect();
        let mut sections: Vec<Section> = Vec::new();
        for (el, section) in candidates.iter() {
            let has_inner = el
                .descendants()
                .skip(1)
                .any(|d| ids.contains(&d.id()));
            if has_inner || sections.iter().any(|s| s.title.eq_ignore_ascii_case(&section.title)) {
                continue;
            }
            sections.push(section.clone());
            if sections.len() == MAX_SECTIONS {
                break;
            }
        }

        (!sections.is_empty()).then_some(sections)
    }

    fn section(&self, el: ElementRef<'a>) -> Option<Section> {
        let title = select_all(el, "h1, h2, h3")
            .into_iter()
            .map(element_text)
            .find(|t| !t.is_empty())?;

        let body = select_all(el, "p")
            .into_iter()
            .map(element_text)
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n");
        if body.chars().count() < SECTION_MIN_BODY {
            return None;
        }

        let image = select_all(el, "img")
            .into_iter()
            .find_map(|img| image_src(img).and_then(|s| self.absolute(s)));

        Some(Section { title, body, image })
    }

    /// Platform links by anchor host. The last matching anchor per
    /// platform wins.
    pub fn social(&self) -> SocialLinks {
        let mut links = SocialLinks::default();
        for href in self.anchor_urls().into_iter().map(|(url, _)| url) {
            let Some(platform) = href.host_str().and_then(SocialPlatform::from_host) else {
                continue;
            };
            let path = href.path();
            if ["/sharer", "/share", "/intent", "/dialog"]
                .iter()
                .any(|p| path.starts_with(p))
            {
                continue;
            }
            links.set(platform, href.to_string());
        }
        links
    }

    pub fn reservation_url(&self) -> Option<String> {
        self.anchor_urls()
            .into_iter()
            .find(|(url, text)| {
                let host = url.host_str().unwrap_or_default();
                host_matches(host, RESERVATION_HOSTS)
                    || (host_matches(host, &["yelp.com"]) && url.path().contains("/reservations"))
                    || text.contains("reserv")
                    || text.contains("book a table")
            })
            .map(|(url, _)| url.to_string())
    }

    pub fn order_online_url(&self) -> Option<String> {
        self.anchor_urls()
            .into_iter()
            .find(|(url, text)| {
                host_matches(url.host_str().unwrap_or_default(), ORDER_HOSTS)
                    || text.contains("order online")
            })
            .map(|(url, _)| url.to_string())
    }

    /// Every `<img>` reference on the page, resolved, in document order.
    pub fn images(&self) -> Vec<String> {
        select_all(self.root(), "img")
            .into_iter()
            .filter_map(|img| image_src(img).and_then(|s| self.absolute(s)))
            .collect()
    }

    /// Resolved http(s) anchors with their lowercased text.
    fn anchor_urls(&self) -> Vec<(Url, String)> {
        select_all(self.root(), "a[href]")
            .into_iter()
            .filter_map(|a| {
                let href = a.value().attr("href")?;
                let url = self.base_url.join(href.trim()).ok()?;
                matches!(url.scheme(), "http" | "https")
                    .then(|| (url, element_text(a).to_lowercase()))
            })
            .collect()
    }
}

/// Resolve `raw` against `base`, keeping only http(s) results.
pub fn absolute_url(base: &Url, raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() || raw.starts_with("data:") {
        return None;
    }
    let url = base.join(raw).ok()?;
    matches!(url.scheme(), "http" | "https").then(|| url.to_string())
}

fn select_all<'a>(scope: ElementRef<'a>, css: &str) -> Vec<ElementRef<'a>> {
    match Selector::parse(css) {
        Ok(selector) => scope.select(&selector).collect(),
        Err(_) => Vec::new(),
    }
}

/// Drop elements nested inside another element of the same list.
fn outermost(elements: Vec<ElementRef<'_>>) -> Vec<ElementRef<'_>> {
    let ids: Vec<_> = elements.iter().map(|el| el.id()).collect();
    elements
        .into_iter()
        .filter(|el| !el.ancestors().any(|a| ids.contains(&a.id())))
        .collect()
}

fn element_text(el: ElementRef<'_>) -> String {
    collapse_whitespace(&el.text().collect::<Vec<_>>().join(" "))
}

/// Lowercased class, id and name attributes.
fn hint(el: ElementRef<'_>) -> String {
    let value = el.value();
    format!(
        "{} {} {}",
        value.attr("class").unwrap_or_default(),
        value.id().unwrap_or_default(),
        value.attr("name").unwrap_or_default()
    )
    .to_lowercase()
}

fn in_chrome(el: ElementRef<'_>) -> bool {
    el.ancestors().any(|a| {
        a.value()
            .as_element()
            .is_some_and(|e| CHROME_TAGS.contains(&e.name()))
    })
}

fn image_src(img: ElementRef<'_>) -> Option<&str> {
    let value = img.value();
    value
        .attr("src")
        .filter(|s| !s.trim().is_empty() && !s.starts_with("data:"))
        .or_else(|| value.attr("data-src"))
}

/// Numeric `width`/`height` attribute, tolerating a `px` suffix.
fn dimension(img: ElementRef<'_>, attr: &str) -> Option<u64> {
    img.value()
        .attr(attr)?
        .trim()
        .trim_end_matches("px")
        .parse()
        .ok()
}

fn is_item_element(el: ElementRef<'_>) -> bool {
    el.value().classes().any(|class| {
        let class = class.to_ascii_lowercase();
        class == "item"
            || class == "dish"
            || class.ends_with("-item")
            || class.ends_with("_item")
            || class.ends_with("__item")
    })
}

fn is_review_element(el: ElementRef<'_>) -> bool {
    if el.value().attr("itemprop") == Some("review") {
        return true;
    }
    el.value().classes().any(|class| {
        let class = class.to_ascii_lowercase();
        class == "review"
            || class == "testimonial"
            || class.ends_with("-review")
            || class.ends_with("-testimonial")
            || ((class.starts_with("review") || class.starts_with("testimonial"))
                && ["item", "card", "entry"].iter().any(|s| class.ends_with(s)))
    })
}

fn parse_review(el: ElementRef<'_>) -> Option<Review> {
    let text = select_all(
        el,
        r#"blockquote, p, [class*="text"], [class*="body"], [itemprop="reviewBody"]"#,
    )
    .into_iter()
    .map(element_text)
    .find(|t| t.chars().count() >= REVIEW_MIN_TEXT)
    .or_else(|| Some(element_text(el)).filter(|t| t.chars().count() >= REVIEW_MIN_TEXT))?;

    let author = select_all(el, r#"[class*="author"], [itemprop="author"], cite"#)
        .into_iter()
        .map(element_text)
        .map(|t| t.trim_start_matches(['-', '–', '—', ' ']).to_string())
        .find(|t| !t.is_empty());

    let source = select_all(el, r#"[class*="source"]"#)
        .into_iter()
        .map(element_text)
        .find(|t| !t.is_empty());

    Some(Review {
        source,
        text,
        rating: review_rating(el),
        author,
    })
}

fn review_rating(el: ElementRef<'_>) -> Option<u8> {
    let from_attr = std::iter::once(el)
        .chain(select_all(el, r#"[data-rating], [class*="rating"], [class*="stars"]"#))
        .find_map(|node| {
            let value = node.value();
            let raw = value
                .attr("data-rating")
                .or_else(|| value.attr("aria-label"))
                .or_else(|| value.attr("title"))
                .map(str::to_string)
                .or_else(|| {
                    let h = hint(node);
                    (h.contains("rating") || h.contains("stars")).then(|| element_text(node))
                })?;
            let stars = raw.matches('★').count();
            if (1..=5).contains(&stars) {
                return Some(stars as u8);
            }
            RATING
                .captures(&raw)
                .and_then(|c| c[1].parse::<u8>().ok())
        });
    from_attr.filter(|r| (1..=5).contains(r))
}

fn host_matches(host: &str, domains: &[&str]) -> bool {
    let host = host.trim_start_matches("www.");
    domains
        .iter()
        .any(|d| host == *d || host.ends_with(&format!(".{}", d)))
}
