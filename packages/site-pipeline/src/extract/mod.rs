//! HTML to `ScrapedData`.
//!
//! Each field is resolved on its own by walking the ordered sources in
//! [`strategy`]: structured business metadata, social preview tags, DOM
//! heuristics and finally regexes over the page text. Extraction only fails
//! when the input is not HTML at all.

mod dietary;
pub mod dom;
pub mod meta;
pub mod strategy;
pub mod structured;
pub mod text;

use std::sync::LazyLock;

use regex::Regex;
use scraper::Html;
use tracing::{debug, info};
use url::Url;

use crate::error::ExtractionError;
use crate::types::{Review, ScrapedData, SocialLinks, SocialPlatform};
use dom::{absolute_url, DomScanner, REVIEW_MIN_TEXT};
use meta::SocialMeta;
use strategy::*;
use structured::BusinessMetadata;

pub const MAX_IMAGES: usize = 30;
pub const MAX_REVIEWS: usize = 12;

static TAG_OPENER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<(?:[A-Za-z]|!)").unwrap());

/// Extract everything we can from `html`, resolving relative references
/// against `base_url`.
pub fn extract(html: &str, base_url: &Url) -> Result<ScrapedData, ExtractionError> {
    if html.trim().is_empty() {
        return Err(ExtractionError::EmptyDocument);
    }
    if !looks_like_markup(html) {
        return Err(ExtractionError::NotMarkup);
    }

    let document = Html::parse_document(html);
    let business = structured::find_business(&document);
    let meta = SocialMeta::from_document(&document);
    let dom = DomScanner::new(&document, base_url);
    let page_text = text::page_text(&document);

    let biz = business.as_ref();
    let from_biz = |f: fn(&BusinessMetadata) -> Option<String>| biz.and_then(f);

    let mut data = ScrapedData::new();

    data.name = resolve(NAME_SOURCES, |source| match source {
        Source::StructuredData => from_biz(|b| b.name.clone()),
        Source::SocialMeta => meta.name(),
        Source::Dom => dom.name(),
        Source::TextPattern => None,
    });

    data.tagline = resolve(TAGLINE_SOURCES, |source| match source {
        Source::StructuredData => from_biz(|b| b.description.clone()),
        Source::SocialMeta => meta.description.clone(),
        _ => None,
    });

    data.hero_image = resolve(HERO_SOURCES, |source| match source {
        Source::StructuredData => from_biz(|b| b.image.clone()).and_then(|u| absolute_url(base_url, &u)),
        Source::SocialMeta => meta.image.as_deref().and_then(|u| absolute_url(base_url, u)),
        Source::Dom => dom.hero_image(),
        Source::TextPattern => None,
    });

    data.logo = resolve(LOGO_SOURCES, |source| match source {
        Source::StructuredData => from_biz(|b| b.logo.clone()).and_then(|u| absolute_url(base_url, &u)),
        Source::Dom => dom.logo(),
        _ => None,
    });

    data.phone = resolve(PHONE_SOURCES, |source| match source {
        Source::StructuredData => from_biz(|b| b.telephone.clone()),
        Source::Dom => dom.phone(),
        Source::TextPattern => text::find_phone(&page_text),
        Source::SocialMeta => None,
    });

    data.email = resolve(EMAIL_SOURCES, |source| match source {
        Source::StructuredData => from_biz(|b| b.email.clone()),
        Source::Dom => dom.email(),
        Source::TextPattern => text::find_email(&page_text),
        Source::SocialMeta => None,
    });

    data.hours_text = resolve(HOURS_SOURCES, |source| match source {
        Source::StructuredData => biz
            .filter(|b| !b.hours_lines.is_empty())
            .map(|b| b.hours_lines.join("\n")),
        Source::Dom => dom.hours_text(),
        Source::TextPattern => text::find_hours(&page_text),
        Source::SocialMeta => None,
    });

    data.address = resolve(ADDRESS_SOURCES, |source| match source {
        Source::StructuredData => biz.and_then(|b| b.address.clone()),
        Source::Dom => dom.address(),
        _ => None,
    });

    data.menu = resolve(MENU_SOURCES, |source| match source {
        Source::StructuredData => biz.filter(|b| !b.menu.is_empty()).map(|b| b.menu.clone()),
        Source::Dom => dom.menu(),
        _ => None,
    })
    .map(|mut menu| {
        for item in menu.iter_mut().flat_map(|c| c.items.iter_mut()) {
            item.image = item.image.take().and_then(|u| absolute_url(base_url, &u));
        }
        menu
    });

    data.reviews = resolve(REVIEW_SOURCES, |source| match source {
        Source::StructuredData => biz.and_then(|b| keep_reviews(b.reviews.clone())),
        Source::Dom => dom.reviews().and_then(keep_reviews),
        _ => None,
    });

    data.sections = dom.sections();
    data.social = social_links(biz, &dom);

    data.reservation_url = resolve(RESERVATION_SOURCES, |source| match source {
        Source::StructuredData => from_biz(|b| b.reservation_url.clone()),
        Source::Dom => dom.reservation_url(),
        _ => None,
    });

    data.order_online_url = resolve(ORDER_ONLINE_SOURCES, |source| match source {
        Source::Dom => dom.order_online_url(),
        _ => None,
    });

    data.images = gallery(base_url, biz, &meta, &dom);
    data.theme_color = meta.theme_color.clone();

    info!(
        url = %base_url,
        structured = business.is_some(),
        fields = data.populated_fields(),
        "Extraction complete"
    );

    Ok(data)
}

/// Drop reviews too short to be useful and cap the count.
fn keep_reviews(reviews: Vec<Review>) -> Option<Vec<Review>> {
    let kept: Vec<Review> = reviews
        .into_iter()
        .filter(|r| r.text.chars().count() >= REVIEW_MIN_TEXT)
        .take(MAX_REVIEWS)
        .collect();
    (!kept.is_empty()).then_some(kept)
}

/// Per platform: structured `sameAs` first, then page anchors.
fn social_links(business: Option<&BusinessMetadata>, dom: &DomScanner) -> Option<SocialLinks> {
    let mut structured = SocialLinks::default();
    for link in business.map(|b| b.same_as.as_slice()).unwrap_or_default() {
        let platform = Url::parse(link)
            .ok()
            .and_then(|u| u.host_str().and_then(SocialPlatform::from_host));
        if let Some(platform) = platform {
            if structured.get(platform).is_none() {
                structured.set(platform, link.clone());
            }
        }
    }
    let anchors = dom.social();

    let mut links = SocialLinks::default();
    for platform in SocialPlatform::ALL {
        let url = resolve(SOCIAL_SOURCES, |source| match source {
            Source::StructuredData => structured.get(platform).cloned(),
            Source::Dom => anchors.get(platform).cloned(),
            _ => None,
        });
        if let Some(url) = url {
            debug!(platform = ?platform, url = %url, "Social link");
            links.set(platform, url);
        }
    }

    (!links.is_empty()).then_some(links)
}

/// Every image reference on the page, resolved, deduped by exact URL.
fn gallery(
    base_url: &Url,
    business: Option<&BusinessMetadata>,
    meta: &SocialMeta,
    dom: &DomScanner,
) -> Option<Vec<String>> {
    let candidates = business
        .map(|b| b.images.clone())
        .unwrap_or_default()
        .into_iter()
        .chain(meta.image.clone())
        .filter_map(|raw| absolute_url(base_url, &raw))
        .chain(dom.images());

    let mut images: Vec<String> = Vec::new();
    for url in candidates {
        if !images.contains(&url) {
            images.push(url);
        }
        if images.len() == MAX_IMAGES {
            break;
        }
    }

    (!images.is_empty()).then_some(images)
}

/// Any tag opener, comment or doctype.
fn looks_like_markup(input: &str) -> bool {
    TAG_OPENER.is_match(input)
}
