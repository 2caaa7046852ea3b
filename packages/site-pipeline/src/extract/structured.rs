//! JSON-LD business metadata.
//!
//! Finds the first restaurant or local-business node in any
//! `application/ld+json` block and lifts the fields we care about out of
//! it. Blocks may hold a single object, an array, or an `@graph` container.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};
use serde_json::Value;
use tracing::{debug, warn};

use super::dietary;
use crate::types::{Address, MenuCategory, MenuItem, Review};

/// schema.org types treated as a business listing.
pub const BUSINESS_TYPES: &[&str] = &[
    "Restaurant",
    "FoodEstablishment",
    "LocalBusiness",
    "CafeOrCoffeeShop",
    "BarOrPub",
    "Bakery",
    "FastFoodRestaurant",
    "IceCreamShop",
    "Winery",
    "Brewery",
];

static JSON_LD: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"script[type="application/ld+json"]"#).unwrap());

/// `Mo-Fr 11:00-22:00`, `Sa,Su 10:00-14:00`, `Mo 09:00-17:00`
static OPENING_HOURS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*([A-Za-z]{2}(?:\s*[-,]\s*[A-Za-z]{2})*)\s+(\d{1,2}:\d{2})\s*-\s*(\d{1,2}:\d{2})\s*$")
        .unwrap()
});

/// Fields lifted from a business node. Values are raw (URLs unresolved).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BusinessMetadata {
    pub name: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub images: Vec<String>,
    pub logo: Option<String>,
    pub telephone: Option<String>,
    pub email: Option<String>,
    pub address: Option<Address>,
    /// One `Day: open - close` line per entry.
    pub hours_lines: Vec<String>,
    pub menu: Vec<MenuCategory>,
    pub reviews: Vec<Review>,
    pub same_as: Vec<String>,
    pub reservation_url: Option<String>,
}

/// Parse every JSON-LD block and return the first business node found.
pub fn find_business(document: &Html) -> Option<BusinessMetadata> {
    for script in document.select(&JSON_LD) {
        let raw: String = script.text().collect();
        let value: Value = match serde_json::from_str(raw.trim()) {
            Ok(value) => value,
            Err(e) => {
                warn!(error = %e, "Skipping unparseable JSON-LD block");
                continue;
            }
        };

        if let Some(node) = find_business_node(&value) {
            let business = BusinessMetadata::from_node(node);
            debug!(name = ?business.name, "Found structured business metadata");
            return Some(business);
        }
    }
    None
}

fn find_business_node(value: &Value) -> Option<&Value> {
    match value {
        Value::Array(items) => items.iter().find_map(find_business_node),
        Value::Object(map) => {
            if is_business(value) {
                Some(value)
            } else {
                map.get("@graph").and_then(find_business_node)
            }
        }
        _ => None,
    }
}

fn is_business(node: &Value) -> bool {
    let matches = |t: &str| {
        let t = t.rsplit('/').next().unwrap_or(t);
        BUSINESS_TYPES.contains(&t)
    };
    match node.get("@type") {
        Some(Value::String(t)) => matches(t.as_str()),
        Some(Value::Array(types)) => types.iter().filter_map(Value::as_str).any(matches),
        _ => false,
    }
}

impl BusinessMetadata {
    fn from_node(node: &Value) -> Self {
        let images: Vec<String> = as_list(node.get("image"))
            .into_iter()
            .filter_map(image_url)
            .collect();

        Self {
            name: text(node, "name"),
            description: text(node, "description").or_else(|| text(node, "slogan")),
            image: images.first().cloned(),
            images,
            logo: node.get("logo").and_then(image_url),
            telephone: text(node, "telephone"),
            email: text(node, "email").map(|e| e.trim_start_matches("mailto:").to_string()),
            address: node.get("address").and_then(parse_address).map(|mut address| {
                if address.maps_url.is_none() {
                    address.maps_url = text(node, "hasMap");
                }
                address
            }),
            hours_lines: hours_lines(node),
            menu: as_list(node.get("hasMenu"))
                .into_iter()
                .flat_map(parse_menu)
                .collect(),
            reviews: as_list(node.get("review"))
                .into_iter()
                .filter_map(parse_review)
                .collect(),
            same_as: as_list(node.get("sameAs"))
                .into_iter()
                .filter_map(Value::as_str)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            reservation_url: text(node, "acceptsReservations")
                .filter(|v| v.starts_with("http://") || v.starts_with("https://")),
        }
    }
}

/// A value that may be a single item or an array of items.
fn as_list(value: Option<&Value>) -> Vec<&Value> {
    match value {
        Some(Value::Array(items)) => items.iter().collect(),
        Some(Value::Null) | None => Vec::new(),
        Some(other) => vec![other],
    }
}

fn text(node: &Value, key: &str) -> Option<String> {
    let value = match node.get(key)? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Object(obj) => obj.get("name")?.as_str()?.trim().to_string(),
        _ => return None,
    };
    (!value.is_empty()).then_some(value)
}

/// String URL, or an `ImageObject` with `url`/`contentUrl`.
fn image_url(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Object(_) => text(value, "url").or_else(|| text(value, "contentUrl")),
        Value::Array(items) => items.iter().find_map(image_url),
        _ => None,
    }
}

fn parse_address(value: &Value) -> Option<Address> {
    let address = match value {
        Value::String(s) if !s.trim().is_empty() => Address {
            street: Some(s.trim().to_string()),
            ..Default::default()
        },
        Value::Object(_) => Address {
            street: text(value, "streetAddress"),
            city: text(value, "addressLocality"),
            state: text(value, "addressRegion"),
            postal_code: text(value, "postalCode"),
            country: text(value, "addressCountry"),
            maps_url: None,
        },
        Value::Array(items) => return items.iter().find_map(parse_address),
        _ => return None,
    };
    (!address.is_empty()).then_some(address)
}

fn hours_lines(node: &Value) -> Vec<String> {
    let mut lines = Vec::new();

    for spec in as_list(node.get("openingHoursSpecification")) {
        let (Some(opens), Some(closes)) = (text(spec, "opens"), text(spec, "closes")) else {
            continue;
        };
        for day in as_list(spec.get("dayOfWeek"))
            .into_iter()
            .filter_map(Value::as_str)
        {
            let day = day.rsplit('/').next().unwrap_or(day);
            lines.push(format!("{}: {} - {}", day, opens, closes));
        }
    }

    if lines.is_empty() {
        for entry in as_list(node.get("openingHours"))
            .into_iter()
            .filter_map(Value::as_str)
        {
            lines.extend(expand_opening_hours(entry));
        }
    }

    lines
}

/// Expand a schema.org `openingHours` shorthand into hours lines.
fn expand_opening_hours(entry: &str) -> Vec<String> {
    let Some(caps) = OPENING_HOURS.captures(entry) else {
        return vec![entry.trim().to_string()];
    };
    let (days, opens, closes) = (&caps[1], &caps[2], &caps[3]);

    days.split(',')
        .filter_map(|part| {
            let mut ends = part.split('-').map(|d| day_from_code(d.trim()));
            match (ends.next().flatten(), ends.next()) {
                (Some(first), None) => Some(format!("{}: {} - {}", first, opens, closes)),
                (Some(first), Some(Some(last))) => {
                    Some(format!("{} - {}: {} - {}", first, last, opens, closes))
                }
                _ => None,
            }
        })
        .collect()
}

fn day_from_code(code: &str) -> Option<&'static str> {
    match code.to_ascii_lowercase().as_str() {
        "mo" => Some("Monday"),
        "tu" => Some("Tuesday"),
        "we" => Some("Wednesday"),
        "th" => Some("Thursday"),
        "fr" => Some("Friday"),
        "sa" => Some("Saturday"),
        "su" => Some("Sunday"),
        _ => None,
    }
}

fn parse_menu(menu: &Value) -> Vec<MenuCategory> {
    // hasMenu may just be a link to a menu page.
    if !menu.is_object() {
        return Vec::new();
    }

    let mut categories: Vec<MenuCategory> = as_list(menu.get("hasMenuSection"))
        .into_iter()
        .filter_map(|section| {
            let items = parse_items(section);
            (!items.is_empty()).then(|| MenuCategory {
                name: text(section, "name").unwrap_or_else(|| "Menu".to_string()),
                items,
            })
        })
        .collect();

    let loose_items = parse_items(menu);
    if !loose_items.is_empty() {
        categories.push(MenuCategory {
            name: text(menu, "name").unwrap_or_else(|| "Menu".to_string()),
            items: loose_items,
        });
    }

    categories
}

fn parse_items(container: &Value) -> Vec<MenuItem> {
    as_list(container.get("hasMenuItem"))
        .into_iter()
        .filter_map(|item| {
            let name = text(item, "name")?;
            let description = text(item, "description");

            let mut tags = dietary::detect(
                std::iter::once(name.as_str()).chain(description.as_deref()),
            );
            tags.extend(
                as_list(item.get("suitableForDiet"))
                    .into_iter()
                    .filter_map(Value::as_str)
                    .filter_map(dietary::from_schema_diet),
            );

            Some(MenuItem {
                price: as_list(item.get("offers")).into_iter().find_map(offer_price),
                image: item.get("image").and_then(image_url),
                dietary: dietary::into_field(tags),
                description,
                name,
            })
        })
        .collect()
}

fn offer_price(offer: &Value) -> Option<String> {
    let price = text(offer, "price")?;
    let currency = text(offer, "priceCurrency");
    Some(match currency.as_deref() {
        Some("USD") if !price.starts_with('$') => format!("${}", price),
        Some(code) if code != "USD" => format!("{} {}", price, code),
        _ => price,
    })
}

fn parse_review(review: &Value) -> Option<Review> {
    let body = text(review, "reviewBody").or_else(|| text(review, "description"))?;
    let rating = review
        .get("reviewRating")
        .and_then(|r| r.get("ratingValue"))
        .and_then(|v| match v {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        })
        .map(f64::round)
        .filter(|r| (1.0..=5.0).contains(r))
        .map(|r| r as u8);

    Some(Review {
        source: text(review, "publisher"),
        text: body,
        rating,
        author: text(review, "author"),
    })
}
