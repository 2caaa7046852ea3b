//! Dietary tag detection from free text.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::types::DietaryTag;

static DIETARY_PATTERNS: LazyLock<Vec<(DietaryTag, Regex)>> = LazyLock::new(|| {
    [
        (DietaryTag::Vegetarian, r"(?i)\bvegetarian\b|\(v\)"),
        (DietaryTag::Vegan, r"(?i)\bvegan\b|\(vg\)"),
        (DietaryTag::GlutenFree, r"(?i)\bgluten[\s-]?free\b|\(gf\)"),
        (DietaryTag::DairyFree, r"(?i)\bdairy[\s-]?free\b|\(df\)"),
        (DietaryTag::NutFree, r"(?i)\bnut[\s-]?free\b"),
        (DietaryTag::Spicy, r"(?i)\bspicy\b|🌶"),
        (DietaryTag::Halal, r"(?i)\bhalal\b"),
        (DietaryTag::Kosher, r"(?i)\bkosher\b"),
    ]
    .into_iter()
    .map(|(tag, pattern)| (tag, Regex::new(pattern).unwrap()))
    .collect()
});

/// Tags whose keyword or marker appears in any of `texts`.
pub fn detect<'a>(texts: impl IntoIterator<Item = &'a str>) -> BTreeSet<DietaryTag> {
    let mut tags = BTreeSet::new();
    for text in texts {
        for (tag, pattern) in DIETARY_PATTERNS.iter() {
            if pattern.is_match(text) {
                tags.insert(*tag);
            }
        }
    }
    tags
}

/// Map a schema.org `suitableForDiet` value to a tag.
pub fn from_schema_diet(value: &str) -> Option<DietaryTag> {
    let name = value.rsplit('/').next().unwrap_or(value);
    match name {
        "VegetarianDiet" => Some(DietaryTag::Vegetarian),
        "VeganDiet" => Some(DietaryTag::Vegan),
        "GlutenFreeDiet" => Some(DietaryTag::GlutenFree),
        "HalalDiet" => Some(DietaryTag::Halal),
        "KosherDiet" => Some(DietaryTag::Kosher),
        _ => None,
    }
}

/// `None` for an empty set so absent tags serialize as an omitted field.
pub fn into_field(tags: BTreeSet<DietaryTag>) -> Option<Vec<DietaryTag>> {
    if tags.is_empty() {
        None
    } else {
        Some(tags.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detects_keywords_and_markers() {
        let tags = detect(["Garden Salad (V) (GF)", "Tossed with a spicy vinaigrette"]);
        assert_eq!(
            into_field(tags),
            Some(vec![
                DietaryTag::Vegetarian,
                DietaryTag::GlutenFree,
                DietaryTag::Spicy
            ])
        );
    }

    #[test]
    fn test_vegetarian_is_not_vegan() {
        let tags = detect(["Vegetarian lasagna"]);
        assert!(tags.contains(&DietaryTag::Vegetarian));
        assert!(!tags.contains(&DietaryTag::Vegan));
    }

    #[test]
    fn test_no_tags_is_none() {
        assert_eq!(into_field(detect(["Ribeye steak"])), None);
    }

    #[test]
    fn test_schema_diet_urls() {
        assert_eq!(
            from_schema_diet("https://schema.org/VeganDiet"),
            Some(DietaryTag::Vegan)
        );
        assert_eq!(from_schema_diet("LowSaltDiet"), None);
    }
}
