//! Transformer: raw API records to normalized entities
//!
//! Free text is trimmed, whitespace runs collapse to one space and HTML
//! tags are removed. Empty strings and the `null` / `none` sentinels are
//! treated as absent. URLs are only trimmed.

use crate::error::{EtlError, EtlResult};
use crate::fetcher::{RawArea, RawCategory, RawMeal};
use crate::models::{CategoryInfo, IngredientLine, Recipe};
use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;
use std::sync::LazyLock;
use tracing::warn;

/// Whether a trimmed value stands for "no value"
fn is_sentinel(value: &str) -> bool {
    value.is_empty() || value.eq_ignore_ascii_case("null") || value.eq_ignore_ascii_case("none")
}

/// `<...>` tags (at least one character between the brackets)
static HTML_TAG_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]+>").expect("Invalid HTML tag regex"));

fn strip_tags(text: &str) -> String {
    HTML_TAG_REGEX.replace_all(text, "").into_owned()
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalize a free-text field
pub fn clean_text(value: Option<&str>) -> Option<String> {
    let value = value?.trim();
    if is_sentinel(value) {
        return None;
    }
    let cleaned = collapse_whitespace(&strip_tags(value));
    if is_sentinel(&cleaned) {
        None
    } else {
        Some(cleaned)
    }
}

/// Normalize a URL or code-like field (trim and sentinels only)
pub fn clean_plain(value: Option<&str>) -> Option<String> {
    let value = value?.trim();
    if is_sentinel(value) {
        None
    } else {
        Some(value.to_string())
    }
}

/// Split a comma-delimited tag string into trimmed, non-empty tokens
pub fn split_tags(value: Option<&str>) -> Vec<String> {
    match clean_text(value) {
        Some(tags) => tags
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect(),
        None => Vec::new(),
    }
}

/// Parse `YYYY-MM-DD HH:MM:SS` or `YYYY-MM-DD` (midnight)
///
/// Unparseable input yields `None` with a warning.
pub fn parse_date_modified(value: Option<&str>) -> Option<NaiveDateTime> {
    let value = clean_plain(value)?;

    if let Ok(ts) = NaiveDateTime::parse_from_str(&value, "%Y-%m-%d %H:%M:%S") {
        return Some(ts);
    }
    if let Some(ts) = NaiveDate::parse_from_str(&value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
    {
        return Some(ts);
    }

    warn!("Could not parse date: {}", value);
    None
}

/// Walk all ingredient slots; one line per slot with a usable name
fn extract_ingredients(meal_id: &str, raw: &RawMeal) -> Vec<IngredientLine> {
    raw.ingredients
        .iter()
        .enumerate()
        .filter_map(|(index, slot)| {
            let name = clean_text(slot.ingredient.as_deref())?;
            Some(IngredientLine {
                meal_id: meal_id.to_string(),
                name,
                measurement: clean_text(slot.measure.as_deref()),
                position: (index + 1) as u32,
            })
        })
        .collect()
}

/// Convert one raw record into a recipe and its ingredient lines
///
/// Fails with `EtlError::Validation` when the identifier or name is missing.
pub fn transform_meal(raw: &RawMeal) -> EtlResult<(Recipe, Vec<IngredientLine>)> {
    let id = clean_plain(raw.id.as_deref())
        .ok_or_else(|| EtlError::Validation("Record has no meal id".to_string()))?;

    let name = clean_text(raw.name.as_deref())
        .ok_or_else(|| EtlError::Validation(format!("Meal {} has no name", id)))?;

    let ingredients = extract_ingredients(&id, raw);

    let recipe = Recipe {
        name,
        category: clean_text(raw.category.as_deref()),
        area: clean_text(raw.area.as_deref()),
        instructions: clean_text(raw.instructions.as_deref()),
        thumbnail: clean_plain(raw.thumbnail.as_deref()),
        tags: split_tags(raw.tags.as_deref()),
        youtube: clean_plain(raw.youtube.as_deref()),
        source: clean_plain(raw.source.as_deref()),
        image_source: clean_plain(raw.image_source.as_deref()),
        creative_commons_confirmed: clean_text(raw.creative_commons_confirmed.as_deref()),
        date_modified: parse_date_modified(raw.date_modified.as_deref()),
        id,
    };

    Ok((recipe, ingredients))
}

/// Category reference entry, `None` when it has no name
pub fn transform_category(raw: &RawCategory) -> Option<CategoryInfo> {
    Some(CategoryInfo {
        name: clean_text(raw.name.as_deref())?,
        thumbnail: clean_plain(raw.thumbnail.as_deref()),
        description: clean_text(raw.description.as_deref()),
    })
}

/// Area name, `None` when blank
pub fn transform_area(raw: &RawArea) -> Option<String> {
    clean_text(raw.name.as_deref())
}
