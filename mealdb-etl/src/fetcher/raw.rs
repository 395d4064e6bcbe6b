//! Raw records as returned by the remote recipe API
//!
//! Every field is optional text. Values are kept as delivered (no trimming);
//! normalization happens in the transformer. Numbers and booleans are
//! accepted and rendered as text so a loosely typed payload still decodes.

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::collections::BTreeMap;

/// Number of fixed ingredient slots in a full recipe record
pub const INGREDIENT_SLOTS: usize = 20;

/// Decode any scalar as text; `null` becomes `None`
fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(value_to_text))
}

fn value_to_text(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

/// One `strIngredientN` / `strMeasureN` pair
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngredientSlot {
    pub ingredient: Option<String>,
    pub measure: Option<String>,
}

/// Full recipe record (`random.php`, `lookup.php`, `search.php`)
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "RawMealWire")]
pub struct RawMeal {
    pub id: Option<String>,
    pub name: Option<String>,
    pub category: Option<String>,
    pub area: Option<String>,
    pub instructions: Option<String>,
    pub thumbnail: Option<String>,
    pub tags: Option<String>,
    pub youtube: Option<String>,
    pub source: Option<String>,
    pub image_source: Option<String>,
    pub creative_commons_confirmed: Option<String>,
    pub date_modified: Option<String>,
    /// Slot `n` lives at index `n - 1`
    pub ingredients: [IngredientSlot; INGREDIENT_SLOTS],
}

impl RawMeal {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            name: Some(name.into()),
            ..Default::default()
        }
    }

    /// Fill a 1-based ingredient slot; out-of-range slots are ignored
    pub fn with_ingredient(mut self, slot: usize, ingredient: &str, measure: &str) -> Self {
        if (1..=INGREDIENT_SLOTS).contains(&slot) {
            self.ingredients[slot - 1] = IngredientSlot {
                ingredient: Some(ingredient.to_string()),
                measure: Some(measure.to_string()),
            };
        }
        self
    }

    /// Identifier with surrounding whitespace removed, if present
    pub fn trimmed_id(&self) -> Option<&str> {
        self.id.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}

#[derive(Deserialize)]
struct RawMealWire {
    #[serde(rename = "idMeal", default, deserialize_with = "lenient_text")]
    id: Option<String>,
    #[serde(rename = "strMeal", default, deserialize_with = "lenient_text")]
    name: Option<String>,
    #[serde(rename = "strCategory", default, deserialize_with = "lenient_text")]
    category: Option<String>,
    #[serde(rename = "strArea", default, deserialize_with = "lenient_text")]
    area: Option<String>,
    #[serde(rename = "strInstructions", default, deserialize_with = "lenient_text")]
    instructions: Option<String>,
    #[serde(rename = "strMealThumb", default, deserialize_with = "lenient_text")]
    thumbnail: Option<String>,
    #[serde(rename = "strTags", default, deserialize_with = "lenient_text")]
    tags: Option<String>,
    #[serde(rename = "strYoutube", default, deserialize_with = "lenient_text")]
    youtube: Option<String>,
    #[serde(rename = "strSource", default, deserialize_with = "lenient_text")]
    source: Option<String>,
    #[serde(rename = "strImageSource", default, deserialize_with = "lenient_text")]
    image_source: Option<String>,
    #[serde(
        rename = "strCreativeCommonsConfirmed",
        default,
        deserialize_with = "lenient_text"
    )]
    creative_commons_confirmed: Option<String>,
    #[serde(rename = "dateModified", default, deserialize_with = "lenient_text")]
    date_modified: Option<String>,
    /// Numbered ingredient and measure keys
    #[serde(flatten)]
    rest: BTreeMap<String, Value>,
}

impl From<RawMealWire> for RawMeal {
    fn from(mut wire: RawMealWire) -> Self {
        let mut ingredients: [IngredientSlot; INGREDIENT_SLOTS] = Default::default();
        for (index, slot) in ingredients.iter_mut().enumerate() {
            let n = index + 1;
            slot.ingredient = wire
                .rest
                .remove(&format!("strIngredient{}", n))
                .and_then(value_to_text);
            slot.measure = wire
                .rest
                .remove(&format!("strMeasure{}", n))
                .and_then(value_to_text);
        }

        RawMeal {
            id: wire.id,
            name: wire.name,
            category: wire.category,
            area: wire.area,
            instructions: wire.instructions,
            thumbnail: wire.thumbnail,
            tags: wire.tags,
            youtube: wire.youtube,
            source: wire.source,
            image_source: wire.image_source,
            creative_commons_confirmed: wire.creative_commons_confirmed,
            date_modified: wire.date_modified,
            ingredients,
        }
    }
}

/// Light record returned by `filter.php`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MealSummary {
    #[serde(rename = "idMeal", default, deserialize_with = "lenient_text")]
    pub id: Option<String>,
    #[serde(rename = "strMeal", default, deserialize_with = "lenient_text")]
    pub name: Option<String>,
    #[serde(rename = "strMealThumb", default, deserialize_with = "lenient_text")]
    pub thumbnail: Option<String>,
}

/// Entry of `categories.php`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RawCategory {
    #[serde(rename = "idCategory", default, deserialize_with = "lenient_text")]
    pub id: Option<String>,
    #[serde(rename = "strCategory", default, deserialize_with = "lenient_text")]
    pub name: Option<String>,
    #[serde(rename = "strCategoryThumb", default, deserialize_with = "lenient_text")]
    pub thumbnail: Option<String>,
    #[serde(
        rename = "strCategoryDescription",
        default,
        deserialize_with = "lenient_text"
    )]
    pub description: Option<String>,
}

/// Entry of `list.php?a=list`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RawArea {
    #[serde(rename = "strArea", default, deserialize_with = "lenient_text")]
    pub name: Option<String>,
}

/// `{"meals": [...] | null}`
#[derive(Debug, Deserialize)]
pub struct MealsEnvelope<T> {
    pub meals: Option<Vec<T>>,
}

impl<T> MealsEnvelope<T> {
    pub fn into_vec(self) -> Vec<T> {
        self.meals.unwrap_or_default()
    }
}

/// `{"categories": [...] | null}`
#[derive(Debug, Deserialize)]
pub struct CategoriesEnvelope {
    #[serde(default)]
    pub categories: Option<Vec<RawCategory>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_full_record_decodes_slots() {
        let payload = json!({
            "idMeal": "52772",
            "strMeal": "Teriyaki Chicken Casserole",
            "strCategory": "Chicken",
            "strArea": "Japanese",
            "strTags": null,
            "strIngredient1": "soy sauce",
            "strMeasure1": "3/4 cup",
            "strIngredient2": "",
            "strMeasure2": "",
            "strIngredient3": "water",
            "strMeasure3": "1/2 cup",
            "strIngredient4": null,
            "dateModified": null
        });

        let meal: RawMeal = serde_json::from_value(payload).unwrap();
        assert_eq!(meal.id.as_deref(), Some("52772"));
        assert_eq!(meal.area.as_deref(), Some("Japanese"));
        assert_eq!(meal.tags, None);
        assert_eq!(meal.ingredients[0].ingredient.as_deref(), Some("soy sauce"));
        assert_eq!(meal.ingredients[1].ingredient.as_deref(), Some(""));
        assert_eq!(meal.ingredients[2].measure.as_deref(), Some("1/2 cup"));
        assert_eq!(meal.ingredients[3].ingredient, None);
        assert_eq!(meal.ingredients[19], IngredientSlot::default());
    }

    #[test]
    fn test_numeric_id_accepted() {
        let meal: RawMeal = serde_json::from_value(json!({"idMeal": 52772, "strMeal": "X"})).unwrap();
        assert_eq!(meal.id.as_deref(), Some("52772"));
    }

    #[test]
    fn test_null_envelope_is_empty() {
        let envelope: MealsEnvelope<RawMeal> =
            serde_json::from_value(json!({"meals": null})).unwrap();
        assert!(envelope.into_vec().is_empty());

        let envelope: MealsEnvelope<MealSummary> = serde_json::from_value(json!({})).unwrap();
        assert!(envelope.into_vec().is_empty());
    }

    #[test]
    fn test_builder_ignores_out_of_range_slot() {
        let meal = RawMeal::new("1", "Soup")
            .with_ingredient(0, "salt", "pinch")
            .with_ingredient(21, "pepper", "pinch")
            .with_ingredient(20, "water", "1 l");
        assert!(meal.ingredients[..19].iter().all(|s| s.ingredient.is_none()));
        assert_eq!(meal.ingredients[19].ingredient.as_deref(), Some("water"));
    }

    #[test]
    fn test_trimmed_id() {
        let mut meal = RawMeal::new("  42 ", "Stew");
        assert_eq!(meal.trimmed_id(), Some("42"));
        meal.id = Some("   ".into());
        assert_eq!(meal.trimmed_id(), None);
    }
}
