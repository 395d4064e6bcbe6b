//! Normalized recipe entities

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Default page size for recipe queries
pub const DEFAULT_QUERY_LIMIT: i64 = 100;

/// Upper bound on a single recipe query page
pub const MAX_QUERY_LIMIT: i64 = 1000;

/// Normalized recipe, keyed by its external identifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    /// External identifier (unique in the store)
    pub id: String,
    pub name: String,
    pub category: Option<String>,
    /// Area / cuisine
    pub area: Option<String>,
    pub instructions: Option<String>,
    pub thumbnail: Option<String>,
    /// Ordered tag list
    #[serde(default)]
    pub tags: Vec<String>,
    pub youtube: Option<String>,
    pub source: Option<String>,
    pub image_source: Option<String>,
    pub creative_commons_confirmed: Option<String>,
    pub date_modified: Option<NaiveDateTime>,
}

impl Recipe {
    /// Tags as stored (comma joined), `None` when there are none
    pub fn joined_tags(&self) -> Option<String> {
        if self.tags.is_empty() {
            None
        } else {
            Some(self.tags.join(","))
        }
    }

    /// Split a stored tag column back into the ordered list
    pub fn split_tags(stored: Option<&str>) -> Vec<String> {
        stored
            .map(|s| {
                s.split(',')
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// One ingredient slot of a recipe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngredientLine {
    /// Owning recipe identifier
    pub meal_id: String,
    pub name: String,
    pub measurement: Option<String>,
    /// 1-based slot number from the source record
    pub position: u32,
}

/// Recipe as persisted, with bookkeeping timestamps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRecipe {
    #[serde(flatten)]
    pub recipe: Recipe,
    pub created_at: String,
    pub updated_at: String,
}

/// Recipe with its ordered ingredient lines
#[derive(Debug, Clone, Serialize)]
pub struct RecipeDetail {
    #[serde(flatten)]
    pub meal: StoredRecipe,
    pub ingredients: Vec<IngredientLine>,
}

/// Outcome of a single upsert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

/// Recipe query filter
///
/// Category and area match exactly; name matches as a case-insensitive
/// substring. Results are ordered by name then identifier.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MealFilter {
    pub category: Option<String>,
    pub area: Option<String>,
    pub name: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl MealFilter {
    /// Effective page size, clamped to `1..=MAX_QUERY_LIMIT`
    pub fn effective_limit(&self) -> i64 {
        self.limit
            .unwrap_or(DEFAULT_QUERY_LIMIT)
            .clamp(1, MAX_QUERY_LIMIT)
    }

    pub fn effective_offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }
}

/// Category reference data from the remote category list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryInfo {
    pub name: String,
    pub thumbnail: Option<String>,
    pub description: Option<String>,
}
