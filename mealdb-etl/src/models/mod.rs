//! Data models for mealdb-etl

pub mod operation_log;
pub mod recipe;

pub use operation_log::{OperationKind, OperationLogEntry, RunStatus, StoredLogEntry};
pub use recipe::{
    CategoryInfo, IngredientLine, MealFilter, Recipe, RecipeDetail, StoredRecipe, UpsertOutcome,
    DEFAULT_QUERY_LIMIT,
};

use serde::Serialize;

/// One table as found in the live database
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableSummary {
    pub name: String,
    pub columns: Vec<String>,
}

/// Row counts per stored entity
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EntityCounts {
    pub meals: i64,
    pub ingredients: i64,
    pub categories: i64,
    pub areas: i64,
    pub etl_logs: i64,
}

/// Recipe count for one category or area
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BreakdownEntry {
    pub name: String,
    pub count: i64,
}
