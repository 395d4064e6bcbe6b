//! Read-only catalogue endpoints
//!
//! GET /api/stats, /api/meals, /api/meals/:id, /api/breakdown/*, /api/logs

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::error::{ApiError, ApiResult};
use crate::models::{BreakdownEntry, EntityCounts, MealFilter, RecipeDetail, StoredLogEntry, StoredRecipe};
use crate::AppState;

const DEFAULT_LOG_LIMIT: i64 = 20;
const MAX_LOG_LIMIT: i64 = 500;

/// Query parameters for GET /api/logs
#[derive(Debug, Deserialize)]
pub struct LogQuery {
    pub limit: Option<i64>,
}

/// GET /api/stats
pub async fn get_stats(State(state): State<AppState>) -> ApiResult<Json<EntityCounts>> {
    Ok(Json(state.repository.get_stats().await?))
}

/// GET /api/meals?category=&area=&name=&limit=&offset=
pub async fn list_meals(
    State(state): State<AppState>,
    Query(filter): Query<MealFilter>,
) -> ApiResult<Json<Vec<StoredRecipe>>> {
    Ok(Json(state.repository.query_meals(&filter).await?))
}

/// GET /api/meals/:id
///
/// One recipe with its ingredient lines in slot order.
pub async fn get_meal(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<RecipeDetail>> {
    let meal = state
        .repository
        .get_meal(&id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Meal {}", id)))?;

    let ingredients = state.repository.ingredients_for(&id).await?;

    Ok(Json(RecipeDetail { meal, ingredients }))
}

/// GET /api/breakdown/categories
pub async fn category_breakdown(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<BreakdownEntry>>> {
    Ok(Json(state.repository.category_breakdown().await?))
}

/// GET /api/breakdown/areas
pub async fn area_breakdown(State(state): State<AppState>) -> ApiResult<Json<Vec<BreakdownEntry>>> {
    Ok(Json(state.repository.area_breakdown().await?))
}

/// GET /api/logs?limit=
///
/// Most recent entries first.
pub async fn recent_logs(
    State(state): State<AppState>,
    Query(query): Query<LogQuery>,
) -> ApiResult<Json<Vec<StoredLogEntry>>> {
    let limit = query.limit.unwrap_or(DEFAULT_LOG_LIMIT);
    if !(1..=MAX_LOG_LIMIT).contains(&limit) {
        return Err(ApiError::BadRequest(format!(
            "limit must be between 1 and {}",
            MAX_LOG_LIMIT
        )));
    }

    Ok(Json(state.repository.recent_logs(limit).await?))
}

/// Build catalogue routes
pub fn meal_routes() -> Router<AppState> {
    Router::new()
        .route("/api/stats", get(get_stats))
        .route("/api/meals", get(list_meals))
        .route("/api/meals/:id", get(get_meal))
        .route("/api/breakdown/categories", get(category_breakdown))
        .route("/api/breakdown/areas", get(area_breakdown))
        .route("/api/logs", get(recent_logs))
}
