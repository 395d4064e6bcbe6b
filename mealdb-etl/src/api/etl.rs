//! Pipeline trigger endpoints
//!
//! POST /api/etl/incremental, POST /api/etl/search
//!
//! Runs execute inline. Only one run may write at a time; a request that
//! arrives while another run holds the pipeline gets 409.

use axum::{extract::State, routing::post, Json, Router};
use serde::Deserialize;

use crate::error::{ApiError, ApiResult};
use crate::fetcher::SearchType;
use crate::pipeline::RunOutcome;
use crate::AppState;

/// Default draw count for dashboard-triggered incremental runs
const DEFAULT_INCREMENTAL_COUNT: usize = 5;

/// Largest draw count accepted from the dashboard
const MAX_DASHBOARD_COUNT: usize = 100;

/// POST /api/etl/incremental request
#[derive(Debug, Deserialize)]
pub struct IncrementalRequest {
    #[serde(default)]
    pub count: Option<usize>,
}

/// POST /api/etl/search request
#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub term: String,
    #[serde(rename = "type", default = "default_search_type")]
    pub search_type: SearchType,
    /// Skip recipes already stored
    #[serde(default)]
    pub incremental: bool,
}

fn default_search_type() -> SearchType {
    SearchType::Name
}

/// POST /api/etl/incremental
pub async fn run_incremental(
    State(state): State<AppState>,
    Json(request): Json<IncrementalRequest>,
) -> ApiResult<Json<RunOutcome>> {
    let count = request.count.unwrap_or(DEFAULT_INCREMENTAL_COUNT);
    if !(1..=MAX_DASHBOARD_COUNT).contains(&count) {
        return Err(ApiError::BadRequest(format!(
            "count must be between 1 and {}",
            MAX_DASHBOARD_COUNT
        )));
    }

    let pipeline = state
        .pipeline
        .try_lock()
        .map_err(|_| ApiError::Conflict("A pipeline run is already in progress".to_string()))?;

    Ok(Json(pipeline.run_incremental(count).await?))
}

/// POST /api/etl/search
pub async fn run_search(
    State(state): State<AppState>,
    Json(request): Json<SearchRequest>,
) -> ApiResult<Json<RunOutcome>> {
    let pipeline = state
        .pipeline
        .try_lock()
        .map_err(|_| ApiError::Conflict("A pipeline run is already in progress".to_string()))?;

    let outcome = if request.incremental {
        pipeline
            .run_incremental_search(&request.term, request.search_type)
            .await?
    } else {
        pipeline.run_search(&request.term, request.search_type).await?
    };

    Ok(Json(outcome))
}

/// Build pipeline trigger routes
pub fn etl_routes() -> Router<AppState> {
    Router::new()
        .route("/api/etl/incremental", post(run_incremental))
        .route("/api/etl/search", post(run_search))
}
