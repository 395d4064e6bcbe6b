//! mealdb-etl library interface
//!
//! Recipe ETL: fetch from TheMealDB, normalize, upsert into SQLite or
//! MySQL, and serve a small dashboard over the stored data.

pub mod api;
pub mod error;
pub mod fetcher;
pub mod models;
pub mod pipeline;
pub mod repository;
pub mod transform;

pub use crate::error::{ApiError, ApiResult, EtlError, EtlResult};
pub use crate::pipeline::{Pipeline, RunOutcome, RunStats};
pub use crate::repository::Repository;

use axum::Router;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::signal;
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Application state shared across dashboard handlers
#[derive(Clone)]
pub struct AppState {
    /// Store for read-only endpoints
    pub repository: Repository,
    /// At most one pipeline run at a time
    pub pipeline: Arc<Mutex<Pipeline>>,
    /// Dashboard startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            repository: pipeline.repository().clone(),
            pipeline: Arc::new(Mutex::new(pipeline)),
            startup_time: Utc::now(),
        }
    }
}

/// Build dashboard router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        // UI routes (HTML pages)
        .merge(api::ui_routes())
        // API routes
        .merge(api::meal_routes())
        .merge(api::etl_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Resolves on Ctrl+C or SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received terminate signal, shutting down"),
    }
}
