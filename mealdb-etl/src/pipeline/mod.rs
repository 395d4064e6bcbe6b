//! Pipeline orchestrator: Fetcher -> Transformer -> Repository
//!
//! Every run appends exactly one operation log entry. Record-level errors
//! are tallied in `RunStats`; a batch-level error is logged as a `failure`
//! entry and then returned to the caller.

pub mod stats;

pub use stats::RunStats;

use crate::error::{EtlError, EtlResult};
use crate::fetcher::{fetch_records, FetchRequest, MealSource, SearchType};
use crate::models::{OperationKind, OperationLogEntry, RunStatus, UpsertOutcome};
use crate::repository::Repository;
use crate::transform::{transform_area, transform_category, transform_meal};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Result of one completed run
#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    pub operation: OperationKind,
    pub status: RunStatus,
    pub stats: RunStats,
    pub elapsed_secs: f64,
    /// Id of the appended log entry
    pub log_id: i64,
}

/// Options for one run
#[derive(Debug, Clone, Copy)]
struct RunOptions {
    skip_existing: bool,
    sync_reference: bool,
}

/// Pipeline over one source and one store
pub struct Pipeline {
    source: Arc<dyn MealSource>,
    repository: Repository,
}

impl Pipeline {
    pub fn new(source: Arc<dyn MealSource>, repository: Repository) -> Self {
        Self { source, repository }
    }

    pub fn repository(&self) -> &Repository {
        &self.repository
    }

    /// Reference sync plus `count` random recipes, upserting every one
    pub async fn run_full_load(&self, count: usize) -> EtlResult<RunOutcome> {
        self.execute(
            OperationKind::FullLoad,
            FetchRequest::Random { count },
            RunOptions {
                skip_existing: false,
                sync_reference: true,
            },
        )
        .await
    }

    /// `count` random draws; recipes already stored are tallied, not rewritten
    pub async fn run_incremental(&self, count: usize) -> EtlResult<RunOutcome> {
        self.execute(
            OperationKind::Incremental,
            FetchRequest::Random { count },
            RunOptions {
                skip_existing: true,
                sync_reference: false,
            },
        )
        .await
    }

    /// Search and upsert every match
    pub async fn run_search(&self, term: &str, search_type: SearchType) -> EtlResult<RunOutcome> {
        self.execute(
            OperationKind::Search,
            FetchRequest::Search {
                term: term.to_string(),
                search_type,
            },
            RunOptions {
                skip_existing: false,
                sync_reference: false,
            },
        )
        .await
    }

    /// Search, skipping stored recipes (before lookup for filter searches)
    pub async fn run_incremental_search(
        &self,
        term: &str,
        search_type: SearchType,
    ) -> EtlResult<RunOutcome> {
        self.execute(
            OperationKind::Search,
            FetchRequest::Search {
                term: term.to_string(),
                search_type,
            },
            RunOptions {
                skip_existing: true,
                sync_reference: false,
            },
        )
        .await
    }

    /// Refresh categories (with thumbnail and description) and areas
    ///
    /// Returns the number of categories and areas written.
    pub async fn sync_reference_data(&self) -> EtlResult<(usize, usize)> {
        let mut categories = 0;
        for raw in self.source.list_categories().await? {
            if let Some(info) = transform_category(&raw) {
                self.repository.upsert_category(&info).await?;
                categories += 1;
            }
        }

        let mut areas = 0;
        for raw in self.source.list_areas().await? {
            if let Some(name) = transform_area(&raw) {
                self.repository.ensure_area(&name).await?;
                areas += 1;
            }
        }

        info!(categories, areas, "Reference data synced");
        Ok((categories, areas))
    }

    async fn execute(
        &self,
        operation: OperationKind,
        request: FetchRequest,
        options: RunOptions,
    ) -> EtlResult<RunOutcome> {
        // Unsendable requests are rejected before a run starts
        request.validate()?;

        let start = Instant::now();
        let mut stats = RunStats::default();

        info!(
            operation = %operation,
            request = %request.describe(),
            skip_existing = options.skip_existing,
            "Starting pipeline run"
        );

        if options.sync_reference {
            match self.sync_reference_data().await {
                Ok((categories, areas)) => {
                    stats.categories_synced = categories;
                    stats.areas_synced = areas;
                }
                Err(e) => warn!("Reference data sync failed: {}", e),
            }
        }

        let skip_ids = if options.skip_existing {
            match self.repository.existing_ids().await {
                Ok(ids) => ids,
                Err(e) => return Err(self.record_failure(operation, start, e).await),
            }
        } else {
            HashSet::new()
        };

        let batch = match fetch_records(self.source.as_ref(), &request, &skip_ids).await {
            Ok(batch) => batch,
            Err(e) => return Err(self.record_failure(operation, start, e).await),
        };
        stats.absorb_fetch(&batch);

        for raw in &batch.records {
            let (recipe, lines) = match transform_meal(raw) {
                Ok(transformed) => transformed,
                Err(e) => {
                    warn!(meal_id = ?raw.id, "Skipping record: {}", e);
                    stats.skipped_invalid += 1;
                    stats.errors.push(e.to_string());
                    continue;
                }
            };

            match self.repository.upsert(&recipe, &lines).await {
                Ok(UpsertOutcome::Inserted) => stats.inserted += 1,
                Ok(UpsertOutcome::Updated) => stats.updated += 1,
                Err(EtlError::Validation(msg)) => {
                    warn!(meal_id = %recipe.id, "Skipping record: {}", msg);
                    stats.skipped_invalid += 1;
                    stats.errors.push(format!("Meal {}: {}", recipe.id, msg));
                }
                Err(e) => {
                    warn!(meal_id = %recipe.id, "Store failed: {}", e);
                    stats.storage_failures += 1;
                    stats.errors.push(format!("Meal {}: {}", recipe.id, e));
                }
            }
        }

        let status = stats.status();
        let elapsed_secs = start.elapsed().as_secs_f64();

        let entry = OperationLogEntry {
            operation,
            status,
            records_processed: stats.processed() as i64,
            error_message: stats.error_summary(),
            execution_time: elapsed_secs,
        };
        let log_id = self.repository.append_log(&entry).await?;

        info!(
            operation = %operation,
            status = %status,
            elapsed_secs,
            "Pipeline run complete: {}",
            stats.display_string()
        );

        Ok(RunOutcome {
            operation,
            status,
            stats,
            elapsed_secs,
            log_id,
        })
    }

    /// Log a batch-level failure and hand the error back
    async fn record_failure(
        &self,
        operation: OperationKind,
        start: Instant,
        err: EtlError,
    ) -> EtlError {
        warn!(operation = %operation, "Pipeline run failed: {}", err);

        let entry = OperationLogEntry {
            operation,
            status: RunStatus::Failure,
            records_processed: 0,
            error_message: Some(err.to_string()),
            execution_time: start.elapsed().as_secs_f64(),
        };
        if let Err(log_err) = self.repository.append_log(&entry).await {
            warn!("Failed to record failed run: {}", log_err);
        }

        err
    }
}
