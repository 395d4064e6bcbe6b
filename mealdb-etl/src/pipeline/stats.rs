//! Per-run statistics
//!
//! Every record a run touches ends up in exactly one counter, so a run
//! summary always accounts for what was fetched, stored and discarded.

use crate::fetcher::FetchBatch;
use crate::models::RunStatus;
use serde::{Deserialize, Serialize};

/// Error messages kept in a log entry summary
const MAX_SUMMARY_ERRORS: usize = 5;

/// Counters for one pipeline run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunStats {
    /// Records handed to the transformer
    pub fetched: usize,
    pub inserted: usize,
    pub updated: usize,
    /// Records rejected by validation
    pub skipped_invalid: usize,
    /// Records already stored (incremental runs)
    pub skipped_existing: usize,
    /// Records whose write was rolled back
    pub storage_failures: usize,
    /// Requests or lookups that failed
    pub fetch_failures: usize,
    /// Lookups that returned nothing
    pub missing: usize,
    /// Repeated ids within the batch
    pub duplicates: usize,
    /// Reference rows refreshed (full load only)
    pub categories_synced: usize,
    pub areas_synced: usize,
    /// Per-record error messages
    pub errors: Vec<String>,
}

impl RunStats {
    /// Records successfully upserted
    pub fn processed(&self) -> usize {
        self.inserted + self.updated
    }

    /// Records that degrade the run status
    pub fn problems(&self) -> usize {
        self.skipped_invalid + self.storage_failures + self.fetch_failures
    }

    /// Fold the fetcher's tallies into the run
    pub fn absorb_fetch(&mut self, batch: &FetchBatch) {
        self.fetched += batch.records.len();
        self.fetch_failures += batch.fetch_failures;
        self.missing += batch.missing;
        self.skipped_existing += batch.skipped_existing;
        self.duplicates += batch.duplicates;
        self.errors.extend(batch.errors.iter().cloned());
    }

    /// Status of a run whose fetch succeeded
    ///
    /// Records skipped because they already exist do not count against it.
    pub fn status(&self) -> RunStatus {
        let processed = self.processed();
        let problems = self.problems();

        if processed == 0 && problems > 0 {
            RunStatus::Failure
        } else if problems > 0 {
            RunStatus::Partial
        } else {
            RunStatus::Success
        }
    }

    /// Text stored in the log entry, `None` when nothing went wrong
    pub fn error_summary(&self) -> Option<String> {
        if self.errors.is_empty() {
            return None;
        }

        let mut parts = Vec::new();
        if self.skipped_invalid > 0 {
            parts.push(format!("{} invalid", self.skipped_invalid));
        }
        if self.storage_failures > 0 {
            parts.push(format!("{} storage failures", self.storage_failures));
        }
        if self.fetch_failures > 0 {
            parts.push(format!("{} fetch failures", self.fetch_failures));
        }

        let mut summary = parts.join(", ");
        let shown: Vec<&str> = self
            .errors
            .iter()
            .take(MAX_SUMMARY_ERRORS)
            .map(String::as_str)
            .collect();
        if !summary.is_empty() {
            summary.push_str(": ");
        }
        summary.push_str(&shown.join("; "));
        if self.errors.len() > MAX_SUMMARY_ERRORS {
            summary.push_str(&format!(
                "; and {} more",
                self.errors.len() - MAX_SUMMARY_ERRORS
            ));
        }
        Some(summary)
    }

    pub fn display_string(&self) -> String {
        format!(
            "{} fetched, {} inserted, {} updated, {} invalid, {} existing skipped, \
             {} storage failures, {} fetch failures, {} missing",
            self.fetched,
            self.inserted,
            self.updated,
            self.skipped_invalid,
            self.skipped_existing,
            self.storage_failures,
            self.fetch_failures,
            self.missing
        )
    }
}
