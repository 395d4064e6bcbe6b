//! Pipeline run log entries

use crate::error::EtlError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    FullLoad,
    Incremental,
    Search,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::FullLoad => "full_load",
            OperationKind::Incremental => "incremental",
            OperationKind::Search => "search",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationKind {
    type Err = EtlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "full_load" => Ok(OperationKind::FullLoad),
            "incremental" => Ok(OperationKind::Incremental),
            "search" => Ok(OperationKind::Search),
            other => Err(EtlError::Storage(format!("Unknown operation type: {}", other))),
        }
    }
}

/// Outcome of a pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Success,
    Partial,
    Failure,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Success => "success",
            RunStatus::Partial => "partial",
            RunStatus::Failure => "failure",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunStatus {
    type Err = EtlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(RunStatus::Success),
            "partial" => Ok(RunStatus::Partial),
            "failure" => Ok(RunStatus::Failure),
            other => Err(EtlError::Storage(format!("Unknown run status: {}", other))),
        }
    }
}

/// One pipeline run, as appended to the log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationLogEntry {
    pub operation: OperationKind,
    pub status: RunStatus,
    /// Records successfully upserted
    pub records_processed: i64,
    pub error_message: Option<String>,
    /// Elapsed seconds
    pub execution_time: f64,
}

/// Log entry as persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredLogEntry {
    pub id: i64,
    #[serde(flatten)]
    pub entry: OperationLogEntry,
    pub created_at: String,
}
