//! Engine types
//!
//! Job parameters, results and configuration for the sync engine.

use crate::error::{Error, FailureKind};
use crate::types::BookkeepingMode;
use crate::writer::{SyncOutcome, WriteOptions};
use serde::{Deserialize, Serialize};

/// Who and what a job syncs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct JobParams {
    /// Spreadsheet to read
    pub spreadsheet_id: String,
    /// Tenant owning the written rows
    pub tenant_id: String,
}

impl JobParams {
    /// Create job parameters
    pub fn new(spreadsheet_id: impl Into<String>, tenant_id: impl Into<String>) -> Self {
        Self {
            spreadsheet_id: spreadsheet_id.into(),
            tenant_id: tenant_id.into(),
        }
    }
}

/// Aggregated result of one job
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobResult {
    /// Whether every table succeeded
    pub success: bool,
    /// One outcome per registered table, in registry order
    pub results: Vec<SyncOutcome>,
}

impl JobResult {
    /// Aggregate table outcomes
    pub fn from_outcomes(results: Vec<SyncOutcome>) -> Self {
        Self {
            success: results.iter().all(|r| r.success),
            results,
        }
    }

    /// Total rows processed across tables
    pub fn rows_processed(&self) -> usize {
        self.results.iter().map(|r| r.rows_processed).sum()
    }

    /// Tables whose outcome failed
    pub fn failed_tables(&self) -> Vec<&str> {
        self.results
            .iter()
            .filter(|r| !r.success)
            .map(|r| r.table.as_str())
            .collect()
    }
}

/// A job that failed before any table could be synced
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobFailure {
    /// Always false
    pub success: bool,
    /// Coarse classification for callers
    pub kind: FailureKind,
    /// Error message
    pub error: String,
}

impl From<Error> for JobFailure {
    fn from(error: Error) -> Self {
        Self {
            success: false,
            kind: error.failure_kind(),
            error: error.to_string(),
        }
    }
}

impl std::fmt::Display for JobFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind, self.error)
    }
}

/// Configuration for sync operation
#[derive(Debug, Clone, Copy)]
pub struct SyncConfig {
    /// Tables written at the same time
    pub max_concurrent_tables: usize,
    /// Paging and chunk overrides
    pub write: WriteOptions,
    /// Scope of the last-sync record
    pub bookkeeping: BookkeepingMode,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_concurrent_tables: 8,
            write: WriteOptions::default(),
            bookkeeping: BookkeepingMode::default(),
        }
    }
}

impl SyncConfig {
    /// Create a new sync config
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the table concurrency
    #[must_use]
    pub fn with_max_concurrent_tables(mut self, max: usize) -> Self {
        self.max_concurrent_tables = max.max(1);
        self
    }

    /// Set paging and chunk overrides
    #[must_use]
    pub fn with_write_options(mut self, write: WriteOptions) -> Self {
        self.write = write;
        self
    }

    /// Set the bookkeeping scope
    #[must_use]
    pub fn with_bookkeeping(mut self, mode: BookkeepingMode) -> Self {
        self.bookkeeping = mode;
        self
    }
}

impl From<&crate::config::SyncSettings> for SyncConfig {
    fn from(settings: &crate::config::SyncSettings) -> Self {
        Self::new()
            .with_max_concurrent_tables(settings.max_concurrent_tables)
            .with_write_options(WriteOptions {
                page_size: settings.page_size,
                chunk_size: settings.chunk_size,
            })
            .with_bookkeeping(settings.bookkeeping)
    }
}
