//! Write strategy executors
//!
//! Reconciles one table's fetched records against the store for one tenant,
//! according to the table's [`WriteStrategy`]. Every store call of one
//! executor is awaited in order; failures end up in the returned
//! [`SyncOutcome`] and never escape it.
//!
//! # Overview
//!
//! - `strategies` - one executor per write strategy
//! - `merge` - dedup by key and merge by normalized name
//! - `chunk` - bounded batches for inserts

mod chunk;
mod merge;
mod strategies;

pub use chunk::chunk;
pub use merge::{dedup_by_key, merge_by_name};

use crate::error::{Error, Result};
use crate::registry::{SyncSpec, WriteStrategy};
use crate::store::{Filter, Store};
use crate::types::{Record, TENANT_COLUMN};
use serde::Serialize;
use std::time::Instant;
use tracing::{debug, warn};

/// Insert batch size when the strategy does not set one
pub const DEFAULT_CHUNK_SIZE: usize = 500;

/// Result of syncing one table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncOutcome {
    /// Source range
    pub sheet: String,
    /// Destination table
    pub table: String,
    /// Whether every write succeeded
    pub success: bool,
    /// Last error, when any write failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Records written (or attempted, for chunked replaces)
    pub rows_processed: usize,
}

impl SyncOutcome {
    /// Successful outcome
    pub fn ok(spec: &SyncSpec, rows_processed: usize) -> Self {
        Self {
            sheet: spec.source_range.to_string(),
            table: spec.table.to_string(),
            success: true,
            error: None,
            rows_processed,
        }
    }

    /// Failed outcome
    pub fn failed(spec: &SyncSpec, error: impl Into<String>, rows_processed: usize) -> Self {
        Self {
            sheet: spec.source_range.to_string(),
            table: spec.table.to_string(),
            success: false,
            error: Some(error.into()),
            rows_processed,
        }
    }
}

/// Overrides for the registry's paging and chunk sizes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteOptions {
    /// Ids selected per delete page
    pub page_size: Option<usize>,
    /// Records per insert batch
    pub chunk_size: Option<usize>,
}

/// Counts from a write that may fail part-way
#[derive(Debug, Default)]
pub(crate) struct Written {
    pub rows: usize,
    pub error: Option<Error>,
}

impl From<Result<usize>> for Written {
    fn from(result: Result<usize>) -> Self {
        match result {
            Ok(rows) => Self { rows, error: None },
            Err(error) => Self {
                rows: 0,
                error: Some(error),
            },
        }
    }
}

/// Writes tables for one tenant
#[derive(Debug, Clone, Copy)]
pub struct TableWriter<'a> {
    store: &'a dyn Store,
    tenant: &'a str,
    options: WriteOptions,
}

impl<'a> TableWriter<'a> {
    /// Create a writer for `tenant`
    pub fn new(store: &'a dyn Store, tenant: &'a str) -> Self {
        Self {
            store,
            tenant,
            options: WriteOptions::default(),
        }
    }

    /// Override paging and chunk sizes
    #[must_use]
    pub fn with_options(mut self, options: WriteOptions) -> Self {
        self.options = options;
        self
    }

    /// Tenant this writer writes for
    pub fn tenant(&self) -> &str {
        self.tenant
    }

    /// Reconcile `records` into the spec's table
    pub async fn write(&self, spec: &SyncSpec, records: Vec<Record>) -> SyncOutcome {
        let start = Instant::now();
        let records = self.stamp_tenant(spec, records);

        let written: Written = match spec.strategy {
            WriteStrategy::Upsert { conflict_key } => {
                self.upsert(spec, records, conflict_key).await.into()
            }
            WriteStrategy::StaleSiblingUpsert {
                conflict_key,
                group_by,
                sibling,
            } => self
                .stale_sibling_upsert(spec, records, conflict_key, group_by, sibling)
                .await
                .into(),
            WriteStrategy::Replace => self.replace(spec, records).await.into(),
            WriteStrategy::FlagPreservingReplace {
                name_field,
                flag_field,
                sum_fields,
            } => self
                .flag_preserving_replace(spec, records, name_field, flag_field, sum_fields)
                .await
                .into(),
            WriteStrategy::PaginatedReplace {
                page_size,
                chunk_size,
            } => {
                let page_size = self.options.page_size.unwrap_or(page_size);
                let chunk_size = self.options.chunk_size.unwrap_or(chunk_size);
                self.paginated_replace(spec, records, page_size, chunk_size)
                    .await
            }
        };

        self.finish(spec, written, start)
    }

    /// Remove the tenant's rows from a replace table whose tab has no rows
    pub async fn clear(&self, spec: &SyncSpec) -> SyncOutcome {
        let start = Instant::now();
        let result = match spec.strategy {
            WriteStrategy::PaginatedReplace { page_size, .. } => {
                let page_size = self.options.page_size.unwrap_or(page_size);
                self.paged_delete(spec, page_size).await
            }
            strategy if strategy.is_replace() => self.delete_tenant_rows(spec).await,
            _ => Ok(()),
        };
        self.finish(spec, result.map(|()| 0_usize).into(), start)
    }

    fn finish(&self, spec: &SyncSpec, written: Written, start: Instant) -> SyncOutcome {
        let elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
        match written.error {
            None => {
                debug!(
                    table = spec.table,
                    strategy = spec.strategy.label(),
                    rows = written.rows,
                    elapsed_ms,
                    "Table written"
                );
                SyncOutcome::ok(spec, written.rows)
            }
            Some(error) => {
                warn!(
                    table = spec.table,
                    strategy = spec.strategy.label(),
                    rows = written.rows,
                    error = %error,
                    "Table write failed"
                );
                SyncOutcome::failed(spec, error.to_string(), written.rows)
            }
        }
    }

    /// Tag every record of a tenant table with the tenant
    fn stamp_tenant(&self, spec: &SyncSpec, mut records: Vec<Record>) -> Vec<Record> {
        if !spec.global {
            for record in &mut records {
                record.insert(TENANT_COLUMN.to_string(), self.tenant.into());
            }
        }
        records
    }

    /// Filter selecting the tenant's rows. Global tables have no tenant
    /// scope and cannot be cleared.
    fn tenant_filter(&self, spec: &SyncSpec) -> Result<Filter> {
        if spec.global {
            return Err(Error::store(
                spec.table,
                "refusing a tenant-wide delete on a global table",
            ));
        }
        Ok(Filter::new().eq(TENANT_COLUMN, self.tenant))
    }

    fn chunk_size(&self) -> usize {
        self.options.chunk_size.unwrap_or(DEFAULT_CHUNK_SIZE)
    }
}
