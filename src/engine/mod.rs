//! Sync orchestration
//!
//! Runs one bounded job: fetch every registered range once, sort the tables
//! by what the fetch produced, write the tables that have rows concurrently,
//! clear replace tables whose tab is present but empty, and aggregate the
//! per-table outcomes in registry order.
//!
//! # Overview
//!
//! - `SyncEngine` - orchestrates one job over a source and a store
//! - `run_job` - pre-flight, wiring from settings, and bookkeeping
//! - `JobParams` / `JobResult` / `JobFailure` - job inputs and outputs

mod types;

pub use types::{JobFailure, JobParams, JobResult, SyncConfig};

use crate::bookkeeping::Bookkeeper;
use crate::config::Settings;
use crate::error::{Error, Result};
use crate::fetch::{BatchFetcher, FetchOutcome};
use crate::registry::{SyncSpec, REGISTRY};
use crate::source::{GoogleSheetsSource, SheetSource};
use crate::store::Store;
use crate::types::Record;
use crate::writer::{SyncOutcome, TableWriter};
use chrono::Utc;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

/// Work dispatched for one table
enum TableTask {
    /// Write the fetched rows
    Write(Vec<Record>),
    /// Clear the tenant's rows of a replace table whose tab is empty
    Clear,
}

/// Sync engine for one source and one store
pub struct SyncEngine {
    /// Spreadsheet source
    source: Arc<dyn SheetSource>,
    /// Destination store
    store: Arc<dyn Store>,
    /// Sync configuration
    config: SyncConfig,
    /// Tables to sync
    specs: Vec<SyncSpec>,
}

impl SyncEngine {
    /// Create an engine syncing every registered table
    pub fn new(source: Arc<dyn SheetSource>, store: Arc<dyn Store>) -> Self {
        Self {
            source,
            store,
            config: SyncConfig::default(),
            specs: REGISTRY.to_vec(),
        }
    }

    /// Set sync configuration
    #[must_use]
    pub fn with_config(mut self, config: SyncConfig) -> Self {
        self.config = config;
        self
    }

    /// Restrict the job to some tables
    #[must_use]
    pub fn with_specs(mut self, specs: Vec<SyncSpec>) -> Self {
        self.specs = specs;
        self
    }

    /// Get the store
    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    /// Get the sync configuration
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Run one job for `tenant`.
    ///
    /// Fails only when the tenant is missing or the source cannot list its
    /// ranges; table failures are reported in the result.
    pub async fn run(&self, tenant: &str) -> Result<JobResult> {
        let start = Instant::now();
        if tenant.trim().is_empty() {
            return Err(Error::missing_field("tenant_id"));
        }
        info!(tenant, tables = self.specs.len(), "Starting sync job");

        let report = BatchFetcher::new(self.source.as_ref())
            .fetch(&self.specs)
            .await?;
        let writer = TableWriter::new(self.store.as_ref(), tenant).with_options(self.config.write);

        let mut results: Vec<Option<SyncOutcome>> = vec![None; report.outcomes.len()];
        let mut tasks: Vec<(usize, SyncSpec, TableTask)> = Vec::new();

        for (index, (spec, outcome)) in report.outcomes.into_iter().enumerate() {
            match outcome {
                FetchOutcome::Rows(records) => {
                    tasks.push((index, spec, TableTask::Write(records)));
                }
                FetchOutcome::NoData { tab_present: true } if spec.strategy.is_replace() => {
                    tasks.push((index, spec, TableTask::Clear));
                }
                FetchOutcome::NoData { .. } => results[index] = Some(SyncOutcome::ok(&spec, 0)),
                FetchOutcome::FetchError(message) => {
                    results[index] = Some(SyncOutcome::failed(&spec, message, 0));
                }
            }
        }

        // Writes and clears share one pool; a stalled table holds only its own slot
        let limit = self.config.max_concurrent_tables.max(1);
        let finished: Vec<(usize, SyncOutcome)> =
            stream::iter(tasks.into_iter().map(|(index, spec, task)| async move {
                let outcome = match task {
                    TableTask::Write(records) => writer.write(&spec, records).await,
                    TableTask::Clear => writer.clear(&spec).await,
                };
                (index, outcome)
            }))
            .buffer_unordered(limit)
            .collect()
            .await;

        for (index, outcome) in finished {
            results[index] = Some(outcome);
        }

        let result = JobResult::from_outcomes(results.into_iter().flatten().collect());
        for outcome in &result.results {
            info!(
                table = %outcome.table,
                success = outcome.success,
                rows = outcome.rows_processed,
                error = outcome.error.as_deref().unwrap_or(""),
                "Table synced"
            );
        }
        info!(
            tenant,
            success = result.success,
            rows = result.rows_processed(),
            failed = ?result.failed_tables(),
            tier = ?report.tier,
            duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
            "Sync job finished"
        );
        Ok(result)
    }

    /// Run a job and record the completion time when every table succeeded
    pub async fn run_and_record(&self, tenant: &str) -> Result<JobResult> {
        let result = self.run(tenant).await?;
        if result.success {
            let books = Bookkeeper::new(self.store.as_ref(), self.config.bookkeeping);
            if let Err(e) = books.record_success(tenant, Utc::now()).await {
                warn!(tenant, error = %e, "Failed to record sync completion");
            }
        }
        Ok(result)
    }
}

impl std::fmt::Debug for SyncEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEngine")
            .field("source", &self.source)
            .field("store", &self.store)
            .field("config", &self.config)
            .field("tables", &self.specs.len())
            .finish()
    }
}

/// Check everything a job needs before touching the source or the store
fn preflight(settings: &Settings, params: &JobParams, has_store: bool) -> Result<()> {
    if params.spreadsheet_id.trim().is_empty() {
        return Err(Error::missing_field("spreadsheet_id"));
    }
    if params.tenant_id.trim().is_empty() {
        return Err(Error::missing_field("tenant_id"));
    }
    if has_store {
        settings.validate_source()
    } else {
        settings.validate()
    }
}

/// Run one job from settings.
///
/// `store` is a session opened by the caller, for example on behalf of an
/// authenticated user; when `None` the store configured in `settings` is
/// opened. Any failure before tables are dispatched is returned as a
/// classified [`JobFailure`] and nothing is written.
pub async fn run_job(
    settings: &Settings,
    params: &JobParams,
    store: Option<Arc<dyn Store>>,
) -> std::result::Result<JobResult, JobFailure> {
    run_job_for(settings, params, store, REGISTRY.to_vec()).await
}

/// [`run_job`] restricted to some tables
pub async fn run_job_for(
    settings: &Settings,
    params: &JobParams,
    store: Option<Arc<dyn Store>>,
    specs: Vec<SyncSpec>,
) -> std::result::Result<JobResult, JobFailure> {
    execute(settings, params, store, specs).await.map_err(|e| {
        let failure = JobFailure::from(e);
        error!(
            tenant = %params.tenant_id,
            kind = ?failure.kind,
            error = %failure.error,
            "Sync job failed"
        );
        failure
    })
}

async fn execute(
    settings: &Settings,
    params: &JobParams,
    store: Option<Arc<dyn Store>>,
    specs: Vec<SyncSpec>,
) -> Result<JobResult> {
    preflight(settings, params, store.is_some())?;
    let store = match store {
        Some(store) => store,
        None => settings.store.open(None)?,
    };
    let source = GoogleSheetsSource::with_http_config(
        &settings.source.base_url,
        params.spreadsheet_id.as_str(),
        settings.source.auth.clone(),
        settings.source.http_client_config(),
    )?;

    SyncEngine::new(Arc::new(source), store)
        .with_config(SyncConfig::from(&settings.sync))
        .with_specs(specs)
        .run_and_record(&params.tenant_id)
        .await
}
