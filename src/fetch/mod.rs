//! Batch fetch adapter
//!
//! Reads every registered range from a [`SheetSource`] and turns each into a
//! [`FetchOutcome`]. Fetching happens in two tiers: one combined request for
//! all present ranges, and on failure a parallel per-range fallback where each
//! range fails on its own.

use crate::error::Result;
use crate::registry::SyncSpec;
use crate::source::SheetSource;
use crate::transform;
use crate::types::{Record, ValueGrid};
use futures::future::join_all;
use std::collections::HashMap;
use std::time::Instant;
use tracing::{debug, info, warn};

/// What one table got out of the fetch
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// At least one valid record
    Rows(Vec<Record>),
    /// Nothing to write; `tab_present` tells an empty tab from an absent one
    NoData { tab_present: bool },
    /// The range could not be read
    FetchError(String),
}

/// Which tier produced the data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchTier {
    /// One combined request
    Batch,
    /// Individual requests after the combined one failed
    PerRange,
}

/// Per-table outcomes of one fetch, in spec order
#[derive(Debug, Clone)]
pub struct FetchReport {
    /// Tier used; `None` when no registered range was present
    pub tier: Option<FetchTier>,
    /// Outcome per spec
    pub outcomes: Vec<(SyncSpec, FetchOutcome)>,
    /// Rows dropped by transforms, summed over tables
    pub skipped_rows: usize,
    /// Wall time of the fetch
    pub duration_ms: u64,
}

impl FetchReport {
    /// Outcome for a destination table
    pub fn outcome(&self, table: &str) -> Option<&FetchOutcome> {
        self.outcomes
            .iter()
            .find(|(spec, _)| spec.table == table)
            .map(|(_, outcome)| outcome)
    }
}

/// Fetches and transforms every spec's range
#[derive(Debug)]
pub struct BatchFetcher<'a> {
    source: &'a dyn SheetSource,
}

impl<'a> BatchFetcher<'a> {
    /// Create a fetcher over a source
    pub fn new(source: &'a dyn SheetSource) -> Self {
        Self { source }
    }

    /// Fetch all specs.
    ///
    /// Only listing the source's ranges can fail the call; every other
    /// failure lands in the affected table's outcome.
    pub async fn fetch(&self, specs: &[SyncSpec]) -> Result<FetchReport> {
        let start = Instant::now();
        let available = self.source.list_ranges().await?;

        let (present, missing): (Vec<&SyncSpec>, Vec<&SyncSpec>) = specs
            .iter()
            .partition(|spec| available.iter().any(|name| name == spec.source_range));
        if !missing.is_empty() {
            let names: Vec<&str> = missing.iter().map(|s| s.source_range).collect();
            debug!(ranges = ?names, "Ranges absent from spreadsheet");
        }

        let (tier, mut grids) = if present.is_empty() {
            (None, HashMap::new())
        } else {
            let (tier, grids) = self.fetch_present(&present).await;
            (Some(tier), grids)
        };

        let mut skipped_rows = 0;
        let outcomes = specs
            .iter()
            .map(|spec| {
                let outcome = match grids.remove(spec.source_range) {
                    None => FetchOutcome::NoData { tab_present: false },
                    Some(Err(message)) => FetchOutcome::FetchError(message),
                    Some(Ok(grid)) => {
                        let (outcome, skipped) = interpret(spec, &grid);
                        skipped_rows += skipped;
                        outcome
                    }
                };
                (*spec, outcome)
            })
            .collect();

        let duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
        info!(
            tier = ?tier,
            present = present.len(),
            missing = missing.len(),
            skipped_rows,
            duration_ms,
            "Fetched spreadsheet"
        );

        Ok(FetchReport {
            tier,
            outcomes,
            skipped_rows,
            duration_ms,
        })
    }

    /// Combined fetch, falling back to per-range fetches
    async fn fetch_present(
        &self,
        present: &[&SyncSpec],
    ) -> (FetchTier, HashMap<&'static str, std::result::Result<ValueGrid, String>>) {
        let names: Vec<String> = present.iter().map(|s| s.source_range.to_string()).collect();

        match self.source.batch_get(&names).await {
            Ok(mut grids) => {
                let grids = present
                    .iter()
                    .map(|spec| {
                        let grid = grids.remove(spec.source_range).unwrap_or_default();
                        (spec.source_range, Ok(grid))
                    })
                    .collect();
                (FetchTier::Batch, grids)
            }
            Err(e) => {
                warn!(error = %e, ranges = names.len(), "Combined fetch failed, fetching ranges individually");
                let results = join_all(present.iter().map(|spec| async move {
                    let result = self.source.get(spec.source_range).await.map_err(|e| {
                        warn!(range = spec.source_range, error = %e, "Range fetch failed");
                        e.to_string()
                    });
                    (spec.source_range, result)
                }))
                .await;
                (FetchTier::PerRange, results.into_iter().collect())
            }
        }
    }
}

/// Turn a fetched grid into an outcome. Returns the outcome and the number
/// of rows the transform skipped.
fn interpret(spec: &SyncSpec, grid: &ValueGrid) -> (FetchOutcome, usize) {
    if grid.len() <= 1 {
        return (FetchOutcome::NoData { tab_present: true }, 0);
    }

    let body = &grid[1..];
    let records: Vec<Record> = body
        .iter()
        .filter_map(|row| transform::apply(spec.transform, row))
        .collect();
    let skipped = body.len() - records.len();
    if skipped > 0 {
        debug!(table = spec.table, skipped, kept = records.len(), "Skipped invalid rows");
    }

    if records.is_empty() {
        (FetchOutcome::NoData { tab_present: true }, skipped)
    } else {
        (FetchOutcome::Rows(records), skipped)
    }
}

#[cfg(test)]
mod tests;
