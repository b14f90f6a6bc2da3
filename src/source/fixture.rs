//! In-memory spreadsheet source
//!
//! Serves fixed grids. Used for dry runs from a JSON file and by tests, which
//! can make the batch fetch or individual ranges fail.

use super::SheetSource;
use crate::error::{Error, Result};
use crate::types::ValueGrid;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Source backed by fixed grids, keyed by range name
#[derive(Debug, Default)]
pub struct FixtureSource {
    grids: HashMap<String, ValueGrid>,
    fail_listing: bool,
    fail_batch: bool,
    failing_ranges: HashSet<String>,
    batch_calls: AtomicUsize,
    single_calls: AtomicUsize,
}

impl FixtureSource {
    /// Create an empty source
    pub fn new() -> Self {
        Self::default()
    }

    /// Load grids from a JSON object of `{"Range": [[cell, ...], ...]}`
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let grids: HashMap<String, ValueGrid> = serde_json::from_str(&content)?;
        Ok(Self {
            grids,
            ..Self::default()
        })
    }

    /// Add a range
    #[must_use]
    pub fn with_range(mut self, name: impl Into<String>, grid: ValueGrid) -> Self {
        self.grids.insert(name.into(), grid);
        self
    }

    /// Make range listing fail
    #[must_use]
    pub fn failing_listing(mut self) -> Self {
        self.fail_listing = true;
        self
    }

    /// Make the combined fetch fail
    #[must_use]
    pub fn failing_batch(mut self) -> Self {
        self.fail_batch = true;
        self
    }

    /// Make one range fail, in batch and alone
    #[must_use]
    pub fn failing_range(mut self, name: impl Into<String>) -> Self {
        self.failing_ranges.insert(name.into());
        self
    }

    /// Number of combined fetches served
    pub fn batch_calls(&self) -> usize {
        self.batch_calls.load(Ordering::SeqCst)
    }

    /// Number of single-range fetches served
    pub fn single_calls(&self) -> usize {
        self.single_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SheetSource for FixtureSource {
    async fn list_ranges(&self) -> Result<Vec<String>> {
        if self.fail_listing {
            return Err(Error::http_status(404, "Requested entity was not found."));
        }
        let mut names: Vec<String> = self.grids.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    async fn batch_get(&self, ranges: &[String]) -> Result<HashMap<String, ValueGrid>> {
        self.batch_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_batch {
            return Err(Error::sheet("combined fetch failed"));
        }
        if let Some(bad) = ranges.iter().find(|r| self.failing_ranges.contains(*r)) {
            return Err(Error::range_fetch(bad.as_str(), "unable to parse range"));
        }
        Ok(ranges
            .iter()
            .map(|r| (r.clone(), self.grids.get(r).cloned().unwrap_or_default()))
            .collect())
    }

    async fn get(&self, range: &str) -> Result<ValueGrid> {
        self.single_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_ranges.contains(range) {
            return Err(Error::range_fetch(range, "unable to parse range"));
        }
        self.grids
            .get(range)
            .cloned()
            .ok_or_else(|| Error::range_fetch(range, "no such range"))
    }
}
