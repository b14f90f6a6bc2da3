//! Spreadsheet sources
//!
//! The sync engine only needs two things from a spreadsheet: the names of the
//! ranges it exposes, and the cell values of a set of ranges.
//!
//! # Overview
//!
//! - `google` - Google Sheets v4 REST source
//! - `fixture` - in-memory source backed by fixed grids

mod fixture;
mod google;

pub use fixture::FixtureSource;
pub use google::{GoogleSheetsSource, DEFAULT_SHEETS_URL};

use crate::error::Result;
use crate::types::ValueGrid;
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt::Debug;

/// Read access to one spreadsheet
#[async_trait]
pub trait SheetSource: Send + Sync + Debug {
    /// Names of every named range and sheet tab
    async fn list_ranges(&self) -> Result<Vec<String>>;

    /// Fetch several ranges in one request, keyed by the requested name.
    /// Fails as a whole.
    async fn batch_get(&self, ranges: &[String]) -> Result<HashMap<String, ValueGrid>>;

    /// Fetch a single range
    async fn get(&self, range: &str) -> Result<ValueGrid>;
}

#[cfg(test)]
mod tests;
