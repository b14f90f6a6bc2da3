//! Relational store module
//!
//! The engine treats the destination database as a remote service offering
//! four operations. Everything the write executors do goes through the
//! [`Store`] trait.
//!
//! # Backends
//!
//! - `RestStore` - PostgREST-compatible HTTP gateway
//! - `DuckDbStore` - local DuckDB file (or in-memory) for dry runs
//! - `MemoryStore` - in-process store with failure injection

mod duckdb;
mod filter;
mod memory;
mod rest;

pub use self::duckdb::DuckDbStore;
pub use filter::{Condition, Filter, Query};
pub use memory::{MemoryStore, StoreCall, StoreOp};
pub use rest::RestStore;

use crate::error::Result;
use crate::types::Record;
use async_trait::async_trait;

/// Operations the sync engine needs from the destination store
#[async_trait]
pub trait Store: Send + Sync + std::fmt::Debug {
    /// Read rows matching a query
    async fn query(&self, table: &str, query: &Query) -> Result<Vec<Record>>;

    /// Insert rows
    async fn insert(&self, table: &str, rows: &[Record]) -> Result<()>;

    /// Insert rows, updating existing ones that match on `conflict_key`
    async fn upsert(&self, table: &str, rows: &[Record], conflict_key: &[&str]) -> Result<()>;

    /// Delete rows matching a filter. An empty filter is refused.
    async fn delete(&self, table: &str, filter: &Filter) -> Result<()>;
}
