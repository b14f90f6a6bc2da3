//! In-process store
//!
//! Keeps every table as a vector of records and logs each call, so tests can
//! assert on write ordering. Failures can be injected per table and operation.

use super::filter::{values_equal, Filter, Query};
use super::Store;
use crate::error::{Error, Result};
use crate::types::{Record, ID_COLUMN};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;

/// Kind of store operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    Query,
    Insert,
    Upsert,
    Delete,
}

/// One logged store call
#[derive(Debug, Clone, PartialEq)]
pub struct StoreCall {
    /// Table the call targeted
    pub table: String,
    /// Operation
    pub op: StoreOp,
    /// Rows sent (insert/upsert) or returned (query)
    pub rows: usize,
    /// Whether the call failed
    pub failed: bool,
}

#[derive(Debug, Clone)]
struct InjectedFailure {
    table: String,
    op: StoreOp,
    /// Fail only the Nth call (1-based) of this op on this table; all calls when `None`
    nth: Option<usize>,
}

#[derive(Debug, Default)]
struct Inner {
    tables: HashMap<String, Vec<Record>>,
    next_id: i64,
    calls: Vec<StoreCall>,
    counters: HashMap<(String, StoreOp), usize>,
    failures: Vec<InjectedFailure>,
}

impl Inner {
    fn assign_id(&mut self, mut row: Record) -> Record {
        self.next_id += 1;
        row.insert(ID_COLUMN.to_string(), self.next_id.into());
        row
    }

    /// Count the call and decide whether it should fail
    fn enter(&mut self, table: &str, op: StoreOp) -> bool {
        let counter = self.counters.entry((table.to_string(), op)).or_insert(0);
        *counter += 1;
        let n = *counter;
        self.failures
            .iter()
            .any(|f| f.table == table && f.op == op && f.nth.map_or(true, |nth| nth == n))
    }

    fn log(&mut self, table: &str, op: StoreOp, rows: usize, failed: bool) {
        self.calls.push(StoreCall {
            table: table.to_string(),
            op,
            rows,
            failed,
        });
    }
}

/// In-memory [`Store`] implementation
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every `op` call on `table`
    pub async fn fail_on(&self, table: &str, op: StoreOp) {
        self.inner.lock().await.failures.push(InjectedFailure {
            table: table.to_string(),
            op,
            nth: None,
        });
    }

    /// Fail only the `nth` (1-based) `op` call on `table`
    pub async fn fail_nth(&self, table: &str, op: StoreOp, nth: usize) {
        self.inner.lock().await.failures.push(InjectedFailure {
            table: table.to_string(),
            op,
            nth: Some(nth),
        });
    }

    /// Remove all injected failures
    pub async fn clear_failures(&self) {
        let mut inner = self.inner.lock().await;
        inner.failures.clear();
        inner.counters.clear();
    }

    /// Seed rows directly, bypassing the call log
    pub async fn seed(&self, table: &str, rows: Vec<Record>) {
        let mut inner = self.inner.lock().await;
        let rows: Vec<Record> = rows.into_iter().map(|r| inner.assign_id(r)).collect();
        inner.tables.entry(table.to_string()).or_default().extend(rows);
    }

    /// Snapshot of a table's rows
    pub async fn rows(&self, table: &str) -> Vec<Record> {
        self.inner
            .lock()
            .await
            .tables
            .get(table)
            .cloned()
            .unwrap_or_default()
    }

    /// Snapshot of the rows matching a filter
    pub async fn rows_matching(&self, table: &str, filter: &Filter) -> Vec<Record> {
        self.rows(table)
            .await
            .into_iter()
            .filter(|r| filter.matches(r))
            .collect()
    }

    /// All calls made so far
    pub async fn calls(&self) -> Vec<StoreCall> {
        self.inner.lock().await.calls.clone()
    }

    /// Calls made against one table
    pub async fn calls_for(&self, table: &str) -> Vec<StoreCall> {
        self.calls()
            .await
            .into_iter()
            .filter(|c| c.table == table)
            .collect()
    }
}

fn injected(table: &str, op: StoreOp) -> Error {
    Error::store(table, format!("injected {op:?} failure"))
}

#[async_trait]
impl Store for MemoryStore {
    async fn query(&self, table: &str, query: &Query) -> Result<Vec<Record>> {
        let mut inner = self.inner.lock().await;
        if inner.enter(table, StoreOp::Query) {
            inner.log(table, StoreOp::Query, 0, true);
            return Err(injected(table, StoreOp::Query));
        }
        let rows = inner
            .tables
            .get(table)
            .map(|rows| query.apply(rows.iter()))
            .unwrap_or_default();
        inner.log(table, StoreOp::Query, rows.len(), false);
        Ok(rows)
    }

    async fn insert(&self, table: &str, rows: &[Record]) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if inner.enter(table, StoreOp::Insert) {
            inner.log(table, StoreOp::Insert, rows.len(), true);
            return Err(injected(table, StoreOp::Insert));
        }
        let stored: Vec<Record> = rows.iter().cloned().map(|r| inner.assign_id(r)).collect();
        inner.tables.entry(table.to_string()).or_default().extend(stored);
        inner.log(table, StoreOp::Insert, rows.len(), false);
        Ok(())
    }

    async fn upsert(&self, table: &str, rows: &[Record], conflict_key: &[&str]) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if inner.enter(table, StoreOp::Upsert) {
            inner.log(table, StoreOp::Upsert, rows.len(), true);
            return Err(injected(table, StoreOp::Upsert));
        }
        for row in rows {
            let existing = inner.tables.entry(table.to_string()).or_default();
            let position = existing.iter().position(|stored| {
                conflict_key.iter().all(|col| {
                    let a = stored.get(*col).unwrap_or(&serde_json::Value::Null);
                    let b = row.get(*col).unwrap_or(&serde_json::Value::Null);
                    values_equal(a, b)
                })
            });
            match position {
                Some(idx) => {
                    for (key, value) in row {
                        existing[idx].insert(key.clone(), value.clone());
                    }
                }
                None => {
                    let stored = inner.assign_id(row.clone());
                    inner.tables.entry(table.to_string()).or_default().push(stored);
                }
            }
        }
        inner.log(table, StoreOp::Upsert, rows.len(), false);
        Ok(())
    }

    async fn delete(&self, table: &str, filter: &Filter) -> Result<()> {
        if filter.is_empty() {
            return Err(Error::store(table, "refusing to delete without a filter"));
        }
        let mut inner = self.inner.lock().await;
        if inner.enter(table, StoreOp::Delete) {
            inner.log(table, StoreOp::Delete, 0, true);
            return Err(injected(table, StoreOp::Delete));
        }
        let mut removed = 0;
        if let Some(rows) = inner.tables.get_mut(table) {
            let before = rows.len();
            rows.retain(|r| !filter.matches(r));
            removed = before - rows.len();
        }
        inner.log(table, StoreOp::Delete, removed, false);
        Ok(())
    }
}
