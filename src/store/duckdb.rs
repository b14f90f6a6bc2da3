//! DuckDB-backed local store
//!
//! Each destination table is a two-column DuckDB table `(id BIGINT, data
//! VARCHAR)` holding the record as JSON text. Filters are evaluated on the
//! decoded records, so no schema has to be declared up front. Intended for
//! dry runs and local development against a file.

use super::filter::{values_equal, Filter, Query};
use super::Store;
use crate::error::{Error, Result};
use crate::types::{JsonValue, Record, ID_COLUMN};
use async_trait::async_trait;
use duckdb::{params, Connection};
use regex::Regex;
use std::path::Path;
use std::sync::{LazyLock, Mutex};

static TABLE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

/// Local [`Store`] on top of DuckDB
pub struct DuckDbStore {
    conn: Mutex<Connection>,
    location: String,
}

impl DuckDbStore {
    /// Open (or create) a database file
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)
            .map_err(|e| Error::config(format!("Failed to open DuckDB at {}: {e}", path.display())))?;
        Ok(Self {
            conn: Mutex::new(conn),
            location: path.display().to_string(),
        })
    }

    /// Open a throwaway in-memory database
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| Error::config(format!("Failed to create DuckDB connection: {e}")))?;
        Ok(Self {
            conn: Mutex::new(conn),
            location: ":memory:".to_string(),
        })
    }

    /// Where the database lives
    pub fn location(&self) -> &str {
        &self.location
    }

    fn with_conn<T>(
        &self,
        table: &str,
        f: impl FnOnce(&mut Connection) -> std::result::Result<T, duckdb::Error>,
    ) -> Result<T> {
        if !TABLE_NAME.is_match(table) {
            return Err(Error::store(table, "invalid table name"));
        }
        let mut conn = self
            .conn
            .lock()
            .map_err(|_| Error::store(table, "connection lock poisoned"))?;
        ensure_table(&conn, table).map_err(|e| Error::store(table, e.to_string()))?;
        f(&mut conn).map_err(|e| Error::store(table, e.to_string()))
    }
}

impl std::fmt::Debug for DuckDbStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DuckDbStore")
            .field("location", &self.location)
            .finish_non_exhaustive()
    }
}

fn ensure_table(conn: &Connection, table: &str) -> std::result::Result<(), duckdb::Error> {
    conn.execute_batch(&format!(
        "CREATE TABLE IF NOT EXISTS \"{table}\" (id BIGINT PRIMARY KEY, data VARCHAR NOT NULL);"
    ))
}

/// Load every row of a table as records with their `id`. A row whose data
/// does not decode to a JSON object fails the whole load.
fn load_rows(conn: &Connection, table: &str) -> std::result::Result<Vec<Record>, duckdb::Error> {
    let mut stmt = conn.prepare(&format!("SELECT id, data FROM \"{table}\" ORDER BY id"))?;
    let rows = stmt.query_map([], |row| {
        let id: i64 = row.get(0)?;
        let data: String = row.get(1)?;
        let mut record: Record = serde_json::from_str(&data).map_err(|e| {
            duckdb::Error::FromSqlConversionFailure(1, duckdb::types::Type::Text, Box::new(e))
        })?;
        record.insert(ID_COLUMN.to_string(), id.into());
        Ok(record)
    })?;
    rows.collect()
}

fn next_id(conn: &Connection, table: &str) -> std::result::Result<i64, duckdb::Error> {
    conn.query_row(
        &format!("SELECT COALESCE(MAX(id), 0) + 1 FROM \"{table}\""),
        [],
        |row| row.get(0),
    )
}

fn encode(row: &Record) -> String {
    let mut data = row.clone();
    data.remove(ID_COLUMN);
    JsonValue::Object(data).to_string()
}

fn row_id(row: &Record) -> Option<i64> {
    row.get(ID_COLUMN).and_then(JsonValue::as_i64)
}

#[async_trait]
impl Store for DuckDbStore {
    async fn query(&self, table: &str, query: &Query) -> Result<Vec<Record>> {
        let rows = self.with_conn(table, |conn| load_rows(conn, table))?;
        Ok(query.apply(rows.iter()))
    }

    async fn insert(&self, table: &str, rows: &[Record]) -> Result<()> {
        self.with_conn(table, |conn| {
            let tx = conn.transaction()?;
            let mut id = next_id(&tx, table)?;
            {
                let mut stmt =
                    tx.prepare(&format!("INSERT INTO \"{table}\" (id, data) VALUES (?, ?)"))?;
                for row in rows {
                    stmt.execute(params![id, encode(row)])?;
                    id += 1;
                }
            }
            tx.commit()
        })
    }

    async fn upsert(&self, table: &str, rows: &[Record], conflict_key: &[&str]) -> Result<()> {
        self.with_conn(table, |conn| {
            let tx = conn.transaction()?;
            let mut existing = load_rows(&tx, table)?;
            let mut id = next_id(&tx, table)?;
            for row in rows {
                let found = existing.iter_mut().find(|stored| {
                    conflict_key.iter().all(|col| {
                        values_equal(
                            stored.get(*col).unwrap_or(&JsonValue::Null),
                            row.get(*col).unwrap_or(&JsonValue::Null),
                        )
                    })
                });
                match found {
                    Some(stored) => {
                        for (key, value) in row {
                            if key != ID_COLUMN {
                                stored.insert(key.clone(), value.clone());
                            }
                        }
                        let stored_id = row_id(stored).unwrap_or_default();
                        tx.execute(
                            &format!("UPDATE \"{table}\" SET data = ? WHERE id = ?"),
                            params![encode(stored), stored_id],
                        )?;
                    }
                    None => {
                        tx.execute(
                            &format!("INSERT INTO \"{table}\" (id, data) VALUES (?, ?)"),
                            params![id, encode(row)],
                        )?;
                        let mut stored = row.clone();
                        stored.insert(ID_COLUMN.to_string(), id.into());
                        existing.push(stored);
                        id += 1;
                    }
                }
            }
            tx.commit()
        })
    }

    async fn delete(&self, table: &str, filter: &Filter) -> Result<()> {
        if filter.is_empty() {
            return Err(Error::store(table, "refusing to delete without a filter"));
        }
        self.with_conn(table, |conn| {
            let ids: Vec<String> = load_rows(conn, table)?
                .iter()
                .filter(|r| filter.matches(r))
                .filter_map(row_id)
                .map(|id| id.to_string())
                .collect();
            if ids.is_empty() {
                return Ok(());
            }
            conn.execute_batch(&format!(
                "DELETE FROM \"{table}\" WHERE id IN ({});",
                ids.join(",")
            ))
        })
    }
}
