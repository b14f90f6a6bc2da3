//! Sync bookkeeping
//!
//! Remembers when the last successful job finished, in a `sync_status` table
//! on the store itself. One record per tenant, or a single record for the
//! whole deployment.

use crate::error::{Error, Result};
use crate::store::{Filter, Query, Store};
use crate::types::{BookkeepingMode, JsonValue, Record, TENANT_COLUMN};
use chrono::{DateTime, Utc};
use tracing::debug;

/// Table holding the last-sync records
pub const SYNC_STATUS_TABLE: &str = "sync_status";

/// Scope value of the deployment-wide record
pub const GLOBAL_SCOPE: &str = "global";

const SCOPE_COLUMN: &str = "scope";
const LAST_SYNCED_COLUMN: &str = "last_synced_at";

/// Reads and writes the last-sync record
#[derive(Debug, Clone, Copy)]
pub struct Bookkeeper<'a> {
    store: &'a dyn Store,
    mode: BookkeepingMode,
}

impl<'a> Bookkeeper<'a> {
    /// Create a bookkeeper over a store
    pub fn new(store: &'a dyn Store, mode: BookkeepingMode) -> Self {
        Self { store, mode }
    }

    fn scope<'t>(&self, tenant: &'t str) -> &'t str {
        match self.mode {
            BookkeepingMode::PerTenant => tenant,
            BookkeepingMode::Global => GLOBAL_SCOPE,
        }
    }

    /// Record a successful job for `tenant` at `at`
    pub async fn record_success(&self, tenant: &str, at: DateTime<Utc>) -> Result<()> {
        let mut record = Record::new();
        record.insert(SCOPE_COLUMN.to_string(), self.scope(tenant).into());
        if self.mode == BookkeepingMode::PerTenant {
            record.insert(TENANT_COLUMN.to_string(), tenant.into());
        }
        record.insert(LAST_SYNCED_COLUMN.to_string(), at.to_rfc3339().into());

        self.store
            .upsert(SYNC_STATUS_TABLE, &[record], &[SCOPE_COLUMN])
            .await?;
        debug!(scope = self.scope(tenant), at = %at, "Recorded sync completion");
        Ok(())
    }

    /// When `tenant` last synced successfully
    pub async fn last_sync(&self, tenant: &str) -> Result<Option<DateTime<Utc>>> {
        let rows = self
            .store
            .query(
                SYNC_STATUS_TABLE,
                &Query::filtered(Filter::new().eq(SCOPE_COLUMN, self.scope(tenant)))
                    .select(&[LAST_SYNCED_COLUMN])
                    .limit(1),
            )
            .await?;

        let Some(value) = rows.first().and_then(|r| r.get(LAST_SYNCED_COLUMN)) else {
            return Ok(None);
        };
        match value {
            JsonValue::Null => Ok(None),
            JsonValue::String(s) => DateTime::parse_from_rfc3339(s)
                .map(|t| Some(t.with_timezone(&Utc)))
                .map_err(|e| Error::store(SYNC_STATUS_TABLE, format!("bad {LAST_SYNCED_COLUMN}: {e}"))),
            other => Err(Error::store(
                SYNC_STATUS_TABLE,
                format!("bad {LAST_SYNCED_COLUMN}: {other}"),
            )),
        }
    }
}
