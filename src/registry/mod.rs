//! Table sync registry
//!
//! Static mapping of named source ranges to destination tables. Each entry
//! carries its row transform and the write strategy used to reconcile the
//! table. The registry is immutable and shared freely between executors.

use crate::error::{Error, Result};
use crate::transform::{tables, TransformFn};
use crate::types::TENANT_COLUMN;
use serde::Serialize;

/// How a table is reconciled against the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteStrategy {
    /// Upsert on a natural key
    Upsert { conflict_key: &'static [&'static str] },
    /// Remove rows whose sibling value disappeared from a group, then upsert
    StaleSiblingUpsert {
        conflict_key: &'static [&'static str],
        group_by: &'static [&'static str],
        sibling: &'static str,
    },
    /// Delete all tenant rows, then insert
    Replace,
    /// Replace while carrying a user-set flag across, merging duplicates by name
    FlagPreservingReplace {
        name_field: &'static str,
        flag_field: &'static str,
        sum_fields: &'static [&'static str],
    },
    /// Replace with paged deletes and chunked inserts
    PaginatedReplace { page_size: usize, chunk_size: usize },
}

impl WriteStrategy {
    /// Whether the strategy deletes existing tenant rows before writing
    pub fn is_replace(&self) -> bool {
        matches!(
            self,
            Self::Replace | Self::FlagPreservingReplace { .. } | Self::PaginatedReplace { .. }
        )
    }

    /// Short label for logs
    pub fn label(&self) -> &'static str {
        match self {
            Self::Upsert { .. } => "upsert",
            Self::StaleSiblingUpsert { .. } => "stale_sibling_upsert",
            Self::Replace => "replace",
            Self::FlagPreservingReplace { .. } => "flag_preserving_replace",
            Self::PaginatedReplace { .. } => "paginated_replace",
        }
    }
}

/// One source range to destination table mapping
#[derive(Debug, Clone, Copy)]
pub struct SyncSpec {
    /// Named range (or sheet title) in the spreadsheet
    pub source_range: &'static str,
    /// Destination table
    pub table: &'static str,
    /// Row transform
    pub transform: TransformFn,
    /// Write strategy
    pub strategy: WriteStrategy,
    /// Shared across tenants (no tenant column)
    pub global: bool,
}

/// Every synced table, in reporting order
pub static REGISTRY: &[SyncSpec] = &[
    SyncSpec {
        source_range: "NetWorth",
        table: "net_worth_history",
        transform: tables::net_worth,
        strategy: WriteStrategy::Upsert {
            conflict_key: &[TENANT_COLUMN, "category", "date"],
        },
        global: false,
    },
    SyncSpec {
        source_range: "ExchangeRates",
        table: "exchange_rates",
        transform: tables::exchange_rates,
        strategy: WriteStrategy::Upsert {
            conflict_key: &["date"],
        },
        global: true,
    },
    SyncSpec {
        source_range: "Balances",
        table: "account_balances",
        transform: tables::balances,
        strategy: WriteStrategy::StaleSiblingUpsert {
            conflict_key: &[TENANT_COLUMN, "account", "category", "institution", "date"],
            group_by: &["account", "category"],
            sibling: "institution",
        },
        global: false,
    },
    SyncSpec {
        source_range: "MonthlySummary",
        table: "monthly_summary",
        transform: tables::monthly_summary,
        strategy: WriteStrategy::Replace,
        global: false,
    },
    SyncSpec {
        source_range: "Allocation",
        table: "asset_allocation",
        transform: tables::asset_allocation,
        strategy: WriteStrategy::Replace,
        global: false,
    },
    SyncSpec {
        source_range: "Budget",
        table: "budget_categories",
        transform: tables::budget,
        strategy: WriteStrategy::Replace,
        global: false,
    },
    SyncSpec {
        source_range: "Recurring",
        table: "recurring_payments",
        transform: tables::recurring,
        strategy: WriteStrategy::FlagPreservingReplace {
            name_field: "name",
            flag_field: "marked_for_cancellation",
            sum_fields: &["monthly_amount", "annual_amount"],
        },
        global: false,
    },
    SyncSpec {
        source_range: "Transactions",
        table: "transactions",
        transform: tables::transactions,
        strategy: WriteStrategy::PaginatedReplace {
            page_size: 1000,
            chunk_size: 500,
        },
        global: false,
    },
];

/// Find the spec for a destination table
pub fn by_table(table: &str) -> Option<&'static SyncSpec> {
    REGISTRY.iter().find(|spec| spec.table == table)
}

/// Find the spec for a source range
pub fn by_range(range: &str) -> Option<&'static SyncSpec> {
    REGISTRY.iter().find(|spec| spec.source_range == range)
}

/// Resolve a comma-separated table list. Blank means every table.
pub fn select(tables: Option<&str>) -> Result<Vec<SyncSpec>> {
    let names: Vec<&str> = tables
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect();
    if names.is_empty() {
        return Ok(REGISTRY.to_vec());
    }
    names
        .into_iter()
        .map(|name| {
            by_table(name).copied().ok_or_else(|| Error::InvalidConfigValue {
                field: "tables".to_string(),
                message: format!("unknown table '{name}'"),
            })
        })
        .collect()
}

/// Public description of a registered table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableInfo {
    pub range: &'static str,
    pub table: &'static str,
    pub strategy: &'static str,
    pub global: bool,
}

impl From<&SyncSpec> for TableInfo {
    fn from(spec: &SyncSpec) -> Self {
        Self {
            range: spec.source_range,
            table: spec.table,
            strategy: spec.strategy.label(),
            global: spec.global,
        }
    }
}

/// Describe every registered table
pub fn describe() -> Vec<TableInfo> {
    REGISTRY.iter().map(TableInfo::from).collect()
}

#[cfg(test)]
mod tests;
