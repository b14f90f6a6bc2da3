//! Common types used throughout SheetSync
//!
//! Shared type aliases for cell values, rows and records, plus a few
//! small enums used by more than one module.

use serde::{Deserialize, Serialize};

// ============================================================================
// Type Aliases
// ============================================================================

/// JSON value type (re-exported from serde_json)
pub type JsonValue = serde_json::Value;

/// One destination row: column name to value
pub type Record = serde_json::Map<String, JsonValue>;

/// One source row: positional scalar cells
pub type RawRow = Vec<JsonValue>;

/// A 2D grid of cell values as returned for one range
pub type ValueGrid = Vec<RawRow>;

/// Column carrying the owning tenant on non-global tables
pub const TENANT_COLUMN: &str = "user_id";

/// Column carrying the refresh timestamp where a table tracks one
pub const UPDATED_AT_COLUMN: &str = "updated_at";

/// Row identifier column used for paginated deletes
pub const ID_COLUMN: &str = "id";

// ============================================================================
// Backoff Type
// ============================================================================

/// Backoff strategy for retries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffType {
    /// Constant delay between retries
    Constant,
    /// Linear increase in delay
    Linear,
    /// Exponential increase in delay
    #[default]
    Exponential,
}

// ============================================================================
// Bookkeeping Mode
// ============================================================================

/// Scope of the "last synced" bookkeeping record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookkeepingMode {
    /// One record per tenant
    #[default]
    PerTenant,
    /// One record for the whole deployment
    Global,
}

/// Whether a cell value is null or blank text
pub fn is_blank(value: &JsonValue) -> bool {
    match value {
        JsonValue::Null => true,
        JsonValue::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_is_blank() {
        assert!(is_blank(&json!(null)));
        assert!(is_blank(&json!("   ")));
        assert!(!is_blank(&json!("x")));
        assert!(!is_blank(&json!(0)));
        assert!(!is_blank(&json!(false)));
    }

    #[test]
    fn test_backoff_type_serde() {
        let parsed: BackoffType = serde_json::from_str("\"linear\"").unwrap();
        assert_eq!(parsed, BackoffType::Linear);
        assert_eq!(BackoffType::default(), BackoffType::Exponential);
    }

    #[test]
    fn test_bookkeeping_mode_serde() {
        let parsed: BookkeepingMode = serde_json::from_str("\"global\"").unwrap();
        assert_eq!(parsed, BookkeepingMode::Global);
    }
}
