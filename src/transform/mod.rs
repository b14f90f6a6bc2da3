//! Row transform layer
//!
//! Each destination table owns a pure function turning one positional source
//! row into a typed record, or `None` to skip the row. Transforms fail closed:
//! anything unparseable is a skip, never an error.
//!
//! # Overview
//!
//! - `parse` - cell parsers shared by every table (amounts, dates, percents)
//! - `tables` - the per-table transforms and their row types

pub mod parse;
pub mod tables;

use crate::types::{is_blank, JsonValue, Record};
use serde::Serialize;

/// A per-table row transform
pub type TransformFn = fn(&[JsonValue]) -> Option<Record>;

/// Run a transform and apply the whole-row emptiness check
pub fn apply(transform: TransformFn, row: &[JsonValue]) -> Option<Record> {
    let record = transform(row)?;
    if record.values().all(is_blank) {
        return None;
    }
    Some(record)
}

/// Convert a typed row into a record
pub(crate) fn to_record<T: Serialize>(row: &T) -> Option<Record> {
    match serde_json::to_value(row).ok()? {
        JsonValue::Object(map) => Some(map),
        _ => None,
    }
}

#[cfg(test)]
mod tests;
