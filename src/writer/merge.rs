//! Record deduplication and merging

use crate::transform::parse::normalize_name;
use crate::types::{JsonValue, Record};
use std::collections::HashMap;

/// Identity of a record under a set of key columns
fn key_of(record: &Record, columns: &[&str]) -> Vec<String> {
    columns
        .iter()
        .map(|c| record.get(*c).unwrap_or(&JsonValue::Null).to_string())
        .collect()
}

/// Collapse records with equal keys. The later record wins and takes the
/// position of the first occurrence.
pub fn dedup_by_key(records: Vec<Record>, columns: &[&str]) -> Vec<Record> {
    let mut positions: HashMap<Vec<String>, usize> = HashMap::new();
    let mut out: Vec<Record> = Vec::with_capacity(records.len());
    for record in records {
        let key = key_of(&record, columns);
        match positions.get(&key) {
            Some(&idx) => out[idx] = record,
            None => {
                positions.insert(key, out.len());
                out.push(record);
            }
        }
    }
    out
}

/// Merge records sharing a normalized `name_field`, summing `sum_fields`.
///
/// The first record of each name supplies every other field. Records
/// without a name are kept as they are.
pub fn merge_by_name(records: Vec<Record>, name_field: &str, sum_fields: &[&str]) -> Vec<Record> {
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut out: Vec<Record> = Vec::with_capacity(records.len());
    for record in records {
        let Some(name) = record.get(name_field).and_then(JsonValue::as_str) else {
            out.push(record);
            continue;
        };
        let name = normalize_name(name);
        match positions.get(&name) {
            Some(&idx) => {
                let merged = &mut out[idx];
                for field in sum_fields {
                    let total = number(merged.get(*field)) + number(record.get(*field));
                    merged.insert((*field).to_string(), JsonValue::from(total));
                }
            }
            None => {
                positions.insert(name, out.len());
                out.push(record);
            }
        }
    }
    out
}

fn number(value: Option<&JsonValue>) -> f64 {
    value.and_then(JsonValue::as_f64).unwrap_or(0.0)
}
