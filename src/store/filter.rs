//! Row filters and read queries
//!
//! Filters are a conjunction of column conditions. They are rendered to the
//! PostgREST query dialect by `RestStore` and evaluated in-process by the
//! local backends.

use crate::types::{JsonValue, Record};

/// A single column condition
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// `column = value`
    Eq(String, JsonValue),
    /// `column IN (values)`
    In(String, Vec<JsonValue>),
    /// `column NOT IN (values)`
    NotIn(String, Vec<JsonValue>),
}

impl Condition {
    /// Column this condition applies to
    pub fn column(&self) -> &str {
        match self {
            Condition::Eq(c, _)
            | Condition::In(c, _)
            | Condition::NotIn(c, _) => c,
        }
    }

    /// Evaluate against a record with SQL null semantics: a null column
    /// never satisfies a comparison other than `Eq(null)`.
    pub fn matches(&self, record: &Record) -> bool {
        let actual = record.get(self.column()).unwrap_or(&JsonValue::Null);
        match self {
            Condition::Eq(_, expected) => values_equal(actual, expected),
            Condition::In(_, options) => options.iter().any(|v| values_equal(actual, v)),
            Condition::NotIn(_, options) => {
                !actual.is_null() && !options.iter().any(|v| values_equal(actual, v))
            }
        }
    }
}

/// Conjunction of conditions. An empty filter matches every row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<Condition>,
}

impl Filter {
    /// Create an empty filter
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an equality condition
    #[must_use]
    pub fn eq(mut self, column: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.conditions
            .push(Condition::Eq(column.into(), value.into()));
        self
    }

    /// Add a membership condition
    #[must_use]
    pub fn is_in(mut self, column: impl Into<String>, values: Vec<JsonValue>) -> Self {
        self.conditions.push(Condition::In(column.into(), values));
        self
    }

    /// Add an exclusion condition
    #[must_use]
    pub fn not_in(mut self, column: impl Into<String>, values: Vec<JsonValue>) -> Self {
        self.conditions.push(Condition::NotIn(column.into(), values));
        self
    }

    /// The conditions, in insertion order
    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    /// Whether this filter matches every row
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Evaluate against a record
    pub fn matches(&self, record: &Record) -> bool {
        self.conditions.iter().all(|c| c.matches(record))
    }
}

/// A read request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    /// Row filter
    pub filter: Filter,
    /// Columns to return (all when `None`)
    pub columns: Option<Vec<String>>,
    /// Maximum rows to return
    pub limit: Option<usize>,
    /// Column to sort ascending by
    pub order_by: Option<String>,
}

impl Query {
    /// Query all rows matching a filter
    pub fn filtered(filter: Filter) -> Self {
        Self {
            filter,
            ..Self::default()
        }
    }

    /// Restrict the returned columns
    #[must_use]
    pub fn select(mut self, columns: &[&str]) -> Self {
        self.columns = Some(columns.iter().map(ToString::to_string).collect());
        self
    }

    /// Limit the number of rows
    #[must_use]
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Sort ascending by a column
    #[must_use]
    pub fn order_by(mut self, column: impl Into<String>) -> Self {
        self.order_by = Some(column.into());
        self
    }

    /// Apply this query to an in-memory row set
    pub fn apply<'a>(&self, rows: impl Iterator<Item = &'a Record>) -> Vec<Record> {
        let mut matched: Vec<&Record> = rows.filter(|r| self.filter.matches(r)).collect();

        if let Some(column) = &self.order_by {
            matched.sort_by(|a, b| compare_values(a.get(column), b.get(column)));
        }
        if let Some(limit) = self.limit {
            matched.truncate(limit);
        }

        matched
            .into_iter()
            .map(|row| match &self.columns {
                Some(columns) => columns
                    .iter()
                    .filter_map(|c| row.get(c).map(|v| (c.clone(), v.clone())))
                    .collect(),
                None => row.clone(),
            })
            .collect()
    }
}

/// Compare two JSON scalars the way a database would compare column values
pub(crate) fn values_equal(a: &JsonValue, b: &JsonValue) -> bool {
    match (a, b) {
        (JsonValue::Number(x), JsonValue::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

fn compare_values(a: Option<&JsonValue>, b: Option<&JsonValue>) -> std::cmp::Ordering {
    use std::cmp::Ordering;
    let a = a.filter(|v| !v.is_null());
    let b = b.filter(|v| !v.is_null());
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(JsonValue::Number(x)), Some(JsonValue::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(JsonValue::String(x)), Some(JsonValue::String(y))) => x.cmp(y),
        _ => Ordering::Equal,
    }
}
