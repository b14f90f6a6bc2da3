//! Executors, one per write strategy

use super::chunk::chunk;
use super::merge::{dedup_by_key, merge_by_name};
use super::{TableWriter, Written};
use crate::error::{Error, Result};
use crate::registry::SyncSpec;
use crate::store::{Filter, Query};
use crate::transform::parse::normalize_name;
use crate::types::{JsonValue, Record, ID_COLUMN, UPDATED_AT_COLUMN};
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};

impl TableWriter<'_> {
    /// Upsert on the natural key after collapsing duplicate keys
    pub(super) async fn upsert(
        &self,
        spec: &SyncSpec,
        records: Vec<Record>,
        conflict_key: &[&str],
    ) -> Result<usize> {
        let records = dedup_by_key(records, conflict_key);
        for batch in chunk(&records, self.chunk_size()) {
            self.store.upsert(spec.table, batch, conflict_key).await?;
        }
        Ok(records.len())
    }

    /// Delete rows whose sibling value vanished from their group, then upsert.
    ///
    /// For each `group_by` combination in the batch, the tenant's rows of that
    /// group whose `sibling` is not among the batch's siblings are removed.
    pub(super) async fn stale_sibling_upsert(
        &self,
        spec: &SyncSpec,
        records: Vec<Record>,
        conflict_key: &[&str],
        group_by: &[&str],
        sibling: &str,
    ) -> Result<usize> {
        let records = dedup_by_key(records, conflict_key);

        let mut groups: BTreeMap<Vec<String>, (Vec<JsonValue>, Vec<JsonValue>)> = BTreeMap::new();
        for record in &records {
            let values: Vec<JsonValue> = group_by
                .iter()
                .map(|c| record.get(*c).cloned().unwrap_or(JsonValue::Null))
                .collect();
            let key = values.iter().map(ToString::to_string).collect();
            let (_, siblings) = groups.entry(key).or_insert_with(|| (values, Vec::new()));
            if let Some(value) = record.get(sibling).filter(|v| !v.is_null()) {
                if !siblings.contains(value) {
                    siblings.push(value.clone());
                }
            }
        }

        for (values, siblings) in groups.into_values() {
            let mut filter = self.tenant_filter(spec)?;
            for (column, value) in group_by.iter().zip(values) {
                filter = filter.eq(*column, value);
            }
            filter = filter.not_in(sibling, siblings);
            self.store.delete(spec.table, &filter).await?;
        }

        self.upsert(spec, records, conflict_key).await
    }

    /// Delete every tenant row, then insert
    pub(super) async fn replace(&self, spec: &SyncSpec, records: Vec<Record>) -> Result<usize> {
        self.delete_tenant_rows(spec).await?;
        for batch in chunk(&records, self.chunk_size()) {
            self.store.insert(spec.table, batch).await?;
        }
        Ok(records.len())
    }

    /// Replace while carrying a per-name flag over the delete.
    ///
    /// Incoming records are merged by normalized name with `sum_fields`
    /// added up; each merged record gets the flag its name had before.
    pub(super) async fn flag_preserving_replace(
        &self,
        spec: &SyncSpec,
        records: Vec<Record>,
        name_field: &str,
        flag_field: &str,
        sum_fields: &[&str],
    ) -> Result<usize> {
        let existing = self
            .store
            .query(
                spec.table,
                &Query::filtered(self.tenant_filter(spec)?).select(&[name_field, flag_field]),
            )
            .await?;
        let mut flags: HashMap<String, bool> = HashMap::new();
        for row in &existing {
            let Some(name) = row.get(name_field).and_then(JsonValue::as_str) else {
                continue;
            };
            let flagged = row.get(flag_field).and_then(JsonValue::as_bool).unwrap_or(false);
            *flags.entry(normalize_name(name)).or_default() |= flagged;
        }
        debug!(table = spec.table, preserved = flags.len(), "Read preserved flags");

        self.delete_tenant_rows(spec).await?;

        let updated_at = Utc::now().to_rfc3339();
        let mut merged = merge_by_name(records, name_field, sum_fields);
        for record in &mut merged {
            let flagged = record
                .get(name_field)
                .and_then(JsonValue::as_str)
                .and_then(|name| flags.get(&normalize_name(name)).copied())
                .unwrap_or(false);
            record.insert(flag_field.to_string(), flagged.into());
            record.insert(UPDATED_AT_COLUMN.to_string(), updated_at.clone().into());
        }

        for batch in chunk(&merged, self.chunk_size()) {
            self.store.insert(spec.table, batch).await?;
        }
        Ok(merged.len())
    }

    /// Paged delete, then chunked inserts that keep going past a failed chunk
    pub(super) async fn paginated_replace(
        &self,
        spec: &SyncSpec,
        records: Vec<Record>,
        page_size: usize,
        chunk_size: usize,
    ) -> Written {
        if let Err(error) = self.paged_delete(spec, page_size).await {
            return Written {
                rows: 0,
                error: Some(error),
            };
        }

        let batches = chunk(&records, chunk_size);
        let total = batches.len();
        let mut last_error = None;
        for (index, batch) in batches.into_iter().enumerate() {
            if let Err(error) = self.store.insert(spec.table, batch).await {
                warn!(
                    table = spec.table,
                    chunk = index + 1,
                    chunks = total,
                    rows = batch.len(),
                    error = %error,
                    "Insert chunk failed, continuing"
                );
                last_error = Some(error);
            }
        }

        Written {
            rows: records.len(),
            error: last_error,
        }
    }

    /// Delete the tenant's rows a page of ids at a time
    pub(super) async fn paged_delete(&self, spec: &SyncSpec, page_size: usize) -> Result<()> {
        let page_size = page_size.max(1);
        let tenant = self.tenant_filter(spec)?;
        let mut previous: Option<Vec<JsonValue>> = None;
        let mut pages = 0;

        loop {
            let ids: Vec<JsonValue> = self
                .store
                .query(
                    spec.table,
                    &Query::filtered(tenant.clone())
                        .select(&[ID_COLUMN])
                        .order_by(ID_COLUMN)
                        .limit(page_size),
                )
                .await?
                .into_iter()
                .filter_map(|mut row| row.remove(ID_COLUMN))
                .collect();
            if ids.is_empty() {
                break;
            }
            if previous.as_ref() == Some(&ids) {
                return Err(Error::store(spec.table, "paged delete made no progress"));
            }

            let last_page = ids.len() < page_size;
            self.store
                .delete(spec.table, &tenant.clone().is_in(ID_COLUMN, ids.clone()))
                .await?;
            pages += 1;
            if last_page {
                break;
            }
            previous = Some(ids);
        }

        debug!(table = spec.table, pages, "Deleted tenant rows");
        Ok(())
    }

    /// Delete every tenant row in one call
    pub(super) async fn delete_tenant_rows(&self, spec: &SyncSpec) -> Result<()> {
        let filter: Filter = self.tenant_filter(spec)?;
        self.store.delete(spec.table, &filter).await
    }
}
