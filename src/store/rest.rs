//! PostgREST-compatible store
//!
//! Talks to `{url}/rest/v1/{table}` using the PostgREST filter dialect.
//! Upserts use `on_conflict` with `Prefer: resolution=merge-duplicates`.

use super::filter::{Condition, Filter, Query};
use super::Store;
use crate::auth::AuthConfig;
use crate::error::{Error, Result};
use crate::http::{HttpClient, HttpClientConfig, RateLimiterConfig, RequestConfig};
use crate::types::{JsonValue, Record};
use async_trait::async_trait;
use reqwest::Method;
use tracing::debug;

/// Store backed by a PostgREST gateway
#[derive(Debug)]
pub struct RestStore {
    client: HttpClient,
}

impl RestStore {
    /// Open a store session.
    ///
    /// `api_key` goes into the `apikey` header; `access_token`, when given,
    /// authorizes as that user, otherwise the key itself is the bearer.
    pub fn connect(url: &str, api_key: &str, access_token: Option<&str>) -> Result<Self> {
        if url.trim().is_empty() {
            return Err(Error::missing_field("store.url"));
        }
        if api_key.trim().is_empty() {
            return Err(Error::missing_field("store.api_key"));
        }

        let config = HttpClientConfig::builder()
            .base_url(format!("{}/rest/v1", url.trim_end_matches('/')))
            .rate_limit(RateLimiterConfig::store_gateway())
            .header("apikey", api_key)
            .build();
        let token = access_token.unwrap_or(api_key).to_string();
        let client = HttpClient::with_auth(config, AuthConfig::Bearer { token })?;

        Ok(Self { client })
    }

    async fn send(&self, table: &str, method: Method, config: RequestConfig) -> Result<reqwest::Response> {
        self.client
            .request(method, &format!("/{table}"), config)
            .await
            .map_err(|e| Error::store(table, e.to_string()))
    }
}

/// Render filter conditions as PostgREST query parameters
pub(crate) fn filter_params(filter: &Filter) -> Vec<(String, String)> {
    filter
        .conditions()
        .iter()
        .map(|condition| {
            let value = match condition {
                Condition::Eq(_, JsonValue::Null) => "is.null".to_string(),
                Condition::Eq(_, v) => format!("eq.{}", render_scalar(v)),
                Condition::In(_, vs) => format!("in.({})", render_list(vs)),
                Condition::NotIn(_, vs) => format!("not.in.({})", render_list(vs)),
            };
            (condition.column().to_string(), value)
        })
        .collect()
}

fn render_scalar(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        JsonValue::Null => "null".to_string(),
        other => other.to_string(),
    }
}

fn render_list(values: &[JsonValue]) -> String {
    values
        .iter()
        .map(|v| {
            let raw = render_scalar(v);
            if raw.contains([',', '(', ')', '"', ' ']) {
                format!("\"{}\"", raw.replace('"', "\\\""))
            } else {
                raw
            }
        })
        .collect::<Vec<_>>()
        .join(",")
}

#[async_trait]
impl Store for RestStore {
    async fn query(&self, table: &str, query: &Query) -> Result<Vec<Record>> {
        let mut config = RequestConfig::new();
        let select = query
            .columns
            .as_ref()
            .map_or_else(|| "*".to_string(), |c| c.join(","));
        config = config.query("select", select);
        for (key, value) in filter_params(&query.filter) {
            config = config.query(key, value);
        }
        if let Some(column) = &query.order_by {
            config = config.query("order", format!("{column}.asc"));
        }
        if let Some(limit) = query.limit {
            config = config.query("limit", limit.to_string());
        }

        let response = self.send(table, Method::GET, config).await?;
        let rows: Vec<Record> = response
            .json()
            .await
            .map_err(|e| Error::store(table, format!("invalid response body: {e}")))?;
        debug!(table, rows = rows.len(), "Queried store");
        Ok(rows)
    }

    async fn insert(&self, table: &str, rows: &[Record]) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }
        let config = RequestConfig::new()
            .header("Prefer", "return=minimal")
            .json(JsonValue::Array(
                rows.iter().cloned().map(JsonValue::Object).collect(),
            ))
            .retries(0);
        self.send(table, Method::POST, config).await?;
        Ok(())
    }

    async fn upsert(&self, table: &str, rows: &[Record], conflict_key: &[&str]) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }
        let config = RequestConfig::new()
            .query("on_conflict", conflict_key.join(","))
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(JsonValue::Array(
                rows.iter().cloned().map(JsonValue::Object).collect(),
            ));
        self.send(table, Method::POST, config).await?;
        Ok(())
    }

    async fn delete(&self, table: &str, filter: &Filter) -> Result<()> {
        if filter.is_empty() {
            return Err(Error::store(table, "refusing to delete without a filter"));
        }
        let mut config = RequestConfig::new().header("Prefer", "return=minimal");
        for (key, value) in filter_params(filter) {
            config = config.query(key, value);
        }
        self.send(table, Method::DELETE, config).await?;
        Ok(())
    }
}
