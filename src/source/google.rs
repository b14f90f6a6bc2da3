//! Google Sheets v4 source

use super::SheetSource;
use crate::auth::AuthConfig;
use crate::error::{Error, Result};
use crate::http::{HttpClient, HttpClientConfig, RateLimiterConfig, RequestConfig};
use crate::types::{JsonValue, ValueGrid};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::debug;
use url::Url;

/// Public Sheets API endpoint
pub const DEFAULT_SHEETS_URL: &str = "https://sheets.googleapis.com";

/// Source reading one spreadsheet over the Sheets REST API
#[derive(Debug)]
pub struct GoogleSheetsSource {
    client: HttpClient,
    base_url: Url,
    spreadsheet_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SpreadsheetMeta {
    #[serde(default)]
    named_ranges: Vec<NamedRange>,
    #[serde(default)]
    sheets: Vec<Sheet>,
}

#[derive(Debug, Deserialize)]
struct NamedRange {
    name: String,
}

#[derive(Debug, Deserialize)]
struct Sheet {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
struct SheetProperties {
    title: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BatchGetResponse {
    #[serde(default)]
    value_ranges: Vec<ValueRange>,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<JsonValue>>,
}

impl GoogleSheetsSource {
    /// Create a source for `spreadsheet_id`.
    ///
    /// `requests_per_second` caps the request rate; the default read quota
    /// applies when `None`.
    pub fn new(
        base_url: &str,
        spreadsheet_id: impl Into<String>,
        auth: AuthConfig,
        requests_per_second: Option<u32>,
    ) -> Result<Self> {
        let rate_limit = requests_per_second.map_or_else(RateLimiterConfig::default, |rps| {
            RateLimiterConfig::new(rps.saturating_mul(60), rps.max(1))
        });
        let config = HttpClientConfig::builder().rate_limit(rate_limit).build();
        Self::with_http_config(base_url, spreadsheet_id, auth, config)
    }

    /// Create a source with full control over the HTTP client
    pub fn with_http_config(
        base_url: &str,
        spreadsheet_id: impl Into<String>,
        auth: AuthConfig,
        config: HttpClientConfig,
    ) -> Result<Self> {
        let spreadsheet_id = spreadsheet_id.into();
        if spreadsheet_id.trim().is_empty() {
            return Err(Error::missing_field("spreadsheet_id"));
        }
        let base_url = Url::parse(base_url)?;
        let client = HttpClient::with_auth(config, auth)?;

        Ok(Self {
            client,
            base_url,
            spreadsheet_id,
        })
    }

    /// Spreadsheet this source reads
    pub fn spreadsheet_id(&self) -> &str {
        &self.spreadsheet_id
    }

    /// Absolute URL for `v4/spreadsheets/{id}/{tail...}` with each segment escaped
    fn endpoint(&self, tail: &[&str]) -> Result<String> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| Error::config(format!("base URL cannot be a base: {}", self.base_url)))?
            .pop_if_empty()
            .extend(["v4", "spreadsheets", self.spreadsheet_id.as_str()])
            .extend(tail);
        Ok(url.to_string())
    }

    fn values_config() -> RequestConfig {
        RequestConfig::new()
            .query("valueRenderOption", "UNFORMATTED_VALUE")
            .query("dateTimeRenderOption", "SERIAL_NUMBER")
    }
}

#[async_trait]
impl SheetSource for GoogleSheetsSource {
    async fn list_ranges(&self) -> Result<Vec<String>> {
        let url = self.endpoint(&[])?;
        let config = RequestConfig::new().query("fields", "namedRanges.name,sheets.properties.title");
        let meta: SpreadsheetMeta = self.client.get_json(&url, config).await?;

        let mut names: Vec<String> = meta.named_ranges.into_iter().map(|r| r.name).collect();
        for sheet in meta.sheets {
            if !names.contains(&sheet.properties.title) {
                names.push(sheet.properties.title);
            }
        }
        debug!(spreadsheet = %self.spreadsheet_id, ranges = names.len(), "Listed ranges");
        Ok(names)
    }

    async fn batch_get(&self, ranges: &[String]) -> Result<HashMap<String, ValueGrid>> {
        if ranges.is_empty() {
            return Ok(HashMap::new());
        }
        let url = self.endpoint(&["values:batchGet"])?;
        let mut config = Self::values_config();
        for range in ranges {
            config = config.query("ranges", range.as_str());
        }
        let response: BatchGetResponse = self.client.get_json(&url, config).await?;

        // Value ranges come back in request order, with A1 ranges in place of names
        if response.value_ranges.len() != ranges.len() {
            return Err(Error::sheet(format!(
                "batch fetch returned {} ranges for {} requested",
                response.value_ranges.len(),
                ranges.len()
            )));
        }
        Ok(ranges
            .iter()
            .cloned()
            .zip(response.value_ranges.into_iter().map(|vr| vr.values))
            .collect())
    }

    async fn get(&self, range: &str) -> Result<ValueGrid> {
        let url = self.endpoint(&["values", range])?;
        let response: ValueRange = self
            .client
            .get_json(&url, Self::values_config())
            .await
            .map_err(|e| Error::range_fetch(range, e.to_string()))?;
        Ok(response.values)
    }
}
