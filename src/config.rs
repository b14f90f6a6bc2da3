//! Runtime settings
//!
//! Settings are read from a YAML file, then secrets are layered on from the
//! environment so they never have to live in the file.

use crate::auth::{AuthConfig, Location, ServiceAccountKey};
use crate::error::{Error, Result};
use crate::http::{HttpClientConfig, RateLimiterConfig};
use crate::source::DEFAULT_SHEETS_URL;
use crate::store::{DuckDbStore, MemoryStore, RestStore, Store};
use crate::types::{BackoffType, BookkeepingMode};
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Store gateway URL
pub const ENV_STORE_URL: &str = "SHEETSYNC_STORE_URL";
/// Store gateway API key
pub const ENV_STORE_KEY: &str = "SHEETSYNC_STORE_KEY";
/// Pre-issued Sheets access token
pub const ENV_SHEETS_TOKEN: &str = "SHEETSYNC_SHEETS_TOKEN";
/// Sheets API key
pub const ENV_SHEETS_API_KEY: &str = "SHEETSYNC_SHEETS_API_KEY";
/// Service account key file contents, raw JSON or base64
pub const ENV_SERVICE_ACCOUNT_KEY: &str = "GOOGLE_SERVICE_ACCOUNT_KEY";

// ============================================================================
// Top-Level Settings
// ============================================================================

/// Complete runtime settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Spreadsheet source
    #[serde(default)]
    pub source: SourceConfig,

    /// Relational store
    #[serde(default)]
    pub store: StoreConfig,

    /// Sync behaviour
    #[serde(default)]
    pub sync: SyncSettings,
}

impl Settings {
    /// Parse settings from YAML
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Load from an optional file, then apply environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = match path {
            Some(path) => {
                let content = std::fs::read_to_string(path).map_err(|e| {
                    Error::config(format!("Failed to read {}: {e}", path.display()))
                })?;
                Self::from_yaml(&content)?
            }
            None => Self::default(),
        };
        settings.apply_env(|key| std::env::var(key).ok())?;
        Ok(settings)
    }

    /// Apply environment overrides through `lookup`. Blank values are ignored.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let StoreConfig::Rest { url, api_key } = &mut self.store {
            if let Some(value) = var(ENV_STORE_URL) {
                *url = value;
            }
            if let Some(value) = var(ENV_STORE_KEY) {
                *api_key = value;
            }
        }

        if let Some(token) = var(ENV_SHEETS_TOKEN) {
            self.source.auth = AuthConfig::Bearer { token };
        } else if let Some(value) = var(ENV_SHEETS_API_KEY) {
            self.source.auth = AuthConfig::ApiKey {
                location: Location::Query,
                header_name: None,
                query_param: None,
                value,
            };
        }

        if let AuthConfig::ServiceAccount { key, .. } = &mut self.source.auth {
            if key.is_none() {
                if let Some(raw) = var(ENV_SERVICE_ACCOUNT_KEY) {
                    *key = Some(parse_service_account_key(&raw)?);
                }
            }
        }

        Ok(())
    }

    /// Check that every credential a job needs is present
    pub fn validate(&self) -> Result<()> {
        self.validate_source()?;
        self.store.validate()
    }

    /// Check everything except the store, for jobs handed an open store
    pub fn validate_source(&self) -> Result<()> {
        if matches!(self.source.auth, AuthConfig::None) {
            return Err(Error::auth("no spreadsheet credentials configured"));
        }
        if !self.source.auth.is_complete() {
            return Err(Error::auth("spreadsheet credentials are incomplete"));
        }
        if self.sync.max_concurrent_tables == 0 {
            return Err(Error::InvalidConfigValue {
                field: "sync.max_concurrent_tables".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// Parse a service account key given as JSON or base64-encoded JSON
fn parse_service_account_key(raw: &str) -> Result<ServiceAccountKey> {
    let raw = raw.trim();
    let json = if raw.starts_with('{') {
        raw.to_string()
    } else {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(raw)
            .map_err(|e| invalid_key(e.to_string()))?;
        String::from_utf8(bytes).map_err(|e| invalid_key(e.to_string()))?
    };
    serde_json::from_str(&json).map_err(|e| invalid_key(e.to_string()))
}

fn invalid_key(message: String) -> Error {
    Error::InvalidConfigValue {
        field: ENV_SERVICE_ACCOUNT_KEY.to_string(),
        message,
    }
}

// ============================================================================
// Source Config
// ============================================================================

/// Spreadsheet source configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Sheets API base URL
    #[serde(default = "default_sheets_url")]
    pub base_url: String,

    /// Authentication
    #[serde(default)]
    pub auth: AuthConfig,

    /// Request rate cap
    #[serde(default)]
    pub requests_per_second: Option<u32>,

    /// HTTP client tuning
    #[serde(default)]
    pub http: HttpConfig,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: default_sheets_url(),
            auth: AuthConfig::default(),
            requests_per_second: None,
            http: HttpConfig::default(),
        }
    }
}

impl SourceConfig {
    /// HTTP client configuration for the source
    pub fn http_client_config(&self) -> HttpClientConfig {
        let rate_limit = self
            .requests_per_second
            .map_or_else(RateLimiterConfig::default, |rps| {
                RateLimiterConfig::new(rps.saturating_mul(60), rps.max(1))
            });
        HttpClientConfig::builder()
            .timeout(Duration::from_secs(self.http.timeout_seconds))
            .max_retries(self.http.max_retries)
            .backoff(
                self.http.retry_backoff.backoff_type,
                Duration::from_millis(self.http.retry_backoff.initial_ms),
                Duration::from_millis(self.http.retry_backoff.max_ms),
            )
            .rate_limit(rate_limit)
            .build()
    }
}

fn default_sheets_url() -> String {
    DEFAULT_SHEETS_URL.to_string()
}

/// HTTP client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Maximum number of retries
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Retry backoff configuration
    #[serde(default)]
    pub retry_backoff: BackoffConfig,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout(),
            max_retries: default_max_retries(),
            retry_backoff: BackoffConfig::default(),
        }
    }
}

fn default_timeout() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

/// Backoff configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackoffConfig {
    /// Type of backoff
    #[serde(rename = "type", default)]
    pub backoff_type: BackoffType,

    /// Initial delay in milliseconds
    #[serde(default = "default_initial_ms")]
    pub initial_ms: u64,

    /// Maximum delay in milliseconds
    #[serde(default = "default_max_ms")]
    pub max_ms: u64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            backoff_type: BackoffType::Exponential,
            initial_ms: default_initial_ms(),
            max_ms: default_max_ms(),
        }
    }
}

fn default_initial_ms() -> u64 {
    250
}

fn default_max_ms() -> u64 {
    30_000
}

// ============================================================================
// Store Config
// ============================================================================

/// Relational store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StoreConfig {
    /// PostgREST-compatible gateway
    Rest {
        #[serde(default)]
        url: String,
        #[serde(default)]
        api_key: String,
    },
    /// Local DuckDB file
    Duckdb { path: PathBuf },
    /// In-process store, lost on exit
    Memory,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::Rest {
            url: String::new(),
            api_key: String::new(),
        }
    }
}

impl StoreConfig {
    /// Check that the store can be opened
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Rest { url, api_key } => {
                if url.trim().is_empty() {
                    return Err(Error::missing_field("store.url"));
                }
                if api_key.trim().is_empty() {
                    return Err(Error::missing_field("store.api_key"));
                }
                Ok(())
            }
            Self::Duckdb { path } if path.as_os_str().is_empty() => {
                Err(Error::missing_field("store.path"))
            }
            _ => Ok(()),
        }
    }

    /// Open the store. `access_token` authorizes REST calls as a user.
    pub fn open(&self, access_token: Option<&str>) -> Result<Arc<dyn Store>> {
        self.validate()?;
        Ok(match self {
            Self::Rest { url, api_key } => Arc::new(RestStore::connect(url, api_key, access_token)?),
            Self::Duckdb { path } => Arc::new(DuckDbStore::open(path)?),
            Self::Memory => Arc::new(MemoryStore::new()),
        })
    }
}

// ============================================================================
// Sync Settings
// ============================================================================

/// Sync behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSettings {
    /// Override of the ids deleted per page on paginated tables
    #[serde(default)]
    pub page_size: Option<usize>,

    /// Override of the records per insert batch
    #[serde(default)]
    pub chunk_size: Option<usize>,

    /// Tables written at the same time
    #[serde(default = "default_max_concurrent_tables")]
    pub max_concurrent_tables: usize,

    /// Scope of the last-sync record
    #[serde(default)]
    pub bookkeeping: BookkeepingMode,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            page_size: None,
            chunk_size: None,
            max_concurrent_tables: default_max_concurrent_tables(),
            bookkeeping: BookkeepingMode::default(),
        }
    }
}

fn default_max_concurrent_tables() -> usize {
    8
}
