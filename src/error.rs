//! Error types for SheetSync
//!
//! This module defines the error hierarchy for the entire crate.
//! All public APIs return `Result<T, Error>` where Error is defined here.

use serde::Serialize;
use thiserror::Error;

/// The main error type for SheetSync
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Missing required config field: {field}")]
    MissingConfigField { field: String },

    #[error("Invalid config value for '{field}': {message}")]
    InvalidConfigValue { field: String, message: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    // ============================================================================
    // Authentication Errors
    // ============================================================================
    #[error("Authentication failed: {message}")]
    Auth { message: String },

    #[error("Token refresh failed: {message}")]
    TokenRefresh { message: String },

    #[error("JWT generation failed: {message}")]
    JwtGeneration { message: String },

    // ============================================================================
    // HTTP Errors
    // ============================================================================
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("Rate limited, retry after {retry_after_seconds}s")]
    RateLimited { retry_after_seconds: u64 },

    #[error("Request timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Max retries ({max_retries}) exceeded")]
    MaxRetriesExceeded { max_retries: u32 },

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ============================================================================
    // Source Errors
    // ============================================================================
    #[error("Spreadsheet source error: {message}")]
    Source { message: String },

    #[error("Range '{range}' could not be fetched: {message}")]
    RangeFetch { range: String, message: String },

    // ============================================================================
    // Store Errors
    // ============================================================================
    #[error("Store error on '{table}': {message}")]
    Store { table: String, message: String },

    // ============================================================================
    // I/O Errors
    // ============================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse classification of a job-fatal error, rendered to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Credentials or identifiers are missing, malformed or rejected
    Credentials,
    /// The spreadsheet could not be reached or does not exist
    SourceAccess,
    /// The credentials are valid but lack access to the resource
    Permission,
    /// The relational store rejected or failed an operation
    Store,
    /// Anything else
    Other,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Credentials => "credential problem",
            Self::SourceAccess => "source access problem",
            Self::Permission => "permission problem",
            Self::Store => "store problem",
            Self::Other => "unexpected problem",
        };
        f.write_str(label)
    }
}

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a missing field error
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingConfigField {
            field: field.into(),
        }
    }

    /// Create an auth error
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth {
            message: message.into(),
        }
    }

    /// Create an HTTP status error
    pub fn http_status(status: u16, body: impl Into<String>) -> Self {
        Self::HttpStatus {
            status,
            body: body.into(),
        }
    }

    /// Create a source error
    pub fn sheet(message: impl Into<String>) -> Self {
        Self::Source {
            message: message.into(),
        }
    }

    /// Create a per-range fetch error
    pub fn range_fetch(range: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RangeFetch {
            range: range.into(),
            message: message.into(),
        }
    }

    /// Create a store error
    pub fn store(table: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Store {
            table: table.into(),
            message: message.into(),
        }
    }

    /// Classify this error for whole-job failure reporting
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            Error::Config { .. }
            | Error::MissingConfigField { .. }
            | Error::InvalidConfigValue { .. }
            | Error::Auth { .. }
            | Error::TokenRefresh { .. }
            | Error::JwtGeneration { .. } => FailureKind::Credentials,
            Error::HttpStatus { status: 401, .. } => FailureKind::Credentials,
            Error::HttpStatus { status: 403, .. } => FailureKind::Permission,
            Error::HttpStatus { .. }
            | Error::Http(_)
            | Error::Timeout { .. }
            | Error::RateLimited { .. }
            | Error::MaxRetriesExceeded { .. }
            | Error::InvalidUrl(_)
            | Error::Source { .. }
            | Error::RangeFetch { .. } => FailureKind::SourceAccess,
            Error::Store { .. } => FailureKind::Store,
            _ => FailureKind::Other,
        }
    }
}

/// Result type alias for SheetSync
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::config("test message");
        assert_eq!(err.to_string(), "Configuration error: test message");

        let err = Error::missing_field("spreadsheet_id");
        assert_eq!(
            err.to_string(),
            "Missing required config field: spreadsheet_id"
        );

        let err = Error::store("transactions", "duplicate key");
        assert_eq!(
            err.to_string(),
            "Store error on 'transactions': duplicate key"
        );
    }

    #[test]
    fn test_failure_kind_classification() {
        assert_eq!(
            Error::missing_field("tenant_id").failure_kind(),
            FailureKind::Credentials
        );
        assert_eq!(
            Error::http_status(401, "").failure_kind(),
            FailureKind::Credentials
        );
        assert_eq!(
            Error::http_status(403, "").failure_kind(),
            FailureKind::Permission
        );
        assert_eq!(
            Error::http_status(404, "").failure_kind(),
            FailureKind::SourceAccess
        );
        assert_eq!(
            Error::store("t", "x").failure_kind(),
            FailureKind::Store
        );
        assert_eq!(
            Error::Io(std::io::Error::other("x")).failure_kind(),
            FailureKind::Other
        );
    }

    #[test]
    fn test_failure_kind_display() {
        assert_eq!(FailureKind::Permission.to_string(), "permission problem");
    }
}
