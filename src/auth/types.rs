//! Auth configuration types
//!
//! These types represent the runtime auth configuration after settings
//! and environment overrides have been resolved.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Google's OAuth2 token endpoint
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Read-only spreadsheet scope
pub const SHEETS_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets.readonly";

/// Location for API key placement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Location {
    /// Place in HTTP header
    Header,
    /// Place in query parameter
    #[default]
    Query,
}

/// Authentication configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuthConfig {
    /// No authentication required
    #[default]
    None,

    /// API Key authentication (header or query)
    ApiKey {
        /// Where to place the API key
        #[serde(default)]
        location: Location,
        /// Header name (for header location)
        #[serde(default)]
        header_name: Option<String>,
        /// Query parameter name (for query location)
        #[serde(default)]
        query_param: Option<String>,
        /// The API key value
        #[serde(default)]
        value: String,
    },

    /// Pre-issued bearer token (e.g. a user's OAuth access token)
    Bearer {
        /// The bearer token
        #[serde(default)]
        token: String,
    },

    /// OAuth2 Refresh Token flow
    Oauth2Refresh {
        /// Token endpoint URL
        #[serde(default = "default_token_url")]
        token_url: String,
        /// Client ID
        client_id: String,
        /// Client secret
        client_secret: String,
        /// Refresh token
        refresh_token: String,
    },

    /// Google service account (signed JWT exchanged for an access token)
    ServiceAccount {
        /// Parsed key file; filled from `GOOGLE_SERVICE_ACCOUNT_KEY` when absent
        #[serde(default)]
        key: Option<ServiceAccountKey>,
        /// Scopes to request
        #[serde(default = "default_scopes")]
        scopes: Vec<String>,
        /// Account to impersonate (domain-wide delegation)
        #[serde(default)]
        subject: Option<String>,
    },
}

fn default_token_url() -> String {
    GOOGLE_TOKEN_URL.to_string()
}

fn default_scopes() -> Vec<String> {
    vec![SHEETS_READONLY_SCOPE.to_string()]
}

impl AuthConfig {
    /// Check that the credentials this config needs are actually present
    pub fn is_complete(&self) -> bool {
        match self {
            AuthConfig::None => true,
            AuthConfig::ApiKey { value, .. } => !value.trim().is_empty(),
            AuthConfig::Bearer { token } => !token.trim().is_empty(),
            AuthConfig::Oauth2Refresh {
                client_id,
                client_secret,
                refresh_token,
                ..
            } => ![client_id, client_secret, refresh_token]
                .iter()
                .any(|v| v.trim().is_empty()),
            AuthConfig::ServiceAccount { key, .. } => key
                .as_ref()
                .is_some_and(|k| !k.client_email.is_empty() && !k.private_key.is_empty()),
        }
    }
}

/// The subset of a Google service account key file we use
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceAccountKey {
    /// Service account email (JWT issuer)
    pub client_email: String,
    /// PEM-encoded RSA private key
    pub private_key: String,
    /// Token endpoint (JWT audience)
    #[serde(default = "default_token_url")]
    pub token_uri: String,
}

/// Cached token with expiration
#[derive(Debug, Clone)]
pub struct CachedToken {
    /// The access token
    pub token: String,
    /// When the token expires
    pub expires_at: Option<DateTime<Utc>>,
}

impl CachedToken {
    /// Create a new cached token
    pub fn new(token: String, expires_at: Option<DateTime<Utc>>) -> Self {
        Self { token, expires_at }
    }

    /// Create a token that expires in N seconds from now
    pub fn expires_in(token: String, seconds: i64) -> Self {
        let expires_at = Utc::now() + chrono::Duration::seconds(seconds);
        Self {
            token,
            expires_at: Some(expires_at),
        }
    }

    /// Check if the token is expired (with 30 second buffer)
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => {
                let buffer = chrono::Duration::seconds(30);
                Utc::now() + buffer >= expires_at
            }
            None => false,
        }
    }
}
