//! Authentication module
//!
//! Supports: API Key, Bearer, OAuth2 refresh token, Google service account
//!
//! The `Authenticator` applies credentials to outgoing requests and caches
//! access tokens for the flows that mint them.

mod authenticator;
mod types;

pub use authenticator::Authenticator;
pub use types::{AuthConfig, CachedToken, Location, ServiceAccountKey};

#[cfg(test)]
mod tests;
