//! Client configuration.
//!
//! The base URL comes from `SEHATLY_API_URL` (with a development default)
//! the same way the rest of the deployment is wired through environment
//! variables; everything else has explicit defaults and can be overridden
//! before constructing the client.

use std::env;
use std::time::Duration;

use thiserror::Error;

use crate::query::QueryConfig;

/// Environment variable holding the API base URL.
pub const BASE_URL_ENV: &str = "SEHATLY_API_URL";

/// Development fallback when [`BASE_URL_ENV`] is unset.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid config value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
    #[error("Failed to build HTTP client: {0}")]
    Http(String),
}

/// Configuration for [`PortalClient`](crate::api::PortalClient).
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the portal REST backend. Trailing slashes are ignored.
    pub base_url: String,
    /// Per-request timeout applied on the HTTP transport.
    pub request_timeout: Duration,
    /// Cache behavior for queries.
    pub query: QueryConfig,
}

impl ClientConfig {
    /// Configuration pointing at the given base URL, with default timeout
    /// and cache policy.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            query: QueryConfig::default(),
        }
    }

    /// Reads the base URL from `SEHATLY_API_URL`, falling back to the
    /// development default.
    #[must_use]
    pub fn from_env() -> Self {
        let base_url =
            env::var(BASE_URL_ENV).unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Self::new(base_url)
    }

    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_query_config(mut self, query: QueryConfig) -> Self {
        self.query = query;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.base_url.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "base_url",
                reason: "must not be empty".to_string(),
            });
        }
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ConfigError::InvalidValue {
                field: "base_url",
                reason: "must start with http:// or https://".to_string(),
            });
        }
        if self.request_timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "request_timeout",
                reason: "must be > 0".to_string(),
            });
        }
        Ok(())
    }
}
