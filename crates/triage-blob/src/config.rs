//! Object-store client configuration.
//!
//! Configures the base URL and credentials for the external blob service.
//! Loaded from the environment at bootstrap; when absent, the API runs
//! without an object store and issue creation is unavailable.

use url::Url;

/// Configuration for connecting to the object store.
///
/// Custom `Debug` implementation redacts the `api_token` field to
/// prevent credential leakage in log output.
#[derive(Clone)]
pub struct BlobStoreConfig {
    /// Base URL of the blob service.
    pub base_url: Url,
    /// Optional bearer token for authentication.
    pub api_token: Option<String>,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl std::fmt::Debug for BlobStoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlobStoreConfig")
            .field("base_url", &self.base_url)
            .field("api_token", &self.api_token.as_ref().map(|_| "[REDACTED]"))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl BlobStoreConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `BLOB_STORE_URL` (required)
    /// - `BLOB_STORE_TOKEN` (optional)
    /// - `BLOB_TIMEOUT_SECS` (default: 30)
    pub fn from_env() -> Result<Self, ConfigError> {
        let raw = std::env::var("BLOB_STORE_URL").map_err(|_| ConfigError::MissingUrl)?;
        let base_url = Url::parse(&raw)
            .map_err(|e| ConfigError::InvalidUrl("BLOB_STORE_URL".to_string(), e.to_string()))?;

        Ok(Self {
            base_url,
            api_token: std::env::var("BLOB_STORE_TOKEN").ok(),
            timeout_secs: std::env::var("BLOB_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30),
        })
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// `BLOB_STORE_URL` was not set.
    #[error("BLOB_STORE_URL environment variable is required")]
    MissingUrl,
    /// A URL variable failed to parse.
    #[error("invalid URL for {0}: {1}")]
    InvalidUrl(String, String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_redacts_token() {
        let config = BlobStoreConfig {
            base_url: Url::parse("https://blobs.example.com").unwrap(),
            api_token: Some("super-secret".to_string()),
            timeout_secs: 30,
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("[REDACTED]"));
    }
}
