//! Client configuration
//!
//! Endpoint, credentials, connection pool and retry settings for [`crate::ApiClient`].

use crate::error::{ApiError, Result};
use crate::retry::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::time::Duration;

// ============================================================================
// Client Configuration Constants
// ============================================================================

/// Default API host
pub const DEFAULT_ENDPOINT: &str = "api.treasuredata.com";

/// Default number of retries after the first attempt
pub const DEFAULT_RETRY_LIMIT: u32 = 20;

/// Default wait before the first retry, doubled on every following attempt
pub const DEFAULT_RETRY_INITIAL_INTERVAL_MS: u64 = 1_000;

/// Default upper bound for a single backoff wait
pub const DEFAULT_RETRY_MAX_INTERVAL_MS: u64 = 90_000;

/// Client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// API key sent as `Authorization: TD1 <apikey>`
    #[serde(default)]
    pub apikey: String,

    /// API host name
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Port override; defaults to 443 with TLS and 80 without
    #[serde(default)]
    pub port: Option<u16>,

    #[serde(default = "default_true")]
    pub use_ssl: bool,

    /// Proxy URL for all requests, e.g. `http://proxy.local:3128`
    #[serde(default)]
    pub http_proxy: Option<String>,

    #[serde(default = "default_retry_limit")]
    pub retry_limit: u32,

    #[serde(default = "default_retry_initial_interval_ms")]
    pub retry_initial_interval_ms: u64,

    #[serde(default = "default_retry_max_interval_ms")]
    pub retry_max_interval_ms: u64,

    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_read_timeout_secs")]
    pub read_timeout_secs: u64,

    /// Idle connections kept per host in the shared pool
    #[serde(default = "default_max_idle_connections")]
    pub max_idle_connections: usize,
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_true() -> bool {
    true
}

fn default_retry_limit() -> u32 {
    DEFAULT_RETRY_LIMIT
}

fn default_retry_initial_interval_ms() -> u64 {
    DEFAULT_RETRY_INITIAL_INTERVAL_MS
}

fn default_retry_max_interval_ms() -> u64 {
    DEFAULT_RETRY_MAX_INTERVAL_MS
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_read_timeout_secs() -> u64 {
    300
}

fn default_max_idle_connections() -> usize {
    8
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            apikey: String::new(),
            endpoint: default_endpoint(),
            port: None,
            use_ssl: true,
            http_proxy: None,
            retry_limit: DEFAULT_RETRY_LIMIT,
            retry_initial_interval_ms: DEFAULT_RETRY_INITIAL_INTERVAL_MS,
            retry_max_interval_ms: DEFAULT_RETRY_MAX_INTERVAL_MS,
            connect_timeout_secs: default_connect_timeout_secs(),
            read_timeout_secs: default_read_timeout_secs(),
            max_idle_connections: default_max_idle_connections(),
        }
    }
}

impl ClientConfig {
    pub fn with_apikey(apikey: impl Into<String>) -> Self {
        Self {
            apikey: apikey.into(),
            ..Self::default()
        }
    }

    /// Point the client at a full base URL such as `http://127.0.0.1:8080`
    pub fn for_base_url(apikey: impl Into<String>, base_url: &str) -> Result<Self> {
        let parsed = url::Url::parse(base_url)
            .map_err(|e| ApiError::Config(format!("invalid base url '{}': {}", base_url, e)))?;
        let endpoint = parsed
            .host_str()
            .ok_or_else(|| ApiError::Config(format!("base url '{}' has no host", base_url)))?
            .to_string();

        Ok(Self {
            apikey: apikey.into(),
            endpoint,
            port: parsed.port(),
            use_ssl: parsed.scheme() == "https",
            ..Self::default()
        })
    }

    /// Override the apikey and endpoint from `TD_API_KEY` and `TD_API_SERVER`
    ///
    /// `var` looks a variable up, usually `|key| std::env::var(key).ok()`. Unset or empty
    /// variables leave the current values alone.
    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        let set = |key: &str| var(key).filter(|v: &String| !v.trim().is_empty());

        if let Some(key) = set("TD_API_KEY") {
            self.apikey = key;
        }
        if let Some(server) = set("TD_API_SERVER") {
            self.endpoint = server;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.apikey.trim().is_empty() {
            return Err(ApiError::Config(
                "apikey is required (set it in the config file or TD_API_KEY)".to_string(),
            ));
        }
        if self.endpoint.trim().is_empty() {
            return Err(ApiError::Config("endpoint must not be empty".to_string()));
        }
        if self.retry_initial_interval_ms > self.retry_max_interval_ms {
            return Err(ApiError::Config(format!(
                "retry_initial_interval_ms ({}) exceeds retry_max_interval_ms ({})",
                self.retry_initial_interval_ms, self.retry_max_interval_ms
            )));
        }
        Ok(())
    }

    pub fn effective_port(&self) -> u16 {
        self.port.unwrap_or(if self.use_ssl { 443 } else { 80 })
    }

    /// Scheme, host and port without the API version prefix
    pub fn base_url(&self) -> String {
        let scheme = if self.use_ssl { "https" } else { "http" };
        format!("{}://{}:{}", scheme, self.endpoint, self.effective_port())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            retry_limit: self.retry_limit,
            initial_interval: Duration::from_millis(self.retry_initial_interval_ms),
            max_interval: Duration::from_millis(self.retry_max_interval_ms),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_base_url() {
        let config = ClientConfig::with_apikey("key");
        assert_eq!(config.base_url(), "https://api.treasuredata.com:443");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_for_base_url() {
        let config = ClientConfig::for_base_url("key", "http://127.0.0.1:8089").unwrap();
        assert_eq!(config.endpoint, "127.0.0.1");
        assert_eq!(config.port, Some(8089));
        assert!(!config.use_ssl);
        assert_eq!(config.base_url(), "http://127.0.0.1:8089");
    }

    #[test]
    fn test_validate_rejects_missing_apikey() {
        let config = ClientConfig::default();
        assert!(matches!(config.validate(), Err(ApiError::Config(_))));
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let config: ClientConfig =
            serde_json::from_str(r#"{"apikey":"k","use_ssl":false}"#).unwrap();
        assert_eq!(config.retry_limit, DEFAULT_RETRY_LIMIT);
        assert_eq!(config.effective_port(), 80);
    }

    #[test]
    fn test_env_vars_override_file_values() {
        let mut config = ClientConfig::with_apikey("file-key");
        config.endpoint = "api.file.example".to_string();

        config.apply_env(|key| match key {
            "TD_API_KEY" => Some("env-key".to_string()),
            "TD_API_SERVER" => Some("api.env.example".to_string()),
            _ => None,
        });
        assert_eq!(config.apikey, "env-key");
        assert_eq!(config.endpoint, "api.env.example");
    }

    #[test]
    fn test_unset_or_empty_env_vars_keep_values() {
        let mut config = ClientConfig::with_apikey("file-key");
        config.endpoint = "api.file.example".to_string();

        config.apply_env(|key| (key == "TD_API_SERVER").then(String::new));
        assert_eq!(config.apikey, "file-key");
        assert_eq!(config.endpoint, "api.file.example");
    }
}
