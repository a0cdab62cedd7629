//! Error types for the API client

use thiserror::Error;

/// Result type alias for API operations
pub type Result<T> = std::result::Result<T, ApiError>;

/// Errors returned by [`crate::ApiClient`]
///
/// Only [`ApiError::Transport`] and [`ApiError::Server`] are retried by the client.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Connection, TLS, timeout or body-streaming failure
    #[error("Request to {endpoint} failed: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    /// 5xx response
    #[error("Server error {status} from {endpoint}: {body}")]
    Server {
        endpoint: String,
        status: u16,
        body: String,
    },

    /// 404 response
    #[error("Not found: {endpoint}: {body}")]
    NotFound { endpoint: String, body: String },

    /// 409 response, usually "already exists" or "already frozen"
    #[error("Conflict: {endpoint}: {body}")]
    Conflict { endpoint: String, body: String },

    /// Any other non-2xx response
    #[error("API error {status} from {endpoint}: {body}")]
    Api {
        endpoint: String,
        status: u16,
        body: String,
    },

    /// Cancellation was requested while waiting between retries
    #[error("Interrupted while waiting to retry {endpoint}")]
    Interrupted { endpoint: String },

    /// Response body did not match the expected JSON shape
    #[error("Failed to decode response from {endpoint}: {source}")]
    Decode {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },

    /// Local file backing a request body could not be read
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Client configuration was rejected
    #[error("Invalid client configuration: {0}")]
    Config(String),

    /// The underlying HTTP client could not be constructed
    #[error("Failed to build HTTP client: {0}")]
    Build(#[from] reqwest::Error),
}

impl ApiError {
    /// Classify a non-success status code
    pub fn from_status(endpoint: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        let endpoint = endpoint.into();
        let body = body.into();
        match status {
            404 => ApiError::NotFound { endpoint, body },
            409 => ApiError::Conflict { endpoint, body },
            500..=599 => ApiError::Server {
                endpoint,
                status,
                body,
            },
            _ => ApiError::Api {
                endpoint,
                status,
                body,
            },
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, ApiError::Transport { .. } | ApiError::Server { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound { .. })
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, ApiError::Conflict { .. })
    }

    /// HTTP status carried by the error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Server { status, .. } | ApiError::Api { status, .. } => Some(*status),
            ApiError::NotFound { .. } => Some(404),
            ApiError::Conflict { .. } => Some(409),
            _ => None,
        }
    }
}

/// Helpers for idempotent calls where 404/409 mean "nothing to do"
pub trait ApiResultExt<T> {
    /// Map a 409 Conflict to `Ok(None)`
    fn ignore_conflict(self) -> Result<Option<T>>;

    /// Map a 404 Not Found to `Ok(None)`
    fn ignore_not_found(self) -> Result<Option<T>>;
}

impl<T> ApiResultExt<T> for Result<T> {
    fn ignore_conflict(self) -> Result<Option<T>> {
        match self {
            Ok(v) => Ok(Some(v)),
            Err(e) if e.is_conflict() => {
                tracing::debug!(error = %e, "Ignoring conflict");
                Ok(None)
            },
            Err(e) => Err(e),
        }
    }

    fn ignore_not_found(self) -> Result<Option<T>> {
        match self {
            Ok(v) => Ok(Some(v)),
            Err(e) if e.is_not_found() => {
                tracing::debug!(error = %e, "Ignoring not found");
                Ok(None)
            },
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert!(ApiError::from_status("/x", 404, "").is_not_found());
        assert!(ApiError::from_status("/x", 409, "").is_conflict());
        assert!(ApiError::from_status("/x", 503, "").is_retryable());
        let bad_request = ApiError::from_status("/x", 400, "bad");
        assert!(!bad_request.is_retryable());
        assert_eq!(bad_request.status(), Some(400));
    }

    #[test]
    fn test_ignore_conflict() {
        let conflict: Result<()> = Err(ApiError::from_status("/x", 409, "exists"));
        assert!(conflict.ignore_conflict().unwrap().is_none());

        let not_found: Result<()> = Err(ApiError::from_status("/x", 404, "missing"));
        assert!(not_found.ignore_conflict().is_err());

        let ok: Result<u8> = Ok(7);
        assert_eq!(ok.ignore_not_found().unwrap(), Some(7));
    }
}
