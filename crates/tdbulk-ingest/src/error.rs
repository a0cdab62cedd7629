//! Error types for the ingestion pipeline

use crate::encoder::TargetKind;
use tdbulk_client::{ApiError, SessionStatus};
use tdbulk_common::ColumnType;
use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, ImportError>;

/// A single record could not be encoded
///
/// The driver decides whether this skips the record or aborts the import.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EncodeError {
    #[error("Column '{column}': cannot convert {source_type} value to {target}: {detail}")]
    NotConvertible {
        column: String,
        source_type: ColumnType,
        target: TargetKind,
        detail: String,
    },

    #[error("Column '{column}' holds the partition key but is null")]
    NullTime { column: String },

    #[error("Column '{column}': {source_type} value cannot be used as the partition key")]
    InvalidTime {
        column: String,
        source_type: ColumnType,
    },

    #[error("Row has {actual} values but the schema has {expected} columns")]
    RowWidth { expected: usize, actual: usize },
}

/// Errors raised while importing rows through a bulk-import session
#[derive(Error, Debug)]
pub enum ImportError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(
        "Session {session} moved to {observed} while waiting for {current} -> {expecting}"
    )]
    ProtocolViolation {
        session: String,
        current: SessionStatus,
        expecting: SessionStatus,
        observed: SessionStatus,
    },

    #[error("Session {session} is in an unknown state")]
    UnknownStatus { session: String },

    #[error("Timed out after {elapsed_secs}s waiting for session {session} to become {expecting}")]
    PollTimeout {
        session: String,
        expecting: SessionStatus,
        elapsed_secs: u64,
    },

    #[error("Import cancelled")]
    Cancelled,

    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error("Session {session} reported {count} invalid records")]
    InvalidRecords { session: String, count: u64 },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write record to part file: {0}")]
    PartWrite(#[from] rmpv::encode::Error),

    #[error("Upload task failed: {0}")]
    UploadTask(#[from] tokio::task::JoinError),

    #[error("Row source error: {0}")]
    Source(String),
}

impl ImportError {
    pub fn config(msg: impl Into<String>) -> Self {
        ImportError::Config(msg.into())
    }

    pub fn source(msg: impl Into<String>) -> Self {
        ImportError::Source(msg.into())
    }

    pub fn io(path: impl AsRef<std::path::Path>, source: std::io::Error) -> Self {
        ImportError::Io {
            path: path.as_ref().display().to_string(),
            source,
        }
    }

    /// True for failures caused by an interrupted wait rather than the remote service
    pub fn is_cancellation(&self) -> bool {
        matches!(
            self,
            ImportError::Cancelled | ImportError::Api(ApiError::Interrupted { .. })
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = ImportError::ProtocolViolation {
            session: "s1".to_string(),
            current: SessionStatus::Performing,
            expecting: SessionStatus::Ready,
            observed: SessionStatus::Uploading,
        };
        assert_eq!(
            err.to_string(),
            "Session s1 moved to uploading while waiting for performing -> ready"
        );

        let err = EncodeError::NotConvertible {
            column: "a".to_string(),
            source_type: ColumnType::Json,
            target: TargetKind::Long,
            detail: "not a number".to_string(),
        };
        assert!(err.to_string().contains("json value to long"));
    }

    #[test]
    fn test_cancellation_classification() {
        assert!(ImportError::Cancelled.is_cancellation());
        assert!(ImportError::Api(ApiError::Interrupted {
            endpoint: "/v3/x".to_string()
        })
        .is_cancellation());
        assert!(!ImportError::config("bad").is_cancellation());
    }
}
