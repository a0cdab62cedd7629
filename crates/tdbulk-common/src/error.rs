//! Error types for tdbulk common types

use thiserror::Error;

/// Result type alias for common operations
pub type Result<T> = std::result::Result<T, CommonError>;

/// Errors raised while parsing or validating shared types
#[derive(Error, Debug)]
pub enum CommonError {
    #[error(
        "Unknown column type: '{0}'. \
         Expected one of boolean, long, double, string, timestamp, json"
    )]
    UnknownColumnType(String),

    #[error("Duplicate column name in schema: '{0}'")]
    DuplicateColumn(String),

    #[error("Invalid log {setting}: '{value}'")]
    InvalidLogSetting { setting: &'static str, value: String },

    #[error("Failed to create log directory {path}: {source}")]
    LogDir {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to initialize logging: {0}")]
    LogInit(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
