//! Error types for the tdbulk CLI
//!
//! Every variant is user-facing and says what to check next.

use thiserror::Error;

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Error, Debug)]
pub enum CliError {
    /// API request failed after retries
    #[error("API error: {0}. Check the API key and server URL.")]
    Api(#[from] tdbulk_client::ApiError),

    /// Import pipeline failed
    #[error("Import failed: {0}")]
    Import(#[from] tdbulk_ingest::ImportError),

    /// Configuration is missing or invalid
    #[error("Configuration error: {0}. Check your config file, environment variables and flags.")]
    Config(String),

    /// Config file could not be parsed
    #[error("Failed to parse config file: {0}. Check the TOML syntax.")]
    TomlParse(#[from] toml::de::Error),

    /// Schema in the config file is invalid
    #[error("Invalid schema: {0}. Check the [[columns]] entries in the config file.")]
    Schema(#[from] tdbulk_common::CommonError),

    #[error("Failed to read '{path}': {source}. Verify the file exists and is readable.")]
    FileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// JSON output failed
    #[error("Failed to write JSON: {0}")]
    JsonWrite(#[from] serde_json::Error),
}

impl CliError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn file_read(path: &std::path::Path, source: std::io::Error) -> Self {
        Self::FileRead {
            path: path.display().to_string(),
            source,
        }
    }

    /// Process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Import(e) if e.is_cancellation() => 130,
            Self::Api(tdbulk_client::ApiError::Interrupted { .. }) => 130,
            Self::Config(_) | Self::TomlParse(_) | Self::Schema(_) => 2,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(CliError::config("x").exit_code(), 2);
        assert_eq!(
            CliError::Import(tdbulk_ingest::ImportError::Cancelled).exit_code(),
            130
        );
        assert_eq!(
            CliError::Import(tdbulk_ingest::ImportError::source("bad")).exit_code(),
            1
        );
    }

    #[test]
    fn test_messages_are_actionable() {
        let msg = CliError::config("no database").to_string();
        assert!(msg.contains("no database"));
        assert!(msg.contains("config file"));
    }
}
