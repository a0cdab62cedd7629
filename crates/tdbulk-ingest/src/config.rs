//! Import configuration
//!
//! Deserialized from the `[import]` table of the CLI config file. Every field except the
//! destination has a default.

use crate::encoder::EncoderConfig;
use crate::error::{ImportError, Result};
use crate::upload::{MAX_UPLOAD_CONCURRENCY, MIN_UPLOAD_CONCURRENCY};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// How the destination table is written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportMode {
    /// Add rows to the table
    #[default]
    Append,
    /// Load into a scratch table, then swap it in place of the destination
    Replace,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportConfig {
    pub database: String,
    pub table: String,
    /// Session to create or resume (generated when absent)
    #[serde(default)]
    pub session: Option<String>,
    #[serde(default)]
    pub mode: ImportMode,
    /// Create the database and table when missing (default: true)
    #[serde(default = "default_true")]
    pub auto_create_table: bool,
    /// Job priority, -2 (very low) to 2 (very high)
    #[serde(default)]
    pub priority: i32,
    /// Compressed size at which a part is closed (default: 16 MiB)
    #[serde(default = "default_part_size_bytes")]
    pub part_size_bytes: u64,
    /// Parallel part uploads, clamped to 1..=8 (default: 2)
    #[serde(default = "default_upload_concurrency")]
    pub upload_concurrency: usize,
    /// Directory for part files (default: system temp dir)
    #[serde(default)]
    pub tmpdir: Option<PathBuf>,
    /// Abort on the first bad record instead of skipping it
    #[serde(default)]
    pub stop_on_invalid_record: bool,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Give up waiting on a performing/committing session (default: 6 hours)
    #[serde(default = "default_poll_timeout_secs")]
    pub poll_timeout_secs: u64,
    /// Delete the session after a successful commit (default: true)
    #[serde(default = "default_true")]
    pub cleanup_session: bool,
    #[serde(default)]
    pub part_name_prefix: Option<String>,
    #[serde(default)]
    pub encoder: EncoderConfig,
}

fn default_true() -> bool {
    true
}

fn default_part_size_bytes() -> u64 {
    16 * 1024 * 1024
}

fn default_upload_concurrency() -> usize {
    2
}

fn default_poll_interval_ms() -> u64 {
    3_000
}

fn default_poll_timeout_secs() -> u64 {
    6 * 60 * 60
}

impl ImportConfig {
    pub fn new(database: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            table: table.into(),
            session: None,
            mode: ImportMode::default(),
            auto_create_table: true,
            priority: 0,
            part_size_bytes: default_part_size_bytes(),
            upload_concurrency: default_upload_concurrency(),
            tmpdir: None,
            stop_on_invalid_record: false,
            poll_interval_ms: default_poll_interval_ms(),
            poll_timeout_secs: default_poll_timeout_secs(),
            cleanup_session: true,
            part_name_prefix: None,
            encoder: EncoderConfig::default(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.database.trim().is_empty() {
            return Err(ImportError::config("database must not be empty"));
        }
        if self.table.trim().is_empty() {
            return Err(ImportError::config("table must not be empty"));
        }
        if let Some(session) = &self.session {
            if session.trim().is_empty() {
                return Err(ImportError::config("session must not be empty"));
            }
        }
        if !(-2..=2).contains(&self.priority) {
            return Err(ImportError::config(format!(
                "priority must be between -2 and 2, got {}",
                self.priority
            )));
        }
        if self.part_size_bytes == 0 {
            return Err(ImportError::config("part_size_bytes must be greater than 0"));
        }
        if self.poll_interval_ms == 0 {
            return Err(ImportError::config("poll_interval_ms must be greater than 0"));
        }
        Ok(())
    }

    pub fn upload_concurrency(&self) -> usize {
        self.upload_concurrency
            .clamp(MIN_UPLOAD_CONCURRENCY, MAX_UPLOAD_CONCURRENCY)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn poll_timeout(&self) -> Duration {
        Duration::from_secs(self.poll_timeout_secs)
    }

    pub fn tmpdir(&self) -> PathBuf {
        self.tmpdir.clone().unwrap_or_else(std::env::temp_dir)
    }

    /// Configured session name, or a fresh `tdbulk_<utc>_<hex>` one
    pub fn session_name(&self) -> String {
        self.session.clone().unwrap_or_else(|| {
            format!(
                "tdbulk_{}_{}",
                chrono::Utc::now().format("%Y%m%d_%H%M%S"),
                short_id()
            )
        })
    }

    pub fn part_name_prefix(&self) -> String {
        self.part_name_prefix.clone().unwrap_or_else(short_id)
    }

    /// Table rows are loaded into before any swap
    pub fn load_table(&self, session: &str) -> String {
        match self.mode {
            ImportMode::Append => self.table.clone(),
            ImportMode::Replace => format!("{}_{}", self.table, session),
        }
    }
}

fn short_id() -> String {
    let mut id = uuid::Uuid::new_v4().simple().to_string();
    id.truncate(8);
    id
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_minimal_document() {
        let config: ImportConfig =
            serde_json::from_str(r#"{"database":"db","table":"events"}"#).unwrap();
        assert_eq!(config, ImportConfig::new("db", "events"));
        assert_eq!(config.part_size_bytes, 16 * 1024 * 1024);
        assert_eq!(config.poll_interval(), Duration::from_secs(3));
        assert_eq!(config.poll_timeout(), Duration::from_secs(21_600));
        assert!(config.auto_create_table);
        assert!(config.cleanup_session);
        config.validate().unwrap();
    }

    #[test]
    fn test_validation() {
        let mut config = ImportConfig::new("db", "events");
        config.priority = 3;
        assert!(config.validate().is_err());

        let mut config = ImportConfig::new("", "events");
        assert!(config.validate().is_err());
        config.database = "db".to_string();
        config.part_size_bytes = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_concurrency_is_clamped() {
        let mut config = ImportConfig::new("db", "events");
        config.upload_concurrency = 0;
        assert_eq!(config.upload_concurrency(), 1);
        config.upload_concurrency = 100;
        assert_eq!(config.upload_concurrency(), 8);
    }

    #[test]
    fn test_generated_names() {
        let config = ImportConfig::new("db", "events");
        let session = config.session_name();
        assert!(session.starts_with("tdbulk_"));
        assert_eq!(session.rsplit('_').next().unwrap().len(), 8);
        assert_eq!(config.part_name_prefix().len(), 8);

        let mut replace = config.clone();
        replace.mode = ImportMode::Replace;
        assert_eq!(config.load_table("s1"), "events");
        assert_eq!(replace.load_table("s1"), "events_s1");
    }

    #[test]
    fn test_mode_and_encoder_deserialize() {
        let config: ImportConfig = serde_json::from_value(serde_json::json!({
            "database": "db",
            "table": "events",
            "mode": "replace",
            "encoder": {"time_column": "created", "unix_timestamp_unit": "milli"}
        }))
        .unwrap();
        assert_eq!(config.mode, ImportMode::Replace);
        assert_eq!(config.encoder.time_column.as_deref(), Some("created"));
    }
}
