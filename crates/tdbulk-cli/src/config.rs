//! Configuration file handling
//!
//! ```toml
//! [client]
//! apikey = "1/abcdef"
//! endpoint = "api.treasuredata.com"
//!
//! [import]
//! database = "logs"
//! table = "events"
//! part_size_bytes = 16777216
//!
//! [import.encoder]
//! time_column = "created_at"
//!
//! [[columns]]
//! name = "created_at"
//! type = "timestamp"
//! ```

use crate::error::{CliError, Result};
use crate::{ImportArgs, ModeArg};
use serde::Deserialize;
use std::path::Path;
use tdbulk_client::ClientConfig;
use tdbulk_common::{Column, Schema};
use tdbulk_ingest::{ImportConfig, ImportMode};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub client: ClientConfig,

    /// Import defaults; `database` and `table` are required when the section is present
    #[serde(default)]
    pub import: Option<ImportConfig>,

    /// Input schema, in input order
    #[serde(default)]
    pub columns: Vec<Column>,
}

impl FileConfig {
    /// Load `path`, or an empty configuration when no path was given
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path).map_err(|e| CliError::file_read(path, e))?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn schema(&self) -> Result<Schema> {
        if self.columns.is_empty() {
            return Err(CliError::config(
                "no input columns defined; add [[columns]] entries with name and type",
            ));
        }
        Ok(Schema::try_new(self.columns.clone())?)
    }

    /// Client settings with the `TD_API_*` variables and then `server_url` applied
    pub fn client_config(&self, server_url: Option<&str>) -> Result<ClientConfig> {
        self.client_config_from(server_url, |key| std::env::var(key).ok())
    }

    fn client_config_from(
        &self,
        server_url: Option<&str>,
        var: impl Fn(&str) -> Option<String>,
    ) -> Result<ClientConfig> {
        let mut config = self.client.clone();
        config.apply_env(var);

        if let Some(url) = server_url {
            let target = ClientConfig::for_base_url(config.apikey.clone(), url)?;
            config.endpoint = target.endpoint;
            config.port = target.port;
            config.use_ssl = target.use_ssl;
        }

        config.validate()?;
        Ok(config)
    }

    /// Import settings from the file with command-line overrides applied
    pub fn import_config(&self, args: &ImportArgs) -> Result<ImportConfig> {
        let mut config = match (&self.import, &args.database, &args.table) {
            (Some(base), _, _) => base.clone(),
            (None, Some(database), Some(table)) => ImportConfig::new(database, table),
            (None, _, _) => {
                return Err(CliError::config(
                    "destination is not set; pass --database and --table \
                     or add an [import] section",
                ))
            },
        };

        if let Some(database) = &args.database {
            config.database = database.clone();
        }
        if let Some(table) = &args.table {
            config.table = table.clone();
        }
        if let Some(session) = &args.session {
            config.session = Some(session.clone());
        }
        if let Some(mode) = args.mode {
            config.mode = match mode {
                ModeArg::Append => ImportMode::Append,
                ModeArg::Replace => ImportMode::Replace,
            };
        }
        if let Some(priority) = args.priority {
            config.priority = priority;
        }
        if let Some(parallel) = args.parallel {
            config.upload_concurrency = parallel;
        }
        if args.stop_on_invalid_record {
            config.stop_on_invalid_record = true;
        }

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tdbulk_common::ColumnType;

    fn args() -> ImportArgs {
        ImportArgs {
            input: PathBuf::from("in.jsonl"),
            database: None,
            table: None,
            session: None,
            mode: None,
            priority: None,
            parallel: None,
            stop_on_invalid_record: false,
            json: false,
        }
    }

    #[test]
    fn test_parse_full_file() {
        let config = FileConfig::parse(
            r#"
            [client]
            apikey = "1/abc"
            retry_limit = 3

            [import]
            database = "logs"
            table = "events"
            mode = "replace"

            [import.encoder]
            time_column = "created_at"

            [[columns]]
            name = "created_at"
            type = "timestamp"

            [[columns]]
            name = "message"
            type = "string"
            "#,
        )
        .unwrap();

        assert_eq!(config.client.apikey, "1/abc");
        assert_eq!(config.client.retry_limit, 3);
        let import = config.import.as_ref().unwrap();
        assert_eq!(import.mode, ImportMode::Replace);
        assert_eq!(import.encoder.time_column.as_deref(), Some("created_at"));

        let schema = config.schema().unwrap();
        assert_eq!(schema.len(), 2);
        assert_eq!(schema.columns()[0].column_type, ColumnType::Timestamp);
    }

    #[test]
    fn test_missing_columns_is_config_error() {
        let err = FileConfig::default().schema().unwrap_err();
        assert!(matches!(err, CliError::Config(_)));
    }

    #[test]
    fn test_duplicate_columns_rejected() {
        let config = FileConfig::parse(
            r#"
            [[columns]]
            name = "a"
            type = "long"
            [[columns]]
            name = "a"
            type = "string"
            "#,
        )
        .unwrap();
        assert!(matches!(config.schema(), Err(CliError::Schema(_))));
    }

    #[test]
    fn test_flags_override_file() {
        let config = FileConfig::parse(
            r#"
            [import]
            database = "logs"
            table = "events"
            priority = 1
            "#,
        )
        .unwrap();

        let mut args = args();
        args.table = Some("other".to_string());
        args.priority = Some(-2);
        args.mode = Some(ModeArg::Replace);

        let import = config.import_config(&args).unwrap();
        assert_eq!(import.database, "logs");
        assert_eq!(import.table, "other");
        assert_eq!(import.priority, -2);
        assert_eq!(import.mode, ImportMode::Replace);
    }

    #[test]
    fn test_destination_required() {
        let err = FileConfig::default().import_config(&args()).unwrap_err();
        assert!(matches!(err, CliError::Config(_)));

        let mut args = args();
        args.database = Some("db".to_string());
        args.table = Some("t".to_string());
        let import = FileConfig::default().import_config(&args).unwrap();
        assert_eq!(import.table, "t");
    }

    #[test]
    fn test_out_of_range_priority_rejected() {
        let mut args = args();
        args.database = Some("db".to_string());
        args.table = Some("t".to_string());
        args.priority = Some(5);
        let err = FileConfig::default().import_config(&args).unwrap_err();
        assert!(matches!(err, CliError::Import(_)));
    }

    #[test]
    fn test_server_url_overrides_endpoint() {
        let mut config = FileConfig::default();
        config.client.apikey = "1/abc".to_string();
        let client = config
            .client_config_from(Some("http://127.0.0.1:8089"), |_| None)
            .unwrap();
        assert_eq!(client.base_url(), "http://127.0.0.1:8089");
    }

    #[test]
    fn test_server_url_beats_env_and_env_beats_file() {
        let mut config = FileConfig::default();
        config.client.apikey = "1/file".to_string();
        let env = |key: &str| match key {
            "TD_API_KEY" => Some("1/env".to_string()),
            "TD_API_SERVER" => Some("api.env.example".to_string()),
            _ => None,
        };

        let client = config.client_config_from(None, env).unwrap();
        assert_eq!(client.apikey, "1/env");
        assert_eq!(client.endpoint, "api.env.example");

        let client = config
            .client_config_from(Some("http://127.0.0.1:8089"), env)
            .unwrap();
        assert_eq!(client.apikey, "1/env");
        assert_eq!(client.base_url(), "http://127.0.0.1:8089");
    }
}
