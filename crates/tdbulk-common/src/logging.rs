//! Logging Configuration and Initialization
//!
//! Centralized tracing setup for the tdbulk binaries. It supports:
//!
//! - Console (stderr), daily-rolled file, or both
//! - Text or JSON formatting
//! - Extra per-module filter directives
//! - Environment-based configuration (`TDBULK_LOG_*`)
//!
//! Console output always goes to stderr.
//!
//! # Example
//!
//! ```no_run
//! use tdbulk_common::logging::{init_logging, LogConfig};
//! use tracing::info;
//!
//! let config = LogConfig::from_env().unwrap_or_default();
//! init_logging(&config).ok();
//! info!(session = "s1", "Import started");
//! ```

use crate::error::{CommonError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Case-insensitive lookup of `value` in a table of accepted spellings
fn lookup<T: Copy>(setting: &'static str, value: &str, names: &[(&str, T)]) -> Result<T> {
    let wanted = value.trim().to_ascii_lowercase();
    names
        .iter()
        .find(|(name, _)| *name == wanted)
        .map(|(_, v)| *v)
        .ok_or_else(|| CommonError::InvalidLogSetting {
            setting,
            value: value.to_string(),
        })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn to_tracing_level(self) -> Level {
        match self {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

impl FromStr for LogLevel {
    type Err = CommonError;

    fn from_str(s: &str) -> Result<Self> {
        lookup(
            "level",
            s,
            &[
                ("trace", LogLevel::Trace),
                ("debug", LogLevel::Debug),
                ("info", LogLevel::Info),
                ("warn", LogLevel::Warn),
                ("warning", LogLevel::Warn),
                ("error", LogLevel::Error),
            ],
        )
    }
}

/// Where log lines are written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    /// stderr
    #[default]
    Console,
    File,
    Both,
}

impl FromStr for LogOutput {
    type Err = CommonError;

    fn from_str(s: &str) -> Result<Self> {
        lookup(
            "output",
            s,
            &[
                ("console", LogOutput::Console),
                ("stderr", LogOutput::Console),
                ("file", LogOutput::File),
                ("both", LogOutput::Both),
            ],
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = CommonError;

    fn from_str(s: &str) -> Result<Self> {
        lookup("format", s, &[("text", LogFormat::Text), ("json", LogFormat::Json)])
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    pub level: LogLevel,
    pub output: LogOutput,
    pub format: LogFormat,

    /// Directory for rolled log files (only used when output includes file)
    pub log_dir: PathBuf,

    /// Log file name prefix ("tdbulk" -> "tdbulk.2026-01-18")
    pub log_file_prefix: String,

    /// Additional filter directives, e.g. "reqwest=warn,tdbulk_client=debug"
    pub filter_directives: Option<String>,

    pub include_location: bool,
    pub include_targets: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            output: LogOutput::Console,
            format: LogFormat::Text,
            log_dir: PathBuf::from("./logs"),
            log_file_prefix: "tdbulk".to_string(),
            filter_directives: None,
            include_location: false,
            include_targets: true,
        }
    }
}

impl LogConfig {
    /// Defaults overridden by `TDBULK_LOG_*` variables
    pub fn from_env() -> Result<Self> {
        Self::from_env_over(Self::default())
    }

    /// Apply `TDBULK_LOG_*` variables on top of `base`
    ///
    /// - `TDBULK_LOG_LEVEL`: trace, debug, info, warn, error
    /// - `TDBULK_LOG_OUTPUT`: console, file, both
    /// - `TDBULK_LOG_FORMAT`: text, json
    /// - `TDBULK_LOG_DIR`: directory for log files
    /// - `TDBULK_LOG_FILTER`: additional filter directives
    ///
    /// Unset variables leave `base` untouched; a malformed value is an error.
    pub fn from_env_over(base: LogConfig) -> Result<Self> {
        Self::from_vars(base, |key| std::env::var(key).ok())
    }

    fn from_vars(mut config: LogConfig, var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(level) = var("TDBULK_LOG_LEVEL") {
            config.level = level.parse()?;
        }
        if let Some(output) = var("TDBULK_LOG_OUTPUT") {
            config.output = output.parse()?;
        }
        if let Some(format) = var("TDBULK_LOG_FORMAT") {
            config.format = format.parse()?;
        }
        if let Some(dir) = var("TDBULK_LOG_DIR") {
            config.log_dir = PathBuf::from(dir);
        }
        if let Some(filter) = var("TDBULK_LOG_FILTER") {
            config.filter_directives = Some(filter);
        }
        Ok(config)
    }

    pub fn builder() -> LogConfigBuilder {
        LogConfigBuilder::default()
    }
}

/// Builder for LogConfig
#[derive(Default)]
pub struct LogConfigBuilder {
    config: LogConfig,
}

impl LogConfigBuilder {
    pub fn level(mut self, level: LogLevel) -> Self {
        self.config.level = level;
        self
    }

    pub fn output(mut self, output: LogOutput) -> Self {
        self.config.output = output;
        self
    }

    pub fn format(mut self, format: LogFormat) -> Self {
        self.config.format = format;
        self
    }

    pub fn log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.log_dir = dir.into();
        self
    }

    pub fn log_file_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.log_file_prefix = prefix.into();
        self
    }

    pub fn filter_directives(mut self, filter: impl Into<String>) -> Self {
        self.config.filter_directives = Some(filter.into());
        self
    }

    pub fn build(self) -> LogConfig {
        self.config
    }
}

type BoxedLayer = Box<dyn Layer<tracing_subscriber::Registry> + Send + Sync>;

/// Install the global tracing subscriber
///
/// `RUST_LOG` directives are honoured on top of `config`. Fails if a subscriber is
/// already installed.
pub fn init_logging(config: &LogConfig) -> Result<()> {
    let mut filter =
        EnvFilter::from_default_env().add_directive(config.level.to_tracing_level().into());

    for directive in config
        .filter_directives
        .iter()
        .flat_map(|d| d.split(','))
        .map(str::trim)
        .filter(|d| !d.is_empty())
    {
        let parsed = directive
            .parse()
            .map_err(|e| CommonError::LogInit(format!("bad filter '{}': {}", directive, e)))?;
        filter = filter.add_directive(parsed);
    }

    let mut layers: Vec<BoxedLayer> = Vec::new();
    if matches!(config.output, LogOutput::Console | LogOutput::Both) {
        layers.push(console_layer(config));
    }
    if matches!(config.output, LogOutput::File | LogOutput::Both) {
        layers.push(file_layer(config)?);
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()
        .map_err(|e| CommonError::LogInit(e.to_string()))
}

fn console_layer(config: &LogConfig) -> BoxedLayer {
    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(config.include_targets)
        .with_file(config.include_location)
        .with_line_number(config.include_location);

    match config.format {
        LogFormat::Text => layer.boxed(),
        LogFormat::Json => layer.json().boxed(),
    }
}

fn file_layer(config: &LogConfig) -> Result<BoxedLayer> {
    std::fs::create_dir_all(&config.log_dir).map_err(|source| CommonError::LogDir {
        path: config.log_dir.display().to_string(),
        source,
    })?;

    let appender = tracing_appender::rolling::daily(&config.log_dir, &config.log_file_prefix);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    // Flushes on drop, so it must outlive every log call
    std::mem::forget(guard);

    let layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(config.include_targets)
        .with_file(config.include_location)
        .with_line_number(config.include_location);

    Ok(match config.format {
        LogFormat::Text => layer.boxed(),
        LogFormat::Json => layer.json().boxed(),
    })
}
