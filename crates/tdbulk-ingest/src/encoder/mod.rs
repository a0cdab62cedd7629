//! Record encoder
//!
//! Turns positional rows into MessagePack maps keyed by column name. Every map carries
//! exactly one `time` entry holding the partition key in epoch seconds, taken from the
//! first of these that is configured or present:
//!
//! 1. a static `time_value` (fixed or incremental)
//! 2. the column named by `time_column`, copied into `time` unless it is `time` itself
//! 3. a long or timestamp column literally named `time`
//! 4. the first timestamp column, copied into `time`
//!
//! A `time` column that loses to 1 or 2 is renamed to `time_` (more underscores as needed).
//! When nothing applies the writer set cannot be built.

mod coerce;
mod format;
mod time;
mod writer;

pub use coerce::{coerce, json_to_packed, TargetKind};
pub use format::{parse_timezone, TimestampFormatter, DEFAULT_TIMESTAMP_FORMAT, DEFAULT_TIMEZONE};
pub use time::{TimeValueConfig, TimeValueGenerator, TimestampUnit};
pub use writer::{FieldBinding, FieldMode, FieldWriterSet, TIME_KEY};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-column overrides
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnOption {
    #[serde(rename = "type", default)]
    pub target: Option<TargetKind>,
    #[serde(default)]
    pub timestamp_format: Option<String>,
    #[serde(default)]
    pub timezone: Option<String>,
}

/// How rows are mapped onto records
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncoderConfig {
    /// Column whose value becomes the partition key
    #[serde(default)]
    pub time_column: Option<String>,
    #[serde(default)]
    pub time_value: Option<TimeValueConfig>,
    #[serde(default)]
    pub unix_timestamp_unit: TimestampUnit,
    #[serde(default = "default_timestamp_format")]
    pub default_timestamp_format: String,
    #[serde(default = "default_timezone")]
    pub default_timezone: String,
    /// Drop `time_column` when the schema already has a usable `time` column
    #[serde(default)]
    pub ignore_alternative_time_if_time_exists: bool,
    #[serde(default)]
    pub column_options: BTreeMap<String, ColumnOption>,
}

fn default_timestamp_format() -> String {
    DEFAULT_TIMESTAMP_FORMAT.to_string()
}

fn default_timezone() -> String {
    DEFAULT_TIMEZONE.to_string()
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            time_column: None,
            time_value: None,
            unix_timestamp_unit: TimestampUnit::default(),
            default_timestamp_format: default_timestamp_format(),
            default_timezone: default_timezone(),
            ignore_alternative_time_if_time_exists: false,
            column_options: BTreeMap::new(),
        }
    }
}

impl EncoderConfig {
    pub fn with_time_column(mut self, column: impl Into<String>) -> Self {
        self.time_column = Some(column.into());
        self
    }

    pub fn with_time_value(mut self, value: TimeValueConfig) -> Self {
        self.time_value = Some(value);
        self
    }

    pub fn with_column_option(mut self, column: impl Into<String>, option: ColumnOption) -> Self {
        self.column_options.insert(column.into(), option);
        self
    }
}
