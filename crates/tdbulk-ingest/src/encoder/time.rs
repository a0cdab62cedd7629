//! Partition-key ("time") values

use crate::error::{EncodeError, ImportError, Result};
use serde::{Deserialize, Serialize};
use tdbulk_common::Value;

/// Unit of long-typed time columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimestampUnit {
    #[default]
    Sec,
    Milli,
    Micro,
    Nano,
}

impl TimestampUnit {
    /// Divisor turning a value in this unit into seconds
    pub fn divisor(&self) -> i64 {
        match self {
            TimestampUnit::Sec => 1,
            TimestampUnit::Milli => 1_000,
            TimestampUnit::Micro => 1_000_000,
            TimestampUnit::Nano => 1_000_000_000,
        }
    }

    /// Seconds for `value` read from a long or timestamp column
    pub fn seconds(&self, column: &str, value: &Value) -> std::result::Result<i64, EncodeError> {
        match value {
            Value::Long(v) => Ok(v.div_euclid(self.divisor())),
            Value::Timestamp(ts) => Ok(ts.timestamp()),
            Value::Null => Err(EncodeError::NullTime {
                column: column.to_string(),
            }),
            other => Err(EncodeError::InvalidTime {
                column: column.to_string(),
                source_type: other.kind().unwrap_or(tdbulk_common::ColumnType::Json),
            }),
        }
    }
}

/// Time value injected into every record instead of one taken from the schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum TimeValueConfig {
    FixedTime { value: i64 },
    IncrementalTime { from: i64, to: i64 },
}

/// Generator built from a [`TimeValueConfig`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimeValueGenerator {
    Fixed(i64),
    /// Cycles through `from..=to`
    Incremental { from: i64, to: i64, next: i64 },
}

impl TimeValueGenerator {
    pub fn from_config(config: &TimeValueConfig) -> Result<Self> {
        match *config {
            TimeValueConfig::FixedTime { value } => Ok(TimeValueGenerator::Fixed(value)),
            TimeValueConfig::IncrementalTime { from, to } => {
                if from > to {
                    return Err(ImportError::config(format!(
                        "time_value.from ({}) must not be greater than time_value.to ({})",
                        from, to
                    )));
                }
                Ok(TimeValueGenerator::Incremental { from, to, next: from })
            },
        }
    }

    pub fn next_value(&mut self) -> i64 {
        match self {
            TimeValueGenerator::Fixed(value) => *value,
            TimeValueGenerator::Incremental { from, to, next } => {
                let current = *next;
                *next = if current >= *to { *from } else { current + 1 };
                current
            },
        }
    }
}
