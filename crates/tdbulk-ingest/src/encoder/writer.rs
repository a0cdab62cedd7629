//! Per-column writer assignment

use super::coerce::{coerce, TargetKind};
use super::format::TimestampFormatter;
use super::time::{TimeValueGenerator, TimestampUnit};
use super::EncoderConfig;
use crate::error::{EncodeError, ImportError, Result};
use rmpv::Value as Packed;
use std::collections::HashSet;
use tdbulk_common::{Column, ColumnType, Schema, Value};
use tracing::info;

/// Record key holding the partition key
pub const TIME_KEY: &str = "time";

/// Role a column plays in the emitted record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldMode {
    /// Written only as `time`
    PrimaryKey,
    /// Written under its own key
    SimpleValue,
    /// Written under its own key and copied into `time`
    DuplicatePrimaryKey,
}

/// Resolved binding of one schema column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldBinding {
    pub index: usize,
    pub column: String,
    /// Key in the emitted record, differs from `column` after a rename
    pub key: String,
    pub mode: FieldMode,
    pub source_type: ColumnType,
    pub target: TargetKind,
}

#[derive(Debug, Clone)]
struct FieldWriter {
    binding: FieldBinding,
    formatter: TimestampFormatter,
}

/// Encoders for every column of one schema
#[derive(Debug, Clone)]
pub struct FieldWriterSet {
    writers: Vec<FieldWriter>,
    width: usize,
    unit: TimestampUnit,
    time_value: Option<TimeValueGenerator>,
}

impl FieldWriterSet {
    /// Resolve every column of `schema`
    ///
    /// All configuration problems surface here, before any row is read.
    pub fn new(schema: &Schema, config: &EncoderConfig) -> Result<Self> {
        if config.time_column.is_some() && config.time_value.is_some() {
            return Err(ImportError::config(
                "time_column and time_value cannot be used together",
            ));
        }

        if let Some(name) = config.column_options.keys().find(|name| !schema.contains(name)) {
            return Err(ImportError::config(format!(
                "column_options refers to unknown column '{}'",
                name
            )));
        }

        let time_value = config
            .time_value
            .as_ref()
            .map(TimeValueGenerator::from_config)
            .transpose()?;

        let mut time_column = config.time_column.as_deref();
        if let Some(name) = time_column {
            if !schema.contains(name) {
                return Err(ImportError::config(format!(
                    "time_column '{}' does not exist in the schema",
                    name
                )));
            }

            let usable_time = schema
                .column(TIME_KEY)
                .is_some_and(|c| is_time_type(c.column_type));
            if config.ignore_alternative_time_if_time_exists && name != TIME_KEY && usable_time {
                info!(time_column = name, "Schema already has a time column, ignoring time_column");
                time_column = None;
            }
        }

        let default_formatter =
            TimestampFormatter::new(&config.default_timestamp_format, &config.default_timezone)?;

        let mut used: HashSet<String> = schema.columns().iter().map(|c| c.name.clone()).collect();
        let mut has_time = false;
        let mut writers = Vec::with_capacity(schema.len());

        for (index, column) in schema.columns().iter().enumerate() {
            let option = config.column_options.get(&column.name);

            let formatter = match option {
                Some(o) if o.timestamp_format.is_some() || o.timezone.is_some() => {
                    TimestampFormatter::new(
                        o.timestamp_format
                            .as_deref()
                            .unwrap_or(&config.default_timestamp_format),
                        o.timezone.as_deref().unwrap_or(&config.default_timezone),
                    )?
                },
                _ => default_formatter.clone(),
            };

            let mut target = option
                .and_then(|o| o.target)
                .unwrap_or_else(|| TargetKind::default_for(column.column_type));

            let (mode, key) = if time_column == Some(column.name.as_str()) {
                require_time_type(column)?;
                has_time = true;
                if column.name == TIME_KEY {
                    (FieldMode::PrimaryKey, TIME_KEY.to_string())
                } else {
                    (FieldMode::DuplicatePrimaryKey, column.name.clone())
                }
            } else if column.name == TIME_KEY {
                if time_column.is_some() || time_value.is_some() {
                    let renamed = unique_name(&column.name, &used);
                    used.insert(renamed.clone());
                    info!(from = %column.name, to = %renamed, "Renaming column");
                    (FieldMode::SimpleValue, renamed)
                } else {
                    require_time_type(column)?;
                    has_time = true;
                    (FieldMode::PrimaryKey, TIME_KEY.to_string())
                }
            } else {
                (FieldMode::SimpleValue, column.name.clone())
            };

            if mode == FieldMode::PrimaryKey {
                target = TargetKind::Long;
            }

            writers.push(FieldWriter {
                binding: FieldBinding {
                    index,
                    column: column.name.clone(),
                    key,
                    mode,
                    source_type: column.column_type,
                    target,
                },
                formatter,
            });
        }

        if !has_time && time_value.is_none() {
            let Some(writer) = writers
                .iter_mut()
                .find(|w| w.binding.source_type == ColumnType::Timestamp)
            else {
                return Err(ImportError::config(
                    "No time column: add a long or timestamp 'time' column, \
                     or set time_column or time_value",
                ));
            };

            info!(column = %writer.binding.column, "Copying first timestamp column into time");
            writer.binding.mode = FieldMode::DuplicatePrimaryKey;
        }

        Ok(Self {
            writers,
            width: schema.len(),
            unit: config.unix_timestamp_unit,
            time_value,
        })
    }

    pub fn bindings(&self) -> impl Iterator<Item = &FieldBinding> {
        self.writers.iter().map(|w| &w.binding)
    }

    pub fn binding(&self, column: &str) -> Option<&FieldBinding> {
        self.bindings().find(|b| b.column == column)
    }

    pub fn has_static_time(&self) -> bool {
        self.time_value.is_some()
    }

    /// Encode one row as a keyed map
    pub fn write_record(&mut self, row: &[Value]) -> std::result::Result<Packed, EncodeError> {
        if row.len() != self.width {
            return Err(EncodeError::RowWidth {
                expected: self.width,
                actual: row.len(),
            });
        }

        let mut entries = Vec::with_capacity(self.writers.len() + 1);
        for writer in &self.writers {
            let binding = &writer.binding;
            let value = &row[binding.index];

            match binding.mode {
                FieldMode::PrimaryKey => {
                    let seconds = self.unit.seconds(&binding.column, value)?;
                    entries.push((Packed::from(TIME_KEY), Packed::from(seconds)));
                },
                FieldMode::SimpleValue => {
                    let packed = coerce(&binding.column, value, binding.target, &writer.formatter)?;
                    entries.push((Packed::from(binding.key.as_str()), packed));
                },
                FieldMode::DuplicatePrimaryKey => {
                    let seconds = self.unit.seconds(&binding.column, value)?;
                    let packed = coerce(&binding.column, value, binding.target, &writer.formatter)?;
                    entries.push((Packed::from(binding.key.as_str()), packed));
                    entries.push((Packed::from(TIME_KEY), Packed::from(seconds)));
                },
            }
        }

        // Only advance the generator once the record is known to be valid
        if let Some(generator) = self.time_value.as_mut() {
            entries.insert(0, (Packed::from(TIME_KEY), Packed::from(generator.next_value())));
        }

        Ok(Packed::Map(entries))
    }
}

fn is_time_type(column_type: ColumnType) -> bool {
    matches!(column_type, ColumnType::Long | ColumnType::Timestamp)
}

fn require_time_type(column: &Column) -> Result<()> {
    if is_time_type(column.column_type) {
        Ok(())
    } else {
        Err(ImportError::config(format!(
            "Time column '{}' must be long or timestamp, got {}",
            column.name, column.column_type
        )))
    }
}

fn unique_name(name: &str, used: &HashSet<String>) -> String {
    let mut candidate = format!("{}_", name);
    while used.contains(&candidate) {
        candidate.push('_');
    }
    candidate
}
