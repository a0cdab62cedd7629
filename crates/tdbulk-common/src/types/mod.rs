//! Column and row model shared by the encoder and the row sources

use crate::error::{CommonError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Logical type of a source column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Boolean,
    Long,
    Double,
    String,
    Timestamp,
    /// Arrays, maps and any other JSON document
    Json,
}

impl ColumnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::Boolean => "boolean",
            ColumnType::Long => "long",
            ColumnType::Double => "double",
            ColumnType::String => "string",
            ColumnType::Timestamp => "timestamp",
            ColumnType::Json => "json",
        }
    }
}

impl std::str::FromStr for ColumnType {
    type Err = CommonError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "boolean" | "bool" => Ok(ColumnType::Boolean),
            "long" | "int" | "integer" => Ok(ColumnType::Long),
            "double" | "float" => Ok(ColumnType::Double),
            "string" => Ok(ColumnType::String),
            "timestamp" => Ok(ColumnType::Timestamp),
            "json" => Ok(ColumnType::Json),
            _ => Err(CommonError::UnknownColumnType(s.to_string())),
        }
    }
}

impl std::fmt::Display for ColumnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named, typed column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
}

impl Column {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
        }
    }
}

/// Ordered list of columns describing every row of an import
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Schema {
    columns: Vec<Column>,
}

impl Schema {
    pub fn new(columns: Vec<Column>) -> Self {
        Self { columns }
    }

    /// Build a schema, rejecting duplicate column names
    pub fn try_new(columns: Vec<Column>) -> Result<Self> {
        let mut seen = HashSet::new();
        for column in &columns {
            if !seen.insert(column.name.as_str()) {
                return Err(CommonError::DuplicateColumn(column.name.clone()));
            }
        }
        Ok(Self { columns })
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index_of(name).is_some()
    }
}

/// A single cell value read from a row cursor
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Boolean(bool),
    Long(i64),
    Double(f64),
    String(String),
    Timestamp(DateTime<Utc>),
    Json(serde_json::Value),
}

impl Value {
    /// Column type this value was read as, `None` for nulls
    pub fn kind(&self) -> Option<ColumnType> {
        match self {
            Value::Null => None,
            Value::Boolean(_) => Some(ColumnType::Boolean),
            Value::Long(_) => Some(ColumnType::Long),
            Value::Double(_) => Some(ColumnType::Double),
            Value::String(_) => Some(ColumnType::String),
            Value::Timestamp(_) => Some(ColumnType::Timestamp),
            Value::Json(_) => Some(ColumnType::Json),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Long(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Timestamp(v)
    }
}

/// One row, positionally aligned with a [`Schema`]
pub type Row = Vec<Value>;

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_column_type_from_str() {
        assert_eq!("long".parse::<ColumnType>().unwrap(), ColumnType::Long);
        assert_eq!("Timestamp".parse::<ColumnType>().unwrap(), ColumnType::Timestamp);
        assert_eq!("bool".parse::<ColumnType>().unwrap(), ColumnType::Boolean);
        assert!("varchar".parse::<ColumnType>().is_err());
    }

    #[test]
    fn test_schema_rejects_duplicates() {
        let result = Schema::try_new(vec![
            Column::new("a", ColumnType::Long),
            Column::new("a", ColumnType::String),
        ]);
        assert!(matches!(result, Err(CommonError::DuplicateColumn(name)) if name == "a"));
    }

    #[test]
    fn test_schema_lookup() {
        let schema = Schema::new(vec![
            Column::new("time", ColumnType::Long),
            Column::new("a", ColumnType::String),
        ]);
        assert_eq!(schema.index_of("a"), Some(1));
        assert!(schema.column("missing").is_none());
    }

    #[test]
    fn test_schema_deserializes_from_column_list() {
        let schema: Schema =
            serde_json::from_str(r#"[{"name":"a","type":"timestamp"},{"name":"b","type":"json"}]"#)
                .unwrap();
        assert_eq!(schema.columns()[0].column_type, ColumnType::Timestamp);
        assert_eq!(schema.columns()[1].column_type, ColumnType::Json);
    }

    #[test]
    fn test_value_kind() {
        assert_eq!(Value::Null.kind(), None);
        assert_eq!(Value::from(true).kind(), Some(ColumnType::Boolean));
        assert_eq!(Value::Json(serde_json::json!([1])).kind(), Some(ColumnType::Json));
    }
}
