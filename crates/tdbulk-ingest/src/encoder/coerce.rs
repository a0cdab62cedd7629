//! Value coercion between source column types and MessagePack targets

use super::format::TimestampFormatter;
use crate::error::EncodeError;
use rmpv::Value as Packed;
use serde::{Deserialize, Serialize};
use tdbulk_common::{ColumnType, Value};

/// Encoding written to the part file for a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    Boolean,
    Long,
    Double,
    String,
    /// Nested arrays and maps
    #[serde(alias = "json")]
    Structured,
}

impl TargetKind {
    /// Target used when no column option overrides it
    pub fn default_for(column_type: ColumnType) -> Self {
        match column_type {
            ColumnType::Boolean => TargetKind::Boolean,
            ColumnType::Long => TargetKind::Long,
            ColumnType::Double => TargetKind::Double,
            ColumnType::String | ColumnType::Timestamp => TargetKind::String,
            ColumnType::Json => TargetKind::Structured,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TargetKind::Boolean => "boolean",
            TargetKind::Long => "long",
            TargetKind::Double => "double",
            TargetKind::String => "string",
            TargetKind::Structured => "structured",
        }
    }
}

impl std::fmt::Display for TargetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Convert one cell into its packed form
///
/// Nulls always become nil. Combinations with no sensible conversion return
/// [`EncodeError::NotConvertible`].
pub fn coerce(
    column: &str,
    value: &Value,
    target: TargetKind,
    formatter: &TimestampFormatter,
) -> Result<Packed, EncodeError> {
    let fail = |source_type: ColumnType, detail: &str| EncodeError::NotConvertible {
        column: column.to_string(),
        source_type,
        target,
        detail: detail.to_string(),
    };

    let packed = match (value, target) {
        (Value::Null, _) => Packed::Nil,

        (Value::Boolean(b), TargetKind::Boolean) => Packed::from(*b),
        (Value::Boolean(b), TargetKind::Long) => Packed::from(i64::from(*b)),
        (Value::Boolean(b), TargetKind::Double) => Packed::from(if *b { 1.0 } else { 0.0 }),
        (Value::Boolean(b), TargetKind::String) => Packed::from(b.to_string()),

        (Value::Long(v), TargetKind::Boolean) => Packed::from(*v != 0),
        (Value::Long(v), TargetKind::Long) => Packed::from(*v),
        (Value::Long(v), TargetKind::Double) => Packed::from(*v as f64),
        (Value::Long(v), TargetKind::String) => Packed::from(v.to_string()),

        (Value::Double(v), TargetKind::Boolean) => Packed::from(*v != 0.0),
        (Value::Double(v), TargetKind::Long) => Packed::from(
            truncate(*v).ok_or_else(|| fail(ColumnType::Double, "out of range"))?,
        ),
        (Value::Double(v), TargetKind::Double) => Packed::from(*v),
        (Value::Double(v), TargetKind::String) => Packed::from(v.to_string()),

        (Value::String(s), TargetKind::Boolean) => Packed::from(!s.is_empty()),
        (Value::String(s), TargetKind::Long) => Packed::from(
            s.trim()
                .parse::<i64>()
                .map_err(|e| fail(ColumnType::String, &e.to_string()))?,
        ),
        (Value::String(s), TargetKind::Double) => Packed::from(
            s.trim()
                .parse::<f64>()
                .map_err(|e| fail(ColumnType::String, &e.to_string()))?,
        ),
        (Value::String(s), TargetKind::String) => Packed::from(s.as_str()),

        (Value::Timestamp(ts), TargetKind::Long) => Packed::from(ts.timestamp()),
        (Value::Timestamp(ts), TargetKind::Double) => Packed::from(
            ts.timestamp() as f64 + f64::from(ts.timestamp_subsec_nanos()) / 1_000_000_000.0,
        ),
        (Value::Timestamp(ts), TargetKind::String) => Packed::from(formatter.format(ts)),

        (Value::Json(json), TargetKind::String) => Packed::from(json.to_string()),
        (Value::Json(json), TargetKind::Structured) => json_to_packed(json),

        (other, _) => {
            let source_type = other.kind().unwrap_or(ColumnType::Json);
            return Err(fail(source_type, "unsupported conversion"));
        },
    };

    Ok(packed)
}

fn truncate(v: f64) -> Option<i64> {
    // i64::MAX is not representable, so the upper bound is exclusive
    if v.is_finite() && v >= i64::MIN as f64 && v < i64::MAX as f64 {
        Some(v.trunc() as i64)
    } else {
        None
    }
}

/// Mirror a JSON document as nested MessagePack values
pub fn json_to_packed(json: &serde_json::Value) -> Packed {
    match json {
        serde_json::Value::Null => Packed::Nil,
        serde_json::Value::Bool(b) => Packed::from(*b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Packed::from(i)
            } else if let Some(u) = n.as_u64() {
                Packed::from(u)
            } else {
                Packed::from(n.as_f64().unwrap_or(f64::NAN))
            }
        },
        serde_json::Value::String(s) => Packed::from(s.as_str()),
        serde_json::Value::Array(items) => {
            Packed::Array(items.iter().map(json_to_packed).collect())
        },
        serde_json::Value::Object(map) => Packed::Map(
            map.iter()
                .map(|(k, v)| (Packed::from(k.as_str()), json_to_packed(v)))
                .collect(),
        ),
    }
}
