//! JSON-lines row source
//!
//! Each non-empty line is one JSON object. Fields are looked up by column name; missing
//! fields and JSON `null` become [`Value::Null`]. Values are converted by their JSON
//! kind, so a mismatch against the declared column type is left for the encoder to
//! reject or coerce.

use chrono::{DateTime, Utc};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tdbulk_common::{ColumnType, Row, Schema, Value};
use tdbulk_ingest::{ImportError, RowSource};

pub struct JsonLinesSource<R> {
    schema: Schema,
    reader: R,
    line_no: u64,
    buf: String,
}

impl JsonLinesSource<BufReader<File>> {
    pub fn open(path: &Path, schema: Schema) -> tdbulk_ingest::Result<Self> {
        let file = File::open(path).map_err(|e| ImportError::io(path, e))?;
        Ok(Self::from_reader(BufReader::new(file), schema))
    }
}

impl<R: BufRead> JsonLinesSource<R> {
    pub fn from_reader(reader: R, schema: Schema) -> Self {
        Self {
            schema,
            reader,
            line_no: 0,
            buf: String::new(),
        }
    }

    pub fn line_no(&self) -> u64 {
        self.line_no
    }

    fn to_row(&self, object: &serde_json::Map<String, serde_json::Value>) -> Row {
        self.schema
            .columns()
            .iter()
            .map(|column| match object.get(&column.name) {
                None | Some(serde_json::Value::Null) => Value::Null,
                Some(json) => convert(column.column_type, json),
            })
            .collect()
    }
}

fn convert(column_type: ColumnType, json: &serde_json::Value) -> Value {
    use serde_json::Value as Json;

    match (column_type, json) {
        (ColumnType::Json, json) => Value::Json(json.clone()),
        (ColumnType::Timestamp, Json::String(s)) => match DateTime::parse_from_rfc3339(s) {
            Ok(ts) => Value::Timestamp(ts.with_timezone(&Utc)),
            Err(_) => Value::String(s.clone()),
        },
        (ColumnType::Timestamp, Json::Number(n)) => epoch_timestamp(n)
            .map(Value::Timestamp)
            .unwrap_or_else(|| number(n)),
        (_, Json::Bool(b)) => Value::Boolean(*b),
        (_, Json::Number(n)) => number(n),
        (_, Json::String(s)) => Value::String(s.clone()),
        (_, json) => Value::Json(json.clone()),
    }
}

fn number(n: &serde_json::Number) -> Value {
    match n.as_i64() {
        Some(v) => Value::Long(v),
        None => Value::Double(n.as_f64().unwrap_or(f64::NAN)),
    }
}

/// Epoch seconds, fractional allowed
fn epoch_timestamp(n: &serde_json::Number) -> Option<DateTime<Utc>> {
    if let Some(secs) = n.as_i64() {
        return DateTime::from_timestamp(secs, 0);
    }
    let v = n.as_f64()?;
    let secs = v.floor();
    let nanos = ((v - secs) * 1_000_000_000.0).round() as u32;
    DateTime::from_timestamp(secs as i64, nanos.min(999_999_999))
}

impl<R: BufRead> RowSource for JsonLinesSource<R> {
    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn next_row(&mut self) -> tdbulk_ingest::Result<Option<Row>> {
        loop {
            self.buf.clear();
            let read = self
                .reader
                .read_line(&mut self.buf)
                .map_err(|e| ImportError::source(format!("line {}: {}", self.line_no + 1, e)))?;
            if read == 0 {
                return Ok(None);
            }
            self.line_no += 1;

            let line = self.buf.trim();
            if line.is_empty() {
                continue;
            }

            let parsed: serde_json::Value = serde_json::from_str(line).map_err(|e| {
                ImportError::source(format!("line {}: invalid JSON: {}", self.line_no, e))
            })?;
            let serde_json::Value::Object(object) = parsed else {
                return Err(ImportError::source(format!(
                    "line {}: expected a JSON object",
                    self.line_no
                )));
            };

            return Ok(Some(self.to_row(&object)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tdbulk_common::Column;

    fn schema() -> Schema {
        Schema::new(vec![
            Column::new("time", ColumnType::Timestamp),
            Column::new("n", ColumnType::Long),
            Column::new("name", ColumnType::String),
            Column::new("attrs", ColumnType::Json),
        ])
    }

    fn source(text: &str) -> JsonLinesSource<&[u8]> {
        JsonLinesSource::from_reader(text.as_bytes(), schema())
    }

    #[test]
    fn test_reads_rows_by_column_name() {
        let mut src = source(
            concat!(
                r#"{"name":"a","n":3,"time":"2015-09-18T17:00:00Z","attrs":{"k":[1]}}"#,
                "\n\n",
                r#"{"n":1.5}"#,
                "\n",
            ),
        );

        let row = src.next_row().unwrap().unwrap();
        assert_eq!(
            row[0],
            Value::Timestamp(Utc.with_ymd_and_hms(2015, 9, 18, 17, 0, 0).unwrap())
        );
        assert_eq!(row[1], Value::Long(3));
        assert_eq!(row[2], Value::String("a".to_string()));
        assert_eq!(row[3], Value::Json(serde_json::json!({"k": [1]})));

        let row = src.next_row().unwrap().unwrap();
        assert_eq!(row, vec![Value::Null, Value::Double(1.5), Value::Null, Value::Null]);

        assert!(src.next_row().unwrap().is_none());
        assert_eq!(src.line_no(), 3);
    }

    #[test]
    fn test_epoch_numbers_become_timestamps() {
        let mut src = source("{\"time\":1442595600}\n{\"time\":1442595600.25}\n");

        let row = src.next_row().unwrap().unwrap();
        assert_eq!(row[0], Value::Timestamp(Utc.timestamp_opt(1_442_595_600, 0).unwrap()));

        let row = src.next_row().unwrap().unwrap();
        assert_eq!(
            row[0],
            Value::Timestamp(Utc.timestamp_opt(1_442_595_600, 250_000_000).unwrap())
        );
    }

    #[test]
    fn test_unparseable_timestamp_passes_through_as_string() {
        let mut src = source("{\"time\":\"yesterday\"}\n");
        let row = src.next_row().unwrap().unwrap();
        assert_eq!(row[0], Value::String("yesterday".to_string()));
    }

    #[test]
    fn test_malformed_lines_report_line_number() {
        let mut src = source("{\"n\":1}\n{not json\n");
        src.next_row().unwrap();
        let err = src.next_row().unwrap_err();
        assert!(err.to_string().contains("line 2"), "{}", err);

        let mut src = source("[1,2]\n");
        let err = src.next_row().unwrap_err();
        assert!(err.to_string().contains("expected a JSON object"));
    }
}
