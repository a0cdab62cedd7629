//! API request/response types

use serde::{Deserialize, Deserializer, Serialize};

/// Lifecycle state of a bulk-import session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Uploading,
    Performing,
    Ready,
    Committing,
    Committed,
    #[serde(other)]
    Unknown,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Uploading => "uploading",
            SessionStatus::Performing => "performing",
            SessionStatus::Ready => "ready",
            SessionStatus::Committing => "committing",
            SessionStatus::Committed => "committed",
            SessionStatus::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bulk-import session as returned by `bulk_import/show`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkImportSession {
    pub name: String,
    pub database: String,
    pub table: String,
    pub status: SessionStatus,
    #[serde(default)]
    pub upload_frozen: bool,
    #[serde(default, deserialize_with = "string_or_number")]
    pub job_id: Option<String>,
    #[serde(default)]
    pub valid_records: Option<u64>,
    #[serde(default)]
    pub error_records: Option<u64>,
    #[serde(default)]
    pub valid_parts: Option<u64>,
    #[serde(default)]
    pub error_parts: Option<u64>,
}

impl BulkImportSession {
    pub fn is_frozen(&self) -> bool {
        self.upload_frozen
    }

    pub fn error_records(&self) -> u64 {
        self.error_records.unwrap_or(0)
    }

    pub fn valid_records(&self) -> u64 {
        self.valid_records.unwrap_or(0)
    }
}

/// Job ids show up as strings on some endpoints and bare numbers on others
fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

/// Database entry from `database/list`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Database {
    pub name: String,
    #[serde(default)]
    pub count: Option<u64>,
    #[serde(default)]
    pub permission: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DatabaseList {
    pub databases: Vec<Database>,
}

/// Table entry from `table/list/{db}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    #[serde(rename = "type", default)]
    pub table_type: Option<String>,
    #[serde(default)]
    pub count: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TableList {
    pub tables: Vec<Table>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_session_deserialize() {
        let session: BulkImportSession = serde_json::from_value(serde_json::json!({
            "name": "s1",
            "database": "db",
            "table": "t",
            "status": "ready",
            "upload_frozen": true,
            "job_id": 12345,
            "valid_records": 10,
            "error_records": 1,
            "valid_parts": 2,
            "error_parts": 0
        }))
        .unwrap();

        assert_eq!(session.status, SessionStatus::Ready);
        assert!(session.is_frozen());
        assert_eq!(session.job_id.as_deref(), Some("12345"));
        assert_eq!(session.error_records(), 1);
    }

    #[test]
    fn test_session_before_perform_has_null_counts() {
        let session: BulkImportSession = serde_json::from_value(serde_json::json!({
            "name": "s1",
            "database": "db",
            "table": "t",
            "status": "uploading",
            "upload_frozen": false,
            "job_id": null,
            "valid_records": null,
            "error_records": null,
            "valid_parts": null,
            "error_parts": null
        }))
        .unwrap();

        assert_eq!(session.job_id, None);
        assert_eq!(session.valid_records(), 0);
    }

    #[test]
    fn test_unrecognized_status_is_unknown() {
        let status: SessionStatus = serde_json::from_str("\"exploded\"").unwrap();
        assert_eq!(status, SessionStatus::Unknown);
    }
}
