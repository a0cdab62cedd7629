//! API endpoint path builders
//!
//! Every path is relative to the client's base URL and starts with the `/v3` prefix.
//! Name segments are percent-encoded.

use urlencoding::encode;

/// API version prefix
pub const API_PREFIX: &str = "/v3";

pub fn database_list_path() -> String {
    format!("{}/database/list", API_PREFIX)
}

pub fn database_create_path(database: &str) -> String {
    format!("{}/database/create/{}", API_PREFIX, encode(database))
}

pub fn table_list_path(database: &str) -> String {
    format!("{}/table/list/{}", API_PREFIX, encode(database))
}

pub fn table_create_path(database: &str, table: &str) -> String {
    format!(
        "{}/table/create/{}/{}/log",
        API_PREFIX,
        encode(database),
        encode(table)
    )
}

pub fn table_delete_path(database: &str, table: &str) -> String {
    format!("{}/table/delete/{}/{}", API_PREFIX, encode(database), encode(table))
}

pub fn table_rename_path(database: &str, from: &str, to: &str) -> String {
    format!(
        "{}/table/rename/{}/{}/{}",
        API_PREFIX,
        encode(database),
        encode(from),
        encode(to)
    )
}

pub fn session_create_path(session: &str, database: &str, table: &str) -> String {
    format!(
        "{}/bulk_import/create/{}/{}/{}",
        API_PREFIX,
        encode(session),
        encode(database),
        encode(table)
    )
}

pub fn session_show_path(session: &str) -> String {
    format!("{}/bulk_import/show/{}", API_PREFIX, encode(session))
}

pub fn session_freeze_path(session: &str) -> String {
    format!("{}/bulk_import/freeze/{}", API_PREFIX, encode(session))
}

pub fn session_perform_path(session: &str) -> String {
    format!("{}/bulk_import/perform/{}", API_PREFIX, encode(session))
}

pub fn session_commit_path(session: &str) -> String {
    format!("{}/bulk_import/commit/{}", API_PREFIX, encode(session))
}

pub fn session_delete_path(session: &str) -> String {
    format!("{}/bulk_import/delete/{}", API_PREFIX, encode(session))
}

pub fn part_upload_path(session: &str, part: &str) -> String {
    format!(
        "{}/bulk_import/upload_part/{}/{}",
        API_PREFIX,
        encode(session),
        encode(part)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_paths() {
        assert_eq!(
            session_create_path("s1", "db", "events"),
            "/v3/bulk_import/create/s1/db/events"
        );
        assert_eq!(session_show_path("s1"), "/v3/bulk_import/show/s1");
        assert_eq!(
            part_upload_path("s1", "abc_00000001"),
            "/v3/bulk_import/upload_part/s1/abc_00000001"
        );
    }

    #[test]
    fn test_table_paths() {
        assert_eq!(table_create_path("db", "t"), "/v3/table/create/db/t/log");
        assert_eq!(table_rename_path("db", "t_tmp", "t"), "/v3/table/rename/db/t_tmp/t");
        assert_eq!(database_list_path(), "/v3/database/list");
    }

    #[test]
    fn test_segments_are_encoded() {
        assert_eq!(session_show_path("a b/c"), "/v3/bulk_import/show/a%20b%2Fc");
    }
}
