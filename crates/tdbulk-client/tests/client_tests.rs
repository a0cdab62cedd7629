//! HTTP-level tests for the API client
//!
//! These tests validate:
//! - Request signing headers
//! - Retry and backoff behaviour for 5xx and transport failures
//! - Immediate, distinct errors for 404/409/other statuses
//! - Cancellation during backoff
//! - Streamed part uploads and form bodies

use std::io::Write;
use tdbulk_client::{ApiClient, ApiError, ApiResultExt, ClientConfig, SessionStatus};
use tokio_util::sync::CancellationToken;
use wiremock::{
    matchers::{body_bytes, body_string_contains, header, header_exists, method, path},
    Mock, MockServer, ResponseTemplate,
};

fn test_client(server: &MockServer, retry_limit: u32) -> ApiClient {
    let mut config = ClientConfig::for_base_url("test-key", &server.uri()).unwrap();
    config.retry_limit = retry_limit;
    config.retry_initial_interval_ms = 1;
    config.retry_max_interval_ms = 4;
    ApiClient::new(config).unwrap()
}

fn session_json(status: &str, frozen: bool) -> serde_json::Value {
    serde_json::json!({
        "name": "s1",
        "database": "db",
        "table": "events",
        "status": status,
        "upload_frozen": frozen,
        "job_id": null,
        "valid_records": null,
        "error_records": null,
        "valid_parts": null,
        "error_parts": null
    })
}

#[tokio::test]
async fn test_requests_are_signed() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v3/bulk_import/show/s1"))
        .and(header("authorization", "TD1 test-key"))
        .and(header_exists("date"))
        .respond_with(ResponseTemplate::new(200).set_body_json(session_json("uploading", false)))
        .expect(1)
        .mount(&server)
        .await;

    let session = test_client(&server, 0).get_session("s1").await.unwrap();
    assert_eq!(session.status, SessionStatus::Uploading);
    assert!(!session.upload_frozen);
}

#[tokio::test]
async fn test_server_errors_retry_then_surface_first_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v3/bulk_import/freeze/s1"))
        .respond_with(ResponseTemplate::new(500).set_body_string("first"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v3/bulk_import/freeze/s1"))
        .respond_with(ResponseTemplate::new(503).set_body_string("later"))
        .expect(3)
        .mount(&server)
        .await;

    let err = test_client(&server, 3).freeze_session("s1").await.unwrap_err();
    match err {
        ApiError::Server { status, body, .. } => {
            assert_eq!(status, 500);
            assert_eq!(body, "first");
        },
        other => panic!("expected first server error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_recovers_after_transient_failures() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v3/bulk_import/commit/s1"))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v3/bulk_import/commit/s1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
        .expect(1)
        .mount(&server)
        .await;

    test_client(&server, 5).commit_session("s1").await.unwrap();
}

#[tokio::test]
async fn test_not_found_is_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v3/bulk_import/show/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_string("no such session"))
        .expect(1)
        .mount(&server)
        .await;

    let err = test_client(&server, 5).get_session("missing").await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_conflict_is_not_retried_and_can_be_ignored() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v3/bulk_import/create/s1/db/events"))
        .respond_with(ResponseTemplate::new(409).set_body_string("already exists"))
        .expect(2)
        .mount(&server)
        .await;

    let client = test_client(&server, 5);
    let err = client.create_session("s1", "db", "events").await.unwrap_err();
    assert!(err.is_conflict());

    let ignored = client
        .create_session("s1", "db", "events")
        .await
        .ignore_conflict()
        .unwrap();
    assert!(ignored.is_none());
}

#[tokio::test]
async fn test_other_client_errors_are_fatal() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v3/database/create/db"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
        .expect(1)
        .mount(&server)
        .await;

    let err = test_client(&server, 5).create_database("db").await.unwrap_err();
    assert!(matches!(err, ApiError::Api { status: 401, .. }));
}

#[tokio::test]
async fn test_transport_failures_are_retried() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let mut config =
        ClientConfig::for_base_url("test-key", &format!("http://127.0.0.1:{}", port)).unwrap();
    config.retry_limit = 2;
    config.retry_initial_interval_ms = 1;
    config.retry_max_interval_ms = 2;
    let client = ApiClient::new(config).unwrap();

    let err = client.list_databases().await.unwrap_err();
    assert!(matches!(err, ApiError::Transport { .. }));
}

#[tokio::test]
async fn test_cancellation_interrupts_backoff() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v3/bulk_import/freeze/s1"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let token = CancellationToken::new();
    token.cancel();

    let mut config = ClientConfig::for_base_url("test-key", &server.uri()).unwrap();
    config.retry_initial_interval_ms = 60_000;
    let client = ApiClient::new(config).unwrap().with_cancellation(token);

    let err = client.freeze_session("s1").await.unwrap_err();
    assert!(matches!(err, ApiError::Interrupted { .. }));
}

#[tokio::test]
async fn test_upload_part_streams_file_body() {
    let server = MockServer::start().await;
    let payload: Vec<u8> = (0..4096u32).map(|i| (i % 251) as u8).collect();

    Mock::given(method("PUT"))
        .and(path("/v3/bulk_import/upload_part/s1/abc_00000001"))
        .and(header("content-type", "application/octet-stream"))
        .and(body_bytes(payload.clone()))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(&payload).unwrap();
    file.flush().unwrap();

    test_client(&server, 0)
        .upload_part("s1", "abc_00000001", file.path())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_upload_part_missing_file_is_io_error() {
    let server = MockServer::start().await;
    let err = test_client(&server, 3)
        .upload_part("s1", "p", std::path::Path::new("/nonexistent/part.msgpack.gz"))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Io { .. }));
}

#[tokio::test]
async fn test_perform_sends_priority_form() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v3/bulk_import/perform/s1"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string_contains("priority=1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"job_id": "42"})))
        .expect(1)
        .mount(&server)
        .await;

    test_client(&server, 0).perform_session("s1", 1).await.unwrap();
}

#[tokio::test]
async fn test_list_databases_and_tables() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v3/database/list"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "databases": [{"name": "db", "count": 3, "permission": "owner"}]
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v3/table/list/db"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "database": "db",
            "tables": [{"name": "events", "type": "log", "count": 10}]
        })))
        .mount(&server)
        .await;

    let client = test_client(&server, 0);
    let databases = client.list_databases().await.unwrap();
    assert_eq!(databases[0].name, "db");

    let tables = client.list_tables("db").await.unwrap();
    assert_eq!(tables[0].name, "events");
    assert_eq!(tables[0].table_type.as_deref(), Some("log"));
}

#[tokio::test]
async fn test_malformed_json_is_decode_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v3/bulk_import/show/s1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .expect(1)
        .mount(&server)
        .await;

    let err = test_client(&server, 3).get_session("s1").await.unwrap_err();
    assert!(matches!(err, ApiError::Decode { .. }));
}
