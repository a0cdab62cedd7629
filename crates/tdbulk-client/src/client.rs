//! HTTP API client
//!
//! One [`ApiClient`] is shared (behind an `Arc`) by the session controller and every upload
//! task; the underlying `reqwest::Client` pools connections and is safe for concurrent use.

use crate::config::ClientConfig;
use crate::endpoints;
use crate::error::{ApiError, Result};
use crate::retry::{RetryDecision, RetryPolicy, RetryState};
use crate::types::{BulkImportSession, Database, DatabaseList, Table, TableList};
use reqwest::header::{AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE, DATE};
use reqwest::{Body, Client, Method};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio_util::io::ReaderStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// `Date` header layout (RFC 1123, always GMT)
const RFC1123_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

const USER_AGENT: &str = concat!("tdbulk/", env!("CARGO_PKG_VERSION"));

/// Request body, rebuilt from scratch on every attempt
#[derive(Debug, Clone)]
enum RequestBody {
    Empty,
    Form(Vec<(&'static str, String)>),
    File(PathBuf),
}

#[derive(Debug, Clone)]
struct ApiRequest {
    method: Method,
    path: String,
    body: RequestBody,
}

impl ApiRequest {
    fn get(path: String) -> Self {
        Self {
            method: Method::GET,
            path,
            body: RequestBody::Empty,
        }
    }

    fn post(path: String) -> Self {
        Self {
            method: Method::POST,
            path,
            body: RequestBody::Empty,
        }
    }

    fn post_form(path: String, form: Vec<(&'static str, String)>) -> Self {
        Self {
            method: Method::POST,
            path,
            body: RequestBody::Form(form),
        }
    }

    fn put_file(path: String, file: &Path) -> Self {
        Self {
            method: Method::PUT,
            path,
            body: RequestBody::File(file.to_path_buf()),
        }
    }
}

/// Signed, retrying client for the v3 API
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    apikey: String,
    retry: RetryPolicy,
    cancel: CancellationToken,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;

        let mut builder = Client::builder()
            .user_agent(USER_AGENT)
            .pool_max_idle_per_host(config.max_idle_connections)
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.read_timeout_secs));

        if let Some(ref proxy) = config.http_proxy {
            builder = builder.proxy(reqwest::Proxy::all(proxy)?);
        }

        Ok(Self {
            http: builder.build()?,
            base_url: config.base_url(),
            apikey: config.apikey.clone(),
            retry: config.retry_policy(),
            cancel: CancellationToken::new(),
        })
    }

    /// Use `token` to interrupt backoff waits
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    // ========================================================================
    // Databases and tables
    // ========================================================================

    pub async fn list_databases(&self) -> Result<Vec<Database>> {
        let list: DatabaseList = self.get_json(endpoints::database_list_path()).await?;
        Ok(list.databases)
    }

    pub async fn create_database(&self, database: &str) -> Result<()> {
        self.execute(ApiRequest::post(endpoints::database_create_path(database)))
            .await?;
        Ok(())
    }

    pub async fn list_tables(&self, database: &str) -> Result<Vec<Table>> {
        let list: TableList = self.get_json(endpoints::table_list_path(database)).await?;
        Ok(list.tables)
    }

    pub async fn create_table(&self, database: &str, table: &str) -> Result<()> {
        self.execute(ApiRequest::post(endpoints::table_create_path(database, table)))
            .await?;
        Ok(())
    }

    pub async fn delete_table(&self, database: &str, table: &str) -> Result<()> {
        self.execute(ApiRequest::post(endpoints::table_delete_path(database, table)))
            .await?;
        Ok(())
    }

    /// Rename `from` to `to`, replacing `to` when `overwrite` is set
    pub async fn rename_table(
        &self,
        database: &str,
        from: &str,
        to: &str,
        overwrite: bool,
    ) -> Result<()> {
        self.execute(ApiRequest::post_form(
            endpoints::table_rename_path(database, from, to),
            vec![("overwrite", overwrite.to_string())],
        ))
        .await?;
        Ok(())
    }

    // ========================================================================
    // Bulk-import sessions
    // ========================================================================

    pub async fn create_session(&self, session: &str, database: &str, table: &str) -> Result<()> {
        self.execute(ApiRequest::post(endpoints::session_create_path(
            session, database, table,
        )))
        .await?;
        Ok(())
    }

    pub async fn get_session(&self, session: &str) -> Result<BulkImportSession> {
        self.get_json(endpoints::session_show_path(session)).await
    }

    pub async fn freeze_session(&self, session: &str) -> Result<()> {
        self.execute(ApiRequest::post(endpoints::session_freeze_path(session)))
            .await?;
        Ok(())
    }

    /// Start the server-side job that validates and indexes uploaded parts
    pub async fn perform_session(&self, session: &str, priority: i32) -> Result<()> {
        self.execute(ApiRequest::post_form(
            endpoints::session_perform_path(session),
            vec![("priority", priority.to_string())],
        ))
        .await?;
        Ok(())
    }

    pub async fn commit_session(&self, session: &str) -> Result<()> {
        self.execute(ApiRequest::post(endpoints::session_commit_path(session)))
            .await?;
        Ok(())
    }

    pub async fn delete_session(&self, session: &str) -> Result<()> {
        self.execute(ApiRequest::post(endpoints::session_delete_path(session)))
            .await?;
        Ok(())
    }

    /// Stream a local part file as the body of `upload_part`
    pub async fn upload_part(&self, session: &str, part_name: &str, file: &Path) -> Result<()> {
        self.execute(ApiRequest::put_file(
            endpoints::part_upload_path(session, part_name),
            file,
        ))
        .await?;
        Ok(())
    }

    // ========================================================================
    // Request execution
    // ========================================================================

    async fn get_json<T: DeserializeOwned>(&self, path: String) -> Result<T> {
        let endpoint = path.clone();
        let body = self.execute(ApiRequest::get(path)).await?;
        serde_json::from_slice(&body).map_err(|source| ApiError::Decode { endpoint, source })
    }

    /// Run a request with retries, returning the success body
    async fn execute(&self, request: ApiRequest) -> Result<Vec<u8>> {
        let mut state = RetryState::new(self.retry);

        loop {
            match self.send_once(&request).await {
                Ok(body) => return Ok(body),
                Err(error) if error.is_retryable() => {
                    let attempt = state.attempt() + 1;
                    let message = error.to_string();
                    match state.record_failure(error) {
                        RetryDecision::Retry(wait) => {
                            warn!(
                                endpoint = %request.path,
                                attempt,
                                retry_limit = self.retry.retry_limit,
                                wait_ms = wait.as_millis() as u64,
                                error = %message,
                                "Retryable API failure, backing off"
                            );
                            self.backoff(wait, &request.path).await?;
                        },
                        RetryDecision::GiveUp(first) => {
                            warn!(
                                endpoint = %request.path,
                                attempts = attempt,
                                error = %first,
                                "Retries exhausted"
                            );
                            return Err(first);
                        },
                    }
                },
                Err(error) => return Err(error),
            }
        }
    }

    async fn backoff(&self, wait: Duration, endpoint: &str) -> Result<()> {
        tokio::select! {
            biased;

            _ = self.cancel.cancelled() => Err(ApiError::Interrupted {
                endpoint: endpoint.to_string(),
            }),
            _ = tokio::time::sleep(wait) => Ok(()),
        }
    }

    async fn send_once(&self, request: &ApiRequest) -> Result<Vec<u8>> {
        let url = format!("{}{}", self.base_url, request.path);
        let transport = |source| ApiError::Transport {
            endpoint: request.path.clone(),
            source,
        };

        let mut builder = self
            .http
            .request(request.method.clone(), &url)
            .header(AUTHORIZATION, format!("TD1 {}", self.apikey))
            .header(DATE, rfc1123_now());

        builder = match &request.body {
            RequestBody::Empty if request.method == Method::GET => builder,
            RequestBody::Empty => builder.body(Vec::<u8>::new()),
            RequestBody::Form(form) => builder.form(form),
            RequestBody::File(path) => {
                let io_error = |source| ApiError::Io {
                    path: path.display().to_string(),
                    source,
                };
                let file = tokio::fs::File::open(path).await.map_err(io_error)?;
                let len = file.metadata().await.map_err(io_error)?.len();
                builder
                    .header(CONTENT_TYPE, "application/octet-stream")
                    .header(CONTENT_LENGTH, len)
                    .body(Body::wrap_stream(ReaderStream::new(file)))
            },
        };

        debug!(method = %request.method, endpoint = %request.path, "Sending API request");

        let response = builder.send().await.map_err(transport)?;
        let status = response.status();

        if status.is_success() {
            return response
                .bytes()
                .await
                .map(|body| body.to_vec())
                .map_err(transport);
        }

        let body = response.text().await.unwrap_or_default();
        Err(ApiError::from_status(
            request.path.clone(),
            status.as_u16(),
            body,
        ))
    }
}

/// Current time formatted for the `Date` header
pub fn rfc1123_now() -> String {
    chrono::Utc::now().format(RFC1123_FORMAT).to_string()
}
