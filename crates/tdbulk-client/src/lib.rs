//! tdbulk API client
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Signed, retrying HTTP client for the v3 REST API of the remote table service.
//!
//! Every request carries the `Authorization: TD1 <apikey>` header and a fresh RFC 1123
//! `Date` header. Transport failures and 5xx responses are retried with exponential
//! backoff; 404 and 409 surface immediately as [`ApiError::NotFound`] and
//! [`ApiError::Conflict`] so callers can treat "already exists" as success.
//!
//! # Example
//!
//! ```no_run
//! use tdbulk_client::{ApiClient, ApiResultExt, ClientConfig};
//!
//! # async fn run() -> Result<(), tdbulk_client::ApiError> {
//! let client = ApiClient::new(ClientConfig::with_apikey("1/abcdef"))?;
//! client.create_database("logs").await.ignore_conflict()?;
//! let session = client.get_session("session_1").await?;
//! println!("{} is {}", session.name, session.status);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod endpoints;
pub mod error;
pub mod retry;
pub mod types;

pub use client::ApiClient;
pub use config::ClientConfig;
pub use error::{ApiError, ApiResultExt, Result};
pub use retry::{RetryPolicy, RetryState};
pub use types::{BulkImportSession, Database, SessionStatus, Table};
