//! tdbulk Ingest Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Bulk-import pipeline: typed rows are encoded into MessagePack records, packed into
//! gzip part files, uploaded concurrently into a bulk-import session, and the session is
//! then frozen, performed and committed.
//!
//! # Components
//!
//! - **encoder**: per-column writers and partition-key derivation
//! - **part**: compressed part files with size tracking
//! - **upload**: bounded-concurrency uploads with guaranteed part cleanup
//! - **session**: the session state machine
//! - **pipeline**: the end-to-end driver
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tdbulk_client::{ApiClient, ClientConfig};
//! use tdbulk_common::{Column, ColumnType, Schema, Value};
//! use tdbulk_ingest::{BulkImport, ImportConfig, VecRowSource};
//!
//! # async fn run() -> tdbulk_ingest::Result<()> {
//! let client = Arc::new(ApiClient::new(ClientConfig::with_apikey("1/abcdef"))?);
//! let schema = Schema::new(vec![
//!     Column::new("time", ColumnType::Long),
//!     Column::new("message", ColumnType::String),
//! ]);
//! let mut rows = VecRowSource::new(schema, vec![vec![Value::Long(1_442_595_600), "hi".into()]]);
//!
//! let report = BulkImport::new(client, ImportConfig::new("logs", "events"))?
//!     .run(&mut rows)
//!     .await?;
//! println!("{} records committed", report.valid_records);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod encoder;
pub mod error;
pub mod part;
pub mod pipeline;
pub mod session;
pub mod source;
pub mod upload;

pub use config::{ImportConfig, ImportMode};
pub use encoder::{EncoderConfig, FieldWriterSet};
pub use error::{EncodeError, ImportError, Result};
pub use part::{PartFile, PartFileBuilder, PartState};
pub use pipeline::{BulkImport, ImportReport};
pub use session::SessionController;
pub use source::{RowSource, VecRowSource};
pub use upload::{PartUploader, SessionPartUploader, UploadScheduler, UploadSummary};
