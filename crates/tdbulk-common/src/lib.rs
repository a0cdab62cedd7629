//! tdbulk Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types, utilities, and error handling for the tdbulk workspace.
//!
//! # Overview
//!
//! - **Types**: the column/row model consumed by the encoder (`Schema`, `Column`, `Value`)
//! - **Logging**: tracing subscriber setup shared by every binary
//! - **Error Handling**: errors raised while parsing the shared types
//!
//! # Example
//!
//! ```
//! use tdbulk_common::types::{Column, ColumnType, Schema};
//!
//! let schema = Schema::new(vec![
//!     Column::new("time", ColumnType::Long),
//!     Column::new("message", ColumnType::String),
//! ]);
//! assert_eq!(schema.index_of("message"), Some(1));
//! ```

pub mod error;
pub mod logging;
pub mod types;

// Re-export commonly used types
pub use error::{CommonError, Result};
pub use types::{Column, ColumnType, Row, Schema, Value};
