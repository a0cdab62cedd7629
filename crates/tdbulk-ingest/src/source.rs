//! Row cursors feeding the pipeline

use crate::error::Result;
use tdbulk_common::{Row, Schema};

/// Sequential reader of typed rows
pub trait RowSource {
    fn schema(&self) -> &Schema;

    /// Next row, or `None` once the source is exhausted
    fn next_row(&mut self) -> Result<Option<Row>>;
}

/// In-memory rows
#[derive(Debug, Clone)]
pub struct VecRowSource {
    schema: Schema,
    rows: std::vec::IntoIter<Row>,
}

impl VecRowSource {
    pub fn new(schema: Schema, rows: Vec<Row>) -> Self {
        Self {
            schema,
            rows: rows.into_iter(),
        }
    }
}

impl RowSource for VecRowSource {
    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn next_row(&mut self) -> Result<Option<Row>> {
        Ok(self.rows.next())
    }
}
