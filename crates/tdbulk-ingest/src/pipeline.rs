//! End-to-end import driver

use crate::config::{ImportConfig, ImportMode};
use crate::encoder::FieldWriterSet;
use crate::error::{ImportError, Result};
use crate::part::PartFileBuilder;
use crate::session::SessionController;
use crate::source::RowSource;
use crate::upload::{SessionPartUploader, UploadScheduler, UploadSummary};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tdbulk_client::{ApiClient, ApiResultExt, SessionStatus};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Outcome of one [`BulkImport::run`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub session: String,
    pub database: String,
    pub table: String,
    /// False when an existing session was resumed past its upload stage
    pub uploaded: bool,
    pub rows_read: u64,
    pub rows_skipped: u64,
    pub parts: u64,
    pub records_uploaded: u64,
    pub bytes_uploaded: u64,
    pub valid_records: u64,
    pub error_records: u64,
    pub job_id: Option<String>,
    pub elapsed_ms: u64,
}

#[derive(Debug, Default)]
struct EncodeTotals {
    rows_read: u64,
    rows_skipped: u64,
}

pub struct BulkImport {
    client: Arc<ApiClient>,
    config: ImportConfig,
    cancel: CancellationToken,
}

impl BulkImport {
    pub fn new(client: Arc<ApiClient>, config: ImportConfig) -> Result<Self> {
        config.validate()?;
        let cancel = client.cancellation_token().clone();
        Ok(Self {
            client,
            config,
            cancel,
        })
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn config(&self) -> &ImportConfig {
        &self.config
    }

    /// Import every row of `source`
    ///
    /// The encoder is resolved against the source schema before any remote call, so
    /// configuration errors never leave a half-created session behind.
    pub async fn run<S: RowSource + ?Sized>(&self, source: &mut S) -> Result<ImportReport> {
        let started = Instant::now();
        let mut writers = FieldWriterSet::new(source.schema(), &self.config.encoder)?;

        let database = &self.config.database;
        let session = self.config.session_name();
        let load_table = self.config.load_table(&session);

        info!(
            session = %session,
            database = %database,
            table = %self.config.table,
            mode = ?self.config.mode,
            "Starting import"
        );

        let swap_pending = match self.config.mode {
            ImportMode::Replace => self.scratch_table_pending(&session, &load_table).await?,
            ImportMode::Append => false,
        };

        if self.config.mode == ImportMode::Replace && !swap_pending {
            info!(
                session = %session,
                table = %self.config.table,
                "Destination already replaced by this session, skipping table setup"
            );
        } else {
            self.prepare_destination(&load_table).await?;
        }

        let controller = SessionController::from_config(Arc::clone(&self.client), &self.config)
            .with_cancellation(self.cancel.clone());

        let mut report = ImportReport {
            session: session.clone(),
            database: database.clone(),
            table: self.config.table.clone(),
            ..ImportReport::default()
        };

        if controller
            .start_session(&session, database, &load_table)
            .await?
        {
            let (totals, summary) = self.upload_rows(&session, &mut writers, source).await?;
            report.uploaded = true;
            report.rows_read = totals.rows_read;
            report.rows_skipped = totals.rows_skipped;
            report.parts = summary.parts;
            report.records_uploaded = summary.records;
            report.bytes_uploaded = summary.bytes;
        } else {
            info!(session = %session, "Resuming session without uploading");
        }

        let committed = controller
            .complete_session(&session, self.config.priority)
            .await?;
        report.valid_records = committed.valid_records();
        report.error_records = committed.error_records();
        report.job_id = committed.job_id.clone();

        if swap_pending {
            self.client
                .rename_table(database, &load_table, &self.config.table, true)
                .await?;
            info!(from = %load_table, to = %self.config.table, "Replaced destination table");
        }

        if self.config.cleanup_session {
            if let Err(e) = controller.delete_session(&session).await {
                warn!(session = %session, error = %e, "Failed to delete committed session");
            }
        }

        report.elapsed_ms = started.elapsed().as_millis() as u64;
        info!(
            session = %session,
            rows = report.rows_read,
            skipped = report.rows_skipped,
            parts = report.parts,
            valid_records = report.valid_records,
            elapsed_ms = report.elapsed_ms,
            "Import finished"
        );
        Ok(report)
    }

    /// Whether the scratch table of a Replace import still has to be swapped in
    ///
    /// False once a session that was committed on entry has no scratch table left; an
    /// earlier run already renamed it over the destination.
    async fn scratch_table_pending(&self, session: &str, load_table: &str) -> Result<bool> {
        let existing = self.client.get_session(session).await.ignore_not_found()?;
        if !matches!(existing, Some(ref s) if s.status == SessionStatus::Committed) {
            return Ok(true);
        }

        let tables = self.client.list_tables(&self.config.database).await?;
        Ok(tables.iter().any(|t| t.name == load_table))
    }

    /// Make sure the database and load table exist
    async fn prepare_destination(&self, load_table: &str) -> Result<()> {
        let database = &self.config.database;

        if self.config.auto_create_table {
            if self
                .client
                .create_database(database)
                .await
                .ignore_conflict()?
                .is_some()
            {
                info!(database = %database, "Created database");
            }
            if self
                .client
                .create_table(database, load_table)
                .await
                .ignore_conflict()?
                .is_some()
            {
                info!(database = %database, table = %load_table, "Created table");
            }
            return Ok(());
        }

        let tables = match self.client.list_tables(database).await {
            Ok(tables) => tables,
            Err(e) if e.is_not_found() => {
                return Err(ImportError::config(format!(
                    "Database '{}' does not exist and auto_create_table is disabled",
                    database
                )));
            },
            Err(e) => return Err(e.into()),
        };

        if self.config.mode == ImportMode::Replace {
            // The scratch table is ours to create even when auto-create is off
            self.client
                .create_table(database, load_table)
                .await
                .ignore_conflict()?;
        } else if !tables.iter().any(|t| t.name == load_table) {
            return Err(ImportError::config(format!(
                "Table '{}.{}' does not exist and auto_create_table is disabled",
                database, load_table
            )));
        }

        Ok(())
    }

    async fn upload_rows<S: RowSource + ?Sized>(
        &self,
        session: &str,
        writers: &mut FieldWriterSet,
        source: &mut S,
    ) -> Result<(EncodeTotals, UploadSummary)> {
        let uploader = Arc::new(SessionPartUploader::new(Arc::clone(&self.client), session));
        let mut scheduler = UploadScheduler::new(uploader, self.config.upload_concurrency());

        match self.encode_rows(&mut scheduler, writers, source).await {
            Ok(totals) => {
                let summary = scheduler.finish().await?;
                Ok((totals, summary))
            },
            Err(e) => {
                scheduler.drain().await;
                Err(e)
            },
        }
    }

    async fn encode_rows<S: RowSource + ?Sized>(
        &self,
        scheduler: &mut UploadScheduler,
        writers: &mut FieldWriterSet,
        source: &mut S,
    ) -> Result<EncodeTotals> {
        let tmpdir = self.config.tmpdir();
        let prefix = self.config.part_name_prefix();
        let mut totals = EncodeTotals::default();
        let mut seq = 0u64;
        let mut builder: Option<PartFileBuilder> = None;

        while let Some(row) = source.next_row()? {
            if self.cancel.is_cancelled() {
                return Err(ImportError::Cancelled);
            }
            totals.rows_read += 1;

            let record = match writers.write_record(&row) {
                Ok(record) => record,
                Err(e) if self.config.stop_on_invalid_record => return Err(e.into()),
                Err(e) => {
                    totals.rows_skipped += 1;
                    warn!(row = totals.rows_read, error = %e, "Skipping invalid record");
                    continue;
                },
            };

            let mut part = match builder.take() {
                Some(part) => part,
                None => {
                    seq += 1;
                    PartFileBuilder::create(&tmpdir, seq, &prefix)?
                },
            };
            part.add_record(&record)?;

            if part.compressed_size() >= self.config.part_size_bytes {
                debug!(part = %part.name(), records = part.record_count(), "Part is full");
                if let Some(finished) = part.finish()? {
                    scheduler.submit(finished).await?;
                }
            } else {
                builder = Some(part);
            }
        }

        if let Some(part) = builder {
            if let Some(finished) = part.finish()? {
                scheduler.submit(finished).await?;
            }
        }

        Ok(totals)
    }
}
