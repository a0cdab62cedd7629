//! Bounded-concurrency part uploads
//!
//! Parts are uploaded by spawned tasks. Admission is FIFO: once `concurrency` uploads are
//! outstanding, [`UploadScheduler::submit`] awaits the oldest one before spawning the next,
//! even if a younger upload finishes first. Every task deletes its part file whether the
//! upload succeeded or not.

use crate::error::{ImportError, Result};
use crate::part::{PartFile, PartState};
use async_trait::async_trait;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Arc;
use tdbulk_client::{ApiClient, ApiError};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub const MIN_UPLOAD_CONCURRENCY: usize = 1;
pub const MAX_UPLOAD_CONCURRENCY: usize = 8;

/// Destination for finished parts
#[async_trait]
pub trait PartUploader: Send + Sync {
    async fn upload(&self, part: &PartFile) -> std::result::Result<(), ApiError>;
}

/// Uploads parts into one bulk-import session
#[derive(Debug, Clone)]
pub struct SessionPartUploader {
    client: Arc<ApiClient>,
    session: String,
}

impl SessionPartUploader {
    pub fn new(client: Arc<ApiClient>, session: impl Into<String>) -> Self {
        Self {
            client,
            session: session.into(),
        }
    }
}

#[async_trait]
impl PartUploader for SessionPartUploader {
    async fn upload(&self, part: &PartFile) -> std::result::Result<(), ApiError> {
        self.client
            .upload_part(&self.session, part.name(), part.path())
            .await
    }
}

/// Totals over every successfully uploaded part
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UploadSummary {
    pub parts: u64,
    pub records: u64,
    pub bytes: u64,
}

impl UploadSummary {
    fn add(&mut self, stats: PartStats) {
        self.parts += 1;
        self.records += stats.records;
        self.bytes += stats.bytes;
    }
}

#[derive(Debug, Clone, Copy)]
struct PartStats {
    records: u64,
    bytes: u64,
}

type UploadHandle = JoinHandle<Result<PartStats>>;

pub struct UploadScheduler {
    uploader: Arc<dyn PartUploader>,
    concurrency: usize,
    outstanding: VecDeque<UploadHandle>,
    summary: UploadSummary,
}

impl UploadScheduler {
    /// `concurrency` is clamped to 1..=8
    pub fn new(uploader: Arc<dyn PartUploader>, concurrency: usize) -> Self {
        let clamped = concurrency.clamp(MIN_UPLOAD_CONCURRENCY, MAX_UPLOAD_CONCURRENCY);
        if clamped != concurrency {
            warn!(requested = concurrency, using = clamped, "Clamping upload concurrency");
        }

        Self {
            uploader,
            concurrency: clamped,
            outstanding: VecDeque::with_capacity(clamped),
            summary: UploadSummary::default(),
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub fn in_flight(&self) -> usize {
        self.outstanding.len()
    }

    /// Totals for uploads that have been awaited so far
    pub fn summary(&self) -> UploadSummary {
        self.summary
    }

    /// Hand `part` to a new upload task, waiting for room first
    ///
    /// If an earlier upload failed, its error is returned, `part` is deleted and every
    /// other outstanding upload is awaited before returning.
    pub async fn submit(&mut self, part: PartFile) -> Result<()> {
        while self.outstanding.len() >= self.concurrency {
            if let Err(e) = self.await_oldest().await {
                part.finalize();
                self.drain().await;
                return Err(e);
            }
        }

        self.spawn(part);
        Ok(())
    }

    /// Await every outstanding upload
    ///
    /// All tasks run to completion even after a failure; the first error is returned.
    pub async fn finish(mut self) -> Result<UploadSummary> {
        let mut first_error = None;

        while !self.outstanding.is_empty() {
            if let Err(e) = self.await_oldest().await {
                if first_error.is_none() {
                    first_error = Some(e);
                } else {
                    warn!(error = %e, "Additional upload failure");
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => {
                info!(
                    parts = self.summary.parts,
                    records = self.summary.records,
                    bytes = self.summary.bytes,
                    "All parts uploaded"
                );
                Ok(self.summary)
            },
        }
    }

    /// Await every outstanding upload, logging failures
    pub async fn drain(&mut self) {
        while !self.outstanding.is_empty() {
            if let Err(e) = self.await_oldest().await {
                warn!(error = %e, "Upload failed while draining");
            }
        }
    }

    async fn await_oldest(&mut self) -> Result<()> {
        let Some(handle) = self.outstanding.pop_front() else {
            return Ok(());
        };

        let stats = handle.await??;
        self.summary.add(stats);
        Ok(())
    }

    fn spawn(&mut self, mut part: PartFile) {
        let uploader = Arc::clone(&self.uploader);

        debug!(part = %part.name(), in_flight = self.outstanding.len(), "Submitting part");

        self.outstanding.push_back(tokio::spawn(async move {
            part.set_state(PartState::Uploading);
            let stats = PartStats {
                records: part.record_count(),
                bytes: part.size(),
            };

            let result = uploader.upload(&part).await;
            match &result {
                Ok(()) => {
                    part.set_state(PartState::Uploaded);
                    info!(
                        part = %part.name(),
                        records = stats.records,
                        bytes = stats.bytes,
                        "Uploaded part"
                    );
                },
                Err(e) => {
                    part.set_state(PartState::Failed);
                    warn!(part = %part.name(), error = %e, "Part upload failed");
                },
            }

            part.finalize();
            result.map(|()| stats).map_err(ImportError::from)
        }));
    }
}
