//! Bulk-import session lifecycle
//!
//! ```text
//! uploading --freeze+perform--> performing --(server)--> ready --commit--> committing
//!                                                                              |
//!                                                    committed <--(server)-----+
//! ```
//!
//! [`SessionController::step`] advances one edge; [`SessionController::drive`] loops it,
//! so an interrupted import resumes from whatever state the server reports. Every
//! mutating call tolerates 409 so repeating a step is harmless.

use crate::config::ImportConfig;
use crate::error::{ImportError, Result};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tdbulk_client::{ApiClient, ApiResultExt, BulkImportSession, SessionStatus};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(6 * 60 * 60);

pub struct SessionController {
    client: Arc<ApiClient>,
    poll_interval: Duration,
    poll_timeout: Duration,
    cancel: CancellationToken,
    stop_on_invalid_record: bool,
}

impl SessionController {
    /// Controller sharing the client's cancellation token
    pub fn new(client: Arc<ApiClient>) -> Self {
        let cancel = client.cancellation_token().clone();
        Self {
            client,
            poll_interval: DEFAULT_POLL_INTERVAL,
            poll_timeout: DEFAULT_POLL_TIMEOUT,
            cancel,
            stop_on_invalid_record: false,
        }
    }

    pub fn from_config(client: Arc<ApiClient>, config: &ImportConfig) -> Self {
        Self::new(client)
            .with_poll_interval(config.poll_interval())
            .with_poll_timeout(config.poll_timeout())
            .with_stop_on_invalid_record(config.stop_on_invalid_record)
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = timeout;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn with_stop_on_invalid_record(mut self, stop: bool) -> Self {
        self.stop_on_invalid_record = stop;
        self
    }

    /// Create the session if needed and report whether parts should be uploaded
    ///
    /// Returns `false` when the session already moved past the upload stage (including a
    /// frozen session that was never performed); the caller should go straight to
    /// [`Self::complete_session`].
    #[instrument(skip(self))]
    pub async fn start_session(&self, name: &str, database: &str, table: &str) -> Result<bool> {
        if self
            .client
            .create_session(name, database, table)
            .await
            .ignore_conflict()?
            .is_some()
        {
            info!("Created bulk-import session");
        } else {
            info!("Bulk-import session already exists");
        }

        let session = self.client.get_session(name).await?;

        if session.database != database || session.table != table {
            return Err(ImportError::config(format!(
                "Session {} belongs to {}.{}, not {}.{}",
                name, session.database, session.table, database, table
            )));
        }

        match session.status {
            SessionStatus::Uploading if !session.is_frozen() => Ok(true),
            SessionStatus::Unknown => Err(ImportError::UnknownStatus {
                session: name.to_string(),
            }),
            status => {
                info!(
                    status = %status,
                    frozen = session.is_frozen(),
                    "Session is past the upload stage, skipping upload"
                );
                Ok(false)
            },
        }
    }

    /// Drive the session from its current remote state to committed
    #[instrument(skip(self))]
    pub async fn complete_session(&self, name: &str, priority: i32) -> Result<BulkImportSession> {
        let session = self.client.get_session(name).await?;
        self.drive(name, session.status, priority).await
    }

    /// Loop [`Self::step`] from `from` until the session is committed
    pub async fn drive(
        &self,
        name: &str,
        from: SessionStatus,
        priority: i32,
    ) -> Result<BulkImportSession> {
        let mut state = from;
        while state != SessionStatus::Committed {
            state = self.step(name, state, priority).await?;
        }

        let session = self.client.get_session(name).await?;
        info!(
            session = %name,
            valid_records = session.valid_records(),
            error_records = session.error_records(),
            "Session committed"
        );
        Ok(session)
    }

    /// Advance the session by one transition
    pub async fn step(
        &self,
        name: &str,
        state: SessionStatus,
        priority: i32,
    ) -> Result<SessionStatus> {
        match state {
            SessionStatus::Uploading => {
                let session = self.client.get_session(name).await?;
                if !session.is_frozen() {
                    self.client.freeze_session(name).await.ignore_conflict()?;
                    debug!(session = %name, "Froze session");
                }
                self.client
                    .perform_session(name, priority)
                    .await
                    .ignore_conflict()?;
                info!(session = %name, priority, "Started perform job");
                Ok(SessionStatus::Performing)
            },
            SessionStatus::Performing => {
                self.wait_for_status_change(name, SessionStatus::Performing, SessionStatus::Ready)
                    .await?;
                Ok(SessionStatus::Ready)
            },
            SessionStatus::Ready => {
                let session = self.client.get_session(name).await?;
                let errors = session.error_records();
                if errors > 0 {
                    if self.stop_on_invalid_record {
                        return Err(ImportError::InvalidRecords {
                            session: name.to_string(),
                            count: errors,
                        });
                    }
                    warn!(session = %name, error_records = errors, "Session has invalid records");
                }

                self.client.commit_session(name).await.ignore_conflict()?;
                info!(session = %name, valid_records = session.valid_records(), "Committing");
                Ok(SessionStatus::Committing)
            },
            SessionStatus::Committing => {
                self.wait_for_status_change(
                    name,
                    SessionStatus::Committing,
                    SessionStatus::Committed,
                )
                .await?;
                Ok(SessionStatus::Committed)
            },
            SessionStatus::Committed => Ok(SessionStatus::Committed),
            SessionStatus::Unknown => Err(ImportError::UnknownStatus {
                session: name.to_string(),
            }),
        }
    }

    /// Poll until the session leaves `current` for `expecting`
    ///
    /// Any other status is a protocol violation. Bounded by the poll timeout and
    /// interrupted by cancellation.
    pub async fn wait_for_status_change(
        &self,
        name: &str,
        current: SessionStatus,
        expecting: SessionStatus,
    ) -> Result<BulkImportSession> {
        let started = Instant::now();

        loop {
            let session = self.client.get_session(name).await?;

            if session.status == expecting {
                return Ok(session);
            }
            if session.status != current {
                return Err(ImportError::ProtocolViolation {
                    session: name.to_string(),
                    current,
                    expecting,
                    observed: session.status,
                });
            }

            let elapsed = started.elapsed();
            if elapsed >= self.poll_timeout {
                return Err(ImportError::PollTimeout {
                    session: name.to_string(),
                    expecting,
                    elapsed_secs: elapsed.as_secs(),
                });
            }

            debug!(session = %name, status = %current, expecting = %expecting, "Waiting");

            tokio::select! {
                biased;

                _ = self.cancel.cancelled() => return Err(ImportError::Cancelled),
                _ = tokio::time::sleep(self.poll_interval) => {},
            }
        }
    }

    /// Delete the session; a missing session counts as deleted
    pub async fn delete_session(&self, name: &str) -> Result<bool> {
        let deleted = self
            .client
            .delete_session(name)
            .await
            .ignore_not_found()?
            .is_some();
        if deleted {
            info!(session = %name, "Deleted session");
        }
        Ok(deleted)
    }

    pub async fn show_session(&self, name: &str) -> Result<BulkImportSession> {
        Ok(self.client.get_session(name).await?)
    }
}
