use std::sync::Arc;

use exam_core::model::{Session, StudentIdentity, SubmissionRecord};

use crate::Clock;
use crate::error::{DeliveryError, PersistenceError, SubmissionError};
use crate::notifications::{Notice, Notifier};
use crate::persistence::LocalPersistence;

use super::transport::{SubmissionAck, SubmissionTransport};

/// Outcome of draining the pending queue.
#[derive(Debug, Default)]
pub struct ResyncReport {
    pub delivered: usize,
    pub remaining: usize,
    /// Why draining stopped early, if it did.
    pub halted: Option<DeliveryError>,
}

impl ResyncReport {
    #[must_use]
    pub fn is_drained(&self) -> bool {
        self.remaining == 0
    }
}

/// Builds submission records, delivers them once, and queues what fails.
#[derive(Clone)]
pub struct SubmissionPipeline {
    clock: Clock,
    transport: Arc<dyn SubmissionTransport>,
    persistence: LocalPersistence,
    notifier: Arc<dyn Notifier>,
}

impl SubmissionPipeline {
    #[must_use]
    pub fn new(
        clock: Clock,
        transport: Arc<dyn SubmissionTransport>,
        persistence: LocalPersistence,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            clock,
            transport,
            persistence,
            notifier,
        }
    }

    /// Submit the session's answers for `identity`.
    ///
    /// On delivery the test is marked completed, its draft is cleared and the
    /// session is reset to `NotStarted`.
    ///
    /// # Errors
    ///
    /// Returns `SubmissionError::Validation` without any I/O when the identity
    /// is incomplete, `SubmissionError::Queued` when delivery failed and the
    /// record was saved for resync, and `SubmissionError::Unsaved` when it
    /// could not even be queued.
    pub async fn submit(
        &self,
        session: &mut Session,
        identity: &StudentIdentity,
    ) -> Result<SubmissionAck, SubmissionError> {
        let record = self.capture(session, identity)?;
        let test_id = record.test_id.clone();

        match self.transport.deliver(&record).await {
            Ok(ack) => {
                tracing::info!(
                    test_id = %test_id,
                    student = %record.student_name,
                    submission_id = ack.submission_id.as_deref().unwrap_or("-"),
                    "submission delivered"
                );
                if let Err(err) = self.persistence.mark_completed(&test_id).await {
                    tracing::warn!(test_id = %test_id, error = %err, "failed to mark test completed");
                }
                self.persistence.clear_draft(&test_id).await;
                session.mark_submitted();
                session.reset();
                self.notifier
                    .notify(Notice::SubmissionDelivered { test_id });
                Ok(ack)
            }
            Err(reason) => self.defer(record, reason).await,
        }
    }

    /// Store the session's answers for later delivery without touching the network.
    ///
    /// # Errors
    ///
    /// Returns `SubmissionError::Validation` when the identity is incomplete,
    /// otherwise `SubmissionError::Queued` or `SubmissionError::Unsaved`.
    pub async fn queue_offline(
        &self,
        session: &Session,
        identity: &StudentIdentity,
    ) -> Result<SubmissionAck, SubmissionError> {
        let record = self.capture(session, identity)?;
        self.defer(record, DeliveryError::Offline).await
    }

    fn capture(
        &self,
        session: &Session,
        identity: &StudentIdentity,
    ) -> Result<SubmissionRecord, SubmissionError> {
        SubmissionRecord::capture(session, identity, self.clock.now()).map_err(|err| {
            self.notifier.notify(Notice::ValidationFailed {
                missing: err.missing.clone(),
            });
            SubmissionError::from(err)
        })
    }

    async fn defer(
        &self,
        record: SubmissionRecord,
        reason: DeliveryError,
    ) -> Result<SubmissionAck, SubmissionError> {
        let test_id = record.test_id.clone();
        match self.persistence.enqueue_pending(&record).await {
            Ok(pending) => {
                tracing::info!(test_id = %test_id, pending, error = %reason, "delivery failed; submission queued");
                self.notifier
                    .notify(Notice::SubmissionQueued { test_id, pending });
                Err(SubmissionError::Queued { reason })
            }
            Err(storage) => {
                tracing::error!(
                    test_id = %test_id,
                    delivery = %reason,
                    storage = %storage,
                    "submission could not be delivered or queued"
                );
                self.notifier.notify(Notice::SubmissionLost { test_id });
                Err(SubmissionError::Unsaved {
                    delivery: reason,
                    storage,
                })
            }
        }
    }

    /// Replay queued submissions oldest first, stopping at the first failure.
    ///
    /// # Errors
    ///
    /// Returns `PersistenceError` if the queue cannot be read or updated.
    pub async fn resync(&self) -> Result<ResyncReport, PersistenceError> {
        let pending = self.persistence.list_pending().await?;
        let total = pending.len();
        let mut report = ResyncReport {
            remaining: total,
            ..ResyncReport::default()
        };
        if total == 0 {
            return Ok(report);
        }

        for record in &pending {
            match self.transport.deliver(record).await {
                Ok(_) => {
                    self.persistence.remove_pending(record).await?;
                    if let Err(err) = self.persistence.mark_completed(&record.test_id).await {
                        tracing::warn!(test_id = %record.test_id, error = %err, "failed to mark test completed");
                    }
                    report.delivered += 1;
                    report.remaining -= 1;
                    tracing::info!(test_id = %record.test_id, "pending submission synced");
                }
                Err(err) => {
                    tracing::warn!(
                        test_id = %record.test_id,
                        remaining = report.remaining,
                        error = %err,
                        "resync halted"
                    );
                    report.halted = Some(err);
                    break;
                }
            }
        }

        if report.delivered > 0 {
            self.persistence.record_sync(self.clock.now()).await?;
        }
        self.notifier.notify(Notice::ResyncFinished {
            delivered: report.delivered,
            remaining: report.remaining,
        });
        Ok(report)
    }

    #[must_use]
    pub fn persistence(&self) -> &LocalPersistence {
        &self.persistence
    }
}
