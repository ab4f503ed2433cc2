//! Shared error types for the services crate.

use thiserror::Error;

use exam_core::model::{SessionError, ValidationError};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by `LocalPersistence` for operations that report failure.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PersistenceError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("could not encode {key}: {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// A delivery attempt to the relay failed; the record can be retried later.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DeliveryError {
    #[error("relay is unreachable while offline")]
    Offline,
    #[error("relay answered with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Errors emitted by `SubmissionPipeline::submit`.
///
/// `Queued` is a deferred success: the record is stored and will be resent.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SubmissionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("submission saved for retry: {reason}")]
    Queued { reason: DeliveryError },
    #[error("submission could not be delivered ({delivery}) or saved ({storage})")]
    Unsaved {
        delivery: DeliveryError,
        storage: PersistenceError,
    },
}

impl SubmissionError {
    /// Whether the submission is safe in the pending queue.
    #[must_use]
    pub fn is_deferred(&self) -> bool {
        matches!(self, SubmissionError::Queued { .. })
    }
}

/// Errors emitted by `SessionController`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ControllerError {
    #[error("no test is loaded")]
    NoActiveTest,
    #[error("test {0} is in progress; pause it before switching")]
    TestInProgress(String),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Submission(#[from] SubmissionError),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Endpoint(#[from] url::ParseError),
}
