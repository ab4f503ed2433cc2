use std::fmt;
use std::sync::Mutex;

use exam_core::model::{IdentityField, TestId};

/// Severity of a notice, mapped to toast styling by presenters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
    /// Needs the student to act before the flow can continue.
    Prompt,
}

/// A user-visible state transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    DraftSaved { test_id: TestId },
    SubmissionDelivered { test_id: TestId },
    SubmissionQueued { test_id: TestId, pending: usize },
    SubmissionLost { test_id: TestId },
    ValidationFailed { missing: Vec<IdentityField> },
    TimeUp { auto_submit: bool },
    IdentityRequired,
    PersistenceFailed { detail: String },
    ResyncFinished { delivered: usize, remaining: usize },
}

impl Notice {
    #[must_use]
    pub fn level(&self) -> NoticeLevel {
        match self {
            Notice::DraftSaved { .. } | Notice::SubmissionDelivered { .. } => NoticeLevel::Success,
            Notice::SubmissionQueued { .. } | Notice::TimeUp { .. } => NoticeLevel::Warning,
            Notice::SubmissionLost { .. } | Notice::PersistenceFailed { .. } => NoticeLevel::Error,
            Notice::ValidationFailed { .. } | Notice::IdentityRequired => NoticeLevel::Prompt,
            Notice::ResyncFinished { remaining, .. } => {
                if *remaining == 0 {
                    NoticeLevel::Success
                } else {
                    NoticeLevel::Info
                }
            }
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::DraftSaved { .. } => f.write_str("Draft saved locally!"),
            Notice::SubmissionDelivered { .. } => {
                f.write_str("Test submitted successfully! Answers sent to the teacher.")
            }
            Notice::SubmissionQueued { pending, .. } => write!(
                f,
                "You are offline. Submission saved and will be sent when online ({pending} pending)."
            ),
            Notice::SubmissionLost { test_id } => write!(
                f,
                "Submission for test {test_id} could not be sent or saved. Please try again."
            ),
            Notice::ValidationFailed { missing } => {
                let fields: Vec<_> = missing.iter().map(|field| field.label()).collect();
                write!(
                    f,
                    "Please enter your {} before submitting.",
                    fields.join(" and ")
                )
            }
            Notice::TimeUp { auto_submit: true } => {
                f.write_str("Time is up! Test will be automatically submitted.")
            }
            Notice::TimeUp { auto_submit: false } => f.write_str("Time is up!"),
            Notice::IdentityRequired => {
                f.write_str("Enter your name and class to submit your answers.")
            }
            Notice::PersistenceFailed { detail } => {
                write!(f, "Could not save your progress locally: {detail}")
            }
            Notice::ResyncFinished {
                delivered,
                remaining,
            } => write!(
                f,
                "Synced {delivered} pending submission(s); {remaining} still waiting."
            ),
        }
    }
}

/// Sink for notices. Implementations must not block the caller.
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// Writes notices to the `tracing` log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notice: Notice) {
        match notice.level() {
            NoticeLevel::Error => tracing::error!(notice = %notice, "notice"),
            NoticeLevel::Warning | NoticeLevel::Prompt => tracing::warn!(notice = %notice, "notice"),
            NoticeLevel::Info | NoticeLevel::Success => tracing::info!(notice = %notice, "notice"),
        }
    }
}

/// Keeps every notice in memory, for tests and headless runs.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn notices(&self) -> Vec<Notice> {
        self.notices
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn contains(&self, predicate: impl Fn(&Notice) -> bool) -> bool {
        self.notices().iter().any(predicate)
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        if let Ok(mut guard) = self.notices.lock() {
            guard.push(notice);
        }
    }
}
