use exam_core::model::QuestionNumber;

use crate::submission::{ResyncReport, SubmissionAck};

/// A user action or host event, consumed by `SessionController::dispatch`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    Start,
    Pause,
    /// Start when stopped, pause when running (the single test button).
    Toggle,
    SelectAnswer {
        number: QuestionNumber,
        token: String,
    },
    ToggleFlag(QuestionNumber),
    Navigate(QuestionNumber),
    Next,
    Previous,
    Tick,
    Reset,
    SaveDraft,
    Submit,
    ConnectivityChanged {
        online: bool,
    },
    UpdateProfile {
        name: String,
        class: String,
    },
}

/// What a dispatched command did.
#[derive(Debug)]
pub enum CommandOutcome {
    Unchanged,
    Changed,
    Flagged {
        number: QuestionNumber,
        flagged: bool,
    },
    Ticked {
        remaining_secs: u32,
    },
    /// The countdown expired and no identity was available to auto-submit.
    TimedOut,
    Submitted(SubmissionAck),
    Queued,
    Resynced(ResyncReport),
}
