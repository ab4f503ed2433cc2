use exam_core::model::{QuestionNumber, Session, SessionState};

/// Aggregated view of session progress, useful for UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionProgress {
    pub title: String,
    pub state: SessionState,
    pub current: QuestionNumber,
    pub total: u32,
    pub answered: usize,
    pub flagged: Vec<QuestionNumber>,
    pub remaining_secs: u32,
}

impl SessionProgress {
    #[must_use]
    pub fn of(session: &Session) -> Self {
        Self {
            title: session.paper().title().to_owned(),
            state: session.state(),
            current: session.current_question(),
            total: session.paper().total_questions(),
            answered: session.answered_count(),
            flagged: session.flagged().iter().copied().collect(),
            remaining_secs: session.time_remaining_secs(),
        }
    }
}
