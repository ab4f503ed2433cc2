use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

use crate::model::draft::Draft;
use crate::model::ids::{QuestionNumber, TestId};
use crate::model::test_paper::TestPaper;
use crate::timer::{Countdown, Tick};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionError {
    #[error("question {number} is not part of this test (1..={total})")]
    InvalidQuestion { number: QuestionNumber, total: u32 },

    #[error("answer cannot be empty")]
    EmptyAnswer,

    #[error("session is {0:?} and no longer accepts changes")]
    Closed(SessionState),
}

//
// ─── STATE ─────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    NotStarted,
    Active,
    Paused,
    TimedOut,
    Submitted,
}

impl SessionState {
    /// Whether answers and flags can still change.
    #[must_use]
    pub fn is_open(self) -> bool {
        matches!(
            self,
            SessionState::NotStarted | SessionState::Active | SessionState::Paused
        )
    }
}

/// What a single timer tick did to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Ignored,
    Counting { remaining_secs: u32 },
    TimedOut,
}

/// Entries dropped while restoring a draft because they no longer fit the test.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestoreReport {
    pub restored_answers: usize,
    pub restored_flags: usize,
    pub dropped: Vec<QuestionNumber>,
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// The live test attempt: question pointer, answers, flags and countdown.
///
/// All mutation goes through the methods below so the invariants hold: the
/// pointer and every answered/flagged number are valid questions of `paper`,
/// and remaining time only goes down until [`Session::reset`].
#[derive(Debug, Clone)]
pub struct Session {
    paper: TestPaper,
    state: SessionState,
    current: QuestionNumber,
    answers: BTreeMap<QuestionNumber, String>,
    flagged: BTreeSet<QuestionNumber>,
    countdown: Countdown,
}

impl Session {
    #[must_use]
    pub fn new(paper: TestPaper) -> Self {
        let countdown = Countdown::new(paper.time_limit_secs());
        Self {
            paper,
            state: SessionState::NotStarted,
            current: QuestionNumber::FIRST,
            answers: BTreeMap::new(),
            flagged: BTreeSet::new(),
            countdown,
        }
    }

    /// Apply a saved draft, skipping entries outside the test's question range.
    pub fn restore(&mut self, draft: &Draft) -> RestoreReport {
        let mut report = RestoreReport::default();
        for (number, token) in &draft.answers {
            if self.paper.contains(*number) && !token.trim().is_empty() {
                self.answers.insert(*number, token.trim().to_owned());
                report.restored_answers += 1;
            } else {
                report.dropped.push(*number);
            }
        }
        for number in &draft.flagged {
            if self.paper.contains(*number) {
                self.flagged.insert(*number);
                report.restored_flags += 1;
            } else {
                report.dropped.push(*number);
            }
        }
        report
    }

    #[must_use]
    pub fn paper(&self) -> &TestPaper {
        &self.paper
    }

    #[must_use]
    pub fn test_id(&self) -> &TestId {
        self.paper.id()
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state == SessionState::Active
    }

    #[must_use]
    pub fn current_question(&self) -> QuestionNumber {
        self.current
    }

    #[must_use]
    pub fn answers(&self) -> &BTreeMap<QuestionNumber, String> {
        &self.answers
    }

    #[must_use]
    pub fn answer(&self, number: QuestionNumber) -> Option<&str> {
        self.answers.get(&number).map(String::as_str)
    }

    #[must_use]
    pub fn flagged(&self) -> &BTreeSet<QuestionNumber> {
        &self.flagged
    }

    #[must_use]
    pub fn is_flagged(&self, number: QuestionNumber) -> bool {
        self.flagged.contains(&number)
    }

    #[must_use]
    pub fn answered_count(&self) -> usize {
        self.answers.len()
    }

    #[must_use]
    pub fn time_remaining_secs(&self) -> u32 {
        self.countdown.remaining_secs()
    }

    #[must_use]
    pub fn time_spent_secs(&self) -> u32 {
        self.countdown.elapsed_secs()
    }

    /// Begin or resume the attempt. Returns `false` when nothing changed.
    pub fn start(&mut self) -> bool {
        match self.state {
            SessionState::NotStarted => {
                self.countdown.restart();
                self.countdown.start();
                self.state = SessionState::Active;
                true
            }
            SessionState::Paused => {
                self.countdown.start();
                self.state = SessionState::Active;
                true
            }
            SessionState::Active | SessionState::TimedOut | SessionState::Submitted => false,
        }
    }

    /// Suspend the countdown. Returns `false` unless the session was active.
    pub fn pause(&mut self) -> bool {
        if self.state != SessionState::Active {
            return false;
        }
        self.countdown.stop();
        self.state = SessionState::Paused;
        true
    }

    /// Record `token` as the answer to `number`, replacing any earlier choice.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Closed` after time-out or submission,
    /// `SessionError::InvalidQuestion` for numbers outside the test, and
    /// `SessionError::EmptyAnswer` for a blank token.
    pub fn select_answer(
        &mut self,
        number: QuestionNumber,
        token: impl Into<String>,
    ) -> Result<(), SessionError> {
        self.ensure_editable(number)?;
        let token = token.into();
        let token = token.trim();
        if token.is_empty() {
            return Err(SessionError::EmptyAnswer);
        }
        self.answers.insert(number, token.to_owned());
        Ok(())
    }

    /// Flip the review flag on `number` and return the new flagged state.
    ///
    /// # Errors
    ///
    /// Same validity rules as [`Session::select_answer`].
    pub fn toggle_flag(&mut self, number: QuestionNumber) -> Result<bool, SessionError> {
        self.ensure_editable(number)?;
        if self.flagged.remove(&number) {
            Ok(false)
        } else {
            self.flagged.insert(number);
            Ok(true)
        }
    }

    /// Move the question pointer. Out-of-range numbers are ignored.
    pub fn navigate(&mut self, number: QuestionNumber) -> bool {
        if !self.paper.contains(number) || number == self.current {
            return false;
        }
        self.current = number;
        true
    }

    pub fn next(&mut self) -> bool {
        self.navigate(self.current.next())
    }

    pub fn previous(&mut self) -> bool {
        self.navigate(self.current.previous())
    }

    /// Advance the countdown by one second if the session is active.
    pub fn tick(&mut self) -> TickOutcome {
        if self.state != SessionState::Active {
            return TickOutcome::Ignored;
        }
        match self.countdown.tick() {
            Tick::Idle => TickOutcome::Ignored,
            Tick::Running { remaining_secs } => TickOutcome::Counting { remaining_secs },
            Tick::Expired => {
                self.state = SessionState::TimedOut;
                TickOutcome::TimedOut
            }
        }
    }

    pub fn mark_submitted(&mut self) {
        self.countdown.stop();
        self.state = SessionState::Submitted;
    }

    /// Clear answers and flags and return to `NotStarted` with a full timer.
    pub fn reset(&mut self) {
        self.answers.clear();
        self.flagged.clear();
        self.current = QuestionNumber::FIRST;
        self.countdown.restart();
        self.state = SessionState::NotStarted;
    }

    #[must_use]
    pub fn to_draft(&self, saved_at: DateTime<Utc>) -> Draft {
        Draft {
            test_id: Some(self.paper.id().clone()),
            answers: self.answers.clone(),
            flagged: self.flagged.clone(),
            timestamp: Some(saved_at),
        }
    }

    fn ensure_editable(&self, number: QuestionNumber) -> Result<(), SessionError> {
        if !self.state.is_open() {
            return Err(SessionError::Closed(self.state));
        }
        if !self.paper.contains(number) {
            return Err(SessionError::InvalidQuestion {
                number,
                total: self.paper.total_questions(),
            });
        }
        Ok(())
    }
}
