use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::ids::{QuestionNumber, TestId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TestPaperError {
    #[error("test title cannot be empty")]
    EmptyTitle,

    #[error("a test needs at least one question")]
    NoQuestions,

    #[error("time limit must be > 0 seconds")]
    InvalidTimeLimit,

    #[error("unknown test kind: {0}")]
    UnknownKind(String),
}

//
// ─── KIND ──────────────────────────────────────────────────────────────────────
//

/// Which exam module a test belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TestKind {
    #[default]
    Academic,
    General,
    Practice,
}

impl TestKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            TestKind::Academic => "academic",
            TestKind::General => "general",
            TestKind::Practice => "practice",
        }
    }
}

impl fmt::Display for TestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TestKind {
    type Err = TestPaperError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "academic" => Ok(TestKind::Academic),
            "general" => Ok(TestKind::General),
            "practice" => Ok(TestKind::Practice),
            other => Err(TestPaperError::UnknownKind(other.to_owned())),
        }
    }
}

//
// ─── TEST PAPER ────────────────────────────────────────────────────────────────
//

/// A loaded test: identity, title, time limit and question count.
///
/// Question content is owned by the presentation layer; the session only needs
/// to know which question numbers exist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestPaper {
    id: TestId,
    title: String,
    kind: TestKind,
    time_limit_secs: u32,
    total_questions: u32,
}

impl TestPaper {
    /// Build a validated test paper.
    ///
    /// # Errors
    ///
    /// Returns `TestPaperError` if the title is blank, there are no questions,
    /// or the time limit is zero.
    pub fn new(
        id: TestId,
        title: impl Into<String>,
        kind: TestKind,
        time_limit_secs: u32,
        total_questions: u32,
    ) -> Result<Self, TestPaperError> {
        let title = title.into().trim().to_owned();
        if title.is_empty() {
            return Err(TestPaperError::EmptyTitle);
        }
        if total_questions == 0 {
            return Err(TestPaperError::NoQuestions);
        }
        if time_limit_secs == 0 {
            return Err(TestPaperError::InvalidTimeLimit);
        }

        Ok(Self {
            id,
            title,
            kind,
            time_limit_secs,
            total_questions,
        })
    }

    #[must_use]
    pub fn id(&self) -> &TestId {
        &self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn kind(&self) -> TestKind {
        self.kind
    }

    #[must_use]
    pub fn time_limit_secs(&self) -> u32 {
        self.time_limit_secs
    }

    #[must_use]
    pub fn total_questions(&self) -> u32 {
        self.total_questions
    }

    /// Whether `number` is a question of this test (`1..=total_questions`).
    #[must_use]
    pub fn contains(&self, number: QuestionNumber) -> bool {
        (1..=self.total_questions).contains(&number.value())
    }

    /// Iterate over every valid question number in order.
    pub fn question_numbers(&self) -> impl Iterator<Item = QuestionNumber> + use<> {
        (1..=self.total_questions).map(QuestionNumber::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paper(total: u32) -> TestPaper {
        TestPaper::new(TestId::from(1), "Academic Test 1", TestKind::Academic, 3600, total)
            .unwrap()
    }

    #[test]
    fn rejects_empty_title_and_zero_counts() {
        let id = TestId::from(1);
        assert_eq!(
            TestPaper::new(id.clone(), "  ", TestKind::Academic, 60, 1).unwrap_err(),
            TestPaperError::EmptyTitle
        );
        assert_eq!(
            TestPaper::new(id.clone(), "T", TestKind::Academic, 60, 0).unwrap_err(),
            TestPaperError::NoQuestions
        );
        assert_eq!(
            TestPaper::new(id, "T", TestKind::Academic, 0, 5).unwrap_err(),
            TestPaperError::InvalidTimeLimit
        );
    }

    #[test]
    fn contains_is_one_based_and_inclusive() {
        let paper = paper(13);
        assert!(!paper.contains(QuestionNumber::new(0)));
        assert!(paper.contains(QuestionNumber::new(1)));
        assert!(paper.contains(QuestionNumber::new(13)));
        assert!(!paper.contains(QuestionNumber::new(14)));
        assert_eq!(paper.question_numbers().count(), 13);
    }

    #[test]
    fn kind_parses_case_insensitively() {
        assert_eq!("General".parse::<TestKind>().unwrap(), TestKind::General);
        assert!("listening".parse::<TestKind>().is_err());
    }
}
