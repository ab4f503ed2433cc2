use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::model::ids::{QuestionNumber, TestId};
use crate::model::profile::{StudentIdentity, ValidationError};
use crate::model::session::Session;

/// Immutable snapshot of a finished attempt, ready to send to the relay.
///
/// The serialized form is the relay's request body, so queued records can be
/// replayed without conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionRecord {
    pub student_name: String,
    pub student_class: String,
    pub test_id: TestId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_title: Option<String>,
    pub answers: BTreeMap<QuestionNumber, String>,
    #[serde(default, rename = "flaggedQuestions")]
    pub flagged: BTreeSet<QuestionNumber>,
    pub total_questions: u32,
    #[serde(rename = "answeredQuestions")]
    pub answered_count: u32,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "timeSpent")]
    pub time_spent_secs: u32,
}

impl SubmissionRecord {
    /// Capture the session's current answers for `identity`.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if the identity lacks a name or class.
    pub fn capture(
        session: &Session,
        identity: &StudentIdentity,
        submitted_at: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        let identity = identity.validate()?;
        let paper = session.paper();
        Ok(Self {
            student_name: identity.name,
            student_class: identity.class,
            test_id: paper.id().clone(),
            test_title: Some(paper.title().to_owned()),
            answers: session.answers().clone(),
            flagged: session.flagged().clone(),
            total_questions: paper.total_questions(),
            answered_count: u32::try_from(session.answered_count()).unwrap_or(u32::MAX),
            timestamp: submitted_at,
            time_spent_secs: session.time_spent_secs(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::test_paper::{TestKind, TestPaper};
    use crate::time::fixed_now;

    fn session() -> Session {
        let paper =
            TestPaper::new(TestId::from(3), "Academic Test 3", TestKind::Academic, 3600, 13)
                .unwrap();
        Session::new(paper)
    }

    #[test]
    fn capture_builds_wire_shape() {
        let mut s = session();
        s.start();
        for _ in 0..75 {
            let _ = s.tick();
        }
        s.select_answer(QuestionNumber::new(1), "A").unwrap();
        s.select_answer(QuestionNumber::new(2), "C").unwrap();
        s.toggle_flag(QuestionNumber::new(2)).unwrap();

        let record =
            SubmissionRecord::capture(&s, &StudentIdentity::new("Jane Doe", "10B"), fixed_now())
                .unwrap();
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["studentName"], "Jane Doe");
        assert_eq!(json["studentClass"], "10B");
        assert_eq!(json["testId"], "3");
        assert_eq!(json["testTitle"], "Academic Test 3");
        assert_eq!(json["answers"], serde_json::json!({"1": "A", "2": "C"}));
        assert_eq!(json["flaggedQuestions"], serde_json::json!([2]));
        assert_eq!(json["totalQuestions"], 13);
        assert_eq!(json["answeredQuestions"], 2);
        assert_eq!(json["timeSpent"], 75);
        assert_eq!(json["timestamp"], "2023-11-14T22:13:20Z");
    }

    #[test]
    fn capture_rejects_missing_identity() {
        let err = SubmissionRecord::capture(&session(), &StudentIdentity::default(), fixed_now())
            .unwrap_err();
        assert_eq!(err.missing.len(), 2);
    }
}
