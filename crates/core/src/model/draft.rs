use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::model::ids::{QuestionNumber, TestId};

/// Locally persisted, unsubmitted answers and flags for one test.
///
/// Every field defaults so older or partial blobs still load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Draft {
    #[serde(default)]
    pub test_id: Option<TestId>,
    #[serde(default)]
    pub answers: BTreeMap<QuestionNumber, String>,
    #[serde(default, rename = "flaggedQuestions")]
    pub flagged: BTreeSet<QuestionNumber>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl Draft {
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.answers.is_empty() && self.flagged.is_empty()
    }
}
