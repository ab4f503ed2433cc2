use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::RelayError;
use crate::submission::RelaySubmission;

/// A relayed submission as kept in memory and listed to teachers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredSubmission {
    pub id: String,
    pub student_name: String,
    pub student_class: Option<String>,
    pub test_id: String,
    pub test_title: Option<String>,
    pub answers: BTreeMap<String, String>,
    pub flagged_questions: Vec<String>,
    pub answered_questions: u64,
    pub total_questions: Option<u64>,
    pub timestamp: Option<String>,
    pub time_spent: u64,
    pub received_at: DateTime<Utc>,
    pub telegram_sent: bool,
}

impl StoredSubmission {
    #[must_use]
    pub fn new(
        id: String,
        submission: &RelaySubmission,
        received_at: DateTime<Utc>,
        telegram_sent: bool,
    ) -> Self {
        Self {
            id,
            student_name: submission.student_name().to_owned(),
            student_class: submission.student_class().map(str::to_owned),
            test_id: submission.test_id().to_owned(),
            test_title: submission.test_title.clone(),
            answers: submission.answers.clone(),
            flagged_questions: submission.flagged_questions.clone(),
            answered_questions: submission.answered(),
            total_questions: submission.total_questions,
            timestamp: submission.timestamp.clone(),
            time_spent: submission.time_spent.unwrap_or(0),
            received_at,
            telegram_sent,
        }
    }
}

/// Aggregates over the retained log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecentStats {
    pub submissions: usize,
    pub students: usize,
    pub tests: usize,
    pub average_answered: u64,
    pub average_time_spent: u64,
    pub last_received: Option<DateTime<Utc>>,
}

/// Bounded log of the latest submissions since the relay started.
///
/// When full, the oldest entry is dropped.
#[derive(Debug)]
pub struct RecentSubmissions {
    entries: Mutex<VecDeque<StoredSubmission>>,
    capacity: usize,
}

impl RecentSubmissions {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::new()),
            capacity: capacity.max(1),
        }
    }

    /// # Errors
    ///
    /// Returns `RelayError::StatePoisoned` if the log lock is poisoned.
    pub fn record(&self, entry: StoredSubmission) -> Result<(), RelayError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| RelayError::StatePoisoned)?;
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
        Ok(())
    }

    /// Entries, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RelayError::StatePoisoned` if the log lock is poisoned.
    pub fn latest(&self, limit: usize) -> Result<Vec<StoredSubmission>, RelayError> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| RelayError::StatePoisoned)?;
        Ok(entries.iter().rev().take(limit).cloned().collect())
    }

    /// # Errors
    ///
    /// Returns `RelayError::StatePoisoned` if the log lock is poisoned.
    pub fn all(&self) -> Result<Vec<StoredSubmission>, RelayError> {
        self.latest(self.capacity)
    }

    /// # Errors
    ///
    /// Returns `RelayError::StatePoisoned` if the log lock is poisoned.
    pub fn stats(&self) -> Result<RecentStats, RelayError> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| RelayError::StatePoisoned)?;
        let count = entries.len();
        let students: BTreeSet<_> = entries.iter().map(|e| e.student_name.as_str()).collect();
        let tests: BTreeSet<_> = entries.iter().map(|e| e.test_id.as_str()).collect();
        let average = |sum: u64| if count == 0 { 0 } else { sum / count as u64 };
        Ok(RecentStats {
            submissions: count,
            students: students.len(),
            tests: tests.len(),
            average_answered: average(entries.iter().map(|e| e.answered_questions).sum()),
            average_time_spent: average(entries.iter().map(|e| e.time_spent).sum()),
            last_received: entries.back().map(|e| e.received_at),
        })
    }
}

#[cfg(test)]
mod tests {
    use exam_core::time::fixed_now;

    use super::*;

    fn entry(id: &str, name: &str, time_spent: u64) -> StoredSubmission {
        let submission: RelaySubmission = serde_json::from_str(&format!(
            r#"{{"studentName":"{name}","testId":1,"answers":{{"1":"A","2":"B"}},"timeSpent":{time_spent}}}"#
        ))
        .unwrap();
        StoredSubmission::new(id.into(), &submission, fixed_now(), true)
    }

    #[test]
    fn keeps_newest_within_capacity() {
        let log = RecentSubmissions::new(2);
        log.record(entry("a", "A", 10)).unwrap();
        log.record(entry("b", "B", 10)).unwrap();
        log.record(entry("c", "C", 10)).unwrap();

        let ids: Vec<_> = log.all().unwrap().into_iter().map(|e| e.id).collect();
        assert_eq!(ids, vec!["c", "b"]);
        assert_eq!(log.latest(1).unwrap()[0].id, "c");
    }

    #[test]
    fn stats_average_over_entries() {
        let log = RecentSubmissions::new(10);
        assert_eq!(log.stats().unwrap().submissions, 0);

        log.record(entry("a", "Jane", 100)).unwrap();
        log.record(entry("b", "Jane", 300)).unwrap();
        log.record(entry("c", "Omar", 200)).unwrap();

        let stats = log.stats().unwrap();
        assert_eq!(stats.submissions, 3);
        assert_eq!(stats.students, 2);
        assert_eq!(stats.tests, 1);
        assert_eq!(stats.average_answered, 2);
        assert_eq!(stats.average_time_spent, 200);
        assert_eq!(stats.last_received, Some(fixed_now()));
    }
}
