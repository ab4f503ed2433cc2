use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;

use exam_core::model::{Draft, Session, StudentProfile, SubmissionRecord, TestId};
use storage::repository::KeyValueStore;

use crate::Clock;
use crate::error::PersistenceError;
use crate::notifications::{Notice, Notifier};

const PROFILE_KEY: &str = "ielts_user";
const DRAFT_KEY_PREFIX: &str = "ielts_test_";
const PENDING_KEY: &str = "pendingSubmissions";
const COMPLETED_KEY: &str = "completedTests";
const LAST_SYNC_KEY: &str = "lastSync";

#[must_use]
pub fn draft_key(test_id: &TestId) -> String {
    format!("{DRAFT_KEY_PREFIX}{test_id}")
}

/// The only component that reads or writes the local store.
///
/// Draft and profile reads never fail: missing or corrupt blobs come back
/// empty and the problem is logged. Draft writes report failures through the
/// notifier instead of returning them.
#[derive(Clone)]
pub struct LocalPersistence {
    store: Arc<dyn KeyValueStore>,
    notifier: Arc<dyn Notifier>,
    clock: Clock,
}

impl LocalPersistence {
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>, notifier: Arc<dyn Notifier>, clock: Clock) -> Self {
        Self {
            store,
            notifier,
            clock,
        }
    }

    //
    // ─── DRAFTS ────────────────────────────────────────────────────────────────
    //

    /// Overwrite the stored draft for `test_id` with the session's answers and flags.
    pub async fn save_draft(&self, test_id: &TestId, session: &Session) {
        let draft = session.to_draft(self.clock.now());
        if let Err(err) = self.write_json(&draft_key(test_id), &draft).await {
            tracing::warn!(test_id = %test_id, error = %err, "failed to save draft");
            self.notifier.notify(Notice::PersistenceFailed {
                detail: err.to_string(),
            });
        }
    }

    pub async fn load_draft(&self, test_id: &TestId) -> Draft {
        self.read_json_or_default(&draft_key(test_id)).await
    }

    pub async fn clear_draft(&self, test_id: &TestId) {
        if let Err(err) = self.store.remove(&draft_key(test_id)).await {
            tracing::warn!(test_id = %test_id, error = %err, "failed to clear draft");
        }
    }

    /// Ids of tests with a stored draft, sorted by key.
    ///
    /// # Errors
    ///
    /// Returns `PersistenceError` if the store cannot be listed.
    pub async fn saved_drafts(&self) -> Result<Vec<TestId>, PersistenceError> {
        let keys = self.store.keys_with_prefix(DRAFT_KEY_PREFIX).await?;
        Ok(keys
            .iter()
            .filter_map(|key| key.strip_prefix(DRAFT_KEY_PREFIX))
            .filter_map(|id| TestId::new(id).ok())
            .collect())
    }

    //
    // ─── PENDING QUEUE ─────────────────────────────────────────────────────────
    //

    /// Append `record` to the back of the pending queue. Returns the new length.
    ///
    /// # Errors
    ///
    /// Returns `PersistenceError` if the queue cannot be read or written.
    pub async fn enqueue_pending(&self, record: &SubmissionRecord) -> Result<usize, PersistenceError> {
        let mut pending = self.read_pending().await?;
        pending.push(record.clone());
        self.write_json(PENDING_KEY, &pending).await?;
        Ok(pending.len())
    }

    /// Pending records, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `PersistenceError` if the store cannot be read. A corrupt queue
    /// is logged and listed as empty.
    pub async fn list_pending(&self) -> Result<Vec<SubmissionRecord>, PersistenceError> {
        self.read_pending().await
    }

    /// Remove the first queued record equal to `record`. Returns whether one was found.
    ///
    /// Matching by value keeps removal correct even if the queue was trimmed
    /// since `record` was listed.
    ///
    /// # Errors
    ///
    /// Returns `PersistenceError` if the queue cannot be read or written.
    pub async fn remove_pending(&self, record: &SubmissionRecord) -> Result<bool, PersistenceError> {
        let mut pending = self.read_pending().await?;
        let Some(index) = pending.iter().position(|queued| queued == record) else {
            return Ok(false);
        };
        pending.remove(index);
        if pending.is_empty() {
            self.store.remove(PENDING_KEY).await?;
        } else {
            self.write_json(PENDING_KEY, &pending).await?;
        }
        Ok(true)
    }

    //
    // ─── PROFILE / PROGRESS ────────────────────────────────────────────────────
    //

    pub async fn load_profile(&self) -> StudentProfile {
        self.read_json_or_default(PROFILE_KEY).await
    }

    /// # Errors
    ///
    /// Returns `PersistenceError` if the profile cannot be written.
    pub async fn save_profile(&self, profile: &StudentProfile) -> Result<(), PersistenceError> {
        self.write_json(PROFILE_KEY, profile).await
    }

    /// # Errors
    ///
    /// Returns `PersistenceError` if the completed set cannot be written.
    pub async fn mark_completed(&self, test_id: &TestId) -> Result<(), PersistenceError> {
        let mut completed = self.completed_tests().await;
        if completed.insert(test_id.clone()) {
            self.write_json(COMPLETED_KEY, &completed).await?;
        }
        Ok(())
    }

    pub async fn completed_tests(&self) -> BTreeSet<TestId> {
        self.read_json_or_default(COMPLETED_KEY).await
    }

    /// # Errors
    ///
    /// Returns `PersistenceError` if the timestamp cannot be written.
    pub async fn record_sync(&self, at: DateTime<Utc>) -> Result<(), PersistenceError> {
        self.write_json(LAST_SYNC_KEY, &at).await
    }

    pub async fn last_sync(&self) -> Option<DateTime<Utc>> {
        self.read_json_or_default(LAST_SYNC_KEY).await
    }

    //
    // ─── HELPERS ───────────────────────────────────────────────────────────────
    //

    async fn read_pending(&self) -> Result<Vec<SubmissionRecord>, PersistenceError> {
        let Some(raw) = self.store.get(PENDING_KEY).await? else {
            return Ok(Vec::new());
        };
        match serde_json::from_str(&raw) {
            Ok(pending) => Ok(pending),
            Err(err) => {
                tracing::warn!(key = PENDING_KEY, error = %err, "pending queue is corrupt; treating as empty");
                Ok(Vec::new())
            }
        }
    }

    async fn read_json_or_default<T>(&self, key: &str) -> T
    where
        T: DeserializeOwned + Default,
    {
        let raw = match self.store.get(key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return T::default(),
            Err(err) => {
                tracing::warn!(key, error = %err, "local store read failed");
                return T::default();
            }
        };
        serde_json::from_str(&raw).unwrap_or_else(|err| {
            tracing::warn!(key, error = %err, "corrupt local record; treating as empty");
            T::default()
        })
    }

    async fn write_json<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
    ) -> Result<(), PersistenceError> {
        let encoded = serde_json::to_string(value).map_err(|source| PersistenceError::Encode {
            key: key.to_owned(),
            source,
        })?;
        self.store.set(key, &encoded).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exam_core::model::{QuestionNumber, StudentIdentity, TestKind, TestPaper};
    use exam_core::time::{fixed_clock, fixed_now};
    use storage::repository::InMemoryStore;

    use crate::notifications::RecordingNotifier;

    fn paper() -> TestPaper {
        TestPaper::new(TestId::from(1), "Academic Test 1", TestKind::Academic, 3600, 13).unwrap()
    }

    fn persistence(store: Arc<dyn KeyValueStore>) -> (LocalPersistence, Arc<RecordingNotifier>) {
        let notifier = Arc::new(RecordingNotifier::new());
        let persistence = LocalPersistence::new(store, notifier.clone(), fixed_clock());
        (persistence, notifier)
    }

    fn record(name: &str) -> SubmissionRecord {
        let session = Session::new(paper());
        SubmissionRecord::capture(&session, &StudentIdentity::new(name, "10B"), fixed_now())
            .unwrap()
    }

    #[tokio::test]
    async fn every_valid_answer_survives_a_draft_round_trip() {
        let (persistence, _) = persistence(Arc::new(InMemoryStore::new()));
        let paper = paper();
        for number in paper.question_numbers() {
            let mut session = Session::new(paper.clone());
            session.select_answer(number, "D").unwrap();
            persistence.save_draft(paper.id(), &session).await;

            let draft = persistence.load_draft(paper.id()).await;
            assert_eq!(draft.answers.get(&number).map(String::as_str), Some("D"));
            assert_eq!(draft.timestamp, Some(fixed_now()));
        }
    }

    #[tokio::test]
    async fn saved_drafts_lists_only_draft_keys() {
        let store = Arc::new(InMemoryStore::new());
        let (persistence, _) = persistence(store.clone());
        let session = Session::new(paper());
        persistence.save_draft(&TestId::from(3), &session).await;
        persistence.save_draft(&TestId::from(1), &session).await;
        persistence.mark_completed(&TestId::from(1)).await.unwrap();

        assert_eq!(
            persistence.saved_drafts().await.unwrap(),
            vec![TestId::from(1), TestId::from(3)]
        );

        persistence.clear_draft(&TestId::from(1)).await;
        assert_eq!(persistence.saved_drafts().await.unwrap(), vec![TestId::from(3)]);
    }

    #[tokio::test]
    async fn corrupt_draft_loads_empty() {
        let store = Arc::new(InMemoryStore::new());
        store.set(&draft_key(&TestId::from(1)), "{not json").await.unwrap();
        let (persistence, notifier) = persistence(store);

        let draft = persistence.load_draft(&TestId::from(1)).await;
        assert!(draft.is_empty());
        assert!(notifier.notices().is_empty());
    }

    #[tokio::test]
    async fn corrupt_pending_queue_lists_empty() {
        let store = Arc::new(InMemoryStore::new());
        store.set(PENDING_KEY, "{not json").await.unwrap();
        let (persistence, _) = persistence(store);

        assert_eq!(persistence.list_pending().await.unwrap(), Vec::new());

        persistence.enqueue_pending(&record("Jane")).await.unwrap();
        assert_eq!(persistence.list_pending().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn quota_failure_is_reported_not_returned() {
        let (persistence, notifier) = persistence(Arc::new(InMemoryStore::with_quota(8)));
        let mut session = Session::new(paper());
        session.select_answer(QuestionNumber::new(1), "A").unwrap();

        persistence.save_draft(&TestId::from(1), &session).await;

        assert!(notifier.contains(|n| matches!(n, Notice::PersistenceFailed { .. })));
        assert!(persistence.load_draft(&TestId::from(1)).await.is_empty());
    }

    #[tokio::test]
    async fn pending_queue_is_fifo_and_removes_by_value() {
        let (persistence, _) = persistence(Arc::new(InMemoryStore::new()));
        let (a, b, c) = (record("A"), record("B"), record("C"));
        for r in [&a, &b, &c] {
            persistence.enqueue_pending(r).await.unwrap();
        }
        assert_eq!(persistence.list_pending().await.unwrap(), vec![a.clone(), b.clone(), c.clone()]);

        assert!(persistence.remove_pending(&b).await.unwrap());
        assert!(!persistence.remove_pending(&b).await.unwrap());
        assert_eq!(persistence.list_pending().await.unwrap(), vec![a.clone(), c.clone()]);

        persistence.remove_pending(&a).await.unwrap();
        persistence.remove_pending(&c).await.unwrap();
        assert!(persistence.list_pending().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn remove_pending_takes_only_the_first_duplicate() {
        let (persistence, _) = persistence(Arc::new(InMemoryStore::new()));
        let a = record("A");
        persistence.enqueue_pending(&a).await.unwrap();
        persistence.enqueue_pending(&a).await.unwrap();

        persistence.remove_pending(&a).await.unwrap();
        assert_eq!(persistence.list_pending().await.unwrap(), vec![a]);
    }

    #[tokio::test]
    async fn completed_markers_and_profile_persist() {
        let (persistence, _) = persistence(Arc::new(InMemoryStore::new()));
        persistence.mark_completed(&TestId::from(2)).await.unwrap();
        persistence.mark_completed(&TestId::from(2)).await.unwrap();
        assert_eq!(persistence.completed_tests().await.len(), 1);

        let mut profile = StudentProfile::default();
        profile.set_identity("Jane Doe", "10B");
        persistence.save_profile(&profile).await.unwrap();
        assert_eq!(persistence.load_profile().await, profile);

        assert_eq!(persistence.last_sync().await, None);
        persistence.record_sync(fixed_now()).await.unwrap();
        assert_eq!(persistence.last_sync().await, Some(fixed_now()));
    }
}
