#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use exam_core::model::{StudentIdentity, SubmissionRecord, TestId, TestKind, TestPaper};
use exam_core::time::fixed_clock;
use services::{
    AppServices, DeliveryError, RecordingNotifier, SessionController, SubmissionAck,
    SubmissionTransport,
};
use storage::repository::InMemoryStore;

/// Transport stub that records every delivery attempt.
#[derive(Default)]
pub struct StubTransport {
    calls: Mutex<Vec<SubmissionRecord>>,
    failing_students: Mutex<Vec<String>>,
    fail_all: Mutex<bool>,
}

impl StubTransport {
    pub fn succeeding() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        let stub = Self::default();
        *stub.fail_all.lock().unwrap() = true;
        Arc::new(stub)
    }

    pub fn failing_for(student: &str) -> Arc<Self> {
        let stub = Self::default();
        stub.failing_students.lock().unwrap().push(student.to_owned());
        Arc::new(stub)
    }

    pub fn set_fail_all(&self, fail: bool) {
        *self.fail_all.lock().unwrap() = fail;
    }

    pub fn calls(&self) -> Vec<SubmissionRecord> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl SubmissionTransport for StubTransport {
    async fn deliver(&self, record: &SubmissionRecord) -> Result<SubmissionAck, DeliveryError> {
        self.calls.lock().unwrap().push(record.clone());
        let fails = *self.fail_all.lock().unwrap()
            || self
                .failing_students
                .lock()
                .unwrap()
                .contains(&record.student_name);
        if fails {
            return Err(DeliveryError::HttpStatus(
                reqwest::StatusCode::SERVICE_UNAVAILABLE,
            ));
        }
        Ok(SubmissionAck {
            success: true,
            message: Some("Answers submitted successfully".into()),
            telegram_sent: true,
            submission_id: Some(format!("sub_{}", record.student_name)),
            timestamp: Some(record.timestamp),
        })
    }
}

pub struct Harness {
    pub services: AppServices,
    pub transport: Arc<StubTransport>,
    pub notifier: Arc<RecordingNotifier>,
    pub store: Arc<InMemoryStore>,
}

impl Harness {
    pub fn new(transport: Arc<StubTransport>) -> Self {
        Self::with_store(transport, InMemoryStore::new())
    }

    pub fn with_store(transport: Arc<StubTransport>, store: InMemoryStore) -> Self {
        let store = Arc::new(store);
        let notifier = Arc::new(RecordingNotifier::new());
        let services = AppServices::from_parts(
            store.clone(),
            transport.clone(),
            fixed_clock(),
            notifier.clone(),
        );
        Self {
            services,
            transport,
            notifier,
            store,
        }
    }

    pub fn controller(&self) -> SessionController {
        self.services
            .controller()
            .with_auto_submit_grace(std::time::Duration::ZERO)
    }
}

pub fn paper() -> TestPaper {
    TestPaper::new(TestId::from(1), "Academic Reading Test 1", TestKind::Academic, 3600, 13)
        .unwrap()
}

pub fn short_paper(secs: u32) -> TestPaper {
    TestPaper::new(TestId::from(7), "Timed Drill", TestKind::Practice, secs, 5).unwrap()
}

pub fn jane() -> StudentIdentity {
    StudentIdentity::new("Jane Doe", "10B")
}
