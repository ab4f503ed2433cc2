use std::sync::Arc;

use storage::repository::{KeyValueStore, Storage};

use crate::Clock;
use crate::error::AppServicesError;
use crate::notifications::Notifier;
use crate::persistence::LocalPersistence;
use crate::sessions::SessionController;
use crate::submission::{HttpTransport, RelayEndpoint, SubmissionPipeline, SubmissionTransport};

/// Wires the store, relay transport and notifier into app-facing services.
#[derive(Clone)]
pub struct AppServices {
    clock: Clock,
    notifier: Arc<dyn Notifier>,
    persistence: LocalPersistence,
    pipeline: SubmissionPipeline,
}

impl AppServices {
    /// Build services backed by `SQLite` storage and the HTTP relay transport.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails or the relay
    /// URL is invalid.
    pub async fn new_sqlite(
        db_url: &str,
        relay_url: &str,
        clock: Clock,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        let endpoint = RelayEndpoint::new(relay_url)?;
        tracing::debug!(submit_url = %endpoint.submit_url(), "relay endpoint configured");
        let transport: Arc<dyn SubmissionTransport> = Arc::new(HttpTransport::new(endpoint));
        Ok(Self::from_parts(storage.kv, transport, clock, notifier))
    }

    /// Assemble services from already-built seams.
    #[must_use]
    pub fn from_parts(
        store: Arc<dyn KeyValueStore>,
        transport: Arc<dyn SubmissionTransport>,
        clock: Clock,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let persistence = LocalPersistence::new(store, Arc::clone(&notifier), clock);
        let pipeline = SubmissionPipeline::new(
            clock,
            transport,
            persistence.clone(),
            Arc::clone(&notifier),
        );
        Self {
            clock,
            notifier,
            persistence,
            pipeline,
        }
    }

    #[must_use]
    pub fn persistence(&self) -> &LocalPersistence {
        &self.persistence
    }

    #[must_use]
    pub fn pipeline(&self) -> &SubmissionPipeline {
        &self.pipeline
    }

    /// A fresh controller sharing this wiring.
    #[must_use]
    pub fn controller(&self) -> SessionController {
        SessionController::new(
            self.clock,
            self.persistence.clone(),
            self.pipeline.clone(),
            Arc::clone(&self.notifier),
        )
    }
}
