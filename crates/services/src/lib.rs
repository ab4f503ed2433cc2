#![forbid(unsafe_code)]

pub mod app_services;
pub mod error;
pub mod notifications;
pub mod persistence;
pub mod sessions;
pub mod submission;

pub use exam_core::Clock;

pub use app_services::AppServices;
pub use error::{
    AppServicesError, ControllerError, DeliveryError, PersistenceError, SubmissionError,
};
pub use notifications::{Notice, NoticeLevel, Notifier, RecordingNotifier, TracingNotifier};
pub use persistence::LocalPersistence;
pub use sessions::{
    CommandOutcome, IntervalTicks, SessionCommand, SessionController, SessionProgress, TickSource,
};
pub use submission::{
    HttpTransport, RelayEndpoint, ResyncReport, SubmissionAck, SubmissionPipeline,
    SubmissionTransport,
};
