mod draft;
mod ids;
mod profile;
mod session;
mod submission;
mod test_paper;

pub use ids::{ParseIdError, QuestionNumber, TestId};

pub use draft::Draft;
pub use profile::{IdentityField, ProfileError, StudentIdentity, StudentProfile, ValidationError};
pub use session::{RestoreReport, Session, SessionError, SessionState, TickOutcome};
pub use submission::SubmissionRecord;
pub use test_paper::{TestKind, TestPaper, TestPaperError};
