mod pipeline;
mod transport;

pub use pipeline::{ResyncReport, SubmissionPipeline};
pub use transport::{HttpTransport, RelayEndpoint, SubmissionAck, SubmissionTransport};
