//! Domain models and wire types.

pub mod processing_job;
pub mod published_tour;
pub mod report;
pub mod upload_session;

pub use processing_job::{ProcessingStage, TerminalStatus};
pub use published_tour::TourStatus;
pub use report::{CompletionReport, ProgressReport, ReportOutcome};
pub use upload_session::UploadSessionStatus;
