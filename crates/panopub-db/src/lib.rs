//! Panopub database layer
//!
//! Repositories use dynamic SQLx queries (no DATABASE_URL at build time) and
//! manual `FromRow` impls. Every state transition is a single-row
//! compare-and-set conditioned on the current status, so concurrent triggers
//! and callbacks cannot corrupt state; callers inspect `rows_affected` to
//! learn whether their transition won.

mod processing_job;
mod published_tour;
mod upload_session;

pub use processing_job::{ProcessingJobRepository, ProcessingJobRow};
pub use published_tour::{PublishedTourRepository, PublishedTourRow};
pub use upload_session::{UploadSessionRepository, UploadSessionRow};
