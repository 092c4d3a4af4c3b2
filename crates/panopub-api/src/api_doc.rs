//! OpenAPI documentation.

use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Panopub API",
        description = "Control plane for the tour archive ingestion and publish pipeline"
    ),
    paths(
        crate::handlers::upload_grant::issue_grant,
        crate::handlers::upload_complete::complete_upload,
        crate::handlers::progress::get_progress,
        crate::handlers::hooks::receive_completion,
        crate::handlers::hooks::receive_progress,
        crate::handlers::tours::list_tours,
        crate::handlers::tours::get_tour,
        crate::handlers::tours::archive_tour,
        crate::handlers::tours::change_slug,
    ),
    components(schemas(
        panopub_core::models::upload_session::UploadGrantRequest,
        panopub_core::models::upload_session::UploadGrantResponse,
        panopub_core::models::upload_session::CompleteUploadRequest,
        panopub_core::models::upload_session::CompleteUploadResponse,
        panopub_core::models::upload_session::UploadSessionStatus,
        panopub_core::models::processing_job::ProgressResponse,
        panopub_core::models::processing_job::ProcessingStage,
        panopub_core::models::processing_job::TerminalStatus,
        panopub_core::models::published_tour::PublishedTourResponse,
        panopub_core::models::published_tour::TourStatus,
        panopub_core::models::published_tour::ChangeSlugRequest,
        panopub_core::models::report::CompletionReport,
        panopub_core::models::report::ProgressReport,
        panopub_core::models::report::ReportOutcome,
        crate::handlers::hooks::WebhookAck,
        crate::handlers::tours::ArchiveResponse,
        crate::error::ErrorResponse,
    )),
    tags(
        (name = "uploads", description = "Upload grants, completion, and progress"),
        (name = "hooks", description = "Processor callbacks"),
        (name = "tours", description = "Published tour lifecycle")
    )
)]
pub struct ApiDoc;
