use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;
use axum::{extract::State, response::IntoResponse, Json};
use chrono::Utc;
use panopub_core::models::upload_session::{CompleteUploadRequest, CompleteUploadResponse};
use panopub_core::models::UploadSessionStatus;
use panopub_core::AppError;
use std::sync::Arc;

/// Client notice that the direct upload finished; triggers processing.
///
/// Idempotent: a retried notice (or a race between two notices) observes the
/// existing job and returns the same `job_id`. The object's existence at the
/// session's key is verified with a `head` call; a client claiming completion
/// without having uploaded is rejected.
#[utoipa::path(
    post,
    path = "/api/v0/uploads/complete",
    tag = "uploads",
    request_body = CompleteUploadRequest,
    responses(
        (status = 200, description = "Processing triggered", body = CompleteUploadResponse),
        (status = 400, description = "Session expired or object missing", body = ErrorResponse),
        (status = 404, description = "Session not found", body = ErrorResponse),
        (status = 409, description = "Session already failed", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(
    skip(state, request),
    fields(session_id = %request.session_id, operation = "complete_upload")
)]
pub async fn complete_upload(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CompleteUploadRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let session = state
        .db
        .sessions
        .get_session(request.session_id)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!("Upload session not found: {}", request.session_id))
        })?;

    let status = session.status().map_err(HttpAppError::from)?;

    match status {
        UploadSessionStatus::Created | UploadSessionStatus::Uploading => {
            if session.expires_at < Utc::now() {
                state.db.sessions.mark_expired(session.id).await?;
                return Err(HttpAppError::from(AppError::BadRequest(
                    "Upload session has expired".to_string(),
                )));
            }

            // Required defense against a client lying about completion.
            let exists = state
                .storage
                .head(&session.object_key)
                .await
                .map_err(HttpAppError::from)?
                .is_some();
            if !exists {
                return Err(HttpAppError::from(AppError::BadRequest(format!(
                    "No object found at {}; upload did not complete",
                    session.object_key
                ))));
            }

            state.db.sessions.mark_uploaded(session.id).await?;
        }
        // Repeat notice after a network blip: fall through to the job lookup.
        UploadSessionStatus::Uploaded
        | UploadSessionStatus::Processing
        | UploadSessionStatus::Completed => {}
        UploadSessionStatus::Failed => {
            return Err(HttpAppError::from(AppError::Conflict(
                "Upload session already failed".to_string(),
            )));
        }
        UploadSessionStatus::Expired => {
            return Err(HttpAppError::from(AppError::BadRequest(
                "Upload session has expired".to_string(),
            )));
        }
    }

    // At-most-one trigger: racing calls both land on the one job row.
    let job = state.db.jobs.start_for_session(session.id).await?;

    let session = state
        .db
        .sessions
        .get_session(session.id)
        .await?
        .ok_or_else(|| AppError::Internal("Session vanished mid-request".to_string()))?;

    tracing::info!(
        session_id = %session.id,
        job_id = %job.id,
        target_name = %session.target_name,
        "Upload complete, processing triggered"
    );

    Ok(Json(CompleteUploadResponse {
        job_id: job.id,
        status: session.status().map_err(HttpAppError::from)?,
    }))
}
