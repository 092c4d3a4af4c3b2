use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use panopub_core::models::processing_job::ProgressResponse;
use panopub_core::AppError;
use std::sync::Arc;
use uuid::Uuid;

/// Poll the progress read model by session id or job id.
///
/// Pure read; the browser owns the polling cadence and the give-up decision.
/// A poll after the client previously gave up still observes any later
/// completion.
#[utoipa::path(
    get,
    path = "/api/v0/uploads/{id}/progress",
    tag = "uploads",
    params(("id" = Uuid, Path, description = "Session id or job id")),
    responses(
        (status = 200, description = "Current progress", body = ProgressResponse),
        (status = 404, description = "Unknown session or job", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(id = %id, operation = "get_progress"))]
pub async fn get_progress(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    // The id may name a session or its job; try the session first.
    let session = match state.db.sessions.get_session(id).await? {
        Some(session) => session,
        None => {
            let job = state
                .db
                .jobs
                .get(id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("No session or job with id {}", id)))?;
            state
                .db
                .sessions
                .get_session(job.session_id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("No session or job with id {}", id)))?
        }
    };

    let job = state.db.jobs.get_by_session(session.id).await?;

    let response = match job {
        Some(job) => ProgressResponse {
            status: session.status().map_err(HttpAppError::from)?,
            stage: Some(job.stage().map_err(HttpAppError::from)?),
            percent: job.percent,
            message: job.message.clone(),
            job_id: Some(job.id),
            error_detail: job.error_detail,
        },
        None => ProgressResponse {
            status: session.status().map_err(HttpAppError::from)?,
            stage: None,
            percent: 0,
            message: "Waiting for upload".to_string(),
            job_id: None,
            error_detail: session.error_message,
        },
    };

    Ok(Json(response))
}
