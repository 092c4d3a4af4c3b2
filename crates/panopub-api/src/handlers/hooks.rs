//! Processor callback receivers.
//!
//! Both endpoints verify an HMAC signature over the raw body before parsing.
//! The completion receiver is idempotent: the first terminal report wins, and
//! replays (including a late callback after a local cancel or timeout sweep)
//! are acknowledged without re-mutating state.

use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;
use axum::{extract::State, http::HeaderMap, response::IntoResponse, Json};
use bytes::Bytes;
use panopub_core::models::{CompletionReport, ProgressReport, ReportOutcome, TerminalStatus};
use panopub_core::signature::SIGNATURE_HEADER;
use panopub_core::AppError;
use panopub_db::{ProcessingJobRow, UploadSessionRow};
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

/// Acknowledgement returned for accepted reports, including replays.
#[derive(Debug, Serialize, ToSchema)]
pub struct WebhookAck {
    pub acknowledged: bool,
    pub job_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub terminal_status: Option<TerminalStatus>,
}

fn signature_of(headers: &HeaderMap) -> Option<&str> {
    headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok())
}

/// Resolve the session and job a report refers to. Processor reports address
/// work by tour name; the most recent session for that name owns the job.
async fn resolve_report_target(
    state: &AppState,
    target_name: &str,
) -> Result<(UploadSessionRow, ProcessingJobRow), HttpAppError> {
    let session = state
        .db
        .sessions
        .find_latest_by_target_name(target_name)
        .await?
        .ok_or_else(|| {
            AppError::BadRequest(format!("No upload session for target '{}'", target_name))
        })?;

    let job = state
        .db
        .jobs
        .get_by_session(session.id)
        .await?
        .ok_or_else(|| {
            AppError::BadRequest(format!(
                "No processing job for target '{}' (session {})",
                target_name, session.id
            ))
        })?;

    Ok((session, job))
}

/// Terminal completion/failure report from the processor.
#[utoipa::path(
    post,
    path = "/hooks/processor",
    tag = "hooks",
    request_body = CompletionReport,
    responses(
        (status = 200, description = "Report accepted (including idempotent replays)", body = WebhookAck),
        (status = 400, description = "Malformed payload or unknown reference", body = ErrorResponse),
        (status = 401, description = "Signature verification failed", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, headers, body), fields(operation = "receive_completion"))]
pub async fn receive_completion(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, HttpAppError> {
    state
        .webhook
        .verify(&body, signature_of(&headers))
        .map_err(|e| {
            tracing::warn!("Rejected processor report with bad signature");
            HttpAppError::from(e)
        })?;

    let report: CompletionReport = serde_json::from_slice(&body)
        .map_err(|e| AppError::InvalidInput(format!("Malformed completion report: {}", e)))?;

    let (session, job) = resolve_report_target(&state, &report.target_name).await?;

    // First terminal report wins; a replay (same outcome) or a divergent late
    // report (different outcome) both leave the stored state untouched.
    if let Some(stored) = job.terminal_status().map_err(HttpAppError::from)? {
        let reported = match report.outcome {
            ReportOutcome::Success => TerminalStatus::Completed,
            ReportOutcome::Failure => TerminalStatus::Failed,
        };
        if reported != stored {
            tracing::warn!(
                job_id = %job.id,
                stored = %stored,
                reported = %reported,
                "Divergent terminal report ignored; first terminal report is authoritative"
            );
        }
        return Ok(Json(WebhookAck {
            acknowledged: true,
            job_id: job.id,
            terminal_status: Some(stored),
        }));
    }

    match report.outcome {
        ReportOutcome::Success => {
            let storage_prefix = report.storage_prefix.clone().ok_or_else(|| {
                AppError::InvalidInput("storage_prefix is required for success reports".to_string())
            })?;

            let transitioned = state.db.jobs.complete(job.id, "Processing completed").await?;
            if transitioned == 0 {
                // Lost a race with another callback between the read above
                // and this CAS; whoever won already mutated state.
                let job = state
                    .db
                    .jobs
                    .get(job.id)
                    .await?
                    .ok_or_else(|| AppError::Internal("Job vanished mid-request".to_string()))?;
                return Ok(Json(WebhookAck {
                    acknowledged: true,
                    job_id: job.id,
                    terminal_status: job.terminal_status().map_err(HttpAppError::from)?,
                }));
            }

            // Durable identity: the report's id when given, then the
            // session's (updates), then the tour already owning this name,
            // then a freshly minted one.
            let content_id = match report.content_id.clone().or_else(|| session.content_id.clone()) {
                Some(id) => id,
                None => match state.db.tours.resolve_slug(&session.target_name).await? {
                    Some((tour, false)) => tour.content_id,
                    _ => Uuid::new_v4().simple().to_string(),
                },
            };

            state
                .db
                .tours
                .upsert_published(&content_id, &session.target_name, &storage_prefix)
                .await?;
            state.db.sessions.mark_completed(session.id).await?;

            tracing::info!(
                job_id = %job.id,
                content_id = %content_id,
                storage_prefix = %storage_prefix,
                duration_ms = report.duration_ms,
                "Processing completed, tour published"
            );

            Ok(Json(WebhookAck {
                acknowledged: true,
                job_id: job.id,
                terminal_status: Some(TerminalStatus::Completed),
            }))
        }
        ReportOutcome::Failure => {
            let detail = report
                .error_message
                .clone()
                .unwrap_or_else(|| "Processing failed".to_string());

            let transitioned = state.db.jobs.fail(job.id, &detail).await?;
            if transitioned > 0 {
                // A failed update leaves the previously published tour
                // untouched and servable.
                state.db.sessions.mark_failed(session.id, Some(&detail)).await?;
                tracing::warn!(
                    job_id = %job.id,
                    stage = ?report.stage,
                    error = %detail,
                    "Processing failed"
                );
            }

            Ok(Json(WebhookAck {
                acknowledged: true,
                job_id: job.id,
                terminal_status: Some(TerminalStatus::Failed),
            }))
        }
    }
}

/// Mid-run progress report from the processor.
#[utoipa::path(
    post,
    path = "/hooks/processor/progress",
    tag = "hooks",
    request_body = ProgressReport,
    responses(
        (status = 200, description = "Progress recorded", body = WebhookAck),
        (status = 400, description = "Malformed payload or unknown reference", body = ErrorResponse),
        (status = 401, description = "Signature verification failed", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, headers, body), fields(operation = "receive_progress"))]
pub async fn receive_progress(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, HttpAppError> {
    state.webhook.verify(&body, signature_of(&headers))?;

    let report: ProgressReport = serde_json::from_slice(&body)
        .map_err(|e| AppError::InvalidInput(format!("Malformed progress report: {}", e)))?;

    if !(0..=100).contains(&report.percent) {
        return Err(HttpAppError::from(AppError::InvalidInput(format!(
            "percent must be 0-100 (got {})",
            report.percent
        ))));
    }

    let (_session, job) = resolve_report_target(&state, &report.target_name).await?;

    // No-op once the job is terminal; late progress from an uncancelled
    // processor is dropped silently.
    state
        .db
        .jobs
        .record_progress(job.id, report.stage, report.percent, &report.message)
        .await?;

    Ok(Json(WebhookAck {
        acknowledged: true,
        job_id: job.id,
        terminal_status: job.terminal_status().map_err(HttpAppError::from)?,
    }))
}
