use crate::constants::{ACCEPTED_ARCHIVE_CONTENT_TYPES, ACCEPTED_ARCHIVE_EXTENSION};
use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;
use axum::{extract::State, response::IntoResponse, Json};
use chrono::{Duration, Utc};
use panopub_core::models::upload_session::{UploadGrantRequest, UploadGrantResponse};
use panopub_core::sanitize::derive_safe_name;
use panopub_core::AppError;
use panopub_storage::keys::{inbox_key, PUBLISH_PREFIX};
use std::sync::Arc;
use std::time::Duration as StdDuration;
use uuid::Uuid;
use validator::Validate;

/// Issue a scoped, time-limited direct-to-storage upload grant.
///
/// Validates size, archive type, and (for updates) the referenced content id
/// before granting; a rejected request grants nothing. The descriptor carries
/// a single-object PUT capability only.
#[utoipa::path(
    post,
    path = "/api/v0/uploads/grants",
    tag = "uploads",
    request_body = UploadGrantRequest,
    responses(
        (status = 200, description = "Upload grant issued", body = UploadGrantResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 404, description = "Unknown content id", body = ErrorResponse),
        (status = 413, description = "Archive too large", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(
    skip(state, request),
    fields(
        file_name = %request.file_name,
        file_size = request.file_size,
        is_update = request.is_update,
        operation = "issue_upload_grant"
    )
)]
pub async fn issue_grant(
    State(state): State<Arc<AppState>>,
    Json(request): Json<UploadGrantRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    request.validate().map_err(AppError::from)?;

    let max_bytes = state.config.max_archive_size_bytes as i64;
    if request.file_size > max_bytes {
        return Err(HttpAppError::from(AppError::PayloadTooLarge(format!(
            "{} bytes exceeds the maximum of {} bytes",
            request.file_size, max_bytes
        ))));
    }

    let extension = request
        .file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .unwrap_or_default();
    if extension != ACCEPTED_ARCHIVE_EXTENSION {
        return Err(HttpAppError::from(AppError::InvalidInput(format!(
            "Only .{} archives are accepted (got: {})",
            ACCEPTED_ARCHIVE_EXTENSION, request.file_name
        ))));
    }

    let file_type = request.file_type.to_lowercase();
    if !ACCEPTED_ARCHIVE_CONTENT_TYPES.contains(&file_type.as_str()) {
        return Err(HttpAppError::from(AppError::InvalidInput(format!(
            "Invalid file type '{}', allowed: {:?}",
            request.file_type, ACCEPTED_ARCHIVE_CONTENT_TYPES
        ))));
    }

    // The sanitized name keys both the inbox object and the publish prefix.
    // For updates it is derived from the existing tour's storage prefix so
    // the processor republishes into the same place.
    let (safe_name, content_id) = if request.is_update {
        let content_id = request.existing_content_id.clone().ok_or_else(|| {
            AppError::InvalidInput("existing_content_id is required for updates".to_string())
        })?;
        let tour = state
            .db
            .tours
            .get(&content_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Tour not found: {}", content_id)))?;

        let name = tour
            .storage_prefix
            .strip_prefix(PUBLISH_PREFIX)
            .map(|rest| rest.trim_end_matches('/').to_string())
            .filter(|name| !name.is_empty())
            .ok_or_else(|| {
                AppError::Internal(format!(
                    "Tour {} has an unexpected storage prefix: {}",
                    content_id, tour.storage_prefix
                ))
            })?;
        (name, Some(content_id))
    } else {
        let raw = request.target_name.as_deref().ok_or_else(|| {
            AppError::InvalidInput("target_name is required for new content".to_string())
        })?;
        let name = derive_safe_name(raw).ok_or_else(|| {
            AppError::InvalidInput(format!("Cannot derive a usable content name from '{}'", raw))
        })?;
        (name, None)
    };

    let session_id = Uuid::new_v4();
    let object_key = inbox_key(&safe_name);
    let ttl_minutes = state.config.grant_ttl_minutes;
    let expires_at = Utc::now() + Duration::minutes(ttl_minutes);

    let upload_url = state
        .storage
        .presigned_put_url(
            &object_key,
            &file_type,
            StdDuration::from_secs(ttl_minutes as u64 * 60),
        )
        .await
        .map_err(HttpAppError::from)?;

    state
        .db
        .sessions
        .create_session(
            session_id,
            &safe_name,
            &object_key,
            request.is_update,
            content_id.as_deref(),
            &request.file_name,
            request.file_size,
            expires_at,
        )
        .await?;

    tracing::info!(
        session_id = %session_id,
        target_name = %safe_name,
        object_key = %object_key,
        "Issued upload grant"
    );

    Ok(Json(UploadGrantResponse {
        session_id,
        upload_url,
        required_headers: serde_json::json!({ "Content-Type": file_type }),
        object_key,
        expires_at,
    }))
}
