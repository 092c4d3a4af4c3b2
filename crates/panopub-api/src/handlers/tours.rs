use crate::error::{ErrorResponse, HttpAppError};
use crate::services::lifecycle;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use panopub_core::models::published_tour::{ChangeSlugRequest, PublishedTourResponse};
use panopub_core::sanitize::derive_safe_name;
use panopub_core::AppError;
use panopub_db::PublishedTourRow;
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;
use validator::Validate;

fn to_response(row: &PublishedTourRow) -> Result<PublishedTourResponse, HttpAppError> {
    Ok(PublishedTourResponse {
        content_id: row.content_id.clone(),
        slug: row.slug.clone(),
        storage_prefix: row.storage_prefix.clone(),
        status: row.status().map_err(HttpAppError::from)?,
        created_at: row.created_at,
        updated_at: row.updated_at,
        archived_at: row.archived_at,
    })
}

/// List published tours, newest first.
#[utoipa::path(
    get,
    path = "/api/v0/tours",
    tag = "tours",
    responses(
        (status = 200, description = "All tours", body = [PublishedTourResponse])
    )
)]
#[tracing::instrument(skip(state), fields(operation = "list_tours"))]
pub async fn list_tours(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpAppError> {
    let rows = state.db.tours.list().await?;
    let tours: Vec<PublishedTourResponse> = rows
        .iter()
        .map(to_response)
        .collect::<Result<_, _>>()?;
    Ok(Json(tours))
}

/// Get one tour by its durable content id.
#[utoipa::path(
    get,
    path = "/api/v0/tours/{content_id}",
    tag = "tours",
    params(("content_id" = String, Path, description = "Durable content id")),
    responses(
        (status = 200, description = "The tour", body = PublishedTourResponse),
        (status = 404, description = "Unknown content id", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(content_id = %content_id, operation = "get_tour"))]
pub async fn get_tour(
    State(state): State<Arc<AppState>>,
    Path(content_id): Path<String>,
) -> Result<impl IntoResponse, HttpAppError> {
    let row = state
        .db
        .tours
        .get(&content_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Tour not found: {}", content_id)))?;
    Ok(Json(to_response(&row)?))
}

/// Outcome of a soft delete.
#[derive(Debug, Serialize, ToSchema)]
pub struct ArchiveResponse {
    pub content_id: String,
    pub archive_prefix: String,
    pub objects_archived: usize,
    pub retention_expires_at: chrono::DateTime<chrono::Utc>,
}

/// Soft-delete a tour: copy its published objects to the archive prefix,
/// stamp a retention expiry, then delete the originals. Copy is confirmed
/// before anything is deleted, so a crash mid-way duplicates data rather
/// than losing it.
#[utoipa::path(
    delete,
    path = "/api/v0/tours/{content_id}",
    tag = "tours",
    params(("content_id" = String, Path, description = "Durable content id")),
    responses(
        (status = 200, description = "Tour archived", body = ArchiveResponse),
        (status = 404, description = "Unknown content id", body = ErrorResponse),
        (status = 409, description = "Tour already archived", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(content_id = %content_id, operation = "archive_tour"))]
pub async fn archive_tour(
    State(state): State<Arc<AppState>>,
    Path(content_id): Path<String>,
) -> Result<impl IntoResponse, HttpAppError> {
    let tour = state
        .db
        .tours
        .get(&content_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Tour not found: {}", content_id)))?;

    if tour.is_archived() {
        return Err(HttpAppError::from(AppError::Conflict(format!(
            "Tour already archived: {}",
            content_id
        ))));
    }

    let outcome = lifecycle::soft_delete_tour(
        state.storage.as_ref(),
        &state.db.tours,
        &tour,
        state.config.archive_retention_days,
    )
    .await?;

    Ok(Json(ArchiveResponse {
        content_id: tour.content_id,
        archive_prefix: outcome.archive_prefix,
        objects_archived: outcome.objects_archived,
        retention_expires_at: outcome.retention_expires_at,
    }))
}

/// Change a tour's slug.
///
/// Rewrites only the routing alias and registers the old slug as a redirect;
/// `content_id` and `storage_prefix` are never touched.
#[utoipa::path(
    post,
    path = "/api/v0/tours/{content_id}/slug",
    tag = "tours",
    params(("content_id" = String, Path, description = "Durable content id")),
    request_body = ChangeSlugRequest,
    responses(
        (status = 200, description = "Slug changed", body = PublishedTourResponse),
        (status = 400, description = "Invalid slug", body = ErrorResponse),
        (status = 404, description = "Unknown content id", body = ErrorResponse)
    )
)]
#[tracing::instrument(
    skip(state, request),
    fields(content_id = %content_id, operation = "change_slug")
)]
pub async fn change_slug(
    State(state): State<Arc<AppState>>,
    Path(content_id): Path<String>,
    Json(request): Json<ChangeSlugRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    request.validate().map_err(AppError::from)?;

    let slug = derive_safe_name(&request.slug).ok_or_else(|| {
        AppError::InvalidInput(format!("Cannot derive a usable slug from '{}'", request.slug))
    })?;

    state.db.tours.change_slug(&content_id, &slug).await?;

    let row = state
        .db
        .tours
        .get(&content_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Tour not found: {}", content_id)))?;

    tracing::info!(content_id = %content_id, slug = %slug, "Slug changed");

    Ok(Json(to_response(&row)?))
}
