//! Public tour serving.
//!
//! One routing mechanism: parse the slug, resolve it to a storage prefix
//! (following at most one redirect mapping), and redirect to the public
//! object URL. Archived tours are gone from the outside.

use crate::error::HttpAppError;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    response::{IntoResponse, Redirect},
};
use panopub_core::AppError;
use panopub_db::PublishedTourRow;
use std::sync::Arc;

async fn resolve_servable(
    state: &AppState,
    slug: &str,
) -> Result<PublishedTourRow, HttpAppError> {
    let (tour, _redirected) = state
        .db
        .tours
        .resolve_slug(slug)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Tour not found: {}", slug)))?;

    if tour.is_archived() {
        return Err(HttpAppError::from(AppError::NotFound(format!(
            "Tour not found: {}",
            slug
        ))));
    }

    Ok(tour)
}

/// `GET /t/{slug}` — tour entry point.
#[tracing::instrument(skip(state), fields(slug = %slug, operation = "serve_tour_index"))]
pub async fn serve_tour_index(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, HttpAppError> {
    let tour = resolve_servable(&state, &slug).await?;
    let url = state
        .storage
        .public_url(&format!("{}index.html", tour.storage_prefix));
    Ok(Redirect::permanent(&url))
}

/// `GET /t/{slug}/{*path}` — tour asset.
#[tracing::instrument(skip(state), fields(slug = %slug, operation = "serve_tour_asset"))]
pub async fn serve_tour_asset(
    State(state): State<Arc<AppState>>,
    Path((slug, path)): Path<(String, String)>,
) -> Result<impl IntoResponse, HttpAppError> {
    if path.contains("..") {
        return Err(HttpAppError::from(AppError::InvalidInput(
            "Invalid asset path".to_string(),
        )));
    }

    let tour = resolve_servable(&state, &slug).await?;
    let url = state
        .storage
        .public_url(&format!("{}{}", tour.storage_prefix, path));
    Ok(Redirect::permanent(&url))
}
