//! Route configuration and setup.

use crate::auth::{api_key_middleware, AuthState};
use crate::handlers::{
    health, hooks, progress, serve, tours, upload_complete, upload_grant,
};
use crate::state::AppState;
use axum::{
    http::{HeaderValue, Method},
    routing::{delete, get, post},
    Router,
};
use panopub_core::Config;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

/// The control plane only ever receives JSON; archive bodies go directly to
/// storage via the presigned grant.
const MAX_REQUEST_BODY_BYTES: usize = 1024 * 1024;

/// Setup all application routes
pub fn setup_routes(config: &Config, state: Arc<AppState>) -> Result<Router<()>, anyhow::Error> {
    let cors = setup_cors(config)?;

    let auth_state = Arc::new(AuthState {
        service_api_key: config.service_api_key.clone(),
    });

    // Webhooks authenticate with their own HMAC; public serving and health
    // need no auth at all.
    let public_routes = Router::new()
        .route("/health", get(health::health))
        .route("/hooks/processor", post(hooks::receive_completion))
        .route("/hooks/processor/progress", post(hooks::receive_progress))
        .route("/t/{slug}", get(serve::serve_tour_index))
        .route("/t/{slug}/{*path}", get(serve::serve_tour_asset));

    let protected_routes = Router::new()
        .route("/api/v0/uploads/grants", post(upload_grant::issue_grant))
        .route("/api/v0/uploads/complete", post(upload_complete::complete_upload))
        .route("/api/v0/uploads/{id}/progress", get(progress::get_progress))
        .route("/api/v0/tours", get(tours::list_tours))
        .route("/api/v0/tours/{content_id}", get(tours::get_tour))
        .route("/api/v0/tours/{content_id}", delete(tours::archive_tour))
        .route("/api/v0/tours/{content_id}/slug", post(tours::change_slug))
        .layer(axum::middleware::from_fn_with_state(
            auth_state,
            api_key_middleware,
        ));

    let app = public_routes
        .merge(protected_routes)
        .merge(
            utoipa_rapidoc::RapiDoc::with_openapi(
                "/api/openapi.json",
                crate::api_doc::ApiDoc::openapi(),
            )
            .path("/docs"),
        )
        .layer(RequestBodyLimitLayer::new(MAX_REQUEST_BODY_BYTES))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    Ok(app)
}

fn setup_cors(config: &Config) -> Result<CorsLayer, anyhow::Error> {
    if config.cors_origins.iter().any(|origin| origin == "*") {
        return Ok(CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any));
    }

    let origins = config
        .cors_origins
        .iter()
        .map(|origin| {
            origin
                .parse::<HeaderValue>()
                .map_err(|_| anyhow::anyhow!("Invalid CORS origin: {}", origin))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers(Any))
}
