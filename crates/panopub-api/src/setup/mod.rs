//! Application setup: database, storage, state, routes, server.

pub mod database;
pub mod routes;
pub mod server;

use crate::services::{SweeperConfig, SweeperService};
use crate::state::{AppState, DbState};
use crate::webhook::WebhookVerifier;
use axum::Router;
use panopub_core::Config;
use panopub_storage::create_object_store;
use std::sync::Arc;
use std::time::Duration;

/// Initialize the application: connect the database, build storage and
/// state, start the background sweeper, and assemble the router.
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, Router), anyhow::Error> {
    config.validate()?;

    let pool = database::connect(&config).await?;
    let storage = create_object_store(&config).await?;

    let webhook = WebhookVerifier::new(
        config.webhook_secret.as_ref().map(|s| s.as_bytes().to_vec()),
        config.webhook_verify_signatures,
    )?;

    let db = DbState::new(pool);

    let state = Arc::new(AppState {
        db: db.clone(),
        storage: storage.clone(),
        webhook,
        config: config.clone(),
    });

    let sweeper = Arc::new(SweeperService::new(
        db.sessions.clone(),
        db.jobs.clone(),
        db.tours.clone(),
        storage,
        SweeperConfig {
            interval: Duration::from_secs(config.sweep_interval_seconds),
            job_timeout_seconds: config.job_timeout_seconds,
            session_retention_days: config.session_retention_days,
        },
    ));
    sweeper.start();

    let router = routes::setup_routes(&config, state.clone())?;

    Ok((state, router))
}
