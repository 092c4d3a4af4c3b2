//! Application state.
//!
//! AppState aggregates repositories, the storage gateway, and injected
//! configuration. The webhook verifier lives here as constructed state, not
//! as something handlers read from the environment.

use crate::webhook::WebhookVerifier;
use panopub_core::Config;
use panopub_db::{ProcessingJobRepository, PublishedTourRepository, UploadSessionRepository};
use panopub_storage::ObjectStore;
use sqlx::PgPool;
use std::sync::Arc;

/// Database pool and repositories.
#[derive(Clone)]
pub struct DbState {
    pub pool: PgPool,
    pub sessions: UploadSessionRepository,
    pub jobs: ProcessingJobRepository,
    pub tours: PublishedTourRepository,
}

impl DbState {
    pub fn new(pool: PgPool) -> Self {
        Self {
            sessions: UploadSessionRepository::new(pool.clone()),
            jobs: ProcessingJobRepository::new(pool.clone()),
            tours: PublishedTourRepository::new(pool.clone()),
            pool,
        }
    }
}

/// Main application state: aggregates sub-states for dependency injection.
#[derive(Clone)]
pub struct AppState {
    pub db: DbState,
    pub storage: Arc<dyn ObjectStore>,
    pub webhook: WebhookVerifier,
    pub config: Config,
}

impl axum::extract::FromRef<Arc<AppState>> for DbState {
    fn from_ref(state: &Arc<AppState>) -> Self {
        state.db.clone()
    }
}

fn _assert_app_state_send_sync() {
    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}
    assert_send::<AppState>();
    assert_sync::<AppState>();
}
