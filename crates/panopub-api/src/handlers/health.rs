use crate::state::DbState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};

/// Liveness + database connectivity check.
pub async fn health(State(db): State<DbState>) -> impl IntoResponse {
    match sqlx::query("SELECT 1").execute(&db.pool).await {
        Ok(_) => (
            StatusCode::OK,
            Json(serde_json::json!({ "status": "ok", "database": "up" })),
        ),
        Err(e) => {
            tracing::error!(error = %e, "Health check database ping failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({ "status": "degraded", "database": "down" })),
            )
        }
    }
}
