//! Authorized-caller capability check.
//!
//! Operator endpoints require the configured service key in `X-API-Key`,
//! compared in constant time. The webhook endpoints are exempt; they carry
//! their own HMAC. User/account management is out of scope, so this is the
//! entire authorization surface.

use crate::error::HttpAppError;
use axum::{extract::Request, extract::State, middleware::Next, response::Response};
use panopub_core::AppError;
use std::sync::Arc;
use subtle::ConstantTimeEq;

#[derive(Clone)]
pub struct AuthState {
    pub service_api_key: Option<String>,
}

pub async fn api_key_middleware(
    State(auth): State<Arc<AuthState>>,
    request: Request,
    next: Next,
) -> Result<Response, HttpAppError> {
    let Some(ref expected) = auth.service_api_key else {
        // No key configured: development mode. Config::validate refuses this
        // in production.
        return Ok(next.run(request).await);
    };

    let presented = request
        .headers()
        .get("x-api-key")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Missing API key".to_string()))?;

    let matches: bool = presented
        .as_bytes()
        .ct_eq(expected.as_bytes())
        .into();
    if !matches {
        return Err(HttpAppError(AppError::Unauthorized("Invalid API key".to_string())));
    }

    Ok(next.run(request).await)
}
