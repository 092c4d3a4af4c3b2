//! Signed report delivery to the control plane.

use async_trait::async_trait;
use panopub_core::models::{CompletionReport, ProgressReport};
use panopub_core::signature::{sign_payload, SIGNATURE_HEADER};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Failed to deliver report: {0}")]
    Delivery(String),

    #[error("Report rejected with status {0}")]
    Rejected(u16),
}

/// Callback channel from the processor to the control plane.
///
/// Progress reports are best-effort; the completion report is the only way
/// the control plane learns a run's outcome, so the pipeline attempts it even
/// when a stage failed.
#[async_trait]
pub trait ProcessorReporter: Send + Sync {
    async fn report_progress(&self, report: &ProgressReport) -> Result<(), ReportError>;
    async fn report_completion(&self, report: &CompletionReport) -> Result<(), ReportError>;
}

/// HTTP reporter posting signed JSON to the webhook endpoints.
pub struct HttpReporter {
    client: reqwest::Client,
    base_url: String,
    secret: Option<Vec<u8>>,
}

impl HttpReporter {
    pub fn new(base_url: String, secret: Option<Vec<u8>>) -> Result<Self, anyhow::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to create HTTP client: {}", e))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            secret,
        })
    }

    async fn post_signed(&self, path: &str, body: Vec<u8>) -> Result<(), ReportError> {
        let url = format!("{}{}", self.base_url, path);

        let mut request = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .body(body.clone());

        if let Some(ref secret) = self.secret {
            request = request.header(SIGNATURE_HEADER, sign_payload(secret, &body));
        }

        let response = request
            .send()
            .await
            .map_err(|e| ReportError::Delivery(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ReportError::Rejected(response.status().as_u16()));
        }

        Ok(())
    }
}

#[async_trait]
impl ProcessorReporter for HttpReporter {
    async fn report_progress(&self, report: &ProgressReport) -> Result<(), ReportError> {
        let body = serde_json::to_vec(report)?;
        self.post_signed("/hooks/processor/progress", body).await
    }

    async fn report_completion(&self, report: &CompletionReport) -> Result<(), ReportError> {
        let body = serde_json::to_vec(report)?;
        self.post_signed("/hooks/processor", body).await
    }
}
