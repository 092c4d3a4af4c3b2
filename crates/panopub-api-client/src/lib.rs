//! HTTP client for the Panopub control plane.
//!
//! Drives the full browser-side flow: issue a grant, PUT the archive
//! directly to storage, send the completion notice, and poll progress on a
//! fixed interval with a bounded attempt count. The client owns the give-up
//! decision; an exhausted poll surfaces [`PollOutcome::TimedOut`] and leaves
//! the job alone, so a later poll can still observe completion. Only an
//! explicit terminal state ends the loop early; ambiguous responses are
//! never assumed to be success.

use anyhow::{Context, Result};
use bytes::Bytes;
use panopub_core::models::processing_job::ProgressResponse;
use panopub_core::models::published_tour::PublishedTourResponse;
use panopub_core::models::upload_session::{
    CompleteUploadRequest, CompleteUploadResponse, UploadGrantRequest, UploadGrantResponse,
};
use panopub_core::models::UploadSessionStatus;
use reqwest::Client;
use std::time::Duration;
use uuid::Uuid;

/// Result of a bounded progress poll.
#[derive(Debug)]
pub enum PollOutcome {
    Completed(ProgressResponse),
    Failed(ProgressResponse),
    /// The attempt budget ran out before a terminal state was observed.
    /// The job may still finish server-side.
    TimedOut,
}

/// HTTP client for the Panopub API, authenticated with the service key.
#[derive(Clone, Debug)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: String, api_key: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    /// Create client from environment: PANOPUB_API_URL, PANOPUB_API_KEY.
    pub fn from_env() -> Result<Self> {
        let base_url = std::env::var("PANOPUB_API_URL")
            .unwrap_or_else(|_| "http://localhost:4000".to_string());
        let api_key = std::env::var("PANOPUB_API_KEY").ok();
        Self::new(base_url, api_key)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn build_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn apply_auth(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.header("X-API-Key", key.as_str()),
            None => request,
        }
    }

    /// Request a presigned upload grant.
    pub async fn issue_grant(&self, request: &UploadGrantRequest) -> Result<UploadGrantResponse> {
        let response = self
            .apply_auth(self.client.post(self.build_url("/api/v0/uploads/grants")))
            .json(request)
            .send()
            .await
            .context("Grant request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Grant rejected ({}): {}", status, body);
        }

        response.json().await.context("Invalid grant response")
    }

    /// Upload the archive directly to storage using the grant descriptor.
    pub async fn upload_archive(&self, grant: &UploadGrantResponse, data: Bytes) -> Result<()> {
        let mut request = self.client.put(&grant.upload_url).body(data);

        if let Some(headers) = grant.required_headers.as_object() {
            for (name, value) in headers {
                if let Some(value) = value.as_str() {
                    request = request.header(name.as_str(), value);
                }
            }
        }

        let response = request.send().await.context("Direct upload failed")?;
        if !response.status().is_success() {
            anyhow::bail!("Direct upload rejected with status {}", response.status());
        }

        Ok(())
    }

    /// Notify the control plane that the upload finished. Safe to retry
    /// after a network blip; the server answers with the same job id.
    pub async fn complete_upload(&self, session_id: Uuid) -> Result<CompleteUploadResponse> {
        let response = self
            .apply_auth(self.client.post(self.build_url("/api/v0/uploads/complete")))
            .json(&CompleteUploadRequest { session_id })
            .send()
            .await
            .context("Completion notice failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Completion notice rejected ({}): {}", status, body);
        }

        response.json().await.context("Invalid completion response")
    }

    /// Fetch current progress by session or job id.
    pub async fn get_progress(&self, id: Uuid) -> Result<ProgressResponse> {
        let response = self
            .apply_auth(
                self.client
                    .get(self.build_url(&format!("/api/v0/uploads/{}/progress", id))),
            )
            .send()
            .await
            .context("Progress request failed")?;

        if !response.status().is_success() {
            anyhow::bail!("Progress request rejected with status {}", response.status());
        }

        response.json().await.context("Invalid progress response")
    }

    /// Poll progress at a fixed interval until a terminal state or the
    /// attempt budget is exhausted.
    pub async fn poll_until_terminal(
        &self,
        id: Uuid,
        poll_interval: Duration,
        max_attempts: u32,
    ) -> PollOutcome {
        let mut ticker = tokio::time::interval(poll_interval);

        for attempt in 1..=max_attempts {
            ticker.tick().await;

            match self.get_progress(id).await {
                Ok(progress) => {
                    tracing::debug!(
                        attempt,
                        status = %progress.status,
                        percent = progress.percent,
                        "Progress poll"
                    );
                    match progress.status {
                        UploadSessionStatus::Completed => return PollOutcome::Completed(progress),
                        UploadSessionStatus::Failed | UploadSessionStatus::Expired => {
                            return PollOutcome::Failed(progress)
                        }
                        _ => {}
                    }
                }
                Err(e) => {
                    // Transient; the next tick retries. The budget still counts down.
                    tracing::warn!(attempt, error = %e, "Progress poll failed");
                }
            }
        }

        PollOutcome::TimedOut
    }

    /// List published tours.
    pub async fn list_tours(&self) -> Result<Vec<PublishedTourResponse>> {
        let response = self
            .apply_auth(self.client.get(self.build_url("/api/v0/tours")))
            .send()
            .await
            .context("Tour list request failed")?;

        if !response.status().is_success() {
            anyhow::bail!("Tour list rejected with status {}", response.status());
        }

        response.json().await.context("Invalid tour list response")
    }

    /// Get one tour by content id.
    pub async fn get_tour(&self, content_id: &str) -> Result<PublishedTourResponse> {
        let response = self
            .apply_auth(
                self.client
                    .get(self.build_url(&format!("/api/v0/tours/{}", content_id))),
            )
            .send()
            .await
            .context("Tour request failed")?;

        if !response.status().is_success() {
            anyhow::bail!("Tour request rejected with status {}", response.status());
        }

        response.json().await.context("Invalid tour response")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = ApiClient::new("http://localhost:4000/".to_string(), None).expect("client");
        assert_eq!(client.base_url(), "http://localhost:4000");
        assert_eq!(
            client.build_url("/api/v0/tours"),
            "http://localhost:4000/api/v0/tours"
        );
    }

    #[tokio::test]
    async fn test_poll_gives_up_after_bounded_attempts() {
        // Nothing listens here; every poll errors and the budget runs out.
        let client =
            ApiClient::new("http://127.0.0.1:1".to_string(), None).expect("client");
        let outcome = client
            .poll_until_terminal(Uuid::new_v4(), Duration::from_millis(1), 3)
            .await;
        assert!(matches!(outcome, PollOutcome::TimedOut));
    }
}
