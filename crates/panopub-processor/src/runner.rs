//! Inbox polling runner.
//!
//! Stand-in for the storage provider's event delivery: watches the inbox
//! prefix and hands every object it finds to the pipeline. Because listing
//! and processing race with redelivery, the pipeline's missing-source skip is
//! what keeps double processing harmless.

use crate::pipeline::{ObjectEvent, TourProcessor};
use panopub_storage::{ObjectStore, INBOX_PREFIX};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;

pub struct InboxRunner {
    gateway: Arc<dyn ObjectStore>,
    processor: Arc<TourProcessor>,
    bucket: String,
    poll_interval: Duration,
}

impl InboxRunner {
    pub fn new(
        gateway: Arc<dyn ObjectStore>,
        processor: Arc<TourProcessor>,
        bucket: String,
        poll_interval: Duration,
    ) -> Self {
        Self {
            gateway,
            processor,
            bucket,
            poll_interval,
        }
    }

    /// Start the polling loop. Returns a JoinHandle for shutdown
    /// coordination.
    pub fn start(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut poll = interval(self.poll_interval);

            loop {
                poll.tick().await;

                if let Err(e) = self.drain_inbox().await {
                    tracing::error!(error = %e, "Inbox poll failed");
                }
            }
        })
    }

    /// Process every archive currently sitting in the inbox.
    pub async fn drain_inbox(&self) -> Result<usize, anyhow::Error> {
        let keys = self.gateway.list_prefix(INBOX_PREFIX).await?;
        if keys.is_empty() {
            return Ok(0);
        }

        tracing::info!(count = keys.len(), "Found inbox objects to process");

        let mut processed = 0;
        for key in keys {
            let event = ObjectEvent {
                bucket: self.bucket.clone(),
                key,
            };

            // One bad archive must not wedge the rest of the inbox; the
            // pipeline has already reported its failure.
            match self.processor.handle_event(&event).await {
                Ok(_) => processed += 1,
                Err(e) => {
                    tracing::error!(key = %event.key, error = %e, "Processing failed for inbox object");
                }
            }
        }

        Ok(processed)
    }
}
