//! Background sweeps.
//!
//! Three periodic passes keep the pipeline honest:
//! - stuck processing jobs past the ceiling are failed with a synthetic
//!   timeout so a crashed processor cannot leave the UI polling forever;
//! - terminal upload sessions past the retention window are removed;
//! - archived tours past their retention expiry are hard-deleted.

use panopub_db::{ProcessingJobRepository, PublishedTourRepository, UploadSessionRepository};
use panopub_storage::ObjectStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;

#[derive(Clone, Debug)]
pub struct SweeperConfig {
    pub interval: Duration,
    /// Ceiling for a job to reach a terminal state before it is declared dead.
    pub job_timeout_seconds: i64,
    pub session_retention_days: i32,
}

pub struct SweeperService {
    sessions: UploadSessionRepository,
    jobs: ProcessingJobRepository,
    tours: PublishedTourRepository,
    storage: Arc<dyn ObjectStore>,
    config: SweeperConfig,
}

impl SweeperService {
    pub fn new(
        sessions: UploadSessionRepository,
        jobs: ProcessingJobRepository,
        tours: PublishedTourRepository,
        storage: Arc<dyn ObjectStore>,
        config: SweeperConfig,
    ) -> Self {
        Self {
            sessions,
            jobs,
            tours,
            storage,
            config,
        }
    }

    /// Start the background sweep loop. Returns a JoinHandle for shutdown.
    pub fn start(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut tick = interval(self.config.interval);

            loop {
                tick.tick().await;

                if let Err(e) = self.run_once().await {
                    tracing::error!(error = %e, "Sweep pass failed");
                }
            }
        })
    }

    /// One full sweep pass. Each sub-sweep tolerates the others failing.
    pub async fn run_once(&self) -> Result<(), anyhow::Error> {
        let timed_out = match self.sweep_stuck_jobs().await {
            Ok(count) => count,
            Err(e) => {
                tracing::error!(error = %e, "Failed to sweep stuck jobs");
                0
            }
        };

        let sessions_removed = match self
            .sessions
            .delete_terminal_older_than_days(self.config.session_retention_days)
            .await
        {
            Ok(count) => count,
            Err(e) => {
                tracing::error!(error = %e, "Failed to sweep terminal sessions");
                0
            }
        };

        let archives_removed = match self.sweep_expired_archives().await {
            Ok(count) => count,
            Err(e) => {
                tracing::error!(error = %e, "Failed to sweep expired archives");
                0
            }
        };

        if timed_out > 0 || sessions_removed > 0 || archives_removed > 0 {
            tracing::info!(
                timed_out,
                sessions_removed,
                archives_removed,
                "Sweep pass completed"
            );
        }

        Ok(())
    }

    /// Fail jobs that never reached a terminal state within the ceiling.
    /// The CAS in `fail` means a real callback that raced us, or arrives
    /// later with a different outcome, cannot flip the terminal state.
    async fn sweep_stuck_jobs(&self) -> Result<usize, anyhow::Error> {
        let stuck = self.jobs.find_stuck(self.config.job_timeout_seconds).await?;
        let mut count = 0;

        for job in stuck {
            tracing::warn!(
                job_id = %job.id,
                session_id = %job.session_id,
                stage = %job.stage,
                percent = job.percent,
                "Job exceeded processing ceiling, marking failed"
            );

            let transitioned = self
                .jobs
                .fail(job.id, "Processing timeout: no report from processor")
                .await?;
            if transitioned > 0 {
                self.sessions
                    .mark_failed(job.session_id, Some("Processing timeout"))
                    .await?;
                count += 1;
            }
        }

        Ok(count)
    }

    /// Hard-delete archived tours whose retention window has lapsed.
    async fn sweep_expired_archives(&self) -> Result<usize, anyhow::Error> {
        let expired = self.tours.find_retention_expired().await?;
        let mut count = 0;

        for tour in expired {
            let Some(ref archive_prefix) = tour.archive_prefix else {
                tracing::error!(content_id = %tour.content_id, "Archived tour has no archive prefix");
                continue;
            };

            tracing::info!(
                content_id = %tour.content_id,
                archive_prefix = %archive_prefix,
                "Retention lapsed, hard-deleting archived tour"
            );

            let keys = match self.storage.list_prefix(archive_prefix).await {
                Ok(keys) => keys,
                Err(e) => {
                    tracing::error!(error = %e, archive_prefix = %archive_prefix, "Failed to list archive");
                    continue;
                }
            };

            let mut all_deleted = true;
            for key in keys {
                if let Err(e) = self.storage.delete(&key).await {
                    tracing::error!(error = %e, key = %key, "Failed to delete archived object");
                    all_deleted = false;
                }
            }

            // Keep the row until storage is actually clean so the next pass retries.
            if all_deleted {
                self.tours.delete(&tour.content_id).await?;
                count += 1;
            }
        }

        Ok(count)
    }
}
