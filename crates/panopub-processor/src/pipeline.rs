//! The processing pipeline: validate → download → extract → republish →
//! invalidate → cleanup → report.

use crate::cdn::CdnInvalidator;
use crate::error::ProcessorError;
use crate::extract::extract_entries;
use crate::report::ProcessorReporter;
use panopub_core::models::{CompletionReport, ProcessingStage, ProgressReport, ReportOutcome};
use panopub_core::sanitize::safe_name_from_object_key;
use panopub_storage::keys::{is_inbox_key, publish_prefix, published_entry_key, INBOX_PREFIX};
use panopub_storage::ObjectStore;
use std::collections::HashSet;
use std::sync::Arc;

/// Processor limits and switches.
#[derive(Clone, Debug)]
pub struct ProcessorConfig {
    pub max_archive_size_bytes: u64,
    pub cdn_invalidation_enabled: bool,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            max_archive_size_bytes: 1024 * 1024 * 1024,
            cdn_invalidation_enabled: false,
        }
    }
}

/// One storage event naming a bucket and object key.
#[derive(Clone, Debug)]
pub struct ObjectEvent {
    pub bucket: String,
    pub key: String,
}

/// Result of handling one event.
#[derive(Debug, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// The archive was extracted and republished.
    Published {
        target_name: String,
        storage_prefix: String,
        entries: usize,
    },
    /// The event referenced an already-consumed object (at-least-once
    /// redelivery); nothing was done.
    Skipped,
}

/// Extracts uploaded tour archives and republishes them for public serving.
pub struct TourProcessor {
    gateway: Arc<dyn ObjectStore>,
    cdn: Arc<dyn CdnInvalidator>,
    reporter: Arc<dyn ProcessorReporter>,
    config: ProcessorConfig,
}

impl TourProcessor {
    pub fn new(
        gateway: Arc<dyn ObjectStore>,
        cdn: Arc<dyn CdnInvalidator>,
        reporter: Arc<dyn ProcessorReporter>,
        config: ProcessorConfig,
    ) -> Self {
        Self {
            gateway,
            cdn,
            reporter,
            config,
        }
    }

    /// Handle one storage event end to end.
    ///
    /// Any failure past name derivation still attempts a failure report
    /// before returning; a run that dies without reporting leaves the job to
    /// the control plane's timeout sweep.
    #[tracing::instrument(skip(self), fields(key = %event.key))]
    pub async fn handle_event(&self, event: &ObjectEvent) -> Result<ProcessOutcome, ProcessorError> {
        let key = event.key.as_str();

        if !is_inbox_key(key) {
            tracing::error!(key = %key, "Rejecting object outside the inbox prefix");
            return Err(ProcessorError::OutsideInbox(key.to_string()));
        }

        let Some(target_name) = safe_name_from_object_key(key, INBOX_PREFIX) else {
            tracing::error!(key = %key, "Cannot derive a safe content name; no session can match");
            return Err(ProcessorError::UnusableName(key.to_string()));
        };

        let started = std::time::Instant::now();

        match self.run(key, &target_name).await {
            Ok(Some((storage_prefix, entries))) => {
                let report = CompletionReport {
                    target_name: target_name.clone(),
                    content_id: None,
                    outcome: ReportOutcome::Success,
                    storage_prefix: Some(storage_prefix.clone()),
                    error_message: None,
                    stage: Some(ProcessingStage::Cleanup),
                    duration_ms: Some(started.elapsed().as_millis() as i64),
                };
                self.reporter
                    .report_completion(&report)
                    .await
                    .map_err(|e| ProcessorError::Report(e.to_string()))?;

                tracing::info!(
                    target_name = %target_name,
                    storage_prefix = %storage_prefix,
                    entries,
                    duration_ms = started.elapsed().as_millis() as i64,
                    "Tour published"
                );

                Ok(ProcessOutcome::Published {
                    target_name,
                    storage_prefix,
                    entries,
                })
            }
            Ok(None) => {
                tracing::info!(key = %key, "Inbox object already consumed, skipping redelivery");
                Ok(ProcessOutcome::Skipped)
            }
            Err((stage, err)) => {
                tracing::error!(
                    target_name = %target_name,
                    stage = %stage,
                    error = %err,
                    "Processing failed"
                );

                let report = CompletionReport {
                    target_name: target_name.clone(),
                    content_id: None,
                    outcome: ReportOutcome::Failure,
                    storage_prefix: None,
                    error_message: Some(err.to_string()),
                    stage: Some(stage),
                    duration_ms: Some(started.elapsed().as_millis() as i64),
                };
                if let Err(report_err) = self.reporter.report_completion(&report).await {
                    tracing::error!(
                        error = %report_err,
                        "Failed to deliver failure report; job is left to the timeout sweep"
                    );
                }

                Err(err)
            }
        }
    }

    /// The fallible pipeline body. Returns `Ok(None)` when the source object
    /// no longer exists (redelivery after cleanup); errors carry the stage
    /// reached for the failure report.
    async fn run(
        &self,
        key: &str,
        target_name: &str,
    ) -> Result<Option<(String, usize)>, (ProcessingStage, ProcessorError)> {
        // Stage 1: validate via metadata probe, before touching the body.
        self.progress(target_name, ProcessingStage::Validating, 5, "Validating archive")
            .await;

        if !key.to_lowercase().ends_with(".zip") {
            return Err((
                ProcessingStage::Validating,
                ProcessorError::UnsupportedType(key.to_string()),
            ));
        }

        let meta = self
            .gateway
            .head(key)
            .await
            .map_err(|e| (ProcessingStage::Validating, e.into()))?;

        let Some(meta) = meta else {
            return Ok(None);
        };

        if meta.size > self.config.max_archive_size_bytes {
            return Err((
                ProcessingStage::Validating,
                ProcessorError::TooLarge {
                    size: meta.size,
                    max: self.config.max_archive_size_bytes,
                },
            ));
        }

        // Stage 2: download.
        self.progress(target_name, ProcessingStage::Downloading, 10, "Downloading archive")
            .await;

        let archive = self
            .gateway
            .get(key)
            .await
            .map_err(|e| (ProcessingStage::Downloading, e.into()))?;

        // Stage 3: extract and map content types.
        self.progress(target_name, ProcessingStage::Extracting, 35, "Extracting entries")
            .await;

        let entries =
            extract_entries(&archive).map_err(|e| (ProcessingStage::Extracting, e))?;

        // Stage 4: republish under the public prefix. A second run over the
        // same key overwrites the same outputs, so redelivery is harmless.
        let prefix = publish_prefix(target_name);

        let previous_keys = self
            .gateway
            .list_prefix(&prefix)
            .await
            .map_err(|e| (ProcessingStage::Uploading, e.into()))?;
        let is_update = !previous_keys.is_empty();

        self.progress(
            target_name,
            ProcessingStage::Uploading,
            60,
            &format!("Republishing {} entries", entries.len()),
        )
        .await;

        let mut published: HashSet<String> = HashSet::with_capacity(entries.len());
        for entry in &entries {
            let entry_key = published_entry_key(&prefix, &entry.path);
            self.gateway
                .put(&entry_key, entry.data.clone().into(), entry.content_type)
                .await
                .map_err(|e| (ProcessingStage::Uploading, e.into()))?;
            published.insert(entry_key);
        }

        // Replace, don't merge: entries from the previous publish that are
        // absent from this archive must not linger.
        for stale_key in previous_keys.iter().filter(|k| !published.contains(*k)) {
            self.gateway
                .delete(stale_key)
                .await
                .map_err(|e| (ProcessingStage::Uploading, e.into()))?;
        }

        self.progress(target_name, ProcessingStage::Uploading, 90, "Entries republished")
            .await;

        // Stage 5: invalidate CDN cache (update path only, never fatal).
        if is_update && self.config.cdn_invalidation_enabled {
            self.progress(target_name, ProcessingStage::Invalidating, 92, "Invalidating CDN cache")
                .await;
            if let Err(e) = self.cdn.invalidate_prefix(&prefix).await {
                tracing::warn!(
                    prefix = %prefix,
                    error = %e,
                    "CDN invalidation failed; content is published, cache may serve stale entries"
                );
            }
        }

        // Stage 6: consume the inbox object so redeliveries find nothing.
        self.progress(target_name, ProcessingStage::Cleanup, 97, "Removing source archive")
            .await;

        self.gateway
            .delete(key)
            .await
            .map_err(|e| (ProcessingStage::Cleanup, e.into()))?;

        Ok(Some((prefix, entries.len())))
    }

    /// Best-effort progress callback; delivery failure never fails the run.
    async fn progress(&self, target_name: &str, stage: ProcessingStage, percent: i16, message: &str) {
        let report = ProgressReport {
            target_name: target_name.to_string(),
            stage,
            percent,
            message: message.to_string(),
        };
        if let Err(e) = self.reporter.report_progress(&report).await {
            tracing::warn!(stage = %stage, error = %e, "Progress report delivery failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cdn::NoopCdn;
    use crate::report::{ProcessorReporter, ReportError};
    use async_trait::async_trait;
    use bytes::Bytes;
    use panopub_storage::LocalStorage;
    use std::io::{Cursor, Write};
    use std::sync::Mutex;
    use zip::write::FileOptions;
    use zip::ZipWriter;

    /// Captures reports instead of delivering them.
    #[derive(Default)]
    struct RecordingReporter {
        progress: Mutex<Vec<ProgressReport>>,
        completions: Mutex<Vec<CompletionReport>>,
    }

    #[async_trait]
    impl ProcessorReporter for RecordingReporter {
        async fn report_progress(&self, report: &ProgressReport) -> Result<(), ReportError> {
            self.progress.lock().unwrap().push(report.clone());
            Ok(())
        }

        async fn report_completion(&self, report: &CompletionReport) -> Result<(), ReportError> {
            self.completions.lock().unwrap().push(report.clone());
            Ok(())
        }
    }

    fn build_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut buffer = Vec::new();
        {
            let mut zip = ZipWriter::new(Cursor::new(&mut buffer));
            for (name, data) in entries {
                zip.start_file(*name, FileOptions::default()).expect("start file");
                zip.write_all(data).expect("write entry");
            }
            zip.finish().expect("finish zip");
        }
        buffer
    }

    async fn setup() -> (tempfile::TempDir, Arc<LocalStorage>, Arc<RecordingReporter>, TourProcessor) {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = Arc::new(
            LocalStorage::new(dir.path(), "http://localhost:4000/files".to_string())
                .await
                .expect("storage"),
        );
        let reporter = Arc::new(RecordingReporter::default());
        let processor = TourProcessor::new(
            storage.clone(),
            Arc::new(NoopCdn),
            reporter.clone(),
            ProcessorConfig {
                max_archive_size_bytes: 10 * 1024 * 1024,
                cdn_invalidation_enabled: false,
            },
        );
        (dir, storage, reporter, processor)
    }

    fn event(key: &str) -> ObjectEvent {
        ObjectEvent {
            bucket: "test-bucket".to_string(),
            key: key.to_string(),
        }
    }

    #[tokio::test]
    async fn test_publish_roundtrip() {
        let (_dir, storage, reporter, processor) = setup().await;

        let archive = build_zip(&[
            ("index.html", b"<html></html>".as_slice()),
            ("media/pano1.jpg", b"\xff\xd8\xff".as_slice()),
        ]);
        storage
            .put("uploads/museum.zip", Bytes::from(archive), "application/zip")
            .await
            .expect("seed inbox");

        let outcome = processor.handle_event(&event("uploads/museum.zip")).await.expect("process");
        assert_eq!(
            outcome,
            ProcessOutcome::Published {
                target_name: "museum".to_string(),
                storage_prefix: "tours/museum/".to_string(),
                entries: 2,
            }
        );

        // Entries republished, inbox object consumed
        assert!(storage.head("tours/museum/index.html").await.expect("head").is_some());
        assert!(storage.head("tours/museum/media/pano1.jpg").await.expect("head").is_some());
        assert!(storage.head("uploads/museum.zip").await.expect("head").is_none());

        let completions = reporter.completions.lock().unwrap();
        assert_eq!(completions.len(), 1);
        assert_eq!(completions[0].outcome, ReportOutcome::Success);
        assert_eq!(completions[0].storage_prefix.as_deref(), Some("tours/museum/"));

        // Progress percent is non-decreasing
        let progress = reporter.progress.lock().unwrap();
        let percents: Vec<i16> = progress.iter().map(|p| p.percent).collect();
        assert!(percents.windows(2).all(|w| w[0] <= w[1]), "percents: {:?}", percents);
    }

    #[tokio::test]
    async fn test_redelivery_is_skipped() {
        let (_dir, storage, reporter, processor) = setup().await;

        let archive = build_zip(&[("index.html", b"<html></html>".as_slice())]);
        storage
            .put("uploads/museum.zip", Bytes::from(archive), "application/zip")
            .await
            .expect("seed inbox");

        processor.handle_event(&event("uploads/museum.zip")).await.expect("first run");
        let outcome = processor.handle_event(&event("uploads/museum.zip")).await.expect("redelivery");
        assert_eq!(outcome, ProcessOutcome::Skipped);

        // Only the first run reported
        assert_eq!(reporter.completions.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update_replaces_not_merges() {
        let (_dir, storage, _reporter, processor) = setup().await;

        let first = build_zip(&[
            ("index.html", b"v1".as_slice()),
            ("old-asset.js", b"gone soon".as_slice()),
        ]);
        storage
            .put("uploads/museum.zip", Bytes::from(first), "application/zip")
            .await
            .expect("seed inbox");
        processor.handle_event(&event("uploads/museum.zip")).await.expect("first publish");

        let second = build_zip(&[("index.html", b"v2".as_slice())]);
        storage
            .put("uploads/museum.zip", Bytes::from(second), "application/zip")
            .await
            .expect("seed inbox again");
        processor.handle_event(&event("uploads/museum.zip")).await.expect("update");

        let body = storage.get("tours/museum/index.html").await.expect("get");
        assert_eq!(&body[..], b"v2");
        assert!(
            storage.head("tours/museum/old-asset.js").await.expect("head").is_none(),
            "stale entry must not survive an update"
        );
    }

    #[tokio::test]
    async fn test_corrupt_archive_reports_failure() {
        let (_dir, storage, reporter, processor) = setup().await;

        storage
            .put("uploads/broken.zip", Bytes::from_static(b"not a zip"), "application/zip")
            .await
            .expect("seed inbox");

        let result = processor.handle_event(&event("uploads/broken.zip")).await;
        assert!(matches!(result, Err(ProcessorError::CorruptArchive(_))));

        let completions = reporter.completions.lock().unwrap();
        assert_eq!(completions.len(), 1);
        assert_eq!(completions[0].outcome, ReportOutcome::Failure);
        assert_eq!(completions[0].stage, Some(ProcessingStage::Extracting));
        assert!(completions[0].error_message.is_some());
    }

    #[tokio::test]
    async fn test_oversized_archive_rejected_before_download() {
        let (_dir, storage, reporter, processor) = setup().await;
        let small_limit = TourProcessor::new(
            storage.clone(),
            Arc::new(NoopCdn),
            reporter.clone(),
            ProcessorConfig {
                max_archive_size_bytes: 4,
                cdn_invalidation_enabled: false,
            },
        );

        let archive = build_zip(&[("index.html", b"<html></html>".as_slice())]);
        storage
            .put("uploads/big.zip", Bytes::from(archive), "application/zip")
            .await
            .expect("seed inbox");

        let result = small_limit.handle_event(&event("uploads/big.zip")).await;
        assert!(matches!(result, Err(ProcessorError::TooLarge { .. })));

        let completions = reporter.completions.lock().unwrap();
        assert_eq!(completions[0].stage, Some(ProcessingStage::Validating));
        // Nothing was published and the source is left in place
        drop(completions);
        assert!(storage.head("uploads/big.zip").await.expect("head").is_some());
        assert!(storage.list_prefix("tours/big/").await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn test_outside_inbox_rejected_without_report() {
        let (_dir, _storage, reporter, processor) = setup().await;

        let result = processor.handle_event(&event("tours/museum/index.html")).await;
        assert!(matches!(result, Err(ProcessorError::OutsideInbox(_))));
        assert!(reporter.completions.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_non_zip_extension_rejected() {
        let (_dir, storage, reporter, processor) = setup().await;

        storage
            .put("uploads/tour.rar", Bytes::from_static(b"rar"), "application/octet-stream")
            .await
            .expect("seed inbox");

        let result = processor.handle_event(&event("uploads/tour.rar")).await;
        assert!(matches!(result, Err(ProcessorError::UnsupportedType(_))));

        let completions = reporter.completions.lock().unwrap();
        assert_eq!(completions.len(), 1);
        assert_eq!(completions[0].outcome, ReportOutcome::Failure);
    }
}
