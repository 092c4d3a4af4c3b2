//! Publish/archive lifecycle operations built from the gateway's
//! copy/delete capabilities.

use chrono::{DateTime, Duration, Utc};
use panopub_core::AppError;
use panopub_db::{PublishedTourRepository, PublishedTourRow};
use panopub_storage::keys::archive_prefix_for;
use panopub_storage::ObjectStore;

pub struct ArchiveOutcome {
    pub archive_prefix: String,
    pub objects_archived: usize,
    pub retention_expires_at: DateTime<Utc>,
}

/// Soft-delete a tour's published objects.
///
/// Order is copy-all, then delete. Every copy must succeed before the first
/// delete runs; a crash in between leaves duplicated objects, never lost
/// ones. Individual delete failures are logged and skipped for the same
/// reason.
pub async fn soft_delete_tour(
    storage: &dyn ObjectStore,
    tours: &PublishedTourRepository,
    tour: &PublishedTourRow,
    retention_days: i32,
) -> Result<ArchiveOutcome, AppError> {
    let archived_at = Utc::now();
    let archive_prefix = archive_prefix_for(&tour.content_id, archived_at);
    let retention_expires_at = archived_at + Duration::days(retention_days as i64);

    let keys = storage
        .list_prefix(&tour.storage_prefix)
        .await
        .map_err(|e| AppError::Storage(e.to_string()))?;

    for key in &keys {
        let suffix = key
            .strip_prefix(tour.storage_prefix.as_str())
            .unwrap_or(key.as_str());
        let target = format!("{}{}", archive_prefix, suffix);
        storage
            .copy(key, &target)
            .await
            .map_err(|e| AppError::Storage(format!("Archive copy failed for {}: {}", key, e)))?;
    }

    for key in &keys {
        if let Err(e) = storage.delete(key).await {
            tracing::error!(
                key = %key,
                error = %e,
                "Failed to delete archived original; leaving duplicate in place"
            );
        }
    }

    tours
        .mark_archived(&tour.content_id, &archive_prefix, retention_expires_at)
        .await?;

    tracing::info!(
        content_id = %tour.content_id,
        archive_prefix = %archive_prefix,
        objects = keys.len(),
        retention_expires_at = %retention_expires_at,
        "Tour soft-deleted"
    );

    Ok(ArchiveOutcome {
        archive_prefix,
        objects_archived: keys.len(),
        retention_expires_at,
    })
}
