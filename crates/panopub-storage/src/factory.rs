//! Storage backend factory.

use crate::traits::{ObjectStore, StorageError, StorageResult};
use panopub_core::{Config, StorageBackend};
use std::sync::Arc;

/// Build the configured object store backend.
pub async fn create_object_store(config: &Config) -> StorageResult<Arc<dyn ObjectStore>> {
    match config.storage_backend {
        #[cfg(feature = "storage-s3")]
        Some(StorageBackend::S3) => {
            let bucket = config.s3_bucket.clone().ok_or_else(|| {
                StorageError::ConfigError("S3_BUCKET must be set when STORAGE_BACKEND=s3".to_string())
            })?;
            let region = config.s3_region.clone().ok_or_else(|| {
                StorageError::ConfigError("S3_REGION must be set when STORAGE_BACKEND=s3".to_string())
            })?;
            let storage = crate::s3::S3Storage::new(bucket, region, config.s3_endpoint.clone())
                .await
                .map_err(|e| StorageError::ConfigError(e.to_string()))?;
            Ok(Arc::new(storage))
        }
        #[cfg(feature = "storage-local")]
        Some(StorageBackend::Local) => {
            let path = config.local_storage_path.clone().ok_or_else(|| {
                StorageError::ConfigError(
                    "LOCAL_STORAGE_PATH must be set when STORAGE_BACKEND=local".to_string(),
                )
            })?;
            let base_url = config
                .local_storage_base_url
                .clone()
                .unwrap_or_else(|| format!("http://localhost:{}/files", config.server_port));
            let storage = crate::local::LocalStorage::new(path, base_url).await?;
            Ok(Arc::new(storage))
        }
        #[allow(unreachable_patterns)]
        Some(other) => Err(StorageError::ConfigError(format!(
            "Storage backend {} is not enabled in this build",
            other
        ))),
        None => Err(StorageError::ConfigError(
            "STORAGE_BACKEND must be set to 's3' or 'local'".to_string(),
        )),
    }
}
