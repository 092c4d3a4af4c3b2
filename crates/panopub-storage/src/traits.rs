//! Storage abstraction trait
//!
//! This module defines the ObjectStore trait that all storage backends must
//! implement. The control plane and the processor both talk to storage
//! exclusively through this trait.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::time::Duration;
use thiserror::Error;

use panopub_core::StorageBackend;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Copy failed: {0}")]
    CopyFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("List failed: {0}")]
    ListFailed(String),

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Object metadata returned by `head`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMeta {
    pub size: u64,
    pub last_modified: Option<DateTime<Utc>>,
}

/// Object store gateway trait
///
/// All storage backends (S3, local filesystem) must implement this trait.
/// Keys follow the layout in [`crate::keys`]: `uploads/` for the inbox,
/// `tours/` for published content, `archive/` for soft-deleted content.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Probe an object's metadata without downloading the body.
    /// Returns `Ok(None)` when the object does not exist.
    async fn head(&self, key: &str) -> StorageResult<Option<ObjectMeta>>;

    /// Download an object body.
    async fn get(&self, key: &str) -> StorageResult<Bytes>;

    /// Write an object with the given content type. Returns the public URL.
    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> StorageResult<String>;

    /// Server-side copy from one key to another.
    async fn copy(&self, from_key: &str, to_key: &str) -> StorageResult<()>;

    /// Delete an object. Deleting a missing object is not an error.
    async fn delete(&self, key: &str) -> StorageResult<()>;

    /// List all object keys under a prefix.
    async fn list_prefix(&self, prefix: &str) -> StorageResult<Vec<String>>;

    /// Generate a presigned PUT URL scoped to a single key, time-limited.
    ///
    /// This is the minimum-capability grant for direct browser uploads; it is
    /// never a general bucket credential. Only supported by S3 backends in
    /// production; the local backend returns an application-served URL.
    async fn presigned_put_url(
        &self,
        key: &str,
        content_type: &str,
        expires_in: Duration,
    ) -> StorageResult<String>;

    /// Public URL for a published object.
    fn public_url(&self, key: &str) -> String;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;
}
