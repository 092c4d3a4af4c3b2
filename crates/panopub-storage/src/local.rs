use crate::traits::{ObjectMeta, ObjectStore, StorageError, StorageResult};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use panopub_core::StorageBackend;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Local filesystem storage implementation
///
/// Used for development and tests. Presigned URLs are plain
/// application-served URLs (no signature); the direct-upload flow against
/// this backend is only meaningful when the caller writes through the
/// gateway instead.
#[derive(Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
    base_url: String,
}

impl LocalStorage {
    /// Create a new LocalStorage instance
    ///
    /// # Arguments
    /// * `base_path` - Root directory for object storage (e.g., "/var/lib/panopub/objects")
    /// * `base_url` - Base URL for serving objects (e.g., "http://localhost:4000/files")
    pub async fn new(base_path: impl Into<PathBuf>, base_url: String) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalStorage {
            base_path,
            base_url,
        })
    }

    /// Convert storage key to filesystem path with security validation
    ///
    /// Rejects keys containing path traversal sequences that could escape the
    /// base storage directory.
    fn key_to_path(&self, key: &str) -> StorageResult<PathBuf> {
        if key.is_empty() || key.contains("..") || key.starts_with('/') {
            return Err(StorageError::InvalidKey(
                "Storage key contains invalid characters".to_string(),
            ));
        }

        Ok(self.base_path.join(key))
    }

    async fn ensure_parent_dir(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for LocalStorage {
    async fn head(&self, key: &str) -> StorageResult<Option<ObjectMeta>> {
        let path = self.key_to_path(key)?;
        match fs::metadata(&path).await {
            Ok(meta) => {
                let last_modified = meta
                    .modified()
                    .ok()
                    .map(DateTime::<Utc>::from);
                Ok(Some(ObjectMeta {
                    size: meta.len(),
                    last_modified,
                }))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::BackendError(format!(
                "Failed to stat {}: {}",
                path.display(),
                e
            ))),
        }
    }

    async fn get(&self, key: &str) -> StorageResult<Bytes> {
        let path = self.key_to_path(key)?;
        match fs::read(&path).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(key.to_string()))
            }
            Err(e) => Err(StorageError::DownloadFailed(format!(
                "Failed to read {}: {}",
                path.display(),
                e
            ))),
        }
    }

    async fn put(&self, key: &str, data: Bytes, _content_type: &str) -> StorageResult<String> {
        let path = self.key_to_path(key)?;
        let size = data.len();

        self.ensure_parent_dir(&path).await?;

        let mut file = fs::File::create(&path).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to create file {}: {}", path.display(), e))
        })?;

        file.write_all(&data).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to write file {}: {}", path.display(), e))
        })?;

        file.sync_all().await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to sync file {}: {}", path.display(), e))
        })?;

        tracing::debug!(key = %key, size_bytes = size, "Local storage put successful");

        Ok(self.public_url(key))
    }

    async fn copy(&self, from_key: &str, to_key: &str) -> StorageResult<()> {
        let from = self.key_to_path(from_key)?;
        let to = self.key_to_path(to_key)?;

        self.ensure_parent_dir(&to).await?;

        match fs::copy(&from, &to).await {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(from_key.to_string()))
            }
            Err(e) => Err(StorageError::CopyFailed(format!(
                "Failed to copy {} to {}: {}",
                from_key, to_key, e
            ))),
        }
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        let path = self.key_to_path(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::DeleteFailed(format!(
                "Failed to delete {}: {}",
                path.display(),
                e
            ))),
        }
    }

    async fn list_prefix(&self, prefix: &str) -> StorageResult<Vec<String>> {
        // The prefix may name a directory ("tours/museum/") or a key prefix;
        // walk the deepest existing directory and filter on the full key.
        let root = if prefix.ends_with('/') {
            self.key_to_path(prefix.trim_end_matches('/'))?
        } else {
            let path = self.key_to_path(prefix)?;
            path.parent().map(Path::to_path_buf).unwrap_or(path)
        };

        let mut keys = Vec::new();
        let mut stack = vec![root];

        while let Some(dir) = stack.pop() {
            let mut entries = match fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => {
                    return Err(StorageError::ListFailed(format!(
                        "Failed to read {}: {}",
                        dir.display(),
                        e
                    )))
                }
            };

            while let Some(entry) = entries.next_entry().await.map_err(|e| {
                StorageError::ListFailed(format!("Failed to read {}: {}", dir.display(), e))
            })? {
                let path = entry.path();
                if path.is_dir() {
                    stack.push(path);
                } else if let Ok(rel) = path.strip_prefix(&self.base_path) {
                    let key = rel.to_string_lossy().replace('\\', "/");
                    if key.starts_with(prefix) {
                        keys.push(key);
                    }
                }
            }
        }

        keys.sort();
        Ok(keys)
    }

    async fn presigned_put_url(
        &self,
        key: &str,
        _content_type: &str,
        _expires_in: Duration,
    ) -> StorageResult<String> {
        // No signing for the local backend; development uploads go through
        // the application at the same URL the object is served from.
        self.key_to_path(key)?;
        Ok(self.public_url(key))
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), key)
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn storage() -> (tempfile::TempDir, LocalStorage) {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = LocalStorage::new(dir.path(), "http://localhost:4000/files".to_string())
            .await
            .expect("create storage");
        (dir, storage)
    }

    #[tokio::test]
    async fn test_put_head_get_delete() {
        let (_dir, storage) = storage().await;

        let url = storage
            .put("tours/demo/index.html", Bytes::from_static(b"<html></html>"), "text/html")
            .await
            .expect("put");
        assert_eq!(url, "http://localhost:4000/files/tours/demo/index.html");

        let meta = storage.head("tours/demo/index.html").await.expect("head");
        assert_eq!(meta.map(|m| m.size), Some(13));

        let body = storage.get("tours/demo/index.html").await.expect("get");
        assert_eq!(&body[..], b"<html></html>");

        storage.delete("tours/demo/index.html").await.expect("delete");
        assert!(storage.head("tours/demo/index.html").await.expect("head").is_none());

        // Deleting again is a no-op
        storage.delete("tours/demo/index.html").await.expect("delete twice");
    }

    #[tokio::test]
    async fn test_copy_then_originals_intact() {
        let (_dir, storage) = storage().await;

        storage
            .put("tours/demo/a.txt", Bytes::from_static(b"aaa"), "text/plain")
            .await
            .expect("put");
        storage.copy("tours/demo/a.txt", "archive/demo/1/a.txt").await.expect("copy");

        assert_eq!(&storage.get("tours/demo/a.txt").await.expect("get")[..], b"aaa");
        assert_eq!(&storage.get("archive/demo/1/a.txt").await.expect("get")[..], b"aaa");
    }

    #[tokio::test]
    async fn test_list_prefix() {
        let (_dir, storage) = storage().await;

        for key in ["tours/demo/index.html", "tours/demo/media/p1.jpg", "tours/other/index.html"] {
            storage.put(key, Bytes::from_static(b"x"), "text/plain").await.expect("put");
        }

        let keys = storage.list_prefix("tours/demo/").await.expect("list");
        assert_eq!(keys, vec!["tours/demo/index.html", "tours/demo/media/p1.jpg"]);

        let none = storage.list_prefix("tours/missing/").await.expect("list");
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_traversal_keys_rejected() {
        let (_dir, storage) = storage().await;

        assert!(matches!(
            storage.get("../outside").await,
            Err(StorageError::InvalidKey(_))
        ));
        assert!(matches!(
            storage.put("/absolute", Bytes::new(), "text/plain").await,
            Err(StorageError::InvalidKey(_))
        ));
    }
}
