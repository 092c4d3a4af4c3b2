use crate::traits::{ObjectMeta, ObjectStore, StorageError, StorageResult};
use async_trait::async_trait;
use bytes::Bytes;
use futures::TryStreamExt;
use http::Method;
use object_store::aws::{AmazonS3, AmazonS3Builder};
use object_store::path::Path;
use object_store::signer::Signer;
use object_store::{Attribute, Attributes, ObjectStore as _, ObjectStoreExt, PutOptions};
use panopub_core::StorageBackend;
use std::env;
use std::time::Duration;

/// S3 (or S3-compatible) storage backend built on `object_store`.
#[derive(Clone)]
pub struct S3Storage {
    store: AmazonS3,
    bucket: String,
    region: String,
    endpoint_url: Option<String>,
}

impl S3Storage {
    /// Create a new S3Storage. Credentials come from the environment
    /// (AWS_ACCESS_KEY_ID etc.); `endpoint_url` selects an S3-compatible
    /// provider (MinIO, Spaces) with path-style URLs.
    pub async fn new(
        bucket: String,
        region: String,
        endpoint_url: Option<String>,
    ) -> Result<Self, anyhow::Error> {
        // Keep AWS_REGION for compatibility with existing tooling if not already set.
        if env::var("AWS_REGION").is_err() {
            env::set_var("AWS_REGION", &region);
        }

        let mut builder = AmazonS3Builder::from_env()
            .with_region(region.clone())
            .with_bucket_name(bucket.clone());
        if let Some(ref endpoint) = endpoint_url {
            builder = builder.with_endpoint(endpoint.clone());
        }

        let store = builder
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build S3 object store: {}", e))?;

        Ok(S3Storage {
            store,
            bucket,
            region,
            endpoint_url,
        })
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

#[async_trait]
impl ObjectStore for S3Storage {
    #[tracing::instrument(skip(self), fields(s3.bucket = %self.bucket, s3.key = %key, s3.operation = "HeadObject"))]
    async fn head(&self, key: &str) -> StorageResult<Option<ObjectMeta>> {
        let location = Path::from(key.to_string());
        match self.store.head(&location).await {
            Ok(meta) => Ok(Some(ObjectMeta {
                size: meta.size,
                last_modified: Some(meta.last_modified),
            })),
            Err(object_store::Error::NotFound { .. }) => Ok(None),
            Err(e) => Err(StorageError::BackendError(format!("Head failed for {}: {}", key, e))),
        }
    }

    #[tracing::instrument(skip(self), fields(s3.bucket = %self.bucket, s3.key = %key, s3.operation = "GetObject"))]
    async fn get(&self, key: &str) -> StorageResult<Bytes> {
        let location = Path::from(key.to_string());
        let start = std::time::Instant::now();

        match self.store.get(&location).await {
            Ok(response) => {
                let bytes = response.bytes().await.map_err(|e| {
                    StorageError::DownloadFailed(format!("Body read failed for {}: {}", key, e))
                })?;
                tracing::info!(
                    size_bytes = bytes.len(),
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 download successful"
                );
                Ok(bytes)
            }
            Err(object_store::Error::NotFound { .. }) => Err(StorageError::NotFound(key.to_string())),
            Err(e) => Err(StorageError::DownloadFailed(format!(
                "Download failed for {}: {}",
                key, e
            ))),
        }
    }

    #[tracing::instrument(skip(self, data), fields(
        s3.bucket = %self.bucket,
        s3.key = %key,
        s3.operation = "PutObject",
        s3.size = %data.len()
    ))]
    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> StorageResult<String> {
        let location = Path::from(key.to_string());
        let start = std::time::Instant::now();
        let size = data.len() as u64;

        let mut attributes = Attributes::new();
        attributes.insert(Attribute::ContentType, content_type.to_string().into());
        let opts = PutOptions {
            attributes,
            ..Default::default()
        };

        match self.store.put_opts(&location, data.into(), opts).await {
            Ok(_) => {
                tracing::info!(
                    size_bytes = size,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 upload successful"
                );
                Ok(self.public_url(key))
            }
            Err(e) => {
                tracing::error!(error = %e, size_bytes = size, "S3 upload failed");
                Err(StorageError::UploadFailed(format!("Upload failed for {}: {}", key, e)))
            }
        }
    }

    #[tracing::instrument(skip(self), fields(s3.bucket = %self.bucket, s3.operation = "CopyObject"))]
    async fn copy(&self, from_key: &str, to_key: &str) -> StorageResult<()> {
        let from = Path::from(from_key.to_string());
        let to = Path::from(to_key.to_string());
        match self.store.copy(&from, &to).await {
            Ok(()) => Ok(()),
            Err(object_store::Error::NotFound { .. }) => {
                Err(StorageError::NotFound(from_key.to_string()))
            }
            Err(e) => Err(StorageError::CopyFailed(format!(
                "Copy failed {} -> {}: {}",
                from_key, to_key, e
            ))),
        }
    }

    #[tracing::instrument(skip(self), fields(s3.bucket = %self.bucket, s3.key = %key, s3.operation = "DeleteObject"))]
    async fn delete(&self, key: &str) -> StorageResult<()> {
        let location = Path::from(key.to_string());
        match self.store.delete(&location).await {
            Ok(()) => Ok(()),
            Err(object_store::Error::NotFound { .. }) => Ok(()),
            Err(e) => Err(StorageError::DeleteFailed(format!("Delete failed for {}: {}", key, e))),
        }
    }

    #[tracing::instrument(skip(self), fields(s3.bucket = %self.bucket, s3.operation = "ListObjectsV2"))]
    async fn list_prefix(&self, prefix: &str) -> StorageResult<Vec<String>> {
        let prefix_path = Path::from(prefix.trim_end_matches('/').to_string());
        let metas: Vec<object_store::ObjectMeta> = self
            .store
            .list(Some(&prefix_path))
            .try_collect()
            .await
            .map_err(|e| StorageError::ListFailed(format!("List failed for {}: {}", prefix, e)))?;

        let mut keys: Vec<String> = metas
            .into_iter()
            .map(|meta| meta.location.to_string())
            .filter(|key| key.starts_with(prefix))
            .collect();
        keys.sort();
        Ok(keys)
    }

    /// Generate a presigned PUT URL for direct uploads.
    ///
    /// The URL is scoped to a single key and time-limited; it carries no
    /// bucket-wide capability.
    #[tracing::instrument(skip(self), fields(s3.bucket = %self.bucket, s3.key = %key))]
    async fn presigned_put_url(
        &self,
        key: &str,
        _content_type: &str,
        expires_in: Duration,
    ) -> StorageResult<String> {
        let location = Path::from(key.to_string());
        let url = self
            .store
            .signed_url(Method::PUT, &location, expires_in)
            .await
            .map_err(|e| {
                StorageError::BackendError(format!("Failed to generate presigned URL: {}", e))
            })?;

        tracing::info!(expires_in_seconds = expires_in.as_secs(), "Generated presigned PUT URL");

        Ok(url.to_string())
    }

    fn public_url(&self, key: &str) -> String {
        if let Some(ref endpoint) = self.endpoint_url {
            // Path-style for S3-compatible providers: {endpoint}/{bucket}/{key}
            format!("{}/{}/{}", endpoint.trim_end_matches('/'), self.bucket, key)
        } else {
            format!("https://{}.s3.{}.amazonaws.com/{}", self.bucket, self.region, key)
        }
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::S3
    }
}
