//! CDN cache invalidation collaborator.
//!
//! Invalidation failure is never fatal to a processing run: the content is
//! already correctly published, and cache staleness is acceptable where a
//! failed publish is not.

use async_trait::async_trait;

/// Capability to invalidate cached objects under a prefix.
#[async_trait]
pub trait CdnInvalidator: Send + Sync {
    async fn invalidate_prefix(&self, prefix: &str) -> Result<(), anyhow::Error>;
}

/// Default invalidator for deployments without a CDN in front of the bucket.
pub struct NoopCdn;

#[async_trait]
impl CdnInvalidator for NoopCdn {
    async fn invalidate_prefix(&self, prefix: &str) -> Result<(), anyhow::Error> {
        tracing::debug!(prefix = %prefix, "CDN invalidation skipped (no CDN configured)");
        Ok(())
    }
}
