//! Object store gateway
//!
//! Thin capability wrapper over the storage provider: `head`, `get`, `put`,
//! `copy`, `delete`, `list_prefix`, and presigned direct-upload URLs. No
//! business logic lives here; key layout conventions are in [`keys`].

pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

pub use factory::create_object_store;
pub use keys::{ARCHIVE_PREFIX, INBOX_PREFIX, PUBLISH_PREFIX};
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
pub use panopub_core::StorageBackend;
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use traits::{ObjectMeta, ObjectStore, StorageError, StorageResult};
