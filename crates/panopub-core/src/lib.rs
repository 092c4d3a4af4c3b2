//! Panopub core types
//!
//! Shared domain models, configuration, error types, and the pieces of the
//! processor contract both sides must agree on bit-for-bit: the
//! extension→MIME table, content-name sanitization, and report signing.

pub mod config;
pub mod content_type;
pub mod error;
pub mod models;
pub mod sanitize;
pub mod signature;
pub mod storage_types;

pub use config::Config;
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use storage_types::StorageBackend;
