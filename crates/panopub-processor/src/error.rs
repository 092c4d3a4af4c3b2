use panopub_storage::StorageError;
use thiserror::Error;

/// Processing pipeline errors
#[derive(Debug, Error)]
pub enum ProcessorError {
    #[error("Object outside the inbox prefix: {0}")]
    OutsideInbox(String),

    #[error("Unsupported archive type: {0}")]
    UnsupportedType(String),

    #[error("Archive too large: {size} bytes (max: {max} bytes)")]
    TooLarge { size: u64, max: u64 },

    #[error("Cannot derive a safe content name from key: {0}")]
    UnusableName(String),

    #[error("Archive contains no files")]
    EmptyArchive,

    #[error("Corrupt archive: {0}")]
    CorruptArchive(String),

    #[error("Unsafe archive entry: {0}")]
    UnsafeEntry(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Report delivery failed: {0}")]
    Report(String),
}
