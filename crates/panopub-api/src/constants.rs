/// API version prefix for operator endpoints.
pub const API_PREFIX: &str = "/api/v0";

/// Content types accepted for uploaded tour archives.
pub const ACCEPTED_ARCHIVE_CONTENT_TYPES: &[&str] =
    &["application/zip", "application/x-zip-compressed"];

/// Extension accepted for uploaded tour archives.
pub const ACCEPTED_ARCHIVE_EXTENSION: &str = "zip";
