//! Shared storage key layout.
//!
//! Layout: inbox archives at `uploads/{name}.zip`, published tours under
//! `tours/{name}/`, soft-deleted content under `archive/{content_id}/{ts}/`.
//! All backends and services must use these helpers for consistency.

use chrono::{DateTime, Utc};

/// Prefix for freshly uploaded, not-yet-processed archives.
pub const INBOX_PREFIX: &str = "uploads/";

/// Prefix for published, publicly servable tour content.
pub const PUBLISH_PREFIX: &str = "tours/";

/// Prefix for archived (soft-deleted) tour content.
pub const ARCHIVE_PREFIX: &str = "archive/";

/// Inbox key for an uploaded archive, keyed by the sanitized tour name.
pub fn inbox_key(safe_name: &str) -> String {
    format!("{}{}.zip", INBOX_PREFIX, safe_name)
}

/// Publish prefix for a tour, keyed by the sanitized tour name.
/// Updates republish into the same prefix, so the name determines identity
/// at the storage layer.
pub fn publish_prefix(safe_name: &str) -> String {
    format!("{}{}/", PUBLISH_PREFIX, safe_name)
}

/// Key for one extracted entry under a tour's publish prefix.
pub fn published_entry_key(publish_prefix: &str, entry_path: &str) -> String {
    format!("{}{}", publish_prefix, entry_path)
}

/// Archive prefix for a soft-deleted tour, stamped with the archival time so
/// repeated archive/restore cycles never collide.
pub fn archive_prefix_for(content_id: &str, archived_at: DateTime<Utc>) -> String {
    format!("{}{}/{}/", ARCHIVE_PREFIX, content_id, archived_at.timestamp())
}

/// Whether a key lies inside the inbox prefix.
pub fn is_inbox_key(key: &str) -> bool {
    key.starts_with(INBOX_PREFIX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_inbox_key() {
        assert_eq!(inbox_key("museum-tour"), "uploads/museum-tour.zip");
    }

    #[test]
    fn test_publish_prefix() {
        assert_eq!(publish_prefix("museum-tour"), "tours/museum-tour/");
        assert_eq!(
            published_entry_key(&publish_prefix("museum-tour"), "media/pano1.jpg"),
            "tours/museum-tour/media/pano1.jpg"
        );
    }

    #[test]
    fn test_archive_prefix_is_timestamped() {
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        assert_eq!(
            archive_prefix_for("abc123", at),
            format!("archive/abc123/{}/", at.timestamp())
        );
    }

    #[test]
    fn test_is_inbox_key() {
        assert!(is_inbox_key("uploads/museum.zip"));
        assert!(!is_inbox_key("tours/museum/index.html"));
    }
}
