//! Content-name sanitization.
//!
//! Tour names become storage key segments, so they must be deterministic and
//! must never produce an empty or path-traversal-capable string.

/// Derive a safe content name from a raw name.
///
/// Characters outside `[A-Za-z0-9_-]` are replaced with underscores. A name
/// that sanitizes to nothing but underscores or is empty yields `None`;
/// callers reject the input rather than guessing.
pub fn derive_safe_name(raw: &str) -> Option<String> {
    let sanitized: String = raw
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if sanitized.is_empty() || sanitized.chars().all(|c| c == '_') {
        return None;
    }

    Some(sanitized)
}

/// Derive a safe content name from an inbox object key: strip the inbox
/// prefix and the extension, then sanitize the remainder.
pub fn safe_name_from_object_key(key: &str, inbox_prefix: &str) -> Option<String> {
    let stem = key.strip_prefix(inbox_prefix)?;
    let stem = stem.rsplit_once('.').map(|(base, _ext)| base).unwrap_or(stem);
    derive_safe_name(stem)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_safe_name_passthrough() {
        assert_eq!(derive_safe_name("museum-tour_01"), Some("museum-tour_01".to_string()));
    }

    #[test]
    fn test_derive_safe_name_replaces_unsafe_chars() {
        assert_eq!(derive_safe_name("my tour (v2)"), Some("my_tour__v2_".to_string()));
        assert_eq!(derive_safe_name("../../etc/passwd"), Some("______etc_passwd".to_string()));
        assert_eq!(derive_safe_name("café"), Some("caf_".to_string()));
    }

    #[test]
    fn test_derive_safe_name_is_deterministic() {
        assert_eq!(derive_safe_name("a/b c"), derive_safe_name("a/b c"));
    }

    #[test]
    fn test_derive_safe_name_rejects_degenerate_input() {
        assert_eq!(derive_safe_name(""), None);
        assert_eq!(derive_safe_name("///"), None);
        assert_eq!(derive_safe_name(".."), None);
        assert_eq!(derive_safe_name("   "), None);
    }

    #[test]
    fn test_safe_name_from_object_key() {
        assert_eq!(
            safe_name_from_object_key("uploads/museum-tour.zip", "uploads/"),
            Some("museum-tour".to_string())
        );
        // Key outside the inbox prefix is rejected
        assert_eq!(safe_name_from_object_key("tours/museum-tour.zip", "uploads/"), None);
        // No extension still works
        assert_eq!(
            safe_name_from_object_key("uploads/museum", "uploads/"),
            Some("museum".to_string())
        );
    }
}
