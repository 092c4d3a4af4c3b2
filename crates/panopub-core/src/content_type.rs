//! Extension→MIME table used when republishing extracted tour entries.
//!
//! This table is part of the processor contract: published objects must carry
//! exactly these content types so CDN and browser behavior is predictable.
//! Unrecognized extensions fall back to `application/octet-stream`.

use std::path::Path;

/// Fallback MIME type for unrecognized extensions.
pub const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// Map a file extension (lowercase, without the dot) to its MIME type.
pub fn content_type_for_extension(extension: &str) -> &'static str {
    match extension {
        "html" | "htm" => "text/html",
        "js" => "application/javascript",
        "css" => "text/css",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        "json" => "application/json",
        "mp4" => "video/mp4",
        "mov" => "video/quicktime",
        "avi" => "video/x-msvideo",
        "pdf" => "application/pdf",
        "zip" => "application/zip",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        _ => FALLBACK_CONTENT_TYPE,
    }
}

/// Map a file path to its MIME type by extension. Paths without an extension
/// get the fallback type.
pub fn content_type_for_path(path: &str) -> &'static str {
    Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .map(|e| content_type_for_extension(&e))
        .unwrap_or(FALLBACK_CONTENT_TYPE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_table() {
        let cases = [
            ("html", "text/html"),
            ("htm", "text/html"),
            ("js", "application/javascript"),
            ("css", "text/css"),
            ("png", "image/png"),
            ("jpg", "image/jpeg"),
            ("jpeg", "image/jpeg"),
            ("gif", "image/gif"),
            ("svg", "image/svg+xml"),
            ("ico", "image/x-icon"),
            ("json", "application/json"),
            ("mp4", "video/mp4"),
            ("mov", "video/quicktime"),
            ("avi", "video/x-msvideo"),
            ("pdf", "application/pdf"),
            ("zip", "application/zip"),
            ("woff", "font/woff"),
            ("woff2", "font/woff2"),
            ("ttf", "font/ttf"),
        ];
        for (ext, expected) in cases {
            assert_eq!(content_type_for_extension(ext), expected, "extension {}", ext);
        }
    }

    #[test]
    fn test_unknown_extension_falls_back() {
        assert_eq!(content_type_for_extension("xyz"), FALLBACK_CONTENT_TYPE);
        assert_eq!(content_type_for_extension(""), FALLBACK_CONTENT_TYPE);
    }

    #[test]
    fn test_content_type_for_path() {
        assert_eq!(content_type_for_path("index.html"), "text/html");
        assert_eq!(content_type_for_path("media/panos/p1.JPG"), "image/jpeg");
        assert_eq!(content_type_for_path("lib/tour.min.js"), "application/javascript");
        assert_eq!(content_type_for_path("README"), FALLBACK_CONTENT_TYPE);
        assert_eq!(content_type_for_path("data.xyz"), FALLBACK_CONTENT_TYPE);
    }
}
