//! Archive extraction.

use crate::error::ProcessorError;
use panopub_core::content_type::content_type_for_path;
use std::io::{Cursor, Read};
use zip::ZipArchive;

/// One extracted archive entry, ready to republish.
#[derive(Debug)]
pub struct TourEntry {
    /// Entry path relative to the archive root, forward slashes
    pub path: String,
    pub data: Vec<u8>,
    pub content_type: &'static str,
}

/// Extract every file entry from a zip archive.
///
/// Directory entries are skipped. Entry names are taken through
/// `enclosed_name`, so absolute paths and `..` components are rejected
/// outright rather than sanitized. An archive with no file entries is an
/// error; it would publish an empty tour.
pub fn extract_entries(archive_bytes: &[u8]) -> Result<Vec<TourEntry>, ProcessorError> {
    let mut archive = ZipArchive::new(Cursor::new(archive_bytes))
        .map_err(|e| ProcessorError::CorruptArchive(e.to_string()))?;

    let mut entries = Vec::new();

    for index in 0..archive.len() {
        let mut entry = archive
            .by_index(index)
            .map_err(|e| ProcessorError::CorruptArchive(e.to_string()))?;

        if entry.is_dir() {
            continue;
        }

        let raw_name = entry.name().to_string();
        let path = entry
            .enclosed_name()
            .map(|p| p.to_string_lossy().replace('\\', "/"))
            .ok_or_else(|| ProcessorError::UnsafeEntry(raw_name.clone()))?;

        let mut data = Vec::with_capacity(entry.size() as usize);
        entry
            .read_to_end(&mut data)
            .map_err(|e| ProcessorError::CorruptArchive(format!("{}: {}", raw_name, e)))?;

        let content_type = content_type_for_path(&path);

        entries.push(TourEntry {
            path,
            data,
            content_type,
        });
    }

    if entries.is_empty() {
        return Err(ProcessorError::EmptyArchive);
    }

    Ok(entries)
}
