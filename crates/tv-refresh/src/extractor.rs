//! Per-track metadata extraction.

use crate::error::ExtractError;
use chrono::{DateTime, Utc};
use percent_encoding::percent_decode_str;
use std::path::{Path, PathBuf};
use tv_core::{EnrichedFields, TrackRecord};

/// Result of asking an extractor about one track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    /// Fields re-derived from the track's resource.
    Enriched(EnrichedFields),
    /// The track has no resource this extractor can read.
    Skipped,
}

/// Re-derives a track's metadata from its backing resource.
pub trait MetadataExtractor: Send + Sync {
    fn extract(&self, track: &TrackRecord) -> Result<Extraction, ExtractError>;
}

/// Extractor that probes local files.
///
/// Reads size and modification time from the filesystem and, for untitled
/// tracks, derives a title from the file name. Non-`file://` URIs are
/// skipped.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileProbeExtractor;

impl MetadataExtractor for FileProbeExtractor {
    fn extract(&self, track: &TrackRecord) -> Result<Extraction, ExtractError> {
        if !track.is_file() {
            return Ok(Extraction::Skipped);
        }
        let Some(path) = track.uri.as_deref().and_then(file_uri_to_path) else {
            return Ok(Extraction::Skipped);
        };

        let meta = std::fs::metadata(&path).map_err(|source| ExtractError::Io {
            path: path.clone(),
            source,
        })?;
        if !meta.is_file() {
            return Err(ExtractError::NotAFile { path });
        }

        let file_modified_stamp = meta
            .modified()
            .ok()
            .map(|modified| DateTime::<Utc>::from(modified).timestamp());
        let untitled = track
            .title
            .as_deref()
            .map_or(true, |title| title.trim().is_empty());
        let title = if untitled { title_from_path(&path) } else { None };

        Ok(Extraction::Enriched(EnrichedFields {
            title,
            file_size: i64::try_from(meta.len()).ok(),
            file_modified_stamp,
            ..EnrichedFields::default()
        }))
    }
}

/// Local path for a `file://` URI, percent-decoded.
///
/// Returns `None` for any other scheme or a non-local host.
pub fn file_uri_to_path(uri: &str) -> Option<PathBuf> {
    let rest = uri.strip_prefix("file://")?;
    let rest = rest.strip_prefix("localhost").unwrap_or(rest);
    if !rest.starts_with('/') {
        return None;
    }
    let decoded = percent_decode_str(rest).decode_utf8_lossy();
    Some(PathBuf::from(decoded.as_ref()))
}

fn title_from_path(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_string_lossy();
    let title = stem.replace('_', " ");
    let title = title.trim();
    (!title.is_empty()).then(|| title.to_string())
}

#[cfg(test)]
#[path = "extractor_test.rs"]
mod tests;
