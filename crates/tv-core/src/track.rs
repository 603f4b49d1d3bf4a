//! Track records and the enrichment fields re-derived for them.

use crate::checksum::compute_checksum;
use serde::{Deserialize, Serialize};

/// A library track as read for metadata refresh.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackRecord {
    pub track_id: i64,
    pub uri: Option<String>,
    pub title: Option<String>,
    pub artist_name: Option<String>,
    pub album_title: Option<String>,
    pub genre: Option<String>,
    pub track_number: Option<i32>,
    pub year: Option<i32>,
    pub bpm: Option<i32>,
    pub bit_rate: Option<i32>,
    pub file_size: Option<i64>,
    pub file_modified_stamp: Option<i64>,
}

/// Fields an extractor re-derived from a track's backing resource.
///
/// `None` means "not known", never "clear this field".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichedFields {
    pub title: Option<String>,
    pub genre: Option<String>,
    pub track_number: Option<i32>,
    pub year: Option<i32>,
    pub bpm: Option<i32>,
    pub bit_rate: Option<i32>,
    pub file_size: Option<i64>,
    pub file_modified_stamp: Option<i64>,
}

impl EnrichedFields {
    /// True when no field was derived.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl TrackRecord {
    /// Whether the track is backed by a local file.
    pub fn is_file(&self) -> bool {
        self.uri
            .as_deref()
            .is_some_and(|uri| uri.starts_with("file://"))
    }

    /// Merge enriched fields over the record. Blank strings are ignored.
    pub fn apply(&mut self, fields: &EnrichedFields) {
        merge_text(&mut self.title, &fields.title);
        merge_text(&mut self.genre, &fields.genre);
        merge(&mut self.track_number, fields.track_number);
        merge(&mut self.year, fields.year);
        merge(&mut self.bpm, fields.bpm);
        merge(&mut self.bit_rate, fields.bit_rate);
        merge(&mut self.file_size, fields.file_size);
        merge(&mut self.file_modified_stamp, fields.file_modified_stamp);
    }

    /// Lowercased title used for sorting and search.
    pub fn title_lowered(&self) -> Option<String> {
        self.title.as_deref().map(str::to_lowercase)
    }

    /// Hash over the user-visible tag fields.
    ///
    /// Two tracks with the same album, artist, genre, title, number, and
    /// year hash identically regardless of file location.
    pub fn metadata_hash(&self) -> String {
        let track_number = self.track_number.unwrap_or(0).to_string();
        let year = self.year.unwrap_or(0).to_string();
        compute_checksum([
            self.album_title.as_deref().unwrap_or_default(),
            self.artist_name.as_deref().unwrap_or_default(),
            self.genre.as_deref().unwrap_or_default(),
            self.title.as_deref().unwrap_or_default(),
            track_number.as_str(),
            year.as_str(),
        ])
    }
}

fn merge<T: Copy>(slot: &mut Option<T>, value: Option<T>) {
    if value.is_some() {
        *slot = value;
    }
}

fn merge_text(slot: &mut Option<String>, value: &Option<String>) {
    if let Some(v) = value.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
        *slot = Some(v.to_string());
    }
}

#[cfg(test)]
#[path = "track_test.rs"]
mod tests;
