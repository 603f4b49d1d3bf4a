//! Track reads and per-track metadata writes for the refresh pass.

use crate::error::{StoreError, StoreResult};
use duckdb::Connection;
use tv_core::TrackRecord;

/// Number of tracks in the library.
pub fn count_tracks(conn: &Connection) -> StoreResult<i64> {
    conn.query_row("SELECT COUNT(*) FROM core_tracks", [], |row| row.get(0))
        .map_err(|e| StoreError::QueryError(format!("count core_tracks: {e}")))
}

/// Load every track with its artist and album names, ordered by id.
pub fn load_tracks(conn: &Connection) -> StoreResult<Vec<TrackRecord>> {
    let mut stmt = conn
        .prepare(
            "SELECT t.track_id, t.uri, t.title, ar.name, al.title, t.genre,
                    t.track_number, t.year, t.bpm, t.bit_rate, t.file_size,
                    t.file_modified_stamp
             FROM core_tracks t
             LEFT JOIN core_artists ar ON ar.artist_id = t.artist_id
             LEFT JOIN core_albums al ON al.album_id = t.album_id
             ORDER BY t.track_id",
        )
        .map_err(|e| StoreError::QueryError(format!("prepare load_tracks: {e}")))?;

    let tracks = stmt
        .query_map([], |row| {
            Ok(TrackRecord {
                track_id: row.get(0)?,
                uri: row.get(1)?,
                title: row.get(2)?,
                artist_name: row.get(3)?,
                album_title: row.get(4)?,
                genre: row.get(5)?,
                track_number: row.get(6)?,
                year: row.get(7)?,
                bpm: row.get(8)?,
                bit_rate: row.get(9)?,
                file_size: row.get(10)?,
                file_modified_stamp: row.get(11)?,
            })
        })
        .map_err(|e| StoreError::QueryError(format!("load_tracks: {e}")))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| StoreError::QueryError(format!("load_tracks row: {e}")))?;
    Ok(tracks)
}

/// Write a track's re-derived metadata back to `core_tracks`.
///
/// Recomputes the derived `title_lowered` and `metadata_hash` columns and
/// stamps `date_updated_stamp`. Fails when the track no longer exists.
pub fn save_track_metadata(
    conn: &Connection,
    track: &TrackRecord,
    updated_stamp: i64,
) -> StoreResult<()> {
    let changed = conn
        .execute(
            "UPDATE core_tracks
             SET title = ?, title_lowered = ?, genre = ?, track_number = ?, year = ?,
                 bpm = ?, bit_rate = ?, file_size = ?, file_modified_stamp = ?,
                 metadata_hash = ?, date_updated_stamp = ?
             WHERE track_id = ?",
            duckdb::params![
                track.title,
                track.title_lowered(),
                track.genre,
                track.track_number,
                track.year,
                track.bpm,
                track.bit_rate,
                track.file_size,
                track.file_modified_stamp,
                track.metadata_hash(),
                updated_stamp,
                track.track_id,
            ],
        )
        .map_err(|e| StoreError::QueryError(format!("update track {}: {e}", track.track_id)))?;

    if changed == 0 {
        return Err(StoreError::QueryError(format!(
            "track {} no longer exists",
            track.track_id
        )));
    }
    Ok(())
}

#[cfg(test)]
#[path = "tracks_test.rs"]
mod tests;
