//! Version 1: create a new store, or convert a legacy library into one.
//!
//! Three starting points are recognized:
//!
//! - `core_tracks` exists: the store already has the current table lineage
//!   but no recorded version, so the incremental steps take it from here.
//! - `tracks` exists: a flat legacy library. The latest schema is created,
//!   the legacy rows are converted on a worker thread, and the legacy
//!   tables are dropped.
//! - Neither: a brand-new store, created directly at the latest version.
//!
//! The legacy layout is `tracks(track_id, uri, mime_type, artist,
//! album_title, title, genre, year, track_number, track_count, duration,
//! rating, number_of_plays, last_played_stamp, date_added_stamp,
//! release_date)` with `duration` in seconds, plus optional `playlists` and
//! `playlist_entries` tables. Older layouts lack `playlists.sort_column`,
//! `playlists.sort_type`, and `playlist_entries.view_order`.

use super::step::{Continuation, StepContext};
use crate::ddl::{
    INITIALIZE_ENTRY_ORDER, LATEST_INDEXES, LATEST_TABLES, LEGACY_ENTITIES, LIBRARY_TABLES,
    NORMALIZE_BLANK_TEXT,
};
use crate::error::{StoreError, StoreResult};
use crate::events::{EventBus, MigrationEvent};
use crate::ledger;
use crate::query::{column_exists, table_exists, table_row_count};
use duckdb::Connection;
use std::time::Duration;

/// Table that identifies a legacy library.
pub const LEGACY_TRACKS_TABLE: &str = "tracks";

const LEGACY_TABLES: &[&str] = &["playlist_entries", "playlists", "tracks"];

const IMPORT_TITLE: &str = "Upgrading your library";
const IMPORT_MESSAGE: &str =
    "Your music library is being converted to a new format. This may take a few minutes.";

/// Rows carried over by a legacy import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportStats {
    pub artists: i64,
    pub albums: i64,
    pub tracks: i64,
    pub playlists: i64,
    pub playlist_entries: i64,
}

/// Step body for version 1.
pub fn bootstrap_or_import(ctx: &mut StepContext<'_>) -> StoreResult<Continuation> {
    if table_exists(ctx.conn(), "core_tracks")? {
        log::debug!("Unversioned library found; continuing with incremental steps");
        return Ok(Continuation::Continue);
    }

    if table_exists(ctx.conn(), LEGACY_TRACKS_TABLE)? {
        import_legacy(ctx)?;
    } else {
        create_fresh(ctx)?;
    }
    Ok(Continuation::StopButMarkComplete)
}

fn create_fresh(ctx: &mut StepContext<'_>) -> StoreResult<()> {
    let settings = *ctx.settings();
    let conn = ctx.conn();
    log::info!(
        "Creating new library database at v{:03}",
        settings.target_version
    );

    drop_library_tables(conn)?;
    conn.execute_batch(LATEST_TABLES)?;
    conn.execute_batch(LATEST_INDEXES)?;
    ledger::write_db_version(conn, settings.target_version)?;
    ledger::write_meta_version(conn, settings.metadata_target)?;
    Ok(())
}

fn import_legacy(ctx: &mut StepContext<'_>) -> StoreResult<()> {
    let (conn, events, settings) = ctx.parts();
    log::info!("Legacy library found; importing");

    drop_library_tables(conn)?;
    conn.execute_batch(LATEST_TABLES)?;
    // Zero so the metadata refresh runs once the import commits.
    ledger::write_meta_version(conn, 0)?;

    events.emit(&MigrationEvent::SlowOperationStarted {
        title: IMPORT_TITLE.to_string(),
        message: IMPORT_MESSAGE.to_string(),
    });
    let result = run_on_worker(conn, events, settings.pulse_interval, convert_legacy);
    events.emit(&MigrationEvent::SlowOperationFinished);
    let stats = result?;

    conn.execute_batch(LATEST_INDEXES)?;
    log::info!(
        "Imported {} tracks, {} artists, {} albums, {} playlists ({} entries)",
        stats.tracks,
        stats.artists,
        stats.albums,
        stats.playlists,
        stats.playlist_entries
    );
    Ok(())
}

/// Run `work` on a dedicated thread that borrows `conn`, emitting a
/// [`MigrationEvent::SlowOperationPulse`] every `pulse` until it finishes.
///
/// The connection stays inside the caller's open transaction throughout. A
/// panic on the worker is reported as [`StoreError::LegacyImportError`].
pub fn run_on_worker<T, F>(
    conn: &mut Connection,
    events: &EventBus,
    pulse: Duration,
    work: F,
) -> StoreResult<T>
where
    F: FnOnce(&mut Connection) -> StoreResult<T> + Send,
    T: Send,
{
    let (done_tx, done_rx) = crossbeam_channel::bounded::<StoreResult<T>>(1);
    let ticker = crossbeam_channel::tick(pulse.max(Duration::from_millis(1)));

    std::thread::scope(|scope| {
        let handle = std::thread::Builder::new()
            .name("library-importer".to_string())
            .spawn_scoped(scope, move || {
                let _ = done_tx.send(work(conn));
            })
            .map_err(|e| StoreError::LegacyImportError(format!("failed to start worker: {e}")))?;

        let outcome = loop {
            crossbeam_channel::select! {
                recv(done_rx) -> msg => break msg.ok(),
                recv(ticker) -> _ => events.emit(&MigrationEvent::SlowOperationPulse),
            }
        };

        match handle.join() {
            Err(_) => Err(StoreError::LegacyImportError(
                "worker thread panicked".to_string(),
            )),
            Ok(()) => outcome.unwrap_or_else(|| {
                Err(StoreError::LegacyImportError(
                    "worker exited without a result".to_string(),
                ))
            }),
        }
    })
}

/// Bulk conversion of the legacy tables. Runs on the worker thread.
fn convert_legacy(conn: &mut Connection) -> StoreResult<ImportStats> {
    import_step(conn, LEGACY_ENTITIES, "artists, albums, and tracks")?;

    if table_exists(conn, "playlists")? {
        let sql = if column_exists(conn, "playlists", "sort_column")?
            && column_exists(conn, "playlists", "sort_type")?
        {
            "INSERT INTO core_playlists (playlist_id, name, sort_column, sort_type, primary_source_id)
             SELECT playlist_id, name, coalesce(sort_column, -1), coalesce(sort_type, 0), 1
             FROM playlists"
        } else {
            log::debug!("Legacy playlists have no sort settings");
            "INSERT INTO core_playlists (playlist_id, name, primary_source_id)
             SELECT playlist_id, name, 1 FROM playlists"
        };
        import_step(conn, sql, "playlists")?;
    }

    if table_exists(conn, "playlist_entries")? {
        let sql = if column_exists(conn, "playlist_entries", "view_order")? {
            "INSERT INTO core_playlist_entries (entry_id, playlist_id, track_id, view_order)
             SELECT entry_id, playlist_id, track_id, coalesce(view_order, 0)
             FROM playlist_entries
             WHERE track_id IN (SELECT track_id FROM core_tracks)"
        } else {
            "INSERT INTO core_playlist_entries (entry_id, playlist_id, track_id, view_order)
             SELECT entry_id, playlist_id, track_id, 0
             FROM playlist_entries
             WHERE track_id IN (SELECT track_id FROM core_tracks)"
        };
        import_step(conn, sql, "playlist entries")?;
    }

    import_step(conn, INITIALIZE_ENTRY_ORDER, "playlist entry order")?;
    import_step(conn, NORMALIZE_BLANK_TEXT, "blank text normalization")?;

    let stats = ImportStats {
        artists: table_row_count(conn, "core_artists")?,
        albums: table_row_count(conn, "core_albums")?,
        tracks: table_row_count(conn, "core_tracks")?,
        playlists: table_row_count(conn, "core_playlists")?,
        playlist_entries: table_row_count(conn, "core_playlist_entries")?,
    };

    for table in LEGACY_TABLES {
        import_step(
            conn,
            &format!("DROP TABLE IF EXISTS {table}"),
            "legacy table removal",
        )?;
    }
    Ok(stats)
}

fn import_step(conn: &Connection, sql: &str, what: &str) -> StoreResult<()> {
    log::debug!("Legacy import: {what}");
    conn.execute_batch(sql)
        .map_err(|e| StoreError::LegacyImportError(format!("{what}: {e}")))
}

fn drop_library_tables(conn: &Connection) -> StoreResult<()> {
    for table in LIBRARY_TABLES {
        conn.execute_batch(&format!("DROP TABLE IF EXISTS {table}"))?;
    }
    Ok(())
}

#[cfg(test)]
#[path = "legacy_test.rs"]
mod tests;
