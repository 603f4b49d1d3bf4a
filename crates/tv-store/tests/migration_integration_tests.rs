//! Integration tests for the library migration engine.
//!
//! These drive [`Migrator::for_library`] against in-memory and on-disk
//! DuckDB stores seeded from the SQL fixtures in `tests/fixtures/`.

use std::sync::{Arc, Mutex};
use tv_store::query::{list_tables, table_exists, table_row_count};
use tv_store::{
    LedgerVersions, LibraryDb, MigrationEvent, MigrationOutcome, Migrator, StoreError,
    CURRENT_METADATA_VERSION,
};

// ── Helpers ────────────────────────────────────────────────────────────

const BASE_V001: &str = include_str!("fixtures/base_v001.sql");
const LEGACY_STORE: &str = include_str!("fixtures/legacy_store.sql");
const LEGACY_STORE_OLD_PLAYLISTS: &str = include_str!("fixtures/legacy_store_old_playlists.sql");

fn seeded(sql: &str) -> LibraryDb {
    let db = LibraryDb::open_memory().unwrap();
    db.conn().execute_batch(sql).unwrap();
    db
}

fn migrate(db: &mut LibraryDb) -> tv_store::MigrationRun {
    Migrator::for_library().unwrap().migrate(db).unwrap()
}

fn record_events(migrator: &Migrator) -> Arc<Mutex<Vec<MigrationEvent>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    migrator
        .events()
        .subscribe(move |event| sink.lock().unwrap().push(event.clone()));
    seen
}

/// Every column of every table, in catalog order.
fn column_shape(db: &LibraryDb) -> Vec<(String, String, i64, String, Option<String>, String)> {
    let mut stmt = db
        .conn()
        .prepare(
            "SELECT table_name, column_name, CAST(ordinal_position AS BIGINT), data_type,
                    column_default, is_nullable
             FROM information_schema.columns
             WHERE table_schema = 'main'
             ORDER BY table_name, ordinal_position",
        )
        .unwrap();
    stmt.query_map([], |row| {
        Ok((
            row.get(0)?,
            row.get(1)?,
            row.get(2)?,
            row.get(3)?,
            row.get(4)?,
            row.get(5)?,
        ))
    })
    .unwrap()
    .collect::<Result<Vec<_>, _>>()
    .unwrap()
}

/// Every explicit index as `(table, index, is_unique)`.
fn index_shape(db: &LibraryDb) -> Vec<(String, String, bool)> {
    let mut stmt = db
        .conn()
        .prepare(
            "SELECT table_name, index_name, is_unique FROM duckdb_indexes()
             WHERE schema_name = 'main'
             ORDER BY table_name, index_name",
        )
        .unwrap();
    stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap()
}

fn ledger_rows(db: &LibraryDb) -> Vec<(String, String)> {
    let mut stmt = db
        .conn()
        .prepare("SELECT key, value FROM core_configuration ORDER BY key")
        .unwrap();
    stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap()
}

fn query_i64(db: &LibraryDb, sql: &str) -> Option<i64> {
    db.conn().query_row(sql, [], |row| row.get(0)).unwrap()
}

fn query_text(db: &LibraryDb, sql: &str) -> Option<String> {
    db.conn().query_row(sql, [], |row| row.get(0)).unwrap()
}

// ── Fresh store ────────────────────────────────────────────────────────

#[test]
fn test_fresh_store_bootstrap() {
    let mut db = LibraryDb::open_memory().unwrap();
    let run = migrate(&mut db);

    assert_eq!(run.outcome, MigrationOutcome::Committed);
    assert_eq!(run.from_version, 0);
    assert_eq!(run.to_version, 13);
    let versions = LedgerVersions::read(db.conn()).unwrap();
    assert_eq!(versions.database, 13);
    assert_eq!(versions.metadata, CURRENT_METADATA_VERSION);
}

#[test]
fn test_second_run_is_not_needed() {
    let mut db = LibraryDb::open_memory().unwrap();
    let mut migrator = Migrator::for_library().unwrap();

    migrator.migrate(&mut db).unwrap();
    let before = ledger_rows(&db);
    let run = migrator.migrate(&mut db).unwrap();

    assert_eq!(run.outcome, MigrationOutcome::NotNeeded);
    assert!(run.steps_applied.is_empty());
    assert_eq!(ledger_rows(&db), before);
}

#[test]
fn test_fresh_schema_matches_incremental_upgrade() {
    let mut fresh = LibraryDb::open_memory().unwrap();
    migrate(&mut fresh);

    let mut upgraded = seeded(BASE_V001);
    let run = migrate(&mut upgraded);
    assert_eq!(run.steps_applied, (2..=13).collect::<Vec<_>>());

    assert_eq!(list_tables(fresh.conn()).unwrap(), list_tables(upgraded.conn()).unwrap());
    assert_eq!(column_shape(&fresh), column_shape(&upgraded));
    assert_eq!(index_shape(&fresh), index_shape(&upgraded));
}

#[test]
fn test_on_disk_store_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("library.duckdb");

    {
        let mut db = LibraryDb::open(&path).unwrap();
        migrate(&mut db);
    }

    let mut db = LibraryDb::open(&path).unwrap();
    let run = migrate(&mut db);
    assert_eq!(run.outcome, MigrationOutcome::NotNeeded);
    assert_eq!(LedgerVersions::read(db.conn()).unwrap().database, 13);
}

// ── Incremental upgrade ────────────────────────────────────────────────

#[test]
fn test_incremental_upgrade_transforms_rows() {
    let mut db = seeded(BASE_V001);
    migrate(&mut db);

    assert_eq!(
        query_text(&db, "SELECT title_lowered FROM core_tracks WHERE track_id = 2").as_deref(),
        Some("jóga")
    );
    assert_eq!(
        query_text(&db, "SELECT name_lowered FROM core_artists WHERE artist_id = 1").as_deref(),
        Some("miles davis")
    );
    assert_eq!(query_text(&db, "SELECT genre FROM core_tracks WHERE track_id = 2"), None);
    assert_eq!(query_text(&db, "SELECT mime_type FROM core_tracks WHERE track_id = 2"), None);
    assert_eq!(query_i64(&db, "SELECT score FROM core_tracks WHERE track_id = 1"), Some(75));
    assert_eq!(query_i64(&db, "SELECT score FROM core_tracks WHERE track_id = 2"), Some(0));
    assert_eq!(
        query_i64(&db, "SELECT last_synced_stamp FROM core_tracks WHERE track_id = 3"),
        Some(1_400_000_200)
    );
    assert_eq!(
        query_i64(&db, "SELECT primary_source_id FROM core_playlists WHERE playlist_id = 2"),
        Some(1)
    );
}

#[test]
fn test_incremental_upgrade_keeps_rows_and_indexes() {
    let mut db = seeded(BASE_V001);
    let run = migrate(&mut db);
    assert_eq!(run.outcome, MigrationOutcome::Committed);

    assert_eq!(table_row_count(db.conn(), "core_tracks").unwrap(), 3);
    assert_eq!(table_row_count(db.conn(), "core_artists").unwrap(), 2);
    assert_eq!(table_row_count(db.conn(), "core_albums").unwrap(), 2);
    assert_eq!(table_row_count(db.conn(), "core_playlists").unwrap(), 2);
    assert_eq!(table_row_count(db.conn(), "core_playlist_entries").unwrap(), 4);
    assert!(!list_tables(db.conn())
        .unwrap()
        .iter()
        .any(|table| table.ends_with("_rebuild")));
    assert_eq!(index_shape(&db).len(), 6);
    assert_eq!(LedgerVersions::read(db.conn()).unwrap().database, 13);
}

#[test]
fn test_incremental_upgrade_orders_unordered_playlists() {
    let mut db = seeded(BASE_V001);
    migrate(&mut db);

    assert_eq!(
        query_i64(&db, "SELECT view_order FROM core_playlist_entries WHERE entry_id = 10"),
        Some(1)
    );
    assert_eq!(
        query_i64(&db, "SELECT view_order FROM core_playlist_entries WHERE entry_id = 11"),
        Some(2)
    );
    // Already ordered playlists are left alone.
    assert_eq!(
        query_i64(&db, "SELECT view_order FROM core_playlist_entries WHERE entry_id = 12"),
        Some(2)
    );
    assert_eq!(
        query_i64(&db, "SELECT view_order FROM core_playlist_entries WHERE entry_id = 13"),
        Some(1)
    );
}

#[test]
fn test_upgraded_store_has_stale_metadata() {
    let mut db = seeded(BASE_V001);
    let migrator = Migrator::for_library().unwrap();
    assert_eq!(migrator.pending(&db).unwrap().len(), 12);

    migrate(&mut db);
    let status = migrator.status(&db).unwrap();
    assert!(status.pending.is_empty());
    assert!(status.metadata_stale);
}

// ── Forward compatibility ──────────────────────────────────────────────

#[test]
fn test_newer_store_is_rejected_without_writes() {
    let mut db = LibraryDb::open_memory().unwrap();
    migrate(&mut db);
    db.conn()
        .execute_batch("UPDATE core_configuration SET value = '99' WHERE key = 'DatabaseVersion'")
        .unwrap();

    let columns_before = column_shape(&db);
    let ledger_before = ledger_rows(&db);
    let tracks_before = table_row_count(db.conn(), "core_tracks").unwrap();

    let mut migrator = Migrator::for_library().unwrap();
    let events = record_events(&migrator);
    let err = migrator.migrate(&mut db).unwrap_err();

    assert!(matches!(
        err,
        StoreError::SchemaTooNew {
            found: 99,
            supported: 13
        }
    ));
    assert_eq!(column_shape(&db), columns_before);
    assert_eq!(ledger_rows(&db), ledger_before);
    assert_eq!(table_row_count(db.conn(), "core_tracks").unwrap(), tracks_before);
    assert!(events.lock().unwrap().is_empty());
}

// ── Legacy import ──────────────────────────────────────────────────────

#[test]
fn test_legacy_import_builds_entities() {
    let mut db = seeded(LEGACY_STORE);
    let run = migrate(&mut db);

    assert_eq!(run.steps_applied, vec![1]);
    assert_eq!(table_row_count(db.conn(), "core_artists").unwrap(), 2);
    assert_eq!(table_row_count(db.conn(), "core_albums").unwrap(), 3);
    assert_eq!(table_row_count(db.conn(), "core_tracks").unwrap(), 5);

    // Same album title by two artists stays two albums.
    assert_eq!(
        query_i64(
            &db,
            "SELECT COUNT(DISTINCT album_id) FROM core_tracks WHERE track_id IN (1, 4)"
        ),
        Some(2)
    );
    assert_eq!(
        query_i64(&db, "SELECT artist_id FROM core_tracks WHERE track_id = 5"),
        None
    );
}

#[test]
fn test_legacy_import_converts_fields() {
    let mut db = seeded(LEGACY_STORE);
    migrate(&mut db);

    assert_eq!(
        query_i64(&db, "SELECT duration_ms FROM core_tracks WHERE track_id = 1"),
        Some(215_000)
    );
    assert_eq!(
        query_i64(&db, "SELECT last_played_stamp FROM core_tracks WHERE track_id = 1"),
        Some(1_600_000_000)
    );
    assert_eq!(
        query_i64(&db, "SELECT last_played_stamp FROM core_tracks WHERE track_id = 2"),
        None
    );
    assert_eq!(query_text(&db, "SELECT genre FROM core_tracks WHERE track_id = 2"), None);
    assert_eq!(query_text(&db, "SELECT mime_type FROM core_tracks WHERE track_id = 2"), None);
    assert_eq!(
        query_text(&db, "SELECT title_lowered FROM core_tracks WHERE track_id = 3").as_deref(),
        Some("song three")
    );
    assert_eq!(query_i64(&db, "SELECT score FROM core_tracks WHERE track_id = 1"), Some(100));
}

#[test]
fn test_legacy_import_playlists() {
    let mut db = seeded(LEGACY_STORE);
    migrate(&mut db);

    assert_eq!(
        query_i64(&db, "SELECT sort_column FROM core_playlists WHERE playlist_id = 1"),
        Some(3)
    );
    assert_eq!(
        query_i64(&db, "SELECT sort_column FROM core_playlists WHERE playlist_id = 2"),
        Some(-1)
    );
    // The entry pointing at a missing track is dropped.
    assert_eq!(table_row_count(db.conn(), "core_playlist_entries").unwrap(), 4);
    assert_eq!(
        query_i64(&db, "SELECT view_order FROM core_playlist_entries WHERE entry_id = 1"),
        Some(2)
    );
    assert_eq!(
        query_i64(&db, "SELECT view_order FROM core_playlist_entries WHERE entry_id = 3"),
        Some(1)
    );
    assert_eq!(
        query_i64(&db, "SELECT view_order FROM core_playlist_entries WHERE entry_id = 4"),
        Some(2)
    );
}

#[test]
fn test_legacy_import_old_playlist_layout() {
    let mut db = seeded(LEGACY_STORE_OLD_PLAYLISTS);
    migrate(&mut db);

    assert_eq!(
        query_i64(&db, "SELECT sort_column FROM core_playlists WHERE playlist_id = 1"),
        Some(-1)
    );
    assert_eq!(
        query_i64(&db, "SELECT view_order FROM core_playlist_entries WHERE entry_id = 7"),
        Some(1)
    );
    assert_eq!(
        query_i64(&db, "SELECT view_order FROM core_playlist_entries WHERE entry_id = 8"),
        Some(2)
    );
}

#[test]
fn test_legacy_import_drops_legacy_tables_and_leaves_metadata_stale() {
    let mut db = seeded(LEGACY_STORE);
    migrate(&mut db);

    for table in ["tracks", "playlists", "playlist_entries"] {
        assert!(!table_exists(db.conn(), table).unwrap(), "{table} survived");
    }
    let versions = LedgerVersions::read(db.conn()).unwrap();
    assert_eq!(versions.database, 13);
    assert_eq!(versions.metadata, 0);
}

#[test]
fn test_legacy_import_schema_matches_fresh_store() {
    let mut fresh = LibraryDb::open_memory().unwrap();
    migrate(&mut fresh);
    let mut imported = seeded(LEGACY_STORE);
    migrate(&mut imported);

    assert_eq!(column_shape(&fresh), column_shape(&imported));
    assert_eq!(index_shape(&fresh), index_shape(&imported));
}

#[test]
fn test_legacy_import_reports_slow_operation() {
    let mut db = seeded(LEGACY_STORE);
    let mut migrator = Migrator::for_library().unwrap();
    let events = record_events(&migrator);

    migrator.migrate(&mut db).unwrap();

    let events: Vec<MigrationEvent> = events
        .lock()
        .unwrap()
        .iter()
        .filter(|event| **event != MigrationEvent::SlowOperationPulse)
        .cloned()
        .collect();
    assert_eq!(events.len(), 4);
    assert_eq!(events[0], MigrationEvent::MigrationStarted);
    assert!(matches!(
        events[1],
        MigrationEvent::SlowOperationStarted { .. }
    ));
    assert_eq!(events[2], MigrationEvent::SlowOperationFinished);
    assert_eq!(events[3], MigrationEvent::MigrationFinished);
}

#[test]
fn test_failed_legacy_import_rolls_back_everything() {
    // A legacy store missing the `duration` column cannot be converted.
    let broken = LEGACY_STORE_OLD_PLAYLISTS
        .replace("    duration            INTEGER,\n", "")
        .replace("215, ", "")
        .replace("180, ", "");
    let mut db = seeded(&broken);
    let mut migrator = Migrator::for_library().unwrap();
    let events = record_events(&migrator);

    let err = migrator.migrate(&mut db).unwrap_err();

    assert!(matches!(err, StoreError::StepFailed { version: 1, .. }));
    assert!(table_exists(db.conn(), "tracks").unwrap());
    assert!(!table_exists(db.conn(), "core_tracks").unwrap());
    assert!(!table_exists(db.conn(), "core_configuration").unwrap());
    assert_eq!(LedgerVersions::read(db.conn()).unwrap().database, 0);
    assert_eq!(
        migrator.last_run().unwrap().outcome,
        MigrationOutcome::RolledBack
    );
    assert!(events
        .lock()
        .unwrap()
        .contains(&MigrationEvent::SlowOperationFinished));
}
