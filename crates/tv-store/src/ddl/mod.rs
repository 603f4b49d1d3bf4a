//! Embedded DDL for the library database.
//!
//! Two shapes are kept side by side: the complete latest schema
//! ([`LATEST_TABLES`] + [`LATEST_INDEXES`]) used to create a store from
//! scratch, and the incremental per-version scripts in [`SQL_STEPS`] used
//! to upgrade an existing one. Indexes are only ever created by the final
//! step, because DuckDB refuses `ALTER TABLE` on an indexed table. That step
//! rebuilds every table first: DuckDB also refuses `CREATE INDEX` on a table
//! whose rows were updated earlier in the same transaction.

/// Every library table at the latest schema version, without indexes.
pub const LATEST_TABLES: &str = include_str!("latest_tables.sql");

/// Every library index at the latest schema version.
pub const LATEST_INDEXES: &str = include_str!("latest_indexes.sql");

/// Legacy `tracks` rows into `core_artists`, `core_albums`, and `core_tracks`.
pub const LEGACY_ENTITIES: &str = include_str!("legacy_entities.sql");

/// Blank text columns become NULL.
pub const NORMALIZE_BLANK_TEXT: &str = include_str!("normalize_blank_text.sql");

/// Derive `view_order` for playlists whose entries were never ordered.
pub const INITIALIZE_ENTRY_ORDER: &str = include_str!("initialize_entry_order.sql");

/// `core_playlist_entries.generated` column (v010).
pub const GENERATED_ENTRIES: &str = include_str!("v010_generated_entries.sql");

/// Tables that make up a library store, in drop order.
pub const LIBRARY_TABLES: &[&str] = &[
    "core_shuffle_modifications",
    "core_shufflers",
    "core_removed_tracks",
    "core_playlist_entries",
    "core_playlists",
    "core_tracks",
    "core_albums",
    "core_artists",
    "core_configuration",
];

/// A single incremental migration expressed purely in SQL.
pub struct SqlStep {
    /// Schema version this script produces.
    pub version: i32,
    /// Short step name used in logs and errors.
    pub name: &'static str,
    /// Raw SQL to execute.
    pub sql: &'static str,
}

/// Incremental SQL-only steps, in order.
///
/// Versions 1, 10, and 13 are not listed: they need logic beyond a script
/// and are implemented in [`crate::migration::library`].
pub static SQL_STEPS: &[SqlStep] = &[
    SqlStep {
        version: 2,
        name: "track_attributes",
        sql: include_str!("v002_track_attributes.sql"),
    },
    SqlStep {
        version: 3,
        name: "playlist_primary_source",
        sql: include_str!("v003_playlist_primary_source.sql"),
    },
    SqlStep {
        version: 4,
        name: "lowered_titles",
        sql: include_str!("v004_lowered_titles.sql"),
    },
    SqlStep {
        version: 5,
        name: "last_skipped_stamp",
        sql: include_str!("v005_last_skipped_stamp.sql"),
    },
    SqlStep {
        version: 6,
        name: "removed_tracks",
        sql: include_str!("v006_removed_tracks.sql"),
    },
    SqlStep {
        version: 7,
        name: "audio_properties",
        sql: include_str!("v007_audio_properties.sql"),
    },
    SqlStep {
        version: 8,
        name: "blank_text_to_null",
        sql: NORMALIZE_BLANK_TEXT,
    },
    SqlStep {
        version: 9,
        name: "track_score",
        sql: include_str!("v009_track_score.sql"),
    },
    SqlStep {
        version: 11,
        name: "sync_stamps",
        sql: include_str!("v011_sync_stamps.sql"),
    },
    SqlStep {
        version: 12,
        name: "shuffle_tables",
        sql: include_str!("v012_shuffle_tables.sql"),
    },
];
