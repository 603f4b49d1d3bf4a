//! The library's migration steps.
//!
//! | version | step |
//! |---|---|
//! | 1 | fresh store or legacy import |
//! | 2 | `core_tracks.attributes` |
//! | 3 | `core_playlists.primary_source_id` |
//! | 4 | lowered title and name columns |
//! | 5 | `core_tracks.last_skipped_stamp` |
//! | 6 | `core_removed_tracks` |
//! | 7 | `bpm`, `bit_rate`, `metadata_hash` on tracks |
//! | 8 | blank text to NULL |
//! | 9 | `core_tracks.score` |
//! | 10 | generated playlist entries and entry order |
//! | 11 | file sync stamps |
//! | 12 | shuffle tables |
//! | 13 | table rebuild and indexes |

use super::legacy;
use super::registry::StepRegistry;
use super::step::{Continuation, MigrationStep, StepContext};
use crate::ddl::{
    GENERATED_ENTRIES, INITIALIZE_ENTRY_ORDER, LATEST_INDEXES, LATEST_TABLES, LIBRARY_TABLES,
    SQL_STEPS,
};
use crate::error::{RegistryError, StoreResult};

/// Metadata version reached by a complete refresh pass.
///
/// Bump when the derived track fields change so existing libraries are
/// refreshed once.
pub const CURRENT_METADATA_VERSION: i32 = 3;

/// Registry of every library step.
pub fn library_registry() -> Result<StepRegistry, RegistryError> {
    let mut steps = vec![
        MigrationStep::new(1, "bootstrap_or_legacy_import", legacy::bootstrap_or_import),
        MigrationStep::new(10, "playlist_entry_order", playlist_entry_order),
        MigrationStep::new(13, "library_indexes", library_indexes),
    ];
    steps.extend(
        SQL_STEPS
            .iter()
            .map(|step| MigrationStep::sql(step.version, step.name, step.sql)),
    );
    StepRegistry::new(steps)
}

fn playlist_entry_order(ctx: &mut StepContext<'_>) -> StoreResult<Continuation> {
    ctx.conn().execute_batch(GENERATED_ENTRIES)?;
    ctx.conn().execute_batch(INITIALIZE_ENTRY_ORDER)?;
    Ok(Continuation::Continue)
}

/// Recreate every table from a staged copy at the latest shape, then index.
///
/// Rows in the recreated tables are plain inserts of this transaction, which
/// DuckDB will index; rows updated by earlier steps of the run would not be.
fn library_indexes(ctx: &mut StepContext<'_>) -> StoreResult<Continuation> {
    let conn = ctx.conn();
    for table in LIBRARY_TABLES {
        conn.execute_batch(&format!(
            "CREATE TABLE {table}_rebuild AS SELECT * FROM {table}; DROP TABLE {table};"
        ))?;
    }
    conn.execute_batch(LATEST_TABLES)?;
    for table in LIBRARY_TABLES {
        conn.execute_batch(&format!(
            "INSERT INTO {table} BY NAME SELECT * FROM {table}_rebuild; DROP TABLE {table}_rebuild;"
        ))?;
    }
    conn.execute_batch(LATEST_INDEXES)?;
    log::debug!("Rebuilt {} library tables and created indexes", LIBRARY_TABLES.len());
    Ok(Continuation::Continue)
}

#[cfg(test)]
#[path = "library_test.rs"]
mod tests;
