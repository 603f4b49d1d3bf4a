//! Version ledger stored in `core_configuration`.
//!
//! Two counters live here: `DatabaseVersion` (structural schema) and
//! `MetadataVersion` (completeness of derived track fields). A store with no
//! ledger table reads as version 0 for both.

use crate::error::{StoreError, StoreResult};
use crate::query::table_exists;
use duckdb::Connection;
use serde::Serialize;

pub(crate) const LEDGER_TABLE: &str = "core_configuration";
const DATABASE_VERSION_KEY: &str = "DatabaseVersion";
const METADATA_VERSION_KEY: &str = "MetadataVersion";

/// Both ledger counters as read from the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LedgerVersions {
    pub database: i32,
    pub metadata: i32,
}

impl LedgerVersions {
    /// Read both counters. Missing table or rows read as 0.
    pub fn read(conn: &Connection) -> StoreResult<Self> {
        if !table_exists(conn, LEDGER_TABLE)? {
            return Ok(Self {
                database: 0,
                metadata: 0,
            });
        }
        Ok(Self {
            database: read_key(conn, DATABASE_VERSION_KEY)?,
            metadata: read_key(conn, METADATA_VERSION_KEY)?,
        })
    }
}

/// Record the structural schema version.
///
/// Only the migration driver and the steps it runs write this counter, and
/// only inside the migration transaction.
pub(crate) fn write_db_version(conn: &Connection, version: i32) -> StoreResult<()> {
    write_key(conn, DATABASE_VERSION_KEY, version)
}

/// Record the metadata version.
pub fn write_meta_version(conn: &Connection, version: i32) -> StoreResult<()> {
    write_key(conn, METADATA_VERSION_KEY, version)
}

fn read_key(conn: &Connection, key: &str) -> StoreResult<i32> {
    let raw: String = match conn.query_row(
        "SELECT value FROM core_configuration WHERE key = ? LIMIT 1",
        duckdb::params![key],
        |row| row.get(0),
    ) {
        Ok(value) => value,
        Err(duckdb::Error::QueryReturnedNoRows) => return Ok(0),
        Err(e) => {
            return Err(StoreError::LedgerError(format!(
                "failed to read {key}: {e}"
            )))
        }
    };

    raw.trim().parse::<i32>().map_err(|e| {
        StoreError::LedgerError(format!("{key} holds non-integer value '{raw}': {e}"))
    })
}

fn write_key(conn: &Connection, key: &str, version: i32) -> StoreResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS core_configuration (
             key   VARCHAR NOT NULL,
             value VARCHAR NOT NULL
         );",
    )
    .map_err(|e| StoreError::LedgerError(format!("failed to create ledger table: {e}")))?;

    let value = version.to_string();
    let updated = conn
        .execute(
            "UPDATE core_configuration SET value = ? WHERE key = ?",
            duckdb::params![value, key],
        )
        .map_err(|e| StoreError::LedgerError(format!("failed to update {key}: {e}")))?;

    if updated == 0 {
        conn.execute(
            "INSERT INTO core_configuration (key, value) VALUES (?, ?)",
            duckdb::params![key, value],
        )
        .map_err(|e| StoreError::LedgerError(format!("failed to insert {key}: {e}")))?;
    }
    log::debug!("Ledger {key} = {version}");
    Ok(())
}

#[cfg(test)]
#[path = "ledger_test.rs"]
mod tests;
