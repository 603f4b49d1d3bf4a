//! Library database connection wrapper.
//!
//! [`LibraryDb`] owns a DuckDB [`Connection`] and provides helpers for
//! opening and transacting against the library database.

use crate::error::{StoreError, StoreResult};
use duckdb::Connection;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

/// Wrapper around a DuckDB connection to the library database.
///
/// Opening does not migrate; run a [`crate::Migrator`] against the handle
/// before using the library tables.
pub struct LibraryDb {
    conn: Connection,
}

impl LibraryDb {
    /// Open (or create) the library database at `path`.
    pub fn open(path: &Path) -> StoreResult<Self> {
        let conn = Connection::open(path)
            .map_err(|e| StoreError::ConnectionError(format!("{e}: {}", path.display())))?;
        Ok(Self { conn })
    }

    /// Open an empty in-memory library database.
    ///
    /// Useful for unit tests that don't need persistence.
    pub fn open_memory() -> StoreResult<Self> {
        let conn =
            Connection::open_in_memory().map_err(|e| StoreError::ConnectionError(e.to_string()))?;
        Ok(Self { conn })
    }

    /// Borrow the underlying DuckDB connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Open a second connection to the same database.
    ///
    /// Background work (the metadata refresh pass) uses its own connection
    /// so it never shares transaction state with the caller.
    pub fn try_clone_connection(&self) -> StoreResult<Connection> {
        self.conn
            .try_clone()
            .map_err(|e| StoreError::ConnectionError(format!("clone failed: {e}")))
    }

    /// Execute `body` within a `BEGIN` / `COMMIT` transaction, rolling back on
    /// error.
    pub fn transaction<F, T>(&mut self, body: F) -> StoreResult<T>
    where
        F: FnOnce(&mut Connection) -> StoreResult<T>,
    {
        with_transaction(&mut self.conn, body)
    }
}

/// Execute `body` within a `BEGIN` / `COMMIT` transaction on `conn`, rolling
/// back on error.
///
/// A panic in `body` also rolls back before it continues unwinding, so the
/// connection is never left inside an open transaction.
///
/// The body receives the connection mutably so it can hand it to a scoped
/// worker thread while the transaction stays open.
pub fn with_transaction<F, T>(conn: &mut Connection, body: F) -> StoreResult<T>
where
    F: FnOnce(&mut Connection) -> StoreResult<T>,
{
    conn.execute_batch("BEGIN TRANSACTION")
        .map_err(|e| StoreError::TransactionError(format!("BEGIN failed: {e}")))?;

    let result = match panic::catch_unwind(AssertUnwindSafe(|| body(&mut *conn))) {
        Ok(result) => result,
        Err(payload) => {
            if let Err(rollback_err) = conn.execute_batch("ROLLBACK") {
                log::warn!("ROLLBACK after panic failed: {rollback_err}");
            }
            panic::resume_unwind(payload);
        }
    };

    match &result {
        Ok(_) => {
            if let Err(commit_err) = conn.execute_batch("COMMIT") {
                let _ = conn.execute_batch("ROLLBACK");
                return Err(StoreError::TransactionError(format!(
                    "COMMIT failed: {commit_err}"
                )));
            }
        }
        Err(_) => {
            if let Err(rollback_err) = conn.execute_batch("ROLLBACK") {
                log::warn!("ROLLBACK failed: {rollback_err}");
            }
        }
    }
    result
}

#[cfg(test)]
#[path = "connection_test.rs"]
mod tests;
