//! Catalog introspection against the `main` schema.

use crate::error::{StoreError, StoreResult};
use duckdb::Connection;

/// Check whether a table exists in the `main` schema.
pub fn table_exists(conn: &Connection, table_name: &str) -> StoreResult<bool> {
    let count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM information_schema.tables \
             WHERE table_schema = 'main' AND table_name = ?",
            duckdb::params![table_name],
            |row| row.get(0),
        )
        .map_err(|e| StoreError::QueryError(format!("table lookup for {table_name}: {e}")))?;
    Ok(count > 0)
}

/// Check whether `table_name` has a column named `column_name`.
pub fn column_exists(conn: &Connection, table_name: &str, column_name: &str) -> StoreResult<bool> {
    let count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM information_schema.columns \
             WHERE table_schema = 'main' AND table_name = ? AND column_name = ?",
            duckdb::params![table_name, column_name],
            |row| row.get(0),
        )
        .map_err(|e| {
            StoreError::QueryError(format!(
                "column lookup for {table_name}.{column_name}: {e}"
            ))
        })?;
    Ok(count > 0)
}

/// List all tables in the `main` schema.
pub fn list_tables(conn: &Connection) -> StoreResult<Vec<String>> {
    let mut stmt = conn
        .prepare(
            "SELECT table_name FROM information_schema.tables \
             WHERE table_schema = 'main' \
             ORDER BY table_name",
        )
        .map_err(|e| StoreError::QueryError(format!("prepare list_tables: {e}")))?;
    let tables = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .map_err(|e| StoreError::QueryError(format!("list_tables: {e}")))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| StoreError::QueryError(format!("list_tables row: {e}")))?;
    Ok(tables)
}

/// Get the row count for a table in the `main` schema.
pub fn table_row_count(conn: &Connection, table_name: &str) -> StoreResult<i64> {
    if !table_name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(StoreError::QueryError(format!(
            "invalid table name '{table_name}': must contain only alphanumeric characters and underscores"
        )));
    }
    let count: i64 = conn
        .query_row(&format!("SELECT COUNT(*) FROM {table_name}"), [], |row| {
            row.get(0)
        })
        .map_err(|e| StoreError::QueryError(format!("count failed for {table_name}: {e}")))?;
    Ok(count)
}

#[cfg(test)]
#[path = "schema_test.rs"]
mod tests;
