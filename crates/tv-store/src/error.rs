//! Error types for the library database.

use thiserror::Error;

/// Library database errors.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Failed to open or create the library database (S001).
    #[error("[S001] Library database connection failed: {0}")]
    ConnectionError(String),

    /// The on-disk schema is newer than this build understands (S002).
    #[error(
        "[S002] Library database is at version {found}, but this build only supports versions up to {supported}"
    )]
    SchemaTooNew { found: i32, supported: i32 },

    /// A migration step failed; the whole run was rolled back (S003).
    #[error("[S003] Migration step v{version:03} ({name}) failed: {source}")]
    StepFailed {
        version: i32,
        name: String,
        #[source]
        source: Box<StoreError>,
    },

    /// The step registry is missing or duplicating a version (S004).
    #[error("[S004] Migration registry is inconsistent: {0}")]
    Registry(#[from] RegistryError),

    /// Transaction management error (S005).
    #[error("[S005] Library database transaction failed: {0}")]
    TransactionError(String),

    /// The version ledger could not be read or written (S006).
    #[error("[S006] Version ledger error: {0}")]
    LedgerError(String),

    /// The legacy library conversion failed (S007).
    #[error("[S007] Legacy library import failed: {0}")]
    LegacyImportError(String),

    /// SQL execution error inside the library database (S008).
    #[error("[S008] Library database query failed: {0}")]
    QueryError(String),

    /// DuckDB driver error with preserved source chain (S009).
    #[error("[S009] DuckDB error")]
    DuckDb(#[source] duckdb::Error),
}

/// Defects in the set of declared migration steps.
///
/// These are programming errors, reported when the registry is built and
/// before the store is touched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// No steps were declared (R001).
    #[error("[R001] No migration steps declared")]
    Empty,

    /// A step declared a version below 1 (R002).
    #[error("[R002] Step '{name}' declares invalid version {version}")]
    InvalidVersion { version: i32, name: String },

    /// Two steps declared the same version (R003).
    #[error("[R003] Version {version} declared by both '{first}' and '{second}'")]
    DuplicateVersion {
        version: i32,
        first: String,
        second: String,
    },

    /// A version inside the declared range has no step (R004).
    #[error("[R004] No migration step declared for version {version}")]
    MissingVersion { version: i32 },
}

/// Result type alias for [`StoreError`].
pub type StoreResult<T> = Result<T, StoreError>;

impl From<duckdb::Error> for StoreError {
    fn from(err: duckdb::Error) -> Self {
        StoreError::DuckDb(err)
    }
}
