//! Error types for the metadata refresh.

use std::path::PathBuf;
use thiserror::Error;
use tv_store::StoreError;

/// Errors that end or prevent a refresh pass.
#[derive(Error, Debug)]
pub enum RefreshError {
    /// Reading tracks or writing the ledger failed (X001).
    #[error("[X001] Metadata refresh store error: {0}")]
    Store(#[from] StoreError),

    /// The job scheduler went away before signalling readiness (X002).
    #[error("[X002] Job scheduler shut down before the refresh could start")]
    SchedulerUnavailable,

    /// The blocking refresh task panicked or was cancelled (X003).
    #[error("[X003] Metadata refresh task failed: {0}")]
    Join(String),

    /// The scheduler's connection was already consumed (X004).
    #[error("[X004] Metadata refresh has no database connection")]
    ConnectionUnavailable,
}

/// Result type alias for [`RefreshError`].
pub type RefreshResult<T> = Result<T, RefreshError>;

/// Per-track enrichment failures. These are counted, never fatal.
#[derive(Error, Debug)]
pub enum ExtractError {
    /// The backing file could not be read (X101).
    #[error("[X101] Cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The URI points at something that is not a regular file (X102).
    #[error("[X102] Not a regular file: {path}")]
    NotAFile { path: PathBuf },

    /// Any other extractor-specific failure (X103).
    #[error("[X103] Metadata extraction failed: {0}")]
    Other(String),
}
