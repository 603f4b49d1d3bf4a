//! tv-refresh - Deferred metadata refresh for Tunevault
//!
//! After a migration leaves the library's `MetadataVersion` behind, the
//! [`RefreshScheduler`] waits for the host's job scheduler to come up, then
//! re-derives every track's metadata on tokio's blocking pool and records
//! the new metadata version.

pub mod error;
pub mod extractor;
pub mod job;
pub mod scheduler;
pub mod signal;

pub use error::{ExtractError, RefreshError, RefreshResult};
pub use extractor::{Extraction, FileProbeExtractor, MetadataExtractor};
pub use job::{run_refresh_pass, RecordOutcome, RefreshJob, RefreshReport};
pub use scheduler::{RefreshScheduler, RefreshSettings};
pub use signal::JobSchedulerSignal;
