//! Library database for Tunevault.
//!
//! Provides a DuckDB-backed store for the music library together with the
//! machinery that keeps its schema current: a key/value version ledger, a
//! registry of numbered migration steps, a transactional migration driver,
//! and the one-time importer for flat legacy libraries.

pub mod connection;
pub mod ddl;
pub mod error;
pub mod events;
pub mod ledger;
pub mod migration;
pub mod query;

pub use connection::{with_transaction, LibraryDb};
pub use error::{RegistryError, StoreError, StoreResult};
pub use events::{EventBus, MigrationEvent, SubscriptionId};
pub use ledger::LedgerVersions;
pub use migration::{
    library_registry, Continuation, LibraryStatus, MigrationOutcome, MigrationRun,
    MigrationSettings, MigrationStep, Migrator, PendingStep, RefreshHook, StepContext,
    StepRegistry, CURRENT_METADATA_VERSION, DEFAULT_PULSE_INTERVAL,
};
