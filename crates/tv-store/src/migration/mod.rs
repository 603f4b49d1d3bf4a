//! Versioned schema migration for the library database.
//!
//! - [`step`]: A single numbered step and the context it runs with
//! - [`registry`]: Validated, ordered set of steps
//! - [`driver`]: [`Migrator`], which runs pending steps in one transaction
//! - [`legacy`]: Version 1: fresh-store bootstrap and legacy import
//! - [`library`]: The application's concrete step table

pub mod driver;
pub mod legacy;
pub mod library;
pub mod registry;
pub mod step;

pub use driver::{
    LibraryStatus, MigrationOutcome, MigrationRun, Migrator, PendingStep, RefreshHook,
    DEFAULT_PULSE_INTERVAL,
};
pub use library::{library_registry, CURRENT_METADATA_VERSION};
pub use registry::StepRegistry;
pub use step::{Continuation, MigrationSettings, MigrationStep, StepAction, StepContext};
