//! Migration driver: reads the ledger, runs pending steps in one
//! transaction, and records the new schema version.

use super::registry::StepRegistry;
use super::step::{Continuation, MigrationSettings, StepContext};
use crate::connection::LibraryDb;
use crate::error::{RegistryError, StoreError, StoreResult};
use crate::events::{EventBus, MigrationEvent};
use crate::ledger::{self, LedgerVersions};
use duckdb::Connection;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// Default pulse period for slow operations.
pub const DEFAULT_PULSE_INTERVAL: Duration = Duration::from_millis(100);

/// Something that can be asked to schedule a metadata refresh.
///
/// `arm` must return promptly; the refresh itself runs elsewhere.
pub trait RefreshHook: Send + Sync {
    fn arm(&self);
}

/// How a [`Migrator::migrate`] call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MigrationOutcome {
    /// Steps ran and the new version was committed.
    Committed,
    /// A step failed; nothing from the run was kept.
    RolledBack,
    /// The store was already at the current version.
    NotNeeded,
    /// The store is newer than this build; nothing was touched.
    Rejected,
}

/// Record of one [`Migrator::migrate`] call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationRun {
    pub from_version: i32,
    pub to_version: i32,
    /// Versions whose steps completed, in execution order.
    pub steps_applied: Vec<i32>,
    pub outcome: MigrationOutcome,
    pub metadata_refresh_armed: bool,
}

/// A step a migration would run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingStep {
    pub version: i32,
    pub name: &'static str,
}

/// Snapshot of a store's versions relative to this build.
#[derive(Debug, Clone, Serialize)]
pub struct LibraryStatus {
    pub database_version: i32,
    pub metadata_version: i32,
    pub supported_version: i32,
    pub supported_metadata_version: i32,
    pub pending: Vec<PendingStep>,
    pub schema_too_new: bool,
    pub metadata_stale: bool,
}

/// Brings a library store up to the registry's current version.
pub struct Migrator {
    registry: StepRegistry,
    events: Arc<EventBus>,
    metadata_target: i32,
    pulse_interval: Duration,
    refresh_hook: Option<Arc<dyn RefreshHook>>,
    last_run: Option<MigrationRun>,
}

impl Migrator {
    /// Create a driver over `registry`.
    ///
    /// The metadata target defaults to 0, so no refresh is ever armed until
    /// [`Migrator::with_metadata_target`] says otherwise.
    pub fn new(registry: StepRegistry) -> Self {
        Self {
            registry,
            events: Arc::new(EventBus::new()),
            metadata_target: 0,
            pulse_interval: DEFAULT_PULSE_INTERVAL,
            refresh_hook: None,
            last_run: None,
        }
    }

    /// Driver over the application's library steps.
    pub fn for_library() -> StoreResult<Self> {
        let registry = super::library::library_registry()?;
        Ok(Self::new(registry).with_metadata_target(super::library::CURRENT_METADATA_VERSION))
    }

    pub fn with_metadata_target(mut self, metadata_target: i32) -> Self {
        self.metadata_target = metadata_target;
        self
    }

    pub fn with_pulse_interval(mut self, pulse_interval: Duration) -> Self {
        self.pulse_interval = pulse_interval;
        self
    }

    pub fn with_refresh_hook(mut self, hook: Arc<dyn RefreshHook>) -> Self {
        self.refresh_hook = Some(hook);
        self
    }

    /// Event bus that migration progress is reported on.
    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    pub fn registry(&self) -> &StepRegistry {
        &self.registry
    }

    pub fn current_version(&self) -> i32 {
        self.registry.current_version()
    }

    pub fn metadata_target(&self) -> i32 {
        self.metadata_target
    }

    /// The most recent run, including failed ones.
    pub fn last_run(&self) -> Option<&MigrationRun> {
        self.last_run.as_ref()
    }

    /// Steps a migration would run against `db`, without touching it.
    ///
    /// A step may end the run early, so this is an upper bound.
    pub fn pending(&self, db: &LibraryDb) -> StoreResult<Vec<PendingStep>> {
        let found = LedgerVersions::read(db.conn())?.database;
        let supported = self.current_version();
        if found > supported {
            return Err(StoreError::SchemaTooNew { found, supported });
        }
        Ok(self.pending_from(found))
    }

    /// Versions of `db` compared with what this build supports.
    pub fn status(&self, db: &LibraryDb) -> StoreResult<LibraryStatus> {
        let versions = LedgerVersions::read(db.conn())?;
        let supported = self.current_version();
        let schema_too_new = versions.database > supported;
        let pending = if schema_too_new {
            Vec::new()
        } else {
            self.pending_from(versions.database)
        };
        Ok(LibraryStatus {
            database_version: versions.database,
            metadata_version: versions.metadata,
            supported_version: supported,
            supported_metadata_version: self.metadata_target,
            pending,
            schema_too_new,
            metadata_stale: versions.metadata < self.metadata_target,
        })
    }

    /// Upgrade `db` to the current version.
    ///
    /// All pending steps run inside one transaction. A failing step rolls the
    /// whole run back and is reported as [`StoreError::StepFailed`]; a store
    /// newer than this build is refused with [`StoreError::SchemaTooNew`]
    /// before anything is written.
    pub fn migrate(&mut self, db: &mut LibraryDb) -> StoreResult<MigrationRun> {
        let from = LedgerVersions::read(db.conn())?.database;
        let target = self.current_version();

        if from > target {
            log::warn!(
                "Library database is at v{from:03}, newer than supported v{target:03}; refusing to open"
            );
            self.last_run = Some(MigrationRun {
                from_version: from,
                to_version: from,
                steps_applied: Vec::new(),
                outcome: MigrationOutcome::Rejected,
                metadata_refresh_armed: false,
            });
            return Err(StoreError::SchemaTooNew {
                found: from,
                supported: target,
            });
        }

        if from == target {
            log::debug!("Library database already at v{target:03}");
            let armed = self.after_current(db.conn());
            return Ok(self.record(from, target, Vec::new(), MigrationOutcome::NotNeeded, armed));
        }

        log::info!("Migrating library database from v{from:03} to v{target:03}");
        let settings = MigrationSettings {
            target_version: target,
            metadata_target: self.metadata_target,
            pulse_interval: self.pulse_interval,
        };
        let mut applied = Vec::new();
        let result = db.transaction(|conn| {
            run_steps(
                conn,
                &self.registry,
                &self.events,
                &settings,
                from,
                &mut applied,
            )
        });

        if let Err(e) = result {
            log::warn!("Rolling back library migration from v{from:03}: {e}");
            self.record(from, from, applied, MigrationOutcome::RolledBack, false);
            return Err(e);
        }

        log::info!(
            "Library database migrated to v{target:03} ({} step(s))",
            applied.len()
        );
        let armed = self.after_current(db.conn());
        Ok(self.record(from, target, applied, MigrationOutcome::Committed, armed))
    }

    fn pending_from(&self, found: i32) -> Vec<PendingStep> {
        self.registry
            .steps_by_version()
            .range(found + 1..)
            .map(|(&version, step)| PendingStep {
                version,
                name: step.name(),
            })
            .collect()
    }

    /// Arm the refresh if metadata is stale, then announce completion.
    ///
    /// The schema is already current here, so a ledger read failure only
    /// leaves the refresh unarmed.
    fn after_current(&self, conn: &Connection) -> bool {
        let metadata = match LedgerVersions::read(conn) {
            Ok(versions) => versions.metadata,
            Err(e) => {
                log::warn!("Could not read metadata version; refresh not scheduled: {e}");
                self.events.emit(&MigrationEvent::MigrationFinished);
                return false;
            }
        };
        let mut armed = false;
        if metadata < self.metadata_target {
            if let Some(hook) = &self.refresh_hook {
                log::info!(
                    "Metadata at v{metadata} is behind v{}; scheduling refresh",
                    self.metadata_target
                );
                hook.arm();
                armed = true;
            }
        }
        self.events.emit(&MigrationEvent::MigrationFinished);
        armed
    }

    fn record(
        &mut self,
        from: i32,
        to: i32,
        steps_applied: Vec<i32>,
        outcome: MigrationOutcome,
        metadata_refresh_armed: bool,
    ) -> MigrationRun {
        let run = MigrationRun {
            from_version: from,
            to_version: to,
            steps_applied,
            outcome,
            metadata_refresh_armed,
        };
        self.last_run = Some(run.clone());
        run
    }
}

/// Transaction body: every step after `from` in order, then the ledger.
fn run_steps(
    conn: &mut Connection,
    registry: &StepRegistry,
    events: &EventBus,
    settings: &MigrationSettings,
    from: i32,
    applied: &mut Vec<i32>,
) -> StoreResult<()> {
    events.emit(&MigrationEvent::MigrationStarted);

    for version in (from + 1)..=settings.target_version {
        let step = registry
            .step(version)
            .ok_or(RegistryError::MissingVersion { version })?;
        log::debug!("Applying library migration v{version:03} ({})", step.name());

        let mut ctx = StepContext::new(conn, events, settings);
        let continuation = step.run(&mut ctx).map_err(|e| StoreError::StepFailed {
            version,
            name: step.name().to_string(),
            source: Box::new(e),
        })?;
        applied.push(version);

        if continuation == Continuation::StopButMarkComplete {
            log::debug!("Step v{version:03} completed the migration");
            break;
        }
    }

    ledger::write_db_version(conn, settings.target_version)
}

#[cfg(test)]
#[path = "driver_test.rs"]
mod tests;
