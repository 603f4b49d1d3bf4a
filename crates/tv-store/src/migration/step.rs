//! Migration step type and the context handed to each step.

use crate::error::StoreResult;
use crate::events::{EventBus, MigrationEvent};
use duckdb::Connection;
use std::fmt;
use std::time::Duration;

/// What the driver should do after a step succeeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Continuation {
    /// Run the next version's step.
    Continue,
    /// Skip the remaining steps and record the target version; the step has
    /// already brought the store fully up to date.
    StopButMarkComplete,
}

/// Run-wide values a step may need.
#[derive(Debug, Clone, Copy)]
pub struct MigrationSettings {
    /// Schema version the run is heading for.
    pub target_version: i32,
    /// Metadata version a freshly created store starts at.
    pub metadata_target: i32,
    /// Pulse period while a slow operation runs on a worker thread.
    pub pulse_interval: Duration,
}

/// Everything a step sees while it runs: the connection (inside the run's
/// open transaction), the event bus, and the run settings.
pub struct StepContext<'a> {
    conn: &'a mut Connection,
    events: &'a EventBus,
    settings: &'a MigrationSettings,
}

impl<'a> StepContext<'a> {
    pub(crate) fn new(
        conn: &'a mut Connection,
        events: &'a EventBus,
        settings: &'a MigrationSettings,
    ) -> Self {
        Self {
            conn,
            events,
            settings,
        }
    }

    pub fn conn(&self) -> &Connection {
        &*self.conn
    }

    pub fn events(&self) -> &EventBus {
        self.events
    }

    pub fn settings(&self) -> &MigrationSettings {
        self.settings
    }

    pub fn emit(&self, event: MigrationEvent) {
        self.events.emit(&event);
    }

    /// Split borrow for handing the connection to a worker thread while
    /// still emitting events from the caller.
    pub(crate) fn parts(&mut self) -> (&mut Connection, &EventBus, &MigrationSettings) {
        (&mut *self.conn, self.events, self.settings)
    }
}

/// Boxed step body.
pub type StepAction = Box<dyn Fn(&mut StepContext<'_>) -> StoreResult<Continuation> + Send + Sync>;

/// One schema migration, producing exactly `version` from `version - 1`.
pub struct MigrationStep {
    version: i32,
    name: &'static str,
    action: StepAction,
}

impl MigrationStep {
    pub fn new<F>(version: i32, name: &'static str, action: F) -> Self
    where
        F: Fn(&mut StepContext<'_>) -> StoreResult<Continuation> + Send + Sync + 'static,
    {
        Self {
            version,
            name,
            action: Box::new(action),
        }
    }

    /// A step that runs `sql` and continues.
    pub fn sql(version: i32, name: &'static str, sql: &'static str) -> Self {
        Self::new(version, name, move |ctx| {
            ctx.conn().execute_batch(sql)?;
            Ok(Continuation::Continue)
        })
    }

    pub fn version(&self) -> i32 {
        self.version
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub(crate) fn run(&self, ctx: &mut StepContext<'_>) -> StoreResult<Continuation> {
        (self.action)(ctx)
    }
}

impl fmt::Debug for MigrationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MigrationStep")
            .field("version", &self.version)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
