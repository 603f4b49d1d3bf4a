//! Progress notifications raised while the library is migrated.
//!
//! Listeners register with [`EventBus::subscribe`] and are called
//! synchronously, on the thread that emits the event. Having no listeners is
//! the normal case for headless callers.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// A notification about migration progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationEvent {
    /// A long-running operation (the legacy import) has begun.
    SlowOperationStarted { title: String, message: String },
    /// The long-running operation is still working.
    SlowOperationPulse,
    /// The long-running operation has ended, successfully or not.
    SlowOperationFinished,
    /// A migration run is about to execute its first step.
    MigrationStarted,
    /// The store is at the current schema version.
    MigrationFinished,
}

/// Handle returned by [`EventBus::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Arc<dyn Fn(&MigrationEvent) + Send + Sync>;

/// Observer list for [`MigrationEvent`]s.
#[derive(Default)]
pub struct EventBus {
    next_id: AtomicU64,
    listeners: Mutex<Vec<(SubscriptionId, Listener)>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener. It stays registered until unsubscribed.
    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&MigrationEvent) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.lock().push((id, Arc::new(listener)));
        id
    }

    /// Remove a listener. Returns `false` if `id` was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = self.lock();
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    /// Deliver `event` to every listener in subscription order.
    pub fn emit(&self, event: &MigrationEvent) {
        // Snapshot so a listener may (un)subscribe without deadlocking.
        let listeners: Vec<Listener> = self
            .lock()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in listeners {
            listener(event);
        }
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<(SubscriptionId, Listener)>> {
        self.listeners
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

#[cfg(test)]
#[path = "events_test.rs"]
mod tests;
