//! Readiness of the host's job scheduler.

use tokio::sync::watch;

/// Flips once when the host's background job scheduler is up.
///
/// The refresh scheduler holds a receiver and does not start its pass until
/// this has been marked ready.
#[derive(Debug)]
pub struct JobSchedulerSignal {
    ready: watch::Sender<bool>,
}

impl JobSchedulerSignal {
    pub fn new() -> Self {
        let (ready, _) = watch::channel(false);
        Self { ready }
    }

    /// A signal that is already ready, for hosts without a separate scheduler.
    pub fn already_ready() -> Self {
        let signal = Self::new();
        signal.mark_ready();
        signal
    }

    pub fn mark_ready(&self) {
        self.ready.send_replace(true);
    }

    pub fn is_ready(&self) -> bool {
        *self.ready.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.ready.subscribe()
    }
}

impl Default for JobSchedulerSignal {
    fn default() -> Self {
        Self::new()
    }
}
