//! One-shot, deferred scheduling of the metadata refresh pass.

use crate::error::{RefreshError, RefreshResult};
use crate::extractor::MetadataExtractor;
use crate::job::{run_refresh_pass, RefreshJob, RefreshReport};
use duckdb::Connection;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tv_core::RefreshConfig;
use tv_store::{RefreshHook, CURRENT_METADATA_VERSION};

/// Timing and target for a scheduled refresh.
#[derive(Debug, Clone, Copy)]
pub struct RefreshSettings {
    /// Minimum wait after the job scheduler is ready.
    pub min_delay: Duration,
    /// Metadata version recorded when the pass completes.
    pub metadata_target: i32,
}

impl RefreshSettings {
    pub fn from_config(config: &RefreshConfig) -> Self {
        Self {
            min_delay: config.min_delay(),
            metadata_target: CURRENT_METADATA_VERSION,
        }
    }
}

struct Inner {
    runtime: Handle,
    conn: Mutex<Option<Connection>>,
    extractor: Arc<dyn MetadataExtractor>,
    ready: watch::Receiver<bool>,
    settings: RefreshSettings,
    job: RefreshJob,
    armed: AtomicBool,
    task: Mutex<Option<JoinHandle<RefreshResult<RefreshReport>>>>,
}

/// Runs the metadata refresh once, after the job scheduler is ready.
///
/// Only the first [`RefreshScheduler::arm`] has any effect. The pass runs on
/// tokio's blocking pool with the connection handed over at construction,
/// so it never shares a transaction with the migration.
#[derive(Clone)]
pub struct RefreshScheduler {
    inner: Arc<Inner>,
}

impl RefreshScheduler {
    pub fn new(
        runtime: Handle,
        conn: Connection,
        extractor: Arc<dyn MetadataExtractor>,
        ready: watch::Receiver<bool>,
        settings: RefreshSettings,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                runtime,
                conn: Mutex::new(Some(conn)),
                extractor,
                ready,
                settings,
                job: RefreshJob::new(),
                armed: AtomicBool::new(false),
                task: Mutex::new(None),
            }),
        }
    }

    /// Schedule the pass. Returns immediately; later calls are no-ops.
    ///
    /// If the job scheduler goes away before it is ready, the pass never
    /// starts and the scheduler can be armed again.
    pub fn arm(&self) {
        if self.inner.armed.swap(true, Ordering::SeqCst) {
            log::debug!("Metadata refresh already armed");
            return;
        }
        log::debug!(
            "Metadata refresh armed; starting {:?} after the job scheduler is ready",
            self.inner.settings.min_delay
        );
        let task = self.inner.runtime.spawn(fire(
            Arc::downgrade(&self.inner),
            self.inner.ready.clone(),
            self.inner.settings.min_delay,
        ));
        *lock(&self.inner.task) = Some(task);
    }

    pub fn is_armed(&self) -> bool {
        self.inner.armed.load(Ordering::SeqCst)
    }

    /// Progress handle for the pass.
    pub fn job(&self) -> &RefreshJob {
        &self.inner.job
    }

    /// Stop the pass before its next track.
    pub fn cancel(&self) {
        self.inner.job.cancel();
    }

    /// Wait for the armed pass to finish. `None` if never armed or already
    /// awaited.
    pub async fn wait(&self) -> Option<RefreshResult<RefreshReport>> {
        let task = lock(&self.inner.task).take()?;
        Some(match task.await {
            Ok(result) => result,
            Err(e) => Err(RefreshError::Join(e.to_string())),
        })
    }
}

impl RefreshHook for RefreshScheduler {
    fn arm(&self) {
        RefreshScheduler::arm(self);
    }
}

async fn fire(
    inner: Weak<Inner>,
    mut ready: watch::Receiver<bool>,
    min_delay: Duration,
) -> RefreshResult<RefreshReport> {
    let became_ready = ready.wait_for(|ready| *ready).await.map(|_| ());
    if became_ready.is_err() {
        log::warn!("Job scheduler went away; metadata refresh not started");
        if let Some(inner) = inner.upgrade() {
            inner.armed.store(false, Ordering::SeqCst);
        }
        return Err(RefreshError::SchedulerUnavailable);
    }
    tokio::time::sleep(min_delay).await;

    let Some(inner) = inner.upgrade() else {
        log::debug!("Refresh scheduler dropped before its pass started");
        return Err(RefreshError::SchedulerUnavailable);
    };
    if inner.job.is_cancelled() {
        log::info!("Metadata refresh cancelled before it started");
        return Ok(inner.job.report(None));
    }

    let mut conn = lock(&inner.conn)
        .take()
        .ok_or(RefreshError::ConnectionUnavailable)?;
    let worker = Arc::clone(&inner);
    tokio::task::spawn_blocking(move || {
        run_refresh_pass(
            &mut conn,
            worker.extractor.as_ref(),
            &worker.job,
            worker.settings.metadata_target,
        )
    })
    .await
    .map_err(|e| RefreshError::Join(e.to_string()))?
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
#[path = "scheduler_test.rs"]
mod tests;
