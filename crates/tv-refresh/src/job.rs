//! The metadata refresh pass and its shared progress counters.

use crate::error::RefreshResult;
use crate::extractor::{Extraction, MetadataExtractor};
use duckdb::Connection;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tv_core::TrackRecord;
use tv_store::ledger::write_meta_version;
use tv_store::query::{count_tracks, load_tracks, save_track_metadata};
use tv_store::with_transaction;

/// What happened to one track during a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    Ok,
    SoftFailure,
    Skipped,
}

#[derive(Debug, Default)]
struct Counters {
    total: AtomicUsize,
    processed: AtomicUsize,
    soft_failures: AtomicUsize,
    skipped: AtomicUsize,
    cancelled: AtomicBool,
    finished: AtomicBool,
}

/// Progress of a refresh pass, shared between the worker and observers.
///
/// Cloning yields another handle onto the same counters.
#[derive(Debug, Clone, Default)]
pub struct RefreshJob {
    counters: Arc<Counters>,
}

/// Snapshot of a [`RefreshJob`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshReport {
    pub total: usize,
    pub processed: usize,
    pub soft_failures: usize,
    pub skipped: usize,
    pub cancelled: bool,
    /// Metadata version recorded at the end, if the pass completed.
    pub metadata_version: Option<i32>,
}

impl RefreshJob {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fraction of tracks processed, from 0.0 to 1.0.
    pub fn progress(&self) -> f64 {
        let total = self.counters.total.load(Ordering::Relaxed);
        if total == 0 {
            return if self.is_finished() { 1.0 } else { 0.0 };
        }
        self.counters.processed.load(Ordering::Relaxed) as f64 / total as f64
    }

    pub fn total(&self) -> usize {
        self.counters.total.load(Ordering::Relaxed)
    }

    pub fn processed(&self) -> usize {
        self.counters.processed.load(Ordering::Relaxed)
    }

    /// Ask the pass to stop before its next track.
    pub fn cancel(&self) {
        self.counters.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.counters.cancelled.load(Ordering::SeqCst)
    }

    pub fn is_finished(&self) -> bool {
        self.counters.finished.load(Ordering::SeqCst)
    }

    pub fn report(&self, metadata_version: Option<i32>) -> RefreshReport {
        RefreshReport {
            total: self.counters.total.load(Ordering::Relaxed),
            processed: self.counters.processed.load(Ordering::Relaxed),
            soft_failures: self.counters.soft_failures.load(Ordering::Relaxed),
            skipped: self.counters.skipped.load(Ordering::Relaxed),
            cancelled: self.is_cancelled(),
            metadata_version,
        }
    }

    fn begin(&self, total: usize) {
        self.counters.total.store(total, Ordering::Relaxed);
        self.counters.processed.store(0, Ordering::Relaxed);
        self.counters.soft_failures.store(0, Ordering::Relaxed);
        self.counters.skipped.store(0, Ordering::Relaxed);
        self.counters.finished.store(false, Ordering::SeqCst);
    }

    fn record(&self, outcome: RecordOutcome) {
        match outcome {
            RecordOutcome::Ok => {}
            RecordOutcome::SoftFailure => {
                self.counters.soft_failures.fetch_add(1, Ordering::Relaxed);
            }
            RecordOutcome::Skipped => {
                self.counters.skipped.fetch_add(1, Ordering::Relaxed);
            }
        }
        self.counters.processed.fetch_add(1, Ordering::Relaxed);
    }
}

/// Re-derive metadata for every track, then record `metadata_target`.
///
/// Each track is saved in its own transaction. Extraction or save failures
/// are logged and counted and do not stop the pass. A cancelled pass stops
/// before its next track and leaves `MetadataVersion` untouched.
pub fn run_refresh_pass(
    conn: &mut Connection,
    extractor: &dyn MetadataExtractor,
    job: &RefreshJob,
    metadata_target: i32,
) -> RefreshResult<RefreshReport> {
    let tracks = if count_tracks(conn)? == 0 {
        Vec::new()
    } else {
        load_tracks(conn)?
    };
    job.begin(tracks.len());
    log::info!("Refreshing metadata for {} track(s)", tracks.len());

    for track in tracks {
        if job.is_cancelled() {
            log::info!(
                "Metadata refresh cancelled after {} of {} track(s)",
                job.processed(),
                job.total()
            );
            return Ok(job.report(None));
        }
        let outcome = refresh_track(conn, extractor, track);
        job.record(outcome);
    }

    with_transaction(conn, |conn| write_meta_version(conn, metadata_target))?;
    job.counters.finished.store(true, Ordering::SeqCst);

    let report = job.report(Some(metadata_target));
    log::info!(
        "Metadata refresh complete: {} processed, {} skipped, {} failed",
        report.processed,
        report.skipped,
        report.soft_failures
    );
    Ok(report)
}

fn refresh_track(
    conn: &mut Connection,
    extractor: &dyn MetadataExtractor,
    mut track: TrackRecord,
) -> RecordOutcome {
    let fields = match extractor.extract(&track) {
        Ok(Extraction::Enriched(fields)) if !fields.is_empty() => fields,
        Ok(_) => return RecordOutcome::Skipped,
        Err(e) => {
            log::warn!(
                "Failed to refresh metadata for track {} ({}): {e}",
                track.track_id,
                track.uri.as_deref().unwrap_or("no uri")
            );
            return RecordOutcome::SoftFailure;
        }
    };

    track.apply(&fields);
    let stamp = chrono::Utc::now().timestamp();
    match with_transaction(conn, |conn| save_track_metadata(conn, &track, stamp)) {
        Ok(()) => RecordOutcome::Ok,
        Err(e) => {
            log::warn!("Failed to save metadata for track {}: {e}", track.track_id);
            RecordOutcome::SoftFailure
        }
    }
}

#[cfg(test)]
#[path = "job_test.rs"]
mod tests;
