use super::*;
use crate::extractor::Extraction;
use crate::error::ExtractError;
use crate::signal::JobSchedulerSignal;
use tv_core::TrackRecord;
use tv_store::ledger::write_meta_version;
use tv_store::{LedgerVersions, LibraryDb, Migrator};

struct SkipAll;

impl MetadataExtractor for SkipAll {
    fn extract(&self, _track: &TrackRecord) -> Result<Extraction, ExtractError> {
        Ok(Extraction::Skipped)
    }
}

fn stale_library() -> LibraryDb {
    let mut db = LibraryDb::open_memory().unwrap();
    Migrator::for_library().unwrap().migrate(&mut db).unwrap();
    write_meta_version(db.conn(), 0).unwrap();
    db.conn()
        .execute_batch(
            "INSERT INTO core_tracks (track_id, primary_source_id, uri)
             VALUES (1, 1, 'file:///a.mp3'), (2, 1, 'file:///b.mp3')",
        )
        .unwrap();
    db
}

fn scheduler(db: &LibraryDb, signal: &JobSchedulerSignal) -> RefreshScheduler {
    RefreshScheduler::new(
        Handle::current(),
        db.try_clone_connection().unwrap(),
        Arc::new(SkipAll),
        signal.subscribe(),
        RefreshSettings {
            min_delay: Duration::from_millis(10),
            metadata_target: 3,
        },
    )
}

#[tokio::test]
async fn test_wait_without_arm_is_none() {
    let db = stale_library();
    let signal = JobSchedulerSignal::already_ready();
    let scheduler = scheduler(&db, &signal);

    assert!(!scheduler.is_armed());
    assert!(scheduler.wait().await.is_none());
}

#[tokio::test]
async fn test_armed_pass_advances_metadata_version() {
    let db = stale_library();
    let signal = JobSchedulerSignal::already_ready();
    let scheduler = scheduler(&db, &signal);

    scheduler.arm();
    let report = scheduler.wait().await.unwrap().unwrap();

    assert_eq!(report.total, 2);
    assert_eq!(report.skipped, 2);
    assert_eq!(report.metadata_version, Some(3));
    assert_eq!(LedgerVersions::read(db.conn()).unwrap().metadata, 3);
}

#[tokio::test]
async fn test_second_arm_is_noop() {
    let db = stale_library();
    let signal = JobSchedulerSignal::already_ready();
    let scheduler = scheduler(&db, &signal);

    scheduler.arm();
    scheduler.arm();
    assert!(scheduler.is_armed());
    assert!(scheduler.wait().await.unwrap().is_ok());
    assert!(scheduler.wait().await.is_none());
}

#[tokio::test]
async fn test_waits_for_job_scheduler() {
    let db = stale_library();
    let signal = JobSchedulerSignal::new();
    let scheduler = scheduler(&db, &signal);

    scheduler.arm();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(scheduler.job().total(), 0);
    assert_eq!(LedgerVersions::read(db.conn()).unwrap().metadata, 0);

    signal.mark_ready();
    let report = scheduler.wait().await.unwrap().unwrap();
    assert_eq!(report.processed, 2);
}

#[tokio::test]
async fn test_dropped_signal_is_scheduler_unavailable() {
    let db = stale_library();
    let signal = JobSchedulerSignal::new();
    let scheduler = scheduler(&db, &signal);

    scheduler.arm();
    drop(signal);

    let err = scheduler.wait().await.unwrap().unwrap_err();
    assert!(matches!(err, RefreshError::SchedulerUnavailable));
    assert!(!scheduler.is_armed());
    assert_eq!(LedgerVersions::read(db.conn()).unwrap().metadata, 0);
}

#[tokio::test]
async fn test_pending_pass_does_not_hold_scheduler() {
    let db = stale_library();
    let signal = JobSchedulerSignal::new();
    let scheduler = scheduler(&db, &signal);

    scheduler.arm();
    tokio::task::yield_now().await;

    assert_eq!(Arc::strong_count(&scheduler.inner), 1);
    let task = lock(&scheduler.inner.task).take().unwrap();
    drop(scheduler);
    signal.mark_ready();

    let err = task.await.unwrap().unwrap_err();
    assert!(matches!(err, RefreshError::SchedulerUnavailable));
    assert_eq!(LedgerVersions::read(db.conn()).unwrap().metadata, 0);
}

#[tokio::test]
async fn test_cancel_before_start_leaves_version() {
    let db = stale_library();
    let signal = JobSchedulerSignal::already_ready();
    let scheduler = scheduler(&db, &signal);

    scheduler.cancel();
    scheduler.arm();
    let report = scheduler.wait().await.unwrap().unwrap();

    assert!(report.cancelled);
    assert_eq!(report.metadata_version, None);
    assert_eq!(LedgerVersions::read(db.conn()).unwrap().metadata, 0);
}

#[tokio::test]
async fn test_armed_through_migrator_hook() {
    let mut db = LibraryDb::open_memory().unwrap();
    db.conn()
        .execute_batch(include_str!("../../tv-store/tests/fixtures/legacy_store.sql"))
        .unwrap();
    let signal = JobSchedulerSignal::already_ready();
    let scheduler = scheduler(&db, &signal);
    let mut migrator = Migrator::for_library()
        .unwrap()
        .with_refresh_hook(Arc::new(scheduler.clone()));

    let run = migrator.migrate(&mut db).unwrap();
    assert!(run.metadata_refresh_armed);

    let report = scheduler.wait().await.unwrap().unwrap();
    assert_eq!(report.total, 5);
    assert_eq!(
        LedgerVersions::read(db.conn()).unwrap().metadata,
        3
    );
}
