//! Migrate command implementation

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::runtime::Handle;
use tv_refresh::{FileProbeExtractor, JobSchedulerSignal, RefreshScheduler, RefreshSettings};
use tv_store::{MigrationOutcome, MigrationRun, Migrator};

use crate::cli::{GlobalArgs, MigrateArgs};
use crate::commands::common::{
    fail_with, load_context, open_library, print_refresh_report, wait_for_refresh,
    SlowOperationSpinner,
};

/// Execute the migrate command.
pub async fn execute(args: &MigrateArgs, global: &GlobalArgs) -> Result<()> {
    let ctx = load_context(global)?;
    let mut db = open_library(&ctx.db_path)?;

    let signal = JobSchedulerSignal::new();
    let scheduler = if ctx.config.refresh.enabled && !args.no_refresh {
        let conn = db
            .try_clone_connection()
            .context("Failed to open refresh connection")?;
        Some(RefreshScheduler::new(
            Handle::current(),
            conn,
            Arc::new(FileProbeExtractor),
            signal.subscribe(),
            RefreshSettings::from_config(&ctx.config.refresh),
        ))
    } else {
        None
    };

    let mut migrator = Migrator::for_library()
        .context("Invalid migration registry")?
        .with_pulse_interval(ctx.config.migration.pulse_interval());
    if let Some(scheduler) = &scheduler {
        migrator = migrator.with_refresh_hook(Arc::new(scheduler.clone()));
    }

    let result = {
        let _spinner = SlowOperationSpinner::attach(migrator.events());
        tokio::task::block_in_place(|| migrator.migrate(&mut db))
    };
    let run = result.map_err(|e| fail_with("Migration failed", &e))?;
    print_run(&run, &ctx.db_path.display().to_string());

    // The CLI has no other background jobs, so the scheduler is ready now.
    signal.mark_ready();

    match scheduler {
        Some(scheduler) if run.metadata_refresh_armed => {
            let report = wait_for_refresh(&scheduler).await?;
            print_refresh_report(&report);
        }
        None if metadata_stale(&migrator, &db) => {
            println!("Metadata is out of date; run `tv refresh` to update it");
        }
        _ => {}
    }
    Ok(())
}

fn metadata_stale(migrator: &Migrator, db: &tv_store::LibraryDb) -> bool {
    migrator
        .status(db)
        .map(|status| status.metadata_stale)
        .unwrap_or(false)
}

fn print_run(run: &MigrationRun, path: &str) {
    match run.outcome {
        MigrationOutcome::NotNeeded => {
            println!("Library {path} is up to date (v{:03})", run.to_version);
        }
        MigrationOutcome::Committed if run.from_version == 0 => {
            println!("Initialized library {path} at v{:03}", run.to_version);
        }
        MigrationOutcome::Committed => {
            println!(
                "Migrated library {path} from v{:03} to v{:03} ({} step(s))",
                run.from_version,
                run.to_version,
                run.steps_applied.len()
            );
        }
        MigrationOutcome::RolledBack | MigrationOutcome::Rejected => {}
    }
}
