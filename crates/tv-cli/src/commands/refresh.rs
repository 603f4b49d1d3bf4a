//! Refresh command implementation

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tv_refresh::{FileProbeExtractor, JobSchedulerSignal, RefreshScheduler, RefreshSettings};
use tv_store::Migrator;

use crate::cli::{GlobalArgs, RefreshArgs};
use crate::commands::common::{
    fail_with, load_context, open_library, print_refresh_report, wait_for_refresh, ExitCode,
};

/// Execute the refresh command.
pub async fn execute(args: &RefreshArgs, global: &GlobalArgs) -> Result<()> {
    let ctx = load_context(global)?;
    if !ctx.db_path.exists() {
        eprintln!(
            "No library at {}; run `tv migrate` first",
            ctx.db_path.display()
        );
        return Err(ExitCode(1).into());
    }
    let db = open_library(&ctx.db_path)?;

    let migrator = Migrator::for_library().context("Invalid migration registry")?;
    let status = migrator
        .status(&db)
        .map_err(|e| fail_with("Failed to read library status", &e))?;
    if status.database_version != status.supported_version {
        eprintln!(
            "Library is at schema v{:03} but v{:03} is required; run `tv migrate` first",
            status.database_version, status.supported_version
        );
        return Err(ExitCode(1).into());
    }
    if !status.metadata_stale && !args.force {
        println!(
            "Metadata is up to date (v{}); use --force to refresh anyway",
            status.metadata_version
        );
        return Ok(());
    }

    let signal = JobSchedulerSignal::already_ready();
    let settings = RefreshSettings {
        min_delay: Duration::ZERO,
        ..RefreshSettings::from_config(&ctx.config.refresh)
    };
    let scheduler = RefreshScheduler::new(
        Handle::current(),
        db.try_clone_connection()
            .context("Failed to open refresh connection")?,
        Arc::new(FileProbeExtractor),
        signal.subscribe(),
        settings,
    );
    scheduler.arm();

    let report = wait_for_refresh(&scheduler).await?;
    print_refresh_report(&report);
    Ok(())
}
