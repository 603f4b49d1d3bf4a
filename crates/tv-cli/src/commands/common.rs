//! Shared utilities for CLI commands

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tv_core::Config;
use tv_refresh::{RefreshReport, RefreshScheduler};
use tv_store::{EventBus, LibraryDb, MigrationEvent, StoreError, SubscriptionId};

use crate::cli::GlobalArgs;

/// Error type representing a non-zero process exit code.
///
/// Use `return Err(ExitCode(N).into())` instead of `std::process::exit(N)`
/// so that destructors (and DuckDB's checkpoint on close) still run.
#[derive(Debug)]
pub(crate) struct ExitCode(pub(crate) u8);

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Empty: the failure has already been reported by the command.
        write!(f, "")
    }
}

impl std::error::Error for ExitCode {}

/// Exit code for a library written by a newer Tunevault.
pub(crate) const EXIT_SCHEMA_TOO_NEW: u8 = 2;

/// Loaded configuration plus the resolved database path.
pub(crate) struct LibraryContext {
    pub config: Config,
    pub db_path: PathBuf,
}

/// Load `tunevault.yml` (or defaults) and resolve the library path.
///
/// Relative `database.path` values resolve against the config file's
/// directory, or the working directory when no file is given.
pub(crate) fn load_context(global: &GlobalArgs) -> Result<LibraryContext> {
    let cwd = std::env::current_dir().context("Failed to read current directory")?;
    let (config, root) = match &global.config {
        Some(path) => {
            let path = Path::new(path);
            let config = Config::load(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?;
            let root = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map_or_else(|| cwd.clone(), Path::to_path_buf);
            (config, root)
        }
        None => (
            Config::load_from_dir_or_default(&cwd).context("Failed to load tunevault.yml")?,
            cwd.clone(),
        ),
    };

    let db_path = match &global.db {
        Some(db) => cwd.join(db),
        None => config.database_path_absolute(&root),
    };
    log::debug!("Library database: {}", db_path.display());
    Ok(LibraryContext { config, db_path })
}

/// Open the library database, creating the file if needed.
pub(crate) fn open_library(path: &Path) -> Result<LibraryDb> {
    LibraryDb::open(path).with_context(|| format!("Failed to open library {}", path.display()))
}

/// Report a store error with its source chain and turn it into an exit code.
pub(crate) fn fail_with(context: &str, err: &StoreError) -> anyhow::Error {
    eprintln!("{context}: {err}");
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        eprintln!("  caused by: {cause}");
        source = cause.source();
    }
    let code = match err {
        StoreError::SchemaTooNew { .. } => EXIT_SCHEMA_TOO_NEW,
        _ => 1,
    };
    ExitCode(code).into()
}

/// Spinner shown while a slow migration step runs.
pub(crate) struct SlowOperationSpinner {
    events: Arc<EventBus>,
    subscription: SubscriptionId,
    bar: Arc<Mutex<Option<ProgressBar>>>,
}

impl SlowOperationSpinner {
    pub(crate) fn attach(events: &Arc<EventBus>) -> Self {
        let bar: Arc<Mutex<Option<ProgressBar>>> = Arc::new(Mutex::new(None));
        let slot = Arc::clone(&bar);
        let subscription = events.subscribe(move |event| {
            let mut slot = slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            match event {
                MigrationEvent::SlowOperationStarted { title, message } => {
                    let spinner = ProgressBar::new_spinner();
                    spinner.set_style(
                        ProgressStyle::default_spinner()
                            .template("{spinner:.green} [{elapsed_precise}] {prefix:.bold} {msg}")
                            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
                    );
                    spinner.set_prefix(title.clone());
                    spinner.set_message(message.clone());
                    *slot = Some(spinner);
                }
                MigrationEvent::SlowOperationPulse => {
                    if let Some(spinner) = slot.as_ref() {
                        spinner.tick();
                    }
                }
                MigrationEvent::SlowOperationFinished => {
                    if let Some(spinner) = slot.take() {
                        spinner.finish_and_clear();
                    }
                }
                MigrationEvent::MigrationStarted | MigrationEvent::MigrationFinished => {}
            }
        });
        Self {
            events: Arc::clone(events),
            subscription,
            bar,
        }
    }
}

impl Drop for SlowOperationSpinner {
    fn drop(&mut self) {
        self.events.unsubscribe(self.subscription);
        let mut slot = self.bar.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(spinner) = slot.take() {
            spinner.finish_and_clear();
        }
    }
}

/// Wait for an armed refresh while drawing its progress.
pub(crate) async fn wait_for_refresh(scheduler: &RefreshScheduler) -> Result<RefreshReport> {
    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );
    pb.set_message("refreshing metadata");

    let job = scheduler.job().clone();
    let wait = scheduler.wait();
    tokio::pin!(wait);
    let mut ticker = tokio::time::interval(Duration::from_millis(100));

    let outcome = loop {
        tokio::select! {
            outcome = &mut wait => break outcome,
            _ = ticker.tick() => {
                pb.set_length(job.total() as u64);
                pb.set_position(job.processed() as u64);
            }
        }
    };
    pb.finish_and_clear();

    let report = outcome
        .context("Metadata refresh was never scheduled")?
        .context("Metadata refresh failed")?;
    Ok(report)
}

/// One-line summary of a refresh pass.
pub(crate) fn print_refresh_report(report: &RefreshReport) {
    if report.cancelled {
        println!(
            "Metadata refresh cancelled after {} of {} track(s)",
            report.processed, report.total
        );
        return;
    }
    println!(
        "Refreshed metadata for {} track(s): {} skipped, {} failed",
        report.processed, report.skipped, report.soft_failures
    );
    if let Some(version) = report.metadata_version {
        println!("Metadata version is now {version}");
    }
}

/// Print a table with column headers.
pub(crate) fn print_table(headers: &[&str], rows: &[Vec<String>]) {
    let widths = calculate_column_widths(headers, rows);

    let header_parts: Vec<String> = headers
        .iter()
        .zip(&widths)
        .map(|(h, &w)| format!("{:<width$}", h, width = w))
        .collect();
    println!("{}", header_parts.join("  "));

    let sep_parts: Vec<String> = widths.iter().map(|&w| "-".repeat(w)).collect();
    println!("{}", sep_parts.join("  "));

    for row in rows {
        let row_parts: Vec<String> = row
            .iter()
            .zip(&widths)
            .map(|(cell, &w)| format!("{:<width$}", cell, width = w))
            .collect();
        println!("{}", row_parts.join("  "));
    }
}

fn calculate_column_widths(headers: &[&str], rows: &[Vec<String>]) -> Vec<usize> {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if let Some(width) = widths.get_mut(i) {
                *width = (*width).max(cell.chars().count());
            }
        }
    }
    widths
}

#[cfg(test)]
#[path = "common_test.rs"]
mod tests;
