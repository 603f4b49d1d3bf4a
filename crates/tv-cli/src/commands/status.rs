//! Status command implementation

use anyhow::{Context, Result};
use tv_store::{LibraryDb, LibraryStatus, Migrator};

use crate::cli::{GlobalArgs, StatusArgs};
use crate::commands::common::{fail_with, load_context, open_library, print_table};

/// Execute the status command.
pub async fn execute(args: &StatusArgs, global: &GlobalArgs) -> Result<()> {
    let ctx = load_context(global)?;
    let migrator = Migrator::for_library().context("Invalid migration registry")?;

    // Don't create a database file just to report on it.
    let db = if ctx.db_path.exists() {
        open_library(&ctx.db_path)?
    } else {
        LibraryDb::open_memory().context("Failed to open scratch database")?
    };
    let status = migrator
        .status(&db)
        .map_err(|e| fail_with("Failed to read library status", &e))?;

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&status).context("Failed to serialize status")?
        );
        return Ok(());
    }

    println!("Library: {}", ctx.db_path.display());
    if !ctx.db_path.exists() {
        println!("(does not exist yet; `tv migrate` will create it)");
    }
    print_versions(&status);
    Ok(())
}

fn print_versions(status: &LibraryStatus) {
    println!(
        "Schema version:   {} (supported: {})",
        status.database_version, status.supported_version
    );
    println!(
        "Metadata version: {} (current: {})",
        status.metadata_version, status.supported_metadata_version
    );

    if status.schema_too_new {
        println!("\nThis library was written by a newer Tunevault and cannot be opened.");
        return;
    }
    if status.pending.is_empty() {
        println!("\nNo pending migrations.");
    } else {
        println!("\nPending migrations:");
        let rows: Vec<Vec<String>> = status
            .pending
            .iter()
            .map(|step| vec![format!("v{:03}", step.version), step.name.to_string()])
            .collect();
        print_table(&["VERSION", "STEP"], &rows);
    }
    if status.metadata_stale {
        println!("\nMetadata is out of date; `tv migrate` or `tv refresh` will update it.");
    }
}
