//! CLI argument definitions using clap derive API

use clap::{ArgAction, Args, Parser, Subcommand};

/// Tunevault - music library database tool
#[derive(Parser, Debug)]
#[command(name = "tv")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all commands
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Increase log output (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Path to tunevault.yml (default: ./tunevault.yml if present)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Library database path, overriding database.path
    #[arg(long, global = true, env = "TUNEVAULT_DB")]
    pub db: Option<String>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Bring the library database up to the current schema version
    Migrate(MigrateArgs),

    /// Show schema and metadata versions
    Status(StatusArgs),

    /// Re-derive track metadata from the music files
    Refresh(RefreshArgs),
}

/// Arguments for the migrate command
#[derive(Args, Debug)]
pub struct MigrateArgs {
    /// Do not run the metadata refresh after migrating
    #[arg(long)]
    pub no_refresh: bool,
}

/// Arguments for the status command
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Print status as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the refresh command
#[derive(Args, Debug)]
pub struct RefreshArgs {
    /// Refresh even when metadata is already current
    #[arg(long)]
    pub force: bool,
}

#[cfg(test)]
#[path = "cli_test.rs"]
mod tests;
