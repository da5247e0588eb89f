//! fitsync CLI
//!
//! Mirrors a fitness tracker export into a markdown vault.
//!
//! # Commands
//!
//! - `full` - Rewrite every document
//! - `incremental` - Rewrite documents changed since the last pass
//! - `watch` - Run a full pass, then incremental passes on an interval
//! - `resync` - Re-render a single document
//! - `state` - Display watermarks, mappings and recorded errors
//! - `reset` - Forget the persisted sync state

mod commands;
mod error;
mod markdown;
mod settings;
mod snapshot;
mod vault;

use clap::{Parser, Subcommand};
use commands::Workspace;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Mirrors fitness data into a markdown vault.
#[derive(Parser)]
#[command(name = "fitsync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the vault directory
    #[arg(global = true, long, default_value = ".")]
    vault: PathBuf,

    /// JSON export of the remote tables [default: <vault>/.fitsync/export.json]
    #[arg(global = true, short, long)]
    data: Option<PathBuf>,

    /// Settings file [default: <vault>/.fitsync/settings.json]
    #[arg(global = true, short, long)]
    settings: Option<PathBuf>,

    /// Sync state file [default: <vault>/.fitsync/state.json]
    #[arg(global = true, long)]
    state: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rewrite every document
    Full,

    /// Rewrite documents changed since the last pass
    Incremental,

    /// Sync on an interval until interrupted
    Watch,

    /// Re-render a single document
    Resync {
        /// recipe:<id>, mealprep:<id>, date:<YYYY-MM-DD>, inventory, medications or shopping
        target: String,
    },

    /// Display the persisted sync state
    State {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Forget watermarks, mappings and errors
    Reset,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let workspace = Workspace::new(cli.vault, cli.data, cli.settings, cli.state);

    match cli.command {
        Commands::Full => commands::sync::run(&workspace, true).await?,
        Commands::Incremental => commands::sync::run(&workspace, false).await?,
        Commands::Watch => commands::watch::run(&workspace).await?,
        Commands::Resync { target } => commands::resync::run(&workspace, &target).await?,
        Commands::State { format } => commands::state::run(&workspace, &format).await?,
        Commands::Reset => commands::reset::run(&workspace).await?,
    }

    Ok(())
}
