//! Errors surfaced by the CLI.

use fitsync_sync_engine::SyncError;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for CLI commands.
pub type CliResult<T> = Result<T, CliError>;

/// Errors that abort a CLI command.
#[derive(Error, Debug)]
pub enum CliError {
    /// The settings file could not be read or parsed.
    #[error("invalid settings file {path}: {message}")]
    Settings {
        /// Settings file path.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// The engine failed outside of a pass.
    #[error(transparent)]
    Sync(#[from] SyncError),

    /// A resync target could not be parsed.
    #[error("invalid resync target '{0}', expected recipe:<id>, mealprep:<id>, date:<YYYY-MM-DD>, inventory, medications or shopping")]
    InvalidTarget(String),

    /// A pass finished with recorded errors.
    #[error("sync pass finished with {0} error(s)")]
    PassFailed(usize),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
