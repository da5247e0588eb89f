//! Error types for the realtime channel manager.

use fitsync_model::SourceTable;
use thiserror::Error;

/// Result type for realtime operations.
pub type RealtimeResult<T> = Result<T, RealtimeError>;

/// Errors that can occur in the realtime channel manager.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RealtimeError {
    /// The transport rejected an operation.
    #[error("transport error on {table}: {message}")]
    Transport {
        /// Table of the affected channel.
        table: SourceTable,
        /// Error message.
        message: String,
    },

    /// The transport rejected new credentials.
    #[error("credential update rejected: {0}")]
    Credential(String),

    /// The manager task has stopped.
    #[error("realtime manager stopped")]
    Stopped,
}

impl RealtimeError {
    /// Creates a transport error.
    pub fn transport(table: SourceTable, message: impl Into<String>) -> Self {
        Self::Transport {
            table,
            message: message.into(),
        }
    }
}
