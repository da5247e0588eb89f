//! Error types for the sync engine.

use fitsync_model::{DocumentKind, SourceTable};
use std::any::Any;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur during sync operations.
#[derive(Error, Debug)]
pub enum SyncError {
    /// The remote data source rejected or failed a read.
    #[error("failed to read {table}: {message}")]
    Source {
        /// Table being read.
        table: SourceTable,
        /// Error message.
        message: String,
    },

    /// A row could not be rendered.
    #[error("failed to render {kind} document {key}: {message}")]
    Render {
        /// Document kind.
        kind: DocumentKind,
        /// Mapping key of the document.
        key: String,
        /// Error message.
        message: String,
    },

    /// The local document store rejected a write.
    #[error("failed to write {path}: {message}")]
    Write {
        /// Target path.
        path: String,
        /// Error message.
        message: String,
    },

    /// The sync state could not be loaded or saved.
    #[error("state storage error: {0}")]
    Storage(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A collaborator panicked while a pass was running.
    #[error("pass aborted by panic: {0}")]
    Panicked(String),

    /// A date could not be parsed.
    #[error("invalid date: {0}")]
    InvalidDate(String),
}

impl SyncError {
    /// Creates a fetch failure for `table`.
    pub fn source(table: SourceTable, message: impl Into<String>) -> Self {
        Self::Source {
            table,
            message: message.into(),
        }
    }

    /// Creates a render failure.
    pub fn render(kind: DocumentKind, key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Render {
            kind,
            key: key.into(),
            message: message.into(),
        }
    }

    /// Creates a write failure.
    pub fn write(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Write {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a panic error from a caught unwind payload.
    pub fn panicked(payload: &(dyn Any + Send)) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        Self::Panicked(message)
    }

    /// Returns true if the error came from the remote side.
    pub fn is_fetch_failure(&self) -> bool {
        matches!(self, SyncError::Source { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = SyncError::source(SourceTable::Recipes, "connection reset");
        assert_eq!(err.to_string(), "failed to read recipes: connection reset");
        assert!(err.is_fetch_failure());

        let err = SyncError::render(DocumentKind::Recipe, "r2", "missing title");
        assert!(err.to_string().contains("recipe document r2"));
        assert!(!err.is_fetch_failure());

        let err = SyncError::write("rezepte/Soup.md", "read-only");
        assert_eq!(err.to_string(), "failed to write rezepte/Soup.md: read-only");
    }

    #[test]
    fn panic_payloads_keep_their_message() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(SyncError::panicked(payload.as_ref()).to_string(), "pass aborted by panic: boom");

        let payload: Box<dyn Any + Send> = Box::new(String::from("bad row"));
        assert!(SyncError::panicked(payload.as_ref()).to_string().ends_with("bad row"));

        let payload: Box<dyn Any + Send> = Box::new(7_u8);
        assert!(SyncError::panicked(payload.as_ref()).to_string().ends_with("unknown panic"));
    }

    #[test]
    fn io_errors_convert() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: SyncError = io.into();
        assert!(matches!(err, SyncError::Io(_)));
    }
}
