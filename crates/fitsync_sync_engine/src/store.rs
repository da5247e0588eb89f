//! The local document store seam.

use crate::error::SyncResult;
use async_trait::async_trait;
use fitsync_model::Document;

/// Whether a write created a document or replaced one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The path did not exist before.
    Created,
    /// Existing content was replaced.
    Updated,
}

impl WriteOutcome {
    /// Returns true for [`WriteOutcome::Created`].
    pub fn is_created(&self) -> bool {
        matches!(self, WriteOutcome::Created)
    }
}

/// Where rendered documents are written.
///
/// Paths are derived from the document alone, so re-rendering the same
/// row always targets the same path. Writes are last-writer-wins per path.
#[async_trait]
pub trait DocumentStore: Send + Sync + 'static {
    /// Computes the path of `document`.
    fn resolve_path(&self, document: &Document<'_>) -> SyncResult<String>;

    /// Writes `content` to `path`, creating parent containers as needed.
    async fn write_or_update(&self, path: &str, content: &str) -> SyncResult<WriteOutcome>;
}
