//! Where debounced resyncs are dispatched.

use async_trait::async_trait;
use fitsync_model::ResyncKey;
use fitsync_sync_engine::{DocumentStore, RemoteDataSource, Renderer, SyncEngine};
use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::debug;

/// Runs the single-item resync of one document.
///
/// Failures are the target's business; the manager only dispatches.
#[async_trait]
pub trait ResyncTarget: Send + Sync + 'static {
    /// Refreshes the document identified by `key`.
    async fn resync(&self, key: ResyncKey);
}

#[async_trait]
impl<S, D, R> ResyncTarget for SyncEngine<S, D, R>
where
    S: RemoteDataSource,
    D: DocumentStore,
    R: Renderer,
{
    async fn resync(&self, key: ResyncKey) {
        match SyncEngine::resync(self, &key).await {
            Ok(Some(outcome)) => debug!(key = %key, ?outcome, "resync wrote document"),
            Ok(None) => debug!(key = %key, "resync skipped"),
            // Already in the engine's error log.
            Err(e) => debug!(key = %key, error = %e, "resync failed"),
        }
    }
}

/// A target that records every dispatched key.
#[derive(Debug, Default)]
pub struct RecordingTarget {
    calls: Mutex<Vec<(ResyncKey, Instant)>>,
}

impl RecordingTarget {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Keys dispatched so far, in order.
    pub fn keys(&self) -> Vec<ResyncKey> {
        self.calls.lock().iter().map(|(key, _)| key.clone()).collect()
    }

    /// Keys with their dispatch time.
    pub fn calls(&self) -> Vec<(ResyncKey, Instant)> {
        self.calls.lock().clone()
    }

    /// Number of dispatches of `key`.
    pub fn count(&self, key: &ResyncKey) -> usize {
        self.calls.lock().iter().filter(|(k, _)| k == key).count()
    }

    /// Total number of dispatches.
    pub fn len(&self) -> usize {
        self.calls.lock().len()
    }

    /// Returns true if nothing was dispatched.
    pub fn is_empty(&self) -> bool {
        self.calls.lock().is_empty()
    }
}

#[async_trait]
impl ResyncTarget for RecordingTarget {
    async fn resync(&self, key: ResyncKey) {
        self.calls.lock().push((key, Instant::now()));
    }
}
