//! Per-path write serialization.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Hands out one async lock per document path.
///
/// Writers to different paths never contend. Entries are dropped again
/// once nobody holds or waits for them.
#[derive(Debug, Default)]
pub(crate) struct PathLocks {
    locks: Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>,
}

impl PathLocks {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Waits until `path` is free and locks it.
    pub(crate) async fn lock(&self, path: &str) -> PathGuard {
        let lock = {
            let mut locks = self.locks.lock();
            locks
                .entry(path.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        let guard = lock.clone().lock_owned().await;
        PathGuard {
            path: path.to_string(),
            lock,
            guard: Some(guard),
            locks: self.locks.clone(),
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.locks.lock().len()
    }
}

/// Holds the lock of one path until dropped.
pub(crate) struct PathGuard {
    path: String,
    lock: Arc<AsyncMutex<()>>,
    guard: Option<OwnedMutexGuard<()>>,
    locks: Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>,
}

impl Drop for PathGuard {
    fn drop(&mut self) {
        // Release first: the owned guard holds a reference of its own.
        self.guard.take();
        let mut locks = self.locks.lock();
        // One reference in the map, one here: nobody else is waiting.
        if Arc::strong_count(&self.lock) == 2 {
            locks.remove(&self.path);
        }
    }
}
