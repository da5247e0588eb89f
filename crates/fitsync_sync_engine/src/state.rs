//! Persistent sync state: watermarks, key→path mapping and the error log.

use crate::error::{SyncError, SyncResult};
use crate::error_log::{ErrorLog, SyncErrorEntry};
use async_trait::async_trait;
use fitsync_model::{SourceTable, Timestamp};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::debug;

/// The persisted form of the sync state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncStateData {
    /// Start time of the last completed full pass.
    pub last_full_sync: Option<Timestamp>,
    /// Last synchronized time per table.
    pub watermarks: BTreeMap<SourceTable, Timestamp>,
    /// Stable document key → written path.
    pub file_mappings: BTreeMap<String, String>,
    /// Recent failures.
    pub errors: ErrorLog,
}

/// A point-in-time copy of the sync state, as exposed to drivers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncStateSnapshot {
    /// Start time of the last completed full pass.
    pub last_full_sync: Option<Timestamp>,
    /// Recent failures in insertion order.
    pub errors: Vec<SyncErrorEntry>,
    /// Last synchronized time per table.
    pub watermarks: BTreeMap<SourceTable, Timestamp>,
    /// Stable document key → written path.
    pub file_mappings: BTreeMap<String, String>,
}

/// Loads and saves [`SyncStateData`].
///
/// The state is opaque to the storage; implementations only have to
/// round-trip it.
#[async_trait]
pub trait StateStorage: Send + Sync {
    /// Loads the persisted state, or `None` if nothing was saved yet.
    async fn load(&self) -> SyncResult<Option<SyncStateData>>;

    /// Persists `state`, replacing what was saved before.
    async fn save(&self, state: &SyncStateData) -> SyncResult<()>;
}

/// Owns the sync state for the lifetime of the process.
///
/// Mutations take a short synchronous lock and never await while holding
/// it. Saves are serialized and always write the latest state, so a slow
/// save cannot overwrite a newer one.
pub struct SyncStateStore {
    data: Mutex<SyncStateData>,
    storage: Arc<dyn StateStorage>,
    save_guard: tokio::sync::Mutex<()>,
}

impl SyncStateStore {
    /// Loads the state from `storage`, falling back to an empty state.
    pub async fn load(storage: Arc<dyn StateStorage>) -> SyncResult<Self> {
        let mut data = storage.load().await?.unwrap_or_default();
        data.errors.truncate();
        debug!(
            watermarks = data.watermarks.len(),
            mappings = data.file_mappings.len(),
            errors = data.errors.len(),
            "loaded sync state"
        );
        Ok(Self::with_data(data, storage))
    }

    /// Creates a store backed by a fresh in-memory storage.
    pub fn in_memory() -> Self {
        Self::with_data(SyncStateData::default(), Arc::new(MemoryStateStorage::new()))
    }

    fn with_data(data: SyncStateData, storage: Arc<dyn StateStorage>) -> Self {
        Self {
            data: Mutex::new(data),
            storage,
            save_guard: tokio::sync::Mutex::new(()),
        }
    }

    /// Persists the current state.
    pub async fn save(&self) -> SyncResult<()> {
        let _guard = self.save_guard.lock().await;
        let data = self.data.lock().clone();
        self.storage.save(&data).await
    }

    /// Returns a copy of the current state.
    pub fn snapshot(&self) -> SyncStateSnapshot {
        let data = self.data.lock();
        SyncStateSnapshot {
            last_full_sync: data.last_full_sync,
            errors: data.errors.entries(),
            watermarks: data.watermarks.clone(),
            file_mappings: data.file_mappings.clone(),
        }
    }

    /// Returns the watermark of `table`.
    pub fn watermark(&self, table: SourceTable) -> Option<Timestamp> {
        self.data.lock().watermarks.get(&table).copied()
    }

    /// Moves the watermark of `table` to `timestamp` unless it is already
    /// later.
    pub fn advance_watermark(&self, table: SourceTable, timestamp: Timestamp) {
        let mut data = self.data.lock();
        let entry = data.watermarks.entry(table).or_insert(timestamp);
        if *entry < timestamp {
            *entry = timestamp;
        }
    }

    /// Forgets the watermark of `table` so the next pass reads it fully.
    pub fn clear_watermark(&self, table: SourceTable) {
        self.data.lock().watermarks.remove(&table);
    }

    /// The oldest watermark among `tables`; `None` if any of them has none.
    pub fn min_watermark(&self, tables: &[SourceTable]) -> Option<Timestamp> {
        let data = self.data.lock();
        tables
            .iter()
            .map(|table| data.watermarks.get(table).copied())
            .try_fold(Timestamp::MAX, |min, wm| wm.map(|wm| min.min(wm)))
            .filter(|_| !tables.is_empty())
    }

    /// Records the start time of a completed full pass.
    pub fn set_last_full_sync(&self, timestamp: Timestamp) {
        self.data.lock().last_full_sync = Some(timestamp);
    }

    /// Records where the document with `key` was written.
    pub fn set_file_mapping(&self, key: impl Into<String>, path: impl Into<String>) {
        self.data.lock().file_mappings.insert(key.into(), path.into());
    }

    /// Returns the recorded path of `key`.
    pub fn file_mapping(&self, key: &str) -> Option<String> {
        self.data.lock().file_mappings.get(key).cloned()
    }

    /// Removes the recorded path of `key`.
    pub fn remove_file_mapping(&self, key: &str) -> Option<String> {
        self.data.lock().file_mappings.remove(key)
    }

    /// Appends an entry to the bounded error log.
    pub fn add_error(&self, entry: SyncErrorEntry) {
        self.data.lock().errors.push(entry);
    }

    /// Empties the error log.
    pub fn clear_errors(&self) {
        self.data.lock().errors.clear();
    }

    /// Entries of the error log in insertion order.
    pub fn errors(&self) -> Vec<SyncErrorEntry> {
        self.data.lock().errors.entries()
    }

    /// Number of entries in the error log.
    pub fn error_count(&self) -> usize {
        self.data.lock().errors.len()
    }

    /// Resets everything to the empty state and persists it.
    pub async fn reset(&self) -> SyncResult<()> {
        *self.data.lock() = SyncStateData::default();
        self.save().await
    }
}

/// An in-memory state storage.
#[derive(Debug, Default)]
pub struct MemoryStateStorage {
    saved: Mutex<Option<SyncStateData>>,
    save_count: AtomicUsize,
    fail_saves: AtomicBool,
}

impl MemoryStateStorage {
    /// Creates an empty storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a storage that already holds `state`.
    pub fn with_state(state: SyncStateData) -> Self {
        Self {
            saved: Mutex::new(Some(state)),
            ..Self::default()
        }
    }

    /// The last saved state.
    pub fn saved(&self) -> Option<SyncStateData> {
        self.saved.lock().clone()
    }

    /// Number of successful saves.
    pub fn save_count(&self) -> usize {
        self.save_count.load(Ordering::SeqCst)
    }

    /// Makes subsequent saves fail.
    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl StateStorage for MemoryStateStorage {
    async fn load(&self) -> SyncResult<Option<SyncStateData>> {
        Ok(self.saved.lock().clone())
    }

    async fn save(&self, state: &SyncStateData) -> SyncResult<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(SyncError::Storage("memory storage rejects saves".into()));
        }
        *self.saved.lock() = Some(state.clone());
        self.save_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Stores the state as a JSON file.
///
/// Writes go to a sibling temporary file which is then renamed over the
/// target, so a crash never leaves a half-written state behind.
#[derive(Debug, Clone)]
pub struct JsonFileStorage {
    path: PathBuf,
}

impl JsonFileStorage {
    /// Creates a storage at `path`. The file is created on first save.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the state file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl StateStorage for JsonFileStorage {
    async fn load(&self) -> SyncResult<Option<SyncStateData>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, state: &SyncStateData) -> SyncResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let bytes = serde_json::to_vec_pretty(state)?;
        let temp = self.temp_path();
        tokio::fs::write(&temp, bytes).await?;
        tokio::fs::rename(&temp, &self.path).await?;
        Ok(())
    }
}
