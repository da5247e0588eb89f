//! Cross-crate integration test helpers.
//!
//! Wires a [`SyncEngine`] to the in-memory fakes of this crate and, for
//! realtime tests, a [`RealtimeManager`] dispatching into that engine.

use crate::clock::ManualClock;
use crate::render::StubRenderer;
use crate::source::MemoryDataSource;
use crate::store::MemoryDocumentStore;
use fitsync_model::Timestamp;
use fitsync_realtime::{MockChangeTransport, RealtimeConfig, RealtimeManager};
use fitsync_sync_engine::{
    Clock, JsonFileStorage, MemoryStateStorage, StateStorage, SyncConfig, SyncEngine,
    SyncStateStore,
};
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

/// The engine type every harness builds.
pub type TestEngine = SyncEngine<MemoryDataSource, MemoryDocumentStore, StubRenderer>;

/// Start time of every harness clock.
pub const HARNESS_START: Timestamp = 1_700_000_000_000;

async fn build_engine(
    config: SyncConfig,
    storage: Arc<dyn StateStorage>,
    clock: Arc<ManualClock>,
) -> TestEngine {
    let state = SyncStateStore::load(storage)
        .await
        .expect("Failed to load sync state");
    SyncEngine::new(
        config,
        MemoryDataSource::new(),
        MemoryDocumentStore::new(),
        StubRenderer::new(),
        state,
    )
    .with_clock(clock as Arc<dyn Clock>)
}

/// A test harness for engine tests.
pub struct EngineHarness {
    /// The engine under test.
    pub engine: Arc<TestEngine>,
    /// The engine's clock.
    pub clock: Arc<ManualClock>,
    /// Where the engine persists its state.
    pub storage: Arc<MemoryStateStorage>,
}

impl EngineHarness {
    /// Creates a harness with every table enabled.
    pub async fn new() -> Self {
        Self::with_config(SyncConfig::new()).await
    }

    /// Creates a harness with `config`.
    pub async fn with_config(config: SyncConfig) -> Self {
        Self::with_storage(config, Arc::new(MemoryStateStorage::new())).await
    }

    /// Creates a harness whose engine loads its state from `storage`.
    pub async fn with_storage(config: SyncConfig, storage: Arc<MemoryStateStorage>) -> Self {
        let clock = Arc::new(ManualClock::new(HARNESS_START));
        let engine = build_engine(config, storage.clone(), clock.clone()).await;
        Self {
            engine: Arc::new(engine),
            clock,
            storage,
        }
    }

    /// The engine's data source.
    pub fn source(&self) -> &MemoryDataSource {
        self.engine.source()
    }

    /// The engine's document store.
    pub fn store(&self) -> &MemoryDocumentStore {
        self.engine.store()
    }

    /// The engine's renderer.
    pub fn renderer(&self) -> &StubRenderer {
        self.engine.renderer()
    }

    /// Advances the clock by `millis` and returns the new time.
    pub fn tick(&self, millis: i64) -> Timestamp {
        self.clock.advance(millis)
    }

    /// Error log entries as `(entity_type, item_id)` pairs.
    pub fn error_scopes(&self) -> Vec<(String, String)> {
        self.engine
            .state()
            .errors
            .into_iter()
            .map(|e| (e.entity_type, e.item_id))
            .collect()
    }
}

/// A state file in a temporary directory.
pub struct JsonStateFixture {
    dir: TempDir,
}

impl JsonStateFixture {
    /// Creates an empty temporary directory.
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp dir"),
        }
    }

    /// Path of the state file. It does not exist before the first save.
    pub fn path(&self) -> PathBuf {
        self.dir.path().join("state").join("sync-state.json")
    }

    /// A storage over the state file.
    pub fn storage(&self) -> Arc<JsonFileStorage> {
        Arc::new(JsonFileStorage::new(self.path()))
    }

    /// Builds an engine persisting to the state file.
    pub async fn engine(&self, config: SyncConfig) -> TestEngine {
        let clock = Arc::new(ManualClock::new(HARNESS_START));
        build_engine(config, self.storage(), clock).await
    }
}

impl Default for JsonStateFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// An engine behind a realtime manager fed by a mock transport.
pub struct RealtimeHarness {
    /// The engine harness.
    pub harness: EngineHarness,
    /// The transport the manager subscribes through.
    pub transport: Arc<MockChangeTransport>,
    /// The manager under test.
    pub manager: RealtimeManager,
}

impl RealtimeHarness {
    /// Starts a manager over a fresh engine harness. Channels are not
    /// opened yet.
    pub async fn start(config: RealtimeConfig) -> Self {
        let harness = EngineHarness::new().await;
        let transport = Arc::new(MockChangeTransport::new());
        let manager = RealtimeManager::start(config, transport.clone(), harness.engine.clone());
        Self {
            harness,
            transport,
            manager,
        }
    }
}
