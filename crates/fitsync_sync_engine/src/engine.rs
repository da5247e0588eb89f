//! The synchronization engine.

use crate::clock::{Clock, SystemClock};
use crate::config::{SuccessPolicy, SyncConfig, SyncToggles};
use crate::error::{SyncError, SyncResult};
use crate::error_log::{SyncErrorEntry, DAILY_SCOPE, ENGINE_SCOPE};
use crate::locks::PathLocks;
use crate::pass::{
    PassCounters, ProgressFn, SyncMode, SyncPassResult, SyncProgress, SyncStage, SyncStats,
};
use crate::render::{RenderContext, Renderer};
use crate::source::RemoteDataSource;
use crate::state::{SyncStateSnapshot, SyncStateStore};
use crate::store::{DocumentStore, WriteOutcome};
use chrono::NaiveDate;
use futures::FutureExt;
use fitsync_model::{Document, ResyncKey, SourceTable, Timestamp};
use parking_lot::RwLock;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Bookkeeping of one running pass.
struct PassRun {
    mode: SyncMode,
    started_at: Timestamp,
    counters: PassCounters,
    errors: Vec<SyncErrorEntry>,
}

impl PassRun {
    fn count(&mut self, outcome: WriteOutcome) {
        match outcome {
            WriteOutcome::Created => self.counters.created += 1,
            WriteOutcome::Updated => self.counters.updated += 1,
        }
    }
}

/// Keeps a [`DocumentStore`] consistent with a [`RemoteDataSource`].
///
/// Full and incremental passes are single-flight: a pass started while
/// another one runs waits for it. Single-item resyncs never wait for a
/// pass and may run concurrently with it and with each other.
pub struct SyncEngine<S: RemoteDataSource, D: DocumentStore, R: Renderer> {
    config: RwLock<SyncConfig>,
    source: Arc<S>,
    store: Arc<D>,
    renderer: Arc<R>,
    state: SyncStateStore,
    clock: Arc<dyn Clock>,
    context: RwLock<RenderContext>,
    pass_guard: tokio::sync::Mutex<()>,
    path_locks: PathLocks,
    stats: RwLock<SyncStats>,
}

impl<S: RemoteDataSource, D: DocumentStore, R: Renderer> SyncEngine<S, D, R> {
    /// Creates a new sync engine.
    pub fn new(config: SyncConfig, source: S, store: D, renderer: R, state: SyncStateStore) -> Self {
        Self {
            config: RwLock::new(config),
            source: Arc::new(source),
            store: Arc::new(store),
            renderer: Arc::new(renderer),
            state,
            clock: Arc::new(SystemClock),
            context: RwLock::new(RenderContext::default()),
            pass_guard: tokio::sync::Mutex::new(()),
            path_locks: PathLocks::new(),
            stats: RwLock::new(SyncStats::default()),
        }
    }

    /// Replaces the wall clock used for watermarks and error timestamps.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// The remote data source.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// The local document store.
    pub fn store(&self) -> &D {
        &self.store
    }

    /// The renderer.
    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// The sync state store.
    pub fn state_store(&self) -> &SyncStateStore {
        &self.state
    }

    /// Gets the current configuration.
    pub fn config(&self) -> SyncConfig {
        self.config.read().clone()
    }

    /// Replaces the configuration.
    ///
    /// Tables that become enabled lose their watermark, so the next
    /// incremental pass reads them completely.
    pub async fn update_config(&self, config: SyncConfig) -> SyncResult<()> {
        let enabled = {
            let mut current = self.config.write();
            let enabled = config.toggles.newly_enabled(&current.toggles);
            *current = config;
            enabled
        };
        if enabled.is_empty() {
            return Ok(());
        }
        for table in &enabled {
            info!(table = %table, "table enabled, watermark cleared");
            self.state.clear_watermark(*table);
        }
        self.state.save().await
    }

    /// Gets the current stats.
    pub fn stats(&self) -> SyncStats {
        self.stats.read().clone()
    }

    /// Returns the persisted sync state.
    pub fn state(&self) -> SyncStateSnapshot {
        self.state.snapshot()
    }

    /// Returns a copy of the lookup caches handed to the renderer.
    pub fn render_context(&self) -> RenderContext {
        self.context.read().clone()
    }

    /// Forgets watermarks, mappings and errors and drops the caches.
    ///
    /// Waits for a running pass to finish first.
    pub async fn reset_state(&self) -> SyncResult<()> {
        let _pass = self.pass_guard.lock().await;
        *self.context.write() = RenderContext::default();
        self.state.reset().await?;
        info!("sync state reset");
        Ok(())
    }

    /// Appends a failure to the shared error log.
    pub fn record_error(&self, entity_type: &str, item_id: &str, error: &SyncError) -> SyncErrorEntry {
        warn!(entity_type, item_id, error = %error, "sync error recorded");
        let entry = SyncErrorEntry {
            entity_type: entity_type.to_string(),
            item_id: item_id.to_string(),
            message: error.to_string(),
            timestamp: self.clock.now(),
        };
        self.state.add_error(entry.clone());
        entry
    }

    /// Reads every enabled table without watermarks and rewrites every
    /// document, then moves every watermark to the pass start time.
    pub async fn full_sync(&self, progress: Option<&ProgressFn>) -> SyncPassResult {
        self.run_pass(SyncMode::Full, progress).await
    }

    /// Reads rows changed since each table's watermark and rewrites the
    /// documents they belong to. Inventory and shopping list are always
    /// rewritten from a complete read.
    pub async fn incremental_sync(&self, progress: Option<&ProgressFn>) -> SyncPassResult {
        self.run_pass(SyncMode::Incremental, progress).await
    }

    async fn run_pass(&self, mode: SyncMode, progress: Option<&ProgressFn>) -> SyncPassResult {
        let _pass = self.pass_guard.lock().await;
        let timer = Instant::now();
        let config = self.config();
        let mut run = PassRun {
            mode,
            started_at: self.clock.now(),
            counters: PassCounters::default(),
            errors: Vec::new(),
        };
        self.state.clear_errors();
        info!(mode = %mode, "sync pass started");

        let stages = async {
            for stage in SyncStage::ORDER {
                if !stage.is_enabled(&config.toggles) {
                    debug!(stage = %stage, "stage disabled");
                    continue;
                }
                if let Some(progress) = progress {
                    progress(SyncProgress { mode, stage });
                }
                self.run_stage(stage, &mut run, &config.toggles).await;
            }
        };
        // A panicking collaborator aborts the remaining stages, not the pass.
        let outcome = AssertUnwindSafe(stages).catch_unwind().await;
        let completed = match outcome {
            Ok(()) => true,
            Err(payload) => {
                let e = SyncError::panicked(payload.as_ref());
                warn!(mode = %mode, error = %e, "sync pass aborted");
                self.fail(&mut run, ENGINE_SCOPE, mode.pass_name(), &e);
                false
            }
        };

        if mode == SyncMode::Full && completed {
            for table in SourceTable::ALL {
                self.state.advance_watermark(table, run.started_at);
            }
            self.state.set_last_full_sync(run.started_at);
        }

        if let Err(e) = self.state.save().await {
            self.fail(&mut run, ENGINE_SCOPE, mode.pass_name(), &e);
        }

        let errors = match config.success_policy {
            SuccessPolicy::CumulativeLog => self.state.errors(),
            SuccessPolicy::PassOnly => run.errors,
        };
        let result = SyncPassResult {
            success: errors.is_empty(),
            files_created: run.counters.created,
            files_updated: run.counters.updated,
            errors,
            duration: timer.elapsed(),
        };

        {
            let mut stats = self.stats.write();
            stats.passes_completed += 1;
            match mode {
                SyncMode::Full => stats.full_passes += 1,
                SyncMode::Incremental => stats.incremental_passes += 1,
            }
            stats.last_pass_duration = Some(result.duration);
        }

        info!(
            mode = %mode,
            success = result.success,
            created = result.files_created,
            updated = result.files_updated,
            errors = result.errors.len(),
            duration_ms = result.duration.as_millis() as u64,
            "sync pass finished"
        );
        result
    }

    async fn run_stage(&self, stage: SyncStage, run: &mut PassRun, toggles: &SyncToggles) {
        match stage {
            SyncStage::Profile => self.pass_profile(run).await,
            SyncStage::Medications => self.pass_medications(run).await,
            SyncStage::Recipes => self.pass_recipes(run).await,
            SyncStage::MealprepPlans => self.pass_mealprep_plans(run).await,
            SyncStage::Inventory => self.pass_inventory(run).await,
            SyncStage::ShoppingList => self.pass_shopping_list(run).await,
            SyncStage::DailyNotes => self.pass_daily_notes(run, toggles).await,
        }
    }

    async fn pass_profile(&self, run: &mut PassRun) {
        let table = SourceTable::Profile;
        let profile = match self.source.fetch_profile().await {
            Ok(profile) => profile,
            // The profile has a single row, so its id doubles as the scope.
            Err(e) => return self.fail(run, table.name(), "profile", &e),
        };
        self.context.write().profile = profile.clone();
        match profile {
            Some(profile) => {
                let result = self.write_document(&Document::Profile(&profile)).await;
                self.tally(run, result, table.name(), "profile");
            }
            None => debug!("no profile row"),
        }
        self.table_fetched(run, table);
    }

    async fn pass_medications(&self, run: &mut PassRun) {
        let table = SourceTable::Medications;
        let medications = match self.source.list_medications().await {
            Ok(medications) => medications,
            Err(e) => return self.fail_fetch(run, table.name(), &e),
        };
        self.context.write().set_medications(&medications);
        let result = self.write_document(&Document::Medications(&medications)).await;
        self.tally(run, result, table.name(), "medications");
        self.table_fetched(run, table);
    }

    async fn pass_recipes(&self, run: &mut PassRun) {
        let table = SourceTable::Recipes;
        let since = self.since(run.mode, table);
        let recipes = match self.source.list_recipes(since).await {
            Ok(recipes) => recipes,
            Err(e) => return self.fail_fetch(run, table.name(), &e),
        };
        debug!(count = recipes.len(), ?since, "recipes fetched");
        {
            let mut context = self.context.write();
            match run.mode {
                SyncMode::Full => context.set_recipes(&recipes),
                SyncMode::Incremental => context.upsert_recipes(&recipes),
            }
        }
        for recipe in &recipes {
            let result = self.write_document(&Document::Recipe(recipe)).await;
            self.tally(run, result, table.name(), &recipe.id);
        }
        self.table_fetched(run, table);
    }

    async fn pass_mealprep_plans(&self, run: &mut PassRun) {
        let table = SourceTable::MealprepPlans;
        let since = self.since(run.mode, table);
        let plans = match self.source.list_mealprep_plans(since).await {
            Ok(plans) => plans,
            Err(e) => return self.fail_fetch(run, table.name(), &e),
        };
        debug!(count = plans.len(), ?since, "meal-prep plans fetched");
        for plan in &plans {
            let result = self.write_document(&Document::MealprepPlan(plan)).await;
            self.tally(run, result, table.name(), &plan.id);
        }
        self.table_fetched(run, table);
    }

    async fn pass_inventory(&self, run: &mut PassRun) {
        let table = SourceTable::InventoryItems;
        let items = match self.source.list_inventory_items().await {
            Ok(items) => items,
            Err(e) => return self.fail_fetch(run, table.name(), &e),
        };
        let result = self.write_document(&Document::Inventory(&items)).await;
        self.tally(run, result, table.name(), "inventory");
        self.table_fetched(run, table);
    }

    async fn pass_shopping_list(&self, run: &mut PassRun) {
        let table = SourceTable::ShoppingItems;
        let items = match self.source.list_shopping_items().await {
            Ok(items) => items,
            Err(e) => return self.fail_fetch(run, table.name(), &e),
        };
        let result = self.write_document(&Document::ShoppingList(&items)).await;
        self.tally(run, result, table.name(), "shopping_list");
        self.table_fetched(run, table);
    }

    async fn pass_daily_notes(&self, run: &mut PassRun, toggles: &SyncToggles) {
        let since = match run.mode {
            SyncMode::Full => None,
            SyncMode::Incremental => self.state.min_watermark(&SourceTable::DAILY_SOURCES),
        };
        let dates = match self.source.list_dates_touched(since).await {
            Ok(dates) => dates,
            Err(e) => return self.fail_fetch(run, DAILY_SCOPE, &e),
        };
        debug!(count = dates.len(), ?since, "daily dates touched");
        for date in dates {
            match self.write_date(date, toggles).await {
                Ok(Some(outcome)) => run.count(outcome),
                Ok(None) => {}
                Err(e) => self.fail(run, DAILY_SCOPE, &date.to_string(), &e),
            }
        }
        for table in SourceTable::DAILY_SOURCES {
            self.table_fetched(run, table);
        }
    }

    /// Watermark filter for `table` in `mode`.
    fn since(&self, mode: SyncMode, table: SourceTable) -> Option<Timestamp> {
        match mode {
            SyncMode::Full => None,
            SyncMode::Incremental => self.state.watermark(table),
        }
    }

    /// Incremental passes advance a table once its rows were read, whether
    /// or not every row could be written.
    fn table_fetched(&self, run: &PassRun, table: SourceTable) {
        if run.mode == SyncMode::Incremental {
            self.state.advance_watermark(table, run.started_at);
        }
    }

    fn tally(
        &self,
        run: &mut PassRun,
        result: SyncResult<WriteOutcome>,
        entity_type: &str,
        item_id: &str,
    ) {
        match result {
            Ok(outcome) => run.count(outcome),
            Err(e) => self.fail(run, entity_type, item_id, &e),
        }
    }

    fn fail(&self, run: &mut PassRun, entity_type: &str, item_id: &str, error: &SyncError) {
        let entry = self.record_error(entity_type, item_id, error);
        run.errors.push(entry);
    }

    fn fail_fetch(&self, run: &mut PassRun, entity_type: &str, error: &SyncError) {
        let marker = run.mode.scope_marker();
        self.fail(run, entity_type, marker, error);
    }

    fn is_enabled(&self, table: SourceTable) -> bool {
        self.config.read().toggles.is_enabled(table)
    }

    fn toggles(&self) -> SyncToggles {
        self.config.read().toggles.clone()
    }

    /// Renders `document`, writes it under the per-path lock and records
    /// the path.
    async fn write_document(&self, document: &Document<'_>) -> SyncResult<WriteOutcome> {
        let content = {
            let context = self.context.read();
            self.renderer.render(document, &context)?
        };
        let path = self.store.resolve_path(document)?;
        let outcome = {
            let _lock = self.path_locks.lock(&path).await;
            self.store.write_or_update(&path, &content).await?
        };
        let key = document.mapping_key();
        debug!(kind = %document.kind(), key = %key, path = %path, ?outcome, "document written");
        self.state.set_file_mapping(key, path);
        Ok(outcome)
    }

    /// Rewrites the daily document of `date` from a complete read of the
    /// date. Dates without rows from an enabled source are skipped.
    async fn write_date(
        &self,
        date: NaiveDate,
        toggles: &SyncToggles,
    ) -> SyncResult<Option<WriteOutcome>> {
        let mut daily = self.source.daily_data(date).await?;
        daily.retain_sources(|table| toggles.is_enabled(table));
        if daily.is_empty() {
            debug!(%date, "no rows on date, skipping");
            return Ok(None);
        }
        self.write_document(&Document::Daily(&daily)).await.map(Some)
    }

    async fn item_synced(&self, outcome: Option<WriteOutcome>) -> SyncResult<Option<WriteOutcome>> {
        if outcome.is_some() {
            self.state.save().await?;
            self.stats.write().items_resynced += 1;
        }
        Ok(outcome)
    }

    /// Rewrites the document of one recipe.
    ///
    /// Returns `Ok(None)` when recipes are disabled or the row is gone.
    pub async fn sync_one_recipe(&self, id: &str) -> SyncResult<Option<WriteOutcome>> {
        if !self.is_enabled(SourceTable::Recipes) {
            return Ok(None);
        }
        let Some(recipe) = self.source.get_recipe(id).await? else {
            debug!(id, "recipe not found");
            return Ok(None);
        };
        self.context
            .write()
            .upsert_recipes(std::slice::from_ref(&recipe));
        let outcome = self.write_document(&Document::Recipe(&recipe)).await?;
        self.item_synced(Some(outcome)).await
    }

    /// Rewrites the document of one meal-prep plan.
    pub async fn sync_one_mealprep_plan(&self, id: &str) -> SyncResult<Option<WriteOutcome>> {
        if !self.is_enabled(SourceTable::MealprepPlans) {
            return Ok(None);
        }
        let Some(plan) = self.source.get_mealprep_plan(id).await? else {
            debug!(id, "meal-prep plan not found");
            return Ok(None);
        };
        let outcome = self.write_document(&Document::MealprepPlan(&plan)).await?;
        self.item_synced(Some(outcome)).await
    }

    /// Rewrites the daily document of `date`.
    ///
    /// Writes nothing and returns `Ok(None)` when no enabled source has a
    /// row on that date.
    pub async fn sync_one_date(&self, date: NaiveDate) -> SyncResult<Option<WriteOutcome>> {
        let toggles = self.toggles();
        if !toggles.any_daily() {
            return Ok(None);
        }
        let outcome = self.write_date(date, &toggles).await?;
        self.item_synced(outcome).await
    }

    /// Rewrites the inventory list.
    pub async fn sync_inventory_snapshot(&self) -> SyncResult<Option<WriteOutcome>> {
        if !self.is_enabled(SourceTable::InventoryItems) {
            return Ok(None);
        }
        let items = self.source.list_inventory_items().await?;
        let outcome = self.write_document(&Document::Inventory(&items)).await?;
        self.item_synced(Some(outcome)).await
    }

    /// Rewrites the medication list and refreshes the medication cache.
    pub async fn sync_medications_snapshot(&self) -> SyncResult<Option<WriteOutcome>> {
        if !self.is_enabled(SourceTable::Medications) {
            return Ok(None);
        }
        let medications = self.source.list_medications().await?;
        self.context.write().set_medications(&medications);
        let outcome = self
            .write_document(&Document::Medications(&medications))
            .await?;
        self.item_synced(Some(outcome)).await
    }

    /// Rewrites the shopping list.
    pub async fn sync_shopping_snapshot(&self) -> SyncResult<Option<WriteOutcome>> {
        if !self.is_enabled(SourceTable::ShoppingItems) {
            return Ok(None);
        }
        let items = self.source.list_shopping_items().await?;
        let outcome = self.write_document(&Document::ShoppingList(&items)).await?;
        self.item_synced(Some(outcome)).await
    }

    /// Runs the single-item operation for `key`.
    ///
    /// A failure is appended to the shared error log before it is
    /// returned. Watermarks are never touched.
    pub async fn resync(&self, key: &ResyncKey) -> SyncResult<Option<WriteOutcome>> {
        let result = match key {
            ResyncKey::Recipe(id) => self.sync_one_recipe(id).await,
            ResyncKey::MealprepPlan(id) => self.sync_one_mealprep_plan(id).await,
            ResyncKey::Daily(date) => self.sync_one_date(*date).await,
            ResyncKey::Inventory => self.sync_inventory_snapshot().await,
            ResyncKey::Medications => self.sync_medications_snapshot().await,
            ResyncKey::ShoppingList => self.sync_shopping_snapshot().await,
        };
        if let Err(e) = &result {
            let (entity_type, item_id) = resync_scope(key);
            self.record_error(entity_type, &item_id, e);
            if let Err(save) = self.state.save().await {
                warn!(error = %save, "failed to persist error log");
            }
        }
        result
    }
}

/// Error-log scope of a failed single-item resync.
fn resync_scope(key: &ResyncKey) -> (&'static str, String) {
    match key {
        ResyncKey::Recipe(id) => (SourceTable::Recipes.name(), id.clone()),
        ResyncKey::MealprepPlan(id) => (SourceTable::MealprepPlans.name(), id.clone()),
        ResyncKey::Daily(date) => (DAILY_SCOPE, date.to_string()),
        ResyncKey::Inventory => (SourceTable::InventoryItems.name(), "inventory".into()),
        ResyncKey::Medications => (SourceTable::Medications.name(), "medications".into()),
        ResyncKey::ShoppingList => (SourceTable::ShoppingItems.name(), "shopping_list".into()),
    }
}
