//! Error log, success policies, persistence and pass exclusivity.

use fitsync_model::{ResyncKey, SourceTable};
use fitsync_sync_engine::{
    MemoryStateStorage, SuccessPolicy, SyncConfig, SyncError, SyncErrorEntry, SyncPassResult,
    SyncStateData, ERROR_LOG_CAPACITY,
};
use fitsync_testkit::prelude::*;
use std::sync::Arc;

async fn wait_for_fetch(h: &EngineHarness, table: SourceTable, count: usize) {
    while h.source().fetch_count(table) < count {
        tokio::task::yield_now().await;
    }
}

#[tokio::test]
async fn error_log_keeps_the_newest_entries() {
    let h = EngineHarness::new().await;
    for n in 0..150 {
        h.engine
            .record_error("recipes", &format!("e{n}"), &SyncError::Storage("boom".into()));
    }

    let errors = h.engine.state().errors;
    assert_eq!(errors.len(), ERROR_LOG_CAPACITY);
    assert_eq!(errors[0].item_id, "e50");
    assert_eq!(errors[99].item_id, "e149");

    h.engine.state_store().save().await.unwrap();
    assert_eq!(h.storage.saved().unwrap().errors.len(), ERROR_LOG_CAPACITY);
}

#[tokio::test]
async fn oversized_persisted_log_is_truncated_on_load() {
    let errors: Vec<SyncErrorEntry> = (0..120)
        .map(|n| SyncErrorEntry {
            entity_type: "recipes".into(),
            item_id: format!("e{n}"),
            message: "boom".into(),
            timestamp: n,
        })
        .collect();
    // Deserializing bypasses the capacity check of `ErrorLog::push`.
    let data: SyncStateData = serde_json::from_value(serde_json::json!({ "errors": errors })).unwrap();
    assert_eq!(data.errors.len(), 120);

    let storage = Arc::new(MemoryStateStorage::with_state(data));
    let h = EngineHarness::with_storage(SyncConfig::new(), storage).await;
    let loaded = h.engine.state().errors;
    assert_eq!(loaded.len(), ERROR_LOG_CAPACITY);
    assert_eq!(loaded[0].item_id, "e20");
}

#[tokio::test]
async fn pass_clears_the_error_log_first() {
    let h = EngineHarness::new().await;
    h.engine
        .record_error("recipes", "old", &SyncError::Storage("boom".into()));

    let result = h.engine.full_sync(None).await;
    assert!(result.success);
    assert!(h.engine.state().errors.is_empty());
}

#[tokio::test]
async fn state_save_failure_is_reported_as_engine_error() {
    let h = EngineHarness::new().await;
    h.storage.set_fail_saves(true);

    let result = h.engine.full_sync(None).await;
    assert!(!result.success);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].entity_type, "sync_engine");
    assert_eq!(result.errors[0].item_id, "full_sync");

    let result = h.engine.incremental_sync(None).await;
    assert_eq!(result.errors[0].item_id, "incremental");
}

/// Runs an incremental pass while a single-item resync fails.
async fn pass_with_concurrent_resync_failure(
    policy: SuccessPolicy,
) -> (EngineHarness, SyncPassResult) {
    let h = EngineHarness::with_config(SyncConfig::new().with_success_policy(policy)).await;
    h.source().fail_date(date("2024-03-01"));
    h.source().hold(SourceTable::Recipes);

    let engine = h.engine.clone();
    let pass = tokio::spawn(async move { engine.incremental_sync(None).await });
    wait_for_fetch(&h, SourceTable::Recipes, 1).await;

    let resync = h.engine.resync(&ResyncKey::Daily(date("2024-03-01"))).await;
    assert!(resync.is_err());
    h.source().release(SourceTable::Recipes);

    let result = pass.await.unwrap();
    (h, result)
}

#[tokio::test]
async fn cumulative_policy_counts_concurrent_resync_failures() {
    let (h, result) = pass_with_concurrent_resync_failure(SuccessPolicy::CumulativeLog).await;
    assert!(!result.success);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].entity_type, "daily_notes");
    assert_eq!(result.errors[0].item_id, "2024-03-01");
    assert_eq!(h.engine.state().errors.len(), 1);
}

#[tokio::test]
async fn pass_only_policy_ignores_concurrent_resync_failures() {
    let (h, result) = pass_with_concurrent_resync_failure(SuccessPolicy::PassOnly).await;
    assert!(result.success);
    assert!(result.errors.is_empty());
    assert_eq!(h.engine.state().errors.len(), 1);
}

#[tokio::test]
async fn second_pass_waits_for_the_running_one() {
    let h = EngineHarness::new().await;
    h.source().hold(SourceTable::Recipes);

    let first = tokio::spawn({
        let engine = h.engine.clone();
        async move { engine.full_sync(None).await }
    });
    wait_for_fetch(&h, SourceTable::Recipes, 1).await;

    let second = tokio::spawn({
        let engine = h.engine.clone();
        async move { engine.incremental_sync(None).await }
    });
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
    assert_eq!(h.source().fetch_count(SourceTable::Profile), 1);
    assert_eq!(h.engine.stats().passes_completed, 0);

    // Single-item work is not blocked by the running pass.
    h.source().add_inventory_item(inventory_item("i1", "Rice", 1.0));
    assert!(h.engine.sync_inventory_snapshot().await.unwrap().is_some());

    h.source().release(SourceTable::Recipes);
    assert!(first.await.unwrap().success);
    assert!(second.await.unwrap().success);
    assert_eq!(h.source().fetch_count(SourceTable::Profile), 2);
    assert_eq!(h.engine.stats().passes_completed, 2);
}

#[tokio::test]
async fn reset_forgets_everything() {
    let h = EngineHarness::new().await;
    h.source().add_recipe(recipe("r1", "Soup", 10));
    h.renderer().fail_on("r1");
    h.engine.full_sync(None).await;
    assert!(!h.engine.state().watermarks.is_empty());

    h.engine.reset_state().await.unwrap();

    let state = h.engine.state();
    assert_eq!(state.last_full_sync, None);
    assert!(state.watermarks.is_empty());
    assert!(state.file_mappings.is_empty());
    assert!(state.errors.is_empty());
    assert!(h.engine.render_context().recipes.is_empty());
    assert_eq!(h.storage.saved(), Some(SyncStateData::default()));
}

#[tokio::test]
async fn state_survives_a_restart_through_the_json_file() {
    let fixture = JsonStateFixture::new();
    let engine = fixture.engine(SyncConfig::new()).await;
    engine.source().add_recipe(recipe("r1", "Soup", 10));
    engine.renderer().fail_on("r1");
    engine.full_sync(None).await;

    let restarted = fixture.engine(SyncConfig::new()).await;
    let state = restarted.state();
    assert_eq!(state.last_full_sync, Some(HARNESS_START));
    assert_eq!(state.watermarks[&SourceTable::Recipes], HARNESS_START);
    assert_eq!(state.errors.len(), 1);
    assert_eq!(
        state.file_mappings.get("inventory").map(String::as_str),
        Some("listen/Inventar.md")
    );
}
