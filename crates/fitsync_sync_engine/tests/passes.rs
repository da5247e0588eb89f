//! Full and incremental pass behaviour against in-memory collaborators.

use fitsync_model::SourceTable;
use fitsync_sync_engine::{SyncConfig, SyncPassResult, SyncProgress, SyncStage, SyncToggles};
use fitsync_testkit::prelude::*;
use parking_lot::Mutex;
use proptest::prelude::*;

fn scopes(result: &SyncPassResult) -> Vec<(String, String)> {
    result
        .errors
        .iter()
        .map(|e| (e.entity_type.clone(), e.item_id.clone()))
        .collect()
}

fn pair(entity_type: &str, item_id: &str) -> (String, String) {
    (entity_type.to_string(), item_id.to_string())
}

#[tokio::test]
async fn full_pass_writes_every_document_kind() {
    let h = EngineHarness::new().await;
    h.source().set_profile(profile("user-1"));
    h.source().add_medication(medication("med1", "Vitamin D"));
    h.source().add_recipe(recipe("r1", "Soup", 10));
    h.source().add_mealprep_plan(mealprep_plan("p1", "2024-03-04", &["r1"], 10));
    h.source().add_inventory_item(inventory_item("i1", "Rice", 2.0));
    h.source().add_shopping_item(shopping_item("s1", "Leek"));
    h.source().add_meal(meal("m1", "2024-03-01", 10));
    h.source().add_blood_pressure_log(blood_pressure_log("b1", "2024-03-02T07:00:00+01:00", 10));

    let result = h.engine.full_sync(None).await;

    assert!(result.success, "errors: {:?}", result.errors);
    assert_eq!(result.files_created, 8);
    assert_eq!(result.files_updated, 0);
    assert_eq!(
        h.store().paths(),
        vec![
            "Profil.md",
            "gesundheit/Medikamente.md",
            "listen/Einkaufsliste.md",
            "listen/Inventar.md",
            "mealprep/p1.md",
            "rezepte/Soup.md",
            "tracker/2024-03-01.md",
            "tracker/2024-03-02.md",
        ]
    );

    let state = h.engine.state();
    assert_eq!(state.last_full_sync, Some(HARNESS_START));
    assert_eq!(state.watermarks.len(), SourceTable::ALL.len());
    assert!(state.watermarks.values().all(|wm| *wm == HARNESS_START));
    assert_eq!(state.file_mappings.get("r1").map(String::as_str), Some("rezepte/Soup.md"));
    assert_eq!(
        state.file_mappings.get("daily-2024-03-01").map(String::as_str),
        Some("tracker/2024-03-01.md")
    );
    assert_eq!(h.engine.stats().full_passes, 1);
}

#[tokio::test]
async fn second_full_pass_updates_in_place() {
    let h = EngineHarness::new().await;
    h.source().add_recipe(recipe("r1", "Soup", 10));

    let first = h.engine.full_sync(None).await;
    let second = h.engine.full_sync(None).await;

    assert_eq!(first.files_created, second.files_updated);
    assert_eq!(second.files_created, 0);
    assert_eq!(h.store().paths().len(), first.files_created);
}

#[tokio::test]
async fn failing_row_does_not_abort_the_pass() {
    let h = EngineHarness::new().await;
    h.source().add_recipe(recipe("r1", "Soup", 10));
    h.source().add_recipe(recipe("r2", "Salad", 20));
    h.renderer().fail_on("r2");

    let result = h.engine.full_sync(None).await;

    assert!(!result.success);
    assert!(result.files_created >= 1);
    assert_eq!(scopes(&result), vec![pair("recipes", "r2")]);
    assert!(result.errors[0].message.contains("injected failure"));
    assert!(h.store().contains("rezepte/Soup.md"));
    assert!(!h.store().contains("rezepte/Salad.md"));
    assert!(h.store().contains("listen/Inventar.md"));
}

#[tokio::test]
async fn failing_table_is_recorded_with_pass_marker() {
    let h = EngineHarness::new().await;
    h.source().add_inventory_item(inventory_item("i1", "Rice", 2.0));
    h.source().set_failing(SourceTable::Recipes, true);
    h.source().set_failing(SourceTable::Profile, true);

    let full = h.engine.full_sync(None).await;
    assert_eq!(
        scopes(&full),
        vec![pair("profiles_decrypted", "profile"), pair("recipes", "all")]
    );
    assert!(h.store().contains("listen/Inventar.md"));

    h.source().set_failing(SourceTable::Profile, false);
    let t1 = h.tick(60_000);
    let incremental = h.engine.incremental_sync(None).await;
    assert_eq!(scopes(&incremental), vec![pair("recipes", "incremental")]);

    let watermarks = h.engine.state().watermarks;
    assert_eq!(watermarks[&SourceTable::Recipes], HARNESS_START);
    assert_eq!(watermarks[&SourceTable::InventoryItems], t1);
    assert_eq!(watermarks[&SourceTable::Profile], t1);
}

#[tokio::test]
async fn failing_daily_listing_is_scoped_to_daily_notes() {
    let h = EngineHarness::new().await;
    h.source().add_meal(meal("m1", "2024-03-01", 10));
    h.source().set_failing(SourceTable::WaterLogs, true);

    let result = h.engine.full_sync(None).await;
    assert_eq!(scopes(&result), vec![pair("daily_notes", "all")]);
    assert!(!h.store().contains("tracker/2024-03-01.md"));
}

#[tokio::test]
async fn failing_date_only_skips_that_date() {
    let h = EngineHarness::new().await;
    h.source().add_meal(meal("m1", "2024-03-01", 10));
    h.source().add_meal(meal("m2", "2024-03-02", 10));
    h.source().fail_date(date("2024-03-02"));

    let result = h.engine.full_sync(None).await;
    assert_eq!(scopes(&result), vec![pair("daily_notes", "2024-03-02")]);
    assert!(h.store().contains("tracker/2024-03-01.md"));
}

#[tokio::test]
async fn incremental_pass_only_rewrites_changed_items() {
    let h = EngineHarness::new().await;
    h.source().add_recipe(recipe("r1", "Soup", 10));
    h.source().add_inventory_item(inventory_item("i1", "Rice", 2.0));
    h.engine.full_sync(None).await;

    h.store().clear_writes();
    let t1 = h.tick(60_000);
    let quiet = h.engine.incremental_sync(None).await;
    assert!(quiet.success);
    assert_eq!(h.store().writes_under("rezepte/"), 0);
    assert_eq!(h.store().writes_under("listen/Inventar.md"), 1);
    assert_eq!(h.store().writes_under("listen/Einkaufsliste.md"), 1);

    h.source().add_recipe(recipe("r2", "Salad", t1 + 10));
    h.tick(60_000);
    h.store().clear_writes();
    let changed = h.engine.incremental_sync(None).await;
    assert!(changed.success);
    assert_eq!(h.store().writes_under("rezepte/"), 1);
    assert!(h.store().contains("rezepte/Salad.md"));

    assert_eq!(
        h.source().sinces(SourceTable::Recipes),
        vec![None, Some(HARNESS_START), Some(t1)]
    );
    assert_eq!(h.engine.stats().incremental_passes, 2);
}

#[tokio::test]
async fn incremental_daily_reads_from_oldest_daily_watermark() {
    let h = EngineHarness::new().await;
    h.engine.full_sync(None).await;
    let t1 = h.tick(1_000);
    h.source().add_water_log(water_log("w1", "2024-03-05", 250.0, t1));
    h.tick(1_000);

    let result = h.engine.incremental_sync(None).await;
    assert!(result.success);
    assert!(h.store().contains("tracker/2024-03-05.md"));
    assert_eq!(h.source().sinces(SourceTable::Meals), vec![None, Some(HARNESS_START)]);
}

#[tokio::test]
async fn disabled_daily_sources_do_not_create_empty_documents() {
    let toggles = SyncToggles {
        water: false,
        ..SyncToggles::default()
    };
    let h = EngineHarness::with_config(SyncConfig::new().with_toggles(toggles)).await;
    h.source().add_water_log(water_log("w1", "2024-03-05", 250.0, 10));
    h.source().add_meal(meal("m1", "2024-03-06", 10));

    let result = h.engine.full_sync(None).await;
    assert!(result.success);
    assert!(!h.store().contains("tracker/2024-03-05.md"));
    assert!(h.store().contains("tracker/2024-03-06.md"));
}

#[tokio::test]
async fn disabled_tables_are_not_read_and_reenabling_clears_their_watermark() {
    let toggles = SyncToggles {
        recipes: false,
        ..SyncToggles::default()
    };
    let h = EngineHarness::with_config(SyncConfig::new().with_toggles(toggles)).await;
    h.source().add_recipe(recipe("r1", "Soup", 10));

    h.engine.full_sync(None).await;
    assert_eq!(h.source().fetch_count(SourceTable::Recipes), 0);
    assert!(!h.store().contains("rezepte/Soup.md"));
    assert_eq!(h.engine.state().watermarks[&SourceTable::Recipes], HARNESS_START);

    let saves = h.storage.save_count();
    h.engine.update_config(SyncConfig::new()).await.unwrap();
    assert_eq!(h.storage.save_count(), saves + 1);
    let watermarks = h.engine.state().watermarks;
    assert!(!watermarks.contains_key(&SourceTable::Recipes));
    assert_eq!(watermarks[&SourceTable::Meals], HARNESS_START);

    h.tick(1_000);
    h.engine.incremental_sync(None).await;
    assert_eq!(h.source().sinces(SourceTable::Recipes), vec![None]);
    assert!(h.store().contains("rezepte/Soup.md"));
}

#[tokio::test]
async fn progress_reports_enabled_stages_in_order() {
    let toggles = SyncToggles {
        profile: false,
        shopping_list: false,
        ..SyncToggles::default()
    };
    let h = EngineHarness::with_config(SyncConfig::new().with_toggles(toggles)).await;
    let seen = std::sync::Arc::new(Mutex::new(Vec::new()));
    let record = {
        let seen = std::sync::Arc::clone(&seen);
        move |progress: SyncProgress| seen.lock().push(progress.stage)
    };

    h.engine.full_sync(Some(&record)).await;

    assert_eq!(
        *seen.lock(),
        vec![
            SyncStage::Medications,
            SyncStage::Recipes,
            SyncStage::MealprepPlans,
            SyncStage::Inventory,
            SyncStage::DailyNotes,
        ]
    );
}

#[tokio::test]
async fn plans_render_with_recipe_titles_from_the_same_pass() {
    let h = EngineHarness::new().await;
    h.source().add_recipe(recipe("r1", "Soup", 10));
    h.source().add_mealprep_plan(mealprep_plan("p1", "2024-03-04", &["r1", "gone"], 10));

    h.engine.full_sync(None).await;

    let plan = h.store().get("mealprep/p1.md").unwrap();
    assert!(plan.ends_with("Soup, gone"), "{plan}");
    assert_eq!(h.engine.render_context().recipe_title("r1"), Some("Soup"));
}

#[tokio::test]
async fn incremental_watermark_advances_when_every_row_fails() {
    let h = EngineHarness::new().await;
    h.engine.full_sync(None).await;
    let before = h.engine.state().watermarks[&SourceTable::Recipes];

    let changed = h.tick(1_000);
    h.source().add_recipe(recipe("r1", "Soup", changed));
    h.source().add_recipe(recipe("r2", "Salad", changed));
    h.renderer().fail_on("r1");
    h.renderer().fail_on("r2");
    let pass_start = h.tick(1_000);

    let result = h.engine.incremental_sync(None).await;

    let after = h.engine.state().watermarks[&SourceTable::Recipes];
    assert!(after > before);
    assert_eq!(after, pass_start);
    let mut recipe_errors: Vec<_> = scopes(&result)
        .into_iter()
        .filter(|(entity_type, _)| entity_type == "recipes")
        .collect();
    recipe_errors.sort();
    assert_eq!(recipe_errors, vec![pair("recipes", "r1"), pair("recipes", "r2")]);
    assert_eq!(h.store().writes_under("rezepte/"), 0);

    // Failed rows are not retried by the next incremental pass.
    h.renderer().heal("r1");
    h.renderer().heal("r2");
    h.tick(1_000);
    let result = h.engine.incremental_sync(None).await;
    assert!(result.success, "errors: {:?}", result.errors);
    assert_eq!(h.store().writes_under("rezepte/"), 0);
}

#[tokio::test]
async fn panicking_renderer_ends_the_pass_with_one_engine_error() {
    let h = EngineHarness::new().await;
    h.source().add_recipe(recipe("r1", "Soup", 10));
    h.source().add_recipe(recipe("r2", "Salad", 20));
    h.source().add_inventory_item(inventory_item("i1", "Rice", 2.0));
    h.renderer().panic_on("r2");

    let result = h.engine.full_sync(None).await;

    assert!(!result.success);
    assert_eq!(scopes(&result), vec![pair("sync_engine", "full_sync")]);
    assert!(result.errors[0].message.contains("injected panic rendering r2"));
    assert!(!h.store().contains("listen/Inventar.md"));
    assert!(h.engine.state().watermarks.is_empty());
    assert_eq!(h.engine.state().last_full_sync, None);
    let saved = h.storage.saved().unwrap();
    assert_eq!(saved.errors.len(), 1);

    h.renderer().heal("r2");
    let result = h.engine.full_sync(None).await;
    assert!(result.success, "errors: {:?}", result.errors);
    assert!(h.store().contains("rezepte/Salad.md"));
    assert!(h.store().contains("listen/Inventar.md"));
    assert_eq!(h.engine.state().watermarks.len(), SourceTable::ALL.len());
}

#[tokio::test]
async fn panicking_renderer_during_incremental_pass_keeps_earlier_watermarks() {
    let h = EngineHarness::new().await;
    h.engine.full_sync(None).await;
    let before = h.engine.state().watermarks;

    let changed = h.tick(1_000);
    h.source().add_recipe(recipe("r1", "Soup", changed));
    h.renderer().panic_on("r1");
    let pass_start = h.tick(1_000);

    let result = h.engine.incremental_sync(None).await;

    assert_eq!(scopes(&result), vec![pair("sync_engine", "incremental")]);
    let after = h.engine.state().watermarks;
    assert_eq!(after[&SourceTable::Medications], pass_start);
    assert_eq!(after[&SourceTable::Recipes], before[&SourceTable::Recipes]);
    assert_eq!(after[&SourceTable::InventoryItems], before[&SourceTable::InventoryItems]);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn watermarks_never_move_backwards(times in pass_times_strategy()) {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let h = EngineHarness::new().await;
            let mut high = i64::MIN;
            for (n, at) in times.into_iter().enumerate() {
                h.clock.set(at);
                if n % 2 == 0 {
                    h.engine.full_sync(None).await;
                } else {
                    h.engine.incremental_sync(None).await;
                }
                high = high.max(at);
                let watermarks = h.engine.state().watermarks;
                for table in SourceTable::ALL {
                    assert_eq!(watermarks[&table], high, "table {table}");
                }
            }
        });
    }
}
