//! A remote data source backed by a JSON export of the remote tables.

use async_trait::async_trait;
use chrono::NaiveDate;
use fitsync_model::{
    BloodPressureLog, ChangeStamp, DailyData, DatedRow, InventoryItem, Meal, MealPrepPlan,
    Medication, MedicationLog, Recipe, ShoppingItem, SourceTable, Timestamp, UserProfile,
    WaterLog, WeightLog,
};
use fitsync_sync_engine::{RemoteDataSource, SyncError, SyncResult};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::path::PathBuf;
use tracing::debug;

/// Every table of one export. Missing tables read as empty.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Snapshot {
    /// The profile row.
    pub profile: Option<UserProfile>,
    /// Medication definitions.
    pub medications: Vec<Medication>,
    /// Recipes.
    pub recipes: Vec<Recipe>,
    /// Meal-prep plans.
    pub mealprep_plans: Vec<MealPrepPlan>,
    /// Inventory items.
    pub inventory_items: Vec<InventoryItem>,
    /// Shopping list items.
    pub shopping_items: Vec<ShoppingItem>,
    /// Meals.
    pub meals: Vec<Meal>,
    /// Water logs.
    pub water_logs: Vec<WaterLog>,
    /// Weight logs.
    pub weight_logs: Vec<WeightLog>,
    /// Medication intake logs.
    pub medication_logs: Vec<MedicationLog>,
    /// Blood pressure logs.
    pub blood_pressure_logs: Vec<BloodPressureLog>,
}

/// Reads a [`Snapshot`] file on every call, so edits to the file are
/// picked up by the next pass.
#[derive(Debug, Clone)]
pub struct JsonSnapshotSource {
    path: PathBuf,
}

impl JsonSnapshotSource {
    /// Creates a source reading `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    async fn read(&self, table: SourceTable) -> SyncResult<Snapshot> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|e| SyncError::source(table, format!("{}: {e}", self.path.display())))?;
        let snapshot = serde_json::from_slice(&bytes)
            .map_err(|e| SyncError::source(table, format!("{}: {e}", self.path.display())))?;
        debug!(table = %table, path = %self.path.display(), "snapshot read");
        Ok(snapshot)
    }
}

fn newest_first<T: ChangeStamp>(mut rows: Vec<T>, since: Option<Timestamp>) -> Vec<T> {
    if let Some(since) = since {
        rows.retain(|row| row.changed_at() > since);
    }
    rows.sort_by_key(|row| std::cmp::Reverse(row.changed_at()));
    rows
}

fn touched<T: ChangeStamp + DatedRow>(
    rows: &[T],
    since: Option<Timestamp>,
    dates: &mut BTreeSet<NaiveDate>,
) {
    dates.extend(
        rows.iter()
            .filter(|row| since.map_or(true, |since| row.changed_at() > since))
            .filter_map(DatedRow::bucket_date),
    );
}

fn on_date<T: ChangeStamp + DatedRow>(mut rows: Vec<T>, date: NaiveDate) -> Vec<T> {
    rows.retain(|row| row.bucket_date() == Some(date));
    rows.sort_by_key(ChangeStamp::changed_at);
    rows
}

#[async_trait]
impl RemoteDataSource for JsonSnapshotSource {
    async fn fetch_profile(&self) -> SyncResult<Option<UserProfile>> {
        Ok(self.read(SourceTable::Profile).await?.profile)
    }

    async fn list_medications(&self) -> SyncResult<Vec<Medication>> {
        let mut medications = self.read(SourceTable::Medications).await?.medications;
        medications.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(medications)
    }

    async fn list_recipes(&self, since: Option<Timestamp>) -> SyncResult<Vec<Recipe>> {
        let recipes = self.read(SourceTable::Recipes).await?.recipes;
        Ok(newest_first(recipes, since))
    }

    async fn get_recipe(&self, id: &str) -> SyncResult<Option<Recipe>> {
        let recipes = self.read(SourceTable::Recipes).await?.recipes;
        Ok(recipes.into_iter().find(|r| r.id == id))
    }

    async fn list_mealprep_plans(
        &self,
        since: Option<Timestamp>,
    ) -> SyncResult<Vec<MealPrepPlan>> {
        let plans = self.read(SourceTable::MealprepPlans).await?.mealprep_plans;
        Ok(newest_first(plans, since))
    }

    async fn get_mealprep_plan(&self, id: &str) -> SyncResult<Option<MealPrepPlan>> {
        let plans = self.read(SourceTable::MealprepPlans).await?.mealprep_plans;
        Ok(plans.into_iter().find(|p| p.id == id))
    }

    async fn list_inventory_items(&self) -> SyncResult<Vec<InventoryItem>> {
        let mut items = self.read(SourceTable::InventoryItems).await?.inventory_items;
        items.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(items)
    }

    async fn list_shopping_items(&self) -> SyncResult<Vec<ShoppingItem>> {
        Ok(self.read(SourceTable::ShoppingItems).await?.shopping_items)
    }

    async fn list_dates_touched(&self, since: Option<Timestamp>) -> SyncResult<Vec<NaiveDate>> {
        let snapshot = self.read(SourceTable::Meals).await?;
        let mut dates = BTreeSet::new();
        touched(&snapshot.meals, since, &mut dates);
        touched(&snapshot.water_logs, since, &mut dates);
        touched(&snapshot.weight_logs, since, &mut dates);
        touched(&snapshot.medication_logs, since, &mut dates);
        touched(&snapshot.blood_pressure_logs, since, &mut dates);
        Ok(dates.into_iter().rev().collect())
    }

    async fn daily_data(&self, date: NaiveDate) -> SyncResult<DailyData> {
        let snapshot = self.read(SourceTable::Meals).await?;
        Ok(DailyData {
            date,
            meals: on_date(snapshot.meals, date),
            water_logs: on_date(snapshot.water_logs, date),
            weight_logs: on_date(snapshot.weight_logs, date),
            medication_logs: on_date(snapshot.medication_logs, date),
            blood_pressure_logs: on_date(snapshot.blood_pressure_logs, date),
        })
    }
}
