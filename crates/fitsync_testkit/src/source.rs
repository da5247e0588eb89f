//! In-memory remote data source.

use async_trait::async_trait;
use chrono::NaiveDate;
use fitsync_model::{
    BloodPressureLog, ChangeStamp, DailyData, DatedRow, InventoryItem, Meal, MealPrepPlan,
    Medication, MedicationLog, Recipe, ShoppingItem, SourceTable, Timestamp, UserProfile,
    WaterLog, WeightLog,
};
use fitsync_sync_engine::{RemoteDataSource, SyncError, SyncResult};
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Semaphore;

#[derive(Debug, Default)]
struct SourceData {
    profile: Option<UserProfile>,
    medications: Vec<Medication>,
    recipes: Vec<Recipe>,
    plans: Vec<MealPrepPlan>,
    inventory: Vec<InventoryItem>,
    shopping: Vec<ShoppingItem>,
    meals: Vec<Meal>,
    water: Vec<WaterLog>,
    weight: Vec<WeightLog>,
    medication_logs: Vec<MedicationLog>,
    blood_pressure: Vec<BloodPressureLog>,
}

/// Failure injection and call bookkeeping.
#[derive(Debug, Default)]
struct Probe {
    failing: HashSet<SourceTable>,
    failing_dates: HashSet<NaiveDate>,
    fetches: HashMap<SourceTable, usize>,
    sinces: HashMap<SourceTable, Vec<Option<Timestamp>>>,
    gates: HashMap<SourceTable, Arc<Semaphore>>,
}

/// A [`RemoteDataSource`] over rows held in memory.
///
/// Rows are keyed by id; adding a row with an existing id replaces it.
/// Reads of a table can be made to fail or to block.
/// Batch reads honor the same contract as the remote: newest first and
/// strictly newer than `since`.
#[derive(Debug, Default)]
pub struct MemoryDataSource {
    data: RwLock<SourceData>,
    probe: Mutex<Probe>,
}

fn upsert<T>(rows: &mut Vec<T>, row: T, id: impl Fn(&T) -> &str) {
    let key = id(&row).to_string();
    match rows.iter_mut().find(|existing| id(existing) == key) {
        Some(existing) => *existing = row,
        None => rows.push(row),
    }
}

fn changed_since<T: ChangeStamp + Clone>(rows: &[T], since: Option<Timestamp>) -> Vec<T> {
    let mut selected: Vec<T> = rows
        .iter()
        .filter(|row| since.map_or(true, |since| row.changed_at() > since))
        .cloned()
        .collect();
    selected.sort_by_key(|row| std::cmp::Reverse(row.changed_at()));
    selected
}

fn dates_since<T: ChangeStamp + DatedRow>(
    rows: &[T],
    since: Option<Timestamp>,
    into: &mut BTreeSet<NaiveDate>,
) {
    into.extend(
        rows.iter()
            .filter(|row| since.map_or(true, |since| row.changed_at() > since))
            .filter_map(|row| row.bucket_date()),
    );
}

fn on_date<T: ChangeStamp + DatedRow + Clone>(rows: &[T], date: NaiveDate) -> Vec<T> {
    let mut selected: Vec<T> = rows
        .iter()
        .filter(|row| row.bucket_date() == Some(date))
        .cloned()
        .collect();
    selected.sort_by_key(|row| row.changed_at());
    selected
}

impl MemoryDataSource {
    /// Creates an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the profile row.
    pub fn set_profile(&self, profile: UserProfile) {
        self.data.write().profile = Some(profile);
    }

    /// Adds or replaces a medication.
    pub fn add_medication(&self, medication: Medication) {
        upsert(&mut self.data.write().medications, medication, |m| m.id.as_str());
    }

    /// Adds or replaces a recipe.
    pub fn add_recipe(&self, recipe: Recipe) {
        upsert(&mut self.data.write().recipes, recipe, |r| r.id.as_str());
    }

    /// Removes a recipe.
    pub fn remove_recipe(&self, id: &str) {
        self.data.write().recipes.retain(|r| r.id != id);
    }

    /// Adds or replaces a meal-prep plan.
    pub fn add_mealprep_plan(&self, plan: MealPrepPlan) {
        upsert(&mut self.data.write().plans, plan, |p| p.id.as_str());
    }

    /// Adds or replaces an inventory item.
    pub fn add_inventory_item(&self, item: InventoryItem) {
        upsert(&mut self.data.write().inventory, item, |i| i.id.as_str());
    }

    /// Adds or replaces a shopping list item.
    pub fn add_shopping_item(&self, item: ShoppingItem) {
        upsert(&mut self.data.write().shopping, item, |i| i.id.as_str());
    }

    /// Adds or replaces a meal.
    pub fn add_meal(&self, meal: Meal) {
        upsert(&mut self.data.write().meals, meal, |m| m.id.as_str());
    }

    /// Adds or replaces a water entry.
    pub fn add_water_log(&self, log: WaterLog) {
        upsert(&mut self.data.write().water, log, |l| l.id.as_str());
    }

    /// Adds or replaces a weight entry.
    pub fn add_weight_log(&self, log: WeightLog) {
        upsert(&mut self.data.write().weight, log, |l| l.id.as_str());
    }

    /// Adds or replaces a medication intake.
    pub fn add_medication_log(&self, log: MedicationLog) {
        upsert(&mut self.data.write().medication_logs, log, |l| l.id.as_str());
    }

    /// Adds or replaces a blood pressure measurement.
    pub fn add_blood_pressure_log(&self, log: BloodPressureLog) {
        upsert(&mut self.data.write().blood_pressure, log, |l| l.id.as_str());
    }

    /// Makes every read of `table` fail until cleared.
    pub fn set_failing(&self, table: SourceTable, failing: bool) {
        let mut probe = self.probe.lock();
        if failing {
            probe.failing.insert(table);
        } else {
            probe.failing.remove(&table);
        }
    }

    /// Makes [`RemoteDataSource::daily_data`] fail for `date`.
    pub fn fail_date(&self, date: NaiveDate) {
        self.probe.lock().failing_dates.insert(date);
    }

    /// Number of reads issued against `table`.
    pub fn fetch_count(&self, table: SourceTable) -> usize {
        self.probe.lock().fetches.get(&table).copied().unwrap_or(0)
    }

    /// The `since` arguments of every watermarked read of `table`, in
    /// call order.
    pub fn sinces(&self, table: SourceTable) -> Vec<Option<Timestamp>> {
        self.probe.lock().sinces.get(&table).cloned().unwrap_or_default()
    }

    /// Makes reads of `table` block until [`release`](Self::release) is
    /// called. The read is counted before it blocks.
    pub fn hold(&self, table: SourceTable) {
        self.probe
            .lock()
            .gates
            .insert(table, Arc::new(Semaphore::new(0)));
    }

    /// Unblocks every read held on `table`.
    pub fn release(&self, table: SourceTable) {
        if let Some(gate) = self.probe.lock().gates.remove(&table) {
            gate.close();
        }
    }

    async fn pass_gate(&self, table: SourceTable) {
        let gate = self.probe.lock().gates.get(&table).cloned();
        if let Some(gate) = gate {
            // Closing the semaphore is the release signal.
            let _ = gate.acquire().await;
        }
    }

    fn enter(&self, table: SourceTable) -> SyncResult<()> {
        let mut probe = self.probe.lock();
        *probe.fetches.entry(table).or_default() += 1;
        if probe.failing.contains(&table) {
            return Err(SyncError::source(table, "injected failure"));
        }
        Ok(())
    }

    fn enter_since(&self, table: SourceTable, since: Option<Timestamp>) -> SyncResult<()> {
        self.probe.lock().sinces.entry(table).or_default().push(since);
        self.enter(table)
    }
}

#[async_trait]
impl RemoteDataSource for MemoryDataSource {
    async fn fetch_profile(&self) -> SyncResult<Option<UserProfile>> {
        self.enter(SourceTable::Profile)?;
        self.pass_gate(SourceTable::Profile).await;
        Ok(self.data.read().profile.clone())
    }

    async fn list_medications(&self) -> SyncResult<Vec<Medication>> {
        self.enter(SourceTable::Medications)?;
        self.pass_gate(SourceTable::Medications).await;
        let mut medications = self.data.read().medications.clone();
        medications.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(medications)
    }

    async fn list_recipes(&self, since: Option<Timestamp>) -> SyncResult<Vec<Recipe>> {
        self.enter_since(SourceTable::Recipes, since)?;
        self.pass_gate(SourceTable::Recipes).await;
        Ok(changed_since(&self.data.read().recipes, since))
    }

    async fn get_recipe(&self, id: &str) -> SyncResult<Option<Recipe>> {
        self.enter(SourceTable::Recipes)?;
        Ok(self.data.read().recipes.iter().find(|r| r.id == id).cloned())
    }

    async fn list_mealprep_plans(
        &self,
        since: Option<Timestamp>,
    ) -> SyncResult<Vec<MealPrepPlan>> {
        self.enter_since(SourceTable::MealprepPlans, since)?;
        self.pass_gate(SourceTable::MealprepPlans).await;
        Ok(changed_since(&self.data.read().plans, since))
    }

    async fn get_mealprep_plan(&self, id: &str) -> SyncResult<Option<MealPrepPlan>> {
        self.enter(SourceTable::MealprepPlans)?;
        Ok(self.data.read().plans.iter().find(|p| p.id == id).cloned())
    }

    async fn list_inventory_items(&self) -> SyncResult<Vec<InventoryItem>> {
        self.enter(SourceTable::InventoryItems)?;
        self.pass_gate(SourceTable::InventoryItems).await;
        Ok(self.data.read().inventory.clone())
    }

    async fn list_shopping_items(&self) -> SyncResult<Vec<ShoppingItem>> {
        self.enter(SourceTable::ShoppingItems)?;
        self.pass_gate(SourceTable::ShoppingItems).await;
        Ok(self.data.read().shopping.clone())
    }

    async fn list_dates_touched(&self, since: Option<Timestamp>) -> SyncResult<Vec<NaiveDate>> {
        for table in SourceTable::DAILY_SOURCES {
            self.enter_since(table, since)?;
            self.pass_gate(table).await;
        }
        let data = self.data.read();
        let mut dates = BTreeSet::new();
        dates_since(&data.meals, since, &mut dates);
        dates_since(&data.water, since, &mut dates);
        dates_since(&data.weight, since, &mut dates);
        dates_since(&data.medication_logs, since, &mut dates);
        dates_since(&data.blood_pressure, since, &mut dates);
        Ok(dates.into_iter().rev().collect())
    }

    async fn daily_data(&self, date: NaiveDate) -> SyncResult<DailyData> {
        if self.probe.lock().failing_dates.contains(&date) {
            return Err(SyncError::source(
                SourceTable::Meals,
                format!("injected failure for {date}"),
            ));
        }
        let data = self.data.read();
        Ok(DailyData {
            date,
            meals: on_date(&data.meals, date),
            water_logs: on_date(&data.water, date),
            weight_logs: on_date(&data.weight, date),
            medication_logs: on_date(&data.medication_logs, date),
            blood_pressure_logs: on_date(&data.blood_pressure, date),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{date, meal, recipe, water_log};

    #[tokio::test]
    async fn batch_reads_are_newest_first_and_strictly_after_since() {
        let source = MemoryDataSource::new();
        source.add_recipe(recipe("r1", "Soup", 10));
        source.add_recipe(recipe("r2", "Salad", 30));
        source.add_recipe(recipe("r3", "Stew", 20));

        let all = source.list_recipes(None).await.unwrap();
        let ids: Vec<_> = all.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["r2", "r3", "r1"]);

        let newer = source.list_recipes(Some(20)).await.unwrap();
        assert_eq!(newer.len(), 1);
        assert_eq!(newer[0].id, "r2");
        assert_eq!(source.sinces(SourceTable::Recipes), vec![None, Some(20)]);
    }

    #[tokio::test]
    async fn dates_touched_are_distinct_and_descending() {
        let source = MemoryDataSource::new();
        source.add_meal(meal("m1", "2024-03-01", 10));
        source.add_meal(meal("m2", "2024-03-03", 20));
        source.add_water_log(water_log("w1", "2024-03-01", 250.0, 30));

        let dates = source.list_dates_touched(None).await.unwrap();
        assert_eq!(dates, vec![date("2024-03-03"), date("2024-03-01")]);

        let recent = source.list_dates_touched(Some(20)).await.unwrap();
        assert_eq!(recent, vec![date("2024-03-01")]);

        let daily = source.daily_data(date("2024-03-01")).await.unwrap();
        assert_eq!(daily.row_count(), 2);
    }

    #[tokio::test]
    async fn injected_failures_name_the_table() {
        let source = MemoryDataSource::new();
        source.set_failing(SourceTable::WaterLogs, true);
        let err = source.list_dates_touched(None).await.unwrap_err();
        assert!(matches!(err, SyncError::Source { table: SourceTable::WaterLogs, .. }));

        source.set_failing(SourceTable::WaterLogs, false);
        assert!(source.list_dates_touched(None).await.is_ok());
    }
}
