//! Read access to the remote data source.

use crate::error::SyncResult;
use async_trait::async_trait;
use chrono::NaiveDate;
use fitsync_model::{
    DailyData, InventoryItem, MealPrepPlan, Medication, Recipe, ShoppingItem, Timestamp,
    UserProfile,
};

/// The remote relational data source.
///
/// Batch reads return rows newest first. A `since` watermark restricts
/// the result to rows changed strictly after it; `None` reads everything.
/// Failures are reported as [`SyncError::Source`](crate::SyncError::Source).
#[async_trait]
pub trait RemoteDataSource: Send + Sync + 'static {
    /// Reads the profile of the signed-in user.
    async fn fetch_profile(&self) -> SyncResult<Option<UserProfile>>;

    /// Reads every medication definition.
    async fn list_medications(&self) -> SyncResult<Vec<Medication>>;

    /// Reads recipes changed after `since`.
    async fn list_recipes(&self, since: Option<Timestamp>) -> SyncResult<Vec<Recipe>>;

    /// Reads one recipe.
    async fn get_recipe(&self, id: &str) -> SyncResult<Option<Recipe>>;

    /// Reads meal-prep plans changed after `since`.
    async fn list_mealprep_plans(&self, since: Option<Timestamp>)
        -> SyncResult<Vec<MealPrepPlan>>;

    /// Reads one meal-prep plan.
    async fn get_mealprep_plan(&self, id: &str) -> SyncResult<Option<MealPrepPlan>>;

    /// Reads every inventory item.
    async fn list_inventory_items(&self) -> SyncResult<Vec<InventoryItem>>;

    /// Reads every personal shopping list item.
    async fn list_shopping_items(&self) -> SyncResult<Vec<ShoppingItem>>;

    /// Distinct dates touched by any of the five daily source tables
    /// after `since`, newest first.
    async fn list_dates_touched(&self, since: Option<Timestamp>) -> SyncResult<Vec<NaiveDate>>;

    /// Every row of the five daily source tables for `date`, each list in
    /// ascending local time.
    async fn daily_data(&self, date: NaiveDate) -> SyncResult<DailyData>;
}
