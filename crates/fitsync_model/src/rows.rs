//! Row types of the remote source tables.
//!
//! Field names follow the remote schema (snake_case). Optional columns
//! default when absent so partially populated rows still deserialize.

use crate::time::{date_prefix, Timestamp};
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

/// Rows that carry a change time used for watermark filtering.
pub trait ChangeStamp {
    /// When the row was last changed, in epoch milliseconds.
    fn changed_at(&self) -> Timestamp;
}

/// Rows that belong to a daily document.
pub trait DatedRow {
    /// The calendar date this row is bucketed under.
    fn bucket_date(&self) -> Option<NaiveDate>;
}

/// A recipe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Recipe {
    /// Row id.
    pub id: String,
    /// Owning user.
    #[serde(default)]
    pub user_id: String,
    /// Title, also used for the document file name.
    #[serde(default)]
    pub title: String,
    /// Free-text description.
    #[serde(default)]
    pub description: String,
    /// Preparation time in minutes.
    #[serde(default)]
    pub preparation_time: Option<u32>,
    /// Ingredients, either plain lines or structured entries.
    #[serde(default)]
    pub ingredients: Vec<Ingredient>,
    /// Ordered instruction steps.
    #[serde(default)]
    pub instructions: Vec<String>,
    /// Energy in kcal.
    #[serde(default)]
    pub calories: f64,
    /// Protein in grams.
    #[serde(default)]
    pub protein: f64,
    /// Carbohydrates in grams.
    #[serde(default)]
    pub carbs: f64,
    /// Fat in grams.
    #[serde(default)]
    pub fat: f64,
    /// Free-form tags.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Whether the user marked the recipe as favorite.
    #[serde(default)]
    pub is_favorite: bool,
    /// Creation time.
    pub created_at: Timestamp,
    /// Last modification time, when tracked.
    #[serde(default)]
    pub updated_at: Option<Timestamp>,
}

impl ChangeStamp for Recipe {
    fn changed_at(&self) -> Timestamp {
        self.updated_at.unwrap_or(self.created_at)
    }
}

/// A recipe ingredient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Ingredient {
    /// A free-text ingredient line.
    Plain(String),
    /// An ingredient with a separate amount.
    Structured {
        /// Ingredient name.
        item: String,
        /// Amount including unit.
        #[serde(default)]
        amount: String,
    },
}

/// A logged meal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meal {
    /// Row id.
    pub id: String,
    /// Owning user.
    #[serde(default)]
    pub user_id: String,
    /// What was eaten.
    #[serde(default)]
    pub description: String,
    /// Energy in kcal.
    #[serde(default)]
    pub calories: f64,
    /// Protein in grams.
    #[serde(default)]
    pub protein: f64,
    /// Carbohydrates in grams.
    #[serde(default)]
    pub carbs: f64,
    /// Fat in grams.
    #[serde(default)]
    pub fat: f64,
    /// Local date the meal counts towards.
    pub date: NaiveDate,
    /// When the meal was logged.
    pub timestamp: Timestamp,
}

/// A water intake entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaterLog {
    /// Row id.
    pub id: String,
    /// Owning user.
    #[serde(default)]
    pub user_id: String,
    /// Amount in millilitres.
    pub amount: f64,
    /// Local date.
    pub date: NaiveDate,
    /// When the entry was logged.
    pub timestamp: Timestamp,
}

/// A body weight entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightLog {
    /// Row id.
    pub id: String,
    /// Owning user.
    #[serde(default)]
    pub user_id: String,
    /// Weight in kilograms.
    pub weight: f64,
    /// Local date.
    pub date: NaiveDate,
    /// When the entry was logged.
    pub timestamp: Timestamp,
}

macro_rules! timestamped_daily_row {
    ($($ty:ty),*) => {
        $(
            impl ChangeStamp for $ty {
                fn changed_at(&self) -> Timestamp {
                    self.timestamp
                }
            }

            impl DatedRow for $ty {
                fn bucket_date(&self) -> Option<NaiveDate> {
                    Some(self.date)
                }
            }
        )*
    };
}

timestamped_daily_row!(Meal, WaterLog, WeightLog);

/// Lifecycle status of a meal-prep plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PlanStatus {
    /// Being put together.
    #[default]
    Planning,
    /// Currently being cooked from.
    Active,
    /// Finished.
    Completed,
    /// Abandoned.
    Cancelled,
}

/// A multi-day meal-prep plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealPrepPlan {
    /// Row id.
    pub id: String,
    /// Owning user.
    #[serde(default)]
    pub user_id: String,
    /// Optional user-given name.
    #[serde(default)]
    pub name: Option<String>,
    /// First day of the plan.
    pub start_date: NaiveDate,
    /// Last day of the plan.
    pub end_date: NaiveDate,
    /// Per-day meal slots.
    #[serde(default)]
    pub days: Vec<MealPrepDay>,
    /// Plan status.
    #[serde(default)]
    pub status: PlanStatus,
    /// Creation time.
    pub created_at: Timestamp,
    /// Last modification time, when tracked.
    #[serde(default)]
    pub updated_at: Option<Timestamp>,
}

impl ChangeStamp for MealPrepPlan {
    fn changed_at(&self) -> Timestamp {
        self.updated_at.unwrap_or(self.created_at)
    }
}

impl MealPrepPlan {
    /// Every recipe id referenced by any slot of the plan.
    pub fn recipe_ids(&self) -> impl Iterator<Item = &str> {
        self.days.iter().flat_map(|day| day.meals.slots().map(|slot| slot.recipe_id.as_str()))
    }
}

/// One day of a meal-prep plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealPrepDay {
    /// Calendar date of this day.
    pub date: NaiveDate,
    /// Zero-based index within the plan.
    #[serde(default)]
    pub day_index: u32,
    /// Slots for this day.
    #[serde(default)]
    pub meals: DayMeals,
    /// Cooking instructions for the prep session.
    #[serde(default)]
    pub prep_instructions: Option<String>,
    /// True when no cooking is planned.
    #[serde(default)]
    pub is_rest_day: bool,
}

/// The meal slots of one plan day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct DayMeals {
    /// Breakfast slot.
    #[serde(default)]
    pub breakfast: Option<MealSlot>,
    /// Lunch slot.
    #[serde(default)]
    pub lunch: Option<MealSlot>,
    /// Dinner slot.
    #[serde(default)]
    pub dinner: Option<MealSlot>,
    /// Snack slots.
    #[serde(default)]
    pub snacks: Vec<MealSlot>,
}

impl DayMeals {
    /// Iterates over all filled slots in display order.
    pub fn slots(&self) -> impl Iterator<Item = &MealSlot> {
        self.breakfast
            .iter()
            .chain(self.lunch.iter())
            .chain(self.dinner.iter())
            .chain(self.snacks.iter())
    }
}

/// A recipe scheduled into a plan slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealSlot {
    /// Referenced recipe; resolved through the recipe cache at render time.
    pub recipe_id: String,
    /// Number of portions.
    #[serde(default = "one_portion")]
    pub portions: f64,
    /// Leftovers from an earlier day.
    #[serde(default)]
    pub is_leftover: bool,
    /// Already cooked.
    #[serde(default)]
    pub is_cooked: bool,
}

fn one_portion() -> f64 {
    1.0
}

/// Macro targets of the active nutrition strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NutritionStrategy {
    /// Daily energy target in kcal.
    pub daily_calories: f64,
    /// Protein target in grams.
    pub protein_target: f64,
    /// Fat target in grams.
    pub fat_target: f64,
    /// Carbohydrate target in grams.
    pub carb_target: f64,
}

/// Hydration settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaterSettings {
    /// Daily goal in millilitres.
    pub daily_goal: f64,
}

/// The user profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct UserProfile {
    /// User id.
    pub uid: String,
    /// Preferred display name.
    #[serde(default)]
    pub display_name: Option<String>,
    /// First name.
    #[serde(default)]
    pub first_name: Option<String>,
    /// Current weight in kilograms.
    #[serde(default)]
    pub current_weight: Option<f64>,
    /// Target weight in kilograms.
    #[serde(default)]
    pub target_weight: Option<f64>,
    /// Height in centimetres.
    #[serde(default)]
    pub height: Option<f64>,
    /// Weight goal (`lose`, `maintain`, `gain`).
    #[serde(default)]
    pub goal: Option<String>,
    /// Macro targets, used by daily documents.
    #[serde(default)]
    pub strategy: Option<NutritionStrategy>,
    /// Hydration goal, used by daily documents.
    #[serde(default)]
    pub water_settings: Option<WaterSettings>,
}

/// Where an inventory item is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageCategory {
    /// Refrigerated.
    Fridge,
    /// Frozen.
    Freezer,
    /// Shelf-stable.
    #[default]
    Pantry,
}

/// An item in the household inventory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryItem {
    /// Row id.
    pub id: String,
    /// Owning user.
    #[serde(default)]
    pub user_id: String,
    /// Item name.
    pub name: String,
    /// Quantity on hand.
    #[serde(default)]
    pub quantity: f64,
    /// Unit of the quantity.
    #[serde(default)]
    pub unit: String,
    /// Storage location.
    #[serde(default)]
    pub category: StorageCategory,
    /// Best-before date.
    #[serde(default)]
    pub expiry_date: Option<NaiveDate>,
    /// Restock threshold.
    #[serde(default)]
    pub min_quantity: Option<f64>,
    /// Last modification time.
    #[serde(default)]
    pub updated_at: Timestamp,
}

impl InventoryItem {
    /// True when the quantity has dropped to or below the restock threshold.
    pub fn needs_restock(&self) -> bool {
        self.min_quantity.is_some_and(|min| self.quantity <= min)
    }
}

/// Kind of medication entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MedicationType {
    /// Prescription or OTC medication.
    #[default]
    Medication,
    /// Vitamin.
    Vitamin,
    /// Other supplement.
    Supplement,
}

/// A medication definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Medication {
    /// Row id.
    pub id: String,
    /// Owning user.
    #[serde(default)]
    pub user_id: String,
    /// Display name.
    pub name: String,
    /// Medication, vitamin or supplement.
    #[serde(rename = "type", default)]
    pub kind: MedicationType,
    /// Dose amount.
    #[serde(default)]
    pub dosage: Option<String>,
    /// Dose unit.
    #[serde(default)]
    pub dosage_unit: Option<String>,
    /// Scheduled intake times (`HH:MM`).
    #[serde(default, deserialize_with = "schedule_times")]
    pub schedule_times: Vec<String>,
    /// Whether the medication is currently taken.
    #[serde(default)]
    pub is_active: bool,
    /// Free-text notes.
    #[serde(default)]
    pub notes: Option<String>,
    /// Creation time.
    #[serde(default)]
    pub created_at: Timestamp,
    /// Last modification time.
    #[serde(default)]
    pub updated_at: Timestamp,
}

/// The decrypted view delivers schedule times either as an array or as a
/// JSON-encoded string holding that array. Anything else reads as empty.
fn schedule_times<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    let parsed = match value {
        serde_json::Value::String(encoded) => {
            serde_json::from_str::<Vec<String>>(&encoded).unwrap_or_default()
        }
        array @ serde_json::Value::Array(_) => {
            serde_json::from_value::<Vec<String>>(array).unwrap_or_default()
        }
        _ => Vec::new(),
    };
    Ok(parsed)
}

/// Outcome of a scheduled medication intake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MedicationLogStatus {
    /// Not yet due or not yet answered.
    #[default]
    Pending,
    /// Taken.
    Taken,
    /// Missed.
    Missed,
    /// Deliberately skipped.
    Skipped,
}

/// One scheduled medication intake.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedicationLog {
    /// Row id.
    pub id: String,
    /// Owning user.
    #[serde(default)]
    pub user_id: String,
    /// Referenced medication; resolved through the medication cache.
    pub medication_id: String,
    /// Date the intake was scheduled for.
    pub scheduled_date: NaiveDate,
    /// Time the intake was scheduled for (`HH:MM`).
    #[serde(default)]
    pub scheduled_time: String,
    /// Intake outcome.
    #[serde(default)]
    pub status: MedicationLogStatus,
    /// Actual intake time, if taken.
    #[serde(default)]
    pub actual_time: Option<String>,
    /// Free-text notes.
    #[serde(default)]
    pub notes: Option<String>,
    /// Creation time.
    pub created_at: Timestamp,
}

impl ChangeStamp for MedicationLog {
    fn changed_at(&self) -> Timestamp {
        self.created_at
    }
}

impl DatedRow for MedicationLog {
    fn bucket_date(&self) -> Option<NaiveDate> {
        Some(self.scheduled_date)
    }
}

/// A blood pressure measurement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BloodPressureLog {
    /// Row id.
    pub id: String,
    /// Owning user.
    #[serde(default)]
    pub user_id: String,
    /// ISO-8601 measurement time in the user's local offset.
    pub measured_at: String,
    /// Time of day (`morning`, `evening`, `other`).
    #[serde(default)]
    pub period: Option<String>,
    /// Systolic pressure in mmHg.
    pub systolic: u16,
    /// Diastolic pressure in mmHg.
    pub diastolic: u16,
    /// Pulse in beats per minute.
    #[serde(default)]
    pub pulse: Option<u16>,
    /// Free-text notes.
    #[serde(default)]
    pub notes: Option<String>,
    /// Creation time.
    pub created_at: Timestamp,
}

impl ChangeStamp for BloodPressureLog {
    fn changed_at(&self) -> Timestamp {
        self.created_at
    }
}

impl DatedRow for BloodPressureLog {
    fn bucket_date(&self) -> Option<NaiveDate> {
        date_prefix(&self.measured_at)
    }
}

/// A shopping list entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShoppingItem {
    /// Row id.
    pub id: String,
    /// Owning user.
    #[serde(default)]
    pub user_id: String,
    /// Ingredient name.
    pub ingredient: String,
    /// Amount to buy.
    #[serde(default)]
    pub quantity: f64,
    /// Unit of the amount.
    #[serde(default)]
    pub unit: String,
    /// Aisle category (`produce`, `dairy`, ...).
    #[serde(default)]
    pub category: String,
    /// Already bought.
    #[serde(default)]
    pub checked: bool,
    /// Recipes that contributed this entry.
    #[serde(default)]
    pub from_recipes: Vec<String>,
    /// Shared-list group; personal items have none.
    #[serde(default)]
    pub group_id: Option<String>,
}
