//! Output documents and the daily aggregate.

use crate::rows::{
    BloodPressureLog, InventoryItem, Meal, MealPrepPlan, Medication, MedicationLog, Recipe,
    ShoppingItem, UserProfile, WaterLog, WeightLog,
};
use crate::table::SourceTable;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of an output document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    /// The profile page.
    Profile,
    /// The medication list.
    Medications,
    /// One recipe.
    Recipe,
    /// One meal-prep plan.
    MealprepPlan,
    /// The inventory list.
    Inventory,
    /// The shopping list.
    ShoppingList,
    /// One calendar day.
    Daily,
}

impl DocumentKind {
    /// Stable lowercase name.
    pub fn name(&self) -> &'static str {
        match self {
            DocumentKind::Profile => "profile",
            DocumentKind::Medications => "medications",
            DocumentKind::Recipe => "recipe",
            DocumentKind::MealprepPlan => "mealprep_plan",
            DocumentKind::Inventory => "inventory",
            DocumentKind::ShoppingList => "shopping_list",
            DocumentKind::Daily => "daily",
        }
    }

    /// True for kinds that produce exactly one document.
    pub fn is_aggregate(&self) -> bool {
        matches!(
            self,
            DocumentKind::Profile
                | DocumentKind::Medications
                | DocumentKind::Inventory
                | DocumentKind::ShoppingList
        )
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A document about to be rendered and written, borrowing its source rows.
///
/// Renderers and path resolvers match on this enum exhaustively, so adding a
/// document kind is a compile error everywhere it is not handled.
#[derive(Debug, Clone, Copy)]
pub enum Document<'a> {
    /// The profile page.
    Profile(&'a UserProfile),
    /// All medications.
    Medications(&'a [Medication]),
    /// One recipe.
    Recipe(&'a Recipe),
    /// One meal-prep plan.
    MealprepPlan(&'a MealPrepPlan),
    /// All inventory items.
    Inventory(&'a [InventoryItem]),
    /// All personal shopping items.
    ShoppingList(&'a [ShoppingItem]),
    /// Everything logged on one date.
    Daily(&'a DailyData),
}

impl Document<'_> {
    /// The kind of this document.
    pub fn kind(&self) -> DocumentKind {
        match self {
            Document::Profile(_) => DocumentKind::Profile,
            Document::Medications(_) => DocumentKind::Medications,
            Document::Recipe(_) => DocumentKind::Recipe,
            Document::MealprepPlan(_) => DocumentKind::MealprepPlan,
            Document::Inventory(_) => DocumentKind::Inventory,
            Document::ShoppingList(_) => DocumentKind::ShoppingList,
            Document::Daily(_) => DocumentKind::Daily,
        }
    }

    /// Stable key under which the written path is recorded.
    pub fn mapping_key(&self) -> String {
        match self {
            Document::Profile(_) => "profile".to_string(),
            Document::Medications(_) => "medications".to_string(),
            Document::Recipe(recipe) => recipe.id.clone(),
            Document::MealprepPlan(plan) => plan.id.clone(),
            Document::Inventory(_) => "inventory".to_string(),
            Document::ShoppingList(_) => "shopping_list".to_string(),
            Document::Daily(daily) => daily_key(daily.date),
        }
    }
}

/// Mapping key of the daily document for `date`.
pub(crate) fn daily_key(date: NaiveDate) -> String {
    format!("daily-{}", date.format("%Y-%m-%d"))
}

/// All rows of the five daily source tables for one date, each list in
/// ascending local time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyData {
    /// The calendar date.
    pub date: NaiveDate,
    /// Meals logged on the date.
    #[serde(default)]
    pub meals: Vec<Meal>,
    /// Water entries.
    #[serde(default)]
    pub water_logs: Vec<WaterLog>,
    /// Weight entries.
    #[serde(default)]
    pub weight_logs: Vec<WeightLog>,
    /// Scheduled medication intakes.
    #[serde(default)]
    pub medication_logs: Vec<MedicationLog>,
    /// Blood pressure measurements.
    #[serde(default)]
    pub blood_pressure_logs: Vec<BloodPressureLog>,
}

impl DailyData {
    /// An aggregate with no rows.
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            meals: Vec::new(),
            water_logs: Vec::new(),
            weight_logs: Vec::new(),
            medication_logs: Vec::new(),
            blood_pressure_logs: Vec::new(),
        }
    }

    /// Total number of contributing rows across all five sources.
    pub fn row_count(&self) -> usize {
        self.meals.len()
            + self.water_logs.len()
            + self.weight_logs.len()
            + self.medication_logs.len()
            + self.blood_pressure_logs.len()
    }

    /// True when no source contributed a row.
    pub fn is_empty(&self) -> bool {
        self.row_count() == 0
    }

    /// Drops the rows of every source table for which `keep` is false.
    pub fn retain_sources(&mut self, keep: impl Fn(SourceTable) -> bool) {
        if !keep(SourceTable::Meals) {
            self.meals.clear();
        }
        if !keep(SourceTable::WaterLogs) {
            self.water_logs.clear();
        }
        if !keep(SourceTable::WeightLogs) {
            self.weight_logs.clear();
        }
        if !keep(SourceTable::MedicationLogs) {
            self.medication_logs.clear();
        }
        if !keep(SourceTable::BloodPressureLogs) {
            self.blood_pressure_logs.clear();
        }
    }

    /// Total water intake in millilitres.
    pub fn total_water(&self) -> f64 {
        self.water_logs.iter().map(|log| log.amount).sum()
    }

    /// Total energy intake in kcal.
    pub fn total_calories(&self) -> f64 {
        self.meals.iter().map(|meal| meal.calories).sum()
    }
}
