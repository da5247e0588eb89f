//! The closed set of remote source tables.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A remote table the engine reads from.
///
/// Encrypted tables are read through their `_decrypted` views, so
/// [`SourceTable::name`] returns the view name. Change notifications are
/// published for the base table, see [`SourceTable::channel_table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SourceTable {
    /// User profile (one row).
    #[serde(rename = "profiles_decrypted")]
    Profile,
    /// Medication definitions.
    #[serde(rename = "medications_decrypted")]
    Medications,
    /// Recipes, one document each.
    #[serde(rename = "recipes")]
    Recipes,
    /// Meal-prep plans, one document each.
    #[serde(rename = "mealprep_plans")]
    MealprepPlans,
    /// Inventory items, one aggregate document.
    #[serde(rename = "inventory_items")]
    InventoryItems,
    /// Shopping list items, one aggregate document.
    #[serde(rename = "shopping_items")]
    ShoppingItems,
    /// Logged meals.
    #[serde(rename = "meals")]
    Meals,
    /// Water intake logs.
    #[serde(rename = "water_logs")]
    WaterLogs,
    /// Body weight logs.
    #[serde(rename = "weight_logs")]
    WeightLogs,
    /// Medication intake logs.
    #[serde(rename = "medication_logs_decrypted")]
    MedicationLogs,
    /// Blood pressure measurements.
    #[serde(rename = "blood_pressure_logs_decrypted")]
    BloodPressureLogs,
}

impl SourceTable {
    /// Every table, in sync dependency order.
    pub const ALL: [SourceTable; 11] = [
        SourceTable::Profile,
        SourceTable::Medications,
        SourceTable::Recipes,
        SourceTable::MealprepPlans,
        SourceTable::InventoryItems,
        SourceTable::ShoppingItems,
        SourceTable::Meals,
        SourceTable::WaterLogs,
        SourceTable::WeightLogs,
        SourceTable::MedicationLogs,
        SourceTable::BloodPressureLogs,
    ];

    /// The five tables that feed the per-date daily document.
    pub const DAILY_SOURCES: [SourceTable; 5] = [
        SourceTable::Meals,
        SourceTable::WaterLogs,
        SourceTable::WeightLogs,
        SourceTable::MedicationLogs,
        SourceTable::BloodPressureLogs,
    ];

    /// Tables with a change-notification channel. The profile has no
    /// single-item resync and is only refreshed by passes.
    pub const REALTIME: [SourceTable; 10] = [
        SourceTable::Recipes,
        SourceTable::Meals,
        SourceTable::WaterLogs,
        SourceTable::WeightLogs,
        SourceTable::MealprepPlans,
        SourceTable::InventoryItems,
        SourceTable::Medications,
        SourceTable::MedicationLogs,
        SourceTable::BloodPressureLogs,
        SourceTable::ShoppingItems,
    ];

    /// Name of the readable table or view; also the watermark key.
    pub fn name(&self) -> &'static str {
        match self {
            SourceTable::Profile => "profiles_decrypted",
            SourceTable::Medications => "medications_decrypted",
            SourceTable::Recipes => "recipes",
            SourceTable::MealprepPlans => "mealprep_plans",
            SourceTable::InventoryItems => "inventory_items",
            SourceTable::ShoppingItems => "shopping_items",
            SourceTable::Meals => "meals",
            SourceTable::WaterLogs => "water_logs",
            SourceTable::WeightLogs => "weight_logs",
            SourceTable::MedicationLogs => "medication_logs_decrypted",
            SourceTable::BloodPressureLogs => "blood_pressure_logs_decrypted",
        }
    }

    /// Name of the base table that publishes change notifications.
    pub fn channel_table(&self) -> &'static str {
        match self {
            SourceTable::Profile => "profiles",
            SourceTable::Medications => "medications",
            SourceTable::MedicationLogs => "medication_logs",
            SourceTable::BloodPressureLogs => "blood_pressure_logs",
            other => other.name(),
        }
    }

    /// Returns true for the tables aggregated into daily documents.
    pub fn is_daily_source(&self) -> bool {
        Self::DAILY_SOURCES.contains(self)
    }
}

impl fmt::Display for SourceTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Returned when parsing a table name that is not synchronized.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown source table: {0}")]
pub struct UnknownTable(pub String);

impl FromStr for SourceTable {
    type Err = UnknownTable;

    /// Accepts both view names and base table names.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.name() == s || t.channel_table() == s)
            .ok_or_else(|| UnknownTable(s.to_string()))
    }
}
