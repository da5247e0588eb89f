//! Configuration for the sync engine.

use fitsync_model::SourceTable;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for sync passes.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Which tables are synchronized.
    pub toggles: SyncToggles,
    /// How a pass decides its `success` flag.
    pub success_policy: SuccessPolicy,
    /// Interval between automatic incremental passes.
    pub sync_interval: Duration,
}

impl SyncConfig {
    /// Creates a configuration with every table enabled.
    pub fn new() -> Self {
        Self {
            toggles: SyncToggles::default(),
            success_policy: SuccessPolicy::default(),
            sync_interval: Duration::from_secs(15 * 60),
        }
    }

    /// Sets the table toggles.
    pub fn with_toggles(mut self, toggles: SyncToggles) -> Self {
        self.toggles = toggles;
        self
    }

    /// Sets the success policy.
    pub fn with_success_policy(mut self, policy: SuccessPolicy) -> Self {
        self.success_policy = policy;
        self
    }

    /// Sets the automatic sync interval.
    pub fn with_sync_interval(mut self, interval: Duration) -> Self {
        self.sync_interval = interval;
        self
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// How [`SyncPassResult::success`](crate::SyncPassResult) is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuccessPolicy {
    /// Success means the shared error log is empty when the pass ends.
    ///
    /// The log is cleared when a pass starts, but single-item resyncs
    /// running concurrently with the pass append to it too, so their
    /// failures also turn the flag off.
    #[default]
    CumulativeLog,
    /// Success means this pass itself recorded no error.
    PassOnly,
}

/// Per-table enable switches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncToggles {
    /// Recipes.
    pub recipes: bool,
    /// Meals (daily documents).
    pub meals: bool,
    /// Water logs (daily documents).
    pub water: bool,
    /// Weight logs (daily documents).
    pub weight: bool,
    /// Meal-prep plans.
    pub mealprep: bool,
    /// Profile.
    pub profile: bool,
    /// Inventory.
    pub inventory: bool,
    /// Medication list.
    pub medications: bool,
    /// Blood pressure logs (daily documents).
    pub blood_pressure: bool,
    /// Shopping list.
    pub shopping_list: bool,
    /// Medication intake logs (daily documents).
    pub medication_logs: bool,
}

impl SyncToggles {
    /// Every table disabled.
    pub fn none() -> Self {
        Self {
            recipes: false,
            meals: false,
            water: false,
            weight: false,
            mealprep: false,
            profile: false,
            inventory: false,
            medications: false,
            blood_pressure: false,
            shopping_list: false,
            medication_logs: false,
        }
    }

    /// Returns whether `table` is synchronized.
    pub fn is_enabled(&self, table: SourceTable) -> bool {
        match table {
            SourceTable::Profile => self.profile,
            SourceTable::Medications => self.medications,
            SourceTable::Recipes => self.recipes,
            SourceTable::MealprepPlans => self.mealprep,
            SourceTable::InventoryItems => self.inventory,
            SourceTable::ShoppingItems => self.shopping_list,
            SourceTable::Meals => self.meals,
            SourceTable::WaterLogs => self.water,
            SourceTable::WeightLogs => self.weight,
            SourceTable::MedicationLogs => self.medication_logs,
            SourceTable::BloodPressureLogs => self.blood_pressure,
        }
    }

    /// Returns true if any daily source table is enabled.
    pub fn any_daily(&self) -> bool {
        SourceTable::DAILY_SOURCES
            .into_iter()
            .any(|table| self.is_enabled(table))
    }

    /// Tables enabled in `self` but disabled in `previous`.
    pub fn newly_enabled(&self, previous: &SyncToggles) -> Vec<SourceTable> {
        SourceTable::ALL
            .into_iter()
            .filter(|table| self.is_enabled(*table) && !previous.is_enabled(*table))
            .collect()
    }
}

impl Default for SyncToggles {
    fn default() -> Self {
        Self {
            recipes: true,
            meals: true,
            water: true,
            weight: true,
            mealprep: true,
            profile: true,
            inventory: true,
            medications: true,
            blood_pressure: true,
            shopping_list: true,
            medication_logs: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sync_config_builder() {
        let config = SyncConfig::new()
            .with_success_policy(SuccessPolicy::PassOnly)
            .with_sync_interval(Duration::from_secs(60))
            .with_toggles(SyncToggles::none());

        assert_eq!(config.success_policy, SuccessPolicy::PassOnly);
        assert_eq!(config.sync_interval, Duration::from_secs(60));
        assert!(!config.toggles.any_daily());
    }

    #[test]
    fn default_enables_everything() {
        let toggles = SyncToggles::default();
        assert!(SourceTable::ALL.iter().all(|t| toggles.is_enabled(*t)));
        assert_eq!(SyncConfig::default().success_policy, SuccessPolicy::CumulativeLog);
    }

    #[test]
    fn newly_enabled_tables() {
        let before = SyncToggles {
            water: false,
            recipes: false,
            ..SyncToggles::default()
        };
        let after = SyncToggles {
            recipes: false,
            ..SyncToggles::default()
        };
        assert_eq!(after.newly_enabled(&before), vec![SourceTable::WaterLogs]);
        assert!(before.newly_enabled(&after).is_empty());
    }

    #[test]
    fn toggles_deserialize_with_defaults() {
        let toggles: SyncToggles = serde_json::from_str(r#"{"water": false}"#).unwrap();
        assert!(!toggles.water);
        assert!(toggles.recipes);
        assert!(toggles.any_daily());
    }
}
