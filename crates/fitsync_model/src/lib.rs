//! # fitsync model
//!
//! Data model shared by the fitsync sync engine and realtime manager.
//!
//! This crate provides:
//! - Row types for the eleven remote source tables
//! - [`SourceTable`], the closed set of tables that are synchronized
//! - [`Document`], the closed set of output documents rendered from rows
//! - [`ResyncKey`], the target of a single-item resync
//!
//! ## Document shapes
//!
//! | Shape | Tables | Documents |
//! |---|---|---|
//! | aggregate | profile, medications, inventory, shopping list | exactly one |
//! | item | recipes, meal-prep plans | one per row id |
//! | date-bucketed | meals, water, weight, medication logs, blood pressure | one per touched date |

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod document;
mod key;
mod rows;
mod table;
mod time;

pub use document::{DailyData, Document, DocumentKind};
pub use key::ResyncKey;
pub use rows::{
    BloodPressureLog, ChangeStamp, DatedRow, DayMeals, Ingredient, InventoryItem, MealPrepDay,
    MealPrepPlan, MealSlot, Meal, Medication, MedicationLog, MedicationLogStatus, MedicationType,
    NutritionStrategy, PlanStatus, Recipe, ShoppingItem, StorageCategory, UserProfile,
    WaterLog, WaterSettings, WeightLog,
};
pub use table::{SourceTable, UnknownTable};
pub use time::{date_prefix, parse_date, Timestamp};
