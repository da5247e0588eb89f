//! Row fixtures.
//!
//! Every fixture takes its change time explicitly so tests control which
//! rows a watermark lets through.

use chrono::NaiveDate;
use fitsync_model::{
    parse_date, BloodPressureLog, DayMeals, InventoryItem, MealPrepDay, MealPrepPlan, MealSlot,
    Meal, Medication, MedicationLog, MedicationLogStatus, MedicationType, NutritionStrategy,
    PlanStatus, Recipe, ShoppingItem, StorageCategory, Timestamp, UserProfile, WaterLog,
    WaterSettings, WeightLog,
};

/// Parses a `YYYY-MM-DD` date, panicking on malformed input.
pub fn date(value: &str) -> NaiveDate {
    parse_date(value).unwrap_or_else(|| panic!("invalid fixture date {value}"))
}

/// A profile with nutrition and hydration goals.
pub fn profile(uid: &str) -> UserProfile {
    UserProfile {
        uid: uid.to_string(),
        display_name: Some("Test User".to_string()),
        first_name: Some("Test".to_string()),
        current_weight: Some(82.0),
        target_weight: Some(78.0),
        height: Some(180.0),
        goal: Some("lose".to_string()),
        strategy: Some(NutritionStrategy {
            daily_calories: 2_200.0,
            protein_target: 160.0,
            fat_target: 70.0,
            carb_target: 230.0,
        }),
        water_settings: Some(WaterSettings { daily_goal: 2_500.0 }),
    }
}

/// A recipe changed at `changed_at`.
pub fn recipe(id: &str, title: &str, changed_at: Timestamp) -> Recipe {
    Recipe {
        id: id.to_string(),
        user_id: "user-1".to_string(),
        title: title.to_string(),
        calories: 450.0,
        protein: 30.0,
        carbs: 40.0,
        fat: 15.0,
        instructions: vec!["Cook.".to_string()],
        created_at: changed_at,
        ..Recipe::default()
    }
}

/// A meal-prep plan over `days` starting at `start`, cooking
/// `recipe_ids` at lunch in turn.
pub fn mealprep_plan(
    id: &str,
    start: &str,
    recipe_ids: &[&str],
    changed_at: Timestamp,
) -> MealPrepPlan {
    let start = date(start);
    let days = recipe_ids
        .iter()
        .enumerate()
        .map(|(index, recipe_id)| MealPrepDay {
            date: start + chrono::Duration::days(index as i64),
            day_index: index as u32,
            meals: DayMeals {
                lunch: Some(MealSlot {
                    recipe_id: recipe_id.to_string(),
                    portions: 1.0,
                    is_leftover: false,
                    is_cooked: false,
                }),
                ..DayMeals::default()
            },
            prep_instructions: None,
            is_rest_day: false,
        })
        .collect::<Vec<_>>();
    let end = days.last().map_or(start, |day| day.date);
    MealPrepPlan {
        id: id.to_string(),
        user_id: "user-1".to_string(),
        name: None,
        start_date: start,
        end_date: end,
        days,
        status: PlanStatus::Active,
        created_at: changed_at,
        updated_at: None,
    }
}

/// A medication taken every morning.
pub fn medication(id: &str, name: &str) -> Medication {
    Medication {
        id: id.to_string(),
        user_id: "user-1".to_string(),
        name: name.to_string(),
        kind: MedicationType::Medication,
        dosage: Some("1".to_string()),
        dosage_unit: Some("tablet".to_string()),
        schedule_times: vec!["08:00".to_string()],
        is_active: true,
        notes: None,
        created_at: 0,
        updated_at: 0,
    }
}

/// An inventory item.
pub fn inventory_item(id: &str, name: &str, quantity: f64) -> InventoryItem {
    InventoryItem {
        id: id.to_string(),
        user_id: "user-1".to_string(),
        name: name.to_string(),
        quantity,
        unit: "pcs".to_string(),
        category: StorageCategory::Pantry,
        expiry_date: None,
        min_quantity: Some(1.0),
        updated_at: 0,
    }
}

/// A personal shopping list item.
pub fn shopping_item(id: &str, ingredient: &str) -> ShoppingItem {
    ShoppingItem {
        id: id.to_string(),
        user_id: "user-1".to_string(),
        ingredient: ingredient.to_string(),
        quantity: 1.0,
        unit: "pcs".to_string(),
        category: "produce".to_string(),
        checked: false,
        from_recipes: Vec::new(),
        group_id: None,
    }
}

/// A meal logged at `timestamp` on `day`.
pub fn meal(id: &str, day: &str, timestamp: Timestamp) -> Meal {
    Meal {
        id: id.to_string(),
        user_id: "user-1".to_string(),
        description: format!("meal {id}"),
        calories: 500.0,
        protein: 30.0,
        carbs: 50.0,
        fat: 20.0,
        date: date(day),
        timestamp,
    }
}

/// A water entry of `amount` millilitres.
pub fn water_log(id: &str, day: &str, amount: f64, timestamp: Timestamp) -> WaterLog {
    WaterLog {
        id: id.to_string(),
        user_id: "user-1".to_string(),
        amount,
        date: date(day),
        timestamp,
    }
}

/// A weight entry.
pub fn weight_log(id: &str, day: &str, weight: f64, timestamp: Timestamp) -> WeightLog {
    WeightLog {
        id: id.to_string(),
        user_id: "user-1".to_string(),
        weight,
        date: date(day),
        timestamp,
    }
}

/// A scheduled intake of `medication_id`.
pub fn medication_log(
    id: &str,
    medication_id: &str,
    day: &str,
    created_at: Timestamp,
) -> MedicationLog {
    MedicationLog {
        id: id.to_string(),
        user_id: "user-1".to_string(),
        medication_id: medication_id.to_string(),
        scheduled_date: date(day),
        scheduled_time: "08:00".to_string(),
        status: MedicationLogStatus::Taken,
        actual_time: Some("08:05".to_string()),
        notes: None,
        created_at,
    }
}

/// A blood pressure measurement at the ISO-8601 time `measured_at`.
pub fn blood_pressure_log(id: &str, measured_at: &str, created_at: Timestamp) -> BloodPressureLog {
    BloodPressureLog {
        id: id.to_string(),
        user_id: "user-1".to_string(),
        measured_at: measured_at.to_string(),
        period: Some("morning".to_string()),
        systolic: 121,
        diastolic: 79,
        pulse: Some(64),
        notes: None,
        created_at,
    }
}
