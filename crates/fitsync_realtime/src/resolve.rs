//! Maps a change notification to the document it affects.

use crate::event::ChangeEvent;
use chrono::NaiveDate;
use fitsync_model::{date_prefix, parse_date, ResyncKey, SourceTable};

/// Resolves the document affected by `event` on `table`.
///
/// Returns `None` for the profile table and for events that carry no
/// usable key.
pub fn resolve_key(table: SourceTable, event: &ChangeEvent) -> Option<ResyncKey> {
    match table {
        SourceTable::Recipes => event.field("id").map(|id| ResyncKey::Recipe(id.to_string())),
        SourceTable::MealprepPlans => event
            .field("id")
            .map(|id| ResyncKey::MealprepPlan(id.to_string())),
        SourceTable::Meals | SourceTable::WaterLogs | SourceTable::WeightLogs => {
            daily(event.field("date").and_then(parse_date))
        }
        SourceTable::MedicationLogs => daily(event.field("scheduled_date").and_then(parse_date)),
        SourceTable::BloodPressureLogs => daily(event.field("measured_at").and_then(date_prefix)),
        SourceTable::InventoryItems => Some(ResyncKey::Inventory),
        SourceTable::Medications => Some(ResyncKey::Medications),
        SourceTable::ShoppingItems => Some(ResyncKey::ShoppingList),
        SourceTable::Profile => None,
    }
}

fn daily(date: Option<NaiveDate>) -> Option<ResyncKey> {
    date.map(ResyncKey::Daily)
}
