//! Property-based test generators using proptest.

use chrono::NaiveDate;
use fitsync_model::{Recipe, SourceTable, Timestamp};
use fitsync_realtime::ChangeEvent;
use fitsync_sync_engine::SyncErrorEntry;
use proptest::prelude::*;
use serde_json::json;

/// Strategy for calendar dates between 2020 and 2030.
pub fn date_strategy() -> impl Strategy<Value = NaiveDate> {
    (2020i32..2031, 1u32..13, 1u32..29)
        .prop_map(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d).expect("day below 29 is valid"))
}

/// Strategy for change times in epoch milliseconds.
pub fn timestamp_strategy() -> impl Strategy<Value = Timestamp> {
    1_600_000_000_000i64..1_900_000_000_000
}

/// Strategy for sequences of pass start times, not necessarily ordered.
pub fn pass_times_strategy() -> impl Strategy<Value = Vec<Timestamp>> {
    prop::collection::vec(timestamp_strategy(), 1..12)
}

/// Strategy for recipe row ids.
pub fn row_id_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z0-9]{4,12}").expect("Invalid regex")
}

/// Strategy for recipes with a printable title.
pub fn recipe_strategy() -> impl Strategy<Value = Recipe> {
    (
        row_id_strategy(),
        prop::string::string_regex("[A-Za-z][A-Za-z ]{0,23}").expect("Invalid regex"),
        timestamp_strategy(),
        prop::option::of(timestamp_strategy()),
    )
        .prop_map(|(id, title, created_at, updated_at)| Recipe {
            id,
            title,
            created_at,
            updated_at,
            ..Recipe::default()
        })
}

/// Strategy for any source table.
pub fn table_strategy() -> impl Strategy<Value = SourceTable> {
    prop::sample::select(SourceTable::ALL.to_vec())
}

/// Strategy for error log entries.
pub fn error_entry_strategy() -> impl Strategy<Value = SyncErrorEntry> {
    (
        table_strategy(),
        row_id_strategy(),
        "[a-z ]{1,40}",
        timestamp_strategy(),
    )
        .prop_map(|(table, item_id, message, timestamp)| SyncErrorEntry {
            entity_type: table.name().to_string(),
            item_id,
            message,
            timestamp,
        })
}

/// Strategy for change notifications on a date-bucketed table, carrying
/// `date` in either the new or the old record.
pub fn dated_event_strategy() -> impl Strategy<Value = (NaiveDate, ChangeEvent)> {
    (date_strategy(), row_id_strategy(), 0u8..3).prop_map(|(date, id, kind)| {
        let row = json!({ "id": id, "date": date.format("%Y-%m-%d").to_string() });
        let event = match kind {
            0 => ChangeEvent::insert(row),
            1 => ChangeEvent::update(row),
            _ => ChangeEvent::delete(row),
        };
        (date, event)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #[test]
        fn recipes_have_usable_ids_and_titles(recipe in recipe_strategy()) {
            prop_assert!((4..=12).contains(&recipe.id.len()));
            prop_assert!(!recipe.title.trim().is_empty());
        }

        #[test]
        fn dated_events_expose_their_date((date, event) in dated_event_strategy()) {
            let expected = date.format("%Y-%m-%d").to_string();
            prop_assert_eq!(event.field("date"), Some(expected.as_str()));
        }
    }
}
