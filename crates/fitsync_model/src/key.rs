//! Targets of single-item resyncs.

use crate::document::daily_key;
use chrono::NaiveDate;
use std::fmt;

/// One output document that a change notification asks to refresh.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResyncKey {
    /// A recipe by id.
    Recipe(String),
    /// A meal-prep plan by id.
    MealprepPlan(String),
    /// The daily document of a date.
    Daily(NaiveDate),
    /// The inventory list.
    Inventory,
    /// The medication list.
    Medications,
    /// The shopping list.
    ShoppingList,
}

impl ResyncKey {
    /// Key used to collapse bursts of notifications for the same document.
    pub fn debounce_key(&self) -> String {
        match self {
            ResyncKey::Recipe(id) => format!("recipe-{id}"),
            ResyncKey::MealprepPlan(id) => format!("mealprep-{id}"),
            ResyncKey::Daily(date) => daily_key(*date),
            ResyncKey::Inventory => "inventory".to_string(),
            ResyncKey::Medications => "medications".to_string(),
            ResyncKey::ShoppingList => "shopping".to_string(),
        }
    }
}

impl fmt::Display for ResyncKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.debounce_key())
    }
}
