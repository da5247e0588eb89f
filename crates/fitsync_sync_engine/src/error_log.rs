//! Bounded log of per-item sync failures.

use fitsync_model::Timestamp;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Maximum number of entries kept in the error log.
pub const ERROR_LOG_CAPACITY: usize = 100;

/// Entity type recorded for failures of the daily pass.
pub const DAILY_SCOPE: &str = "daily_notes";

/// Entity type recorded for failures of the pass orchestration itself.
pub const ENGINE_SCOPE: &str = "sync_engine";

/// One recorded failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncErrorEntry {
    /// Table name or scope the failure belongs to.
    pub entity_type: String,
    /// Row id, date, or a marker such as `all`.
    pub item_id: String,
    /// Display form of the error.
    pub message: String,
    /// When the failure was recorded.
    pub timestamp: Timestamp,
}

/// A FIFO ring of error entries capped at [`ERROR_LOG_CAPACITY`].
///
/// Truncation drops the oldest inserted entries regardless of their
/// timestamps.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ErrorLog {
    entries: VecDeque<SyncErrorEntry>,
}

impl ErrorLog {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry, dropping the oldest one when full.
    pub fn push(&mut self, entry: SyncErrorEntry) {
        self.entries.push_back(entry);
        self.truncate();
    }

    /// Removes every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no entry is recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in insertion order.
    pub fn entries(&self) -> Vec<SyncErrorEntry> {
        self.entries.iter().cloned().collect()
    }

    /// Enforces the capacity after loading persisted entries.
    pub(crate) fn truncate(&mut self) {
        while self.entries.len() > ERROR_LOG_CAPACITY {
            self.entries.pop_front();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn entry(n: usize, timestamp: Timestamp) -> SyncErrorEntry {
        SyncErrorEntry {
            entity_type: "recipes".into(),
            item_id: format!("r{n}"),
            message: "boom".into(),
            timestamp,
        }
    }

    #[test]
    fn keeps_last_hundred_of_one_fifty() {
        let mut log = ErrorLog::new();
        for n in 0..150 {
            log.push(entry(n, n as Timestamp));
        }
        assert_eq!(log.len(), ERROR_LOG_CAPACITY);
        let ids: Vec<String> = log.entries().into_iter().map(|e| e.item_id).collect();
        let expected: Vec<String> = (50..150).map(|n| format!("r{n}")).collect();
        assert_eq!(ids, expected);
    }

    #[test]
    fn truncation_ignores_timestamps() {
        let mut log = ErrorLog::new();
        // Newest insertions carry the oldest timestamps.
        for n in 0..101 {
            log.push(entry(n, 1_000 - n as Timestamp));
        }
        assert_eq!(log.entries()[0].item_id, "r1");
    }

    #[test]
    fn persisted_form_is_a_plain_list() {
        let mut log = ErrorLog::new();
        log.push(entry(1, 5));
        let json = serde_json::to_value(&log).unwrap();
        assert!(json.is_array());
        let back: ErrorLog = serde_json::from_value(json).unwrap();
        assert_eq!(back, log);
    }

    proptest! {
        #[test]
        fn never_exceeds_capacity(count in 0usize..400) {
            let mut log = ErrorLog::new();
            for n in 0..count {
                log.push(entry(n, 0));
            }
            prop_assert_eq!(log.len(), count.min(ERROR_LOG_CAPACITY));
            if count > 0 {
                let last = log.entries().pop().unwrap();
                prop_assert_eq!(last.item_id, format!("r{}", count - 1));
            }
        }
    }
}
