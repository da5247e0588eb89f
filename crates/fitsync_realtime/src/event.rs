//! Change notifications and channel statuses reported by a transport.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// The row operation behind a change notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    /// A row was inserted.
    Insert,
    /// A row was updated.
    Update,
    /// A row was deleted.
    Delete,
}

/// One row-level change notification.
///
/// `new` is empty for deletes; `old` carries at least the primary key and
/// is often empty for inserts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    /// The operation.
    #[serde(rename = "eventType")]
    pub kind: ChangeKind,
    /// The row after the change.
    #[serde(default)]
    pub new: Map<String, Value>,
    /// The row before the change.
    #[serde(default)]
    pub old: Map<String, Value>,
}

impl ChangeEvent {
    /// An insert of `row`.
    pub fn insert(row: Value) -> Self {
        Self {
            kind: ChangeKind::Insert,
            new: into_map(row),
            old: Map::new(),
        }
    }

    /// An update to `row`.
    pub fn update(row: Value) -> Self {
        Self {
            kind: ChangeKind::Update,
            new: into_map(row),
            old: Map::new(),
        }
    }

    /// A delete of `row`.
    pub fn delete(row: Value) -> Self {
        Self {
            kind: ChangeKind::Delete,
            new: Map::new(),
            old: into_map(row),
        }
    }

    /// Reads a string column, preferring the new record over the old one.
    pub fn field(&self, name: &str) -> Option<&str> {
        string_field(&self.new, name).or_else(|| string_field(&self.old, name))
    }
}

fn string_field<'a>(record: &'a Map<String, Value>, name: &str) -> Option<&'a str> {
    record
        .get(name)
        .and_then(Value::as_str)
        .filter(|value| !value.is_empty())
}

fn into_map(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// Status of one channel as reported by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelStatus {
    /// Subscription requested, not yet confirmed.
    Pending,
    /// Receiving notifications.
    Subscribed,
    /// The channel failed.
    ChannelError,
    /// The subscription was not confirmed in time.
    TimedOut,
    /// The channel was closed.
    Closed,
}

impl ChannelStatus {
    /// Returns true for statuses that trigger a retry.
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            ChannelStatus::ChannelError | ChannelStatus::TimedOut | ChannelStatus::Closed
        )
    }
}

impl fmt::Display for ChannelStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChannelStatus::Pending => "pending",
            ChannelStatus::Subscribed => "subscribed",
            ChannelStatus::ChannelError => "channel_error",
            ChannelStatus::TimedOut => "timed_out",
            ChannelStatus::Closed => "closed",
        };
        f.write_str(name)
    }
}
