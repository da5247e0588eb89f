//! Configuration for the realtime channel manager.

use fitsync_model::SourceTable;
use std::time::Duration;

/// Configuration for the realtime channel manager.
#[derive(Debug, Clone)]
pub struct RealtimeConfig {
    /// Quiet period after the last notification for a document before it
    /// is resynced.
    pub debounce: Duration,
    /// Per-channel retry policy.
    pub retry: RetryPolicy,
    /// Health check policy.
    pub health: HealthPolicy,
    /// Prefix of channel names; the table name is appended.
    pub channel_prefix: String,
    /// Tables to subscribe.
    pub tables: Vec<SourceTable>,
}

impl RealtimeConfig {
    /// Creates a configuration subscribing every table that has a
    /// single-item resync.
    pub fn new() -> Self {
        Self {
            debounce: Duration::from_secs(2),
            retry: RetryPolicy::default(),
            health: HealthPolicy::default(),
            channel_prefix: "fit-assistent-".to_string(),
            tables: SourceTable::REALTIME.to_vec(),
        }
    }

    /// Sets the debounce window.
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Sets the retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Sets the health check policy.
    pub fn with_health(mut self, health: HealthPolicy) -> Self {
        self.health = health;
        self
    }

    /// Sets the channel name prefix.
    pub fn with_channel_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.channel_prefix = prefix.into();
        self
    }

    /// Restricts the subscribed tables.
    ///
    /// The profile table has no single-item resync and is dropped.
    pub fn with_tables(mut self, tables: impl IntoIterator<Item = SourceTable>) -> Self {
        self.tables = tables
            .into_iter()
            .filter(|table| *table != SourceTable::Profile)
            .collect();
        self
    }

    /// Channel name of `table`.
    pub fn channel_name(&self, table: SourceTable) -> String {
        format!("{}{}", self.channel_prefix, table.channel_table())
    }
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Exponential backoff for re-subscribing a failed channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Retries allowed between two successful subscriptions.
    pub max_retries: u32,
    /// Upper bound of any single delay.
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// Creates a policy allowing `max_retries` retries.
    pub fn new(max_retries: u32) -> Self {
        Self {
            base_delay: Duration::from_secs(2),
            max_retries,
            max_delay: Duration::from_secs(60),
        }
    }

    /// Creates a policy that never retries.
    pub fn no_retry() -> Self {
        Self::new(0)
    }

    /// Sets the base delay.
    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Sets the maximum delay.
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Delay before retry number `retry_count` (0-indexed):
    /// `base_delay * 2^retry_count`, capped at `max_delay`.
    pub fn delay_for_attempt(&self, retry_count: u32) -> Duration {
        let factor = 2u32.checked_pow(retry_count).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// Returns true if a channel that already retried `retry_count` times
    /// may retry again.
    pub fn allows(&self, retry_count: u32) -> bool {
        retry_count < self.max_retries
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3)
    }
}

/// When the manager considers its channels unhealthy.
///
/// A channel is unhealthy when it is not subscribed. With `stale_after`
/// set, a subscribed channel that has delivered nothing for that long is
/// unhealthy too.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthPolicy {
    /// Interval between health checks.
    pub interval: Duration,
    /// Maximum silence of a subscribed channel.
    pub stale_after: Option<Duration>,
}

impl HealthPolicy {
    /// Creates a policy checking every `interval`.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            stale_after: Some(Duration::from_secs(30 * 60)),
        }
    }

    /// Sets the staleness window.
    pub fn with_stale_after(mut self, stale_after: Option<Duration>) -> Self {
        self.stale_after = stale_after;
        self
    }
}

impl Default for HealthPolicy {
    fn default() -> Self {
        Self::new(Duration::from_secs(5 * 60))
    }
}
