//! Channel records owned by the manager task.

use crate::config::HealthPolicy;
use crate::event::ChannelStatus;
use crate::transport::ChannelHandle;
use fitsync_model::SourceTable;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Public view of one channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelState {
    /// Subscribed table.
    pub table: SourceTable,
    /// Latest status of the current subscription.
    pub status: ChannelStatus,
    /// Retries since the last successful subscription.
    pub retry_count: u32,
    /// True while a retry is scheduled.
    pub retry_pending: bool,
    /// When the last notification arrived.
    pub last_event_at: Option<Instant>,
}

/// One logical subscription.
#[derive(Debug)]
pub(crate) struct ChannelRecord {
    pub(crate) table: SourceTable,
    pub(crate) handle: Option<ChannelHandle>,
    pub(crate) status: ChannelStatus,
    pub(crate) retry_count: u32,
    pub(crate) retry_timer: Option<JoinHandle<()>>,
    /// Identifies the current subscription; bumped on every resubscribe.
    pub(crate) generation: u64,
    pub(crate) subscribed_at: Option<Instant>,
    pub(crate) last_event_at: Option<Instant>,
}

impl ChannelRecord {
    pub(crate) fn new(table: SourceTable, generation: u64, retry_count: u32) -> Self {
        Self {
            table,
            handle: None,
            status: ChannelStatus::Pending,
            retry_count,
            retry_timer: None,
            generation,
            subscribed_at: None,
            last_event_at: None,
        }
    }

    pub(crate) fn cancel_retry(&mut self) {
        if let Some(timer) = self.retry_timer.take() {
            timer.abort();
        }
    }

    pub(crate) fn mark_subscribed(&mut self, now: Instant) {
        self.status = ChannelStatus::Subscribed;
        self.retry_count = 0;
        self.subscribed_at = Some(now);
        self.cancel_retry();
    }

    /// Returns true if the channel needs a full reconnect under `policy`.
    pub(crate) fn is_unhealthy(&self, policy: &HealthPolicy, now: Instant) -> bool {
        if self.status != ChannelStatus::Subscribed {
            return true;
        }
        let Some(stale_after) = policy.stale_after else {
            return false;
        };
        let last_seen = match (self.last_event_at, self.subscribed_at) {
            (Some(event), Some(subscribed)) => event.max(subscribed),
            (Some(at), None) | (None, Some(at)) => at,
            (None, None) => return false,
        };
        now.saturating_duration_since(last_seen) > stale_after
    }

    pub(crate) fn state(&self) -> ChannelState {
        ChannelState {
            table: self.table,
            status: self.status,
            retry_count: self.retry_count,
            retry_pending: self.retry_timer.is_some(),
            last_event_at: self.last_event_at,
        }
    }
}

impl Drop for ChannelRecord {
    fn drop(&mut self) {
        self.cancel_retry();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn policy(stale: Option<u64>) -> HealthPolicy {
        HealthPolicy::new(Duration::from_secs(60)).with_stale_after(stale.map(Duration::from_secs))
    }

    #[test]
    fn unsubscribed_channels_are_unhealthy() {
        let now = Instant::now();
        let mut record = ChannelRecord::new(SourceTable::Meals, 1, 0);
        assert!(record.is_unhealthy(&policy(None), now));

        record.mark_subscribed(now);
        assert!(!record.is_unhealthy(&policy(None), now));

        record.status = ChannelStatus::TimedOut;
        assert!(record.is_unhealthy(&policy(None), now));
    }

    #[test]
    fn silent_channels_go_stale() {
        let start = Instant::now();
        let mut record = ChannelRecord::new(SourceTable::Meals, 1, 2);
        record.mark_subscribed(start);
        assert_eq!(record.retry_count, 0);

        let later = start + Duration::from_secs(120);
        assert!(record.is_unhealthy(&policy(Some(60)), later));
        assert!(!record.is_unhealthy(&policy(None), later));

        record.last_event_at = Some(start + Duration::from_secs(100));
        assert!(!record.is_unhealthy(&policy(Some(60)), later));
    }
}
