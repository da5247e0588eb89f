//! Change-notification transport abstraction.

use crate::error::{RealtimeError, RealtimeResult};
use crate::event::{ChangeEvent, ChannelStatus};
use crate::manager::Command;
use async_trait::async_trait;
use fitsync_model::SourceTable;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::mpsc;
use tokio::time::Instant;

/// Opaque handle of one transport subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChannelHandle(pub u64);

/// Where a transport delivers the notifications and status changes of one
/// subscription.
///
/// Each subscription gets its own sink. Once the manager replaces a
/// subscription, reports through the old sink are ignored.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    table: SourceTable,
    name: String,
    generation: u64,
    mailbox: mpsc::UnboundedSender<Command>,
}

impl ChannelSink {
    pub(crate) fn new(
        table: SourceTable,
        name: String,
        generation: u64,
        mailbox: mpsc::UnboundedSender<Command>,
    ) -> Self {
        Self {
            table,
            name,
            generation,
            mailbox,
        }
    }

    /// The subscribed table.
    pub fn table(&self) -> SourceTable {
        self.table
    }

    /// Name the channel should be registered under.
    pub fn channel_name(&self) -> &str {
        &self.name
    }

    /// Delivers a change notification. Returns false if the manager has
    /// stopped.
    pub fn event(&self, event: ChangeEvent) -> bool {
        self.mailbox
            .send(Command::Event {
                table: self.table,
                generation: self.generation,
                event,
            })
            .is_ok()
    }

    /// Reports a status change. Returns false if the manager has stopped.
    pub fn status(&self, status: ChannelStatus) -> bool {
        self.mailbox
            .send(Command::Status {
                table: self.table,
                generation: self.generation,
                status,
            })
            .is_ok()
    }
}

/// A pub/sub transport delivering row-level change notifications.
///
/// This trait abstracts the wire protocol, allowing for different
/// implementations (websocket client, mock for testing, etc.).
#[async_trait]
pub trait ChangeTransport: Send + Sync + 'static {
    /// Opens a subscription for `table`. Statuses and events of the
    /// subscription are delivered through `sink`, starting with
    /// [`ChannelStatus::Pending`] or directly with a later status.
    async fn subscribe(&self, table: SourceTable, sink: ChannelSink)
        -> RealtimeResult<ChannelHandle>;

    /// Closes a subscription.
    async fn unsubscribe(&self, handle: ChannelHandle) -> RealtimeResult<()>;

    /// Replaces the credentials of every open subscription in place.
    async fn update_credential(&self, token: &str) -> RealtimeResult<()>;
}

/// One recorded call to [`ChangeTransport::subscribe`].
#[derive(Debug, Clone)]
pub struct SubscriptionRecord {
    /// Subscribed table.
    pub table: SourceTable,
    /// Requested channel name.
    pub channel: String,
    /// Returned handle, `None` when the call was rejected.
    pub handle: Option<ChannelHandle>,
    /// When the call was made.
    pub at: Instant,
}

#[derive(Debug, Default)]
struct MockState {
    open: HashMap<ChannelHandle, ChannelSink>,
    subscriptions: Vec<SubscriptionRecord>,
    unsubscribed: Vec<ChannelHandle>,
    credentials: Vec<String>,
    failing: HashSet<SourceTable>,
}

/// A mock transport for testing.
///
/// By default every subscription is confirmed immediately.
#[derive(Debug)]
pub struct MockChangeTransport {
    state: Mutex<MockState>,
    next_handle: AtomicU64,
    auto_subscribe: AtomicBool,
    reject_credentials: AtomicBool,
}

impl MockChangeTransport {
    /// Creates a transport that confirms every subscription.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState::default()),
            next_handle: AtomicU64::new(1),
            auto_subscribe: AtomicBool::new(true),
            reject_credentials: AtomicBool::new(false),
        }
    }

    /// Creates a transport that leaves subscriptions pending until a
    /// status is set with [`set_status`](Self::set_status).
    pub fn manual() -> Self {
        let transport = Self::new();
        transport.set_auto_subscribe(false);
        transport
    }

    /// Sets whether subscriptions are confirmed immediately.
    pub fn set_auto_subscribe(&self, auto: bool) {
        self.auto_subscribe.store(auto, Ordering::SeqCst);
    }

    /// Sets whether credential updates are rejected.
    pub fn set_reject_credentials(&self, reject: bool) {
        self.reject_credentials.store(reject, Ordering::SeqCst);
    }

    /// Makes subscribing `table` fail until cleared.
    pub fn set_failing(&self, table: SourceTable, failing: bool) {
        let mut state = self.state.lock();
        if failing {
            state.failing.insert(table);
        } else {
            state.failing.remove(&table);
        }
    }

    /// The sink of the open subscription of `table`.
    pub fn sink(&self, table: SourceTable) -> Option<ChannelSink> {
        let state = self.state.lock();
        let handle = state
            .subscriptions
            .iter()
            .rev()
            .filter(|record| record.table == table)
            .find_map(|record| record.handle.filter(|h| state.open.contains_key(h)))?;
        state.open.get(&handle).cloned()
    }

    /// Delivers `event` on the open subscription of `table`.
    pub fn emit(&self, table: SourceTable, event: ChangeEvent) -> bool {
        self.sink(table).is_some_and(|sink| sink.event(event))
    }

    /// Reports `status` on the open subscription of `table`.
    pub fn set_status(&self, table: SourceTable, status: ChannelStatus) -> bool {
        self.sink(table).is_some_and(|sink| sink.status(status))
    }

    /// Every subscribe call so far.
    pub fn subscriptions(&self) -> Vec<SubscriptionRecord> {
        self.state.lock().subscriptions.clone()
    }

    /// Subscribe calls made for `table`.
    pub fn subscriptions_for(&self, table: SourceTable) -> Vec<SubscriptionRecord> {
        self.state
            .lock()
            .subscriptions
            .iter()
            .filter(|record| record.table == table)
            .cloned()
            .collect()
    }

    /// Number of open subscriptions.
    pub fn open_count(&self) -> usize {
        self.state.lock().open.len()
    }

    /// Handles closed so far.
    pub fn unsubscribed(&self) -> Vec<ChannelHandle> {
        self.state.lock().unsubscribed.clone()
    }

    /// Credentials accepted so far.
    pub fn credentials(&self) -> Vec<String> {
        self.state.lock().credentials.clone()
    }
}

impl Default for MockChangeTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChangeTransport for MockChangeTransport {
    async fn subscribe(
        &self,
        table: SourceTable,
        sink: ChannelSink,
    ) -> RealtimeResult<ChannelHandle> {
        let mut state = self.state.lock();
        let mut record = SubscriptionRecord {
            table,
            channel: sink.channel_name().to_string(),
            handle: None,
            at: Instant::now(),
        };
        if state.failing.contains(&table) {
            state.subscriptions.push(record);
            return Err(RealtimeError::transport(table, "subscription rejected"));
        }
        let handle = ChannelHandle(self.next_handle.fetch_add(1, Ordering::SeqCst));
        record.handle = Some(handle);
        state.subscriptions.push(record);
        if self.auto_subscribe.load(Ordering::SeqCst) {
            sink.status(ChannelStatus::Subscribed);
        } else {
            sink.status(ChannelStatus::Pending);
        }
        state.open.insert(handle, sink);
        Ok(handle)
    }

    async fn unsubscribe(&self, handle: ChannelHandle) -> RealtimeResult<()> {
        let mut state = self.state.lock();
        state.open.remove(&handle);
        state.unsubscribed.push(handle);
        Ok(())
    }

    async fn update_credential(&self, token: &str) -> RealtimeResult<()> {
        if self.reject_credentials.load(Ordering::SeqCst) {
            return Err(RealtimeError::Credential("token rejected".into()));
        }
        self.state.lock().credentials.push(token.to_string());
        Ok(())
    }
}
