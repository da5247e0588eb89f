//! The realtime channel manager actor.

use crate::channel::{ChannelRecord, ChannelState};
use crate::config::RealtimeConfig;
use crate::error::{RealtimeError, RealtimeResult};
use crate::event::{ChangeEvent, ChannelStatus};
use crate::resolve::resolve_key;
use crate::target::ResyncTarget;
use crate::transport::{ChangeTransport, ChannelHandle, ChannelSink};
use fitsync_model::{ResyncKey, SourceTable};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Messages processed by the manager task.
#[derive(Debug)]
pub(crate) enum Command {
    Event {
        table: SourceTable,
        generation: u64,
        event: ChangeEvent,
    },
    Status {
        table: SourceTable,
        generation: u64,
        status: ChannelStatus,
    },
    RetryDue {
        table: SourceTable,
        generation: u64,
    },
    DebounceFired {
        key: String,
        seq: u64,
    },
    SubscribeAll(oneshot::Sender<()>),
    UnsubscribeAll(oneshot::Sender<()>),
    ReconnectAll(oneshot::Sender<()>),
    RefreshCredential {
        token: String,
        reply: oneshot::Sender<CredentialRefresh>,
    },
    CheckHealth(oneshot::Sender<bool>),
    Channels(oneshot::Sender<Vec<ChannelState>>),
    Shutdown(Option<oneshot::Sender<()>>),
}

/// How a credential refresh was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialRefresh {
    /// The transport accepted the token without resubscribing.
    UpdatedInPlace,
    /// The transport rejected the token; every channel was rebuilt.
    Reconnected,
}

/// A pending debounced resync.
struct Debounce {
    key: ResyncKey,
    seq: u64,
    timer: JoinHandle<()>,
}

/// Handle to the realtime channel manager task.
///
/// Dropping the handle shuts the task down.
pub struct RealtimeManager {
    mailbox: mpsc::UnboundedSender<Command>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl RealtimeManager {
    /// Spawns the manager task. No channel is opened until
    /// [`subscribe_all`](Self::subscribe_all) is called.
    ///
    /// Must be called within a tokio runtime.
    pub fn start<T, G>(config: RealtimeConfig, transport: Arc<T>, target: Arc<G>) -> Self
    where
        T: ChangeTransport,
        G: ResyncTarget,
    {
        let (mailbox, inbox) = mpsc::unbounded_channel();
        let actor = Actor {
            config,
            transport,
            target,
            mailbox: mailbox.clone(),
            channels: HashMap::new(),
            debounces: HashMap::new(),
            next_generation: 0,
            active: false,
        };
        let task = tokio::spawn(actor.run(inbox));
        Self {
            mailbox,
            task: Mutex::new(Some(task)),
        }
    }

    async fn request<R>(&self, make: impl FnOnce(oneshot::Sender<R>) -> Command) -> RealtimeResult<R> {
        let (reply, response) = oneshot::channel();
        self.mailbox
            .send(make(reply))
            .map_err(|_| RealtimeError::Stopped)?;
        response.await.map_err(|_| RealtimeError::Stopped)
    }

    /// Drops every channel and pending resync, then subscribes every
    /// configured table.
    pub async fn subscribe_all(&self) -> RealtimeResult<()> {
        self.request(Command::SubscribeAll).await
    }

    /// Closes every channel and cancels every pending retry and resync.
    /// Resyncs already running are left to finish.
    pub async fn unsubscribe_all(&self) -> RealtimeResult<()> {
        self.request(Command::UnsubscribeAll).await
    }

    /// Rebuilds every channel from scratch with fresh retry counters.
    /// Pending resyncs are kept.
    pub async fn reconnect_all(&self) -> RealtimeResult<()> {
        self.request(Command::ReconnectAll).await
    }

    /// Hands a refreshed token to the transport, falling back to a full
    /// reconnect if it cannot be applied in place.
    pub async fn propagate_credential_refresh(
        &self,
        token: impl Into<String>,
    ) -> RealtimeResult<CredentialRefresh> {
        let token = token.into();
        self.request(|reply| Command::RefreshCredential { token, reply })
            .await
    }

    /// Runs a health check now. Returns true if it forced a reconnect.
    pub async fn check_health(&self) -> RealtimeResult<bool> {
        self.request(Command::CheckHealth).await
    }

    /// Current state of every channel, in table order.
    pub async fn channels(&self) -> RealtimeResult<Vec<ChannelState>> {
        self.request(Command::Channels).await
    }

    /// Closes every channel and stops the task.
    pub async fn shutdown(&self) -> RealtimeResult<()> {
        self.request(|reply| Command::Shutdown(Some(reply))).await?;
        let task = self.task.lock().take();
        if let Some(task) = task {
            let _ = task.await;
        }
        Ok(())
    }
}

impl Drop for RealtimeManager {
    fn drop(&mut self) {
        let _ = self.mailbox.send(Command::Shutdown(None));
    }
}

struct Actor<T: ChangeTransport, G: ResyncTarget> {
    config: RealtimeConfig,
    transport: Arc<T>,
    target: Arc<G>,
    mailbox: mpsc::UnboundedSender<Command>,
    channels: HashMap<SourceTable, ChannelRecord>,
    debounces: HashMap<String, Debounce>,
    next_generation: u64,
    /// True between subscribing and unsubscribing.
    active: bool,
}

impl<T: ChangeTransport, G: ResyncTarget> Actor<T, G> {
    async fn run(mut self, mut inbox: mpsc::UnboundedReceiver<Command>) {
        let period = self.config.health.interval.max(Duration::from_millis(1));
        let mut health = tokio::time::interval_at(Instant::now() + period, period);
        health.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                command = inbox.recv() => {
                    let Some(command) = command else { break };
                    if !self.handle(command).await {
                        break;
                    }
                }
                _ = health.tick() => {
                    self.check_health().await;
                }
            }
        }
        debug!("realtime manager stopped");
    }

    /// Processes one command. Returns false when the task should stop.
    async fn handle(&mut self, command: Command) -> bool {
        match command {
            Command::Event {
                table,
                generation,
                event,
            } => self.on_event(table, generation, event),
            Command::Status {
                table,
                generation,
                status,
            } => self.on_status(table, generation, status),
            Command::RetryDue { table, generation } => self.on_retry_due(table, generation).await,
            Command::DebounceFired { key, seq } => self.on_debounce_fired(key, seq),
            Command::SubscribeAll(reply) => {
                self.close_channels().await;
                self.clear_debounces();
                self.open_channels().await;
                info!(channels = self.channels.len(), "realtime subscribed");
                let _ = reply.send(());
            }
            Command::UnsubscribeAll(reply) => {
                self.unsubscribe_all().await;
                let _ = reply.send(());
            }
            Command::ReconnectAll(reply) => {
                self.reconnect_all().await;
                let _ = reply.send(());
            }
            Command::RefreshCredential { token, reply } => {
                let outcome = match self.transport.update_credential(&token).await {
                    Ok(()) => {
                        debug!("credentials updated in place");
                        CredentialRefresh::UpdatedInPlace
                    }
                    Err(e) => {
                        warn!(error = %e, "credential update failed, reconnecting");
                        self.reconnect_all().await;
                        CredentialRefresh::Reconnected
                    }
                };
                let _ = reply.send(outcome);
            }
            Command::CheckHealth(reply) => {
                let reconnected = self.check_health().await;
                let _ = reply.send(reconnected);
            }
            Command::Channels(reply) => {
                let mut states: Vec<ChannelState> =
                    self.channels.values().map(ChannelRecord::state).collect();
                states.sort_by_key(|state| state.table);
                let _ = reply.send(states);
            }
            Command::Shutdown(reply) => {
                self.unsubscribe_all().await;
                if let Some(reply) = reply {
                    let _ = reply.send(());
                }
                return false;
            }
        }
        true
    }

    fn on_event(&mut self, table: SourceTable, generation: u64, event: ChangeEvent) {
        if !self.active {
            return;
        }
        let Some(record) = self
            .channels
            .get_mut(&table)
            .filter(|record| record.generation == generation)
        else {
            debug!(table = %table, "event of replaced subscription ignored");
            return;
        };
        record.last_event_at = Some(Instant::now());
        match resolve_key(table, &event) {
            Some(key) => self.debounce(key),
            None => debug!(table = %table, kind = ?event.kind, "change without usable key dropped"),
        }
    }

    fn on_status(&mut self, table: SourceTable, generation: u64, status: ChannelStatus) {
        let Some(record) = self
            .channels
            .get_mut(&table)
            .filter(|record| record.generation == generation)
        else {
            debug!(table = %table, %status, "status of replaced subscription ignored");
            return;
        };
        debug!(table = %table, from = %record.status, to = %status, "channel status");
        match status {
            ChannelStatus::Subscribed => record.mark_subscribed(Instant::now()),
            ChannelStatus::Pending => record.status = status,
            ChannelStatus::ChannelError | ChannelStatus::TimedOut | ChannelStatus::Closed => {
                record.status = status;
                self.schedule_retry(table);
            }
        }
    }

    fn schedule_retry(&mut self, table: SourceTable) {
        let Some(record) = self.channels.get_mut(&table) else {
            return;
        };
        if record.retry_timer.is_some() {
            return;
        }
        if !self.config.retry.allows(record.retry_count) {
            warn!(
                table = %table,
                retries = record.retry_count,
                "channel abandoned until the next reconnect"
            );
            return;
        }
        let delay = self.config.retry.delay_for_attempt(record.retry_count);
        record.retry_count += 1;
        warn!(
            table = %table,
            attempt = record.retry_count,
            delay_ms = delay.as_millis() as u64,
            "channel failed, retry scheduled"
        );
        let generation = record.generation;
        let mailbox = self.mailbox.clone();
        record.retry_timer = Some(tokio::spawn(async move {
            sleep(delay).await;
            let _ = mailbox.send(Command::RetryDue { table, generation });
        }));
    }

    async fn on_retry_due(&mut self, table: SourceTable, generation: u64) {
        let Some(record) = self
            .channels
            .get_mut(&table)
            .filter(|record| record.generation == generation)
        else {
            return;
        };
        if record.retry_timer.take().is_none() {
            return;
        }
        let retry_count = record.retry_count;
        let handle = record.handle.take();
        self.channels.remove(&table);
        if let Some(handle) = handle {
            self.detach(table, handle).await;
        }
        debug!(table = %table, retry_count, "resubscribing channel");
        self.open(table, retry_count).await;
    }

    fn debounce(&mut self, key: ResyncKey) {
        let name = key.debounce_key();
        let seq = match self.debounces.remove(&name) {
            Some(previous) => {
                previous.timer.abort();
                previous.seq + 1
            }
            None => 0,
        };
        let delay = self.config.debounce;
        let mailbox = self.mailbox.clone();
        let fired = name.clone();
        let timer = tokio::spawn(async move {
            sleep(delay).await;
            let _ = mailbox.send(Command::DebounceFired { key: fired, seq });
        });
        self.debounces.insert(name, Debounce { key, seq, timer });
    }

    fn on_debounce_fired(&mut self, name: String, seq: u64) {
        if !self.debounces.get(&name).is_some_and(|d| d.seq == seq) {
            return;
        }
        let Some(debounce) = self.debounces.remove(&name) else {
            return;
        };
        let target = self.target.clone();
        let key = debounce.key;
        debug!(key = %key, "dispatching resync");
        tokio::spawn(async move {
            target.resync(key).await;
        });
    }

    /// Opens a fresh subscription for `table` carrying `retry_count`.
    async fn open(&mut self, table: SourceTable, retry_count: u32) {
        self.next_generation += 1;
        let generation = self.next_generation;
        let sink = ChannelSink::new(
            table,
            self.config.channel_name(table),
            generation,
            self.mailbox.clone(),
        );
        self.channels
            .insert(table, ChannelRecord::new(table, generation, retry_count));

        match self.transport.subscribe(table, sink).await {
            Ok(handle) => {
                if let Some(record) = self.channels.get_mut(&table) {
                    record.handle = Some(handle);
                }
            }
            Err(e) => {
                warn!(table = %table, error = %e, "subscribe failed");
                if let Some(record) = self.channels.get_mut(&table) {
                    record.status = ChannelStatus::ChannelError;
                }
                self.schedule_retry(table);
            }
        }
    }

    async fn detach(&self, table: SourceTable, handle: ChannelHandle) {
        if let Err(e) = self.transport.unsubscribe(handle).await {
            warn!(table = %table, error = %e, "unsubscribe failed");
        }
    }

    async fn open_channels(&mut self) {
        self.active = true;
        for table in self.config.tables.clone() {
            self.open(table, 0).await;
        }
    }

    async fn close_channels(&mut self) {
        let records: Vec<ChannelRecord> = self.channels.drain().map(|(_, record)| record).collect();
        for mut record in records {
            record.cancel_retry();
            if let Some(handle) = record.handle.take() {
                self.detach(record.table, handle).await;
            }
        }
    }

    fn clear_debounces(&mut self) {
        for (_, debounce) in self.debounces.drain() {
            debounce.timer.abort();
        }
    }

    async fn unsubscribe_all(&mut self) {
        self.active = false;
        self.close_channels().await;
        self.clear_debounces();
        info!("realtime unsubscribed");
    }

    async fn reconnect_all(&mut self) {
        self.close_channels().await;
        self.open_channels().await;
        info!(channels = self.channels.len(), "realtime reconnected");
    }

    /// Reconnects everything if any channel is unhealthy. Returns true if
    /// it did.
    async fn check_health(&mut self) -> bool {
        if !self.active {
            return false;
        }
        let now = Instant::now();
        let mut unhealthy: Vec<SourceTable> = self
            .channels
            .values()
            .filter(|record| record.is_unhealthy(&self.config.health, now))
            .map(|record| record.table)
            .collect();
        if unhealthy.is_empty() {
            debug!(channels = self.channels.len(), "realtime channels healthy");
            return false;
        }
        unhealthy.sort();
        warn!(tables = ?unhealthy, "unhealthy channels, reconnecting all");
        self.reconnect_all().await;
        true
    }
}
