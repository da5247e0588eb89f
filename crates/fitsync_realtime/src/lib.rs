//! # fitsync realtime
//!
//! Live propagation of remote changes into single-item resyncs.
//!
//! This crate provides:
//! - [`RealtimeManager`], one logical subscription per source table
//! - Per-document debounce of change notifications
//! - Per-channel retry with exponential backoff
//! - A periodic health check with full-reconnect fallback
//! - The [`ChangeTransport`] and [`ResyncTarget`] seams with in-memory mocks
//!
//! ## Architecture
//!
//! The manager is an actor. One task owns every channel record, retry
//! timer and debounce timer. Transports, timers and API calls all post
//! commands into its mailbox, so channel state is never shared.
//!
//! ```text
//!  transport ──status/event──┐
//!  timers ────retry/debounce─┼──► mailbox ──► actor ──► ResyncTarget::resync
//!  RealtimeManager API ──────┘
//! ```
//!
//! ## Key Invariants
//!
//! - A burst of notifications for one document causes one resync
//! - A channel retries at most `max_retries` times between successes
//! - Retry delays never shrink while a channel keeps failing
//! - Status reports from a replaced subscription are ignored
//! - In-flight resyncs are never cancelled

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod channel;
mod config;
mod error;
mod event;
mod manager;
mod resolve;
mod target;
mod transport;

pub use channel::ChannelState;
pub use config::{HealthPolicy, RealtimeConfig, RetryPolicy};
pub use error::{RealtimeError, RealtimeResult};
pub use event::{ChangeEvent, ChangeKind, ChannelStatus};
pub use manager::{CredentialRefresh, RealtimeManager};
pub use resolve::resolve_key;
pub use target::{RecordingTarget, ResyncTarget};
pub use transport::{
    ChangeTransport, ChannelHandle, ChannelSink, MockChangeTransport, SubscriptionRecord,
};
