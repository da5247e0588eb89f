//! # fitsync sync engine
//!
//! Keeps a local document store consistent with a remote data source.
//!
//! This crate provides:
//! - Full passes over every enabled table
//! - Incremental passes bounded by per-table watermarks
//! - Single-item resyncs used by the realtime channel manager
//! - A persistent sync state store (watermarks, key→path mapping, error log)
//!
//! ## Architecture
//!
//! The engine owns no I/O of its own. It drives three injected
//! collaborators:
//! 1. [`RemoteDataSource`] reads rows, optionally filtered by a watermark
//! 2. [`Renderer`] turns a [`Document`](fitsync_model::Document) into text
//! 3. [`DocumentStore`] resolves a path and writes the text there
//!
//! ## Key Invariants
//!
//! - A pass never returns an error; every failure becomes an error-log entry
//! - Failure of one row or one table never aborts the rest of the pass
//! - Watermarks only move forward and only passes move them
//! - At most one full or incremental pass runs at a time
//! - State-store mutation is serialized; fetching and rendering are not

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod clock;
mod config;
mod engine;
mod error;
mod error_log;
mod locks;
mod pass;
mod render;
mod source;
mod state;
mod store;

pub use clock::{Clock, SystemClock};
pub use config::{SuccessPolicy, SyncConfig, SyncToggles};
pub use engine::SyncEngine;
pub use error::{SyncError, SyncResult};
pub use error_log::{ErrorLog, SyncErrorEntry, DAILY_SCOPE, ENGINE_SCOPE, ERROR_LOG_CAPACITY};
pub use pass::{ProgressFn, SyncMode, SyncPassResult, SyncProgress, SyncStage, SyncStats};
pub use render::{RenderContext, Renderer};
pub use source::RemoteDataSource;
pub use state::{
    JsonFileStorage, MemoryStateStorage, StateStorage, SyncStateData, SyncStateSnapshot,
    SyncStateStore,
};
pub use store::{DocumentStore, WriteOutcome};
