//! # fitsync Testkit
//!
//! Test utilities for fitsync.
//!
//! This crate provides:
//! - In-memory fakes for the engine's collaborators (data source, document
//!   store, renderer, clock)
//! - Row fixtures with explicit change times
//! - Property-based test generators using proptest
//! - An engine harness wiring everything together
//!
//! The realtime mocks live next to their traits in `fitsync_realtime` and
//! are re-exported here.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use fitsync_testkit::prelude::*;
//!
//! #[tokio::test]
//! async fn writes_recipe() {
//!     let harness = EngineHarness::new().await;
//!     harness.source().add_recipe(recipe("r1", "Soup", 10));
//!     let result = harness.engine.full_sync(None).await;
//!     assert!(result.success);
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod clock;
pub mod fixtures;
pub mod generators;
pub mod integration;
pub mod render;
pub mod source;
pub mod store;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::clock::*;
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::integration::*;
    pub use crate::render::*;
    pub use crate::source::*;
    pub use crate::store::*;
    pub use fitsync_realtime::{MockChangeTransport, RecordingTarget};
}

pub use clock::*;
pub use fixtures::*;
pub use generators::*;
pub use integration::*;
pub use render::*;
pub use source::*;
pub use store::*;
pub use fitsync_realtime::{MockChangeTransport, RecordingTarget};
