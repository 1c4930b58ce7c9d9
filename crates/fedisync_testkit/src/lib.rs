//! # fedisync Testkit
//!
//! Test utilities for fedisync.
//!
//! This crate provides:
//! - JSON fixtures for statuses, accounts, relationships and notifications
//! - Stream frame builders
//! - Property-based test generators using proptest
//! - Fuzz harnesses for frame decoding and store operations
//! - Stress helpers for concurrent store access
//!
//! ## Usage
//!
//! ```rust
//! use fedisync_testkit::prelude::*;
//! use fedisync_store::{EntityKind, Position, Store};
//!
//! let store = Store::new();
//! store.import_entities([entity(status("1"))], EntityKind::STATUSES, None, Position::End);
//! assert!(store.contains(&EntityKind::STATUSES, "1"));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod fuzz;
pub mod generators;
pub mod stress;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::fuzz::*;
    pub use crate::generators::*;
    pub use crate::stress::*;
}

pub use fixtures::*;
pub use fuzz::*;
pub use generators::*;
pub use stress::*;
