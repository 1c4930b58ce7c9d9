//! # fedisync Store
//!
//! The normalized client-side cache.
//!
//! This crate provides:
//! - A table of entities keyed by (kind, id)
//! - Named, ordered entity lists with pagination state
//! - Atomic multi-kind transactions
//! - A change feed for observing committed mutations
//!
//! ## Key Invariants
//!
//! - Entity ids are unique within a kind
//! - Lists only reference ids present in the store (or the gap sentinel)
//! - A transaction is applied as one indivisible state change
//! - Re-importing an id replaces the whole record (last write wins)
//!
//! The store has no network awareness; fetching and streaming live in
//! `fedisync_client` and `fedisync_stream`.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod change_feed;
mod entity;
mod error;
mod list;
mod store;
mod transaction;
mod types;

pub use change_feed::{ChangeFeed, StoreChange, StoreEvent};
pub use entity::{json_type, Entity, EntityId};
pub use error::{StoreError, StoreResult};
pub use list::{EntityList, ListState, PageInfo, PageMode};
pub use store::{KindStats, Store, StoreStats, StoreView};
pub use transaction::{EntitiesTransaction, Updater};
pub use types::{EntityKind, ListKey, Position};
