//! Change feed for observing committed store mutations.
//!
//! Every public mutation of the [`Store`](crate::Store) emits exactly one
//! [`StoreEvent`] once the whole change is visible to readers. Consumers use
//! the feed to re-read the entities they display; events carry ids, not
//! payloads.
//!
//! # Usage
//!
//! ```rust
//! use fedisync_store::{Entity, EntityKind, Store, StoreChange};
//! use serde_json::json;
//!
//! let store = Store::new();
//! let changes = store.subscribe();
//!
//! let status = Entity::from_value(json!({"id": "1"})).unwrap();
//! store.import_entities(vec![status], EntityKind::STATUSES, None, Default::default());
//!
//! let event = changes.recv().unwrap();
//! assert!(matches!(event.change, StoreChange::Imported { .. }));
//! ```

use crate::entity::EntityId;
use crate::types::{EntityKind, ListKey};
use parking_lot::RwLock;
use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};
use tracing::warn;

/// What a committed mutation changed.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreChange {
    /// Entities were inserted or replaced, optionally spliced into a list.
    Imported {
        /// Kind of the imported entities.
        kind: EntityKind,
        /// Imported ids, in import order.
        ids: Vec<EntityId>,
        /// List the ids were spliced into.
        list_key: Option<ListKey>,
    },
    /// A transaction replaced entities across one or more kinds.
    Transacted {
        /// Every `(kind, id)` whose updater was applied.
        entities: Vec<(EntityKind, EntityId)>,
    },
    /// Entities were removed from the store and from every list.
    Deleted {
        /// Kind of the deleted entities.
        kind: EntityKind,
        /// Deleted ids.
        ids: Vec<EntityId>,
    },
    /// A list changed without any entity record changing.
    ListUpdated {
        /// Kind owning the list.
        kind: EntityKind,
        /// The list.
        list_key: ListKey,
    },
}

/// A single committed mutation.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreEvent {
    /// Commit sequence number, strictly increasing per store.
    pub sequence: u64,
    /// The change.
    pub change: StoreChange,
}

/// Distributes committed store events to subscribers.
///
/// The change feed:
/// - Emits only committed changes
/// - Preserves commit order
/// - Supports multiple subscribers
/// - Keeps a bounded history for catch-up polling
///
/// Each subscriber buffers at most `subscriber_capacity` events. A
/// subscriber whose buffer is full is dropped; its receiver still yields the
/// buffered events and then reports disconnection, after which the consumer
/// can resubscribe and catch up through [`poll`](Self::poll).
pub struct ChangeFeed {
    subscribers: RwLock<Vec<SyncSender<StoreEvent>>>,
    history: RwLock<Vec<StoreEvent>>,
    max_history: usize,
    subscriber_capacity: usize,
}

impl ChangeFeed {
    /// Creates a new change feed.
    pub fn new() -> Self {
        Self::with_max_history(1024)
    }

    /// Creates a change feed with a specific history limit.
    pub fn with_max_history(max_history: usize) -> Self {
        Self {
            subscribers: RwLock::new(Vec::new()),
            history: RwLock::new(Vec::new()),
            max_history,
            subscriber_capacity: 4096,
        }
    }

    /// Sets how many undelivered events a subscriber may buffer.
    pub fn with_subscriber_capacity(mut self, capacity: usize) -> Self {
        self.subscriber_capacity = capacity.max(1);
        self
    }

    /// Subscribes to the change feed.
    ///
    /// The receiver sees every event emitted after this call.
    pub fn subscribe(&self) -> Receiver<StoreEvent> {
        let (tx, rx) = mpsc::sync_channel(self.subscriber_capacity);
        self.subscribers.write().push(tx);
        rx
    }

    /// Emits an event to all subscribers, dropping disconnected and lagging
    /// ones.
    pub fn emit(&self, event: StoreEvent) {
        {
            let mut history = self.history.write();
            history.push(event.clone());
            if history.len() > self.max_history {
                let to_remove = history.len() - self.max_history;
                history.drain(0..to_remove);
            }
        }

        let mut subscribers = self.subscribers.write();
        subscribers.retain(|tx| match tx.try_send(event.clone()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!(sequence = event.sequence, "dropping lagging change feed subscriber");
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        });
    }

    /// Returns events with sequence > `cursor`, up to `limit`.
    pub fn poll(&self, cursor: u64, limit: usize) -> Vec<StoreEvent> {
        self.history
            .read()
            .iter()
            .filter(|e| e.sequence > cursor)
            .take(limit)
            .cloned()
            .collect()
    }

    /// Returns the latest sequence number in history.
    pub fn latest_sequence(&self) -> u64 {
        self.history.read().last().map(|e| e.sequence).unwrap_or(0)
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new()
    }
}
