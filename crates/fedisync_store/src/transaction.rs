//! Multi-kind entity transactions.

use crate::entity::{Entity, EntityId};
use crate::types::EntityKind;
use std::collections::BTreeMap;
use std::fmt;

/// Function that produces the new version of an entity from the current one.
pub type Updater = Box<dyn FnOnce(&Entity) -> Entity + Send>;

/// A set of updaters keyed by kind and id, applied as one state change.
///
/// Transactions only update: ids that are not in the store when the
/// transaction is applied are skipped.
///
/// # Example
///
/// ```
/// use fedisync_store::{EntitiesTransaction, EntityKind};
/// use serde_json::json;
///
/// let txn = EntitiesTransaction::new()
///     .update(EntityKind::RELATIONSHIPS, "42", |rel| {
///         rel.patched(|body| {
///             body.insert("following".into(), json!(true));
///         })
///     })
///     .update(EntityKind::ACCOUNTS, "42", |account| {
///         account.patched(|body| {
///             body.insert("followers_count".into(), json!(11));
///         })
///     });
/// assert_eq!(txn.len(), 2);
/// ```
#[derive(Default)]
pub struct EntitiesTransaction {
    changes: BTreeMap<EntityKind, BTreeMap<EntityId, Updater>>,
}

impl EntitiesTransaction {
    /// Creates an empty transaction.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an updater for `(kind, id)`.
    ///
    /// A second updater for the same key replaces the first.
    #[must_use]
    pub fn update<F>(mut self, kind: EntityKind, id: impl Into<EntityId>, updater: F) -> Self
    where
        F: FnOnce(&Entity) -> Entity + Send + 'static,
    {
        self.push(kind, id, updater);
        self
    }

    /// Adds an updater in place.
    pub fn push<F>(&mut self, kind: EntityKind, id: impl Into<EntityId>, updater: F)
    where
        F: FnOnce(&Entity) -> Entity + Send + 'static,
    {
        self.changes
            .entry(kind)
            .or_default()
            .insert(id.into(), Box::new(updater));
    }

    /// Number of updaters across all kinds.
    #[must_use]
    pub fn len(&self) -> usize {
        self.changes.values().map(BTreeMap::len).sum()
    }

    /// Returns true if the transaction has no updaters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the kinds touched by this transaction.
    pub fn kinds(&self) -> impl Iterator<Item = &EntityKind> {
        self.changes.keys()
    }

    pub(crate) fn into_changes(self) -> BTreeMap<EntityKind, BTreeMap<EntityId, Updater>> {
        self.changes
    }
}

impl fmt::Debug for EntitiesTransaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (kind, updaters) in &self.changes {
            map.entry(kind, &updaters.keys().collect::<Vec<_>>());
        }
        map.finish()
    }
}
