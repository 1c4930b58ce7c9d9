//! The normalized entity store.

use crate::change_feed::{ChangeFeed, StoreChange, StoreEvent};
use crate::entity::{Entity, EntityId};
use crate::list::{EntityList, ListState, PageInfo, PageMode};
use crate::transaction::EntitiesTransaction;
use crate::types::{EntityKind, ListKey, Position};
use parking_lot::{RwLock, RwLockWriteGuard};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::mpsc::Receiver;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Entities and lists of one kind.
#[derive(Debug, Default)]
struct EntityCache {
    store: HashMap<EntityId, Entity>,
    lists: HashMap<ListKey, EntityList>,
}

impl EntityCache {
    fn purge(&mut self, ids: &HashSet<&EntityId>) {
        for list in self.lists.values_mut() {
            list.remove(ids);
        }
    }
}

#[derive(Debug, Default)]
struct StoreState {
    caches: HashMap<EntityKind, EntityCache>,
    sequence: u64,
}

impl StoreState {
    fn cache_mut(&mut self, kind: &EntityKind) -> &mut EntityCache {
        self.caches.entry(kind.clone()).or_default()
    }

    fn next_sequence(&mut self) -> u64 {
        self.sequence += 1;
        self.sequence
    }
}

struct StoreInner {
    state: RwLock<StoreState>,
    feed: ChangeFeed,
}

/// Per-kind counts reported by [`Store::stats`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KindStats {
    /// Number of entity records.
    pub entities: usize,
    /// Number of lists.
    pub lists: usize,
}

/// Snapshot of store size.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreStats {
    /// Counts per kind.
    pub kinds: BTreeMap<EntityKind, KindStats>,
    /// Sequence number of the last committed change.
    pub sequence: u64,
}

impl StoreStats {
    /// Total number of entity records across all kinds.
    pub fn total_entities(&self) -> usize {
        self.kinds.values().map(|k| k.entities).sum()
    }
}

/// The canonical client-side copy of all entities and lists.
///
/// `Store` is a cheap handle: clones share the same state. There is no
/// global instance; callers create one and pass it to every hook and to the
/// reconciler.
///
/// Each mutation acquires the write lock once, applies the whole change,
/// then publishes one [`StoreEvent`]. Readers therefore see either all of a
/// mutation or none of it. The only mutation entry points are the methods
/// of this type.
#[derive(Clone)]
pub struct Store {
    inner: Arc<StoreInner>,
}

impl Store {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::with_feed(ChangeFeed::new())
    }

    /// Creates an empty store with a custom change feed.
    pub fn with_feed(feed: ChangeFeed) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                state: RwLock::new(StoreState::default()),
                feed,
            }),
        }
    }

    /// Subscribes to committed changes.
    pub fn subscribe(&self) -> Receiver<StoreEvent> {
        self.inner.feed.subscribe()
    }

    /// Returns the change feed.
    pub fn feed(&self) -> &ChangeFeed {
        &self.inner.feed
    }

    /// Upserts `entities` into `kind`, replacing existing records by id.
    ///
    /// With a `list_key`, ids not yet in that list are spliced in at
    /// `position`, keeping their relative order.
    pub fn import_entities(
        &self,
        entities: impl IntoIterator<Item = Entity>,
        kind: EntityKind,
        list_key: Option<&ListKey>,
        position: Position,
    ) {
        let entities: Vec<Entity> = entities.into_iter().collect();
        if entities.is_empty() && list_key.is_none() {
            return;
        }
        let ids: Vec<EntityId> = entities.iter().map(|e| e.id().clone()).collect();

        let mut state = self.inner.state.write();
        let cache = state.cache_mut(&kind);
        for entity in entities {
            cache.store.insert(entity.id().clone(), entity);
        }
        if let Some(key) = list_key {
            let added = cache
                .lists
                .entry(key.clone())
                .or_default()
                .splice(&ids, position);
            trace!(%kind, list = %key, added, "spliced ids into list");
        }

        debug!(%kind, count = ids.len(), "imported entities");
        let change = StoreChange::Imported {
            kind,
            ids,
            list_key: list_key.cloned(),
        };
        self.publish(state, change);
    }

    /// Applies every updater of `txn` as one indivisible change.
    ///
    /// Updaters for ids not present in the store are skipped. All new
    /// records are computed before any is written, so a panicking updater
    /// leaves the store untouched. Returns the number of entities updated.
    ///
    /// Updaters run under the write lock, which is not reentrant: an updater
    /// must not call back into this store. Use
    /// [`transaction_with`](Self::transaction_with) when the changes depend
    /// on other entities.
    pub fn entities_transaction(&self, txn: EntitiesTransaction) -> usize {
        if txn.is_empty() {
            return 0;
        }
        let state = self.inner.state.write();
        self.commit_transaction(state, txn)
    }

    /// Builds a transaction from the current state and applies it as one
    /// change.
    ///
    /// `build` sees the same state the updaters are applied to; no other
    /// mutation can commit in between. Like updaters, `build` must not call
    /// back into this store.
    pub fn transaction_with(
        &self,
        build: impl FnOnce(&StoreView<'_>) -> EntitiesTransaction,
    ) -> usize {
        let state = self.inner.state.write();
        let txn = build(&StoreView { state: &*state });
        if txn.is_empty() {
            return 0;
        }
        self.commit_transaction(state, txn)
    }

    fn commit_transaction(
        &self,
        mut state: RwLockWriteGuard<'_, StoreState>,
        txn: EntitiesTransaction,
    ) -> usize {
        let mut staged: Vec<(EntityKind, Entity)> = Vec::with_capacity(txn.len());

        for (kind, updaters) in txn.into_changes() {
            let Some(cache) = state.caches.get(&kind) else {
                trace!(%kind, skipped = updaters.len(), "transaction kind not cached");
                continue;
            };
            for (id, updater) in updaters {
                let Some(current) = cache.store.get(&id) else {
                    trace!(%kind, %id, "transaction skipped absent entity");
                    continue;
                };
                let updated = updater(current);
                if updated.id() != &id {
                    warn!(%kind, %id, new_id = %updated.id(), "updater changed entity id, skipped");
                    continue;
                }
                staged.push((kind.clone(), updated));
            }
        }

        if staged.is_empty() {
            return 0;
        }

        let mut entities = Vec::with_capacity(staged.len());
        for (kind, entity) in staged {
            entities.push((kind.clone(), entity.id().clone()));
            state.cache_mut(&kind).store.insert(entity.id().clone(), entity);
        }

        let applied = entities.len();
        debug!(applied, "applied entities transaction");
        self.publish(state, StoreChange::Transacted { entities });
        applied
    }

    /// Runs `f` against a consistent view of the whole store.
    ///
    /// No mutation can commit while `f` runs, so several reads made through
    /// the view observe the same committed state.
    pub fn read<R>(&self, f: impl FnOnce(&StoreView<'_>) -> R) -> R {
        let state = self.inner.state.read();
        f(&StoreView { state: &*state })
    }

    /// Returns the entity, if cached.
    pub fn select_entity(&self, kind: &EntityKind, id: &str) -> Option<Entity> {
        self.inner
            .state
            .read()
            .caches
            .get(kind)
            .and_then(|cache| cache.store.get(id))
            .cloned()
    }

    /// Returns the cached entities among `ids`, in the order given.
    pub fn select_entities<'a>(
        &self,
        kind: &EntityKind,
        ids: impl IntoIterator<Item = &'a EntityId>,
    ) -> Vec<Entity> {
        let state = self.inner.state.read();
        let Some(cache) = state.caches.get(kind) else {
            return Vec::new();
        };
        ids.into_iter()
            .filter_map(|id| cache.store.get(id).cloned())
            .collect()
    }

    /// Returns true if `(kind, id)` is cached.
    pub fn contains(&self, kind: &EntityKind, id: &str) -> bool {
        self.inner
            .state
            .read()
            .caches
            .get(kind)
            .is_some_and(|cache| cache.store.contains_key(id))
    }

    /// Returns a matching entity of `kind` by linear scan.
    ///
    /// When several entities match, which one is returned is unspecified.
    pub fn find_entity(
        &self,
        kind: &EntityKind,
        predicate: impl Fn(&Entity) -> bool,
    ) -> Option<Entity> {
        self.inner
            .state
            .read()
            .caches
            .get(kind)
            .and_then(|cache| cache.store.values().find(|e| predicate(*e)))
            .cloned()
    }

    /// Removes the entity and purges its id from every list of `kind`.
    ///
    /// Returns the removed record.
    pub fn delete_entity(&self, kind: &EntityKind, id: &str) -> Option<Entity> {
        self.delete_entities(kind, [EntityId::from(id)])
            .into_iter()
            .next()
    }

    /// Removes several entities of one kind in a single change.
    pub fn delete_entities(
        &self,
        kind: &EntityKind,
        ids: impl IntoIterator<Item = EntityId>,
    ) -> Vec<Entity> {
        let ids: Vec<EntityId> = ids.into_iter().collect();
        let mut state = self.inner.state.write();
        let Some(cache) = state.caches.get_mut(kind) else {
            return Vec::new();
        };

        let removed: Vec<Entity> = ids.iter().filter_map(|id| cache.store.remove(id)).collect();
        let purge: HashSet<&EntityId> = ids.iter().collect();
        cache.purge(&purge);

        if removed.is_empty() {
            return removed;
        }

        debug!(%kind, count = removed.len(), "deleted entities");
        let change = StoreChange::Deleted {
            kind: kind.clone(),
            ids,
        };
        self.publish(state, change);
        removed
    }

    /// Removes ids from one list without deleting the records.
    pub fn dismiss_entities(
        &self,
        kind: &EntityKind,
        ids: impl IntoIterator<Item = EntityId>,
        list_key: &ListKey,
    ) -> usize {
        let ids: Vec<EntityId> = ids.into_iter().collect();
        let mut state = self.inner.state.write();
        let removed = match state
            .caches
            .get_mut(kind)
            .and_then(|cache| cache.lists.get_mut(list_key))
        {
            Some(list) => {
                let dismissed: HashSet<&EntityId> = ids.iter().collect();
                list.remove(&dismissed)
            }
            None => return 0,
        };

        self.publish(
            state,
            StoreChange::ListUpdated {
                kind: kind.clone(),
                list_key: list_key.clone(),
            },
        );
        removed
    }

    /// Places the gap sentinel at `position` of the list.
    pub fn insert_gap(&self, kind: &EntityKind, list_key: &ListKey, position: Position) {
        let mut state = self.inner.state.write();
        state
            .cache_mut(kind)
            .lists
            .entry(list_key.clone())
            .or_default()
            .insert_gap(position);
        self.publish(
            state,
            StoreChange::ListUpdated {
                kind: kind.clone(),
                list_key: list_key.clone(),
            },
        );
    }

    /// Mutates the state of a list, creating the list if needed.
    pub fn set_list_state(
        &self,
        kind: &EntityKind,
        list_key: &ListKey,
        update: impl FnOnce(&mut ListState),
    ) {
        let mut state = self.inner.state.write();
        let list = state
            .cache_mut(kind)
            .lists
            .entry(list_key.clone())
            .or_default();
        update(list.state_mut());
        self.publish(
            state,
            StoreChange::ListUpdated {
                kind: kind.clone(),
                list_key: list_key.clone(),
            },
        );
    }

    /// Marks a list stale so the next list fetch replaces it.
    pub fn invalidate_list(&self, kind: &EntityKind, list_key: &ListKey) {
        self.set_list_state(kind, list_key, |state| state.invalid = true);
    }

    /// Imports a fetched page and its pagination state as one change.
    pub fn import_list_page(
        &self,
        kind: EntityKind,
        list_key: &ListKey,
        entities: Vec<Entity>,
        page: &PageInfo,
        mode: PageMode,
    ) {
        let ids: Vec<EntityId> = entities.iter().map(|e| e.id().clone()).collect();

        let mut state = self.inner.state.write();
        let cache = state.cache_mut(&kind);
        for entity in entities {
            cache.store.insert(entity.id().clone(), entity);
        }
        cache
            .lists
            .entry(list_key.clone())
            .or_default()
            .apply_page(&ids, page, mode);

        debug!(%kind, list = %list_key, count = ids.len(), ?mode, "imported list page");
        let change = StoreChange::Imported {
            kind,
            ids,
            list_key: Some(list_key.clone()),
        };
        self.publish(state, change);
    }

    /// Returns a copy of the list.
    pub fn select_list(&self, kind: &EntityKind, list_key: &ListKey) -> Option<EntityList> {
        self.inner
            .state
            .read()
            .caches
            .get(kind)
            .and_then(|cache| cache.lists.get(list_key))
            .cloned()
    }

    /// Returns the entities of a list in order, skipping gaps.
    pub fn select_list_entities(&self, kind: &EntityKind, list_key: &ListKey) -> Vec<Entity> {
        let state = self.inner.state.read();
        let Some(cache) = state.caches.get(kind) else {
            return Vec::new();
        };
        cache
            .lists
            .get(list_key)
            .map(|list| {
                list.ids()
                    .filter_map(|id| cache.store.get(id).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Number of entities cached for `kind`.
    pub fn entity_count(&self, kind: &EntityKind) -> usize {
        self.inner
            .state
            .read()
            .caches
            .get(kind)
            .map_or(0, |cache| cache.store.len())
    }

    /// Returns the sequence number of the last committed change.
    pub fn sequence(&self) -> u64 {
        self.inner.state.read().sequence
    }

    /// Returns a size snapshot.
    pub fn stats(&self) -> StoreStats {
        let state = self.inner.state.read();
        StoreStats {
            kinds: state
                .caches
                .iter()
                .map(|(kind, cache)| {
                    (
                        kind.clone(),
                        KindStats {
                            entities: cache.store.len(),
                            lists: cache.lists.len(),
                        },
                    )
                })
                .collect(),
            sequence: state.sequence,
        }
    }

    /// Assigns a sequence number and emits the change.
    ///
    /// The guard is downgraded rather than dropped so no other writer can
    /// commit between this change and its event.
    fn publish(&self, mut state: RwLockWriteGuard<'_, StoreState>, change: StoreChange) {
        let sequence = state.next_sequence();
        let _read = RwLockWriteGuard::downgrade(state);
        self.inner.feed.emit(StoreEvent { sequence, change });
    }
}

/// A read-only view of the store held under its read lock.
pub struct StoreView<'a> {
    state: &'a StoreState,
}

impl StoreView<'_> {
    /// Returns the entity, if cached.
    pub fn select_entity(&self, kind: &EntityKind, id: &str) -> Option<&Entity> {
        self.state
            .caches
            .get(kind)
            .and_then(|cache| cache.store.get(id))
    }

    /// Returns the list, if present.
    pub fn select_list(&self, kind: &EntityKind, list_key: &ListKey) -> Option<&EntityList> {
        self.state
            .caches
            .get(kind)
            .and_then(|cache| cache.lists.get(list_key))
    }

    /// Returns the sequence number of the state being viewed.
    pub fn sequence(&self) -> u64 {
        self.state.sequence
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store").field("stats", &self.stats()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn status(id: &str, content: &str) -> Entity {
        Entity::from_value(json!({"id": id, "content": content})).unwrap()
    }

    fn list_ids(store: &Store, kind: &EntityKind, key: &ListKey) -> Vec<String> {
        store
            .select_list(kind, key)
            .map(|list| list.ids().map(|id| id.to_string()).collect())
            .unwrap_or_default()
    }

    #[test]
    fn last_import_wins() {
        let store = Store::new();
        let kind = EntityKind::from("status");
        store.import_entities([status("1", "A")], kind.clone(), None, Position::End);
        store.import_entities([status("1", "B")], kind.clone(), None, Position::End);

        assert_eq!(store.entity_count(&kind), 1);
        assert_eq!(store.select_entity(&kind, "1"), Some(status("1", "B")));
    }

    #[test]
    fn import_into_list_positions() {
        let store = Store::new();
        let key = ListKey::from("home");
        let kind = EntityKind::STATUSES;

        store.import_entities(
            [status("3", ""), status("4", "")],
            kind.clone(),
            Some(&key),
            Position::End,
        );
        store.import_entities(
            [status("1", ""), status("2", ""), status("3", "edited")],
            kind.clone(),
            Some(&key),
            Position::Start,
        );
        store.import_entities([status("5", "")], kind.clone(), Some(&key), Position::End);

        assert_eq!(list_ids(&store, &kind, &key), vec!["1", "2", "3", "4", "5"]);
        // Existing id was not moved but its record was replaced.
        assert_eq!(
            store.select_entity(&kind, "3").unwrap().get_str("content"),
            Some("edited")
        );
    }

    #[test]
    fn delete_purges_every_list() {
        let store = Store::new();
        let kind = EntityKind::STATUSES;
        let home = ListKey::from("home");
        let local = ListKey::from("local");
        store.import_entities([status("1", ""), status("2", "")], kind.clone(), Some(&home), Position::End);
        store.import_entities([status("2", "")], kind.clone(), Some(&local), Position::End);

        let removed = store.delete_entity(&kind, "2");
        assert_eq!(removed.map(|e| e.id().to_string()), Some("2".into()));
        assert!(!store.contains(&kind, "2"));
        assert_eq!(list_ids(&store, &kind, &home), vec!["1"]);
        assert!(list_ids(&store, &kind, &local).is_empty());

        assert_eq!(store.delete_entity(&kind, "missing"), None);
        assert_eq!(store.delete_entity(&EntityKind::ACCOUNTS, "1"), None);
    }

    #[test]
    fn transaction_updates_across_kinds_and_skips_absent() {
        let store = Store::new();
        store.import_entities(
            [Entity::from_value(json!({"id": "a", "following": false})).unwrap()],
            EntityKind::RELATIONSHIPS,
            None,
            Position::End,
        );
        store.import_entities(
            [Entity::from_value(json!({"id": "a", "followers_count": 1})).unwrap()],
            EntityKind::ACCOUNTS,
            None,
            Position::End,
        );

        let txn = EntitiesTransaction::new()
            .update(EntityKind::RELATIONSHIPS, "a", |rel| {
                rel.patched(|body| {
                    body.insert("following".into(), json!(true));
                })
            })
            .update(EntityKind::ACCOUNTS, "a", |acct| {
                acct.patched(|body| {
                    body.insert("followers_count".into(), json!(2));
                })
            })
            .update(EntityKind::ACCOUNTS, "ghost", |acct| acct.clone());

        assert_eq!(store.entities_transaction(txn), 2);
        assert_eq!(
            store
                .select_entity(&EntityKind::RELATIONSHIPS, "a")
                .unwrap()
                .get_bool("following"),
            Some(true)
        );
        assert_eq!(
            store
                .select_entity(&EntityKind::ACCOUNTS, "a")
                .unwrap()
                .get_u64("followers_count"),
            Some(2)
        );
        assert!(!store.contains(&EntityKind::ACCOUNTS, "ghost"));
    }

    #[test]
    fn transaction_rejects_id_change() {
        let store = Store::new();
        store.import_entities([status("1", "x")], EntityKind::STATUSES, None, Position::End);

        let txn = EntitiesTransaction::new()
            .update(EntityKind::STATUSES, "1", |_| status("2", "hijack"));
        assert_eq!(store.entities_transaction(txn), 0);
        assert_eq!(store.select_entity(&EntityKind::STATUSES, "1"), Some(status("1", "x")));
        assert!(!store.contains(&EntityKind::STATUSES, "2"));
    }

    #[test]
    fn transaction_built_from_current_state() {
        let store = Store::new();
        store.import_entities(
            [Entity::from_value(json!({"id": "a", "following": true})).unwrap()],
            EntityKind::RELATIONSHIPS,
            None,
            Position::End,
        );
        store.import_entities(
            [Entity::from_value(json!({"id": "a", "followers_count": 1})).unwrap()],
            EntityKind::ACCOUNTS,
            None,
            Position::End,
        );

        let applied = store.transaction_with(|view| {
            let following = view
                .select_entity(&EntityKind::RELATIONSHIPS, "a")
                .and_then(|rel| rel.get_bool("following"))
                .unwrap_or(false);
            let count = view
                .select_entity(&EntityKind::ACCOUNTS, "a")
                .and_then(|acct| acct.get_u64("followers_count"))
                .unwrap_or(0);
            if !following {
                return EntitiesTransaction::new();
            }
            EntitiesTransaction::new().update(EntityKind::ACCOUNTS, "a", move |acct| {
                acct.patched(|body| {
                    body.insert("followers_count".into(), json!(count + 1));
                })
            })
        });

        assert_eq!(applied, 1);
        assert_eq!(
            store
                .select_entity(&EntityKind::ACCOUNTS, "a")
                .unwrap()
                .get_u64("followers_count"),
            Some(2)
        );
        assert_eq!(store.transaction_with(|_| EntitiesTransaction::new()), 0);
        assert_eq!(store.sequence(), 3);
    }

    #[test]
    fn find_entity_by_predicate() {
        let store = Store::new();
        store.import_entities(
            [
                Entity::from_value(json!({"id": "1", "acct": "alice"})).unwrap(),
                Entity::from_value(json!({"id": "2", "acct": "bob"})).unwrap(),
            ],
            EntityKind::ACCOUNTS,
            None,
            Position::End,
        );

        let bob = store.find_entity(&EntityKind::ACCOUNTS, |e| e.get_str("acct") == Some("bob"));
        assert_eq!(bob.unwrap().id().as_str(), "2");
        assert!(store
            .find_entity(&EntityKind::ACCOUNTS, |e| e.get_str("acct") == Some("carol"))
            .is_none());
    }

    #[test]
    fn dismiss_keeps_records() {
        let store = Store::new();
        let key = ListKey::from("notifications");
        let kind = EntityKind::NOTIFICATIONS;
        store.import_entities([status("1", ""), status("2", "")], kind.clone(), Some(&key), Position::End);

        assert_eq!(store.dismiss_entities(&kind, [EntityId::from("1")], &key), 1);
        assert_eq!(list_ids(&store, &kind, &key), vec!["2"]);
        assert!(store.contains(&kind, "1"));
    }

    #[test]
    fn list_state_and_invalidation() {
        let store = Store::new();
        let key = ListKey::from("home");
        let kind = EntityKind::STATUSES;

        store.import_list_page(
            kind.clone(),
            &key,
            vec![status("2", ""), status("1", "")],
            &PageInfo {
                next: Some("max_id=1".into()),
                ..PageInfo::default()
            },
            PageMode::Replace,
        );
        let list = store.select_list(&kind, &key).unwrap();
        assert!(list.state().fetched);
        assert!(list.state().has_more());

        store.invalidate_list(&kind, &key);
        assert!(store.select_list(&kind, &key).unwrap().state().invalid);

        store.set_list_state(&kind, &key, |state| state.is_loading = true);
        assert!(store.select_list(&kind, &key).unwrap().state().is_loading);

        let entities = store.select_list_entities(&kind, &key);
        assert_eq!(entities.len(), 2);
    }

    #[test]
    fn gap_sentinel_is_skipped_when_resolving() {
        let store = Store::new();
        let key = ListKey::from("home");
        let kind = EntityKind::STATUSES;
        store.import_entities([status("9", "")], kind.clone(), Some(&key), Position::End);
        store.insert_gap(&kind, &key, Position::End);
        store.import_entities([status("3", "")], kind.clone(), Some(&key), Position::End);

        let list = store.select_list(&kind, &key).unwrap();
        assert_eq!(list.len(), 3);
        assert_eq!(list.slots()[1], None);
        assert_eq!(store.select_list_entities(&kind, &key).len(), 2);
    }

    #[test]
    fn every_mutation_emits_one_event_in_order() {
        let store = Store::new();
        let rx = store.subscribe();
        let kind = EntityKind::STATUSES;

        store.import_entities([status("1", "")], kind.clone(), None, Position::End);
        store.entities_transaction(
            EntitiesTransaction::new().update(kind.clone(), "1", |e| e.clone()),
        );
        store.delete_entity(&kind, "1");

        let events: Vec<StoreEvent> = rx.try_iter().collect();
        assert_eq!(events.len(), 3);
        assert!(events.windows(2).all(|w| w[0].sequence < w[1].sequence));
        assert!(matches!(events[0].change, StoreChange::Imported { .. }));
        assert!(matches!(events[1].change, StoreChange::Transacted { .. }));
        assert!(matches!(events[2].change, StoreChange::Deleted { .. }));
        assert_eq!(store.sequence(), 3);
    }

    #[test]
    fn stats_snapshot() {
        let store = Store::new();
        store.import_entities(
            [status("1", ""), status("2", "")],
            EntityKind::STATUSES,
            Some(&ListKey::from("home")),
            Position::End,
        );
        let stats = store.stats();
        assert_eq!(stats.total_entities(), 2);
        assert_eq!(
            stats.kinds[&EntityKind::STATUSES],
            KindStats {
                entities: 2,
                lists: 1
            }
        );
    }
}
