//! Property-based test generators using proptest.
//!
//! Provides strategies for entities, store operations and push frames.

use crate::fixtures::{bare_frame, frame, raw_frame, status};
use fedisync_protocol::StreamEvent;
use fedisync_store::{EntitiesTransaction, Entity, EntityId, EntityKind, ListKey, Position, Store};
use proptest::prelude::*;
use serde_json::json;

/// Strategy for entity ids. Small alphabet so operations collide.
pub fn entity_id_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[0-9]{1,2}").expect("Invalid regex")
}

/// Strategy for the kinds the reconciler writes to.
pub fn kind_strategy() -> impl Strategy<Value = EntityKind> {
    prop_oneof![
        Just(EntityKind::STATUSES),
        Just(EntityKind::ACCOUNTS),
        Just(EntityKind::NOTIFICATIONS),
    ]
}

/// Strategy for list keys.
pub fn list_key_strategy() -> impl Strategy<Value = ListKey> {
    prop_oneof![Just(ListKey::from("home")), Just(ListKey::from("local"))]
}

/// Strategy for entities carrying a `rev` counter.
pub fn entity_strategy() -> impl Strategy<Value = Entity> {
    (entity_id_strategy(), any::<u32>()).prop_map(|(id, rev)| {
        Entity::from_value(json!({"id": id, "rev": rev})).expect("generated entity has an id")
    })
}

/// An operation against a [`Store`].
#[derive(Debug, Clone)]
pub enum StoreOperation {
    /// Import entities, optionally into a list.
    Import {
        /// Kind imported into
        kind: EntityKind,
        /// Entities imported
        entities: Vec<Entity>,
        /// List the ids are spliced into
        list: Option<ListKey>,
        /// Splice at the start rather than the end
        at_start: bool,
    },
    /// Delete an entity
    Delete {
        /// Kind deleted from
        kind: EntityKind,
        /// Entity id
        id: String,
    },
    /// Dismiss an id from a list
    Dismiss {
        /// Kind of the list
        kind: EntityKind,
        /// Entity id
        id: String,
        /// List the id is removed from
        list: ListKey,
    },
    /// Bump the `rev` of an entity through a transaction
    Bump {
        /// Kind updated
        kind: EntityKind,
        /// Entity id
        id: String,
    },
}

impl StoreOperation {
    /// Applies the operation to `store`.
    pub fn apply(&self, store: &Store) {
        match self {
            StoreOperation::Import {
                kind,
                entities,
                list,
                at_start,
            } => {
                let position = if *at_start { Position::Start } else { Position::End };
                store.import_entities(entities.clone(), kind.clone(), list.as_ref(), position);
            }
            StoreOperation::Delete { kind, id } => {
                store.delete_entity(kind, id);
            }
            StoreOperation::Dismiss { kind, id, list } => {
                store.dismiss_entities(kind, [EntityId::from(id.as_str())], list);
            }
            StoreOperation::Bump { kind, id } => {
                let txn = EntitiesTransaction::new().update(kind.clone(), id.as_str(), |e| {
                    let rev = e.get_u64("rev").unwrap_or(0);
                    e.patched(|body| {
                        body.insert("rev".into(), json!(rev + 1));
                    })
                });
                store.entities_transaction(txn);
            }
        }
    }
}

/// Strategy for store operations.
pub fn store_operation_strategy() -> impl Strategy<Value = StoreOperation> {
    prop_oneof![
        4 => (
            kind_strategy(),
            prop::collection::vec(entity_strategy(), 0..5),
            prop::option::of(list_key_strategy()),
            any::<bool>(),
        )
            .prop_map(|(kind, entities, list, at_start)| StoreOperation::Import {
                kind,
                entities,
                list,
                at_start,
            }),
        1 => (kind_strategy(), entity_id_strategy())
            .prop_map(|(kind, id)| StoreOperation::Delete { kind, id }),
        1 => (kind_strategy(), entity_id_strategy(), list_key_strategy())
            .prop_map(|(kind, id, list)| StoreOperation::Dismiss { kind, id, list }),
        2 => (kind_strategy(), entity_id_strategy())
            .prop_map(|(kind, id)| StoreOperation::Bump { kind, id }),
    ]
}

/// Strategy for a sequence of store operations.
pub fn operation_sequence_strategy(
    min_ops: usize,
    max_ops: usize,
) -> impl Strategy<Value = Vec<StoreOperation>> {
    prop::collection::vec(store_operation_strategy(), min_ops..max_ops)
}

/// Strategy for push frames: valid events, unknown events and garbage.
pub fn frame_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        3 => entity_id_strategy().prop_map(|id| frame(StreamEvent::UPDATE, &status(&id))),
        1 => entity_id_strategy().prop_map(|id| raw_frame(StreamEvent::DELETE, &id)),
        1 => Just(bare_frame(StreamEvent::FILTERS_CHANGED)),
        1 => "[a-z_.]{1,12}".prop_map(|event| bare_frame(&event)),
        1 => any::<String>(),
    ]
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Creates a configuration for thorough tests.
    #[must_use]
    pub fn thorough() -> Self {
        Self {
            cases: 1024,
            max_shrink_iters: 10000,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}
