//! Fuzz harnesses.
//!
//! These take raw bytes so they can back cargo-fuzz targets as well as
//! proptest cases.

use crate::generators::StoreOperation;
use fedisync_protocol::{StreamEvent, StreamFrame, Topic};
use fedisync_store::{Entity, EntityId, EntityKind, ListKey, Position, Store};
use serde_json::json;

/// Fuzz target for frame decoding.
///
/// Arbitrary input either decodes or returns an error; it never panics.
pub fn fuzz_frame_decode(data: &[u8]) {
    let text = String::from_utf8_lossy(data);
    if let Ok(frame) = StreamFrame::parse(&text) {
        let _ = StreamEvent::from_frame(&frame);
    }
    let _ = StreamEvent::parse(&text);
}

/// Fuzz target for topic parsing.
///
/// A parsed topic must re-parse from its own string form.
pub fn fuzz_topic_roundtrip(data: &[u8]) {
    let text = String::from_utf8_lossy(data);
    if let Ok(topic) = text.parse::<Topic>() {
        let again: Topic = topic
            .to_string()
            .parse()
            .expect("displayed topic must parse");
        assert_eq!(topic, again, "topic roundtrip mismatch");
    }
}

/// Fuzz target for store operations.
///
/// Each 3-byte chunk selects an operation, a kind and an id. After every
/// operation the lists of every touched kind must reference cached ids only.
pub fn fuzz_store_operations(data: &[u8]) {
    let store = Store::new();
    let kinds = [EntityKind::STATUSES, EntityKind::ACCOUNTS];
    let list = ListKey::from("home");

    for chunk in data.chunks_exact(3) {
        let kind = kinds[usize::from(chunk[1]) % kinds.len()].clone();
        let id = (chunk[2] % 16).to_string();
        let op = match chunk[0] % 4 {
            0 | 1 => StoreOperation::Import {
                kind: kind.clone(),
                entities: vec![Entity::from_value(json!({"id": id, "rev": chunk[0]}))
                    .expect("fuzz entity has an id")],
                list: Some(list.clone()),
                at_start: chunk[0] % 2 == 0,
            },
            2 => StoreOperation::Delete {
                kind: kind.clone(),
                id,
            },
            _ => StoreOperation::Bump {
                kind: kind.clone(),
                id,
            },
        };
        op.apply(&store);

        if let Some(entities) = store.select_list(&kind, &list) {
            for id in entities.ids() {
                assert!(store.contains(&kind, id.as_str()), "dangling list id {id}");
            }
        }
    }
}

/// Imports then deletes `count` statuses through a shared list, leaving
/// the list empty.
pub fn churn_list(store: &Store, list: &ListKey, count: usize) {
    let entities: Vec<Entity> = (0..count)
        .map(|i| Entity::from_value(json!({"id": i.to_string()})).expect("churn entity has an id"))
        .collect();
    store.import_entities(entities, EntityKind::STATUSES, Some(list), Position::Start);
    store.delete_entities(
        &EntityKind::STATUSES,
        (0..count).map(|i| EntityId::from(i.to_string())),
    );
}
