//! Push events applied to the store, directly and over a mock stream.

use fedisync_client::{Reconciler, ReconcilerConfig};
use fedisync_protocol::{StreamEvent, Topic};
use fedisync_store::{EntityKind, ListKey, Position, Store, StoreChange};
use fedisync_stream::{
    ConnectionState, JitterPolicy, MockTransport, StreamConfig, StreamManager, Subscription,
};
use fedisync_testkit::prelude::*;
use std::sync::Arc;
use std::time::Duration;

fn follow_frame(state: &str, follower: &str, following: &str) -> String {
    frame(
        StreamEvent::FOLLOW_RELATIONSHIPS_UPDATE,
        &follow_update(state, (follower, 10, 20), (following, 101, 7)),
    )
}

#[test]
fn follow_update_for_me_patches_relationship_and_counts_together() {
    let store = scenarios::followable_store("42", "alice");
    store.import_entities([entity(account("me", "me"))], EntityKind::ACCOUNTS, None, Position::End);
    let reconciler = Reconciler::new(store.clone(), ReconcilerConfig::new().with_me("me"));
    let changes = store.subscribe();

    reconciler.handle_frame(&follow_frame("follow_pending", "me", "42"));
    let rel = store.select_entity(&EntityKind::RELATIONSHIPS, "42").unwrap();
    assert_eq!(rel.get_bool("following"), Some(false));
    assert_eq!(rel.get_bool("requested"), Some(true));

    reconciler.handle_frame(&follow_frame("follow_accept", "me", "42"));
    let rel = store.select_entity(&EntityKind::RELATIONSHIPS, "42").unwrap();
    assert_eq!(rel.get_bool("following"), Some(true));
    assert_eq!(rel.get_bool("requested"), Some(false));

    let alice = store.select_entity(&EntityKind::ACCOUNTS, "42").unwrap();
    assert_eq!(alice.get_u64("followers_count"), Some(101));
    assert_eq!(alice.get_u64("following_count"), Some(7));
    let me = store.select_entity(&EntityKind::ACCOUNTS, "me").unwrap();
    assert_eq!(me.get_u64("followers_count"), Some(10));
    assert_eq!(me.get_u64("following_count"), Some(20));

    // One change per event, each covering both kinds.
    let events: Vec<_> = changes.try_iter().collect();
    assert_eq!(events.len(), 2);
    for event in events {
        let StoreChange::Transacted { entities } = event.change else {
            panic!("expected a transaction, got {:?}", event.change);
        };
        assert!(entities.iter().any(|(kind, _)| *kind == EntityKind::RELATIONSHIPS));
        assert!(entities.iter().any(|(kind, _)| *kind == EntityKind::ACCOUNTS));
    }

    reconciler.handle_frame(&follow_frame("follow_reject", "me", "42"));
    let rel = store.select_entity(&EntityKind::RELATIONSHIPS, "42").unwrap();
    assert_eq!(rel.get_bool("following"), Some(false));
    assert_eq!(rel.get_bool("requested"), Some(false));
}

#[test]
fn follow_update_for_another_user_changes_nothing() {
    let store = scenarios::followable_store("42", "alice");
    let reconciler = Reconciler::new(store.clone(), ReconcilerConfig::new().with_me("me"));
    let before = store.sequence();

    reconciler.handle_frame(&follow_frame("follow_accept", "someone-else", "42"));

    assert_eq!(store.sequence(), before);
    let rel = store.select_entity(&EntityKind::RELATIONSHIPS, "42").unwrap();
    assert_eq!(rel.get_bool("following"), Some(false));
    assert_eq!(reconciler.stats().ignored, 1);
}

#[test]
fn duplicate_and_reordered_delivery_converge() {
    let frames = [
        update_frame("1"),
        update_frame("2"),
        delete_frame("1"),
        update_frame("3"),
    ];

    let in_order = Store::new();
    let r = Reconciler::new(in_order.clone(), ReconcilerConfig::new().with_timeline("home"));
    for f in &frames {
        r.handle_frame(f);
    }

    let duplicated = Store::new();
    let r = Reconciler::new(duplicated.clone(), ReconcilerConfig::new().with_timeline("home"));
    for f in frames.iter().chain(frames.iter()) {
        r.handle_frame(f);
    }

    let ids = |store: &Store| -> Vec<String> {
        store
            .select_list(&EntityKind::STATUSES, &ListKey::from("home"))
            .unwrap()
            .ids()
            .map(|id| id.to_string())
            .collect()
    };
    assert_eq!(ids(&in_order), vec!["3", "2"]);
    assert_eq!(ids(&duplicated), ids(&in_order));
    assert!(!duplicated.contains(&EntityKind::STATUSES, "1"));
}

#[tokio::test(start_paused = true)]
async fn frames_over_mock_stream_reach_the_store() {
    let store = Store::new();
    let reconciler = Arc::new(Reconciler::new(
        store.clone(),
        ReconcilerConfig::new().with_timeline("home"),
    ));

    let transport = MockTransport::new();
    let peer = transport.accept();
    let manager = StreamManager::new(
        StreamConfig::new("https://social.example").with_jitter(JitterPolicy::None),
        transport,
    );
    let handle = manager.connect(Subscription::new(Topic::User, reconciler.clone()), None);
    tokio::time::sleep(Duration::from_millis(5)).await;
    assert_eq!(handle.state(), ConnectionState::Connected);

    peer.send_text(update_frame("10"));
    peer.send_text("{ not a frame");
    peer.send_text(update_frame("11"));
    tokio::time::sleep(Duration::from_millis(5)).await;

    let ids: Vec<String> = store
        .select_list(&EntityKind::STATUSES, &ListKey::from("home"))
        .unwrap()
        .ids()
        .map(|id| id.to_string())
        .collect();
    assert_eq!(ids, vec!["11", "10"]);
    assert_eq!(reconciler.stats().malformed, 1);
    assert_eq!(handle.state(), ConnectionState::Connected);

    handle.disconnect();
}
