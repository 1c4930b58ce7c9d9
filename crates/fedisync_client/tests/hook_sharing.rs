//! Hooks sharing one store and one in-flight registry.

use fedisync_client::{
    any_entity, fetch_fn, ids_fetch_fn, page_fetch_fn, EntityClient, EntityOptions,
    FetchResponse, ListOptions,
};
use fedisync_store::{Entity, EntityId, EntityKind, Store};
use serde_json::Value;
use fedisync_testkit::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test(start_paused = true)]
async fn concurrent_entity_hooks_share_one_request() {
    let client = EntityClient::new(Store::new());
    let calls = Arc::new(AtomicUsize::new(0));

    let fetch = {
        let calls = Arc::clone(&calls);
        fetch_fn(move || {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                tokio::time::sleep(Duration::from_millis(50)).await;
                Ok(FetchResponse::ok(status("7")))
            }
        })
    };
    let first = client.entity(EntityKind::STATUSES, "7", fetch.clone(), EntityOptions::default());
    let second = client.entity(EntityKind::STATUSES, "7", fetch, EntityOptions::default());

    let (a, b) = tokio::join!(first.fetch(), second.fetch());
    assert_eq!(a.unwrap(), b.unwrap());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(client.inflight().started(), 1);
    assert_eq!(client.inflight().joined(), 1);
    assert_eq!(client.inflight().pending(), 0);
    assert!(first.is_loaded() && second.is_loaded());
}

#[tokio::test(start_paused = true)]
async fn concurrent_list_hooks_share_one_page_request() {
    let client = EntityClient::new(Store::new());
    let calls = Arc::new(AtomicUsize::new(0));

    let fetch = {
        let calls = Arc::clone(&calls);
        page_fetch_fn(move |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                tokio::time::sleep(Duration::from_millis(50)).await;
                Ok(FetchResponse::ok(Value::Array(vec![status("2"), status("1")])))
            }
        })
    };
    let first = client.list(EntityKind::STATUSES, "home", fetch.clone(), ListOptions::default());
    let second = client.list(EntityKind::STATUSES, "home", fetch, ListOptions::default());

    let (a, b) = tokio::join!(first.fetch(), second.fetch());
    assert_eq!((a, b), (Ok(true), Ok(true)));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(first.entities(), second.entities());
    assert_eq!(first.entities().len(), 2);
    assert!(!first.list_state().is_loading);
}

#[tokio::test(start_paused = true)]
async fn concurrent_lookups_with_one_key_share_one_request() {
    let client = EntityClient::new(Store::new());
    let calls = Arc::new(AtomicUsize::new(0));

    let fetch = {
        let calls = Arc::clone(&calls);
        fetch_fn(move || {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                tokio::time::sleep(Duration::from_millis(50)).await;
                Ok(FetchResponse::ok(account("5", "kim@remote.example")))
            }
        })
    };
    let acct = "kim@remote.example";
    let by_acct = move |e: &Entity| e.get_str("acct") == Some(acct);
    let first = client.lookup(EntityKind::ACCOUNTS, acct, by_acct, fetch.clone(), EntityOptions::default());
    let second = client.lookup(EntityKind::ACCOUNTS, acct, by_acct, fetch, EntityOptions::default());

    let (a, b) = tokio::join!(first.fetch(), second.fetch());
    assert_eq!(a.unwrap(), b.unwrap());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(first.is_loaded() && second.is_loaded());
}

#[tokio::test(start_paused = true)]
async fn concurrent_batches_for_the_same_ids_share_one_request() {
    let client = EntityClient::new(Store::new());
    let calls = Arc::new(AtomicUsize::new(0));

    let fetch = {
        let calls = Arc::clone(&calls);
        ids_fetch_fn(move |ids: Vec<EntityId>| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                tokio::time::sleep(Duration::from_millis(50)).await;
                let body = ids.iter().map(|id| account(id.as_str(), "someone")).collect();
                Ok(FetchResponse::ok(Value::Array(body)))
            }
        })
    };
    let ids = |raw: [&str; 2]| raw.map(EntityId::from).to_vec();
    let first = client.batch(EntityKind::ACCOUNTS, ids(["1", "2"]), fetch.clone(), any_entity());
    let second = client.batch(EntityKind::ACCOUNTS, ids(["2", "1"]), fetch, any_entity());

    let (a, b) = tokio::join!(first.fetch(), second.fetch());
    assert_eq!((a, b), (Ok(2), Ok(2)));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(second.entities().len(), 2);
}

#[tokio::test]
async fn list_entities_track_later_entity_updates() {
    let client = EntityClient::new(Store::new());
    let list = client.list(
        EntityKind::STATUSES,
        "home",
        page_fetch_fn(|_| async {
            Ok(FetchResponse::ok(Value::Array(vec![status("2"), status("1")])))
        }),
        ListOptions::default(),
    );
    list.fetch().await.unwrap();

    let edited = {
        let mut value = status("1");
        value["content"] = "<p>edited</p>".into();
        value
    };
    let hook = client.entity(
        EntityKind::STATUSES,
        "1",
        fetch_fn(move || {
            let edited = edited.clone();
            async move { Ok(FetchResponse::ok(edited)) }
        }),
        EntityOptions::default().with_refetch(true),
    );
    hook.fetch().await.unwrap();

    let contents: Vec<String> = list
        .entities()
        .iter()
        .map(|e| e.get_str("content").unwrap_or_default().to_string())
        .collect();
    assert_eq!(contents, vec!["<p>status 2</p>", "<p>edited</p>"]);
}
