//! De-duplication of concurrent fetches.

use crate::error::FetchResult;
use crate::fetch::{FetchFuture, FetchResponse};
use fedisync_store::{EntityId, EntityKind, ListKey};
use futures::future::{FutureExt, Shared};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::trace;

/// Identifies a request that may be shared.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RequestKey {
    /// A single entity fetch.
    Entity(EntityKind, EntityId),
    /// A single entity fetched by lookup key, such as an account by `acct`.
    Lookup(EntityKind, String),
    /// One page of a list. `None` is the first page.
    Page(EntityKind, ListKey, Option<String>),
    /// Several entities by id, sorted.
    Batch(EntityKind, Vec<EntityId>),
    /// Any other request, by caller-chosen name.
    Named(String),
}

impl RequestKey {
    /// Key for a single entity fetch.
    pub fn entity(kind: EntityKind, id: impl Into<EntityId>) -> Self {
        RequestKey::Entity(kind, id.into())
    }

    /// Key for a lookup.
    pub fn lookup(kind: EntityKind, key: impl Into<String>) -> Self {
        RequestKey::Lookup(kind, key.into())
    }

    /// Key for the page of `list_key` behind `cursor`.
    pub fn page(kind: EntityKind, list_key: ListKey, cursor: Option<String>) -> Self {
        RequestKey::Page(kind, list_key, cursor)
    }

    /// Key for a batch fetch. Order and duplicates of `ids` do not matter.
    pub fn batch(kind: EntityKind, ids: impl IntoIterator<Item = EntityId>) -> Self {
        let mut ids: Vec<EntityId> = ids.into_iter().collect();
        ids.sort();
        ids.dedup();
        RequestKey::Batch(kind, ids)
    }
}

/// Registry of requests currently in flight.
///
/// While a request for a key is pending, further callers with the same key
/// await the same response instead of issuing their own.
#[derive(Default)]
pub struct InFlight {
    pending: Mutex<HashMap<RequestKey, Shared<FetchFuture>>>,
    started: AtomicU64,
    joined: AtomicU64,
}

impl InFlight {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `start()` unless a request for `key` is already pending, in
    /// which case its response is shared.
    pub async fn run(
        &self,
        key: RequestKey,
        start: impl FnOnce() -> FetchFuture,
    ) -> FetchResult<FetchResponse> {
        let shared = {
            let mut pending = self.pending.lock();
            match pending.get(&key) {
                Some(existing) => {
                    self.joined.fetch_add(1, Ordering::Relaxed);
                    trace!(?key, "joining in-flight request");
                    existing.clone()
                }
                None => {
                    self.started.fetch_add(1, Ordering::Relaxed);
                    let shared = start().shared();
                    pending.insert(key.clone(), shared.clone());
                    shared
                }
            }
        };

        let result = shared.clone().await;

        let mut pending = self.pending.lock();
        if pending.get(&key).is_some_and(|current| current.ptr_eq(&shared)) {
            pending.remove(&key);
        }
        result
    }

    /// Number of requests currently pending.
    pub fn pending(&self) -> usize {
        self.pending.lock().len()
    }

    /// Number of requests started.
    pub fn started(&self) -> u64 {
        self.started.load(Ordering::Relaxed)
    }

    /// Number of callers that joined an existing request.
    pub fn joined(&self) -> u64 {
        self.joined.load(Ordering::Relaxed)
    }
}

impl std::fmt::Debug for InFlight {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InFlight")
            .field("pending", &self.pending())
            .field("started", &self.started())
            .field("joined", &self.joined())
            .finish()
    }
}
