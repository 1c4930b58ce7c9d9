//! Single entity by predicate.

use super::{EntityOptions, HookState, HookStatus};
use crate::client::EntityClient;
use crate::error::{HookError, HookResult, ValidationError};
use crate::fetch::FetchFn;
use crate::inflight::RequestKey;
use crate::schema::Schema;
use fedisync_store::{Entity, EntityKind, Position};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, warn};

type Predicate = Arc<dyn Fn(&Entity) -> bool + Send + Sync>;

/// Finds an entity by predicate, fetching it when no cached entity matches.
///
/// Used for lookups by something other than id, such as an account by
/// `acct`. The fetched entity is kept locally and reported until the store
/// itself holds a match. Concurrent lookups with the same key share one
/// request.
pub struct LookupHook {
    client: EntityClient,
    kind: EntityKind,
    key: String,
    predicate: Predicate,
    fetch: FetchFn,
    schema: Arc<dyn Schema>,
    refetch: bool,
    fetched: Mutex<Option<Entity>>,
    status: HookStatus,
}

impl LookupHook {
    pub(crate) fn new(
        client: EntityClient,
        kind: EntityKind,
        key: String,
        predicate: Predicate,
        fetch: FetchFn,
        options: EntityOptions,
    ) -> Self {
        Self {
            client,
            kind,
            key,
            predicate,
            fetch,
            schema: options.schema,
            refetch: options.refetch,
            fetched: Mutex::new(None),
            status: HookStatus::new(options.enabled),
        }
    }

    /// Loads the entity unless a cached one matches.
    pub async fn fetch(&self) -> HookResult<Option<Entity>> {
        if !self.status.is_enabled() {
            return Ok(self.entity());
        }
        if !self.refetch {
            if let Some(entity) = self.find() {
                self.status.loaded();
                return Ok(Some(entity));
            }
        }
        self.load().await.map(Some)
    }

    /// Fetches unconditionally.
    pub async fn refetch(&self) -> HookResult<Entity> {
        if !self.status.is_enabled() {
            return Err(HookError::Disabled);
        }
        self.load().await
    }

    /// Discards any response still in flight.
    pub fn cancel(&self) {
        self.status.cancel();
    }

    /// The matching cached entity, else the last fetched one.
    pub fn entity(&self) -> Option<Entity> {
        self.find().or_else(|| self.fetched.lock().clone())
    }

    /// Current lifecycle state.
    pub fn state(&self) -> HookState {
        self.status.state()
    }

    /// A request is in flight and nothing matches yet.
    pub fn is_loading(&self) -> bool {
        self.status.state().is_fetching() && self.entity().is_none()
    }

    /// No request is in flight and an entity is available.
    pub fn is_loaded(&self) -> bool {
        !self.status.state().is_fetching() && self.entity().is_some()
    }

    /// The last request failed with 401.
    pub fn is_unauthorized(&self) -> bool {
        self.status.is_unauthorized()
    }

    /// The last request failed with 403.
    pub fn is_forbidden(&self) -> bool {
        self.status.is_forbidden()
    }

    /// The last error.
    pub fn error(&self) -> Option<HookError> {
        self.status.error()
    }

    fn find(&self) -> Option<Entity> {
        let predicate = &self.predicate;
        self.client
            .store()
            .find_entity(&self.kind, |entity| predicate(entity))
    }

    async fn load(&self) -> HookResult<Entity> {
        self.status.check_cancelled()?;
        self.status.begin();

        let fetch = Arc::clone(&self.fetch);
        let key = RequestKey::lookup(self.kind.clone(), self.key.clone());
        let result = self.client.inflight().run(key, move || fetch()).await;
        if self.status.is_cancelled() {
            debug!(kind = %self.kind, key = %self.key, "discarding lookup response for cancelled hook");
            return Err(HookError::Cancelled);
        }

        let response = result.map_err(|e| {
            warn!(kind = %self.kind, key = %self.key, error = %e, "lookup fetch failed");
            self.status.failed(e.into())
        })?;
        let entity = self
            .schema
            .parse(response.data)
            .map_err(|e| self.status.failed(e.into()))?;

        if !(self.predicate)(&entity) {
            warn!(kind = %self.kind, key = %self.key, id = %entity.id(), "fetched entity does not match lookup");
            return Err(self
                .status
                .failed(ValidationError::NoMatch(entity.id().to_string()).into()));
        }
        *self.fetched.lock() = Some(entity.clone());
        self.client
            .store()
            .import_entities([entity.clone()], self.kind.clone(), None, Position::End);
        self.status.loaded();
        Ok(entity)
    }
}

impl std::fmt::Debug for LookupHook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LookupHook")
            .field("kind", &self.kind)
            .field("key", &self.key)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::{fetch_fn, FetchResponse};
    use fedisync_store::Store;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn by_acct(acct: &'static str) -> impl Fn(&Entity) -> bool + Send + Sync + 'static {
        move |entity: &Entity| {
            entity
                .get_str("acct")
                .is_some_and(|a| a.eq_ignore_ascii_case(acct))
        }
    }

    #[tokio::test]
    async fn finds_cached_match_without_fetching() {
        let store = Store::new();
        let alex = Entity::from_value(json!({"id": "9", "acct": "Alex"})).unwrap();
        store.import_entities([alex.clone()], EntityKind::ACCOUNTS, None, Position::End);
        let client = EntityClient::new(store);
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);

        let hook = client.lookup(
            EntityKind::ACCOUNTS,
            "alex",
            by_acct("alex"),
            fetch_fn(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Ok(FetchResponse::ok(json!({"id": "9", "acct": "alex"}))) }
            }),
            EntityOptions::default(),
        );

        assert_eq!(hook.fetch().await.unwrap(), Some(alex));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn fetches_and_imports_when_missing() {
        let store = Store::new();
        let client = EntityClient::new(store.clone());
        let hook = client.lookup(
            EntityKind::ACCOUNTS,
            "sam@remote.example",
            by_acct("sam@remote.example"),
            fetch_fn(|| async {
                Ok(FetchResponse::ok(json!({"id": "3", "acct": "sam@remote.example"})))
            }),
            EntityOptions::default(),
        );

        let entity = hook.fetch().await.unwrap().unwrap();
        assert_eq!(entity.id().as_str(), "3");
        assert!(store.contains(&EntityKind::ACCOUNTS, "3"));
        assert_eq!(hook.entity(), Some(entity));
    }

    #[tokio::test]
    async fn keeps_fetched_entity_after_store_delete() {
        let store = Store::new();
        let client = EntityClient::new(store.clone());
        let hook = client.lookup(
            EntityKind::ACCOUNTS,
            "kim",
            by_acct("kim"),
            fetch_fn(|| async { Ok(FetchResponse::ok(json!({"id": "4", "acct": "kim"}))) }),
            EntityOptions::default(),
        );
        hook.fetch().await.unwrap();

        store.delete_entity(&EntityKind::ACCOUNTS, "4");
        assert_eq!(hook.entity().map(|e| e.id().to_string()), Some("4".to_string()));
    }

    #[tokio::test]
    async fn non_matching_response_is_rejected() {
        let store = Store::new();
        let client = EntityClient::new(store.clone());
        let hook = client.lookup(
            EntityKind::ACCOUNTS,
            "kim",
            by_acct("kim"),
            fetch_fn(|| async { Ok(FetchResponse::ok(json!({"id": "5", "acct": "sam"}))) }),
            EntityOptions::default(),
        );

        assert_eq!(
            hook.fetch().await,
            Err(HookError::Validation(ValidationError::NoMatch("5".into())))
        );
        assert!(!hook.is_loaded());
        assert_eq!(hook.entity(), None);
        assert!(!store.contains(&EntityKind::ACCOUNTS, "5"));
    }

    #[tokio::test]
    async fn loaded_tracks_availability() {
        let store = Store::new();
        let client = EntityClient::new(store.clone());
        let hook = client.lookup(
            EntityKind::ACCOUNTS,
            "kim",
            by_acct("kim"),
            fetch_fn(|| async { Ok(FetchResponse::ok(json!({"id": "4", "acct": "kim"}))) }),
            EntityOptions::default(),
        );
        assert!(!hook.is_loaded());

        hook.fetch().await.unwrap();
        assert!(hook.is_loaded());
        assert_eq!(hook.state(), HookState::Loaded);
    }
}
