//! Entry point binding hooks to one store.

use crate::fetch::{FetchFn, IdFetchFn, IdsFetchFn, PageFetchFn, SubmitFn};
use crate::hooks::{
    BatchHook, CreateHook, CreateOptions, DeleteHook, DeleteOptions, EntityHook, EntityOptions,
    ListHook, ListOptions, LookupHook, TransactionHook,
};
use crate::inflight::InFlight;
use crate::schema::Schema;
use fedisync_store::{Entity, EntityId, EntityKind, ListKey, Store};
use std::sync::Arc;

/// A store plus the registry of requests in flight against it.
///
/// Cheap to clone; clones share both.
#[derive(Clone)]
pub struct EntityClient {
    store: Store,
    inflight: Arc<InFlight>,
}

impl EntityClient {
    /// Creates a client over `store`.
    pub fn new(store: Store) -> Self {
        Self {
            store,
            inflight: Arc::new(InFlight::new()),
        }
    }

    /// Returns the store.
    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Returns the in-flight registry.
    pub fn inflight(&self) -> &InFlight {
        &self.inflight
    }

    /// Hook for one entity by id.
    pub fn entity(
        &self,
        kind: EntityKind,
        id: impl Into<EntityId>,
        fetch: FetchFn,
        options: EntityOptions,
    ) -> EntityHook {
        EntityHook::new(self.clone(), kind, id.into(), fetch, options)
    }

    /// Hook for one entity found by predicate.
    ///
    /// `key` names the lookup, such as the `acct` searched for; concurrent
    /// lookups with the same kind and key share one request.
    pub fn lookup(
        &self,
        kind: EntityKind,
        key: impl Into<String>,
        predicate: impl Fn(&Entity) -> bool + Send + Sync + 'static,
        fetch: FetchFn,
        options: EntityOptions,
    ) -> LookupHook {
        LookupHook::new(self.clone(), kind, key.into(), Arc::new(predicate), fetch, options)
    }

    /// Hook creating entities.
    pub fn create(&self, kind: EntityKind, submit: SubmitFn, options: CreateOptions) -> CreateHook {
        CreateHook::new(self.clone(), kind, submit, options)
    }

    /// Hook deleting entities.
    pub fn delete(&self, kind: EntityKind, delete: IdFetchFn, options: DeleteOptions) -> DeleteHook {
        DeleteHook::new(self.clone(), kind, delete, options)
    }

    /// Hook fetching the missing entities among `ids` in one request.
    pub fn batch(
        &self,
        kind: EntityKind,
        ids: Vec<EntityId>,
        fetch: IdsFetchFn,
        schema: Arc<dyn Schema>,
    ) -> BatchHook {
        BatchHook::new(self.clone(), kind, ids, fetch, schema)
    }

    /// Hook for a paginated list.
    pub fn list(
        &self,
        kind: EntityKind,
        list_key: impl Into<ListKey>,
        fetch: PageFetchFn,
        options: ListOptions,
    ) -> ListHook {
        ListHook::new(self.clone(), kind, list_key.into(), fetch, options)
    }

    /// Hook exposing store transactions.
    pub fn transaction(&self) -> TransactionHook {
        TransactionHook::new(self.store.clone())
    }
}

impl std::fmt::Debug for EntityClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityClient")
            .field("sequence", &self.store.sequence())
            .field("inflight", &self.inflight)
            .finish()
    }
}
