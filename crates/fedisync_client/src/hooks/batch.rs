//! Several entities by id in one request.

use super::{HookState, HookStatus};
use crate::client::EntityClient;
use crate::error::{HookError, HookResult};
use crate::fetch::IdsFetchFn;
use crate::inflight::RequestKey;
use crate::schema::Schema;
use fedisync_store::{Entity, EntityId, EntityKind, Position};
use std::sync::Arc;
use tracing::{debug, warn};

/// Fetches only the ids missing from the store, in one call.
///
/// Concurrent batch hooks missing the same ids share one request.
pub struct BatchHook {
    client: EntityClient,
    kind: EntityKind,
    ids: Vec<EntityId>,
    fetch: IdsFetchFn,
    schema: Arc<dyn Schema>,
    status: HookStatus,
}

impl BatchHook {
    pub(crate) fn new(
        client: EntityClient,
        kind: EntityKind,
        ids: Vec<EntityId>,
        fetch: IdsFetchFn,
        schema: Arc<dyn Schema>,
    ) -> Self {
        Self {
            client,
            kind,
            ids,
            fetch,
            schema,
            status: HookStatus::new(true),
        }
    }

    /// Ids not yet cached.
    pub fn missing(&self) -> Vec<EntityId> {
        let store = self.client.store();
        let mut missing: Vec<EntityId> = Vec::new();
        for id in &self.ids {
            if !store.contains(&self.kind, id.as_str()) && !missing.contains(id) {
                missing.push(id.clone());
            }
        }
        missing
    }

    /// Fetches the missing ids. Returns how many entities were imported.
    pub async fn fetch(&self) -> HookResult<usize> {
        let missing = self.missing();
        if missing.is_empty() {
            self.status.loaded();
            return Ok(0);
        }
        self.status.check_cancelled()?;
        self.status.begin();
        debug!(kind = %self.kind, count = missing.len(), "batch fetching missing entities");

        let fetch = Arc::clone(&self.fetch);
        let key = RequestKey::batch(self.kind.clone(), missing.iter().cloned());
        let result = self.client.inflight().run(key, move || fetch(missing)).await;
        if self.status.is_cancelled() {
            return Err(HookError::Cancelled);
        }

        let response = result.map_err(|e| {
            warn!(kind = %self.kind, error = %e, "batch fetch failed");
            self.status.failed(e.into())
        })?;
        let entities = self
            .schema
            .parse_many(response.data)
            .map_err(|e| self.status.failed(e.into()))?;

        let count = entities.len();
        self.client
            .store()
            .import_entities(entities, self.kind.clone(), None, Position::End);
        self.status.loaded();
        Ok(count)
    }

    /// Cached entities among the requested ids, in request order.
    pub fn entities(&self) -> Vec<Entity> {
        self.client.store().select_entities(&self.kind, &self.ids)
    }

    /// Current lifecycle state.
    pub fn state(&self) -> HookState {
        self.status.state()
    }

    /// The last error.
    pub fn error(&self) -> Option<HookError> {
        self.status.error()
    }

    /// Discards any response still in flight.
    pub fn cancel(&self) {
        self.status.cancel();
    }
}

impl std::fmt::Debug for BatchHook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchHook")
            .field("kind", &self.kind)
            .field("ids", &self.ids)
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::{ids_fetch_fn, FetchResponse};
    use crate::schema::any_entity;
    use fedisync_store::Store;
    use parking_lot::Mutex;
    use serde_json::{json, Value};

    #[tokio::test]
    async fn fetches_only_missing_ids_once() {
        let store = Store::new();
        store.import_entities(
            [Entity::from_value(json!({"id": "2"})).unwrap()],
            EntityKind::ACCOUNTS,
            None,
            Position::End,
        );
        let client = EntityClient::new(store);
        let requests = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&requests);

        let hook = client.batch(
            EntityKind::ACCOUNTS,
            ["1", "2", "3", "1"].map(EntityId::from).to_vec(),
            ids_fetch_fn(move |ids: Vec<EntityId>| {
                seen.lock().push(ids.clone());
                async move {
                    let body: Vec<Value> = ids.iter().map(|id| json!({"id": id.as_str()})).collect();
                    Ok(FetchResponse::ok(Value::Array(body)))
                }
            }),
            any_entity(),
        );

        assert_eq!(hook.fetch().await, Ok(2));
        assert_eq!(
            *requests.lock(),
            vec![vec![EntityId::from("1"), EntityId::from("3")]]
        );

        assert_eq!(hook.fetch().await, Ok(0));
        assert_eq!(requests.lock().len(), 1);

        let ids: Vec<String> = hook.entities().iter().map(|e| e.id().to_string()).collect();
        assert_eq!(ids, vec!["1", "2", "3", "1"]);
    }
}
