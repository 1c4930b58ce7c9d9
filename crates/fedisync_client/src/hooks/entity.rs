//! Single entity by id.

use super::{HookState, HookStatus};
use crate::client::EntityClient;
use crate::error::{HookError, HookResult, ValidationError};
use crate::fetch::FetchFn;
use crate::inflight::RequestKey;
use crate::schema::{any_entity, Schema};
use fedisync_store::{Entity, EntityId, EntityKind, Position};
use std::sync::Arc;
use tracing::{debug, warn};

/// Options of [`EntityHook`] and [`LookupHook`](super::LookupHook).
#[derive(Clone)]
pub struct EntityOptions {
    /// Validator for the response body.
    pub schema: Arc<dyn Schema>,
    /// Fetch even when the entity is already cached.
    pub refetch: bool,
    /// A disabled hook never fetches.
    pub enabled: bool,
}

impl EntityOptions {
    /// Sets the schema.
    pub fn with_schema(mut self, schema: Arc<dyn Schema>) -> Self {
        self.schema = schema;
        self
    }

    /// Sets `refetch`.
    pub fn with_refetch(mut self, refetch: bool) -> Self {
        self.refetch = refetch;
        self
    }

    /// Sets `enabled`.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

impl Default for EntityOptions {
    fn default() -> Self {
        Self {
            schema: any_entity(),
            refetch: false,
            enabled: true,
        }
    }
}

impl std::fmt::Debug for EntityOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityOptions")
            .field("refetch", &self.refetch)
            .field("enabled", &self.enabled)
            .finish_non_exhaustive()
    }
}

/// Reads one entity from the store, fetching it when needed.
///
/// # Example
///
/// ```no_run
/// # async fn demo() -> fedisync_client::HookResult<()> {
/// use fedisync_client::{fetch_fn, EntityClient, EntityOptions, FetchResponse};
/// use fedisync_store::{EntityKind, Store};
/// use serde_json::json;
///
/// let client = EntityClient::new(Store::new());
/// let fetch = fetch_fn(|| async { Ok(FetchResponse::ok(json!({"id": "1", "acct": "alex"}))) });
/// let hook = client.entity(EntityKind::ACCOUNTS, "1", fetch, EntityOptions::default());
///
/// hook.fetch().await?;
/// assert!(hook.entity().is_some());
/// # Ok(())
/// # }
/// ```
pub struct EntityHook {
    client: EntityClient,
    kind: EntityKind,
    id: EntityId,
    fetch: FetchFn,
    schema: Arc<dyn Schema>,
    refetch: bool,
    status: HookStatus,
}

impl EntityHook {
    pub(crate) fn new(
        client: EntityClient,
        kind: EntityKind,
        id: EntityId,
        fetch: FetchFn,
        options: EntityOptions,
    ) -> Self {
        Self {
            client,
            kind,
            id,
            fetch,
            schema: options.schema,
            refetch: options.refetch,
            status: HookStatus::new(options.enabled),
        }
    }

    /// Loads the entity.
    ///
    /// Does nothing while disabled. Without `refetch`, a cached entity is
    /// returned with zero fetch calls.
    pub async fn fetch(&self) -> HookResult<Option<Entity>> {
        if !self.status.is_enabled() {
            return Ok(self.entity());
        }
        if !self.refetch {
            if let Some(entity) = self.entity() {
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

    /// Enables or disables the hook. Turning it on loads the entity.
    pub async fn set_enabled(&self, enabled: bool) -> HookResult<Option<Entity>> {
        if self.status.set_enabled(enabled) {
            return self.fetch().await;
        }
        Ok(self.entity())
    }

    /// Discards any response still in flight.
    pub fn cancel(&self) {
        self.status.cancel();
    }

    /// The entity as currently cached.
    pub fn entity(&self) -> Option<Entity> {
        self.client.store().select_entity(&self.kind, self.id.as_str())
    }

    /// Current lifecycle state.
    pub fn state(&self) -> HookState {
        self.status.state()
    }

    /// A request is in flight and nothing is cached yet.
    pub fn is_loading(&self) -> bool {
        self.status.state().is_fetching() && self.entity().is_none()
    }

    /// A request is in flight.
    pub fn is_fetching(&self) -> bool {
        self.status.state().is_fetching()
    }

    /// No request is in flight and the entity is cached.
    pub fn is_loaded(&self) -> bool {
        !self.is_fetching() && self.entity().is_some()
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

    async fn load(&self) -> HookResult<Entity> {
        self.status.check_cancelled()?;
        self.status.begin();

        let fetch = Arc::clone(&self.fetch);
        let key = RequestKey::entity(self.kind.clone(), self.id.clone());
        let result = self.client.inflight().run(key, move || fetch()).await;

        if self.status.is_cancelled() {
            debug!(kind = %self.kind, id = %self.id, "discarding response for cancelled hook");
            return Err(HookError::Cancelled);
        }

        let response = result.map_err(|e| {
            warn!(kind = %self.kind, id = %self.id, error = %e, "entity fetch failed");
            self.status.failed(e.into())
        })?;
        let entity = self
            .schema
            .parse(response.data)
            .map_err(|e| self.status.failed(e.into()))?;
        if entity.id() != &self.id {
            warn!(kind = %self.kind, id = %self.id, received = %entity.id(), "response is a different entity");
            return Err(self.status.failed(
                ValidationError::WrongEntity {
                    expected: self.id.to_string(),
                    found: entity.id().to_string(),
                }
                .into(),
            ));
        }

        self.client
            .store()
            .import_entities([entity.clone()], self.kind.clone(), None, Position::End);
        self.status.loaded();
        Ok(entity)
    }
}

impl std::fmt::Debug for EntityHook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityHook")
            .field("kind", &self.kind)
            .field("id", &self.id)
            .field("state", &self.state())
            .finish()
    }
}
