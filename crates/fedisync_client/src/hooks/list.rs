//! Paginated entity lists.

use super::{HookState, HookStatus};
use crate::client::EntityClient;
use crate::error::{HookError, HookResult};
use crate::fetch::PageFetchFn;
use crate::inflight::RequestKey;
use crate::schema::{any_entity, Schema};
use fedisync_store::{Entity, EntityKind, ListKey, ListState, PageMode};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Options of [`ListHook`].
#[derive(Clone)]
pub struct ListOptions {
    /// Validator for each list item.
    pub schema: Arc<dyn Schema>,
    /// A list fetched longer ago than this is refetched on the next fetch.
    pub stale_time: Duration,
    /// A disabled hook never fetches.
    pub enabled: bool,
}

impl ListOptions {
    /// Sets the schema.
    pub fn with_schema(mut self, schema: Arc<dyn Schema>) -> Self {
        self.schema = schema;
        self
    }

    /// Sets the stale time.
    pub fn with_stale_time(mut self, stale_time: Duration) -> Self {
        self.stale_time = stale_time;
        self
    }

    /// Sets `enabled`.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

impl Default for ListOptions {
    fn default() -> Self {
        Self {
            schema: any_entity(),
            stale_time: Duration::from_secs(60),
            enabled: true,
        }
    }
}

impl std::fmt::Debug for ListOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListOptions")
            .field("stale_time", &self.stale_time)
            .field("enabled", &self.enabled)
            .finish_non_exhaustive()
    }
}

/// A paginated feed stored as a list of one kind.
///
/// Hooks on the same list that request the same page at the same time
/// share one request.
pub struct ListHook {
    client: EntityClient,
    kind: EntityKind,
    list_key: ListKey,
    fetch: PageFetchFn,
    options: ListOptions,
    status: HookStatus,
}

impl ListHook {
    pub(crate) fn new(
        client: EntityClient,
        kind: EntityKind,
        list_key: ListKey,
        fetch: PageFetchFn,
        options: ListOptions,
    ) -> Self {
        let status = HookStatus::new(options.enabled);
        Self {
            client,
            kind,
            list_key,
            fetch,
            options,
            status,
        }
    }

    /// Fetches the first page if the list is stale. Returns true if a
    /// request was made.
    pub async fn fetch(&self) -> HookResult<bool> {
        if !self.status.is_enabled() {
            return Ok(false);
        }
        if !self.list_state().is_stale(self.options.stale_time) {
            self.status.loaded();
            return Ok(false);
        }
        self.load(None, PageMode::Replace).await.map(|()| true)
    }

    /// Fetches the first page, replacing the list.
    pub async fn refetch(&self) -> HookResult<()> {
        if !self.status.is_enabled() {
            return Err(HookError::Disabled);
        }
        self.load(None, PageMode::Replace).await
    }

    /// Appends the page behind the `next` cursor. Returns false when there
    /// is no next page.
    pub async fn fetch_next_page(&self) -> HookResult<bool> {
        let Some(cursor) = self.list_state().next else {
            return Ok(false);
        };
        self.load(Some(cursor), PageMode::Append).await.map(|()| true)
    }

    /// Prepends the page behind the `prev` cursor. Returns false when there
    /// is no previous page.
    pub async fn fetch_previous_page(&self) -> HookResult<bool> {
        let Some(cursor) = self.list_state().prev else {
            return Ok(false);
        };
        self.load(Some(cursor), PageMode::Prepend).await.map(|()| true)
    }

    /// Marks the list stale.
    pub fn invalidate(&self) {
        self.client.store().invalidate_list(&self.kind, &self.list_key);
    }

    /// Entities of the list, in order.
    pub fn entities(&self) -> Vec<Entity> {
        self.client
            .store()
            .select_list_entities(&self.kind, &self.list_key)
    }

    /// Pagination state of the list.
    pub fn list_state(&self) -> ListState {
        self.client
            .store()
            .select_list(&self.kind, &self.list_key)
            .map(|list| list.state().clone())
            .unwrap_or_default()
    }

    /// There is an older page.
    pub fn has_next_page(&self) -> bool {
        self.list_state().has_more()
    }

    /// There is a newer page.
    pub fn has_previous_page(&self) -> bool {
        self.list_state().prev.is_some()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> HookState {
        self.status.state()
    }

    /// A request is in flight and the list is empty.
    pub fn is_loading(&self) -> bool {
        self.status.state().is_fetching() && self.entities().is_empty()
    }

    /// A request is in flight.
    pub fn is_fetching(&self) -> bool {
        self.status.state().is_fetching()
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

    /// Discards any response still in flight.
    pub fn cancel(&self) {
        self.status.cancel();
        self.client
            .store()
            .set_list_state(&self.kind, &self.list_key, |state| state.is_loading = false);
    }

    async fn load(&self, cursor: Option<String>, mode: PageMode) -> HookResult<()> {
        self.status.check_cancelled()?;
        self.status.begin();
        let store = self.client.store();
        store.set_list_state(&self.kind, &self.list_key, |state| state.is_loading = true);

        let fetch = Arc::clone(&self.fetch);
        let key = RequestKey::page(self.kind.clone(), self.list_key.clone(), cursor.clone());
        let result = self.client.inflight().run(key, move || fetch(cursor)).await;
        if self.status.is_cancelled() {
            debug!(kind = %self.kind, list = %self.list_key, "discarding page for cancelled hook");
            return Err(HookError::Cancelled);
        }

        let page = result
            .map_err(HookError::from)
            .and_then(|response| {
                let entities = self.options.schema.parse_many(response.data.clone())?;
                Ok((entities, response.page_info()))
            });

        match page {
            Ok((entities, info)) => {
                debug!(kind = %self.kind, list = %self.list_key, count = entities.len(), ?mode, "page loaded");
                store.import_list_page(self.kind.clone(), &self.list_key, entities, &info, mode);
                self.status.loaded();
                Ok(())
            }
            Err(error) => {
                warn!(kind = %self.kind, list = %self.list_key, %error, "page fetch failed");
                let message = error.to_string();
                store.set_list_state(&self.kind, &self.list_key, |state| {
                    state.is_loading = false;
                    state.error = Some(message);
                });
                Err(self.status.failed(error))
            }
        }
    }
}

impl std::fmt::Debug for ListHook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListHook")
            .field("kind", &self.kind)
            .field("list_key", &self.list_key)
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{FetchError, HttpError};
    use crate::fetch::{page_fetch_fn, FetchResponse};
    use fedisync_store::Store;
    use parking_lot::Mutex;
    use serde_json::json;

    /// Serves `older` for the first page, `oldest` behind `next`, and
    /// `newest` behind `prev`.
    fn paged(calls: &Arc<Mutex<Vec<Option<String>>>>) -> PageFetchFn {
        let calls = Arc::clone(calls);
        page_fetch_fn(move |cursor: Option<String>| {
            calls.lock().push(cursor.clone());
            async move {
                let response = match cursor.as_deref() {
                    None => FetchResponse::ok(json!([{"id": "3"}, {"id": "2"}]))
                        .with_next("max_id=2")
                        .with_prev("min_id=3"),
                    Some("max_id=2") => FetchResponse::ok(json!([{"id": "1"}])),
                    Some("min_id=3") => FetchResponse::ok(json!([{"id": "4"}])).with_prev("min_id=4"),
                    Some(other) => panic!("unexpected cursor {other}"),
                };
                Ok(response)
            }
        })
    }

    fn ids(hook: &ListHook) -> Vec<String> {
        hook.entities().iter().map(|e| e.id().to_string()).collect()
    }

    #[tokio::test]
    async fn pages_forward_and_backward() {
        let client = EntityClient::new(Store::new());
        let calls = Arc::new(Mutex::new(Vec::new()));
        let hook = client.list(EntityKind::STATUSES, "home", paged(&calls), ListOptions::default());

        assert_eq!(hook.fetch().await, Ok(true));
        assert_eq!(ids(&hook), vec!["3", "2"]);
        assert!(hook.has_next_page());

        assert_eq!(hook.fetch_next_page().await, Ok(true));
        assert_eq!(ids(&hook), vec!["3", "2", "1"]);
        assert!(!hook.has_next_page());
        assert_eq!(hook.fetch_next_page().await, Ok(false));

        assert_eq!(hook.fetch_previous_page().await, Ok(true));
        assert_eq!(ids(&hook), vec!["4", "3", "2", "1"]);
        assert_eq!(hook.list_state().prev.as_deref(), Some("min_id=4"));

        assert_eq!(calls.lock().len(), 3);
        assert!(!hook.list_state().is_loading);
    }

    #[tokio::test]
    async fn fresh_list_is_not_refetched() {
        let client = EntityClient::new(Store::new());
        let calls = Arc::new(Mutex::new(Vec::new()));
        let hook = client.list(
            EntityKind::STATUSES,
            "home",
            paged(&calls),
            ListOptions::default().with_stale_time(Duration::from_secs(3600)),
        );

        assert_eq!(hook.fetch().await, Ok(true));
        assert_eq!(hook.fetch().await, Ok(false));
        assert_eq!(calls.lock().len(), 1);

        hook.invalidate();
        assert_eq!(hook.fetch().await, Ok(true));
        assert_eq!(calls.lock().len(), 2);
    }

    #[tokio::test]
    async fn partial_list_is_refetched() {
        let client = EntityClient::new(Store::new());
        let hook = client.list(
            EntityKind::STATUSES,
            "home",
            page_fetch_fn(|_| async { Ok(FetchResponse::ok(json!([])).with_partial(true)) }),
            ListOptions::default().with_stale_time(Duration::from_secs(3600)),
        );
        assert_eq!(hook.fetch().await, Ok(true));
        assert!(hook.list_state().is_partial);
        assert_eq!(hook.fetch().await, Ok(true));
    }

    #[tokio::test]
    async fn failure_is_recorded_on_list_state() {
        let client = EntityClient::new(Store::new());
        let hook = client.list(
            EntityKind::STATUSES,
            "home",
            page_fetch_fn(|_| async { Err(FetchError::Http(HttpError::new(403))) }),
            ListOptions::default(),
        );

        assert!(hook.fetch().await.is_err());
        assert!(hook.is_forbidden());
        let state = hook.list_state();
        assert!(!state.is_loading);
        assert_eq!(state.error.as_deref(), Some("HTTP 403"));
    }
}
