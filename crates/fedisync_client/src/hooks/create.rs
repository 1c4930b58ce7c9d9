//! Entity creation.

use super::{ErrorCallback, HookStatus};
use crate::client::EntityClient;
use crate::error::{FetchError, HookError, HookResult, HttpError};
use crate::fetch::SubmitFn;
use crate::schema::{any_entity, Schema};
use fedisync_store::{Entity, EntityKind, ListKey, Position};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Callback receiving the created entity.
pub type SuccessCallback = Arc<dyn Fn(&Entity) + Send + Sync>;

/// Options of [`CreateHook`].
#[derive(Clone)]
pub struct CreateOptions {
    /// Validator for the response body.
    pub schema: Arc<dyn Schema>,
    /// List the new entity is prepended to.
    pub list_key: Option<ListKey>,
    /// Called with the imported entity.
    pub on_success: Option<SuccessCallback>,
    /// Called with HTTP failures.
    pub on_error: Option<ErrorCallback>,
}

impl CreateOptions {
    /// Sets the schema.
    pub fn with_schema(mut self, schema: Arc<dyn Schema>) -> Self {
        self.schema = schema;
        self
    }

    /// Prepends created entities to `list_key`.
    pub fn with_list(mut self, list_key: impl Into<ListKey>) -> Self {
        self.list_key = Some(list_key.into());
        self
    }

    /// Sets the success callback.
    pub fn on_success(mut self, f: impl Fn(&Entity) + Send + Sync + 'static) -> Self {
        self.on_success = Some(Arc::new(f));
        self
    }

    /// Sets the HTTP error callback.
    pub fn on_error(mut self, f: impl Fn(&HttpError) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Arc::new(f));
        self
    }
}

impl Default for CreateOptions {
    fn default() -> Self {
        Self {
            schema: any_entity(),
            list_key: None,
            on_success: None,
            on_error: None,
        }
    }
}

/// Submits new entities and imports what the server returns.
///
/// HTTP failures are reported to `on_error` and resolve to `Ok(None)`.
/// Every other failure (network, decode, validation) is returned.
pub struct CreateHook {
    client: EntityClient,
    kind: EntityKind,
    submit: SubmitFn,
    options: CreateOptions,
    submitting: AtomicBool,
    status: HookStatus,
}

impl CreateHook {
    pub(crate) fn new(
        client: EntityClient,
        kind: EntityKind,
        submit: SubmitFn,
        options: CreateOptions,
    ) -> Self {
        Self {
            client,
            kind,
            submit,
            options,
            submitting: AtomicBool::new(false),
            status: HookStatus::new(true),
        }
    }

    /// Submits `data`.
    pub async fn create(&self, data: Value) -> HookResult<Option<Entity>> {
        self.status.check_cancelled()?;
        self.submitting.store(true, Ordering::SeqCst);
        self.status.begin();
        let result = (self.submit)(data).await;
        self.submitting.store(false, Ordering::SeqCst);

        if self.status.is_cancelled() {
            debug!(kind = %self.kind, "discarding create response for cancelled hook");
            return Err(HookError::Cancelled);
        }

        let response = match result {
            Ok(response) => response,
            Err(FetchError::Http(error)) => {
                warn!(kind = %self.kind, %error, "create rejected");
                self.status.failed(HookError::Fetch(FetchError::Http(error.clone())));
                if let Some(on_error) = &self.options.on_error {
                    on_error(&error);
                }
                return Ok(None);
            }
            Err(other) => return Err(self.status.failed(other.into())),
        };

        let entity = self
            .options
            .schema
            .parse(response.data)
            .map_err(|e| self.status.failed(e.into()))?;
        self.client.store().import_entities(
            [entity.clone()],
            self.kind.clone(),
            self.options.list_key.as_ref(),
            Position::Start,
        );
        self.status.loaded();

        if let Some(on_success) = &self.options.on_success {
            on_success(&entity);
        }
        Ok(Some(entity))
    }

    /// A submission is in flight.
    pub fn is_submitting(&self) -> bool {
        self.submitting.load(Ordering::SeqCst)
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

impl std::fmt::Debug for CreateHook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CreateHook")
            .field("kind", &self.kind)
            .field("list_key", &self.options.list_key)
            .field("submitting", &self.is_submitting())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;
    use crate::fetch::{submit_fn, FetchResponse};
    use fedisync_store::Store;
    use parking_lot::Mutex;
    use serde_json::json;

    #[tokio::test]
    async fn imports_at_list_start_and_calls_success() {
        let store = Store::new();
        let key = ListKey::from("home");
        store.import_entities(
            [Entity::from_value(json!({"id": "1"})).unwrap()],
            EntityKind::STATUSES,
            Some(&key),
            Position::End,
        );
        let client = EntityClient::new(store.clone());
        let created = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&created);

        let hook = client.create(
            EntityKind::STATUSES,
            submit_fn(|data: Value| async move {
                let mut body = data;
                body["id"] = json!("2");
                Ok(FetchResponse::ok(body))
            }),
            CreateOptions::default()
                .with_list("home")
                .on_success(move |e| seen.lock().push(e.id().to_string())),
        );

        let entity = hook.create(json!({"status": "hi"})).await.unwrap().unwrap();
        assert_eq!(entity.get_str("status"), Some("hi"));
        assert_eq!(*created.lock(), vec!["2".to_string()]);

        let ids: Vec<String> = store
            .select_list(&EntityKind::STATUSES, &key)
            .unwrap()
            .ids()
            .map(|id| id.to_string())
            .collect();
        assert_eq!(ids, vec!["2", "1"]);
    }

    #[tokio::test]
    async fn http_errors_go_to_on_error() {
        let client = EntityClient::new(Store::new());
        let statuses = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&statuses);

        let hook = client.create(
            EntityKind::STATUSES,
            submit_fn(|_| async { Err(FetchError::Http(HttpError::new(422))) }),
            CreateOptions::default().on_error(move |e| seen.lock().push(e.status)),
        );

        assert_eq!(hook.create(json!({})).await, Ok(None));
        assert_eq!(*statuses.lock(), vec![422]);
        assert!(hook.error().is_some());
    }

    #[tokio::test]
    async fn other_errors_are_returned() {
        let client = EntityClient::new(Store::new());
        let hook = client.create(
            EntityKind::STATUSES,
            submit_fn(|_| async { Ok(FetchResponse::ok(json!([1, 2]))) }),
            CreateOptions::default().on_error(|_| panic!("not an HTTP error")),
        );
        assert!(matches!(
            hook.create(json!({})).await,
            Err(HookError::Validation(ValidationError::Entity(_)))
        ));

        let hook = client.create(
            EntityKind::STATUSES,
            submit_fn(|_| async { Err(FetchError::Network("reset".into())) }),
            CreateOptions::default(),
        );
        assert!(matches!(
            hook.create(json!({})).await,
            Err(HookError::Fetch(FetchError::Network(_)))
        ));
        assert!(!hook.is_submitting());
    }
}
