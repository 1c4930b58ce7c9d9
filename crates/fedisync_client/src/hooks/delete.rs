//! Entity deletion.

use super::{ErrorCallback, HookStatus};
use crate::client::EntityClient;
use crate::error::{FetchError, HookError, HookResult, HttpError};
use crate::fetch::IdFetchFn;
use fedisync_store::{EntityId, EntityKind};
use std::sync::Arc;
use tracing::{debug, warn};

/// Callback receiving the deleted id.
pub type DeletedCallback = Arc<dyn Fn(&EntityId) + Send + Sync>;

/// Options of [`DeleteHook`].
#[derive(Clone, Default)]
pub struct DeleteOptions {
    /// Called once the entity has been removed.
    pub on_success: Option<DeletedCallback>,
    /// Called with HTTP failures.
    pub on_error: Option<ErrorCallback>,
}

impl DeleteOptions {
    /// Sets the success callback.
    pub fn on_success(mut self, f: impl Fn(&EntityId) + Send + Sync + 'static) -> Self {
        self.on_success = Some(Arc::new(f));
        self
    }

    /// Sets the HTTP error callback.
    pub fn on_error(mut self, f: impl Fn(&HttpError) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Arc::new(f));
        self
    }
}

/// Deletes entities on the server, then from the store.
///
/// The entity stays cached until the server confirms, so lists never point
/// at an id the server still serves.
pub struct DeleteHook {
    client: EntityClient,
    kind: EntityKind,
    delete: IdFetchFn,
    options: DeleteOptions,
    status: HookStatus,
}

impl DeleteHook {
    pub(crate) fn new(
        client: EntityClient,
        kind: EntityKind,
        delete: IdFetchFn,
        options: DeleteOptions,
    ) -> Self {
        Self {
            client,
            kind,
            delete,
            options,
            status: HookStatus::new(true),
        }
    }

    /// Deletes `id`. Returns true once the entity is gone.
    ///
    /// HTTP failures go to `on_error` and resolve to `Ok(false)`.
    pub async fn delete(&self, id: impl Into<EntityId>) -> HookResult<bool> {
        let id = id.into();
        self.status.check_cancelled()?;
        self.status.begin();
        let result = (self.delete)(id.clone()).await;

        if self.status.is_cancelled() {
            debug!(kind = %self.kind, %id, "discarding delete response for cancelled hook");
            return Err(HookError::Cancelled);
        }

        match result {
            Ok(_) => {
                self.client.store().delete_entity(&self.kind, id.as_str());
                self.status.loaded();
                if let Some(on_success) = &self.options.on_success {
                    on_success(&id);
                }
                Ok(true)
            }
            Err(FetchError::Http(error)) => {
                warn!(kind = %self.kind, %id, %error, "delete rejected");
                self.status.failed(HookError::Fetch(FetchError::Http(error.clone())));
                if let Some(on_error) = &self.options.on_error {
                    on_error(&error);
                }
                Ok(false)
            }
            Err(other) => Err(self.status.failed(other.into())),
        }
    }

    /// A deletion is in flight.
    pub fn is_deleting(&self) -> bool {
        self.status.state().is_fetching()
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

impl std::fmt::Debug for DeleteHook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeleteHook")
            .field("kind", &self.kind)
            .field("state", &self.status.state())
            .finish()
    }
}
