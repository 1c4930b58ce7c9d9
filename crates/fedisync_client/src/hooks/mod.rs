//! Entity access hooks.
//!
//! A hook binds one fetch function to one store location. Its lifecycle is
//! `Idle → Fetching → {Loaded | Errored}`; it re-enters `Fetching` only on an
//! explicit refetch or when it is enabled again.
//!
//! Every hook can be cancelled. A response that arrives after cancellation
//! is discarded and never reaches the store.

mod batch;
mod create;
mod delete;
mod entity;
mod list;
mod lookup;
mod transaction;

pub use batch::BatchHook;
pub use create::{CreateHook, CreateOptions};
pub use delete::{DeleteHook, DeleteOptions};
pub use entity::{EntityHook, EntityOptions};
pub use list::{ListHook, ListOptions};
pub use lookup::LookupHook;
pub use transaction::TransactionHook;

use crate::error::{HookError, HookResult, HttpError};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Lifecycle state of a hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HookState {
    /// Nothing requested yet.
    #[default]
    Idle,
    /// A request is in flight.
    Fetching,
    /// The last request succeeded, or the data was already cached.
    Loaded,
    /// The last request failed.
    Errored,
}

impl HookState {
    /// Returns true while a request is in flight.
    pub fn is_fetching(&self) -> bool {
        matches!(self, HookState::Fetching)
    }
}

/// Callback receiving HTTP failures.
pub type ErrorCallback = Arc<dyn Fn(&HttpError) + Send + Sync>;

/// State shared by every hook: lifecycle, last error, enablement and
/// cancellation.
#[derive(Debug)]
pub(crate) struct HookStatus {
    inner: Mutex<StatusInner>,
    enabled: AtomicBool,
    cancelled: AtomicBool,
}

#[derive(Debug, Default)]
struct StatusInner {
    state: HookState,
    error: Option<HookError>,
}

impl HookStatus {
    pub(crate) fn new(enabled: bool) -> Self {
        Self {
            inner: Mutex::new(StatusInner::default()),
            enabled: AtomicBool::new(enabled),
            cancelled: AtomicBool::new(false),
        }
    }

    pub(crate) fn state(&self) -> HookState {
        self.inner.lock().state
    }

    pub(crate) fn error(&self) -> Option<HookError> {
        self.inner.lock().error.clone()
    }

    pub(crate) fn begin(&self) {
        self.inner.lock().state = HookState::Fetching;
    }

    pub(crate) fn loaded(&self) {
        let mut inner = self.inner.lock();
        inner.state = HookState::Loaded;
        inner.error = None;
    }

    /// Records `error` and hands it back.
    pub(crate) fn failed(&self, error: HookError) -> HookError {
        let mut inner = self.inner.lock();
        inner.state = HookState::Errored;
        inner.error = Some(error.clone());
        error
    }

    pub(crate) fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Returns true if the hook went from disabled to enabled.
    pub(crate) fn set_enabled(&self, enabled: bool) -> bool {
        let was = self.enabled.swap(enabled, Ordering::SeqCst);
        !was && enabled
    }

    pub(crate) fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        let mut inner = self.inner.lock();
        if inner.state.is_fetching() {
            inner.state = HookState::Idle;
        }
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Checks if the hook was cancelled.
    pub(crate) fn check_cancelled(&self) -> HookResult<()> {
        if self.is_cancelled() {
            Err(HookError::Cancelled)
        } else {
            Ok(())
        }
    }

    pub(crate) fn is_unauthorized(&self) -> bool {
        self.http_error().is_some_and(|e| e.is_unauthorized())
    }

    pub(crate) fn is_forbidden(&self) -> bool {
        self.http_error().is_some_and(|e| e.is_forbidden())
    }

    fn http_error(&self) -> Option<HttpError> {
        self.inner.lock().error.as_ref().and_then(HookError::http).cloned()
    }
}
