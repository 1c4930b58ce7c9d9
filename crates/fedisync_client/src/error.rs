//! Error types for fetches and hooks.

use fedisync_protocol::ServerErrorBody;
use fedisync_store::StoreError;
use thiserror::Error;

/// Result type for hook operations.
pub type HookResult<T> = Result<T, HookError>;

/// Result type for fetch functions.
pub type FetchResult<T> = Result<T, FetchError>;

/// A non-success HTTP response.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpError {
    /// Response status code.
    pub status: u16,
    /// Structured error body, if the server sent one.
    pub body: Option<ServerErrorBody>,
}

impl HttpError {
    /// Creates an error with no body.
    pub fn new(status: u16) -> Self {
        Self { status, body: None }
    }

    /// Attaches a structured body.
    pub fn with_body(mut self, body: ServerErrorBody) -> Self {
        self.body = Some(body);
        self
    }

    /// Returns true for 401.
    pub fn is_unauthorized(&self) -> bool {
        self.status == 401
    }

    /// Returns true for 403.
    pub fn is_forbidden(&self) -> bool {
        self.status == 403
    }

    /// Returns true for 404.
    pub fn is_not_found(&self) -> bool {
        self.status == 404
    }

    /// The server's error message, if any.
    pub fn message(&self) -> Option<&str> {
        self.body.as_ref().map(|body| body.error.as_str())
    }
}

impl std::fmt::Display for HttpError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.message() {
            Some(message) => write!(f, "HTTP {}: {}", self.status, message),
            None => write!(f, "HTTP {}", self.status),
        }
    }
}

impl std::error::Error for HttpError {}

/// Errors returned by fetch functions.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    /// The server answered with a non-success status.
    #[error(transparent)]
    Http(#[from] HttpError),

    /// The request never got a response.
    #[error("network error: {0}")]
    Network(String),

    /// The response body could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),
}

impl FetchError {
    /// Returns the HTTP error, if this is one.
    pub fn http(&self) -> Option<&HttpError> {
        match self {
            FetchError::Http(e) => Some(e),
            _ => None,
        }
    }
}

/// A response body did not match the expected schema.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// The value is not a usable entity.
    #[error("invalid entity: {0}")]
    Entity(#[from] StoreError),

    /// Expected a JSON array of entities.
    #[error("expected an array, found {found}")]
    NotAnArray {
        /// JSON type that was found.
        found: &'static str,
    },

    /// The value does not match the typed schema.
    #[error("schema mismatch: {0}")]
    Schema(String),

    /// The response is a different entity than the one requested.
    #[error("requested entity {expected}, received {found}")]
    WrongEntity {
        /// Id that was requested.
        expected: String,
        /// Id that was received.
        found: String,
    },

    /// The response does not satisfy the lookup.
    #[error("entity {0} does not match the lookup")]
    NoMatch(String),
}

/// Errors surfaced by hooks.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HookError {
    /// The fetch function failed.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// The response did not validate.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The hook was cancelled before the response arrived.
    #[error("hook cancelled")]
    Cancelled,

    /// The hook is disabled.
    #[error("hook disabled")]
    Disabled,
}

impl HookError {
    /// Returns the HTTP error, if this is one.
    pub fn http(&self) -> Option<&HttpError> {
        match self {
            HookError::Fetch(e) => e.http(),
            _ => None,
        }
    }
}
