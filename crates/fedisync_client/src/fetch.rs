//! Fetch functions and their responses.
//!
//! Hooks never talk to the network themselves. They call caller-supplied
//! async closures that return a [`FetchResponse`], so tests can substitute
//! canned responses and applications can use any HTTP client.

use crate::error::{FetchError, FetchResult};
use fedisync_store::{EntityId, PageInfo};
use futures::future::{BoxFuture, FutureExt};
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;

/// A decoded REST response.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchResponse {
    /// JSON body.
    pub data: Value,
    /// HTTP status.
    pub status: u16,
    /// Cursor (URL) of the next, older page.
    pub next: Option<String>,
    /// Cursor (URL) of the previous, newer page.
    pub prev: Option<String>,
    /// Total item count, if the server reports one.
    pub total_count: Option<u64>,
    /// The server returned a deliberately incomplete page.
    pub partial: bool,
}

impl FetchResponse {
    /// A 200 response carrying `data`.
    pub fn ok(data: Value) -> Self {
        Self {
            data,
            status: 200,
            next: None,
            prev: None,
            total_count: None,
            partial: false,
        }
    }

    /// Sets the next-page cursor.
    pub fn with_next(mut self, next: impl Into<String>) -> Self {
        self.next = Some(next.into());
        self
    }

    /// Sets the previous-page cursor.
    pub fn with_prev(mut self, prev: impl Into<String>) -> Self {
        self.prev = Some(prev.into());
        self
    }

    /// Sets the total count.
    pub fn with_total_count(mut self, total: u64) -> Self {
        self.total_count = Some(total);
        self
    }

    /// Marks the page partial.
    pub fn with_partial(mut self, partial: bool) -> Self {
        self.partial = partial;
        self
    }

    /// Applies a `Link` header value.
    pub fn with_link_header(mut self, header: &str) -> Self {
        let links = parse_link_header(header);
        self.next = links.next;
        self.prev = links.prev;
        self
    }

    /// Pagination details of this response.
    pub fn page_info(&self) -> PageInfo {
        PageInfo {
            next: self.next.clone(),
            prev: self.prev.clone(),
            total_count: self.total_count,
            partial: self.partial,
        }
    }
}

/// Boxed future returned by every fetch function.
pub type FetchFuture = BoxFuture<'static, FetchResult<FetchResponse>>;

/// Fetches one resource.
pub type FetchFn = Arc<dyn Fn() -> FetchFuture + Send + Sync>;

/// Fetches a page; `None` asks for the first page, `Some(cursor)` for the
/// page behind a `next`/`prev` cursor.
pub type PageFetchFn = Arc<dyn Fn(Option<String>) -> FetchFuture + Send + Sync>;

/// Submits a JSON body.
pub type SubmitFn = Arc<dyn Fn(Value) -> FetchFuture + Send + Sync>;

/// Fetches several resources by id in one request.
pub type IdsFetchFn = Arc<dyn Fn(Vec<EntityId>) -> FetchFuture + Send + Sync>;

/// Acts on one resource by id.
pub type IdFetchFn = Arc<dyn Fn(EntityId) -> FetchFuture + Send + Sync>;

/// Wraps an async closure as a [`FetchFn`].
pub fn fetch_fn<F, Fut>(f: F) -> FetchFn
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = FetchResult<FetchResponse>> + Send + 'static,
{
    Arc::new(move || f().boxed())
}

/// Wraps an async closure as a [`PageFetchFn`].
pub fn page_fetch_fn<F, Fut>(f: F) -> PageFetchFn
where
    F: Fn(Option<String>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = FetchResult<FetchResponse>> + Send + 'static,
{
    Arc::new(move |cursor| f(cursor).boxed())
}

/// Wraps an async closure as a [`SubmitFn`].
pub fn submit_fn<F, Fut>(f: F) -> SubmitFn
where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = FetchResult<FetchResponse>> + Send + 'static,
{
    Arc::new(move |data| f(data).boxed())
}

/// Wraps an async closure as an [`IdsFetchFn`].
pub fn ids_fetch_fn<F, Fut>(f: F) -> IdsFetchFn
where
    F: Fn(Vec<EntityId>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = FetchResult<FetchResponse>> + Send + 'static,
{
    Arc::new(move |ids| f(ids).boxed())
}

/// Wraps an async closure as an [`IdFetchFn`].
pub fn id_fetch_fn<F, Fut>(f: F) -> IdFetchFn
where
    F: Fn(EntityId) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = FetchResult<FetchResponse>> + Send + 'static,
{
    Arc::new(move |id| f(id).boxed())
}

/// `next` and `prev` targets of a `Link` header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Links {
    /// `rel="next"` target.
    pub next: Option<String>,
    /// `rel="prev"` target.
    pub prev: Option<String>,
}

/// Parses an RFC 8288 `Link` header, keeping `next` and `prev`.
pub fn parse_link_header(header: &str) -> Links {
    let mut links = Links::default();
    for part in header.split(',') {
        let mut pieces = part.split(';');
        let Some(target) = pieces.next().map(str::trim) else {
            continue;
        };
        let Some(target) = target.strip_prefix('<').and_then(|t| t.strip_suffix('>')) else {
            continue;
        };
        for param in pieces {
            let Some((key, value)) = param.split_once('=') else {
                continue;
            };
            if !key.trim().eq_ignore_ascii_case("rel") {
                continue;
            }
            for rel in value.trim().trim_matches('"').split_whitespace() {
                match rel {
                    "next" => links.next = Some(target.to_string()),
                    "prev" | "previous" => links.prev = Some(target.to_string()),
                    _ => {}
                }
            }
        }
    }
    links
}

/// Decodes a response body, treating an empty body as `null`.
pub(crate) fn decode_body(bytes: &[u8]) -> FetchResult<Value> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    serde_json::from_slice(bytes).map_err(|e| FetchError::Decode(e.to_string()))
}
