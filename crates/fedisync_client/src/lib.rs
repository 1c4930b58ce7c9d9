//! # fedisync Client
//!
//! Keeps a [`Store`](fedisync_store::Store) in sync with a federated social
//! server.
//!
//! This crate provides:
//! - The [`Reconciler`], which applies push events from a stream connection
//! - Entity access hooks for single entities, lookups, lists, batches,
//!   creation, deletion and transactions
//! - A fetch and HTTP error model shared by every hook
//! - Schema validators that turn JSON bodies into entities
//! - A registry that lets concurrent hooks share one request per entity
//! - A small REST client producing [`FetchResponse`]s
//!
//! ## Example
//!
//! ```no_run
//! use fedisync_client::{fetch_fn, EntityClient, EntityOptions, RestClient};
//! use fedisync_store::{EntityKind, Store};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let rest = RestClient::new("https://social.example")?.with_token("secret");
//! let client = EntityClient::new(Store::new());
//!
//! let status = client.entity(
//!     EntityKind::STATUSES,
//!     "109",
//!     fetch_fn(move || {
//!         let rest = rest.clone();
//!         async move { rest.get("/api/v1/statuses/109").await }
//!     }),
//!     EntityOptions::default(),
//! );
//! let entity = status.fetch().await?;
//! println!("{entity:?}");
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod client;
mod error;
mod fetch;
pub mod hooks;
mod inflight;
mod reconciler;
mod rest;
mod schema;

pub use client::EntityClient;
pub use error::{FetchError, FetchResult, HookError, HookResult, HttpError, ValidationError};
pub use fetch::{
    fetch_fn, id_fetch_fn, ids_fetch_fn, page_fetch_fn, parse_link_header, submit_fn, FetchFn,
    FetchFuture, FetchResponse, IdFetchFn, IdsFetchFn, Links, PageFetchFn, SubmitFn,
};
pub use hooks::{
    BatchHook, CreateHook, CreateOptions, DeleteHook, DeleteOptions, EntityHook, EntityOptions,
    HookState, ListHook, ListOptions, LookupHook, TransactionHook,
};
pub use inflight::{InFlight, RequestKey};
pub use reconciler::{ApplyOutcome, Reconciler, ReconcilerConfig, ReconcilerStats};
pub use rest::RestClient;
pub use schema::{any_entity, AnyEntity, Schema, Typed};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
