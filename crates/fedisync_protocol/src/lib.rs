//! # fedisync Protocol
//!
//! Wire types for the streaming API.
//!
//! This crate provides:
//! - `StreamFrame` for the `{event, payload}` text frames
//! - `StreamEvent` for typed push events
//! - `Topic` and streaming URL construction
//! - `ServerErrorBody` for structured REST error bodies
//!
//! This is a pure protocol crate with no I/O operations.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod event;
mod frame;
mod server_error;
mod topic;

pub use error::{ProtocolError, ProtocolResult};
pub use event::{
    FollowCounters, FollowRelationshipsUpdate, FollowState, Marker, StreamEvent,
};
pub use frame::StreamFrame;
pub use server_error::ServerErrorBody;
pub use topic::{streaming_url, Topic};
