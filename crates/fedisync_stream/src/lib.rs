//! # fedisync Stream
//!
//! Connection manager for server push streams.
//!
//! This crate provides:
//! - Connection lifecycle (connecting → connected → disconnected ⇄ reconnecting → closed)
//! - Reconnect with exponential backoff
//! - Jittered REST fallback polling while the channel is down
//! - Transport abstraction with WebSocket and mock implementations
//!
//! ## Key Invariants
//!
//! - The credential is only ever sent as the WebSocket sub-protocol
//! - At most one fallback timer exists per connection
//! - A failing or panicking handler never tears down the connection
//! - The manager knows nothing about the cache; handlers decide what a frame means

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod connection;
mod error;
mod jitter;
mod polling;
mod state;
mod transport;
mod websocket;

pub use config::{PollingConfig, RetryConfig, StreamConfig};
pub use connection::{ConnectionInfo, StreamHandle, StreamHandler, StreamManager, Subscription};
pub use error::{StreamError, StreamResult};
pub use jitter::{FixedJitter, Jitter, JitterPolicy, NoJitter, SeededJitter};
pub use polling::{poll_fn, FallbackPoller, PollFn};
pub use state::{ConnectionState, StreamStats};
pub use transport::{
    ChannelMessage, ConnectRequest, MockPeer, MockTransport, StreamChannel, StreamTransport,
};
pub use websocket::WebSocketTransport;
