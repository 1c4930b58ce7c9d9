//! Transport layer abstraction for streaming connections.

use crate::error::{StreamError, StreamResult};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use url::Url;

/// Parameters for opening one channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectRequest {
    /// Full streaming URL, topic parameters included.
    pub url: Url,
    /// Credential sent as the WebSocket sub-protocol.
    pub protocol: Option<String>,
}

/// One message read from a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelMessage {
    /// A text frame.
    Text(String),
    /// A binary frame.
    Binary(Vec<u8>),
    /// A ping or pong.
    Ping,
    /// The peer closed the channel.
    Close,
}

/// A stream transport opens push channels to the server.
///
/// This trait abstracts the network layer, allowing for different
/// implementations (WebSocket, mock for testing, etc.).
#[async_trait]
pub trait StreamTransport: Send + Sync {
    /// Opens a channel.
    async fn open(&self, request: &ConnectRequest) -> StreamResult<Box<dyn StreamChannel>>;
}

/// An open push channel.
#[async_trait]
pub trait StreamChannel: Send {
    /// Waits for the next message. `None` means the channel has ended.
    async fn next_message(&mut self) -> Option<StreamResult<ChannelMessage>>;

    /// Closes the channel.
    async fn close(&mut self) -> StreamResult<()>;
}

enum Scripted {
    Accept(MockChannel),
    Refuse(StreamError),
}

#[derive(Default)]
struct MockState {
    script: Mutex<VecDeque<Scripted>>,
    requests: Mutex<Vec<ConnectRequest>>,
}

/// A scripted transport for testing.
///
/// Each call to [`open`](StreamTransport::open) consumes the next scripted
/// outcome. With nothing scripted, the open fails with a retryable error.
#[derive(Clone, Default)]
pub struct MockTransport {
    state: Arc<MockState>,
}

impl MockTransport {
    /// Creates a new mock transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts the next open to succeed and returns the server side.
    pub fn accept(&self) -> MockPeer {
        let (tx, rx) = mpsc::unbounded_channel();
        let closed = Arc::new(AtomicBool::new(false));
        let channel = MockChannel {
            rx,
            closed: Arc::clone(&closed),
        };
        self.state.script.lock().push_back(Scripted::Accept(channel));
        MockPeer { tx, closed }
    }

    /// Scripts the next open to fail.
    pub fn refuse(&self, error: StreamError) {
        self.state.script.lock().push_back(Scripted::Refuse(error));
    }

    /// Returns every request seen so far.
    pub fn requests(&self) -> Vec<ConnectRequest> {
        self.state.requests.lock().clone()
    }

    /// Returns how many opens were attempted.
    pub fn open_count(&self) -> usize {
        self.state.requests.lock().len()
    }
}

#[async_trait]
impl StreamTransport for MockTransport {
    async fn open(&self, request: &ConnectRequest) -> StreamResult<Box<dyn StreamChannel>> {
        self.state.requests.lock().push(request.clone());
        let next = self.state.script.lock().pop_front();
        match next {
            Some(Scripted::Accept(channel)) => Ok(Box::new(channel)),
            Some(Scripted::Refuse(error)) => Err(error),
            None => Err(StreamError::transport_retryable("connection refused")),
        }
    }
}

struct MockChannel {
    rx: mpsc::UnboundedReceiver<ChannelMessage>,
    closed: Arc<AtomicBool>,
}

#[async_trait]
impl StreamChannel for MockChannel {
    async fn next_message(&mut self) -> Option<StreamResult<ChannelMessage>> {
        self.rx.recv().await.map(Ok)
    }

    async fn close(&mut self) -> StreamResult<()> {
        self.closed.store(true, Ordering::SeqCst);
        self.rx.close();
        Ok(())
    }
}

/// Server side of a scripted [`MockTransport`] channel.
///
/// Dropping the peer ends the channel.
#[derive(Debug)]
pub struct MockPeer {
    tx: mpsc::UnboundedSender<ChannelMessage>,
    closed: Arc<AtomicBool>,
}

impl MockPeer {
    /// Pushes a text frame. Returns false if the client side is gone.
    pub fn send_text(&self, text: impl Into<String>) -> bool {
        self.send(ChannelMessage::Text(text.into()))
    }

    /// Pushes any message.
    pub fn send(&self, message: ChannelMessage) -> bool {
        self.tx.send(message).is_ok()
    }

    /// Sends a close frame.
    pub fn close(&self) {
        let _ = self.tx.send(ChannelMessage::Close);
    }

    /// Returns true if the client closed the channel.
    pub fn client_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}
