//! Stream connection manager.
//!
//! A connection runs as one tokio task that owns the channel. It reopens the
//! channel with exponential backoff and, while the channel is down, drives a
//! [`FallbackPoller`] so the caller keeps receiving updates over REST.
//!
//! Lifecycle: `Connecting → Connected → (Disconnected ⇄ Reconnecting) → Closed`.

use crate::config::{RetryConfig, StreamConfig};
use crate::error::StreamError;
use crate::jitter::Jitter;
use crate::polling::{FallbackPoller, PollFn};
use crate::state::{ConnectionState, StreamStats};
use crate::transport::{ChannelMessage, ConnectRequest, StreamChannel, StreamTransport};
use fedisync_protocol::{streaming_url, Topic};
use parking_lot::Mutex;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, trace, warn};
use url::Url;

/// Callbacks of one subscription.
///
/// Callbacks run on the connection task and must not block.
pub trait StreamHandler: Send + Sync {
    /// The channel opened.
    fn on_connect(&self) {}

    /// The channel was lost or closed.
    fn on_disconnect(&self) {}

    /// A text frame arrived.
    fn on_receive(&self, connection: &ConnectionInfo, message: &str);
}

/// Identifies the connection a frame arrived on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionInfo {
    /// Subscribed topic.
    pub topic: Topic,
    /// Streaming URL.
    pub url: Url,
}

/// What to subscribe to and who receives the frames.
#[derive(Clone)]
pub struct Subscription {
    /// Stream topic.
    pub topic: Topic,
    /// Access token, sent as the WebSocket sub-protocol.
    pub credential: Option<String>,
    /// Receiver of lifecycle callbacks and frames.
    pub handler: Arc<dyn StreamHandler>,
}

impl Subscription {
    /// Creates an unauthenticated subscription.
    pub fn new(topic: Topic, handler: Arc<dyn StreamHandler>) -> Self {
        Self {
            topic,
            credential: None,
            handler,
        }
    }

    /// Sets the credential.
    pub fn with_credential(mut self, credential: impl Into<String>) -> Self {
        self.credential = Some(credential.into());
        self
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("topic", &self.topic)
            .field("credential", &self.credential.as_ref().map(|_| "<redacted>"))
            .finish_non_exhaustive()
    }
}

/// Opens streaming connections.
pub struct StreamManager {
    config: StreamConfig,
    transport: Arc<dyn StreamTransport>,
}

impl StreamManager {
    /// Creates a manager over `transport`.
    pub fn new(config: StreamConfig, transport: impl StreamTransport + 'static) -> Self {
        Self::with_transport(config, Arc::new(transport))
    }

    /// Creates a manager over a shared transport.
    pub fn with_transport(config: StreamConfig, transport: Arc<dyn StreamTransport>) -> Self {
        Self { config, transport }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// Opens a connection for `subscription`.
    ///
    /// With `polling`, the function is run on a jittered schedule whenever
    /// the channel is down, and once right after every reconnect.
    ///
    /// If the streaming URL cannot be built, the failure is logged and an
    /// inert, already closed handle is returned.
    ///
    /// Must be called from within a tokio runtime.
    pub fn connect(&self, subscription: Subscription, polling: Option<PollFn>) -> StreamHandle {
        let url = match streaming_url(&self.config.streaming_base_url, &subscription.topic) {
            Ok(url) => url,
            Err(e) => {
                error!(topic = %subscription.topic, error = %e, "cannot open stream; continuing without push");
                return StreamHandle::inert(StreamError::from(e));
            }
        };

        let shared = Arc::new(Shared {
            state: watch::channel(ConnectionState::Connecting).0,
            stats: Mutex::new(StreamStats::default()),
        });
        let poller = polling.map(|poll| {
            Arc::new(FallbackPoller::new(
                poll,
                self.config.polling.clone(),
                self.config.jitter.build(),
            ))
        });
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let connection = Connection {
            transport: Arc::clone(&self.transport),
            request: ConnectRequest {
                url: url.clone(),
                protocol: subscription.credential,
            },
            info: ConnectionInfo {
                topic: subscription.topic,
                url,
            },
            handler: subscription.handler,
            retry: self.config.retry.clone(),
            connect_timeout: self.config.connect_timeout,
            jitter: self.config.jitter.build(),
            poller: poller.clone(),
            shared: Arc::clone(&shared),
            shutdown: shutdown_rx,
        };
        debug!(topic = %connection.info.topic, url = %connection.info.url, "opening stream");
        tokio::spawn(connection.run());

        StreamHandle {
            shared,
            shutdown: shutdown_tx,
            poller,
        }
    }
}

struct Shared {
    state: watch::Sender<ConnectionState>,
    stats: Mutex<StreamStats>,
}

impl Shared {
    fn set_state(&self, state: ConnectionState) {
        let previous = self.state.send_replace(state);
        if previous != state {
            trace!(from = %previous, to = %state, "stream state");
        }
    }
}

/// Handle to a running connection.
///
/// [`disconnect`](Self::disconnect) closes the channel and cancels fallback
/// polling. Dropping the handle does the same.
pub struct StreamHandle {
    shared: Arc<Shared>,
    shutdown: watch::Sender<bool>,
    poller: Option<Arc<FallbackPoller>>,
}

impl StreamHandle {
    fn inert(error: StreamError) -> Self {
        let stats = StreamStats {
            last_error: Some(error.to_string()),
            ..StreamStats::default()
        };
        Self {
            shared: Arc::new(Shared {
                state: watch::channel(ConnectionState::Closed).0,
                stats: Mutex::new(stats),
            }),
            shutdown: watch::channel(true).0,
            poller: None,
        }
    }

    /// Closes the channel and cancels any pending fallback poll.
    pub fn disconnect(&self) {
        self.shutdown.send_replace(true);
        if let Some(poller) = &self.poller {
            poller.cancel();
        }
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.shared.state.borrow()
    }

    /// Subscribes to state transitions.
    pub fn state_changes(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state.subscribe()
    }

    /// Waits until the connection reaches `Closed`.
    pub async fn closed(&self) {
        let mut changes = self.state_changes();
        let _ = changes.wait_for(ConnectionState::is_terminal).await;
    }

    /// Returns true while fallback polling is scheduled.
    pub fn is_polling(&self) -> bool {
        self.poller.as_ref().map_or(false, |p| p.is_scheduled())
    }

    /// Snapshot of the connection statistics.
    pub fn stats(&self) -> StreamStats {
        let mut stats = self.shared.stats.lock().clone();
        stats.polls = self.poller.as_ref().map_or(0, |p| p.polls());
        stats
    }
}

impl Drop for StreamHandle {
    fn drop(&mut self) {
        self.disconnect();
    }
}

impl std::fmt::Debug for StreamHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamHandle")
            .field("state", &self.state())
            .field("polling", &self.is_polling())
            .finish()
    }
}

struct Connection {
    transport: Arc<dyn StreamTransport>,
    request: ConnectRequest,
    info: ConnectionInfo,
    handler: Arc<dyn StreamHandler>,
    retry: RetryConfig,
    connect_timeout: Duration,
    jitter: Box<dyn Jitter>,
    poller: Option<Arc<FallbackPoller>>,
    shared: Arc<Shared>,
    shutdown: watch::Receiver<bool>,
}

impl Connection {
    async fn run(mut self) {
        let mut attempt: u32 = 0;
        let mut was_connected = false;

        loop {
            let open = tokio::time::timeout(self.connect_timeout, self.transport.open(&self.request));
            let opened = match or_shutdown(&mut self.shutdown, open).await {
                None => break,
                Some(Ok(result)) => result,
                Some(Err(_elapsed)) => Err(StreamError::Timeout),
            };

            match opened {
                Ok(channel) => {
                    attempt = 0;
                    self.opened(was_connected);
                    was_connected = true;
                    let shutdown = self.read(channel).await;
                    self.lost(shutdown);
                    if shutdown {
                        break;
                    }
                }
                Err(e) => {
                    warn!(topic = %self.info.topic, attempt, error = %e, "stream open failed");
                    {
                        let mut stats = self.shared.stats.lock();
                        stats.failed_attempts += 1;
                        stats.last_error = Some(e.to_string());
                    }
                    if let Some(poller) = &self.poller {
                        if !poller.is_scheduled() {
                            poller.schedule();
                        }
                    }
                    if !e.is_retryable() {
                        error!(topic = %self.info.topic, error = %e, "stream cannot be opened; giving up");
                        break;
                    }
                }
            }

            attempt += 1;
            if attempt > self.retry.max_attempts {
                warn!(topic = %self.info.topic, attempts = self.retry.max_attempts, "reconnect attempts exhausted");
                break;
            }
            if was_connected {
                self.shared.set_state(ConnectionState::Reconnecting);
            }
            let delay = self.retry.delay_for_attempt(attempt, &mut *self.jitter);
            debug!(topic = %self.info.topic, attempt, ?delay, "reconnecting after backoff");
            if or_shutdown(&mut self.shutdown, tokio::time::sleep(delay)).await.is_none() {
                break;
            }
        }

        // A schedule may have raced with disconnect().
        if *self.shutdown.borrow() {
            if let Some(poller) = &self.poller {
                poller.cancel();
            }
        }
        self.shared.set_state(ConnectionState::Closed);
        info!(topic = %self.info.topic, "stream closed");
    }

    fn opened(&self, reconnected: bool) {
        if let Some(poller) = &self.poller {
            if reconnected {
                poller.poll_now();
            } else {
                poller.cancel();
            }
        }
        {
            let mut stats = self.shared.stats.lock();
            stats.connects += 1;
            if reconnected {
                stats.reconnects += 1;
            }
        }
        self.shared.set_state(ConnectionState::Connected);
        info!(topic = %self.info.topic, reconnected, "stream connected");
        self.contain("on_connect", || self.handler.on_connect());
    }

    /// Reads until the channel ends. Returns true if shutdown was requested.
    async fn read(&mut self, mut channel: Box<dyn StreamChannel>) -> bool {
        loop {
            let next = match or_shutdown(&mut self.shutdown, channel.next_message()).await {
                Some(next) => next,
                None => {
                    if let Err(e) = channel.close().await {
                        debug!(error = %e, "close failed");
                    }
                    return true;
                }
            };

            match next {
                Some(Ok(ChannelMessage::Text(text))) => self.dispatch(&text),
                Some(Ok(ChannelMessage::Binary(data))) => {
                    trace!(len = data.len(), "ignoring binary frame");
                }
                Some(Ok(ChannelMessage::Ping)) => {}
                Some(Ok(ChannelMessage::Close)) | None => {
                    debug!(topic = %self.info.topic, "channel closed by server");
                    return false;
                }
                Some(Err(e)) => {
                    warn!(topic = %self.info.topic, error = %e, "channel error");
                    self.shared.stats.lock().last_error = Some(e.to_string());
                    return false;
                }
            }
        }
    }

    fn lost(&self, shutdown: bool) {
        self.shared.stats.lock().disconnects += 1;
        self.shared.set_state(ConnectionState::Disconnected);
        info!(topic = %self.info.topic, "stream disconnected");
        self.contain("on_disconnect", || self.handler.on_disconnect());

        if !shutdown {
            if let Some(poller) = &self.poller {
                poller.schedule();
            }
        }
    }

    fn dispatch(&self, text: &str) {
        self.shared.stats.lock().frames_received += 1;
        self.contain("on_receive", || self.handler.on_receive(&self.info, text));
    }

    fn contain(&self, callback: &'static str, f: impl FnOnce()) {
        if panic::catch_unwind(AssertUnwindSafe(f)).is_err() {
            self.shared.stats.lock().handler_panics += 1;
            error!(topic = %self.info.topic, callback, "stream handler panicked");
        }
    }
}

/// Runs `fut` unless shutdown is signalled first.
async fn or_shutdown<F: Future>(shutdown: &mut watch::Receiver<bool>, fut: F) -> Option<F::Output> {
    if *shutdown.borrow() {
        return None;
    }
    tokio::select! {
        biased;
        _ = shutdown.changed() => None,
        out = fut => Some(out),
    }
}
