//! Lifecycle tests for streaming connections over the mock transport.

use fedisync_protocol::Topic;
use fedisync_stream::{
    poll_fn, ConnectionInfo, ConnectionState, JitterPolicy, MockTransport, PollFn, RetryConfig,
    StreamConfig, StreamError, StreamHandler, StreamManager, Subscription,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<String>>,
}

impl Recorder {
    fn events(&self) -> Vec<String> {
        self.events.lock().clone()
    }

    fn count(&self, name: &str) -> usize {
        self.events.lock().iter().filter(|e| *e == name).count()
    }
}

impl StreamHandler for Recorder {
    fn on_connect(&self) {
        self.events.lock().push("connect".into());
    }

    fn on_disconnect(&self) {
        self.events.lock().push("disconnect".into());
    }

    fn on_receive(&self, connection: &ConnectionInfo, message: &str) {
        assert_eq!(connection.topic, Topic::User);
        if message == "boom" {
            panic!("handler failure");
        }
        self.events.lock().push(format!("recv:{message}"));
    }
}

fn counting_poll() -> (PollFn, Arc<AtomicU64>) {
    let calls = Arc::new(AtomicU64::new(0));
    let counter = Arc::clone(&calls);
    let poll = poll_fn(move || {
        let counter = Arc::clone(&counter);
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    });
    (poll, calls)
}

fn config() -> StreamConfig {
    StreamConfig::new("https://social.example")
        .with_jitter(JitterPolicy::Fixed(0.5))
        .with_retry(
            RetryConfig::new(5)
                .with_initial_delay(Duration::from_secs(30))
                .with_jitter(false),
        )
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(5)).await;
}

#[tokio::test(start_paused = true)]
async fn delivers_frames_and_sends_credential_as_subprotocol() {
    let transport = MockTransport::new();
    let peer = transport.accept();
    let recorder = Arc::new(Recorder::default());
    let manager = StreamManager::new(config(), transport.clone());

    let subscription = Subscription::new(Topic::User, recorder.clone()).with_credential("secret");
    let handle = manager.connect(subscription, None);
    settle().await;

    assert_eq!(handle.state(), ConnectionState::Connected);
    peer.send_text("one");
    peer.send_text("two");
    settle().await;

    assert_eq!(recorder.events(), vec!["connect", "recv:one", "recv:two"]);
    assert_eq!(handle.stats().frames_received, 2);

    let request = &transport.requests()[0];
    assert_eq!(request.protocol.as_deref(), Some("secret"));
    assert_eq!(
        request.url.as_str(),
        "wss://social.example/api/streaming/?stream=user"
    );
    assert!(!request.url.as_str().contains("secret"));
}

#[tokio::test(start_paused = true)]
async fn disconnect_polls_then_reconnect_stops_polling() {
    let transport = MockTransport::new();
    let first = transport.accept();
    let recorder = Arc::new(Recorder::default());
    let (poll, polls) = counting_poll();
    let manager = StreamManager::new(config(), transport.clone());

    let handle = manager.connect(Subscription::new(Topic::User, recorder.clone()), Some(poll));
    settle().await;
    assert_eq!(handle.state(), ConnectionState::Connected);
    assert!(!handle.is_polling());

    first.close();
    settle().await;
    assert_eq!(recorder.count("disconnect"), 1);
    assert_eq!(handle.state(), ConnectionState::Reconnecting);
    assert!(handle.is_polling());

    // First fallback poll lands inside [0, 40s]; the fixed jitter puts it at 20s.
    tokio::time::sleep(Duration::from_secs(20)).await;
    assert_eq!(polls.load(Ordering::SeqCst), 1);

    // Backoff reopens the channel at 30s; the reconnect polls once right away.
    let _second = transport.accept();
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(handle.state(), ConnectionState::Connected);
    assert_eq!(recorder.count("connect"), 2);
    assert_eq!(polls.load(Ordering::SeqCst), 2);

    tokio::time::sleep(Duration::from_secs(300)).await;
    assert_eq!(polls.load(Ordering::SeqCst), 2);
    assert!(!handle.is_polling());

    let stats = handle.stats();
    assert_eq!(stats.connects, 2);
    assert_eq!(stats.reconnects, 1);
    assert_eq!(stats.disconnects, 1);
    assert_eq!(stats.polls, 2);
}

#[tokio::test(start_paused = true)]
async fn handler_panic_is_contained_to_one_message() {
    let transport = MockTransport::new();
    let peer = transport.accept();
    let recorder = Arc::new(Recorder::default());
    let manager = StreamManager::new(config(), transport);

    let handle = manager.connect(Subscription::new(Topic::User, recorder.clone()), None);
    settle().await;

    peer.send_text("before");
    peer.send_text("boom");
    peer.send_text("after");
    settle().await;

    assert_eq!(handle.state(), ConnectionState::Connected);
    assert_eq!(recorder.events(), vec!["connect", "recv:before", "recv:after"]);
    let stats = handle.stats();
    assert_eq!(stats.frames_received, 3);
    assert_eq!(stats.handler_panics, 1);
}

#[tokio::test(start_paused = true)]
async fn exhausted_attempts_close_but_keep_polling() {
    let transport = MockTransport::new();
    let recorder = Arc::new(Recorder::default());
    let (poll, polls) = counting_poll();
    let config = config().with_retry(
        RetryConfig::new(2)
            .with_initial_delay(Duration::from_secs(1))
            .with_jitter(false),
    );
    let manager = StreamManager::new(config, transport.clone());

    let handle = manager.connect(Subscription::new(Topic::User, recorder.clone()), Some(poll));
    handle.closed().await;

    assert_eq!(transport.open_count(), 3);
    assert_eq!(handle.stats().failed_attempts, 3);
    assert_eq!(recorder.count("connect"), 0);
    assert!(handle.is_polling());

    tokio::time::sleep(Duration::from_secs(25)).await;
    assert!(polls.load(Ordering::SeqCst) >= 1);

    handle.disconnect();
    assert!(!handle.is_polling());
    let seen = polls.load(Ordering::SeqCst);
    tokio::time::sleep(Duration::from_secs(300)).await;
    assert_eq!(polls.load(Ordering::SeqCst), seen);
}

#[tokio::test(start_paused = true)]
async fn fatal_open_error_closes_immediately() {
    let transport = MockTransport::new();
    transport.refuse(StreamError::AuthenticationFailed("401 Unauthorized".into()));
    let manager = StreamManager::new(config(), transport.clone());

    let handle = manager.connect(
        Subscription::new(Topic::User, Arc::new(Recorder::default())),
        None,
    );
    handle.closed().await;

    assert_eq!(transport.open_count(), 1);
    assert!(handle
        .stats()
        .last_error
        .unwrap()
        .contains("authentication failed"));
}

#[tokio::test(start_paused = true)]
async fn disconnect_closes_channel_and_cancels_timer() {
    let transport = MockTransport::new();
    let peer = transport.accept();
    let recorder = Arc::new(Recorder::default());
    let (poll, polls) = counting_poll();
    let manager = StreamManager::new(config(), transport.clone());

    let handle = manager.connect(Subscription::new(Topic::User, recorder.clone()), Some(poll));
    settle().await;

    handle.disconnect();
    handle.closed().await;
    assert!(peer.client_closed());
    assert_eq!(handle.state(), ConnectionState::Closed);

    tokio::time::sleep(Duration::from_secs(300)).await;
    assert_eq!(polls.load(Ordering::SeqCst), 0);
    assert_eq!(transport.open_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn dropping_handle_disconnects() {
    let transport = MockTransport::new();
    let peer = transport.accept();
    let manager = StreamManager::new(config(), transport);

    let handle = manager.connect(
        Subscription::new(Topic::User, Arc::new(Recorder::default())),
        None,
    );
    settle().await;
    drop(handle);
    settle().await;

    assert!(peer.client_closed());
}

#[tokio::test]
async fn unusable_base_url_yields_inert_handle() {
    let manager = StreamManager::new(StreamConfig::new("not a url"), MockTransport::new());
    let handle = manager.connect(
        Subscription::new(Topic::Public, Arc::new(Recorder::default())),
        None,
    );

    assert_eq!(handle.state(), ConnectionState::Closed);
    assert!(handle.stats().last_error.is_some());
    handle.closed().await;
}
