//! REST fallback polling while the push channel is down.

use crate::config::PollingConfig;
use crate::jitter::Jitter;
use futures::future::{BoxFuture, FutureExt};
use parking_lot::Mutex;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

/// Caller-supplied function that re-fetches over REST.
pub type PollFn = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

/// Wraps an async closure as a [`PollFn`].
pub fn poll_fn<F, Fut>(f: F) -> PollFn
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    Arc::new(move || f().boxed())
}

/// Runs the poll function on a jittered schedule.
///
/// At most one timer task exists at a time: scheduling or polling now
/// always aborts the previous task first.
pub struct FallbackPoller {
    poll: PollFn,
    config: PollingConfig,
    jitter: Arc<Mutex<Box<dyn Jitter>>>,
    task: Mutex<Option<JoinHandle<()>>>,
    polls: Arc<AtomicU64>,
}

impl FallbackPoller {
    /// Creates an idle poller.
    pub fn new(poll: PollFn, config: PollingConfig, jitter: Box<dyn Jitter>) -> Self {
        Self {
            poll,
            config,
            jitter: Arc::new(Mutex::new(jitter)),
            task: Mutex::new(None),
            polls: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Starts the recurring schedule: a first poll after
    /// `[0, first_poll_max_jitter]`, then every `interval + jitter`.
    pub fn schedule(&self) {
        let first = self.config.first_delay(&mut **self.jitter.lock());
        debug!(first_poll_in = ?first, "fallback polling scheduled");

        let poll = Arc::clone(&self.poll);
        let config = self.config.clone();
        let jitter = Arc::clone(&self.jitter);
        let polls = Arc::clone(&self.polls);
        self.replace(tokio::spawn(async move {
            let mut delay = first;
            loop {
                tokio::time::sleep(delay).await;
                let n = polls.fetch_add(1, Ordering::SeqCst) + 1;
                trace!(poll = n, "fallback poll");
                (poll)().await;
                delay = config.next_delay(&mut **jitter.lock());
            }
        }));
    }

    /// Cancels any pending timer and runs one poll right away.
    pub fn poll_now(&self) {
        let poll = Arc::clone(&self.poll);
        let polls = Arc::clone(&self.polls);
        self.replace(tokio::spawn(async move {
            polls.fetch_add(1, Ordering::SeqCst);
            (poll)().await;
        }));
    }

    /// Cancels any pending timer.
    pub fn cancel(&self) {
        if let Some(task) = self.task.lock().take() {
            task.abort();
        }
    }

    /// Returns true if a recurring schedule or a poll is pending.
    pub fn is_scheduled(&self) -> bool {
        self.task
            .lock()
            .as_ref()
            .map_or(false, |task| !task.is_finished())
    }

    /// Number of polls started.
    pub fn polls(&self) -> u64 {
        self.polls.load(Ordering::SeqCst)
    }

    fn replace(&self, task: JoinHandle<()>) {
        if let Some(previous) = self.task.lock().replace(task) {
            previous.abort();
        }
    }
}

impl Drop for FallbackPoller {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl std::fmt::Debug for FallbackPoller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FallbackPoller")
            .field("config", &self.config)
            .field("polls", &self.polls())
            .field("scheduled", &self.is_scheduled())
            .finish()
    }
}
