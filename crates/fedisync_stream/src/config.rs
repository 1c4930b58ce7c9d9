//! Configuration for streaming connections.

use crate::jitter::{Jitter, JitterPolicy};
use std::time::Duration;

/// Configuration for streaming connections.
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// Base URL of the streaming server (e.g., "wss://streaming.example.com").
    pub streaming_base_url: String,
    /// Timeout for opening a channel.
    pub connect_timeout: Duration,
    /// Reconnect backoff.
    pub retry: RetryConfig,
    /// Fallback polling schedule.
    pub polling: PollingConfig,
    /// Jitter source for backoff and polling.
    pub jitter: JitterPolicy,
}

impl StreamConfig {
    /// Creates a new stream configuration.
    pub fn new(streaming_base_url: impl Into<String>) -> Self {
        Self {
            streaming_base_url: streaming_base_url.into(),
            connect_timeout: Duration::from_secs(10),
            retry: RetryConfig::default(),
            polling: PollingConfig::default(),
            jitter: JitterPolicy::default(),
        }
    }

    /// Sets the connect timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the retry configuration.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Sets the fallback polling schedule.
    pub fn with_polling(mut self, polling: PollingConfig) -> Self {
        self.polling = polling;
        self
    }

    /// Sets the jitter policy.
    pub fn with_jitter(mut self, jitter: JitterPolicy) -> Self {
        self.jitter = jitter;
        self
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self::new("")
    }
}

/// Configuration for reconnect behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of consecutive failed attempts before giving up.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Maximum delay between retries.
    pub max_delay: Duration,
    /// Multiplier for exponential backoff.
    pub backoff_multiplier: f64,
    /// Whether to add jitter to delays.
    pub add_jitter: bool,
}

impl RetryConfig {
    /// Creates a new retry configuration.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            add_jitter: true,
        }
    }

    /// Creates a configuration that never reconnects.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 0,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            backoff_multiplier: 1.0,
            add_jitter: false,
        }
    }

    /// Sets the initial delay.
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Sets the maximum delay.
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Sets the backoff multiplier. Values that are negative or NaN give
    /// zero delays.
    pub fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    /// Enables or disables jitter.
    pub fn with_jitter(mut self, add_jitter: bool) -> Self {
        self.add_jitter = add_jitter;
        self
    }

    /// Calculates the delay before retry `attempt` (1-indexed; 0 is immediate).
    ///
    /// Jitter adds up to 25% on top of the capped exponential delay.
    pub fn delay_for_attempt(&self, attempt: u32, jitter: &mut dyn Jitter) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
        let base_delay = self.initial_delay.as_secs_f64() * self.backoff_multiplier.powi(exponent);
        // f64::min would turn NaN into the cap, so NaN is zeroed first.
        let capped = if base_delay.is_nan() {
            0.0
        } else {
            base_delay.min(self.max_delay.as_secs_f64())
        };
        let delay = Duration::try_from_secs_f64(capped).unwrap_or(Duration::ZERO);

        if self.add_jitter {
            delay + jitter.sample(delay / 4)
        } else {
            delay
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::new(10)
    }
}

/// Schedule of the fallback poller used while the channel is down.
#[derive(Debug, Clone)]
pub struct PollingConfig {
    /// Upper bound of the random delay before the first poll.
    pub first_poll_max_jitter: Duration,
    /// Fixed part of the delay between later polls.
    pub interval: Duration,
    /// Upper bound of the random part of the delay between later polls.
    pub interval_max_jitter: Duration,
}

impl PollingConfig {
    /// Delay before the first poll after a disconnect.
    pub fn first_delay(&self, jitter: &mut dyn Jitter) -> Duration {
        jitter.sample(self.first_poll_max_jitter)
    }

    /// Delay between two polls.
    pub fn next_delay(&self, jitter: &mut dyn Jitter) -> Duration {
        self.interval + jitter.sample(self.interval_max_jitter)
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            first_poll_max_jitter: Duration::from_secs(40),
            interval: Duration::from_secs(20),
            interval_max_jitter: Duration::from_secs(20),
        }
    }
}
