//! Connection lifecycle state and statistics.

use std::fmt;

/// The current state of a streaming connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Opening the channel for the first time.
    Connecting,
    /// The channel is open.
    Connected,
    /// The channel was lost; fallback polling may be running.
    Disconnected,
    /// Waiting for backoff or reopening after a loss.
    Reconnecting,
    /// Terminal: disconnected by the caller, or reconnects were exhausted.
    Closed,
}

impl ConnectionState {
    /// Returns true if the channel is open.
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }

    /// Returns true if the connection is still trying to (re)open.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            ConnectionState::Connecting | ConnectionState::Reconnecting
        )
    }

    /// Returns true if no further transitions will happen.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ConnectionState::Closed)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Reconnecting => "reconnecting",
            ConnectionState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Statistics about one streaming connection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamStats {
    /// Successful opens, the first one included.
    pub connects: u64,
    /// Successful opens after a loss.
    pub reconnects: u64,
    /// Channel losses.
    pub disconnects: u64,
    /// Failed open attempts.
    pub failed_attempts: u64,
    /// Text frames delivered to the handler.
    pub frames_received: u64,
    /// Frames whose handler panicked.
    pub handler_panics: u64,
    /// Fallback polls started.
    pub polls: u64,
    /// Last error message.
    pub last_error: Option<String>,
}
