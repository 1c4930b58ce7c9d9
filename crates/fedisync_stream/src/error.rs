//! Error types for streaming connections.

use thiserror::Error;

/// Result type for streaming operations.
pub type StreamResult<T> = Result<T, StreamError>;

/// Errors that can occur while opening or reading a stream.
#[derive(Error, Debug, Clone)]
pub enum StreamError {
    /// Network or transport error.
    #[error("transport error: {message}")]
    Transport {
        /// Error message.
        message: String,
        /// Whether reconnecting may help.
        retryable: bool,
    },

    /// The streaming URL could not be built.
    #[error("invalid streaming url: {0}")]
    InvalidUrl(String),

    /// The server refused the credential.
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Opening the channel timed out.
    #[error("connect timed out")]
    Timeout,

    /// The channel was closed by the peer.
    #[error("channel closed")]
    Closed,
}

impl StreamError {
    /// Creates a retryable transport error.
    pub fn transport_retryable(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: true,
        }
    }

    /// Creates a non-retryable transport error.
    pub fn transport_fatal(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: false,
        }
    }

    /// Returns true if reconnecting may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            StreamError::Transport { retryable, .. } => *retryable,
            StreamError::Timeout | StreamError::Closed => true,
            StreamError::InvalidUrl(_) | StreamError::AuthenticationFailed(_) => false,
        }
    }
}

impl From<fedisync_protocol::ProtocolError> for StreamError {
    fn from(err: fedisync_protocol::ProtocolError) -> Self {
        StreamError::InvalidUrl(err.to_string())
    }
}
