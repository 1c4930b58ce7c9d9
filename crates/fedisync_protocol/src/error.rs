//! Error types for protocol parsing.

use thiserror::Error;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors that can occur while decoding streaming frames.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProtocolError {
    /// The outer frame is not a valid `{event, payload}` object.
    #[error("malformed frame: {0}")]
    MalformedFrame(String),

    /// The frame payload could not be decoded for its event.
    #[error("malformed payload for event {event}: {message}")]
    MalformedPayload {
        /// Event name carried by the frame.
        event: String,
        /// Decoder message.
        message: String,
    },

    /// The event requires a payload but none was sent.
    #[error("missing payload for event {0}")]
    MissingPayload(String),

    /// The streaming base URL could not be parsed.
    #[error("invalid streaming url {url}: {message}")]
    InvalidUrl {
        /// The offending URL.
        url: String,
        /// Parser message.
        message: String,
    },

    /// A topic string did not name a known stream.
    #[error("unknown topic: {0}")]
    UnknownTopic(String),
}

impl ProtocolError {
    /// Creates a payload error for the given event.
    pub fn payload(event: impl Into<String>, message: impl ToString) -> Self {
        Self::MalformedPayload {
            event: event.into(),
            message: message.to_string(),
        }
    }
}
