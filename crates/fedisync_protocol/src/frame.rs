//! Streaming text frames.
//!
//! Every message on the push channel is a UTF-8 JSON object shaped
//! `{"event": "<name>", "payload": "<string-encoded JSON>"}`. The payload
//! is JSON encoded a second time, so decoding is a two step process:
//! [`StreamFrame::parse`] reads the envelope and
//! [`StreamFrame::payload_as`] decodes the inner document.

use crate::error::{ProtocolError, ProtocolResult};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// A raw frame received from the streaming endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamFrame {
    /// Event discriminator (e.g. `update`, `notification`).
    pub event: String,
    /// String-encoded JSON payload. Some events (e.g. `filters_changed`)
    /// carry none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,
    /// Streams the event was published on, when the server reports them.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stream: Vec<String>,
}

impl StreamFrame {
    /// Creates a frame with the given event and pre-encoded payload.
    pub fn new(event: impl Into<String>, payload: Option<String>) -> Self {
        Self {
            event: event.into(),
            payload,
            stream: Vec::new(),
        }
    }

    /// Creates a frame whose payload is `value` encoded as a JSON string.
    pub fn with_json<T: Serialize>(event: impl Into<String>, value: &T) -> ProtocolResult<Self> {
        let event = event.into();
        let payload = serde_json::to_string(value)
            .map_err(|e| ProtocolError::payload(event.clone(), e))?;
        Ok(Self::new(event, Some(payload)))
    }

    /// Parses the outer envelope of a text frame.
    pub fn parse(text: &str) -> ProtocolResult<Self> {
        serde_json::from_str(text).map_err(|e| ProtocolError::MalformedFrame(e.to_string()))
    }

    /// Encodes the frame back to its wire form.
    pub fn encode(&self) -> ProtocolResult<String> {
        serde_json::to_string(self).map_err(|e| ProtocolError::MalformedFrame(e.to_string()))
    }

    /// Returns the raw payload or an error if the event carried none.
    pub fn require_payload(&self) -> ProtocolResult<&str> {
        self.payload
            .as_deref()
            .ok_or_else(|| ProtocolError::MissingPayload(self.event.clone()))
    }

    /// Decodes the string-encoded payload into `T`.
    pub fn payload_as<T: DeserializeOwned>(&self) -> ProtocolResult<T> {
        let raw = self.require_payload()?;
        serde_json::from_str(raw).map_err(|e| ProtocolError::payload(self.event.clone(), e))
    }
}
