//! Structured error bodies returned by the REST API.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The JSON body of a non-2xx REST response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerErrorBody {
    /// Human-readable error message.
    pub error: String,
    /// Longer description, when the server provides one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_description: Option<String>,
    /// Per-field validation details.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl ServerErrorBody {
    /// Parses an error body, returning `None` if it is not structured.
    pub fn parse(body: &[u8]) -> Option<Self> {
        serde_json::from_slice(body).ok()
    }
}
