//! Wire codec for the Flutter daemon protocol
//!
//! The daemon wraps every message in a single-element JSON array
//! (`[{...}]`) so that protocol traffic can be told apart from ordinary
//! output on the same stream. Any line that is not exactly that shape is
//! passed through as plain text.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use fbridge_core::prelude::*;

/// An outgoing request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaemonRequest {
    pub id: u64,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl DaemonRequest {
    pub fn new(id: u64, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            id,
            method: method.into(),
            params,
        }
    }
}

/// An incoming message before it is routed
///
/// A well-formed message carries an `id` (response), an `event`
/// (notification), or in theory both; the router checks each independently.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WireMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
}

impl WireMessage {
    /// Get a human-readable summary of this message
    pub fn summary(&self) -> String {
        match (&self.id, &self.event) {
            (_, Some(event)) => format!("Event: {}", event),
            (Some(id), None) if self.error.is_some() => format!("Response #{}: error", id),
            (Some(id), None) => format!("Response #{}: ok", id),
            (None, None) => "Message without id or event".to_string(),
        }
    }
}

/// A response matched to a request
#[derive(Debug, Clone, PartialEq)]
pub struct DaemonResponse {
    pub id: u64,
    pub result: Option<Value>,
    pub error: Option<Value>,
}

impl DaemonResponse {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Outcome of decoding one stdout line
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedLine {
    /// Not protocol traffic, destined for the output log
    Passthrough(String),
    /// A protocol message
    Message(WireMessage),
    /// Array-of-one-object shape, but the object has the wrong field types
    Malformed { line: String, reason: String },
}

/// Decode a single line of daemon stdout
///
/// The line is parsed as JSON and must be an array holding exactly one
/// object. Everything else, including JSON that merely looks bracketed, is
/// passthrough text.
pub fn decode_line(line: &str) -> DecodedLine {
    let trimmed = line.trim();
    if !(trimmed.starts_with("[{") && trimmed.ends_with("}]")) {
        return DecodedLine::Passthrough(line.to_string());
    }

    let object = match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::Array(mut items)) if items.len() == 1 && items[0].is_object() => items.remove(0),
        Ok(_) | Err(_) => return DecodedLine::Passthrough(line.to_string()),
    };

    match serde_json::from_value::<WireMessage>(object) {
        Ok(message) => DecodedLine::Message(message),
        Err(e) => DecodedLine::Malformed {
            line: trimmed.to_string(),
            reason: e.to_string(),
        },
    }
}

/// Encode a request as a protocol line: `[` + request JSON + `]` + `\n`
pub fn encode_request(request: &DaemonRequest) -> Result<String> {
    let json = serde_json::to_string(request)?;
    Ok(format!("[{}]\n", json))
}
