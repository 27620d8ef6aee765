//! Domain event definitions

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::device::Device;
use crate::error::{Error, Result};

// ─────────────────────────────────────────────────────────
// Process Events
// ─────────────────────────────────────────────────────────

/// Raw events produced by the daemon process tasks
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DaemonEvent {
    /// A complete line from stdout
    Stdout(String),
    /// A complete line from stderr
    Stderr(String),
    /// The process exited (code is `None` when killed by a signal or wait failed)
    Exited { code: Option<i32> },
}

// ─────────────────────────────────────────────────────────
// Event Payloads
// ─────────────────────────────────────────────────────────

/// Connected event - sent when daemon is ready
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DaemonConnected {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub pid: Option<u32>,
}

/// Log message from the daemon itself
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DaemonLogMessage {
    #[serde(default)]
    pub level: Option<String>,
    pub message: String,
    #[serde(default)]
    pub stack_trace: Option<String>,
}

// ─────────────────────────────────────────────────────────
// Known Events
// ─────────────────────────────────────────────────────────

/// Event names the client consumes
pub mod names {
    pub const DAEMON_CONNECTED: &str = "daemon.connected";
    pub const DAEMON_LOG_MESSAGE: &str = "daemon.logMessage";
    pub const DEVICE_ADDED: &str = "device.added";
    pub const DEVICE_REMOVED: &str = "device.removed";
}

/// Typed daemon event
///
/// Known event names map to their own variant so that every handler is
/// checked at compile time; anything else lands in `Unhandled`.
#[derive(Debug, Clone)]
pub enum DaemonMessage {
    DaemonConnected(DaemonConnected),
    DaemonLogMessage(DaemonLogMessage),
    DeviceAdded(Device),
    DeviceRemoved(Device),
    Unhandled { event: String },
}

impl DaemonMessage {
    /// Build a typed event from its name and (optional) params
    ///
    /// Known events whose params do not match the expected shape produce
    /// [`Error::MalformedMessage`]. Unknown names are not an error.
    pub fn from_event(event: &str, params: Option<Value>) -> Result<Self> {
        let params = match params {
            Some(Value::Null) | None => Value::Object(Default::default()),
            Some(value) => value,
        };

        let message = match event {
            names::DAEMON_CONNECTED => {
                DaemonMessage::DaemonConnected(decode_params(event, params)?)
            }
            names::DAEMON_LOG_MESSAGE => {
                DaemonMessage::DaemonLogMessage(decode_params(event, params)?)
            }
            names::DEVICE_ADDED => DaemonMessage::DeviceAdded(decode_params(event, params)?),
            names::DEVICE_REMOVED => DaemonMessage::DeviceRemoved(decode_params(event, params)?),
            _ => DaemonMessage::Unhandled {
                event: event.to_string(),
            },
        };
        Ok(message)
    }

    /// Get a human-readable summary
    pub fn summary(&self) -> String {
        match self {
            DaemonMessage::DaemonConnected(c) => match &c.version {
                Some(version) => format!("Daemon connected (v{})", version),
                None => "Daemon connected".to_string(),
            },
            DaemonMessage::DaemonLogMessage(m) => match &m.level {
                Some(level) => format!("[{}] {}", level, m.message),
                None => m.message.clone(),
            },
            DaemonMessage::DeviceAdded(d) => format!("Device added: {} ({})", d.name, d.platform),
            DaemonMessage::DeviceRemoved(d) => format!("Device removed: {}", d.name),
            DaemonMessage::Unhandled { event } => format!("Unhandled event: {}", event),
        }
    }
}

fn decode_params<T: serde::de::DeserializeOwned>(event: &str, params: Value) -> Result<T> {
    serde_json::from_value(params)
        .map_err(|e| Error::malformed(format!("invalid params for {}: {}", event, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_device_added_parses() {
        let msg = DaemonMessage::from_event(
            "device.added",
            Some(json!({"id": "d1", "name": "Pixel", "platform": "android-arm64"})),
        )
        .unwrap();
        match msg {
            DaemonMessage::DeviceAdded(device) => {
                assert_eq!(device, Device::new("d1", "Pixel", "android-arm64"))
            }
            other => panic!("expected DeviceAdded, got {:?}", other),
        }
    }

    #[test]
    fn test_connected_without_params() {
        let msg = DaemonMessage::from_event("daemon.connected", None).unwrap();
        assert!(matches!(msg, DaemonMessage::DaemonConnected(_)));
    }

    #[test]
    fn test_log_message_requires_message() {
        let err = DaemonMessage::from_event("daemon.logMessage", Some(json!({"level": "status"})))
            .unwrap_err();
        assert!(matches!(err, Error::MalformedMessage { .. }));
    }

    #[test]
    fn test_device_removed_without_params_is_malformed() {
        let err = DaemonMessage::from_event("device.removed", None).unwrap_err();
        assert!(matches!(err, Error::MalformedMessage { .. }));
    }

    #[test]
    fn test_unknown_event_is_unhandled() {
        let msg = DaemonMessage::from_event("app.progress", Some(json!({"id": "x"}))).unwrap();
        match msg {
            DaemonMessage::Unhandled { event } => assert_eq!(event, "app.progress"),
            other => panic!("expected Unhandled, got {:?}", other),
        }
    }

    #[test]
    fn test_summary() {
        let msg = DaemonMessage::DeviceRemoved(Device::new("d1", "Pixel", "android"));
        assert_eq!(msg.summary(), "Device removed: Pixel");
    }
}
