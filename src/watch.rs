//! Watch mode - NDJSON event stream for editor integrations
//!
//! Follows the engine and prints one JSON object per line on stdout until
//! interrupted.
//!
//! ```json
//! {"event":"status","text":"Loading devices...","is_progress":true,"timestamp":1704700001000}
//! {"event":"discovery","state":"settled","timestamp":1704700002000}
//! {"event":"devices","current":"emulator-5554","devices":[...],"timestamp":1704700002000}
//! {"event":"notification","message":"Flutter SDK not found","timestamp":1704700003000}
//! ```

use std::io::{self, Write};

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, error, info};

use fbridge_app::{Discovery, Engine};
use fbridge_core::Device;

/// Events emitted in watch mode
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum WatchEvent {
    /// The status line changed
    Status {
        text: String,
        is_progress: bool,
        timestamp: i64,
    },

    /// Discovery progress changed
    Discovery { state: Discovery, timestamp: i64 },

    /// Device list after a discovery round settled
    Devices {
        current: Option<String>,
        devices: Vec<Device>,
        timestamp: i64,
    },

    /// A user-facing notification
    Notification { message: String, timestamp: i64 },
}

impl WatchEvent {
    /// Emit this event to stdout as one JSON line
    pub fn emit(&self) {
        let json = match serde_json::to_string(self) {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to serialize watch event: {}", e);
                return;
            }
        };

        let mut stdout = io::stdout().lock();
        if let Err(e) = writeln!(stdout, "{}", json) {
            error!("Failed to write watch event to stdout: {}", e);
            return;
        }
        if let Err(e) = stdout.flush() {
            error!("Failed to flush watch stdout: {}", e);
        }
    }

    fn now() -> i64 {
        Utc::now().timestamp_millis()
    }

    pub fn status(text: &str, is_progress: bool) -> Self {
        Self::Status {
            text: text.to_string(),
            is_progress,
            timestamp: Self::now(),
        }
    }

    pub fn discovery(state: Discovery) -> Self {
        Self::Discovery {
            state,
            timestamp: Self::now(),
        }
    }

    pub fn devices(current: Option<&Device>, devices: Vec<Device>) -> Self {
        Self::Devices {
            current: current.map(|d| d.id.clone()),
            devices,
            timestamp: Self::now(),
        }
    }

    pub fn notification(message: String) -> Self {
        Self::Notification {
            message,
            timestamp: Self::now(),
        }
    }
}

/// Stream engine events until Ctrl+C
pub async fn run(mut engine: Engine) -> color_eyre::Result<()> {
    let mut status = engine.status().subscribe();
    let mut discovery = engine.status().discovery();
    let mut notifications = engine.take_notifications();

    // A start failure was already queued as a notification
    if let Err(e) = engine.start() {
        debug!("Daemon did not start: {}", e);
    }

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            changed = status.changed() => {
                if changed.is_err() {
                    break;
                }
                let line = status.borrow_and_update().clone();
                WatchEvent::status(&line.text, line.is_progress).emit();
            }
            changed = discovery.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = *discovery.borrow_and_update();
                WatchEvent::discovery(state).emit();
                if state == Discovery::Settled {
                    let client = engine.client();
                    WatchEvent::devices(client.current_device().as_ref(), client.devices()).emit();
                }
            }
            Some(notification) = recv(&mut notifications) => {
                WatchEvent::notification(notification.text()).emit();
            }
            _ = &mut shutdown => {
                info!("Interrupted, stopping daemon");
                break;
            }
        }
    }

    engine.shutdown();
    Ok(())
}

/// Receive from an optional channel; pending forever once it is gone
async fn recv<T>(rx: &mut Option<tokio::sync::mpsc::UnboundedReceiver<T>>) -> Option<T> {
    match rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&WatchEvent::status("Pixel 6", false)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["event"], "status");
        assert_eq!(value["text"], "Pixel 6");
        assert_eq!(value["is_progress"], false);
        assert!(value["timestamp"].is_number());
    }

    #[test]
    fn test_discovery_state_is_lowercase() {
        let json = serde_json::to_string(&WatchEvent::discovery(Discovery::Settled)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["event"], "discovery");
        assert_eq!(value["state"], "settled");
    }

    #[test]
    fn test_devices_carries_current_id() {
        let pixel = Device::new("d1", "Pixel", "android-arm64");
        let event = WatchEvent::devices(Some(&pixel), vec![pixel.clone()]);
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["event"], "devices");
        assert_eq!(value["current"], "d1");
        assert_eq!(value["devices"][0]["name"], "Pixel");
        assert_eq!(value["devices"][0]["platform"], "android-arm64");
    }

    #[test]
    fn test_no_current_device_is_null() {
        let value = serde_json::to_value(WatchEvent::devices(None, Vec::new())).unwrap();
        assert!(value["current"].is_null());
        assert_eq!(value["devices"].as_array().map(Vec::len), Some(0));
    }
}
