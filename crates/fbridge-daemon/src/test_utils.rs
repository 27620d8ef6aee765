//! Test utilities for the daemon client
//!
//! Provides test devices and collaborators that record every call.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use fbridge_core::{Device, PersistenceMode, Result};

use crate::host::{
    Collaborators, DeviceStatusSink, FixedToolchain, FixedWorkspace, Notifier, SelectionStore,
};

/// Creates a test device on the android platform
pub fn test_device(id: &str, name: &str) -> Device {
    test_device_with_platform(id, name, "android-arm64")
}

/// Creates a test device with platform specification.
pub fn test_device_with_platform(id: &str, name: &str, platform: &str) -> Device {
    Device::new(id, name, platform)
}

/// `[{"event":"device.added",...}]` for a device
pub fn device_added_line(device: &Device) -> String {
    event_line("device.added", device)
}

/// `[{"event":"device.removed",...}]` for a device
pub fn device_removed_line(device: &Device) -> String {
    event_line("device.removed", device)
}

fn event_line(event: &str, device: &Device) -> String {
    let params = serde_json::to_value(device).unwrap_or_default();
    serde_json::json!([{ "event": event, "params": params }]).to_string()
}

/// A response line for a request id
pub fn response_line(id: u64, result: serde_json::Value) -> String {
    serde_json::json!([{ "id": id, "result": result }]).to_string()
}

/// Pull the request id out of an encoded request line
pub fn request_id(line: &str) -> Option<u64> {
    let value: serde_json::Value = serde_json::from_str(line.trim_end()).ok()?;
    value.get(0)?.get("id")?.as_u64()
}

#[derive(Debug, Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn messages(&self) -> Vec<String> {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, message: &str) {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message.to_string());
    }
}

/// Records `(name, is_loading)` reports in order
#[derive(Debug, Default)]
pub struct RecordingStatus {
    reports: Mutex<Vec<(Option<String>, bool)>>,
}

impl RecordingStatus {
    pub fn reports(&self) -> Vec<(Option<String>, bool)> {
        self.reports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn last(&self) -> Option<(Option<String>, bool)> {
        self.reports().last().cloned()
    }
}

impl DeviceStatusSink for RecordingStatus {
    fn report_device_state(&self, name: Option<String>, is_loading: bool) {
        self.reports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((name, is_loading));
    }
}

/// Selection store that starts from a fixed id and records persist calls
#[derive(Debug, Default)]
pub struct RecordingSelection {
    initial: Option<String>,
    persisted: Mutex<Vec<(PersistenceMode, String)>>,
}

impl RecordingSelection {
    pub fn with_initial(id: impl Into<String>) -> Self {
        Self {
            initial: Some(id.into()),
            persisted: Mutex::default(),
        }
    }

    pub fn persisted(&self) -> Vec<(PersistenceMode, String)> {
        self.persisted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl SelectionStore for RecordingSelection {
    fn persist_selection(&self, mode: PersistenceMode, device_id: &str) -> Result<()> {
        self.persisted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((mode, device_id.to_string()));
        Ok(())
    }

    fn load_selected(&self) -> Option<String> {
        self.initial.clone()
    }
}

/// Recording collaborators plus handles to inspect them
pub struct Recorder {
    pub notifier: Arc<RecordingNotifier>,
    pub status: Arc<RecordingStatus>,
    pub selection: Arc<RecordingSelection>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::with_selection(RecordingSelection::default())
    }

    pub fn with_selection(selection: RecordingSelection) -> Self {
        Self {
            notifier: Arc::new(RecordingNotifier::default()),
            status: Arc::new(RecordingStatus::default()),
            selection: Arc::new(selection),
        }
    }

    /// Collaborators with no workspace and `flutter` as the toolchain
    pub fn collaborators(&self) -> Collaborators {
        self.collaborators_for(None, PathBuf::from("flutter"))
    }

    pub fn collaborators_for(&self, workspace: Option<PathBuf>, toolchain: PathBuf) -> Collaborators {
        Collaborators {
            notifier: self.notifier.clone(),
            status: self.status.clone(),
            selection: self.selection.clone(),
            workspace: Arc::new(FixedWorkspace(workspace)),
            toolchain: Arc::new(FixedToolchain(toolchain)),
        }
    }
}

impl Default for Recorder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_basic() {
        let device = test_device("test-id", "Test Device");
        assert_eq!(device.id, "test-id");
        assert_eq!(device.name, "Test Device");
        assert_eq!(device.platform, "android-arm64");
        assert!(!device.emulator);
    }

    #[test]
    fn test_event_lines_decode() {
        let line = device_added_line(&test_device("d1", "Pixel"));
        assert!(line.starts_with("[{") && line.ends_with("}]"));
        assert!(line.contains("\"device.added\""));
    }

    #[test]
    fn test_request_id() {
        assert_eq!(request_id("[{\"id\":7,\"method\":\"device.enable\"}]\n"), Some(7));
        assert_eq!(request_id("plain"), None);
    }

    #[test]
    fn test_recording_selection() {
        let selection = RecordingSelection::with_initial("d1");
        assert_eq!(selection.load_selected().as_deref(), Some("d1"));
        selection
            .persist_selection(PersistenceMode::GlobalState, "d2")
            .unwrap();
        assert_eq!(
            selection.persisted(),
            vec![(PersistenceMode::GlobalState, "d2".to_string())]
        );
    }
}
