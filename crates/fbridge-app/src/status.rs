//! Status line model
//!
//! Turns device reports from the daemon client into the single line of text
//! an editor shows in its status bar. The rendered line is published on a
//! `watch` channel so any number of surfaces can follow it.

use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tokio::sync::watch;

use crate::config::StatusDisplay;
use fbridge_core::prelude::*;
use fbridge_daemon::DeviceStatusSink;

pub const LOADING_DEVICES: &str = "Loading devices...";
pub const NO_DEVICE: &str = "No device available";
pub const RESTARTING_LSP: &str = "restartingLsp...";

/// What the status bar currently shows
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatusLine {
    pub text: String,
    /// Whether a spinner accompanies the text
    pub is_progress: bool,
}

/// Progress of the current device discovery round
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Discovery {
    /// No round started yet
    #[default]
    Idle,
    Loading,
    /// The round ended, with or without devices
    Settled,
}

#[derive(Debug, Default)]
struct StatusState {
    current_device: Option<String>,
    /// `None` until the first discovery round starts
    loading_devices: Option<bool>,
    lsp_ready: bool,
}

/// Status bar driven by device reports
pub struct StatusBar {
    display: StatusDisplay,
    state: Mutex<StatusState>,
    line_tx: watch::Sender<StatusLine>,
    discovery_tx: watch::Sender<Discovery>,
}

impl StatusBar {
    pub fn new(display: StatusDisplay) -> Self {
        let (line_tx, _) = watch::channel(StatusLine::default());
        let (discovery_tx, _) = watch::channel(Discovery::default());
        Self {
            display,
            state: Mutex::new(StatusState::default()),
            line_tx,
            discovery_tx,
        }
    }

    /// Follow the rendered line
    pub fn subscribe(&self) -> watch::Receiver<StatusLine> {
        self.line_tx.subscribe()
    }

    /// Follow discovery progress, whatever the display mode
    pub fn discovery(&self) -> watch::Receiver<Discovery> {
        self.discovery_tx.subscribe()
    }

    /// The rendered line right now
    pub fn line(&self) -> StatusLine {
        self.line_tx.borrow().clone()
    }

    /// Name of the last reported device
    pub fn current_device(&self) -> Option<String> {
        self.state().current_device.clone()
    }

    /// Whether a discovery round is in progress
    pub fn is_loading(&self) -> bool {
        self.state().loading_devices == Some(true)
    }

    pub fn is_lsp_ready(&self) -> bool {
        self.state().lsp_ready
    }

    /// Apply a device report
    pub fn update_device(&self, name: Option<String>, is_loading: bool) {
        self.discovery_tx.send_if_modified(|discovery| {
            let next = match (is_loading, *discovery) {
                (true, _) => Discovery::Loading,
                (false, Discovery::Loading) => Discovery::Settled,
                (false, unchanged) => unchanged,
            };
            std::mem::replace(discovery, next) != next
        });

        let mut state = self.state();
        state.current_device = name;
        if self.display != StatusDisplay::Device {
            return;
        }

        if is_loading {
            state.loading_devices = Some(true);
            self.show(LOADING_DEVICES, Some(true));
        } else {
            state.loading_devices = state.loading_devices.map(|_| false);
            let text = state.current_device.as_deref().unwrap_or(NO_DEVICE);
            self.show(text, Some(false));
        }
    }

    /// Show the widget path under the cursor (`uipath` mode only)
    pub fn update_ui_path(&self, path: &str) {
        if self.display == StatusDisplay::Uipath {
            self.show(path, None);
        }
    }

    /// The language server finished starting
    pub fn ready(&self) {
        self.state().lsp_ready = true;
        self.line_tx.send_modify(|line| line.is_progress = false);
    }

    /// The language server is restarting; forget device state
    pub fn restarting_lsp(&self) {
        let mut state = self.state();
        state.lsp_ready = false;
        state.loading_devices = None;
        state.current_device = None;
        self.discovery_tx.send_replace(Discovery::Idle);
        self.show(RESTARTING_LSP, Some(true));
    }

    fn show(&self, text: &str, is_progress: Option<bool>) {
        trace!("status: {}", text);
        self.line_tx.send_modify(|line| {
            line.text = text.to_string();
            if let Some(is_progress) = is_progress {
                line.is_progress = is_progress;
            }
        });
    }

    fn state(&self) -> MutexGuard<'_, StatusState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl DeviceStatusSink for StatusBar {
    fn report_device_state(&self, name: Option<String>, is_loading: bool) {
        self.update_device(name, is_loading);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(text: &str, is_progress: bool) -> StatusLine {
        StatusLine {
            text: text.to_string(),
            is_progress,
        }
    }

    #[test]
    fn test_loading_then_device() {
        let status = StatusBar::new(StatusDisplay::Device);
        status.update_device(None, true);
        assert_eq!(status.line(), line(LOADING_DEVICES, true));
        assert!(status.is_loading());

        status.update_device(Some("Pixel 6".to_string()), false);
        assert_eq!(status.line(), line("Pixel 6", false));
        assert!(!status.is_loading());
    }

    #[test]
    fn test_loading_then_nothing_found() {
        let status = StatusBar::new(StatusDisplay::Device);
        status.update_device(None, true);
        status.update_device(None, false);
        assert_eq!(status.line(), line(NO_DEVICE, false));
    }

    #[test]
    fn test_device_mode_ignores_ui_path() {
        let status = StatusBar::new(StatusDisplay::Device);
        status.update_ui_path("MaterialApp > Scaffold");
        assert_eq!(status.line(), StatusLine::default());
    }

    #[test]
    fn test_uipath_mode() {
        let status = StatusBar::new(StatusDisplay::Uipath);
        status.update_device(Some("Pixel".to_string()), false);
        assert_eq!(status.line(), StatusLine::default());
        assert_eq!(status.current_device().as_deref(), Some("Pixel"));

        status.update_ui_path("MaterialApp > Scaffold");
        assert_eq!(status.line().text, "MaterialApp > Scaffold");
    }

    #[test]
    fn test_none_mode_renders_nothing() {
        let status = StatusBar::new(StatusDisplay::None);
        status.update_device(None, true);
        status.update_ui_path("x");
        assert_eq!(status.line(), StatusLine::default());
    }

    #[test]
    fn test_restarting_lsp_resets_state() {
        let status = StatusBar::new(StatusDisplay::Device);
        status.ready();
        status.update_device(Some("Pixel".to_string()), false);

        status.restarting_lsp();
        assert_eq!(status.line(), line(RESTARTING_LSP, true));
        assert!(status.current_device().is_none());
        assert!(!status.is_lsp_ready());

        status.ready();
        assert!(!status.line().is_progress);
    }

    #[test]
    fn test_discovery_tracks_reports_in_every_mode() {
        for display in [StatusDisplay::Device, StatusDisplay::Uipath, StatusDisplay::None] {
            let status = StatusBar::new(display);
            let discovery = status.discovery();
            assert_eq!(*discovery.borrow(), Discovery::Idle);

            status.update_device(Some("Pixel".to_string()), false);
            assert_eq!(*discovery.borrow(), Discovery::Idle);

            status.update_device(None, true);
            assert_eq!(*discovery.borrow(), Discovery::Loading);

            status.update_device(None, false);
            assert_eq!(*discovery.borrow(), Discovery::Settled);

            status.restarting_lsp();
            assert_eq!(*discovery.borrow(), Discovery::Idle);
        }
    }

    #[tokio::test]
    async fn test_subscribers_see_updates() {
        let status = StatusBar::new(StatusDisplay::Device);
        let mut rx = status.subscribe();

        status.report_device_state(Some("Pixel".to_string()), false);
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().text, "Pixel");
    }
}
