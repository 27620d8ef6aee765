//! Configuration types for Flutter Bridge
//!
//! Defines:
//! - `Settings` - Contents of `.fbridge/config.toml` (and the user-global config)
//! - `SelectionState` - Contents of the durable `state.toml` files
//! - Related sub-types and enums

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use fbridge_core::DEFAULT_MAX_DEPTH;
use fbridge_daemon::DaemonConfig;

/// Project/global settings
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default)]
    pub daemon: DaemonSettings,

    #[serde(default)]
    pub status: StatusSettings,

    #[serde(default)]
    pub workspace: WorkspaceSettings,

    #[serde(default)]
    pub devices: DeviceSettings,
}

/// `[daemon]` section
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DaemonSettings {
    /// How long a request waits for a response (milliseconds)
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Extra wait for a first device after `device.enable` (milliseconds)
    #[serde(default)]
    pub discovery_grace_ms: u64,

    /// Explicit path to the `flutter` executable, skips PATH lookup
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flutter_command: Option<PathBuf>,

    /// Arguments appended after `flutter daemon`
    #[serde(default)]
    pub extra_args: Vec<String>,
}

impl Default for DaemonSettings {
    fn default() -> Self {
        Self {
            request_timeout_ms: default_request_timeout_ms(),
            discovery_grace_ms: 0,
            flutter_command: None,
            extra_args: Vec::new(),
        }
    }
}

impl DaemonSettings {
    pub fn to_daemon_config(&self) -> DaemonConfig {
        DaemonConfig {
            request_timeout: Duration::from_millis(self.request_timeout_ms),
            discovery_grace: Duration::from_millis(self.discovery_grace_ms),
            extra_args: self.extra_args.clone(),
        }
    }
}

fn default_request_timeout_ms() -> u64 {
    15_000
}

/// What the status line shows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusDisplay {
    /// The current device
    #[default]
    Device,
    /// The widget path under the cursor
    Uipath,
    /// Nothing
    None,
}

/// `[status]` section
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct StatusSettings {
    #[serde(default)]
    pub display: StatusDisplay,
}

/// `[workspace]` section
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct WorkspaceSettings {
    /// How deep to look for `pubspec.yaml` below the current directory
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
}

impl Default for WorkspaceSettings {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
        }
    }
}

fn default_max_depth() -> usize {
    DEFAULT_MAX_DEPTH
}

/// `[devices]` section
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct DeviceSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_device_id: Option<String>,
}

/// Durable selection state (`state.toml`)
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct SelectionState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_device_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.daemon.request_timeout_ms, 15_000);
        assert_eq!(settings.daemon.discovery_grace_ms, 0);
        assert_eq!(settings.status.display, StatusDisplay::Device);
        assert_eq!(settings.workspace.max_depth, DEFAULT_MAX_DEPTH);
        assert!(settings.devices.selected_device_id.is_none());
    }

    #[test]
    fn test_parse_partial_settings() {
        let toml = r#"
[daemon]
discovery_grace_ms = 2000
extra_args = ["--verbose"]

[status]
display = "uipath"
"#;
        let settings: Settings = toml::from_str(toml).unwrap();
        assert_eq!(settings.daemon.request_timeout_ms, 15_000);
        assert_eq!(settings.daemon.discovery_grace_ms, 2000);
        assert_eq!(settings.daemon.extra_args, vec!["--verbose"]);
        assert_eq!(settings.status.display, StatusDisplay::Uipath);
    }

    #[test]
    fn test_daemon_config_conversion() {
        let daemon = DaemonSettings {
            request_timeout_ms: 500,
            discovery_grace_ms: 250,
            flutter_command: None,
            extra_args: vec!["--verbose".to_string()],
        };
        let config = daemon.to_daemon_config();
        assert_eq!(config.request_timeout, Duration::from_millis(500));
        assert_eq!(config.discovery_grace, Duration::from_millis(250));
        assert_eq!(config.extra_args, vec!["--verbose"]);
    }

    #[test]
    fn test_unknown_display_is_rejected() {
        let result: Result<Settings, _> = toml::from_str("[status]\ndisplay = \"fancy\"\n");
        assert!(result.is_err());
    }
}
