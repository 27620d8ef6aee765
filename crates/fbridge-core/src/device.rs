//! Device domain types
//!
//! A [`Device`] is a deployment target reported by the daemon through
//! `device.added` / `device.removed`. Devices are plain values: the registry
//! replaces entries, it never mutates them in place.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A device reported by the Flutter daemon
///
/// Only `id`, `name` and `platform` are required on the wire. The daemon sends
/// more fields on newer protocol versions; the ones useful for display are kept.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    /// Opaque identifier, stable for the lifetime of the daemon connection
    pub id: String,

    /// Human-readable device name
    pub name: String,

    /// Target platform tag (e.g., "android-arm64", "ios", "web-javascript")
    pub platform: String,

    /// Whether this is an emulator/simulator
    #[serde(default)]
    pub emulator: bool,

    /// Device category: "mobile", "web", "desktop", or null
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    /// Platform type: "android", "ios", "linux", "macos", "windows", "web"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform_type: Option<String>,
}

impl Device {
    pub fn new(id: impl Into<String>, name: impl Into<String>, platform: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            platform: platform.into(),
            emulator: false,
            category: None,
            platform_type: None,
        }
    }

    /// Get a display string for the device
    pub fn display_name(&self) -> String {
        if self.emulator {
            format!("{} ({})", self.name, self.emulator_type())
        } else {
            self.name.clone()
        }
    }

    /// Get emulator type string
    pub fn emulator_type(&self) -> &'static str {
        match self.platform.as_str() {
            p if p.starts_with("ios") => "simulator",
            p if p.starts_with("android") => "emulator",
            _ => "virtual",
        }
    }

    /// List label: `name • id • platform`
    pub fn list_label(&self) -> String {
        format!("{} • {} • {}", self.name, self.id, self.platform)
    }
}

/// Where a user's device selection should be remembered
///
/// The registry only picks the hook; the backing store for each mode belongs
/// to the persistence collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PersistenceMode {
    /// Select for this call only, nothing is written
    DontStore,
    /// Remember for the lifetime of this process
    #[default]
    Memory,
    /// Durable per-project state (not meant to be committed)
    WorkspaceState,
    /// Per-project configuration file
    WorkspaceConfig,
    /// Durable per-user state
    GlobalState,
    /// Per-user configuration file
    GlobalConfig,
}

impl PersistenceMode {
    pub const ALL: [PersistenceMode; 6] = [
        PersistenceMode::DontStore,
        PersistenceMode::Memory,
        PersistenceMode::WorkspaceState,
        PersistenceMode::WorkspaceConfig,
        PersistenceMode::GlobalState,
        PersistenceMode::GlobalConfig,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PersistenceMode::DontStore => "dont-store",
            PersistenceMode::Memory => "memory",
            PersistenceMode::WorkspaceState => "workspace-state",
            PersistenceMode::WorkspaceConfig => "workspace-config",
            PersistenceMode::GlobalState => "global-state",
            PersistenceMode::GlobalConfig => "global-config",
        }
    }

    /// Whether this mode writes anything outside the process
    pub fn is_durable(&self) -> bool {
        !matches!(self, PersistenceMode::DontStore | PersistenceMode::Memory)
    }
}

impl fmt::Display for PersistenceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PersistenceMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        PersistenceMode::ALL
            .into_iter()
            .find(|mode| mode.as_str() == s)
            .ok_or_else(|| {
                Error::config(format!(
                    "unknown persistence mode '{}', expected one of: {}",
                    s,
                    PersistenceMode::ALL.map(|m| m.as_str()).join(", ")
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_deserializes_minimal_params() {
        let device: Device = serde_json::from_str(
            r#"{"id":"d1","name":"Pixel","platform":"android-arm64"}"#,
        )
        .unwrap();
        assert_eq!(device, Device::new("d1", "Pixel", "android-arm64"));
    }

    #[test]
    fn test_device_deserializes_full_params() {
        let device: Device = serde_json::from_str(
            r#"{"id":"emulator-5554","name":"sdk gphone64","platform":"android-x64",
                "emulator":true,"category":"mobile","platformType":"android",
                "ephemeral":true,"emulatorId":"Pixel_7"}"#,
        )
        .unwrap();
        assert!(device.emulator);
        assert_eq!(device.platform_type.as_deref(), Some("android"));
        assert_eq!(device.display_name(), "sdk gphone64 (emulator)");
    }

    #[test]
    fn test_device_requires_id() {
        let result: std::result::Result<Device, _> =
            serde_json::from_str(r#"{"name":"Pixel","platform":"android"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_list_label() {
        let device = Device::new("macos", "macOS", "darwin");
        assert_eq!(device.list_label(), "macOS • macos • darwin");
    }

    #[test]
    fn test_persistence_mode_parse() {
        for mode in PersistenceMode::ALL {
            assert_eq!(mode.as_str().parse::<PersistenceMode>().unwrap(), mode);
        }
        assert!("workspace".parse::<PersistenceMode>().is_err());
    }

    #[test]
    fn test_persistence_mode_durability() {
        assert!(!PersistenceMode::DontStore.is_durable());
        assert!(!PersistenceMode::Memory.is_durable());
        assert!(PersistenceMode::WorkspaceState.is_durable());
        assert!(PersistenceMode::GlobalConfig.is_durable());
    }
}
