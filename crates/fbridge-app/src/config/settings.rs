//! Settings and state files
//!
//! - `<project>/.fbridge/config.toml` - project settings
//! - `<project>/.fbridge/state.toml` - project selection state
//! - `<config_dir>/flutter-bridge/config.toml` - user settings
//! - `<data_local_dir>/flutter-bridge/state.toml` - user selection state

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::types::Settings;
use fbridge_core::prelude::*;

pub const FBRIDGE_DIR: &str = ".fbridge";
pub const CONFIG_FILENAME: &str = "config.toml";
pub const STATE_FILENAME: &str = "state.toml";

/// Directory name under the platform config/data dirs
const APP_DIR: &str = "flutter-bridge";

pub fn project_config_path(project_path: &Path) -> PathBuf {
    project_path.join(FBRIDGE_DIR).join(CONFIG_FILENAME)
}

pub fn project_state_path(project_path: &Path) -> PathBuf {
    project_path.join(FBRIDGE_DIR).join(STATE_FILENAME)
}

pub fn global_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILENAME))
}

pub fn global_state_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|dir| dir.join(APP_DIR).join(STATE_FILENAME))
}

// ─────────────────────────────────────────────────────────────────────────────
// Settings Loading
// ─────────────────────────────────────────────────────────────────────────────

/// Load settings from .fbridge/config.toml
///
/// Returns default settings if file doesn't exist or can't be parsed.
pub fn load_settings(project_path: &Path) -> Settings {
    read_toml_or_default(&project_config_path(project_path))
}

/// Save settings to .fbridge/config.toml
pub fn save_settings(project_path: &Path, settings: &Settings) -> Result<()> {
    write_toml_atomic(&project_config_path(project_path), settings)
}

/// Create `.fbridge/config.toml` with commented defaults if it is missing
pub fn init_config_dir(project_path: &Path) -> Result<()> {
    let config_path = project_config_path(project_path);
    if config_path.exists() {
        return Ok(());
    }

    ensure_parent(&config_path)?;
    let default_content = r#"# Flutter Bridge Configuration

[daemon]
request_timeout_ms = 15000  # How long a daemon request waits for an answer
discovery_grace_ms = 0      # Extra wait for a first device after discovery starts
# flutter_command = "/path/to/flutter"
extra_args = []

[status]
display = "device"          # "device", "uipath" or "none"

[workspace]
max_depth = 10              # How deep to search for pubspec.yaml

[devices]
# selected_device_id = "emulator-5554"
"#;
    std::fs::write(&config_path, default_content)
        .map_err(|e| Error::config(format!("Failed to write config.toml: {}", e)))?;
    info!("Created {:?}", config_path);
    Ok(())
}

/// Read a TOML file, falling back to defaults when missing or invalid
pub fn read_toml_or_default<T: DeserializeOwned + Default>(path: &Path) -> T {
    if !path.exists() {
        debug!("No file at {:?}, using defaults", path);
        return T::default();
    }

    match std::fs::read_to_string(path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(value) => {
                debug!("Loaded {:?}", path);
                value
            }
            Err(e) => {
                warn!("Failed to parse {:?}: {}", path, e);
                T::default()
            }
        },
        Err(e) => {
            warn!("Failed to read {:?}: {}", path, e);
            T::default()
        }
    }
}

/// Write a TOML file through a temp file and rename
pub fn write_toml_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let dir = ensure_parent(path)?;
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| Error::config(format!("Invalid file path: {:?}", path)))?;
    let temp_path = dir.join(format!(".{}.tmp", file_name));

    let content = toml::to_string_pretty(value)?;

    std::fs::write(&temp_path, &content)
        .with_context(|| format!("Failed to write {:?}", temp_path))?;
    std::fs::rename(&temp_path, path).with_context(|| format!("Failed to replace {:?}", path))?;

    debug!("Saved {:?}", path);
    Ok(())
}

fn ensure_parent(path: &Path) -> Result<&Path> {
    let dir = path
        .parent()
        .ok_or_else(|| Error::config(format!("No parent directory for {:?}", path)))?;
    if !dir.exists() {
        std::fs::create_dir_all(dir).with_context(|| format!("Failed to create {:?}", dir))?;
    }
    Ok(dir)
}
