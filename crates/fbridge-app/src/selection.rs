//! Device selection persistence
//!
//! Each [`PersistenceMode`] maps to one backing store:
//!
//! | Mode | Store |
//! |---|---|
//! | `dont-store` | nothing |
//! | `memory` | this process only |
//! | `workspace-state` | `<project>/.fbridge/state.toml` |
//! | `workspace-config` | `<project>/.fbridge/config.toml` `[devices]` |
//! | `global-state` | `<data_local_dir>/flutter-bridge/state.toml` |
//! | `global-config` | `<config_dir>/flutter-bridge/config.toml` `[devices]` |

use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use crate::config::{
    global_config_path, global_state_path, project_config_path, project_state_path,
    read_toml_or_default, write_toml_atomic, SelectionState, Settings,
};
use fbridge_core::prelude::*;
use fbridge_core::PersistenceMode;
use fbridge_daemon::SelectionStore;

/// File locations for each durable mode
#[derive(Debug, Clone, Default)]
pub struct SelectionPaths {
    pub workspace_config: Option<PathBuf>,
    pub workspace_state: Option<PathBuf>,
    pub global_config: Option<PathBuf>,
    pub global_state: Option<PathBuf>,
}

impl SelectionPaths {
    /// Standard locations; workspace files only when a project is known
    pub fn standard(project_path: Option<&Path>) -> Self {
        Self {
            workspace_config: project_path.map(project_config_path),
            workspace_state: project_path.map(project_state_path),
            global_config: global_config_path(),
            global_state: global_state_path(),
        }
    }

    fn path_for(&self, mode: PersistenceMode) -> Option<&Path> {
        match mode {
            PersistenceMode::WorkspaceConfig => self.workspace_config.as_deref(),
            PersistenceMode::WorkspaceState => self.workspace_state.as_deref(),
            PersistenceMode::GlobalConfig => self.global_config.as_deref(),
            PersistenceMode::GlobalState => self.global_state.as_deref(),
            PersistenceMode::DontStore | PersistenceMode::Memory => None,
        }
    }
}

/// [`SelectionStore`] backed by TOML files
#[derive(Debug, Default)]
pub struct FileSelectionStore {
    paths: SelectionPaths,
    memory: Mutex<Option<String>>,
}

impl FileSelectionStore {
    pub fn new(paths: SelectionPaths) -> Self {
        Self {
            paths,
            memory: Mutex::new(None),
        }
    }

    pub fn paths(&self) -> &SelectionPaths {
        &self.paths
    }

    /// The id stored for one mode, ignoring all others
    pub fn stored(&self, mode: PersistenceMode) -> Option<String> {
        match mode {
            PersistenceMode::DontStore => None,
            PersistenceMode::Memory => self
                .memory
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone(),
            PersistenceMode::WorkspaceConfig | PersistenceMode::GlobalConfig => {
                let path = self.paths.path_for(mode)?;
                read_toml_or_default::<Settings>(path).devices.selected_device_id
            }
            PersistenceMode::WorkspaceState | PersistenceMode::GlobalState => {
                let path = self.paths.path_for(mode)?;
                read_toml_or_default::<SelectionState>(path).selected_device_id
            }
        }
    }

    fn write(&self, mode: PersistenceMode, device_id: Option<&str>) -> Result<()> {
        let path = self
            .paths
            .path_for(mode)
            .ok_or_else(|| Error::config(format!("No location to store a {} selection", mode)))?;
        let device_id = device_id.map(str::to_string);

        match mode {
            PersistenceMode::WorkspaceConfig | PersistenceMode::GlobalConfig => {
                // Keep the rest of the settings file intact
                let mut settings: Settings = read_toml_or_default(path);
                settings.devices.selected_device_id = device_id;
                write_toml_atomic(path, &settings)
            }
            _ => write_toml_atomic(
                path,
                &SelectionState {
                    selected_device_id: device_id,
                },
            ),
        }
    }
}

impl SelectionStore for FileSelectionStore {
    fn persist_selection(&self, mode: PersistenceMode, device_id: &str) -> Result<()> {
        match mode {
            PersistenceMode::DontStore => Ok(()),
            PersistenceMode::Memory => {
                *self.memory.lock().unwrap_or_else(PoisonError::into_inner) =
                    Some(device_id.to_string());
                Ok(())
            }
            PersistenceMode::WorkspaceState => {
                self.write(mode, Some(device_id))?;
                // The config value would otherwise win on the next load
                if self.stored(PersistenceMode::WorkspaceConfig).is_some() {
                    self.write(PersistenceMode::WorkspaceConfig, None)?;
                }
                Ok(())
            }
            _ => self.write(mode, Some(device_id)),
        }
    }

    /// First id found in: memory, workspace config, workspace state, global
    /// config, global state
    fn load_selected(&self) -> Option<String> {
        [
            PersistenceMode::Memory,
            PersistenceMode::WorkspaceConfig,
            PersistenceMode::WorkspaceState,
            PersistenceMode::GlobalConfig,
            PersistenceMode::GlobalState,
        ]
        .into_iter()
        .find_map(|mode| self.stored(mode))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::{tempdir, TempDir};

    fn store(temp: &TempDir) -> FileSelectionStore {
        let root = temp.path();
        FileSelectionStore::new(SelectionPaths {
            workspace_config: Some(project_config_path(&root.join("project"))),
            workspace_state: Some(project_state_path(&root.join("project"))),
            global_config: Some(root.join("config/config.toml")),
            global_state: Some(root.join("data/state.toml")),
        })
    }

    #[test]
    fn test_empty_store_loads_nothing() {
        let temp = tempdir().unwrap();
        assert_eq!(store(&temp).load_selected(), None);
    }

    #[test]
    fn test_dont_store_writes_nothing() {
        let temp = tempdir().unwrap();
        let store = store(&temp);
        store
            .persist_selection(PersistenceMode::DontStore, "d1")
            .unwrap();
        assert_eq!(store.load_selected(), None);
        assert!(!temp.path().join("project").exists());
    }

    #[test]
    fn test_memory_is_process_local() {
        let temp = tempdir().unwrap();
        let first = store(&temp);
        first.persist_selection(PersistenceMode::Memory, "d1").unwrap();
        assert_eq!(first.load_selected().as_deref(), Some("d1"));

        let second = store(&temp);
        assert_eq!(second.load_selected(), None);
    }

    #[test]
    fn test_each_durable_mode_round_trips() {
        for mode in [
            PersistenceMode::WorkspaceState,
            PersistenceMode::WorkspaceConfig,
            PersistenceMode::GlobalState,
            PersistenceMode::GlobalConfig,
        ] {
            let temp = tempdir().unwrap();
            store(&temp).persist_selection(mode, "d1").unwrap();

            let reloaded = store(&temp);
            assert_eq!(reloaded.stored(mode).as_deref(), Some("d1"), "{}", mode);
            assert_eq!(reloaded.load_selected().as_deref(), Some("d1"), "{}", mode);
        }
    }

    #[test]
    fn test_load_priority() {
        let temp = tempdir().unwrap();
        let store = store(&temp);
        store.persist_selection(PersistenceMode::GlobalState, "gs").unwrap();
        assert_eq!(store.load_selected().as_deref(), Some("gs"));

        store.persist_selection(PersistenceMode::GlobalConfig, "gc").unwrap();
        assert_eq!(store.load_selected().as_deref(), Some("gc"));

        store.persist_selection(PersistenceMode::WorkspaceState, "ws").unwrap();
        assert_eq!(store.load_selected().as_deref(), Some("ws"));

        store.persist_selection(PersistenceMode::WorkspaceConfig, "wc").unwrap();
        assert_eq!(store.load_selected().as_deref(), Some("wc"));
    }

    #[test]
    fn test_workspace_state_clears_workspace_config() {
        let temp = tempdir().unwrap();
        let store = store(&temp);
        store
            .persist_selection(PersistenceMode::WorkspaceConfig, "old")
            .unwrap();
        store
            .persist_selection(PersistenceMode::WorkspaceState, "new")
            .unwrap();

        assert_eq!(store.stored(PersistenceMode::WorkspaceConfig), None);
        assert_eq!(store.load_selected().as_deref(), Some("new"));
    }

    #[test]
    fn test_config_write_preserves_other_settings() {
        let temp = tempdir().unwrap();
        let store = store(&temp);
        let path = store.paths().workspace_config.clone().unwrap();

        let mut settings = Settings::default();
        settings.daemon.discovery_grace_ms = 1234;
        write_toml_atomic(&path, &settings).unwrap();

        store
            .persist_selection(PersistenceMode::WorkspaceConfig, "d1")
            .unwrap();

        let reloaded: Settings = read_toml_or_default(&path);
        assert_eq!(reloaded.daemon.discovery_grace_ms, 1234);
        assert_eq!(reloaded.devices.selected_device_id.as_deref(), Some("d1"));
    }

    #[test]
    #[serial_test::serial]
    #[cfg(target_os = "linux")]
    fn test_standard_paths_follow_xdg_dirs() {
        let temp = tempdir().unwrap();
        std::env::set_var("XDG_CONFIG_HOME", temp.path().join("config"));
        std::env::set_var("XDG_DATA_HOME", temp.path().join("data"));

        let paths = SelectionPaths::standard(None);
        std::env::remove_var("XDG_CONFIG_HOME");
        std::env::remove_var("XDG_DATA_HOME");

        assert!(paths.workspace_config.is_none());
        assert!(paths.workspace_state.is_none());
        assert_eq!(
            paths.global_config,
            Some(temp.path().join("config/flutter-bridge/config.toml"))
        );
        assert_eq!(
            paths.global_state,
            Some(temp.path().join("data/flutter-bridge/state.toml"))
        );
    }

    #[test]
    fn test_workspace_mode_without_project_fails() {
        let store = FileSelectionStore::new(SelectionPaths::default());
        let result = store.persist_selection(PersistenceMode::WorkspaceState, "d1");
        assert!(matches!(result, Err(Error::Config { .. })));
    }
}
