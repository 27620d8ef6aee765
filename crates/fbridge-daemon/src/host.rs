//! Interfaces the daemon client consumes from its host
//!
//! The client never reaches for ambient state: the host constructs one
//! implementation of each trait and hands them over in [`Collaborators`].

use std::path::PathBuf;
use std::sync::Arc;

use fbridge_core::prelude::*;
use fbridge_core::PersistenceMode;

/// Fire-and-forget user-facing messages
#[cfg_attr(test, mockall::automock)]
pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str);
}

/// Status surface for the current device
#[cfg_attr(test, mockall::automock)]
pub trait DeviceStatusSink: Send + Sync {
    /// `name` is the current device's display name, `None` when there is no
    /// device. `is_loading` marks the transient "discovery in progress" state.
    fn report_device_state(&self, name: Option<String>, is_loading: bool);
}

/// Where a selected device id is remembered between sessions
#[cfg_attr(test, mockall::automock)]
pub trait SelectionStore: Send + Sync {
    fn persist_selection(&self, mode: PersistenceMode, device_id: &str) -> Result<()>;

    /// The remembered id, if any store holds one
    fn load_selected(&self) -> Option<String>;
}

/// Resolves the directory the daemon runs in
#[cfg_attr(test, mockall::automock)]
pub trait WorkspaceResolver: Send + Sync {
    fn resolve_working_directory(&self) -> Option<PathBuf>;
}

/// Resolves the `flutter` executable
#[cfg_attr(test, mockall::automock)]
pub trait ToolchainLocator: Send + Sync {
    fn toolchain_command(&self) -> Option<PathBuf>;
}

/// Everything the client needs from the outside world
#[derive(Clone)]
pub struct Collaborators {
    pub notifier: Arc<dyn Notifier>,
    pub status: Arc<dyn DeviceStatusSink>,
    pub selection: Arc<dyn SelectionStore>,
    pub workspace: Arc<dyn WorkspaceResolver>,
    pub toolchain: Arc<dyn ToolchainLocator>,
}

/// A selection store that remembers nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct NoSelectionStore;

impl SelectionStore for NoSelectionStore {
    fn persist_selection(&self, _mode: PersistenceMode, _device_id: &str) -> Result<()> {
        Ok(())
    }

    fn load_selected(&self) -> Option<String> {
        None
    }
}

/// A fixed working directory
#[derive(Debug, Clone)]
pub struct FixedWorkspace(pub Option<PathBuf>);

impl WorkspaceResolver for FixedWorkspace {
    fn resolve_working_directory(&self) -> Option<PathBuf> {
        self.0.clone()
    }
}

/// A fixed toolchain command
#[derive(Debug, Clone)]
pub struct FixedToolchain(pub PathBuf);

impl ToolchainLocator for FixedToolchain {
    fn toolchain_command(&self) -> Option<PathBuf> {
        Some(self.0.clone())
    }
}
