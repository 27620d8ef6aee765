//! Engine - wires the daemon client to its collaborators
//!
//! The engine owns one instance of each collaborator and the [`DaemonClient`]
//! that uses them. Command layers (the CLI, an editor plugin) talk to the
//! engine instead of assembling the pieces themselves.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::config::{load_settings, Settings};
use crate::notification::{Notification, Notifications};
use crate::sdk::SdkLocator;
use crate::selection::{FileSelectionStore, SelectionPaths};
use crate::status::{Discovery, StatusBar};
use fbridge_core::prelude::*;
use fbridge_core::{find_workspace_folder, Device, PersistenceMode};
use fbridge_daemon::{
    Collaborators, DaemonClient, FixedWorkspace, ToolchainLocator, WorkspaceResolver,
};

/// Resolves the closest Flutter project below a base directory
#[derive(Debug, Clone)]
pub struct ProjectResolver {
    base_path: PathBuf,
    max_depth: usize,
}

impl ProjectResolver {
    pub fn new(base_path: impl Into<PathBuf>, max_depth: usize) -> Self {
        Self {
            base_path: base_path.into(),
            max_depth,
        }
    }
}

impl WorkspaceResolver for ProjectResolver {
    fn resolve_working_directory(&self) -> Option<PathBuf> {
        let found = find_workspace_folder(&self.base_path, self.max_depth);
        if found.is_none() {
            debug!(
                "No pubspec.yaml within {} levels of {:?}",
                self.max_depth, self.base_path
            );
        }
        found
    }
}

/// Everything needed to build an [`Engine`]
pub struct EngineParts {
    pub project_path: Option<PathBuf>,
    pub settings: Settings,
    pub selection_paths: SelectionPaths,
    pub workspace: Arc<dyn WorkspaceResolver>,
    pub toolchain: Arc<dyn ToolchainLocator>,
}

impl EngineParts {
    /// Discover the project below `base_path` and load its settings
    pub fn discover(base_path: &Path) -> Self {
        // `.fbridge/` in the base directory may widen or narrow the search
        let base_settings = load_settings(base_path);
        let resolver = ProjectResolver::new(base_path, base_settings.workspace.max_depth);
        let project_path = resolver.resolve_working_directory();

        let settings = match &project_path {
            Some(project) => load_settings(project),
            None => base_settings,
        };
        match &project_path {
            Some(project) => info!("Flutter project: {:?}", project),
            None => warn!("No Flutter project found below {:?}", base_path),
        }

        Self {
            selection_paths: SelectionPaths::standard(project_path.as_deref()),
            workspace: Arc::new(resolver),
            toolchain: Arc::new(SdkLocator::new(settings.daemon.flutter_command.clone())),
            project_path,
            settings,
        }
    }

    /// A fixed project with explicit paths and toolchain
    pub fn fixed(
        project_path: PathBuf,
        settings: Settings,
        selection_paths: SelectionPaths,
        toolchain: Arc<dyn ToolchainLocator>,
    ) -> Self {
        Self {
            workspace: Arc::new(FixedWorkspace(Some(project_path.clone()))),
            project_path: Some(project_path),
            settings,
            selection_paths,
            toolchain,
        }
    }
}

/// The daemon client plus its collaborators
pub struct Engine {
    project_path: Option<PathBuf>,
    settings: Settings,
    client: DaemonClient,
    status: Arc<StatusBar>,
    selection: Arc<FileSelectionStore>,
    notifications: Option<mpsc::UnboundedReceiver<Notification>>,
}

impl Engine {
    /// Discover the project below `base_path` and build an engine for it
    pub fn new(base_path: &Path) -> Self {
        Self::from_parts(EngineParts::discover(base_path))
    }

    pub fn from_parts(parts: EngineParts) -> Self {
        let status = Arc::new(StatusBar::new(parts.settings.status.display));
        let selection = Arc::new(FileSelectionStore::new(parts.selection_paths));
        let (notifier, notifications) = Notifications::new();

        let host = Collaborators {
            notifier: Arc::new(notifier),
            status: status.clone(),
            selection: selection.clone(),
            workspace: parts.workspace,
            toolchain: parts.toolchain,
        };
        let client = DaemonClient::new(parts.settings.daemon.to_daemon_config(), host);

        Self {
            project_path: parts.project_path,
            settings: parts.settings,
            client,
            status,
            selection,
            notifications: Some(notifications),
        }
    }

    pub fn project_path(&self) -> Option<&Path> {
        self.project_path.as_deref()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn client(&self) -> &DaemonClient {
        &self.client
    }

    pub fn status(&self) -> &Arc<StatusBar> {
        &self.status
    }

    pub fn selection(&self) -> &Arc<FileSelectionStore> {
        &self.selection
    }

    /// Take the notification receiver; only the first caller gets it
    pub fn take_notifications(&mut self) -> Option<mpsc::UnboundedReceiver<Notification>> {
        self.notifications.take()
    }

    /// Start the daemon; failures are already reported as notifications
    pub fn start(&self) -> Result<()> {
        self.client.try_start()
    }

    /// Wait until the first discovery round has settled
    ///
    /// Returns the devices known at that point, or at the deadline.
    pub async fn wait_for_devices(&self, timeout: Duration) -> Vec<Device> {
        let mut discovery = self.status.discovery();
        let settled = tokio::time::timeout(
            timeout,
            discovery.wait_for(|state| *state == Discovery::Settled),
        )
        .await;

        match settled {
            Ok(Ok(_)) => debug!("Device discovery settled"),
            Ok(Err(_)) => debug!("Status bar dropped while waiting for devices"),
            Err(_) => warn!("Device discovery did not settle within {:?}", timeout),
        }
        self.client.devices()
    }

    /// Select a known device by id
    pub fn select(&self, device_id: &str, mode: PersistenceMode) -> Result<Device> {
        let device = self
            .client
            .devices()
            .into_iter()
            .find(|d| d.id == device_id)
            .ok_or_else(|| Error::device_not_found(device_id))?;
        self.client.select_device(&device, mode);
        Ok(device)
    }

    /// Stop the daemon
    pub fn shutdown(&self) {
        self.client.stop();
    }
}
