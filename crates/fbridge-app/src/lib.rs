//! # fbridge-app - Host Surfaces for the Daemon Client
//!
//! Implements the collaborators the daemon client needs (settings, selection
//! persistence, status line, notifications, SDK lookup) and wires them into
//! an [`Engine`].
//!
//! ## Public API
//!
//! - [`Engine`] / [`EngineParts`] - Construct and drive a [`fbridge_daemon::DaemonClient`]
//! - [`config`] - `.fbridge/config.toml` and state files
//! - [`FileSelectionStore`] - Per-mode device selection persistence
//! - [`StatusBar`] - Status line model with `Loading devices...` handling
//! - [`Notifications`] - Timestamped user notifications
//! - [`FlutterSdk`] / [`SdkLocator`] - `flutter` and Dart SDK resolution

pub mod config;
pub mod engine;
pub mod notification;
pub mod sdk;
pub mod selection;
pub mod status;

pub use engine::{Engine, EngineParts, ProjectResolver};
pub use notification::{format_message, Notification, Notifications};
pub use sdk::{FlutterSdk, SdkLocator};
pub use selection::{FileSelectionStore, SelectionPaths};
pub use status::{Discovery, StatusBar, StatusLine};
