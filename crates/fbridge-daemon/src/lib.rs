//! # fbridge-daemon - Flutter Daemon Protocol Client
//!
//! Spawns `flutter daemon`, speaks its line-delimited JSON protocol over
//! stdin/stdout, correlates requests with responses, routes events and keeps
//! the device registry current.
//!
//! Depends on [`fbridge_core`] for domain types and error handling.
//!
//! ## Public API
//!
//! ### Client
//! - [`DaemonClient`] - Process lifecycle, requests, event routing, device selection
//! - [`DaemonConfig`] - Request timeout, discovery grace, extra daemon args
//! - [`LifecyclePhase`] - `Stopped`, `Starting`, `Running`, `Crashed`
//!
//! ### Protocol
//! - [`LineFramer`] - Byte chunks to complete lines
//! - [`decode_line()`] / [`encode_request()`] - `[{...}]` wire codec
//! - [`RequestTracker`] - Pending request/response pairs
//! - [`DaemonCommand`] - Typed daemon methods
//!
//! ### Devices
//! - [`DeviceRegistry`] - Known devices, selected id, derived current device
//!
//! ### Host Interfaces
//! - [`Notifier`], [`DeviceStatusSink`], [`SelectionStore`],
//!   [`WorkspaceResolver`], [`ToolchainLocator`] - bundled as [`Collaborators`]
//!
//! ### Emulators
//! - [`list_emulators()`] / [`launch_emulator()`]

pub mod client;
pub mod commands;
pub mod emulators;
pub mod framer;
pub mod host;
pub mod process;
pub mod protocol;
pub mod registry;
#[cfg(any(test, feature = "test-helpers"))]
pub mod test_utils;

pub use client::{DaemonClient, DaemonConfig, LifecyclePhase};
pub use commands::{DaemonCommand, RequestTracker, DEFAULT_REQUEST_TIMEOUT};
pub use emulators::{launch_emulator, list_emulators, parse_emulator_list, Emulator};
pub use framer::LineFramer;
pub use host::{
    Collaborators, DeviceStatusSink, FixedToolchain, FixedWorkspace, NoSelectionStore, Notifier,
    SelectionStore, ToolchainLocator, WorkspaceResolver,
};
pub use process::DaemonProcess;
pub use protocol::{decode_line, encode_request, DaemonRequest, DaemonResponse, DecodedLine, WireMessage};
pub use registry::DeviceRegistry;

/// Re-exported from `fbridge_core` for convenience.
pub use fbridge_core::{DaemonMessage, Device, PersistenceMode};
