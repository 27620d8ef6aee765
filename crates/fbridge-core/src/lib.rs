//! # fbridge-core - Core Domain Types
//!
//! Foundation crate for Flutter Bridge. Provides domain types, error handling,
//! event definitions, logging setup and workspace discovery.
//!
//! This crate has **zero internal dependencies** -- it only depends on external
//! crates (serde, chrono, thiserror, toml, tracing).
//!
//! ## Public API
//!
//! ### Devices (`device`)
//! - [`Device`] - A deployment target reported by the daemon
//! - [`PersistenceMode`] - Where a device selection is remembered
//!
//! ### Events (`events`)
//! - [`DaemonEvent`] - Raw stdout/stderr/exit events from the daemon process
//! - [`DaemonMessage`] - Typed events the client routes to handlers
//!
//! ### Error Handling (`error`)
//! - [`Error`] - Custom error enum with `fatal` vs `recoverable` classification
//! - [`Result`] - Type alias for `std::result::Result<T, Error>`
//! - [`ResultExt`] - Extension trait for adding error context
//!
//! ### Workspace Discovery (`discovery`)
//! - [`find_workspace_folder()`] - Closest directory containing `pubspec.yaml`
//!
//! ## Prelude
//!
//! Import commonly used types with:
//! ```rust
//! use fbridge_core::prelude::*;
//! ```

pub mod device;
pub mod discovery;
pub mod error;
pub mod events;
pub mod logging;

/// Prelude for common imports used throughout all Flutter Bridge crates
pub mod prelude {
    pub use super::error::{Error, Result, ResultExt};
    pub use tracing::{debug, error, info, instrument, trace, warn};
}

// Re-export commonly used types at crate root for convenience
pub use device::{Device, PersistenceMode};
pub use discovery::{
    closest_path, find_workspace_folder, find_workspace_folders, has_pubspec, DEFAULT_MAX_DEPTH,
};
pub use error::{Error, Result, ResultExt};
pub use events::{DaemonConnected, DaemonEvent, DaemonLogMessage, DaemonMessage};
pub use logging::DAEMON_OUTPUT_TARGET;
