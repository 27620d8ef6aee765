//! Application error types with rich context

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Application error types organized by layer/domain
#[derive(Debug, Error)]
pub enum Error {
    // ─────────────────────────────────────────────────────────────
    // Common/Infrastructure Errors
    // ─────────────────────────────────────────────────────────────
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    // ─────────────────────────────────────────────────────────────
    // Daemon Lifecycle Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Flutter SDK not found. Ensure 'flutter' is in your PATH.")]
    FlutterNotFound,

    #[error("Flutter project workspace folder not found")]
    WorkspaceNotFound,

    #[error("Failed to spawn Flutter daemon: {reason}")]
    ProcessSpawn { reason: String },

    #[error("Flutter daemon is already running")]
    AlreadyRunning,

    #[error("Flutter daemon exited with code: {code:?}")]
    ProcessExit { code: Option<i32> },

    // ─────────────────────────────────────────────────────────────
    // Protocol Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Daemon not running but got request: {method}")]
    DaemonNotRunning { method: String },

    #[error("Malformed daemon message: {message}")]
    MalformedMessage { message: String },

    // ─────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ─────────────────────────────────────────────────────────────
    // Channel/Communication Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Channel send error: {message}")]
    ChannelSend { message: String },

    // ─────────────────────────────────────────────────────────────
    // Device Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Device not found: {id}")]
    DeviceNotFound { id: String },

    #[error("Emulator command failed: {message}")]
    Emulator { message: String },
}

// ─────────────────────────────────────────────────────────────────
// Convenience Constructors
// ─────────────────────────────────────────────────────────────────

impl Error {
    pub fn not_running(method: impl Into<String>) -> Self {
        Self::DaemonNotRunning {
            method: method.into(),
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedMessage {
            message: message.into(),
        }
    }

    pub fn spawn(reason: impl Into<String>) -> Self {
        Self::ProcessSpawn {
            reason: reason.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn channel_send(message: impl Into<String>) -> Self {
        Self::ChannelSend {
            message: message.into(),
        }
    }

    pub fn device_not_found(id: impl Into<String>) -> Self {
        Self::DeviceNotFound { id: id.into() }
    }

    pub fn emulator(message: impl Into<String>) -> Self {
        Self::Emulator {
            message: message.into(),
        }
    }

    /// Check if this is a recoverable error
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::DaemonNotRunning { .. }
                | Error::MalformedMessage { .. }
                | Error::AlreadyRunning
                | Error::ChannelSend { .. }
                | Error::ProcessExit { .. }
                | Error::DeviceNotFound { .. }
        )
    }

    /// Check if this error should abort the command that produced it
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::FlutterNotFound | Error::WorkspaceNotFound | Error::ProcessSpawn { .. }
        )
    }
}

// ─────────────────────────────────────────────────────────────────
// Error Context Extensions
// ─────────────────────────────────────────────────────────────────

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let err = e.into();
            tracing::error!("{}: {:?}", context.into(), err);
            err
        })
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| {
            let err = e.into();
            tracing::error!("{}: {:?}", f(), err);
            err
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_messages() {
        let err = Error::not_running("device.enable");
        assert_eq!(
            err.to_string(),
            "Daemon not running but got request: device.enable"
        );

        let err = Error::FlutterNotFound;
        assert!(err.to_string().contains("Flutter SDK not found"));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_error_is_fatal() {
        assert!(Error::FlutterNotFound.is_fatal());
        assert!(Error::WorkspaceNotFound.is_fatal());
        assert!(Error::spawn("permission denied").is_fatal());
        assert!(!Error::not_running("device.enable").is_fatal());
    }

    #[test]
    fn test_error_is_recoverable() {
        assert!(Error::not_running("device.enable").is_recoverable());
        assert!(Error::malformed("missing id").is_recoverable());
        assert!(Error::AlreadyRunning.is_recoverable());
        assert!(!Error::WorkspaceNotFound.is_recoverable());
    }

    #[test]
    fn test_not_running_is_distinct_from_exit() {
        let not_running = Error::not_running("device.enable");
        let exited = Error::ProcessExit { code: Some(1) };
        assert!(matches!(not_running, Error::DaemonNotRunning { .. }));
        assert!(!matches!(exited, Error::DaemonNotRunning { .. }));
    }

    #[test]
    fn test_result_ext_preserves_error() {
        let res: std::result::Result<(), std::io::Error> = Err(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "denied",
        ));
        let err = res.context("writing state").unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
