//! Logging configuration using tracing
//!
//! Everything goes to a daily-rolling file. The CLI can additionally mirror
//! events to stderr with `--verbose`.

use std::path::PathBuf;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::error::Result;

/// Target used for raw daemon output (non-protocol stdout lines and stderr)
pub const DAEMON_OUTPUT_TARGET: &str = "daemon_output";

/// Environment variable holding an `EnvFilter` directive
pub const LOG_ENV_VAR: &str = "FBRIDGE_LOG";

const DEFAULT_FILTER: &str = "flutter_bridge=info,fbridge_app=info,fbridge_daemon=info,warn";

/// Initialize the logging subsystem
///
/// Logs are written to `~/.local/share/flutter-bridge/logs/`
/// Log level is controlled by `FBRIDGE_LOG` environment variable.
///
/// # Examples
/// ```bash
/// FBRIDGE_LOG=debug fbridge devices
/// FBRIDGE_LOG=daemon_output=trace,debug fbridge watch
/// ```
pub fn init(mirror_to_stderr: bool) -> Result<()> {
    let log_dir = get_log_directory()?;
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, &log_dir, "fbridge.log");

    let env_filter =
        EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let stderr_layer = mirror_to_stderr.then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .without_time()
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(file_appender)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(false)
                .with_file(true)
                .with_line_number(true)
                .with_timer(fmt::time::ChronoLocal::new(
                    "%Y-%m-%d %H:%M:%S%.3f".to_string(),
                )),
        )
        .with(stderr_layer)
        .init();

    tracing::info!("═══════════════════════════════════════════════════════");
    tracing::info!("Flutter Bridge starting");
    tracing::info!("Log directory: {}", log_dir.display());
    tracing::info!("═══════════════════════════════════════════════════════");

    Ok(())
}

/// Get the log directory path
fn get_log_directory() -> Result<PathBuf> {
    let base = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    Ok(base.join("flutter-bridge").join("logs"))
}
