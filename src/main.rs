//! Flutter Bridge - device discovery and selection over the Flutter daemon
//!
//! This is the binary entry point. All logic lives in the workspace crates.

mod watch;

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use color_eyre::eyre::eyre;
use color_eyre::Result;
use tracing::info;

use fbridge_app::{Engine, FlutterSdk};
use fbridge_core::PersistenceMode;
use fbridge_daemon::{launch_emulator, list_emulators};

/// Flutter Bridge - device discovery and selection over the Flutter daemon
#[derive(Parser, Debug)]
#[command(name = "fbridge")]
#[command(about = "Device discovery and selection over the Flutter daemon", long_about = None)]
struct Args {
    /// Directory to search for a Flutter project
    #[arg(long, short = 'C', value_name = "PATH", global = true)]
    path: Option<PathBuf>,

    /// Mirror logs to stderr
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Seconds to wait for device discovery to settle
    #[arg(long, default_value_t = 30, global = true)]
    wait: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List connected devices
    Devices,

    /// Select a device and remember the choice
    Select {
        /// Device id as shown by `fbridge devices`
        device_id: String,

        /// dont-store, memory, workspace-state, workspace-config, global-state or global-config
        #[arg(long, default_value = "workspace-state")]
        store: PersistenceMode,
    },

    /// List emulators, or launch one
    Emulators {
        /// Emulator id to launch
        #[arg(long, value_name = "ID")]
        launch: Option<String>,
    },

    /// Stream status changes as NDJSON until interrupted
    Watch,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Args::parse();
    fbridge_core::logging::init(args.verbose)?;

    let base_path = match args.path {
        Some(path) => path,
        None => std::env::current_dir()?,
    };
    let wait = Duration::from_secs(args.wait);

    match args.command {
        Command::Devices => list_devices(Engine::new(&base_path), wait).await,
        Command::Select { device_id, store } => {
            select_device(Engine::new(&base_path), &device_id, store, wait).await
        }
        Command::Emulators { launch } => emulators(Engine::new(&base_path), launch).await,
        Command::Watch => watch::run(Engine::new(&base_path)).await,
    }
}

/// Start the daemon and wait for the first discovery round
async fn start(engine: &mut Engine, wait: Duration) -> Result<()> {
    // Start failures arrive as notifications; print them like an editor would
    let mut notifications = engine.take_notifications();
    let started = engine.start();
    if let Some(rx) = notifications.as_mut() {
        while let Ok(notification) = rx.try_recv() {
            eprintln!("{}", notification.text());
        }
    }
    started?;
    engine.wait_for_devices(wait).await;
    Ok(())
}

async fn list_devices(mut engine: Engine, wait: Duration) -> Result<()> {
    start(&mut engine, wait).await?;

    let client = engine.client();
    let devices = client.devices();
    let current = client.current_device().map(|d| d.id);
    if devices.is_empty() {
        eprintln!("No devices found.");
    }
    for device in &devices {
        let marker = if current.as_deref() == Some(device.id.as_str()) {
            "*"
        } else {
            " "
        };
        println!("{} {}", marker, device.list_label());
    }

    engine.shutdown();
    Ok(())
}

async fn select_device(
    mut engine: Engine,
    device_id: &str,
    store: PersistenceMode,
    wait: Duration,
) -> Result<()> {
    start(&mut engine, wait).await?;

    let result = engine.select(device_id, store);
    engine.shutdown();
    let device = result?;

    info!("Selected {} ({}) with {}", device.name, device.id, store);
    println!("Selected {} ({})", device.display_name(), device.id);
    if store.is_durable() {
        println!("Saved to {}", store);
    }
    Ok(())
}

async fn emulators(engine: Engine, launch: Option<String>) -> Result<()> {
    let sdk = FlutterSdk::locate(engine.settings().daemon.flutter_command.as_deref())?;

    match launch {
        Some(id) => {
            launch_emulator(&sdk.flutter, &id).await?;
            println!("Launched {}", id);
        }
        None => {
            let emulators = list_emulators(&sdk.flutter).await?;
            if emulators.is_empty() {
                return Err(eyre!("No emulators available"));
            }
            for emulator in &emulators {
                println!("{}", emulator.list_label());
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_parses_store_mode() {
        let args = Args::try_parse_from(["fbridge", "select", "d1", "--store", "global-config"])
            .unwrap();
        match args.command {
            Command::Select { device_id, store } => {
                assert_eq!(device_id, "d1");
                assert_eq!(store, PersistenceMode::GlobalConfig);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_select_defaults_to_workspace_state() {
        let args = Args::try_parse_from(["fbridge", "select", "d1"]).unwrap();
        assert!(matches!(
            args.command,
            Command::Select {
                store: PersistenceMode::WorkspaceState,
                ..
            }
        ));
    }

    #[test]
    fn test_unknown_store_mode_is_rejected() {
        assert!(Args::try_parse_from(["fbridge", "select", "d1", "--store", "cloud"]).is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let args = Args::try_parse_from(["fbridge", "devices", "--wait", "5", "-v"]).unwrap();
        assert_eq!(args.wait, 5);
        assert!(args.verbose);
        assert!(matches!(args.command, Command::Devices));
    }
}
