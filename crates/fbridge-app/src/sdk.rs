//! Flutter SDK resolution
//!
//! `flutter` is found on `PATH` (or taken from settings) and symlinks are
//! resolved, because the Dart SDK lives next to the real executable:
//!
//! ```text
//! <flutter>/bin/flutter
//! <flutter>/bin/cache/dart-sdk/bin/dart
//! <flutter>/bin/cache/dart-sdk/bin/snapshots/analysis_server.dart.snapshot
//! ```

use std::path::{Path, PathBuf};

use fbridge_core::prelude::*;
use fbridge_daemon::ToolchainLocator;

const FLUTTER_COMMAND: &str = "flutter";

#[cfg(windows)]
const DART_EXECUTABLE: &str = "dart.bat";
#[cfg(not(windows))]
const DART_EXECUTABLE: &str = "dart";

/// A resolved Flutter SDK
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlutterSdk {
    /// Canonical path of the `flutter` executable
    pub flutter: PathBuf,
    /// `<flutter bin>/cache/dart-sdk`
    pub dart_home: PathBuf,
    pub dart_command: PathBuf,
    pub analyzer_snapshot: PathBuf,
}

impl FlutterSdk {
    /// Resolve from an explicit path, or from `PATH` when `None`
    pub fn locate(flutter_override: Option<&Path>) -> Result<Self> {
        let flutter = match flutter_override {
            Some(path) if path.exists() => path.to_path_buf(),
            Some(path) => {
                warn!("Configured flutter_command {:?} does not exist", path);
                return Err(Error::FlutterNotFound);
            }
            None => which::which(FLUTTER_COMMAND).map_err(|e| {
                debug!("flutter not found on PATH: {}", e);
                Error::FlutterNotFound
            })?,
        };

        Ok(Self::from_flutter_path(&flutter))
    }

    /// Derive the SDK layout from a `flutter` executable path
    pub fn from_flutter_path(flutter: &Path) -> Self {
        let flutter = dunce::canonicalize(flutter).unwrap_or_else(|e| {
            debug!("Could not canonicalize {:?}: {}", flutter, e);
            flutter.to_path_buf()
        });
        let bin_dir = flutter.parent().map(Path::to_path_buf).unwrap_or_default();
        let dart_home = bin_dir.join("cache").join("dart-sdk");

        let sdk = Self {
            dart_command: dart_home.join("bin").join(DART_EXECUTABLE),
            analyzer_snapshot: dart_home
                .join("bin")
                .join("snapshots")
                .join("analysis_server.dart.snapshot"),
            dart_home,
            flutter,
        };
        debug!("flutter command path => {:?}", sdk.flutter);
        debug!("dart sdk home => {:?}", sdk.dart_home);
        sdk
    }

    /// Whether the Dart analysis server snapshot is present
    pub fn has_analyzer(&self) -> bool {
        self.analyzer_snapshot.exists()
    }
}

/// [`ToolchainLocator`] that resolves the SDK on every start
///
/// Resolving late means installing Flutter (or fixing `PATH`) takes effect
/// on the next start without rebuilding the client.
#[derive(Debug, Clone, Default)]
pub struct SdkLocator {
    flutter_override: Option<PathBuf>,
}

impl SdkLocator {
    pub fn new(flutter_override: Option<PathBuf>) -> Self {
        Self { flutter_override }
    }
}

impl ToolchainLocator for SdkLocator {
    fn toolchain_command(&self) -> Option<PathBuf> {
        match FlutterSdk::locate(self.flutter_override.as_deref()) {
            Ok(sdk) => Some(sdk.flutter),
            Err(e) => {
                warn!("{}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn fake_sdk(root: &Path) -> PathBuf {
        let bin = root.join("flutter").join("bin");
        std::fs::create_dir_all(bin.join("cache/dart-sdk/bin/snapshots")).unwrap();
        std::fs::write(
            bin.join("cache/dart-sdk/bin/snapshots/analysis_server.dart.snapshot"),
            b"",
        )
        .unwrap();
        let flutter = bin.join("flutter");
        std::fs::write(&flutter, b"#!/bin/sh\n").unwrap();
        flutter
    }

    #[test]
    fn test_layout_from_flutter_path() {
        let temp = tempdir().unwrap();
        let flutter = fake_sdk(temp.path());

        let sdk = FlutterSdk::from_flutter_path(&flutter);
        let bin = dunce::canonicalize(flutter.parent().unwrap()).unwrap();
        assert_eq!(sdk.dart_home, bin.join("cache").join("dart-sdk"));
        assert!(sdk.dart_command.ends_with(Path::new("bin").join(DART_EXECUTABLE)));
        assert!(sdk.has_analyzer());
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_is_resolved() {
        let temp = tempdir().unwrap();
        let flutter = fake_sdk(temp.path());
        let link_dir = temp.path().join("usr-bin");
        std::fs::create_dir_all(&link_dir).unwrap();
        let link = link_dir.join("flutter");
        std::os::unix::fs::symlink(&flutter, &link).unwrap();

        let sdk = FlutterSdk::from_flutter_path(&link);
        assert_eq!(sdk.flutter, dunce::canonicalize(&flutter).unwrap());
        assert!(sdk.has_analyzer());
    }

    #[test]
    fn test_missing_override_is_not_found() {
        let result = FlutterSdk::locate(Some(Path::new("/definitely/not/flutter")));
        assert!(matches!(result, Err(Error::FlutterNotFound)));
    }

    #[test]
    fn test_locator_with_override() {
        let temp = tempdir().unwrap();
        let flutter = fake_sdk(temp.path());

        let locator = SdkLocator::new(Some(flutter.clone()));
        assert_eq!(
            locator.toolchain_command(),
            Some(dunce::canonicalize(&flutter).unwrap())
        );
        assert_eq!(SdkLocator::new(Some(temp.path().join("nope"))).toolchain_command(), None);
    }
}
