//! Emulator discovery and launch
//!
//! Runs `flutter emulators` and parses its human-readable table. Each
//! emulator line has exactly four `•`-separated columns:
//!
//! ```text
//! apple_ios_simulator • iOS Simulator • Apple  • ios
//! Pixel_6_API_33      • Pixel 6       • Google • android
//! ```

use std::path::Path;

use tokio::process::Command;

use fbridge_core::prelude::*;

/// An emulator or simulator the toolchain can launch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Emulator {
    /// Identifier passed to `--launch`
    pub id: String,
    pub name: String,
    /// Manufacturer column (e.g. "Google", "Apple")
    pub platform: String,
    /// Target OS (e.g. "android", "ios")
    pub system: String,
}

impl Emulator {
    /// `id • name • platform • system`
    pub fn list_label(&self) -> String {
        format!(
            "{} • {} • {} • {}",
            self.id, self.name, self.platform, self.system
        )
    }
}

/// List available emulators
pub async fn list_emulators(flutter: &Path) -> Result<Vec<Emulator>> {
    let output = Command::new(flutter)
        .arg("emulators")
        .output()
        .await
        .map_err(|e| Error::emulator(format!("Failed to run flutter emulators: {}", e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::emulator(format!(
            "flutter emulators failed: {}",
            stderr.trim()
        )));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let emulators = parse_emulator_list(&stdout);
    debug!("Found {} emulators", emulators.len());
    Ok(emulators)
}

/// Launch an emulator by id and wait for the launch command to finish
pub async fn launch_emulator(flutter: &Path, emulator_id: &str) -> Result<()> {
    info!("Launching emulator {}", emulator_id);

    let output = Command::new(flutter)
        .args(["emulators", "--launch", emulator_id])
        .output()
        .await
        .map_err(|e| Error::emulator(format!("Failed to launch {}: {}", emulator_id, e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::emulator(format!(
            "Failed to launch {}: {}",
            emulator_id,
            stderr.trim()
        )));
    }

    Ok(())
}

/// Parse the output of `flutter emulators`
///
/// Header, footer and blank lines do not have four columns and are skipped.
pub fn parse_emulator_list(output: &str) -> Vec<Emulator> {
    output
        .lines()
        .filter_map(|line| {
            let columns: Vec<&str> = line.split('•').map(str::trim).collect();
            match columns.as_slice() {
                [id, name, platform, system] => Some(Emulator {
                    id: id.to_string(),
                    name: name.to_string(),
                    platform: platform.to_string(),
                    system: system.to_string(),
                }),
                _ => None,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
2 available emulators:

apple_ios_simulator • iOS Simulator • Apple  • ios
Pixel_6_API_33      • Pixel 6       • Google • android

To run an emulator, run 'flutter emulators --launch <emulator id>'.
To create a new emulator, run 'flutter emulators --create [--name xyz]'.
";

    #[test]
    fn test_parse_emulator_list() {
        let emulators = parse_emulator_list(SAMPLE);
        assert_eq!(emulators.len(), 2);
        assert_eq!(
            emulators[0],
            Emulator {
                id: "apple_ios_simulator".to_string(),
                name: "iOS Simulator".to_string(),
                platform: "Apple".to_string(),
                system: "ios".to_string(),
            }
        );
        assert_eq!(emulators[1].id, "Pixel_6_API_33");
        assert_eq!(emulators[1].system, "android");
    }

    #[test]
    fn test_lines_with_other_column_counts_are_skipped() {
        let output = "a • b • c\na • b • c • d • e\nid • name • vendor • os\n";
        let emulators = parse_emulator_list(output);
        assert_eq!(emulators.len(), 1);
        assert_eq!(emulators[0].id, "id");
    }

    #[test]
    fn test_empty_output() {
        assert!(parse_emulator_list("").is_empty());
        assert!(parse_emulator_list("No emulators available.\n").is_empty());
    }

    #[test]
    fn test_list_label() {
        let emulator = parse_emulator_list("id • name • vendor • os").remove(0);
        assert_eq!(emulator.list_label(), "id • name • vendor • os");
    }

    #[tokio::test]
    async fn test_missing_flutter_binary() {
        let result = list_emulators(Path::new("/definitely/not/flutter")).await;
        assert!(matches!(result, Err(Error::Emulator { .. })));
    }
}
