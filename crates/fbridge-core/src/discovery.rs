//! Flutter workspace discovery
//!
//! Finds the directory the daemon should run in: the closest directory at or
//! below the starting point that contains a `pubspec.yaml`.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// Default maximum search depth
pub const DEFAULT_MAX_DEPTH: usize = 10;

const PUBSPEC: &str = "pubspec.yaml";

/// Directories to skip during search
const SKIP_DIRECTORIES: &[&str] = &[
    "node_modules",
    "build",
    "Pods",
    "__pycache__",
    "target",
];

/// Check whether a directory directly contains a `pubspec.yaml`
pub fn has_pubspec(path: &Path) -> bool {
    path.join(PUBSPEC).is_file()
}

/// Find every directory containing a `pubspec.yaml` below `base_path`
///
/// Results are ordered by depth first, then by path, so the first entry is
/// always the closest workspace folder.
pub fn find_workspace_folders(base_path: &Path, max_depth: usize) -> Vec<PathBuf> {
    let mut found = Vec::new();
    let mut level = vec![base_path.to_path_buf()];

    for depth in 0..=max_depth {
        let mut next_level = Vec::new();
        let mut found_here = Vec::new();

        for dir in &level {
            if has_pubspec(dir) {
                found_here.push(dir.clone());
            }
            if depth < max_depth {
                next_level.extend(child_directories(dir));
            }
        }

        found_here.sort();
        found.extend(found_here);

        if next_level.is_empty() {
            break;
        }
        level = next_level;
    }

    debug!(
        "Found {} pubspec folders under {:?} (depth {})",
        found.len(),
        base_path,
        max_depth
    );
    found
}

/// Find the closest workspace folder (fewest path components below `base_path`)
pub fn find_workspace_folder(base_path: &Path, max_depth: usize) -> Option<PathBuf> {
    closest_path(find_workspace_folders(base_path, max_depth))
}

/// Pick the path with the fewest components; ties go to the smallest path
pub fn closest_path(paths: Vec<PathBuf>) -> Option<PathBuf> {
    paths
        .into_iter()
        .min_by(|a, b| {
            a.components()
                .count()
                .cmp(&b.components().count())
                .then_with(|| a.cmp(b))
        })
}

fn child_directories(dir: &Path) -> Vec<PathBuf> {
    let entries = match fs::read_dir(dir) {
        Ok(e) => e,
        Err(err) => {
            trace!("Cannot read directory {:?}: {}", dir, err);
            return Vec::new();
        }
    };

    entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .filter(|path| {
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                return false;
            };
            // Skip hidden directories (.dart_tool, .git, ...)
            if name.starts_with('.') {
                trace!("Skipping hidden directory: {:?}", path);
                return false;
            }
            !SKIP_DIRECTORIES.contains(&name)
        })
        .collect()
}
