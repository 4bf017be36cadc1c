//! Shared utilities for CLI commands

use anyhow::{Context, Result};
use stalewatch_watcher::config::CONFIG_FILE_NAME;
use stalewatch_watcher::{WatchConfig, WatchedPathSet};
use std::path::{Path, PathBuf};

/// Load configuration
///
/// An explicit `--config` must exist and parse. Without one, `stalewatch.toml`
/// in the current directory is used if present.
pub fn load_config(explicit: Option<&Path>) -> Result<WatchConfig> {
    match explicit {
        Some(path) => WatchConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => Ok(WatchConfig::load_or_default(Path::new(CONFIG_FILE_NAME))),
    }
}

/// Build the watched path set from command-line arguments
///
/// Relative paths are resolved against the current directory. Paths are not
/// canonicalized: missing paths have nothing to resolve.
pub fn watched_paths(
    files: Vec<PathBuf>,
    directories: Vec<PathBuf>,
    missing: Vec<PathBuf>,
) -> Result<WatchedPathSet> {
    let cwd = std::env::current_dir().context("Failed to get current directory")?;

    let paths = WatchedPathSet::new()
        .with_files(absolutize(&cwd, files))
        .with_directories(absolutize(&cwd, directories))
        .with_missing(absolutize(&cwd, missing));

    if paths.is_empty() {
        anyhow::bail!("Nothing to watch: pass at least one --file, --dir or --missing");
    }

    Ok(paths)
}

fn absolutize(cwd: &Path, paths: Vec<PathBuf>) -> Vec<PathBuf> {
    paths
        .into_iter()
        .map(|p| if p.is_absolute() { p } else { cwd.join(p) })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absolutize_keeps_absolute_paths() {
        let cwd = Path::new("/work");
        let resolved = absolutize(cwd, vec![PathBuf::from("/etc/hosts"), PathBuf::from("src/a.ts")]);
        assert_eq!(
            resolved,
            vec![PathBuf::from("/etc/hosts"), PathBuf::from("/work/src/a.ts")]
        );
    }

    #[test]
    fn test_empty_path_set_is_rejected() {
        assert!(watched_paths(vec![], vec![], vec![]).is_err());
    }

    #[test]
    fn test_missing_config_file_is_an_error() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("nope.toml");
        assert!(load_config(Some(&path)).is_err());
    }
}
