//! Watched path sets and change classification

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Which watched collection a path belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PathClass {
    /// Requested as a file
    File,
    /// Requested as a directory
    Directory,
    /// Requested as a path expected to appear later
    Missing,
}

/// The three path collections a watch is started with
///
/// Fixed for the lifetime of one `watch()` call. The collections are expected
/// to be disjoint; if they are not, classification picks the first match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchedPathSet {
    /// Files the build read
    #[serde(default)]
    pub files: BTreeSet<PathBuf>,
    /// Directories the build enumerated
    #[serde(default)]
    pub directories: BTreeSet<PathBuf>,
    /// Paths the build probed that did not exist yet
    #[serde(default)]
    pub missing: BTreeSet<PathBuf>,
}

impl WatchedPathSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Add files
    pub fn with_files<I, P>(mut self, files: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.files.extend(files.into_iter().map(Into::into));
        self
    }

    /// Add directories
    pub fn with_directories<I, P>(mut self, directories: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.directories.extend(directories.into_iter().map(Into::into));
        self
    }

    /// Add missing paths
    pub fn with_missing<I, P>(mut self, missing: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.missing.extend(missing.into_iter().map(Into::into));
        self
    }

    /// Classify a changed path
    ///
    /// Priority order: files, then directories, then missing.
    /// Returns `None` for paths in none of the collections.
    pub fn classify(&self, path: &Path) -> Option<PathClass> {
        if self.files.contains(path) {
            Some(PathClass::File)
        } else if self.directories.contains(path) {
            Some(PathClass::Directory)
        } else if self.missing.contains(path) {
            Some(PathClass::Missing)
        } else {
            None
        }
    }

    /// Paths that get a table entry at watch start (files and directories)
    pub fn seeded(&self) -> impl Iterator<Item = &Path> {
        self.files
            .iter()
            .chain(self.directories.iter())
            .map(PathBuf::as_path)
    }

    /// Total number of requested paths
    pub fn len(&self) -> usize {
        self.files.len() + self.directories.len() + self.missing.len()
    }

    /// Check if nothing was requested
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> WatchedPathSet {
        WatchedPathSet::new()
            .with_files(["src/a.ts"])
            .with_directories(["src"])
            .with_missing(["src/b.ts"])
    }

    #[test]
    fn test_classify_each_collection() {
        let paths = sample();
        assert_eq!(paths.classify(Path::new("src/a.ts")), Some(PathClass::File));
        assert_eq!(paths.classify(Path::new("src")), Some(PathClass::Directory));
        assert_eq!(paths.classify(Path::new("src/b.ts")), Some(PathClass::Missing));
        assert_eq!(paths.classify(Path::new("other.ts")), None);
    }

    #[test]
    fn test_classify_priority_on_overlap() {
        let paths = WatchedPathSet::new()
            .with_files(["x"])
            .with_directories(["x", "y"])
            .with_missing(["x", "y", "z"]);

        assert_eq!(paths.classify(Path::new("x")), Some(PathClass::File));
        assert_eq!(paths.classify(Path::new("y")), Some(PathClass::Directory));
        assert_eq!(paths.classify(Path::new("z")), Some(PathClass::Missing));
    }

    #[test]
    fn test_seeded_excludes_missing() {
        let paths = sample();
        let seeded: Vec<&Path> = paths.seeded().collect();

        assert_eq!(seeded, vec![Path::new("src/a.ts"), Path::new("src")]);
        assert_eq!(paths.len(), 3);
    }
}
