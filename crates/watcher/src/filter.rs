//! Ignore rules and watch scope for backends
//!
//! Backends see every change under a watched directory, including editor
//! swap files and VCS metadata. Two layers decide what reaches the session:
//! 1. Scope: explicitly requested files, or anything below a requested directory
//! 2. Ignore rules: built-in patterns plus gitignore-style config patterns,
//!    applied only to paths discovered under directories
//!
//! Explicitly requested files are never ignored.

use crate::error::Result;
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Ignore rule set
pub struct IgnoreRules {
    /// Compiled config patterns (None when there are none)
    patterns: Option<Gitignore>,

    /// Configuration
    config: IgnoreConfig,
}

impl IgnoreRules {
    /// Compile rules from configuration
    pub fn new(config: &IgnoreConfig) -> Result<Self> {
        let patterns = if config.additional_patterns.is_empty() {
            None
        } else {
            let mut builder = GitignoreBuilder::new("/");
            for pattern in &config.additional_patterns {
                builder.add_line(None, pattern)?;
            }
            Some(builder.build()?)
        };

        Ok(Self {
            patterns,
            config: config.clone(),
        })
    }

    /// Rules that ignore nothing
    pub fn none() -> Self {
        Self {
            patterns: None,
            config: IgnoreConfig {
                use_builtin: false,
                additional_patterns: Vec::new(),
            },
        }
    }

    /// Check if path should be ignored
    pub fn should_ignore(&self, path: &Path) -> bool {
        if self.config.use_builtin && is_builtin_ignored(path) {
            return true;
        }

        let Some(patterns) = &self.patterns else {
            return false;
        };

        // A pattern like `dist/` must also hide everything below `dist`
        path.ancestors()
            .take_while(|p| p.file_name().is_some())
            .enumerate()
            .any(|(depth, p)| {
                let is_dir = depth > 0 || p.is_dir();
                patterns.matched(p, is_dir).is_ignore()
            })
    }

    /// Configuration these rules were built from
    pub fn config(&self) -> &IgnoreConfig {
        &self.config
    }
}

/// Check built-in patterns: VCS metadata and editor/OS scratch files
fn is_builtin_ignored(path: &Path) -> bool {
    let in_vcs_dir = path.components().any(|c| {
        matches!(
            c.as_os_str().to_str(),
            Some(".git" | ".hg" | ".svn" | ".jj")
        )
    });
    if in_vcs_dir {
        return true;
    }

    let filename = path.file_name().and_then(|n| n.to_str()).unwrap_or("");

    // Vim swap files
    if filename.ends_with(".swp")
        || filename.ends_with(".swo")
        || filename.ends_with(".swx")
    {
        return true;
    }

    // Backup files (~) and Emacs auto-save/lock files
    if filename.ends_with('~')
        || (filename.starts_with('#') && filename.ends_with('#'))
        || filename.starts_with(".#")
    {
        return true;
    }

    // OS metadata
    filename == ".DS_Store" || filename.starts_with("._") || filename == "Thumbs.db"
}

/// Which paths a backend forwards for one subscription
#[derive(Clone)]
pub struct WatchScope {
    files: BTreeSet<PathBuf>,
    directories: BTreeSet<PathBuf>,
    rules: Arc<IgnoreRules>,
}

impl WatchScope {
    /// Build a scope from the requested paths
    pub fn new(
        files: &BTreeSet<PathBuf>,
        directories: &BTreeSet<PathBuf>,
        rules: Arc<IgnoreRules>,
    ) -> Self {
        Self {
            files: files.clone(),
            directories: directories.clone(),
            rules,
        }
    }

    /// Check whether a changed path should be forwarded
    pub fn admits(&self, path: &Path) -> bool {
        if self.files.contains(path) {
            return true;
        }
        self.directories.iter().any(|dir| path.starts_with(dir)) && !self.rules.should_ignore(path)
    }

    /// Requested files
    pub fn files(&self) -> &BTreeSet<PathBuf> {
        &self.files
    }

    /// Requested directories
    pub fn directories(&self) -> &BTreeSet<PathBuf> {
        &self.directories
    }
}

/// Ignore configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IgnoreConfig {
    /// Apply built-in patterns (default: true)
    #[serde(default = "default_true")]
    pub use_builtin: bool,

    /// Additional gitignore-style patterns
    #[serde(default)]
    pub additional_patterns: Vec<String>,
}

impl Default for IgnoreConfig {
    fn default() -> Self {
        Self {
            use_builtin: true,
            additional_patterns: vec![],
        }
    }
}

fn default_true() -> bool {
    true
}
