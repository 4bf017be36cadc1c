//! Watch configuration (`stalewatch.toml`)

use crate::error::{Result, WatchError};
use crate::filter::IgnoreConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::warn;

/// Default config file name
pub const CONFIG_FILE_NAME: &str = "stalewatch.toml";

/// Which external watcher backend to use
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// OS notifications (inotify, FSEvents, ReadDirectoryChangesW)
    #[default]
    Native,
    /// mtime polling
    Poll,
}

/// Watch configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Backend selection (default: native)
    #[serde(default)]
    pub backend: Backend,

    /// Polling interval for the poll backend (default: 1000ms)
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Merge batches arriving within this window (default: 0, no merging)
    #[serde(default)]
    pub coalesce_window_ms: u64,

    /// Ignore rules for paths below watched directories
    #[serde(default)]
    pub ignore: IgnoreConfig,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            backend: Backend::Native,
            poll_interval_ms: default_poll_interval_ms(),
            coalesce_window_ms: 0,
            ignore: IgnoreConfig::default(),
        }
    }
}

fn default_poll_interval_ms() -> u64 {
    1000
}

impl WatchConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents).map_err(|source| WatchError::Config {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load configuration, falling back to defaults
    ///
    /// A missing file is silent; an unreadable or invalid one logs a warning.
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!("{}. Using defaults.", e);
                Self::default()
            }
        }
    }

    /// Parse configuration from a TOML string
    pub fn parse(contents: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    /// Render as TOML
    pub fn to_toml(&self) -> String {
        // Plain structs of strings, integers and enums always serialize
        toml::to_string_pretty(self).unwrap_or_default()
    }

    /// Polling interval, never zero
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    /// Coalescing window (zero disables merging)
    pub fn coalesce_window(&self) -> Duration {
        Duration::from_millis(self.coalesce_window_ms)
    }
}
