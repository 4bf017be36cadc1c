//! Error types for the watcher crate

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while setting up or running a watch
#[derive(Debug, Error)]
pub enum WatchError {
    /// The OS notification backend failed
    #[error("file watcher backend failed: {0}")]
    Notify(#[from] notify::Error),

    /// Filesystem or thread spawn failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An ignore pattern could not be compiled
    #[error("invalid ignore pattern: {0}")]
    Pattern(#[from] ignore::Error),

    /// Config file could not be parsed
    #[error("failed to parse config {}: {source}", path.display())]
    Config {
        /// Config file that failed
        path: PathBuf,
        /// Underlying parse error
        #[source]
        source: toml::de::Error,
    },

    /// The polling backend was requested outside a tokio runtime
    #[error("polling backend requires a tokio runtime")]
    NoRuntime,

    /// A watch provider was already installed into the host
    #[error("watch provider already installed")]
    AlreadyInstalled,

    /// The host started building before the provider was installed
    #[error("cannot install watch provider after the first build has started")]
    BuildStarted,
}

/// Result type for watcher operations
pub type Result<T> = std::result::Result<T, WatchError>;
