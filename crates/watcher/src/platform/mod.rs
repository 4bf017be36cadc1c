//! External watcher backends
//!
//! Provides the capability traits a backend implements ([`ExternalWatcher`],
//! [`Subscription`]) with two implementations: OS notifications through the
//! `notify` crate, and mtime polling on a tokio interval.

pub mod native;
pub mod poll;

use crate::config::{Backend, WatchConfig};
use crate::debounce::EventSink;
use crate::error::{Result, WatchError};
use crate::filter::IgnoreRules;
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

pub use native::NotifyWatcher;
pub use poll::PollingWatcher;

/// Source of raw change events
///
/// Implementations push batches into the sink from any thread and must never
/// emit an empty batch. Runtime failures go through [`EventSink::fail`] and
/// end the subscription; they are not retried here.
pub trait ExternalWatcher: Send + Sync {
    /// Start watching the given files and directories
    ///
    /// Errors returned here are fatal for the `watch()` call that asked.
    fn watch(
        &self,
        files: &BTreeSet<PathBuf>,
        directories: &BTreeSet<PathBuf>,
        sink: EventSink,
    ) -> Result<Box<dyn Subscription>>;

    /// Short backend name for logs
    fn name(&self) -> &'static str;
}

/// A live subscription returned by [`ExternalWatcher::watch`]
pub trait Subscription: Send {
    /// Stop delivering events. Must be idempotent.
    fn close(&mut self);
}

/// Create the backend selected by configuration
///
/// The polling backend must be created inside a tokio runtime.
pub fn create_external_watcher(config: &WatchConfig) -> Result<Arc<dyn ExternalWatcher>> {
    let rules = Arc::new(IgnoreRules::new(&config.ignore)?);

    match config.backend {
        Backend::Native => Ok(Arc::new(NotifyWatcher::new(rules))),
        Backend::Poll => {
            let runtime =
                tokio::runtime::Handle::try_current().map_err(|_| WatchError::NoRuntime)?;
            Ok(Arc::new(PollingWatcher::new(
                config.poll_interval(),
                runtime,
                rules,
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_poll_backend_needs_runtime() {
        let config = WatchConfig {
            backend: Backend::Poll,
            ..WatchConfig::default()
        };
        assert!(matches!(
            create_external_watcher(&config),
            Err(WatchError::NoRuntime)
        ));
    }

    #[test]
    fn test_native_backend_by_default() {
        let watcher = create_external_watcher(&WatchConfig::default()).unwrap();
        assert_eq!(watcher.name(), "native");
    }

    #[tokio::test]
    async fn test_poll_backend_inside_runtime() {
        let config = WatchConfig {
            backend: Backend::Poll,
            ..WatchConfig::default()
        };
        let watcher = create_external_watcher(&config).unwrap();
        assert_eq!(watcher.name(), "poll");
    }
}
