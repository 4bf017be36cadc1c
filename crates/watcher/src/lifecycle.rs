//! Installing a watch session into a host build tool
//!
//! The host gets its watch provider injected once, at setup, before the
//! first build. Every later rebuild calls the same provider, so the session's
//! time info table carries staleness state from one build to the next.

use crate::error::{Result, WatchError};
use crate::session::{ImmediateCallback, NotifyCallback, WatchHandle, WatchSession};
use stalewatch_core::{Timestamp, WatchedPathSet};
use std::sync::Arc;
use tracing::info;

/// What a host calls at the start of each watch cycle
pub trait WatchProvider: Send + Sync {
    /// Start watching `paths`, seeded at `start_time`
    fn watch(
        &self,
        paths: WatchedPathSet,
        start_time: Timestamp,
        on_notify: NotifyCallback,
        on_immediate: Option<ImmediateCallback>,
    ) -> Result<WatchHandle>;
}

impl WatchProvider for WatchSession {
    fn watch(
        &self,
        paths: WatchedPathSet,
        start_time: Timestamp,
        on_notify: NotifyCallback,
        on_immediate: Option<ImmediateCallback>,
    ) -> Result<WatchHandle> {
        WatchSession::watch(self, paths, start_time, on_notify, on_immediate)
    }
}

/// A build tool that accepts a file-watching provider
pub trait BuildHost {
    /// Whether the first build has begun
    fn build_started(&self) -> bool;

    /// Replace the host's file-watching provider
    fn set_watch_provider(&mut self, provider: Arc<dyn WatchProvider>);
}

/// Installs one session into one host
pub struct LifecycleAdapter {
    session: Arc<WatchSession>,
    installed: bool,
}

impl LifecycleAdapter {
    /// Wrap a session created by the caller
    pub fn new(session: Arc<WatchSession>) -> Self {
        Self {
            session,
            installed: false,
        }
    }

    /// Install the session as the host's watch provider
    ///
    /// Fails if already installed or if the host has started building.
    pub fn install<H: BuildHost + ?Sized>(&mut self, host: &mut H) -> Result<()> {
        if self.installed {
            return Err(WatchError::AlreadyInstalled);
        }
        if host.build_started() {
            return Err(WatchError::BuildStarted);
        }

        let provider: Arc<dyn WatchProvider> = self.session.clone();
        host.set_watch_provider(provider);
        self.installed = true;

        info!("Watch session installed into build host");
        Ok(())
    }

    /// Whether `install` has succeeded
    pub fn is_installed(&self) -> bool {
        self.installed
    }

    /// The installed session
    pub fn session(&self) -> &Arc<WatchSession> {
        &self.session
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::debounce::EventSink;
    use crate::platform::{ExternalWatcher, Subscription};
    use std::collections::BTreeSet;
    use std::path::{Path, PathBuf};

    struct Silent;

    struct Idle;

    impl Subscription for Idle {
        fn close(&mut self) {}
    }

    impl ExternalWatcher for Silent {
        fn watch(
            &self,
            _files: &BTreeSet<PathBuf>,
            _directories: &BTreeSet<PathBuf>,
            _sink: EventSink,
        ) -> Result<Box<dyn Subscription>> {
            Ok(Box::new(Idle))
        }

        fn name(&self) -> &'static str {
            "silent"
        }
    }

    #[derive(Default)]
    struct FakeHost {
        started: bool,
        provider: Option<Arc<dyn WatchProvider>>,
    }

    impl BuildHost for FakeHost {
        fn build_started(&self) -> bool {
            self.started
        }

        fn set_watch_provider(&mut self, provider: Arc<dyn WatchProvider>) {
            self.provider = Some(provider);
        }
    }

    fn adapter() -> LifecycleAdapter {
        LifecycleAdapter::new(Arc::new(WatchSession::new(Arc::new(Silent))))
    }

    fn ignore_notifications() -> NotifyCallback {
        Box::new(|_| {})
    }

    #[test]
    fn test_install_once() {
        let mut adapter = adapter();
        let mut host = FakeHost::default();

        adapter.install(&mut host).unwrap();
        assert!(adapter.is_installed());
        assert!(host.provider.is_some());

        assert!(matches!(
            adapter.install(&mut host),
            Err(WatchError::AlreadyInstalled)
        ));
    }

    #[test]
    fn test_install_after_build_start_fails() {
        let mut adapter = adapter();
        let mut host = FakeHost {
            started: true,
            ..FakeHost::default()
        };

        assert!(matches!(
            adapter.install(&mut host),
            Err(WatchError::BuildStarted)
        ));
        assert!(host.provider.is_none());
        assert!(!adapter.is_installed());
    }

    #[test]
    fn test_rebuilds_share_one_table() {
        let mut adapter = adapter();
        let mut host = FakeHost::default();
        adapter.install(&mut host).unwrap();
        let provider = host.provider.clone().unwrap();

        // First build cycle
        let first = provider
            .watch(
                WatchedPathSet::new().with_files(["a.ts"]),
                Timestamp::from_millis(1000),
                ignore_notifications(),
                None,
            )
            .unwrap();
        first.close();

        // Second build cycle watches a different file
        let second = provider
            .watch(
                WatchedPathSet::new().with_files(["b.ts"]),
                Timestamp::from_millis(2000),
                ignore_notifications(),
                None,
            )
            .unwrap();

        let entries = second.file_time_info_entries();
        assert!(entries.contains_key(Path::new("a.ts")));
        assert!(entries.contains_key(Path::new("b.ts")));
        assert_eq!(adapter.session().file_time_info_entries(), entries);
    }
}
