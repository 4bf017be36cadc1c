//! Polling backend
//!
//! Periodically stats requested files and walks requested directories,
//! reporting differences against the previous scan. Useful where OS
//! notifications are unavailable or unreliable (network mounts, containers).

use super::{ExternalWatcher, Subscription};
use crate::debounce::EventSink;
use crate::error::{Result, WatchError};
use crate::filter::{IgnoreRules, WatchScope};
use stalewatch_core::{ChangeEvent, Timestamp};
use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::runtime::{Handle, RuntimeFlavor};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Path -> last seen mtime
type MtimeSnapshot = BTreeMap<PathBuf, SystemTime>;

/// Shortest accepted scan interval
const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// mtime-polling external watcher
pub struct PollingWatcher {
    /// Scan interval
    interval: Duration,

    /// Runtime the polling tasks are spawned on
    runtime: Handle,

    /// Ignore rules applied below watched directories
    rules: Arc<IgnoreRules>,
}

impl PollingWatcher {
    /// Create a polling watcher
    ///
    /// `interval` is raised to 1ms if smaller.
    pub fn new(interval: Duration, runtime: Handle, rules: Arc<IgnoreRules>) -> Self {
        Self {
            interval: interval.max(MIN_INTERVAL),
            runtime,
            rules,
        }
    }
}

impl ExternalWatcher for PollingWatcher {
    fn watch(
        &self,
        files: &BTreeSet<PathBuf>,
        directories: &BTreeSet<PathBuf>,
        sink: EventSink,
    ) -> Result<Box<dyn Subscription>> {
        let scope = WatchScope::new(files, directories, Arc::clone(&self.rules));
        let baseline = baseline_scan(&scope);

        info!(
            "Polling watcher started (interval: {:?}, {} paths tracked)",
            self.interval,
            baseline.len()
        );

        let poller = Poller {
            scope,
            interval: self.interval,
            sink,
            last: baseline,
            scanner: scan,
        };
        let task = self.runtime.spawn(poller.run());

        Ok(Box::new(PollSubscription { task: Some(task) }))
    }

    fn name(&self) -> &'static str {
        "poll"
    }
}

struct PollSubscription {
    task: Option<JoinHandle<()>>,
}

impl Subscription for PollSubscription {
    fn close(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            debug!("Polling watcher stopped");
        }
    }
}

struct Poller {
    scope: WatchScope,
    interval: Duration,
    sink: EventSink,
    last: MtimeSnapshot,
    scanner: fn(&WatchScope) -> MtimeSnapshot,
}

impl Poller {
    async fn run(mut self) {
        let mut timer = interval(self.interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        // First tick completes immediately; the baseline is already taken
        timer.tick().await;

        loop {
            timer.tick().await;

            let scope = self.scope.clone();
            let scanner = self.scanner;
            let current = match tokio::task::spawn_blocking(move || scanner(&scope)).await {
                Ok(current) => current,
                Err(e) => {
                    warn!("Polling scan failed: {}", e);
                    self.sink.fail(WatchError::Io(io::Error::other(e)));
                    break;
                }
            };

            let events = diff(&self.last, &current);
            self.last = current;

            if events.is_empty() {
                continue;
            }

            debug!("Polling found {} changes", events.len());
            if !self.sink.emit(events) {
                debug!("Sink closed, polling stops");
                break;
            }
        }
    }
}

/// Initial scan, taken on the caller's thread
///
/// On a multi-threaded runtime the worker is handed off first so the walk
/// does not stall other tasks.
fn baseline_scan(scope: &WatchScope) -> MtimeSnapshot {
    match Handle::try_current().map(|handle| handle.runtime_flavor()) {
        Ok(RuntimeFlavor::MultiThread) => tokio::task::block_in_place(|| scan(scope)),
        _ => scan(scope),
    }
}

/// Stat every path in scope
///
/// Paths that vanish mid-scan are simply absent from the result.
fn scan(scope: &WatchScope) -> MtimeSnapshot {
    let mut snapshot = MtimeSnapshot::new();

    for file in scope.files() {
        if let Some(mtime) = modified(file) {
            snapshot.insert(file.clone(), mtime);
        }
    }

    for dir in scope.directories() {
        let walker = WalkDir::new(dir)
            .follow_links(false)
            .into_iter()
            .filter_entry(|e| scope.admits(e.path()));

        for entry in walker.flatten() {
            if let Some(mtime) = entry.metadata().ok().and_then(|m| m.modified().ok()) {
                snapshot.insert(entry.into_path(), mtime);
            }
        }
    }

    snapshot
}

fn modified(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// Compare two scans
///
/// New paths are Created and changed mtimes are Modified, both stamped with
/// the mtime. Paths gone from `current` are Deleted.
fn diff(previous: &MtimeSnapshot, current: &MtimeSnapshot) -> Vec<ChangeEvent> {
    let mut events = Vec::new();

    for (path, mtime) in current {
        let time = Timestamp::from_system_time(*mtime);
        match previous.get(path) {
            None => events.push(ChangeEvent::created(path.clone()).at(time)),
            Some(prev) if prev != mtime => events.push(ChangeEvent::modified(path.clone()).at(time)),
            Some(_) => {}
        }
    }

    for path in previous.keys() {
        if !current.contains_key(path) {
            events.push(ChangeEvent::deleted(path.clone()));
        }
    }

    events
}
