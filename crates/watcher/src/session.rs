//! Watch session: timestamp state, classification and notification
//!
//! One `WatchSession` serves one build-tool instance across many rebuilds.
//! Each `watch()` call seeds the shared time info table, subscribes to the
//! external watcher and starts a dispatcher that processes batches one at a
//! time:
//!
//! 1. Immediate callback with the first event of the batch
//! 2. Cache purge for every event (deletions included)
//! 3. Table update and classification (files, directories, missing), applied
//!    under a single lock so no reader sees a partial batch
//! 4. One notification carrying a copy of the table
//!
//! The table lock is never held while a hook or callback runs, so callbacks
//! may call back into the session or its handle.

use crate::debounce::{self, Deferred, DeferredQueue, SinkGate};
use crate::error::{Result, WatchError};
use crate::hook::CacheInvalidationHook;
use crate::platform::{ExternalWatcher, Subscription};
use parking_lot::Mutex;
use stalewatch_core::{
    ChangeBuckets, ChangeEvent, NotificationBatch, TimeInfoMap, TimeInfoTable, Timestamp,
    WatchedPathSet,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, trace};

/// Batch notification callback
///
/// Receives `Ok` once per processed batch, or `Err` once if the backend fails.
pub type NotifyCallback =
    Box<dyn FnMut(std::result::Result<NotificationBatch, WatchError>) + Send>;

/// Low-latency callback with the first path of each batch
pub type ImmediateCallback = Box<dyn FnMut(PathBuf, Timestamp) + Send>;

/// Shared time info table
type SharedTable = Arc<Mutex<TimeInfoTable>>;

/// Watch session for one build-tool instance
pub struct WatchSession {
    /// Backend supplying raw events
    watcher: Arc<dyn ExternalWatcher>,
    /// Optional cache eviction hook
    hook: Option<Arc<dyn CacheInvalidationHook>>,
    /// Time info table, kept across rebuilds
    table: SharedTable,
    /// Merge window for the deferred queue
    coalesce_window: Duration,
}

impl WatchSession {
    /// Create a session over an external watcher
    pub fn new(watcher: Arc<dyn ExternalWatcher>) -> Self {
        Self {
            watcher,
            hook: None,
            table: Arc::new(Mutex::new(TimeInfoTable::new())),
            coalesce_window: Duration::ZERO,
        }
    }

    /// Purge `hook` for every incoming event
    pub fn with_cache_hook(mut self, hook: Arc<dyn CacheInvalidationHook>) -> Self {
        self.hook = Some(hook);
        self
    }

    /// Merge batches arriving within `window` into one notification
    pub fn with_coalesce_window(mut self, window: Duration) -> Self {
        self.coalesce_window = window;
        self
    }

    /// Start watching
    ///
    /// Subscribes to the external watcher, seeds every file and directory at
    /// `start_time` and returns a handle. Subscription failures are returned
    /// as-is and not retried; the table is left untouched.
    pub fn watch(
        &self,
        paths: WatchedPathSet,
        start_time: Timestamp,
        on_notify: NotifyCallback,
        on_immediate: Option<ImmediateCallback>,
    ) -> Result<WatchHandle> {
        let (sink, queue, gate) = debounce::channel(self.coalesce_window);
        let subscription = self.watcher.watch(&paths.files, &paths.directories, sink)?;

        // Events queued meanwhile wait for the dispatcher, which starts below
        self.table.lock().seed(paths.seeded(), start_time);

        info!(
            "Watching {} files, {} directories, {} missing via {} backend",
            paths.files.len(),
            paths.directories.len(),
            paths.missing.len(),
            self.watcher.name()
        );

        let dispatcher = Dispatcher {
            queue,
            paths,
            table: Arc::clone(&self.table),
            hook: self.hook.clone(),
            on_notify,
            on_immediate,
        };

        // Handle first, so a spawn failure still unsubscribes on drop
        let handle = WatchHandle {
            subscription: Mutex::new(Some(subscription)),
            gate,
            table: Arc::clone(&self.table),
        };

        std::thread::Builder::new()
            .name("watch-session".to_string())
            .spawn(move || dispatcher.run())?;

        Ok(handle)
    }

    /// Copy of the current table (file-level view)
    pub fn file_time_info_entries(&self) -> TimeInfoMap {
        self.table.lock().snapshot()
    }

    /// Copy of the current table (context-level view)
    pub fn context_time_info_entries(&self) -> TimeInfoMap {
        self.table.lock().snapshot()
    }
}

/// Handle to one `watch()` call
///
/// Two states: watching, then closed. Dropping the handle closes it.
pub struct WatchHandle {
    subscription: Mutex<Option<Box<dyn Subscription>>>,
    gate: SinkGate,
    table: SharedTable,
}

impl WatchHandle {
    /// Stop receiving events
    ///
    /// Batches already queued are still processed, so one trailing
    /// notification may arrive after this returns. Idempotent.
    pub fn close(&self) {
        self.gate.close();
        if let Some(mut subscription) = self.subscription.lock().take() {
            subscription.close();
            info!("Watch closed");
        }
    }

    /// No-op: sessions cannot be suspended
    pub fn pause(&self) {
        trace!("pause() ignored");
    }

    /// Check whether `close()` has run
    pub fn is_closed(&self) -> bool {
        !self.gate.is_open()
    }

    /// Copy of the current table (file-level view)
    pub fn file_time_info_entries(&self) -> TimeInfoMap {
        self.table.lock().snapshot()
    }

    /// Copy of the current table (context-level view)
    pub fn context_time_info_entries(&self) -> TimeInfoMap {
        self.table.lock().snapshot()
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        self.close();
    }
}

/// Runs on the `watch-session` thread; sole processor of batches
struct Dispatcher {
    queue: DeferredQueue,
    paths: WatchedPathSet,
    table: SharedTable,
    hook: Option<Arc<dyn CacheInvalidationHook>>,
    on_notify: NotifyCallback,
    on_immediate: Option<ImmediateCallback>,
}

impl Dispatcher {
    fn run(mut self) {
        while let Some(work) = self.queue.next() {
            match work {
                Deferred::Batch(events) => self.dispatch(events),
                Deferred::Failed(e) => {
                    error!("External watcher failed, stopping session: {}", e);
                    (self.on_notify)(Err(e));
                    return;
                }
            }
        }
        debug!("Watch dispatcher finished");
    }

    fn dispatch(&mut self, events: Vec<ChangeEvent>) {
        let Some(first) = events.first() else {
            return;
        };

        if let Some(on_immediate) = self.on_immediate.as_mut() {
            on_immediate(first.path.clone(), first.time_or_now());
        }

        let batch = self.process(&events);
        debug!(
            "Batch of {} events: {} changed, {} removed",
            events.len(),
            batch.changed_paths.len(),
            batch.removed_paths.len()
        );
        (self.on_notify)(Ok(batch));
    }

    fn process(&self, events: &[ChangeEvent]) -> NotificationBatch {
        if let Some(hook) = &self.hook {
            for event in events {
                hook.purge(&event.path);
            }
        }

        let mut buckets = ChangeBuckets::new();

        // One guard for the whole batch: readers see all of it or none of it
        let mut table = self.table.lock();
        for event in events {
            if event.is_deletion() {
                table.remove(&event.path);
                buckets.record_removal(&event.path);
                continue;
            }

            table.upsert(&event.path, event.time_or_now());
            let class = self.paths.classify(&event.path);
            if !buckets.record_change(&event.path, class) {
                debug!("Change outside watched paths: {}", event.path.display());
            }
        }
        let snapshot = table.snapshot();
        drop(table);

        buckets.into_batch(snapshot)
    }
}
