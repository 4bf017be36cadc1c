//! Native backend using OS notifications
//!
//! Files are watched through their parent directory (non-recursive) so that
//! atomic saves, which replace the file, are still observed. Directories are
//! watched recursively. Paths should be absolute: `notify` reports event
//! paths joined onto the watched path.

use super::{ExternalWatcher, Subscription};
use crate::debounce::EventSink;
use crate::error::{Result, WatchError};
use crate::filter::{IgnoreRules, WatchScope};
use notify::event::{ModifyKind, RenameMode};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use stalewatch_core::{ChangeEvent, ChangeKind};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info};

/// `notify`-backed external watcher
pub struct NotifyWatcher {
    rules: Arc<IgnoreRules>,
}

impl NotifyWatcher {
    /// Create a native watcher applying `rules` below watched directories
    pub fn new(rules: Arc<IgnoreRules>) -> Self {
        Self { rules }
    }
}

impl Default for NotifyWatcher {
    fn default() -> Self {
        Self::new(Arc::new(IgnoreRules::none()))
    }
}

impl ExternalWatcher for NotifyWatcher {
    fn watch(
        &self,
        files: &BTreeSet<PathBuf>,
        directories: &BTreeSet<PathBuf>,
        sink: EventSink,
    ) -> Result<Box<dyn Subscription>> {
        let scope = WatchScope::new(files, directories, Arc::clone(&self.rules));

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    let events = translate(&event, &scope);
                    if !events.is_empty() {
                        sink.emit(events);
                    }
                }
                Err(e) => {
                    error!("Native watcher failed: {}", e);
                    sink.fail(WatchError::Notify(e));
                }
            },
            Config::default(),
        )?;

        let parents = file_parents(files, directories);
        for parent in &parents {
            watcher.watch(parent, RecursiveMode::NonRecursive)?;
        }
        for dir in directories {
            watcher.watch(dir, RecursiveMode::Recursive)?;
        }

        info!(
            "Native watcher started ({} file parents, {} directories)",
            parents.len(),
            directories.len()
        );

        Ok(Box::new(NotifySubscription {
            watcher: Some(watcher),
        }))
    }

    fn name(&self) -> &'static str {
        "native"
    }
}

/// Keeps the OS watcher alive; dropping it stops all watches
struct NotifySubscription {
    watcher: Option<RecommendedWatcher>,
}

impl Subscription for NotifySubscription {
    fn close(&mut self) {
        if self.watcher.take().is_some() {
            debug!("Native watcher stopped");
        }
    }
}

/// Parent directories of requested files not already covered recursively
fn file_parents(files: &BTreeSet<PathBuf>, directories: &BTreeSet<PathBuf>) -> BTreeSet<PathBuf> {
    files
        .iter()
        .filter_map(|file| file.parent())
        .map(|parent| {
            if parent.as_os_str().is_empty() {
                Path::new(".")
            } else {
                parent
            }
        })
        .filter(|parent| !directories.iter().any(|dir| parent.starts_with(dir)))
        .map(Path::to_path_buf)
        .collect()
}

/// Map a `notify` event onto change events within scope
fn translate(event: &Event, scope: &WatchScope) -> Vec<ChangeEvent> {
    let with_kind = |kind: ChangeKind| -> Vec<ChangeEvent> {
        event
            .paths
            .iter()
            .map(|path| ChangeEvent::new(path.clone(), kind))
            .collect()
    };

    let events = match event.kind {
        EventKind::Create(_) => with_kind(ChangeKind::Created),
        EventKind::Remove(_) => with_kind(ChangeKind::Deleted),
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => with_kind(ChangeKind::Deleted),
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => with_kind(ChangeKind::Created),
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            let mut events = Vec::with_capacity(2);
            if let Some(from) = event.paths.first() {
                events.push(ChangeEvent::deleted(from.clone()));
            }
            if let Some(to) = event.paths.get(1) {
                events.push(ChangeEvent::created(to.clone()));
            }
            events
        }
        // Platforms that cannot tell rename sides apart
        EventKind::Modify(ModifyKind::Name(_)) => event
            .paths
            .iter()
            .map(|path| {
                if path.exists() {
                    ChangeEvent::created(path.clone())
                } else {
                    ChangeEvent::deleted(path.clone())
                }
            })
            .collect(),
        EventKind::Modify(_) => with_kind(ChangeKind::Modified),
        EventKind::Access(_) | EventKind::Any | EventKind::Other => Vec::new(),
    };

    events
        .into_iter()
        .filter(|event| scope.admits(&event.path))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::debounce::{self, Deferred};
    use crate::filter::IgnoreConfig;
    use notify::event::{AccessKind, CreateKind, DataChange, RemoveKind};
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;

    fn scope() -> WatchScope {
        let files = BTreeSet::from([PathBuf::from("/p/a.ts")]);
        let directories = BTreeSet::from([PathBuf::from("/p/src")]);
        let rules = Arc::new(IgnoreRules::new(&IgnoreConfig::default()).unwrap());
        WatchScope::new(&files, &directories, rules)
    }

    fn kinds(events: &[ChangeEvent]) -> Vec<(&str, ChangeKind)> {
        events
            .iter()
            .map(|e| (e.path.to_str().unwrap(), e.kind))
            .collect()
    }

    #[test]
    fn test_translate_basic_kinds() {
        let scope = scope();

        let create = Event::new(EventKind::Create(CreateKind::File)).add_path("/p/src/b.ts".into());
        assert_eq!(kinds(&translate(&create, &scope)), vec![("/p/src/b.ts", ChangeKind::Created)]);

        let modify = Event::new(EventKind::Modify(ModifyKind::Data(DataChange::Content)))
            .add_path("/p/a.ts".into());
        assert_eq!(kinds(&translate(&modify, &scope)), vec![("/p/a.ts", ChangeKind::Modified)]);

        let remove = Event::new(EventKind::Remove(RemoveKind::File)).add_path("/p/a.ts".into());
        assert_eq!(kinds(&translate(&remove, &scope)), vec![("/p/a.ts", ChangeKind::Deleted)]);
    }

    #[test]
    fn test_translate_rename_both() {
        let event = Event::new(EventKind::Modify(ModifyKind::Name(RenameMode::Both)))
            .add_path("/p/src/old.ts".into())
            .add_path("/p/src/new.ts".into());

        assert_eq!(
            kinds(&translate(&event, &scope())),
            vec![
                ("/p/src/old.ts", ChangeKind::Deleted),
                ("/p/src/new.ts", ChangeKind::Created),
            ]
        );
    }

    #[test]
    fn test_translate_skips_access_and_out_of_scope() {
        let scope = scope();

        let access = Event::new(EventKind::Access(AccessKind::Any)).add_path("/p/a.ts".into());
        assert!(translate(&access, &scope).is_empty());

        // Sibling of a watched file, seen through the parent watch
        let sibling = Event::new(EventKind::Create(CreateKind::File)).add_path("/p/b.ts".into());
        assert!(translate(&sibling, &scope).is_empty());

        let swap = Event::new(EventKind::Create(CreateKind::File))
            .add_path("/p/src/.b.ts.swp".into());
        assert!(translate(&swap, &scope).is_empty());
    }

    #[test]
    fn test_file_parents_skip_covered() {
        let files = BTreeSet::from([
            PathBuf::from("/p/a.ts"),
            PathBuf::from("/p/b.ts"),
            PathBuf::from("/p/src/c.ts"),
        ]);
        let directories = BTreeSet::from([PathBuf::from("/p/src")]);

        let parents = file_parents(&files, &directories);
        assert_eq!(parents, BTreeSet::from([PathBuf::from("/p")]));
    }

    #[test]
    fn test_watch_reports_real_write() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().canonicalize().unwrap();
        let file = root.join("main.ts");
        fs::write(&file, b"let a = 1;").unwrap();

        let (sink, mut queue, _gate) = debounce::channel(Duration::ZERO);
        let watcher = NotifyWatcher::default();
        let mut subscription = watcher
            .watch(&BTreeSet::from([file.clone()]), &BTreeSet::new(), sink)
            .unwrap();

        fs::write(&file, b"let a = 2;").unwrap();

        let mut seen = false;
        while let Some(Deferred::Batch(events)) = queue.next_timeout(Duration::from_secs(5)) {
            if events.iter().any(|e| e.path == file && !e.is_deletion()) {
                seen = true;
                break;
            }
        }
        subscription.close();
        assert!(seen, "expected a change event for {}", file.display());
    }

    #[test]
    fn test_watch_missing_directory_fails() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("does-not-exist");

        let (sink, _queue, _gate) = debounce::channel(Duration::ZERO);
        let result = NotifyWatcher::default().watch(
            &BTreeSet::new(),
            &BTreeSet::from([missing]),
            sink,
        );
        assert!(result.is_err());
    }
}
