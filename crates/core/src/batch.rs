//! Per-batch change accounting and the notification payload

use crate::paths::PathClass;
use crate::table::TimeInfoMap;
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Notification delivered to the build consumer once per coalesced batch
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotificationBatch {
    /// File-level time info (copy of the table)
    pub file_time_info: TimeInfoMap,
    /// Context/directory-level time info (identical copy of the table)
    pub context_time_info: TimeInfoMap,
    /// Paths that changed and belong to a watched collection
    pub changed_paths: BTreeSet<PathBuf>,
    /// Paths deleted in this batch
    pub removed_paths: BTreeSet<PathBuf>,
}

impl NotificationBatch {
    /// Check if the batch reports no changes and no removals
    pub fn is_empty(&self) -> bool {
        self.changed_paths.is_empty() && self.removed_paths.is_empty()
    }
}

/// Accumulates classified changes while a batch is processed
///
/// The last event for a path within a batch decides whether it is reported
/// as changed or removed; a path is never in both.
#[derive(Debug, Clone, Default)]
pub struct ChangeBuckets {
    file_changes: BTreeSet<PathBuf>,
    directory_changes: BTreeSet<PathBuf>,
    missing_changes: BTreeSet<PathBuf>,
    removed: BTreeSet<PathBuf>,
}

impl ChangeBuckets {
    /// Create empty buckets
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a non-deleting change
    ///
    /// Returns false when the path is unclassified; such paths are not
    /// reported but are no longer considered removed either.
    pub fn record_change(&mut self, path: &Path, class: Option<PathClass>) -> bool {
        self.removed.remove(path);
        match class {
            Some(PathClass::File) => self.file_changes.insert(path.to_path_buf()),
            Some(PathClass::Directory) => self.directory_changes.insert(path.to_path_buf()),
            Some(PathClass::Missing) => self.missing_changes.insert(path.to_path_buf()),
            None => return false,
        };
        true
    }

    /// Record a deletion
    pub fn record_removal(&mut self, path: &Path) {
        self.file_changes.remove(path);
        self.directory_changes.remove(path);
        self.missing_changes.remove(path);
        self.removed.insert(path.to_path_buf());
    }

    /// Files that changed
    pub fn file_changes(&self) -> &BTreeSet<PathBuf> {
        &self.file_changes
    }

    /// Directories that changed
    pub fn directory_changes(&self) -> &BTreeSet<PathBuf> {
        &self.directory_changes
    }

    /// Missing paths that appeared or changed
    pub fn missing_changes(&self) -> &BTreeSet<PathBuf> {
        &self.missing_changes
    }

    /// Paths deleted in this batch
    pub fn removed(&self) -> &BTreeSet<PathBuf> {
        &self.removed
    }

    /// Union of the three change buckets
    pub fn changed_paths(&self) -> BTreeSet<PathBuf> {
        self.file_changes
            .iter()
            .chain(&self.directory_changes)
            .chain(&self.missing_changes)
            .cloned()
            .collect()
    }

    /// Build the notification from a table snapshot
    ///
    /// The snapshot is passed twice: once as file-level and once as
    /// context-level time info.
    pub fn into_batch(self, snapshot: TimeInfoMap) -> NotificationBatch {
        let changed_paths = self.changed_paths();
        NotificationBatch {
            file_time_info: snapshot.clone(),
            context_time_info: snapshot,
            changed_paths,
            removed_paths: self.removed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::TimeInfoEntry;
    use crate::time::Timestamp;

    #[test]
    fn test_changes_land_in_matching_bucket() {
        let mut buckets = ChangeBuckets::new();
        assert!(buckets.record_change(Path::new("a.ts"), Some(PathClass::File)));
        assert!(buckets.record_change(Path::new("src"), Some(PathClass::Directory)));
        assert!(buckets.record_change(Path::new("b.ts"), Some(PathClass::Missing)));

        assert_eq!(buckets.file_changes().len(), 1);
        assert_eq!(buckets.directory_changes().len(), 1);
        assert_eq!(buckets.missing_changes().len(), 1);
        assert_eq!(buckets.changed_paths().len(), 3);
    }

    #[test]
    fn test_unclassified_change_is_not_reported() {
        let mut buckets = ChangeBuckets::new();
        assert!(!buckets.record_change(Path::new("stray.ts"), None));
        assert!(buckets.changed_paths().is_empty());
    }

    #[test]
    fn test_removal_after_change_wins() {
        let mut buckets = ChangeBuckets::new();
        buckets.record_change(Path::new("a.ts"), Some(PathClass::File));
        buckets.record_removal(Path::new("a.ts"));

        assert!(buckets.changed_paths().is_empty());
        assert!(buckets.removed().contains(Path::new("a.ts")));
    }

    #[test]
    fn test_change_after_removal_wins() {
        let mut buckets = ChangeBuckets::new();
        buckets.record_removal(Path::new("a.ts"));
        buckets.record_change(Path::new("a.ts"), Some(PathClass::File));

        assert!(buckets.removed().is_empty());
        assert!(buckets.changed_paths().contains(Path::new("a.ts")));
    }

    #[test]
    fn test_into_batch_duplicates_snapshot() {
        let mut snapshot = TimeInfoMap::default();
        snapshot.insert(
            PathBuf::from("a.ts"),
            TimeInfoEntry::at(Timestamp::from_millis(2000)),
        );

        let mut buckets = ChangeBuckets::new();
        buckets.record_change(Path::new("a.ts"), Some(PathClass::File));
        let batch = buckets.into_batch(snapshot);

        assert_eq!(batch.file_time_info, batch.context_time_info);
        assert!(!batch.is_empty());
    }
}
