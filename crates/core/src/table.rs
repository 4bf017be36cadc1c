//! Per-path time info table

use crate::time::Timestamp;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Snapshot of the table handed to consumers
///
/// Uses ahash (faster for path keys); always an owned copy.
pub type TimeInfoMap = HashMap<PathBuf, TimeInfoEntry, ahash::RandomState>;

/// Time info for a single path
///
/// `safe_time` and `timestamp` are always equal here. Consumers read them as
/// two distinct values, so both are carried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeInfoEntry {
    /// Time after which the path is known to be stable
    pub safe_time: Timestamp,
    /// Last observed change time
    pub timestamp: Timestamp,
}

impl TimeInfoEntry {
    /// Entry observed at `time`
    pub const fn at(time: Timestamp) -> Self {
        Self {
            safe_time: time,
            timestamp: time,
        }
    }
}

/// Mutable mapping from path to time info
///
/// Owned by one watch session and kept across rebuilds, so staleness state
/// survives between build cycles.
#[derive(Debug, Clone, Default)]
pub struct TimeInfoTable {
    entries: TimeInfoMap,
}

impl TimeInfoTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Set every path to `start_time`, overwriting existing entries
    pub fn seed<'a, I>(&mut self, paths: I, start_time: Timestamp)
    where
        I: IntoIterator<Item = &'a Path>,
    {
        let entry = TimeInfoEntry::at(start_time);
        for path in paths {
            self.entries.insert(path.to_path_buf(), entry);
        }
    }

    /// Record a change at `time`, returning the previous entry
    pub fn upsert(&mut self, path: &Path, time: Timestamp) -> Option<TimeInfoEntry> {
        self.entries.insert(path.to_path_buf(), TimeInfoEntry::at(time))
    }

    /// Remove a path, returning its entry if it was tracked
    pub fn remove(&mut self, path: &Path) -> Option<TimeInfoEntry> {
        self.entries.remove(path)
    }

    /// Look up a path
    pub fn get(&self, path: &Path) -> Option<&TimeInfoEntry> {
        self.entries.get(path)
    }

    /// Check whether a path is tracked
    pub fn contains(&self, path: &Path) -> bool {
        self.entries.contains_key(path)
    }

    /// Number of tracked paths
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the table is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Owned copy of the current state
    pub fn snapshot(&self) -> TimeInfoMap {
        self.entries.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(ms: u64) -> Timestamp {
        Timestamp::from_millis(ms)
    }

    #[test]
    fn test_seed_sets_both_fields() {
        let mut table = TimeInfoTable::new();
        table.seed([Path::new("a.ts"), Path::new("src")], ts(1000));

        assert_eq!(table.len(), 2);
        let entry = table.get(Path::new("a.ts")).unwrap();
        assert_eq!(entry.safe_time, ts(1000));
        assert_eq!(entry.timestamp, ts(1000));
    }

    #[test]
    fn test_seed_overwrites_existing() {
        let mut table = TimeInfoTable::new();
        table.upsert(Path::new("a.ts"), ts(5000));
        table.seed([Path::new("a.ts")], ts(1000));

        assert_eq!(table.get(Path::new("a.ts")), Some(&TimeInfoEntry::at(ts(1000))));
    }

    #[test]
    fn test_upsert_is_last_write_wins() {
        let mut table = TimeInfoTable::new();
        assert!(table.upsert(Path::new("a.ts"), ts(2000)).is_none());
        let previous = table.upsert(Path::new("a.ts"), ts(1500));

        assert_eq!(previous, Some(TimeInfoEntry::at(ts(2000))));
        assert_eq!(table.get(Path::new("a.ts")), Some(&TimeInfoEntry::at(ts(1500))));
    }

    #[test]
    fn test_remove() {
        let mut table = TimeInfoTable::new();
        table.upsert(Path::new("a.ts"), ts(2000));

        assert!(table.remove(Path::new("a.ts")).is_some());
        assert!(table.remove(Path::new("a.ts")).is_none());
        assert!(table.is_empty());
    }

    #[test]
    fn test_snapshot_is_detached() {
        let mut table = TimeInfoTable::new();
        table.upsert(Path::new("a.ts"), ts(2000));

        let mut snapshot = table.snapshot();
        snapshot.remove(Path::new("a.ts"));
        snapshot.insert(PathBuf::from("b.ts"), TimeInfoEntry::at(ts(1)));

        assert!(table.contains(Path::new("a.ts")));
        assert!(!table.contains(Path::new("b.ts")));
    }
}
