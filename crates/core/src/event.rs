//! Raw change events delivered by watcher backends

use crate::time::Timestamp;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Type of file system change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    /// Path started existing
    Created,
    /// Path content or metadata changed
    Modified,
    /// Path stopped existing
    Deleted,
}

/// A single change reported by an external watcher
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    /// Path that changed
    pub path: PathBuf,
    /// Type of change
    pub kind: ChangeKind,
    /// When the change happened, if the backend knows
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<Timestamp>,
}

impl ChangeEvent {
    /// Create an event without a known time
    pub fn new(path: impl Into<PathBuf>, kind: ChangeKind) -> Self {
        Self {
            path: path.into(),
            kind,
            time: None,
        }
    }

    /// Path was created
    pub fn created(path: impl Into<PathBuf>) -> Self {
        Self::new(path, ChangeKind::Created)
    }

    /// Path was modified
    pub fn modified(path: impl Into<PathBuf>) -> Self {
        Self::new(path, ChangeKind::Modified)
    }

    /// Path was deleted
    pub fn deleted(path: impl Into<PathBuf>) -> Self {
        Self::new(path, ChangeKind::Deleted)
    }

    /// Attach the observed time
    pub fn at(mut self, time: Timestamp) -> Self {
        self.time = Some(time);
        self
    }

    /// Observed time, falling back to the current clock
    pub fn time_or_now(&self) -> Timestamp {
        self.time.unwrap_or_else(Timestamp::now)
    }

    /// Check whether this event removes the path
    pub fn is_deletion(&self) -> bool {
        self.kind == ChangeKind::Deleted
    }

    /// Borrow the path
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_time_wins() {
        let event = ChangeEvent::modified("a.ts").at(Timestamp::from_millis(2000));
        assert_eq!(event.time_or_now(), Timestamp::from_millis(2000));
    }

    #[test]
    fn test_missing_time_uses_clock() {
        let before = Timestamp::now();
        let event = ChangeEvent::created("a.ts");
        assert!(event.time_or_now() >= before);
    }

    #[test]
    fn test_json_shape() {
        let event = ChangeEvent::deleted("a.ts");
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(json, r#"{"path":"a.ts","kind":"deleted"}"#);
    }
}
