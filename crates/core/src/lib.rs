//! Core data model for stalewatch
//!
//! This crate provides:
//! - Millisecond timestamps for the staleness model
//! - The per-path time info table and its snapshots
//! - Watched path sets and change classification
//! - Change events and per-batch notification payloads
//!
//! Nothing here performs I/O; the watcher crate drives these types.

pub mod batch;
pub mod event;
pub mod paths;
pub mod table;
pub mod time;

// Re-exports
pub use batch::{ChangeBuckets, NotificationBatch};
pub use event::{ChangeEvent, ChangeKind};
pub use paths::{PathClass, WatchedPathSet};
pub use table::{TimeInfoEntry, TimeInfoMap, TimeInfoTable};
pub use time::Timestamp;
