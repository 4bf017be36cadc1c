//! File watching for incremental builds
//!
//! This crate turns raw filesystem change notifications into the
//! timestamp/staleness contract an incremental compiler expects:
//! - Per-path time info kept across rebuilds
//! - Classification into file, directory and missing-path changes
//! - Deferred, coalesced batch notification
//! - Cache invalidation on every change
//! - Native (`notify`) and polling backends

pub mod cache;
pub mod config;
pub mod debounce;
pub mod error;
pub mod filter;
pub mod hook;
pub mod lifecycle;
pub mod platform;
pub mod session;

// Re-exports
pub use cache::ReadCache;
pub use config::{Backend, WatchConfig};
pub use debounce::EventSink;
pub use error::{Result, WatchError};
pub use filter::{IgnoreConfig, IgnoreRules};
pub use hook::CacheInvalidationHook;
pub use lifecycle::{BuildHost, LifecycleAdapter, WatchProvider};
pub use platform::{create_external_watcher, ExternalWatcher, Subscription};
pub use session::{ImmediateCallback, NotifyCallback, WatchHandle, WatchSession};

pub use stalewatch_core::{
    ChangeEvent, ChangeKind, NotificationBatch, PathClass, TimeInfoEntry, TimeInfoMap,
    Timestamp, WatchedPathSet,
};
