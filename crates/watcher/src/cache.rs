//! Concurrent file content cache with watch-driven eviction

use crate::hook::CacheInvalidationHook;
use bytes::Bytes;
use dashmap::DashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::trace;

/// Read-through cache of file contents
///
/// Build steps read through [`ReadCache::read`]; the watch session purges
/// entries as changes arrive. Purging a directory evicts everything cached
/// below it.
#[derive(Default)]
pub struct ReadCache {
    /// Cached contents (path -> bytes)
    entries: DashMap<PathBuf, Bytes>,
    /// Reads served from cache
    hits: AtomicU64,
    /// Reads that went to disk
    misses: AtomicU64,
}

impl ReadCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a file, serving from cache when possible
    pub fn read(&self, path: &Path) -> io::Result<Bytes> {
        if let Some(cached) = self.entries.get(path) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(cached.clone());
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let contents = Bytes::from(std::fs::read(path)?);
        self.entries.insert(path.to_path_buf(), contents.clone());
        Ok(contents)
    }

    /// Check whether a path is cached
    pub fn contains(&self, path: &Path) -> bool {
        self.entries.contains_key(path)
    }

    /// Number of cached files
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// (hits, misses) since creation
    pub fn stats(&self) -> (u64, u64) {
        (
            self.hits.load(Ordering::Relaxed),
            self.misses.load(Ordering::Relaxed),
        )
    }
}

impl CacheInvalidationHook for ReadCache {
    fn purge(&self, path: &Path) {
        let before = self.entries.len();
        self.entries.retain(|cached, _| !cached.starts_with(path));
        trace!(
            "Purged {} cache entries for {}",
            before.saturating_sub(self.entries.len()),
            path.display()
        );
    }
}
