//! Cache invalidation capability

use std::path::Path;

/// Per-path cache eviction, called for every event before classification
///
/// Deletions are purged too, so a stale cached read can never outlive the
/// file. Implementations must be cheap; they run on the session dispatcher.
pub trait CacheInvalidationHook: Send + Sync {
    /// Evict anything cached for `path`
    fn purge(&self, path: &Path);
}

impl<F> CacheInvalidationHook for F
where
    F: Fn(&Path) + Send + Sync,
{
    fn purge(&self, path: &Path) {
        self(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::path::PathBuf;
    use std::sync::Arc;

    #[test]
    fn test_closure_is_a_hook() {
        let purged = Arc::new(Mutex::new(Vec::<PathBuf>::new()));
        let sink = Arc::clone(&purged);
        let hook: Box<dyn CacheInvalidationHook> =
            Box::new(move |path: &Path| sink.lock().push(path.to_path_buf()));

        hook.purge(Path::new("a.ts"));
        assert_eq!(*purged.lock(), vec![PathBuf::from("a.ts")]);
    }
}
