//! Console build host
//!
//! A minimal stand-in for an incremental compiler: each build reads its input
//! files through a [`ReadCache`] and then asks the installed watch provider to
//! report what goes stale.

use crate::render::{self, Format};
use anyhow::{Context, Result};
use stalewatch_watcher::{
    BuildHost, ImmediateCallback, NotifyCallback, ReadCache, Timestamp, WatchHandle,
    WatchProvider, WatchedPathSet,
};
use std::sync::Arc;
use tracing::{debug, info};

pub struct ConsoleHost {
    provider: Option<Arc<dyn WatchProvider>>,
    cache: Arc<ReadCache>,
    format: Format,
    builds: u32,
}

impl ConsoleHost {
    pub fn new(cache: Arc<ReadCache>, format: Format) -> Self {
        Self {
            provider: None,
            cache,
            format,
            builds: 0,
        }
    }

    /// Run one build over `paths` and start watching its inputs
    pub fn build(&mut self, paths: WatchedPathSet) -> Result<WatchHandle> {
        let provider = self
            .provider
            .clone()
            .context("No watch provider installed")?;

        self.builds += 1;
        // Taken before reading so writes racing the build still count as changes
        let start_time = Timestamp::now();

        let read = self.read_inputs(&paths);
        info!(build = self.builds, files = read, "Build inputs read");

        let format = self.format;
        let cache = self.cache.clone();
        let on_notify: NotifyCallback = Box::new(move |result| match result {
            Ok(batch) => {
                println!("{}", render::batch(&batch, format));
                // Refill the cache the way the next build would
                for path in batch.changed_paths.iter().filter(|p| p.is_file()) {
                    if let Err(e) = cache.read(path) {
                        debug!("Re-read of {} failed: {}", path.display(), e);
                    }
                }
            }
            Err(e) => match format {
                Format::Json => println!("{}", render::failure(&e, format)),
                Format::Human => eprintln!("{}", render::failure(&e, format)),
            },
        });
        let on_immediate: ImmediateCallback =
            Box::new(move |path, time| println!("{}", render::immediate(&path, time, format)));

        let handle = provider
            .watch(paths, start_time, on_notify, Some(on_immediate))
            .context("Failed to start watching")?;
        Ok(handle)
    }

    /// Number of builds run so far
    pub fn builds(&self) -> u32 {
        self.builds
    }

    fn read_inputs(&self, paths: &WatchedPathSet) -> usize {
        paths
            .files
            .iter()
            .filter(|path| match self.cache.read(path) {
                Ok(_) => true,
                Err(e) => {
                    debug!("Skipping unreadable input {}: {}", path.display(), e);
                    false
                }
            })
            .count()
    }
}

impl BuildHost for ConsoleHost {
    fn build_started(&self) -> bool {
        self.builds > 0
    }

    fn set_watch_provider(&mut self, provider: Arc<dyn WatchProvider>) {
        self.provider = Some(provider);
    }
}
