//! Watch command
//!
//! Installs a watch session into a console host, runs one build and prints
//! notifications until Ctrl+C.

use crate::host::ConsoleHost;
use crate::render::Format;
use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use stalewatch_watcher::{
    create_external_watcher, LifecycleAdapter, ReadCache, WatchConfig, WatchSession,
    WatchedPathSet,
};
use std::sync::Arc;
use tracing::info;

pub async fn run(config: WatchConfig, paths: WatchedPathSet, json: bool) -> Result<()> {
    let format = Format::from_flag(json);

    let watcher = create_external_watcher(&config).context("Failed to create file watcher")?;
    let backend = watcher.name();

    let cache = Arc::new(ReadCache::new());
    let session = Arc::new(
        WatchSession::new(watcher)
            .with_cache_hook(cache.clone())
            .with_coalesce_window(config.coalesce_window()),
    );

    let mut host = ConsoleHost::new(cache.clone(), format);
    LifecycleAdapter::new(session)
        .install(&mut host)
        .context("Failed to install watch session")?;

    let watched = paths.len();
    let handle = host.build(paths)?;

    if format == Format::Human {
        println!(
            "{} Watching {} paths with the {} backend {}",
            "[stalewatch]".green(),
            watched,
            backend.cyan(),
            "(Ctrl+C to stop)".dimmed()
        );
    }

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl+C")?;

    handle.close();

    let (hits, misses) = cache.stats();
    info!(hits, misses, cached = cache.len(), "Watch stopped");
    if format == Format::Human {
        println!(
            "\n{} Stopped {}",
            "[stalewatch]".green(),
            format!("(cache: {} hits, {} misses)", hits, misses).dimmed()
        );
    }

    Ok(())
}
