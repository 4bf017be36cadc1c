//! Output formatting for watch notifications

use owo_colors::OwoColorize;
use serde_json::json;
use stalewatch_watcher::{NotificationBatch, Timestamp, WatchError};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Output style selected on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Human,
    Json,
}

impl Format {
    pub fn from_flag(json: bool) -> Self {
        if json {
            Format::Json
        } else {
            Format::Human
        }
    }
}

fn path_strings(paths: &BTreeSet<PathBuf>) -> Vec<String> {
    paths.iter().map(|p| p.display().to_string()).collect()
}

/// Render one notification batch
pub fn batch(batch: &NotificationBatch, format: Format) -> String {
    match format {
        Format::Json => json!({
            "type": "batch",
            "changed": path_strings(&batch.changed_paths),
            "removed": path_strings(&batch.removed_paths),
            "tracked": batch.file_time_info.len(),
        })
        .to_string(),
        Format::Human => {
            let mut out = format!(
                "{} {} changed, {} removed {}",
                "[batch]".yellow(),
                batch.changed_paths.len(),
                batch.removed_paths.len(),
                format!("({} tracked)", batch.file_time_info.len()).dimmed()
            );
            for path in &batch.changed_paths {
                out.push_str(&format!("\n  {} {}", "~".cyan(), path.display()));
            }
            for path in &batch.removed_paths {
                out.push_str(&format!("\n  {} {}", "-".red(), path.display()));
            }
            out
        }
    }
}

/// Render the first change seen in a batch
pub fn immediate(path: &Path, time: Timestamp, format: Format) -> String {
    match format {
        Format::Json => json!({
            "type": "immediate",
            "path": path.display().to_string(),
            "time": time.as_millis(),
        })
        .to_string(),
        Format::Human => format!(
            "{} {} {}",
            "[change]".cyan(),
            path.display(),
            format!("@{}", time).dimmed()
        ),
    }
}

/// Render a backend failure
pub fn failure(error: &WatchError, format: Format) -> String {
    match format {
        Format::Json => json!({
            "type": "error",
            "message": error.to_string(),
        })
        .to_string(),
        Format::Human => format!("{} {}", "[error]".red().bold(), error),
    }
}
