//! Stalewatch CLI - stalewatch command

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod cmd;
mod host;
mod render;
mod util;

/// Stalewatch - Watch inputs of an incremental build and report what went stale
#[derive(Parser)]
#[command(name = "stalewatch")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Config file (default: ./stalewatch.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Watch paths and print each change notification until Ctrl+C
    Watch {
        /// Files the build read
        #[arg(long = "file", value_name = "PATH")]
        files: Vec<PathBuf>,
        /// Directories the build enumerated
        #[arg(long = "dir", value_name = "PATH")]
        directories: Vec<PathBuf>,
        /// Paths the build looked for but did not find
        #[arg(long = "missing", value_name = "PATH")]
        missing: Vec<PathBuf>,
        /// Print notifications as JSON lines
        #[arg(long)]
        json: bool,
    },
    /// Print the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so --json output stays machine-readable
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = util::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Watch {
            files,
            directories,
            missing,
            json,
        } => {
            let paths = util::watched_paths(files, directories, missing)?;
            cmd::watch::run(config, paths, json).await
        }
        Commands::Config => cmd::config::run(&config),
    }
}
