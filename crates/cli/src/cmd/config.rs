//! Configuration display command

use anyhow::Result;
use owo_colors::OwoColorize;
use stalewatch_watcher::{Backend, WatchConfig};

/// Print the effective configuration
pub fn run(config: &WatchConfig) -> Result<()> {
    println!("{}", "Watch Configuration".bold());

    let backend = match config.backend {
        Backend::Native => "native",
        Backend::Poll => "poll",
    };
    println!("  {} = {}", "backend".cyan(), backend);
    println!(
        "  {} = {} {}",
        "poll_interval_ms".cyan(),
        config.poll_interval_ms,
        if config.backend == Backend::Poll {
            "".to_string()
        } else {
            "(unused by native backend)".dimmed().to_string()
        }
    );
    println!(
        "  {} = {} {}",
        "coalesce_window_ms".cyan(),
        config.coalesce_window_ms,
        if config.coalesce_window_ms == 0 {
            "(no merging)".dimmed().to_string()
        } else {
            "".to_string()
        }
    );

    println!("\n{}", "[ignore]".yellow());
    println!("  {} = {}", "use_builtin".cyan(), config.ignore.use_builtin);
    if config.ignore.additional_patterns.is_empty() {
        println!("  {} = {}", "additional_patterns".cyan(), "[]".dimmed());
    } else {
        println!("  {}:", "additional_patterns".cyan());
        for pattern in &config.ignore.additional_patterns {
            println!("    - {}", pattern);
        }
    }

    println!("\n{}", "As TOML:".dimmed());
    print!("{}", config.to_toml());

    Ok(())
}
