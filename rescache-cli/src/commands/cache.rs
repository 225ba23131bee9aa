//! Cache management CLI commands.

use clap::Subcommand;
use rescache::cache::{CacheConfig, ResourceCache};
use rescache::config::{format_size_approx, ConfigFile};

use crate::error::CliError;

/// Cache action subcommands.
#[derive(Debug, Subcommand)]
pub enum CacheAction {
    /// Show cache size and entry counts
    Stats,
    /// List cached products, most recently used first
    List,
    /// Remove every cached product and descriptor
    Clear,
}

/// Run a cache subcommand.
pub fn run(action: CacheAction, config: &ConfigFile) -> Result<(), CliError> {
    let cache = ResourceCache::open(CacheConfig::from(config))?;
    let cache_dir = &cache.config().cache_dir;

    match action {
        CacheAction::Stats => {
            let stats = cache.stats();
            println!("Resource cache: {}", cache_dir.display());
            println!("  Entries: {}", stats.entry_count);
            println!("  Size:    {}", format_size_approx(stats.size_bytes));
            if stats.max_size_bytes == 0 {
                println!("  Limit:   unbounded");
            } else {
                println!("  Limit:   {}", format_size_approx(stats.max_size_bytes));
            }
            if let Some(utilization) = stats.utilization() {
                println!("  Used:    {:.1}%", utilization * 100.0);
            }
        }
        CacheAction::List => {
            let entries = cache.entries();
            if entries.is_empty() {
                println!("Cache is empty.");
            }
            for entry in entries {
                println!(
                    "{:>10}  {:<24}  {}",
                    format_size_approx(entry.size_bytes()),
                    entry.mime_type(),
                    entry.key()
                );
            }
        }
        CacheAction::Clear => {
            println!("Clearing resource cache at: {}", cache_dir.display());
            let size = cache.size_bytes();
            let removed = cache.clear()?;
            println!("Removed {} entries, freed {}", removed, format_size_approx(size));
        }
    }

    Ok(())
}
