//! Configuration management CLI commands.

use std::path::Path;

use clap::Subcommand;
use rescache::config::{format_size, ConfigFile};

use crate::error::CliError;

/// Config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Show the configuration file path
    Path,

    /// Show the effective configuration
    Show,

    /// Write a default configuration file if none exists
    Init,
}

/// Run a config subcommand.
pub fn run(command: ConfigCommands, config_path: &Path) -> Result<(), CliError> {
    match command {
        ConfigCommands::Path => {
            println!("{}", config_path.display());
            Ok(())
        }
        ConfigCommands::Show => run_show(config_path),
        ConfigCommands::Init => run_init(config_path),
    }
}

fn run_show(config_path: &Path) -> Result<(), CliError> {
    let config = ConfigFile::load_from(config_path)?;

    println!("Configuration ({})", config_path.display());
    println!("======================");
    println!();
    println!("[cache]");
    println!("  directory  = {}", config.cache.directory.display());
    println!("  max_size   = {}", format_size(config.cache.max_size));
    println!("  store_name = {}", config.cache.store_name);
    println!();
    println!("[transfer]");
    println!("  chunk_size        = {}", format_size(config.transfer.chunk_size));
    println!("  max_retries       = {}", config.transfer.max_retries);
    println!("  retry_delay_ms    = {}", config.transfer.retry_delay_ms);
    println!("  monitor_period_ms = {}", config.transfer.monitor_period_ms);
    println!("  max_concurrent    = {}", config.transfer.max_concurrent);
    println!();
    println!("[logging]");
    println!("  file = {}", config.logging.file.display());

    Ok(())
}

fn run_init(config_path: &Path) -> Result<(), CliError> {
    if config_path.exists() {
        println!("Configuration already exists: {}", config_path.display());
        return Ok(());
    }

    ConfigFile::default().save_to(config_path)?;
    println!("Created configuration: {}", config_path.display());
    Ok(())
}
