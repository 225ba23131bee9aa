//! rescache CLI - Command-line interface
//!
//! Inspects and maintains the resource cache, and fetches resources through
//! it.

mod commands;
mod error;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use rescache::config::{config_file_path, ConfigFile};
use rescache::logging::{init_logging, split_log_path, LoggingGuard};

use commands::cache::CacheAction;
use commands::config::ConfigCommands;
use commands::fetch::FetchArgs;
use error::CliError;

#[derive(Parser)]
#[command(name = "rescache")]
#[command(version = rescache::VERSION)]
#[command(about = "Reliable resource cache", long_about = None)]
struct Cli {
    /// Configuration file (default: ~/.rescache/config.ini)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Inspect or clear the resource cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
    /// Fetch a resource through the cache
    Fetch(FetchArgs),
}

fn main() {
    let cli = Cli::parse();
    let config_path = cli.config.unwrap_or_else(config_file_path);

    if let Err(e) = run(cli.command, config_path) {
        e.exit();
    }
}

fn run(command: Commands, config_path: PathBuf) -> Result<(), CliError> {
    match command {
        Commands::Config { command } => commands::config::run(command, &config_path),
        Commands::Cache { action } => {
            let config = ConfigFile::load_from(&config_path)?;
            let _guard = start_logging(&config)?;
            commands::cache::run(action, &config)
        }
        Commands::Fetch(args) => {
            let config = ConfigFile::load_from(&config_path)?;
            let _guard = start_logging(&config)?;
            commands::fetch::run(args, &config)
        }
    }
}

fn start_logging(config: &ConfigFile) -> Result<LoggingGuard, CliError> {
    let (log_dir, log_file) = split_log_path(&config.logging.file);
    init_logging(&log_dir, &log_file).map_err(|e| CliError::LoggingInit(e.to_string()))
}
