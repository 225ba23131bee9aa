//! CLI error handling with user-friendly messages.
//!
//! Centralizes error handling for the CLI, providing consistent formatting
//! and appropriate exit codes.

use std::fmt;
use std::process;

use rescache::cache::CacheError;
use rescache::config::ConfigFileError;
use rescache::transfer::{RetrieveError, TransferError};

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Configuration error
    Config(String),
    /// Failed to open or modify the cache
    Cache(CacheError),
    /// Failed to reach the resource origin
    Retrieve(RetrieveError),
    /// Transfer failed after starting
    Transfer(TransferError),
    /// Failed to write output file
    FileWrite { path: String, error: std::io::Error },
    /// Failed to start the async runtime
    Runtime(std::io::Error),
}

impl CliError {
    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        match self {
            CliError::Retrieve(e) if e.is_retryable() => {
                eprintln!();
                eprintln!("The origin could not be reached. Check the URL and your network");
                eprintln!("connection, then try again.");
            }
            CliError::Transfer(TransferError::RetriesExhausted { .. }) => {
                eprintln!();
                eprintln!("The connection kept stalling or failing. Consider raising");
                eprintln!("[transfer] max_retries or monitor_period_ms in the config file.");
            }
            _ => {}
        }

        process::exit(1)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::Cache(e) => write!(f, "Cache error: {}", e),
            CliError::Retrieve(e) => write!(f, "Failed to retrieve resource: {}", e),
            CliError::Transfer(e) => write!(f, "Transfer failed: {}", e),
            CliError::FileWrite { path, error } => {
                write!(f, "Failed to write file '{}': {}", path, error)
            }
            CliError::Runtime(e) => write!(f, "Failed to start async runtime: {}", e),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Cache(e) => Some(e),
            CliError::Retrieve(e) => Some(e),
            CliError::Transfer(e) => Some(e),
            CliError::FileWrite { error, .. } => Some(error),
            CliError::Runtime(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::Config(e.to_string())
    }
}

impl From<CacheError> for CliError {
    fn from(e: CacheError) -> Self {
        CliError::Cache(e)
    }
}

impl From<RetrieveError> for CliError {
    fn from(e: RetrieveError) -> Self {
        CliError::Retrieve(e)
    }
}

impl From<TransferError> for CliError {
    fn from(e: TransferError) -> Self {
        CliError::Transfer(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_display_and_source() {
        let err = CliError::FileWrite {
            path: "/tmp/out".to_string(),
            error: std::io::Error::other("disk full"),
        };
        assert_eq!(err.to_string(), "Failed to write file '/tmp/out': disk full");
        assert!(err.source().is_some());
    }

    #[test]
    fn test_config_error_conversion() {
        let err: CliError = ConfigFileError::WriteError("read-only".to_string()).into();
        assert!(err.to_string().starts_with("Configuration error:"));
        assert!(err.source().is_none());
    }
}
