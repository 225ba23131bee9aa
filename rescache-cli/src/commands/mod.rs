//! CLI command implementations.
//!
//! # Command Modules
//!
//! - [`cache`] - Cache inspection and maintenance (stats, list, clear)
//! - [`config`] - Configuration management (path, show, init)
//! - [`fetch`] - Stream a URL through the cache

pub mod cache;
pub mod config;
pub mod fetch;
