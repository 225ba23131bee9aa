//! INI parsing logic for converting `Ini` → `ConfigFile`.
//!
//! This is the single place where INI key names are mapped to struct fields.

use std::path::PathBuf;
use std::str::FromStr;

use ini::{Ini, Properties};

use super::file::ConfigFileError;
use super::settings::ConfigFile;
use super::size::parse_size;
use crate::transfer::MAX_CHUNK_SIZE;

/// Parse an `Ini` object into a `ConfigFile`.
///
/// Starts from `ConfigFile::default()` and overlays any values found in the
/// INI. Unknown sections and keys are ignored.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    // [cache] section
    if let Some(section) = ini.section(Some("cache")) {
        if let Some(v) = section.get("directory") {
            let v = v.trim();
            if !v.is_empty() {
                config.cache.directory = expand_tilde(v);
            }
        }
        if let Some(v) = section.get("max_size") {
            config.cache.max_size = parse_size(v).map_err(|_| {
                invalid("cache", "max_size", v, "expected format like '10GB', '500MB', or 0")
            })?;
        }
        if let Some(v) = section.get("store_name") {
            let v = v.trim();
            if v.is_empty() || v.contains(['/', '\\']) {
                return Err(invalid(
                    "cache",
                    "store_name",
                    v,
                    "must be a non-empty name without path separators",
                ));
            }
            config.cache.store_name = v.to_string();
        }
    }

    // [transfer] section
    if let Some(section) = ini.section(Some("transfer")) {
        if let Some(v) = section.get("chunk_size") {
            let size = parse_size(v).map_err(|_| {
                invalid("transfer", "chunk_size", v, "expected format like '64KB' or '1MB'")
            })?;
            if size == 0 {
                return Err(invalid("transfer", "chunk_size", v, "must be greater than 0"));
            }
            if size > MAX_CHUNK_SIZE as u64 {
                return Err(invalid("transfer", "chunk_size", v, "must be at most 16MB"));
            }
            config.transfer.chunk_size = size;
        }
        if let Some(v) = parse_number(section, "transfer", "max_retries", false)? {
            config.transfer.max_retries = v;
        }
        if let Some(v) = parse_number(section, "transfer", "retry_delay_ms", false)? {
            config.transfer.retry_delay_ms = v;
        }
        if let Some(v) = parse_number(section, "transfer", "monitor_period_ms", true)? {
            config.transfer.monitor_period_ms = v;
        }
        if let Some(v) = parse_number(section, "transfer", "max_concurrent", true)? {
            config.transfer.max_concurrent = v;
        }
    }

    // [logging] section
    if let Some(section) = ini.section(Some("logging")) {
        if let Some(v) = section.get("file") {
            let v = v.trim();
            if !v.is_empty() {
                config.logging.file = expand_tilde(v);
            }
        }
    }

    Ok(config)
}

/// Parse an unsigned integer key, optionally rejecting zero.
fn parse_number<T>(
    section: &Properties,
    section_name: &str,
    key: &str,
    positive: bool,
) -> Result<Option<T>, ConfigFileError>
where
    T: FromStr + Default + PartialEq,
{
    let Some(v) = section.get(key) else {
        return Ok(None);
    };
    let reason = if positive {
        "must be a positive integer"
    } else {
        "must be a non-negative integer"
    };
    match v.trim().parse::<T>() {
        Ok(n) if positive && n == T::default() => Err(invalid(section_name, key, v, reason)),
        Ok(n) => Ok(Some(n)),
        Err(_) => Err(invalid(section_name, key, v, reason)),
    }
}

fn invalid(section: &str, key: &str, value: &str, reason: &str) -> ConfigFileError {
    ConfigFileError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// Expand a leading `~/` to the home directory.
pub(super) fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}
