//! INI serialization logic for converting `ConfigFile` → INI string.

use std::path::Path;

use super::settings::ConfigFile;
use super::size::format_size;

/// Convert a `ConfigFile` to a commented INI string for saving.
pub(super) fn to_config_string(config: &ConfigFile) -> String {
    format!(
        r#"[cache]
; Root directory for cached products and their descriptors.
; Products are stored in <directory>/products/
directory = {}
; Maximum total size of cached products (default: 10GB)
; Least recently used products are evicted beyond this. 0 disables eviction.
; Supports: KB, MB, GB, TB suffixes
max_size = {}
; Descriptor store name, one directory per logical cache
store_name = {}

[transfer]
; Bytes read from the origin per chunk (default: 64KB)
chunk_size = {}
; Retries after the first attempt before a transfer fails (default: 3)
max_retries = {}
; Delay between attempts in milliseconds (default: 10000)
retry_delay_ms = {}
; A chunk taking longer than this is treated as a stalled connection (default: 5000)
monitor_period_ms = {}
; Transfers allowed to stream at once (default: 16)
max_concurrent = {}

[logging]
; Log file path, truncated at the start of each session
file = {}
"#,
        path_to_string(&config.cache.directory),
        format_size(config.cache.max_size),
        config.cache.store_name,
        format_size(config.transfer.chunk_size),
        config.transfer.max_retries,
        config.transfer.retry_delay_ms,
        config.transfer.monitor_period_ms,
        config.transfer.max_concurrent,
        path_to_string(&config.logging.file),
    )
}

/// Render a path, abbreviating the home directory as `~`.
fn path_to_string(path: &Path) -> String {
    if let Some(home) = dirs::home_dir() {
        if let Ok(stripped) = path.strip_prefix(&home) {
            return format!("~/{}", stripped.display());
        }
    }
    path.display().to_string()
}

#[cfg(test)]
mod tests {
    use super::super::settings::ConfigFile;
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn test_saved_config_reloads_identically() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.ini");

        let mut config = ConfigFile::default();
        config.cache.directory = PathBuf::from("/srv/cache");
        config.cache.max_size = 512 * 1024 * 1024;
        config.transfer.max_retries = 7;
        config.save_to(&config_path).unwrap();

        let reloaded = ConfigFile::load_from(&config_path).unwrap();
        assert_eq!(reloaded, config);
    }

    #[test]
    fn test_config_string_has_sections() {
        let content = to_config_string(&ConfigFile::default());
        assert!(content.contains("[cache]"));
        assert!(content.contains("[transfer]"));
        assert!(content.contains("[logging]"));
        assert!(content.contains("max_size = 10GB"));
        assert!(content.contains("chunk_size = 64KB"));
    }

    #[test]
    fn test_path_to_string_abbreviates_home() {
        if let Some(home) = dirs::home_dir() {
            assert_eq!(path_to_string(&home.join("x")), "~/x");
        }
        assert_eq!(path_to_string(Path::new("/tmp/x")), "/tmp/x");
    }
}
