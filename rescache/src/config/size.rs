//! Human-readable size parsing (e.g., "2GB", "500MB").

use thiserror::Error;

/// Error parsing a size string.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid size '{input}' - expected format like '2GB', '500MB', or '1024KB'")]
pub struct SizeParseError {
    input: String,
}

impl SizeParseError {
    fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
        }
    }
}

const KB: u64 = 1024;
const MB: u64 = 1024 * KB;
const GB: u64 = 1024 * MB;
const TB: u64 = 1024 * GB;

/// Parse a human-readable size string into bytes.
///
/// Bare numbers are bytes. `K`/`KB`, `M`/`MB`, `G`/`GB` and `T`/`TB`
/// suffixes are binary multiples. Case and surrounding whitespace are
/// ignored.
///
/// # Examples
///
/// ```
/// use rescache::config::parse_size;
///
/// assert_eq!(parse_size("1024").unwrap(), 1024);
/// assert_eq!(parse_size("1 KB").unwrap(), 1024);
/// assert_eq!(parse_size("500mb").unwrap(), 500 * 1024 * 1024);
/// ```
pub fn parse_size(s: &str) -> Result<u64, SizeParseError> {
    let trimmed = s.trim();
    let upper = trimmed.to_ascii_uppercase();
    let without_b = upper.strip_suffix('B').unwrap_or(&upper);

    let (number, multiplier) = match without_b.char_indices().last() {
        Some((i, 'K')) => (&without_b[..i], KB),
        Some((i, 'M')) => (&without_b[..i], MB),
        Some((i, 'G')) => (&without_b[..i], GB),
        Some((i, 'T')) => (&without_b[..i], TB),
        _ if upper.ends_with('B') => return Err(SizeParseError::new(s)),
        _ => (without_b, 1),
    };

    number
        .trim()
        .parse::<u64>()
        .ok()
        .and_then(|n| n.checked_mul(multiplier))
        .ok_or_else(|| SizeParseError::new(s))
}

/// Format a byte count using the largest exact binary unit.
///
/// ```
/// use rescache::config::format_size;
///
/// assert_eq!(format_size(2 * 1024 * 1024 * 1024), "2GB");
/// assert_eq!(format_size(1000), "1000");
/// ```
pub fn format_size(bytes: u64) -> String {
    match bytes {
        0 => "0".to_string(),
        b if b % TB == 0 => format!("{}TB", b / TB),
        b if b % GB == 0 => format!("{}GB", b / GB),
        b if b % MB == 0 => format!("{}MB", b / MB),
        b if b % KB == 0 => format!("{}KB", b / KB),
        b => b.to_string(),
    }
}

/// Format a byte count approximately for display (e.g. "1.5 GB").
pub fn format_size_approx(bytes: u64) -> String {
    let (value, unit) = if bytes >= TB {
        (bytes as f64 / TB as f64, "TB")
    } else if bytes >= GB {
        (bytes as f64 / GB as f64, "GB")
    } else if bytes >= MB {
        (bytes as f64 / MB as f64, "MB")
    } else if bytes >= KB {
        (bytes as f64 / KB as f64, "KB")
    } else {
        return format!("{} B", bytes);
    };
    format!("{:.1} {}", value, unit)
}
