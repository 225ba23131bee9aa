//! Cache key derivation.
//!
//! A cache key identifies one cached product:
//!
//! ```text
//! {source_id}-{metacard_id}[_{option_name}-{option_value}]
//! ```
//!
//! The optional suffix is present when the retrieval request selects an
//! alternate rendition or a qualified content item of the product.

use crate::metacard::{
    Metacard, ResourceRequest, ALTERNATE_RENDITION_OPTION, CONTENT_QUALIFIER_OPTION,
};

use super::types::CacheError;

/// Recognized option names in suffix priority order.
///
/// When a request carries more than one recognized option, the first entry
/// in this list wins so that keys stay stable across runs.
const KEYED_OPTIONS: [&str; 2] = [ALTERNATE_RENDITION_OPTION, CONTENT_QUALIFIER_OPTION];

/// Generate the cache key for a metacard's default product.
///
/// # Errors
///
/// Returns [`CacheError::InvalidArgument`] if `metacard` is `None`.
///
/// # Example
///
/// ```
/// use rescache::cache::generate_key;
/// use rescache::metacard::Metacard;
///
/// let metacard = Metacard::new("abc123", "ddf.distribution");
/// assert_eq!(generate_key(Some(&metacard)).unwrap(), "ddf.distribution-abc123");
/// ```
pub fn generate_key(metacard: Option<&Metacard>) -> Result<String, CacheError> {
    let metacard = metacard
        .ok_or_else(|| CacheError::InvalidArgument("metacard must not be null".to_string()))?;
    Ok(base_key(metacard))
}

/// Generate the cache key for a product retrieved with request options.
///
/// # Errors
///
/// Returns [`CacheError::InvalidArgument`] if either argument is `None`.
pub fn generate_key_for_request(
    metacard: Option<&Metacard>,
    request: Option<&ResourceRequest>,
) -> Result<String, CacheError> {
    let metacard = metacard
        .ok_or_else(|| CacheError::InvalidArgument("metacard must not be null".to_string()))?;
    let request = request.ok_or_else(|| {
        CacheError::InvalidArgument("resource request must not be null".to_string())
    })?;

    let mut key = base_key(metacard);
    let option = KEYED_OPTIONS
        .iter()
        .find_map(|name| request.property(name).map(|value| (*name, value)));

    if let Some((name, value)) = option {
        key.push('_');
        key.push_str(name);
        key.push('-');
        key.push_str(value);
    }

    Ok(key)
}

fn base_key(metacard: &Metacard) -> String {
    format!("{}-{}", metacard.source_id(), metacard.id())
}

/// Encode a cache key into a filesystem-safe file name stem.
///
/// ASCII alphanumerics, `-` and `_` pass through; every other byte is
/// written as `%XX`. The encoding is reversible via [`decode_filename`].
pub fn encode_filename(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for byte in key.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
            out.push(byte as char);
        } else {
            out.push_str(&format!("%{:02X}", byte));
        }
    }
    out
}

/// Decode a file name stem produced by [`encode_filename`].
///
/// Returns `None` if the stem contains a malformed escape or the decoded
/// bytes are not valid UTF-8.
pub fn decode_filename(stem: &str) -> Option<String> {
    let bytes = stem.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = stem.get(i + 1..i + 3)?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }

    String::from_utf8(out).ok()
}
