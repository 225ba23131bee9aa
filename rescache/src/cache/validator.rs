//! Staleness validation for cached products.
//!
//! Decides, without downloading the product again, whether the metadata a
//! product was cached with still matches the latest known metadata. The
//! checksum and a fixed set of descriptive fields stand in for "the bytes
//! have not changed".

use std::collections::BTreeSet;

use crate::metacard::attribute::{
    CHECKSUM, CONTENT_TYPE, CREATED, EFFECTIVE, EXPIRATION, GEOGRAPHY, MODIFIED, RESOURCE_SIZE,
    RESOURCE_URI, THUMBNAIL,
};
use crate::metacard::Metacard;

/// Descriptive fields compared explicitly after the checksum.
const DESCRIPTIVE_FIELDS: [&str; 8] = [
    MODIFIED,
    THUMBNAIL,
    RESOURCE_URI,
    GEOGRAPHY,
    EFFECTIVE,
    CREATED,
    EXPIRATION,
    CONTENT_TYPE,
];

/// Attributes skipped by the general comparison.
///
/// `RESOURCE_SIZE` is rewritten by enrichment after the product is first
/// cached; the rest are already covered by the checks above.
const IGNORED_FIELDS: [&str; 10] = [
    CHECKSUM,
    MODIFIED,
    RESOURCE_SIZE,
    THUMBNAIL,
    RESOURCE_URI,
    GEOGRAPHY,
    EFFECTIVE,
    CREATED,
    EXPIRATION,
    CONTENT_TYPE,
];

/// Returns `true` if `cached` and `updated` describe the same product bytes.
///
/// Two absent records are the same; exactly one absent record is not.
pub fn is_same(cached: Option<&Metacard>, updated: Option<&Metacard>) -> bool {
    let (cached, updated) = match (cached, updated) {
        (None, None) => return true,
        (Some(cached), Some(updated)) => (cached, updated),
        _ => return false,
    };

    if cached.id() != updated.id() {
        return false;
    }

    if cached.attribute(CHECKSUM) != updated.attribute(CHECKSUM) {
        return false;
    }

    if DESCRIPTIVE_FIELDS
        .iter()
        .any(|name| cached.attribute(name) != updated.attribute(name))
    {
        return false;
    }

    let names: BTreeSet<&str> = cached
        .attribute_names()
        .chain(updated.attribute_names())
        .filter(|name| !IGNORED_FIELDS.contains(name))
        .collect();

    names
        .into_iter()
        .all(|name| cached.attribute(name) == updated.attribute(name))
}
