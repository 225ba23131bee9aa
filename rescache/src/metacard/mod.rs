//! Read-only view of catalog metadata records.
//!
//! The cache engine never owns or mutates catalog metadata. It reads the
//! identifiers, the checksum and a handful of well-known attributes to derive
//! cache keys and to decide whether a cached product is stale.

pub mod attribute;
mod record;
mod request;

pub use attribute::AttributeValue;
pub use record::Metacard;
pub use request::{ResourceRequest, ALTERNATE_RENDITION_OPTION, CONTENT_QUALIFIER_OPTION};
