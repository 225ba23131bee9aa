//! Well-known attribute names and attribute values.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Checksum of the product bytes.
pub const CHECKSUM: &str = "checksum";
/// Last modification time of the record.
pub const MODIFIED: &str = "modified";
/// Size of the product in bytes. Rewritten by enrichment after first caching.
pub const RESOURCE_SIZE: &str = "resource-size";
/// Thumbnail image bytes.
pub const THUMBNAIL: &str = "thumbnail";
/// Locator of the product at its origin.
pub const RESOURCE_URI: &str = "resource-uri";
/// Spatial location (WKT).
pub const GEOGRAPHY: &str = "location";
/// Effective time.
pub const EFFECTIVE: &str = "effective";
/// Creation time.
pub const CREATED: &str = "created";
/// Expiration time.
pub const EXPIRATION: &str = "expiration";
/// Content type name.
pub const CONTENT_TYPE: &str = "metadata-content-type";
/// Human readable title.
pub const TITLE: &str = "title";

/// A single attribute value on a [`Metacard`](super::Metacard).
///
/// Equality is structural, with doubles compared bit for bit so that a
/// value carrying NaN still equals itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum AttributeValue {
    Text(String),
    Integer(i64),
    Double(#[serde(with = "double_repr")] f64),
    Boolean(bool),
    Date(DateTime<Utc>),
    Binary(Vec<u8>),
    List(Vec<AttributeValue>),
}

impl AttributeValue {
    /// Returns the text content if this is a `Text` value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            AttributeValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl PartialEq for AttributeValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::Integer(a), Self::Integer(b)) => a == b,
            (Self::Double(a), Self::Double(b)) => a.to_bits() == b.to_bits(),
            (Self::Boolean(a), Self::Boolean(b)) => a == b,
            (Self::Date(a), Self::Date(b)) => a == b,
            (Self::Binary(a), Self::Binary(b)) => a == b,
            (Self::List(a), Self::List(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for AttributeValue {}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        AttributeValue::Double(value)
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::Text(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::Text(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        AttributeValue::Integer(value)
    }
}

impl From<DateTime<Utc>> for AttributeValue {
    fn from(value: DateTime<Utc>) -> Self {
        AttributeValue::Date(value)
    }
}

impl From<Vec<u8>> for AttributeValue {
    fn from(value: Vec<u8>) -> Self {
        AttributeValue::Binary(value)
    }
}

/// JSON has no NaN or infinity, so non-finite doubles are stored as the
/// strings `"NaN"`, `"inf"` and `"-inf"`.
mod double_repr {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_finite() {
            serializer.serialize_f64(*value)
        } else if value.is_nan() {
            serializer.serialize_str("NaN")
        } else if value.is_sign_positive() {
            serializer.serialize_str("inf")
        } else {
            serializer.serialize_str("-inf")
        }
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(f64),
        Text(String),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        match Repr::deserialize(deserializer)? {
            Repr::Number(value) => Ok(value),
            Repr::Text(text) => match text.as_str() {
                "NaN" => Ok(f64::NAN),
                "inf" => Ok(f64::INFINITY),
                "-inf" => Ok(f64::NEG_INFINITY),
                other => Err(de::Error::custom(format!("invalid double value: {}", other))),
            },
        }
    }
}
