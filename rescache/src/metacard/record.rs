//! Metadata record ("metacard") describing one catalog item.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::attribute::{self, AttributeValue};

/// A catalog metadata record.
///
/// Carries the record identifier, the identifier of the source it came from,
/// and a set of named attributes. Attributes are kept in a sorted map so that
/// iteration and serialization are deterministic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metacard {
    id: String,
    source_id: String,
    #[serde(default)]
    attributes: BTreeMap<String, AttributeValue>,
}

impl Metacard {
    /// Create a record with no attributes.
    pub fn new(id: impl Into<String>, source_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source_id: source_id.into(),
            attributes: BTreeMap::new(),
        }
    }

    /// Builder-style attribute setter.
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.set_attribute(name, value);
        self
    }

    /// Set or replace an attribute.
    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<AttributeValue>) {
        self.attributes.insert(name.into(), value.into());
    }

    /// Remove an attribute, returning its previous value.
    pub fn remove_attribute(&mut self, name: &str) -> Option<AttributeValue> {
        self.attributes.remove(name)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    /// Look up an attribute by name.
    pub fn attribute(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes.get(name)
    }

    /// Iterate all attribute names in sorted order.
    pub fn attribute_names(&self) -> impl Iterator<Item = &str> {
        self.attributes.keys().map(String::as_str)
    }

    /// The checksum attribute, if present and textual.
    pub fn checksum(&self) -> Option<&str> {
        self.attribute(attribute::CHECKSUM)
            .and_then(AttributeValue::as_text)
    }
}
