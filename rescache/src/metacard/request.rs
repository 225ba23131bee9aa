//! Retrieval request options.

use std::collections::BTreeMap;

/// Option selecting an alternate rendition of a product (e.g. a derived format).
pub const ALTERNATE_RENDITION_OPTION: &str = "RESOURCE_OPTION";

/// Option selecting a qualified content item of a product.
pub const CONTENT_QUALIFIER_OPTION: &str = "qualifier";

/// Options attached to a product retrieval request.
///
/// Only two option names matter to the cache: [`ALTERNATE_RENDITION_OPTION`]
/// and [`CONTENT_QUALIFIER_OPTION`]. Everything else is carried through for
/// the retriever.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceRequest {
    properties: BTreeMap<String, String>,
}

impl ResourceRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style option setter.
    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    pub fn property(&self, name: &str) -> Option<&str> {
        self.properties.get(name).map(String::as_str)
    }

    pub fn property_names(&self) -> impl Iterator<Item = &str> {
        self.properties.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}
