//! Origin retrieval abstraction.

use std::future::Future;
use std::pin::Pin;

use tokio::io::AsyncRead;

use super::error::RetrieveError;

/// Boxed future returned by object-safe async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Owned byte stream of a resource.
pub type ResourceStream = Pin<Box<dyn AsyncRead + Send>>;

/// One retrieval of a resource from its origin.
pub struct ResourceResponse {
    pub stream: ResourceStream,
    pub name: String,
    pub mime_type: String,
}

impl ResourceResponse {
    pub fn new(
        stream: ResourceStream,
        name: impl Into<String>,
        mime_type: impl Into<String>,
    ) -> Self {
        Self {
            stream,
            name: name.into(),
            mime_type: mime_type.into(),
        }
    }
}

impl std::fmt::Debug for ResourceResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceResponse")
            .field("name", &self.name)
            .field("mime_type", &self.mime_type)
            .finish_non_exhaustive()
    }
}

/// Source of fresh byte streams for one logical resource.
///
/// The writer calls [`retrieve_resource`](Self::retrieve_resource) again
/// after every recoverable failure, so each call must start the resource
/// from its first byte.
pub trait ResourceRetriever: Send + Sync {
    fn retrieve_resource(&self) -> BoxFuture<'_, Result<ResourceResponse, RetrieveError>>;
}
