//! HTTP resource retriever built on reqwest.

use std::io;
use std::time::Duration;

use futures::TryStreamExt;
use tokio_util::io::StreamReader;
use tracing::{debug, warn};

use super::error::RetrieveError;
use super::retriever::{BoxFuture, ResourceResponse, ResourceRetriever};
use crate::cache::DEFAULT_MIME_TYPE;

/// User agent sent with every request.
pub const DEFAULT_USER_AGENT: &str = concat!("rescache/", env!("CARGO_PKG_VERSION"));

/// Connect timeout. No overall timeout is set; stalls are detected per chunk
/// by the transfer writer.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Retrieves one URL, streaming its body.
#[derive(Clone)]
pub struct HttpRetriever {
    client: reqwest::Client,
    url: String,
}

impl HttpRetriever {
    pub fn new(url: impl Into<String>) -> Result<Self, RetrieveError> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .user_agent(DEFAULT_USER_AGENT)
            .tcp_keepalive(Duration::from_secs(30))
            .build()
            .map_err(|e| RetrieveError::Request(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self::with_client(client, url))
    }

    /// Share an existing client, reusing its connection pool.
    pub fn with_client(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn fetch(&self) -> Result<ResourceResponse, RetrieveError> {
        let response = self.client.get(&self.url).send().await.map_err(|e| {
            warn!(
                url = %self.url,
                error = %e,
                is_connect = e.is_connect(),
                is_timeout = e.is_timeout(),
                "HTTP request failed"
            );
            RetrieveError::Request(e.to_string())
        })?;

        let status = response.status();
        if !status.is_success() {
            warn!(url = %self.url, status = status.as_u16(), "HTTP error status");
            return Err(RetrieveError::Http {
                status: status.as_u16(),
                url: self.url.clone(),
            });
        }

        let mime_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or(DEFAULT_MIME_TYPE)
            .to_string();
        let name = resource_name(response.url().path());

        debug!(
            url = %self.url,
            status = status.as_u16(),
            content_length = response.content_length(),
            mime_type = %mime_type,
            "HTTP response received"
        );

        let body = response.bytes_stream().map_err(io::Error::other);
        Ok(ResourceResponse::new(
            Box::pin(StreamReader::new(body)),
            name,
            mime_type,
        ))
    }
}

impl ResourceRetriever for HttpRetriever {
    fn retrieve_resource(&self) -> BoxFuture<'_, Result<ResourceResponse, RetrieveError>> {
        Box::pin(self.fetch())
    }
}

/// Last non-empty path segment, or empty if there is none.
fn resource_name(path: &str) -> String {
    path.rsplit('/')
        .find(|segment| !segment.is_empty())
        .unwrap_or_default()
        .to_string()
}
