//! Network seam for manifest population and interception fallback.

use std::time::Duration;

use async_trait::async_trait;

use crate::entry::{RequestKey, StoredResponse};
use crate::error::Result;

/// Abstraction over outgoing network fetches.
///
/// Implementations must return the upstream response verbatim — status,
/// headers, and body unchanged, including non-2xx statuses. The cache decides
/// separately what it will and will not store.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Performs one fetch for the given request identity.
    async fn fetch(&self, key: &RequestKey) -> Result<StoredResponse>;
}

/// Default fetcher backed by a shared reqwest client.
#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    client: reqwest::Client,
}

impl ReqwestFetcher {
    /// Builds a fetcher with connection-pool tuning suited to fetching many
    /// small assets from the same origin.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying client cannot be constructed.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .pool_idle_timeout(Duration::from_secs(60))
            .pool_max_idle_per_host(8)
            .tcp_keepalive(Duration::from_secs(30))
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }

    /// Wraps an existing client.
    #[must_use]
    pub const fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Fetcher for ReqwestFetcher {
    async fn fetch(&self, key: &RequestKey) -> Result<StoredResponse> {
        let method: reqwest::Method = key
            .method
            .parse()
            .unwrap_or(reqwest::Method::GET);
        let response = self.client.request(method, &key.url).send().await?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = response.bytes().await?;

        Ok(StoredResponse {
            status,
            headers,
            body,
        })
    }
}
