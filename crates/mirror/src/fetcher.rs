// Resource fetcher: downloads remote resources with timeout and retry.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use tracing::{debug, instrument, trace};
use url::Url;

use crate::MirrorError;
use crate::config::FetcherConfig;
use crate::retry::{RetryPolicy, retry_with_backoff};

#[async_trait]
pub trait Fetch: Send + Sync {
    /// Returns the full body of the resource at `uri`.
    async fn fetch(&self, uri: &str) -> Result<Bytes, MirrorError>;
}

pub struct HttpFetcher {
    http_client: Client,
    retry: RetryPolicy,
}

impl HttpFetcher {
    pub fn new(config: &FetcherConfig) -> Result<Self, MirrorError> {
        let mut builder = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.as_str())
            .default_headers(config.headers.clone());
        if !config.use_system_proxy {
            builder = builder.no_proxy();
        }

        let http_client = builder
            .build()
            .map_err(|source| MirrorError::ClientBuild { source })?;

        Ok(Self::with_client(http_client, config.retry.clone()))
    }

    /// Create a fetcher over an existing client, e.g. to share a connection pool.
    pub fn with_client(http_client: Client, retry: RetryPolicy) -> Self {
        Self { http_client, retry }
    }

    async fn fetch_once(&self, url: &Url) -> Result<Bytes, MirrorError> {
        let response = self
            .http_client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| MirrorError::network(url.as_str(), e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(MirrorError::http_status(status, url.as_str()));
        }

        trace!(
            url = %url,
            http_version = ?response.version(),
            content_length = ?response.content_length(),
            "Response received"
        );

        response
            .bytes()
            .await
            .map_err(|e| MirrorError::network(url.as_str(), e))
    }
}

#[async_trait]
impl Fetch for HttpFetcher {
    #[instrument(skip(self), level = "debug")]
    async fn fetch(&self, uri: &str) -> Result<Bytes, MirrorError> {
        let url = Url::parse(uri).map_err(|e| MirrorError::invalid_url(uri, e.to_string()))?;

        let bytes = retry_with_backoff(&self.retry, |_| self.fetch_once(&url)).await?;
        debug!(size = bytes.len(), "Fetched resource");
        Ok(bytes)
    }
}
