//! Bounded-time HTTP retrieval of JSON payloads.

use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;

use crate::ports::UpstreamError;

/// Per-request timeout used unless overridden.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Issues GET requests and decodes their JSON bodies. Never retries.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    timeout: Duration,
}

impl HttpFetcher {
    /// Create a fetcher sharing the given HTTP client, using [`DEFAULT_TIMEOUT`].
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self {
            client,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Replace the per-request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Per-request timeout in effect.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Fetch `url` and decode the body as `T`.
    ///
    /// # Errors
    ///
    /// Returns [`UpstreamError::Network`] on timeout, connection failure, or a non-success
    /// status, and [`UpstreamError::Decode`] when the body does not match `T`.
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, UpstreamError> {
        log::debug!("GET {url} (timeout {:?})", self.timeout);

        let body = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;

        serde_json::from_slice(&body).map_err(UpstreamError::from)
    }
}
