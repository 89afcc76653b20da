//! HTTP fetch pipeline for the live backend.
//!
//! ### URL construction
//! - The configured base URL is validated once, at client construction
//! - Each request URL is `base + key`, with no re-encoding of the key
//!
//! ### Failure policy
//! - One attempt per request, no retries
//! - Transport errors and non-2xx statuses both map to `LiveFetchFailure`
//! - No timeout unless one is configured

pub mod url;

use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, header};

pub use url::{UrlError, live_url, validate_base};

use canned_core::{AppConfig, Error, QueryKey};

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "canned/0.1")
    pub user_agent: String,

    /// Request timeout (default: none)
    pub timeout: Option<Duration>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self { user_agent: "canned/0.1".to_string(), timeout: None }
    }
}

impl From<&AppConfig> for FetchConfig {
    fn from(config: &AppConfig) -> Self {
        Self { user_agent: config.user_agent.clone(), timeout: config.fetch_timeout() }
    }
}

/// Source of live responses for capture mode.
#[async_trait]
pub trait Upstream: Send + Sync {
    /// Fetch the body the live backend returns for `key`.
    async fn fetch_body(&self, key: &QueryKey) -> Result<Bytes, Error>;
}

/// HTTP client bound to one live backend base URL.
pub struct FetchClient {
    http: Client,
    base_url: String,
}

impl FetchClient {
    /// Create a new fetch client for `base_url`.
    pub fn new(base_url: &str, config: FetchConfig) -> Result<Self, Error> {
        let base_url = validate_base(base_url).map_err(|e| Error::InvalidInput(format!("live backend: {e}")))?;

        let FetchConfig { user_agent, timeout } = config;

        let mut builder = Client::builder()
            .user_agent(user_agent)
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| Error::InvalidInput(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http, base_url })
    }

    /// The live URL requested for `key`.
    pub fn url_for(&self, key: &QueryKey) -> String {
        live_url(&self.base_url, key.as_str())
    }

    /// Fetch the live response body for `key`.
    pub async fn fetch(&self, key: &QueryKey) -> Result<Bytes, Error> {
        let start = Instant::now();
        let url = self.url_for(key);

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::LiveFetchFailure(format!("{url}: network error: {e}")))?;

        let status = response.status();

        if !status.is_success() {
            return Err(Error::LiveFetchFailure(format!("{url}: status {}", status.as_u16())));
        }

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::LiveFetchFailure(format!("{url}: failed to read response: {e}")))?;

        let fetch_ms = start.elapsed().as_millis() as u64;

        tracing::debug!(
            %url,
            status = status.as_u16(),
            content_type = content_type.as_deref().unwrap_or("-"),
            fetch_ms,
            bytes = bytes.len(),
            "fetched live response"
        );

        Ok(bytes)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl Upstream for FetchClient {
    async fn fetch_body(&self, key: &QueryKey) -> Result<Bytes, Error> {
        self.fetch(key).await
    }
}
