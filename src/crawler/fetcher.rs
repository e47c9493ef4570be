//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building HTTP clients with the configured user agent and forward proxy
//! - GET requests to fetch page content
//! - Error classification (rate limited vs. permanent failures)

use crate::config::{Config, ProxyConfig, UserAgentConfig};
use async_trait::async_trait;
use reqwest::{Client, Proxy, StatusCode};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Why a page could not be fetched
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// HTTP 429; the page should be retried in a later round
    #[error("rate limited (HTTP 429)")]
    RateLimited,

    #[error("not found (HTTP 404)")]
    NotFound,

    #[error("client error (HTTP {0})")]
    ClientError(u16),

    #[error("server error (HTTP {0})")]
    ServerError(u16),

    /// Connection refused, timeout, TLS failure, truncated body
    #[error("network error: {0}")]
    Network(String),
}

impl FetchError {
    /// Returns true if the same URL should be tried again
    ///
    /// Only rate limiting is transient; everything else is assumed permanent.
    pub fn is_retriable(&self) -> bool {
        matches!(self, Self::RateLimited)
    }

    /// Maps a non-success status code to a fetch error
    ///
    /// Returns None for success codes.
    pub fn from_status(status: StatusCode) -> Option<Self> {
        if status.is_success() {
            return None;
        }

        Some(match status {
            StatusCode::TOO_MANY_REQUESTS => Self::RateLimited,
            StatusCode::NOT_FOUND => Self::NotFound,
            s if s.is_server_error() => Self::ServerError(s.as_u16()),
            s => Self::ClientError(s.as_u16()),
        })
    }
}

/// Source of raw page content
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetches the body of `url`
    async fn fetch(&self, url: &Url) -> Result<String, FetchError>;
}

/// Builds an HTTP client with proper configuration
///
/// # Example
///
/// ```no_run
/// use qa_harvest::config::UserAgentConfig;
/// use qa_harvest::crawler::build_http_client;
///
/// let client = build_http_client(&UserAgentConfig::default(), 30, None).unwrap();
/// ```
pub fn build_http_client(
    user_agent: &UserAgentConfig,
    timeout_secs: u64,
    proxy: Option<&ProxyConfig>,
) -> Result<Client, reqwest::Error> {
    let mut builder = Client::builder()
        .user_agent(user_agent.header_value())
        .timeout(Duration::from_secs(timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true);

    if let Some(proxy) = proxy {
        tracing::info!("Routing requests through proxy {}", proxy.url);
        builder = builder.proxy(Proxy::all(proxy.url.as_str())?);
    }

    builder.build()
}

/// Fetcher backed by a reqwest client
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Builds a fetcher from the crawler configuration
    pub fn from_config(config: &Config) -> Result<Self, reqwest::Error> {
        let client = build_http_client(
            &config.user_agent,
            config.crawler.request_timeout_secs,
            config.proxy.as_ref(),
        )?;
        Ok(Self::new(client))
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(classify_reqwest_error)?;

        // Classify from this response's own status
        if let Some(error) = FetchError::from_status(response.status()) {
            return Err(error);
        }

        response.text().await.map_err(classify_reqwest_error)
    }
}

fn classify_reqwest_error(e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Network("Request timeout".to_string())
    } else if e.is_connect() {
        FetchError::Network("Connection refused".to_string())
    } else if let Some(status) = e.status() {
        FetchError::from_status(status).unwrap_or_else(|| FetchError::Network(e.to_string()))
    } else {
        FetchError::Network(e.to_string())
    }
}
