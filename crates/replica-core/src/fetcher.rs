//! Page fetching capability.
//!
//! The orchestrator only depends on [`PageFetcher`]. [`HttpPageFetcher`] is a
//! plain HTTP implementation: it returns the served markup, runs no scripts and
//! takes no screenshot.

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info};
use url::Url;

use crate::config::FetchConfig;
use crate::error::{Error, FetchError, Result};

/// Raw page capture returned by a [`PageFetcher`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageSnapshot {
    /// Page markup as served.
    pub html: String,
    /// Encoded screenshot, when the fetcher can render pages.
    pub screenshot: Option<Vec<u8>>,
}

/// Retrieves rendered markup for a URL.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch `url`, failing with a [`FetchError`] the job result can carry.
    async fn fetch(&self, url: &Url) -> std::result::Result<PageSnapshot, FetchError>;
}

/// Normalize a submitted target URL.
///
/// Adds `https://` when the scheme is missing and requires an http(s) URL
/// with a host.
///
/// ```rust
/// use replica_core::fetcher::normalize_url;
///
/// assert_eq!(normalize_url("example.com").unwrap().as_str(), "https://example.com/");
/// assert!(normalize_url("ftp://example.com").is_err());
/// assert!(normalize_url("  ").is_err());
/// ```
pub fn normalize_url(raw: &str) -> std::result::Result<Url, FetchError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(FetchError::InvalidUrl(raw.to_string()));
    }
    let candidate = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };
    let url = Url::parse(&candidate).map_err(|_| FetchError::InvalidUrl(raw.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none_or(str::is_empty) {
        return Err(FetchError::InvalidUrl(raw.to_string()));
    }
    Ok(url)
}

/// HTTP client fetching served markup without script execution.
pub struct HttpPageFetcher {
    client: Client,
}

impl HttpPageFetcher {
    /// Creates a fetcher from the `fetch` configuration section.
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.as_str())
            .gzip(true)
            .brotli(true)
            .build()
            .map_err(Error::Network)?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch(&self, url: &Url) -> std::result::Result<PageSnapshot, FetchError> {
        debug!("Fetching {}", url);
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|err| FetchError::Unreachable {
                url: url.to_string(),
                reason: err.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let html = response
            .text()
            .await
            .map_err(|err| FetchError::Unreachable {
                url: url.to_string(),
                reason: err.to_string(),
            })?;
        if html.trim().is_empty() {
            return Err(FetchError::EmptyContent(url.to_string()));
        }

        info!("Fetched {} bytes from {}", html.len(), url);
        Ok(PageSnapshot {
            html,
            screenshot: None,
        })
    }
}
