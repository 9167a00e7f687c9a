//! Document fetcher
//!
//! This module fetches catalog documents from either transport, including:
//! - Building the HTTP client with a proper user agent string
//! - GET requests for remote locations
//! - Filesystem reads for local locations
//! - A per-fetch timeout
//! - Error classification
//!
//! Every fetch, remote or local, passes through the same [`FetchLimiter`].

use crate::config::{Config, UserAgentConfig};
use crate::crawler::limiter::{DispatchSlot, FetchLimiter};
use crate::document::{DecodeError, Document};
use crate::location::Location;
use reqwest::{redirect::Policy, Client, StatusCode};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// A failed fetch of one location
#[derive(Debug, Error)]
#[error("Failed to fetch {location}: {kind}")]
pub struct FetchError {
    /// The location that could not be fetched
    pub location: Location,

    /// What went wrong
    #[source]
    pub kind: FetchErrorKind,
}

/// Classification of fetch failures
#[derive(Debug, Error)]
pub enum FetchErrorKind {
    #[error("not found")]
    NotFound,

    #[error("HTTP status {0}")]
    Status(u16),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed document: {0}")]
    Malformed(#[from] DecodeError),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("fetch limiter closed")]
    LimiterClosed,
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The user agent configuration
/// * `timeout` - Upper bound for establishing a connection
///
/// The client sets no total request timeout; [`FetchPermit::fetch`] bounds
/// every transport with the same deadline.
///
/// # Example
///
/// ```no_run
/// use catalog_walk::config::UserAgentConfig;
/// use catalog_walk::crawler::build_http_client;
/// use std::time::Duration;
///
/// let client = build_http_client(&UserAgentConfig::default(), Duration::from_secs(30)).unwrap();
/// ```
pub fn build_http_client(
    config: &UserAgentConfig,
    timeout: Duration,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.header_value())
        .connect_timeout(Duration::from_secs(10).min(timeout))
        .redirect(Policy::limited(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Uniform fetch interface over remote and local locations
///
/// Cloning is cheap; clones share the HTTP client and the limiter.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    limiter: Arc<FetchLimiter>,
    timeout: Duration,
}

/// A fetch slot that has been granted but not used yet
pub struct FetchPermit<'a> {
    fetcher: &'a Fetcher,
    _slot: DispatchSlot,
}

impl Fetcher {
    /// Creates a fetcher from the crawler configuration
    pub fn new(config: &Config) -> Result<Self, reqwest::Error> {
        let timeout = Duration::from_millis(config.crawler.fetch_timeout_ms);
        let client = build_http_client(&config.user_agent, timeout)?;
        let limiter = FetchLimiter::new(
            config.crawler.max_concurrent_fetches as usize,
            Duration::from_millis(config.crawler.min_dispatch_interval_ms),
        );
        Ok(Self::with_client(client, limiter, timeout))
    }

    pub fn with_client(client: Client, limiter: FetchLimiter, timeout: Duration) -> Self {
        Self {
            client,
            limiter: Arc::new(limiter),
            timeout,
        }
    }

    pub fn limiter(&self) -> &FetchLimiter {
        &self.limiter
    }

    /// Waits for the limiter to admit one fetch
    ///
    /// Returns `None` only if the limiter has been closed.
    pub async fn acquire(&self) -> Option<FetchPermit<'_>> {
        let slot = self.limiter.acquire().await?;
        Some(FetchPermit {
            fetcher: self,
            _slot: slot,
        })
    }

    /// Fetches and decodes the document at `location`
    ///
    /// # Request Flow
    ///
    /// 1. Wait for a slot from the shared limiter
    /// 2. Wait out the dispatch spacing
    /// 3. Read the bytes over HTTP or from disk, bounded by the fetch timeout
    /// 4. Decode the body as a JSON object
    ///
    /// # Error Mapping
    ///
    /// | Condition | Kind |
    /// |-----------|------|
    /// | HTTP 404 / missing file | NotFound |
    /// | Other non-2xx status | Status |
    /// | Connection, TLS, body errors | Network |
    /// | Other filesystem errors | Io |
    /// | Body not a JSON object | Malformed |
    /// | Transport slower than the timeout | Timeout |
    pub async fn fetch(&self, location: &Location) -> Result<Document, FetchError> {
        match self.acquire().await {
            Some(permit) => permit.fetch(location).await,
            None => Err(FetchError {
                location: location.clone(),
                kind: FetchErrorKind::LimiterClosed,
            }),
        }
    }
}

impl FetchPermit<'_> {
    /// Performs the fetch; the slot is released when this returns
    ///
    /// Dispatch spacing is applied here, not when the slot was granted.
    pub async fn fetch(self, location: &Location) -> Result<Document, FetchError> {
        self.fetcher.limiter.dispatch().await;

        let timeout = self.fetcher.timeout;
        let read = read_bytes(&self.fetcher.client, location);

        let result = match tokio::time::timeout(timeout, read).await {
            Ok(bytes) => bytes.and_then(|bytes| {
                Document::from_slice(location.clone(), &bytes).map_err(FetchErrorKind::from)
            }),
            Err(_) => Err(FetchErrorKind::Timeout(timeout)),
        };

        // A slow connect surfaces from reqwest rather than from the deadline
        let result = result.map_err(|kind| match kind {
            FetchErrorKind::Network(e) if e.is_timeout() => FetchErrorKind::Timeout(timeout),
            other => other,
        });

        result.map_err(|kind| FetchError {
            location: location.clone(),
            kind,
        })
    }
}

async fn read_bytes(client: &Client, location: &Location) -> Result<Vec<u8>, FetchErrorKind> {
    match location {
        Location::Remote(url) => read_remote(client, url).await,
        Location::Local(path) => read_local(path).await,
    }
}

async fn read_remote(client: &Client, url: &Url) -> Result<Vec<u8>, FetchErrorKind> {
    let response = client.get(url.clone()).send().await?;
    let status = response.status();

    if status == StatusCode::NOT_FOUND {
        return Err(FetchErrorKind::NotFound);
    }

    if !status.is_success() {
        return Err(FetchErrorKind::Status(status.as_u16()));
    }

    let body = response.bytes().await?;
    Ok(body.to_vec())
}

async fn read_local(path: &Path) -> Result<Vec<u8>, FetchErrorKind> {
    tokio::fs::read(path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            FetchErrorKind::NotFound
        } else {
            FetchErrorKind::Io(e)
        }
    })
}
