//! Network-facing content components: redirect resolution and article
//! fetching, each with its own bounded FIFO cache and a shared retry policy.

mod cache;
mod fetcher;
mod resolver;
mod sanitize;

pub use cache::FifoCache;
pub use fetcher::{Article, ArticleFetcher, ARTICLE_CACHE_CAPACITY};
pub use resolver::{RedirectResolver, Resolution, REDIRECT_CACHE_CAPACITY};
pub use sanitize::sanitize_html;

use crate::net::Retryable;
use futures::StreamExt;
use std::time::Duration;
use thiserror::Error;

/// Maximum response body size accepted from any content endpoint (5MB).
pub(crate) const MAX_CONTENT_SIZE: usize = 5 * 1024 * 1024;

/// Per-request wall timeout for a single HTTP call. The retry executor
/// layers on top of this; the session adds its own end-to-end ceilings.
pub(crate) const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

/// HTTP statuses treated as transient server failures.
const RETRYABLE_STATUSES: [u16; 4] = [500, 502, 503, 504];

/// Errors from the encyclopedia content endpoints.
#[derive(Debug, Error)]
pub enum ContentError {
    /// Request exceeded the per-call timeout
    #[error("Request timed out after 20s")]
    Timeout,
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    /// 5xx response
    #[error("Server error: status {0}")]
    Server(u16),
    /// 4xx response; never retried
    #[error("Client error: status {0}")]
    Client(u16),
    /// Response body exceeded the size limit
    #[error("Response too large (exceeds {0} bytes)")]
    ResponseTooLarge(usize),
    #[error("Invalid UTF-8 in response")]
    InvalidUtf8,
    /// Response parsed but did not carry the expected fields
    #[error("Malformed response body: {0}")]
    Malformed(String),
    /// Every leg of the fetch fallback chain was exhausted. The session
    /// substitutes a replacement article instead of surfacing this.
    #[error("No content endpoint could supply the article")]
    Unavailable,
}

impl ContentError {
    pub(crate) fn from_status(status: u16) -> Self {
        if status >= 500 {
            ContentError::Server(status)
        } else {
            ContentError::Client(status)
        }
    }
}

impl Retryable for ContentError {
    fn is_retryable(&self) -> bool {
        match self {
            ContentError::Timeout | ContentError::Network(_) => true,
            ContentError::Server(status) => RETRYABLE_STATUSES.contains(status),
            ContentError::Client(_)
            | ContentError::ResponseTooLarge(_)
            | ContentError::InvalidUtf8
            | ContentError::Malformed(_)
            | ContentError::Unavailable => false,
        }
    }
}

/// Issues a GET and returns the body as text, enforcing the per-call
/// timeout, status classification, and the body size limit.
pub(crate) async fn get_text(client: &reqwest::Client, url: &str) -> Result<String, ContentError> {
    let response = tokio::time::timeout(REQUEST_TIMEOUT, client.get(url).send())
        .await
        .map_err(|_| ContentError::Timeout)?
        .map_err(ContentError::Network)?;

    let status = response.status();
    if !status.is_success() {
        return Err(ContentError::from_status(status.as_u16()));
    }

    read_limited_text(response, MAX_CONTENT_SIZE).await
}

async fn read_limited_text(
    response: reqwest::Response,
    limit: usize,
) -> Result<String, ContentError> {
    // Fast path: check Content-Length header
    if let Some(len) = response.content_length() {
        if len as usize > limit {
            return Err(ContentError::ResponseTooLarge(limit));
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(ContentError::Network)?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(ContentError::ResponseTooLarge(limit));
        }
        bytes.extend_from_slice(&chunk);
    }

    String::from_utf8(bytes).map_err(|_| ContentError::InvalidUtf8)
}
