use futures::StreamExt;
use std::time::Duration;
use thiserror::Error;

/// Maximum response body size (10MB). Feeds and article pages beyond this
/// are junk or hostile; either way we refuse to buffer them.
const MAX_BODY_SIZE: usize = 10 * 1024 * 1024;

/// Errors that can occur while fetching a single URL.
///
/// One variant per failure class the extractor distinguishes: bad URL
/// syntax, network-level failure, timeout, unsuccessful status, and the
/// two body-shape failures.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The URL string could not be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// Request exceeded the configured timeout
    #[error("Request timed out")]
    Timeout,
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Response body exceeded the 10MB size limit
    #[error("Response too large")]
    ResponseTooLarge,
    /// Response body was not valid UTF-8
    #[error("Invalid UTF-8 in response")]
    InvalidUtf8,
}

/// One-shot fetcher for feed documents and article bodies.
///
/// Holds the shared HTTP client and the per-request timeout; both come
/// from the daemon config at startup. `reqwest` closes or pools the
/// connection on every exit path, success or failure.
#[derive(Clone)]
pub struct ContentFetcher {
    client: reqwest::Client,
    timeout: Duration,
}

impl ContentFetcher {
    pub fn new(client: reqwest::Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    /// Fetches the full response body for `url` as raw bytes.
    ///
    /// # Errors
    ///
    /// - [`FetchError::InvalidUrl`] - the URL does not parse
    /// - [`FetchError::Timeout`] - no complete response within the timeout
    /// - [`FetchError::Network`] - connection, DNS, or TLS failure
    /// - [`FetchError::HttpStatus`] - non-2xx response
    /// - [`FetchError::ResponseTooLarge`] - body over the size limit
    pub async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        // Parse up front so a malformed link is classified as InvalidUrl
        // rather than surfacing as an opaque reqwest builder error.
        let url = url::Url::parse(url)?;

        let response = tokio::time::timeout(self.timeout, self.client.get(url).send())
            .await
            .map_err(|_| FetchError::Timeout)?
            .map_err(FetchError::Network)?;

        if !response.status().is_success() {
            return Err(FetchError::HttpStatus(response.status().as_u16()));
        }

        tokio::time::timeout(self.timeout, read_limited_bytes(response, MAX_BODY_SIZE))
            .await
            .map_err(|_| FetchError::Timeout)?
    }

    /// Fetches the full response body for `url` as UTF-8 text.
    ///
    /// Same failure modes as [`ContentFetcher::fetch_bytes`], plus
    /// [`FetchError::InvalidUtf8`] when the body does not decode.
    pub async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        let bytes = self.fetch_bytes(url).await?;
        String::from_utf8(bytes).map_err(|_| FetchError::InvalidUtf8)
    }
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, FetchError> {
    // Fast path: check Content-Length header
    if let Some(len) = response.content_length() {
        if len as usize > limit {
            return Err(FetchError::ResponseTooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(FetchError::Network)?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(FetchError::ResponseTooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(bytes)
}
