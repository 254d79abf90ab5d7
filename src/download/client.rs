//! HTTP client wrapper for fetching archive resources.
//!
//! [`HttpClient`] is the production [`ResourceFetcher`]. The archive loop
//! only sees the trait, so tests and callers can substitute their own
//! transport.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, instrument};
use url::Url;

use super::constants::{CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS};
use super::error::DownloadError;
use crate::user_agent;

/// Retrieves a resource body as text.
#[async_trait]
pub trait ResourceFetcher: Send + Sync {
    /// Fetches `url` and returns the full response body.
    ///
    /// Non-success statuses and transport failures are errors.
    async fn fetch_text(&self, url: &str) -> Result<String, DownloadError>;
}

/// HTTP client for fetching resources.
///
/// Create once and reuse for every record, so connections are pooled.
///
/// # Example
///
/// ```no_run
/// use sheetbridge_core::download::HttpClient;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = HttpClient::new()?;
/// let body = client.get_text("https://example.com/crmm_1.meta.xml").await?;
/// println!("{} bytes", body.len());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Creates a client with the default timeouts (connect 30s, read 5min).
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::Client`] if the TLS backend cannot be initialised.
    pub fn new() -> Result<Self, DownloadError> {
        Self::with_timeouts(CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS)
    }

    /// Creates a client with explicit timeout values in seconds.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::Client`] if the TLS backend cannot be initialised.
    pub fn with_timeouts(
        connect_timeout_secs: u64,
        read_timeout_secs: u64,
    ) -> Result<Self, DownloadError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(connect_timeout_secs))
            .timeout(Duration::from_secs(read_timeout_secs))
            .gzip(true)
            .user_agent(user_agent::default_user_agent())
            .build()
            .map_err(|source| DownloadError::Client { source })?;
        Ok(Self { client })
    }

    /// Fetches a URL and returns its body decoded as text.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::InvalidUrl`] for malformed URLs,
    /// [`DownloadError::HttpStatus`] for non-2xx responses, and
    /// [`DownloadError::Timeout`] / [`DownloadError::Network`] for transport
    /// failures while sending or reading the body.
    #[instrument(skip(self), fields(url = %url))]
    pub async fn get_text(&self, url: &str) -> Result<String, DownloadError> {
        Url::parse(url).map_err(|_| DownloadError::invalid_url(url))?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| DownloadError::from_request(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::http_status(url, status.as_u16()));
        }

        let body = response
            .text()
            .await
            .map_err(|e| DownloadError::from_request(url, e))?;
        debug!(bytes = body.len(), "response body received");
        Ok(body)
    }
}

#[async_trait]
impl ResourceFetcher for HttpClient {
    async fn fetch_text(&self, url: &str) -> Result<String, DownloadError> {
        self.get_text(url).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use wiremock::matchers::{header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[tokio::test]
    async fn test_get_text_returns_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/crmm_1.meta.xml"))
            .and(header_exists("user-agent"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<meta>ë</meta>"))
            .mount(&server)
            .await;

        let client = HttpClient::new().unwrap();
        let body = client
            .get_text(&format!("{}/crmm_1.meta.xml", server.uri()))
            .await
            .unwrap();
        assert_eq!(body, "<meta>ë</meta>");
    }

    #[tokio::test]
    async fn test_get_text_non_success_is_http_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = HttpClient::new().unwrap();
        let err = client
            .get_text(&format!("{}/missing.psd", server.uri()))
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(404));
    }

    #[tokio::test]
    async fn test_get_text_invalid_url() {
        let client = HttpClient::new().unwrap();
        let err = client.get_text("not a url").await.unwrap_err();
        assert!(matches!(err, DownloadError::InvalidUrl { .. }));
    }

    #[tokio::test]
    async fn test_get_text_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200).set_delay(std::time::Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let client = HttpClient::with_timeouts(5, 1).unwrap();
        let err = client
            .get_text(&format!("{}/slow.psd", server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, DownloadError::Timeout { .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn test_fetch_text_through_trait_object() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/a.psd"))
            .respond_with(ResponseTemplate::new(200).set_body_string("psd"))
            .mount(&server)
            .await;

        let client = HttpClient::new().unwrap();
        let fetcher: &dyn ResourceFetcher = &client;
        let body = fetcher
            .fetch_text(&format!("{}/a.psd", server.uri()))
            .await
            .unwrap();
        assert_eq!(body, "psd");
    }
}
