//! HTTP client for product page requests.
//!
//! The fetcher talks to the network only through [`PageTransport`], so a
//! fake transport can stand in for [`HttpClient`] in tests.

mod response;
mod user_agent;

pub use response::PageResponse;
pub use user_agent::{pick_user_agent, BROWSER_USER_AGENTS};

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::{ACCEPT_ENCODING, ACCEPT_LANGUAGE, USER_AGENT};
use reqwest::Client;
use thiserror::Error;
use tracing::debug;

/// Fixed language preference sent with every request.
pub const ACCEPT_LANGUAGE_VALUE: &str = "en-US,en;q=0.9,de;q=0.8";
/// Fixed encoding preference sent with every request.
pub const ACCEPT_ENCODING_VALUE: &str = "gzip, deflate, br";

/// Errors raised while fetching a page.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} timed out after {}s", .timeout.as_secs())]
    Timeout { url: String, timeout: Duration },

    #[error("request to {url} failed: {message}")]
    Request { url: String, message: String },

    #[error("failed to build HTTP client: {0}")]
    Build(String),
}

impl FetchError {
    fn from_reqwest(url: &str, timeout: Duration, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return FetchError::Timeout {
                url: url.to_string(),
                timeout,
            };
        }
        FetchError::Request {
            url: url.to_string(),
            message: error_chain(&err),
        }
    }
}

/// Render an error together with its sources, e.g.
/// `error sending request: connection refused`.
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}

/// Network boundary of the fetcher.
#[async_trait]
pub trait PageTransport: Send + Sync {
    /// Issue one GET for `url` presenting `user_agent`. No retries.
    async fn get(&self, url: &str, user_agent: &str) -> Result<PageResponse, FetchError>;
}

/// reqwest-backed transport shared read-only by all fetch workers.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    timeout: Duration,
}

/// Builder for constructing `HttpClient`.
pub struct HttpClientBuilder {
    timeout: Duration,
    accept_language: String,
}

impl HttpClientBuilder {
    /// Override the `Accept-Language` header.
    pub fn accept_language(mut self, value: &str) -> Self {
        self.accept_language = value.to_string();
        self
    }

    pub fn build(self) -> Result<HttpClient, FetchError> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            ACCEPT_LANGUAGE,
            self.accept_language
                .parse()
                .map_err(|e| FetchError::Build(format!("invalid Accept-Language: {}", e)))?,
        );
        headers.insert(
            ACCEPT_ENCODING,
            reqwest::header::HeaderValue::from_static(ACCEPT_ENCODING_VALUE),
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(self.timeout)
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| FetchError::Build(error_chain(&e)))?;

        Ok(HttpClient {
            client,
            timeout: self.timeout,
        })
    }
}

impl HttpClient {
    /// Start building a client with the given request timeout.
    pub fn builder(timeout: Duration) -> HttpClientBuilder {
        HttpClientBuilder {
            timeout,
            accept_language: ACCEPT_LANGUAGE_VALUE.to_string(),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[async_trait]
impl PageTransport for HttpClient {
    async fn get(&self, url: &str, user_agent: &str) -> Result<PageResponse, FetchError> {
        let start = Instant::now();
        let response = self
            .client
            .get(url)
            .header(USER_AGENT, user_agent)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(url, self.timeout, e))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| FetchError::from_reqwest(url, self.timeout, e))?;

        debug!(
            "GET {} -> {} ({} bytes, {}ms)",
            url,
            status,
            body.len(),
            start.elapsed().as_millis()
        );

        Ok(PageResponse { status, body })
    }
}
