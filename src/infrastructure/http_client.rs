//! HTTP client for web crawling with politeness jitter and soft failure
//!
//! Wraps a single shared `reqwest::Client` configured with the overall
//! request timeout, cookie store and compression. Fetch failures are logged
//! and absorbed: callers receive `None` and decide how to degrade, so no
//! transport error ever aborts the pipeline.

use std::time::Duration;

use anyhow::{anyhow, Result};
use reqwest::header::HeaderMap;
use reqwest::{Client, ClientBuilder, Response};
use tokio::time::sleep;
use tracing::warn;

use crate::infrastructure::config::{self, defaults};

/// Uniform random delay window slept before a request is issued.
///
/// The jitter is politeness towards the crawled sites and also breaks the
/// fixed request cadence that anti-bot layers key on.
#[derive(Debug, Clone, Copy)]
pub struct JitterWindow {
    min_ms: u64,
    max_ms: u64,
}

impl JitterWindow {
    /// Window bounds in milliseconds; `max_ms` must be >= `min_ms`
    pub const fn from_millis(min_ms: u64, max_ms: u64) -> Self {
        Self { min_ms, max_ms }
    }

    /// Draw one delay from the window
    pub fn sample(&self) -> Duration {
        let span = self.max_ms.saturating_sub(self.min_ms);
        Duration::from_millis(self.min_ms + fastrand::u64(0..=span))
    }
}

/// Configuration for HTTP client behavior
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Overall request timeout in seconds
    pub timeout_seconds: u64,
    /// User agent string
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: defaults::REQUEST_TIMEOUT_SECONDS,
            user_agent: config::USER_AGENT.to_string(),
        }
    }
}

/// HTTP client shared by every component of the pipeline
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Create a new HTTP client with the default configuration
    pub fn new() -> Result<Self> {
        Self::with_config(HttpClientConfig::default())
    }

    /// Create a new HTTP client with custom configuration
    pub fn with_config(config: HttpClientConfig) -> Result<Self> {
        let client = ClientBuilder::new()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(&config.user_agent)
            .cookie_store(true)
            .gzip(true)
            .brotli(true)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| anyhow!("Failed to create HTTP client: {}", e))?;

        Ok(Self { client })
    }

    /// Issue a single GET and return the raw response.
    ///
    /// Used directly by callers that need the status code (the rate-limit
    /// backoff loop); everything else goes through [`fetch_text`].
    ///
    /// [`fetch_text`]: HttpClient::fetch_text
    pub async fn get(
        &self,
        url: &str,
        headers: Option<&HeaderMap>,
        params: &[(&str, &str)],
    ) -> reqwest::Result<Response> {
        let mut request = self.client.get(url);
        if let Some(headers) = headers {
            request = request.headers(headers.clone());
        }
        if !params.is_empty() {
            request = request.query(params);
        }
        request.send().await
    }

    /// Fetch a page body, or nothing.
    ///
    /// Sleeps a random duration from `jitter` first, then issues the request.
    /// Transport errors, timeouts and non-200 statuses are logged and yield
    /// `None`; this method never fails hard.
    pub async fn fetch_text(
        &self,
        url: &str,
        headers: Option<&HeaderMap>,
        params: &[(&str, &str)],
        jitter: JitterWindow,
    ) -> Option<String> {
        sleep(jitter.sample()).await;

        match self.get(url, headers, params).await {
            Ok(response) => {
                let status = response.status();
                if status != reqwest::StatusCode::OK {
                    warn!("[HTTP-ERR] {} -> {}", url, status);
                    return None;
                }
                match response.text().await {
                    Ok(body) => Some(body),
                    Err(e) => {
                        warn!("[HTTP-ERR] {} -> {}", url, e);
                        None
                    }
                }
            }
            Err(e) => {
                warn!("[HTTP-ERR] {} -> {}", url, e);
                None
            }
        }
    }
}
