//! Async HTTP transport wrapping reqwest.
//!
//! The resolution pipeline only depends on the [`Transport`] trait: one GET
//! with caller headers, returning status, headers and body. Timeout and
//! bounded retries live here, never in the pipeline.

use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;

/// Response from an HTTP GET request.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// Requested URL.
    pub url: String,
    /// HTTP status code.
    pub status: u16,
    /// Response headers (selected subset).
    pub headers: Vec<(String, String)>,
    /// Response body as text.
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Fetch contract required by the resolver.
#[async_trait]
pub trait Transport: Send + Sync {
    /// GET `url` with the given request headers.
    async fn get(&self, url: &str, headers: &[(String, String)]) -> Result<HttpResponse>;
}

/// Timeout and retry tuning for [`HttpClient`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportOptions {
    pub timeout_ms: u64,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            timeout_ms: 10_000,
            max_retries: 3,
            retry_delay_ms: 1_000,
        }
    }
}

/// Upper bound for a single retry delay.
pub const MAX_BACKOFF_MS: u64 = 10_000;

/// reqwest-backed transport.
#[derive(Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    options: TransportOptions,
}

impl HttpClient {
    pub fn new(options: TransportOptions) -> Self {
        let ua = concat!("kuma-mieru/", env!("CARGO_PKG_VERSION"));

        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(options.timeout_ms))
            .redirect(reqwest::redirect::Policy::limited(5))
            .user_agent(ua)
            .build()
            .unwrap_or_default();

        Self { client, options }
    }

    /// Exponential delay before retry `attempt` (1-based), capped at [`MAX_BACKOFF_MS`].
    fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u64.saturating_pow(attempt.saturating_sub(1));
        let ms = self.options.retry_delay_ms.saturating_mul(factor);
        Duration::from_millis(ms.min(MAX_BACKOFF_MS))
    }
}

#[async_trait]
impl Transport for HttpClient {
    /// GET with retry on transport errors and 5xx, and backoff on 429.
    async fn get(&self, url: &str, headers: &[(String, String)]) -> Result<HttpResponse> {
        let mut retries = 0u32;
        let max_retries = self.options.max_retries;

        loop {
            let mut builder = self
                .client
                .get(url)
                .timeout(Duration::from_millis(self.options.timeout_ms));
            for (name, value) in headers {
                builder = builder.header(name.as_str(), value.as_str());
            }

            match builder.send().await {
                Ok(r) => {
                    let status = r.status().as_u16();

                    if status >= 500 && retries < max_retries {
                        retries += 1;
                        tracing::debug!("{url} returned {status}, retry {retries}/{max_retries}");
                        tokio::time::sleep(self.backoff(retries)).await;
                        continue;
                    }

                    if status == 429 && retries < max_retries {
                        retries += 1;
                        let retry_after = r
                            .headers()
                            .get("retry-after")
                            .and_then(|v| v.to_str().ok())
                            .and_then(|s| s.parse::<u64>().ok())
                            .unwrap_or(2);
                        tokio::time::sleep(Duration::from_secs(retry_after.min(10))).await;
                        continue;
                    }

                    let headers: Vec<(String, String)> = r
                        .headers()
                        .iter()
                        .filter(|(k, _)| {
                            matches!(
                                k.as_str(),
                                "content-type" | "cache-control" | "last-modified" | "etag"
                            )
                        })
                        .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or("").to_string()))
                        .collect();

                    let body = r.text().await?;

                    return Ok(HttpResponse {
                        url: url.to_string(),
                        status,
                        headers,
                        body,
                    });
                }
                Err(e) => {
                    if retries < max_retries {
                        retries += 1;
                        tracing::debug!("request to {url} failed ({e}), retry {retries}/{max_retries}");
                        tokio::time::sleep(self.backoff(retries)).await;
                        continue;
                    }
                    return Err(e.into());
                }
            }
        }
    }
}
