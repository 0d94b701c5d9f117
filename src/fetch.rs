//! HTTP transport with exponential backoff retry logic.
//!
//! # Architecture
//!
//! - [`Fetcher`]: trait for "fetch this URL with these headers, give me the body"
//! - [`HttpFetcher`]: the reqwest-backed implementation
//! - [`RetryFetch`]: decorator that adds retry logic to any `Fetcher`
//!
//! # Retry Strategy
//!
//! - Only transient failures are retried (network errors, HTTP 429 and 5xx)
//! - Exponential backoff starting at `base_delay`
//! - Maximum delay capped at 30 seconds
//! - Random jitter (0-250ms) added to prevent thundering herd

use crate::error::FetchError;
use async_trait::async_trait;
use rand::{Rng, rng};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::fmt;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, error, instrument, warn};

/// Browser-like User-Agent used when a source does not configure its own.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0 Safari/537.36";

/// Fetch the body of a page.
///
/// Implementors must be shareable across source workers.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch `url`, sending the extra `headers`, and return the decoded body.
    async fn fetch(&self, url: &str, headers: &[(String, String)]) -> Result<String, FetchError>;
}

/// [`Fetcher`] backed by a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Build a client whose requests are bounded by `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(DEFAULT_USER_AGENT)
            .build()?;
        Ok(Self { client })
    }

    fn header_map(headers: &[(String, String)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in headers {
            match (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                (Ok(n), Ok(v)) => {
                    map.insert(n, v);
                }
                _ => warn!(header = %name, "Skipping invalid request header"),
            }
        }
        map
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    #[instrument(level = "debug", skip_all, fields(%url))]
    async fn fetch(&self, url: &str, headers: &[(String, String)]) -> Result<String, FetchError> {
        let t0 = Instant::now();
        let response = self
            .client
            .get(url)
            .headers(Self::header_map(headers))
            .send()
            .await
            .map_err(|source| FetchError::Request { url: url.to_string(), source })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status { url: url.to_string(), status: status.as_u16() });
        }

        let body = response.text().await.map_err(|e| FetchError::Body {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        debug!(
            bytes = body.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Fetched page"
        );
        Ok(body)
    }
}

/// Wrapper that adds exponential backoff retry logic to any [`Fetcher`].
///
/// The delay between retries follows this formula:
/// ```text
/// delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..250ms)
/// ```
pub struct RetryFetch<F> {
    /// The underlying fetcher to wrap.
    inner: F,
    /// Maximum number of retry attempts before giving up.
    max_retries: usize,
    /// Initial delay between retries (doubles with each attempt).
    base_delay: Duration,
    /// Maximum delay cap.
    max_delay: Duration,
}

impl<F: Fetcher> RetryFetch<F> {
    pub fn new(inner: F, max_retries: usize, base_delay: Duration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: Duration::from_secs(30),
        }
    }

    fn backoff(&self, attempt: usize) -> Duration {
        let shift = (attempt.saturating_sub(1)).min(16) as u32;
        let delay = self.base_delay.saturating_mul(1 << shift).min(self.max_delay);
        let jitter_ms: u64 = rng().random_range(0..=250);
        delay + Duration::from_millis(jitter_ms)
    }
}

impl<F> fmt::Debug for RetryFetch<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryFetch")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

#[async_trait]
impl<F: Fetcher> Fetcher for RetryFetch<F> {
    #[instrument(level = "debug", skip_all, fields(%url))]
    async fn fetch(&self, url: &str, headers: &[(String, String)]) -> Result<String, FetchError> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            match self.inner.fetch(url, headers).await {
                Ok(body) => return Ok(body),
                Err(e) if !e.is_transient() => return Err(e),
                Err(e) => {
                    attempt += 1;
                    if attempt > self.max_retries {
                        error!(
                            attempt,
                            max = self.max_retries,
                            elapsed_ms_total = total_t0.elapsed().as_millis() as u64,
                            error = %e,
                            "fetch exhausted retries"
                        );
                        return Err(e);
                    }

                    let delay = self.backoff(attempt);
                    warn!(
                        attempt,
                        max = self.max_retries,
                        ?delay,
                        error = %e,
                        "fetch attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::USER_AGENT;
    use std::sync::Mutex;

    /// Replays a scripted list of responses, one per call.
    struct Scripted {
        responses: Mutex<Vec<Result<String, FetchError>>>,
        calls: Mutex<usize>,
    }

    impl Scripted {
        fn new(mut responses: Vec<Result<String, FetchError>>) -> Self {
            responses.reverse();
            Self { responses: Mutex::new(responses), calls: Mutex::new(0) }
        }

        fn calls(&self) -> usize {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl Fetcher for Scripted {
        async fn fetch(&self, _url: &str, _headers: &[(String, String)]) -> Result<String, FetchError> {
            *self.calls.lock().unwrap() += 1;
            self.responses.lock().unwrap().pop().expect("script exhausted")
        }
    }

    fn status(code: u16) -> FetchError {
        FetchError::Status { url: "https://example.com".into(), status: code }
    }

    #[tokio::test]
    async fn test_retries_transient_then_succeeds() {
        let fetcher = RetryFetch::new(
            Scripted::new(vec![Err(status(503)), Err(status(429)), Ok("body".into())]),
            3,
            Duration::from_millis(10),
        );
        let body = fetcher.fetch("https://example.com", &[]).await.unwrap();
        assert_eq!(body, "body");
        assert_eq!(fetcher.inner.calls(), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let fetcher = RetryFetch::new(
            Scripted::new(vec![Err(status(500)), Err(status(502)), Err(status(504))]),
            2,
            Duration::from_millis(10),
        );
        let err = fetcher.fetch("https://example.com", &[]).await.unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 504, .. }));
        assert_eq!(fetcher.inner.calls(), 3);
    }

    #[tokio::test]
    async fn test_client_errors_are_not_retried() {
        let fetcher = RetryFetch::new(
            Scripted::new(vec![Err(status(404))]),
            5,
            Duration::from_millis(10),
        );
        let err = fetcher.fetch("https://example.com", &[]).await.unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 404, .. }));
        assert_eq!(fetcher.inner.calls(), 1);
    }

    #[test]
    fn test_backoff_is_capped() {
        let fetcher = RetryFetch::new(Scripted::new(vec![]), 20, Duration::from_secs(1));
        assert!(fetcher.backoff(1) >= Duration::from_secs(1));
        assert!(fetcher.backoff(1) <= Duration::from_millis(1250));
        assert!(fetcher.backoff(12) <= Duration::from_millis(30_250));
    }

    #[test]
    fn test_invalid_headers_are_skipped() {
        let map = HttpFetcher::header_map(&[
            ("User-Agent".to_string(), "test-agent".to_string()),
            ("bad header".to_string(), "x".to_string()),
        ]);
        assert_eq!(map.len(), 1);
        assert_eq!(map.get(USER_AGENT).unwrap(), "test-agent");
    }
}
