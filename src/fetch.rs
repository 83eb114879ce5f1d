//! Page fetching with a bounded retry.
//!
//! # Architecture
//!
//! - [`PageFetcher`]: the fetch collaborator, `url -> page body`
//! - [`HttpFetcher`]: `reqwest` implementation with a browser User-Agent and
//!   a per-request timeout
//! - [`TimeoutFetch`]: decorator bounding each attempt by a deadline
//! - [`RetryFetch`]: decorator that retries retryable failures with
//!   exponential backoff and jitter
//!
//! The orchestrator stacks them as `RetryFetch<TimeoutFetch<_>>`, so every
//! attempt gets the full page timeout.
//!
//! # Retry Strategy
//!
//! Pages are retried at most once by default. Only timeouts, network errors,
//! HTTP 429 and 5xx are retried; a 404 will not get better.

use crate::error::{ConfigError, FetchError};
use async_trait::async_trait;
use rand::{Rng, rng};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::{sleep, timeout};
use tracing::{debug, instrument, warn};

/// Desktop browser User-Agent; several sources serve bots a stripped page.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// A fetched page, not yet parsed.
///
/// The body stays a `String` until extraction: parsed documents are not
/// `Send` and must not live across an await point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    /// Final url after redirects.
    pub url: String,
    pub body: String,
}

/// Fetch collaborator.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError>;
}

#[async_trait]
impl<T: PageFetcher + ?Sized> PageFetcher for Arc<T> {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        (**self).fetch(url).await
    }
}

/// `reqwest`-backed fetcher.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpFetcher {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;
        Ok(Self { client, timeout })
    }

    fn map_err(&self, url: &str, e: reqwest::Error) -> FetchError {
        if e.is_timeout() {
            FetchError::Timeout {
                url: url.to_string(),
                after_ms: self.timeout.as_millis() as u64,
            }
        } else {
            FetchError::Network {
                url: url.to_string(),
                message: e.to_string(),
            }
        }
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    #[instrument(level = "debug", skip(self))]
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.map_err(url, e))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        let final_url = resp.url().to_string();
        let body = resp.text().await.map_err(|e| self.map_err(url, e))?;
        debug!(bytes = body.len(), %final_url, "Fetched page");
        Ok(FetchedPage {
            url: final_url,
            body,
        })
    }
}

/// Bounds every fetch by `limit`; expiry becomes [`FetchError::Timeout`].
#[derive(Debug, Clone)]
pub struct TimeoutFetch<T> {
    inner: T,
    limit: Duration,
}

impl<T: PageFetcher> TimeoutFetch<T> {
    pub fn new(inner: T, limit: Duration) -> Self {
        Self { inner, limit }
    }
}

#[async_trait]
impl<T: PageFetcher> PageFetcher for TimeoutFetch<T> {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        match timeout(self.limit, self.inner.fetch(url)).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout {
                url: url.to_string(),
                after_ms: self.limit.as_millis() as u64,
            }),
        }
    }
}

/// Wrapper that adds exponential backoff retry logic to any [`PageFetcher`].
///
/// # Backoff Strategy
///
/// ```text
/// delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..=max_jitter)
/// ```
pub struct RetryFetch<T> {
    inner: T,
    max_retries: usize,
    base_delay: Duration,
    max_delay: Duration,
    max_jitter: Duration,
}

impl<T: PageFetcher> RetryFetch<T> {
    /// Retry once after 500ms (plus jitter).
    pub fn once(inner: T) -> Self {
        Self::new(inner, 1, Duration::from_millis(500))
    }

    pub fn new(inner: T, max_retries: usize, base_delay: Duration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: Duration::from_secs(10),
            max_jitter: Duration::from_millis(250),
        }
    }
}

impl<T> fmt::Debug for RetryFetch<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryFetch")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

#[async_trait]
impl<T: PageFetcher> PageFetcher for RetryFetch<T> {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            match self.inner.fetch(url).await {
                Ok(page) => return Ok(page),
                Err(e) => {
                    attempt += 1;
                    if !e.is_retryable() || attempt > self.max_retries {
                        warn!(
                            %url,
                            attempt,
                            elapsed_ms_total = total_t0.elapsed().as_millis() as u64,
                            error = %e,
                            "fetch gave up"
                        );
                        return Err(e);
                    }

                    let delay = self
                        .base_delay
                        .saturating_mul(1 << (attempt - 1))
                        .min(self.max_delay);
                    let jitter_ms: u64 = rng().random_range(0..=self.max_jitter.as_millis() as u64);
                    let delay = delay + Duration::from_millis(jitter_ms);

                    warn!(%url, attempt, ?delay, error = %e, "fetch failed; backing off");
                    sleep(delay).await;
                }
            }
        }
    }
}
