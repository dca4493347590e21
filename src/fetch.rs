//! Rate-limited, retrying page fetcher.
//!
//! [`FetchPage`] is the capability seam: traversal and the fetch pool only
//! see the trait, so tests drive them with canned pages. [`HttpFetcher`] is
//! the production implementation — reqwest with a per-request timeout, a
//! rate-limiter token taken before every attempt (retries included), and
//! transient failures retried with backoff.

use crate::error::FetchError;
use crate::limiter::RateLimiter;
use crate::retry::RetryPolicy;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Capability of fetching a page body by URL.
pub trait FetchPage {
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

pub struct HttpFetcher {
    client: reqwest::Client,
    limiter: Arc<RateLimiter>,
    retry: RetryPolicy,
}

impl HttpFetcher {
    pub fn new(
        limiter: Arc<RateLimiter>,
        retry: RetryPolicy,
        timeout: Duration,
    ) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(FetchError::from_reqwest)?;
        Ok(Self {
            client,
            limiter,
            retry,
        })
    }

    async fn attempt(&self, url: &str) -> Result<String, FetchError> {
        self.limiter.acquire().await;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(FetchError::from_reqwest)?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Http(status.as_u16()));
        }
        response.text().await.map_err(FetchError::from_reqwest)
    }
}

impl FetchPage for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let body = self
            .retry
            .run(|| self.attempt(url), FetchError::is_transient)
            .await?;
        debug!(%url, bytes = body.len(), "fetched page");
        Ok(body)
    }
}
