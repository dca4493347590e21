//! Error taxonomy for the pipeline.
//!
//! Failures split three ways: transient (timeouts, 429, 5xx — retried with
//! backoff), permanent (other 4xx, malformed content — failing again is
//! pointless), and storage (persistence I/O — fatal for the affected row,
//! reported in the run summary). Per-article failures never abort a run.

use thiserror::Error;

/// A page fetch that did not produce a body.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request timed out")]
    Timeout,
    #[error("http status {0}")]
    Http(u16),
    #[error("network error: {0}")]
    Network(#[source] reqwest::Error),
    #[error("invalid url: {0}")]
    InvalidUrl(String),
}

impl FetchError {
    /// Fold a transport error into the taxonomy, keeping timeouts distinct.
    pub fn from_reqwest(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout
        } else {
            FetchError::Network(e)
        }
    }

    /// Timeouts, connection failures, 429 and 5xx are worth another attempt.
    /// Any other HTTP status means the resource will not become available.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Timeout | FetchError::Network(_) => true,
            FetchError::Http(status) => *status == 429 || *status >= 500,
            FetchError::InvalidUrl(_) => false,
        }
    }
}

/// A translation call that did not produce a completion.
#[derive(Debug, Error)]
pub enum TranslateError {
    #[error("rate limited by the translation API")]
    RateLimited,
    #[error("translation API server error {0}")]
    Server(u16),
    #[error("translation API rejected the request with status {0}")]
    Client(u16),
    #[error("translation request timed out")]
    Timeout,
    #[error("network error: {0}")]
    Network(#[source] reqwest::Error),
    #[error("translation API returned an empty completion")]
    Empty,
}

impl TranslateError {
    pub fn from_reqwest(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TranslateError::Timeout
        } else {
            TranslateError::Network(e)
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            TranslateError::RateLimited
                | TranslateError::Server(_)
                | TranslateError::Timeout
                | TranslateError::Network(_)
        )
    }
}

/// Unrecoverable persistence failure.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_transient_statuses() {
        assert!(FetchError::Http(429).is_transient());
        assert!(FetchError::Http(500).is_transient());
        assert!(FetchError::Http(503).is_transient());
        assert!(FetchError::Timeout.is_transient());
    }

    #[test]
    fn test_fetch_permanent_statuses() {
        assert!(!FetchError::Http(404).is_transient());
        assert!(!FetchError::Http(403).is_transient());
        assert!(!FetchError::Http(400).is_transient());
        assert!(!FetchError::InvalidUrl("nope".into()).is_transient());
    }

    #[test]
    fn test_translate_transient_split() {
        assert!(TranslateError::RateLimited.is_transient());
        assert!(TranslateError::Server(502).is_transient());
        assert!(TranslateError::Timeout.is_transient());
        assert!(!TranslateError::Client(400).is_transient());
        assert!(!TranslateError::Empty.is_transient());
    }
}
