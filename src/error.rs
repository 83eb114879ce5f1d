//! Error types for ingestion.
//!
//! Only [`ConfigError`] is ever fatal, and only at startup. Everything that can
//! go wrong during a run ([`FetchError`], [`Rejected`]) is wrapped in an
//! [`ExtractionFault`] and folded into the run's per-source outcome.

use crate::models::SourceId;
use thiserror::Error;

/// Failure of the fetch collaborator for one page.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    /// The page did not answer within the per-page timeout.
    #[error("timed out after {after_ms}ms fetching {url}")]
    Timeout { url: String, after_ms: u64 },

    /// The server answered with a non-success status.
    #[error("HTTP {status} fetching {url}")]
    HttpStatus { url: String, status: u16 },

    /// Connection, TLS or body read failure.
    #[error("network error fetching {url}: {message}")]
    Network { url: String, message: String },
}

impl FetchError {
    /// Whether a second attempt has any chance of succeeding.
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Timeout { .. } | FetchError::Network { .. } => true,
            FetchError::HttpStatus { status, .. } => *status == 429 || *status >= 500,
        }
    }

    pub fn url(&self) -> &str {
        match self {
            FetchError::Timeout { url, .. }
            | FetchError::HttpStatus { url, .. }
            | FetchError::Network { url, .. } => url,
        }
    }
}

/// Startup-time configuration problems.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("source `{0}` is already registered")]
    DuplicateSource(SourceId),

    #[error("source `{0}` is not registered")]
    UnknownSource(SourceId),

    #[error("invalid CSS selector `{selector}`: {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("invalid route pattern `{pattern}`: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("invalid url `{url}`: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("invalid cadence: {0}")]
    InvalidCadence(String),

    #[error("building HTTP client: {0}")]
    HttpClient(String),

    #[error("reading config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("parsing config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Why the normalizer refused a raw extraction.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Rejected {
    #[error("missing title")]
    MissingTitle,

    #[error("missing url")]
    MissingUrl,

    #[error("url `{0}` cannot be resolved against the source base")]
    UnresolvableUrl(String),
}

/// The one fault type carried by item, page and source results.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExtractionFault {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("rejected: {0}")]
    Rejected(#[from] Rejected),

    #[error("source `{0}` is not registered")]
    UnknownSource(SourceId),
}

/// Failure reported by the storage collaborator.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("writing {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("serializing articles: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_fetch_errors() {
        let t = FetchError::Timeout {
            url: "https://a".into(),
            after_ms: 10,
        };
        let s503 = FetchError::HttpStatus {
            url: "https://a".into(),
            status: 503,
        };
        let s404 = FetchError::HttpStatus {
            url: "https://a".into(),
            status: 404,
        };
        assert!(t.is_retryable());
        assert!(s503.is_retryable());
        assert!(!s404.is_retryable());
        assert_eq!(s404.url(), "https://a");
    }

    #[test]
    fn fault_display_is_readable() {
        let f: ExtractionFault = Rejected::MissingTitle.into();
        assert_eq!(f.to_string(), "rejected: missing title");
    }
}
