//! Error types produced while fetching pages.

use std::io;

use thiserror::Error;

/// Transport-level errors encountered while issuing HTTP requests.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TransportError {
    /// The server returned an HTTP error status.
    #[error("request to {url} failed with status {status}: {message}")]
    Http {
        /// Fully qualified request URL.
        url: String,
        /// HTTP status code.
        status: u16,
        /// Short error description.
        message: String,
    },
    /// The request did not complete within the configured timeout.
    #[error("request to {url} timed out after {timeout_secs}s")]
    Timeout {
        /// Fully qualified request URL.
        url: String,
        /// Configured timeout in seconds.
        timeout_secs: u64,
    },
    /// The request failed due to an I/O error.
    #[error("network error contacting {url}: {source}")]
    Network {
        /// Fully qualified request URL.
        url: String,
        /// I/O error reported by the transport.
        source: io::Error,
    },
}

/// Errors raised while fetching or decoding a page.
#[derive(Debug, Error)]
pub enum PageFetchError {
    /// The request itself failed.
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// The body was not a page envelope with `results` and `next` keys.
    #[error("failed to decode page envelope from {url}: {source}")]
    Decode {
        /// Page URL.
        url: String,
        /// Error reported by `serde_json`.
        source: serde_json::Error,
    },
    /// The `next` cursor cannot be followed.
    #[error("page {url} returned an unusable next cursor {cursor:?}: {reason}")]
    InvalidCursor {
        /// Page URL.
        url: String,
        /// Cursor value as sent by the server.
        cursor: String,
        /// Why the cursor was rejected.
        reason: String,
    },
}

/// Error raised when the HTTP client cannot be constructed.
#[derive(Debug, Error)]
#[error("failed to build HTTP client: {source}")]
pub struct SourceBuildError {
    #[source]
    source: reqwest::Error,
}

impl SourceBuildError {
    pub(crate) const fn new(source: reqwest::Error) -> Self {
        Self { source }
    }
}
