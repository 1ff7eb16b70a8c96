//! Error types for upstream fetches
//!
//! Covers every call that leaves the process: the SemSQL ontology download,
//! the OpenGWAS metadata feed and PubMed E-utilities lookups.

use thiserror::Error;

use crate::error::{ErrorCategory, ErrorClass};

/// Errors that can occur while fetching from an upstream service
#[derive(Error, Debug)]
pub enum FetchError {
    /// HTTP request error
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Rate limit exceeded (HTTP 429)
    #[error("Rate limit exceeded")]
    RateLimit,

    /// Server error with status code
    #[error("Server error: {0}")]
    ServerError(u16),

    /// Client error with status code, never retried
    #[error("Client error: {0}")]
    ClientError(u16),

    /// Request timeout
    #[error("Request timeout")]
    Timeout,

    /// Response body could not be decoded
    #[error("Decoding error: {0}")]
    Decode(String),
}

impl FetchError {
    /// Classify a non-success HTTP status
    pub fn from_status(status: reqwest::StatusCode) -> Self {
        match status.as_u16() {
            429 => FetchError::RateLimit,
            code if status.is_server_error() => FetchError::ServerError(code),
            code => FetchError::ClientError(code),
        }
    }
}

impl ErrorClass for FetchError {
    /// Transient failures: timeouts, rate limits, server errors and
    /// connection problems
    fn is_recoverable(&self) -> bool {
        match self {
            FetchError::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            FetchError::RateLimit | FetchError::ServerError(_) | FetchError::Timeout => true,
            FetchError::ClientError(_) | FetchError::Decode(_) => false,
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            FetchError::Decode(_) => ErrorCategory::Parsing,
            _ => ErrorCategory::Upstream,
        }
    }
}
