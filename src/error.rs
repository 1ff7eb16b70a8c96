//! Unified error handling for the ontosearch crate
//!
//! Domain errors are consolidated into a single [`Error`] enum while the
//! domain-specific types stay available for callers that need them.
//!
//! # Architecture
//!
//! - [`ErrorClass`] - Common interface implemented by all error types
//! - [`ErrorCategory`] - How the build reacts to an error
//! - [`Error`] - Unified error enum wrapping all domain-specific errors
//!
//! A build aborts on the first error that is not recoverable (an unreachable
//! ontology or metadata source, a broken output database). Recoverable
//! errors are logged and the build carries on with a smaller result.

use std::io;
use thiserror::Error;

pub use crate::ontology::error::OntologyError;
pub use crate::utils::error::FetchError;

/// Common trait for all ontosearch error types
pub trait ErrorClass: std::error::Error {
    /// Check if the build can continue past this error
    fn is_recoverable(&self) -> bool;

    /// Get the error category for handling strategies
    fn category(&self) -> ErrorCategory;
}

/// Classification of errors for handling strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// An upstream service or file could not be reached
    Upstream,
    /// Input data that is skipped rather than stored
    DataQuality,
    /// SQLite and filesystem errors
    Storage,
    /// Malformed delimited, JSON or XML input
    Parsing,
    /// Configuration and validation errors
    Config,
}

impl ErrorCategory {
    pub fn description(&self) -> &'static str {
        match self {
            Self::Upstream => "upstream unavailable",
            Self::DataQuality => "data quality",
            Self::Storage => "storage",
            Self::Parsing => "parsing",
            Self::Config => "configuration",
        }
    }
}

/// Unified error type for the ontosearch crate
#[derive(Error, Debug)]
pub enum Error {
    /// Upstream fetch errors
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Ontology extraction and count errors
    #[error("Ontology error: {0}")]
    Ontology(#[from] OntologyError),

    /// Database errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Delimited file errors
    #[error("Delimited file error: {0}")]
    Csv(#[from] csv::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(String),
}

impl ErrorClass for Error {
    fn is_recoverable(&self) -> bool {
        match self {
            Self::Fetch(e) => e.is_recoverable(),
            Self::Ontology(e) => e.is_recoverable(),
            Self::Database(_) | Self::Io(_) | Self::Config(_) => false,
            Self::Csv(_) | Self::Json(_) => false,
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Fetch(e) => e.category(),
            Self::Ontology(e) => e.category(),
            Self::Database(_) | Self::Io(_) => ErrorCategory::Storage,
            Self::Csv(_) | Self::Json(_) => ErrorCategory::Parsing,
            Self::Config(_) => ErrorCategory::Config,
        }
    }
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

/// Result type alias using the unified Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Category of the first classified error in an `anyhow` chain
pub fn classify(err: &anyhow::Error) -> Option<ErrorCategory> {
    err.chain().find_map(|cause| {
        if let Some(e) = cause.downcast_ref::<Error>() {
            return Some(e.category());
        }
        if let Some(e) = cause.downcast_ref::<OntologyError>() {
            return Some(e.category());
        }
        cause.downcast_ref::<FetchError>().map(ErrorClass::category)
    })
}
