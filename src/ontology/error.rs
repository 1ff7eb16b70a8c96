//! Custom error types for ontology operations
//!
//! Covers reading a SemSQL ontology dump, loading mapping files and
//! computing mapping counts.

use std::fmt;
use std::io;
use std::path::PathBuf;

use crate::error::{ErrorCategory, ErrorClass};

/// Result type alias for ontology operations
pub type OntologyResult<T> = Result<T, OntologyError>;

/// Custom error type for ontology operations
#[derive(Debug)]
pub enum OntologyError {
    // =========================================================================
    // Source Errors
    // =========================================================================
    /// The ontology database could not be fetched or opened
    Unavailable { location: String, reason: String },

    /// A required SemSQL table or view is missing from the dump
    MissingTable { ontology: String, table: String },

    /// A query against the SemSQL dump failed
    QueryFailed { ontology: String, reason: String },

    // =========================================================================
    // Mapping Errors
    // =========================================================================
    /// A mapping targets an IRI that is not a class of the loaded ontology
    UnmatchedTarget { iri: String },

    /// A mapping file lacks a required column or is malformed
    InvalidMappings { path: PathBuf, reason: String },

    // =========================================================================
    // I/O Errors
    // =========================================================================
    /// File I/O error
    IoError {
        operation: String,
        path: Option<PathBuf>,
        source: io::Error,
    },
}

impl fmt::Display for OntologyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OntologyError::Unavailable { location, reason } => {
                write!(f, "Ontology source '{location}' unavailable: {reason}")
            }
            OntologyError::MissingTable { ontology, table } => {
                write!(f, "Ontology '{ontology}' has no '{table}' table")
            }
            OntologyError::QueryFailed { ontology, reason } => {
                write!(f, "Query against ontology '{ontology}' failed: {reason}")
            }
            OntologyError::UnmatchedTarget { iri } => {
                write!(f, "Mapping target '{iri}' is not a class of the ontology")
            }
            OntologyError::InvalidMappings { path, reason } => {
                write!(f, "Invalid mappings file {path:?}: {reason}")
            }
            OntologyError::IoError {
                operation,
                path,
                source,
            } => {
                if let Some(p) = path {
                    write!(f, "I/O error during {operation} on {p:?}: {source}")
                } else {
                    write!(f, "I/O error during {operation}: {source}")
                }
            }
        }
    }
}

impl std::error::Error for OntologyError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            OntologyError::IoError { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<io::Error> for OntologyError {
    fn from(err: io::Error) -> Self {
        OntologyError::IoError {
            operation: "unknown".to_string(),
            path: None,
            source: err,
        }
    }
}

impl OntologyError {
    /// Create an unavailable-source error
    pub fn unavailable(location: impl Into<String>, reason: impl Into<String>) -> Self {
        OntologyError::Unavailable {
            location: location.into(),
            reason: reason.into(),
        }
    }

    /// Create a failed-query error
    pub fn query_failed(ontology: impl Into<String>, reason: impl fmt::Display) -> Self {
        OntologyError::QueryFailed {
            ontology: ontology.into(),
            reason: reason.to_string(),
        }
    }

    /// Create an unmatched-target data-quality event
    pub fn unmatched_target(iri: impl Into<String>) -> Self {
        OntologyError::UnmatchedTarget { iri: iri.into() }
    }

    /// Create an invalid-mappings error
    pub fn invalid_mappings(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        OntologyError::InvalidMappings {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create an I/O error with context
    pub fn io_error(operation: impl Into<String>, path: Option<PathBuf>, source: io::Error) -> Self {
        OntologyError::IoError {
            operation: operation.into(),
            path,
            source,
        }
    }
}

impl ErrorClass for OntologyError {
    /// Only unmatched targets let the build continue
    fn is_recoverable(&self) -> bool {
        matches!(self, OntologyError::UnmatchedTarget { .. })
    }

    fn category(&self) -> ErrorCategory {
        match self {
            OntologyError::Unavailable { .. } => ErrorCategory::Upstream,
            OntologyError::MissingTable { .. } | OntologyError::QueryFailed { .. } => {
                ErrorCategory::Storage
            }
            OntologyError::UnmatchedTarget { .. } => ErrorCategory::DataQuality,
            OntologyError::InvalidMappings { .. } => ErrorCategory::Parsing,
            OntologyError::IoError { .. } => ErrorCategory::Storage,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unavailable_display() {
        let err = OntologyError::unavailable("https://s3.amazonaws.com/bbop-sqlite/efo.db", "404");
        assert!(err.to_string().contains("efo.db"));
        assert!(err.to_string().contains("404"));
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_missing_table_display() {
        let err = OntologyError::MissingTable {
            ontology: "efo".to_string(),
            table: "entailed_edge".to_string(),
        };
        assert_eq!(err.to_string(), "Ontology 'efo' has no 'entailed_edge' table");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "File not found");
        let ont_err: OntologyError = io_err.into();
        assert!(matches!(ont_err, OntologyError::IoError { .. }));
        assert!(std::error::Error::source(&ont_err).is_some());
    }

    #[test]
    fn test_unmatched_is_data_quality() {
        let err = OntologyError::unmatched_target("http://www.ebi.ac.uk/efo/EFO_9999999");
        assert!(err.is_recoverable());
        assert_eq!(err.category(), ErrorCategory::DataQuality);
    }
}
