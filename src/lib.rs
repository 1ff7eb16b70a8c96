//! ontosearch - ontology-aware search databases for biomedical metadata
//!
//! Builds a single SQLite database that joins a metadata table (OpenGWAS
//! by default), the class hierarchy of an OBO ontology taken from its
//! semantic-sql distribution, mappings of metadata values to ontology terms,
//! per-term direct and inherited mapping counts, and PubMed references.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`config`] - Configuration management and settings
//! - [`table`] - In-memory tables and TSV/CSV files
//! - [`models`] - Core data structures and types
//! - [`ontology`] - Ontology table extraction, term mapping and mapping counts
//! - [`sources`] - Ontology download, OpenGWAS metadata and PubMed lookups
//! - [`storage`] - Database assembly and term queries
//! - [`pipeline`] - The configurable build and cleanup
//! - [`utils`] - Common utilities and helpers
//!
//! # Example
//!
//! ```no_run
//! use ontosearch::config::Config;
//! use ontosearch::pipeline::{build_database, BuildContext};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let ctx = BuildContext::new(config)?;
//!     let report = build_database(&ctx).await?;
//!     println!("{} mappings", report.mappings);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod models;
pub mod ontology;
pub mod pipeline;
pub mod sources;
pub mod storage;
pub mod table;
pub mod utils;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::error::{Error, ErrorCategory, ErrorClass, Result};
    pub use crate::models::{Mapping, MappingCount, OntologyClass, Reference, SourceTerm};
    pub use crate::ontology::{LabelMatcher, MappingCounter, OntologyTables, SemSqlReader, TermMapper};
    pub use crate::pipeline::{build_database, BuildContext, BuildReport};
    pub use crate::storage::{Database, QueryTables, TermQuery};
    pub use crate::table::{Table, Value};
}

// Direct re-exports for convenience
pub use models::{Mapping, MappingCount, SourceTerm};
pub use table::{Table, Value};
