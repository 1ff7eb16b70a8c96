//! Ontology extraction, term mapping and mapping counts
//!
//! # Submodules
//!
//! - [`semsql`] - Extract edge, label, cross-reference and synonym tables
//!   from a semantic-sql ontology database
//! - [`mapper`] - Map free-text metadata values to ontology terms
//! - [`counts`] - Direct and inherited mapping counts per term
//! - [`error`] - Custom error types for ontology operations
//!
//! # Quick Start
//!
//! ```ignore
//! use ontosearch::ontology::{LabelMatcher, MapperSettings, MappingCounter, SemSqlReader, TermMapper};
//!
//! let tables = SemSqlReader::open("resources/efo.db", "efo")?.read_all()?;
//!
//! let matcher = LabelMatcher::new(&tables, MapperSettings::default());
//! let mappings = matcher.map_terms(&source_terms);
//!
//! let counter = MappingCounter::from_tables(&tables, default_blocklist());
//! let (counts, summary) = counter.count(&mappings);
//! ```

pub mod counts;
pub mod error;
pub mod mapper;
pub mod semsql;

pub use counts::{default_blocklist, CountSummary, MappingCounter, DEFAULT_TERM_BLOCKLIST};
pub use error::{OntologyError, OntologyResult};
pub use mapper::{load_mappings_file, LabelMatcher, MapperSettings, TermMapper};
pub use semsql::{OntologyTables, PrefixMap, SemSqlReader};

use crate::models::MappingCount;
use crate::table::Table;

/// Default location of pre-built semantic-sql databases
pub const SEMSQL_BASE_URL: &str = "https://s3.amazonaws.com/bbop-sqlite";

/// Download URL of a pre-built ontology database
pub fn semsql_url(name: &str) -> String {
    format!("{SEMSQL_BASE_URL}/{}.db", name.to_lowercase())
}

/// Labels restricted to terms that have a count row, with `Direct` and
/// `Inherited` appended
///
/// Terms without labels and blocked terms drop out of the inner join.
pub fn labels_with_counts(labels: &Table, counts: &[MappingCount]) -> Table {
    let counts = MappingCount::to_table(counts);
    labels
        .inner_join(&counts, crate::models::count_columns::IRI)
        .unwrap_or_else(|| Table::new(labels.columns().iter().cloned()))
}
