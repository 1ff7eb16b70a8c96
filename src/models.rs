//! Core data structures shared across the build
//!
//! Source records themselves stay generic [`Table`] rows; the types here are
//! the records this crate derives from them.

use serde::{Deserialize, Serialize};

use crate::table::{Table, Value};

/// Column names of the mappings table
pub mod mapping_columns {
    pub const SOURCE_TERM_ID: &str = "SourceTermID";
    pub const SOURCE_TERM: &str = "SourceTerm";
    pub const MAPPED_TERM_LABEL: &str = "MappedTermLabel";
    pub const MAPPED_TERM_CURIE: &str = "MappedTermCURIE";
    pub const MAPPED_TERM_IRI: &str = "MappedTermIRI";
    pub const MAPPING_SCORE: &str = "MappingScore";

    pub const ALL: [&str; 6] = [
        SOURCE_TERM_ID,
        SOURCE_TERM,
        MAPPED_TERM_LABEL,
        MAPPED_TERM_CURIE,
        MAPPED_TERM_IRI,
        MAPPING_SCORE,
    ];
}

/// Column names of the mapping-counts table
pub mod count_columns {
    pub const IRI: &str = "IRI";
    pub const DIRECT: &str = "Direct";
    pub const INHERITED: &str = "Inherited";
}

/// Free-text value of one source record, to be mapped to an ontology term
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceTerm {
    pub id: String,
    pub text: String,
}

impl SourceTerm {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }

    /// Collect source terms from two metadata columns, skipping rows where
    /// either value is missing
    pub fn from_table(table: &Table, id_column: &str, text_column: &str) -> Option<Vec<Self>> {
        let id_idx = table.column_index(id_column)?;
        let text_idx = table.column_index(text_column)?;
        Some(
            table
                .rows()
                .iter()
                .filter_map(|row| {
                    let id = row[id_idx].as_text()?;
                    let text = row[text_idx].as_text()?;
                    Some(Self { id, text })
                })
                .collect(),
        )
    }
}

/// One source record mapped to one ontology term
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mapping {
    pub source_term_id: String,
    pub source_term: String,
    pub mapped_term_label: String,
    pub mapped_term_curie: String,
    pub mapped_term_iri: String,
    /// `None` when the match is exact and unscored
    pub mapping_score: Option<f64>,
}

impl Mapping {
    /// Round a confidence score to the stored precision of three decimals
    pub fn round_score(score: f64) -> f64 {
        (score * 1000.0).round() / 1000.0
    }

    pub fn to_table(mappings: &[Mapping]) -> Table {
        let mut table = Table::new(mapping_columns::ALL);
        for m in mappings {
            table.push_row(vec![
                m.source_term_id.clone().into(),
                m.source_term.clone().into(),
                m.mapped_term_label.clone().into(),
                m.mapped_term_curie.clone().into(),
                m.mapped_term_iri.clone().into(),
                m.mapping_score.into(),
            ]);
        }
        table
    }
}

/// Direct and inherited mapping counts of one ontology term
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingCount {
    pub iri: String,
    pub direct: usize,
    pub inherited: usize,
}

impl MappingCount {
    pub fn to_table(counts: &[MappingCount]) -> Table {
        let mut table = Table::new([
            count_columns::IRI,
            count_columns::DIRECT,
            count_columns::INHERITED,
        ]);
        for c in counts {
            table.push_row(vec![c.iri.clone().into(), c.direct.into(), c.inherited.into()]);
        }
        table
    }
}

/// An ontology class with its compact and full identifiers
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OntologyClass {
    pub curie: String,
    pub iri: String,
}

impl OntologyClass {
    pub fn new(curie: impl Into<String>, iri: impl Into<String>) -> Self {
        Self {
            curie: curie.into(),
            iri: iri.into(),
        }
    }
}

/// Publication metadata for one PubMed identifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    pub pmid: String,
    pub journal: String,
    pub title: String,
    pub abstract_text: String,
    pub year: String,
    pub url: String,
}

impl Reference {
    /// Column order of the references table; the id column takes the name
    /// of the metadata's publication-id column
    pub fn columns(pmid_column: &str) -> [&str; 6] {
        [pmid_column, "Journal", "Title", "Abstract", "Year", "URL"]
    }

    pub fn to_row(&self) -> Vec<Value> {
        vec![
            self.pmid.clone().into(),
            self.journal.clone().into(),
            self.title.clone().into(),
            self.abstract_text.clone().into(),
            Value::raw(&self.year),
            self.url.clone().into(),
        ]
    }
}
