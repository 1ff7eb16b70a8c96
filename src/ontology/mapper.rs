//! Mapping free-text metadata values to ontology terms
//!
//! The matching algorithm itself sits behind [`TermMapper`]. Two sources of
//! mappings are provided: [`LabelMatcher`], which matches normalized text
//! against class labels and synonyms, and [`load_mappings_file`], which
//! reads the CSV a text2term run leaves behind.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::error::OntologyError;
use super::semsql::OntologyTables;
use crate::error::Result;
use crate::models::{mapping_columns, Mapping, SourceTerm};
use crate::table::{read_raw_table, Table};
use crate::utils::match_key;

pub const LABEL_SCORE: f64 = 1.0;
pub const SYNONYM_SCORE: f64 = 0.9;

pub const DEFAULT_MIN_SCORE: f64 = 0.6;

/// Maps source terms to ontology terms
pub trait TermMapper {
    /// At most one mapping per source record; records without an acceptable
    /// match are left out
    fn map_terms(&self, sources: &[SourceTerm]) -> Vec<Mapping>;
}

/// Acceptance rules shared by every mapping source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapperSettings {
    pub min_score: f64,
    /// Allowed target IRI prefixes; empty allows everything
    pub base_iris: Vec<String>,
    pub exclude_deprecated: bool,
}

impl Default for MapperSettings {
    fn default() -> Self {
        Self {
            min_score: DEFAULT_MIN_SCORE,
            base_iris: Vec::new(),
            exclude_deprecated: true,
        }
    }
}

impl MapperSettings {
    pub fn allows_iri(&self, iri: &str) -> bool {
        self.base_iris.is_empty() || self.base_iris.iter().any(|base| iri.starts_with(base.as_str()))
    }

    /// Unscored mappings are exact and always pass the threshold
    pub fn accepts(&self, iri: &str, score: Option<f64>) -> bool {
        self.allows_iri(iri) && score.map_or(true, |s| s >= self.min_score)
    }
}

// ============================================================================
// Label matcher
// ============================================================================

#[derive(Debug, Clone)]
struct Candidate {
    curie: String,
    iri: String,
    label: String,
}

/// Exact matcher over normalized labels (score 1.0) and synonyms (score 0.9)
#[derive(Debug, Clone)]
pub struct LabelMatcher {
    settings: MapperSettings,
    labels: BTreeMap<String, Vec<Candidate>>,
    synonyms: BTreeMap<String, Vec<Candidate>>,
}

impl LabelMatcher {
    pub fn new(tables: &OntologyTables, settings: MapperSettings) -> Self {
        // subject → preferred label, used as the mapped label for synonym hits
        let mut preferred: BTreeMap<String, String> = BTreeMap::new();
        let mut labels: BTreeMap<String, Vec<Candidate>> = BTreeMap::new();
        for (curie, label, iri) in triples(&tables.labels) {
            if !settings.allows_iri(&iri) {
                continue;
            }
            if settings.exclude_deprecated && tables.deprecated.contains(&curie) {
                continue;
            }
            preferred.entry(curie.clone()).or_insert_with(|| label.clone());
            labels.entry(match_key(&label)).or_default().push(Candidate { curie, iri, label });
        }

        let mut synonyms: BTreeMap<String, Vec<Candidate>> = BTreeMap::new();
        for (curie, synonym, iri) in triples(&tables.synonyms) {
            // synonyms of classes without a usable label are dropped with them
            let Some(label) = preferred.get(&curie) else {
                continue;
            };
            synonyms.entry(match_key(&synonym)).or_default().push(Candidate {
                curie,
                iri,
                label: label.clone(),
            });
        }

        for candidates in labels.values_mut().chain(synonyms.values_mut()) {
            candidates.sort_by(|a, b| a.iri.cmp(&b.iri));
            candidates.dedup_by(|a, b| a.iri == b.iri);
        }

        debug!(
            labels = labels.len(),
            synonyms = synonyms.len(),
            "Built label index"
        );
        Self {
            settings,
            labels,
            synonyms,
        }
    }

    fn best_match(&self, text: &str) -> Option<(&Candidate, f64)> {
        let key = match_key(text);
        if key.is_empty() {
            return None;
        }
        let hit = self
            .labels
            .get(&key)
            .and_then(|c| c.first())
            .map(|c| (c, LABEL_SCORE))
            .or_else(|| {
                self.synonyms
                    .get(&key)
                    .and_then(|c| c.first())
                    .map(|c| (c, SYNONYM_SCORE))
            })?;
        self.settings
            .accepts(&hit.0.iri, Some(hit.1))
            .then_some(hit)
    }
}

impl TermMapper for LabelMatcher {
    fn map_terms(&self, sources: &[SourceTerm]) -> Vec<Mapping> {
        let mut seen = BTreeSet::new();
        let mappings: Vec<Mapping> = sources
            .iter()
            .filter(|s| seen.insert(s.id.clone()))
            .filter_map(|source| {
                let (candidate, score) = self.best_match(&source.text)?;
                Some(Mapping {
                    source_term_id: source.id.clone(),
                    source_term: source.text.clone(),
                    mapped_term_label: candidate.label.clone(),
                    mapped_term_curie: candidate.curie.clone(),
                    mapped_term_iri: candidate.iri.clone(),
                    mapping_score: Some(Mapping::round_score(score)),
                })
            })
            .collect();

        info!(
            sources = sources.len(),
            mapped = mappings.len(),
            "Mapped source terms by label"
        );
        mappings
    }
}

/// `(subject, object, IRI)` text triples of a labels or synonyms table
fn triples(table: &Table) -> Vec<(String, String, String)> {
    let (Some(s), Some(o), Some(i)) = (
        table.column_index("subject"),
        table.column_index("object"),
        table.column_index("IRI"),
    ) else {
        return Vec::new();
    };
    table
        .rows()
        .iter()
        .filter_map(|row| Some((row[s].as_text()?, row[o].as_text()?, row[i].as_text()?)))
        .collect()
}

// ============================================================================
// Precomputed mappings
// ============================================================================

/// Load a text2term mappings file
///
/// Column names lose their spaces (`Source Term ID` → `SourceTermID`),
/// `#` comment lines are skipped and rows without a target IRI dropped.
/// Scores are rounded to three decimals and filtered by `settings`.
pub fn load_mappings_file(path: &Path, settings: &MapperSettings) -> Result<Vec<Mapping>> {
    let raw = read_raw_table(path)?;
    let mut table = Table::new(raw.columns().iter().map(|c| c.replace(' ', "")));
    for row in raw.rows() {
        table.push_row(row.clone());
    }

    let column = |name: &str| {
        table
            .column_index(name)
            .ok_or_else(|| OntologyError::invalid_mappings(path, format!("missing column {name}")))
    };
    let id = column(mapping_columns::SOURCE_TERM_ID)?;
    let text = column(mapping_columns::SOURCE_TERM)?;
    let label = column(mapping_columns::MAPPED_TERM_LABEL)?;
    let curie = column(mapping_columns::MAPPED_TERM_CURIE)?;
    let iri = column(mapping_columns::MAPPED_TERM_IRI)?;
    let score = table.column_index(mapping_columns::MAPPING_SCORE);

    let mut dropped = 0usize;
    let mut mappings = Vec::with_capacity(table.len());
    for row in table.rows() {
        let (Some(source_term_id), Some(mapped_term_iri)) = (row[id].as_text(), row[iri].as_text())
        else {
            dropped += 1;
            continue;
        };
        let mapping_score = score
            .and_then(|idx| row[idx].as_f64())
            .map(Mapping::round_score);
        if !settings.accepts(&mapped_term_iri, mapping_score) {
            dropped += 1;
            continue;
        }
        mappings.push(Mapping {
            source_term_id,
            source_term: row[text].as_text().unwrap_or_default(),
            mapped_term_label: row[label].as_text().unwrap_or_default(),
            mapped_term_curie: row[curie].as_text().unwrap_or_default(),
            mapped_term_iri,
            mapping_score,
        });
    }

    info!(
        path = %path.display(),
        mappings = mappings.len(),
        dropped,
        "Loaded precomputed mappings"
    );
    Ok(mappings)
}
