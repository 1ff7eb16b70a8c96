//! Direct and inherited mapping counts per ontology term
//!
//! Counts are plain set algebra over the entailed-edge closure the
//! ontology distribution already ships, so no reasoner is involved:
//!
//! ```text
//! direct(T)    = { source ids mapped to T }
//! inherited(T) = ( ∪ direct(D) for every strict descendant D of T ) \ direct(T)
//! ```
//!
//! A record inherited by both a term and that term's parent is counted for
//! both; only the term's own direct set is subtracted.

use std::collections::{BTreeSet, HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::error::OntologyError;
use super::semsql::{OntologyTables, PrefixMap};
use crate::error::ErrorClass;
use crate::models::{Mapping, MappingCount, OntologyClass};

/// Identifier fragments of upper-level and unrelated vocabularies whose
/// terms are left out of the counts
pub const DEFAULT_TERM_BLOCKLIST: &[&str] = &[
    "BFO_",
    "CHEBI_",
    "PATO_",
    "NCBITaxon_",
    "dbpedia.org",
    "CL_",
    "CLO_",
    "UO_",
    "GO_",
    "BAO_",
    "BTO_",
    "IAO_",
    "EO_",
    "FBbt_",
    "FMA_",
    "UBERON_",
    "IDO_",
    "MA_",
    "FBdv_",
];

pub fn default_blocklist() -> Vec<String> {
    DEFAULT_TERM_BLOCKLIST.iter().map(|s| s.to_string()).collect()
}

// ============================================================================
// Summary
// ============================================================================

/// What happened to the input mappings during one count run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountSummary {
    /// Terms emitted
    pub terms: usize,
    /// Terms skipped because they match the blocklist
    pub blocked_terms: usize,
    /// Mappings whose target is a class of the ontology
    pub matched_mappings: usize,
    /// Mappings whose target is not a class of the ontology
    pub unmatched_mappings: usize,
    /// Distinct unmatched target IRIs, sorted
    pub unmatched_targets: Vec<String>,
    /// Terms with at least one direct mapping
    pub terms_with_direct: usize,
    /// Terms with at least one inherited mapping
    pub terms_with_inherited: usize,
}

// ============================================================================
// Counter
// ============================================================================

/// Mapping-count engine for one ontology
///
/// Holds the class set and the strict-descendant index; the same counter
/// can be applied to any number of mapping sets.
#[derive(Debug, Clone)]
pub struct MappingCounter {
    /// Class IRIs in output order
    classes: BTreeSet<String>,
    /// IRI → IRIs of strict descendants
    descendants: HashMap<String, BTreeSet<String>>,
    blocklist: Vec<String>,
}

impl MappingCounter {
    /// Build a counter from the class set and `(subject, object)` entailed
    /// edges given as CURIEs
    ///
    /// Edge endpoints are resolved to IRIs through the class set, then the
    /// prefix map. Reflexive edges are ignored.
    pub fn new(
        classes: &[OntologyClass],
        entailed_edges: &[(String, String)],
        prefixes: &PrefixMap,
        blocklist: Vec<String>,
    ) -> Self {
        let by_curie: HashMap<&str, &str> = classes
            .iter()
            .map(|c| (c.curie.as_str(), c.iri.as_str()))
            .collect();
        let resolve = |id: &str| -> String {
            by_curie
                .get(id)
                .map(|iri| iri.to_string())
                .unwrap_or_else(|| prefixes.expand(id))
        };

        let mut descendants: HashMap<String, BTreeSet<String>> = HashMap::new();
        let mut reflexive = 0usize;
        for (subject, object) in entailed_edges {
            if subject == object {
                reflexive += 1;
                continue;
            }
            descendants
                .entry(resolve(object))
                .or_default()
                .insert(resolve(subject));
        }
        debug!(
            edges = entailed_edges.len(),
            reflexive,
            ancestors = descendants.len(),
            "Built descendant index"
        );

        Self {
            classes: classes.iter().map(|c| c.iri.clone()).collect(),
            descendants,
            blocklist,
        }
    }

    /// Counter for extracted ontology tables
    pub fn from_tables(tables: &OntologyTables, blocklist: Vec<String>) -> Self {
        Self::new(
            &tables.classes,
            &tables.entailed_pairs(),
            &tables.prefixes,
            blocklist,
        )
    }

    pub fn is_blocked(&self, iri: &str) -> bool {
        self.blocklist.iter().any(|pattern| iri.contains(pattern.as_str()))
    }

    pub fn is_class(&self, iri: &str) -> bool {
        self.classes.contains(iri)
    }

    /// Strict descendants of a term, empty for leaves and unknown terms
    pub fn descendants_of(&self, iri: &str) -> impl Iterator<Item = &str> {
        self.descendants
            .get(iri)
            .into_iter()
            .flat_map(|set| set.iter().map(String::as_str))
    }

    /// Mappings whose target is a class of this ontology
    pub fn own_mappings(&self, mappings: &[Mapping]) -> Vec<Mapping> {
        mappings
            .iter()
            .filter(|m| self.is_class(&m.mapped_term_iri))
            .cloned()
            .collect()
    }

    /// Compute one count row per non-blocked class, sorted by IRI
    ///
    /// Mappings that target an IRI outside the class set contribute to no
    /// count; they are logged and reported in the summary.
    pub fn count(&self, mappings: &[Mapping]) -> (Vec<MappingCount>, CountSummary) {
        let mut summary = CountSummary::default();
        let mut unmatched: BTreeSet<&str> = BTreeSet::new();

        let mut direct: HashMap<&str, HashSet<&str>> = HashMap::new();
        for mapping in mappings {
            let iri = mapping.mapped_term_iri.as_str();
            if !self.is_class(iri) {
                summary.unmatched_mappings += 1;
                if unmatched.insert(iri) {
                    let event = OntologyError::unmatched_target(iri);
                    warn!(
                        source_id = %mapping.source_term_id,
                        category = event.category().description(),
                        "{event}"
                    );
                }
                continue;
            }
            summary.matched_mappings += 1;
            direct
                .entry(iri)
                .or_default()
                .insert(mapping.source_term_id.as_str());
        }

        let mut counts = Vec::with_capacity(self.classes.len());
        for iri in &self.classes {
            if self.is_blocked(iri) {
                summary.blocked_terms += 1;
                continue;
            }

            let own = direct.get(iri.as_str());
            let mut inherited: HashSet<&str> = HashSet::new();
            for descendant in self.descendants_of(iri) {
                if let Some(ids) = direct.get(descendant) {
                    inherited.extend(ids.iter().copied());
                }
            }
            if let Some(own) = own {
                inherited.retain(|id| !own.contains(id));
            }

            let row = MappingCount {
                iri: iri.clone(),
                direct: own.map_or(0, HashSet::len),
                inherited: inherited.len(),
            };
            if row.direct > 0 {
                summary.terms_with_direct += 1;
            }
            if row.inherited > 0 {
                summary.terms_with_inherited += 1;
            }
            counts.push(row);
        }

        summary.terms = counts.len();
        summary.unmatched_targets = unmatched.into_iter().map(str::to_string).collect();

        info!(
            terms = summary.terms,
            blocked = summary.blocked_terms,
            matched = summary.matched_mappings,
            unmatched = summary.unmatched_mappings,
            "Computed mapping counts"
        );
        (counts, summary)
    }
}
