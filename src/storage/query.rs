//! Hierarchy-aware lookups of source records by ontology term

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{quote_identifier, Database};
use crate::error::Result;
use crate::models::mapping_columns as cols;
use crate::table::{Table, Value};
use crate::utils::sanitize_identifier;

/// A lookup of the records annotated with one term
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermQuery {
    /// CURIE of the term, e.g. `EFO:0000400`
    pub term: String,
    /// Also return records mapped to subclasses of the term
    pub include_descendants: bool,
    /// Follow asserted edges only instead of the entailed closure
    pub direct_only: bool,
}

impl TermQuery {
    pub fn new(term: impl Into<String>) -> Self {
        Self {
            term: term.into(),
            include_descendants: false,
            direct_only: false,
        }
    }

    pub fn include_descendants(mut self, include: bool) -> Self {
        self.include_descendants = include;
        self
    }

    pub fn direct_only(mut self, direct_only: bool) -> Self {
        self.direct_only = direct_only;
        self
    }
}

/// Table names a query runs against
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryTables {
    pub mappings: String,
    pub edges: String,
    pub entailed_edges: String,
}

impl QueryTables {
    /// Tables written by a build of `dataset` against `ontology`
    pub fn for_dataset(dataset: &str, ontology: &str) -> Self {
        let dataset = sanitize_identifier(dataset);
        let ontology = sanitize_identifier(&ontology.to_lowercase());
        Self {
            mappings: format!("{dataset}_mappings"),
            edges: format!("{ontology}_edges"),
            entailed_edges: format!("{ontology}_entailed_edges"),
        }
    }
}

/// One source record returned by a term lookup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotatedRecord {
    pub source_term_id: String,
    pub source_term: String,
    pub mapped_term_label: String,
    pub mapped_term_curie: String,
    pub mapping_score: Option<f64>,
}

impl AnnotatedRecord {
    pub fn to_table(records: &[AnnotatedRecord]) -> Table {
        let mut table = Table::new([
            cols::SOURCE_TERM_ID,
            cols::SOURCE_TERM,
            cols::MAPPED_TERM_LABEL,
            cols::MAPPED_TERM_CURIE,
            cols::MAPPING_SCORE,
        ]);
        for r in records {
            table.push_row(vec![
                r.source_term_id.clone().into(),
                r.source_term.clone().into(),
                r.mapped_term_label.clone().into(),
                r.mapped_term_curie.clone().into(),
                r.mapping_score.into(),
            ]);
        }
        table
    }
}

fn query_sql(query: &TermQuery, tables: &QueryTables) -> String {
    let edges = if query.direct_only {
        &tables.edges
    } else {
        &tables.entailed_edges
    };
    let mut sql = format!(
        "SELECT DISTINCT m.{id}, m.{text}, m.{label}, m.{curie}, m.{score} \
         FROM {mappings} m LEFT JOIN {edges} ee ON m.{curie} = ee.subject \
         WHERE m.{curie} = ?1",
        id = cols::SOURCE_TERM_ID,
        text = cols::SOURCE_TERM,
        label = cols::MAPPED_TERM_LABEL,
        curie = cols::MAPPED_TERM_CURIE,
        score = cols::MAPPING_SCORE,
        mappings = quote_identifier(&tables.mappings),
        edges = quote_identifier(edges),
    );
    if query.include_descendants {
        sql.push_str(" OR ee.object = ?1");
    }
    sql.push_str(&format!(" ORDER BY m.{}", cols::SOURCE_TERM_ID));
    sql
}

impl Database {
    /// Records mapped to the queried term (and optionally its subclasses),
    /// deduplicated by source id and sorted by it
    pub fn records_annotated_with(
        &self,
        query: &TermQuery,
        tables: &QueryTables,
    ) -> Result<Vec<AnnotatedRecord>> {
        let sql = query_sql(query, tables);
        debug!(term = %query.term, sql = %sql, "Running term query");

        let mut stmt = self.connection().prepare(&sql)?;
        let rows = stmt.query_map([query.term.as_str()], |row| {
            let text = |i: usize| -> rusqlite::Result<String> {
                Ok(Value::from(row.get_ref(i)?).as_text().unwrap_or_default())
            };
            Ok(AnnotatedRecord {
                source_term_id: text(0)?,
                source_term: text(1)?,
                mapped_term_label: text(2)?,
                mapped_term_curie: text(3)?,
                mapping_score: Value::from(row.get_ref(4)?).as_f64(),
            })
        })?;

        let mut seen = HashSet::new();
        let mut records = Vec::new();
        for record in rows {
            let record = record?;
            if seen.insert(record.source_term_id.clone()) {
                records.push(record);
            }
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_tables_for_dataset() {
        let tables = QueryTables::for_dataset("ieu", "EFO");
        assert_eq!(tables.mappings, "ieu_mappings");
        assert_eq!(tables.edges, "efo_edges");
        assert_eq!(tables.entailed_edges, "efo_entailed_edges");
    }

    #[test]
    fn test_sql_switches_edge_table() {
        let tables = QueryTables::for_dataset("ieu", "efo");
        let exact = query_sql(&TermQuery::new("EFO:1"), &tables);
        assert!(!exact.contains("ee.object"));
        assert!(exact.contains("\"efo_entailed_edges\""));

        let direct = query_sql(
            &TermQuery::new("EFO:1").include_descendants(true).direct_only(true),
            &tables,
        );
        assert!(direct.contains("\"efo_edges\""));
        assert!(direct.contains("OR ee.object = ?1"));
        assert!(direct.ends_with("ORDER BY m.SourceTermID"));
    }

    #[test]
    fn test_term_is_bound_not_interpolated() {
        let tables = QueryTables::for_dataset("ieu", "efo");
        let sql = query_sql(&TermQuery::new("x' OR '1'='1"), &tables);
        assert!(!sql.contains("OR '1'='1"));
    }
}
