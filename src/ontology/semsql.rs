//! Semantic-SQL ontology table extraction
//!
//! Reads the relational distribution of an OBO ontology built by the
//! semantic-sql project (pre-built files live at
//! <https://s3.amazonaws.com/bbop-sqlite/>) and extracts the tables the
//! search database needs.
//!
//! # Schema used
//!
//! - `statements`: RDF-like triples (`stanza`, `subject`, `predicate`,
//!   `object`, `value`, `datatype`, `language`)
//! - `edge`: asserted direct relationships
//! - `entailed_edge`: transitive closure of relationships (reflexive rows
//!   included)
//! - `prefix`: CURIE prefix → base IRI
//!
//! Blank nodes are identified by the `_:` prefix and never extracted.

use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use rusqlite::{Connection, OpenFlags, ToSql};
use tracing::{debug, info};

use super::error::{OntologyError, OntologyResult};
use crate::models::OntologyClass;
use crate::table::{Table, Value};

pub const SUBCLASS_OF: &str = "rdfs:subClassOf";
pub const LABEL: &str = "rdfs:label";
pub const VERSION_INFO: &str = "owl:versionInfo";
pub const DEPRECATED: &str = "owl:deprecated";
pub const HAS_DBXREF: &str = "oio:hasDbXref";
pub const SYNONYM_PREDICATES: [&str; 4] = [
    "oio:hasExactSynonym",
    "oio:hasRelatedSynonym",
    "oio:hasBroadSynonym",
    "oio:hasNarrowSynonym",
];

const BLANK_NODE_PREFIX: &str = "_:";
const OBO_BASE: &str = "http://purl.obolibrary.org/obo/";

/// Columns of `statements` rows that carry nothing once a table is
/// restricted to a single predicate
const STATEMENT_NOISE: [&str; 5] = ["stanza", "predicate", "object", "datatype", "language"];

pub fn is_blank_node(id: &str) -> bool {
    id.starts_with(BLANK_NODE_PREFIX)
}

/// CURIE prefix expansion table
#[derive(Debug, Clone, Default)]
pub struct PrefixMap {
    bases: HashMap<String, String>,
}

impl PrefixMap {
    pub fn new(pairs: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            bases: pairs.into_iter().collect(),
        }
    }

    /// Expand a CURIE to an IRI
    ///
    /// Identifiers that already are IRIs pass through (angle brackets
    /// stripped). Prefixes missing from the table follow the OBO PURL
    /// convention `PREFIX:LOCAL` → `http://purl.obolibrary.org/obo/PREFIX_LOCAL`.
    pub fn expand(&self, id: &str) -> String {
        let id = id.trim_start_matches('<').trim_end_matches('>');
        if id.contains("://") {
            return id.to_string();
        }
        match id.split_once(':') {
            Some((prefix, local)) => match self.bases.get(prefix) {
                Some(base) => format!("{base}{local}"),
                None => format!("{OBO_BASE}{prefix}_{local}"),
            },
            None => id.to_string(),
        }
    }
}

/// Everything extracted from one ontology dump
#[derive(Debug, Clone)]
pub struct OntologyTables {
    /// Lower-case ontology name, used as the table name prefix
    pub name: String,
    /// `owl:versionInfo`, empty when the dump carries none
    pub version: String,
    /// Asserted direct subclass edges: `subject`, `object`
    pub edges: Table,
    /// Entailed subclass edges: `subject`, `object`
    pub entailed_edges: Table,
    /// Class labels: `subject`, `object`, `IRI`
    pub labels: Table,
    /// Cross-references: `subject`, `object`
    pub dbxrefs: Table,
    /// Synonyms: `subject`, `predicate`, `object`, `IRI`
    pub synonyms: Table,
    /// Every non-blank `owl:Class`, sorted by CURIE
    pub classes: Vec<OntologyClass>,
    /// CURIEs of deprecated classes
    pub deprecated: BTreeSet<String>,
    pub prefixes: PrefixMap,
}

impl OntologyTables {
    /// Single-row version table for the assembled database
    pub fn version_table(&self) -> Table {
        let mut table = Table::new(["ontology", "version"]);
        table.push_row(vec![self.name.clone().into(), self.version.clone().into()]);
        table
    }

    /// `(subject, object)` pairs of the entailed-edge table
    pub fn entailed_pairs(&self) -> Vec<(String, String)> {
        edge_pairs(&self.entailed_edges)
    }

    /// `(subject, object)` pairs of the asserted edge table
    pub fn edge_pairs(&self) -> Vec<(String, String)> {
        edge_pairs(&self.edges)
    }
}

fn edge_pairs(table: &Table) -> Vec<(String, String)> {
    let (Some(s), Some(o)) = (table.column_index("subject"), table.column_index("object")) else {
        return Vec::new();
    };
    table
        .rows()
        .iter()
        .filter_map(|row| Some((row[s].as_text()?, row[o].as_text()?)))
        .collect()
}

/// Read-only handle on a semantic-sql database file
pub struct SemSqlReader {
    conn: Connection,
    name: String,
}

impl SemSqlReader {
    /// Open an existing semantic-sql database
    pub fn open(path: impl AsRef<Path>, name: &str) -> OntologyResult<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(OntologyError::unavailable(
                path.display().to_string(),
                "file does not exist",
            ));
        }

        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)
            .map_err(|e| OntologyError::unavailable(path.display().to_string(), e.to_string()))?;

        Ok(Self {
            conn,
            name: name.to_lowercase(),
        })
    }

    /// Wrap an already open connection (used by tests and in-memory dumps)
    pub fn from_connection(conn: Connection, name: &str) -> Self {
        Self {
            conn,
            name: name.to_lowercase(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn has_table(&self, table: &str) -> OntologyResult<bool> {
        self.conn
            .prepare("SELECT 1 FROM sqlite_master WHERE type IN ('table', 'view') AND name = ?1")
            .and_then(|mut stmt| stmt.exists([table]))
            .map_err(|e| OntologyError::query_failed(&self.name, e))
    }

    fn require_table(&self, table: &str) -> OntologyResult<()> {
        if self.has_table(table)? {
            Ok(())
        } else {
            Err(OntologyError::MissingTable {
                ontology: self.name.clone(),
                table: table.to_string(),
            })
        }
    }

    /// Run a query and collect every column of the result into a [`Table`]
    fn query_table(&self, sql: &str, params: &[&dyn ToSql]) -> OntologyResult<Table> {
        let mut stmt = self
            .conn
            .prepare(sql)
            .map_err(|e| OntologyError::query_failed(&self.name, e))?;
        let mut table = Table::new(stmt.column_names().into_iter().map(str::to_string));
        let width = table.columns().len();

        let mut rows = stmt
            .query(params)
            .map_err(|e| OntologyError::query_failed(&self.name, e))?;
        while let Some(row) = rows
            .next()
            .map_err(|e| OntologyError::query_failed(&self.name, e))?
        {
            let mut values = Vec::with_capacity(width);
            for i in 0..width {
                let value = row
                    .get_ref(i)
                    .map_err(|e| OntologyError::query_failed(&self.name, e))?;
                values.push(Value::from(value));
            }
            table.push_row(values);
        }

        Ok(table)
    }

    /// Asserted direct subclass edges; the predicate column is dropped
    pub fn edges(&self) -> OntologyResult<Table> {
        self.require_table("edge")?;
        let mut table = self.query_table("SELECT * FROM edge WHERE predicate = ?1", &[&SUBCLASS_OF])?;
        table.drop_columns(&["predicate"]);
        Ok(table)
    }

    /// Entailed subclass edges; the predicate column is dropped
    pub fn entailed_edges(&self) -> OntologyResult<Table> {
        self.require_table("entailed_edge")?;
        let mut table = self.query_table(
            "SELECT * FROM entailed_edge WHERE predicate = ?1",
            &[&SUBCLASS_OF],
        )?;
        table.drop_columns(&["predicate"]);
        Ok(table)
    }

    /// Labels of subjects typed `owl:Class`, with an `IRI` column
    pub fn labels(&self, prefixes: &PrefixMap) -> OntologyResult<Table> {
        self.require_table("statements")?;
        let mut table = self.query_table(
            "SELECT * FROM statements WHERE predicate = ?1 AND subject IN \
             (SELECT subject FROM statements WHERE predicate = 'rdf:type' AND object = 'owl:Class')",
            &[&LABEL],
        )?;
        Self::tidy_value_table(&mut table, &STATEMENT_NOISE);
        add_iri_column(&mut table, prefixes);
        Ok(table)
    }

    /// Database cross-references of non-blank subjects
    pub fn dbxrefs(&self) -> OntologyResult<Table> {
        self.require_table("statements")?;
        let mut table =
            self.query_table("SELECT * FROM statements WHERE predicate = ?1", &[&HAS_DBXREF])?;
        Self::tidy_value_table(&mut table, &STATEMENT_NOISE);
        Ok(table)
    }

    /// Synonyms of non-blank subjects; the predicate keeps the synonym scope
    pub fn synonyms(&self, prefixes: &PrefixMap) -> OntologyResult<Table> {
        self.require_table("statements")?;
        let mut table = self.query_table(
            "SELECT * FROM statements WHERE predicate IN (?1, ?2, ?3, ?4)",
            &[
                &SYNONYM_PREDICATES[0],
                &SYNONYM_PREDICATES[1],
                &SYNONYM_PREDICATES[2],
                &SYNONYM_PREDICATES[3],
            ],
        )?;
        Self::tidy_value_table(&mut table, &["stanza", "object", "datatype", "language"]);
        add_iri_column(&mut table, prefixes);
        Ok(table)
    }

    /// Drop noise columns, drop blank-node subjects, and rename the literal
    /// `value` column to `object` so every table reads subject → object
    fn tidy_value_table(table: &mut Table, noise: &[&str]) {
        table.drop_columns(noise);
        let before = table.len();
        if let Some(idx) = table.column_index("subject") {
            table.retain_rows(|_, row| {
                row[idx]
                    .as_text()
                    .is_some_and(|subject| !is_blank_node(&subject))
            });
        }
        table.rename_column("value", "object");
        if before != table.len() {
            debug!(removed = before - table.len(), "Filtered blank-node rows");
        }
    }

    /// Every non-blank subject typed `owl:Class`
    pub fn classes(&self, prefixes: &PrefixMap) -> OntologyResult<Vec<OntologyClass>> {
        self.require_table("statements")?;
        let subjects = self.query_table(
            "SELECT DISTINCT subject FROM statements \
             WHERE predicate = 'rdf:type' AND object = 'owl:Class' ORDER BY subject",
            &[],
        )?;
        Ok(subjects
            .rows()
            .iter()
            .filter_map(|row| row[0].as_text())
            .filter(|subject| !is_blank_node(subject))
            .map(|curie| {
                let iri = prefixes.expand(&curie);
                OntologyClass::new(curie, iri)
            })
            .collect())
    }

    /// Subjects flagged `owl:deprecated true`
    pub fn deprecated(&self) -> OntologyResult<BTreeSet<String>> {
        self.require_table("statements")?;
        let rows = self.query_table(
            "SELECT DISTINCT subject FROM statements \
             WHERE predicate = ?1 AND lower(value) = 'true'",
            &[&DEPRECATED],
        )?;
        Ok(rows.rows().iter().filter_map(|r| r[0].as_text()).collect())
    }

    /// `owl:versionInfo` value; an absent statement yields an empty string
    pub fn version(&self) -> OntologyResult<String> {
        self.require_table("statements")?;
        let rows = self.query_table(
            "SELECT value FROM statements WHERE predicate = ?1",
            &[&VERSION_INFO],
        )?;
        Ok(rows
            .rows()
            .last()
            .and_then(|r| r[0].as_text())
            .unwrap_or_default())
    }

    /// Prefix table; an empty map when the dump has none
    pub fn prefixes(&self) -> OntologyResult<PrefixMap> {
        if !self.has_table("prefix")? {
            return Ok(PrefixMap::default());
        }
        let rows = self.query_table("SELECT prefix, base FROM prefix", &[])?;
        Ok(PrefixMap::new(rows.rows().iter().filter_map(|r| {
            Some((r[0].as_text()?, r[1].as_text()?))
        })))
    }

    /// Extract all tables at once
    pub fn read_all(&self) -> OntologyResult<OntologyTables> {
        let prefixes = self.prefixes()?;
        let tables = OntologyTables {
            name: self.name.clone(),
            version: self.version()?,
            edges: self.edges()?,
            entailed_edges: self.entailed_edges()?,
            labels: self.labels(&prefixes)?,
            dbxrefs: self.dbxrefs()?,
            synonyms: self.synonyms(&prefixes)?,
            classes: self.classes(&prefixes)?,
            deprecated: self.deprecated()?,
            prefixes,
        };

        info!(
            ontology = %tables.name,
            version = %tables.version,
            classes = tables.classes.len(),
            edges = tables.edges.len(),
            entailed_edges = tables.entailed_edges.len(),
            labels = tables.labels.len(),
            dbxrefs = tables.dbxrefs.len(),
            synonyms = tables.synonyms.len(),
            "Extracted ontology tables"
        );
        Ok(tables)
    }
}

fn add_iri_column(table: &mut Table, prefixes: &PrefixMap) {
    let Some(idx) = table.column_index("subject") else {
        return;
    };
    table.add_column("IRI", |_, row| {
        row[idx]
            .as_text()
            .map(|subject| Value::Text(prefixes.expand(&subject)))
            .unwrap_or(Value::Null)
    });
}
