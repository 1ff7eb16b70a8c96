//! Common test utilities
//!
//! A miniature semantic-sql ontology:
//!
//! ```text
//! T:1 disease
//! └── T:2 cancer
//!     └── T:3 lung cancer
//! T:4 body mass index (synonym "BMI")
//! BFO:0000001 entity
//! ```
//!
//! plus an unrelated second ontology (`S:2 stature ⊑ S:1`).

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use ontosearch::config::Config;
use rusqlite::Connection;

pub const BASE: &str = "http://example.org/T_";

/// IRI of a fixture term by local id
pub fn iri(local: &str) -> String {
    format!("{BASE}{local}")
}

const SEMSQL_FIXTURE: &str = r#"
CREATE TABLE prefix (prefix TEXT PRIMARY KEY, base TEXT);
CREATE TABLE statements (stanza TEXT, subject TEXT, predicate TEXT, object TEXT,
                         value TEXT, datatype TEXT, language TEXT);
CREATE TABLE edge (subject TEXT, predicate TEXT, object TEXT);
CREATE TABLE entailed_edge (subject TEXT, predicate TEXT, object TEXT);

INSERT INTO prefix VALUES
    ('T', 'http://example.org/T_'),
    ('BFO', 'http://purl.obolibrary.org/obo/BFO_');

INSERT INTO statements VALUES
    ('T:1', 'T:1', 'rdf:type', 'owl:Class', NULL, NULL, NULL),
    ('T:2', 'T:2', 'rdf:type', 'owl:Class', NULL, NULL, NULL),
    ('T:3', 'T:3', 'rdf:type', 'owl:Class', NULL, NULL, NULL),
    ('T:4', 'T:4', 'rdf:type', 'owl:Class', NULL, NULL, NULL),
    ('BFO:0000001', 'BFO:0000001', 'rdf:type', 'owl:Class', NULL, NULL, NULL),
    ('_:riog0001', '_:riog0001', 'rdf:type', 'owl:Class', NULL, NULL, NULL),
    ('T:1', 'T:1', 'rdfs:label', NULL, 'disease', 'xsd:string', NULL),
    ('T:2', 'T:2', 'rdfs:label', NULL, 'cancer', 'xsd:string', NULL),
    ('T:3', 'T:3', 'rdfs:label', NULL, 'lung cancer', 'xsd:string', NULL),
    ('T:4', 'T:4', 'rdfs:label', NULL, 'body mass index', 'xsd:string', NULL),
    ('BFO:0000001', 'BFO:0000001', 'rdfs:label', NULL, 'entity', 'xsd:string', NULL),
    ('T:4', 'T:4', 'oio:hasExactSynonym', NULL, 'BMI', 'xsd:string', NULL),
    ('T:3', 'T:3', 'oio:hasDbXref', NULL, 'MONDO:0008903', 'xsd:string', NULL),
    ('_:riog0002', '_:riog0002', 'oio:hasDbXref', NULL, 'X:1', 'xsd:string', NULL),
    ('mini.owl', 'mini.owl', 'owl:versionInfo', NULL, '2024-01-01', 'xsd:string', NULL);

INSERT INTO edge VALUES
    ('T:2', 'rdfs:subClassOf', 'T:1'),
    ('T:3', 'rdfs:subClassOf', 'T:2'),
    ('T:3', 'BFO:0000050', 'T:4');

INSERT INTO entailed_edge VALUES
    ('T:2', 'rdfs:subClassOf', 'T:1'),
    ('T:3', 'rdfs:subClassOf', 'T:2'),
    ('T:3', 'rdfs:subClassOf', 'T:1'),
    ('T:1', 'rdfs:subClassOf', 'T:1'),
    ('T:2', 'rdfs:subClassOf', 'T:2'),
    ('T:3', 'rdfs:subClassOf', 'T:3'),
    ('T:4', 'rdfs:subClassOf', 'T:4'),
    ('BFO:0000001', 'rdfs:subClassOf', 'BFO:0000001');
"#;

/// Write the fixture ontology as `mini.db` under `dir`
pub fn create_semsql_fixture(dir: &Path) -> PathBuf {
    let path = dir.join("mini.db");
    let conn = Connection::open(&path).unwrap();
    conn.execute_batch(SEMSQL_FIXTURE).unwrap();
    path
}

const EXTRA_FIXTURE: &str = r#"
CREATE TABLE prefix (prefix TEXT PRIMARY KEY, base TEXT);
CREATE TABLE statements (stanza TEXT, subject TEXT, predicate TEXT, object TEXT,
                         value TEXT, datatype TEXT, language TEXT);
CREATE TABLE edge (subject TEXT, predicate TEXT, object TEXT);
CREATE TABLE entailed_edge (subject TEXT, predicate TEXT, object TEXT);

INSERT INTO prefix VALUES ('S', 'http://example.org/S_');

INSERT INTO statements VALUES
    ('S:1', 'S:1', 'rdf:type', 'owl:Class', NULL, NULL, NULL),
    ('S:2', 'S:2', 'rdf:type', 'owl:Class', NULL, NULL, NULL),
    ('S:1', 'S:1', 'rdfs:label', NULL, 'anthropometric trait', 'xsd:string', NULL),
    ('S:2', 'S:2', 'rdfs:label', NULL, 'stature', 'xsd:string', NULL);

INSERT INTO edge VALUES ('S:2', 'rdfs:subClassOf', 'S:1');
INSERT INTO entailed_edge VALUES ('S:2', 'rdfs:subClassOf', 'S:1');
"#;

/// Write a second, unrelated ontology as `extra.db` under `dir`
pub fn create_extra_fixture(dir: &Path) -> PathBuf {
    let path = dir.join("extra.db");
    let conn = Connection::open(&path).unwrap();
    conn.execute_batch(EXTRA_FIXTURE).unwrap();
    path
}

/// Metadata with one unmappable record and a mix of publication ids
pub fn create_metadata_fixture(dir: &Path) -> PathBuf {
    let path = dir.join("metadata.tsv");
    std::fs::write(
        &path,
        "id\ttrait\tpmid\tsample_size\n\
         ieu-a-1\tLung cancer\t111\t1000\n\
         ieu-a-2\tCancer\t222\t2000\n\
         ieu-a-3\tBody mass index\t111.0\t3000\n\
         ieu-a-4\tBMI\t0\t4000\n\
         ieu-a-5\tHeight\t\t5000\n",
    )
    .unwrap();
    path
}

/// Build configuration over the fixtures, with PubMed lookups off
pub fn test_config(dir: &Path) -> Config {
    let semsql = create_semsql_fixture(dir);
    let metadata = create_metadata_fixture(dir);

    let mut config = Config::default();
    config.build.dataset = "ieu".into();
    config.build.database_path = Some(dir.join("ieu_search.db"));
    config.build.resources_dir = dir.join("resources");
    config.metadata.path = Some(metadata);
    config.ontology.name = "mini".into();
    config.ontology.semsql_location = Some(semsql.to_string_lossy().into_owned());
    config.mapping.base_iris = vec!["http://example.org/".into()];
    config.pubmed.enabled = false;
    config
}
