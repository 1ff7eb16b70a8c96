//! Term query tests against an assembled database

mod common;

use ontosearch::models::Mapping;
use ontosearch::ontology::SemSqlReader;
use ontosearch::storage::{AnnotatedRecord, Database, QueryTables, TermQuery};
use tempfile::TempDir;

fn mapping(source_id: &str, text: &str, local: &str, label: &str) -> Mapping {
    Mapping {
        source_term_id: source_id.to_string(),
        source_term: text.to_string(),
        mapped_term_label: label.to_string(),
        mapped_term_curie: format!("T:{local}"),
        mapped_term_iri: common::iri(local),
        mapping_score: Some(1.0),
    }
}

/// Fixture ontology edges plus four mapped records
fn setup(dir: &TempDir) -> (Database, QueryTables) {
    let path = common::create_semsql_fixture(dir.path());
    let tables = SemSqlReader::open(&path, "mini").unwrap().read_all().unwrap();

    let mut db = Database::open(&dir.path().join("search.db")).unwrap();
    db.import_table("mini_edges", &tables.edges).unwrap();
    db.import_table("mini_entailed_edges", &tables.entailed_edges).unwrap();

    let mappings = vec![
        mapping("ieu-a-3", "Lung cancer", "3", "lung cancer"),
        mapping("ieu-a-1", "Disease", "1", "disease"),
        mapping("ieu-a-2", "Cancer", "2", "cancer"),
        mapping("ieu-a-4", "BMI", "4", "body mass index"),
    ];
    db.import_table("ieu_mappings", &Mapping::to_table(&mappings)).unwrap();

    (db, QueryTables::for_dataset("ieu", "mini"))
}

fn ids(records: &[AnnotatedRecord]) -> Vec<&str> {
    records.iter().map(|r| r.source_term_id.as_str()).collect()
}

#[test]
fn test_exact_term_only() {
    let dir = TempDir::new().unwrap();
    let (db, tables) = setup(&dir);

    let records = db
        .records_annotated_with(&TermQuery::new("T:1"), &tables)
        .unwrap();
    assert_eq!(ids(&records), vec!["ieu-a-1"]);
    assert_eq!(records[0].mapped_term_label, "disease");
    assert_eq!(records[0].mapping_score, Some(1.0));
}

/// Direct edges reach children only
#[test]
fn test_descendants_via_direct_edges() {
    let dir = TempDir::new().unwrap();
    let (db, tables) = setup(&dir);

    let query = TermQuery::new("T:1")
        .include_descendants(true)
        .direct_only(true);
    let records = db.records_annotated_with(&query, &tables).unwrap();
    assert_eq!(ids(&records), vec!["ieu-a-1", "ieu-a-2"]);
}

/// Entailed edges reach the whole subtree, each record once, sorted by id
#[test]
fn test_descendants_via_entailed_edges() {
    let dir = TempDir::new().unwrap();
    let (db, tables) = setup(&dir);

    let query = TermQuery::new("T:1").include_descendants(true);
    let records = db.records_annotated_with(&query, &tables).unwrap();
    assert_eq!(ids(&records), vec!["ieu-a-1", "ieu-a-2", "ieu-a-3"]);
}

#[test]
fn test_unknown_term_is_empty() {
    let dir = TempDir::new().unwrap();
    let (db, tables) = setup(&dir);

    let query = TermQuery::new("T:999").include_descendants(true);
    assert!(db.records_annotated_with(&query, &tables).unwrap().is_empty());
}

#[test]
fn test_results_as_table() {
    let dir = TempDir::new().unwrap();
    let (db, tables) = setup(&dir);

    let records = db
        .records_annotated_with(&TermQuery::new("T:4"), &tables)
        .unwrap();
    let table = AnnotatedRecord::to_table(&records);
    assert_eq!(
        table.columns(),
        ["SourceTermID", "SourceTerm", "MappedTermLabel", "MappedTermCURIE", "MappingScore"]
    );
    assert_eq!(table.len(), 1);
}
