//! End-to-end build tests over the fixture ontology and metadata

mod common;

use std::collections::BTreeMap;

use ontosearch::config::{AdditionalTable, OntologySource};
use ontosearch::error::{classify, ErrorCategory};
use ontosearch::pipeline::{build_database, clean_resources, write_report, BuildContext, BuildReport};
use ontosearch::storage::{Database, QueryTables, TermQuery};
use ontosearch::table::Value;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn run(config: ontosearch::config::Config) -> BuildReport {
    let ctx = BuildContext::new(config).unwrap();
    build_database(&ctx).await.unwrap()
}

/// `IRI → (Direct, Inherited)` of the labels table
fn label_counts(db: &Database, table: &str) -> BTreeMap<String, (i64, i64)> {
    let labels = db.read_table(table).unwrap();
    (0..labels.len())
        .map(|row| {
            let int = |column: &str| match labels.get(row, column) {
                Some(Value::Integer(i)) => *i,
                other => panic!("unexpected {column} value {other:?}"),
            };
            let iri = labels.get(row, "IRI").and_then(Value::as_text).unwrap();
            (iri, (int("Direct"), int("Inherited")))
        })
        .collect()
}

#[tokio::test]
async fn test_build_creates_all_tables() {
    let dir = TempDir::new().unwrap();
    let config = common::test_config(dir.path());
    let db_path = config.database_path();

    let report = run(config).await;

    let expected = [
        ("ieu_metadata", 5),
        ("mini_edges", 2),
        ("mini_entailed_edges", 8),
        ("mini_dbxrefs", 1),
        ("mini_synonyms", 1),
        ("mini_version", 1),
        ("ieu_mappings", 4),
        ("mini_labels", 4),
    ];
    let db = Database::open(&db_path).unwrap();
    for (table, rows) in expected {
        assert_eq!(db.row_count(table).unwrap(), rows, "{table}");
        assert_eq!(report.tables[table], rows, "{table}");
    }
    assert!(!db.has_table("ieu_references").unwrap(), "lookups are disabled");

    assert_eq!(report.mappings, 4);
    assert_eq!(report.unmatched_mappings(), 0);
    assert_eq!(report.ontologies[0].version, "2024-01-01");
    assert_eq!(report.ontologies[0].counts.blocked_terms, 1);
    assert!(report.references.is_none());

    let version = db.read_table("mini_version").unwrap();
    assert_eq!(version.get(0, "version"), Some(&Value::Text("2024-01-01".into())));

    let counts = label_counts(&db, "mini_labels");
    assert_eq!(counts[&common::iri("1")], (0, 2));
    assert_eq!(counts[&common::iri("2")], (1, 1));
    assert_eq!(counts[&common::iri("3")], (1, 0));
    assert_eq!(counts[&common::iri("4")], (2, 0));

    // derived tables are kept next to the database
    let resources = dir.path().join("resources");
    assert!(resources.join("mini_edges.tsv").is_file());
    assert!(resources.join("mini_mappings_counts.tsv").is_file());
    assert!(resources.join("ieu_mappings.tsv").is_file());
}

#[tokio::test]
async fn test_build_mappings_by_label_and_synonym() {
    let dir = TempDir::new().unwrap();
    let config = common::test_config(dir.path());
    let db_path = config.database_path();
    run(config).await;

    let db = Database::open(&db_path).unwrap();
    let mappings = db
        .query(
            "SELECT SourceTermID, MappedTermCURIE, MappingScore FROM ieu_mappings ORDER BY SourceTermID",
            &[],
        )
        .unwrap();
    let rows: Vec<(String, String, f64)> = mappings
        .rows()
        .iter()
        .map(|r| (r[0].as_text().unwrap(), r[1].as_text().unwrap(), r[2].as_f64().unwrap()))
        .collect();

    assert_eq!(
        rows,
        vec![
            ("ieu-a-1".into(), "T:3".into(), 1.0),
            ("ieu-a-2".into(), "T:2".into(), 1.0),
            ("ieu-a-3".into(), "T:4".into(), 1.0),
            ("ieu-a-4".into(), "T:4".into(), 0.9),
        ]
    );

    // the built database answers term queries
    let query = TermQuery::new("T:1").include_descendants(true);
    let records = db
        .records_annotated_with(&query, &QueryTables::for_dataset("ieu", "mini"))
        .unwrap();
    let ids: Vec<&str> = records.iter().map(|r| r.source_term_id.as_str()).collect();
    assert_eq!(ids, vec!["ieu-a-1", "ieu-a-2"]);
}

#[tokio::test]
async fn test_rebuild_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let config = common::test_config(dir.path());
    let db_path = config.database_path();

    let first = run(config.clone()).await;
    let first_counts = label_counts(&Database::open(&db_path).unwrap(), "mini_labels");

    let second = run(config).await;
    let second_counts = label_counts(&Database::open(&db_path).unwrap(), "mini_labels");

    assert_eq!(first.tables, second.tables);
    assert_eq!(first.ontologies, second.ontologies);
    assert_eq!(first_counts, second_counts);
}

#[tokio::test]
async fn test_build_with_references() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/efetch.fcgi"))
        .and(query_param("id", "111"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "<PubmedArticleSet><PubmedArticle><Article>\
             <Journal><JournalIssue><PubDate><Year>2020</Year></PubDate></JournalIssue>\
             <Title>PLoS Genetics</Title></Journal>\
             <ArticleTitle>Lung cancer susceptibility</ArticleTitle>\
             </Article></PubmedArticle></PubmedArticleSet>",
        ))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/efetch.fcgi"))
        .and(query_param("id", "222"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let mut config = common::test_config(dir.path());
    config.pubmed.enabled = true;
    config.pubmed.base_url = mock_server.uri();
    config.pubmed.requests_per_second = 100;
    config.pubmed.retry_delay_ms = 10;
    config.pubmed.timeout_secs = 5;
    let db_path = config.database_path();

    let report = run(config).await;

    let references = report.references.unwrap();
    assert_eq!(references.requested, 2);
    assert_eq!(references.fetched, 1);
    assert_eq!(references.skipped, vec!["222".to_string()]);

    let db = Database::open(&db_path).unwrap();
    let table = db.read_table("ieu_references").unwrap();
    assert_eq!(table.len(), 1);
    assert_eq!(table.columns(), ["pmid", "Journal", "Title", "Abstract", "Year", "URL"]);
    assert_eq!(
        table.get(0, "URL"),
        Some(&Value::Text("https://ncbi.nlm.nih.gov/pubmed/111".into()))
    );
    assert!(dir.path().join("resources").join("ieu_references.tsv").is_file());
}

#[tokio::test]
async fn test_precomputed_mappings_with_unknown_target() {
    let dir = TempDir::new().unwrap();
    let mappings = dir.path().join("ieu_mappings.csv");
    std::fs::write(
        &mappings,
        format!(
            "# Date and time run: 2024-01-01\n\
             Source Term ID,Source Term,Mapped Term Label,Mapped Term CURIE,Mapped Term IRI,Mapping Score\n\
             ieu-a-1,Lung cancer,lung cancer,T:3,{},0.95\n\
             ieu-a-5,Height,height,T:99,{},0.8\n\
             ieu-a-2,Cancer,cancer,T:2,{},0.3\n",
            common::iri("3"),
            common::iri("99"),
            common::iri("2"),
        ),
    )
    .unwrap();

    let mut config = common::test_config(dir.path());
    config.mapping.mappings_file = Some(mappings);
    let db_path = config.database_path();

    let report = run(config).await;

    // the low-scoring row is dropped, the unknown target is kept but not counted
    assert_eq!(report.mappings, 2);
    assert_eq!(report.unmatched_mappings(), 1);
    assert_eq!(report.ontologies[0].counts.unmatched_targets, vec![common::iri("99")]);

    let counts = label_counts(&Database::open(&db_path).unwrap(), "mini_labels");
    assert_eq!(counts[&common::iri("1")], (0, 1));
    assert_eq!(counts[&common::iri("3")], (1, 0));
}

#[tokio::test]
async fn test_additional_ontology_does_not_report_primary_mappings() {
    let dir = TempDir::new().unwrap();
    let extra = common::create_extra_fixture(dir.path());
    let mut config = common::test_config(dir.path());
    config.ontology.additional = vec![OntologySource {
        name: "extra".into(),
        location: Some(extra.to_string_lossy().into_owned()),
    }];
    let db_path = config.database_path();

    let report = run(config).await;

    assert_eq!(report.mappings, 4);
    assert_eq!(report.ontologies.len(), 2);
    assert_eq!(report.ontologies[1].name, "extra");
    assert_eq!(report.ontologies[1].counts.matched_mappings, 0);
    assert_eq!(report.ontologies[1].counts.unmatched_mappings, 0);
    assert_eq!(report.unmatched_mappings(), 0);

    let db = Database::open(&db_path).unwrap();
    let counts = label_counts(&db, "extra_labels");
    assert_eq!(counts.len(), 2);
    assert!(counts.values().all(|c| *c == (0, 0)));
    assert_eq!(label_counts(&db, "mini_labels")[&common::iri("1")], (0, 2));
}

#[tokio::test]
async fn test_unreachable_ontology_is_fatal() {
    let dir = TempDir::new().unwrap();
    let mut config = common::test_config(dir.path());
    config.ontology.semsql_location = Some(dir.path().join("missing.db").to_string_lossy().into_owned());

    let ctx = BuildContext::new(config).unwrap();
    let err = build_database(&ctx).await.unwrap_err();
    assert!(format!("{err:#}").contains("mini"));
    assert_eq!(classify(&err), Some(ErrorCategory::Upstream));
}

#[tokio::test]
async fn test_missing_metadata_column_is_fatal() {
    let dir = TempDir::new().unwrap();
    let mut config = common::test_config(dir.path());
    config.metadata.source_column = "phenotype".into();

    let ctx = BuildContext::new(config).unwrap();
    assert!(build_database(&ctx).await.is_err());
}

#[tokio::test]
async fn test_additional_table_and_report() {
    let dir = TempDir::new().unwrap();
    let extra = dir.path().join("studies.tsv");
    std::fs::write(&extra, "study id\tpopulation\nieu-a-1\tEuropean\nieu-a-2\tEast Asian\n").unwrap();

    let mut config = common::test_config(dir.path());
    config.build.additional_tables.push(AdditionalTable {
        name: "ieu_studies".into(),
        path: extra,
    });
    let db_path = config.database_path();

    let report = run(config).await;
    assert_eq!(report.tables["ieu_studies"], 2);

    let db = Database::open(&db_path).unwrap();
    let studies = db.read_table("ieu_studies").unwrap();
    assert_eq!(studies.columns(), ["studyid", "population"]);

    let report_path = dir.path().join("report.json");
    write_report(&report, &report_path).unwrap();
    let parsed: BuildReport =
        serde_json::from_str(&std::fs::read_to_string(&report_path).unwrap()).unwrap();
    assert_eq!(parsed.tables, report.tables);
    assert_eq!(parsed.mappings, report.mappings);
}

#[tokio::test]
async fn test_clean_after_build() {
    let dir = TempDir::new().unwrap();
    let config = common::test_config(dir.path());
    let db_path = config.database_path();
    run(config.clone()).await;
    assert!(db_path.is_file());

    let removed = clean_resources(&config, true).unwrap();
    assert!(removed.contains(&db_path));
    assert!(!db_path.is_file());
    assert!(!dir.path().join("resources").join("mini_labels.tsv").exists());

    // the fixture ontology is a local file, never a download to remove
    assert!(dir.path().join("mini.db").is_file());
}
