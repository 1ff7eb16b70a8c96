//! OpenGWAS metadata feed against a mock server

mod common;

use ontosearch::config::OpenGwasConfig;
use ontosearch::pipeline::{load_metadata, BuildContext};
use ontosearch::sources::OpenGwasClient;
use ontosearch::table::{read_table, Value};
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn gwasinfo() -> serde_json::Value {
    json!({
        "ieu-a-2": {"id": "ieu-a-2", "trait": "Body mass index", "pmid": 25673413.0},
        "ieu-a-7": {"id": "ieu-a-7", "trait": "Coronary heart disease", "pmid": 21378990},
        "eqtl-a-ENSG00000000003": {"id": "eqtl-a-ENSG00000000003", "trait": "ENSG00000000003"}
    })
}

#[tokio::test]
async fn test_fetch_sends_bearer_token() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gwasinfo"))
        .and(header("Authorization", "Bearer secret-jwt"))
        .respond_with(ResponseTemplate::new(200).set_body_json(gwasinfo()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = OpenGwasClient::new(&OpenGwasConfig {
        base_url: mock_server.uri(),
        token: Some("secret-jwt".into()),
        timeout_secs: 5,
    })
    .unwrap();

    let table = client.fetch_gwasinfo().await.unwrap();
    assert_eq!(table.len(), 3);
    assert_eq!(table.columns()[0], "id");
}

#[tokio::test]
async fn test_fetch_error_status() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gwasinfo"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&mock_server)
        .await;

    let client = OpenGwasClient::new(&OpenGwasConfig {
        base_url: mock_server.uri(),
        token: None,
        timeout_secs: 5,
    })
    .unwrap();
    assert!(client.fetch_gwasinfo().await.is_err());
}

#[tokio::test]
async fn test_metadata_loaded_from_opengwas() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gwasinfo"))
        .respond_with(ResponseTemplate::new(200).set_body_json(gwasinfo()))
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let mut config = common::test_config(dir.path());
    config.metadata.path = None;
    config.metadata.opengwas.base_url = mock_server.uri();

    let ctx = BuildContext::new(config).unwrap();
    let metadata = load_metadata(&ctx).await.unwrap();

    // eQTL datasets are left out, publication ids lose their float suffix
    assert_eq!(metadata.len(), 2);
    let pmids: Vec<Value> = metadata.column_values("pmid").unwrap().cloned().collect();
    assert!(pmids.contains(&Value::Integer(25673413)));
    assert!(pmids.contains(&Value::Integer(21378990)));

    let saved = read_table(&dir.path().join("resources").join("ieu_metadata.tsv")).unwrap();
    assert_eq!(saved.len(), 2);
}
