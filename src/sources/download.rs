//! Ontology database download
//!
//! A location is either a local SemSQL file, opened in place, or an
//! http(s) URL downloaded once into the resources directory as
//! `<name>.db` and reused by later builds.

use std::path::{Path, PathBuf};

use reqwest::Client;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};
use url::Url;

use crate::ontology::OntologyError;
use crate::utils::error::FetchError;

/// Local path of a downloaded ontology database
pub fn cached_ontology_path(resources_dir: &Path, name: &str) -> PathBuf {
    resources_dir.join(format!("{}.db", name.to_lowercase()))
}

/// Resolve `location` to a local file, downloading it when needed
///
/// Any failure is fatal to the build: no partial ontology is accepted.
pub async fn ensure_local_ontology(
    client: &Client,
    location: &str,
    name: &str,
    resources_dir: &Path,
) -> Result<PathBuf, OntologyError> {
    let local = Path::new(location);
    if local.is_file() {
        debug!(path = %local.display(), "Using local ontology database");
        return Ok(local.to_path_buf());
    }

    let url = match Url::parse(location) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => url,
        Ok(url) if url.scheme() == "file" => {
            return url
                .to_file_path()
                .ok()
                .filter(|p| p.is_file())
                .ok_or_else(|| OntologyError::unavailable(location, "file does not exist"));
        }
        _ => return Err(OntologyError::unavailable(location, "not a file or http(s) URL")),
    };

    let target = cached_ontology_path(resources_dir, name);
    if target.is_file() {
        info!(path = %target.display(), "Reusing downloaded ontology database");
        return Ok(target);
    }

    info!(url = %url, ontology = name, "Downloading ontology database");
    fs::create_dir_all(resources_dir)
        .await
        .map_err(|e| OntologyError::io_error("create resources dir", Some(resources_dir.to_path_buf()), e))?;

    // partial downloads never land under the final name
    let partial = target.with_extension("db.part");
    let bytes = match download_to(client, &url, location, &partial).await {
        Ok(bytes) => bytes,
        Err(e) => {
            if let Err(cleanup) = fs::remove_file(&partial).await {
                debug!(path = %partial.display(), error = %cleanup, "No partial download to remove");
            }
            return Err(e);
        }
    };
    fs::rename(&partial, &target)
        .await
        .map_err(|e| OntologyError::io_error("rename ontology", Some(target.clone()), e))?;

    info!(path = %target.display(), bytes, "Downloaded ontology database");
    Ok(target)
}

/// Stream the response body to `path` chunk by chunk; dumps run to
/// several GB
async fn download_to(client: &Client, url: &Url, location: &str, path: &Path) -> Result<u64, OntologyError> {
    let unavailable = |e: FetchError| OntologyError::unavailable(location, e.to_string());
    let write_failed = |e| OntologyError::io_error("write ontology", Some(path.to_path_buf()), e);

    let mut response = client
        .get(url.as_str())
        .send()
        .await
        .map_err(|e| unavailable(e.into()))?;
    let status = response.status();
    if !status.is_success() {
        return Err(unavailable(FetchError::from_status(status)));
    }

    let mut file = fs::File::create(path).await.map_err(write_failed)?;
    let mut written = 0u64;
    while let Some(chunk) = response.chunk().await.map_err(|e| unavailable(e.into()))? {
        file.write_all(&chunk).await.map_err(write_failed)?;
        written += chunk.len() as u64;
    }
    file.flush().await.map_err(write_failed)?;
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_local_file_used_in_place() {
        let dir = TempDir::new().unwrap();
        let db = dir.path().join("mini.db");
        std::fs::write(&db, b"sqlite").unwrap();

        let client = Client::new();
        let resolved = ensure_local_ontology(&client, db.to_str().unwrap(), "mini", dir.path())
            .await
            .unwrap();
        assert_eq!(resolved, db);
    }

    #[tokio::test]
    async fn test_download_once_then_reuse() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/efo.db"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"sqlite bytes".to_vec()))
            .expect(1)
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let client = Client::new();
        let url = format!("{}/efo.db", server.uri());

        let first = ensure_local_ontology(&client, &url, "EFO", dir.path()).await.unwrap();
        let second = ensure_local_ontology(&client, &url, "EFO", dir.path()).await.unwrap();

        assert_eq!(first, dir.path().join("efo.db"));
        assert_eq!(first, second);
        assert_eq!(std::fs::read(&first).unwrap(), b"sqlite bytes");
    }

    #[tokio::test]
    async fn test_large_download_written_in_full() {
        let body: Vec<u8> = (0..3 * 1024 * 1024).map(|i| (i % 251) as u8).collect();
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/hp.db"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(body.clone()))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let url = format!("{}/hp.db", server.uri());
        let resolved = ensure_local_ontology(&Client::new(), &url, "hp", dir.path())
            .await
            .unwrap();

        assert_eq!(std::fs::read(&resolved).unwrap(), body);
        assert!(!dir.path().join("hp.db.part").exists());
    }

    #[tokio::test]
    async fn test_unreachable_ontology_is_fatal() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let url = format!("{}/missing.db", server.uri());
        let err = ensure_local_ontology(&Client::new(), &url, "missing", dir.path())
            .await
            .unwrap_err();

        assert!(matches!(err, OntologyError::Unavailable { .. }));
        assert!(!dir.path().join("missing.db").exists());
        assert!(!dir.path().join("missing.db.part").exists());
    }

    #[tokio::test]
    async fn test_bad_location_rejected() {
        let dir = TempDir::new().unwrap();
        let err = ensure_local_ontology(&Client::new(), "not/a/file.db", "x", dir.path())
            .await
            .unwrap_err();
        assert!(matches!(err, OntologyError::Unavailable { .. }));
    }
}
