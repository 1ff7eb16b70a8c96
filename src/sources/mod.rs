//! Upstream data sources
//!
//! # Submodules
//!
//! - [`download`] - Resolve an ontology location to a local SemSQL file
//! - [`opengwas`] - OpenGWAS `gwasinfo` metadata feed
//! - [`pubmed`] - PubMed E-utilities reference lookups with a TSV cache

pub mod download;
pub mod opengwas;
pub mod pubmed;

use std::time::Duration;

use reqwest::Client;

use crate::utils::error::FetchError;

pub use download::ensure_local_ontology;
pub use opengwas::{prepare_opengwas_metadata, OpenGwasClient};
pub use pubmed::{load_or_fetch_references, PubMedClient, ReferenceReport};

/// User agent sent with every upstream request
pub fn user_agent() -> String {
    format!("ontosearch/{}", env!("CARGO_PKG_VERSION"))
}

/// Shared HTTP client for downloads
pub fn http_client(timeout: Duration) -> Result<Client, FetchError> {
    Ok(Client::builder()
        .timeout(timeout)
        .user_agent(user_agent())
        .gzip(true)
        .build()?)
}
