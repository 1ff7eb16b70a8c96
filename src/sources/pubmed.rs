//! PubMed reference lookups
//!
//! Publication details come from NCBI E-utilities `efetch` in XML mode.
//! Lookups run one after another behind a rate limiter; a transient failure
//! is retried once, and an id that still fails is skipped with a warning.
//! Results are cached in a TSV file so later builds only fetch identifiers
//! they have not seen.

use std::collections::HashSet;
use std::num::NonZeroU32;
use std::path::Path;
use std::time::Duration;

use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use quick_xml::events::Event;
use quick_xml::Reader;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::PubMedConfig;
use crate::error::{Error, ErrorClass, Result};
use crate::models::Reference;
use crate::table::{read_table, write_table, Table};
use crate::utils::error::FetchError;
use crate::utils::retry::{with_retry, RetryConfig};
use crate::utils::{normalize_whitespace, strip_float_suffix};

pub const PUBMED_URL: &str = "https://ncbi.nlm.nih.gov/pubmed";

/// Normalize a raw publication id, rejecting placeholders
///
/// Ids lose a trailing `.0`; empty values, `0` and `nan` are not ids.
pub fn normalize_pmid(raw: &str) -> Option<String> {
    let pmid = strip_float_suffix(raw.trim());
    if pmid.is_empty() || pmid == "0" || pmid.eq_ignore_ascii_case("nan") {
        return None;
    }
    Some(pmid.to_string())
}

/// Distinct valid ids of `column`, in first-seen order
pub fn unique_pmids(table: &Table, column: &str) -> Option<Vec<String>> {
    let mut seen = HashSet::new();
    Some(
        table
            .column_values(column)?
            .filter_map(|v| normalize_pmid(&v.as_text()?))
            .filter(|pmid| seen.insert(pmid.clone()))
            .collect(),
    )
}

// ============================================================================
// efetch XML
// ============================================================================

/// Extract the first article of an efetch response
///
/// Returns `None` when the response holds no `PubmedArticle`.
pub fn parse_efetch_xml(xml: &str, pmid: &str) -> std::result::Result<Option<Reference>, FetchError> {
    let mut reader = Reader::from_str(xml);
    let mut stack: Vec<String> = Vec::new();
    let mut fields = ArticleFields::default();
    let mut found = false;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| FetchError::Decode(format!("efetch XML for {pmid}: {e}")))?;
        match event {
            Event::Start(e) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                match name.as_str() {
                    "PubmedArticle" if found => break,
                    "PubmedArticle" => found = true,
                    "AbstractText" => fields.abstract_parts.push(String::new()),
                    _ => {}
                }
                stack.push(name);
            }
            Event::End(_) => {
                stack.pop();
            }
            Event::Text(t) => {
                let text = match t.unescape() {
                    Ok(text) => text.into_owned(),
                    Err(_) => String::from_utf8_lossy(&t).into_owned(),
                };
                fields.append(&stack, &text);
            }
            Event::CData(c) => {
                fields.append(&stack, &String::from_utf8_lossy(&c.into_inner()));
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(found.then(|| fields.into_reference(pmid)))
}

/// Text collected from one `PubmedArticle`
#[derive(Debug, Default)]
struct ArticleFields {
    title: String,
    journal: String,
    abstract_parts: Vec<String>,
    year: String,
    medline_date: String,
}

impl ArticleFields {
    /// Route a text node to the field its element path belongs to
    fn append(&mut self, stack: &[String], text: &str) {
        let within = |name: &str| stack.iter().any(|s| s == name);
        let current = stack.last().map(String::as_str);

        if within("ArticleTitle") {
            self.title.push_str(text);
        } else if within("AbstractText") {
            if let Some(part) = self.abstract_parts.last_mut() {
                part.push_str(text);
            }
        } else if current == Some("Title") && within("Journal") {
            self.journal.push_str(text);
        } else if within("PubDate") && within("Journal") {
            match current {
                Some("Year") => self.year.push_str(text),
                Some("MedlineDate") => self.medline_date.push_str(text),
                _ => {}
            }
        }
    }

    fn into_reference(self, pmid: &str) -> Reference {
        // MedlineDate reads like "1998 Dec-1999 Jan"
        let year = if self.year.trim().is_empty() {
            self.medline_date.trim().chars().take(4).collect()
        } else {
            self.year.trim().to_string()
        };
        let abstract_text = self
            .abstract_parts
            .iter()
            .map(|p| normalize_whitespace(p))
            .filter(|p| !p.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        Reference {
            pmid: pmid.to_string(),
            journal: normalize_whitespace(&self.journal),
            title: normalize_whitespace(&self.title),
            abstract_text,
            year,
            url: format!("{PUBMED_URL}/{pmid}"),
        }
    }
}

// ============================================================================
// Client
// ============================================================================

/// Outcome of a reference lookup run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceReport {
    /// Distinct ids found in the metadata
    pub requested: usize,
    /// Ids already present in the cache
    pub cached: usize,
    /// Ids fetched in this run
    pub fetched: usize,
    /// Ids given up on
    pub skipped: Vec<String>,
}

/// PubMed E-utilities client
pub struct PubMedClient {
    client: Client,
    rate_limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
    base_url: String,
    api_key: Option<String>,
    retry: RetryConfig,
}

impl PubMedClient {
    pub fn new(config: &PubMedConfig) -> std::result::Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(super::user_agent())
            .gzip(true)
            .build()?;

        let rate = NonZeroU32::new(config.requests_per_second).unwrap_or(NonZeroU32::MIN);

        Ok(Self {
            client,
            rate_limiter: RateLimiter::direct(Quota::per_second(rate)),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            retry: RetryConfig::with_delays(
                config.max_retries,
                config.retry_delay_ms,
                config.retry_delay_ms,
            ),
        })
    }

    /// Fetch one article
    pub async fn fetch_reference(&self, pmid: &str) -> std::result::Result<Option<Reference>, FetchError> {
        self.rate_limiter.until_ready().await;

        let url = format!("{}/efetch.fcgi", self.base_url);
        let mut request = self
            .client
            .get(&url)
            .query(&[("db", "pubmed"), ("id", pmid), ("retmode", "xml")]);
        if let Some(key) = &self.api_key {
            request = request.query(&[("api_key", key.as_str())]);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout
            } else {
                FetchError::Http(e)
            }
        })?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::from_status(status));
        }

        let body = response.text().await?;
        parse_efetch_xml(&body, pmid)
    }

    /// Fetch each id in turn, retrying transient failures per the retry
    /// config
    ///
    /// Ids that still fail, fail permanently, or have no article are skipped.
    pub async fn fetch_references(&self, pmids: &[String]) -> (Vec<Reference>, Vec<String>) {
        let mut references = Vec::with_capacity(pmids.len());
        let mut skipped = Vec::new();

        for (i, pmid) in pmids.iter().enumerate() {
            let result = with_retry(
                &self.retry,
                || self.fetch_reference(pmid),
                FetchError::is_recoverable,
            )
            .await;
            match result {
                Ok(Some(reference)) => references.push(reference),
                Ok(None) => {
                    warn!(pmid = %pmid, "No PubMed article found, skipping");
                    skipped.push(pmid.clone());
                }
                Err(e) => {
                    warn!(
                        pmid = %pmid,
                        category = e.category().description(),
                        error = %e,
                        "PubMed lookup failed, skipping"
                    );
                    skipped.push(pmid.clone());
                }
            }
            if (i + 1) % 100 == 0 {
                debug!(done = i + 1, total = pmids.len(), "PubMed lookup progress");
            }
        }

        (references, skipped)
    }
}

/// Build the references table for `metadata`, reusing the cache file
///
/// Only ids missing from the cache are fetched; the merged table is written
/// back to `cache_path`.
pub async fn load_or_fetch_references(
    client: &PubMedClient,
    metadata: &Table,
    pmid_column: &str,
    cache_path: &Path,
) -> Result<(Table, ReferenceReport)> {
    let pmids = unique_pmids(metadata, pmid_column).ok_or_else(|| {
        Error::config(format!("metadata has no publication id column '{pmid_column}'"))
    })?;

    let mut table = if cache_path.is_file() {
        read_table(cache_path)?
    } else {
        Table::new(Reference::columns(pmid_column))
    };

    let known: HashSet<String> = table
        .rows()
        .iter()
        .filter_map(|row| row.first()?.as_text())
        .filter_map(|raw| normalize_pmid(&raw))
        .collect();
    let missing: Vec<String> = pmids.iter().filter(|p| !known.contains(*p)).cloned().collect();

    let mut report = ReferenceReport {
        requested: pmids.len(),
        cached: pmids.len() - missing.len(),
        ..Default::default()
    };

    if !missing.is_empty() {
        info!(missing = missing.len(), cached = report.cached, "Fetching publication metadata from PubMed");
        let (references, skipped) = client.fetch_references(&missing).await;
        report.fetched = references.len();
        report.skipped = skipped;
        for reference in &references {
            table.push_row(reference.to_row());
        }
        // type the merged table the way a later build reads it back
        table.parse_numeric_columns();
        write_table(&table, cache_path)?;
    } else if !cache_path.is_file() {
        write_table(&table, cache_path)?;
    }

    info!(
        requested = report.requested,
        cached = report.cached,
        fetched = report.fetched,
        skipped = report.skipped.len(),
        "Publication references ready"
    );
    Ok((table, report))
}
