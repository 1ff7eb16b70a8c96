//! Configuration management for ontosearch builds
//!
//! Values come from a TOML file, from `ONTOSEARCH_*` environment variables,
//! or from [`Config::default`]; command-line flags are applied on top by the
//! binary. Every section has defaults so a config file only needs the keys
//! it changes.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::ontology::counts::DEFAULT_TERM_BLOCKLIST;
use crate::ontology::mapper::{MapperSettings, DEFAULT_MIN_SCORE};
use crate::ontology::semsql_url;
use crate::utils::sanitize_identifier;

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Output locations
    pub build: BuildConfig,

    /// Metadata source and column roles
    pub metadata: MetadataConfig,

    /// Ontologies to extract and count against
    pub ontology: OntologyConfig,

    /// Term mapping thresholds
    pub mapping: MappingConfig,

    /// PubMed reference lookups
    pub pubmed: PubMedConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Build output configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Dataset name, prefix of the metadata, mappings and references tables
    pub dataset: String,

    /// Output database; `<dataset>_search.db` when unset
    pub database_path: Option<PathBuf>,

    /// Directory for downloaded ontologies, caches and derived tables
    pub resources_dir: PathBuf,

    /// Write every derived table as TSV next to the database
    pub save_tables: bool,

    /// Extra delimited files imported as-is
    pub additional_tables: Vec<AdditionalTable>,
}

/// A user-supplied table added to the database under `name`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdditionalTable {
    pub name: String,
    pub path: PathBuf,
}

/// Metadata source configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataConfig {
    /// Delimited metadata file; fetched from OpenGWAS when unset
    pub path: Option<PathBuf>,

    /// Column holding the free text to map
    pub source_column: String,

    /// Column holding the unique record id
    pub id_column: String,

    /// Column holding PubMed ids; no references table without it
    pub pmid_column: Option<String>,

    pub opengwas: OpenGwasConfig,
}

/// OpenGWAS API configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenGwasConfig {
    /// API base URL
    pub base_url: String,

    /// Bearer token; read from `OPENGWAS_JWT` when unset
    pub token: Option<String>,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

/// Ontology configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OntologyConfig {
    /// Primary ontology, the mapping target
    pub name: String,

    /// SemSQL database URL or local path of the primary ontology
    pub semsql_location: Option<String>,

    /// Further ontologies whose tables and counts are added
    pub additional: Vec<OntologySource>,

    /// IRI fragments of terms left out of the counts
    pub term_blocklist: Vec<String>,

    /// Import `<ontology>_dbxrefs`
    pub include_dbxrefs: bool,

    /// Import `<ontology>_synonyms`
    pub include_synonyms: bool,
}

/// An ontology name with an optional SemSQL location override
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OntologySource {
    pub name: String,
    #[serde(default)]
    pub location: Option<String>,
}

impl OntologySource {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            location: None,
        }
    }

    /// Lower-case identifier used for table and file names
    pub fn table_prefix(&self) -> String {
        sanitize_identifier(&self.name.to_lowercase())
    }

    /// Configured location, or the pre-built SemSQL download
    pub fn resolved_location(&self) -> String {
        self.location
            .clone()
            .unwrap_or_else(|| semsql_url(&self.name))
    }
}

/// Term mapping configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MappingConfig {
    /// Minimum confidence of an accepted mapping
    pub min_score: f64,

    /// Allowed target IRI prefixes; empty allows all
    pub base_iris: Vec<String>,

    /// Precomputed text2term mappings; the label matcher runs when unset
    pub mappings_file: Option<PathBuf>,

    pub exclude_deprecated: bool,
}

/// PubMed E-utilities configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PubMedConfig {
    /// Fetch references at all
    pub enabled: bool,

    /// E-utilities base URL
    pub base_url: String,

    /// NCBI API key (raises the allowed request rate)
    pub api_key: Option<String>,

    /// Rate limit (requests per second)
    pub requests_per_second: u32,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Attempts after the first failed one
    pub max_retries: u32,

    /// Delay before a retry in milliseconds
    pub retry_delay_ms: u64,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            dataset: String::from("opengwas"),
            database_path: None,
            resources_dir: PathBuf::from("resources"),
            save_tables: true,
            additional_tables: Vec::new(),
        }
    }
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            path: None,
            source_column: String::from("trait"),
            id_column: String::from("id"),
            pmid_column: Some(String::from("pmid")),
            opengwas: OpenGwasConfig::default(),
        }
    }
}

impl Default for OpenGwasConfig {
    fn default() -> Self {
        Self {
            base_url: String::from("https://api.opengwas.io/api"),
            token: None,
            timeout_secs: 300,
        }
    }
}

impl Default for OntologyConfig {
    fn default() -> Self {
        Self {
            name: String::from("efo"),
            semsql_location: None,
            additional: Vec::new(),
            term_blocklist: DEFAULT_TERM_BLOCKLIST.iter().map(|s| s.to_string()).collect(),
            include_dbxrefs: true,
            include_synonyms: true,
        }
    }
}

impl Default for MappingConfig {
    fn default() -> Self {
        Self {
            min_score: DEFAULT_MIN_SCORE,
            base_iris: Vec::new(),
            mappings_file: None,
            exclude_deprecated: true,
        }
    }
}

impl Default for PubMedConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: String::from("https://eutils.ncbi.nlm.nih.gov/entrez/eutils"),
            api_key: None,
            requests_per_second: 3,
            timeout_secs: 30,
            max_retries: 1,
            retry_delay_ms: 1000,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: String::from("info"),
            format: String::from("text"),
        }
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    env_var(name).and_then(|v| v.parse().ok())
}

fn env_list(name: &str) -> Option<Vec<String>> {
    env_var(name).map(|v| {
        v.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    })
}

impl Config {
    /// Load configuration from environment variables over the defaults
    pub fn from_env() -> Result<Self> {
        Ok(Self::default().with_env_overrides())
    }

    /// Apply `ONTOSEARCH_*` environment variables to this configuration
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(v) = env_var("ONTOSEARCH_DATASET") {
            self.build.dataset = v;
        }
        if let Some(v) = env_var("ONTOSEARCH_DATABASE") {
            self.build.database_path = Some(v.into());
        }
        if let Some(v) = env_var("ONTOSEARCH_RESOURCES_DIR") {
            self.build.resources_dir = v.into();
        }
        if let Some(v) = env_var("ONTOSEARCH_METADATA") {
            self.metadata.path = Some(v.into());
        }
        if let Some(v) = env_var("ONTOSEARCH_ONTOLOGY") {
            self.ontology.name = v;
        }
        if let Some(v) = env_var("ONTOSEARCH_SEMSQL_LOCATION") {
            self.ontology.semsql_location = Some(v);
        }
        if let Some(v) = env_parse("ONTOSEARCH_MIN_SCORE") {
            self.mapping.min_score = v;
        }
        if let Some(v) = env_list("ONTOSEARCH_BASE_IRIS") {
            self.mapping.base_iris = v;
        }
        if let Some(v) = env_var("ONTOSEARCH_MAPPINGS_FILE") {
            self.mapping.mappings_file = Some(v.into());
        }
        if let Some(v) = env_var("NCBI_API_KEY") {
            self.pubmed.api_key = Some(v);
        }
        if let Some(v) = env_parse("ONTOSEARCH_PUBMED_RATE_LIMIT") {
            self.pubmed.requests_per_second = v;
        }
        if let Some(v) = env_var("OPENGWAS_JWT") {
            self.metadata.opengwas.token = Some(v);
        }
        if let Some(v) = env_var("ONTOSEARCH_LOG_LEVEL") {
            self.logging.level = v;
        }
        if let Some(v) = env_var("ONTOSEARCH_LOG_FORMAT") {
            self.logging.format = v;
        }
        self
    }

    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config file: {}", path.display()))?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.build.dataset.trim().is_empty() {
            anyhow::bail!("dataset name must not be empty");
        }

        if self.ontology.name.trim().is_empty() {
            anyhow::bail!("ontology name must not be empty");
        }

        if !(0.0..=1.0).contains(&self.mapping.min_score) {
            anyhow::bail!("min_score must be within [0, 1]");
        }

        if self.metadata.source_column.is_empty() || self.metadata.id_column.is_empty() {
            anyhow::bail!("metadata source and id columns must be set");
        }

        if self.pubmed.requests_per_second == 0 {
            anyhow::bail!("requests_per_second must be greater than 0");
        }

        for table in &self.build.additional_tables {
            if table.name.trim().is_empty() {
                anyhow::bail!("additional table {} has no name", table.path.display());
            }
        }

        Ok(())
    }

    /// Output database path
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.build
            .database_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(format!("{}_search.db", self.build.dataset)))
    }

    /// The primary ontology followed by the additional ones
    #[must_use]
    pub fn ontologies(&self) -> Vec<OntologySource> {
        let primary = OntologySource {
            name: self.ontology.name.clone(),
            location: self.ontology.semsql_location.clone(),
        };
        std::iter::once(primary)
            .chain(self.ontology.additional.iter().cloned())
            .collect()
    }

    #[must_use]
    pub fn mapper_settings(&self) -> MapperSettings {
        MapperSettings {
            min_score: self.mapping.min_score,
            base_iris: self.mapping.base_iris.clone(),
            exclude_deprecated: self.mapping.exclude_deprecated,
        }
    }
}
