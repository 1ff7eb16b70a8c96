//! Database build pipeline
//!
//! One configurable build replaces the per-dataset scripts:
//!
//! ```text
//! metadata ──► <dataset>_metadata
//! ontology dump ──► <onto>_edges, <onto>_entailed_edges, <onto>_dbxrefs,
//!                   <onto>_synonyms, <onto>_version
//! PubMed ──► <dataset>_references
//! term mapper ──► <dataset>_mappings
//! mappings + entailed edges ──► counts ──► <onto>_labels (labels ⋈ counts)
//! additional files ──► <name>
//! ```
//!
//! Stages run one after another. An unreachable ontology or metadata source
//! aborts the build; unmatched mappings and failed publication lookups are
//! logged and left out.
//!
//! # Submodules
//!
//! - [`clean`] - Remove a dataset's database and derived files

pub mod clean;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::{Config, OntologySource};
use crate::models::{Mapping, MappingCount, SourceTerm};
use crate::ontology::{
    labels_with_counts, load_mappings_file, CountSummary, LabelMatcher, MappingCounter,
    OntologyTables, SemSqlReader, TermMapper,
};
use crate::sources::{
    ensure_local_ontology, http_client, load_or_fetch_references, prepare_opengwas_metadata,
    OpenGwasClient, PubMedClient, ReferenceReport,
};
use crate::storage::Database;
use crate::table::{read_table, write_table, Table};
use crate::utils::sanitize_identifier;

pub use clean::clean_resources;

/// Timeout of ontology downloads; the larger dumps are several GB
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(60 * 60);

// ============================================================================
// Context
// ============================================================================

/// Everything one build needs, scoped to that build
pub struct BuildContext {
    pub config: Config,
    pub client: Client,
    pub resources_dir: PathBuf,
    pub database_path: PathBuf,
}

impl BuildContext {
    /// Validate `config` and resolve its paths
    pub fn new(config: Config) -> Result<Self> {
        config.validate().context("Invalid configuration")?;
        let client = http_client(DOWNLOAD_TIMEOUT).context("Failed to create HTTP client")?;
        Ok(Self {
            resources_dir: config.build.resources_dir.clone(),
            database_path: config.database_path(),
            client,
            config,
        })
    }

    /// Sanitized dataset name used as table prefix
    pub fn dataset(&self) -> String {
        sanitize_identifier(&self.config.build.dataset)
    }

    pub fn resource_path(&self, file_name: &str) -> PathBuf {
        self.resources_dir.join(file_name)
    }

    /// Write a derived table when `save_tables` is on
    fn save(&self, table: &Table, file_name: &str) -> Result<()> {
        if self.config.build.save_tables {
            let path = self.resource_path(file_name);
            write_table(table, &path)
                .with_context(|| format!("Failed to write {}", path.display()))?;
        }
        Ok(())
    }
}

// ============================================================================
// Report
// ============================================================================

/// Per-ontology outcome of a build
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OntologyReport {
    pub name: String,
    pub version: String,
    pub classes: usize,
    pub counts: CountSummary,
}

/// Summary of a finished build
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildReport {
    pub dataset: String,
    pub database: PathBuf,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Table name → row count
    pub tables: BTreeMap<String, usize>,
    pub ontologies: Vec<OntologyReport>,
    pub mappings: usize,
    pub references: Option<ReferenceReport>,
}

impl BuildReport {
    /// Mappings left out of the counts of the primary ontology
    pub fn unmatched_mappings(&self) -> usize {
        self.ontologies.iter().map(|o| o.counts.unmatched_mappings).sum()
    }

    pub fn duration_secs(&self) -> f64 {
        (self.finished_at - self.started_at).num_milliseconds() as f64 / 1000.0
    }
}

/// Import a table and record its row count
fn import(db: &mut Database, report: &mut BTreeMap<String, usize>, name: &str, table: &Table) -> Result<()> {
    db.import_table(name, table)
        .with_context(|| format!("Failed to import table {name}"))?;
    report.insert(name.to_string(), table.len());
    Ok(())
}

// ============================================================================
// Stages
// ============================================================================

/// Load the metadata table from its file or from OpenGWAS
pub async fn load_metadata(ctx: &BuildContext) -> Result<Table> {
    let metadata = &ctx.config.metadata;
    if let Some(path) = &metadata.path {
        let table = read_table(path)
            .with_context(|| format!("Failed to read metadata file {}", path.display()))?;
        info!(path = %path.display(), records = table.len(), "Loaded metadata");
        return Ok(table);
    }

    let client = OpenGwasClient::new(&metadata.opengwas).context("Failed to create OpenGWAS client")?;
    let mut table = client
        .fetch_gwasinfo()
        .await
        .context("Failed to fetch OpenGWAS metadata")?;
    prepare_opengwas_metadata(&mut table, metadata.pmid_column.as_deref());

    let path = ctx.resource_path(&format!("{}_metadata.tsv", ctx.dataset()));
    write_table(&table, &path).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(table)
}

/// Resolve, open and extract one ontology, saving its tables when configured
pub async fn extract_ontology(ctx: &BuildContext, source: &OntologySource) -> Result<OntologyTables> {
    let location = source.resolved_location();
    let path = ensure_local_ontology(&ctx.client, &location, &source.name, &ctx.resources_dir)
        .await
        .with_context(|| format!("Failed to obtain ontology {}", source.name))?;

    let tables = SemSqlReader::open(&path, &source.name)
        .and_then(|reader| reader.read_all())
        .with_context(|| format!("Failed to extract ontology tables from {}", path.display()))?;

    let onto = source.table_prefix();
    ctx.save(&tables.edges, &format!("{onto}_edges.tsv"))?;
    ctx.save(&tables.entailed_edges, &format!("{onto}_entailed_edges.tsv"))?;
    ctx.save(&tables.labels, &format!("{onto}_labels.tsv"))?;
    ctx.save(&tables.dbxrefs, &format!("{onto}_dbxrefs.tsv"))?;
    ctx.save(&tables.synonyms, &format!("{onto}_synonyms.tsv"))?;
    Ok(tables)
}

/// Mappings from the precomputed file, or from the label matcher over the
/// primary ontology
pub fn map_metadata(ctx: &BuildContext, metadata: &Table, primary: &OntologyTables) -> Result<Vec<Mapping>> {
    let settings = ctx.config.mapper_settings();
    if let Some(path) = &ctx.config.mapping.mappings_file {
        return load_mappings_file(path, &settings)
            .with_context(|| format!("Failed to load mappings from {}", path.display()));
    }

    let columns = &ctx.config.metadata;
    let sources = SourceTerm::from_table(metadata, &columns.id_column, &columns.source_column)
        .with_context(|| {
            format!(
                "Metadata lacks id column '{}' or source column '{}'",
                columns.id_column, columns.source_column
            )
        })?;
    let mappings = LabelMatcher::new(primary, settings).map_terms(&sources);
    if mappings.is_empty() && !sources.is_empty() {
        warn!(
            ontology = %primary.name,
            sources = sources.len(),
            "No source term matched an ontology label; check mapping.base_iris"
        );
    }
    Ok(mappings)
}

/// Run a complete build
pub async fn build_database(ctx: &BuildContext) -> Result<BuildReport> {
    let started_at = Utc::now();
    let dataset = ctx.dataset();
    let mut tables = BTreeMap::new();

    info!(dataset = %dataset, database = %ctx.database_path.display(), "Starting build");

    let metadata = load_metadata(ctx).await?;
    let mut db = Database::open(&ctx.database_path)
        .with_context(|| format!("Failed to open database {}", ctx.database_path.display()))?;
    import(&mut db, &mut tables, &format!("{dataset}_metadata"), &metadata)?;

    let mut ontologies = Vec::new();
    for source in ctx.config.ontologies() {
        info!(ontology = %source.name, "Extracting ontology tables");
        let extracted = extract_ontology(ctx, &source).await?;
        let onto = source.table_prefix();

        import(&mut db, &mut tables, &format!("{onto}_edges"), &extracted.edges)?;
        import(&mut db, &mut tables, &format!("{onto}_entailed_edges"), &extracted.entailed_edges)?;
        if ctx.config.ontology.include_dbxrefs {
            import(&mut db, &mut tables, &format!("{onto}_dbxrefs"), &extracted.dbxrefs)?;
        }
        if ctx.config.ontology.include_synonyms {
            import(&mut db, &mut tables, &format!("{onto}_synonyms"), &extracted.synonyms)?;
        }
        import(&mut db, &mut tables, &format!("{onto}_version"), &extracted.version_table())?;
        ontologies.push((onto, extracted));
    }

    let references = match (&ctx.config.metadata.pmid_column, ctx.config.pubmed.enabled) {
        (Some(pmid_column), true) => {
            let client = PubMedClient::new(&ctx.config.pubmed).context("Failed to create PubMed client")?;
            let cache = ctx.resource_path(&format!("{dataset}_references.tsv"));
            let (table, report) = load_or_fetch_references(&client, &metadata, pmid_column, &cache)
                .await
                .context("Failed to assemble publication references")?;
            import(&mut db, &mut tables, &format!("{dataset}_references"), &table)?;
            Some(report)
        }
        _ => {
            info!("Publication references disabled");
            None
        }
    };

    let (_, primary) = ontologies
        .first()
        .context("No ontology configured")?;
    let mappings = map_metadata(ctx, &metadata, primary)?;
    let mappings_table = Mapping::to_table(&mappings);
    import(&mut db, &mut tables, &format!("{dataset}_mappings"), &mappings_table)?;
    ctx.save(&mappings_table, &format!("{dataset}_mappings.tsv"))?;

    let mut ontology_reports = Vec::new();
    for (i, (onto, extracted)) in ontologies.iter().enumerate() {
        let counter = MappingCounter::from_tables(extracted, ctx.config.ontology.term_blocklist.clone());
        // mappings target the primary ontology; the others only count the
        // mappings that land on their own classes
        let (counts, summary) = if i == 0 {
            counter.count(&mappings)
        } else {
            counter.count(&counter.own_mappings(&mappings))
        };
        if summary.unmatched_mappings > 0 {
            warn!(
                ontology = %onto,
                unmatched = summary.unmatched_mappings,
                targets = summary.unmatched_targets.len(),
                "Mappings excluded from counts: target is not a class of the ontology"
            );
        }
        ctx.save(&MappingCount::to_table(&counts), &format!("{onto}_mappings_counts.tsv"))?;

        let labels = labels_with_counts(&extracted.labels, &counts);
        import(&mut db, &mut tables, &format!("{onto}_labels"), &labels)?;

        ontology_reports.push(OntologyReport {
            name: extracted.name.clone(),
            version: extracted.version.clone(),
            classes: extracted.classes.len(),
            counts: summary,
        });
    }

    for extra in &ctx.config.build.additional_tables {
        let table = read_table(&extra.path)
            .with_context(|| format!("Failed to read additional table {}", extra.path.display()))?;
        import(&mut db, &mut tables, &sanitize_identifier(&extra.name), &table)?;
    }

    let report = BuildReport {
        dataset,
        database: ctx.database_path.clone(),
        started_at,
        finished_at: Utc::now(),
        tables,
        ontologies: ontology_reports,
        mappings: mappings.len(),
        references,
    };

    info!(
        tables = report.tables.len(),
        mappings = report.mappings,
        unmatched = report.unmatched_mappings(),
        seconds = report.duration_secs(),
        "Build finished"
    );
    Ok(report)
}

/// Write a build report as pretty JSON
pub fn write_report(report: &BuildReport, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(report).context("Failed to serialize build report")?;
    std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}
