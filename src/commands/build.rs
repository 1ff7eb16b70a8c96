use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use ontosearch::config::{AdditionalTable, Config, OntologySource};
use ontosearch::pipeline::{build_database, write_report, BuildContext};

/// Flags of the build command; each overrides the matching config value
#[derive(Debug, Args)]
pub struct BuildArgs {
    /// Dataset name
    #[arg(short, long)]
    pub dataset: Option<String>,

    /// Metadata TSV/CSV file; OpenGWAS is queried when absent
    #[arg(short, long)]
    pub metadata: Option<PathBuf>,

    /// Primary ontology name
    #[arg(short, long)]
    pub ontology: Option<String>,

    /// SemSQL database URL or local path of the primary ontology
    #[arg(long)]
    pub semsql: Option<String>,

    /// Additional ontology, repeatable
    #[arg(long = "additional-ontology")]
    pub additional_ontologies: Vec<String>,

    /// Additional table as NAME=PATH, repeatable
    #[arg(long = "table", value_parser = parse_table)]
    pub tables: Vec<AdditionalTable>,

    /// Column with the text to map
    #[arg(long)]
    pub source_column: Option<String>,

    /// Column with the record id
    #[arg(long)]
    pub id_column: Option<String>,

    /// Column with PubMed ids
    #[arg(long)]
    pub pmid_column: Option<String>,

    /// Precomputed mappings CSV
    #[arg(long)]
    pub mappings: Option<PathBuf>,

    /// Minimum mapping score
    #[arg(long)]
    pub min_score: Option<f64>,

    /// Output database file
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Resources directory
    #[arg(long)]
    pub resources: Option<PathBuf>,

    /// Skip PubMed lookups
    #[arg(long, default_value = "false")]
    pub no_references: bool,

    /// Write the build report as JSON
    #[arg(long)]
    pub report: Option<PathBuf>,
}

fn parse_table(raw: &str) -> Result<AdditionalTable, String> {
    let (name, path) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=PATH, got '{raw}'"))?;
    Ok(AdditionalTable {
        name: name.trim().to_string(),
        path: PathBuf::from(path.trim()),
    })
}

impl BuildArgs {
    fn apply(self, config: &mut Config) {
        if let Some(v) = self.dataset {
            config.build.dataset = v;
        }
        if let Some(v) = self.metadata {
            config.metadata.path = Some(v);
        }
        if let Some(v) = self.ontology {
            config.ontology.name = v;
        }
        if let Some(v) = self.semsql {
            config.ontology.semsql_location = Some(v);
        }
        config
            .ontology
            .additional
            .extend(self.additional_ontologies.into_iter().map(OntologySource::new));
        config.build.additional_tables.extend(self.tables);
        if let Some(v) = self.source_column {
            config.metadata.source_column = v;
        }
        if let Some(v) = self.id_column {
            config.metadata.id_column = v;
        }
        if let Some(v) = self.pmid_column {
            config.metadata.pmid_column = Some(v);
        }
        if let Some(v) = self.mappings {
            config.mapping.mappings_file = Some(v);
        }
        if let Some(v) = self.min_score {
            config.mapping.min_score = v;
        }
        if let Some(v) = self.output {
            config.build.database_path = Some(v);
        }
        if let Some(v) = self.resources {
            config.build.resources_dir = v;
        }
        if self.no_references {
            config.pubmed.enabled = false;
        }
    }
}

pub async fn build(mut config: Config, args: BuildArgs) -> Result<()> {
    let report_path = args.report.clone();
    args.apply(&mut config);

    let ctx = BuildContext::new(config)?;
    let report = build_database(&ctx).await?;

    println!("Database: {}", report.database.display());
    println!("================================");
    for (table, rows) in &report.tables {
        println!("  {table:<32} {rows:>8} rows");
    }
    for ontology in &report.ontologies {
        println!(
            "\n{} {} ({} classes)",
            ontology.name,
            if ontology.version.is_empty() { "(no version)" } else { ontology.version.as_str() },
            ontology.classes
        );
        println!(
            "  terms counted: {} | with direct: {} | with inherited: {} | unmatched mappings: {}",
            ontology.counts.terms,
            ontology.counts.terms_with_direct,
            ontology.counts.terms_with_inherited,
            ontology.counts.unmatched_mappings
        );
    }
    if let Some(references) = &report.references {
        println!(
            "\nReferences: {} cached, {} fetched, {} skipped",
            references.cached,
            references.fetched,
            references.skipped.len()
        );
    }
    println!("\nFinished in {:.1}s", report.duration_secs());

    if let Some(path) = report_path {
        write_report(&report, &path)?;
        println!("Report: {}", path.display());
    }

    Ok(())
}
