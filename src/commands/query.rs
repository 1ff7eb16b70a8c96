use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use ontosearch::config::Config;
use ontosearch::storage::{AnnotatedRecord, Database, QueryTables, TermQuery};
use ontosearch::table::write_table;

#[derive(Debug, Args)]
pub struct QueryArgs {
    /// Ontology term CURIE, e.g. EFO:0000400
    pub term: String,

    /// Include records mapped to subclasses of the term
    #[arg(long, default_value = "false")]
    pub include_descendants: bool,

    /// Follow asserted subclass edges only
    #[arg(long, default_value = "false")]
    pub direct_only: bool,

    /// Database to query; the configured build output by default
    #[arg(long)]
    pub database: Option<PathBuf>,

    /// Ontology whose edges are followed; the primary ontology by default
    #[arg(long)]
    pub ontology: Option<String>,

    /// Write results as TSV instead of printing them
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

pub fn query(config: Config, args: QueryArgs) -> Result<()> {
    let path = args.database.unwrap_or_else(|| config.database_path());
    if !path.is_file() {
        anyhow::bail!("Database {} does not exist; run 'ontosearch build' first", path.display());
    }
    let db = Database::open(&path).with_context(|| format!("Failed to open {}", path.display()))?;

    let ontology = args.ontology.unwrap_or_else(|| config.ontology.name.clone());
    let tables = QueryTables::for_dataset(&config.build.dataset, &ontology);
    let query = TermQuery::new(args.term)
        .include_descendants(args.include_descendants)
        .direct_only(args.direct_only);

    let records = db
        .records_annotated_with(&query, &tables)
        .context("Query failed")?;

    if let Some(output) = args.output {
        write_table(&AnnotatedRecord::to_table(&records), &output)?;
        println!("Wrote {} records to {}", records.len(), output.display());
        return Ok(());
    }

    if records.is_empty() {
        println!("No records annotated with {}", query.term);
        return Ok(());
    }

    println!("Found {} records for {}:\n", records.len(), query.term);
    for record in &records {
        let score = record
            .mapping_score
            .map_or_else(|| "-".to_string(), |s| format!("{s:.3}"));
        println!(
            "{}\t{}\t{} ({})\t{}",
            record.source_term_id,
            record.source_term,
            record.mapped_term_label,
            record.mapped_term_curie,
            score
        );
    }

    Ok(())
}
