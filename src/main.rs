use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::{build, clean, extract, query, BuildArgs, QueryArgs};

#[derive(Parser)]
#[command(
    name = "ontosearch",
    version,
    about = "Ontology-aware search databases over OpenGWAS metadata, ontology tables and PubMed references",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json); the configured format by default
    #[arg(long, global = true)]
    log_format: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the search database
    Build(BuildArgs),

    /// Find metadata records annotated with an ontology term
    Query(QueryArgs),

    /// Extract ontology tables without building a database
    Extract {
        /// Ontology name (e.g. efo, mondo)
        #[arg(short, long)]
        ontology: Option<String>,

        /// SemSQL database URL or local path
        #[arg(short, long)]
        location: Option<String>,

        /// Output directory for the TSV tables
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },

    /// Remove the database and derived files of a dataset
    Clean {
        /// Also remove downloaded ontology databases
        #[arg(long, default_value = "false")]
        all: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = commands::load_config(cli.config.as_deref())?;

    // Initialize tracing/logging
    let format = cli.log_format.as_deref().unwrap_or(&config.logging.format);
    setup_tracing(format, &config.logging.level, cli.verbose)?;
    tracing::info!(dataset = %config.build.dataset, "ontosearch starting");

    match cli.command {
        Commands::Build(args) => {
            tracing::info!(
                ontology = ?args.ontology,
                metadata = ?args.metadata,
                mappings = ?args.mappings,
                "Starting build command"
            );
            if let Err(err) = build(config, args).await {
                let category = ontosearch::error::classify(&err).map_or("unclassified", |c| c.description());
                tracing::error!(category, "Build aborted");
                return Err(err);
            }
        }

        Commands::Query(args) => {
            tracing::info!(
                term = %args.term,
                include_descendants = %args.include_descendants,
                direct_only = %args.direct_only,
                "Starting query command"
            );
            query(config, args)?;
        }

        Commands::Extract {
            ontology,
            location,
            output_dir,
        } => {
            tracing::info!(
                ontology = ?ontology,
                location = ?location,
                output_dir = ?output_dir,
                "Starting extract command"
            );
            extract(config, ontology, location, output_dir).await?;
        }

        Commands::Clean { all } => {
            tracing::info!(all = %all, "Starting clean command");
            clean(config, all)?;
        }
    }

    tracing::info!("ontosearch completed successfully");
    Ok(())
}

fn setup_tracing(format: &str, level: &str, verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        tracing_subscriber::EnvFilter::new("ontosearch=debug,info")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(format!("ontosearch={level},warn")))
    };

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }

    Ok(())
}
