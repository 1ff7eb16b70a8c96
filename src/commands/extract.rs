use std::path::PathBuf;

use anyhow::Result;

use ontosearch::config::{Config, OntologySource};
use ontosearch::pipeline::{extract_ontology, BuildContext};

pub async fn extract(
    mut config: Config,
    ontology: Option<String>,
    location: Option<String>,
    output_dir: Option<PathBuf>,
) -> Result<()> {
    if let Some(dir) = output_dir {
        config.build.resources_dir = dir;
    }
    config.build.save_tables = true;

    // the configured location belongs to the primary ontology only
    let source = match ontology {
        Some(name) => OntologySource { name, location },
        None => OntologySource {
            name: config.ontology.name.clone(),
            location: location.or_else(|| config.ontology.semsql_location.clone()),
        },
    };

    let ctx = BuildContext::new(config)?;
    let tables = extract_ontology(&ctx, &source).await?;

    println!("Ontology: {} {}", tables.name, tables.version);
    println!("================================");
    println!("  classes:        {:>8}", tables.classes.len());
    println!("  edges:          {:>8}", tables.edges.len());
    println!("  entailed edges: {:>8}", tables.entailed_edges.len());
    println!("  labels:         {:>8}", tables.labels.len());
    println!("  dbxrefs:        {:>8}", tables.dbxrefs.len());
    println!("  synonyms:       {:>8}", tables.synonyms.len());
    println!("\nTables written to {}", ctx.resources_dir.display());

    Ok(())
}
