//! Removal of build outputs

use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::config::Config;
use crate::sources::download::cached_ontology_path;
use crate::utils::sanitize_identifier;

const DATASET_FILES: &[&str] = &["metadata.tsv", "references.tsv", "mappings.tsv", "mappings.csv"];

const ONTOLOGY_FILES: &[&str] = &[
    "edges.tsv",
    "entailed_edges.tsv",
    "labels.tsv",
    "dbxrefs.tsv",
    "synonyms.tsv",
    "mappings_counts.tsv",
];

/// Files a build of `config` leaves behind
///
/// With `all`, downloaded ontology databases are included.
pub fn build_outputs(config: &Config, all: bool) -> Vec<PathBuf> {
    let resources = &config.build.resources_dir;
    let dataset = sanitize_identifier(&config.build.dataset);

    let mut paths = vec![config.database_path()];
    paths.extend(DATASET_FILES.iter().map(|f| resources.join(format!("{dataset}_{f}"))));

    for source in config.ontologies() {
        let onto = source.table_prefix();
        paths.extend(ONTOLOGY_FILES.iter().map(|f| resources.join(format!("{onto}_{f}"))));
        if all {
            paths.push(cached_ontology_path(resources, &source.name));
        }
    }
    paths
}

/// Delete the outputs of a build; missing files are skipped
///
/// Returns the files that were actually removed.
pub fn clean_resources(config: &Config, all: bool) -> Result<Vec<PathBuf>> {
    let mut removed = Vec::new();
    for path in build_outputs(config, all) {
        match std::fs::remove_file(&path) {
            Ok(()) => {
                debug!(path = %path.display(), "Removed");
                removed.push(path);
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to remove {}", path.display()));
            }
        }
    }
    info!(removed = removed.len(), "Cleaned build outputs");
    Ok(removed)
}
