mod build;
mod clean;
mod extract;
mod query;

use std::path::Path;

use anyhow::{Context, Result};
use ontosearch::config::Config;

// Re-export command functions for convenience
pub use build::{build, BuildArgs};
pub use clean::clean;
pub use extract::extract;
pub use query::{query, QueryArgs};

/// Configuration from `--config` when given, otherwise from the environment
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = match path {
        Some(path) => Config::from_file(path)?.with_env_overrides(),
        None => Config::from_env().context("Failed to load configuration from environment")?,
    };
    Ok(config)
}
