use anyhow::Result;

use ontosearch::config::Config;
use ontosearch::pipeline::clean_resources;

pub fn clean(config: Config, all: bool) -> Result<()> {
    let removed = clean_resources(&config, all)?;
    if removed.is_empty() {
        println!("Nothing to remove");
    }
    for path in &removed {
        println!("Removed {}", path.display());
    }
    Ok(())
}
