//! The `export` command: dump every record as a JSON array.
//!
//! The output uses the same camelCase record shape as the store file, so an
//! export can be dropped in as a store file elsewhere.

use anyhow::Result;
use std::path::Path;

use crate::config::Config;
use crate::memory_store::MemoryStore;

pub async fn run_export(config: &Config, output: Option<&Path>) -> Result<()> {
    let store = MemoryStore::open(config).await?;
    let records = store.all().await;
    let json = serde_json::to_string_pretty(&records)?;

    match output {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, &json)?;
            eprintln!("Exported {} records to {}", records.len(), path.display());
        }
        None => {
            println!("{}", json);
        }
    }
    Ok(())
}
