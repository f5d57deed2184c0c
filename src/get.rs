//! The `get`, `delete` and `clear` commands.
//!
//! These open the store file directly. Do not run them while `mcpm serve`
//! is using the same file: the server keeps its own copy in memory and
//! will overwrite the file on its next write.

use anyhow::{bail, Result};

use crate::config::Config;
use crate::memory_store::MemoryStore;

pub async fn run_get(config: &Config, id: &str) -> Result<()> {
    let store = MemoryStore::open(config).await?;
    let record = match store.get(id).await {
        Some(r) => r,
        None => bail!("record not found: {}", id),
    };

    println!("--- Record ---");
    println!("id:         {}", record.id);
    println!("hash:       {}", record.content_hash);
    println!("saved:      {}", record.timestamp.to_rfc3339());
    println!("title:      {}", record.source.title);
    println!("url:        {}", record.source.url);
    if let Some(ref ua) = record.source.user_agent {
        println!("user_agent: {}", ua);
    }
    println!("tags:       {}", record.tags.join(", "));
    println!("words:      {}", record.word_count);
    println!();
    println!("--- Content ---");
    println!("{}", record.content);
    Ok(())
}

pub async fn run_delete(config: &Config, id: &str) -> Result<()> {
    let store = MemoryStore::open(config).await?;
    if !store.delete(id).await? {
        bail!("record not found: {}", id);
    }
    println!("Deleted {}", id);
    Ok(())
}

pub async fn run_clear(config: &Config) -> Result<()> {
    let store = MemoryStore::open(config).await?;
    let cleared = store.clear().await?;
    println!("Cleared {} record(s)", cleared);
    Ok(())
}
