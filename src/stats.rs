//! The `stats` command: a quick summary of what the store holds.

use anyhow::Result;

use crate::config::Config;
use crate::memory_store::MemoryStore;

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

pub async fn run_stats(config: &Config) -> Result<()> {
    let store = MemoryStore::open(config).await?;
    let stats = store.stats().await;
    let file_size = tokio::fs::metadata(&config.store.path)
        .await
        .map(|m| m.len())
        .unwrap_or(0);

    println!("MCP Memory Store Stats");
    println!("======================");
    println!();
    println!("  Store file:  {}", config.store.path.display());
    println!("  Size:        {}", format_bytes(file_size));
    println!();
    println!("  Records:     {}", stats.total_records);
    println!("  Words:       {}", stats.total_words);
    println!("  Avg words:   {:.1}", stats.average_words);
    println!("  Unique tags: {}", stats.unique_tags);
    if let Some(oldest) = stats.oldest_timestamp {
        println!("  Oldest:      {}", oldest.format("%Y-%m-%d %H:%M:%S"));
    }
    if let Some(newest) = stats.newest_timestamp {
        println!("  Newest:      {}", newest.format("%Y-%m-%d %H:%M:%S"));
    }
    println!();
    Ok(())
}
