//! The `search` command.

use anyhow::{bail, Result};

use mcp_memory_core::models::{Record, SearchCriteria};
use mcp_memory_core::search::parse_since;

use crate::config::Config;
use crate::memory_store::MemoryStore;

/// Build criteria from command-line values, clamping the limit to
/// `[search].max_limit`.
pub fn build_criteria(
    config: &Config,
    query: Option<String>,
    tags: Option<String>,
    since: Option<String>,
    limit: Option<usize>,
) -> Result<SearchCriteria> {
    let text = query.filter(|q| !q.trim().is_empty());
    let tags = tags
        .map(|t| {
            t.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default();
    let since = since.map(|s| parse_since(&s)).transpose()?;
    let limit = match limit {
        Some(0) => bail!("--limit must be at least 1"),
        Some(n) => Some(n.min(config.search.max_limit)),
        None => None,
    };
    Ok(SearchCriteria {
        text,
        tags,
        since,
        limit,
    })
}

/// Single-line preview of `content`, at most `max_chars` characters.
pub fn excerpt(content: &str, max_chars: usize) -> String {
    let flat = content.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() > max_chars {
        let cut: String = flat.chars().take(max_chars).collect();
        format!("{}...", cut)
    } else {
        flat
    }
}

fn print_record(index: usize, record: &Record) {
    println!(
        "{}. {} ({} words)",
        index,
        record.source.title,
        record.word_count
    );
    println!("    saved: {}", record.timestamp.format("%Y-%m-%d %H:%M:%S"));
    println!("    url: {}", record.source.url);
    if !record.tags.is_empty() {
        println!("    tags: {}", record.tags.join(", "));
    }
    println!("    excerpt: \"{}\"", excerpt(&record.content, 120));
    println!("    id: {}", record.id);
    println!();
}

pub async fn run_search(
    config: &Config,
    query: Option<String>,
    tags: Option<String>,
    since: Option<String>,
    limit: Option<usize>,
) -> Result<()> {
    let criteria = build_criteria(config, query, tags, since, limit)?;
    let store = MemoryStore::open(config).await?;
    let outcome = store.search(&criteria).await;

    if outcome.results.is_empty() {
        println!("No results.");
        return Ok(());
    }

    for (i, record) in outcome.results.iter().enumerate() {
        print_record(i + 1, record);
    }
    println!(
        "Showing {} of {} matching record(s)",
        outcome.results.len(),
        outcome.filtered
    );
    Ok(())
}
