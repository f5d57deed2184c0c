//! Record filtering and aggregate statistics.
//!
//! Search is plain substring and tag matching over the record list; there
//! is no scoring. The functions here work on a slice of records so any store
//! can reuse them under its own lock.
//!
//! # Algorithm
//!
//! 1. Keep records matching every criterion that is set (text, tags, since).
//! 2. Sort by `timestamp` descending; among equal timestamps the most
//!    recently inserted record comes first.
//! 3. Truncate to the requested limit, or `default_limit` when none is set.

use anyhow::{bail, Result};
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::HashSet;

use crate::models::{Record, SearchCriteria, StoreStats};

/// Matching records plus the number that matched before truncation.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub results: Vec<Record>,
    pub filtered: usize,
}

/// Run `criteria` against `records`.
pub fn search_records(
    records: &[Record],
    criteria: &SearchCriteria,
    default_limit: usize,
) -> SearchOutcome {
    let text = criteria
        .text
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase);
    let tags: Vec<String> = criteria
        .tags
        .iter()
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect();

    let mut matched: Vec<&Record> = records
        .iter()
        .rev()
        .filter(|r| text.as_deref().map_or(true, |q| matches_text(r, q)))
        .filter(|r| tags.is_empty() || matches_tags(r, &tags))
        .filter(|r| criteria.since.map_or(true, |since| r.timestamp >= since))
        .collect();

    // Stable sort keeps reverse insertion order for equal timestamps.
    matched.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

    let filtered = matched.len();
    let limit = criteria.limit.unwrap_or(default_limit);
    let results = matched.into_iter().take(limit).cloned().collect();

    SearchOutcome { results, filtered }
}

fn matches_text(record: &Record, query_lower: &str) -> bool {
    record.content.to_lowercase().contains(query_lower)
        || record
            .tags
            .iter()
            .any(|t| t.to_lowercase().contains(query_lower))
}

fn matches_tags(record: &Record, wanted_lower: &[String]) -> bool {
    record
        .tags
        .iter()
        .any(|t| wanted_lower.contains(&t.to_lowercase()))
}

/// Compute statistics over the current record list.
pub fn compute_stats(records: &[Record]) -> StoreStats {
    let total_records = records.len();
    let total_words: usize = records.iter().map(|r| r.word_count).sum();
    let average_words = if total_records > 0 {
        total_words as f64 / total_records as f64
    } else {
        0.0
    };
    let unique_tags = records
        .iter()
        .flat_map(|r| r.tags.iter())
        .collect::<HashSet<_>>()
        .len();

    StoreStats {
        total_records,
        total_words,
        average_words,
        unique_tags,
        oldest_timestamp: records.iter().map(|r| r.timestamp).min(),
        newest_timestamp: records.iter().map(|r| r.timestamp).max(),
    }
}

/// Parse a lower timestamp bound: RFC 3339, or `YYYY-MM-DD` at midnight UTC.
pub fn parse_since(value: &str) -> Result<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Ok(ts.with_timezone(&Utc));
    }
    match NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        Ok(date) => match date.and_hms_opt(0, 0, 0) {
            Some(dt) => Ok(dt.and_utc()),
            None => bail!("invalid since value: {}", value),
        },
        Err(_) => bail!(
            "invalid since value: '{}' (expected RFC 3339 or YYYY-MM-DD)",
            value
        ),
    }
}
