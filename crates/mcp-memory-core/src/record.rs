//! Record construction: identity, timestamp, tags and word count.

use chrono::Utc;
use regex::Regex;
use std::sync::OnceLock;
use uuid::Uuid;

use crate::extract::word_count;
use crate::hash::content_hash;
use crate::models::{Record, Source};

fn hashtag_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"#([A-Za-z0-9_]+)").expect("hashtag pattern is valid"))
}

/// Build a record for `content`.
///
/// When `supplied_hash` is given it is stored as-is; producers that already
/// fingerprinted the block skip a second pass. Callers are expected to have
/// trimmed `content` and rejected empty blocks.
pub fn build_record(content: &str, source: Source, supplied_hash: Option<&str>) -> Record {
    let content_hash = match supplied_hash {
        Some(h) if !h.is_empty() => h.to_string(),
        _ => content_hash(content),
    };

    Record {
        id: Uuid::now_v7().to_string(),
        content: content.to_string(),
        content_hash,
        timestamp: Utc::now(),
        source,
        tags: extract_tags(content),
        word_count: word_count(content),
    }
}

/// Derive tags from content.
///
/// Hashtags come first in order of appearance, then the `code`, `todo` and
/// `url` markers. The result has no duplicates.
pub fn extract_tags(content: &str) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    let mut push = |tag: &str| {
        if !tags.iter().any(|t| t == tag) {
            tags.push(tag.to_string());
        }
    };

    for cap in hashtag_pattern().captures_iter(content) {
        push(&cap[1]);
    }
    if content.contains("```") || content.contains("function") || content.contains("class") {
        push("code");
    }
    if content.contains("TODO") || content.contains("FIXME") {
        push("todo");
    }
    if content.contains("http://") || content.contains("https://") {
        push("url");
    }

    tags
}
