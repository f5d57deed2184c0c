//! Core data models shared by the capture pipeline.
//!
//! A [`Block`] is what the scanning side produces from page text; a
//! [`Record`] is what the store persists. [`Source`] travels with every
//! batch and is embedded in each record built from it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Provenance of a captured batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Source {
    pub url: String,
    pub title: String,
    #[serde(default)]
    pub user_agent: Option<String>,
}

impl Source {
    pub fn new(url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            user_agent: None,
        }
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }
}

impl Default for Source {
    fn default() -> Self {
        Self::new("unknown", "Untitled")
    }
}

/// A delimited block captured from page text, annotated with its fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub content: String,
    pub hash: String,
    pub word_count: usize,
}

/// A persisted, uniquely identified memory entry.
///
/// Records are immutable once built. The store holds at most one record
/// per `content_hash`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub id: String,
    pub content: String,
    pub content_hash: String,
    pub timestamp: DateTime<Utc>,
    pub source: Source,
    #[serde(default)]
    pub tags: Vec<String>,
    pub word_count: usize,
}

/// Filters accepted by record search. All fields are optional and combine
/// with AND semantics.
#[derive(Debug, Clone, Default)]
pub struct SearchCriteria {
    /// Case-insensitive substring matched against content or any tag.
    pub text: Option<String>,
    /// Keep records carrying at least one of these tags (case-insensitive).
    pub tags: Vec<String>,
    /// Keep records created at or after this instant.
    pub since: Option<DateTime<Utc>>,
    /// Maximum number of results; callers fall back to a configured default.
    pub limit: Option<usize>,
}

/// Aggregate statistics over the current record list.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreStats {
    pub total_records: usize,
    pub total_words: usize,
    pub average_words: f64,
    pub unique_tags: usize,
    pub oldest_timestamp: Option<DateTime<Utc>>,
    pub newest_timestamp: Option<DateTime<Utc>>,
}
