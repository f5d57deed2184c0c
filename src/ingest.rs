//! Batch ingestion into the Memory Store.
//!
//! [`IngestService`] is the store path behind `POST /store` and
//! `POST /check-hashes`. It is also called in-process by the scanning agent
//! when no HTTP hop is wanted. The request and response types double as the
//! JSON wire format.
//!
//! Per block, in input order:
//!
//! 1. Trim the content; empty blocks are skipped and counted as neither
//!    stored nor duplicate.
//! 2. Use the supplied hash, or fingerprint the trimmed content.
//! 3. If the store already holds the hash, report a duplicate carrying the
//!    existing record id.
//! 4. Otherwise build a record and append it.
//!
//! The response is assembled only after the whole batch has been processed.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use mcp_memory_core::hash::content_hash;
use mcp_memory_core::models::Source;
use mcp_memory_core::record::build_record;

use crate::memory_store::{AppendOutcome, MemoryStore};

/// Characters of content echoed back in [`StoredEntry::preview`].
const PREVIEW_CHARS: usize = 100;

/// One block as submitted by a producer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockInput {
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    /// Producer-side capture time; informational only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    /// Producer-side word count; the store recomputes its own.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub word_count: Option<usize>,
}

/// Batch provenance as submitted. Missing fields fall back to
/// [`Source::default`] values.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

impl SourceInput {
    pub fn into_source(self) -> Source {
        let fallback = Source::default();
        Source {
            url: non_empty(self.url).unwrap_or(fallback.url),
            title: non_empty(self.title).unwrap_or(fallback.title),
            user_agent: non_empty(self.user_agent),
        }
    }
}

impl From<&Source> for SourceInput {
    fn from(source: &Source) -> Self {
        Self {
            url: Some(source.url.clone()),
            title: Some(source.title.clone()),
            user_agent: source.user_agent.clone(),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Body of `POST /store`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreRequest {
    pub blocks: Vec<BlockInput>,
    #[serde(default)]
    pub metadata: SourceInput,
}

impl StoreRequest {
    /// Validate an untyped body before it reaches the store.
    pub fn from_json(body: serde_json::Value) -> Result<Self> {
        let Some(obj) = body.as_object() else {
            bail!("request body must be a JSON object");
        };
        match obj.get("blocks") {
            Some(serde_json::Value::Array(_)) => {}
            Some(_) => bail!("invalid request: blocks must be an array"),
            None => bail!("invalid request: blocks is required"),
        }
        if let Some(meta) = obj.get("metadata") {
            if !meta.is_object() && !meta.is_null() {
                bail!("invalid request: metadata must be an object");
            }
        }
        let mut body = body;
        if body.get("metadata").is_some_and(|m| m.is_null()) {
            if let Some(obj) = body.as_object_mut() {
                obj.remove("metadata");
            }
        }
        serde_json::from_value(body).context("invalid request")
    }
}

/// Body of `POST /check-hashes`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckHashesRequest {
    pub hashes: Vec<String>,
}

impl CheckHashesRequest {
    pub fn from_json(body: serde_json::Value) -> Result<Self> {
        match body.get("hashes") {
            Some(serde_json::Value::Array(items)) => {
                if !items.iter().all(|v| v.is_string()) {
                    bail!("invalid request: hashes must contain only strings");
                }
            }
            Some(_) => bail!("invalid request: hashes must be an array"),
            None => bail!("invalid request: hashes is required"),
        }
        serde_json::from_value(body).context("invalid request")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockStatus {
    Stored,
    Duplicate,
    Skipped,
}

/// What happened to one input block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockOutcome {
    pub index: usize,
    pub status: BlockStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    /// New record id when stored, existing record id when duplicate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredEntry {
    pub id: String,
    pub preview: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateDetail {
    pub hash: String,
    pub existing_id: String,
}

/// Response of `POST /store`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreResponse {
    pub stored: usize,
    pub duplicates: usize,
    #[serde(default)]
    pub skipped: usize,
    pub total_records: usize,
    #[serde(default)]
    pub entries: Vec<StoredEntry>,
    #[serde(default)]
    pub duplicate_details: Vec<DuplicateDetail>,
    #[serde(default)]
    pub details: Vec<BlockOutcome>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashSummary {
    pub total: usize,
    pub existing: usize,
    pub new: usize,
}

/// Response of `POST /check-hashes`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckHashesResponse {
    pub hash_status: BTreeMap<String, bool>,
    pub summary: HashSummary,
}

/// The store path shared by the HTTP endpoint and in-process producers.
#[derive(Clone)]
pub struct IngestService {
    store: Arc<MemoryStore>,
}

impl IngestService {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<MemoryStore> {
        &self.store
    }

    /// Store every non-empty, non-duplicate block of a batch.
    ///
    /// A persistence failure aborts the batch with an error; blocks appended
    /// before the failure stay stored.
    pub async fn store_batch(&self, blocks: &[BlockInput], source: Source) -> Result<StoreResponse> {
        let mut response = StoreResponse::default();

        for (index, block) in blocks.iter().enumerate() {
            let content = block.content.trim();
            if content.is_empty() {
                response.skipped += 1;
                response.details.push(BlockOutcome {
                    index,
                    status: BlockStatus::Skipped,
                    hash: None,
                    id: None,
                });
                continue;
            }

            let hash = block
                .hash
                .as_deref()
                .map(str::trim)
                .filter(|h| !h.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| content_hash(content));

            if let Some(existing_id) = self.store.find_by_hash(&hash).await {
                response.record_duplicate(index, hash, existing_id);
                continue;
            }

            let record = build_record(content, source.clone(), Some(&hash));
            let id = record.id.clone();
            match self.store.append(record).await? {
                AppendOutcome::Accepted => {
                    response.stored += 1;
                    response.entries.push(StoredEntry {
                        id: id.clone(),
                        preview: preview(content),
                    });
                    response.details.push(BlockOutcome {
                        index,
                        status: BlockStatus::Stored,
                        hash: Some(hash),
                        id: Some(id),
                    });
                }
                // Another writer stored the same hash between the check and the append.
                AppendOutcome::Duplicate { existing_id } => {
                    response.record_duplicate(index, hash, existing_id);
                }
            }
        }

        response.total_records = self.store.len().await;
        tracing::info!(
            url = %source.url,
            stored = response.stored,
            duplicates = response.duplicates,
            skipped = response.skipped,
            total = response.total_records,
            "batch ingested"
        );
        Ok(response)
    }

    /// Report which of `hashes` the store already holds.
    ///
    /// Uses the same lookup as [`store_batch`](Self::store_batch), so a hash
    /// reported as existing is rejected as a duplicate if sent anyway.
    pub async fn check_hashes(&self, hashes: &[String]) -> CheckHashesResponse {
        let mut hash_status = BTreeMap::new();
        for hash in hashes {
            if hash_status.contains_key(hash) {
                continue;
            }
            let exists = self.store.hash_exists(hash).await;
            hash_status.insert(hash.clone(), exists);
        }

        let existing = hash_status.values().filter(|e| **e).count();
        let total = hash_status.len();
        CheckHashesResponse {
            hash_status,
            summary: HashSummary {
                total,
                existing,
                new: total - existing,
            },
        }
    }
}

impl StoreResponse {
    fn record_duplicate(&mut self, index: usize, hash: String, existing_id: String) {
        self.duplicates += 1;
        self.duplicate_details.push(DuplicateDetail {
            hash: hash.clone(),
            existing_id: existing_id.clone(),
        });
        self.details.push(BlockOutcome {
            index,
            status: BlockStatus::Duplicate,
            hash: Some(hash),
            id: Some(existing_id),
        });
    }
}

fn preview(content: &str) -> String {
    let mut chars = content.chars();
    let head: String = chars.by_ref().take(PREVIEW_CHARS).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}
