//! The scanning agent: page text in, batches out.
//!
//! A scan extracts every delimited block from the page, fingerprints it and
//! queues the ones not seen before in a local [`CaptureQueue`]. Newly queued
//! blocks are then transmitted:
//!
//! 1. Optionally ask the endpoint which hashes it already holds
//!    (`check_hashes`). If that call fails every block is sent anyway.
//! 2. Send the rest with `store_batch`, one batch per source.
//! 3. Mark blocks as sent only after a successful response.
//!
//! Transmission failures never fail the scan: the blocks stay queued and
//! [`ScanningAgent::resend_pending`] retries them later.
//!
//! The queue's sent flags mirror what the endpoint held at send time. If the
//! store is cleared independently, previously sent blocks are not re-sent.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use mcp_memory_core::extract::{extract_blocks, word_count};
use mcp_memory_core::hash::content_hash;
use mcp_memory_core::models::{Block, Source};

use crate::client::IngestClient;
use crate::ingest::{BlockInput, SourceInput, StoreRequest};

/// A captured block waiting for, or past, transmission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedBlock {
    #[serde(flatten)]
    pub block: Block,
    pub source: Source,
    pub captured_at: DateTime<Utc>,
    pub sent: bool,
}

/// Local record of every block the agent has captured.
///
/// Optionally backed by a JSON file so pending blocks survive restarts.
#[derive(Debug, Default)]
pub struct CaptureQueue {
    entries: Vec<QueuedBlock>,
    path: Option<PathBuf>,
}

impl CaptureQueue {
    /// Queue that lives only in memory.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Load the queue at `path`. A missing file is an empty queue; an
    /// unreadable one is an error.
    pub async fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries = match tokio::fs::read_to_string(&path).await {
            Ok(content) if content.trim().is_empty() => Vec::new(),
            Ok(content) => serde_json::from_str(&content)
                .with_context(|| format!("Agent queue file is corrupt: {}", path.display()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read agent queue: {}", path.display()))
            }
        };
        Ok(Self {
            entries,
            path: Some(path),
        })
    }

    /// Persist the queue if it is file-backed.
    pub async fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let json = serde_json::to_string_pretty(&self.entries)?;
        let tmp = tmp_path(path);
        tokio::fs::write(&tmp, json)
            .await
            .with_context(|| format!("Failed to write agent queue: {}", tmp.display()))?;
        tokio::fs::rename(&tmp, path)
            .await
            .with_context(|| format!("Failed to replace agent queue: {}", path.display()))?;
        Ok(())
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn contains(&self, hash: &str) -> bool {
        self.entries.iter().any(|e| e.block.hash == hash)
    }

    pub fn is_sent(&self, hash: &str) -> bool {
        self.entries.iter().any(|e| e.block.hash == hash && e.sent)
    }

    fn push(&mut self, block: Block, source: Source) {
        self.entries.push(QueuedBlock {
            block,
            source,
            captured_at: Utc::now(),
            sent: false,
        });
    }

    fn mark_sent(&mut self, hashes: &HashSet<String>) {
        for entry in self.entries.iter_mut() {
            if hashes.contains(&entry.block.hash) {
                entry.sent = true;
            }
        }
    }

    /// Blocks not yet acknowledged by the endpoint, oldest first.
    pub fn pending(&self) -> Vec<&QueuedBlock> {
        self.entries.iter().filter(|e| !e.sent).collect()
    }

    pub fn entries(&self) -> &[QueuedBlock] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Sibling `<name>.tmp` the queue is written to before the rename.
fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "agent-queue.json".into());
    name.push(".tmp");
    path.with_file_name(name)
}

/// Outcome of one scan or resend.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanReport {
    /// Blocks captured for the first time by this scan.
    pub captured: usize,
    /// Blocks the endpoint stored.
    pub stored: usize,
    /// Blocks the endpoint already had (pre-check or store response).
    pub duplicates: usize,
    /// Blocks still waiting for transmission after this call.
    pub pending: usize,
    /// Last transmission error, if any.
    pub error: Option<String>,
}

/// Page scanner that owns its capture queue.
pub struct ScanningAgent<C: IngestClient> {
    client: C,
    queue: CaptureQueue,
    prefilter: bool,
}

impl<C: IngestClient> ScanningAgent<C> {
    pub fn new(client: C, queue: CaptureQueue) -> Self {
        Self {
            client,
            queue,
            prefilter: true,
        }
    }

    /// Enable or disable the `check_hashes` pre-filter.
    pub fn with_prefilter(mut self, prefilter: bool) -> Self {
        self.prefilter = prefilter;
        self
    }

    pub fn queue(&self) -> &CaptureQueue {
        &self.queue
    }

    /// Scan `page_text` and return how many blocks were newly captured.
    pub async fn scan(&mut self, page_text: &str, source: &Source) -> usize {
        self.scan_detailed(page_text, source).await.captured
    }

    /// Scan `page_text`, transmit the new blocks and report what happened.
    pub async fn scan_detailed(&mut self, page_text: &str, source: &Source) -> ScanReport {
        let mut fresh = Vec::new();
        for content in extract_blocks(page_text) {
            let content = content.trim();
            if content.is_empty() {
                continue;
            }
            let hash = content_hash(content);
            if self.queue.contains(&hash) {
                continue;
            }
            self.queue.push(
                Block {
                    content: content.to_string(),
                    word_count: word_count(content),
                    hash: hash.clone(),
                },
                source.clone(),
            );
            fresh.push(hash);
        }

        tracing::debug!(url = %source.url, captured = fresh.len(), "page scanned");

        let mut report = ScanReport {
            captured: fresh.len(),
            ..Default::default()
        };
        if !fresh.is_empty() {
            self.transmit(&fresh, &mut report).await;
        }
        self.finish(report).await
    }

    /// Retry every block that has not been acknowledged yet.
    pub async fn resend_pending(&mut self) -> ScanReport {
        let hashes: Vec<String> = self
            .queue
            .pending()
            .iter()
            .map(|e| e.block.hash.clone())
            .collect();

        let mut report = ScanReport::default();
        if !hashes.is_empty() {
            self.transmit(&hashes, &mut report).await;
        }
        self.finish(report).await
    }

    async fn finish(&self, mut report: ScanReport) -> ScanReport {
        report.pending = self.queue.pending().len();
        if let Err(e) = self.queue.save().await {
            tracing::warn!(error = %format!("{:#}", e), "could not persist agent queue");
        }
        report
    }

    async fn transmit(&mut self, hashes: &[String], report: &mut ScanReport) {
        let mut to_send: Vec<String> = hashes.to_vec();

        if self.prefilter {
            match self.client.check_hashes(&to_send).await {
                Ok(status) => {
                    let known: HashSet<String> = to_send
                        .iter()
                        .filter(|h| status.get(*h).copied().unwrap_or(false))
                        .cloned()
                        .collect();
                    report.duplicates += known.len();
                    self.queue.mark_sent(&known);
                    to_send.retain(|h| !known.contains(h));
                }
                Err(e) => {
                    tracing::warn!(
                        endpoint = %self.client.describe(),
                        error = %format!("{:#}", e),
                        "hash pre-check failed, sending all blocks"
                    );
                }
            }
        }

        for (source, group) in self.group_by_source(&to_send) {
            let request = StoreRequest {
                blocks: group
                    .iter()
                    .map(|b| BlockInput {
                        content: b.block.content.clone(),
                        hash: Some(b.block.hash.clone()),
                        timestamp: Some(b.captured_at.to_rfc3339()),
                        word_count: Some(b.block.word_count),
                    })
                    .collect(),
                metadata: SourceInput::from(&source),
            };
            let batch_hashes: HashSet<String> =
                group.iter().map(|b| b.block.hash.clone()).collect();

            match self.client.store_batch(&request).await {
                Ok(resp) => {
                    report.stored += resp.stored;
                    report.duplicates += resp.duplicates;
                    self.queue.mark_sent(&batch_hashes);
                    tracing::info!(
                        endpoint = %self.client.describe(),
                        stored = resp.stored,
                        duplicates = resp.duplicates,
                        "batch sent"
                    );
                }
                Err(e) => {
                    let message = format!("{:#}", e);
                    tracing::warn!(
                        endpoint = %self.client.describe(),
                        error = %message,
                        blocks = batch_hashes.len(),
                        "send failed, blocks kept for resend"
                    );
                    report.error = Some(message);
                }
            }
        }
    }

    /// Group queued blocks by source, keeping first-seen source order.
    fn group_by_source(&self, hashes: &[String]) -> Vec<(Source, Vec<QueuedBlock>)> {
        let wanted: HashSet<&String> = hashes.iter().collect();
        let mut groups: Vec<(Source, Vec<QueuedBlock>)> = Vec::new();
        for entry in self.queue.entries.iter().filter(|e| wanted.contains(&e.block.hash)) {
            match groups.iter_mut().find(|(s, _)| *s == entry.source) {
                Some((_, group)) => group.push(entry.clone()),
                None => groups.push((entry.source.clone(), vec![entry.clone()])),
            }
        }
        groups
    }
}
