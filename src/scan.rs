//! The `scan`, `resend` and `pending` commands.
//!
//! These drive a [`ScanningAgent`] from the command line. By default the
//! agent talks to the HTTP endpoint in `[agent].endpoint`; with `--local`
//! it writes straight into the store file through a [`LocalIngestClient`].
//! The capture queue at `[agent].queue_path` persists between runs.

use anyhow::Result;
use std::sync::Arc;

use crate::agent::{CaptureQueue, ScanReport, ScanningAgent};
use crate::client::{HttpIngestClient, IngestClient, LocalIngestClient};
use crate::config::Config;
use crate::ingest::IngestService;
use crate::memory_store::MemoryStore;
use crate::pages::{collect_pages, SourceOverrides};

async fn build_client(config: &Config, local: bool) -> Result<Box<dyn IngestClient>> {
    if local {
        let store = Arc::new(MemoryStore::open(config).await?);
        Ok(Box::new(LocalIngestClient::new(IngestService::new(store))))
    } else {
        Ok(Box::new(HttpIngestClient::new(
            &config.agent.endpoint,
            config.agent.timeout_secs,
        )?))
    }
}

async fn build_agent(config: &Config, local: bool) -> Result<ScanningAgent<Box<dyn IngestClient>>> {
    let client = build_client(config, local).await?;
    tracing::debug!(client = %client.describe(), "ingest client ready");
    let queue = CaptureQueue::load(&config.agent.queue_path).await?;
    Ok(ScanningAgent::new(client, queue).with_prefilter(config.agent.prefilter))
}

fn print_report(report: &ScanReport) {
    println!("  captured:   {}", report.captured);
    println!("  stored:     {}", report.stored);
    println!("  duplicates: {}", report.duplicates);
    println!("  pending:    {}", report.pending);
    if let Some(ref err) = report.error {
        println!("  error:      {}", err);
    }
}

/// Scan a file, a directory or stdin and send the captured blocks.
pub async fn run_scan(
    config: &Config,
    target: &str,
    overrides: SourceOverrides,
    local: bool,
) -> Result<()> {
    let pages = collect_pages(&config.scan, target, &overrides)?;
    let mut agent = build_agent(config, local).await?;

    let mut total = ScanReport::default();
    for page in &pages {
        let report = agent.scan_detailed(&page.text, &page.source).await;
        tracing::info!(
            url = %page.source.url,
            captured = report.captured,
            stored = report.stored,
            "page processed"
        );
        total.captured += report.captured;
        total.stored += report.stored;
        total.duplicates += report.duplicates;
        total.pending = report.pending;
        if report.error.is_some() {
            total.error = report.error;
        }
    }

    println!("Scanned {} page(s)", pages.len());
    print_report(&total);
    println!("ok");
    Ok(())
}

/// Retry every queued block the endpoint has not acknowledged.
pub async fn run_resend(config: &Config, local: bool) -> Result<()> {
    let mut agent = build_agent(config, local).await?;
    let report = agent.resend_pending().await;
    println!("Resend");
    print_report(&report);
    println!("ok");
    Ok(())
}

/// List queued blocks that have not been sent.
pub async fn run_pending(config: &Config) -> Result<()> {
    let queue = CaptureQueue::load(&config.agent.queue_path).await?;
    let pending = queue.pending();
    if pending.is_empty() {
        println!("No pending blocks.");
        return Ok(());
    }

    for (i, entry) in pending.iter().enumerate() {
        println!("{}. {} ({} words)", i + 1, entry.block.hash, entry.block.word_count);
        println!("    source: {}", entry.source.url);
        println!("    captured: {}", entry.captured_at.to_rfc3339());
        println!(
            "    excerpt: \"{}\"",
            crate::search::excerpt(&entry.block.content, 80)
        );
        println!();
    }
    println!("{} pending", pending.len());
    Ok(())
}
