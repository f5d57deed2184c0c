//! # MCP Memory
//!
//! Capture delimited "memory" blocks from AI chat pages and keep them in a
//! deduplicated, searchable local store.
//!
//! Blocks are written between `[MCP-START]` and `[MCP-END]` marker lines.
//! A scanning agent extracts them, fingerprints each one and sends batches
//! to an ingestion service, which tags them and appends them to a JSON file
//! backed store. Records are queried over HTTP or from the CLI.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌─────────────┐   ┌──────────────┐
//! │ Page text   │──▶│   Agent     │──▶│  Ingestion   │
//! │ file/stdin  │   │ queue+hash  │   │ tag+dedupe   │
//! └─────────────┘   └─────────────┘   └──────┬───────┘
//!                                            ▼
//!                   ┌──────────┐      ┌──────────────┐
//!                   │   CLI    │◀────▶│ Memory Store │
//!                   │  (mcpm)  │      │  JSON file   │
//!                   └──────────┘      └──────┬───────┘
//!                                            ▼
//!                                     ┌──────────────┐
//!                                     │  HTTP API    │
//!                                     └──────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! mcpm serve                          # start the HTTP service
//! mcpm scan ./chat-export.html        # capture blocks and send them
//! mcpm search "deploy" --tags code    # query stored records
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`agent`] | Scanning agent and its persistent capture queue |
//! | [`client`] | Ingestion transports (HTTP and in-process) |
//! | [`config`] | TOML configuration parsing |
//! | [`ingest`] | Batch ingestion and hash pre-check |
//! | [`json_store`] | JSON file persistence backend |
//! | [`memory_store`] | The authoritative record list |
//! | [`pages`] | Page text sources for scanning |
//! | [`server`] | HTTP API |
//!
//! Extraction, hashing, tagging and search live in the `mcp-memory-core`
//! crate.

pub mod agent;
pub mod client;
pub mod config;
pub mod export;
pub mod get;
pub mod ingest;
pub mod json_store;
pub mod logging;
pub mod memory_store;
pub mod pages;
pub mod scan;
pub mod search;
pub mod server;
pub mod stats;
