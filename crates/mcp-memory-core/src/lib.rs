//! # mcp-memory core
//!
//! I/O-free logic for the capture pipeline: data models, content
//! fingerprinting, block extraction, record building, search over record
//! lists, and the persistence backend trait.
//!
//! This crate contains no tokio, filesystem or network code. The
//! application crate supplies file-backed persistence, the HTTP endpoint and
//! the scanning agent on top of it.
//!
//! ## Pipeline
//!
//! ```text
//! page text ─▶ extract::extract_blocks ─▶ hash::content_hash ─▶ record::build_record
//!                                                                    │
//!                                                search::search_records ◀─ store::RecordBackend
//! ```

pub mod extract;
pub mod hash;
pub mod models;
pub mod record;
pub mod search;
pub mod store;
