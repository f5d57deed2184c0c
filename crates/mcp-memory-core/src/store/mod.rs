//! Persistence abstraction for the record list.
//!
//! A [`RecordBackend`] stores the whole record list as one unit: it is read
//! once at startup and rewritten in full after every mutation. There is no
//! incremental format. Backends must preserve element order, which is the
//! record creation order.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::Record;

/// Whole-list persistence sink.
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`read_all`](RecordBackend::read_all) | Load every persisted record, in order |
/// | [`write_all`](RecordBackend::write_all) | Replace the persisted list |
/// | [`describe`](RecordBackend::describe) | Human-readable location for logs |
#[async_trait]
pub trait RecordBackend: Send + Sync {
    /// Load the persisted list. A backend with nothing persisted yet returns
    /// an empty list; unreadable data is an error, never an empty list.
    async fn read_all(&self) -> Result<Vec<Record>>;

    /// Replace the persisted list with `records`.
    async fn write_all(&self, records: &[Record]) -> Result<()>;

    /// Where the records live, for log lines.
    fn describe(&self) -> String;
}
