//! In-memory [`RecordBackend`] for tests and embedded use.
//!
//! Keeps the last written list behind a `std::sync::RwLock`. Writes can be
//! made to fail on demand to exercise rollback paths in callers.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use anyhow::{bail, Result};
use async_trait::async_trait;

use crate::models::Record;

use super::RecordBackend;

/// In-memory backend.
pub struct InMemoryBackend {
    records: RwLock<Vec<Record>>,
    fail_writes: AtomicBool,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::with_records(Vec::new())
    }

    /// Start with `records` already "persisted".
    pub fn with_records(records: Vec<Record>) -> Self {
        Self {
            records: RwLock::new(records),
            fail_writes: AtomicBool::new(false),
        }
    }

    /// Make subsequent writes fail (or succeed again).
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Snapshot of what has been persisted so far.
    pub fn persisted(&self) -> Vec<Record> {
        self.records.read().unwrap().clone()
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RecordBackend for InMemoryBackend {
    async fn read_all(&self) -> Result<Vec<Record>> {
        Ok(self.records.read().unwrap().clone())
    }

    async fn write_all(&self, records: &[Record]) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            bail!("simulated write failure");
        }
        *self.records.write().unwrap() = records.to_vec();
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
