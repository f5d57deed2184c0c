//! The Memory Store: the authoritative record list.
//!
//! Records live in a `Vec` behind a single `tokio::sync::Mutex`. Every
//! operation takes the lock, so the duplicate check and the insert of an
//! append are one step and concurrent HTTP handlers cannot both admit the
//! same hash. The lock is held across the backend write.
//!
//! # Persistence
//!
//! Each mutation rewrites the full list through the [`RecordBackend`]
//! before returning. If that write fails the in-memory change is undone, so
//! memory and disk never disagree about what was accepted.

use anyhow::Result;
use tokio::sync::Mutex;

use mcp_memory_core::models::{Record, SearchCriteria, StoreStats};
use mcp_memory_core::search::{compute_stats, search_records, SearchOutcome};
use mcp_memory_core::store::RecordBackend;

use crate::config::Config;
use crate::json_store::JsonFileBackend;

/// Result of [`MemoryStore::append`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppendOutcome {
    Accepted,
    /// A record with the same content hash is already stored.
    Duplicate { existing_id: String },
}

impl AppendOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, AppendOutcome::Accepted)
    }

    /// Rejection reason, `None` when accepted.
    pub fn reason(&self) -> Option<&'static str> {
        match self {
            AppendOutcome::Accepted => None,
            AppendOutcome::Duplicate { .. } => Some("duplicate"),
        }
    }
}

/// In-memory record list with whole-list persistence.
pub struct MemoryStore {
    records: Mutex<Vec<Record>>,
    backend: Box<dyn RecordBackend>,
    default_limit: usize,
}

impl MemoryStore {
    /// Load the persisted list from `backend`.
    ///
    /// Fails when the backend holds unreadable data; nothing is discarded.
    pub async fn load(backend: Box<dyn RecordBackend>) -> Result<Self> {
        let records = backend.read_all().await?;
        tracing::info!(
            location = %backend.describe(),
            records = records.len(),
            "memory store loaded"
        );
        Ok(Self {
            records: Mutex::new(records),
            backend,
            default_limit: 50,
        })
    }

    /// Open the JSON store configured in `[store]`.
    pub async fn open(config: &Config) -> Result<Self> {
        let backend = JsonFileBackend::new(config.store.path.clone());
        let store = Self::load(Box::new(backend)).await?;
        Ok(store.with_default_limit(config.search.default_limit))
    }

    /// Limit applied when search criteria carry none.
    pub fn with_default_limit(mut self, limit: usize) -> Self {
        self.default_limit = limit.max(1);
        self
    }

    /// Insert `record` unless its content hash is already present.
    pub async fn append(&self, record: Record) -> Result<AppendOutcome> {
        let mut records = self.records.lock().await;
        if let Some(existing) = records
            .iter()
            .find(|r| r.content_hash == record.content_hash)
        {
            return Ok(AppendOutcome::Duplicate {
                existing_id: existing.id.clone(),
            });
        }

        records.push(record);
        if let Err(e) = self.backend.write_all(&records).await {
            records.pop();
            tracing::error!(error = %e, "append not persisted, rolled back");
            return Err(e);
        }
        Ok(AppendOutcome::Accepted)
    }

    /// Whether any current record has `hash`.
    pub async fn hash_exists(&self, hash: &str) -> bool {
        self.find_by_hash(hash).await.is_some()
    }

    /// Id of the record holding `hash`, if any.
    pub async fn find_by_hash(&self, hash: &str) -> Option<String> {
        let records = self.records.lock().await;
        records
            .iter()
            .find(|r| r.content_hash == hash)
            .map(|r| r.id.clone())
    }

    pub async fn search(&self, criteria: &SearchCriteria) -> SearchOutcome {
        let records = self.records.lock().await;
        search_records(&records, criteria, self.default_limit)
    }

    pub async fn get(&self, id: &str) -> Option<Record> {
        let records = self.records.lock().await;
        records.iter().find(|r| r.id == id).cloned()
    }

    /// Remove the record with `id`. Returns `false` when there is none.
    pub async fn delete(&self, id: &str) -> Result<bool> {
        let mut records = self.records.lock().await;
        let Some(index) = records.iter().position(|r| r.id == id) else {
            return Ok(false);
        };

        let removed = records.remove(index);
        if let Err(e) = self.backend.write_all(&records).await {
            records.insert(index, removed);
            tracing::error!(error = %e, id, "delete not persisted, rolled back");
            return Err(e);
        }
        Ok(true)
    }

    /// Remove every record and return how many were removed.
    pub async fn clear(&self) -> Result<usize> {
        let mut records = self.records.lock().await;
        let previous = std::mem::take(&mut *records);
        if let Err(e) = self.backend.write_all(&records).await {
            *records = previous;
            tracing::error!(error = %e, "clear not persisted, rolled back");
            return Err(e);
        }
        Ok(previous.len())
    }

    pub async fn stats(&self) -> StoreStats {
        let records = self.records.lock().await;
        compute_stats(&records)
    }

    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Every record in insertion order.
    pub async fn all(&self) -> Vec<Record> {
        self.records.lock().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcp_memory_core::models::Source;
    use mcp_memory_core::record::build_record;
    use mcp_memory_core::store::memory::InMemoryBackend;
    use std::sync::Arc;
    use tempfile::TempDir;

    /// Lets a test keep a handle on the backend the store owns.
    struct SharedBackend(Arc<InMemoryBackend>);

    #[async_trait::async_trait]
    impl RecordBackend for SharedBackend {
        async fn read_all(&self) -> Result<Vec<Record>> {
            self.0.read_all().await
        }
        async fn write_all(&self, records: &[Record]) -> Result<()> {
            self.0.write_all(records).await
        }
        fn describe(&self) -> String {
            self.0.describe()
        }
    }

    async fn memory_store() -> (MemoryStore, Arc<InMemoryBackend>) {
        let backend = Arc::new(InMemoryBackend::new());
        let store = MemoryStore::load(Box::new(SharedBackend(backend.clone())))
            .await
            .unwrap();
        (store, backend)
    }

    fn record(content: &str) -> Record {
        build_record(content.trim(), Source::default(), None)
    }

    #[tokio::test]
    async fn test_append_rejects_duplicate_trimmed_content() {
        let (store, backend) = memory_store().await;

        let first = record("same text");
        let first_id = first.id.clone();
        assert_eq!(store.append(first).await.unwrap(), AppendOutcome::Accepted);

        let outcome = store.append(record("   same text \n")).await.unwrap();
        assert!(!outcome.is_accepted());
        assert_eq!(outcome.reason(), Some("duplicate"));
        assert_eq!(
            outcome,
            AppendOutcome::Duplicate {
                existing_id: first_id
            }
        );
        assert_eq!(store.len().await, 1);
        assert_eq!(backend.persisted().len(), 1);
    }

    #[tokio::test]
    async fn test_hash_exists_tracks_current_state() {
        let (store, _) = memory_store().await;
        let r = record("tracked");
        let hash = r.content_hash.clone();
        let id = r.id.clone();

        assert!(!store.hash_exists(&hash).await);
        store.append(r).await.unwrap();
        assert!(store.hash_exists(&hash).await);
        assert_eq!(store.find_by_hash(&hash).await, Some(id.clone()));

        assert!(store.delete(&id).await.unwrap());
        assert!(!store.hash_exists(&hash).await);
    }

    #[tokio::test]
    async fn test_get_and_delete() {
        let (store, backend) = memory_store().await;
        let r = record("to delete");
        let id = r.id.clone();
        store.append(r).await.unwrap();

        assert_eq!(store.get(&id).await.unwrap().content, "to delete");
        assert!(store.get("missing").await.is_none());

        assert!(!store.delete("missing").await.unwrap());
        assert!(store.delete(&id).await.unwrap());
        assert!(store.get(&id).await.is_none());
        assert!(backend.persisted().is_empty());
    }

    #[tokio::test]
    async fn test_clear_returns_count() {
        let (store, backend) = memory_store().await;
        for text in ["a", "b", "c"] {
            store.append(record(text)).await.unwrap();
        }
        assert_eq!(store.clear().await.unwrap(), 3);
        assert!(store.is_empty().await);
        assert!(backend.persisted().is_empty());
        assert_eq!(store.clear().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_failed_write_rolls_back_append() {
        let (store, backend) = memory_store().await;
        backend.set_fail_writes(true);

        let r = record("not persisted");
        let hash = r.content_hash.clone();
        assert!(store.append(r).await.is_err());
        assert_eq!(store.len().await, 0);
        assert!(!store.hash_exists(&hash).await);
    }

    #[tokio::test]
    async fn test_failed_write_rolls_back_delete_and_clear() {
        let (store, backend) = memory_store().await;
        for text in ["x", "y", "z"] {
            store.append(record(text)).await.unwrap();
        }
        let order: Vec<String> = store.all().await.into_iter().map(|r| r.id).collect();

        backend.set_fail_writes(true);
        assert!(store.delete(&order[1]).await.is_err());
        assert!(store.clear().await.is_err());

        let after: Vec<String> = store.all().await.into_iter().map(|r| r.id).collect();
        assert_eq!(after, order);
    }

    #[tokio::test]
    async fn test_stats_reflect_current_state() {
        let (store, _) = memory_store().await;
        store.append(record("one two #alpha")).await.unwrap();
        store.append(record("three TODO")).await.unwrap();

        let stats = store.stats().await;
        assert_eq!(stats.total_records, 2);
        assert_eq!(stats.total_words, 5);
        assert_eq!(stats.unique_tags, 2);

        store.clear().await.unwrap();
        assert_eq!(store.stats().await.total_records, 0);
    }

    #[tokio::test]
    async fn test_search_by_tag() {
        let (store, _) = memory_store().await;
        store.append(record("function alpha() {}")).await.unwrap();
        store.append(record("TODO write docs")).await.unwrap();

        let outcome = store
            .search(&SearchCriteria {
                tags: vec!["code".to_string()],
                ..Default::default()
            })
            .await;
        assert_eq!(outcome.results.len(), 1);
        assert_eq!(outcome.results[0].content, "function alpha() {}");
    }

    #[tokio::test]
    async fn test_default_limit_applies() {
        let (store, _) = memory_store().await;
        let store = store.with_default_limit(2);
        for i in 0..5 {
            store.append(record(&format!("entry {}", i))).await.unwrap();
        }
        let outcome = store.search(&SearchCriteria::default()).await;
        assert_eq!(outcome.results.len(), 2);
        assert_eq!(outcome.filtered, 5);
    }

    #[tokio::test]
    async fn test_reload_from_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("memories.json");

        let store = MemoryStore::load(Box::new(JsonFileBackend::new(&path)))
            .await
            .unwrap();
        for i in 0..4 {
            store.append(record(&format!("record {}", i))).await.unwrap();
        }
        drop(store);

        let reloaded = MemoryStore::load(Box::new(JsonFileBackend::new(&path)))
            .await
            .unwrap();
        assert_eq!(reloaded.stats().await.total_records, 4);
        let contents: Vec<String> = reloaded.all().await.into_iter().map(|r| r.content).collect();
        assert_eq!(contents, vec!["record 0", "record 1", "record 2", "record 3"]);
    }

    #[tokio::test]
    async fn test_corrupt_file_fails_load() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("memories.json");
        std::fs::write(&path, "{ definitely not an array").unwrap();

        let result = MemoryStore::load(Box::new(JsonFileBackend::new(&path))).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_concurrent_appends_admit_one() {
        let (store, _) = memory_store().await;
        let store = Arc::new(store);

        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.append(record("racing content")).await.unwrap()
            }));
        }
        let mut accepted = 0;
        for h in handles {
            if h.await.unwrap().is_accepted() {
                accepted += 1;
            }
        }
        assert_eq!(accepted, 1);
        assert_eq!(store.len().await, 1);
    }
}
