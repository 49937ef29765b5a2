//! In-process document store.
//!
//! Used for local development (`DOCUMENT_STORE=memory`) and tests. Documents
//! are kept per collection in insertion order, which is the order queries
//! return them in.

use super::{check_collection, DocumentStore, Filter, Record, Result, StorageError, StoredDocument};
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tracing::debug;
use uuid::Uuid;

#[derive(Default)]
pub struct MemoryStore {
    collections: DashMap<String, Vec<StoredDocument>>,
    unavailable: AtomicBool,
    operations: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail as if the store could not be reached
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::Relaxed);
    }

    /// Number of insert/query calls that reached the store
    pub fn operations(&self) -> usize {
        self.operations.load(Ordering::Relaxed)
    }

    /// Number of documents held in `collection`
    pub fn count(&self, collection: &str) -> usize {
        self.collections.get(collection).map(|docs| docs.len()).unwrap_or(0)
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::Relaxed) {
            return Err(StorageError::Unavailable {
                cause: "memory store marked unavailable".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn insert(&self, collection: &str, record: Record) -> Result<String> {
        self.operations.fetch_add(1, Ordering::Relaxed);
        self.check_available()?;
        check_collection(collection)?;

        let id = Uuid::new_v4().to_string();
        let doc = StoredDocument::new(id.clone(), record, Utc::now());

        self.collections
            .entry(collection.to_string())
            .or_default()
            .push(doc);

        debug!("Stored document {} in memory collection {}", id, collection);
        Ok(id)
    }

    async fn query(&self, collection: &str, filter: &Filter, limit: usize) -> Result<Vec<Record>> {
        self.operations.fetch_add(1, Ordering::Relaxed);
        self.check_available()?;
        check_collection(collection)?;

        let Some(docs) = self.collections.get(collection) else {
            return Ok(Vec::new());
        };

        Ok(docs
            .iter()
            .filter(|doc| filter.matches(&doc.fields))
            .take(limit)
            .cloned()
            .map(StoredDocument::into_record)
            .collect())
    }

    async fn ping(&self) -> Result<()> {
        self.check_available()
    }

    async fn list_collections(&self) -> Result<Vec<String>> {
        self.check_available()?;
        let mut names: Vec<String> = self.collections.iter().map(|e| e.key().clone()).collect();
        names.sort();
        Ok(names)
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
