//! In-process document store

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::Mutex;

use super::{check_batch, check_document_path, merge, Document, DocumentStore, StoreError, WriteOp};
use crate::core::path::{normalise_path, segments};

/// Document store held entirely in memory
///
/// Batches are applied atomically. Counters and failure switches let tests
/// observe and disturb the traffic the inventory produces.
#[derive(Default)]
pub struct MemoryStore {
    documents: Mutex<BTreeMap<String, Map<String, Value>>>,
    batch_sizes: Mutex<Vec<usize>>,
    pub fetch_calls: AtomicUsize,
    /// Number of upcoming batches to reject
    fail_batches: AtomicUsize,
    unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a document directly, bypassing batching
    pub async fn insert(&self, path: &str, data: Map<String, Value>) {
        self.documents
            .lock()
            .await
            .insert(normalise_path(path), data);
    }

    pub async fn document(&self, path: &str) -> Option<Map<String, Value>> {
        self.documents.lock().await.get(&normalise_path(path)).cloned()
    }

    pub async fn len(&self) -> usize {
        self.documents.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.documents.lock().await.is_empty()
    }

    /// Sizes of every batch applied or attempted, in submission order
    pub async fn batch_sizes(&self) -> Vec<usize> {
        self.batch_sizes.lock().await.clone()
    }

    /// Reject the next `count` batches
    pub fn fail_next_batches(&self, count: usize) {
        self.fail_batches.store(count, Ordering::SeqCst);
    }

    /// Make every read fail as if the network were down
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), StoreError> {
        self.fetch_calls.fetch_add(1, Ordering::Relaxed);
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store switched off".to_string()));
        }
        Ok(())
    }

    fn take_failure(&self) -> bool {
        self.fail_batches
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, path: &str) -> Result<Option<Document>, StoreError> {
        self.check_available()?;
        check_document_path(path)?;
        let path = normalise_path(path);
        Ok(self
            .documents
            .lock()
            .await
            .get(&path)
            .map(|data| Document::new(path.clone(), data.clone())))
    }

    async fn query_tagged(
        &self,
        collection: &str,
        tag: &str,
        id: &str,
    ) -> Result<Vec<Document>, StoreError> {
        self.check_available()?;
        let documents = self.documents.lock().await;
        Ok(documents
            .iter()
            .map(|(path, data)| Document::new(path.clone(), data.clone()))
            .filter(|doc| doc.collection() == collection && doc.tag(tag) == Some(id))
            .collect())
    }

    async fn list(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        self.check_available()?;
        let documents = self.documents.lock().await;
        Ok(documents
            .iter()
            .filter(|(path, _)| {
                segments(path).is_some_and(|segs| segs.len() == 1 && segs[0].0 == collection)
            })
            .map(|(path, data)| Document::new(path.clone(), data.clone()))
            .collect())
    }

    async fn apply_batch(&self, ops: Vec<WriteOp>) -> Result<(), StoreError> {
        self.batch_sizes.lock().await.push(ops.len());
        check_batch(&ops)?;
        if self.take_failure() {
            return Err(StoreError::Unavailable("batch rejected".to_string()));
        }

        let mut documents = self.documents.lock().await;
        // stage on a copy so a failing op leaves the store untouched
        let mut next = documents.clone();
        for op in ops {
            match op {
                WriteOp::Set { path, data } => {
                    next.insert(normalise_path(&path), data);
                }
                WriteOp::Update { path, data } => {
                    let path = normalise_path(&path);
                    let existing = next
                        .get_mut(&path)
                        .ok_or_else(|| StoreError::MissingDocument(path.clone()))?;
                    merge(existing, data);
                }
                WriteOp::Delete { path } => {
                    next.remove(&normalise_path(&path));
                }
            }
        }
        *documents = next;
        Ok(())
    }
}
