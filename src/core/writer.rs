//! Pending-write queue shared by every layer of an inventory
//!
//! Layers stage their changes here as [`WriteOp`]s; [`DatabaseWriter::commit`]
//! drains the queue into batches of at most [`MAX_BATCH_SIZE`] operations and
//! submits all of them concurrently. Order within the queue is never changed,
//! so the last write to a path within one commit wins.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::{Map, Value};
use thiserror::Error;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::core::store::{DocumentStore, StoreError, WriteOp, MAX_BATCH_SIZE};

/// Outcome of a successful commit
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommitReport {
    /// Operations written to the store
    pub ops: usize,
    /// Batches submitted
    pub batches: usize,
    /// Operations discarded because the writer was offline
    pub dropped: usize,
}

/// One or more batches of a commit were rejected
///
/// Batches are independent, so those that succeeded stay applied.
#[derive(Debug, Error)]
#[error("{failed} of {total} write batches failed ({applied_ops} operations applied): {first}")]
pub struct CommitError {
    pub failed: usize,
    pub total: usize,
    pub applied_ops: usize,
    #[source]
    pub first: StoreError,
}

#[derive(Default)]
struct PendingWrites {
    ops: Vec<WriteOp>,
    /// Position of the newest queued op per path
    latest: HashMap<String, usize>,
}

/// Ordered, deduplicated queue of pending writes against one store
pub struct DatabaseWriter {
    store: Arc<dyn DocumentStore>,
    pending: Mutex<PendingWrites>,
    offline: AtomicBool,
    commit_gate: tokio::sync::Mutex<()>,
}

impl DatabaseWriter {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            pending: Mutex::new(PendingWrites::default()),
            offline: AtomicBool::new(false),
            commit_gate: tokio::sync::Mutex::new(()),
        }
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    /// While offline, commits discard the queue instead of writing
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn is_offline(&self) -> bool {
        self.offline.load(Ordering::SeqCst)
    }

    /// Append an operation
    ///
    /// Returns `false` when `op` repeats the newest queued op for its path
    /// and was skipped.
    pub fn enqueue(&self, op: WriteOp) -> bool {
        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(&at) = pending.latest.get(op.path()) {
            if pending.ops[at] == op {
                return false;
            }
        }
        let at = pending.ops.len();
        pending.latest.insert(op.path().to_string(), at);
        pending.ops.push(op);
        true
    }

    pub fn set(&self, path: impl Into<String>, data: Map<String, Value>) -> bool {
        self.enqueue(WriteOp::Set {
            path: path.into(),
            data,
        })
    }

    pub fn update(&self, path: impl Into<String>, data: Map<String, Value>) -> bool {
        self.enqueue(WriteOp::Update {
            path: path.into(),
            data,
        })
    }

    pub fn delete(&self, path: impl Into<String>) -> bool {
        self.enqueue(WriteOp::Delete { path: path.into() })
    }

    /// Number of queued operations
    pub fn pending(&self) -> usize {
        self.pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .ops
            .len()
    }

    /// Copy of the queue, oldest first
    pub fn pending_ops(&self) -> Vec<WriteOp> {
        self.pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .ops
            .clone()
    }

    fn drain(&self) -> Vec<WriteOp> {
        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        pending.latest.clear();
        std::mem::take(&mut pending.ops)
    }

    /// Flush the queue to the store
    ///
    /// Commits are serialized: a second call waits for the first to finish
    /// and then flushes whatever was staged in the meantime.
    pub async fn commit(&self) -> Result<CommitReport, CommitError> {
        let _gate = self.commit_gate.lock().await;
        let ops = self.drain();
        if ops.is_empty() {
            return Ok(CommitReport::default());
        }

        if self.is_offline() {
            warn!(ops = ops.len(), "offline: discarding queued writes");
            return Ok(CommitReport {
                dropped: ops.len(),
                ..CommitReport::default()
            });
        }

        let total_ops = ops.len();
        let batches = into_batches(ops);
        let total = batches.len();
        debug!(ops = total_ops, batches = total, "submitting write batches");

        let mut tasks = JoinSet::new();
        for batch in batches {
            let store = Arc::clone(&self.store);
            let size = batch.len();
            tasks.spawn(async move { (size, store.apply_batch(batch).await) });
        }

        let mut failed = 0;
        let mut applied_ops = 0;
        let mut first_error = None;
        while let Some(joined) = tasks.join_next().await {
            let (size, result) = match joined {
                Ok(outcome) => outcome,
                Err(e) => (0, Err(StoreError::Backend(format!("batch task failed: {e}")))),
            };
            match result {
                Ok(()) => applied_ops += size,
                Err(e) => {
                    warn!(ops = size, error = %e, "write batch rejected");
                    failed += 1;
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(first) => Err(CommitError {
                failed,
                total,
                applied_ops,
                first,
            }),
            None => {
                info!(ops = total_ops, batches = total, "committed");
                Ok(CommitReport {
                    ops: total_ops,
                    batches: total,
                    dropped: 0,
                })
            }
        }
    }
}

/// Split `ops` into consecutive batches no larger than the store limit
pub fn into_batches(ops: Vec<WriteOp>) -> Vec<Vec<WriteOp>> {
    let mut batches = Vec::with_capacity(ops.len().div_ceil(MAX_BATCH_SIZE));
    let mut current = Vec::with_capacity(MAX_BATCH_SIZE.min(ops.len()));
    for op in ops {
        if current.len() == MAX_BATCH_SIZE {
            batches.push(std::mem::take(&mut current));
        }
        current.push(op);
    }
    if !current.is_empty() {
        batches.push(current);
    }
    batches
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::store::MemoryStore;

    fn delete(i: usize) -> WriteOp {
        WriteOp::Delete {
            path: format!("trays/T{i}"),
        }
    }

    #[test]
    fn test_into_batches_bound() {
        for n in [0, 1, 499, 500, 501, 1000, 1200, 1501] {
            let batches = into_batches((0..n).map(delete).collect());
            assert_eq!(batches.len(), n.div_ceil(MAX_BATCH_SIZE), "n = {n}");
            assert!(batches.iter().all(|b| b.len() <= MAX_BATCH_SIZE));
            assert_eq!(batches.iter().map(Vec::len).sum::<usize>(), n);
        }
    }

    #[test]
    fn test_into_batches_keeps_order() {
        let batches = into_batches((0..1001).map(delete).collect());
        let flat: Vec<WriteOp> = batches.into_iter().flatten().collect();
        assert_eq!(flat, (0..1001).map(delete).collect::<Vec<_>>());
    }

    #[test]
    fn test_enqueue_skips_repeat_of_latest_op_for_path() {
        let writer = DatabaseWriter::new(Arc::new(MemoryStore::new()));
        assert!(writer.delete("trays/T1"));
        assert!(!writer.delete("trays/T1"));
        assert!(writer.set("trays/T1", Map::new()));
        // delete after a set is a different op and must stay
        assert!(writer.delete("trays/T1"));
        assert_eq!(writer.pending(), 3);
    }

    #[tokio::test]
    async fn test_commit_splits_into_batches() {
        let store = Arc::new(MemoryStore::new());
        let writer = DatabaseWriter::new(store.clone());
        for i in 0..1200 {
            writer.set(format!("trays/T{i}"), Map::new());
        }

        let report = writer.commit().await.unwrap();
        assert_eq!(report.ops, 1200);
        assert_eq!(report.batches, 3);
        assert_eq!(writer.pending(), 0);

        let mut sizes = store.batch_sizes().await;
        sizes.sort_unstable();
        assert_eq!(sizes, vec![200, 500, 500]);
        assert_eq!(store.len().await, 1200);
    }

    #[tokio::test]
    async fn test_offline_commit_drops_queue() {
        let store = Arc::new(MemoryStore::new());
        let writer = DatabaseWriter::new(store.clone());
        writer.set_offline(true);
        writer.set("trays/T1", Map::new());

        let report = writer.commit().await.unwrap();
        assert_eq!(report.dropped, 1);
        assert_eq!(writer.pending(), 0);
        assert!(store.batch_sizes().await.is_empty());
    }

    #[tokio::test]
    async fn test_partial_commit_failure_reports_counts() {
        let store = Arc::new(MemoryStore::new());
        let writer = DatabaseWriter::new(store.clone());
        for i in 0..700 {
            writer.set(format!("trays/T{i}"), Map::new());
        }
        store.fail_next_batches(1);

        let err = writer.commit().await.unwrap_err();
        assert_eq!(err.failed, 1);
        assert_eq!(err.total, 2);
        assert!(err.applied_ops == 500 || err.applied_ops == 200);
        assert_eq!(store.len().await, err.applied_ops);
    }

    #[tokio::test]
    async fn test_empty_commit_is_noop() {
        let store = Arc::new(MemoryStore::new());
        let writer = DatabaseWriter::new(store.clone());
        assert_eq!(writer.commit().await.unwrap(), CommitReport::default());
        assert!(store.batch_sizes().await.is_empty());
    }
}
