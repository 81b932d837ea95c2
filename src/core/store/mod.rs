//! Document store contract
//!
//! The inventory talks to its database only through [`DocumentStore`]: fetch
//! one document by path, query a collection group by ancestor tag, list a
//! top-level collection, and apply an ordered batch of writes.
//!
//! Two backends ship with the crate:
//! - [`MemoryStore`] - process-local, used by tests and offline demos
//! - [`SqliteStore`] - a single SQLite file, used by the CLI

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::core::layer::LAYER_IDENTIFIERS_KEY;
use crate::core::path::{get_id, get_path, segments};

/// Hard ceiling on operations per batch imposed by the store
pub const MAX_BATCH_SIZE: usize = 500;

/// A stored document and the path it lives at
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub path: String,
    pub data: Map<String, Value>,
}

impl Document {
    pub fn new(path: impl Into<String>, data: Map<String, Value>) -> Self {
        Self {
            path: path.into(),
            data,
        }
    }

    /// The document id (last path segment)
    pub fn id(&self) -> String {
        get_id(&self.path)
    }

    /// Name of the collection this document belongs to
    pub fn collection(&self) -> String {
        get_id(&get_path(&self.path))
    }

    /// Ancestor id recorded under `layerIdentifiers[tag]`
    pub fn tag(&self, tag: &str) -> Option<&str> {
        self.data
            .get(LAYER_IDENTIFIERS_KEY)
            .and_then(|ids| ids.get(tag))
            .and_then(Value::as_str)
    }
}

/// One pending write
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    /// Create or overwrite the whole document
    Set { path: String, data: Map<String, Value> },
    /// Merge keys into an existing document
    Update { path: String, data: Map<String, Value> },
    Delete { path: String },
}

impl WriteOp {
    pub fn path(&self) -> &str {
        match self {
            WriteOp::Set { path, .. } | WriteOp::Update { path, .. } | WriteOp::Delete { path } => {
                path
            }
        }
    }
}

/// Errors raised by store backends
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("batch of {size} writes exceeds the store limit of {limit}")]
    BatchTooLarge { size: usize, limit: usize },

    #[error("cannot update missing document '{0}'")]
    MissingDocument(String),

    #[error("'{0}' is not a document path")]
    InvalidPath(String),

    #[error("document '{path}' is corrupt: {reason}")]
    Corrupt { path: String, reason: String },

    #[error("store schema version {found} is not supported (expected {expected})")]
    UnsupportedSchema { found: i32, expected: i32 },

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("store backend error: {0}")]
    Backend(String),
}

/// Collection-oriented document database
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch the document at `path`, `None` if it does not exist
    async fn get(&self, path: &str) -> Result<Option<Document>, StoreError>;

    /// Documents of every collection named `collection`, at any depth, whose
    /// `layerIdentifiers[tag]` equals `id`
    async fn query_tagged(
        &self,
        collection: &str,
        tag: &str,
        id: &str,
    ) -> Result<Vec<Document>, StoreError>;

    /// Documents directly under the top-level `collection`
    async fn list(&self, collection: &str) -> Result<Vec<Document>, StoreError>;

    /// Apply `ops` in order as one atomic batch of at most [`MAX_BATCH_SIZE`]
    async fn apply_batch(&self, ops: Vec<WriteOp>) -> Result<(), StoreError>;
}

/// Reject batches the store would refuse
pub(crate) fn check_batch(ops: &[WriteOp]) -> Result<(), StoreError> {
    if ops.len() > MAX_BATCH_SIZE {
        return Err(StoreError::BatchTooLarge {
            size: ops.len(),
            limit: MAX_BATCH_SIZE,
        });
    }
    for op in ops {
        check_document_path(op.path())?;
    }
    Ok(())
}

pub(crate) fn check_document_path(path: &str) -> Result<(), StoreError> {
    match segments(path) {
        Some(segs) if !segs.is_empty() => Ok(()),
        _ => Err(StoreError::InvalidPath(path.to_string())),
    }
}

/// Merge `patch` into `target`, key by key
pub(crate) fn merge(target: &mut Map<String, Value>, patch: Map<String, Value>) {
    for (key, value) in patch {
        target.insert(key, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(path: &str, data: Value) -> Document {
        match data {
            Value::Object(map) => Document::new(path, map),
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_document_accessors() {
        let d = doc(
            "warehouses/W1/zones/Z1",
            json!({ "layerIdentifiers": { "warehouses": "W1" } }),
        );
        assert_eq!(d.id(), "Z1");
        assert_eq!(d.collection(), "zones");
        assert_eq!(d.tag("warehouses"), Some("W1"));
        assert_eq!(d.tag("zones"), None);
    }

    #[test]
    fn test_check_batch_limits() {
        let ops: Vec<WriteOp> = (0..=MAX_BATCH_SIZE)
            .map(|i| WriteOp::Delete {
                path: format!("trays/T{i}"),
            })
            .collect();
        assert!(matches!(
            check_batch(&ops),
            Err(StoreError::BatchTooLarge { size: 501, limit: 500 })
        ));
        assert!(check_batch(&ops[..MAX_BATCH_SIZE]).is_ok());
    }

    #[test]
    fn test_check_batch_rejects_collection_paths() {
        let ops = vec![WriteOp::Delete {
            path: "warehouses".to_string(),
        }];
        assert!(matches!(check_batch(&ops), Err(StoreError::InvalidPath(_))));
    }
}
