//! Core module - document mapping, write queue and store backends

pub mod cancel;
pub mod config;
pub mod identity;
pub mod inventory;
pub mod layer;
pub mod path;
pub mod project;
pub mod store;
pub mod writer;

pub use cancel::{CancellationSource, CancellationToken, Navigator};
pub use config::Config;
pub use identity::{IdParseError, LayerId, LayerIdentifiers, LayerKind};
pub use inventory::{
    Inventory, InventoryError, InventoryError as Error, LoadOptions, StageOptions, StageReport,
};
pub use layer::{Layer, LayerFields, LayerNode, LayerRef, Node, Patch};
pub use path::{get_id, get_path, join_paths, normalise_path};
pub use project::{Project, ProjectError};
pub use store::{Document, DocumentStore, MemoryStore, SqliteStore, StoreError, WriteOp};
pub use writer::{CommitError, CommitReport, DatabaseWriter};
