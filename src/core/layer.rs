//! Layer taxonomy - the closed set of hierarchy nodes and their field patches
//!
//! Every level of the hierarchy is a [`Node<F>`] whose `F` is the level's
//! field struct. Nodes live in the [`Inventory`](crate::core::Inventory)
//! arena as [`LayerNode`] variants and refer to each other by [`LayerId`].
//!
//! Dirtiness is never tracked by setters. A node keeps the snapshot it was
//! last saved with, and the pending change is always
//! `Patch::between(saved, fields)`.

use chrono::{DateTime, TimeZone, Utc};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::core::identity::{LayerId, LayerIdentifiers, LayerKind};
use crate::entities::{BayFields, ColumnFields, ShelfFields, TrayFields, WarehouseFields, ZoneFields};

/// Document key holding the last modification time (epoch millis)
pub const LAST_MODIFIED_KEY: &str = "lastModified";

/// Document key holding the id of the user who last wrote the document
pub const BLAME_KEY: &str = "blame";

/// Document key holding the ancestor id map
pub const LAYER_IDENTIFIERS_KEY: &str = "layerIdentifiers";

/// Field set of one hierarchy level
pub trait LayerFields:
    Serialize + DeserializeOwned + Clone + PartialEq + Default + fmt::Debug + Send + Sync + 'static
{
    /// The level these fields belong to
    const KIND: LayerKind;

    /// Ordering among siblings: `(index, name)`
    fn sort_key(&self) -> (u32, String);

    fn wrap(node: Node<Self>) -> LayerNode;

    fn peel(node: &LayerNode) -> Option<&Node<Self>>;

    fn peel_mut(node: &mut LayerNode) -> Option<&mut Node<Self>>;
}

/// Changed fields between two snapshots, as document values
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Patch(Map<String, Value>);

impl Patch {
    /// Diff `current` against the last saved snapshot
    ///
    /// With no snapshot every field is part of the patch.
    pub fn between<F: Serialize>(saved: Option<&F>, current: &F) -> Result<Self, serde_json::Error> {
        let current = to_map(current)?;
        let Some(saved) = saved else {
            return Ok(Self(current));
        };
        let saved = to_map(saved)?;

        let mut changed = Map::new();
        for key in saved.keys() {
            if !current.contains_key(key) {
                changed.insert(key.clone(), Value::Null);
            }
        }
        for (key, value) in current {
            if saved.get(&key) != Some(&value) {
                changed.insert(key, value);
            }
        }
        Ok(Self(changed))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }
}

/// Serialize a field struct into a document map
pub fn to_map<F: Serialize>(fields: &F) -> Result<Map<String, Value>, serde_json::Error> {
    match serde_json::to_value(fields)? {
        Value::Object(map) => Ok(map),
        other => {
            let mut map = Map::new();
            map.insert("value".to_string(), other);
            Ok(map)
        }
    }
}

/// Bookkeeping shared by every node regardless of level
#[derive(Debug, Clone)]
pub struct NodeMeta {
    pub(crate) id: LayerId,
    pub(crate) parent: Option<LayerId>,
    pub(crate) children: Vec<LayerId>,
    pub(crate) loaded: bool,
    pub(crate) children_loaded: bool,
    pub(crate) last_modified: Option<DateTime<Utc>>,
    pub(crate) blame: Option<String>,
}

impl NodeMeta {
    pub(crate) fn new(id: LayerId, parent: Option<LayerId>) -> Self {
        Self {
            id,
            parent,
            children: Vec::new(),
            loaded: false,
            children_loaded: false,
            last_modified: None,
            blame: None,
        }
    }
}

/// One layer of the hierarchy with its current and last-saved fields
#[derive(Debug, Clone)]
pub struct Node<F> {
    pub(crate) meta: NodeMeta,
    pub(crate) fields: F,
    pub(crate) saved: Option<F>,
}

impl<F: LayerFields> Node<F> {
    /// A fresh, never-saved node
    pub(crate) fn fresh(id: LayerId, parent: Option<LayerId>, fields: F) -> Self {
        let mut meta = NodeMeta::new(id, parent);
        // nothing remote to fetch for a node that only exists locally
        meta.loaded = true;
        meta.children_loaded = true;
        Self {
            meta,
            fields,
            saved: None,
        }
    }

    /// A node hydrated from a stored document
    pub(crate) fn hydrated(
        id: LayerId,
        parent: Option<LayerId>,
        document: HydratedDocument<F>,
    ) -> Self {
        let mut meta = NodeMeta::new(id, parent);
        meta.loaded = true;
        meta.last_modified = document.last_modified;
        meta.blame = document.blame;
        Self {
            meta,
            saved: Some(document.fields.clone()),
            fields: document.fields,
        }
    }

    pub fn id(&self) -> &LayerId {
        &self.meta.id
    }

    pub fn fields(&self) -> &F {
        &self.fields
    }

    /// Snapshot the node was last loaded or saved with
    pub fn saved(&self) -> Option<&F> {
        self.saved.as_ref()
    }

    /// Pending changes relative to the last saved snapshot
    pub fn patch(&self) -> Result<Patch, serde_json::Error> {
        Patch::between(self.saved.as_ref(), &self.fields)
    }

    /// Replace the fields with `f(current)` and return the resulting patch
    pub(crate) fn apply<M>(&mut self, mutate: M) -> Result<Patch, serde_json::Error>
    where
        M: FnOnce(F) -> F,
    {
        let current = std::mem::take(&mut self.fields);
        self.fields = mutate(current);
        self.patch()
    }

    pub(crate) fn mark_saved(&mut self, at: DateTime<Utc>, blame: &str) {
        self.saved = Some(self.fields.clone());
        self.meta.last_modified = Some(at);
        self.meta.blame = Some(blame.to_string());
    }

    pub(crate) fn rehydrate(&mut self, document: HydratedDocument<F>) {
        self.saved = Some(document.fields.clone());
        self.fields = document.fields;
        self.meta.last_modified = document.last_modified;
        self.meta.blame = document.blame;
        self.meta.loaded = true;
    }
}

/// Read-only view over any node, independent of its field type
pub trait Layer {
    fn id(&self) -> &LayerId;
    fn kind(&self) -> LayerKind;
    fn parent_id(&self) -> Option<&LayerId>;
    fn children(&self) -> &[LayerId];
    fn is_loaded(&self) -> bool;
    fn children_loaded(&self) -> bool;
    fn last_modified(&self) -> Option<DateTime<Utc>>;
    fn blame(&self) -> Option<&str>;
    /// Never saved to the store
    fn is_new(&self) -> bool;
    fn is_dirty(&self) -> bool;
    fn sort_key(&self) -> (u32, String);
    fn fields_map(&self) -> Result<Map<String, Value>, serde_json::Error>;
    fn pending_patch(&self) -> Result<Patch, serde_json::Error>;
}

impl<F: LayerFields> Layer for Node<F> {
    fn id(&self) -> &LayerId {
        &self.meta.id
    }

    fn kind(&self) -> LayerKind {
        F::KIND
    }

    fn parent_id(&self) -> Option<&LayerId> {
        self.meta.parent.as_ref()
    }

    fn children(&self) -> &[LayerId] {
        &self.meta.children
    }

    fn is_loaded(&self) -> bool {
        self.meta.loaded
    }

    fn children_loaded(&self) -> bool {
        self.meta.children_loaded
    }

    fn last_modified(&self) -> Option<DateTime<Utc>> {
        self.meta.last_modified
    }

    fn blame(&self) -> Option<&str> {
        self.meta.blame.as_deref()
    }

    fn is_new(&self) -> bool {
        self.saved.is_none()
    }

    fn is_dirty(&self) -> bool {
        match &self.saved {
            None => true,
            Some(saved) => saved != &self.fields,
        }
    }

    fn sort_key(&self) -> (u32, String) {
        self.fields.sort_key()
    }

    fn fields_map(&self) -> Result<Map<String, Value>, serde_json::Error> {
        to_map(&self.fields)
    }

    fn pending_patch(&self) -> Result<Patch, serde_json::Error> {
        self.patch()
    }
}

/// Arena entry: one node of any level
#[derive(Debug, Clone)]
pub enum LayerNode {
    Warehouse(Node<WarehouseFields>),
    Zone(Node<ZoneFields>),
    Bay(Node<BayFields>),
    Shelf(Node<ShelfFields>),
    Column(Node<ColumnFields>),
    Tray(Node<TrayFields>),
}

macro_rules! each_node {
    ($value:expr, $node:ident => $body:expr) => {
        match $value {
            LayerNode::Warehouse($node) => $body,
            LayerNode::Zone($node) => $body,
            LayerNode::Bay($node) => $body,
            LayerNode::Shelf($node) => $body,
            LayerNode::Column($node) => $body,
            LayerNode::Tray($node) => $body,
        }
    };
}

impl LayerNode {
    pub fn layer(&self) -> &dyn Layer {
        each_node!(self, node => node)
    }

    pub(crate) fn meta(&self) -> &NodeMeta {
        each_node!(self, node => &node.meta)
    }

    pub(crate) fn meta_mut(&mut self) -> &mut NodeMeta {
        each_node!(self, node => &mut node.meta)
    }

    pub fn kind(&self) -> LayerKind {
        self.layer().kind()
    }

    pub(crate) fn mark_saved(&mut self, at: DateTime<Utc>, blame: &str) {
        each_node!(self, node => node.mark_saved(at, blame))
    }
}

/// Fields and bookkeeping pulled out of a stored document
#[derive(Debug, Clone)]
pub struct HydratedDocument<F> {
    pub fields: F,
    pub last_modified: Option<DateTime<Utc>>,
    pub blame: Option<String>,
    pub identifiers: LayerIdentifiers,
}

/// Split a stored document into bookkeeping keys and typed fields
pub fn hydrate<F: LayerFields>(mut data: Map<String, Value>) -> Result<HydratedDocument<F>, serde_json::Error> {
    let last_modified = data
        .remove(LAST_MODIFIED_KEY)
        .and_then(|v| v.as_i64())
        .and_then(|ms| Utc.timestamp_millis_opt(ms).single());
    let blame = data
        .remove(BLAME_KEY)
        .and_then(|v| v.as_str().map(str::to_string));
    let identifiers = match data.remove(LAYER_IDENTIFIERS_KEY) {
        Some(value) => serde_json::from_value(value)?,
        None => LayerIdentifiers::default(),
    };
    let fields = serde_json::from_value(Value::Object(data))?;
    Ok(HydratedDocument {
        fields,
        last_modified,
        blame,
        identifiers,
    })
}

/// Reference to a node: its level and id
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LayerRef {
    pub kind: LayerKind,
    pub id: LayerId,
}

impl LayerRef {
    pub fn new(kind: LayerKind, id: LayerId) -> Self {
        Self { kind, id }
    }
}

impl fmt::Display for LayerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.id)
    }
}
