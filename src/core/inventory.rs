//! The loaded part of a warehouse hierarchy and its mapping onto documents
//!
//! An [`Inventory`] is an arena of [`LayerNode`]s keyed by [`LayerId`]. Nodes
//! point at their parent by id; the arena resolves ancestors, so document
//! paths and `layerIdentifiers` are always derived, never stored.
//!
//! Loading is level by level: a node's own document first, then (when asked)
//! one query per node for the next level down, so callers bound network
//! traffic by choosing how deep to go. Saving never writes directly; it stages
//! operations on the shared [`DatabaseWriter`] which a commit flushes.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use chrono::Utc;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

use crate::core::cancel::CancellationToken;
use crate::core::identity::{IdParseError, LayerId, LayerIdentifiers, LayerKind};
use crate::core::layer::{
    hydrate, Layer, LayerFields, LayerNode, LayerRef, Node, Patch, BLAME_KEY,
    LAST_MODIFIED_KEY, LAYER_IDENTIFIERS_KEY,
};
use crate::core::path::{join_paths, segments};
use crate::core::store::{DocumentStore, StoreError};
use crate::core::writer::{CommitError, CommitReport, DatabaseWriter};
use crate::entities::{
    BayFields, Category, ColumnFields, ShelfFields, TrayFields, WarehouseFields, ZoneFields,
};

/// Errors surfaced by inventory operations
#[derive(Debug, Error)]
pub enum InventoryError {
    /// A fetch failed or returned a missing or malformed document
    #[error("failed to load '{path}': {reason}")]
    Load { path: String, reason: String },

    #[error(transparent)]
    Commit(#[from] CommitError),

    /// The navigation that issued the load was superseded
    #[error("load cancelled by a newer navigation")]
    Cancelled,

    #[error("no layer with id '{0}' is loaded")]
    UnknownLayer(LayerId),

    #[error("'{0}' is not a valid layer path")]
    InvalidPath(String),

    /// Ordered children need their siblings loaded to pick an index
    #[error("children of '{0}' are not loaded; load them before adding another")]
    ChildrenNotLoaded(LayerId),

    #[error("a {child} cannot be placed under a {parent}")]
    InvalidParent { parent: LayerKind, child: LayerKind },

    #[error("layer '{id}' is a {actual}, expected a {expected}")]
    WrongKind {
        id: LayerId,
        expected: LayerKind,
        actual: LayerKind,
    },

    #[error("could not encode fields of '{path}': {source}")]
    Encode {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    InvalidId(#[from] IdParseError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl InventoryError {
    /// Cancellation is a silent no-op for callers, not a failure
    pub fn is_cancelled(&self) -> bool {
        matches!(self, InventoryError::Cancelled)
    }
}

pub type Result<T> = std::result::Result<T, InventoryError>;

/// How far and how eagerly to load
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadOptions {
    /// Refetch even if already loaded
    pub force: bool,
    /// Load descendants level by level down to and including this kind
    pub recurse_to: Option<LayerKind>,
}

impl LoadOptions {
    /// Only the layer's own document
    pub fn shallow() -> Self {
        Self::default()
    }

    /// The layer and every level below it down to `kind`
    pub fn deep(kind: LayerKind) -> Self {
        Self {
            force: false,
            recurse_to: Some(kind),
        }
    }

    pub fn forced(mut self) -> Self {
        self.force = true;
        self
    }
}

/// How far to stage and whether to flush afterwards
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageOptions {
    /// Write every field, even unchanged ones
    pub force: bool,
    /// Commit the shared queue once staging is done
    pub commit: bool,
    /// Stage descendants down to and including this kind
    pub min_layer: Option<LayerKind>,
}

impl StageOptions {
    pub fn recursive(min_layer: LayerKind) -> Self {
        Self {
            min_layer: Some(min_layer),
            ..Self::default()
        }
    }

    pub fn and_commit(mut self) -> Self {
        self.commit = true;
        self
    }

    pub fn forced(mut self) -> Self {
        self.force = true;
        self
    }
}

/// What a stage call did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageReport {
    /// Layers that produced a write
    pub staged: usize,
    /// Present when the call also committed
    pub commit: Option<CommitReport>,
}

/// Run `$body` with `$f` bound to the field type of `$kind`
macro_rules! for_kind {
    ($kind:expr, $f:ident => $body:expr) => {
        match $kind {
            LayerKind::Warehouse => {
                type $f = WarehouseFields;
                $body
            }
            LayerKind::Zone => {
                type $f = ZoneFields;
                $body
            }
            LayerKind::Bay => {
                type $f = BayFields;
                $body
            }
            LayerKind::Shelf => {
                type $f = ShelfFields;
                $body
            }
            LayerKind::Column => {
                type $f = ColumnFields;
                $body
            }
            LayerKind::Tray => {
                type $f = TrayFields;
                $body
            }
        }
    };
}

/// Loaded hierarchy plus the store and write queue behind it
pub struct Inventory {
    nodes: HashMap<LayerId, LayerNode>,
    warehouses: Vec<LayerId>,
    writer: Arc<DatabaseWriter>,
    user: String,
    offline: bool,
}

impl Inventory {
    pub fn new(store: Arc<dyn DocumentStore>, user: impl Into<String>) -> Self {
        Self::with_writer(Arc::new(DatabaseWriter::new(store)), user)
    }

    /// Share a write queue with other inventories
    pub fn with_writer(writer: Arc<DatabaseWriter>, user: impl Into<String>) -> Self {
        Self {
            nodes: HashMap::new(),
            warehouses: Vec::new(),
            offline: writer.is_offline(),
            writer,
            user: user.into(),
        }
    }

    /// Offline inventories never fetch and discard commits
    pub fn set_offline(&mut self, offline: bool) {
        self.offline = offline;
        self.writer.set_offline(offline);
    }

    pub fn is_offline(&self) -> bool {
        self.offline
    }

    pub fn writer(&self) -> &Arc<DatabaseWriter> {
        &self.writer
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    // =====================================================================
    // Lookup
    // =====================================================================

    pub fn node(&self, id: &LayerId) -> Option<&LayerNode> {
        self.nodes.get(id)
    }

    pub fn layer(&self, id: &LayerId) -> Option<&dyn Layer> {
        self.nodes.get(id).map(LayerNode::layer)
    }

    pub fn contains(&self, id: &LayerId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Typed access to a node
    pub fn get<F: LayerFields>(&self, id: &LayerId) -> Option<&Node<F>> {
        self.nodes.get(id).and_then(F::peel)
    }

    pub fn fields<F: LayerFields>(&self, id: &LayerId) -> Option<&F> {
        self.get::<F>(id).map(Node::fields)
    }

    fn node_of(&self, id: &LayerId) -> Result<&LayerNode> {
        self.nodes
            .get(id)
            .ok_or_else(|| InventoryError::UnknownLayer(id.clone()))
    }

    fn typed_mut<F: LayerFields>(&mut self, id: &LayerId) -> Result<&mut Node<F>> {
        let node = self
            .nodes
            .get_mut(id)
            .ok_or_else(|| InventoryError::UnknownLayer(id.clone()))?;
        let actual = node.kind();
        F::peel_mut(node).ok_or_else(|| InventoryError::WrongKind {
            id: id.clone(),
            expected: F::KIND,
            actual,
        })
    }

    /// Loaded warehouses in load order
    pub fn warehouses(&self) -> &[LayerId] {
        &self.warehouses
    }

    pub fn children(&self, id: &LayerId) -> &[LayerId] {
        self.nodes
            .get(id)
            .map(|node| node.meta().children.as_slice())
            .unwrap_or(&[])
    }

    pub fn parent(&self, id: &LayerId) -> Option<&LayerId> {
        self.nodes.get(id).and_then(|node| node.meta().parent.as_ref())
    }

    /// The node and its ancestors, nearest first
    pub fn ancestry(&self, id: &LayerId) -> Result<Vec<LayerRef>> {
        let mut chain = Vec::new();
        let mut cursor = Some(id.clone());
        while let Some(current) = cursor {
            let node = self.node_of(&current)?;
            cursor = node.meta().parent.clone();
            chain.push(LayerRef::new(node.kind(), current));
        }
        Ok(chain)
    }

    /// Nested document path, e.g. `warehouses/W/zones/Z`
    pub fn path(&self, id: &LayerId) -> Result<String> {
        let chain = self.ancestry(id)?;
        Ok(join_paths(chain.iter().rev().flat_map(|layer| {
            [layer.kind.collection().to_string(), layer.id.to_string()]
        })))
    }

    /// Path of the collection holding this layer's children
    pub fn child_collection_path(&self, id: &LayerId) -> Result<Option<String>> {
        let kind = self.node_of(id)?.kind();
        let Some(child) = kind.child() else {
            return Ok(None);
        };
        let path = self.path(id)?;
        Ok(Some(join_paths([path.as_str(), child.collection()])))
    }

    /// Ancestor ids keyed by collection name (the layer itself excluded)
    pub fn layer_identifiers(&self, id: &LayerId) -> Result<LayerIdentifiers> {
        let mut identifiers = LayerIdentifiers::new();
        for ancestor in self.ancestry(id)?.into_iter().skip(1) {
            identifiers.insert(ancestor.kind, ancestor.id);
        }
        Ok(identifiers)
    }

    /// Look up a category defined on a warehouse
    pub fn category_by_id(&self, warehouse: &LayerId, category: &LayerId) -> Option<&Category> {
        self.fields::<WarehouseFields>(warehouse)
            .and_then(|fields| fields.category(category))
    }

    /// The warehouse a layer belongs to
    pub fn warehouse_of(&self, id: &LayerId) -> Option<LayerId> {
        self.ancestry(id)
            .ok()
            .and_then(|chain| chain.last().map(|top| top.id.clone()))
    }

    // =====================================================================
    // Creation & mutation
    // =====================================================================

    /// Add a new, unsaved warehouse
    pub fn create_warehouse(&mut self, fields: WarehouseFields) -> LayerId {
        let id = LayerId::new();
        self.nodes.insert(
            id.clone(),
            WarehouseFields::wrap(Node::fresh(id.clone(), None, fields)),
        );
        self.warehouses.push(id.clone());
        id
    }

    /// Add a new, unsaved child at the end of `parent`'s children
    pub fn create_child<F: LayerFields>(&mut self, parent: &LayerId, fields: F) -> Result<LayerId> {
        let parent_kind = self.node_of(parent)?.kind();
        if F::KIND.parent() != Some(parent_kind) {
            return Err(InventoryError::InvalidParent {
                parent: parent_kind,
                child: F::KIND,
            });
        }
        let id = LayerId::new();
        self.nodes.insert(
            id.clone(),
            F::wrap(Node::fresh(id.clone(), Some(parent.clone()), fields)),
        );
        if let Some(node) = self.nodes.get_mut(parent) {
            node.meta_mut().children.push(id.clone());
        }
        Ok(id)
    }

    fn next_index(&self, parent: &LayerId) -> Result<u32> {
        if !self.node_of(parent)?.meta().children_loaded {
            return Err(InventoryError::ChildrenNotLoaded(parent.clone()));
        }
        Ok(self.children(parent).len() as u32)
    }

    pub fn create_zone(&mut self, warehouse: &LayerId, name: impl Into<String>) -> Result<LayerId> {
        self.create_child(warehouse, ZoneFields::new(name))
    }

    pub fn create_bay(&mut self, zone: &LayerId, name: impl Into<String>) -> Result<LayerId> {
        let index = self.next_index(zone)?;
        self.create_child(zone, BayFields::new(name, index))
    }

    pub fn create_shelf(&mut self, bay: &LayerId, name: impl Into<String>) -> Result<LayerId> {
        let index = self.next_index(bay)?;
        self.create_child(bay, ShelfFields::new(name, index))
    }

    pub fn create_column(&mut self, shelf: &LayerId, max_height: Option<u32>) -> Result<LayerId> {
        let index = self.next_index(shelf)?;
        self.create_child(shelf, ColumnFields::new(index, max_height))
    }

    /// Add a tray on top of a column; its index is set to the next free slot
    pub fn create_tray(&mut self, column: &LayerId, fields: TrayFields) -> Result<LayerId> {
        let index = self.next_index(column)?;
        self.create_child(column, fields.with_index(index))
    }

    /// Replace a layer's fields with `mutate(current)`
    ///
    /// Returns the patch between the new fields and the last saved snapshot.
    pub fn update<F, M>(&mut self, id: &LayerId, mutate: M) -> Result<Patch>
    where
        F: LayerFields,
        M: FnOnce(F) -> F,
    {
        let node = self.typed_mut::<F>(id)?;
        node.apply(mutate).map_err(|source| InventoryError::Encode {
            path: id.to_string(),
            source,
        })
    }

    // =====================================================================
    // Loading
    // =====================================================================

    /// Load a layer (and optionally its descendants) from the store
    pub async fn load(&mut self, id: &LayerId, options: LoadOptions) -> Result<()> {
        self.load_cancellable(id, options, &CancellationToken::never())
            .await
    }

    /// Like [`load`](Self::load) but abandoned once `token` is cancelled
    ///
    /// The token is checked after every store round trip and before anything
    /// fetched is applied, so a cancelled load leaves no trace.
    pub async fn load_cancellable(
        &mut self,
        id: &LayerId,
        options: LoadOptions,
        token: &CancellationToken,
    ) -> Result<()> {
        let kind = self.node_of(id)?.kind();
        let loaded = self.node_of(id)?.layer().is_loaded();
        if !loaded || options.force {
            for_kind!(kind, F => self.load_self::<F>(id, token).await)?;
        }

        let Some(bottom) = options.recurse_to else {
            return Ok(());
        };

        let mut frontier = vec![id.clone()];
        while !frontier.is_empty() {
            let mut next = Vec::new();
            for parent in frontier {
                let parent_kind = self.node_of(&parent)?.kind();
                if parent_kind >= bottom {
                    continue;
                }
                let children = match parent_kind.child() {
                    Some(child) => {
                        for_kind!(child, C => self.load_children::<C>(&parent, options.force, token).await)?
                    }
                    None => Vec::new(),
                };
                next.extend(children);
            }
            frontier = next;
        }
        Ok(())
    }

    async fn load_self<F: LayerFields>(&mut self, id: &LayerId, token: &CancellationToken) -> Result<()> {
        let path = self.path(id)?;
        if self.offline {
            // nothing to fetch; keep whatever is in memory
            self.typed_mut::<F>(id)?.meta.loaded = true;
            return Ok(());
        }

        debug!(path = %path, "loading layer");
        let store = Arc::clone(self.writer.store());
        let fetched = store.get(&path).await.map_err(|e| InventoryError::Load {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        if token.is_cancelled() {
            return Err(InventoryError::Cancelled);
        }

        let document = fetched.ok_or_else(|| InventoryError::Load {
            path: path.clone(),
            reason: "document does not exist".to_string(),
        })?;
        let hydrated = hydrate::<F>(document.data).map_err(|e| InventoryError::Load {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        self.typed_mut::<F>(id)?.rehydrate(hydrated);
        Ok(())
    }

    /// Query and hydrate the next level below `parent`; returns the children
    async fn load_children<C: LayerFields>(
        &mut self,
        parent: &LayerId,
        force: bool,
        token: &CancellationToken,
    ) -> Result<Vec<LayerId>> {
        let (parent_kind, children_loaded) = {
            let node = self.node_of(parent)?;
            (node.kind(), node.meta().children_loaded)
        };
        if (children_loaded && !force) || self.offline {
            if let Some(node) = self.nodes.get_mut(parent) {
                node.meta_mut().children_loaded = true;
            }
            return Ok(self.children(parent).to_vec());
        }

        debug!(parent = %parent, collection = C::KIND.collection(), "loading children");
        let store = Arc::clone(self.writer.store());
        let documents = store
            .query_tagged(C::KIND.collection(), parent_kind.collection(), parent.as_str())
            .await
            .map_err(|e| InventoryError::Load {
                path: join_paths([parent.as_str(), C::KIND.collection()]),
                reason: e.to_string(),
            })?;
        if token.is_cancelled() {
            return Err(InventoryError::Cancelled);
        }

        // decode everything before touching the arena
        let mut hydrated = Vec::with_capacity(documents.len());
        for document in documents {
            let id = LayerId::parse(&document.id())?;
            let path = document.path.clone();
            let fields = hydrate::<C>(document.data)
                .map_err(|e| InventoryError::Load {
                    path,
                    reason: e.to_string(),
                })?;
            hydrated.push((id, fields));
        }

        let mut seen = HashSet::new();
        for (id, document) in hydrated {
            seen.insert(id.clone());
            match self.nodes.get_mut(&id).and_then(C::peel_mut) {
                Some(existing) => existing.rehydrate(document),
                None => {
                    let node = Node::hydrated(id.clone(), Some(parent.clone()), document);
                    self.nodes.insert(id, C::wrap(node));
                }
            }
        }

        let previous = self.children(parent).to_vec();
        let mut kept = Vec::new();
        for child in previous {
            let still_there = seen.contains(&child);
            let unsaved = self.layer(&child).is_some_and(|layer| layer.is_new());
            if still_there || unsaved {
                kept.push(child);
            } else {
                self.remove_subtree(&child);
            }
        }
        for id in &seen {
            if !kept.contains(id) {
                kept.push(id.clone());
            }
        }
        kept.sort_by_cached_key(|id| {
            let key = self.layer(id).map(|layer| layer.sort_key()).unwrap_or_default();
            (key, id.clone())
        });

        if let Some(node) = self.nodes.get_mut(parent) {
            let meta = node.meta_mut();
            meta.children = kept.clone();
            meta.children_loaded = true;
        }
        Ok(kept)
    }

    /// Fetch every top-level warehouse document
    pub async fn load_warehouses(&mut self) -> Result<Vec<LayerId>> {
        if self.offline {
            return Ok(self.warehouses.clone());
        }
        let collection = LayerKind::Warehouse.collection();
        let store = Arc::clone(self.writer.store());
        let documents = store.list(collection).await.map_err(|e| InventoryError::Load {
            path: collection.to_string(),
            reason: e.to_string(),
        })?;

        for document in documents {
            let id = LayerId::parse(&document.id())?;
            let path = document.path.clone();
            let hydrated = hydrate::<WarehouseFields>(document.data).map_err(|e| {
                InventoryError::Load {
                    path,
                    reason: e.to_string(),
                }
            })?;
            match self.nodes.get_mut(&id).and_then(WarehouseFields::peel_mut) {
                Some(existing) => existing.rehydrate(hydrated),
                None => {
                    let node = Node::hydrated(id.clone(), None, hydrated);
                    self.nodes.insert(id.clone(), WarehouseFields::wrap(node));
                    self.warehouses.push(id);
                }
            }
        }
        Ok(self.warehouses.clone())
    }

    /// Resolve a nested document path, loading each missing level in turn
    pub async fn open_path(&mut self, path: &str) -> Result<LayerId> {
        self.open_path_cancellable(path, &CancellationToken::never())
            .await
    }

    pub async fn open_path_cancellable(
        &mut self,
        path: &str,
        token: &CancellationToken,
    ) -> Result<LayerId> {
        let segs = segments(path)
            .filter(|segs| !segs.is_empty() && segs.len() <= LayerKind::all().len())
            .ok_or_else(|| InventoryError::InvalidPath(path.to_string()))?;

        let mut parent: Option<LayerId> = None;
        for ((collection, raw_id), expected) in segs.iter().zip(LayerKind::all()) {
            if LayerKind::from_collection(collection) != Some(*expected) {
                return Err(InventoryError::InvalidPath(path.to_string()));
            }
            let id = LayerId::parse(raw_id)?;
            if !self.nodes.contains_key(&id) {
                for_kind!(*expected, F => self.insert_placeholder::<F>(&id, parent.as_ref()));
                if let Err(e) = self.load_cancellable(&id, LoadOptions::shallow(), token).await {
                    self.remove_subtree(&id);
                    return Err(e);
                }
            }
            let actual_parent = self.parent(&id).cloned();
            if actual_parent != parent {
                return Err(InventoryError::InvalidPath(path.to_string()));
            }
            parent = Some(id);
        }
        parent.ok_or_else(|| InventoryError::InvalidPath(path.to_string()))
    }

    /// Register a known-to-exist layer that has not been fetched yet
    fn insert_placeholder<F: LayerFields>(&mut self, id: &LayerId, parent: Option<&LayerId>) {
        let mut node = Node::fresh(id.clone(), parent.cloned(), F::default());
        node.saved = Some(F::default());
        node.meta.loaded = false;
        node.meta.children_loaded = false;
        self.nodes.insert(id.clone(), F::wrap(node));
        match parent {
            Some(parent) => {
                if let Some(node) = self.nodes.get_mut(parent) {
                    node.meta_mut().children.push(id.clone());
                }
            }
            None => self.warehouses.push(id.clone()),
        }
    }

    // =====================================================================
    // Staging, committing, deleting
    // =====================================================================

    /// Stage a layer's pending changes, optionally its descendants, and
    /// optionally commit
    pub async fn stage(&mut self, id: &LayerId, options: StageOptions) -> Result<StageReport> {
        self.node_of(id)?;
        let mut order = Vec::new();
        self.dfs(id, |node| {
            let kind = node.kind();
            let within = match options.min_layer {
                Some(min) => kind <= min,
                None => false,
            };
            order.push((node.layer().id().clone(), within));
        });

        let mut staged = 0;
        for (index, (layer, within)) in order.into_iter().enumerate() {
            if index > 0 && !within {
                continue;
            }
            if self.stage_one(&layer, options.force)? {
                staged += 1;
            }
        }

        let commit = if options.commit {
            Some(self.commit().await?)
        } else {
            None
        };
        Ok(StageReport { staged, commit })
    }

    /// Queue a write for one layer; returns whether anything was queued
    fn stage_one(&mut self, id: &LayerId, force: bool) -> Result<bool> {
        let path = self.path(id)?;
        let encode = |source| InventoryError::Encode {
            path: path.clone(),
            source,
        };
        let node = self.node_of(id)?;
        let layer = node.layer();
        let now = Utc::now();

        let mut stamp = Map::new();
        stamp.insert(LAST_MODIFIED_KEY.to_string(), Value::from(now.timestamp_millis()));
        stamp.insert(BLAME_KEY.to_string(), Value::from(self.user.clone()));

        if layer.is_new() || force {
            let mut data = layer.fields_map().map_err(encode)?;
            data.extend(stamp);
            let identifiers = self.layer_identifiers(id)?;
            data.insert(
                LAYER_IDENTIFIERS_KEY.to_string(),
                serde_json::to_value(identifiers).map_err(encode)?,
            );
            self.writer.set(path.clone(), data);
        } else {
            let patch = layer.pending_patch().map_err(encode)?;
            if patch.is_empty() {
                return Ok(false);
            }
            let mut data = patch.into_map();
            data.extend(stamp);
            self.writer.update(path.clone(), data);
        }

        debug!(path = %path, "staged");
        let user = self.user.clone();
        if let Some(node) = self.nodes.get_mut(id) {
            node.mark_saved(now, &user);
        }
        Ok(true)
    }

    /// Flush the shared write queue
    pub async fn commit(&self) -> Result<CommitReport> {
        Ok(self.writer.commit().await?)
    }

    /// Delete a layer and everything below it
    ///
    /// Unloaded descendants are fetched first so none are left orphaned.
    /// Trays above a deleted tray shift down one slot; the whole column is
    /// loaded first so stored siblings shift too.
    pub async fn delete(&mut self, id: &LayerId, commit: bool) -> Result<Option<CommitReport>> {
        let kind = self.node_of(id)?.kind();
        if !self.offline {
            // a tray's siblings must all be in memory to be re-indexed
            let scope = match kind {
                LayerKind::Tray => self.parent(id).cloned(),
                _ => Some(id.clone()),
            };
            if let Some(scope) = scope {
                self.load(&scope, LoadOptions::deep(LayerKind::Tray)).await?;
            }
        }

        let mut doomed = Vec::new();
        self.dfs(id, |node| {
            let layer = node.layer();
            if !layer.is_new() {
                doomed.push(layer.id().clone());
            }
        });
        for layer in &doomed {
            let path = self.path(layer)?;
            self.writer.delete(path);
        }

        let parent = self.parent(id).cloned();
        self.remove_subtree(id);
        if let (Some(parent), LayerKind::Tray) = (parent, kind) {
            for tray in self.reindex_trays(&parent)? {
                if !self.layer(&tray).is_some_and(|layer| layer.is_new()) {
                    self.stage_one(&tray, false)?;
                }
            }
        }

        if commit {
            Ok(Some(self.commit().await?))
        } else {
            Ok(None)
        }
    }

    /// Close the gap left by a removed tray; returns the trays that moved
    fn reindex_trays(&mut self, column: &LayerId) -> Result<Vec<LayerId>> {
        let trays = self.children(column).to_vec();
        let mut moved = Vec::new();
        for (index, tray) in trays.into_iter().enumerate() {
            let index = index as u32;
            if self.fields::<TrayFields>(&tray).map(|f| f.index) != Some(index) {
                self.update::<TrayFields, _>(&tray, |f| f.with_index(index))?;
                moved.push(tray);
            }
        }
        Ok(moved)
    }

    /// Drop a node and its loaded descendants from memory only
    fn remove_subtree(&mut self, id: &LayerId) {
        let mut doomed = Vec::new();
        self.dfs(id, |node| doomed.push(node.layer().id().clone()));

        if let Some(parent) = self.parent(id).cloned() {
            if let Some(node) = self.nodes.get_mut(&parent) {
                node.meta_mut().children.retain(|child| child != id);
            }
        }
        self.warehouses.retain(|w| w != id);
        for layer in doomed {
            self.nodes.remove(&layer);
        }
    }

    // =====================================================================
    // Traversal
    // =====================================================================

    /// Visit a layer and its loaded descendants depth-first, parents first
    pub fn dfs<V: FnMut(&LayerNode)>(&self, root: &LayerId, mut visit: V) {
        let mut stack = vec![root.clone()];
        while let Some(id) = stack.pop() {
            let Some(node) = self.nodes.get(&id) else {
                continue;
            };
            visit(node);
            stack.extend(node.meta().children.iter().rev().cloned());
        }
    }

    /// Visit a layer and its loaded descendants level by level
    pub fn bfs<V: FnMut(&LayerNode)>(&self, root: &LayerId, mut visit: V) {
        let mut queue = VecDeque::from([root.clone()]);
        while let Some(id) = queue.pop_front() {
            let Some(node) = self.nodes.get(&id) else {
                continue;
            };
            visit(node);
            queue.extend(node.meta().children.iter().cloned());
        }
    }

    /// Pending changes of one layer, without staging them
    pub fn pending_patch(&self, id: &LayerId) -> Result<Patch> {
        let layer = self.node_of(id)?.layer();
        layer.pending_patch().map_err(|source| InventoryError::Encode {
            path: id.to_string(),
            source,
        })
    }

    /// Document body a layer would be written with
    pub fn document_for(&self, id: &LayerId) -> Result<Map<String, Value>> {
        let node = self.node_of(id)?;
        let mut data = node.layer().fields_map().map_err(|source| InventoryError::Encode {
            path: id.to_string(),
            source,
        })?;
        let identifiers = self.layer_identifiers(id)?;
        data.insert(
            LAYER_IDENTIFIERS_KEY.to_string(),
            serde_json::to_value(identifiers).map_err(|source| InventoryError::Encode {
                path: id.to_string(),
                source,
            })?,
        );
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::store::MemoryStore;

    fn inventory() -> (Arc<MemoryStore>, Inventory) {
        let store = Arc::new(MemoryStore::new());
        let inventory = Inventory::new(store.clone(), "tester");
        (store, inventory)
    }

    #[test]
    fn test_paths_and_identifiers() {
        let (_, mut inv) = inventory();
        let w = inv.create_warehouse(WarehouseFields::new("Main"));
        let z = inv.create_zone(&w, "Dry").unwrap();
        let b = inv.create_bay(&z, "A").unwrap();

        assert_eq!(inv.path(&w).unwrap(), format!("warehouses/{w}"));
        assert_eq!(inv.path(&b).unwrap(), format!("warehouses/{w}/zones/{z}/bays/{b}"));
        assert_eq!(
            inv.child_collection_path(&b).unwrap().unwrap(),
            format!("warehouses/{w}/zones/{z}/bays/{b}/shelves")
        );

        let ids = inv.layer_identifiers(&b).unwrap();
        assert_eq!(ids.len(), 2);
        assert_eq!(ids.get(LayerKind::Warehouse), Some(&w));
        assert_eq!(ids.get(LayerKind::Zone), Some(&z));
        assert!(ids.get(LayerKind::Bay).is_none());
    }

    #[test]
    fn test_create_child_checks_kind() {
        let (_, mut inv) = inventory();
        let w = inv.create_warehouse(WarehouseFields::new("Main"));
        let err = inv.create_child(&w, TrayFields::at_index(0)).unwrap_err();
        assert!(matches!(
            err,
            InventoryError::InvalidParent {
                parent: LayerKind::Warehouse,
                child: LayerKind::Tray
            }
        ));
    }

    #[test]
    fn test_ordered_factories_assign_indices() {
        let (_, mut inv) = inventory();
        let w = inv.create_warehouse(WarehouseFields::new("Main"));
        let z = inv.create_zone(&w, "Dry").unwrap();
        let b = inv.create_bay(&z, "A").unwrap();
        let s = inv.create_shelf(&b, "1").unwrap();
        let c0 = inv.create_column(&s, Some(3)).unwrap();
        let c1 = inv.create_column(&s, None).unwrap();
        assert_eq!(inv.fields::<ColumnFields>(&c0).unwrap().index, 0);
        assert_eq!(inv.fields::<ColumnFields>(&c1).unwrap().index, 1);

        let t0 = inv.create_tray(&c0, TrayFields::default()).unwrap();
        let t1 = inv.create_tray(&c0, TrayFields::default().with_index(9)).unwrap();
        assert_eq!(inv.fields::<TrayFields>(&t0).unwrap().index, 0);
        assert_eq!(inv.fields::<TrayFields>(&t1).unwrap().index, 1);
    }

    #[test]
    fn test_update_wrong_kind() {
        let (_, mut inv) = inventory();
        let w = inv.create_warehouse(WarehouseFields::new("Main"));
        let err = inv
            .update::<TrayFields, _>(&w, |f| f.with_weight(Some(1.0)))
            .unwrap_err();
        assert!(matches!(err, InventoryError::WrongKind { .. }));
    }

    #[test]
    fn test_dfs_and_bfs_orders() {
        let (_, mut inv) = inventory();
        let w = inv.create_warehouse(WarehouseFields::new("Main"));
        let z1 = inv.create_zone(&w, "A").unwrap();
        let z2 = inv.create_zone(&w, "B").unwrap();
        let b1 = inv.create_bay(&z1, "1").unwrap();
        let b2 = inv.create_bay(&z2, "2").unwrap();

        let mut dfs = Vec::new();
        inv.dfs(&w, |n| dfs.push(n.layer().id().clone()));
        assert_eq!(dfs, vec![w.clone(), z1.clone(), b1.clone(), z2.clone(), b2.clone()]);

        let mut bfs = Vec::new();
        inv.bfs(&w, |n| bfs.push(n.layer().id().clone()));
        assert_eq!(bfs, vec![w, z1, z2, b1, b2]);
    }

    #[tokio::test]
    async fn test_stage_new_then_patch() {
        let (store, mut inv) = inventory();
        let w = inv.create_warehouse(WarehouseFields::new("Main"));

        let report = inv.stage(&w, StageOptions::default().and_commit()).await.unwrap();
        assert_eq!(report.staged, 1);
        let doc = store.document(&format!("warehouses/{w}")).await.unwrap();
        assert_eq!(doc["name"], "Main");
        assert_eq!(doc[BLAME_KEY], "tester");

        // unchanged layers stage nothing
        let report = inv.stage(&w, StageOptions::default()).await.unwrap();
        assert_eq!(report.staged, 0);

        inv.update::<WarehouseFields, _>(&w, |f| f.with_name("Annex"))
            .unwrap();
        inv.stage(&w, StageOptions::default()).await.unwrap();
        let ops = inv.writer().pending_ops();
        assert_eq!(ops.len(), 1);
        match &ops[0] {
            crate::core::store::WriteOp::Update { data, .. } => {
                assert_eq!(data["name"], "Annex");
                assert!(!data.contains_key("categories"));
            }
            other => panic!("expected update, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_stage_respects_min_layer() {
        let (_, mut inv) = inventory();
        let w = inv.create_warehouse(WarehouseFields::new("Main"));
        let z = inv.create_zone(&w, "Dry").unwrap();
        let b = inv.create_bay(&z, "A").unwrap();
        inv.create_shelf(&b, "1").unwrap();

        let report = inv.stage(&w, StageOptions::recursive(LayerKind::Bay)).await.unwrap();
        assert_eq!(report.staged, 3);
        assert_eq!(inv.writer().pending(), 3);
    }

    #[tokio::test]
    async fn test_missing_document_is_load_failure_online() {
        let (_, mut inv) = inventory();
        let err = inv.open_path("warehouses/NOPE").await.unwrap_err();
        assert!(matches!(err, InventoryError::Load { .. }));
        assert!(inv.is_empty());
    }

    #[tokio::test]
    async fn test_offline_load_uses_defaults() {
        let (store, mut inv) = inventory();
        inv.set_offline(true);
        let w = inv.open_path("warehouses/W1").await.unwrap();
        assert_eq!(inv.fields::<WarehouseFields>(&w).unwrap(), &WarehouseFields::default());
        assert_eq!(store.fetch_calls.load(std::sync::atomic::Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn test_cancelled_load_applies_nothing() {
        let (store, mut inv) = inventory();
        let mut data = Map::new();
        data.insert("name".into(), Value::from("Remote"));
        store.insert("warehouses/W1", data).await;

        let mut nav = crate::core::cancel::Navigator::new();
        let stale = nav.begin();
        nav.begin();

        let err = inv.open_path_cancellable("warehouses/W1", &stale).await.unwrap_err();
        assert!(err.is_cancelled());
        assert!(inv.is_empty());
    }
}
