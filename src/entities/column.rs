//! Column - a vertical stack of trays on a shelf

use serde::{Deserialize, Serialize};

use crate::core::identity::LayerKind;
use crate::core::layer::{LayerFields, LayerNode, Node};

/// Fields stored on a column document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ColumnFields {
    /// Position within the shelf, left to right
    pub index: u32,

    /// Tray size label accepted by this column (e.g. "standard", "wide")
    pub size: Option<String>,

    /// Number of tray slots; `None` (or 0) means unbounded
    pub max_height: Option<u32>,
}

/// A column node
pub type Column = Node<ColumnFields>;

impl ColumnFields {
    pub fn new(index: u32, max_height: Option<u32>) -> Self {
        Self {
            index,
            size: None,
            max_height,
        }
    }

    pub fn with_index(mut self, index: u32) -> Self {
        self.index = index;
        self
    }

    pub fn with_size(mut self, size: Option<String>) -> Self {
        self.size = size;
        self
    }

    pub fn with_max_height(mut self, max_height: Option<u32>) -> Self {
        self.max_height = max_height;
        self
    }

    /// Empty slots to show below `tray_count` real trays
    ///
    /// Unbounded columns always offer exactly one slot to grow into.
    pub fn missing_slots(&self, tray_count: usize) -> usize {
        match self.max_height {
            Some(height) if height > 0 => (height as usize).saturating_sub(tray_count),
            _ => 1,
        }
    }
}

impl LayerFields for ColumnFields {
    const KIND: LayerKind = LayerKind::Column;

    fn sort_key(&self) -> (u32, String) {
        (self.index, String::new())
    }

    fn wrap(node: Node<Self>) -> LayerNode {
        LayerNode::Column(node)
    }

    fn peel(node: &LayerNode) -> Option<&Node<Self>> {
        match node {
            LayerNode::Column(n) => Some(n),
            _ => None,
        }
    }

    fn peel_mut(node: &mut LayerNode) -> Option<&mut Node<Self>> {
        match node {
            LayerNode::Column(n) => Some(n),
            _ => None,
        }
    }
}
