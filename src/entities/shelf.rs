//! Shelf - one level of a bay; the unit the tray grid displays

use serde::{Deserialize, Serialize};

use crate::core::identity::LayerKind;
use crate::core::layer::{LayerFields, LayerNode, Node};

/// Fields stored on a shelf document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ShelfFields {
    pub name: String,

    /// Position within the bay, counted from the floor
    pub index: u32,
}

/// A shelf node
pub type Shelf = Node<ShelfFields>;

impl ShelfFields {
    pub fn new(name: impl Into<String>, index: u32) -> Self {
        Self {
            name: name.into(),
            index,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_index(mut self, index: u32) -> Self {
        self.index = index;
        self
    }
}

impl LayerFields for ShelfFields {
    const KIND: LayerKind = LayerKind::Shelf;

    fn sort_key(&self) -> (u32, String) {
        (self.index, self.name.clone())
    }

    fn wrap(node: Node<Self>) -> LayerNode {
        LayerNode::Shelf(node)
    }

    fn peel(node: &LayerNode) -> Option<&Node<Self>> {
        match node {
            LayerNode::Shelf(n) => Some(n),
            _ => None,
        }
    }

    fn peel_mut(node: &mut LayerNode) -> Option<&mut Node<Self>> {
        match node {
            LayerNode::Shelf(n) => Some(n),
            _ => None,
        }
    }
}
