//! Zone - a named region of a warehouse

use serde::{Deserialize, Serialize};

use crate::core::identity::LayerKind;
use crate::core::layer::{LayerFields, LayerNode, Node};

/// Fields stored on a zone document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ZoneFields {
    pub name: String,

    /// Display colour as a CSS hex string, stored verbatim
    pub colour: Option<String>,
}

/// A zone node
pub type Zone = Node<ZoneFields>;

impl ZoneFields {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            colour: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_colour(mut self, colour: Option<String>) -> Self {
        self.colour = colour;
        self
    }
}

impl LayerFields for ZoneFields {
    const KIND: LayerKind = LayerKind::Zone;

    // zones have no position, siblings sort by name
    fn sort_key(&self) -> (u32, String) {
        (0, self.name.clone())
    }

    fn wrap(node: Node<Self>) -> LayerNode {
        LayerNode::Zone(node)
    }

    fn peel(node: &LayerNode) -> Option<&Node<Self>> {
        match node {
            LayerNode::Zone(n) => Some(n),
            _ => None,
        }
    }

    fn peel_mut(node: &mut LayerNode) -> Option<&mut Node<Self>> {
        match node {
            LayerNode::Zone(n) => Some(n),
            _ => None,
        }
    }
}
