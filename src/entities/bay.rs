//! Bay - a run of shelving within a zone

use serde::{Deserialize, Serialize};

use crate::core::identity::LayerKind;
use crate::core::layer::{LayerFields, LayerNode, Node};

/// Fields stored on a bay document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BayFields {
    pub name: String,

    /// Position within the zone
    pub index: u32,
}

/// A bay node
pub type Bay = Node<BayFields>;

impl BayFields {
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

impl LayerFields for BayFields {
    const KIND: LayerKind = LayerKind::Bay;

    fn sort_key(&self) -> (u32, String) {
        (self.index, self.name.clone())
    }

    fn wrap(node: Node<Self>) -> LayerNode {
        LayerNode::Bay(node)
    }

    fn peel(node: &LayerNode) -> Option<&Node<Self>> {
        match node {
            LayerNode::Bay(n) => Some(n),
            _ => None,
        }
    }

    fn peel_mut(node: &mut LayerNode) -> Option<&mut Node<Self>> {
        match node {
            LayerNode::Bay(n) => Some(n),
            _ => None,
        }
    }
}
