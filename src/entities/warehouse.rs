//! Warehouse - the top layer of the hierarchy

use serde::{Deserialize, Serialize};

use crate::core::identity::{LayerId, LayerKind};
use crate::core::layer::{LayerFields, LayerNode, Node};
use crate::entities::category::Category;

/// Fields stored on a warehouse document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WarehouseFields {
    /// Display name
    pub name: String,

    /// Stock categories trays in this warehouse can be assigned
    pub categories: Vec<Category>,
}

/// A warehouse node
pub type Warehouse = Node<WarehouseFields>;

impl WarehouseFields {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            categories: Vec::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_category(mut self, category: Category) -> Self {
        self.categories.push(category);
        self
    }

    pub fn without_category(mut self, id: &LayerId) -> Self {
        self.categories.retain(|c| &c.id != id);
        self
    }

    pub fn category(&self, id: &LayerId) -> Option<&Category> {
        self.categories.iter().find(|c| &c.id == id)
    }
}

impl LayerFields for WarehouseFields {
    const KIND: LayerKind = LayerKind::Warehouse;

    fn sort_key(&self) -> (u32, String) {
        (0, self.name.clone())
    }

    fn wrap(node: Node<Self>) -> LayerNode {
        LayerNode::Warehouse(node)
    }

    fn peel(node: &LayerNode) -> Option<&Node<Self>> {
        match node {
            LayerNode::Warehouse(n) => Some(n),
            _ => None,
        }
    }

    fn peel_mut(node: &mut LayerNode) -> Option<&mut Node<Self>> {
        match node {
            LayerNode::Warehouse(n) => Some(n),
            _ => None,
        }
    }
}
