//! Category - a kind of stock a tray can hold (e.g. "Tinned Vegetables")
//!
//! Categories are not a hierarchy level. They are stored inside the
//! warehouse document and trays refer to them by id.

use serde::{Deserialize, Serialize};

use crate::core::identity::LayerId;

/// A stock category defined on a warehouse
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    /// Unique id within the warehouse
    pub id: LayerId,

    /// Display name
    pub name: String,

    /// Abbreviation shown in narrow grid cells
    #[serde(default)]
    pub short_name: Option<String>,

    /// Display colour as a CSS hex string, stored verbatim
    #[serde(default)]
    pub colour: Option<String>,
}

impl Category {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: LayerId::new(),
            name: name.into(),
            short_name: None,
            colour: None,
        }
    }

    pub fn with_short_name(mut self, short_name: impl Into<String>) -> Self {
        self.short_name = Some(short_name.into());
        self
    }

    pub fn with_colour(mut self, colour: impl Into<String>) -> Self {
        self.colour = Some(colour.into());
        self
    }

    /// Short name if set, otherwise the full name
    pub fn label(&self) -> &str {
        self.short_name.as_deref().unwrap_or(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_prefers_short_name() {
        let category = Category::new("Tinned Vegetables");
        assert_eq!(category.label(), "Tinned Vegetables");
        assert_eq!(category.with_short_name("Veg").label(), "Veg");
    }

    #[test]
    fn test_category_serializes_camel_case() {
        let category = Category::new("Pasta").with_short_name("Pst");
        let json = serde_json::to_value(&category).unwrap();
        assert_eq!(json["shortName"], "Pst");
    }
}
