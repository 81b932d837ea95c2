//! Layer identity: the six hierarchy kinds and ULID-backed document ids

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use ulid::Ulid;

/// Hierarchy levels, ordered from the top of the tree to the bottom
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerKind {
    /// Top layer
    Warehouse,
    Zone,
    Bay,
    Shelf,
    Column,
    /// Bottom layer
    Tray,
}

impl LayerKind {
    /// Name of the collection documents of this kind live in
    pub fn collection(&self) -> &'static str {
        match self {
            LayerKind::Warehouse => "warehouses",
            LayerKind::Zone => "zones",
            LayerKind::Bay => "bays",
            LayerKind::Shelf => "shelves",
            LayerKind::Column => "columns",
            LayerKind::Tray => "trays",
        }
    }

    /// Singular, human-facing name
    pub fn as_str(&self) -> &'static str {
        match self {
            LayerKind::Warehouse => "warehouse",
            LayerKind::Zone => "zone",
            LayerKind::Bay => "bay",
            LayerKind::Shelf => "shelf",
            LayerKind::Column => "column",
            LayerKind::Tray => "tray",
        }
    }

    /// Get all kinds, top first
    pub fn all() -> &'static [LayerKind] {
        &[
            LayerKind::Warehouse,
            LayerKind::Zone,
            LayerKind::Bay,
            LayerKind::Shelf,
            LayerKind::Column,
            LayerKind::Tray,
        ]
    }

    /// Kind of this layer's parent, `None` for the top layer
    pub fn parent(&self) -> Option<LayerKind> {
        match self {
            LayerKind::Warehouse => None,
            LayerKind::Zone => Some(LayerKind::Warehouse),
            LayerKind::Bay => Some(LayerKind::Zone),
            LayerKind::Shelf => Some(LayerKind::Bay),
            LayerKind::Column => Some(LayerKind::Shelf),
            LayerKind::Tray => Some(LayerKind::Column),
        }
    }

    /// Kind of this layer's children, `None` for the bottom layer
    pub fn child(&self) -> Option<LayerKind> {
        match self {
            LayerKind::Warehouse => Some(LayerKind::Zone),
            LayerKind::Zone => Some(LayerKind::Bay),
            LayerKind::Bay => Some(LayerKind::Shelf),
            LayerKind::Shelf => Some(LayerKind::Column),
            LayerKind::Column => Some(LayerKind::Tray),
            LayerKind::Tray => None,
        }
    }

    /// Look a kind up by its collection name
    pub fn from_collection(collection: &str) -> Option<Self> {
        Self::all()
            .iter()
            .copied()
            .find(|kind| kind.collection() == collection)
    }
}

impl fmt::Display for LayerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for LayerKind {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_lowercase();
        Self::all()
            .iter()
            .copied()
            .find(|kind| kind.as_str() == lower || kind.collection() == lower)
            .ok_or_else(|| IdParseError::InvalidKind(s.to_string()))
    }
}

/// Document id of a layer
///
/// Freshly created layers get a ULID; ids read back from the store are taken
/// as-is so documents written by other clients still resolve.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LayerId(String);

impl LayerId {
    /// Generate a new unique id
    pub fn new() -> Self {
        Self(Ulid::new().to_string())
    }

    /// Parse an id, rejecting empty strings and path separators
    pub fn parse(s: &str) -> Result<Self, IdParseError> {
        s.parse()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for LayerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for LayerId {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(IdParseError::Empty);
        }
        if s.contains(crate::core::path::SEPARATOR) {
            return Err(IdParseError::ContainsSeparator(s.to_string()));
        }
        Ok(Self(s.to_string()))
    }
}

impl Serialize for LayerId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for LayerId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Ancestor ids of a document, keyed by the ancestor's collection name
///
/// Persisted on every document under `layerIdentifiers` so children can be
/// found by tag instead of by walking nested collections.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerIdentifiers(BTreeMap<String, LayerId>);

impl LayerIdentifiers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, kind: LayerKind, id: LayerId) {
        self.0.insert(kind.collection().to_string(), id);
    }

    pub fn get(&self, kind: LayerKind) -> Option<&LayerId> {
        self.0.get(kind.collection())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &LayerId)> {
        self.0.iter()
    }
}

/// Errors that can occur when parsing layer ids and kinds
#[derive(Debug, Error)]
pub enum IdParseError {
    #[error("invalid layer kind: '{0}' (valid: warehouse, zone, bay, shelf, column, tray)")]
    InvalidKind(String),

    #[error("layer id must not be empty")]
    Empty,

    #[error("layer id '{0}' must not contain '/'")]
    ContainsSeparator(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_id_generation() {
        let id = LayerId::new();
        assert_eq!(id.as_str().len(), 26);
        assert_ne!(id, LayerId::new());
    }

    #[test]
    fn test_layer_id_parsing() {
        assert_eq!(LayerId::parse("W1").unwrap().as_str(), "W1");
        assert!(matches!(LayerId::parse("").unwrap_err(), IdParseError::Empty));
        assert!(matches!(
            LayerId::parse("a/b").unwrap_err(),
            IdParseError::ContainsSeparator(_)
        ));
    }

    #[test]
    fn test_kind_chain_is_consistent() {
        for kind in LayerKind::all() {
            if let Some(child) = kind.child() {
                assert_eq!(child.parent(), Some(*kind));
                assert!(*kind < child);
            }
        }
        assert_eq!(LayerKind::Warehouse.parent(), None);
        assert_eq!(LayerKind::Tray.child(), None);
    }

    #[test]
    fn test_kind_from_str_accepts_collection_names() {
        assert_eq!("shelves".parse::<LayerKind>().unwrap(), LayerKind::Shelf);
        assert_eq!("Shelf".parse::<LayerKind>().unwrap(), LayerKind::Shelf);
        assert_eq!(LayerKind::from_collection("trays"), Some(LayerKind::Tray));
        assert!("aisle".parse::<LayerKind>().is_err());
    }

    #[test]
    fn test_layer_identifiers_serialize_by_collection() {
        let mut ids = LayerIdentifiers::new();
        ids.insert(LayerKind::Warehouse, LayerId::parse("W1").unwrap());
        ids.insert(LayerKind::Zone, LayerId::parse("Z1").unwrap());
        let json = serde_json::to_value(&ids).unwrap();
        assert_eq!(json["warehouses"], "W1");
        assert_eq!(json["zones"], "Z1");
        assert_eq!(ids.get(LayerKind::Zone).unwrap().as_str(), "Z1");
    }
}
