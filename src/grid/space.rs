//! Placeholder slots that pad a column up to its configured height
//!
//! Empty slots are not documents, yet the grid has to select and compare them
//! across renders. Each placeholder is an `Arc<TraySpace>` handed out by a
//! [`TraySpaceCache`]; as long as a column's shape does not change the cache
//! returns the very same allocations, and a slot that gets filled by a real
//! tray is forgotten for good.

use std::collections::{BTreeMap, HashMap};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::core::identity::{LayerId, LayerKind};
use crate::core::inventory::{Inventory, InventoryError, Result};
use crate::entities::{ColumnFields, ShelfFields};

/// An empty, selectable slot in a column
#[derive(Debug, PartialEq, Eq)]
pub struct TraySpace {
    pub column: LayerId,
    /// Always at or above the column's real tray count
    pub index: usize,
}

/// One position in the shelf grid
#[derive(Debug, Clone)]
pub enum TrayCell {
    Tray(LayerId),
    Space(Arc<TraySpace>),
}

impl TrayCell {
    pub fn tray_id(&self) -> Option<&LayerId> {
        match self {
            TrayCell::Tray(id) => Some(id),
            TrayCell::Space(_) => None,
        }
    }

    pub fn is_space(&self) -> bool {
        matches!(self, TrayCell::Space(_))
    }
}

// trays compare by id, spaces by allocation
impl PartialEq for TrayCell {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (TrayCell::Tray(a), TrayCell::Tray(b)) => a == b,
            (TrayCell::Space(a), TrayCell::Space(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Eq for TrayCell {}

impl Hash for TrayCell {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            TrayCell::Tray(id) => {
                0u8.hash(state);
                id.hash(state);
            }
            TrayCell::Space(space) => {
                1u8.hash(state);
                (Arc::as_ptr(space) as usize).hash(state);
            }
        }
    }
}

#[derive(Debug, Default)]
struct ColumnSpaces {
    by_index: BTreeMap<usize, Arc<TraySpace>>,
}

/// Per-view store of placeholder slots, keyed by column
#[derive(Debug, Default)]
pub struct TraySpaceCache {
    columns: HashMap<LayerId, ColumnSpaces>,
}

impl TraySpaceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Placeholders for indices `trays..trays + missing`
    ///
    /// Existing placeholders are reused by index; any cached below `trays`
    /// or past the new end are dropped.
    pub fn spaces(&mut self, column: &LayerId, trays: usize, missing: usize) -> Vec<Arc<TraySpace>> {
        let end = trays + missing;
        let entry = self.columns.entry(column.clone()).or_default();
        entry
            .by_index
            .retain(|&index, _| index >= trays && index < end);

        (trays..end)
            .map(|index| {
                Arc::clone(entry.by_index.entry(index).or_insert_with(|| {
                    Arc::new(TraySpace {
                        column: column.clone(),
                        index,
                    })
                }))
            })
            .collect()
    }

    /// Forget one column's placeholders, or all of them
    pub fn purge(&mut self, column: Option<&LayerId>) {
        match column {
            Some(column) => {
                self.columns.remove(column);
            }
            None => self.columns.clear(),
        }
    }

    /// Number of placeholders currently held
    pub fn len(&self) -> usize {
        self.columns.values().map(|c| c.by_index.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The grid state of the shelf currently on screen
#[derive(Debug, Default)]
pub struct ShelfView {
    shelf: Option<LayerId>,
    cache: TraySpaceCache,
}

impl ShelfView {
    pub fn new(shelf: LayerId) -> Self {
        Self {
            shelf: Some(shelf),
            cache: TraySpaceCache::new(),
        }
    }

    pub fn shelf(&self) -> Option<&LayerId> {
        self.shelf.as_ref()
    }

    /// Point the view at another shelf, dropping every cached placeholder
    pub fn switch_shelf(&mut self, shelf: Option<LayerId>) {
        if self.shelf != shelf {
            self.cache.purge(None);
            self.shelf = shelf;
        }
    }

    pub fn purge(&mut self, column: Option<&LayerId>) {
        self.cache.purge(column);
    }

    pub fn cache(&self) -> &TraySpaceCache {
        &self.cache
    }

    /// A column's real trays bottom-up, followed by its empty slots
    pub fn padded_trays(&mut self, inventory: &Inventory, column: &LayerId) -> Result<Vec<TrayCell>> {
        let fields = column_fields(inventory, column)?;
        let trays = inventory.children(column);
        let missing = fields.missing_slots(trays.len());

        let mut cells: Vec<TrayCell> = trays.iter().cloned().map(TrayCell::Tray).collect();
        cells.extend(
            self.cache
                .spaces(column, trays.len(), missing)
                .into_iter()
                .map(TrayCell::Space),
        );
        Ok(cells)
    }

    /// Columns of the current shelf in order, each padded
    pub fn cell_grid(&mut self, inventory: &Inventory) -> Result<Vec<Vec<TrayCell>>> {
        let Some(shelf) = self.shelf.clone() else {
            return Ok(Vec::new());
        };
        if inventory.fields::<ShelfFields>(&shelf).is_none() {
            return Err(missing_layer(inventory, &shelf, LayerKind::Shelf));
        }
        inventory
            .children(&shelf)
            .iter()
            .map(|column| self.padded_trays(inventory, column))
            .collect()
    }

    /// The grid flattened column by column, bottom to top
    pub fn cell_sequence(&mut self, inventory: &Inventory) -> Result<Vec<TrayCell>> {
        Ok(self.cell_grid(inventory)?.into_iter().flatten().collect())
    }
}

fn column_fields<'a>(inventory: &'a Inventory, column: &LayerId) -> Result<&'a ColumnFields> {
    inventory
        .fields::<ColumnFields>(column)
        .ok_or_else(|| missing_layer(inventory, column, LayerKind::Column))
}

fn missing_layer(inventory: &Inventory, id: &LayerId, expected: LayerKind) -> InventoryError {
    match inventory.node(id) {
        Some(node) => InventoryError::WrongKind {
            id: id.clone(),
            expected,
            actual: node.kind(),
        },
        None => InventoryError::UnknownLayer(id.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::store::MemoryStore;
    use crate::entities::{TrayFields, WarehouseFields};

    fn shelf_with_column(max_height: Option<u32>) -> (Inventory, LayerId, LayerId) {
        let mut inv = Inventory::new(Arc::new(MemoryStore::new()), "tester");
        let w = inv.create_warehouse(WarehouseFields::new("Main"));
        let z = inv.create_zone(&w, "Dry").unwrap();
        let b = inv.create_bay(&z, "A").unwrap();
        let s = inv.create_shelf(&b, "1").unwrap();
        let c = inv.create_column(&s, max_height).unwrap();
        (inv, s, c)
    }

    fn spaces(cells: &[TrayCell]) -> Vec<Arc<TraySpace>> {
        cells
            .iter()
            .filter_map(|cell| match cell {
                TrayCell::Space(space) => Some(Arc::clone(space)),
                TrayCell::Tray(_) => None,
            })
            .collect()
    }

    #[test]
    fn test_padding_reaches_max_height() {
        let (mut inv, s, c) = shelf_with_column(Some(3));
        inv.create_tray(&c, TrayFields::default()).unwrap();
        let mut view = ShelfView::new(s);

        let cells = view.padded_trays(&inv, &c).unwrap();
        assert_eq!(cells.len(), 3);
        assert!(!cells[0].is_space());
        let indices: Vec<usize> = spaces(&cells).iter().map(|s| s.index).collect();
        assert_eq!(indices, vec![1, 2]);
    }

    #[test]
    fn test_unbounded_column_gets_one_slot() {
        let (inv, s, c) = shelf_with_column(None);
        let mut view = ShelfView::new(s);
        assert_eq!(view.padded_trays(&inv, &c).unwrap().len(), 1);
    }

    #[test]
    fn test_unchanged_column_returns_same_allocations() {
        let (inv, s, c) = shelf_with_column(Some(4));
        let mut view = ShelfView::new(s);
        let first = spaces(&view.padded_trays(&inv, &c).unwrap());
        let second = spaces(&view.padded_trays(&inv, &c).unwrap());
        assert_eq!(first.len(), 4);
        for (a, b) in first.iter().zip(&second) {
            assert!(Arc::ptr_eq(a, b));
        }
    }

    #[tokio::test]
    async fn test_filled_slot_never_comes_back() {
        let (mut inv, s, c) = shelf_with_column(Some(3));
        let mut view = ShelfView::new(s);
        let before = spaces(&view.padded_trays(&inv, &c).unwrap());

        let tray = inv.create_tray(&c, TrayFields::default()).unwrap();
        let after = spaces(&view.padded_trays(&inv, &c).unwrap());
        assert_eq!(after.len(), 2);
        // surviving indices keep their allocation
        assert!(Arc::ptr_eq(&before[1], &after[0]));
        assert!(Arc::ptr_eq(&before[2], &after[1]));

        inv.delete(&tray, false).await.unwrap();
        let again = spaces(&view.padded_trays(&inv, &c).unwrap());
        assert!(!Arc::ptr_eq(&before[0], &again[0]));
    }

    #[test]
    fn test_cells_compare_by_identity() {
        let column = LayerId::parse("C1").unwrap();
        let a = Arc::new(TraySpace {
            column: column.clone(),
            index: 0,
        });
        let b = Arc::new(TraySpace { column, index: 0 });
        assert_eq!(TrayCell::Space(a.clone()), TrayCell::Space(a.clone()));
        assert_ne!(TrayCell::Space(a), TrayCell::Space(b));
    }

    #[test]
    fn test_switch_shelf_purges_cache() {
        let (inv, s, c) = shelf_with_column(Some(2));
        let mut view = ShelfView::new(s);
        view.padded_trays(&inv, &c).unwrap();
        assert_eq!(view.cache().len(), 2);
        view.switch_shelf(None);
        assert!(view.cache().is_empty());
        assert!(view.cell_grid(&inv).unwrap().is_empty());
    }
}
