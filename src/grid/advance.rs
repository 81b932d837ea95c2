//! Auto-advance: where the cursor goes after a batch edit

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::select::Selection;
use super::space::TrayCell;
use crate::core::inventory::Inventory;
use crate::entities::TrayFields;

/// Which tray field the input panel is editing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputMode {
    Category,
    Expiry,
    Weight,
    /// Free-text comment
    Custom,
}

impl InputMode {
    /// Whether a tray still lacks the field this mode edits
    pub fn is_unset(&self, fields: &TrayFields) -> bool {
        match self {
            InputMode::Category => fields.category.is_none(),
            InputMode::Expiry => fields.expiry.is_none(),
            InputMode::Weight => fields.weight.is_none(),
            InputMode::Custom => fields.comment.as_deref().map_or(true, str::is_empty),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            InputMode::Category => "category",
            InputMode::Expiry => "expiry",
            InputMode::Weight => "weight",
            InputMode::Custom => "custom",
        }
    }
}

impl fmt::Display for InputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for InputMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "category" => Ok(InputMode::Category),
            "expiry" => Ok(InputMode::Expiry),
            "weight" => Ok(InputMode::Weight),
            "custom" | "comment" => Ok(InputMode::Custom),
            _ => Err(format!(
                "invalid input mode '{s}' (valid: category, expiry, weight, custom)"
            )),
        }
    }
}

/// User preference for auto-advance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoAdvanceConfig {
    /// Modes to step through; empty disables auto-advance
    pub cycle: Vec<InputMode>,
    /// Only advance when exactly one cell is selected
    pub single_only: bool,
}

impl Default for AutoAdvanceConfig {
    fn default() -> Self {
        Self {
            cycle: vec![InputMode::Category, InputMode::Expiry],
            single_only: true,
        }
    }
}

/// Next input mode and selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Advance {
    pub mode: InputMode,
    pub selection: Selection,
    /// The selection moved to another cell
    pub moved: bool,
}

impl Advance {
    fn stay(mode: InputMode, selection: &Selection) -> Self {
        Self {
            mode,
            selection: selection.clone(),
            moved: false,
        }
    }
}

/// Work out the mode and selection to show after an edit
///
/// `grid` is the current shelf, one vector of cells per column. While the
/// touched tray still lacks a field in the cycle, only the mode changes;
/// once it is complete the selection moves one cell forward, wrapping to
/// the start of the shelf.
pub fn auto_advance(
    config: &AutoAdvanceConfig,
    mode: InputMode,
    selection: &Selection,
    grid: &[Vec<TrayCell>],
    inventory: &Inventory,
) -> Advance {
    if config.cycle.is_empty() || (config.single_only && selection.len() > 1) {
        return Advance::stay(mode, selection);
    }
    let Some(touched) = selection.last_touched() else {
        return Advance::stay(mode, selection);
    };

    if let Some(fields) = tray_fields(touched, inventory) {
        if let Some(next) = next_needed(&config.cycle, mode, fields) {
            return Advance::stay(next, selection);
        }
    }

    let Some(furthest) = selection.iter().filter_map(|cell| position(grid, cell)).max() else {
        return Advance::stay(mode, selection);
    };
    let Some(target) = cell_after(grid, furthest) else {
        return Advance::stay(mode, selection);
    };

    let mode = match tray_fields(&target, inventory) {
        Some(fields) => config
            .cycle
            .iter()
            .copied()
            .find(|m| m.is_unset(fields))
            .unwrap_or(config.cycle[0]),
        None => config.cycle[0],
    };
    Advance {
        mode,
        selection: Selection::single(target),
        moved: true,
    }
}

fn tray_fields<'a>(cell: &TrayCell, inventory: &'a Inventory) -> Option<&'a TrayFields> {
    cell.tray_id()
        .and_then(|id| inventory.fields::<TrayFields>(id))
}

/// First unset mode after `current` in cycle order, `current` itself last
fn next_needed(cycle: &[InputMode], current: InputMode, fields: &TrayFields) -> Option<InputMode> {
    let start = cycle
        .iter()
        .position(|m| *m == current)
        .map_or(0, |at| at + 1);
    (0..cycle.len())
        .map(|offset| cycle[(start + offset) % cycle.len()])
        .find(|m| m.is_unset(fields))
}

fn position(grid: &[Vec<TrayCell>], cell: &TrayCell) -> Option<(usize, usize)> {
    grid.iter().enumerate().find_map(|(column, cells)| {
        cells
            .iter()
            .position(|c| c == cell)
            .map(|row| (column, row))
    })
}

fn cell_after(grid: &[Vec<TrayCell>], (column, row): (usize, usize)) -> Option<TrayCell> {
    if let Some(cell) = grid.get(column).and_then(|cells| cells.get(row + 1)) {
        return Some(cell.clone());
    }
    grid.iter()
        .skip(column + 1)
        .chain(grid.iter())
        .find_map(|cells| cells.first().cloned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::identity::LayerId;
    use crate::core::store::MemoryStore;
    use crate::entities::WarehouseFields;
    use crate::grid::space::ShelfView;
    use std::sync::Arc;

    struct Fixture {
        inv: Inventory,
        view: ShelfView,
        columns: Vec<LayerId>,
    }

    fn shelf(heights: &[(Option<u32>, usize)]) -> Fixture {
        let mut inv = Inventory::new(Arc::new(MemoryStore::new()), "tester");
        let w = inv.create_warehouse(WarehouseFields::new("Main"));
        let z = inv.create_zone(&w, "Dry").unwrap();
        let b = inv.create_bay(&z, "A").unwrap();
        let s = inv.create_shelf(&b, "1").unwrap();
        let mut columns = Vec::new();
        for (height, trays) in heights {
            let c = inv.create_column(&s, *height).unwrap();
            for _ in 0..*trays {
                inv.create_tray(&c, TrayFields::default()).unwrap();
            }
            columns.push(c);
        }
        Fixture {
            inv,
            view: ShelfView::new(s),
            columns,
        }
    }

    fn config(cycle: &[InputMode], single_only: bool) -> AutoAdvanceConfig {
        AutoAdvanceConfig {
            cycle: cycle.to_vec(),
            single_only,
        }
    }

    #[test]
    fn test_incomplete_tray_switches_mode_in_place() {
        let mut fx = shelf(&[(Some(2), 1)]);
        let tray = fx.inv.children(&fx.columns[0])[0].clone();
        fx.inv
            .update::<TrayFields, _>(&tray, |f| f.with_category(Some(LayerId::new())))
            .unwrap();
        let grid = fx.view.cell_grid(&fx.inv).unwrap();
        let sel = Selection::single(TrayCell::Tray(tray));

        let cfg = config(&[InputMode::Category, InputMode::Weight], true);
        let next = auto_advance(&cfg, InputMode::Category, &sel, &grid, &fx.inv);
        assert_eq!(next.mode, InputMode::Weight);
        assert_eq!(next.selection, sel);
        assert!(!next.moved);
    }

    #[test]
    fn test_complete_tray_moves_up_the_column() {
        let mut fx = shelf(&[(Some(3), 1)]);
        let tray = fx.inv.children(&fx.columns[0])[0].clone();
        fx.inv
            .update::<TrayFields, _>(&tray, |f| f.with_weight(Some(3.0)))
            .unwrap();
        let grid = fx.view.cell_grid(&fx.inv).unwrap();

        let cfg = config(&[InputMode::Weight], true);
        let next = auto_advance(&cfg, InputMode::Weight, &Selection::single(TrayCell::Tray(tray)), &grid, &fx.inv);
        assert!(next.moved);
        assert_eq!(next.selection, Selection::single(grid[0][1].clone()));
        assert_eq!(next.mode, InputMode::Weight);
    }

    #[test]
    fn test_top_of_column_moves_to_next_non_empty_column_then_wraps() {
        let mut fx = shelf(&[(Some(1), 0), (Some(1), 0)]);
        let grid = fx.view.cell_grid(&fx.inv).unwrap();
        let cfg = config(&[InputMode::Category], true);

        let first = auto_advance(&cfg, InputMode::Category, &Selection::single(grid[0][0].clone()), &grid, &fx.inv);
        assert_eq!(first.selection, Selection::single(grid[1][0].clone()));

        let wrapped = auto_advance(&cfg, InputMode::Category, &first.selection, &grid, &fx.inv);
        assert_eq!(wrapped.selection, Selection::single(grid[0][0].clone()));
    }

    #[test]
    fn test_single_only_blocks_multi_selection() {
        let mut fx = shelf(&[(Some(3), 0)]);
        let grid = fx.view.cell_grid(&fx.inv).unwrap();
        let sel: Selection = grid[0][..2].iter().cloned().collect();

        let blocked = auto_advance(&config(&[InputMode::Category], true), InputMode::Category, &sel, &grid, &fx.inv);
        assert!(!blocked.moved);

        let moved = auto_advance(&config(&[InputMode::Category], false), InputMode::Category, &sel, &grid, &fx.inv);
        assert_eq!(moved.selection, Selection::single(grid[0][2].clone()));
    }

    #[test]
    fn test_empty_cycle_and_empty_shelf_are_noops() {
        let fx = shelf(&[]);
        let sel = Selection::new();
        let next = auto_advance(&config(&[], false), InputMode::Weight, &sel, &[], &fx.inv);
        assert_eq!(next.mode, InputMode::Weight);
        assert!(!next.moved);
    }

    #[test]
    fn test_selection_on_empty_shelf_stays_put() {
        let mut fx = shelf(&[]);
        let grid = fx.view.cell_grid(&fx.inv).unwrap();
        assert!(grid.is_empty());
        let sel = Selection::single(TrayCell::Tray(LayerId::new()));

        let next = auto_advance(&config(&[InputMode::Category], true), InputMode::Expiry, &sel, &grid, &fx.inv);
        assert_eq!(next.mode, InputMode::Expiry);
        assert_eq!(next.selection, sel);
        assert!(!next.moved);
    }

    #[test]
    fn test_selection_outside_the_grid_stays_put() {
        let mut fx = shelf(&[(Some(2), 0)]);
        let grid = fx.view.cell_grid(&fx.inv).unwrap();
        let cfg = config(&[InputMode::Category], false);

        let stray = Selection::single(TrayCell::Tray(LayerId::new()));
        let next = auto_advance(&cfg, InputMode::Category, &stray, &grid, &fx.inv);
        assert_eq!(next.selection, stray);
        assert!(!next.moved);

        let nothing = auto_advance(&cfg, InputMode::Category, &Selection::new(), &grid, &fx.inv);
        assert!(nothing.selection.is_empty());
        assert!(!nothing.moved);
    }

    #[test]
    fn test_input_mode_parsing() {
        assert_eq!("Comment".parse::<InputMode>().unwrap(), InputMode::Custom);
        assert!("colour".parse::<InputMode>().is_err());
    }
}
