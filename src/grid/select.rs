//! Tray selection and drag range selection

use std::collections::HashSet;
use std::time::{Duration, Instant};

use super::space::TrayCell;

/// How long a press must be held before it starts a drag
pub const DRAG_HOLD_THRESHOLD: Duration = Duration::from_millis(300);

/// Selected cells in the order they were added
#[derive(Debug, Clone, Default)]
pub struct Selection {
    order: Vec<TrayCell>,
    members: HashSet<TrayCell>,
    touched: Option<TrayCell>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// A selection holding just `cell`
    pub fn single(cell: TrayCell) -> Self {
        let mut selection = Self::new();
        selection.insert(cell);
        selection
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, cell: &TrayCell) -> bool {
        self.members.contains(cell)
    }

    /// Add a cell and mark it as the most recently touched
    pub fn insert(&mut self, cell: TrayCell) -> bool {
        self.touched = Some(cell.clone());
        if self.members.insert(cell.clone()) {
            self.order.push(cell);
            true
        } else {
            false
        }
    }

    pub fn remove(&mut self, cell: &TrayCell) -> bool {
        if !self.members.remove(cell) {
            return false;
        }
        self.order.retain(|c| c != cell);
        if self.touched.as_ref() == Some(cell) {
            self.touched = self.order.last().cloned();
        }
        true
    }

    /// Flip a cell's membership; returns whether it is now selected
    pub fn toggle(&mut self, cell: TrayCell) -> bool {
        if self.contains(&cell) {
            self.remove(&cell);
            false
        } else {
            self.insert(cell);
            true
        }
    }

    pub fn clear(&mut self) {
        self.order.clear();
        self.members.clear();
        self.touched = None;
    }

    pub fn iter(&self) -> impl Iterator<Item = &TrayCell> {
        self.order.iter()
    }

    /// The cell most recently added or dragged to
    pub fn last_touched(&self) -> Option<&TrayCell> {
        self.touched.as_ref()
    }

    fn touch(&mut self, cell: &TrayCell) {
        self.touched = Some(cell.clone());
    }
}

// equality is set equality; order and touch history are ignored
impl PartialEq for Selection {
    fn eq(&self, other: &Self) -> bool {
        self.members == other.members
    }
}

impl Eq for Selection {}

impl FromIterator<TrayCell> for Selection {
    fn from_iter<I: IntoIterator<Item = TrayCell>>(iter: I) -> Self {
        let mut selection = Self::new();
        for cell in iter {
            selection.insert(cell);
        }
        selection
    }
}

/// Add every cell between `from` and `to` (inclusive) to `base`
///
/// `sequence` is the shelf flattened column by column. Only one walk is
/// made: a cell is taken while inside the range or when it is one of the
/// ends, and passing an end flips whether we are inside. Calling this again
/// with the same `base` replaces the previous range instead of adding to it.
pub fn range_select(sequence: &[TrayCell], base: &Selection, from: &TrayCell, to: &TrayCell) -> Selection {
    let mut selection = base.clone();
    let mut is_selecting = false;
    for cell in sequence {
        let is_from = cell == from;
        let is_to = cell == to;
        if is_selecting || is_from || is_to {
            selection.insert(cell.clone());
        }
        is_selecting ^= is_from ^ is_to;
    }
    selection.touch(to);
    selection
}

/// Result of releasing a press
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Gesture {
    /// Released before the hold threshold
    Tap(TrayCell),
    /// A drag finished; the selection is whatever the last drag step produced
    DragEnd,
    None,
}

/// Press / hold / drag tracking for the grid
#[derive(Debug, Default)]
pub struct DragState {
    pressed: Option<(Instant, TrayCell)>,
    origin: Option<TrayCell>,
    base: Selection,
}

impl DragState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn press(&mut self, cell: TrayCell, at: Instant) {
        self.pressed = Some((at, cell));
        self.origin = None;
    }

    /// Start dragging once the press has been held long enough
    ///
    /// Snapshots `current` as the base every drag step builds on. Returns
    /// whether a drag is in progress.
    pub fn hold(&mut self, now: Instant, current: &Selection) -> bool {
        if self.origin.is_some() {
            return true;
        }
        match &self.pressed {
            Some((at, cell)) if now.saturating_duration_since(*at) >= DRAG_HOLD_THRESHOLD => {
                self.origin = Some(cell.clone());
                self.base = current.clone();
                true
            }
            _ => false,
        }
    }

    pub fn is_dragging(&self) -> bool {
        self.origin.is_some()
    }

    /// Selection after dragging over `cell`, or `None` when not dragging
    pub fn drag_over(&self, cell: &TrayCell, sequence: &[TrayCell]) -> Option<Selection> {
        let origin = self.origin.as_ref()?;
        Some(range_select(sequence, &self.base, origin, cell))
    }

    pub fn release(&mut self, now: Instant) -> Gesture {
        let pressed = self.pressed.take();
        if self.origin.take().is_some() {
            self.base.clear();
            return Gesture::DragEnd;
        }
        match pressed {
            Some((at, cell)) if now.saturating_duration_since(at) < DRAG_HOLD_THRESHOLD => {
                Gesture::Tap(cell)
            }
            _ => Gesture::None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::identity::LayerId;

    fn cells(n: usize) -> Vec<TrayCell> {
        (0..n)
            .map(|i| TrayCell::Tray(LayerId::parse(&format!("T{i}")).unwrap()))
            .collect()
    }

    #[test]
    fn test_range_is_inclusive_and_symmetric() {
        let seq = cells(6);
        let base = Selection::new();
        let forward = range_select(&seq, &base, &seq[1], &seq[4]);
        let backward = range_select(&seq, &base, &seq[4], &seq[1]);
        assert_eq!(forward, backward);
        assert_eq!(forward, seq[1..=4].iter().cloned().collect());
    }

    #[test]
    fn test_range_of_one_cell() {
        let seq = cells(4);
        let sel = range_select(&seq, &Selection::new(), &seq[2], &seq[2]);
        assert_eq!(sel, Selection::single(seq[2].clone()));
    }

    #[test]
    fn test_range_keeps_base_but_does_not_compound() {
        let seq = cells(6);
        let base = Selection::single(seq[5].clone());
        let wide = range_select(&seq, &base, &seq[0], &seq[3]);
        assert_eq!(wide.len(), 5);
        let narrow = range_select(&seq, &base, &seq[0], &seq[1]);
        assert_eq!(narrow, [&seq[0], &seq[1], &seq[5]].into_iter().cloned().collect());
        assert_eq!(narrow.last_touched(), Some(&seq[1]));
    }

    #[test]
    fn test_selection_remove_updates_touched() {
        let seq = cells(3);
        let mut sel: Selection = seq.iter().cloned().collect();
        assert_eq!(sel.last_touched(), Some(&seq[2]));
        assert!(sel.remove(&seq[2]));
        assert_eq!(sel.last_touched(), Some(&seq[1]));
        assert!(!sel.toggle(seq[0].clone()));
        assert_eq!(sel.len(), 1);
    }

    #[test]
    fn test_short_press_is_a_tap() {
        let seq = cells(2);
        let start = Instant::now();
        let mut drag = DragState::new();
        drag.press(seq[0].clone(), start);
        assert!(!drag.hold(start + Duration::from_millis(100), &Selection::new()));
        assert_eq!(
            drag.release(start + Duration::from_millis(150)),
            Gesture::Tap(seq[0].clone())
        );
    }

    #[test]
    fn test_held_press_drags_a_range() {
        let seq = cells(4);
        let start = Instant::now();
        let mut drag = DragState::new();
        drag.press(seq[0].clone(), start);
        assert!(drag.drag_over(&seq[2], &seq).is_none());
        assert!(drag.hold(start + DRAG_HOLD_THRESHOLD, &Selection::new()));

        let sel = drag.drag_over(&seq[2], &seq).unwrap();
        assert_eq!(sel, seq[0..=2].iter().cloned().collect());
        assert_eq!(drag.release(start + Duration::from_secs(1)), Gesture::DragEnd);
        assert!(!drag.is_dragging());
    }
}
