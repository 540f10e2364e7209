//! Player unit selection and range preview

use crate::board::{disk, ring, HexCoord};
use crate::unit::{Unit, UnitId};
use serde::{Deserialize, Serialize};

/// Shape highlighted around the selected unit
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RangeMode {
    #[default]
    None,
    Disk,
    Ring,
}

#[derive(Clone, Debug)]
pub struct Selection {
    selected: Option<UnitId>,
    pub range_mode: RangeMode,
    pub range_radius: i32,
}

impl Default for Selection {
    fn default() -> Self {
        Self::new()
    }
}

impl Selection {
    pub fn new() -> Self {
        Self {
            selected: None,
            range_mode: RangeMode::None,
            range_radius: 2,
        }
    }

    /// Only units the local player commands can be selected
    pub fn can_select(unit: &Unit) -> bool {
        unit.is_player_controlled()
    }

    pub fn selected(&self) -> Option<UnitId> {
        self.selected
    }

    /// Returns true if the selection actually changed
    pub fn set(&mut self, unit: Option<UnitId>) -> bool {
        if self.selected == unit {
            return false;
        }
        self.selected = unit;
        true
    }

    /// Clear if `unit` is the one selected
    pub fn forget(&mut self, unit: UnitId) -> bool {
        if self.selected == Some(unit) {
            self.selected = None;
            return true;
        }
        false
    }

    /// Cells to highlight around `center` for the current range mode
    pub fn preview(&self, center: HexCoord) -> Vec<HexCoord> {
        match self.range_mode {
            RangeMode::None => Vec::new(),
            RangeMode::Disk => disk(center, self.range_radius).collect(),
            RangeMode::Ring => ring(center, self.range_radius).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_reports_change() {
        let mut sel = Selection::new();
        assert!(sel.set(Some(UnitId(1))));
        assert!(!sel.set(Some(UnitId(1))));
        assert!(!sel.forget(UnitId(2)));
        assert!(sel.forget(UnitId(1)));
        assert_eq!(sel.selected(), None);
    }

    #[test]
    fn test_preview_modes() {
        let mut sel = Selection::new();
        let center = HexCoord::new(3, 3);
        assert!(sel.preview(center).is_empty());
        sel.range_mode = RangeMode::Disk;
        assert_eq!(sel.preview(center).len(), 19);
        sel.range_mode = RangeMode::Ring;
        assert_eq!(sel.preview(center).len(), 12);
    }
}
