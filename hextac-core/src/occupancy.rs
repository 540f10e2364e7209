//! Occupancy ledger: the single source of truth for which unit holds which cell
//!
//! Besides committed positions the ledger tracks reservations: the
//! destination of an in-flight move is reserved when the move is accepted so
//! no other command can claim it before the move commits.

use crate::board::HexCoord;
use crate::error::LedgerError;
use crate::unit::UnitId;
use rustc_hash::FxHashMap;

#[derive(Clone, Debug, Default)]
pub struct OccupancyLedger {
    cells: FxHashMap<HexCoord, UnitId>,
    positions: FxHashMap<UnitId, HexCoord>,
    reservations: FxHashMap<HexCoord, UnitId>,
    reserved_by: FxHashMap<UnitId, HexCoord>,
}

impl OccupancyLedger {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // QUERIES
    // ========================================================================

    pub fn has_unit_at(&self, c: HexCoord) -> bool {
        self.cells.contains_key(&c)
    }

    pub fn is_empty_at(&self, c: HexCoord) -> bool {
        !self.has_unit_at(c)
    }

    pub fn try_get_unit_at(&self, c: HexCoord) -> Option<UnitId> {
        self.cells.get(&c).copied()
    }

    /// Committed ledger position of a unit
    pub fn position_of(&self, unit: UnitId) -> Option<HexCoord> {
        self.positions.get(&unit).copied()
    }

    pub fn is_reserved(&self, c: HexCoord) -> bool {
        self.reservations.contains_key(&c)
    }

    /// Occupied or reserved
    pub fn is_blocked(&self, c: HexCoord) -> bool {
        self.has_unit_at(c) || self.is_reserved(c)
    }

    /// Holder of a cell other than `unit`, counting reservations
    fn other_holder(&self, c: HexCoord, unit: UnitId) -> Option<UnitId> {
        self.cells
            .get(&c)
            .or_else(|| self.reservations.get(&c))
            .copied()
            .filter(|&holder| holder != unit)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Committed (cell, unit) pairs
    pub fn iter(&self) -> impl Iterator<Item = (HexCoord, UnitId)> + '_ {
        self.cells.iter().map(|(&c, &u)| (c, u))
    }

    // ========================================================================
    // MUTATION
    // ========================================================================

    /// Place a unit at `coords`, dropping any stale mapping it had.
    /// Registering again at the same cell is a no-op.
    pub fn register(&mut self, unit: UnitId, coords: HexCoord) -> Result<(), LedgerError> {
        if let Some(holder) = self.other_holder(coords, unit) {
            return Err(LedgerError::Occupied { coords, holder });
        }
        if let Some(old) = self.positions.remove(&unit) {
            self.cells.remove(&old);
        }
        self.cells.insert(coords, unit);
        self.positions.insert(unit, coords);
        Ok(())
    }

    /// Remove a unit and any reservation it holds. No-op if absent.
    pub fn unregister(&mut self, unit: UnitId) -> Option<HexCoord> {
        self.release(unit);
        let old = self.positions.remove(&unit)?;
        self.cells.remove(&old);
        Some(old)
    }

    /// Claim the destination of an accepted move
    pub fn reserve(&mut self, unit: UnitId, to: HexCoord) -> Result<(), LedgerError> {
        if let Some(holder) = self.other_holder(to, unit) {
            return Err(LedgerError::Occupied { coords: to, holder });
        }
        self.release(unit);
        self.reservations.insert(to, unit);
        self.reserved_by.insert(unit, to);
        Ok(())
    }

    /// Drop a unit's reservation, if any
    pub fn release(&mut self, unit: UnitId) {
        if let Some(c) = self.reserved_by.remove(&unit) {
            self.reservations.remove(&c);
        }
    }

    /// Move a unit from `from` to `to`. The `from` entry is only cleared if it
    /// still belongs to `unit`; the unit's reservation is consumed.
    pub fn relocate(
        &mut self,
        unit: UnitId,
        from: HexCoord,
        to: HexCoord,
    ) -> Result<(), LedgerError> {
        if let Some(holder) = self.other_holder(to, unit) {
            return Err(LedgerError::Occupied { coords: to, holder });
        }
        if self.cells.get(&from) == Some(&unit) {
            self.cells.remove(&from);
        }
        if let Some(stale) = self.positions.insert(unit, to) {
            if self.cells.get(&stale) == Some(&unit) {
                self.cells.remove(&stale);
            }
        }
        self.cells.insert(to, unit);
        self.release(unit);
        Ok(())
    }

    /// Check that the ledger agrees with a unit's own position
    pub fn verify(&self, unit: UnitId, coords: HexCoord) -> Result<(), LedgerError> {
        let found = self.position_of(unit);
        if found != Some(coords) || self.try_get_unit_at(coords) != Some(unit) {
            return Err(LedgerError::Mismatch {
                unit,
                expected: coords,
                found,
            });
        }
        Ok(())
    }

    pub fn clear(&mut self) {
        self.cells.clear();
        self.positions.clear();
        self.reservations.clear();
        self.reserved_by.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashMap;

    fn c(q: i32, r: i32) -> HexCoord {
        HexCoord::new(q, r)
    }

    #[test]
    fn test_register_and_query() {
        let mut ledger = OccupancyLedger::new();
        ledger.register(UnitId(1), c(2, 2)).unwrap();
        assert!(ledger.has_unit_at(c(2, 2)));
        assert_eq!(ledger.try_get_unit_at(c(2, 2)), Some(UnitId(1)));
        assert!(ledger.is_empty_at(c(3, 2)));
        assert_eq!(ledger.position_of(UnitId(1)), Some(c(2, 2)));
    }

    #[test]
    fn test_register_is_idempotent_and_drops_stale() {
        let mut ledger = OccupancyLedger::new();
        ledger.register(UnitId(1), c(0, 0)).unwrap();
        ledger.register(UnitId(1), c(0, 0)).unwrap();
        assert_eq!(ledger.len(), 1);
        ledger.register(UnitId(1), c(4, 4)).unwrap();
        assert_eq!(ledger.len(), 1);
        assert!(ledger.is_empty_at(c(0, 0)));
        assert_eq!(ledger.try_get_unit_at(c(4, 4)), Some(UnitId(1)));
    }

    #[test]
    fn test_register_conflict_rejected() {
        let mut ledger = OccupancyLedger::new();
        ledger.register(UnitId(1), c(1, 1)).unwrap();
        let err = ledger.register(UnitId(2), c(1, 1)).unwrap_err();
        assert_eq!(
            err,
            LedgerError::Occupied {
                coords: c(1, 1),
                holder: UnitId(1)
            }
        );
        assert_eq!(ledger.try_get_unit_at(c(1, 1)), Some(UnitId(1)));
        assert_eq!(ledger.position_of(UnitId(2)), None);
    }

    #[test]
    fn test_unregister() {
        let mut ledger = OccupancyLedger::new();
        ledger.register(UnitId(1), c(1, 1)).unwrap();
        ledger.reserve(UnitId(1), c(2, 1)).unwrap();
        assert_eq!(ledger.unregister(UnitId(1)), Some(c(1, 1)));
        assert!(ledger.is_empty());
        assert!(!ledger.is_reserved(c(2, 1)));
        assert_eq!(ledger.unregister(UnitId(1)), None);
    }

    #[test]
    fn test_reservation_blocks_others() {
        let mut ledger = OccupancyLedger::new();
        ledger.register(UnitId(1), c(0, 0)).unwrap();
        ledger.register(UnitId(2), c(2, 0)).unwrap();
        ledger.reserve(UnitId(1), c(1, 0)).unwrap();

        assert!(ledger.is_blocked(c(1, 0)));
        assert!(!ledger.has_unit_at(c(1, 0)));
        assert!(ledger.reserve(UnitId(2), c(1, 0)).is_err());
        assert!(ledger.register(UnitId(3), c(1, 0)).is_err());
    }

    #[test]
    fn test_relocate_consumes_reservation() {
        let mut ledger = OccupancyLedger::new();
        ledger.register(UnitId(1), c(0, 0)).unwrap();
        ledger.reserve(UnitId(1), c(1, 0)).unwrap();
        ledger.relocate(UnitId(1), c(0, 0), c(1, 0)).unwrap();

        assert!(ledger.is_empty_at(c(0, 0)));
        assert_eq!(ledger.try_get_unit_at(c(1, 0)), Some(UnitId(1)));
        assert!(!ledger.is_reserved(c(1, 0)));
        assert!(ledger.verify(UnitId(1), c(1, 0)).is_ok());
    }

    #[test]
    fn test_relocate_leaves_foreign_source() {
        let mut ledger = OccupancyLedger::new();
        ledger.register(UnitId(1), c(0, 0)).unwrap();
        ledger.register(UnitId(2), c(5, 5)).unwrap();
        // Unit 2 claims to leave (0,0), which belongs to unit 1
        ledger.relocate(UnitId(2), c(0, 0), c(5, 6)).unwrap();
        assert_eq!(ledger.try_get_unit_at(c(0, 0)), Some(UnitId(1)));
        assert_eq!(ledger.try_get_unit_at(c(5, 6)), Some(UnitId(2)));
        assert!(ledger.is_empty_at(c(5, 5)));
    }

    #[test]
    fn test_verify_mismatch() {
        let mut ledger = OccupancyLedger::new();
        ledger.register(UnitId(1), c(0, 0)).unwrap();
        assert!(matches!(
            ledger.verify(UnitId(1), c(3, 3)),
            Err(LedgerError::Mismatch { .. })
        ));
    }

    #[derive(Clone, Debug)]
    enum Op {
        Register(u32, i32, i32),
        Unregister(u32),
        Relocate(u32, i32, i32),
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0u32..6, 0i32..4, 0i32..4).prop_map(|(u, q, r)| Op::Register(u, q, r)),
            (0u32..6).prop_map(Op::Unregister),
            (0u32..6, 0i32..4, 0i32..4).prop_map(|(u, q, r)| Op::Relocate(u, q, r)),
        ]
    }

    proptest! {
        #[test]
        fn ledger_matches_unit_positions(ops in proptest::collection::vec(op_strategy(), 1..60)) {
            let mut ledger = OccupancyLedger::new();
            // Each unit's own idea of where it stands
            let mut coords: HashMap<UnitId, HexCoord> = HashMap::new();

            for op in ops {
                match op {
                    Op::Register(u, q, r) => {
                        let unit = UnitId(u);
                        let to = c(q, r);
                        if !ledger.is_blocked(to) || ledger.try_get_unit_at(to) == Some(unit) {
                            ledger.register(unit, to).unwrap();
                            coords.insert(unit, to);
                        }
                    }
                    Op::Unregister(u) => {
                        ledger.unregister(UnitId(u));
                        coords.remove(&UnitId(u));
                    }
                    Op::Relocate(u, q, r) => {
                        let unit = UnitId(u);
                        let to = c(q, r);
                        if let Some(&from) = coords.get(&unit) {
                            if !ledger.is_blocked(to) {
                                ledger.relocate(unit, from, to).unwrap();
                                coords.insert(unit, to);
                            }
                        }
                    }
                }

                prop_assert_eq!(ledger.len(), coords.len());
                for (&unit, &at) in &coords {
                    prop_assert!(ledger.verify(unit, at).is_ok());
                }
            }
        }
    }
}
