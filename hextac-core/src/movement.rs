//! Single-step movement and in-flight transits
//!
//! A step is validated, paid for and its destination reserved when it is
//! accepted. The unit's committed position only changes when the transit
//! completes, which happens exactly once per accepted step.

use crate::board::HexCoord;
use crate::error::CommandError;
use crate::grid::GridSnapshotProvider;
use crate::occupancy::OccupancyLedger;
use crate::unit::{Resource, Unit, UnitId};
use rustc_hash::FxHashMap;

/// Seconds to cross one tile when nothing else is configured
pub const DEFAULT_SECONDS_PER_TILE: f32 = 0.18;

/// Per-destination stride cost
pub type MoveCost = Box<dyn Fn(HexCoord) -> u32>;

/// Callback run when a transit commits
pub type OnMoveDone = Box<dyn FnOnce(&Transit)>;

/// One accepted step in progress
pub struct Transit {
    pub unit: UnitId,
    pub from: HexCoord,
    pub to: HexCoord,
    pub elapsed: f32,
    pub duration: f32,
    on_done: Option<OnMoveDone>,
}

impl Transit {
    /// Fraction of the step covered, in [0, 1]
    pub fn progress(&self) -> f32 {
        if self.duration <= 0.0 {
            return 1.0;
        }
        (self.elapsed / self.duration).clamp(0.0, 1.0)
    }

    pub fn is_complete(&self) -> bool {
        self.elapsed >= self.duration
    }

    /// Fire the completion callback, at most once
    pub(crate) fn finish(&mut self) {
        if let Some(done) = self.on_done.take() {
            done(self);
        }
    }
}

impl std::fmt::Debug for Transit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transit")
            .field("unit", &self.unit)
            .field("from", &self.from)
            .field("to", &self.to)
            .field("elapsed", &self.elapsed)
            .field("duration", &self.duration)
            .finish()
    }
}

/// Validates steps and owns every in-flight transit
pub struct MovementResolver {
    transits: FxHashMap<UnitId, Transit>,
    seconds_per_tile: f32,
    cost: Option<MoveCost>,
}

impl Default for MovementResolver {
    fn default() -> Self {
        Self::new(DEFAULT_SECONDS_PER_TILE)
    }
}

impl MovementResolver {
    pub fn new(seconds_per_tile: f32) -> Self {
        Self {
            transits: FxHashMap::default(),
            seconds_per_tile: seconds_per_tile.max(0.0),
            cost: None,
        }
    }

    pub fn seconds_per_tile(&self) -> f32 {
        self.seconds_per_tile
    }

    /// Replace the per-tile cost function; `None` restores cost 1 everywhere
    pub fn set_cost_fn(&mut self, cost: Option<MoveCost>) {
        self.cost = cost;
    }

    /// Stride cost of entering `dst`, never below 1
    pub fn cost_of(&self, dst: HexCoord) -> u32 {
        self.cost.as_ref().map_or(1, |f| f(dst).max(1))
    }

    pub fn is_in_transit(&self, unit: UnitId) -> bool {
        self.transits.contains_key(&unit)
    }

    pub fn transit(&self, unit: UnitId) -> Option<&Transit> {
        self.transits.get(&unit)
    }

    pub fn in_flight(&self) -> usize {
        self.transits.len()
    }

    /// Full validation of a step. Returns the stride cost on success.
    pub fn check_step(
        &self,
        unit: &Unit,
        dst: HexCoord,
        grid: &dyn GridSnapshotProvider,
        ledger: &OccupancyLedger,
    ) -> Result<u32, CommandError> {
        if self.is_in_transit(unit.id) {
            return Err(CommandError::AlreadyInTransit(unit.id));
        }
        let distance = unit.coords.distance_to(dst);
        if distance != 1 {
            return Err(CommandError::NotAdjacent {
                from: unit.coords,
                to: dst,
                distance,
            });
        }
        if !grid.contains(dst) {
            return Err(CommandError::OutOfBounds(dst));
        }
        if ledger.is_blocked(dst) {
            return Err(CommandError::TileOccupied(dst));
        }
        let cost = self.cost_of(dst);
        if !unit.budget.can_afford(Resource::Stride, cost) {
            return Err(CommandError::InsufficientResource {
                resource: Resource::Stride,
                needed: cost,
                left: unit.budget.stride_left(),
            });
        }
        Ok(cost)
    }

    /// Validate, pay, reserve the destination and start a transit.
    /// Nothing changes if validation fails.
    pub fn try_step_to(
        &mut self,
        unit: &mut Unit,
        dst: HexCoord,
        grid: &dyn GridSnapshotProvider,
        ledger: &mut OccupancyLedger,
        on_done: Option<OnMoveDone>,
    ) -> Result<(), CommandError> {
        let cost = self.check_step(unit, dst, grid, ledger)?;
        ledger.reserve(unit.id, dst)?;
        if !unit.budget.try_spend(Resource::Stride, cost) {
            ledger.release(unit.id);
            return Err(CommandError::InvariantViolation(format!(
                "stride check passed but spend failed for {}",
                unit.id
            )));
        }

        self.transits.insert(
            unit.id,
            Transit {
                unit: unit.id,
                from: unit.coords,
                to: dst,
                elapsed: 0.0,
                duration: self.seconds_per_tile,
                on_done,
            },
        );
        Ok(())
    }

    /// Advance every transit by `dt` seconds and hand back those that
    /// completed, ordered by unit id
    pub fn advance(&mut self, dt: f32) -> Vec<Transit> {
        let dt = dt.max(0.0);
        let mut done = Vec::new();
        for transit in self.transits.values_mut() {
            transit.elapsed += dt;
            if transit.is_complete() {
                done.push(transit.unit);
            }
        }
        done.sort();
        done.into_iter()
            .filter_map(|unit| self.transits.remove(&unit))
            .collect()
    }

    /// Drop a transit without committing it (unit despawned)
    pub fn cancel(&mut self, unit: UnitId) -> Option<Transit> {
        self.transits.remove(&unit)
    }

    pub fn clear(&mut self) {
        self.transits.clear();
    }
}

impl std::fmt::Debug for MovementResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MovementResolver")
            .field("transits", &self.transits)
            .field("seconds_per_tile", &self.seconds_per_tile)
            .field("custom_cost", &self.cost.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{GridRecipe, HexGrid};
    use crate::unit::{Faction, UnitSpawn};
    use std::cell::Cell;
    use std::rc::Rc;

    fn c(q: i32, r: i32) -> HexCoord {
        HexCoord::new(q, r)
    }

    fn setup(at: HexCoord) -> (Unit, OccupancyLedger) {
        let unit = UnitSpawn::new("scout", Faction::Player, at).into_unit(UnitId(1));
        let mut ledger = OccupancyLedger::new();
        ledger.register(unit.id, unit.coords).unwrap();
        (unit, ledger)
    }

    #[test]
    fn test_step_spends_on_acceptance() {
        let grid = HexGrid::unbounded();
        let (mut unit, mut ledger) = setup(c(2, 2));
        let mut mover = MovementResolver::new(0.5);

        mover
            .try_step_to(&mut unit, c(3, 2), &grid, &mut ledger, None)
            .unwrap();
        assert_eq!(unit.budget.stride_left(), 2);
        assert_eq!(unit.coords, c(2, 2), "position commits on completion");
        assert!(ledger.is_reserved(c(3, 2)));
        assert!(mover.is_in_transit(unit.id));

        assert!(mover.advance(0.2).is_empty());
        let done = mover.advance(0.3);
        assert_eq!(done.len(), 1);
        assert_eq!(done[0].to, c(3, 2));
        assert!(!mover.is_in_transit(unit.id));
    }

    #[test]
    fn test_check_order() {
        let grid = HexGrid::from_recipe(&GridRecipe::default());
        let (mut unit, mut ledger) = setup(c(0, 0));
        let mut mover = MovementResolver::default();

        assert!(matches!(
            mover.check_step(&unit, c(2, 0), &grid, &ledger),
            Err(CommandError::NotAdjacent { distance: 2, .. })
        ));
        assert_eq!(
            mover.check_step(&unit, c(-1, 0), &grid, &ledger),
            Err(CommandError::OutOfBounds(c(-1, 0)))
        );

        ledger.register(UnitId(2), c(1, 0)).unwrap();
        assert_eq!(
            mover.check_step(&unit, c(1, 0), &grid, &ledger),
            Err(CommandError::TileOccupied(c(1, 0)))
        );

        mover
            .try_step_to(&mut unit, c(0, 1), &grid, &mut ledger, None)
            .unwrap();
        assert_eq!(
            mover.check_step(&unit, c(0, 1), &grid, &ledger),
            Err(CommandError::AlreadyInTransit(unit.id))
        );
    }

    #[test]
    fn test_insufficient_stride_leaves_state() {
        let grid = HexGrid::unbounded();
        let (mut unit, mut ledger) = setup(c(0, 0));
        let mut mover = MovementResolver::default();
        mover.set_cost_fn(Some(Box::new(|_| 5)));

        let err = mover
            .try_step_to(&mut unit, c(1, 0), &grid, &mut ledger, None)
            .unwrap_err();
        assert_eq!(
            err,
            CommandError::InsufficientResource {
                resource: Resource::Stride,
                needed: 5,
                left: 3
            }
        );
        assert_eq!(unit.budget.stride_left(), 3);
        assert!(!ledger.is_reserved(c(1, 0)));
        assert!(!mover.is_in_transit(unit.id));
    }

    #[test]
    fn test_cost_clamped_to_one() {
        let mut mover = MovementResolver::default();
        mover.set_cost_fn(Some(Box::new(|_| 0)));
        assert_eq!(mover.cost_of(c(4, 4)), 1);
        mover.set_cost_fn(None);
        assert_eq!(mover.cost_of(c(4, 4)), 1);
    }

    #[test]
    fn test_on_done_runs_once() {
        let grid = HexGrid::unbounded();
        let (mut unit, mut ledger) = setup(c(0, 0));
        let mut mover = MovementResolver::new(0.0);
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);

        mover
            .try_step_to(
                &mut unit,
                c(1, 0),
                &grid,
                &mut ledger,
                Some(Box::new(move |_| counter.set(counter.get() + 1))),
            )
            .unwrap();
        let mut done = mover.advance(0.0);
        assert_eq!(done.len(), 1);
        done[0].finish();
        done[0].finish();
        assert_eq!(calls.get(), 1);
        assert!(mover.advance(1.0).is_empty());
    }
}
