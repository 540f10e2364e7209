//! Battlefield: units, occupancy, transits and ability resolution
//!
//! Every mutation of battle state goes through this type. Commands are
//! validated in full before anything is applied, so a rejected command
//! leaves no trace. If the occupancy ledger is ever found to disagree with
//! a unit's own position the battlefield freezes: every later mutation
//! returns `CommandError::InvariantViolation`.

use crate::ability::{Ability, AbilityBook, AbilityContext, Cooldowns, Effect};
use crate::board::{HexCoord, Layout, WorldPos};
use crate::error::CommandError;
use crate::events::{BattleEvent, EventBus};
use crate::grid::{GridSnapshotProvider, HexGrid};
use crate::movement::{MoveCost, MovementResolver, OnMoveDone, Transit};
use crate::occupancy::OccupancyLedger;
use crate::selection::Selection;
use crate::targeting;
use crate::unit::{Resource, Side, Unit, UnitId, UnitSpawn};
use rustc_hash::FxHashMap;

pub struct Battlefield {
    units: FxHashMap<UnitId, Unit>,
    next_id: u32,
    ledger: OccupancyLedger,
    grid: Box<dyn GridSnapshotProvider>,
    layout: Layout,
    abilities: AbilityBook,
    cooldowns: Cooldowns,
    movement: MovementResolver,
    selection: Selection,
    events: EventBus,
    /// Set once an invariant violation is detected
    poisoned: Option<String>,
}

impl Battlefield {
    pub fn new(
        grid: Box<dyn GridSnapshotProvider>,
        layout: Layout,
        abilities: AbilityBook,
        seconds_per_tile: f32,
    ) -> Self {
        Self {
            units: FxHashMap::default(),
            next_id: 1,
            ledger: OccupancyLedger::new(),
            grid,
            layout,
            abilities,
            cooldowns: Cooldowns::default(),
            movement: MovementResolver::new(seconds_per_tile),
            selection: Selection::new(),
            events: EventBus::new(),
            poisoned: None,
        }
    }

    /// Battlefield over a recipe-built grid, using the grid's own layout
    pub fn with_grid(grid: HexGrid, abilities: AbilityBook, seconds_per_tile: f32) -> Self {
        let layout = grid.layout();
        Self::new(Box::new(grid), layout, abilities, seconds_per_tile)
    }

    // ========================================================================
    // QUERIES
    // ========================================================================

    pub fn unit(&self, id: UnitId) -> Option<&Unit> {
        self.units.get(&id)
    }

    pub fn contains(&self, id: UnitId) -> bool {
        self.units.contains_key(&id)
    }

    /// All live units, ordered by id
    pub fn units(&self) -> Vec<&Unit> {
        let mut units: Vec<&Unit> = self.units.values().collect();
        units.sort_by_key(|u| u.id);
        units
    }

    pub fn unit_count(&self) -> usize {
        self.units.len()
    }

    /// Live units acting on `side`, ordered by id
    pub fn roster(&self, side: Side) -> Vec<UnitId> {
        let mut ids: Vec<UnitId> = self
            .units
            .values()
            .filter(|u| u.side() == Some(side) && !u.health.is_dead())
            .map(|u| u.id)
            .collect();
        ids.sort();
        ids
    }

    pub fn has_unit_at(&self, c: HexCoord) -> bool {
        self.ledger.has_unit_at(c)
    }

    pub fn try_get_unit_at(&self, c: HexCoord) -> Option<&Unit> {
        self.ledger
            .try_get_unit_at(c)
            .and_then(|id| self.units.get(&id))
    }

    pub fn can_step_to(&self, id: UnitId, dst: HexCoord) -> bool {
        self.check_step(id, dst).is_ok()
    }

    /// Why a step would be refused, or its stride cost
    pub fn check_step(&self, id: UnitId, dst: HexCoord) -> Result<u32, CommandError> {
        self.guard()?;
        let unit = self.units.get(&id).ok_or(CommandError::UnknownUnit(id))?;
        self.movement
            .check_step(unit, dst, self.grid.as_ref(), &self.ledger)
    }

    pub fn tiles_in_range(&self, origin: HexCoord, min: u32, max: u32) -> Vec<HexCoord> {
        targeting::tiles_in_range(origin, min, max)
            .filter(|&c| self.grid.contains(c))
            .collect()
    }

    pub fn is_in_transit(&self, id: UnitId) -> bool {
        self.movement.is_in_transit(id)
    }

    pub fn transit(&self, id: UnitId) -> Option<&Transit> {
        self.movement.transit(id)
    }

    pub fn transits_in_flight(&self) -> usize {
        self.movement.in_flight()
    }

    /// Where a unit should be drawn, interpolated while in transit
    pub fn world_position(&self, id: UnitId) -> Option<WorldPos> {
        let unit = self.units.get(&id)?;
        let pos = match self.movement.transit(id) {
            Some(t) => {
                let a = self.layout.grid_to_world(t.from);
                let b = self.layout.grid_to_world(t.to);
                a.lerp(b, t.progress())
            }
            None => self.layout.grid_to_world(unit.coords),
        };
        Some(pos)
    }

    pub fn ability(&self, id: &str) -> Option<&Ability> {
        self.abilities.get(id)
    }

    pub fn cooldown(&self, unit: UnitId, ability: &str) -> u32 {
        self.cooldowns.remaining(unit, ability)
    }

    pub fn ledger(&self) -> &OccupancyLedger {
        &self.ledger
    }

    pub fn grid(&self) -> &dyn GridSnapshotProvider {
        self.grid.as_ref()
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    pub fn selected(&self) -> Option<UnitId> {
        self.selection.selected()
    }

    pub fn selection_mut(&mut self) -> &mut Selection {
        &mut self.selection
    }

    pub fn is_poisoned(&self) -> bool {
        self.poisoned.is_some()
    }

    // ========================================================================
    // EVENTS
    // ========================================================================

    pub fn subscribe(&mut self, f: impl FnMut(&BattleEvent) + 'static) {
        self.events.subscribe(f);
    }

    pub fn drain_events(&mut self) -> Vec<BattleEvent> {
        self.events.drain()
    }

    pub(crate) fn emit(&mut self, event: BattleEvent) {
        self.events.emit(event);
    }

    // ========================================================================
    // INVARIANTS
    // ========================================================================

    fn guard(&self) -> Result<(), CommandError> {
        match &self.poisoned {
            Some(reason) => Err(CommandError::InvariantViolation(reason.clone())),
            None => Ok(()),
        }
    }

    /// Freeze the battlefield and report the violation
    fn poison(&mut self, reason: String) -> CommandError {
        if self.poisoned.is_none() {
            tracing::error!("Occupancy invariant violated, refusing further mutation: {}", reason);
            self.poisoned = Some(reason.clone());
        }
        CommandError::InvariantViolation(reason)
    }

    /// Move a unit without telling the ledger
    #[cfg(test)]
    pub(crate) fn displace_unchecked(&mut self, id: UnitId, to: HexCoord) {
        if let Some(unit) = self.units.get_mut(&id) {
            unit.coords = to;
        }
    }

    /// Pass rejections through, freeze on fatal ones
    fn fail(&mut self, err: CommandError) -> CommandError {
        match err {
            CommandError::InvariantViolation(reason) => self.poison(reason),
            other => other,
        }
    }

    fn verify_unit(&mut self, id: UnitId) -> Result<(), CommandError> {
        let coords = self
            .units
            .get(&id)
            .ok_or(CommandError::UnknownUnit(id))?
            .coords;
        if let Err(e) = self.ledger.verify(id, coords) {
            return Err(self.poison(e.to_string()));
        }
        Ok(())
    }

    /// Check every unit against the ledger
    pub fn audit(&mut self) -> Result<(), CommandError> {
        self.guard()?;
        let mut ids: Vec<UnitId> = self.units.keys().copied().collect();
        ids.sort();
        for id in ids {
            self.verify_unit(id)?;
        }
        if self.ledger.len() != self.units.len() {
            let reason = format!(
                "ledger holds {} units, battlefield has {}",
                self.ledger.len(),
                self.units.len()
            );
            return Err(self.poison(reason));
        }
        Ok(())
    }

    // ========================================================================
    // LIFECYCLE
    // ========================================================================

    pub fn spawn(&mut self, spawn: UnitSpawn) -> Result<UnitId, CommandError> {
        self.guard()?;
        if !self.grid.contains(spawn.coords) {
            return Err(CommandError::OutOfBounds(spawn.coords));
        }
        if let Some(missing) = spawn.abilities.iter().find(|a| self.abilities.get(a).is_none()) {
            return Err(CommandError::UnknownAbility(missing.clone()));
        }

        let id = UnitId(self.next_id);
        self.ledger.register(id, spawn.coords)?;
        self.next_id += 1;

        let unit = spawn.into_unit(id);
        tracing::debug!("Spawned {} {} ({:?}) at {}", id, unit.name, unit.faction, unit.coords);
        self.units.insert(id, unit);
        Ok(id)
    }

    /// Remove a unit: ledger first, then transit, cooldowns and selection
    pub fn despawn(&mut self, id: UnitId) -> Option<Unit> {
        self.ledger.unregister(id);
        if self.movement.cancel(id).is_some() {
            tracing::debug!("Dropped transit of despawned unit {}", id);
        }
        self.cooldowns.forget_unit(id);
        if self.selection.forget(id) {
            self.emit(BattleEvent::SelectedUnitChanged { unit: None });
        }
        self.units.remove(&id)
    }

    fn kill(&mut self, id: UnitId) {
        if let Some(unit) = self.despawn(id) {
            tracing::info!("{} {} died at {}", id, unit.name, unit.coords);
            self.emit(BattleEvent::UnitDied {
                unit: id,
                at: unit.coords,
            });
        }
    }

    /// Refill a unit's budget and tick its cooldowns
    pub fn reset_turn(&mut self, id: UnitId) {
        if let Some(unit) = self.units.get_mut(&id) {
            unit.budget.reset();
            self.cooldowns.tick_unit(id);
        }
    }

    /// Select a player-controllable unit, or clear with `None`
    pub fn select(&mut self, id: Option<UnitId>) -> Result<(), CommandError> {
        if let Some(id) = id {
            let unit = self.units.get(&id).ok_or(CommandError::UnknownUnit(id))?;
            if !Selection::can_select(unit) {
                return Err(CommandError::NotControllable(id));
            }
        }
        if self.selection.set(id) {
            self.emit(BattleEvent::SelectedUnitChanged { unit: id });
        }
        Ok(())
    }

    pub fn set_move_cost(&mut self, cost: Option<MoveCost>) {
        self.movement.set_cost_fn(cost);
    }

    // ========================================================================
    // MOVEMENT
    // ========================================================================

    /// Accept a single-step move. Stride is spent and the destination is
    /// reserved now; the position commits when the transit completes.
    pub fn try_step_to(
        &mut self,
        id: UnitId,
        dst: HexCoord,
        on_done: Option<OnMoveDone>,
    ) -> Result<(), CommandError> {
        self.guard()?;
        self.verify_unit(id)?;
        let unit = self
            .units
            .get_mut(&id)
            .ok_or(CommandError::UnknownUnit(id))?;
        let from = unit.coords;
        let result =
            self.movement
                .try_step_to(unit, dst, self.grid.as_ref(), &mut self.ledger, on_done);
        if let Err(err) = result {
            return Err(self.fail(err));
        }

        tracing::debug!("{} moving {} -> {}", id, from, dst);
        self.emit(BattleEvent::MoveStarted {
            unit: id,
            from,
            to: dst,
        });
        Ok(())
    }

    /// Advance transits and commit the ones that finished
    pub fn tick_transits(&mut self, dt: f32) {
        if self.poisoned.is_some() {
            return;
        }
        for mut transit in self.movement.advance(dt) {
            let Some(unit) = self.units.get_mut(&transit.unit) else {
                self.ledger.release(transit.unit);
                continue;
            };
            unit.coords = transit.to;
            if let Err(e) = self.ledger.relocate(transit.unit, transit.from, transit.to) {
                self.poison(e.to_string());
                return;
            }
            transit.finish();

            tracing::debug!("{} arrived at {}", transit.unit, transit.to);
            self.emit(BattleEvent::MoveFinished {
                unit: transit.unit,
                from: transit.from,
                to: transit.to,
            });
        }
    }

    // ========================================================================
    // ABILITIES
    // ========================================================================

    /// Validate and resolve an ability cast
    pub fn use_ability(
        &mut self,
        id: UnitId,
        ability_id: &str,
        targets: &[HexCoord],
    ) -> Result<AbilityContext, CommandError> {
        self.guard()?;
        self.verify_unit(id)?;
        let ability = self.check_cast(id, ability_id)?;
        let caster = self.units.get(&id).ok_or(CommandError::UnknownUnit(id))?;
        let ctx = targeting::resolve(
            &ability,
            caster,
            targets,
            &self.units,
            &self.ledger,
            self.grid.as_ref(),
        )?;

        if let Some(caster) = self.units.get_mut(&id) {
            caster.budget.try_spend(Resource::ActionPoints, ability.ap_cost);
        }
        self.cooldowns.start(id, &ability);
        tracing::debug!("{} uses {} on {:?}", id, ability.id, ctx.target_units);
        self.emit(BattleEvent::AbilityUsed {
            caster: id,
            ability: ability.id.clone(),
            targets: ctx.target_units.clone(),
        });

        self.apply_effects(&ability, &ctx)?;
        Ok(ctx)
    }

    /// Caster-side checks: transit, known ability, cooldown, action points
    fn check_cast(&self, id: UnitId, ability_id: &str) -> Result<Ability, CommandError> {
        let caster = self.units.get(&id).ok_or(CommandError::UnknownUnit(id))?;
        if self.movement.is_in_transit(id) {
            return Err(CommandError::AlreadyInTransit(id));
        }
        let ability = self
            .abilities
            .get(ability_id)
            .ok_or_else(|| CommandError::UnknownAbility(ability_id.to_string()))?;
        if !caster.knows(ability_id) {
            return Err(CommandError::AbilityNotKnown {
                unit: id,
                ability: ability_id.to_string(),
            });
        }
        let turns_left = self.cooldowns.remaining(id, ability_id);
        if turns_left > 0 {
            return Err(CommandError::OnCooldown {
                ability: ability_id.to_string(),
                turns_left,
            });
        }
        if !caster.budget.can_afford(Resource::ActionPoints, ability.ap_cost) {
            return Err(CommandError::InsufficientResource {
                resource: Resource::ActionPoints,
                needed: ability.ap_cost,
                left: caster.budget.ap_left(),
            });
        }
        Ok(ability.clone())
    }

    fn apply_effects(&mut self, ability: &Ability, ctx: &AbilityContext) -> Result<(), CommandError> {
        for effect in &ability.effects {
            match *effect {
                Effect::Damage { amount } => {
                    for &target in &ctx.target_units {
                        let Some(unit) = self.units.get_mut(&target) else {
                            continue;
                        };
                        if unit.health.is_dead() {
                            continue;
                        }
                        let dealt = unit.health.damage(amount);
                        let hp_left = unit.health.current;
                        self.emit(BattleEvent::UnitDamaged {
                            unit: target,
                            amount: dealt,
                            hp_left,
                        });
                    }
                }
                Effect::Heal { amount } => {
                    for &target in &ctx.target_units {
                        let Some(unit) = self.units.get_mut(&target) else {
                            continue;
                        };
                        if unit.health.is_dead() {
                            continue;
                        }
                        let restored = unit.health.heal(amount);
                        let hp_left = unit.health.current;
                        self.emit(BattleEvent::UnitHealed {
                            unit: target,
                            amount: restored,
                            hp_left,
                        });
                    }
                }
                Effect::Blink => {
                    if let Some(&to) = ctx.target_tiles.first() {
                        self.teleport(ctx.caster, to)?;
                    }
                }
            }
        }

        let dead: Vec<UnitId> = ctx
            .target_units
            .iter()
            .copied()
            .filter(|id| self.units.get(id).is_some_and(|u| u.health.is_dead()))
            .collect();
        for id in dead {
            self.kill(id);
        }
        Ok(())
    }

    /// Instant relocation, bypassing transit
    fn teleport(&mut self, id: UnitId, to: HexCoord) -> Result<(), CommandError> {
        let Some(from) = self.units.get(&id).map(|u| u.coords) else {
            return Ok(());
        };
        if let Err(e) = self.ledger.relocate(id, from, to) {
            return Err(self.poison(e.to_string()));
        }
        if let Some(unit) = self.units.get_mut(&id) {
            unit.coords = to;
        }
        self.emit(BattleEvent::MoveStarted { unit: id, from, to });
        self.emit(BattleEvent::MoveFinished { unit: id, from, to });
        Ok(())
    }
}
