//! Placeholder greedy AI
//!
//! Attack whatever is in reach, otherwise close the distance to the nearest
//! opposing unit one step at a time.

use crate::ability::FactionRule;
use crate::battlefield::Battlefield;
use crate::board::HexCoord;
use crate::targeting::check_range;
use crate::turn::{TurnActor, TurnProgress};
use crate::unit::{Resource, UnitId};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

/// Greedy melee-first actor with seeded tie-breaking
pub struct GreedyActor {
    rng: ChaCha8Rng,
}

impl Default for GreedyActor {
    fn default() -> Self {
        Self::new()
    }
}

impl GreedyActor {
    pub fn new() -> Self {
        Self::with_seed(42)
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// First usable (ability, target cell) against an opposing unit
    fn pick_attack(
        &self,
        unit: UnitId,
        field: &Battlefield,
        foes: &[(UnitId, HexCoord)],
    ) -> Option<(String, HexCoord)> {
        let me = field.unit(unit)?;
        let mut known = me.abilities.clone();
        known.sort();

        for id in known {
            let Some(ability) = field.ability(&id) else {
                continue;
            };
            if ability.faction != FactionRule::Enemy || ability.is_placement() {
                continue;
            }
            if field.cooldown(unit, &id) > 0
                || !me.budget.can_afford(Resource::ActionPoints, ability.ap_cost)
            {
                continue;
            }
            if let Some(&(_, at)) = foes
                .iter()
                .find(|(_, at)| check_range(ability, me.coords, *at).is_ok())
            {
                return Some((id, at));
            }
        }
        None
    }

    /// Neighbor that most reduces the distance to `target`
    fn pick_step(&mut self, unit: UnitId, field: &Battlefield, target: HexCoord) -> Option<HexCoord> {
        let origin = field.unit(unit)?.coords;
        let current = origin.distance_to(target);

        let candidates: Vec<(HexCoord, u32)> = origin
            .neighbors()
            .into_iter()
            .filter(|&n| field.can_step_to(unit, n))
            .map(|n| (n, n.distance_to(target)))
            .filter(|&(_, d)| d < current)
            .collect();
        let best = candidates.iter().map(|&(_, d)| d).min()?;
        let ties: Vec<HexCoord> = candidates
            .into_iter()
            .filter(|&(_, d)| d == best)
            .map(|(n, _)| n)
            .collect();
        ties.choose(&mut self.rng).copied()
    }
}

impl TurnActor for GreedyActor {
    fn take_turn(&mut self, unit: UnitId, field: &mut Battlefield) -> TurnProgress {
        let Some(me) = field.unit(unit) else {
            return TurnProgress::Done;
        };
        let Some(side) = me.side() else {
            return TurnProgress::Done;
        };
        let origin = me.coords;

        // Opposing units, nearest first
        let mut foes: Vec<(UnitId, HexCoord)> = field
            .units()
            .into_iter()
            .filter(|u| u.side() == Some(side.opponent()))
            .map(|u| (u.id, u.coords))
            .collect();
        foes.sort_by_key(|&(id, at)| (origin.distance_to(at), id));
        let Some(&(_, nearest)) = foes.first() else {
            return TurnProgress::Done;
        };

        if let Some((ability, target)) = self.pick_attack(unit, field, &foes) {
            match field.use_ability(unit, &ability, &[target]) {
                Ok(_) => return TurnProgress::Yield,
                Err(e) => tracing::debug!("{} could not use {}: {}", unit, ability, e),
            }
        }

        if let Some(step) = self.pick_step(unit, field, nearest) {
            match field.try_step_to(unit, step, None) {
                Ok(()) => return TurnProgress::Yield,
                Err(e) => tracing::debug!("{} could not step to {}: {}", unit, step, e),
            }
        }
        TurnProgress::Done
    }
}
