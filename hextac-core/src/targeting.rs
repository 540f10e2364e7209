//! Target resolution: range filtering, faction rules and area expansion

use crate::ability::{Ability, AbilityContext, FactionRule, TargetShape};
use crate::board::{disk, line, ring, HexCoord};
use crate::error::CommandError;
use crate::grid::GridSnapshotProvider;
use crate::occupancy::OccupancyLedger;
use crate::unit::{Unit, UnitId};
use rustc_hash::FxHashMap;

/// Cells with `min <= distance(origin, c) <= max`, nearest first.
/// Recomputed on every call.
pub fn tiles_in_range(origin: HexCoord, min: u32, max: u32) -> impl Iterator<Item = HexCoord> {
    let max = i32::try_from(max).unwrap_or(i32::MAX);
    disk(origin, max).filter(move |&c| origin.distance_to(c) >= min)
}

pub fn is_faction_allowed(caster: &Unit, target: &Unit, rule: FactionRule) -> bool {
    match rule {
        FactionRule::Any => true,
        FactionRule::SelfOnly => caster.id == target.id,
        FactionRule::Ally => caster.is_ally_of(target),
        FactionRule::Enemy => !caster.is_ally_of(target),
    }
}

/// Distance check against an ability's range, using board distance
pub fn check_range(ability: &Ability, origin: HexCoord, target: HexCoord) -> Result<(), CommandError> {
    let distance = origin.distance_to(target);
    if distance < ability.min_range || distance > ability.max_range {
        return Err(CommandError::OutOfRange {
            target,
            distance,
            min: ability.min_range,
            max: ability.max_range,
        });
    }
    Ok(())
}

/// Single-target validity as used by previews: range and faction only
pub fn is_valid_target(ability: &Ability, caster: &Unit, target: &Unit) -> bool {
    check_range(ability, caster.coords, target.coords).is_ok()
        && is_faction_allowed(caster, target, ability.faction)
}

/// Cells an ability affects when aimed at `target` from `origin`
pub fn affected_tiles(ability: &Ability, origin: HexCoord, target: HexCoord) -> Vec<HexCoord> {
    match ability.shape {
        TargetShape::SelfCast => vec![origin],
        TargetShape::Single => vec![target],
        TargetShape::Disk => disk(target, ability.area_radius).collect(),
        TargetShape::Ring if ability.area_radius <= 0 => vec![target],
        TargetShape::Ring => ring(target, ability.area_radius).collect(),
        TargetShape::Line => line(origin, target).into_iter().skip(1).collect(),
    }
}

/// Validate a cast and gather what it hits. Mutates nothing.
pub fn resolve(
    ability: &Ability,
    caster: &Unit,
    targets: &[HexCoord],
    units: &FxHashMap<UnitId, Unit>,
    ledger: &OccupancyLedger,
    grid: &dyn GridSnapshotProvider,
) -> Result<AbilityContext, CommandError> {
    let expected = ability.expected_targets();
    if targets.len() != expected {
        return Err(CommandError::InvalidTargetCount {
            ability: ability.id.clone(),
            expected,
            got: targets.len(),
        });
    }
    let origin = caster.coords;
    let target = targets.first().copied().unwrap_or(origin);

    if !grid.contains(target) {
        return Err(CommandError::OutOfBounds(target));
    }
    if ability.shape != TargetShape::SelfCast {
        check_range(ability, origin, target)?;
    }

    if ability.is_placement() {
        if ledger.is_blocked(target) {
            return Err(CommandError::TileOccupied(target));
        }
        return Ok(AbilityContext {
            caster: caster.id,
            origin,
            target_tiles: vec![target],
            target_units: Vec::new(),
        });
    }

    let tiles = affected_tiles(ability, origin, target);
    let mut hit = Vec::new();
    for &tile in &tiles {
        let Some(unit) = ledger.try_get_unit_at(tile).and_then(|id| units.get(&id)) else {
            continue;
        };
        if is_faction_allowed(caster, unit, ability.faction) {
            hit.push(unit.id);
        } else if ability.shape == TargetShape::Single {
            return Err(CommandError::FactionNotAllowed {
                ability: ability.id.clone(),
                target: unit.id,
            });
        }
    }

    if ability.shape == TargetShape::Single && hit.is_empty() {
        return Err(CommandError::NoTargetUnit(target));
    }
    hit.sort();

    Ok(AbilityContext {
        caster: caster.id,
        origin,
        target_tiles: tiles.into_iter().filter(|&c| grid.contains(c)).collect(),
        target_units: hit,
    })
}
