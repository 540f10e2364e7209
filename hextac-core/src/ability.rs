//! Ability definitions and effects
//!
//! Abilities are static data shared by every caster. Effects are a closed
//! set dispatched by the battlefield when a validated cast resolves.

use crate::board::HexCoord;
use crate::unit::UnitId;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Area an ability covers around its target
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetShape {
    /// Only the caster's own cell
    SelfCast,
    Single,
    /// Target cell and everything within `area_radius`
    Disk,
    /// Cells exactly `area_radius` from the target
    Ring,
    /// Cells from the caster (exclusive) to the target (inclusive)
    Line,
}

/// Which units an ability may affect
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FactionRule {
    Any,
    Ally,
    Enemy,
    SelfOnly,
}

/// What happens to each affected unit or cell
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Effect {
    Damage { amount: u32 },
    Heal { amount: u32 },
    /// Caster relocates to the target cell, which must be empty
    Blink,
}

/// Static ability definition
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Ability {
    pub id: String,
    pub name: String,
    #[serde(default = "default_ap_cost")]
    pub ap_cost: u32,
    /// Owner turns before the ability can be used again
    #[serde(default)]
    pub cooldown: u32,
    pub shape: TargetShape,
    #[serde(default)]
    pub area_radius: i32,
    pub faction: FactionRule,
    #[serde(default = "default_range")]
    pub min_range: u32,
    #[serde(default = "default_range")]
    pub max_range: u32,
    pub effects: Vec<Effect>,
}

fn default_ap_cost() -> u32 {
    1
}

fn default_range() -> u32 {
    1
}

impl Ability {
    /// Adjacent single-target strike
    pub fn basic_melee() -> Self {
        Self {
            id: "strike".to_string(),
            name: "Strike".to_string(),
            ap_cost: 1,
            cooldown: 0,
            shape: TargetShape::Single,
            area_radius: 0,
            faction: FactionRule::Enemy,
            min_range: 1,
            max_range: 1,
            effects: vec![Effect::Damage { amount: 10 }],
        }
    }

    /// Ranged blast hitting enemies around the target cell
    pub fn firebomb() -> Self {
        Self {
            id: "firebomb".to_string(),
            name: "Firebomb".to_string(),
            ap_cost: 2,
            cooldown: 2,
            shape: TargetShape::Disk,
            area_radius: 1,
            faction: FactionRule::Enemy,
            min_range: 2,
            max_range: 3,
            effects: vec![Effect::Damage { amount: 6 }],
        }
    }

    /// Heal an ally (or self) nearby
    pub fn mend() -> Self {
        Self {
            id: "mend".to_string(),
            name: "Mend".to_string(),
            ap_cost: 1,
            cooldown: 1,
            shape: TargetShape::Single,
            area_radius: 0,
            faction: FactionRule::Ally,
            min_range: 0,
            max_range: 2,
            effects: vec![Effect::Heal { amount: 15 }],
        }
    }

    /// Short-range teleport onto an empty cell
    pub fn blink() -> Self {
        Self {
            id: "blink".to_string(),
            name: "Blink".to_string(),
            ap_cost: 1,
            cooldown: 3,
            shape: TargetShape::Single,
            area_radius: 0,
            faction: FactionRule::Any,
            min_range: 2,
            max_range: 3,
            effects: vec![Effect::Blink],
        }
    }

    /// Targets an empty cell instead of a unit
    pub fn is_placement(&self) -> bool {
        self.effects.iter().any(|e| matches!(e, Effect::Blink))
    }

    /// Number of target cells a cast must name
    pub fn expected_targets(&self) -> usize {
        match self.shape {
            TargetShape::SelfCast => 0,
            _ => 1,
        }
    }
}

/// Everything an effect needs to resolve
#[derive(Clone, Debug, PartialEq)]
pub struct AbilityContext {
    pub caster: UnitId,
    pub origin: HexCoord,
    /// Cells the caster aimed at
    pub target_tiles: Vec<HexCoord>,
    /// Units inside the affected area that pass the faction rule
    pub target_units: Vec<UnitId>,
}

// ============================================================================
// ABILITY BOOK
// ============================================================================

/// Loaded ability definitions, keyed by id
#[derive(Clone, Debug, Default)]
pub struct AbilityBook {
    abilities: FxHashMap<String, Ability>,
}

impl AbilityBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Built-in set: strike, firebomb, mend, blink
    pub fn standard() -> Self {
        Self::from_abilities([
            Ability::basic_melee(),
            Ability::firebomb(),
            Ability::mend(),
            Ability::blink(),
        ])
    }

    pub fn from_abilities(abilities: impl IntoIterator<Item = Ability>) -> Self {
        let mut book = Self::new();
        for ability in abilities {
            book.insert(ability);
        }
        book
    }

    /// Add or replace a definition
    pub fn insert(&mut self, ability: Ability) {
        self.abilities.insert(ability.id.clone(), ability);
    }

    pub fn get(&self, id: &str) -> Option<&Ability> {
        self.abilities.get(id)
    }

    pub fn len(&self) -> usize {
        self.abilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.abilities.is_empty()
    }
}

// ============================================================================
// COOLDOWNS
// ============================================================================

/// Remaining cooldown turns per (unit, ability)
#[derive(Clone, Debug, Default)]
pub struct Cooldowns {
    remaining: FxHashMap<(UnitId, String), u32>,
}

impl Cooldowns {
    pub fn remaining(&self, unit: UnitId, ability: &str) -> u32 {
        self.remaining
            .get(&(unit, ability.to_string()))
            .copied()
            .unwrap_or(0)
    }

    pub fn start(&mut self, unit: UnitId, ability: &Ability) {
        if ability.cooldown > 0 {
            self.remaining
                .insert((unit, ability.id.clone()), ability.cooldown);
        }
    }

    /// One owner turn passes for `unit`
    pub fn tick_unit(&mut self, unit: UnitId) {
        self.remaining.retain(|(owner, _), turns| {
            if *owner == unit {
                *turns = turns.saturating_sub(1);
            }
            *turns > 0
        });
    }

    pub fn forget_unit(&mut self, unit: UnitId) {
        self.remaining.retain(|(owner, _), _| *owner != unit);
    }
}
