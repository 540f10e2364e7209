//! Battle configuration: grid recipe, unit roster and ability definitions
//!
//! Stored as JSON. `BattleConfig::default()` is a small ready-made skirmish.

use crate::ability::{Ability, AbilityBook};
use crate::board::HexCoord;
use crate::grid::GridRecipe;
use crate::movement::DEFAULT_SECONDS_PER_TILE;
use crate::unit::{Faction, Side, UnitSpawn};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BattleConfig {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub grid: GridRecipe,
    #[serde(default = "default_seconds_per_tile")]
    pub seconds_per_tile: f32,
    #[serde(default = "default_starting_side")]
    pub starting_side: Side,
    pub units: Vec<UnitSpawn>,
    /// Ability definitions; the built-in set when omitted
    #[serde(default = "default_abilities")]
    pub abilities: Vec<Ability>,
}

fn default_seconds_per_tile() -> f32 {
    DEFAULT_SECONDS_PER_TILE
}

fn default_starting_side() -> Side {
    Side::Player
}

fn default_abilities() -> Vec<Ability> {
    vec![
        Ability::basic_melee(),
        Ability::firebomb(),
        Ability::mend(),
        Ability::blink(),
    ]
}

impl Default for BattleConfig {
    fn default() -> Self {
        let grid = GridRecipe {
            width: 8,
            height: 6,
            ..Default::default()
        };
        let units = vec![
            UnitSpawn::new("Knight", Faction::Player, HexCoord::new(1, 2))
                .with_ability("strike")
                .with_hp(60),
            UnitSpawn::new("Cleric", Faction::Player, HexCoord::new(0, 3))
                .with_ability("strike")
                .with_ability("mend")
                .with_hp(40),
            UnitSpawn::new("Grunt", Faction::Enemy, HexCoord::new(6, 2))
                .with_ability("strike")
                .with_hp(40),
            UnitSpawn::new("Bomber", Faction::Enemy, HexCoord::new(7, 4))
                .with_ability("strike")
                .with_ability("firebomb")
                .with_hp(30),
        ];
        Self {
            name: "skirmish".to_string(),
            grid,
            seconds_per_tile: DEFAULT_SECONDS_PER_TILE,
            starting_side: Side::Player,
            units,
            abilities: default_abilities(),
        }
    }
}

impl BattleConfig {
    /// Load from a JSON file
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading battle config {}", path.display()))?;
        let config: BattleConfig = serde_json::from_str(&content)
            .with_context(|| format!("parsing battle config {}", path.display()))?;
        Ok(config)
    }

    /// Save to a JSON file
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)
            .with_context(|| format!("writing battle config {}", path.display()))?;
        Ok(())
    }

    pub fn ability_book(&self) -> AbilityBook {
        AbilityBook::from_abilities(self.abilities.iter().cloned())
    }

    pub fn with_seconds_per_tile(mut self, seconds: f32) -> Self {
        self.seconds_per_tile = seconds;
        self
    }
}
