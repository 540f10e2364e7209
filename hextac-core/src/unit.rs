//! Units, factions and per-turn resources

use crate::board::HexCoord;
use serde::{Deserialize, Serialize};

/// Stable unit identity; ordering defines roster order
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct UnitId(pub u32);

impl std::fmt::Display for UnitId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Allegiance tag
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Faction {
    Player,
    Enemy,
    Neutral,
}

/// The two sides that take turns
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Player,
    Enemy,
}

impl Side {
    pub fn opponent(self) -> Self {
        match self {
            Side::Player => Side::Enemy,
            Side::Enemy => Side::Player,
        }
    }
}

impl Faction {
    /// Side this faction acts on; neutrals never act
    pub fn side(self) -> Option<Side> {
        match self {
            Faction::Player => Some(Side::Player),
            Faction::Enemy => Some(Side::Enemy),
            Faction::Neutral => None,
        }
    }
}

// ============================================================================
// RESOURCES
// ============================================================================

/// Which budget counter a cost is drawn from
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Resource {
    Stride,
    ActionPoints,
}

impl std::fmt::Display for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Resource::Stride => write!(f, "stride"),
            Resource::ActionPoints => write!(f, "action points"),
        }
    }
}

/// Movement stride and action points, refilled at the owner's turn start
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceBudget {
    stride_max: u32,
    stride_left: u32,
    ap_max: u32,
    ap_left: u32,
}

impl ResourceBudget {
    /// Full budget
    pub fn new(stride_max: u32, ap_max: u32) -> Self {
        Self {
            stride_max,
            stride_left: stride_max,
            ap_max,
            ap_left: ap_max,
        }
    }

    pub fn stride_max(&self) -> u32 {
        self.stride_max
    }

    pub fn stride_left(&self) -> u32 {
        self.stride_left
    }

    pub fn ap_max(&self) -> u32 {
        self.ap_max
    }

    pub fn ap_left(&self) -> u32 {
        self.ap_left
    }

    pub fn left(&self, resource: Resource) -> u32 {
        match resource {
            Resource::Stride => self.stride_left,
            Resource::ActionPoints => self.ap_left,
        }
    }

    pub fn can_afford(&self, resource: Resource, cost: u32) -> bool {
        self.left(resource) >= cost
    }

    /// Spend if affordable; leaves the budget untouched otherwise
    pub fn try_spend(&mut self, resource: Resource, cost: u32) -> bool {
        let left = match resource {
            Resource::Stride => &mut self.stride_left,
            Resource::ActionPoints => &mut self.ap_left,
        };
        if *left < cost {
            return false;
        }
        *left -= cost;
        true
    }

    pub fn reset(&mut self) {
        self.stride_left = self.stride_max;
        self.ap_left = self.ap_max;
    }
}

/// Hit points
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Health {
    pub current: u32,
    pub max: u32,
}

impl Health {
    pub fn new(max: u32) -> Self {
        Self { current: max, max }
    }

    /// Returns damage actually dealt
    pub fn damage(&mut self, amount: u32) -> u32 {
        let dealt = amount.min(self.current);
        self.current -= dealt;
        dealt
    }

    /// Returns amount actually restored
    pub fn heal(&mut self, amount: u32) -> u32 {
        let restored = amount.min(self.max - self.current);
        self.current += restored;
        restored
    }

    pub fn is_dead(&self) -> bool {
        self.current == 0
    }
}

// ============================================================================
// UNIT
// ============================================================================

/// A unit on the battlefield
#[derive(Clone, Debug)]
pub struct Unit {
    pub id: UnitId,
    pub name: String,
    pub faction: Faction,
    /// Committed position; changes only when a transit completes
    pub coords: HexCoord,
    pub budget: ResourceBudget,
    pub health: Health,
    /// Ability ids this unit may cast
    pub abilities: Vec<String>,
    pub player_controlled: bool,
}

impl Unit {
    pub fn side(&self) -> Option<Side> {
        self.faction.side()
    }

    /// Accepts local player commands
    pub fn is_player_controlled(&self) -> bool {
        self.player_controlled && self.faction == Faction::Player
    }

    pub fn knows(&self, ability_id: &str) -> bool {
        self.abilities.iter().any(|a| a == ability_id)
    }

    pub fn is_ally_of(&self, other: &Unit) -> bool {
        self.faction == other.faction
    }
}

/// Spawn description for a unit
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UnitSpawn {
    pub name: String,
    pub faction: Faction,
    pub coords: HexCoord,
    #[serde(default = "default_stride")]
    pub stride: u32,
    #[serde(default = "default_ap")]
    pub action_points: u32,
    #[serde(default = "default_hp")]
    pub hp: u32,
    #[serde(default)]
    pub abilities: Vec<String>,
    #[serde(default = "default_true")]
    pub player_controlled: bool,
}

fn default_stride() -> u32 {
    3
}

fn default_ap() -> u32 {
    2
}

fn default_hp() -> u32 {
    100
}

fn default_true() -> bool {
    true
}

impl UnitSpawn {
    pub fn new(name: &str, faction: Faction, coords: HexCoord) -> Self {
        Self {
            name: name.to_string(),
            faction,
            coords,
            stride: default_stride(),
            action_points: default_ap(),
            hp: default_hp(),
            abilities: Vec::new(),
            player_controlled: faction == Faction::Player,
        }
    }

    pub fn with_stride(mut self, stride: u32) -> Self {
        self.stride = stride;
        self
    }

    pub fn with_action_points(mut self, action_points: u32) -> Self {
        self.action_points = action_points;
        self
    }

    pub fn with_hp(mut self, hp: u32) -> Self {
        self.hp = hp;
        self
    }

    pub fn with_ability(mut self, ability_id: &str) -> Self {
        self.abilities.push(ability_id.to_string());
        self
    }

    pub(crate) fn into_unit(self, id: UnitId) -> Unit {
        Unit {
            id,
            name: self.name,
            faction: self.faction,
            coords: self.coords,
            budget: ResourceBudget::new(self.stride, self.action_points),
            health: Health::new(self.hp),
            abilities: self.abilities,
            player_controlled: self.player_controlled,
        }
    }
}
