//! HEXTAC Core - turn-based hex tactics simulation
//!
//! This crate provides the simulation core for HEXTAC:
//! - Hex geometry (odd-row offset coordinates, disk/ring/line, world projection)
//! - Playable grid recipes and the occupancy ledger
//! - Single-step movement with timed transits
//! - Abilities, targeting and effects
//! - Turn state machine with pluggable actors, plus a greedy placeholder AI
//!
//! Hosts drive everything through [`Battle`]: submit commands, call
//! `tick(dt)`, and react to the [`BattleEvent`]s it emits.

pub mod board;
pub mod grid;
pub mod unit;
pub mod error;
pub mod occupancy;
pub mod ability;
pub mod targeting;
pub mod movement;
pub mod events;
pub mod command;
pub mod selection;
pub mod battlefield;
pub mod turn;
pub mod ai;
pub mod config;
pub mod battle;

// Re-exports for convenient access
pub use board::{disk, line, ring, CubeCoord, HexCoord, Layout, WorldPos};
pub use grid::{GridRecipe, GridSnapshotProvider, HexGrid, HoleConfig};
pub use unit::{Faction, Health, Resource, ResourceBudget, Side, Unit, UnitId, UnitSpawn};
pub use error::{CommandError, LedgerError};
pub use occupancy::OccupancyLedger;
pub use ability::{Ability, AbilityBook, AbilityContext, Effect, FactionRule, TargetShape};
pub use targeting::{is_faction_allowed, tiles_in_range};
pub use movement::{MovementResolver, Transit};
pub use events::{BattleEvent, EventBus};
pub use command::{Command, CommandKind, CommandQueue, CommandSource};
pub use selection::{RangeMode, Selection};
pub use battlefield::Battlefield;
pub use turn::{PassActor, PlayerControl, TurnActor, TurnMachine, TurnPhase, TurnProgress};
pub use ai::GreedyActor;
pub use config::BattleConfig;
pub use battle::{Battle, CommandOutcome};
