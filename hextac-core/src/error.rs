//! Command rejections and ledger errors

use crate::board::HexCoord;
use crate::unit::{Resource, UnitId};

/// Why a command was refused. Nothing is mutated on rejection.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("unit {0} does not act in the current phase")]
    NotCurrentTurn(UnitId),

    #[error("unit {0} is not under player control")]
    NotControllable(UnitId),

    #[error("unknown unit {0}")]
    UnknownUnit(UnitId),

    #[error("{to} is {distance} hexes from {from}, moves are single steps")]
    NotAdjacent {
        from: HexCoord,
        to: HexCoord,
        distance: u32,
    },

    #[error("{0} is outside the grid")]
    OutOfBounds(HexCoord),

    #[error("{0} is occupied or reserved")]
    TileOccupied(HexCoord),

    #[error("not enough {resource}: need {needed}, have {left}")]
    InsufficientResource {
        resource: Resource,
        needed: u32,
        left: u32,
    },

    #[error("unit {0} is already moving")]
    AlreadyInTransit(UnitId),

    #[error("unknown ability `{0}`")]
    UnknownAbility(String),

    #[error("unit {unit} does not know ability `{ability}`")]
    AbilityNotKnown { unit: UnitId, ability: String },

    #[error("ability `{ability}` is cooling down ({turns_left} turns left)")]
    OnCooldown { ability: String, turns_left: u32 },

    #[error("ability `{ability}` takes {expected} target(s), got {got}")]
    InvalidTargetCount {
        ability: String,
        expected: usize,
        got: usize,
    },

    #[error("target {target} is {distance} hexes away, range is {min}..={max}")]
    OutOfRange {
        target: HexCoord,
        distance: u32,
        min: u32,
        max: u32,
    },

    #[error("no unit at target {0}")]
    NoTargetUnit(HexCoord),

    #[error("unit {target} is not a legal target for `{ability}`")]
    FactionNotAllowed { ability: String, target: UnitId },

    #[error("occupancy invariant violated: {0}")]
    InvariantViolation(String),
}

/// Occupancy ledger failures
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("{coords} already held by unit {holder}")]
    Occupied { coords: HexCoord, holder: UnitId },

    #[error("unit {unit} expected at {expected} but ledger has {found:?}")]
    Mismatch {
        unit: UnitId,
        expected: HexCoord,
        found: Option<HexCoord>,
    },
}

impl From<LedgerError> for CommandError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::Occupied { coords, .. } => CommandError::TileOccupied(coords),
            LedgerError::Mismatch { .. } => CommandError::InvariantViolation(err.to_string()),
        }
    }
}
