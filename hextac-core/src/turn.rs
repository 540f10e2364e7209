//! Turn state machine
//!
//! Phases alternate `PlayerTurn`, `EnemyTurn`, `PlayerTurn`, ... once started.
//! A side that is driven by a `TurnActor` runs as a sequence: one roster unit
//! at a time, in id order, advanced by `tick`. Each unit's procedure runs to
//! completion, including its own transit, before the next unit starts, and
//! the sequence yields to the caller after every finished procedure.

use crate::battlefield::Battlefield;
use crate::events::BattleEvent;
use crate::unit::{Side, UnitId};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TurnPhase {
    Idle,
    PlayerTurn,
    EnemyTurn,
}

impl TurnPhase {
    pub fn side(self) -> Option<Side> {
        match self {
            TurnPhase::Idle => None,
            TurnPhase::PlayerTurn => Some(Side::Player),
            TurnPhase::EnemyTurn => Some(Side::Enemy),
        }
    }

    fn of(side: Side) -> Self {
        match side {
            Side::Player => TurnPhase::PlayerTurn,
            Side::Enemy => TurnPhase::EnemyTurn,
        }
    }
}

/// Result of one slice of a unit's turn procedure
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TurnProgress {
    /// Call again on a later tick
    Yield,
    Done,
}

/// Drives the units of one side
pub trait TurnActor {
    /// Called for each roster unit when its side's turn begins, after its
    /// budget has been refilled
    fn on_turn_start(&mut self, _unit: UnitId, _field: &mut Battlefield) {}

    /// Advance `unit`'s turn procedure. Not called while the unit is in transit.
    fn take_turn(&mut self, unit: UnitId, field: &mut Battlefield) -> TurnProgress;
}

/// Actor that ends every turn immediately
#[derive(Clone, Copy, Debug, Default)]
pub struct PassActor;

impl TurnActor for PassActor {
    fn take_turn(&mut self, _unit: UnitId, _field: &mut Battlefield) -> TurnProgress {
        TurnProgress::Done
    }
}

/// How the player side ends its turn
pub enum PlayerControl {
    /// Wait for an external end-of-turn request
    Manual,
    /// Run the player roster through an actor and end automatically
    Scripted(Box<dyn TurnActor>),
}

/// Cursor over the roster of the side currently acting
#[derive(Clone, Copy, Debug)]
struct Sequence {
    side: Side,
    cursor: usize,
    /// Current unit returned Done and is finishing its transit
    finishing: bool,
}

pub struct TurnMachine {
    phase: TurnPhase,
    round: u32,
    player_roster: Vec<UnitId>,
    enemy_roster: Vec<UnitId>,
    sequence: Option<Sequence>,
    player: PlayerControl,
    enemy: Box<dyn TurnActor>,
}

impl TurnMachine {
    pub fn new(player: PlayerControl, enemy: Box<dyn TurnActor>) -> Self {
        Self {
            phase: TurnPhase::Idle,
            round: 0,
            player_roster: Vec::new(),
            enemy_roster: Vec::new(),
            sequence: None,
            player,
            enemy,
        }
    }

    pub fn phase(&self) -> TurnPhase {
        self.phase
    }

    pub fn current_side(&self) -> Option<Side> {
        self.phase.side()
    }

    /// 0 before the battle starts, then 1, 2, ...
    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn roster(&self, side: Side) -> &[UnitId] {
        match side {
            Side::Player => &self.player_roster,
            Side::Enemy => &self.enemy_roster,
        }
    }

    /// An actor-driven sequence is in progress
    pub fn is_sequence_running(&self) -> bool {
        self.sequence.is_some()
    }

    /// Leave `Idle` and begin the first turn. No-op once started.
    pub fn start(&mut self, first: Side, field: &mut Battlefield) {
        if self.phase != TurnPhase::Idle {
            return;
        }
        self.round = 1;
        field.emit(BattleEvent::RoundStarted { round: 1 });
        self.begin_turn(first, field);
    }

    /// Rebuild rosters, refill `side`'s budgets, notify its actor and
    /// announce the new turn
    pub fn begin_turn(&mut self, side: Side, field: &mut Battlefield) {
        if side == Side::Player && self.phase == TurnPhase::EnemyTurn {
            self.round += 1;
            field.emit(BattleEvent::RoundStarted { round: self.round });
        }
        self.phase = TurnPhase::of(side);
        self.player_roster = field.roster(Side::Player);
        self.enemy_roster = field.roster(Side::Enemy);

        let roster = self.roster(side).to_vec();
        for &unit in &roster {
            field.reset_turn(unit);
        }
        if let Some(actor) = self.actor_mut(side) {
            for &unit in &roster {
                actor.on_turn_start(unit, field);
            }
        }

        self.sequence = match (side, &self.player) {
            (Side::Player, PlayerControl::Manual) => None,
            _ => Some(Sequence {
                side,
                cursor: 0,
                finishing: false,
            }),
        };

        tracing::info!(
            "Round {}: {:?} turn, {} unit(s)",
            self.round,
            side,
            roster.len()
        );
        field.emit(BattleEvent::TurnChanged { side });
    }

    /// Player asks to end its turn. Honored only during a manual player
    /// turn; returns whether the request was accepted.
    pub fn end_turn_request(&mut self, field: &mut Battlefield) -> bool {
        if self.phase != TurnPhase::PlayerTurn || self.sequence.is_some() {
            tracing::debug!("End-turn request ignored in {:?}", self.phase);
            return false;
        }
        self.begin_turn(Side::Enemy, field);
        true
    }

    /// Advance the running sequence by at most one procedure step
    pub fn tick(&mut self, field: &mut Battlefield) {
        let Some(mut seq) = self.sequence else {
            return;
        };
        if field.is_poisoned() {
            return;
        }

        let roster = self.roster(seq.side).to_vec();
        while seq.cursor < roster.len() && !field.contains(roster[seq.cursor]) {
            seq.cursor += 1;
            seq.finishing = false;
        }

        let Some(&unit) = roster.get(seq.cursor) else {
            self.finish_sequence(seq.side, field);
            return;
        };

        if field.is_in_transit(unit) {
            self.sequence = Some(seq);
            return;
        }
        if seq.finishing {
            seq.cursor += 1;
            seq.finishing = false;
            self.sequence = Some(seq);
            return;
        }

        let progress = match self.actor_mut(seq.side) {
            Some(actor) => actor.take_turn(unit, field),
            None => TurnProgress::Done,
        };
        if progress == TurnProgress::Done {
            if field.is_in_transit(unit) {
                seq.finishing = true;
            } else {
                seq.cursor += 1;
            }
        }
        self.sequence = Some(seq);
    }

    fn finish_sequence(&mut self, side: Side, field: &mut Battlefield) {
        self.sequence = None;
        tracing::debug!("{:?} sequence complete", side);
        self.begin_turn(side.opponent(), field);
    }

    fn actor_mut(&mut self, side: Side) -> Option<&mut Box<dyn TurnActor>> {
        match side {
            Side::Enemy => Some(&mut self.enemy),
            Side::Player => match &mut self.player {
                PlayerControl::Manual => None,
                PlayerControl::Scripted(actor) => Some(actor),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ability::AbilityBook;
    use crate::board::{HexCoord, Layout};
    use crate::grid::HexGrid;
    use crate::unit::{Faction, Resource, UnitSpawn};

    fn field() -> Battlefield {
        let mut field = Battlefield::new(
            Box::new(HexGrid::unbounded()),
            Layout::default(),
            AbilityBook::standard(),
            0.1,
        );
        field
            .spawn(UnitSpawn::new("p2", Faction::Player, HexCoord::new(0, 0)))
            .unwrap();
        field
            .spawn(UnitSpawn::new("e1", Faction::Enemy, HexCoord::new(5, 0)))
            .unwrap();
        field
            .spawn(UnitSpawn::new("p1", Faction::Player, HexCoord::new(0, 2)))
            .unwrap();
        field
            .spawn(UnitSpawn::new("n", Faction::Neutral, HexCoord::new(3, 3)))
            .unwrap();
        field
    }

    /// Steps east once per turn and records who acted
    struct StepEast {
        log: std::rc::Rc<std::cell::RefCell<Vec<UnitId>>>,
    }

    impl TurnActor for StepEast {
        fn take_turn(&mut self, unit: UnitId, field: &mut Battlefield) -> TurnProgress {
            self.log.borrow_mut().push(unit);
            let at = field.unit(unit).unwrap().coords;
            let _ = field.try_step_to(unit, at.neighbor(crate::board::EAST), None);
            TurnProgress::Done
        }
    }

    #[test]
    fn test_rosters_sorted_and_exclude_neutral() {
        let mut field = field();
        let mut turns = TurnMachine::new(PlayerControl::Manual, Box::new(PassActor));
        turns.start(Side::Player, &mut field);
        assert_eq!(turns.roster(Side::Player), &[UnitId(1), UnitId(3)]);
        assert_eq!(turns.roster(Side::Enemy), &[UnitId(2)]);
        assert_eq!(turns.phase(), TurnPhase::PlayerTurn);
        assert_eq!(turns.round(), 1);
    }

    #[test]
    fn test_end_turn_only_in_player_phase() {
        let mut field = field();
        let mut turns = TurnMachine::new(PlayerControl::Manual, Box::new(PassActor));
        assert!(!turns.end_turn_request(&mut field), "idle ignores requests");

        turns.start(Side::Player, &mut field);
        assert!(turns.end_turn_request(&mut field));
        assert_eq!(turns.phase(), TurnPhase::EnemyTurn);
        assert!(!turns.end_turn_request(&mut field));
        assert_eq!(turns.phase(), TurnPhase::EnemyTurn);

        // one tick runs the single enemy, the next ends the sequence
        turns.tick(&mut field);
        turns.tick(&mut field);
        assert_eq!(turns.phase(), TurnPhase::PlayerTurn);
        assert_eq!(turns.round(), 2);
    }

    #[test]
    fn test_budgets_reset_for_acting_side() {
        let mut field = field();
        let mut turns = TurnMachine::new(PlayerControl::Manual, Box::new(PassActor));
        turns.start(Side::Player, &mut field);

        field.try_step_to(UnitId(1), HexCoord::new(1, 0), None).unwrap();
        field.tick_transits(1.0);
        assert_eq!(field.unit(UnitId(1)).unwrap().budget.stride_left(), 2);

        turns.end_turn_request(&mut field);
        assert_eq!(field.unit(UnitId(1)).unwrap().budget.stride_left(), 2);
        while turns.phase() != TurnPhase::PlayerTurn {
            turns.tick(&mut field);
        }
        let budget = field.unit(UnitId(1)).unwrap().budget;
        assert_eq!(budget.left(Resource::Stride), budget.stride_max());
    }

    #[test]
    fn test_enemy_sequence_waits_for_transit() {
        let mut field = field();
        let log = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
        let mut turns = TurnMachine::new(
            PlayerControl::Manual,
            Box::new(StepEast {
                log: std::rc::Rc::clone(&log),
            }),
        );
        turns.start(Side::Player, &mut field);
        turns.end_turn_request(&mut field);

        turns.tick(&mut field);
        assert!(field.is_in_transit(UnitId(2)));
        turns.tick(&mut field);
        assert_eq!(turns.phase(), TurnPhase::EnemyTurn, "still waiting on transit");

        field.tick_transits(0.1);
        turns.tick(&mut field);
        turns.tick(&mut field);
        assert_eq!(turns.phase(), TurnPhase::PlayerTurn);
        assert_eq!(*log.borrow(), vec![UnitId(2)]);
        assert_eq!(field.unit(UnitId(2)).unwrap().coords, HexCoord::new(6, 0));
    }

    #[test]
    fn test_scripted_player_runs_full_round() {
        let mut field = field();
        let log = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
        let mut turns = TurnMachine::new(
            PlayerControl::Scripted(Box::new(StepEast {
                log: std::rc::Rc::clone(&log),
            })),
            Box::new(StepEast {
                log: std::rc::Rc::clone(&log),
            }),
        );
        turns.start(Side::Player, &mut field);
        assert!(!turns.end_turn_request(&mut field), "scripted turns end themselves");

        let mut sides = vec![turns.phase()];
        for _ in 0..40 {
            turns.tick(&mut field);
            field.tick_transits(0.1);
            if sides.last() != Some(&turns.phase()) {
                sides.push(turns.phase());
            }
        }
        assert_eq!(
            &sides[..3],
            &[TurnPhase::PlayerTurn, TurnPhase::EnemyTurn, TurnPhase::PlayerTurn]
        );
        assert_eq!(&log.borrow()[..3], &[UnitId(1), UnitId(3), UnitId(2)]);
    }
}
