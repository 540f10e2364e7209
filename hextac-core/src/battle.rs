//! Battle facade: the host-facing entry point
//!
//! Hosts submit commands, request end of turn and call `tick(dt)`. Each tick
//! drains queued commands in submission order, advances transits and then
//! advances whichever actor sequence is running.

use crate::ability::AbilityContext;
use crate::ai::GreedyActor;
use crate::battlefield::Battlefield;
use crate::board::{HexCoord, WorldPos};
use crate::command::{Command, CommandKind, CommandQueue, CommandSource};
use crate::config::BattleConfig;
use crate::error::CommandError;
use crate::events::BattleEvent;
use crate::grid::HexGrid;
use crate::movement::OnMoveDone;
use crate::turn::{PlayerControl, TurnActor, TurnMachine, TurnPhase};
use crate::unit::{Side, Unit, UnitId, UnitSpawn};

/// What a command did once executed
#[derive(Clone, Debug, PartialEq)]
pub enum CommandOutcome {
    /// Move accepted; the position commits when the transit completes
    MoveStarted { from: HexCoord, to: HexCoord },
    AbilityResolved { targets: Vec<UnitId> },
}

pub struct Battle {
    field: Battlefield,
    turns: TurnMachine,
    queue: CommandQueue,
    first_side: Side,
}

impl Battle {
    pub fn new(field: Battlefield, player: PlayerControl, enemy: Box<dyn TurnActor>) -> Self {
        Self {
            field,
            turns: TurnMachine::new(player, enemy),
            queue: CommandQueue::new(),
            first_side: Side::Player,
        }
    }

    /// Build grid, abilities and units from a config
    pub fn from_config(
        config: &BattleConfig,
        player: PlayerControl,
        enemy: Box<dyn TurnActor>,
    ) -> Result<Self, CommandError> {
        let grid = HexGrid::from_recipe(&config.grid);
        let mut field = Battlefield::with_grid(grid, config.ability_book(), config.seconds_per_tile);
        for spawn in &config.units {
            field.spawn(spawn.clone())?;
        }
        let mut battle = Self::new(field, player, enemy);
        battle.first_side = config.starting_side;
        tracing::info!(
            "Battle `{}` ready: {} units on {} cells",
            config.name,
            battle.field.unit_count(),
            battle.field.grid().coords().len()
        );
        Ok(battle)
    }

    /// Manual player against the greedy AI
    pub fn skirmish(config: &BattleConfig) -> Result<Self, CommandError> {
        Self::from_config(config, PlayerControl::Manual, Box::new(GreedyActor::new()))
    }

    /// Begin the first turn
    pub fn start(&mut self) {
        self.turns.start(self.first_side, &mut self.field);
    }

    pub fn spawn(&mut self, spawn: UnitSpawn) -> Result<UnitId, CommandError> {
        self.field.spawn(spawn)
    }

    pub fn despawn(&mut self, id: UnitId) -> Option<Unit> {
        self.field.despawn(id)
    }

    // ========================================================================
    // COMMANDS
    // ========================================================================

    /// Queue a command for the next tick; returns its sequence number
    pub fn submit(&mut self, command: Command) -> u64 {
        self.queue.push(command)
    }

    /// Queue everything a source has ready
    pub fn pull_commands(&mut self, source: &mut dyn CommandSource) -> usize {
        self.queue.pull_from(source)
    }

    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Validate and apply a player command immediately
    pub fn execute(&mut self, command: &Command) -> Result<CommandOutcome, CommandError> {
        self.execute_with(command, None)
    }

    /// Like `execute`, with a callback for when a move completes
    pub fn execute_with(
        &mut self,
        command: &Command,
        on_done: Option<OnMoveDone>,
    ) -> Result<CommandOutcome, CommandError> {
        let result = self.gate(command.actor).and_then(|()| match &command.kind {
            CommandKind::Move(to) => {
                let from = self
                    .field
                    .unit(command.actor)
                    .map(|u| u.coords)
                    .unwrap_or_default();
                self.field
                    .try_step_to(command.actor, *to, on_done)
                    .map(|()| CommandOutcome::MoveStarted { from, to: *to })
            }
            CommandKind::UseAbility { ability, targets } => self
                .field
                .use_ability(command.actor, ability, targets)
                .map(|ctx: AbilityContext| CommandOutcome::AbilityResolved {
                    targets: ctx.target_units,
                }),
        });

        if let Err(reason) = &result {
            tracing::debug!("Command {} from {} rejected: {}", command.seq, command.actor, reason);
            self.field.emit(BattleEvent::CommandRejected {
                unit: command.actor,
                reason: reason.clone(),
            });
        }
        result
    }

    /// Phase and ownership checks for external commands
    fn gate(&self, actor: UnitId) -> Result<(), CommandError> {
        let unit = self
            .field
            .unit(actor)
            .ok_or(CommandError::UnknownUnit(actor))?;
        if unit.side().is_none() || unit.side() != self.turns.current_side() {
            return Err(CommandError::NotCurrentTurn(actor));
        }
        if !unit.is_player_controlled() {
            return Err(CommandError::NotControllable(actor));
        }
        Ok(())
    }

    /// Honored only during a manual player turn
    pub fn end_turn_request(&mut self) -> bool {
        self.turns.end_turn_request(&mut self.field)
    }

    /// Advance the simulation by `dt` seconds
    pub fn tick(&mut self, dt: f32) {
        while let Some(command) = self.queue.pop() {
            // Rejections are reported through CommandRejected events
            let _ = self.execute(&command);
        }
        self.field.tick_transits(dt);
        self.turns.tick(&mut self.field);
        if self.field.is_poisoned() {
            return;
        }
        if let Err(e) = self.field.audit() {
            tracing::error!("Audit failed after tick: {}", e);
        }
    }

    pub fn select(&mut self, unit: Option<UnitId>) -> Result<(), CommandError> {
        self.field.select(unit)
    }

    // ========================================================================
    // QUERIES
    // ========================================================================

    pub fn phase(&self) -> TurnPhase {
        self.turns.phase()
    }

    pub fn current_side(&self) -> Option<Side> {
        self.turns.current_side()
    }

    pub fn round(&self) -> u32 {
        self.turns.round()
    }

    pub fn has_unit_at(&self, c: HexCoord) -> bool {
        self.field.has_unit_at(c)
    }

    pub fn try_get_unit_at(&self, c: HexCoord) -> Option<&Unit> {
        self.field.try_get_unit_at(c)
    }

    pub fn can_step_to(&self, unit: UnitId, c: HexCoord) -> bool {
        self.field.can_step_to(unit, c)
    }

    pub fn tiles_in_range(&self, origin: HexCoord, min: u32, max: u32) -> Vec<HexCoord> {
        self.field.tiles_in_range(origin, min, max)
    }

    pub fn unit(&self, id: UnitId) -> Option<&Unit> {
        self.field.unit(id)
    }

    pub fn world_position(&self, id: UnitId) -> Option<WorldPos> {
        self.field.world_position(id)
    }

    pub fn selected(&self) -> Option<UnitId> {
        self.field.selected()
    }

    /// Both sides still have units on the field
    pub fn is_contested(&self) -> bool {
        !self.field.roster(Side::Player).is_empty() && !self.field.roster(Side::Enemy).is_empty()
    }

    pub fn is_poisoned(&self) -> bool {
        self.field.is_poisoned()
    }

    pub fn subscribe(&mut self, f: impl FnMut(&BattleEvent) + 'static) {
        self.field.subscribe(f);
    }

    pub fn drain_events(&mut self) -> Vec<BattleEvent> {
        self.field.drain_events()
    }

    pub fn field(&self) -> &Battlefield {
        &self.field
    }

    pub fn field_mut(&mut self) -> &mut Battlefield {
        &mut self.field
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::turn::PassActor;
    use crate::unit::Faction;
    use std::io::Write;
    use std::sync::{Arc, Mutex};

    /// Log sink shared with a test subscriber
    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl LogBuffer {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    fn c(q: i32, r: i32) -> HexCoord {
        HexCoord::new(q, r)
    }

    fn battle() -> Battle {
        let config = BattleConfig {
            name: "test".to_string(),
            units: vec![
                UnitSpawn::new("hero", Faction::Player, c(1, 1)).with_ability("strike"),
                UnitSpawn::new("foe", Faction::Enemy, c(4, 1)),
            ],
            ..BattleConfig::default()
        }
        .with_seconds_per_tile(0.1);
        Battle::from_config(&config, PlayerControl::Manual, Box::new(PassActor)).unwrap()
    }

    #[test]
    fn test_commands_gated_by_phase() {
        let mut battle = battle();
        let cmd = Command::move_to(UnitId(1), c(2, 1));
        assert_eq!(battle.execute(&cmd), Err(CommandError::NotCurrentTurn(UnitId(1))));

        battle.start();
        assert!(battle.execute(&cmd).is_ok());
        assert_eq!(
            battle.execute(&Command::move_to(UnitId(2), c(3, 1))),
            Err(CommandError::NotCurrentTurn(UnitId(2)))
        );
        assert!(battle
            .drain_events()
            .iter()
            .any(|e| matches!(e, BattleEvent::CommandRejected { .. })));
    }

    #[test]
    fn test_submitted_commands_run_on_tick() {
        let mut battle = battle();
        battle.start();
        battle.submit(Command::move_to(UnitId(1), c(2, 1)));
        battle.submit(Command::move_to(UnitId(1), c(3, 1)));
        battle.tick(0.0);
        // second step rejected: unit already in transit
        let events = battle.drain_events();
        assert!(events.contains(&BattleEvent::CommandRejected {
            unit: UnitId(1),
            reason: CommandError::AlreadyInTransit(UnitId(1)),
        }));

        battle.tick(0.1);
        assert_eq!(battle.unit(UnitId(1)).unwrap().coords, c(2, 1));
        assert_eq!(battle.queued(), 0);
    }

    #[test]
    fn test_not_controllable() {
        let mut battle = battle();
        battle.start();
        let mut spawn = UnitSpawn::new("ally", Faction::Player, c(0, 0));
        spawn.player_controlled = false;
        let ally = battle.spawn(spawn).unwrap();
        assert_eq!(
            battle.execute(&Command::move_to(ally, c(1, 0))),
            Err(CommandError::NotControllable(ally))
        );
    }

    #[test]
    fn test_poisoned_battle_logs_once() {
        let logs = LogBuffer::default();
        let sink = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || sink.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::WARN)
            .finish();

        let mut battle = battle();
        battle.start();
        battle.field_mut().displace_unchecked(UnitId(1), c(7, 7));
        tracing::subscriber::with_default(subscriber, || {
            for _ in 0..5 {
                battle.tick(0.1);
            }
        });

        assert!(battle.is_poisoned());
        let output = logs.contents();
        assert_eq!(output.matches("refusing further mutation").count(), 1);
        assert_eq!(output.matches("Audit failed").count(), 1);
        assert!(matches!(
            battle.execute(&Command::move_to(UnitId(1), c(2, 1))),
            Err(CommandError::InvariantViolation(_))
        ));
    }

    #[test]
    fn test_full_round_trip() {
        let mut battle = battle();
        battle.start();
        assert!(battle.end_turn_request());
        assert_eq!(battle.phase(), TurnPhase::EnemyTurn);
        for _ in 0..4 {
            battle.tick(0.1);
        }
        assert_eq!(battle.phase(), TurnPhase::PlayerTurn);
        assert_eq!(battle.round(), 2);
        assert!(battle.is_contested());
    }
}
