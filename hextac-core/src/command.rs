//! Commands and the ordered command queue

use crate::board::HexCoord;
use crate::unit::UnitId;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommandKind {
    /// Single-step move to an adjacent cell
    Move(HexCoord),
    UseAbility {
        ability: String,
        #[serde(default)]
        targets: Vec<HexCoord>,
    },
}

/// A request from one actor, consumed once
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    /// Assigned at submission; execution follows this order
    pub seq: u64,
    pub actor: UnitId,
    pub kind: CommandKind,
}

impl Command {
    pub fn move_to(actor: UnitId, to: HexCoord) -> Self {
        Self {
            seq: 0,
            actor,
            kind: CommandKind::Move(to),
        }
    }

    pub fn use_ability(actor: UnitId, ability: &str, targets: Vec<HexCoord>) -> Self {
        Self {
            seq: 0,
            actor,
            kind: CommandKind::UseAbility {
                ability: ability.to_string(),
                targets,
            },
        }
    }
}

/// Producer of commands, e.g. an input layer or a replay
pub trait CommandSource {
    /// Next command, if any is ready
    fn poll(&mut self) -> Option<Command>;
}

/// Replays a fixed list of commands
impl CommandSource for VecDeque<Command> {
    fn poll(&mut self) -> Option<Command> {
        self.pop_front()
    }
}

/// FIFO of submitted commands with sequence numbering
#[derive(Clone, Debug, Default)]
pub struct CommandQueue {
    queue: VecDeque<Command>,
    next_seq: u64,
}

impl CommandQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stamp and enqueue; returns the assigned sequence number
    pub fn push(&mut self, mut command: Command) -> u64 {
        self.next_seq += 1;
        command.seq = self.next_seq;
        self.queue.push_back(command);
        self.next_seq
    }

    pub fn pull_from(&mut self, source: &mut dyn CommandSource) -> usize {
        let mut n = 0;
        while let Some(cmd) = source.poll() {
            self.push(cmd);
            n += 1;
        }
        n
    }

    pub fn pop(&mut self) -> Option<Command> {
        self.queue.pop_front()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn clear(&mut self) {
        self.queue.clear();
    }
}
