//! Battle events for presentation layers
//!
//! Events fire synchronously inside the call that causes them. Subscribers
//! see each event immediately; the bus also buffers them for polling hosts.

use crate::board::HexCoord;
use crate::error::CommandError;
use crate::unit::{Side, UnitId};
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum BattleEvent {
    TurnChanged {
        side: Side,
    },
    RoundStarted {
        round: u32,
    },
    MoveStarted {
        unit: UnitId,
        from: HexCoord,
        to: HexCoord,
    },
    MoveFinished {
        unit: UnitId,
        from: HexCoord,
        to: HexCoord,
    },
    SelectedUnitChanged {
        unit: Option<UnitId>,
    },
    AbilityUsed {
        caster: UnitId,
        ability: String,
        targets: Vec<UnitId>,
    },
    UnitDamaged {
        unit: UnitId,
        amount: u32,
        hp_left: u32,
    },
    UnitHealed {
        unit: UnitId,
        amount: u32,
        hp_left: u32,
    },
    UnitDied {
        unit: UnitId,
        at: HexCoord,
    },
    CommandRejected {
        unit: UnitId,
        #[serde(serialize_with = "serialize_reason")]
        reason: CommandError,
    },
}

fn serialize_reason<S: serde::Serializer>(err: &CommandError, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(err)
}

type Subscriber = Box<dyn FnMut(&BattleEvent)>;

/// Synchronous fan-out plus a drainable buffer
#[derive(Default)]
pub struct EventBus {
    subscribers: Vec<Subscriber>,
    pending: Vec<BattleEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, f: impl FnMut(&BattleEvent) + 'static) {
        self.subscribers.push(Box::new(f));
    }

    pub fn emit(&mut self, event: BattleEvent) {
        for sub in &mut self.subscribers {
            sub(&event);
        }
        self.pending.push(event);
    }

    /// Take every buffered event, oldest first
    pub fn drain(&mut self) -> Vec<BattleEvent> {
        std::mem::take(&mut self.pending)
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscribers.len())
            .field("pending", &self.pending.len())
            .finish()
    }
}
