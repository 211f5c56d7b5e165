//! Reversible action journal backing the turnwheel.
//!
//! Every gameplay mutation that can be rewound is recorded as an entry
//! carrying enough observed state to apply and invert it exactly. The
//! invariant: the live world always equals the initial state with
//! `entries[..cursor]` applied in order.

use crate::common::{Coord, Nid};
use crate::data::Stats;
use crate::item::ItemUid;
use crate::unit::{UnitFlags, UnitStatus};

/// Observed unit fields captured around an irreversible-looking action so
/// the inverse can restore them exactly.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UnitSnap {
    pub nid: Nid,
    pub hp: i32,
    pub exp: i32,
    pub level: i32,
    pub stats: Stats,
    pub flags: UnitFlags,
    pub position: Option<Coord>,
    pub statuses: Vec<UnitStatus>,
}

/// One reversible gameplay action.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LogEntry {
    Move {
        unit: Nid,
        from: Coord,
        to: Coord,
    },
    Attack {
        attacker_before: UnitSnap,
        attacker_after: UnitSnap,
        defender_before: UnitSnap,
        defender_after: UnitSnap,
        /// Weapon uses before/after per touched item.
        weapon_uses: Vec<(ItemUid, Option<i32>, Option<i32>)>,
        /// Items that broke: (item, owner, slot it occupied).
        broken: Vec<(ItemUid, Nid, usize)>,
    },
    Wait {
        unit: Nid,
        flags_before: UnitFlags,
        flags_after: UnitFlags,
    },
    UseItem {
        unit: Nid,
        item: ItemUid,
        slot: usize,
        hp_before: i32,
        hp_after: i32,
        uses_before: Option<i32>,
        uses_after: Option<i32>,
        broke: bool,
    },
    Trade {
        unit1: Nid,
        unit2: Nid,
        slot1: usize,
        slot2: usize,
    },
    Rescue {
        carrier: Nid,
        passenger: Nid,
        passenger_pos: Coord,
    },
    Drop {
        carrier: Nid,
        passenger: Nid,
        tile: Coord,
    },
    TurnAdvance {
        turn_count_before: i32,
        turn_count_after: i32,
        team_index_before: usize,
        team_index_after: usize,
        /// Units whose flags/statuses/HP were touched by the phase reset.
        units_before: Vec<UnitSnap>,
        units_after: Vec<UnitSnap>,
    },
}

impl LogEntry {
    /// Short human description shown while scrubbing the turnwheel.
    pub fn description(&self) -> String {
        match self {
            LogEntry::Move { unit, to, .. } => format!("{unit} moved to {to}"),
            LogEntry::Attack {
                attacker_before,
                defender_before,
                ..
            } => format!("{} attacked {}", attacker_before.nid, defender_before.nid),
            LogEntry::Wait { unit, .. } => format!("{unit} waited"),
            LogEntry::UseItem { unit, .. } => format!("{unit} used an item"),
            LogEntry::Trade { unit1, unit2, .. } => format!("{unit1} traded with {unit2}"),
            LogEntry::Rescue { carrier, passenger, .. } => {
                format!("{carrier} rescued {passenger}")
            }
            LogEntry::Drop { carrier, passenger, .. } => {
                format!("{carrier} dropped {passenger}")
            }
            LogEntry::TurnAdvance {
                turn_count_after, ..
            } => format!("turn {turn_count_after}"),
        }
    }

    /// Tile the camera should focus while scrubbing past this entry.
    pub fn focus(&self) -> Option<Coord> {
        match self {
            LogEntry::Move { to, .. } => Some(*to),
            LogEntry::Attack { defender_before, .. } => defender_before.position,
            LogEntry::Wait { .. } | LogEntry::UseItem { .. } | LogEntry::Trade { .. } => None,
            LogEntry::Rescue { passenger_pos, .. } => Some(*passenger_pos),
            LogEntry::Drop { tile, .. } => Some(*tile),
            LogEntry::TurnAdvance { .. } => None,
        }
    }
}

/// The journal. Recording is toggled off while the turnwheel itself is
/// open so rewind navigation is not recorded.
#[derive(Clone, Debug, Default)]
pub struct ActionLog {
    entries: Vec<LogEntry>,
    /// Entries `[..cursor]` are applied to the live world.
    cursor: usize,
    recording: bool,
    /// Set once the player has rewound at least one action.
    pub locked: bool,
    /// Turnwheel charges; negative means unlimited.
    pub uses_remaining: i32,
}

impl ActionLog {
    pub fn new(uses: i32) -> Self {
        Self {
            uses_remaining: uses,
            ..Self::default()
        }
    }

    pub fn start_recording(&mut self) {
        self.recording = true;
    }

    pub fn stop_recording(&mut self) {
        self.recording = false;
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    /// Records an already-applied action. While rewound, recording is
    /// rejected to protect the journal invariant.
    pub fn record(&mut self, entry: LogEntry) {
        if !self.recording {
            return;
        }
        if self.cursor != self.entries.len() {
            tracing::error!("refusing to record while rewound; entry dropped");
            return;
        }
        self.entries.push(entry);
        self.cursor += 1;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Entry that `forward` would replay next.
    pub fn peek_future(&self) -> Option<&LogEntry> {
        self.entries.get(self.cursor)
    }

    /// Entry that `backward` would undo next.
    pub fn peek_past(&self) -> Option<&LogEntry> {
        self.cursor.checked_sub(1).and_then(|i| self.entries.get(i))
    }

    pub(crate) fn step_forward(&mut self) {
        debug_assert!(self.cursor < self.entries.len());
        self.cursor += 1;
    }

    pub(crate) fn step_backward(&mut self) {
        debug_assert!(self.cursor > 0);
        self.cursor -= 1;
        self.locked = true;
    }

    /// Commits the current rewound position as the new present and spends
    /// a turnwheel charge. Future entries are dropped.
    pub fn finalize(&mut self) {
        self.entries.truncate(self.cursor);
        self.locked = false;
        if self.uses_remaining > 0 {
            self.uses_remaining -= 1;
        }
    }

    /// Cancels a rewind bookkeeping-wise; the caller replays `forward`
    /// until the cursor reaches the present before calling this.
    pub fn reset(&mut self) {
        debug_assert_eq!(self.cursor, self.entries.len());
        self.locked = false;
    }

    /// The SELECT-to-finalize affordance is live once the player has
    /// rewound and charges remain.
    pub fn can_use(&self) -> bool {
        self.locked && self.uses_remaining != 0
    }

    /// Raw entry list, for snapshot persistence.
    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    /// Replaces the journal wholesale (snapshot restore). The cursor
    /// lands at the present and recording stays off.
    pub fn restore(&mut self, entries: Vec<LogEntry>, uses_remaining: i32) {
        self.cursor = entries.len();
        self.entries = entries;
        self.uses_remaining = uses_remaining;
        self.locked = false;
        self.recording = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn move_entry(x: i32) -> LogEntry {
        LogEntry::Move {
            unit: Nid::new("u"),
            from: Coord::new(0, 0),
            to: Coord::new(x, 0),
        }
    }

    #[test]
    fn record_requires_recording() {
        let mut log = ActionLog::new(-1);
        log.record(move_entry(1));
        assert!(log.is_empty());
        log.start_recording();
        log.record(move_entry(1));
        assert_eq!(log.len(), 1);
        assert_eq!(log.cursor(), 1);
    }

    #[test]
    fn rewind_locks_and_finalize_drops_future() {
        let mut log = ActionLog::new(2);
        log.start_recording();
        log.record(move_entry(1));
        log.record(move_entry(2));
        log.stop_recording();

        log.step_backward();
        assert!(log.locked);
        assert!(log.can_use());
        assert!(log.peek_future().is_some());

        log.finalize();
        assert_eq!(log.len(), 1);
        assert!(!log.locked);
        assert_eq!(log.uses_remaining, 1);
    }

    #[test]
    fn can_use_honors_charges() {
        let mut log = ActionLog::new(0);
        log.start_recording();
        log.record(move_entry(1));
        log.step_backward();
        assert!(log.locked);
        assert!(!log.can_use());
    }

    #[test]
    fn refuses_recording_while_rewound() {
        let mut log = ActionLog::new(-1);
        log.start_recording();
        log.record(move_entry(1));
        log.step_backward();
        log.record(move_entry(2));
        assert_eq!(log.len(), 1);
    }
}
