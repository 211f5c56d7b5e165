//! The event interpreter: trigger matching, condition gating, and the
//! command execution stack.
//!
//! Events are scripted sequences attached to triggers. When a trigger
//! fires, matching prefabs are gated by their conditions, instantiated,
//! and pushed onto a LIFO stack; the `event` game state pumps the top
//! instance command-by-command, suspending on `speak`, `wait`, and
//! `transition` until an external signal resumes it.

pub mod command;
pub mod condition;
pub mod exec;

pub use command::{EventCommand, ScriptError, parse_source};
pub use condition::VarView;
pub use exec::{execute, pump};

use std::collections::{BTreeMap, BTreeSet};

use crate::common::Nid;

/// Well-known trigger names fired by the engine itself.
pub mod triggers {
    pub const LEVEL_START: &str = "level_start";
    pub const LEVEL_END: &str = "level_end";
    pub const TURN_CHANGE: &str = "turn_change";
    pub const PHASE_CHANGE: &str = "phase_change";
    pub const TURN_START: &str = "turn_start";
    pub const COMBAT_END: &str = "combat_end";
    pub const UNIT_DEATH: &str = "unit_death";
    pub const UNIT_TALK: &str = "unit_talk";
    pub const REGION_VISIT: &str = "region_visit";
    pub const BASE_CONVO: &str = "base_convo";
}

/// An event definition: trigger, gate, and script source.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EventPrefab {
    pub nid: Nid,
    pub trigger: String,
    /// Scoped events only fire on their level; unscoped fire anywhere.
    pub level_nid: Option<Nid>,
    pub condition: String,
    pub only_once: bool,
    pub priority: i32,
    /// Semicolon-delimited command lines.
    pub source: Vec<String>,
}

/// Execution status of a live event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EventStatus {
    Running,
    /// Suspended on a speak/wait/transition boundary.
    Waiting,
    Done,
}

/// One live event on the execution stack.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EventInstance {
    pub nid: Nid,
    commands: Vec<EventCommand>,
    pointer: usize,
    status: EventStatus,
}

impl EventInstance {
    pub fn new(prefab: &EventPrefab) -> Self {
        let commands = parse_source(&prefab.nid, &prefab.source);
        let status = if commands.is_empty() {
            EventStatus::Done
        } else {
            EventStatus::Running
        };
        Self {
            nid: prefab.nid.clone(),
            commands,
            pointer: 0,
            status,
        }
    }

    pub fn status(&self) -> EventStatus {
        self.status
    }

    /// Returns the next command and advances the pointer. Suspending
    /// commands flip the status to `Waiting`; a drained queue flips it
    /// to `Done`.
    pub fn advance(&mut self) -> Option<EventCommand> {
        if self.status != EventStatus::Running {
            return None;
        }
        let cmd = self.commands.get(self.pointer).cloned()?;
        self.pointer += 1;
        if cmd.suspends() {
            self.status = EventStatus::Waiting;
        }
        if self.pointer >= self.commands.len() && self.status == EventStatus::Running {
            self.status = EventStatus::Done;
        }
        Some(cmd)
    }

    /// Clears the waiting flag set by a suspending command.
    pub fn resolve_wait(&mut self) {
        if self.status == EventStatus::Waiting {
            self.status = if self.pointer >= self.commands.len() {
                EventStatus::Done
            } else {
                EventStatus::Running
            };
        }
    }
}

/// Dialog currently displayed by a suspended `speak` command.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Dialog {
    pub speaker: Nid,
    pub text: String,
}

/// What the suspended top event is waiting on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PendingWait {
    /// A dialog the player dismisses with SELECT.
    Dialog,
    /// A wall-clock wait, in remaining frame ticks.
    Timer(u32),
    /// A screen transition animation, in remaining ticks.
    Transition(u32),
}

/// The event manager: prefab registry scan, only-once bookkeeping, and
/// the LIFO execution stack.
#[derive(Clone, Debug, Default)]
pub struct EventManager {
    prefabs: Vec<EventPrefab>,
    completed: BTreeSet<Nid>,
    stack: Vec<EventInstance>,
    /// Dialog shown while the top event waits on a `speak`.
    pub current_dialog: Option<Dialog>,
    /// What the suspension is waiting on; transient, never persisted.
    pub pending_wait: Option<PendingWait>,
    /// Active portraits by nid → screen position tag.
    pub portraits: BTreeMap<Nid, String>,
}

impl EventManager {
    pub fn new(prefabs: Vec<EventPrefab>) -> Self {
        Self {
            prefabs,
            ..Self::default()
        }
    }

    /// Prefab indices matching a trigger, sorted by priority descending
    /// and stable on definition order. Level-scoped prefabs only match
    /// their level; unscoped prefabs match only unscoped triggers.
    pub fn candidates(&self, trigger: &str, level: Option<&Nid>) -> Vec<usize> {
        let mut matched: Vec<usize> = self
            .prefabs
            .iter()
            .enumerate()
            .filter(|(_, p)| p.trigger == trigger)
            .filter(|(_, p)| match (&p.level_nid, level) {
                (Some(scope), Some(level)) => scope == level,
                (Some(_), None) => false,
                (None, _) => true,
            })
            .filter(|(_, p)| !(p.only_once && self.completed.contains(&p.nid)))
            .map(|(i, _)| i)
            .collect();
        matched.sort_by_key(|&i| std::cmp::Reverse(self.prefabs[i].priority));
        matched
    }

    pub fn prefab(&self, index: usize) -> Option<&EventPrefab> {
        self.prefabs.get(index)
    }

    /// Instantiates a prefab onto the stack and consumes its only-once
    /// charge. Callers pass candidates in priority order; they are pushed
    /// in reverse so the highest priority ends up on top.
    pub fn activate(&mut self, index: usize) {
        let Some(prefab) = self.prefabs.get(index) else {
            return;
        };
        if prefab.only_once {
            self.completed.insert(prefab.nid.clone());
        }
        let instance = EventInstance::new(prefab);
        self.stack.push(instance);
    }

    pub fn is_active(&self) -> bool {
        !self.stack.is_empty()
    }

    pub fn top(&self) -> Option<&EventInstance> {
        self.stack.last()
    }

    pub fn top_mut(&mut self) -> Option<&mut EventInstance> {
        self.stack.last_mut()
    }

    /// Pops finished events off the top. Returns whether anything remains.
    pub fn reap_done(&mut self) -> bool {
        while matches!(self.stack.last().map(EventInstance::status), Some(EventStatus::Done)) {
            self.stack.pop();
        }
        self.is_active()
    }

    /// Advances the top event by one command.
    pub fn advance(&mut self) -> Option<EventCommand> {
        self.stack.last_mut()?.advance()
    }

    /// Resumes the top event after a suspension and clears any dialog.
    pub fn resolve_wait(&mut self) {
        self.current_dialog = None;
        self.pending_wait = None;
        if let Some(top) = self.stack.last_mut() {
            top.resolve_wait();
        }
    }

    /// Cancels all live events (save-load or turnwheel rewind).
    pub fn clear(&mut self) {
        self.stack.clear();
        self.current_dialog = None;
        self.pending_wait = None;
        self.portraits.clear();
    }

    /// Only-once nids already consumed; persisted in snapshots.
    pub fn completed(&self) -> impl Iterator<Item = &Nid> {
        self.completed.iter()
    }

    pub fn restore_completed(&mut self, nids: impl IntoIterator<Item = Nid>) {
        self.completed = nids.into_iter().collect();
    }

    /// Swaps in the registry prefabs (used on snapshot restore).
    pub fn set_prefabs(&mut self, prefabs: Vec<EventPrefab>) {
        self.prefabs = prefabs;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prefab(nid: &str, trigger: &str, priority: i32, only_once: bool) -> EventPrefab {
        EventPrefab {
            nid: Nid::new(nid),
            trigger: trigger.to_owned(),
            level_nid: Some(Nid::new("L1")),
            condition: String::new(),
            only_once,
            priority,
            source: vec!["speak;Hero;Go!".to_owned()],
        }
    }

    #[test]
    fn candidates_sort_by_priority_then_definition_order() {
        let mgr = EventManager::new(vec![
            prefab("e1", "turn_change", 0, false),
            prefab("e2", "turn_change", 5, false),
            prefab("e3", "turn_change", 5, false),
            prefab("e4", "other", 9, false),
        ]);
        let level = Nid::new("L1");
        assert_eq!(mgr.candidates("turn_change", Some(&level)), vec![1, 2, 0]);
    }

    #[test]
    fn level_scoping() {
        let mut p = prefab("e1", "turn_change", 0, false);
        p.level_nid = Some(Nid::new("L2"));
        let unscoped = EventPrefab {
            level_nid: None,
            ..prefab("e2", "turn_change", 0, false)
        };
        let mgr = EventManager::new(vec![p, unscoped]);
        let level = Nid::new("L1");
        assert_eq!(mgr.candidates("turn_change", Some(&level)), vec![1]);
        assert_eq!(mgr.candidates("turn_change", None), vec![1]);
    }

    #[test]
    fn only_once_consumes() {
        let mut mgr = EventManager::new(vec![prefab("e1", "turn_change", 0, true)]);
        let level = Nid::new("L1");
        assert_eq!(mgr.candidates("turn_change", Some(&level)).len(), 1);
        mgr.activate(0);
        assert!(mgr.candidates("turn_change", Some(&level)).is_empty());
    }

    #[test]
    fn instance_lifecycle_speak_then_done() {
        let mut mgr = EventManager::new(vec![prefab("e1", "turn_change", 0, false)]);
        mgr.activate(0);

        let cmd = mgr.advance().unwrap();
        assert!(matches!(cmd, EventCommand::Speak { .. }));
        assert_eq!(mgr.top().unwrap().status(), EventStatus::Waiting);
        assert_eq!(mgr.advance(), None);

        mgr.resolve_wait();
        assert_eq!(mgr.top().unwrap().status(), EventStatus::Done);
        assert!(!mgr.reap_done());
    }

    #[test]
    fn empty_event_completes_immediately() {
        let empty = EventPrefab {
            source: Vec::new(),
            ..prefab("e0", "turn_change", 0, false)
        };
        let mut mgr = EventManager::new(vec![empty]);
        mgr.activate(0);
        assert_eq!(mgr.top().unwrap().status(), EventStatus::Done);
        assert!(!mgr.reap_done());
    }
}
