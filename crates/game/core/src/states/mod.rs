//! Concrete game states.
//!
//! Each state has one responsibility and exits by queueing transitions
//! on the context. Local data (cursor indices, animation clocks) lives
//! on the state struct and dies with the pop; anything that must cross a
//! transition goes through [`crate::context::Memory`].

pub mod ai;
pub mod base;
pub mod combat;
pub mod endings;
pub mod event;
pub mod free;
pub mod menu;
pub mod move_select;
pub mod movement;
pub mod overlays;
pub mod overworld;
pub mod prep;
pub mod roam;
pub mod targeting;
pub mod title;
pub mod turn_change;
pub mod turnwheel;

use crate::action_log::LogEntry;
use crate::common::Nid;
use crate::context::GameContext;
use crate::machine::StateMachine;
use crate::unit::UnitFlags;

/// Stable state names used by the registry and the saved state stack.
pub mod names {
    pub const TITLE: &str = "title";
    pub const FREE: &str = "free";
    pub const MOVE: &str = "move";
    pub const MENU: &str = "menu";
    pub const TARGETING: &str = "targeting";
    pub const COMBAT: &str = "combat";
    pub const AI: &str = "ai";
    pub const TURN_CHANGE: &str = "turn_change";
    pub const PHASE_CHANGE: &str = "phase_change";
    pub const MOVEMENT: &str = "movement";
    pub const EVENT: &str = "event";
    pub const INFO_MENU: &str = "info_menu";
    pub const OPTION_MENU: &str = "option_menu";
    pub const MINIMAP: &str = "minimap";
    pub const SETTINGS: &str = "settings";
    pub const CREDIT: &str = "credit";
    pub const PREP: &str = "prep";
    pub const BASE: &str = "base";
    pub const OVERWORLD: &str = "overworld";
    pub const ROAM: &str = "roam";
    pub const TURNWHEEL: &str = "turnwheel";
    pub const VICTORY: &str = "victory";
    pub const GAME_OVER: &str = "game_over";
}

/// Registers every concrete state with the machine.
pub fn register_all(machine: &mut StateMachine) {
    machine.register(names::TITLE, || Box::new(title::TitleState::default()));
    machine.register(names::FREE, || Box::new(free::FreeState::default()));
    machine.register(names::MOVE, || Box::new(move_select::MoveState::default()));
    machine.register(names::MENU, || Box::new(menu::MenuState::default()));
    machine.register(names::TARGETING, || {
        Box::new(targeting::TargetingState::default())
    });
    machine.register(names::COMBAT, || Box::new(combat::CombatState::default()));
    machine.register(names::AI, || Box::new(ai::AiState::default()));
    machine.register(names::TURN_CHANGE, || {
        Box::new(turn_change::TurnChangeState::default())
    });
    machine.register(names::PHASE_CHANGE, || {
        Box::new(turn_change::PhaseChangeState::default())
    });
    machine.register(names::MOVEMENT, || {
        Box::new(movement::MovementState::default())
    });
    machine.register(names::EVENT, || Box::new(event::EventState::default()));
    machine.register(names::INFO_MENU, || {
        Box::new(overlays::InfoMenuState::default())
    });
    machine.register(names::OPTION_MENU, || {
        Box::new(overlays::OptionMenuState::default())
    });
    machine.register(names::MINIMAP, || Box::new(overlays::MinimapState));
    machine.register(names::SETTINGS, || {
        Box::new(overlays::SettingsState::default())
    });
    machine.register(names::CREDIT, || Box::new(overlays::CreditState::default()));
    machine.register(names::PREP, || Box::new(prep::PrepState::default()));
    machine.register(names::BASE, || Box::new(base::BaseState::default()));
    machine.register(names::OVERWORLD, || {
        Box::new(overworld::OverworldState::default())
    });
    machine.register(names::ROAM, || Box::new(roam::RoamState::default()));
    machine.register(names::TURNWHEEL, || {
        Box::new(turnwheel::TurnwheelState::default())
    });
    machine.register(names::VICTORY, || Box::new(endings::VictoryState::default()));
    machine.register(names::GAME_OVER, || {
        Box::new(endings::GameOverState::default())
    });
}

/// Evaluates win/loss and queues the ending state when one holds.
/// Returns `true` when an ending was queued.
pub(crate) fn check_end_conditions(ctx: &mut GameContext) -> bool {
    if ctx.check_loss_condition() {
        ctx.transitions.clear();
        ctx.transitions.change(names::GAME_OVER);
        return true;
    }
    if ctx.check_win_condition() {
        ctx.transitions.clear();
        ctx.transitions.change(names::VICTORY);
        return true;
    }
    false
}

/// Marks a unit's turn as spent, records the wait, and pops `pops`
/// states back toward the free state.
pub(crate) fn finish_unit_turn(ctx: &mut GameContext, unit_nid: &Nid, pops: usize) {
    let flags_before = ctx.unit(unit_nid).map(|u| u.flags);
    if let Some(unit) = ctx.unit_mut(unit_nid) {
        unit.mark_finished();
    }
    if let (Some(before), Some(after)) = (flags_before, ctx.unit(unit_nid).map(|u| u.flags)) {
        ctx.action_log.record(LogEntry::Wait {
            unit: unit_nid.clone(),
            flags_before: before,
            flags_after: after,
        });
    }
    ctx.memory.canto_budget = None;
    if !check_end_conditions(ctx) {
        for _ in 0..pops {
            ctx.transitions.back();
        }
    }
}

/// Whether a unit has a skill granting canto.
pub(crate) fn has_canto(unit: &crate::unit::Unit) -> bool {
    unit.skills
        .iter()
        .any(|s| s.components.flag(crate::data::component_keys::CANTO))
        || unit.flags.contains(UnitFlags::HAS_CANTO)
}
