//! The AI turn: iterate the active team's units in board order and
//! execute their decided actions with inline movement and combat clocks.

use crate::EngineConfig;
use crate::action_log::LogEntry;
use crate::ai::{self, AiAction};
use crate::combat::{CombatSolver, resolve};
use crate::common::Nid;
use crate::context::GameContext;
use crate::events::triggers;
use crate::machine::{Flow, State};
use crate::states::{check_end_conditions, names};
use crate::surface::{DrawOp, Surface};
use crate::unit::UnitFlags;

enum Step {
    /// Choosing the next unit to act.
    Pick,
    /// Walking the decided path.
    Moving { action: AiAction, ticks: u32 },
    /// Playing out a combat.
    Fighting { solver: CombatSolver, unit: Nid },
}

pub struct AiState {
    queue: Vec<Nid>,
    step: Step,
}

impl Default for AiState {
    fn default() -> Self {
        Self {
            queue: Vec::new(),
            step: Step::Pick,
        }
    }
}

impl State for AiState {
    fn name(&self) -> &'static str {
        names::AI
    }

    fn start(&mut self, ctx: &mut GameContext) -> Flow {
        // Board order, so two runs of the same turn behave identically.
        let team = ctx.current_team();
        self.queue = ctx
            .board
            .units_in_board_order()
            .filter(|(_, nid)| {
                ctx.unit(nid)
                    .map(|u| u.team == team && u.actionable())
                    .unwrap_or(false)
            })
            .map(|(_, nid)| nid.clone())
            .collect();
        Flow::Continue
    }

    fn update(&mut self, ctx: &mut GameContext) -> Flow {
        match std::mem::replace(&mut self.step, Step::Pick) {
            Step::Pick => self.pick_next(ctx),
            Step::Moving { action, ticks } => self.advance_move(ctx, action, ticks),
            Step::Fighting { solver, unit } => self.advance_combat(ctx, solver, unit),
        }
    }

    fn draw(&self, ctx: &GameContext, surface: &mut Surface) {
        match &self.step {
            Step::Moving { action, .. } => {
                surface.push(DrawOp::PathArrow(action.path.clone()));
            }
            Step::Fighting { solver, .. } => {
                let outcome = solver.outcome();
                if let (Some(attacker), Some(defender)) = (
                    ctx.unit(&outcome.attacker),
                    ctx.unit(&outcome.defender),
                ) {
                    let (atk_hp, def_hp) = solver.displayed_hp(attacker, defender);
                    surface.push(DrawOp::CombatHud {
                        attacker: outcome.attacker.clone(),
                        defender: outcome.defender.clone(),
                        attacker_hp: atk_hp,
                        defender_hp: def_hp,
                    });
                }
            }
            Step::Pick => {}
        }
    }
}

impl AiState {
    fn pick_next(&mut self, ctx: &mut GameContext) -> Flow {
        loop {
            if self.queue.is_empty() {
                ctx.transitions.clear();
                ctx.transitions.change(names::TURN_CHANGE);
                return Flow::Continue;
            }
            let unit_nid = self.queue.remove(0);
            if !ctx.unit(&unit_nid).map(|u| u.actionable()).unwrap_or(false) {
                continue;
            }
            match ai::next_action(ctx, &unit_nid) {
                Some(action) => {
                    if let Some(&dest) = action.path.last() {
                        ctx.cursor = dest;
                    }
                    self.step = Step::Moving { action, ticks: 0 };
                    return Flow::Continue;
                }
                None => {
                    if let Some(unit) = ctx.unit_mut(&unit_nid) {
                        unit.mark_finished();
                    }
                    continue;
                }
            }
        }
    }

    fn advance_move(&mut self, ctx: &mut GameContext, action: AiAction, ticks: u32) -> Flow {
        let total = (action.path.len().saturating_sub(1)) as u32 * EngineConfig::MOVE_TICKS_PER_TILE;
        if ticks < total {
            self.step = Step::Moving {
                action,
                ticks: ticks + 1,
            };
            return Flow::Continue;
        }

        // Commit the move.
        if let Some(&dest) = action.path.last() {
            let from = ctx.unit(&action.unit).and_then(|u| u.position);
            if let Some(from) = from {
                if from != dest {
                    if let Err(err) = ctx.move_unit(&action.unit, dest) {
                        tracing::error!(%err, "ai move failed");
                    } else {
                        ctx.action_log.record(LogEntry::Move {
                            unit: action.unit.clone(),
                            from,
                            to: dest,
                        });
                        if let Some(unit) = ctx.unit_mut(&action.unit) {
                            unit.flags.insert(UnitFlags::HAS_MOVED);
                        }
                    }
                }
            }
        }

        match action.attack {
            Some((target, weapon_uid)) => {
                let pieces = (
                    ctx.unit(&action.unit).cloned(),
                    ctx.unit(&target).cloned(),
                    ctx.item(weapon_uid).cloned(),
                );
                let (Some(attacker), Some(defender), Some(weapon)) = pieces else {
                    self.finish_unit(ctx, &action.unit);
                    return Flow::Continue;
                };
                let defense_uid = ctx.equipped_weapon(&defender);
                let defense_weapon = defense_uid.and_then(|uid| ctx.item(uid).cloned());
                match resolve(
                    &ctx.db,
                    &ctx.board,
                    &attacker,
                    &weapon,
                    &defender,
                    defense_weapon.as_ref(),
                    ctx.rng_mode,
                    &mut ctx.rng,
                ) {
                    Ok(outcome) => {
                        self.step = Step::Fighting {
                            solver: CombatSolver::new(outcome, weapon_uid, defense_uid),
                            unit: action.unit,
                        };
                    }
                    Err(err) => {
                        tracing::warn!(%err, "ai attack rejected");
                        self.finish_unit(ctx, &action.unit);
                    }
                }
            }
            None => self.finish_unit(ctx, &action.unit),
        }
        Flow::Continue
    }

    fn advance_combat(&mut self, ctx: &mut GameContext, mut solver: CombatSolver, unit: Nid) -> Flow {
        if !solver.tick() {
            self.step = Step::Fighting { solver, unit };
            return Flow::Continue;
        }
        solver.apply_results(ctx);
        ctx.trigger_event(triggers::COMBAT_END);
        self.finish_unit(ctx, &unit);

        if check_end_conditions(ctx) {
            return Flow::Continue;
        }
        if ctx.events.is_active() {
            ctx.transitions.change(names::EVENT);
        }
        Flow::Continue
    }

    fn finish_unit(&mut self, ctx: &mut GameContext, unit: &Nid) {
        if let Some(u) = ctx.unit_mut(unit) {
            u.mark_finished();
        }
        self.step = Step::Pick;
    }
}
