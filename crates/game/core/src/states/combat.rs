//! Player combat playback state.
//!
//! Resolves the staged attack on entry, drives the solver's animation
//! phases, applies the results once, then routes to canto movement or
//! back to the free state.

use crate::combat::{CombatSolver, resolve};
use crate::context::GameContext;
use crate::events::triggers;
use crate::machine::{Flow, State};
use crate::states::{check_end_conditions, has_canto, names};
use crate::surface::{DrawOp, Surface};
use crate::unit::UnitFlags;

#[derive(Default)]
pub struct CombatState {
    solver: Option<CombatSolver>,
}

impl State for CombatState {
    fn name(&self) -> &'static str {
        names::COMBAT
    }

    fn transparent(&self) -> bool {
        true
    }

    fn start(&mut self, ctx: &mut GameContext) -> Flow {
        let staged = (
            ctx.memory.selected_unit.clone(),
            ctx.memory.target.clone(),
            ctx.memory.weapon,
        );
        let (Some(attacker_nid), Some(defender_nid), Some(weapon_uid)) = staged else {
            tracing::error!("combat entered without a staged attack");
            ctx.transitions.back();
            return Flow::Continue;
        };

        // Clone the combatants so the resolver can borrow them alongside
        // the item map; results are applied through the solver later.
        let (Some(attacker), Some(defender)) = (
            ctx.unit(&attacker_nid).cloned(),
            ctx.unit(&defender_nid).cloned(),
        ) else {
            ctx.transitions.back();
            return Flow::Continue;
        };
        let Some(weapon) = ctx.item(weapon_uid).cloned() else {
            ctx.transitions.back();
            return Flow::Continue;
        };
        let defense_uid = ctx.equipped_weapon(&defender);
        let defense_weapon = defense_uid.and_then(|uid| ctx.item(uid).cloned());

        let outcome = resolve(
            &ctx.db,
            &ctx.board,
            &attacker,
            &weapon,
            &defender,
            defense_weapon.as_ref(),
            ctx.rng_mode,
            &mut ctx.rng,
        );
        match outcome {
            Ok(outcome) => {
                self.solver = Some(CombatSolver::new(outcome, weapon_uid, defense_uid));
                Flow::Continue
            }
            Err(err) => {
                tracing::warn!(%err, "attack rejected");
                ctx.transitions.back();
                Flow::Continue
            }
        }
    }

    fn update(&mut self, ctx: &mut GameContext) -> Flow {
        let Some(solver) = self.solver.as_mut() else {
            return Flow::Continue;
        };
        if !solver.tick() {
            return Flow::Continue;
        }
        solver.apply_results(ctx);

        let attacker_nid = solver.outcome().attacker.clone();
        let attacker_survived = !solver.outcome().attacker_dead;
        self.solver = None;

        if let Some(unit) = ctx.unit_mut(&attacker_nid) {
            unit.flags.insert(UnitFlags::HAS_ATTACKED);
        }
        ctx.memory.target = None;
        ctx.memory.weapon = None;

        let fired = ctx.trigger_event(triggers::COMBAT_END);

        if check_end_conditions(ctx) {
            return Flow::Continue;
        }

        let canto_eligible = attacker_survived
            && ctx.is_player_phase()
            && ctx
                .unit(&attacker_nid)
                .map(|u| has_canto(u) && ctx.memory.canto_budget.unwrap_or(0) > 0)
                .unwrap_or(false);

        ctx.transitions.clear();
        if canto_eligible {
            ctx.memory.selected_unit = Some(attacker_nid.clone());
            ctx.memory.move_origin = ctx.unit(&attacker_nid).and_then(|u| u.position);
            ctx.transitions.change(names::FREE);
            ctx.transitions.change(names::MOVE);
        } else {
            if let Some(unit) = ctx.unit_mut(&attacker_nid) {
                unit.mark_finished();
            }
            ctx.memory.canto_budget = None;
            ctx.transitions.change(names::FREE);
        }
        if fired > 0 {
            ctx.transitions.change(names::EVENT);
        }
        Flow::Continue
    }

    fn draw(&self, ctx: &GameContext, surface: &mut Surface) {
        let Some(solver) = self.solver.as_ref() else {
            return;
        };
        let outcome = solver.outcome();
        let (Some(attacker), Some(defender)) = (
            ctx.unit(&outcome.attacker),
            ctx.unit(&outcome.defender),
        ) else {
            return;
        };
        let (atk_hp, def_hp) = solver.displayed_hp(attacker, defender);
        surface.push(DrawOp::CombatHud {
            attacker: outcome.attacker.clone(),
            defender: outcome.defender.clone(),
            attacker_hp: atk_hp,
            defender_hp: def_hp,
        });
    }
}
