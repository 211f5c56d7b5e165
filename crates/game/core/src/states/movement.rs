//! Movement animation playback.
//!
//! Walks the chosen path on a fixed tick budget per tile, commits the
//! move at the end, and pushes the queued follow-up state.

use crate::EngineConfig;
use crate::action_log::LogEntry;
use crate::context::GameContext;
use crate::machine::{Flow, State};
use crate::states::names;
use crate::surface::{DrawOp, Surface};
use crate::unit::UnitFlags;

#[derive(Default)]
pub struct MovementState {
    ticks: u32,
}

impl State for MovementState {
    fn name(&self) -> &'static str {
        names::MOVEMENT
    }

    fn transparent(&self) -> bool {
        true
    }

    fn update(&mut self, ctx: &mut GameContext) -> Flow {
        let Some(path) = ctx.memory.chosen_path.clone() else {
            ctx.transitions.back();
            return Flow::Continue;
        };
        let total = (path.len().saturating_sub(1)) as u32 * EngineConfig::MOVE_TICKS_PER_TILE;
        self.ticks += 1;
        if self.ticks < total {
            return Flow::Continue;
        }

        // Animation done: commit the move.
        if let (Some(unit_nid), Some(&dest)) = (ctx.memory.selected_unit.clone(), path.last()) {
            let from = ctx.unit(&unit_nid).and_then(|u| u.position);
            if let Some(from) = from {
                if from != dest {
                    match ctx.move_unit(&unit_nid, dest) {
                        Ok(()) => {
                            ctx.action_log.record(LogEntry::Move {
                                unit: unit_nid.clone(),
                                from,
                                to: dest,
                            });
                            if let Some(unit) = ctx.unit_mut(&unit_nid) {
                                unit.flags.insert(UnitFlags::HAS_MOVED);
                            }
                        }
                        Err(err) => tracing::error!(%err, "movement commit failed"),
                    }
                }
                // Movement spent so far, available again under canto.
                let spent = self.path_cost(ctx, &path);
                let budget = ctx
                    .memory
                    .canto_budget
                    .or_else(|| ctx.unit(&unit_nid).map(|u| u.movement()))
                    .unwrap_or(0);
                ctx.memory.canto_budget = Some((budget - spent).max(0));
            }
            ctx.cursor = dest;
        }

        ctx.memory.chosen_path = None;
        ctx.transitions.back();
        if let Some(next) = ctx.memory.follow_up_state.take() {
            ctx.transitions.change(next);
        }
        Flow::Repeat
    }

    fn draw(&self, ctx: &GameContext, surface: &mut Surface) {
        if let Some(path) = &ctx.memory.chosen_path {
            surface.push(DrawOp::PathArrow(path.clone()));
        }
    }
}

impl MovementState {
    fn path_cost(&self, ctx: &GameContext, path: &[crate::common::Coord]) -> i32 {
        let Some(unit_nid) = &ctx.memory.selected_unit else {
            return 0;
        };
        let Some(unit) = ctx.unit(unit_nid) else {
            return 0;
        };
        let group = ctx
            .db
            .class(&unit.class)
            .map(|c| c.movement_group.clone())
            .unwrap_or_default();
        path.iter()
            .skip(1)
            .map(|&tile| ctx.board.movement_cost(&ctx.db, &group, tile))
            .sum()
    }
}
