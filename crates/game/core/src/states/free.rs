//! The free map state: cursor movement and unit selection.

use crate::common::Nid;
use crate::context::GameContext;
use crate::input::{Button, InputEvent};
use crate::machine::{Flow, State};
use crate::states::{check_end_conditions, names};
use crate::surface::{DrawOp, Surface};

#[derive(Default)]
pub struct FreeState;

impl State for FreeState {
    fn name(&self) -> &'static str {
        names::FREE
    }

    fn begin(&mut self, ctx: &mut GameContext) -> Flow {
        // Stale hand-off data from a cancelled action chain.
        ctx.memory.selected_unit = None;
        ctx.memory.move_origin = None;
        ctx.memory.chosen_path = None;
        ctx.memory.target = None;
        ctx.memory.weapon = None;
        ctx.memory.canto_budget = None;

        if check_end_conditions(ctx) {
            return Flow::Repeat;
        }
        if ctx.events.is_active() {
            ctx.transitions.change(names::EVENT);
            return Flow::Repeat;
        }
        if ctx.roam_info.is_some() {
            ctx.transitions.change(names::ROAM);
            return Flow::Repeat;
        }
        Flow::Continue
    }

    fn take_input(&mut self, ctx: &mut GameContext, event: InputEvent) -> Flow {
        let Some(button) = event else {
            return Flow::Continue;
        };
        if let Some((dx, dy)) = button.direction() {
            let next = crate::common::Coord::new(ctx.cursor.x + dx, ctx.cursor.y + dy);
            if ctx.board.in_bounds(next) {
                ctx.cursor = next;
            }
            return Flow::Continue;
        }
        match button {
            Button::Select => {
                let hovered = ctx.board.get_unit(ctx.cursor).cloned();
                match hovered {
                    Some(nid) => {
                        let selectable = ctx
                            .unit(&nid)
                            .map(|u| u.team == ctx.current_team() && u.actionable())
                            .unwrap_or(false);
                        if selectable && ctx.is_player_phase() {
                            ctx.memory.selected_unit = Some(nid);
                            ctx.memory.move_origin = Some(ctx.cursor);
                            ctx.transitions.change(names::MOVE);
                        } else {
                            ctx.transitions.change(names::INFO_MENU);
                        }
                    }
                    None => ctx.transitions.change(names::OPTION_MENU),
                }
            }
            Button::Aux => self.cycle_actionable(ctx),
            Button::Info => {
                let hovered = ctx.board.get_unit(ctx.cursor).cloned();
                ctx.memory.info_unit = match (&ctx.memory.info_unit, hovered) {
                    (Some(current), Some(next)) if *current == next => None,
                    (_, next) => next,
                };
            }
            Button::Start => ctx.transitions.change(names::OPTION_MENU),
            _ => {}
        }
        Flow::Continue
    }

    fn update(&mut self, ctx: &mut GameContext) -> Flow {
        if ctx.is_player_phase() && ctx.current_level.is_some() {
            let team = ctx.current_team();
            let any_actionable = ctx
                .units
                .values()
                .any(|u| u.team == team && u.actionable());
            if !any_actionable {
                ctx.transitions.clear();
                ctx.transitions.change(names::TURN_CHANGE);
            }
        } else if !ctx.is_player_phase() && ctx.current_level.is_some() {
            ctx.transitions.clear();
            ctx.transitions.change(names::AI);
        }
        Flow::Continue
    }

    fn draw(&self, ctx: &GameContext, surface: &mut Surface) {
        surface.push(DrawOp::Cursor(ctx.cursor));
        if let Some(info) = &ctx.memory.info_unit {
            surface.push(DrawOp::UnitInfo(info.clone()));
        }
    }
}

impl FreeState {
    /// AUX: jump the cursor to the next actionable unit in nid order.
    fn cycle_actionable(&self, ctx: &mut GameContext) {
        let team = ctx.current_team();
        let hovered: Option<Nid> = ctx.board.get_unit(ctx.cursor).cloned();
        let mut actionable: Vec<&crate::unit::Unit> = ctx
            .units
            .values()
            .filter(|u| u.team == team && u.actionable())
            .collect();
        actionable.sort_by(|a, b| a.nid.cmp(&b.nid));
        if actionable.is_empty() {
            return;
        }
        let start = hovered
            .and_then(|h| actionable.iter().position(|u| u.nid == h))
            .map(|i| i + 1)
            .unwrap_or(0);
        let chosen = &actionable[start % actionable.len()];
        if let Some(pos) = chosen.position {
            ctx.cursor = pos;
        }
    }
}
