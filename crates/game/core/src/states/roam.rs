//! The free-roam sub-mode: sub-tile movement with a grid-return step
//! back to turn-based play.

use crate::EngineConfig;
use crate::common::RoamPos;
use crate::context::GameContext;
use crate::data::RegionKind;
use crate::input::{Button, InputEvent};
use crate::machine::{Flow, State};
use crate::states::names;
use crate::surface::{DrawOp, Surface};

#[derive(Default)]
pub struct RoamState;

impl State for RoamState {
    fn name(&self) -> &'static str {
        names::ROAM
    }

    fn take_input(&mut self, ctx: &mut GameContext, event: InputEvent) -> Flow {
        let Some(button) = event else {
            return Flow::Continue;
        };
        if let Some((dx, dy)) = button.direction() {
            self.slide(ctx, dx as f32, dy as f32);
            return Flow::Continue;
        }
        match button {
            Button::Select => {
                let Some(info) = ctx.roam_info.clone() else {
                    return Flow::Continue;
                };
                let tile = info.pos.to_tile();
                let sub_nid = ctx
                    .board
                    .regions_at(tile)
                    .find(|r| r.kind == RegionKind::Event)
                    .and_then(|r| r.sub_nid.clone());
                if let Some(sub) = sub_nid {
                    if ctx.trigger_event(&sub) > 0 {
                        ctx.transitions.change(names::EVENT);
                    }
                }
            }
            Button::Start | Button::Back => self.exit_roam(ctx),
            _ => {}
        }
        Flow::Continue
    }

    fn draw(&self, ctx: &GameContext, surface: &mut Surface) {
        if let Some(info) = &ctx.roam_info {
            surface.push(DrawOp::Cursor(info.pos.to_tile()));
        }
    }
}

impl RoamState {
    /// Sub-tile slide, blocked by impassable terrain and other units.
    fn slide(&self, ctx: &mut GameContext, dx: f32, dy: f32) {
        let Some(info) = ctx.roam_info.clone() else {
            return;
        };
        let next = RoamPos {
            x: info.pos.x + dx * EngineConfig::ROAM_SPEED,
            y: info.pos.y + dy * EngineConfig::ROAM_SPEED,
        };
        let target = next.to_tile();
        let group = ctx
            .unit(&info.unit)
            .and_then(|u| ctx.db.class(&u.class))
            .map(|c| c.movement_group.clone())
            .unwrap_or_default();
        let blocked = !ctx.board.in_bounds(target)
            || ctx.board.movement_cost(&ctx.db, &group, target) >= EngineConfig::IMPASSABLE
            || ctx
                .board
                .get_unit(target)
                .map(|occupant| *occupant != info.unit)
                .unwrap_or(false);
        if !blocked {
            if let Some(info) = ctx.roam_info.as_mut() {
                info.pos = next;
            }
        }
    }

    /// The grid-return step: snap the roaming unit to the nearest free
    /// tile and resume turn-based play.
    fn exit_roam(&self, ctx: &mut GameContext) {
        let Some(info) = ctx.roam_info.take() else {
            ctx.transitions.back();
            return;
        };
        let snapped = info.pos.to_tile();
        let tile = if ctx.board.in_bounds(snapped) && !ctx.board.is_occupied(snapped) {
            Some(snapped)
        } else {
            snapped
                .neighbors()
                .into_iter()
                .find(|&n| ctx.board.in_bounds(n) && !ctx.board.is_occupied(n))
        };
        match tile {
            Some(tile) => {
                ctx.board.remove_unit(&info.unit);
                if let Err(err) = ctx.place_unit(&info.unit, tile) {
                    tracing::error!(%err, "grid return failed");
                }
                ctx.cursor = tile;
            }
            None => tracing::error!("no free tile for grid return"),
        }
        ctx.transitions.back();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Coord;

    #[test]
    fn grid_return_snaps_to_nearest_tile() {
        let pos = RoamPos { x: 1.4, y: 2.7 };
        assert_eq!(pos.to_tile(), Coord::new(1, 3));
    }
}
