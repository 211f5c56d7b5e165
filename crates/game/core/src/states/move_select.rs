//! Movement range display and destination selection.

use crate::common::{Coord, Nid};
use crate::context::GameContext;
use crate::input::{Button, InputEvent};
use crate::machine::{Flow, State};
use crate::path::{self, CostGrid, ReachableSet};
use crate::states::names;
use crate::surface::{DrawOp, Surface};

#[derive(Default)]
pub struct MoveState {
    reach: ReachableSet,
    /// Union of tiles attackable from any reachable stop.
    attack_tiles: Vec<Coord>,
    /// Budget captured on entry: the canto remainder, or full movement.
    /// Kept on the state so a cancelled menu re-enters with the same
    /// range.
    budget: Option<i32>,
}

impl MoveState {
    fn compute(&mut self, ctx: &GameContext) {
        let Some(unit_nid) = ctx.memory.selected_unit.clone() else {
            return;
        };
        let Some(unit) = ctx.unit(&unit_nid) else {
            return;
        };
        let Some(start) = unit.position else { return };

        let group = ctx
            .db
            .class(&unit.class)
            .map(|c| c.movement_group.clone())
            .unwrap_or_default();
        let grid = CostGrid::new(&ctx.board, &ctx.db, group);
        let board = &ctx.board;
        let passable = |pos: Coord| match board.get_unit(pos) {
            Some(other) => !ctx
                .unit(other)
                .map(|o| ctx.db.are_hostile(&unit.team, &o.team))
                .unwrap_or(false),
            None => true,
        };
        let budget = self.budget.unwrap_or(unit.movement());
        self.reach = path::dijkstra(&grid, start, budget, passable);

        // Attack-position union for the red overlay.
        let ranges: Vec<(i32, i32)> = ctx
            .weapons_of(unit)
            .iter()
            .filter_map(|uid| ctx.item(*uid))
            .map(|w| (w.components.min_range(), w.components.max_range()))
            .collect();
        let mut attack: Vec<Coord> = Vec::new();
        for tile in self.reach.tiles() {
            if tile != start && ctx.board.is_occupied(tile) {
                continue;
            }
            for &(min, max) in &ranges {
                for dist in min..=max {
                    for dx in -dist..=dist {
                        let dy = dist - dx.abs();
                        for dy in [dy, -dy] {
                            let target = Coord::new(tile.x + dx, tile.y + dy);
                            if ctx.board.in_bounds(target)
                                && !self.reach.contains(target)
                                && !attack.contains(&target)
                            {
                                attack.push(target);
                            }
                        }
                    }
                }
            }
        }
        attack.sort();
        self.attack_tiles = attack;
    }

    fn stoppable(&self, ctx: &GameContext, tile: Coord) -> bool {
        if !self.reach.contains(tile) {
            return false;
        }
        match ctx.board.get_unit(tile) {
            Some(occupant) => ctx.memory.selected_unit.as_ref() == Some(occupant),
            None => true,
        }
    }
}

impl State for MoveState {
    fn name(&self) -> &'static str {
        names::MOVE
    }

    fn start(&mut self, ctx: &mut GameContext) -> Flow {
        self.budget = ctx.memory.canto_budget.or_else(|| {
            ctx.memory
                .selected_unit
                .as_ref()
                .and_then(|nid| ctx.unit(nid))
                .map(|u| u.movement())
        });
        self.compute(ctx);
        Flow::Continue
    }

    fn begin(&mut self, ctx: &mut GameContext) -> Flow {
        // Re-exposed after a cancelled menu: the unit is back on its
        // pre-move tile, so the ranges must be rebuilt.
        self.compute(ctx);
        Flow::Continue
    }

    fn take_input(&mut self, ctx: &mut GameContext, event: InputEvent) -> Flow {
        let Some(button) = event else {
            return Flow::Continue;
        };
        if let Some((dx, dy)) = button.direction() {
            let next = Coord::new(ctx.cursor.x + dx, ctx.cursor.y + dy);
            if ctx.board.in_bounds(next) {
                ctx.cursor = next;
            }
            return Flow::Continue;
        }
        match button {
            Button::Select => {
                if self.stoppable(ctx, ctx.cursor) {
                    ctx.memory.chosen_path = self.reach.path_to(ctx.cursor);
                    ctx.memory.follow_up_state = Some(names::MENU.to_owned());
                    // The movement state spends out of the entry budget.
                    ctx.memory.canto_budget = self.budget;
                    ctx.transitions.change(names::MOVEMENT);
                } else {
                    ctx.play_sound(Nid::new("error"));
                }
            }
            Button::Back => {
                ctx.memory.selected_unit = None;
                ctx.memory.move_origin = None;
                ctx.memory.canto_budget = None;
                ctx.transitions.back();
            }
            _ => {}
        }
        Flow::Continue
    }

    fn draw(&self, ctx: &GameContext, surface: &mut Surface) {
        surface.push(DrawOp::MoveRange(self.reach.tiles().collect()));
        surface.push(DrawOp::AttackRange(self.attack_tiles.clone()));
        if let Some(path) = self.reach.path_to(ctx.cursor) {
            surface.push(DrawOp::PathArrow(path));
        }
        surface.push(DrawOp::Cursor(ctx.cursor));
    }
}
