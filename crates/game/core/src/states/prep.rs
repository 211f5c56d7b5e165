//! Battle preparations: deploy party units onto formation tiles.

use crate::common::{Coord, Nid};
use crate::context::GameContext;
use crate::data::RegionKind;
use crate::input::{Button, InputEvent};
use crate::machine::{Flow, State};
use crate::states::names;
use crate::surface::{DrawOp, Surface};

#[derive(Default)]
pub struct PrepState {
    roster: Vec<Nid>,
    cursor: usize,
}

impl State for PrepState {
    fn name(&self) -> &'static str {
        names::PREP
    }

    fn begin(&mut self, ctx: &mut GameContext) -> Flow {
        let team = ctx.player_team();
        self.roster = ctx
            .units
            .values()
            .filter(|u| u.team == team && !u.is_dead())
            .map(|u| u.nid.clone())
            .collect();
        self.roster.sort();
        self.cursor = self.cursor.min(self.roster.len().saturating_sub(1));
        Flow::Continue
    }

    fn take_input(&mut self, ctx: &mut GameContext, event: InputEvent) -> Flow {
        let Some(button) = event else {
            return Flow::Continue;
        };
        match button {
            Button::Up => {
                self.cursor =
                    (self.cursor + self.roster.len().max(1) - 1) % self.roster.len().max(1);
            }
            Button::Down => self.cursor = (self.cursor + 1) % self.roster.len().max(1),
            Button::Select => {
                if let Some(unit) = self.roster.get(self.cursor).cloned() {
                    self.toggle_deploy(ctx, &unit);
                }
            }
            Button::Start => {
                ctx.transitions.clear();
                ctx.transitions.change(names::FREE);
            }
            _ => {}
        }
        Flow::Continue
    }

    fn draw(&self, ctx: &GameContext, surface: &mut Surface) {
        let options = self
            .roster
            .iter()
            .map(|nid| {
                let deployed = ctx
                    .unit(nid)
                    .map(|u| u.position.is_some())
                    .unwrap_or(false);
                let name = ctx.unit(nid).map(|u| u.name.clone()).unwrap_or_default();
                format!("{}{name}", if deployed { "* " } else { "  " })
            })
            .collect();
        surface.push(DrawOp::Menu {
            options,
            cursor: self.cursor,
        });
    }
}

impl PrepState {
    fn formation_tiles(&self, ctx: &GameContext) -> Vec<Coord> {
        let mut tiles = Vec::new();
        for region in ctx
            .board
            .regions
            .iter()
            .filter(|r| r.kind == RegionKind::Formation)
        {
            for dy in 0..region.size.1 {
                for dx in 0..region.size.0 {
                    tiles.push(Coord::new(region.position.x + dx, region.position.y + dy));
                }
            }
        }
        tiles
    }

    fn toggle_deploy(&self, ctx: &mut GameContext, unit: &Nid) {
        let placed = ctx.unit(unit).and_then(|u| u.position);
        if placed.is_some() {
            ctx.remove_from_board(unit);
            return;
        }
        let tile = self
            .formation_tiles(ctx)
            .into_iter()
            .find(|&t| !ctx.board.is_occupied(t));
        if let Some(tile) = tile {
            if let Err(err) = ctx.place_unit(unit, tile) {
                tracing::warn!(%err, "could not deploy unit");
            }
        }
    }
}
