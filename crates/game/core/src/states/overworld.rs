//! Overworld node navigation between chapters.

use crate::context::GameContext;
use crate::input::{Button, InputEvent};
use crate::machine::{Flow, State};
use crate::states::names;
use crate::surface::{DrawOp, Surface};

#[derive(Default)]
pub struct OverworldState {
    cursor: usize,
}

impl State for OverworldState {
    fn name(&self) -> &'static str {
        names::OVERWORLD
    }

    fn show_map(&self) -> bool {
        false
    }

    fn begin(&mut self, ctx: &mut GameContext) -> Flow {
        let position = ctx.overworld.position.clone();
        if let Some(pos) = position {
            if let Some(index) = ctx.overworld.unlocked.iter().position(|n| *n == pos) {
                self.cursor = index;
            }
        }
        Flow::Continue
    }

    fn take_input(&mut self, ctx: &mut GameContext, event: InputEvent) -> Flow {
        let Some(button) = event else {
            return Flow::Continue;
        };
        let len = ctx.overworld.unlocked.len();
        match button {
            Button::Left | Button::Up => {
                if len > 0 {
                    self.cursor = (self.cursor + len - 1) % len;
                }
            }
            Button::Right | Button::Down => {
                if len > 0 {
                    self.cursor = (self.cursor + 1) % len;
                }
            }
            Button::Select => {
                let Some(node) = ctx.overworld.unlocked.get(self.cursor).cloned() else {
                    return Flow::Continue;
                };
                ctx.overworld.position = Some(node.clone());
                if ctx.db.levels.contains_key(&node) {
                    if let Err(err) = ctx.load_level(&node) {
                        tracing::error!(%err, "could not enter level from overworld");
                        return Flow::Continue;
                    }
                    ctx.transitions.clear();
                    ctx.transitions.change(names::FREE);
                }
            }
            _ => {}
        }
        Flow::Continue
    }

    fn draw(&self, ctx: &GameContext, surface: &mut Surface) {
        let options = ctx
            .overworld
            .unlocked
            .iter()
            .map(|n| n.to_string())
            .collect();
        surface.push(DrawOp::Menu {
            options,
            cursor: self.cursor,
        });
    }
}
