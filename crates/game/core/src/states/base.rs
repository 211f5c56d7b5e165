//! The between-chapter base: conversations and the continue option.

use crate::context::GameContext;
use crate::events::triggers;
use crate::input::{Button, InputEvent};
use crate::machine::{Flow, State};
use crate::states::names;
use crate::surface::{DrawOp, Surface};

#[derive(Default)]
pub struct BaseState {
    options: Vec<String>,
    cursor: usize,
}

impl State for BaseState {
    fn name(&self) -> &'static str {
        names::BASE
    }

    fn show_map(&self) -> bool {
        false
    }

    fn begin(&mut self, ctx: &mut GameContext) -> Flow {
        self.options = ctx
            .base_convos
            .iter()
            .filter(|(_, seen)| !**seen)
            .map(|(name, _)| name.clone())
            .collect();
        self.options.push("Continue".to_owned());
        self.cursor = self.cursor.min(self.options.len() - 1);
        Flow::Continue
    }

    fn take_input(&mut self, ctx: &mut GameContext, event: InputEvent) -> Flow {
        let Some(button) = event else {
            return Flow::Continue;
        };
        match button {
            Button::Up => {
                self.cursor = (self.cursor + self.options.len() - 1) % self.options.len();
            }
            Button::Down => self.cursor = (self.cursor + 1) % self.options.len(),
            Button::Select => {
                let choice = self.options[self.cursor].clone();
                if choice == "Continue" {
                    ctx.transitions.back();
                } else {
                    ctx.base_convos.insert(choice, true);
                    if ctx.trigger_event(triggers::BASE_CONVO) > 0 {
                        ctx.transitions.change(names::EVENT);
                    }
                }
            }
            Button::Back => ctx.transitions.back(),
            _ => {}
        }
        Flow::Continue
    }

    fn draw(&self, _ctx: &GameContext, surface: &mut Surface) {
        surface.push(DrawOp::Menu {
            options: self.options.clone(),
            cursor: self.cursor,
        });
    }
}
