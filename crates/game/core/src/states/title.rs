//! Title screen.

use crate::context::GameContext;
use crate::input::{Button, InputEvent};
use crate::machine::{Flow, State};
use crate::states::names;
use crate::surface::{DrawOp, Surface};

#[derive(Default)]
pub struct TitleState;

impl State for TitleState {
    fn name(&self) -> &'static str {
        names::TITLE
    }

    fn show_map(&self) -> bool {
        false
    }

    fn take_input(&mut self, ctx: &mut GameContext, event: InputEvent) -> Flow {
        match event {
            Some(Button::Start) | Some(Button::Select) => {
                let Some(first) = ctx.db.level_order.first().cloned() else {
                    tracing::error!("no levels defined; staying on title");
                    return Flow::Continue;
                };
                if let Err(err) = ctx.load_level(&first) {
                    tracing::error!(%err, "could not load first level");
                    return Flow::Continue;
                }
                ctx.action_log.start_recording();
                ctx.transitions.clear();
                ctx.transitions.change(names::FREE);
                Flow::Continue
            }
            _ => Flow::Continue,
        }
    }

    fn draw(&self, ctx: &GameContext, surface: &mut Surface) {
        surface.push(DrawOp::Text(ctx.db.constants.title.clone()));
        surface.push(DrawOp::Text("Press START".to_owned()));
    }
}
