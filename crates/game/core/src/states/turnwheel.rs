//! The turnwheel overlay: scrub the action log backward and forward.

use crate::context::GameContext;
use crate::input::{Button, InputEvent};
use crate::machine::{Flow, State};
use crate::states::names;
use crate::surface::{DrawOp, Surface};
use crate::turnwheel;

#[derive(Default)]
pub struct TurnwheelState {
    description: Option<String>,
}

impl State for TurnwheelState {
    fn name(&self) -> &'static str {
        names::TURNWHEEL
    }

    fn transparent(&self) -> bool {
        true
    }

    fn start(&mut self, ctx: &mut GameContext) -> Flow {
        // The wheel's own navigation must not be recorded, and live
        // events cannot survive a rewind.
        ctx.action_log.stop_recording();
        ctx.events.clear();
        Flow::Continue
    }

    fn take_input(&mut self, ctx: &mut GameContext, event: InputEvent) -> Flow {
        let Some(button) = event else {
            return Flow::Continue;
        };
        match button {
            Button::Left | Button::Up => {
                if let Some((desc, focus)) = turnwheel::backward(ctx) {
                    self.description = Some(desc);
                    if let Some(tile) = focus {
                        ctx.cursor = tile;
                    }
                }
            }
            Button::Right | Button::Down => {
                if let Some((desc, focus)) = turnwheel::forward(ctx) {
                    self.description = Some(desc);
                    if let Some(tile) = focus {
                        ctx.cursor = tile;
                    }
                }
            }
            Button::Select => {
                if ctx.action_log.can_use() {
                    ctx.action_log.finalize();
                    ctx.action_log.start_recording();
                    ctx.transitions.back();
                }
            }
            Button::Back => {
                turnwheel::reset(ctx);
                ctx.action_log.start_recording();
                ctx.transitions.back();
            }
            _ => {}
        }
        Flow::Continue
    }

    fn draw(&self, ctx: &GameContext, surface: &mut Surface) {
        surface.push(DrawOp::Cursor(ctx.cursor));
        if let Some(desc) = &self.description {
            surface.push(DrawOp::Text(desc.clone()));
        }
        if ctx.action_log.can_use() {
            surface.push(DrawOp::Text("SELECT: return to this moment".to_owned()));
        }
    }
}
