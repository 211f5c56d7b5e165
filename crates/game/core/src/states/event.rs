//! The event playback state.
//!
//! Pumps the interpreter each frame, resolves suspensions from input
//! (dialog dismissal) or timers (wait, transition), and routes the
//! `_win_game` / `_lose_game` finalization when the stack drains.

use crate::common::Value;
use crate::context::GameContext;
use crate::events::{self, PendingWait};
use crate::input::{Button, InputEvent};
use crate::machine::{Flow, State};
use crate::states::names;
use crate::surface::{DrawOp, Surface};

#[derive(Default)]
pub struct EventState;

impl State for EventState {
    fn name(&self) -> &'static str {
        names::EVENT
    }

    fn transparent(&self) -> bool {
        true
    }

    fn take_input(&mut self, ctx: &mut GameContext, event: InputEvent) -> Flow {
        if matches!(event, Some(Button::Select) | Some(Button::Start))
            && matches!(ctx.events.pending_wait, Some(PendingWait::Dialog))
        {
            ctx.events.resolve_wait();
        }
        Flow::Continue
    }

    fn update(&mut self, ctx: &mut GameContext) -> Flow {
        match ctx.events.pending_wait {
            Some(PendingWait::Timer(remaining)) => {
                if remaining <= 1 {
                    ctx.events.resolve_wait();
                } else {
                    ctx.events.pending_wait = Some(PendingWait::Timer(remaining - 1));
                    return Flow::Continue;
                }
            }
            Some(PendingWait::Transition(remaining)) => {
                if remaining <= 1 {
                    ctx.events.resolve_wait();
                } else {
                    ctx.events.pending_wait = Some(PendingWait::Transition(remaining - 1));
                    return Flow::Continue;
                }
            }
            Some(PendingWait::Dialog) => return Flow::Continue,
            None => {}
        }

        if events::pump(ctx) {
            return Flow::Continue;
        }

        // Queue drained: event finalization side effects.
        let won = ctx
            .level_vars
            .get("_win_game")
            .map(Value::truthy)
            .unwrap_or(false);
        let lost = ctx
            .level_vars
            .get("_lose_game")
            .map(Value::truthy)
            .unwrap_or(false);
        if won {
            ctx.transitions.clear();
            ctx.transitions.change(names::VICTORY);
        } else if lost {
            ctx.transitions.clear();
            ctx.transitions.change(names::GAME_OVER);
        } else {
            ctx.transitions.back();
        }
        Flow::Continue
    }

    fn draw(&self, ctx: &GameContext, surface: &mut Surface) {
        for (nid, position) in &ctx.events.portraits {
            surface.push(DrawOp::Portrait {
                nid: nid.clone(),
                position: position.clone(),
            });
        }
        if let Some(dialog) = &ctx.events.current_dialog {
            surface.push(DrawOp::Dialog {
                speaker: dialog.speaker.to_string(),
                text: dialog.text.clone(),
            });
        }
        if let Some(PendingWait::Transition(remaining)) = ctx.events.pending_wait {
            let total = crate::EngineConfig::TRANSITION_TICKS.max(1);
            let progress = 100 - (remaining * 100 / total) as i32;
            surface.push(DrawOp::Transition {
                progress_pct: progress,
            });
        }
    }
}
