//! Level victory and game over.

use crate::context::GameContext;
use crate::events::{self, triggers};
use crate::input::{Button, InputEvent};
use crate::machine::{Flow, State};
use crate::states::names;
use crate::surface::{DrawOp, Surface};

/// Level cleared: record the result and advance the campaign.
#[derive(Default)]
pub struct VictoryState;

impl State for VictoryState {
    fn name(&self) -> &'static str {
        names::VICTORY
    }

    fn take_input(&mut self, ctx: &mut GameContext, event: InputEvent) -> Flow {
        if !matches!(event, Some(Button::Select) | Some(Button::Start)) {
            return Flow::Continue;
        }

        let Some(current) = ctx.current_level.clone() else {
            ctx.transitions.clear();
            ctx.transitions.change(names::TITLE);
            return Flow::Continue;
        };
        ctx.records.note_level_complete(&current, ctx.turn_count);

        // Level-end events run headless; their synchronous commands
        // (rewards, unlock flags) still apply.
        ctx.trigger_event(triggers::LEVEL_END);
        while events::pump(ctx) {
            ctx.events.resolve_wait();
        }

        ctx.overworld.unlock(current.clone());
        let next = ctx
            .memory
            .next_level
            .take()
            .or_else(|| ctx.db.next_level(&current).cloned());

        ctx.teardown_level();
        ctx.transitions.clear();
        match next {
            Some(next) => {
                if let Err(err) = ctx.load_level(&next) {
                    tracing::error!(%err, "could not load next level");
                    ctx.transitions.change(names::TITLE);
                } else {
                    ctx.overworld.unlock(next);
                    ctx.transitions.change(names::FREE);
                }
            }
            None => ctx.transitions.change(names::CREDIT),
        }
        Flow::Continue
    }

    fn draw(&self, ctx: &GameContext, surface: &mut Surface) {
        surface.push(DrawOp::Banner("Victory!".to_owned()));
        surface.push(DrawOp::Text(ctx.objective.win.clone()));
    }
}

/// Defeat: back to the title.
#[derive(Default)]
pub struct GameOverState;

impl State for GameOverState {
    fn name(&self) -> &'static str {
        names::GAME_OVER
    }

    fn show_map(&self) -> bool {
        false
    }

    fn take_input(&mut self, ctx: &mut GameContext, event: InputEvent) -> Flow {
        if matches!(event, Some(Button::Select) | Some(Button::Start)) {
            ctx.teardown_level();
            ctx.transitions.clear();
            ctx.transitions.change(names::TITLE);
        }
        Flow::Continue
    }

    fn draw(&self, _ctx: &GameContext, surface: &mut Surface) {
        surface.push(DrawOp::Banner("Game Over".to_owned()));
    }
}
