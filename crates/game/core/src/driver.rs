//! The outer frame loop.
//!
//! One tick per frame: feed at most one input event into the state
//! machine, rerun the frame while states request `repeat` (bounded), and
//! hand the composed surface back to the host.

use crate::EngineConfig;
use crate::context::GameContext;
use crate::input::InputEvent;
use crate::machine::StateMachine;
use crate::states;
use crate::surface::Surface;

/// Owns the state machine and drives it one frame at a time.
pub struct Driver {
    pub machine: StateMachine,
}

impl Driver {
    /// A driver with every concrete game state registered.
    pub fn new() -> Self {
        let mut machine = StateMachine::new();
        states::register_all(&mut machine);
        Self { machine }
    }

    /// Queues the title state; the first tick will settle onto it.
    pub fn boot(&self, ctx: &mut GameContext) {
        ctx.transitions.change(states::names::TITLE);
    }

    /// Runs one frame. Repeats within the frame while the machine asks
    /// for it, up to the configured cap, feeding no further input.
    pub fn tick(&mut self, ctx: &mut GameContext, input: InputEvent, surface: &mut Surface) {
        ctx.sounds.clear();
        ctx.anims.clear();
        ctx.playtime_ms += u64::from(EngineConfig::FRAME_MS);

        let mut event = input;
        for _ in 0..=EngineConfig::FRAME_REPEAT_CAP {
            surface.clear();
            let repeat = self.machine.update(ctx, event, surface);
            if !repeat {
                break;
            }
            event = None;
        }
    }
}

impl Default for Driver {
    fn default() -> Self {
        Self::new()
    }
}
