//! Phase rotation and the phase banner.

use crate::EngineConfig;
use crate::context::GameContext;
use crate::machine::{Flow, State};
use crate::states::{check_end_conditions, names};
use crate::surface::{DrawOp, Surface};

/// Advances the phase controller, then rebuilds the stack for the new
/// team: the map state underneath, the banner on top.
#[derive(Default)]
pub struct TurnChangeState;

impl State for TurnChangeState {
    fn name(&self) -> &'static str {
        names::TURN_CHANGE
    }

    fn start(&mut self, ctx: &mut GameContext) -> Flow {
        let change = ctx.advance_phase();

        if check_end_conditions(ctx) {
            return Flow::Repeat;
        }

        let player_controlled = ctx
            .db
            .team(&change.team)
            .map(|t| t.player_control)
            .unwrap_or(false);

        ctx.transitions.clear();
        if player_controlled {
            ctx.transitions.change(names::FREE);
        } else {
            ctx.transitions.change(names::AI);
        }
        ctx.transitions.change(names::PHASE_CHANGE);
        if ctx.events.is_active() {
            ctx.transitions.change(names::EVENT);
        }
        Flow::Repeat
    }
}

/// The phase banner: a fixed-length animation plus the phase music cue.
#[derive(Default)]
pub struct PhaseChangeState {
    ticks: u32,
}

impl State for PhaseChangeState {
    fn name(&self) -> &'static str {
        names::PHASE_CHANGE
    }

    fn transparent(&self) -> bool {
        true
    }

    fn start(&mut self, ctx: &mut GameContext) -> Flow {
        let team = ctx.current_team();
        let music = ctx
            .current_level
            .as_ref()
            .and_then(|nid| ctx.db.level(nid))
            .and_then(|level| level.music.get(&team).cloned());
        if let Some(music) = music {
            ctx.play_sound(music);
        }
        Flow::Continue
    }

    fn update(&mut self, ctx: &mut GameContext) -> Flow {
        self.ticks += 1;
        if self.ticks >= EngineConfig::BANNER_TICKS {
            ctx.transitions.back();
        }
        Flow::Continue
    }

    fn draw(&self, ctx: &GameContext, surface: &mut Surface) {
        let team = ctx.current_team();
        let label = ctx
            .db
            .team(&team)
            .map(|t| t.name.clone())
            .unwrap_or_else(|| team.to_string());
        surface.push(DrawOp::Banner(format!(
            "{label} Phase (Turn {})",
            ctx.turn_count
        )));
    }
}
