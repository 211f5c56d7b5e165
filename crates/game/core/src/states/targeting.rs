//! Target cycling for the attack action.

use crate::common::Nid;
use crate::context::GameContext;
use crate::input::{Button, InputEvent};
use crate::item::ItemUid;
use crate::machine::{Flow, State};
use crate::states::names;
use crate::surface::{DrawOp, Surface};

#[derive(Default)]
pub struct TargetingState {
    /// (target, weapon) pairs in deterministic order.
    choices: Vec<(Nid, ItemUid)>,
    cursor: usize,
}

impl State for TargetingState {
    fn name(&self) -> &'static str {
        names::TARGETING
    }

    fn transparent(&self) -> bool {
        true
    }

    fn begin(&mut self, ctx: &mut GameContext) -> Flow {
        self.compute(ctx);
        if self.choices.is_empty() {
            ctx.transitions.back();
            return Flow::Repeat;
        }
        self.cursor = self.cursor.min(self.choices.len() - 1);
        self.focus(ctx);
        Flow::Continue
    }

    fn take_input(&mut self, ctx: &mut GameContext, event: InputEvent) -> Flow {
        let Some(button) = event else {
            return Flow::Continue;
        };
        match button {
            Button::Up | Button::Left => {
                self.cursor = (self.cursor + self.choices.len() - 1) % self.choices.len().max(1);
                self.focus(ctx);
            }
            Button::Down | Button::Right | Button::Aux => {
                self.cursor = (self.cursor + 1) % self.choices.len().max(1);
                self.focus(ctx);
            }
            Button::Select => {
                if let Some((target, weapon)) = self.choices.get(self.cursor).cloned() {
                    ctx.memory.target = Some(target);
                    ctx.memory.weapon = Some(weapon);
                    ctx.transitions.change(names::COMBAT);
                }
            }
            Button::Back => {
                ctx.memory.target = None;
                ctx.memory.weapon = None;
                ctx.transitions.back();
            }
            _ => {}
        }
        Flow::Continue
    }

    fn draw(&self, ctx: &GameContext, surface: &mut Surface) {
        if let Some((target, _)) = self.choices.get(self.cursor) {
            if let Some(pos) = ctx.unit(target).and_then(|u| u.position) {
                surface.push(DrawOp::AttackRange(vec![pos]));
                surface.push(DrawOp::Cursor(pos));
            }
        }
    }
}

impl TargetingState {
    /// Enemies within range of each carried weapon, weapons in inventory
    /// order and targets in nid order.
    fn compute(&mut self, ctx: &GameContext) {
        self.choices.clear();
        let Some(unit) = ctx
            .memory
            .selected_unit
            .as_ref()
            .and_then(|nid| ctx.unit(nid))
        else {
            return;
        };
        let Some(pos) = unit.position else { return };

        for weapon_uid in ctx.weapons_of(unit) {
            let Some(weapon) = ctx.item(weapon_uid) else {
                continue;
            };
            let mut targets: Vec<&crate::unit::Unit> = ctx
                .units
                .values()
                .filter(|u| !u.is_dead())
                .filter(|u| ctx.db.are_hostile(&unit.team, &u.team))
                .filter(|u| {
                    u.position
                        .map(|p| weapon.in_range(pos.distance(p)))
                        .unwrap_or(false)
                })
                .collect();
            targets.sort_by(|a, b| a.nid.cmp(&b.nid));
            for target in targets {
                self.choices.push((target.nid.clone(), weapon_uid));
            }
        }
    }

    fn focus(&self, ctx: &mut GameContext) {
        if let Some((target, _)) = self.choices.get(self.cursor) {
            if let Some(pos) = ctx.unit(target).and_then(|u| u.position) {
                ctx.cursor = pos;
            }
        }
    }
}
