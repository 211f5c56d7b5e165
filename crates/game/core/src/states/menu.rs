//! The contextual action menu shown after movement.
//!
//! Exactly one of the offered actions finishes the unit's turn or
//! transitions to a sub-state; BACK undoes the movement and returns to
//! the move state.

use crate::action_log::LogEntry;
use crate::common::{Coord, Nid, Value};
use crate::context::GameContext;
use crate::data::RegionKind;
use crate::events::triggers;
use crate::input::{Button, InputEvent};
use crate::item::ItemUid;
use crate::machine::{Flow, State};
use crate::states::{finish_unit_turn, names};
use crate::surface::{DrawOp, Surface};
use crate::unit::UnitFlags;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum MenuOption {
    Attack,
    Item,
    Trade,
    Rescue,
    Drop,
    Visit,
    Seize,
    Talk,
    Wait,
}

impl MenuOption {
    fn label(self) -> &'static str {
        match self {
            MenuOption::Attack => "Attack",
            MenuOption::Item => "Item",
            MenuOption::Trade => "Trade",
            MenuOption::Rescue => "Rescue",
            MenuOption::Drop => "Drop",
            MenuOption::Visit => "Visit",
            MenuOption::Seize => "Seize",
            MenuOption::Talk => "Talk",
            MenuOption::Wait => "Wait",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Mode {
    Main,
    Item { cursor: usize },
    Trade { ally: Nid, own_side: bool, cursor: usize },
}

pub struct MenuState {
    options: Vec<MenuOption>,
    cursor: usize,
    mode: Mode,
}

impl Default for MenuState {
    fn default() -> Self {
        Self {
            options: Vec::new(),
            cursor: 0,
            mode: Mode::Main,
        }
    }
}

impl State for MenuState {
    fn name(&self) -> &'static str {
        names::MENU
    }

    fn transparent(&self) -> bool {
        true
    }

    fn begin(&mut self, ctx: &mut GameContext) -> Flow {
        self.mode = Mode::Main;
        self.rebuild_options(ctx);
        self.cursor = self.cursor.min(self.options.len().saturating_sub(1));
        Flow::Continue
    }

    fn take_input(&mut self, ctx: &mut GameContext, event: InputEvent) -> Flow {
        let Some(button) = event else {
            return Flow::Continue;
        };
        match self.mode.clone() {
            Mode::Main => self.main_input(ctx, button),
            Mode::Item { cursor } => self.item_input(ctx, button, cursor),
            Mode::Trade {
                ally,
                own_side,
                cursor,
            } => self.trade_input(ctx, button, ally, own_side, cursor),
        }
        Flow::Continue
    }

    fn draw(&self, ctx: &GameContext, surface: &mut Surface) {
        match &self.mode {
            Mode::Main => surface.push(DrawOp::Menu {
                options: self.options.iter().map(|o| o.label().to_owned()).collect(),
                cursor: self.cursor,
            }),
            Mode::Item { cursor } => {
                let names = self
                    .usable_items(ctx)
                    .iter()
                    .filter_map(|uid| ctx.item(*uid))
                    .map(|i| i.name.clone())
                    .collect();
                surface.push(DrawOp::Menu {
                    options: names,
                    cursor: *cursor,
                });
            }
            Mode::Trade { ally, cursor, .. } => {
                let mut options: Vec<String> = Vec::new();
                if let Some(unit) = self.unit(ctx) {
                    options.extend(
                        unit.items
                            .iter()
                            .filter_map(|uid| ctx.item(*uid))
                            .map(|i| i.name.clone()),
                    );
                }
                if let Some(other) = ctx.unit(ally) {
                    options.extend(
                        other
                            .items
                            .iter()
                            .filter_map(|uid| ctx.item(*uid))
                            .map(|i| format!("({})", i.name)),
                    );
                }
                surface.push(DrawOp::Menu {
                    options,
                    cursor: *cursor,
                });
            }
        }
    }
}

impl MenuState {
    fn unit<'a>(&self, ctx: &'a GameContext) -> Option<&'a crate::unit::Unit> {
        ctx.memory
            .selected_unit
            .as_ref()
            .and_then(|nid| ctx.unit(nid))
    }

    fn rebuild_options(&mut self, ctx: &GameContext) {
        let mut options = Vec::new();
        if let Some(unit) = self.unit(ctx) {
            if !unit.flags.contains(UnitFlags::HAS_ATTACKED)
                && !self.targets_in_range(ctx).is_empty()
            {
                options.push(MenuOption::Attack);
            }
            if !self.usable_items(ctx).is_empty() {
                options.push(MenuOption::Item);
            }
            if !self.adjacent_allies(ctx).is_empty() {
                options.push(MenuOption::Trade);
            }
            if unit.rescuing.is_none() && !self.rescuable_allies(ctx).is_empty() {
                options.push(MenuOption::Rescue);
            }
            if unit.rescuing.is_some() && !self.free_adjacent_tiles(ctx).is_empty() {
                options.push(MenuOption::Drop);
            }
            if self.region_here(ctx, RegionKind::Village).is_some()
                || self.region_here(ctx, RegionKind::Event).is_some()
            {
                options.push(MenuOption::Visit);
            }
            if self.region_here(ctx, RegionKind::Seize).is_some() {
                options.push(MenuOption::Seize);
            }
            if !self.talk_partners(ctx).is_empty() {
                options.push(MenuOption::Talk);
            }
        }
        options.push(MenuOption::Wait);
        self.options = options;
    }

    fn main_input(&mut self, ctx: &mut GameContext, button: Button) {
        match button {
            Button::Up => {
                self.cursor = (self.cursor + self.options.len() - 1) % self.options.len().max(1);
            }
            Button::Down => {
                self.cursor = (self.cursor + 1) % self.options.len().max(1);
            }
            Button::Select => {
                let Some(option) = self.options.get(self.cursor).copied() else {
                    return;
                };
                self.dispatch(ctx, option);
            }
            Button::Back => self.cancel_movement(ctx),
            _ => {}
        }
    }

    fn dispatch(&mut self, ctx: &mut GameContext, option: MenuOption) {
        let Some(unit_nid) = ctx.memory.selected_unit.clone() else {
            return;
        };
        match option {
            MenuOption::Attack => ctx.transitions.change(names::TARGETING),
            MenuOption::Item => self.mode = Mode::Item { cursor: 0 },
            MenuOption::Trade => {
                if let Some(ally) = self.adjacent_allies(ctx).first().cloned() {
                    self.mode = Mode::Trade {
                        ally,
                        own_side: true,
                        cursor: 0,
                    };
                }
            }
            MenuOption::Rescue => {
                if let Some(passenger) = self.rescuable_allies(ctx).first().cloned() {
                    let pos = ctx.unit(&passenger).and_then(|u| u.position);
                    if let Some(pos) = pos {
                        ctx.remove_from_board(&passenger);
                        if let Some(c) = ctx.unit_mut(&unit_nid) {
                            c.rescuing = Some(passenger.clone());
                        }
                        if let Some(p) = ctx.unit_mut(&passenger) {
                            p.rescued_by = Some(unit_nid.clone());
                        }
                        ctx.action_log.record(LogEntry::Rescue {
                            carrier: unit_nid.clone(),
                            passenger,
                            passenger_pos: pos,
                        });
                        finish_unit_turn(ctx, &unit_nid, 2);
                    }
                }
            }
            MenuOption::Drop => {
                let passenger = ctx.unit(&unit_nid).and_then(|u| u.rescuing.clone());
                let tile = self.free_adjacent_tiles(ctx).first().copied();
                if let (Some(passenger), Some(tile)) = (passenger, tile) {
                    if let Some(c) = ctx.unit_mut(&unit_nid) {
                        c.rescuing = None;
                    }
                    if let Some(p) = ctx.unit_mut(&passenger) {
                        p.rescued_by = None;
                    }
                    if ctx.place_unit(&passenger, tile).is_ok() {
                        ctx.action_log.record(LogEntry::Drop {
                            carrier: unit_nid.clone(),
                            passenger,
                            tile,
                        });
                    }
                    finish_unit_turn(ctx, &unit_nid, 2);
                }
            }
            MenuOption::Visit => {
                let sub_nid = self
                    .region_here(ctx, RegionKind::Village)
                    .or_else(|| self.region_here(ctx, RegionKind::Event))
                    .map(|r| r.sub_nid.clone());
                if let Some(sub_nid) = sub_nid {
                    let fired = match sub_nid {
                        Some(sub) => ctx.trigger_event(&sub),
                        None => ctx.trigger_event(triggers::REGION_VISIT),
                    };
                    finish_unit_turn(ctx, &unit_nid, 2);
                    if fired > 0 {
                        ctx.transitions.change(names::EVENT);
                    }
                }
            }
            MenuOption::Seize => {
                ctx.level_vars
                    .insert("_seized".to_owned(), Value::Bool(true));
                finish_unit_turn(ctx, &unit_nid, 2);
            }
            MenuOption::Talk => {
                if let Some(partner) = self.talk_partners(ctx).first().cloned() {
                    ctx.talk_options
                        .retain(|(a, b)| !(*a == unit_nid && *b == partner) && !(*a == partner && *b == unit_nid));
                    let fired = ctx.trigger_event(triggers::UNIT_TALK);
                    if fired > 0 {
                        ctx.transitions.change(names::EVENT);
                    }
                    self.rebuild_options(ctx);
                }
            }
            MenuOption::Wait => finish_unit_turn(ctx, &unit_nid, 2),
        }
    }

    fn item_input(&mut self, ctx: &mut GameContext, button: Button, cursor: usize) {
        let items = self.usable_items(ctx);
        match button {
            Button::Up => {
                self.mode = Mode::Item {
                    cursor: (cursor + items.len().max(1) - 1) % items.len().max(1),
                };
            }
            Button::Down => {
                self.mode = Mode::Item {
                    cursor: (cursor + 1) % items.len().max(1),
                };
            }
            Button::Select => {
                if let Some(&uid) = items.get(cursor) {
                    self.use_item(ctx, uid);
                }
            }
            Button::Back => self.mode = Mode::Main,
            _ => {}
        }
    }

    fn use_item(&mut self, ctx: &mut GameContext, uid: ItemUid) {
        let Some(unit_nid) = ctx.memory.selected_unit.clone() else {
            return;
        };
        let heal = ctx.item(uid).and_then(|i| i.components.heal()).unwrap_or(0);
        let slot = ctx
            .unit(&unit_nid)
            .and_then(|u| u.items.iter().position(|&i| i == uid))
            .unwrap_or(0);
        let hp_before = ctx.unit(&unit_nid).map(|u| u.current_hp).unwrap_or(0);
        let uses_before = ctx.item(uid).and_then(|i| i.uses);

        if let Some(unit) = ctx.unit_mut(&unit_nid) {
            unit.heal(heal);
        }
        let mut broke = false;
        if let Some(item) = ctx.item_mut(uid) {
            broke = item.expend();
        }
        let hp_after = ctx.unit(&unit_nid).map(|u| u.current_hp).unwrap_or(0);
        let uses_after = ctx.item(uid).and_then(|i| i.uses);
        if broke {
            ctx.unbind_item(uid);
        }

        ctx.action_log.record(LogEntry::UseItem {
            unit: unit_nid.clone(),
            item: uid,
            slot,
            hp_before,
            hp_after,
            uses_before,
            uses_after,
            broke,
        });
        finish_unit_turn(ctx, &unit_nid, 2);
    }

    fn trade_input(
        &mut self,
        ctx: &mut GameContext,
        button: Button,
        ally: Nid,
        own_side: bool,
        cursor: usize,
    ) {
        match button {
            Button::Left | Button::Right => {
                self.mode = Mode::Trade {
                    ally,
                    own_side: !own_side,
                    cursor,
                };
            }
            Button::Up | Button::Down => {
                let len = if own_side {
                    self.unit(ctx).map(|u| u.items.len()).unwrap_or(0)
                } else {
                    ctx.unit(&ally).map(|u| u.items.len()).unwrap_or(0)
                }
                .max(1);
                let next = if button == Button::Up {
                    (cursor + len - 1) % len
                } else {
                    (cursor + 1) % len
                };
                self.mode = Mode::Trade {
                    ally,
                    own_side,
                    cursor: next,
                };
            }
            Button::Select => {
                let Some(unit_nid) = ctx.memory.selected_unit.clone() else {
                    return;
                };
                crate::turnwheel::swap_slots(ctx, &unit_nid, cursor, &ally, cursor);
                ctx.action_log.record(LogEntry::Trade {
                    unit1: unit_nid.clone(),
                    unit2: ally.clone(),
                    slot1: cursor,
                    slot2: cursor,
                });
                if let Some(unit) = ctx.unit_mut(&unit_nid) {
                    unit.flags.insert(UnitFlags::HAS_TRADED);
                }
            }
            Button::Back => self.mode = Mode::Main,
            _ => {}
        }
    }

    fn cancel_movement(&mut self, ctx: &mut GameContext) {
        if let (Some(unit_nid), Some(origin)) = (
            ctx.memory.selected_unit.clone(),
            ctx.memory.move_origin,
        ) {
            if ctx.unit(&unit_nid).and_then(|u| u.position) != Some(origin) {
                if let Err(err) = ctx.move_unit(&unit_nid, origin) {
                    tracing::error!(%err, "could not restore pre-move position");
                }
            }
            if let Some(unit) = ctx.unit_mut(&unit_nid) {
                unit.flags.remove(UnitFlags::HAS_MOVED);
            }
            ctx.cursor = origin;
        }
        ctx.transitions.back();
    }

    // ------------------------------------------------------------------
    // Context queries
    // ------------------------------------------------------------------

    fn targets_in_range(&self, ctx: &GameContext) -> Vec<Nid> {
        let Some(unit) = self.unit(ctx) else {
            return Vec::new();
        };
        let Some(pos) = unit.position else {
            return Vec::new();
        };
        let ranges: Vec<(i32, i32)> = ctx
            .weapons_of(unit)
            .iter()
            .filter_map(|uid| ctx.item(*uid))
            .map(|w| (w.components.min_range(), w.components.max_range()))
            .collect();
        ctx.units
            .values()
            .filter(|u| !u.is_dead() && u.position.is_some())
            .filter(|u| ctx.db.are_hostile(&unit.team, &u.team))
            .filter(|u| {
                let dist = pos.distance(u.position.unwrap_or(pos));
                ranges.iter().any(|&(min, max)| dist >= min && dist <= max)
            })
            .map(|u| u.nid.clone())
            .collect()
    }

    fn usable_items(&self, ctx: &GameContext) -> Vec<ItemUid> {
        self.unit(ctx)
            .map(|u| {
                u.items
                    .iter()
                    .copied()
                    .filter(|uid| ctx.item(*uid).map(|i| i.is_heal()).unwrap_or(false))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn adjacent_allies(&self, ctx: &GameContext) -> Vec<Nid> {
        let Some(unit) = self.unit(ctx) else {
            return Vec::new();
        };
        let Some(pos) = unit.position else {
            return Vec::new();
        };
        pos.neighbors()
            .iter()
            .filter_map(|&n| ctx.board.get_unit(n))
            .filter(|nid| {
                ctx.unit(nid)
                    .map(|o| o.team == unit.team && !o.is_dead())
                    .unwrap_or(false)
            })
            .cloned()
            .collect()
    }

    fn rescuable_allies(&self, ctx: &GameContext) -> Vec<Nid> {
        self.adjacent_allies(ctx)
            .into_iter()
            .filter(|nid| {
                ctx.unit(nid)
                    .map(|u| u.rescuing.is_none() && u.rescued_by.is_none())
                    .unwrap_or(false)
            })
            .collect()
    }

    fn free_adjacent_tiles(&self, ctx: &GameContext) -> Vec<Coord> {
        let Some(unit) = self.unit(ctx) else {
            return Vec::new();
        };
        let Some(pos) = unit.position else {
            return Vec::new();
        };
        let group = ctx
            .db
            .class(&unit.class)
            .map(|c| c.movement_group.clone())
            .unwrap_or_default();
        pos.neighbors()
            .iter()
            .copied()
            .filter(|&n| ctx.board.in_bounds(n) && !ctx.board.is_occupied(n))
            .filter(|&n| ctx.board.movement_cost(&ctx.db, &group, n) < crate::EngineConfig::IMPASSABLE)
            .collect()
    }

    fn region_here<'a>(
        &self,
        ctx: &'a GameContext,
        kind: RegionKind,
    ) -> Option<&'a crate::data::Region> {
        let pos = self.unit(ctx)?.position?;
        ctx.board.regions_at(pos).find(|r| {
            r.kind == kind
                && r.condition
                    .as_deref()
                    .map(|c| crate::events::condition::evaluate(c, &ctx.var_view()))
                    .unwrap_or(true)
        })
    }

    fn talk_partners(&self, ctx: &GameContext) -> Vec<Nid> {
        let Some(unit) = self.unit(ctx) else {
            return Vec::new();
        };
        let Some(pos) = unit.position else {
            return Vec::new();
        };
        ctx.talk_options
            .iter()
            .filter_map(|(a, b)| {
                if *a == unit.nid {
                    Some(b.clone())
                } else if *b == unit.nid {
                    Some(a.clone())
                } else {
                    None
                }
            })
            .filter(|partner| {
                ctx.unit(partner)
                    .and_then(|p| p.position)
                    .map(|p| p.is_adjacent(pos))
                    .unwrap_or(false)
            })
            .collect()
    }
}
