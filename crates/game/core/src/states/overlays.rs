//! Interactive overlay states: unit info, the options menu, minimap,
//! settings, and the credit roll.

use crate::common::{Nid, Value};
use crate::context::GameContext;
use crate::input::{Button, InputEvent};
use crate::machine::{Flow, State};
use crate::states::names;
use crate::surface::{DrawOp, Surface};

/// Unit stat sheet for the hovered or highlighted unit.
#[derive(Default)]
pub struct InfoMenuState {
    unit: Option<Nid>,
}

impl State for InfoMenuState {
    fn name(&self) -> &'static str {
        names::INFO_MENU
    }

    fn transparent(&self) -> bool {
        true
    }

    fn begin(&mut self, ctx: &mut GameContext) -> Flow {
        self.unit = ctx
            .memory
            .info_unit
            .clone()
            .or_else(|| ctx.board.get_unit(ctx.cursor).cloned());
        Flow::Continue
    }

    fn take_input(&mut self, ctx: &mut GameContext, event: InputEvent) -> Flow {
        match event {
            Some(Button::Back) | Some(Button::Select) => ctx.transitions.back(),
            Some(Button::Up) | Some(Button::Down) => self.cycle(ctx, event == Some(Button::Down)),
            _ => {}
        }
        Flow::Continue
    }

    fn draw(&self, _ctx: &GameContext, surface: &mut Surface) {
        if let Some(unit) = &self.unit {
            surface.push(DrawOp::UnitInfo(unit.clone()));
        }
    }
}

impl InfoMenuState {
    fn cycle(&mut self, ctx: &GameContext, forward: bool) {
        let mut placed: Vec<Nid> = ctx
            .units
            .values()
            .filter(|u| !u.is_dead() && u.position.is_some())
            .map(|u| u.nid.clone())
            .collect();
        placed.sort();
        if placed.is_empty() {
            return;
        }
        let index = self
            .unit
            .as_ref()
            .and_then(|nid| placed.iter().position(|p| p == nid))
            .unwrap_or(0);
        let next = if forward {
            (index + 1) % placed.len()
        } else {
            (index + placed.len() - 1) % placed.len()
        };
        self.unit = Some(placed[next].clone());
    }
}

/// The START options menu on the free map.
pub struct OptionMenuState {
    options: Vec<&'static str>,
    cursor: usize,
}

impl Default for OptionMenuState {
    fn default() -> Self {
        Self {
            options: Vec::new(),
            cursor: 0,
        }
    }
}

impl State for OptionMenuState {
    fn name(&self) -> &'static str {
        names::OPTION_MENU
    }

    fn transparent(&self) -> bool {
        true
    }

    fn begin(&mut self, ctx: &mut GameContext) -> Flow {
        self.options = vec!["Objective", "Minimap", "Settings"];
        if ctx.db.constants.turnwheel_enabled && !ctx.action_log.is_empty() {
            self.options.push("Turnwheel");
        }
        self.options.push("Suspend");
        self.options.push("End Turn");
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
            Button::Select => match self.options[self.cursor] {
                "Minimap" => ctx.transitions.change(names::MINIMAP),
                "Settings" => ctx.transitions.change(names::SETTINGS),
                "Turnwheel" => ctx.transitions.change(names::TURNWHEEL),
                "Suspend" => {
                    // The persistence layer polls this and writes the
                    // suspend slot outside the core.
                    ctx.game_vars
                        .insert("_suspend_request".to_owned(), Value::Bool(true));
                    ctx.transitions.back();
                }
                "End Turn" => {
                    ctx.transitions.clear();
                    ctx.transitions.change(names::TURN_CHANGE);
                }
                _ => {}
            },
            Button::Back | Button::Start => ctx.transitions.back(),
            _ => {}
        }
        Flow::Continue
    }

    fn draw(&self, ctx: &GameContext, surface: &mut Surface) {
        surface.push(DrawOp::Menu {
            options: self.options.iter().map(|s| (*s).to_owned()).collect(),
            cursor: self.cursor,
        });
        if self.options.get(self.cursor) == Some(&"Objective") {
            surface.push(DrawOp::Text(ctx.objective.win.clone()));
        }
    }
}

/// Full-board minimap overlay.
pub struct MinimapState;

impl State for MinimapState {
    fn name(&self) -> &'static str {
        names::MINIMAP
    }

    fn transparent(&self) -> bool {
        true
    }

    fn take_input(&mut self, ctx: &mut GameContext, event: InputEvent) -> Flow {
        if event.is_some() {
            ctx.transitions.back();
        }
        Flow::Continue
    }

    fn draw(&self, _ctx: &GameContext, surface: &mut Surface) {
        surface.push(DrawOp::Minimap);
    }
}

/// Boolean preference toggles stored in the variable store.
pub struct SettingsState {
    options: Vec<&'static str>,
    cursor: usize,
}

impl Default for SettingsState {
    fn default() -> Self {
        Self {
            options: vec!["animations", "music", "autocursor"],
            cursor: 0,
        }
    }
}

impl State for SettingsState {
    fn name(&self) -> &'static str {
        names::SETTINGS
    }

    fn show_map(&self) -> bool {
        false
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
            Button::Left | Button::Right | Button::Select => {
                let key = format!("_setting_{}", self.options[self.cursor]);
                let current = ctx.game_vars.get(&key).map(Value::truthy).unwrap_or(true);
                ctx.game_vars.insert(key, Value::Bool(!current));
            }
            Button::Back => ctx.transitions.back(),
            _ => {}
        }
        Flow::Continue
    }

    fn draw(&self, ctx: &GameContext, surface: &mut Surface) {
        let options = self
            .options
            .iter()
            .map(|name| {
                let key = format!("_setting_{name}");
                let on = ctx.game_vars.get(&key).map(Value::truthy).unwrap_or(true);
                format!("{name}: {}", if on { "on" } else { "off" })
            })
            .collect();
        surface.push(DrawOp::Menu {
            options,
            cursor: self.cursor,
        });
    }
}

/// Credits roll after the campaign ends.
#[derive(Default)]
pub struct CreditState {
    ticks: u32,
}

impl State for CreditState {
    fn name(&self) -> &'static str {
        names::CREDIT
    }

    fn show_map(&self) -> bool {
        false
    }

    fn take_input(&mut self, ctx: &mut GameContext, event: InputEvent) -> Flow {
        if matches!(event, Some(Button::Back) | Some(Button::Select) | Some(Button::Start)) {
            ctx.transitions.clear();
            ctx.transitions.change(names::TITLE);
        }
        Flow::Continue
    }

    fn update(&mut self, _ctx: &mut GameContext) -> Flow {
        self.ticks += 1;
        Flow::Continue
    }

    fn draw(&self, ctx: &GameContext, surface: &mut Surface) {
        surface.push(DrawOp::Text(format!(
            "{} -- thanks for playing",
            ctx.db.constants.title
        )));
    }
}
