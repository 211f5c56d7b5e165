//! Abstract input events consumed by the core.
//!
//! The host input layer owns key repeat and device handling; the core
//! sees at most one of these per frame.

use strum::{Display, EnumIter};

/// The 9-button abstract event set.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumIter)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Button {
    Up,
    Down,
    Left,
    Right,
    Select,
    Back,
    Info,
    Aux,
    Start,
}

/// One frame's input: a button press or nothing.
pub type InputEvent = Option<Button>;

impl Button {
    /// Direction delta for the four movement buttons.
    pub fn direction(self) -> Option<(i32, i32)> {
        match self {
            Button::Up => Some((0, -1)),
            Button::Down => Some((0, 1)),
            Button::Left => Some((-1, 0)),
            Button::Right => Some((1, 0)),
            _ => None,
        }
    }
}
