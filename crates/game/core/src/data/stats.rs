//! Core stat block shared by classes, prefabs, and live units.

use strum::{Display, EnumIter, EnumString};

/// The closed set of unit statistics. Declaration order is the level-up
/// roll order and must stay stable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumIter, EnumString)]
#[strum(serialize_all = "snake_case")]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StatKind {
    Hp,
    Str,
    Mag,
    Skl,
    Spd,
    Lck,
    Def,
    Res,
    Con,
    Mov,
}

/// A full stat block. Used for bases, growth rates, caps, and live stats.
///
/// Growth-rate blocks store percentages (0-100+); everything else stores
/// flat points.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Stats {
    pub hp: i32,
    pub str: i32,
    pub mag: i32,
    pub skl: i32,
    pub spd: i32,
    pub lck: i32,
    pub def: i32,
    pub res: i32,
    pub con: i32,
    pub mov: i32,
}

impl Stats {
    pub fn get(&self, kind: StatKind) -> i32 {
        match kind {
            StatKind::Hp => self.hp,
            StatKind::Str => self.str,
            StatKind::Mag => self.mag,
            StatKind::Skl => self.skl,
            StatKind::Spd => self.spd,
            StatKind::Lck => self.lck,
            StatKind::Def => self.def,
            StatKind::Res => self.res,
            StatKind::Con => self.con,
            StatKind::Mov => self.mov,
        }
    }

    pub fn set(&mut self, kind: StatKind, value: i32) {
        match kind {
            StatKind::Hp => self.hp = value,
            StatKind::Str => self.str = value,
            StatKind::Mag => self.mag = value,
            StatKind::Skl => self.skl = value,
            StatKind::Spd => self.spd = value,
            StatKind::Lck => self.lck = value,
            StatKind::Def => self.def = value,
            StatKind::Res => self.res = value,
            StatKind::Con => self.con = value,
            StatKind::Mov => self.mov = value,
        }
    }

    pub fn add(&mut self, kind: StatKind, delta: i32) {
        self.set(kind, self.get(kind) + delta);
    }

    /// Component-wise sum, used to apply class bases plus prefab offsets.
    pub fn plus(&self, other: &Stats) -> Stats {
        let mut out = *self;
        for kind in <StatKind as strum::IntoEnumIterator>::iter() {
            out.set(kind, self.get(kind) + other.get(kind));
        }
        out
    }
}
