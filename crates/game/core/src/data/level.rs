//! Level prefabs: tilemap reference, objective, starting units, regions.

use std::collections::BTreeMap;

use crate::common::{Coord, Nid};

/// How the win condition is evaluated.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum WinKind {
    /// All enemy-team units dead.
    #[default]
    Rout,
    /// A player unit waits on a seize region.
    Seize,
    /// Only the `_win_game` flag ends the level (fully scripted).
    Scripted,
}

/// Objective display strings plus the evaluated win kind.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Objective {
    pub kind: WinKind,
    pub simple: String,
    pub win: String,
    pub loss: String,
}

/// Rectangular zone with a behavior tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RegionKind {
    Village,
    Seize,
    Shop,
    Event,
    Formation,
    Fog,
}

impl RegionKind {
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "village" => Self::Village,
            "seize" => Self::Seize,
            "shop" => Self::Shop,
            "event" => Self::Event,
            "formation" => Self::Formation,
            "fog" => Self::Fog,
            _ => return None,
        })
    }
}

/// A placed region on the board.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Region {
    pub nid: Nid,
    pub kind: RegionKind,
    pub position: Coord,
    pub size: (i32, i32),
    /// Event sub-trigger or shop stock reference.
    pub sub_nid: Option<String>,
    /// Condition gating region interaction, in the event condition grammar.
    pub condition: Option<String>,
}

impl Region {
    pub fn contains(&self, tile: Coord) -> bool {
        tile.x >= self.position.x
            && tile.y >= self.position.y
            && tile.x < self.position.x + self.size.0
            && tile.y < self.position.y + self.size.1
    }
}

/// Starting placement for one unit in a level.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LevelUnitSpec {
    pub unit: Nid,
    pub team: Nid,
    /// Absent for units deployed from the party on formation tiles.
    pub position: Option<Coord>,
    /// AI behavior tag for non-player units.
    pub ai: Option<Nid>,
    pub group: Option<Nid>,
}

/// Named group of units moved or spawned together by events.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UnitGroup {
    pub nid: Nid,
    pub units: Vec<Nid>,
    pub positions: BTreeMap<Nid, Coord>,
}

/// One chapter of the campaign.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LevelPrefab {
    pub nid: Nid,
    pub name: String,
    pub tilemap: Nid,
    pub party: Nid,
    /// Music nid per team phase.
    pub music: BTreeMap<Nid, Nid>,
    pub objective: Objective,
    pub units: Vec<LevelUnitSpec>,
    pub regions: Vec<Region>,
    pub unit_groups: Vec<UnitGroup>,
    /// Whether fog of war starts active.
    pub fog: bool,
    /// Whether the roam sub-mode is active instead of turn-based play.
    pub roam: bool,
    /// Roam protagonist, when `roam` is set.
    pub roam_unit: Option<Nid>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn region_containment_is_half_open() {
        let region = Region {
            nid: Nid::new("r1"),
            kind: RegionKind::Formation,
            position: Coord::new(2, 3),
            size: (2, 2),
            sub_nid: None,
            condition: None,
        };
        assert!(region.contains(Coord::new(2, 3)));
        assert!(region.contains(Coord::new(3, 4)));
        assert!(!region.contains(Coord::new(4, 3)));
        assert!(!region.contains(Coord::new(1, 3)));
    }
}
