//! Definition records for the read-only game-data registries.
//!
//! These are the prefab types loaded once at startup. Live entities
//! (units, items, skills) are instantiated from them and mutate freely;
//! the definitions themselves never change after load.

use std::collections::BTreeMap;

use crate::common::Nid;
use crate::data::components::Components;
use crate::data::stats::Stats;

/// A unit class: movement group, base stats, growths, caps.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ClassDef {
    pub nid: Nid,
    pub name: String,
    /// Mobility class indexing the movement cost table.
    pub movement_group: Nid,
    pub bases: Stats,
    pub growths: Stats,
    pub max_stats: Stats,
    /// Weapon types this class can wield.
    pub weapon_types: Vec<Nid>,
    /// Innate class skills granted on instantiation.
    pub skills: Vec<Nid>,
    /// Vision radius override for fog of war.
    pub sight_range: Option<i32>,
}

/// An item prefab. Behavior comes entirely from the component map.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ItemPrefab {
    pub nid: Nid,
    pub name: String,
    pub icon: Nid,
    pub components: Components,
}

/// A skill prefab. `components` describe behavior; per-unit mutable
/// state lives on the skill instance.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SkillPrefab {
    pub nid: Nid,
    pub name: String,
    pub icon: Nid,
    pub components: Components,
}

/// A unit prefab: class reference plus offsets and starting kit.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UnitPrefab {
    pub nid: Nid,
    pub name: String,
    pub class: Nid,
    pub level: i32,
    /// Offsets added to the class bases.
    pub bases: Stats,
    /// Growth offsets added to the class growths.
    pub growths: Stats,
    pub items: Vec<Nid>,
    pub skills: Vec<Nid>,
    pub portrait: Nid,
    pub affinity: Nid,
    /// Persistent units migrate across levels instead of being torn down.
    pub persistent: bool,
}

/// A terrain type with combat bonuses and opacity.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TerrainDef {
    pub nid: Nid,
    pub name: String,
    pub defense: i32,
    pub avoid: i32,
    pub opaque: bool,
}

/// Static tile layout referenced by levels.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TilemapDef {
    pub nid: Nid,
    pub width: i32,
    pub height: i32,
    /// Terrain nid per tile, row-major.
    pub terrain: Vec<Nid>,
}

impl TilemapDef {
    /// Uniform map helper used by tests and scenario tooling.
    pub fn filled(nid: impl Into<Nid>, width: i32, height: i32, terrain: impl Into<Nid>) -> Self {
        let terrain = terrain.into();
        Self {
            nid: nid.into(),
            width,
            height,
            terrain: vec![terrain; (width * height) as usize],
        }
    }
}

/// Movement cost lookup: `cost[movement_group][terrain]`.
///
/// Values at or above [`crate::EngineConfig::IMPASSABLE`] mean the terrain
/// cannot be entered by that group. Unknown pairs are impassable.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MovementCostTable {
    costs: BTreeMap<Nid, BTreeMap<Nid, i32>>,
}

impl MovementCostTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, group: impl Into<Nid>, terrain: impl Into<Nid>, cost: i32) {
        self.costs
            .entry(group.into())
            .or_default()
            .insert(terrain.into(), cost);
    }

    pub fn cost(&self, group: &Nid, terrain: &Nid) -> i32 {
        self.costs
            .get(group)
            .and_then(|row| row.get(terrain))
            .copied()
            .unwrap_or(crate::EngineConfig::IMPASSABLE)
    }
}

/// A weapon type with its triangle relations and rank thresholds.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WeaponTypeDef {
    pub nid: Nid,
    pub name: String,
    /// Types this one has triangle advantage against.
    pub advantage: Vec<Nid>,
    /// Types this one is at a triangle disadvantage against.
    pub disadvantage: Vec<Nid>,
}

/// Weapon rank letter and the wexp required to reach it, ascending.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WeaponRankDef {
    pub nid: Nid,
    pub requirement: i32,
}

/// A team. Registry order defines the phase rotation order.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TeamDef {
    pub nid: Nid,
    pub name: String,
    /// Player-controlled teams take input; others run the AI state.
    pub player_control: bool,
    /// Teams whose units are not valid combat targets for this one.
    pub allies: Vec<Nid>,
}

impl TeamDef {
    pub fn is_allied_with(&self, other: &Nid) -> bool {
        self.nid == *other || self.allies.contains(other)
    }
}

/// Cosmetic faction grouping shown in info screens.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FactionDef {
    pub nid: Nid,
    pub name: String,
    pub icon: Nid,
    pub desc: String,
}

/// Support pair definition with rank thresholds, ascending by points.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SupportPrefab {
    pub nid: Nid,
    pub unit1: Nid,
    pub unit2: Nid,
    pub ranks: Vec<(Nid, i32)>,
}

impl SupportPrefab {
    pub fn pairs(&self, a: &Nid, b: &Nid) -> bool {
        (self.unit1 == *a && self.unit2 == *b) || (self.unit1 == *b && self.unit2 == *a)
    }

    /// Highest rank reached for the given points.
    pub fn rank_for(&self, points: i32) -> Option<&Nid> {
        self.ranks
            .iter()
            .filter(|(_, req)| points >= *req)
            .map(|(nid, _)| nid)
            .next_back()
    }
}

/// Difficulty mode knobs selected at new game.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DifficultyMode {
    pub nid: Nid,
    pub name: String,
    /// Flat stat bonus applied to non-player units at spawn.
    pub enemy_bonus: Stats,
    /// Added to every growth roll for player units.
    pub growth_bonus: i32,
    pub permadeath: bool,
}

/// Project-wide constants from the data files.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Constants {
    pub title: String,
    /// Save keys are prefixed with this nid.
    pub game_nid: Nid,
    /// Turnwheel uses per chapter; negative means unlimited.
    pub turnwheel_uses: i32,
    /// Whether the turnwheel is available at all.
    pub turnwheel_enabled: bool,
}

impl Default for Constants {
    fn default() -> Self {
        Self {
            title: String::new(),
            game_nid: Nid::new("emblem"),
            turnwheel_uses: -1,
            turnwheel_enabled: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mcost_unknown_pairs_are_impassable() {
        let mut table = MovementCostTable::new();
        table.set("infantry", "plains", 1);
        table.set("infantry", "forest", 2);

        let infantry = Nid::new("infantry");
        assert_eq!(table.cost(&infantry, &Nid::new("plains")), 1);
        assert_eq!(table.cost(&infantry, &Nid::new("forest")), 2);
        assert!(table.cost(&infantry, &Nid::new("lava")) >= crate::EngineConfig::IMPASSABLE);
        assert!(table.cost(&Nid::new("cavalry"), &Nid::new("plains")) >= 99);
    }

    #[test]
    fn support_rank_thresholds() {
        let prefab = SupportPrefab {
            nid: Nid::new("a_b"),
            unit1: Nid::new("a"),
            unit2: Nid::new("b"),
            ranks: vec![(Nid::new("C"), 10), (Nid::new("B"), 20), (Nid::new("A"), 40)],
        };
        assert_eq!(prefab.rank_for(5), None);
        assert_eq!(prefab.rank_for(15).unwrap(), "C");
        assert_eq!(prefab.rank_for(40).unwrap(), "A");
        assert!(prefab.pairs(&Nid::new("b"), &Nid::new("a")));
    }
}
