//! Strongly-typed in-memory registries of game definitions.
//!
//! The [`Database`] is read-only after startup: levels, classes, items,
//! skills, terrain, weapon types, teams, and the movement cost table.
//! Live entities reference definitions by [`Nid`] and never hold pointers
//! into the registries.

pub mod components;
pub mod defs;
pub mod level;
pub mod stats;

pub use components::{Components, keys as component_keys};
pub use defs::{
    ClassDef, Constants, DifficultyMode, FactionDef, ItemPrefab, MovementCostTable, SkillPrefab,
    SupportPrefab, TeamDef, TerrainDef, TilemapDef, UnitPrefab, WeaponRankDef, WeaponTypeDef,
};
pub use level::{LevelPrefab, LevelUnitSpec, Objective, Region, RegionKind, UnitGroup, WinKind};
pub use stats::{StatKind, Stats};

use std::collections::BTreeMap;

use crate::common::Nid;
use crate::events::EventPrefab;

/// All game definitions, loaded once at startup.
#[derive(Clone, Debug, Default)]
pub struct Database {
    pub constants: Constants,
    pub difficulties: Vec<DifficultyMode>,
    /// Registry order defines the phase rotation order.
    pub teams: Vec<TeamDef>,
    pub factions: BTreeMap<Nid, FactionDef>,
    pub classes: BTreeMap<Nid, ClassDef>,
    pub items: BTreeMap<Nid, ItemPrefab>,
    pub skills: BTreeMap<Nid, SkillPrefab>,
    pub units: BTreeMap<Nid, UnitPrefab>,
    pub terrain: BTreeMap<Nid, TerrainDef>,
    pub tilemaps: BTreeMap<Nid, TilemapDef>,
    pub weapon_types: BTreeMap<Nid, WeaponTypeDef>,
    /// Ascending by requirement.
    pub weapon_ranks: Vec<WeaponRankDef>,
    pub mcost: MovementCostTable,
    pub levels: BTreeMap<Nid, LevelPrefab>,
    /// Campaign order of level nids.
    pub level_order: Vec<Nid>,
    /// Definition order; the stable tie-break for equal event priorities.
    pub events: Vec<EventPrefab>,
    pub supports: Vec<SupportPrefab>,
}

impl Database {
    pub fn class(&self, nid: &Nid) -> Option<&ClassDef> {
        self.classes.get(nid)
    }

    pub fn item(&self, nid: &Nid) -> Option<&ItemPrefab> {
        self.items.get(nid)
    }

    pub fn skill(&self, nid: &Nid) -> Option<&SkillPrefab> {
        self.skills.get(nid)
    }

    pub fn unit(&self, nid: &Nid) -> Option<&UnitPrefab> {
        self.units.get(nid)
    }

    pub fn terrain(&self, nid: &Nid) -> Option<&TerrainDef> {
        self.terrain.get(nid)
    }

    pub fn tilemap(&self, nid: &Nid) -> Option<&TilemapDef> {
        self.tilemaps.get(nid)
    }

    pub fn level(&self, nid: &Nid) -> Option<&LevelPrefab> {
        self.levels.get(nid)
    }

    pub fn team(&self, nid: &Nid) -> Option<&TeamDef> {
        self.teams.iter().find(|t| t.nid == *nid)
    }

    pub fn weapon_type(&self, nid: &Nid) -> Option<&WeaponTypeDef> {
        self.weapon_types.get(nid)
    }

    pub fn difficulty(&self, nid: &Nid) -> Option<&DifficultyMode> {
        self.difficulties.iter().find(|d| d.nid == *nid)
    }

    /// Teams hostile to `team` (not the team itself nor its allies).
    pub fn enemy_teams(&self, team: &Nid) -> Vec<Nid> {
        let Some(def) = self.team(team) else {
            return Vec::new();
        };
        self.teams
            .iter()
            .filter(|t| !def.is_allied_with(&t.nid))
            .map(|t| t.nid.clone())
            .collect()
    }

    /// Whether two teams may fight each other.
    pub fn are_hostile(&self, a: &Nid, b: &Nid) -> bool {
        match self.team(a) {
            Some(def) => !def.is_allied_with(b),
            None => a != b,
        }
    }

    /// The level after `nid` in campaign order, if any.
    pub fn next_level(&self, nid: &Nid) -> Option<&Nid> {
        let idx = self.level_order.iter().position(|l| l == nid)?;
        self.level_order.get(idx + 1)
    }
}
