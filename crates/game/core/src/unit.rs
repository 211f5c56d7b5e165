//! Live unit state.

use arrayvec::ArrayVec;
use bitflags::bitflags;
use std::collections::BTreeMap;

use crate::EngineConfig;
use crate::common::{Coord, Nid};
use crate::data::{ClassDef, Database, Stats, UnitPrefab};
use crate::item::{ItemUid, Skill};

bitflags! {
    /// Per-turn and lifecycle flags. Serde impls come from the bitflags
    /// crate's own serde feature.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct UnitFlags: u16 {
        const FINISHED     = 1 << 0;
        const HAS_MOVED    = 1 << 1;
        const HAS_ATTACKED = 1 << 2;
        const HAS_TRADED   = 1 << 3;
        const DEAD         = 1 << 4;
        const HAS_CANTO    = 1 << 5;
    }
}

/// An active status effect instance on a unit.
///
/// `dot` is damage applied at the start of the owning team's phase
/// (negative values heal); `duration` counts remaining phases, with
/// negative meaning indefinite.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UnitStatus {
    pub nid: Nid,
    pub dot: i32,
    pub duration: i32,
}

type InventorySlots = ArrayVec<ItemUid, { EngineConfig::MAX_ITEMS }>;

/// A live unit. `position` is the authoritative location; the board's
/// unit grid is a reverse index kept in sync by the board operations.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Unit {
    pub nid: Nid,
    pub name: String,
    pub team: Nid,
    pub class: Nid,
    pub level: i32,
    pub exp: i32,
    /// Current stat maxima (hp is max HP).
    pub stats: Stats,
    pub current_hp: i32,
    pub growths: Stats,
    pub items: InventorySlots,
    pub skills: Vec<Skill>,
    /// Weapon experience per weapon type.
    pub wexp: BTreeMap<Nid, i32>,
    pub position: Option<Coord>,
    pub flags: UnitFlags,
    /// Unit being carried; the carried unit has no board position.
    pub rescuing: Option<Nid>,
    /// Unit carrying this one.
    pub rescued_by: Option<Nid>,
    pub statuses: Vec<UnitStatus>,
    pub party: Nid,
    pub portrait: Nid,
    pub affinity: Nid,
    /// AI behavior tag; `None` for player-controlled units.
    pub ai: Option<Nid>,
    /// Persistent units migrate across levels instead of being torn down.
    pub persistent: bool,
}

impl Unit {
    /// Instantiates a prefab on a team. Stats are class bases plus prefab
    /// offsets; growths likewise. Items and skills are attached by the
    /// caller because uid allocation belongs to the context.
    pub fn from_prefab(prefab: &UnitPrefab, class: &ClassDef, team: Nid) -> Self {
        let stats = class.bases.plus(&prefab.bases);
        let growths = class.growths.plus(&prefab.growths);
        Self {
            nid: prefab.nid.clone(),
            name: prefab.name.clone(),
            team,
            class: prefab.class.clone(),
            level: prefab.level.max(1),
            exp: 0,
            stats,
            current_hp: stats.hp,
            growths,
            items: InventorySlots::new(),
            skills: Vec::new(),
            wexp: BTreeMap::new(),
            position: None,
            flags: UnitFlags::empty(),
            rescuing: None,
            rescued_by: None,
            statuses: Vec::new(),
            party: Nid::default(),
            portrait: prefab.portrait.clone(),
            affinity: prefab.affinity.clone(),
            ai: None,
            persistent: prefab.persistent,
        }
    }

    pub fn is_dead(&self) -> bool {
        self.flags.contains(UnitFlags::DEAD)
    }

    pub fn is_finished(&self) -> bool {
        self.flags.contains(UnitFlags::FINISHED)
    }

    /// Whether the unit can still be ordered this phase.
    pub fn actionable(&self) -> bool {
        !self.is_dead() && !self.is_finished() && self.position.is_some()
    }

    /// Clears the per-turn flags at the start of the owning team's phase.
    /// Lifecycle flags (DEAD) are preserved.
    pub fn reset_turn_flags(&mut self) {
        self.flags.remove(
            UnitFlags::FINISHED
                | UnitFlags::HAS_MOVED
                | UnitFlags::HAS_ATTACKED
                | UnitFlags::HAS_TRADED
                | UnitFlags::HAS_CANTO,
        );
    }

    pub fn mark_finished(&mut self) {
        self.flags.insert(UnitFlags::FINISHED);
    }

    /// Applies damage, clamping at zero. Returns `true` when the unit died.
    pub fn take_damage(&mut self, damage: i32) -> bool {
        self.current_hp = (self.current_hp - damage.max(0)).max(0);
        if self.current_hp == 0 && !self.is_dead() {
            self.flags.insert(UnitFlags::DEAD);
            return true;
        }
        false
    }

    /// Heals without exceeding max HP. Returns the amount actually healed.
    pub fn heal(&mut self, amount: i32) -> i32 {
        let before = self.current_hp;
        self.current_hp = (self.current_hp + amount.max(0)).min(self.stats.hp);
        self.current_hp - before
    }

    /// Movement budget in tiles.
    pub fn movement(&self) -> i32 {
        self.stats.mov
    }

    /// Vision radius in fog of war: class override, else the default,
    /// plus any skill sight bonuses.
    pub fn sight_range(&self, db: &Database) -> i32 {
        let base = db
            .class(&self.class)
            .and_then(|c| c.sight_range)
            .unwrap_or(EngineConfig::DEFAULT_SIGHT_RANGE);
        let bonus: i32 = self.skills.iter().map(Skill::sight_bonus).sum();
        base + bonus
    }

    /// Weapon rank letter for a weapon type, if any points are earned.
    pub fn weapon_rank<'a>(&self, db: &'a Database, weapon_type: &Nid) -> Option<&'a Nid> {
        let points = *self.wexp.get(weapon_type)?;
        db.weapon_ranks
            .iter()
            .filter(|r| points >= r.requirement)
            .map(|r| &r.nid)
            .next_back()
    }

    pub fn has_status(&self, nid: &str) -> bool {
        self.statuses.iter().any(|s| s.nid == *nid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_unit() -> Unit {
        let class = ClassDef {
            nid: Nid::new("fighter"),
            bases: Stats {
                hp: 20,
                str: 5,
                spd: 6,
                ..Stats::default()
            },
            growths: Stats {
                hp: 80,
                str: 50,
                ..Stats::default()
            },
            ..ClassDef::default()
        };
        let prefab = UnitPrefab {
            nid: Nid::new("boyd"),
            name: "Boyd".into(),
            class: Nid::new("fighter"),
            level: 1,
            bases: Stats {
                str: 2,
                ..Stats::default()
            },
            ..UnitPrefab::default()
        };
        Unit::from_prefab(&prefab, &class, Nid::new("player"))
    }

    #[test]
    fn prefab_offsets_stack_on_class_bases() {
        let unit = sample_unit();
        assert_eq!(unit.stats.hp, 20);
        assert_eq!(unit.stats.str, 7);
        assert_eq!(unit.current_hp, 20);
    }

    #[test]
    fn damage_clamps_and_kills() {
        let mut unit = sample_unit();
        assert!(!unit.take_damage(19));
        assert_eq!(unit.current_hp, 1);
        assert!(unit.take_damage(5));
        assert_eq!(unit.current_hp, 0);
        assert!(unit.is_dead());
        // Dying twice reports once
        assert!(!unit.take_damage(5));
    }

    #[test]
    fn heal_clamps_at_max() {
        let mut unit = sample_unit();
        unit.take_damage(6);
        assert_eq!(unit.heal(10), 6);
        assert_eq!(unit.current_hp, unit.stats.hp);
    }

    #[test]
    fn reset_preserves_dead() {
        let mut unit = sample_unit();
        unit.flags.insert(UnitFlags::FINISHED | UnitFlags::HAS_MOVED);
        unit.take_damage(99);
        unit.reset_turn_flags();
        assert!(unit.is_dead());
        assert!(!unit.is_finished());
    }
}
