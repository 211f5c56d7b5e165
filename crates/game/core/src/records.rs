//! Play records, supports, overworld progress, and roam bookkeeping.
//!
//! Small persistent side-structures of the game context that the
//! snapshot carries as their own top-level fields.

use std::collections::BTreeMap;

use crate::common::{Nid, RoamPos};
use crate::data::Database;

/// Per-level and per-unit play statistics.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Records {
    /// Kills per unit nid across the whole playthrough.
    pub kills: BTreeMap<Nid, i32>,
    /// Damage dealt per unit nid.
    pub damage: BTreeMap<Nid, i32>,
    /// Turns taken per completed level.
    pub turns_per_level: BTreeMap<Nid, i32>,
}

impl Records {
    pub fn note_kill(&mut self, unit: &Nid) {
        *self.kills.entry(unit.clone()).or_default() += 1;
    }

    pub fn note_damage(&mut self, unit: &Nid, amount: i32) {
        *self.damage.entry(unit.clone()).or_default() += amount.max(0);
    }

    pub fn note_level_complete(&mut self, level: &Nid, turns: i32) {
        self.turns_per_level.insert(level.clone(), turns);
    }
}

/// Accrued support points per unit pair. Keys are the two nids joined in
/// sorted order so lookups are symmetric.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SupportState {
    points: BTreeMap<String, i32>,
}

impl SupportState {
    fn key(a: &Nid, b: &Nid) -> String {
        if a.as_str() <= b.as_str() {
            format!("{a}&{b}")
        } else {
            format!("{b}&{a}")
        }
    }

    pub fn points(&self, a: &Nid, b: &Nid) -> i32 {
        self.points.get(&Self::key(a, b)).copied().unwrap_or(0)
    }

    pub fn add_points(&mut self, a: &Nid, b: &Nid, amount: i32) {
        *self.points.entry(Self::key(a, b)).or_default() += amount;
    }

    /// Current rank letter for a pair, if a support is defined for it.
    pub fn rank<'a>(&self, db: &'a Database, a: &Nid, b: &Nid) -> Option<&'a Nid> {
        let prefab = db.supports.iter().find(|s| s.pairs(a, b))?;
        prefab.rank_for(self.points(a, b))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &i32)> {
        self.points.iter()
    }

    pub fn restore(&mut self, points: BTreeMap<String, i32>) {
        self.points = points;
    }

    pub fn raw(&self) -> &BTreeMap<String, i32> {
        &self.points
    }
}

/// Overworld progress: which nodes are open and where the party sits.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Overworld {
    pub unlocked: Vec<Nid>,
    pub position: Option<Nid>,
}

impl Overworld {
    pub fn unlock(&mut self, node: Nid) {
        if !self.unlocked.contains(&node) {
            self.unlocked.push(node);
        }
    }

    pub fn is_unlocked(&self, node: &Nid) -> bool {
        self.unlocked.contains(node)
    }
}

/// Live roam sub-mode bookkeeping.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RoamInfo {
    pub unit: Nid,
    pub pos: RoamPos,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::SupportPrefab;

    #[test]
    fn support_points_are_symmetric() {
        let mut supports = SupportState::default();
        let a = Nid::new("eirika");
        let b = Nid::new("seth");
        supports.add_points(&a, &b, 3);
        supports.add_points(&b, &a, 2);
        assert_eq!(supports.points(&a, &b), 5);
        assert_eq!(supports.points(&b, &a), 5);
    }

    #[test]
    fn support_rank_resolves_through_db() {
        let mut db = Database::default();
        db.supports.push(SupportPrefab {
            nid: Nid::new("pair"),
            unit1: Nid::new("a"),
            unit2: Nid::new("b"),
            ranks: vec![(Nid::new("C"), 4)],
        });
        let mut supports = SupportState::default();
        let a = Nid::new("a");
        let b = Nid::new("b");
        assert_eq!(supports.rank(&db, &a, &b), None);
        supports.add_points(&a, &b, 4);
        assert_eq!(supports.rank(&db, &a, &b).unwrap(), "C");
    }
}
