//! Combat number crunching: accuracy, avoid, attack power, attack speed.
//!
//! All formulas are pure; the resolver feeds them live units and weapons
//! and rolls against the results.

use crate::board::Board;
use crate::common::{Coord, Nid};
use crate::data::Database;
use crate::item::Item;
use crate::unit::Unit;

/// Triangle relation of the attacking weapon type versus the defending one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TriangleEdge {
    Advantage,
    Neutral,
    Disadvantage,
}

impl TriangleEdge {
    pub fn hit_bonus(self) -> i32 {
        match self {
            TriangleEdge::Advantage => 15,
            TriangleEdge::Neutral => 0,
            TriangleEdge::Disadvantage => -15,
        }
    }

    pub fn damage_bonus(self) -> i32 {
        match self {
            TriangleEdge::Advantage => 1,
            TriangleEdge::Neutral => 0,
            TriangleEdge::Disadvantage => -1,
        }
    }
}

/// Weapon-triangle lookup between two (optional) weapons.
pub fn triangle(db: &Database, weapon: &Item, other: Option<&Item>) -> TriangleEdge {
    let Some(other) = other else {
        return TriangleEdge::Neutral;
    };
    let (Some(mine), Some(theirs)) = (weapon.weapon_type(), other.weapon_type()) else {
        return TriangleEdge::Neutral;
    };
    let Some(def) = db.weapon_type(&mine) else {
        return TriangleEdge::Neutral;
    };
    if def.advantage.contains(&theirs) {
        TriangleEdge::Advantage
    } else if def.disadvantage.contains(&theirs) {
        TriangleEdge::Disadvantage
    } else {
        TriangleEdge::Neutral
    }
}

/// Attack speed: speed less the weight over constitution.
pub fn attack_speed(unit: &Unit, weapon: Option<&Item>) -> i32 {
    let burden = weapon
        .map(|w| (w.components.weight() - unit.stats.con).max(0))
        .unwrap_or(0);
    unit.stats.spd - burden
}

/// Displayed accuracy before the defender's avoid is subtracted.
pub fn accuracy(unit: &Unit, weapon: &Item, edge: TriangleEdge) -> i32 {
    weapon.components.hit() + unit.stats.skl * 2 + unit.stats.lck / 2 + edge.hit_bonus()
}

/// Displayed avoid: attack speed doubled plus luck plus terrain.
pub fn avoid(db: &Database, board: &Board, unit: &Unit, weapon: Option<&Item>) -> i32 {
    attack_speed(unit, weapon) * 2 + unit.stats.lck + terrain_avoid(db, board, unit.position)
}

/// Attack power: might plus the offensive stat plus the triangle bonus.
/// Magic weapons use magic; everything else uses strength.
pub fn attack_power(unit: &Unit, weapon: &Item, edge: TriangleEdge) -> i32 {
    let stat = if weapon.components.is_magic() {
        unit.stats.mag
    } else {
        unit.stats.str
    };
    weapon.components.damage() + stat + edge.damage_bonus()
}

/// Defense power against the given weapon: resistance for magic,
/// defense otherwise, plus the terrain bonus.
pub fn defense_power(db: &Database, board: &Board, unit: &Unit, against: &Item) -> i32 {
    let stat = if against.components.is_magic() {
        unit.stats.res
    } else {
        unit.stats.def
    };
    stat + terrain_defense(db, board, unit.position)
}

/// Critical rate before the defender's dodge is subtracted.
pub fn crit_rate(unit: &Unit, weapon: &Item) -> i32 {
    weapon.components.crit() + unit.stats.skl / 2
}

/// Critical avoidance.
pub fn dodge(unit: &Unit) -> i32 {
    unit.stats.lck
}

/// Final hit chance for one strike, clamped to a percentage.
pub fn hit_chance(
    db: &Database,
    board: &Board,
    striker: &Unit,
    weapon: &Item,
    target: &Unit,
    target_weapon: Option<&Item>,
    edge: TriangleEdge,
) -> i32 {
    (accuracy(striker, weapon, edge) - avoid(db, board, target, target_weapon)).clamp(0, 100)
}

/// Final crit chance for one strike, clamped to a percentage.
pub fn crit_chance(striker: &Unit, weapon: &Item, target: &Unit) -> i32 {
    (crit_rate(striker, weapon) - dodge(target)).clamp(0, 100)
}

/// Damage of one strike before the critical multiplier.
pub fn strike_damage(
    db: &Database,
    board: &Board,
    striker: &Unit,
    weapon: &Item,
    target: &Unit,
    edge: TriangleEdge,
) -> i32 {
    (attack_power(striker, weapon, edge) - defense_power(db, board, target, weapon)).max(0)
}

fn terrain_avoid(db: &Database, board: &Board, position: Option<Coord>) -> i32 {
    terrain_def(db, board, position).map(|t| t.avoid).unwrap_or(0)
}

fn terrain_defense(db: &Database, board: &Board, position: Option<Coord>) -> i32 {
    terrain_def(db, board, position).map(|t| t.defense).unwrap_or(0)
}

fn terrain_def<'a>(
    db: &'a Database,
    board: &Board,
    position: Option<Coord>,
) -> Option<&'a crate::data::TerrainDef> {
    let nid: &Nid = board.terrain(position?)?;
    db.terrain(nid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Components, ItemPrefab, Stats, TerrainDef, TilemapDef, WeaponTypeDef, component_keys};
    use crate::item::ItemUid;
    use crate::common::Value;

    fn db_with_triangle() -> Database {
        let mut db = Database::default();
        db.weapon_types.insert(
            Nid::new("sword"),
            WeaponTypeDef {
                nid: Nid::new("sword"),
                advantage: vec![Nid::new("axe")],
                disadvantage: vec![Nid::new("lance")],
                ..WeaponTypeDef::default()
            },
        );
        db.terrain.insert(
            Nid::new("plains"),
            TerrainDef {
                nid: Nid::new("plains"),
                ..TerrainDef::default()
            },
        );
        db
    }

    fn weapon(wtype: &str, damage: i32, hit: i32, weight: i32) -> Item {
        let prefab = ItemPrefab {
            nid: Nid::new("w"),
            name: "W".into(),
            icon: Nid::default(),
            components: Components::new()
                .with(component_keys::WEAPON, Value::from(wtype))
                .with(component_keys::DAMAGE, Value::Int(damage as i64))
                .with(component_keys::HIT, Value::Int(hit as i64))
                .with(component_keys::WEIGHT, Value::Int(weight as i64)),
        };
        Item::from_prefab(ItemUid(1), &prefab)
    }

    fn fighter(stats: Stats) -> Unit {
        Unit {
            nid: Nid::new("u"),
            name: "U".into(),
            team: Nid::new("player"),
            class: Nid::new("fighter"),
            level: 1,
            exp: 0,
            stats,
            current_hp: stats.hp,
            growths: Stats::default(),
            items: Default::default(),
            skills: Vec::new(),
            wexp: Default::default(),
            position: None,
            flags: Default::default(),
            rescuing: None,
            rescued_by: None,
            statuses: Vec::new(),
            party: Nid::default(),
            portrait: Nid::default(),
            affinity: Nid::default(),
            ai: None,
            persistent: false,
        }
    }

    #[test]
    fn attack_speed_counts_excess_weight() {
        let unit = fighter(Stats {
            spd: 10,
            con: 5,
            ..Stats::default()
        });
        assert_eq!(attack_speed(&unit, None), 10);
        assert_eq!(attack_speed(&unit, Some(&weapon("sword", 5, 90, 8))), 7);
        assert_eq!(attack_speed(&unit, Some(&weapon("sword", 5, 90, 3))), 10);
    }

    #[test]
    fn triangle_lookup() {
        let db = db_with_triangle();
        let sword = weapon("sword", 5, 90, 0);
        let axe = weapon("axe", 8, 70, 0);
        let lance = weapon("lance", 7, 80, 0);
        assert_eq!(triangle(&db, &sword, Some(&axe)), TriangleEdge::Advantage);
        assert_eq!(triangle(&db, &sword, Some(&lance)), TriangleEdge::Disadvantage);
        assert_eq!(triangle(&db, &sword, None), TriangleEdge::Neutral);
    }

    #[test]
    fn magic_targets_resistance() {
        let db = db_with_triangle();
        let board = Board::from_tilemap(&db, &TilemapDef::filled("m", 2, 2, "plains"));
        let mut tome = weapon("anima", 6, 90, 0);
        tome.components.insert(component_keys::MAGIC, Value::Bool(true));

        let target = {
            let mut u = fighter(Stats {
                def: 10,
                res: 2,
                ..Stats::default()
            });
            u.position = Some(Coord::new(0, 0));
            u
        };
        assert_eq!(defense_power(&db, &board, &target, &tome), 2);
        let sword = weapon("sword", 6, 90, 0);
        assert_eq!(defense_power(&db, &board, &target, &sword), 10);
    }

    #[test]
    fn hit_chance_clamps() {
        let db = db_with_triangle();
        let board = Board::from_tilemap(&db, &TilemapDef::filled("m", 2, 2, "plains"));
        let sharp = fighter(Stats {
            skl: 30,
            ..Stats::default()
        });
        let slow = fighter(Stats::default());
        let w = weapon("sword", 5, 100, 0);
        assert_eq!(
            hit_chance(&db, &board, &sharp, &w, &slow, None, TriangleEdge::Neutral),
            100
        );
        let dodgy = fighter(Stats {
            spd: 90,
            lck: 40,
            ..Stats::default()
        });
        assert_eq!(
            hit_chance(&db, &board, &slow, &w, &dodgy, None, TriangleEdge::Neutral),
            0
        );
    }
}
