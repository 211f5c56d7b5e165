//! A small, self-contained campaign built in code.
//!
//! Used by integration tests and demo harnesses that need a working
//! [`Database`] without data files on disk: two chapters, two classes, a
//! handful of units, one scripted intro event.

use std::collections::BTreeMap;

use emblem_core::{
    ClassDef, Components, Constants, Database, DifficultyMode, EventPrefab, ItemPrefab,
    LevelPrefab, LevelUnitSpec, MovementCostTable, Nid, Objective, Region, RegionKind, SkillPrefab,
    Stats, SupportPrefab, TeamDef, TerrainDef, TilemapDef, UnitPrefab, Value, WeaponRankDef,
    WeaponTypeDef, WinKind, component_keys,
};

/// Builds the sample database.
pub fn database() -> Database {
    let mut db = Database::default();

    db.constants = Constants {
        title: "Sample Campaign".into(),
        game_nid: Nid::new("sample"),
        turnwheel_uses: 3,
        turnwheel_enabled: true,
    };

    db.difficulties = vec![
        DifficultyMode {
            nid: Nid::new("normal"),
            name: "Normal".into(),
            enemy_bonus: Stats::default(),
            growth_bonus: 0,
            permadeath: true,
        },
        DifficultyMode {
            nid: Nid::new("hard"),
            name: "Hard".into(),
            enemy_bonus: Stats {
                hp: 4,
                str: 2,
                def: 1,
                ..Stats::default()
            },
            growth_bonus: 0,
            permadeath: true,
        },
    ];

    db.teams = vec![
        TeamDef {
            nid: Nid::new("player"),
            name: "Player".into(),
            player_control: true,
            allies: vec![Nid::new("other")],
        },
        TeamDef {
            nid: Nid::new("enemy"),
            name: "Enemy".into(),
            player_control: false,
            allies: vec![],
        },
        TeamDef {
            nid: Nid::new("other"),
            name: "Ally".into(),
            player_control: false,
            allies: vec![Nid::new("player")],
        },
    ];

    for (nid, name, defense, avoid, opaque) in [
        ("plains", "Plains", 0, 0, false),
        ("forest", "Forest", 1, 20, false),
        ("mountain", "Mountain", 2, 30, true),
        ("wall", "Wall", 0, 0, true),
    ] {
        db.terrain.insert(
            Nid::new(nid),
            TerrainDef {
                nid: Nid::new(nid),
                name: name.into(),
                defense,
                avoid,
                opaque,
            },
        );
    }

    let mut mcost = MovementCostTable::new();
    for (terrain, infantry, cavalry) in [
        ("plains", 1, 1),
        ("forest", 2, 3),
        ("mountain", 4, 99),
        ("wall", 99, 99),
    ] {
        mcost.set("infantry", terrain, infantry);
        mcost.set("cavalry", terrain, cavalry);
    }
    db.mcost = mcost;

    db.weapon_types.insert(
        Nid::new("sword"),
        WeaponTypeDef {
            nid: Nid::new("sword"),
            name: "Sword".into(),
            advantage: vec![Nid::new("axe")],
            disadvantage: vec![Nid::new("lance")],
        },
    );
    db.weapon_types.insert(
        Nid::new("axe"),
        WeaponTypeDef {
            nid: Nid::new("axe"),
            name: "Axe".into(),
            advantage: vec![Nid::new("lance")],
            disadvantage: vec![Nid::new("sword")],
        },
    );
    db.weapon_ranks = vec![
        WeaponRankDef {
            nid: Nid::new("E"),
            requirement: 1,
        },
        WeaponRankDef {
            nid: Nid::new("D"),
            requirement: 30,
        },
        WeaponRankDef {
            nid: Nid::new("C"),
            requirement: 70,
        },
    ];

    db.classes.insert(
        Nid::new("lord"),
        ClassDef {
            nid: Nid::new("lord"),
            name: "Lord".into(),
            movement_group: Nid::new("infantry"),
            bases: Stats {
                hp: 18,
                str: 4,
                skl: 7,
                spd: 7,
                lck: 5,
                def: 3,
                res: 1,
                con: 6,
                mov: 5,
                ..Stats::default()
            },
            growths: Stats {
                hp: 70,
                str: 45,
                skl: 50,
                spd: 55,
                lck: 45,
                def: 25,
                res: 25,
                ..Stats::default()
            },
            max_stats: Stats {
                hp: 60,
                str: 24,
                mag: 20,
                skl: 26,
                spd: 26,
                lck: 30,
                def: 22,
                res: 22,
                con: 20,
                mov: 15,
            },
            weapon_types: vec![Nid::new("sword")],
            skills: vec![],
            sight_range: Some(4),
        },
    );
    db.classes.insert(
        Nid::new("brigand"),
        ClassDef {
            nid: Nid::new("brigand"),
            name: "Brigand".into(),
            movement_group: Nid::new("infantry"),
            bases: Stats {
                hp: 20,
                str: 5,
                skl: 3,
                spd: 4,
                def: 2,
                con: 10,
                mov: 5,
                ..Stats::default()
            },
            growths: Stats {
                hp: 80,
                str: 50,
                skl: 30,
                spd: 30,
                def: 15,
                ..Stats::default()
            },
            max_stats: Stats {
                hp: 60,
                str: 25,
                skl: 20,
                spd: 20,
                lck: 30,
                def: 20,
                res: 18,
                con: 25,
                mov: 15,
                mag: 15,
            },
            weapon_types: vec![Nid::new("axe")],
            skills: vec![],
            sight_range: None,
        },
    );

    db.items.insert(
        Nid::new("iron_sword"),
        ItemPrefab {
            nid: Nid::new("iron_sword"),
            name: "Iron Sword".into(),
            icon: Nid::new("icon_iron_sword"),
            components: Components::new()
                .with(component_keys::WEAPON, Value::from("sword"))
                .with(component_keys::DAMAGE, Value::Int(5))
                .with(component_keys::HIT, Value::Int(90))
                .with(component_keys::WEIGHT, Value::Int(5))
                .with(component_keys::USES, Value::Int(40)),
        },
    );
    db.items.insert(
        Nid::new("iron_axe"),
        ItemPrefab {
            nid: Nid::new("iron_axe"),
            name: "Iron Axe".into(),
            icon: Nid::new("icon_iron_axe"),
            components: Components::new()
                .with(component_keys::WEAPON, Value::from("axe"))
                .with(component_keys::DAMAGE, Value::Int(8))
                .with(component_keys::HIT, Value::Int(75))
                .with(component_keys::WEIGHT, Value::Int(10))
                .with(component_keys::USES, Value::Int(45))
                .with_flag(component_keys::DROPPABLE),
        },
    );
    db.items.insert(
        Nid::new("vulnerary"),
        ItemPrefab {
            nid: Nid::new("vulnerary"),
            name: "Vulnerary".into(),
            icon: Nid::new("icon_vulnerary"),
            components: Components::new()
                .with(component_keys::HEAL, Value::Int(10))
                .with(component_keys::USES, Value::Int(3)),
        },
    );

    db.skills.insert(
        Nid::new("canto"),
        SkillPrefab {
            nid: Nid::new("canto"),
            name: "Canto".into(),
            icon: Nid::new("icon_canto"),
            components: Components::new().with_flag(component_keys::CANTO),
        },
    );

    db.units.insert(
        Nid::new("alyn"),
        UnitPrefab {
            nid: Nid::new("alyn"),
            name: "Alyn".into(),
            class: Nid::new("lord"),
            level: 1,
            bases: Stats {
                str: 1,
                ..Stats::default()
            },
            growths: Stats::default(),
            items: vec![Nid::new("iron_sword"), Nid::new("vulnerary")],
            skills: vec![],
            portrait: Nid::new("portrait_alyn"),
            affinity: Nid::new("fire"),
            persistent: true,
        },
    );
    db.units.insert(
        Nid::new("marta"),
        UnitPrefab {
            nid: Nid::new("marta"),
            name: "Marta".into(),
            class: Nid::new("lord"),
            level: 2,
            bases: Stats::default(),
            growths: Stats::default(),
            items: vec![Nid::new("iron_sword")],
            skills: vec![Nid::new("canto")],
            portrait: Nid::new("portrait_marta"),
            affinity: Nid::new("wind"),
            persistent: true,
        },
    );
    db.units.insert(
        Nid::new("gruk"),
        UnitPrefab {
            nid: Nid::new("gruk"),
            name: "Gruk".into(),
            class: Nid::new("brigand"),
            level: 1,
            bases: Stats::default(),
            growths: Stats::default(),
            items: vec![Nid::new("iron_axe")],
            skills: vec![],
            portrait: Nid::new("portrait_gruk"),
            affinity: Nid::default(),
            persistent: false,
        },
    );
    db.units.insert(
        Nid::new("dolgh"),
        UnitPrefab {
            nid: Nid::new("dolgh"),
            name: "Dolgh".into(),
            class: Nid::new("brigand"),
            level: 3,
            bases: Stats {
                hp: 4,
                str: 1,
                ..Stats::default()
            },
            growths: Stats::default(),
            items: vec![Nid::new("iron_axe")],
            skills: vec![],
            portrait: Nid::new("portrait_dolgh"),
            affinity: Nid::default(),
            persistent: false,
        },
    );

    db.supports.push(SupportPrefab {
        nid: Nid::new("alyn_marta"),
        unit1: Nid::new("alyn"),
        unit2: Nid::new("marta"),
        ranks: vec![
            (Nid::new("C"), 3),
            (Nid::new("B"), 6),
            (Nid::new("A"), 12),
        ],
    });

    db.tilemaps.insert(
        Nid::new("field8"),
        TilemapDef::filled("field8", 8, 8, "plains"),
    );
    db.tilemaps.insert(
        Nid::new("pass6"),
        TilemapDef::filled("pass6", 6, 6, "plains"),
    );

    let mut music = BTreeMap::new();
    music.insert(Nid::new("player"), Nid::new("bgm_player_phase"));
    music.insert(Nid::new("enemy"), Nid::new("bgm_enemy_phase"));

    db.levels.insert(
        Nid::new("ch1"),
        LevelPrefab {
            nid: Nid::new("ch1"),
            name: "Bandits at the Border".into(),
            tilemap: Nid::new("field8"),
            party: Nid::new("main"),
            music: music.clone(),
            objective: Objective {
                kind: WinKind::Rout,
                simple: "Rout the enemy".into(),
                win: "Defeat all enemies".into(),
                loss: "Alyn dies".into(),
            },
            units: vec![
                LevelUnitSpec {
                    unit: Nid::new("alyn"),
                    team: Nid::new("player"),
                    position: Some(emblem_core::Coord::new(1, 6)),
                    ai: None,
                    group: None,
                },
                LevelUnitSpec {
                    unit: Nid::new("marta"),
                    team: Nid::new("player"),
                    position: Some(emblem_core::Coord::new(2, 6)),
                    ai: None,
                    group: None,
                },
                LevelUnitSpec {
                    unit: Nid::new("gruk"),
                    team: Nid::new("enemy"),
                    position: Some(emblem_core::Coord::new(6, 1)),
                    ai: Some(Nid::new("attack")),
                    group: None,
                },
                LevelUnitSpec {
                    unit: Nid::new("dolgh"),
                    team: Nid::new("enemy"),
                    position: Some(emblem_core::Coord::new(5, 2)),
                    ai: Some(Nid::new("defend")),
                    group: None,
                },
            ],
            regions: vec![Region {
                nid: Nid::new("start_formation"),
                kind: RegionKind::Formation,
                position: emblem_core::Coord::new(1, 5),
                size: (2, 2),
                sub_nid: None,
                condition: None,
            }],
            unit_groups: vec![],
            fog: false,
            roam: false,
            roam_unit: None,
        },
    );
    db.levels.insert(
        Nid::new("ch2"),
        LevelPrefab {
            nid: Nid::new("ch2"),
            name: "The Mountain Pass".into(),
            tilemap: Nid::new("pass6"),
            party: Nid::new("main"),
            music,
            objective: Objective {
                kind: WinKind::Seize,
                simple: "Seize the gate".into(),
                win: "Seize the gate".into(),
                loss: "Alyn dies".into(),
            },
            units: vec![LevelUnitSpec {
                unit: Nid::new("alyn"),
                team: Nid::new("player"),
                position: Some(emblem_core::Coord::new(0, 5)),
                ai: None,
                group: None,
            }],
            regions: vec![Region {
                nid: Nid::new("gate"),
                kind: RegionKind::Seize,
                position: emblem_core::Coord::new(5, 0),
                size: (1, 1),
                sub_nid: None,
                condition: None,
            }],
            unit_groups: vec![],
            fog: true,
            roam: false,
            roam_unit: None,
        },
    );
    db.level_order = vec![Nid::new("ch1"), Nid::new("ch2")];

    db.events.push(EventPrefab {
        nid: Nid::new("ch1_intro"),
        trigger: "level_start".into(),
        level_nid: Some(Nid::new("ch1")),
        condition: String::new(),
        only_once: true,
        priority: 10,
        source: vec![
            "music;bgm_ch1".to_owned(),
            "add_portrait;portrait_alyn;left".to_owned(),
            "speak;alyn;Bandits. Stay close, Marta.".to_owned(),
            "remove_portrait;portrait_alyn".to_owned(),
        ],
    });
    db.events.push(EventPrefab {
        nid: Nid::new("ch1_turn3_reinforce"),
        trigger: "turn_change".into(),
        level_nid: Some(Nid::new("ch1")),
        condition: "turn_count == 3".to_owned(),
        only_once: true,
        priority: 0,
        source: vec!["add_unit;gruk;7,0;enemy".to_owned()],
    });

    db
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_database_is_internally_consistent() {
        let db = database();
        for level in db.levels.values() {
            assert!(db.tilemaps.contains_key(&level.tilemap));
            for spec in &level.units {
                assert!(db.units.contains_key(&spec.unit), "missing {}", spec.unit);
                assert!(db.team(&spec.team).is_some());
            }
        }
        for unit in db.units.values() {
            assert!(db.classes.contains_key(&unit.class));
            for item in &unit.items {
                assert!(db.items.contains_key(item));
            }
        }
    }
}
