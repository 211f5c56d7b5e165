//! End-to-end scenarios against the public API: combat resolution with
//! experience, scripted events with conditions, and a driver-level
//! boot-to-battle smoke test.

use std::collections::BTreeMap;
use std::sync::Arc;

use emblem_core::{
    Button, ClassDef, Components, Coord, Database, Driver, EventPrefab, GameContext, ItemPrefab,
    LevelPrefab, LevelUnitSpec, MovementCostTable, Nid, Objective, RngMode, Stats, Surface,
    TeamDef, TerrainDef, TilemapDef, UnitPrefab, Value, WinKind, component_keys, resolve,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn fixture_db() -> Database {
    init_tracing();
    let mut db = Database::default();
    db.constants.title = "Fixture".into();
    db.teams = vec![
        TeamDef {
            nid: Nid::new("player"),
            name: "Player".into(),
            player_control: true,
            allies: vec![],
        },
        TeamDef {
            nid: Nid::new("enemy"),
            name: "Enemy".into(),
            player_control: false,
            allies: vec![],
        },
    ];
    db.terrain.insert(
        Nid::new("plains"),
        TerrainDef {
            nid: Nid::new("plains"),
            name: "Plains".into(),
            ..TerrainDef::default()
        },
    );
    let mut mcost = MovementCostTable::new();
    mcost.set("infantry", "plains", 1);
    db.mcost = mcost;
    db.tilemaps
        .insert(Nid::new("arena"), TilemapDef::filled("arena", 8, 8, "plains"));

    db.classes.insert(
        Nid::new("myrmidon"),
        ClassDef {
            nid: Nid::new("myrmidon"),
            name: "Myrmidon".into(),
            movement_group: Nid::new("infantry"),
            bases: Stats {
                hp: 20,
                str: 2,
                skl: 10,
                spd: 7,
                con: 10,
                mov: 5,
                ..Stats::default()
            },
            ..ClassDef::default()
        },
    );
    db.classes.insert(
        Nid::new("soldier"),
        ClassDef {
            nid: Nid::new("soldier"),
            name: "Soldier".into(),
            movement_group: Nid::new("infantry"),
            bases: Stats {
                hp: 20,
                def: 2,
                spd: 5,
                con: 10,
                mov: 4,
                ..Stats::default()
            },
            ..ClassDef::default()
        },
    );

    db.items.insert(
        Nid::new("blade"),
        ItemPrefab {
            nid: Nid::new("blade"),
            name: "Blade".into(),
            icon: Nid::default(),
            components: Components::new()
                .with(component_keys::WEAPON, Value::from("sword"))
                .with(component_keys::DAMAGE, Value::Int(3))
                .with(component_keys::HIT, Value::Int(100))
                .with(component_keys::USES, Value::Int(30)),
        },
    );
    db.items.insert(
        Nid::new("pike"),
        ItemPrefab {
            nid: Nid::new("pike"),
            name: "Pike".into(),
            icon: Nid::default(),
            components: Components::new()
                .with(component_keys::WEAPON, Value::from("lance"))
                .with(component_keys::DAMAGE, Value::Int(2))
                .with(component_keys::HIT, Value::Int(50))
                .with(component_keys::USES, Value::Int(30)),
        },
    );

    db.units.insert(
        Nid::new("kira"),
        UnitPrefab {
            nid: Nid::new("kira"),
            name: "Kira".into(),
            class: Nid::new("myrmidon"),
            level: 1,
            items: vec![Nid::new("blade")],
            ..UnitPrefab::default()
        },
    );
    db.units.insert(
        Nid::new("grunt"),
        UnitPrefab {
            nid: Nid::new("grunt"),
            name: "Grunt".into(),
            class: Nid::new("soldier"),
            level: 1,
            items: vec![Nid::new("pike")],
            ..UnitPrefab::default()
        },
    );

    db.levels.insert(
        Nid::new("ch1"),
        LevelPrefab {
            nid: Nid::new("ch1"),
            name: "Chapter 1".into(),
            tilemap: Nid::new("arena"),
            party: Nid::new("main"),
            music: BTreeMap::new(),
            objective: Objective {
                kind: WinKind::Rout,
                simple: "Rout".into(),
                win: "Rout the enemy".into(),
                loss: "Kira dies".into(),
            },
            units: vec![
                LevelUnitSpec {
                    unit: Nid::new("kira"),
                    team: Nid::new("player"),
                    position: Some(Coord::new(1, 1)),
                    ai: None,
                    group: None,
                },
                LevelUnitSpec {
                    unit: Nid::new("grunt"),
                    team: Nid::new("enemy"),
                    position: Some(Coord::new(6, 6)),
                    ai: Some(Nid::new("attack")),
                    group: None,
                },
            ],
            regions: vec![],
            unit_groups: vec![],
            fog: false,
            roam: false,
            roam_unit: None,
        },
    );
    db.level_order = vec![Nid::new("ch1")];
    db
}

fn battle_context() -> (GameContext, Nid, Nid) {
    let mut ctx = GameContext::with_seed(Arc::new(fixture_db()), 1);
    ctx.load_level(&Nid::new("ch1")).unwrap();
    (ctx, Nid::new("kira"), Nid::new("grunt"))
}

#[test]
fn basic_attack_with_counter() {
    let (mut ctx, kira, grunt) = battle_context();
    ctx.move_unit(&kira, Coord::new(6, 5)).unwrap();

    let weapon_uid = ctx.unit(&kira).map(|u| u.items[0]).unwrap();
    let attacker = ctx.unit(&kira).cloned().unwrap();
    let defender = ctx.unit(&grunt).cloned().unwrap();
    let weapon = ctx.item(weapon_uid).cloned().unwrap();
    let counter_uid = ctx.equipped_weapon(&defender);
    let counter = counter_uid.and_then(|uid| ctx.item(uid).cloned());

    let outcome = resolve(
        &ctx.db,
        &ctx.board,
        &attacker,
        &weapon,
        &defender,
        counter.as_ref(),
        RngMode::Fixed,
        &mut ctx.rng,
    )
    .unwrap();

    // Speed differential of 2 means no follow-ups: one strike per side.
    assert_eq!(outcome.strikes.len(), 2);

    // Attacker: 100 hit + 20 skl vs avoid 10 caps at 100, cannot miss.
    // Damage 2 str + 3 mt - 2 def = 3.
    let first = &outcome.strikes[0];
    assert!(first.hit);
    assert!(!first.crit);
    assert_eq!(first.damage, 3);
    assert_eq!(outcome.defender_hp_after, 17);

    // Counter: 50 hit vs avoid 14 gives 36, below the fixed roll of 50.
    let second = &outcome.strikes[1];
    assert!(!second.hit);
    assert_eq!(outcome.attacker_hp_after, 20);

    // Player attacker gains 1 exp for a hit without a kill.
    assert_eq!(outcome.exp_gained, 1);
    assert!(outcome.level_ups.is_empty());
    assert!(!outcome.attacker_dead);
    assert!(!outcome.defender_dead);
}

#[test]
fn kill_grants_level_scaled_exp() {
    let (mut ctx, kira, grunt) = battle_context();
    ctx.move_unit(&kira, Coord::new(6, 5)).unwrap();
    {
        let defender = ctx.unit_mut(&grunt).unwrap();
        defender.current_hp = 3;
        defender.level = 3;
    }

    let weapon_uid = ctx.unit(&kira).map(|u| u.items[0]).unwrap();
    let attacker = ctx.unit(&kira).cloned().unwrap();
    let defender = ctx.unit(&grunt).cloned().unwrap();
    let weapon = ctx.item(weapon_uid).cloned().unwrap();

    let outcome = resolve(
        &ctx.db,
        &ctx.board,
        &attacker,
        &weapon,
        &defender,
        None,
        RngMode::Fixed,
        &mut ctx.rng,
    )
    .unwrap();

    assert!(outcome.defender_dead);
    // 1 for the hit plus 20 + (3 - 1) for the kill.
    assert_eq!(outcome.exp_gained, 23);
    assert!(outcome.level_ups.is_empty());

    let mut solver = emblem_core::CombatSolver::new(outcome, weapon_uid, None);
    while !solver.tick() {}
    solver.apply_results(&mut ctx);
    solver.apply_results(&mut ctx); // idempotent

    let defender = ctx.unit(&grunt).unwrap();
    assert!(defender.is_dead());
    assert_eq!(defender.position, None);
    assert_eq!(ctx.board.get_unit(Coord::new(6, 6)), None);
    assert_eq!(ctx.unit(&kira).unwrap().exp, 23);
}

#[test]
fn exp_overflow_rolls_level_ups() {
    let (mut ctx, kira, grunt) = battle_context();
    ctx.move_unit(&kira, Coord::new(6, 5)).unwrap();
    {
        let attacker = ctx.unit_mut(&kira).unwrap();
        attacker.exp = 90;
        attacker.growths = Stats {
            hp: 100,
            str: 100,
            ..Stats::default()
        };
    }
    {
        let defender = ctx.unit_mut(&grunt).unwrap();
        defender.current_hp = 1;
        defender.level = 3;
    }

    let weapon_uid = ctx.unit(&kira).map(|u| u.items[0]).unwrap();
    let attacker = ctx.unit(&kira).cloned().unwrap();
    let defender = ctx.unit(&grunt).cloned().unwrap();
    let weapon = ctx.item(weapon_uid).cloned().unwrap();
    let str_before = attacker.stats.str;
    let hp_before = attacker.stats.hp;

    let outcome = resolve(
        &ctx.db,
        &ctx.board,
        &attacker,
        &weapon,
        &defender,
        None,
        RngMode::Fixed,
        &mut ctx.rng,
    )
    .unwrap();
    assert_eq!(outcome.exp_gained, 23);
    assert_eq!(outcome.level_ups.len(), 1);
    let gains = &outcome.level_ups[0];
    assert_eq!(gains.get(&emblem_core::StatKind::Str), Some(&1));
    assert_eq!(gains.get(&emblem_core::StatKind::Hp), Some(&1));

    let mut solver = emblem_core::CombatSolver::new(outcome, weapon_uid, None);
    while !solver.tick() {}
    solver.apply_results(&mut ctx);

    let kira_after = ctx.unit(&kira).unwrap();
    assert_eq!(kira_after.level, 2);
    assert_eq!(kira_after.exp, 13);
    assert_eq!(kira_after.stats.str, str_before + 1);
    assert_eq!(kira_after.stats.hp, hp_before + 1);
}

#[test]
fn conditional_event_fires_once() {
    let mut db = fixture_db();
    db.events.push(EventPrefab {
        nid: Nid::new("E1"),
        trigger: "turn_change".into(),
        level_nid: Some(Nid::new("ch1")),
        condition: "turn_count == 3".into(),
        only_once: true,
        priority: 0,
        source: vec!["speak;Hero;Go!".to_owned()],
    });
    let mut ctx = GameContext::with_seed(Arc::new(db), 1);
    ctx.load_level(&Nid::new("ch1")).unwrap();

    ctx.turn_count = 2;
    assert_eq!(ctx.trigger_event("turn_change"), 0);

    ctx.turn_count = 3;
    assert_eq!(ctx.trigger_event("turn_change"), 1);
    assert!(emblem_core::events::pump(&mut ctx));
    let dialog = ctx.events.current_dialog.clone().unwrap();
    assert_eq!(dialog.speaker, "Hero");
    assert_eq!(dialog.text, "Go!");

    ctx.events.resolve_wait();
    assert!(!emblem_core::events::pump(&mut ctx));

    // only_once: the same trigger no longer matches.
    assert_eq!(ctx.trigger_event("turn_change"), 0);
}

#[test]
fn driver_boots_from_title_to_free() {
    let mut driver = Driver::new();
    let mut ctx = GameContext::with_seed(Arc::new(fixture_db()), 7);
    let mut surface = Surface::new();

    driver.boot(&mut ctx);
    driver.tick(&mut ctx, None, &mut surface);
    assert_eq!(driver.machine.top_name(), Some("title"));

    driver.tick(&mut ctx, Some(Button::Start), &mut surface);
    assert_eq!(driver.machine.top_name(), Some("free"));
    assert_eq!(ctx.current_level, Some(Nid::new("ch1")));
    assert!(ctx.action_log.is_recording());

    // The free state composites the map and its cursor.
    driver.tick(&mut ctx, None, &mut surface);
    assert!(surface.contains(|op| matches!(op, emblem_core::DrawOp::Map { .. })));
    assert!(surface.contains(|op| matches!(op, emblem_core::DrawOp::Cursor(_))));
}

#[test]
fn select_unit_enters_move_state_and_back_cancels() {
    let mut driver = Driver::new();
    let mut ctx = GameContext::with_seed(Arc::new(fixture_db()), 7);
    let mut surface = Surface::new();
    driver.boot(&mut ctx);
    driver.tick(&mut ctx, None, &mut surface);
    driver.tick(&mut ctx, Some(Button::Start), &mut surface);

    // Walk the cursor onto Kira at (1, 1) and select her.
    ctx.cursor = Coord::new(1, 1);
    driver.tick(&mut ctx, Some(Button::Select), &mut surface);
    driver.tick(&mut ctx, None, &mut surface);
    assert_eq!(driver.machine.top_name(), Some("move"));
    assert!(surface.contains(|op| matches!(op, emblem_core::DrawOp::MoveRange(_))));

    driver.tick(&mut ctx, Some(Button::Back), &mut surface);
    driver.tick(&mut ctx, None, &mut surface);
    assert_eq!(driver.machine.top_name(), Some("free"));
}
