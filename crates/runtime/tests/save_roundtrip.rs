//! Save/load round-trip: serialize a populated world, reset, restore,
//! and compare every observable field.

use std::sync::Arc;

use emblem_content::sample;
use emblem_core::{
    Button, Driver, GameContext, Nid, StateMachine, Surface, UnitStatus, Value, states,
};
use emblem_runtime::{MemorySaveStore, SaveKind, SaveManager, snapshot};

fn populated_world() -> (GameContext, StateMachine) {
    let db = Arc::new(sample::database());
    let mut ctx = GameContext::with_seed(Arc::clone(&db), 99);
    ctx.mode = Nid::new("hard");
    ctx.load_level(&Nid::new("ch1")).unwrap();
    ctx.turn_count = 7;
    ctx.game_vars
        .insert("chapter".to_owned(), Value::from("ch2"));
    ctx.level_vars
        .insert("door_open".to_owned(), Value::Bool(true));

    // Wear down a weapon and a unit so non-default values round-trip.
    let alyn = Nid::new("alyn");
    let sword_uid = ctx.unit(&alyn).map(|u| u.items[0]).unwrap();
    if let Some(item) = ctx.item_mut(sword_uid) {
        item.uses = Some(5);
    }
    if let Some(unit) = ctx.unit_mut(&alyn) {
        unit.current_hp = 9;
        unit.exp = 42;
        unit.wexp.insert(Nid::new("sword"), 12);
        unit.statuses.push(UnitStatus {
            nid: Nid::new("poison"),
            dot: 2,
            duration: 3,
        });
    }

    // A rescue pair exercises the second-pass relink.
    let marta = Nid::new("marta");
    ctx.remove_from_board(&marta);
    if let Some(carrier) = ctx.unit_mut(&alyn) {
        carrier.rescuing = Some(marta.clone());
    }
    if let Some(passenger) = ctx.unit_mut(&marta) {
        passenger.rescued_by = Some(alyn.clone());
    }

    if let Some(party) = ctx.parties.get_mut(&Nid::new("main")) {
        party.money = 1234;
        party.bexp = 50;
    }
    let potion = ctx.create_item(&Nid::new("vulnerary")).unwrap();
    let party = ctx.current_party.clone();
    ctx.send_to_convoy(&party, potion);

    ctx.supports.add_points(&alyn, &marta, 4);
    ctx.records.note_kill(&alyn);
    ctx.overworld.unlock(Nid::new("ch1"));

    let mut machine = StateMachine::new();
    states::register_all(&mut machine);
    machine.seed_stack(&["free".to_owned()]);
    (ctx, machine)
}

#[test]
fn serialize_then_deserialize_is_identity() {
    let (ctx, machine) = populated_world();
    let snap = snapshot::build(&ctx, machine.stack_names());

    let (restored, stack) = snapshot::restore(Arc::clone(&ctx.db), &snap);
    assert_eq!(stack, vec!["free"]);

    // Units: every observable field.
    assert_eq!(ctx.units.len(), restored.units.len());
    for (nid, unit) in &ctx.units {
        let other = restored.unit(nid).expect("unit survived round trip");
        assert_eq!(unit.position, other.position, "{nid} position");
        assert_eq!(unit.current_hp, other.current_hp, "{nid} hp");
        assert_eq!(unit.exp, other.exp, "{nid} exp");
        assert_eq!(unit.stats, other.stats, "{nid} stats");
        assert_eq!(unit.flags, other.flags, "{nid} flags");
        assert_eq!(unit.statuses, other.statuses, "{nid} statuses");
        assert_eq!(unit.wexp, other.wexp, "{nid} wexp");
        assert_eq!(unit.rescuing, other.rescuing, "{nid} rescuing");
        assert_eq!(unit.rescued_by, other.rescued_by, "{nid} rescued_by");
        assert_eq!(unit.items.len(), other.items.len(), "{nid} inventory");
    }

    // Items: uses survive, including the worn sword.
    let alyn = Nid::new("alyn");
    let sword_uid = restored.unit(&alyn).map(|u| u.items[0]).unwrap();
    assert_eq!(restored.item(sword_uid).unwrap().uses, Some(5));

    // Board occupancy mirrors unit positions.
    for unit in restored.units.values() {
        if let Some(pos) = unit.position {
            assert_eq!(restored.board.get_unit(pos), Some(&unit.nid));
        }
    }

    // World-level fields.
    assert_eq!(restored.turn_count, 7);
    assert_eq!(restored.mode, Nid::new("hard"));
    assert_eq!(restored.game_vars, ctx.game_vars);
    assert_eq!(restored.level_vars, ctx.level_vars);
    assert_eq!(restored.current_level, Some(Nid::new("ch1")));
    assert_eq!(restored.rng.state(), ctx.rng.state());
    assert_eq!(restored.supports.raw(), ctx.supports.raw());
    assert_eq!(restored.records, ctx.records);
    assert_eq!(restored.overworld, ctx.overworld);

    // Convoy reference resolved.
    let party = restored.parties.get(&Nid::new("main")).unwrap();
    assert_eq!(party.money, 1234);
    assert_eq!(party.convoy.len(), 1);
    let convoy_item = restored.item(party.convoy[0]).unwrap();
    assert_eq!(convoy_item.nid, "vulnerary");
    assert_eq!(convoy_item.owner, None);

    // A second serialization of the restored world is bit-identical.
    let snap2 = snapshot::build(&restored, stack);
    assert_eq!(snap, snap2);
}

#[test]
fn slot_save_and_load_through_the_store() {
    let (ctx, machine) = populated_world();
    let mut manager = SaveManager::new(MemorySaveStore::new(), "sample");

    manager
        .save_slot(&ctx, &machine, "1", SaveKind::Manual)
        .unwrap();

    let mut fresh_machine = StateMachine::new();
    states::register_all(&mut fresh_machine);
    let restored = manager
        .load_slot(Arc::clone(&ctx.db), &mut fresh_machine, "1")
        .unwrap()
        .expect("slot exists");

    assert_eq!(restored.turn_count, 7);
    assert_eq!(fresh_machine.stack_names(), vec!["free"]);

    let saves = manager.list_saves().unwrap();
    assert_eq!(saves.len(), 1);
    assert_eq!(saves[0].0, "sample-1");
    assert_eq!(saves[0].1.level_nid.as_deref(), Some("ch1"));
}

#[test]
fn suspend_is_deleted_after_first_load() {
    let (ctx, machine) = populated_world();
    let mut manager = SaveManager::new(MemorySaveStore::new(), "sample");
    manager
        .save_slot(&ctx, &machine, "ignored", SaveKind::Suspend)
        .unwrap();

    let mut fresh_machine = StateMachine::new();
    states::register_all(&mut fresh_machine);
    assert!(
        manager
            .load_suspend(Arc::clone(&ctx.db), &mut fresh_machine)
            .unwrap()
            .is_some()
    );
    assert!(
        manager
            .load_suspend(Arc::clone(&ctx.db), &mut fresh_machine)
            .unwrap()
            .is_none()
    );
}

#[test]
fn missing_class_units_are_skipped_with_reduced_world() {
    let (ctx, machine) = populated_world();
    let snap = snapshot::build(&ctx, machine.stack_names());

    // A database that lost the brigand class.
    let mut reduced = sample::database();
    reduced.classes.remove(&Nid::new("brigand"));
    let (restored, _) = snapshot::restore(Arc::new(reduced), &snap);

    assert!(restored.unit(&Nid::new("alyn")).is_some());
    assert!(restored.unit(&Nid::new("gruk")).is_none());
    // The world is reduced but consistent: no dangling board entries.
    for unit in restored.units.values() {
        if let Some(pos) = unit.position {
            assert_eq!(restored.board.get_unit(pos), Some(&unit.nid));
        }
    }
}

#[test]
fn driver_survives_a_mid_battle_reload() {
    let db = Arc::new(sample::database());
    let mut driver = Driver::new();
    let mut ctx = GameContext::with_seed(Arc::clone(&db), 5);
    let mut surface = Surface::new();
    driver.boot(&mut ctx);
    driver.tick(&mut ctx, None, &mut surface);
    driver.tick(&mut ctx, Some(Button::Start), &mut surface);
    // The chapter intro speaks first; dismiss it to settle on the map.
    assert_eq!(driver.machine.top_name(), Some("event"));
    driver.tick(&mut ctx, Some(Button::Select), &mut surface);
    assert_eq!(driver.machine.top_name(), Some("free"));

    let mut manager = SaveManager::new(MemorySaveStore::new(), "sample");
    manager
        .save_slot(&ctx, &driver.machine, "battle", SaveKind::Manual)
        .unwrap();

    let mut driver2 = Driver::new();
    let mut ctx2 = manager
        .load_slot(Arc::clone(&db), &mut driver2.machine, "battle")
        .unwrap()
        .expect("slot exists");
    ctx2.action_log.start_recording();

    driver2.tick(&mut ctx2, None, &mut surface);
    assert_eq!(driver2.machine.top_name(), Some("free"));
    driver2.tick(&mut ctx2, Some(Button::Aux), &mut surface);
    let hovered = ctx2.board.get_unit(ctx2.cursor);
    assert!(hovered.is_some(), "AUX focused an actionable unit");
}
