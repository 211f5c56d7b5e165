//! Scrubbing the action log against the live world.
//!
//! [`backward`] undoes the most recent applied entry, [`forward`]
//! replays the next one; both keep the journal invariant that the world
//! equals the initial state plus `entries[..cursor]`. The turnwheel game
//! state drives these and moves the cursor to each entry's focus tile.

use crate::action_log::{LogEntry, UnitSnap};
use crate::common::Coord;
use crate::context::GameContext;

/// Replays the next recorded action. Returns its description and focus
/// tile, or `None` at the present.
pub fn forward(ctx: &mut GameContext) -> Option<(String, Option<Coord>)> {
    let entry = ctx.action_log.peek_future()?.clone();
    apply(ctx, &entry);
    ctx.action_log.step_forward();
    Some((entry.description(), entry.focus()))
}

/// Undoes the previous action. Returns its description and focus tile,
/// or `None` at the beginning of the journal.
pub fn backward(ctx: &mut GameContext) -> Option<(String, Option<Coord>)> {
    let entry = ctx.action_log.peek_past()?.clone();
    invert(ctx, &entry);
    ctx.action_log.step_backward();
    Some((entry.description(), entry.focus()))
}

/// Replays entries until the cursor reaches the present again, then
/// clears the rewind bookkeeping (the BACK-out path of the turnwheel).
pub fn reset(ctx: &mut GameContext) {
    while forward(ctx).is_some() {}
    ctx.action_log.reset();
}

fn apply(ctx: &mut GameContext, entry: &LogEntry) {
    match entry {
        LogEntry::Move { unit, to, .. } => {
            if ctx.move_unit(unit, *to).is_err() {
                let _ = ctx.place_unit(unit, *to);
            }
        }
        LogEntry::Attack {
            attacker_after,
            defender_after,
            weapon_uses,
            broken,
            ..
        } => {
            restore_snap(ctx, attacker_after);
            restore_snap(ctx, defender_after);
            for (uid, _, after) in weapon_uses {
                if let Some(item) = ctx.item_mut(*uid) {
                    item.uses = *after;
                }
            }
            for (uid, _, _) in broken {
                ctx.unbind_item(*uid);
            }
        }
        LogEntry::Wait { unit, flags_after, .. } => {
            if let Some(u) = ctx.unit_mut(unit) {
                u.flags = *flags_after;
            }
        }
        LogEntry::UseItem {
            unit,
            item,
            hp_after,
            uses_after,
            broke,
            ..
        } => {
            if let Some(u) = ctx.unit_mut(unit) {
                u.current_hp = *hp_after;
            }
            if let Some(i) = ctx.item_mut(*item) {
                i.uses = *uses_after;
            }
            if *broke {
                ctx.unbind_item(*item);
            }
        }
        LogEntry::Trade {
            unit1,
            unit2,
            slot1,
            slot2,
        } => {
            swap_slots(ctx, unit1, *slot1, unit2, *slot2);
        }
        LogEntry::Rescue {
            carrier, passenger, ..
        } => {
            ctx.remove_from_board(passenger);
            link_rescue(ctx, carrier, passenger);
        }
        LogEntry::Drop {
            carrier,
            passenger,
            tile,
        } => {
            unlink_rescue(ctx, carrier, passenger);
            let _ = ctx.place_unit(passenger, *tile);
        }
        LogEntry::TurnAdvance {
            turn_count_after,
            team_index_after,
            units_after,
            ..
        } => {
            ctx.turn_count = *turn_count_after;
            ctx.phase.set_team_index(*team_index_after);
            for snap in units_after {
                restore_snap(ctx, snap);
            }
        }
    }
}

fn invert(ctx: &mut GameContext, entry: &LogEntry) {
    match entry {
        LogEntry::Move { unit, from, .. } => {
            if ctx.move_unit(unit, *from).is_err() {
                let _ = ctx.place_unit(unit, *from);
            }
        }
        LogEntry::Attack {
            attacker_before,
            defender_before,
            weapon_uses,
            broken,
            ..
        } => {
            for (uid, owner, slot) in broken {
                ctx.rebind_item(*uid, owner, *slot);
            }
            for (uid, before, _) in weapon_uses {
                if let Some(item) = ctx.item_mut(*uid) {
                    item.uses = *before;
                }
            }
            restore_snap(ctx, attacker_before);
            restore_snap(ctx, defender_before);
        }
        LogEntry::Wait { unit, flags_before, .. } => {
            if let Some(u) = ctx.unit_mut(unit) {
                u.flags = *flags_before;
            }
        }
        LogEntry::UseItem {
            unit,
            item,
            slot,
            hp_before,
            uses_before,
            broke,
            ..
        } => {
            if *broke {
                let owner = unit.clone();
                ctx.rebind_item(*item, &owner, *slot);
            }
            if let Some(u) = ctx.unit_mut(unit) {
                u.current_hp = *hp_before;
            }
            if let Some(i) = ctx.item_mut(*item) {
                i.uses = *uses_before;
            }
        }
        LogEntry::Trade {
            unit1,
            unit2,
            slot1,
            slot2,
        } => {
            swap_slots(ctx, unit1, *slot1, unit2, *slot2);
        }
        LogEntry::Rescue {
            carrier,
            passenger,
            passenger_pos,
        } => {
            unlink_rescue(ctx, carrier, passenger);
            let _ = ctx.place_unit(passenger, *passenger_pos);
        }
        LogEntry::Drop {
            carrier, passenger, ..
        } => {
            ctx.remove_from_board(passenger);
            link_rescue(ctx, carrier, passenger);
        }
        LogEntry::TurnAdvance {
            turn_count_before,
            team_index_before,
            units_before,
            ..
        } => {
            ctx.turn_count = *turn_count_before;
            ctx.phase.set_team_index(*team_index_before);
            for snap in units_before {
                restore_snap(ctx, snap);
            }
        }
    }
}

/// Applies a unit snapshot, including board placement.
fn restore_snap(ctx: &mut GameContext, snap: &UnitSnap) {
    let placed = ctx.unit(&snap.nid).and_then(|u| u.position);
    match (placed, snap.position) {
        (Some(_), None) | (None, None) => ctx.remove_from_board(&snap.nid),
        (Some(cur), Some(target)) if cur != target => {
            let _ = ctx.move_unit(&snap.nid, target);
        }
        (None, Some(target)) => {
            let _ = ctx.place_unit(&snap.nid, target);
        }
        _ => {}
    }
    if let Some(unit) = ctx.unit_mut(&snap.nid) {
        unit.current_hp = snap.hp;
        unit.exp = snap.exp;
        unit.level = snap.level;
        unit.stats = snap.stats;
        unit.flags = snap.flags;
        unit.statuses = snap.statuses.clone();
        unit.position = snap.position;
    }
}

/// Swaps two inventory slots between units, fixing up item ownership.
/// Used both by the trade action and by log replay; it is self-inverse.
pub fn swap_slots(
    ctx: &mut GameContext,
    unit1: &crate::common::Nid,
    slot1: usize,
    unit2: &crate::common::Nid,
    slot2: usize,
) {
    let item1 = ctx.unit(unit1).and_then(|u| u.items.get(slot1).copied());
    let item2 = ctx.unit(unit2).and_then(|u| u.items.get(slot2).copied());

    if let Some(u1) = ctx.unit_mut(unit1) {
        match (item2, slot1 < u1.items.len()) {
            (Some(incoming), true) => u1.items[slot1] = incoming,
            (Some(incoming), false) => u1.items.push(incoming),
            (None, true) => {
                u1.items.remove(slot1);
            }
            (None, false) => {}
        }
    }
    if let Some(u2) = ctx.unit_mut(unit2) {
        match (item1, slot2 < u2.items.len()) {
            (Some(incoming), true) => u2.items[slot2] = incoming,
            (Some(incoming), false) => u2.items.push(incoming),
            (None, true) => {
                u2.items.remove(slot2);
            }
            (None, false) => {}
        }
    }
    for (uid, owner) in [(item1, unit2), (item2, unit1)] {
        if let Some(uid) = uid {
            if let Some(item) = ctx.item_mut(uid) {
                item.owner = Some(owner.clone());
            }
        }
    }
}

fn link_rescue(ctx: &mut GameContext, carrier: &crate::common::Nid, passenger: &crate::common::Nid) {
    if let Some(c) = ctx.unit_mut(carrier) {
        c.rescuing = Some(passenger.clone());
    }
    if let Some(p) = ctx.unit_mut(passenger) {
        p.rescued_by = Some(carrier.clone());
    }
}

fn unlink_rescue(ctx: &mut GameContext, carrier: &crate::common::Nid, passenger: &crate::common::Nid) {
    if let Some(c) = ctx.unit_mut(carrier) {
        c.rescuing = None;
    }
    if let Some(p) = ctx.unit_mut(passenger) {
        p.rescued_by = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action_log::LogEntry;
    use crate::board::Board;
    use crate::common::Nid;
    use crate::data::TilemapDef;
    use std::sync::Arc;

    fn ctx_with_hero() -> (GameContext, Nid) {
        let db = crate::context::tests::test_db();
        let mut ctx = GameContext::new(Arc::new(db));
        ctx.board = Board::from_tilemap(&ctx.db, &TilemapDef::filled("m", 5, 5, "plains"));
        let hero = ctx.spawn_unit(&Nid::new("hero"), &Nid::new("player")).unwrap();
        ctx.place_unit(&hero, Coord::new(0, 0)).unwrap();
        (ctx, hero)
    }

    #[test]
    fn move_backward_then_forward_is_identity() {
        let (mut ctx, hero) = ctx_with_hero();
        ctx.action_log.start_recording();
        ctx.move_unit(&hero, Coord::new(2, 0)).unwrap();
        ctx.action_log.record(LogEntry::Move {
            unit: hero.clone(),
            from: Coord::new(0, 0),
            to: Coord::new(2, 0),
        });
        ctx.action_log.stop_recording();

        let (desc, focus) = backward(&mut ctx).unwrap();
        assert!(desc.contains("moved"));
        assert_eq!(focus, Some(Coord::new(2, 0)));
        assert_eq!(ctx.unit(&hero).unwrap().position, Some(Coord::new(0, 0)));

        forward(&mut ctx).unwrap();
        assert_eq!(ctx.unit(&hero).unwrap().position, Some(Coord::new(2, 0)));
        assert_eq!(ctx.board.get_unit(Coord::new(2, 0)), Some(&hero));
    }

    #[test]
    fn rescue_round_trip() {
        let (mut ctx, hero) = ctx_with_hero();
        let mut db = crate::context::tests::test_db();
        db.units.insert(
            Nid::new("ally"),
            crate::data::UnitPrefab {
                nid: Nid::new("ally"),
                name: "Ally".into(),
                class: Nid::new("fighter"),
                level: 1,
                ..crate::data::UnitPrefab::default()
            },
        );
        ctx.db = Arc::new(db);
        let ally = ctx.spawn_unit(&Nid::new("ally"), &Nid::new("player")).unwrap();
        ctx.place_unit(&ally, Coord::new(1, 0)).unwrap();

        // Perform the rescue as gameplay would.
        ctx.remove_from_board(&ally);
        link_rescue(&mut ctx, &hero, &ally);
        ctx.action_log.start_recording();
        ctx.action_log.record(LogEntry::Rescue {
            carrier: hero.clone(),
            passenger: ally.clone(),
            passenger_pos: Coord::new(1, 0),
        });
        ctx.action_log.stop_recording();

        backward(&mut ctx).unwrap();
        assert_eq!(ctx.unit(&ally).unwrap().position, Some(Coord::new(1, 0)));
        assert_eq!(ctx.unit(&hero).unwrap().rescuing, None);

        forward(&mut ctx).unwrap();
        assert_eq!(ctx.unit(&ally).unwrap().position, None);
        assert_eq!(
            ctx.unit(&hero).unwrap().rescuing.as_ref(),
            Some(&ally)
        );
        assert_eq!(
            ctx.unit(&ally).unwrap().rescued_by.as_ref(),
            Some(&hero)
        );
    }

    #[test]
    fn reset_returns_to_present() {
        let (mut ctx, hero) = ctx_with_hero();
        ctx.action_log.start_recording();
        for step in 1..=3 {
            let from = Coord::new(step - 1, 0);
            let to = Coord::new(step, 0);
            ctx.move_unit(&hero, to).unwrap();
            ctx.action_log.record(LogEntry::Move {
                unit: hero.clone(),
                from,
                to,
            });
        }
        ctx.action_log.stop_recording();

        backward(&mut ctx);
        backward(&mut ctx);
        assert_eq!(ctx.unit(&hero).unwrap().position, Some(Coord::new(1, 0)));
        assert!(ctx.action_log.locked);

        reset(&mut ctx);
        assert_eq!(ctx.unit(&hero).unwrap().position, Some(Coord::new(3, 0)));
        assert!(!ctx.action_log.locked);
        assert_eq!(ctx.action_log.cursor(), 3);
    }
}
