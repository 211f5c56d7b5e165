//! World reconstruction from a snapshot.
//!
//! The order is load-bearing: variables first, then items, then skills,
//! then units (resolving item references), then the rescue-link second
//! pass, then parties, then the side registries, and the level board
//! last. Records referencing missing database entries are skipped with
//! a warning; partial restoration leaves a consistent, reduced world.

use std::collections::BTreeMap;
use std::sync::Arc;

use emblem_core::{
    Board, Database, GameContext, GameRng, Item, ItemUid, Nid, PhaseController, Skill, TilemapDef,
    Unit,
};

use super::SnapshotRecord;

/// Rebuilds a world from a snapshot. Returns the context plus the saved
/// state-stack names for the machine to reseed.
pub fn restore(db: Arc<Database>, snap: &SnapshotRecord) -> (GameContext, Vec<String>) {
    // 1. Fresh world; all transient state reset.
    let mut ctx = GameContext::new(Arc::clone(&db));

    // 2. Variable stores, mode, counters, RNG stream.
    ctx.game_vars = snap.game_vars.clone();
    ctx.level_vars = snap.level_vars.clone();
    ctx.mode = snap.current_mode.clone();
    ctx.turn_count = snap.turn_count;
    ctx.playtime_ms = snap.playtime;
    ctx.rng = GameRng::from_state(snap.rng_state);
    ctx.rng_mode = snap.rng_mode;

    // 3. Items, indexed by their deterministic key.
    let mut items_by_key: BTreeMap<&str, ItemUid> = BTreeMap::new();
    for record in &snap.items {
        let uid = ItemUid(record.uid);
        items_by_key.insert(record.key.as_str(), uid);
        ctx.adopt_item(Item {
            uid,
            nid: record.nid.clone(),
            name: record.name.clone(),
            icon: record.icon.clone(),
            uses: record.uses,
            max_uses: record.max_uses,
            droppable: record.droppable,
            owner: record.owner.clone(),
            components: record.components.clone(),
        });
    }
    ctx.set_next_item_uid(snap.next_item_uid);

    // ...then skills, indexed by (owner, nid).
    let mut skills_by_owner: BTreeMap<(&Nid, &Nid), Skill> = BTreeMap::new();
    for record in &snap.skills {
        skills_by_owner.insert(
            (&record.owner, &record.nid),
            Skill {
                nid: record.nid.clone(),
                name: record.name.clone(),
                icon: record.icon.clone(),
                components: record.components.clone(),
                data: record.data.clone(),
            },
        );
    }

    // 4. Units, resolving item references through the key index.
    for record in &snap.units {
        if db.class(&record.class).is_none() {
            tracing::warn!(unit = %record.nid, class = %record.class, "unknown class, skipping unit");
            continue;
        }
        let mut unit = Unit {
            nid: record.nid.clone(),
            name: record.name.clone(),
            team: record.team.clone(),
            class: record.class.clone(),
            level: record.level,
            exp: record.exp,
            stats: record.stats,
            current_hp: record.current_hp,
            growths: record.growths,
            items: Default::default(),
            skills: Vec::new(),
            wexp: record.wexp.clone(),
            position: record.position,
            flags: record.flags,
            rescuing: None,
            rescued_by: None,
            statuses: record.statuses.clone(),
            party: record.party.clone(),
            portrait: record.portrait.clone(),
            affinity: record.affinity.clone(),
            ai: record.ai.clone(),
            persistent: record.persistent,
        };
        for key in &record.items {
            match items_by_key.get(key.as_str()) {
                Some(uid) => {
                    if unit.items.try_push(*uid).is_err() {
                        tracing::warn!(unit = %record.nid, key, "inventory overflow, dropping item");
                    }
                }
                None => tracing::warn!(unit = %record.nid, key, "dangling item reference, skipping"),
            }
        }
        for skill_nid in &record.skills {
            if let Some(skill) = skills_by_owner.get(&(&record.nid, skill_nid)) {
                unit.skills.push(skill.clone());
            } else if let Some(prefab) = db.skill(skill_nid) {
                unit.skills.push(Skill::from_prefab(prefab));
            } else {
                tracing::warn!(unit = %record.nid, skill = %skill_nid, "unknown skill, skipping");
            }
        }
        ctx.units.insert(unit.nid.clone(), unit);
    }

    // 5. Second pass: rescue links, now that every unit exists.
    for record in &snap.units {
        if let Some(passenger) = &record.rescuing {
            if ctx.units.contains_key(passenger) {
                if let Some(unit) = ctx.unit_mut(&record.nid) {
                    unit.rescuing = Some(passenger.clone());
                }
            }
        }
        if let Some(carrier) = &record.rescued_by {
            if ctx.units.contains_key(carrier) {
                if let Some(unit) = ctx.unit_mut(&record.nid) {
                    unit.rescued_by = Some(carrier.clone());
                }
            }
        }
    }

    // 6. Parties and convoy references.
    for record in &snap.parties {
        let mut party = emblem_core::Party::new(
            record.nid.clone(),
            record.name.clone(),
            record.leader.clone(),
        );
        party.money = record.money;
        party.bexp = record.bexp;
        for key in &record.convoy {
            match items_by_key.get(key.as_str()) {
                Some(uid) => party.convoy.push(*uid),
                None => tracing::warn!(party = %record.nid, key, "dangling convoy reference"),
            }
        }
        ctx.parties.insert(party.nid.clone(), party);
    }
    ctx.current_party = snap.current_party.clone();

    // 7. Side registries.
    ctx.market_items = snap.market_items.clone();
    ctx.base_convos = snap.base_convos.clone();
    ctx.records = snap.records.clone();
    ctx.supports.restore(snap.supports.clone());
    ctx.ai_groups = snap.active_ai_groups.clone();
    ctx.roam_info = snap.roam_info.clone();
    ctx.overworld = snap.overworld_registry.clone();
    ctx.memory = snap.memory.clone();
    ctx.talk_options = snap.talk_options.clone();
    ctx.events
        .restore_completed(snap.completed_events.iter().cloned());
    ctx.action_log
        .restore(snap.action_log.clone(), snap.turnwheel_uses);

    // 8. The level: rebuild the board from the stored terrain, place
    //    units, reinitialize fog, reattach the phase controller.
    if let Some(level) = &snap.level {
        let tilemap = TilemapDef {
            nid: level.nid.clone(),
            width: level.width,
            height: level.height,
            terrain: level.terrain.clone(),
        };
        ctx.board = Board::from_tilemap(&db, &tilemap);
        ctx.board.regions = level.regions.clone();
        ctx.board.fog_active = level.fog_active;
        ctx.current_level = Some(level.nid.clone());
        ctx.objective = level.objective.clone();

        let placements: Vec<(Nid, emblem_core::Coord)> = ctx
            .units
            .values()
            .filter_map(|u| u.position.map(|p| (u.nid.clone(), p)))
            .collect();
        for (nid, pos) in placements {
            if let Err(err) = ctx.board.set_unit(pos, nid.clone()) {
                tracing::warn!(unit = %nid, %err, "could not replace unit on board");
                if let Some(unit) = ctx.unit_mut(&nid) {
                    unit.position = None;
                }
            }
        }
        ctx.refresh_fog();
    }
    ctx.phase = PhaseController::new(db.teams.iter().map(|t| t.nid.clone()).collect());
    ctx.phase.set_team_index(snap.team_index);

    (ctx, snap.state_stack.clone())
}
