//! Snapshot construction from the live world.

use std::collections::BTreeMap;

use emblem_core::{GameContext, ItemUid, Nid};

use super::{
    ItemRecord, LevelRecord, PartyRecord, SkillRecord, SnapshotRecord, UnitRecord,
    convoy_item_key, orphan_item_key, unit_item_key,
};

/// Builds a self-contained snapshot. `state_stack` comes from the state
/// machine (names only, bottom to top).
pub fn build(ctx: &GameContext, state_stack: Vec<String>) -> SnapshotRecord {
    // Every item gets a deterministic key derived from where it sits.
    let mut item_keys: BTreeMap<ItemUid, String> = BTreeMap::new();
    for unit in ctx.units.values() {
        for (slot, uid) in unit.items.iter().enumerate() {
            if let Some(item) = ctx.item(*uid) {
                item_keys.insert(*uid, unit_item_key(&unit.nid, &item.nid, slot));
            }
        }
    }
    for party in ctx.parties.values() {
        for (idx, uid) in party.convoy.iter().enumerate() {
            if let Some(item) = ctx.item(*uid) {
                item_keys.insert(*uid, convoy_item_key(&party.nid, &item.nid, idx));
            }
        }
    }
    for uid in ctx.items.keys() {
        item_keys
            .entry(*uid)
            .or_insert_with(|| orphan_item_key(uid.0));
    }

    let items: Vec<ItemRecord> = ctx
        .items
        .values()
        .map(|item| ItemRecord {
            key: item_keys
                .get(&item.uid)
                .cloned()
                .unwrap_or_else(|| orphan_item_key(item.uid.0)),
            uid: item.uid.0,
            nid: item.nid.clone(),
            name: item.name.clone(),
            icon: item.icon.clone(),
            uses: item.uses,
            max_uses: item.max_uses,
            droppable: item.droppable,
            owner: item.owner.clone(),
            components: item.components.clone(),
        })
        .collect();

    let mut skills: Vec<SkillRecord> = Vec::new();
    let units: Vec<UnitRecord> = ctx
        .units
        .values()
        .map(|unit| {
            for skill in &unit.skills {
                skills.push(SkillRecord {
                    key: format!("{}_{}", unit.nid, skill.nid),
                    owner: unit.nid.clone(),
                    nid: skill.nid.clone(),
                    name: skill.name.clone(),
                    icon: skill.icon.clone(),
                    components: skill.components.clone(),
                    data: skill.data.clone(),
                });
            }
            UnitRecord {
                nid: unit.nid.clone(),
                name: unit.name.clone(),
                team: unit.team.clone(),
                class: unit.class.clone(),
                level: unit.level,
                exp: unit.exp,
                stats: unit.stats,
                current_hp: unit.current_hp,
                growths: unit.growths,
                items: unit
                    .items
                    .iter()
                    .filter_map(|uid| item_keys.get(uid).cloned())
                    .collect(),
                skills: unit.skills.iter().map(|s| s.nid.clone()).collect(),
                wexp: unit.wexp.clone(),
                position: unit.position,
                flags: unit.flags,
                rescuing: unit.rescuing.clone(),
                rescued_by: unit.rescued_by.clone(),
                statuses: unit.statuses.clone(),
                party: unit.party.clone(),
                portrait: unit.portrait.clone(),
                affinity: unit.affinity.clone(),
                ai: unit.ai.clone(),
                persistent: unit.persistent,
            }
        })
        .collect();

    let parties: Vec<PartyRecord> = ctx
        .parties
        .values()
        .map(|party| PartyRecord {
            nid: party.nid.clone(),
            name: party.name.clone(),
            leader: party.leader.clone(),
            money: party.money,
            bexp: party.bexp,
            convoy: party
                .convoy
                .iter()
                .filter_map(|uid| item_keys.get(uid).cloned())
                .collect(),
        })
        .collect();

    let level = ctx.current_level.as_ref().map(|nid| {
        let board = &ctx.board;
        let terrain: Vec<Nid> = (0..board.height())
            .flat_map(|y| (0..board.width()).map(move |x| (x, y)))
            .map(|(x, y)| {
                board
                    .terrain(emblem_core::Coord::new(x, y))
                    .cloned()
                    .unwrap_or_default()
            })
            .collect();
        LevelRecord {
            nid: nid.clone(),
            width: board.width(),
            height: board.height(),
            terrain,
            regions: board.regions.clone(),
            fog_active: board.fog_active,
            objective: ctx.objective.clone(),
        }
    });

    SnapshotRecord {
        units,
        items,
        skills,
        level,
        turn_count: ctx.turn_count,
        playtime: ctx.playtime_ms,
        game_vars: ctx.game_vars.clone(),
        level_vars: ctx.level_vars.clone(),
        current_mode: ctx.mode.clone(),
        parties,
        current_party: ctx.current_party.clone(),
        state_stack,
        active_ai_groups: ctx.ai_groups.clone(),
        records: ctx.records.clone(),
        supports: ctx.supports.raw().clone(),
        market_items: ctx.market_items.clone(),
        base_convos: ctx.base_convos.clone(),
        talk_options: ctx.talk_options.clone(),
        fog_state: ctx.board.fog_active,
        roam_info: ctx.roam_info.clone(),
        overworld_registry: ctx.overworld.clone(),
        memory: ctx.memory.clone(),
        completed_events: ctx.events.completed().cloned().collect(),
        action_log: ctx.action_log.entries().to_vec(),
        turnwheel_uses: ctx.action_log.uses_remaining,
        team_index: ctx.phase.team_index(),
        rng_state: ctx.rng.state(),
        rng_mode: ctx.rng_mode,
        next_item_uid: ctx.next_item_uid(),
    }
}
