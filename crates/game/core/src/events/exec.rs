//! Command execution against the world.
//!
//! [`pump`] drains the top event's commands until it suspends or the
//! stack empties. Synchronous commands mutate the context immediately;
//! suspending commands park a [`PendingWait`] that the `event` game
//! state resolves from input or timers.

use crate::EngineConfig;
use crate::common::Value;
use crate::context::GameContext;
use crate::unit::UnitFlags;

use super::{Dialog, EventCommand, EventStatus, PendingWait};

/// Pumps the event stack. Returns `true` while events remain (running or
/// suspended); `false` once the stack is empty.
pub fn pump(ctx: &mut GameContext) -> bool {
    loop {
        if !ctx.events.reap_done() {
            return false;
        }
        match ctx.events.top().map(|e| e.status()) {
            Some(EventStatus::Waiting) => return true,
            Some(EventStatus::Running) => match ctx.events.advance() {
                Some(cmd) => execute(ctx, cmd),
                None => return true,
            },
            Some(EventStatus::Done) | None => {}
        }
    }
}

/// Executes one command against the world.
pub fn execute(ctx: &mut GameContext, cmd: EventCommand) {
    match cmd {
        EventCommand::Speak { speaker, text } => {
            ctx.events.current_dialog = Some(Dialog { speaker, text });
            ctx.events.pending_wait = Some(PendingWait::Dialog);
        }
        EventCommand::AddPortrait { nid, position, .. } => {
            ctx.events.portraits.insert(nid, position);
        }
        EventCommand::RemovePortrait { nid } => {
            ctx.events.portraits.remove(&nid);
        }
        EventCommand::Transition { .. } => {
            ctx.events.pending_wait = Some(PendingWait::Transition(EngineConfig::TRANSITION_TICKS));
        }
        EventCommand::Wait { duration_ms } => {
            let ticks = duration_ms.div_ceil(EngineConfig::FRAME_MS).max(1);
            ctx.events.pending_wait = Some(PendingWait::Timer(ticks));
        }
        EventCommand::SetCurrentHp { unit, value } => {
            let mut died = false;
            if let Some(u) = ctx.unit_mut(&unit) {
                u.current_hp = value.clamp(0, u.stats.hp);
                if u.current_hp == 0 && !u.is_dead() {
                    u.flags.insert(UnitFlags::DEAD);
                    died = true;
                }
            } else {
                tracing::warn!(%unit, "set_current_hp on unknown unit");
            }
            if died {
                ctx.remove_from_board(&unit);
                ctx.trigger_event(super::triggers::UNIT_DEATH);
            }
        }
        EventCommand::AddUnit { unit, tile, team } => {
            let nid = if ctx.units.contains_key(&unit) {
                if let Some(u) = ctx.unit_mut(&unit) {
                    u.team = team;
                    u.flags.remove(UnitFlags::DEAD);
                    if u.current_hp <= 0 {
                        u.current_hp = u.stats.hp;
                    }
                }
                unit
            } else {
                match ctx.spawn_unit(&unit, &team) {
                    Ok(nid) => nid,
                    Err(err) => {
                        tracing::warn!(%err, "add_unit skipped");
                        return;
                    }
                }
            };
            if let Err(err) = ctx.place_unit(&nid, tile) {
                tracing::warn!(unit = %nid, %err, "add_unit could not place unit");
            }
        }
        EventCommand::RemoveUnit { unit } => {
            ctx.remove_from_board(&unit);
            let persistent = ctx.unit(&unit).map(|u| u.persistent).unwrap_or(false);
            if !persistent {
                if let Some(u) = ctx.units.remove(&unit) {
                    for uid in u.items {
                        ctx.items.remove(&uid);
                    }
                }
            }
        }
        EventCommand::MoveUnit { unit, tile } => {
            let placed = ctx.unit(&unit).map(|u| u.position.is_some()).unwrap_or(false);
            let result = if placed {
                ctx.move_unit(&unit, tile)
            } else {
                ctx.place_unit(&unit, tile)
            };
            if let Err(err) = result {
                tracing::warn!(%unit, %err, "move_unit failed");
            }
        }
        EventCommand::GiveItem { unit, item } => match ctx.create_item(&item) {
            Ok(uid) => {
                if ctx.give_item(&unit, uid).is_err() {
                    let party = ctx.current_party.clone();
                    ctx.send_to_convoy(&party, uid);
                }
            }
            Err(err) => tracing::warn!(%err, "give_item skipped"),
        },
        EventCommand::GiveMoney { party, amount } => {
            if let Some(p) = ctx.parties.get_mut(&party) {
                p.money += amount;
            } else {
                tracing::warn!(%party, "give_money to unknown party");
            }
        }
        EventCommand::ChangeTeam { unit, team } => {
            if let Some(u) = ctx.unit_mut(&unit) {
                u.team = team;
                u.reset_turn_flags();
            }
            ctx.refresh_fog();
        }
        EventCommand::SetGameVar { key, value } => {
            ctx.game_vars.insert(key, value);
        }
        EventCommand::Music { nid } | EventCommand::Sound { nid } => {
            ctx.play_sound(nid);
        }
        EventCommand::EndSkip => {}
        EventCommand::WinGame => {
            ctx.level_vars
                .insert("_win_game".to_owned(), Value::Bool(true));
        }
        EventCommand::LoseGame => {
            ctx.level_vars
                .insert("_lose_game".to_owned(), Value::Bool(true));
        }
        EventCommand::MapAnim { nid, tile } => {
            ctx.anims.push((nid, tile));
        }
        EventCommand::SetTile { tile, terrain } => {
            let db = std::sync::Arc::clone(&ctx.db);
            if let Err(err) = ctx.board.set_terrain(&db, tile, terrain) {
                tracing::warn!(%err, "set_tile failed");
            }
            ctx.refresh_fog();
        }
        EventCommand::ChangeObjective { simple, win, loss } => {
            ctx.objective.simple = simple;
            ctx.objective.win = win;
            ctx.objective.loss = loss;
        }
        EventCommand::AddRegion(region) => {
            ctx.board.regions.push(region);
            ctx.refresh_fog();
        }
        EventCommand::RemoveRegion { nid } => {
            ctx.board.regions.retain(|r| r.nid != nid);
            ctx.refresh_fog();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{Coord, Nid};
    use crate::board::Board;
    use crate::data::TilemapDef;
    use crate::events::EventPrefab;
    use std::sync::Arc;

    fn ctx() -> GameContext {
        let db = crate::context::tests::test_db();
        let mut ctx = GameContext::new(Arc::new(db));
        ctx.board = Board::from_tilemap(&ctx.db, &TilemapDef::filled("m", 5, 5, "plains"));
        ctx
    }

    fn activate(ctx: &mut GameContext, source: Vec<&str>) {
        let prefab = EventPrefab {
            nid: Nid::new("e"),
            trigger: "t".into(),
            level_nid: None,
            condition: String::new(),
            only_once: false,
            priority: 0,
            source: source.into_iter().map(str::to_owned).collect(),
        };
        ctx.events.set_prefabs(vec![prefab]);
        ctx.events.activate(0);
    }

    #[test]
    fn synchronous_commands_run_to_completion() {
        let mut ctx = ctx();
        activate(
            &mut ctx,
            vec!["set_game_var;met_hero;true", "add_unit;hero;2,2;player", "win_game"],
        );
        assert!(!pump(&mut ctx));
        assert!(ctx.game_vars.get("met_hero").unwrap().truthy());
        assert_eq!(ctx.board.get_unit(Coord::new(2, 2)), Some(&Nid::new("hero")));
        assert!(ctx.level_vars.get("_win_game").unwrap().truthy());
    }

    #[test]
    fn speak_suspends_until_resolved() {
        let mut ctx = ctx();
        activate(&mut ctx, vec!["speak;Hero;Go!", "set_game_var;after;1"]);

        assert!(pump(&mut ctx));
        let dialog = ctx.events.current_dialog.clone().unwrap();
        assert_eq!(dialog.speaker, "Hero");
        assert_eq!(dialog.text, "Go!");
        assert!(!ctx.game_vars.contains_key("after"));

        ctx.events.resolve_wait();
        assert!(!pump(&mut ctx));
        assert!(ctx.game_vars.contains_key("after"));
    }

    #[test]
    fn wait_parks_a_timer() {
        let mut ctx = ctx();
        activate(&mut ctx, vec!["wait;100"]);
        assert!(pump(&mut ctx));
        assert!(matches!(
            ctx.events.pending_wait,
            Some(PendingWait::Timer(t)) if t >= 3
        ));
    }
}
