//! Enemy-turn decision making.
//!
//! The controller is deliberately plain: for each unit it surveys the
//! reachable set, scores every (tile, weapon, target) attack option by
//! expected damage, and otherwise marches toward the nearest enemy.
//! Every iteration order is deterministic (nid order, inventory order,
//! row-major tile order) so replays are stable.

use crate::combat::calc;
use crate::common::{Coord, Nid};
use crate::context::GameContext;
use crate::item::ItemUid;
use crate::path::{self, CostGrid};

/// Behavior tags understood by the controller.
pub mod behaviors {
    /// Move and attack (the default).
    pub const ATTACK: &str = "attack";
    /// Attack only without moving.
    pub const DEFEND: &str = "defend";
    /// Hold position and never act.
    pub const NONE: &str = "none";
}

/// One decided action for one unit.
#[derive(Clone, Debug, PartialEq)]
pub struct AiAction {
    pub unit: Nid,
    /// Path to walk, inclusive of the current tile. A single-element
    /// path means "stay put".
    pub path: Vec<Coord>,
    /// Combat to run after moving.
    pub attack: Option<(Nid, ItemUid)>,
}

/// Decides an action for one AI unit, or `None` to simply wait.
pub fn next_action(ctx: &GameContext, unit_nid: &Nid) -> Option<AiAction> {
    let unit = ctx.unit(unit_nid)?;
    let start = unit.position?;
    let behavior = unit.ai.as_ref().map(Nid::as_str).unwrap_or(behaviors::ATTACK);
    if behavior == behaviors::NONE {
        return None;
    }

    let group = ctx
        .db
        .class(&unit.class)
        .map(|c| c.movement_group.clone())
        .unwrap_or_default();
    let grid = CostGrid::new(&ctx.board, &ctx.db, group);

    // Traversal passes through allies but never enemies; stopping tiles
    // must be empty.
    let board = &ctx.board;
    let passable = |pos: Coord| match board.get_unit(pos) {
        Some(other) => !ctx
            .unit(other)
            .map(|o| ctx.db.are_hostile(&unit.team, &o.team))
            .unwrap_or(false),
        None => true,
    };

    let budget = if behavior == behaviors::DEFEND {
        0
    } else {
        unit.movement()
    };
    let reach = path::dijkstra(&grid, start, budget, passable);

    let enemies: Vec<&crate::unit::Unit> = ctx
        .units
        .values()
        .filter(|u| !u.is_dead() && u.position.is_some())
        .filter(|u| ctx.db.are_hostile(&unit.team, &u.team))
        .collect();

    // Best attack: highest expected damage, then lowest target HP, then
    // smallest target nid, then earliest reachable tile.
    let mut best: Option<(i32, i32, Nid, ItemUid, Coord)> = None;
    for target in &enemies {
        let Some(target_pos) = target.position else {
            continue;
        };
        for weapon_uid in ctx.weapons_of(unit) {
            let Some(weapon) = ctx.item(weapon_uid) else {
                continue;
            };
            for tile in reach.tiles() {
                if tile != start && ctx.board.is_occupied(tile) {
                    continue;
                }
                if !weapon.in_range(tile.distance(target_pos)) {
                    continue;
                }
                let edge = calc::triangle(&ctx.db, weapon, None);
                let chance =
                    calc::hit_chance(&ctx.db, &ctx.board, unit, weapon, target, None, edge);
                let damage = calc::strike_damage(&ctx.db, &ctx.board, unit, weapon, target, edge);
                let score = damage * chance / 100;
                let better = match &best {
                    None => true,
                    Some((s, hp, nid, _, _)) => {
                        (score, -target.current_hp, std::cmp::Reverse(&target.nid))
                            > (*s, *hp, std::cmp::Reverse(nid))
                    }
                };
                if better {
                    best = Some((score, -target.current_hp, target.nid.clone(), weapon_uid, tile));
                }
            }
        }
    }

    if let Some((_, _, target, weapon, tile)) = best {
        let path = reach.path_to(tile)?;
        return Some(AiAction {
            unit: unit_nid.clone(),
            path,
            attack: Some((target, weapon)),
        });
    }

    if behavior == behaviors::DEFEND {
        return None;
    }

    // No attack available: march toward the nearest enemy.
    let nearest = enemies
        .iter()
        .filter_map(|e| e.position.map(|p| (start.distance(p), e.nid.clone(), p)))
        .min()?;
    let full_path = path::astar(&grid, start, nearest.2, passable, true, APPROACH_COST_LIMIT)?;
    let walkable = truncate_to_reach(&full_path, &reach);
    if walkable.len() <= 1 {
        return None;
    }
    Some(AiAction {
        unit: unit_nid.clone(),
        path: walkable,
        attack: None,
    })
}

/// Search ceiling for approach paths; far beyond any map diameter.
const APPROACH_COST_LIMIT: i32 = 500;

/// Longest prefix of `path` whose every tile is in this turn's reach and
/// whose endpoint is stoppable.
fn truncate_to_reach(path: &[Coord], reach: &path::ReachableSet) -> Vec<Coord> {
    let mut out = Vec::new();
    for &tile in path {
        if reach.contains(tile) {
            out.push(tile);
        } else {
            break;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Board;
    use crate::data::{TilemapDef, UnitPrefab};
    use std::sync::Arc;

    fn setup() -> GameContext {
        let mut db = crate::context::tests::test_db();
        db.units.insert(
            Nid::new("bandit"),
            UnitPrefab {
                nid: Nid::new("bandit"),
                name: "Bandit".into(),
                class: Nid::new("fighter"),
                level: 1,
                items: vec![Nid::new("iron_sword")],
                ..UnitPrefab::default()
            },
        );
        let mut ctx = GameContext::new(Arc::new(db));
        ctx.board = Board::from_tilemap(&ctx.db, &TilemapDef::filled("m", 8, 8, "plains"));
        ctx
    }

    #[test]
    fn attacks_when_target_is_reachable() {
        let mut ctx = setup();
        let bandit = ctx.spawn_unit(&Nid::new("bandit"), &Nid::new("enemy")).unwrap();
        ctx.place_unit(&bandit, Coord::new(0, 0)).unwrap();
        let hero = ctx.spawn_unit(&Nid::new("hero"), &Nid::new("player")).unwrap();
        ctx.place_unit(&hero, Coord::new(3, 0)).unwrap();

        let action = next_action(&ctx, &bandit).unwrap();
        let (target, _) = action.attack.unwrap();
        assert_eq!(target, hero);
        // Ends adjacent to the hero.
        let end = *action.path.last().unwrap();
        assert_eq!(end.distance(Coord::new(3, 0)), 1);
    }

    #[test]
    fn marches_toward_distant_enemy() {
        let mut ctx = setup();
        let bandit = ctx.spawn_unit(&Nid::new("bandit"), &Nid::new("enemy")).unwrap();
        ctx.place_unit(&bandit, Coord::new(0, 0)).unwrap();
        let hero = ctx.spawn_unit(&Nid::new("hero"), &Nid::new("player")).unwrap();
        ctx.place_unit(&hero, Coord::new(7, 7)).unwrap();

        let action = next_action(&ctx, &bandit).unwrap();
        assert!(action.attack.is_none());
        assert!(action.path.len() > 1);
        let end = *action.path.last().unwrap();
        assert!(end.distance(Coord::new(7, 7)) < Coord::new(0, 0).distance(Coord::new(7, 7)));
    }

    #[test]
    fn defend_behavior_does_not_move() {
        let mut ctx = setup();
        let bandit = ctx.spawn_unit(&Nid::new("bandit"), &Nid::new("enemy")).unwrap();
        ctx.place_unit(&bandit, Coord::new(0, 0)).unwrap();
        ctx.unit_mut(&bandit).unwrap().ai = Some(Nid::new("defend"));
        let hero = ctx.spawn_unit(&Nid::new("hero"), &Nid::new("player")).unwrap();
        ctx.place_unit(&hero, Coord::new(5, 5)).unwrap();

        assert_eq!(next_action(&ctx, &bandit), None);

        ctx.move_unit(&hero, Coord::new(1, 0)).unwrap();
        let action = next_action(&ctx, &bandit).unwrap();
        assert_eq!(action.path, vec![Coord::new(0, 0)]);
        assert!(action.attack.is_some());
    }
}
