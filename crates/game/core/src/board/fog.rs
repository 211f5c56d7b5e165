//! Fog-of-war recomputation.
//!
//! Masks are rebuilt from scratch after every unit move or removal; the
//! board only stores the result. A team's mask is the union of the sight
//! of every unit on an allied team, plus tiles inside lit (`Fog`) regions.

use std::collections::{BTreeMap, VecDeque};

use crate::board::Board;
use crate::common::{Coord, Nid};
use crate::data::{Database, RegionKind};
use crate::unit::Unit;

/// Rebuilds every team's visibility mask.
pub fn recompute(board: &mut Board, db: &Database, units: &BTreeMap<Nid, Unit>) {
    if !board.fog_active {
        return;
    }

    let lit: Vec<Coord> = lit_tiles(board);

    for team in db.teams.iter().map(|t| t.nid.clone()).collect::<Vec<_>>() {
        let mut mask = board.blank_mask();

        for unit in units.values() {
            let Some(pos) = unit.position else { continue };
            if !db.team(&team).map(|t| t.is_allied_with(&unit.team)).unwrap_or(false) {
                continue;
            }
            for tile in visible_from(board, pos, unit.sight_range(db)) {
                board.mark_visible(&mut mask, tile);
            }
        }

        for &tile in &lit {
            board.mark_visible(&mut mask, tile);
        }

        board.set_fog_mask(team, mask);
    }
}

fn lit_tiles(board: &Board) -> Vec<Coord> {
    let mut tiles = Vec::new();
    for region in board.regions.iter().filter(|r| r.kind == RegionKind::Fog) {
        for dy in 0..region.size.1 {
            for dx in 0..region.size.0 {
                tiles.push(Coord::new(region.position.x + dx, region.position.y + dy));
            }
        }
    }
    tiles
}

/// Breadth-first sight spread. Opaque tiles are themselves visible but
/// block sight beyond them.
fn visible_from(board: &Board, origin: Coord, radius: i32) -> Vec<Coord> {
    let mut seen = vec![origin];
    let mut frontier = VecDeque::new();
    frontier.push_back((origin, 0));
    let mut visited = std::collections::BTreeSet::new();
    visited.insert(origin);

    while let Some((pos, depth)) = frontier.pop_front() {
        if depth >= radius {
            continue;
        }
        for next in pos.neighbors() {
            if !board.in_bounds(next) || !visited.insert(next) {
                continue;
            }
            seen.push(next);
            let opaque = board.tile(next).map(|t| t.opaque).unwrap_or(false);
            if !opaque {
                frontier.push_back((next, depth + 1));
            }
        }
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{ClassDef, MovementCostTable, TeamDef, TerrainDef, TilemapDef};
    use crate::unit::UnitFlags;

    fn setup() -> (Database, Board, BTreeMap<Nid, Unit>) {
        let mut db = Database::default();
        db.terrain.insert(
            Nid::new("plains"),
            TerrainDef {
                nid: Nid::new("plains"),
                ..TerrainDef::default()
            },
        );
        db.terrain.insert(
            Nid::new("wall"),
            TerrainDef {
                nid: Nid::new("wall"),
                opaque: true,
                ..TerrainDef::default()
            },
        );
        db.classes.insert(
            Nid::new("scout"),
            ClassDef {
                nid: Nid::new("scout"),
                sight_range: Some(2),
                ..ClassDef::default()
            },
        );
        db.teams = vec![
            TeamDef {
                nid: Nid::new("player"),
                player_control: true,
                ..TeamDef::default()
            },
            TeamDef {
                nid: Nid::new("enemy"),
                ..TeamDef::default()
            },
        ];
        db.mcost = MovementCostTable::new();

        let tilemap = TilemapDef::filled("map", 7, 7, "plains");
        let mut board = Board::from_tilemap(&db, &tilemap);
        board.fog_active = true;

        let mut unit = Unit {
            nid: Nid::new("scout1"),
            name: "Scout".into(),
            team: Nid::new("player"),
            class: Nid::new("scout"),
            level: 1,
            exp: 0,
            stats: Default::default(),
            current_hp: 1,
            growths: Default::default(),
            items: Default::default(),
            skills: Vec::new(),
            wexp: Default::default(),
            position: Some(Coord::new(3, 3)),
            flags: UnitFlags::empty(),
            rescuing: None,
            rescued_by: None,
            statuses: Vec::new(),
            party: Nid::default(),
            portrait: Nid::default(),
            affinity: Nid::default(),
            ai: None,
            persistent: false,
        };
        board.set_unit(Coord::new(3, 3), unit.nid.clone()).unwrap();
        unit.position = Some(Coord::new(3, 3));

        let mut units = BTreeMap::new();
        units.insert(unit.nid.clone(), unit);
        (db, board, units)
    }

    #[test]
    fn sight_radius_is_respected() {
        let (db, mut board, units) = setup();
        recompute(&mut board, &db, &units);

        let player = Nid::new("player");
        assert!(board.fog_visible(&player, Coord::new(3, 3)));
        assert!(board.fog_visible(&player, Coord::new(3, 1)));
        assert!(!board.fog_visible(&player, Coord::new(3, 0)));
        assert!(!board.fog_visible(&player, Coord::new(0, 0)));
    }

    #[test]
    fn enemy_team_has_its_own_mask() {
        let (db, mut board, units) = setup();
        recompute(&mut board, &db, &units);
        // No enemy units anywhere, so the enemy sees nothing.
        assert!(!board.fog_visible(&Nid::new("enemy"), Coord::new(3, 3)));
    }

    #[test]
    fn opaque_tiles_block_sight() {
        let (db, mut board, units) = setup();
        board
            .set_terrain(&db, Coord::new(4, 3), Nid::new("wall"))
            .unwrap();
        recompute(&mut board, &db, &units);

        let player = Nid::new("player");
        // The wall itself is visible, the tile behind it is not.
        assert!(board.fog_visible(&player, Coord::new(4, 3)));
        assert!(!board.fog_visible(&player, Coord::new(5, 3)));
    }
}
