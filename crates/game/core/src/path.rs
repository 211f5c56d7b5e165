//! Pathfinding over the board's movement-cost grid.
//!
//! Two algorithms share the same cost abstraction: Dijkstra flood-fill
//! for the reachable set within a movement budget, and A* for shortest
//! paths. Both are deterministic: the priority queue orders on
//! `(priority, heuristic, insertion order)` so equal-cost frontiers pop
//! in insertion order every run.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap};

use crate::board::Board;
use crate::common::{Coord, Nid};
use crate::data::Database;

/// Read-only view combining board terrain with one movement group's costs.
pub struct CostGrid<'a> {
    board: &'a Board,
    db: &'a Database,
    group: Nid,
}

impl<'a> CostGrid<'a> {
    pub fn new(board: &'a Board, db: &'a Database, group: Nid) -> Self {
        Self { board, db, group }
    }

    /// Cost of entering a tile. At or above the impassable sentinel the
    /// tile cannot be entered by this movement group.
    pub fn cost(&self, pos: Coord) -> i32 {
        self.board.movement_cost(self.db, &self.group, pos)
    }

    pub fn in_bounds(&self, pos: Coord) -> bool {
        self.board.in_bounds(pos)
    }

    fn enterable(&self, pos: Coord) -> bool {
        self.in_bounds(pos) && self.cost(pos) < crate::EngineConfig::IMPASSABLE
    }
}

/// Result of a Dijkstra flood-fill: reached tiles with accumulated cost
/// and predecessor links for path reconstruction.
#[derive(Clone, Debug, Default)]
pub struct ReachableSet {
    budget: i32,
    costs: BTreeMap<Coord, i32>,
    parents: BTreeMap<Coord, Coord>,
}

impl ReachableSet {
    pub fn contains(&self, pos: Coord) -> bool {
        self.costs.contains_key(&pos)
    }

    /// Accumulated movement cost from the start to a reached tile.
    pub fn cost_to(&self, pos: Coord) -> Option<i32> {
        self.costs.get(&pos).copied()
    }

    /// Remaining movement budget after stopping on a reached tile.
    pub fn remaining(&self, pos: Coord) -> Option<i32> {
        self.cost_to(pos).map(|c| self.budget - c)
    }

    /// Tiles in deterministic (row-major key) order.
    pub fn tiles(&self) -> impl Iterator<Item = Coord> + '_ {
        self.costs.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.costs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.costs.is_empty()
    }

    /// Reconstructs the path from the start to a reached tile, inclusive
    /// of both endpoints.
    pub fn path_to(&self, pos: Coord) -> Option<Vec<Coord>> {
        if !self.contains(pos) {
            return None;
        }
        let mut path = vec![pos];
        let mut cursor = pos;
        while let Some(&parent) = self.parents.get(&cursor) {
            path.push(parent);
            cursor = parent;
        }
        path.reverse();
        Some(path)
    }
}

/// Flood-fills every tile reachable from `start` within `budget`.
///
/// Every tile on a path, including the destination, must satisfy
/// `passable`; the start tile is always included. With budget 0 the
/// result is exactly `{start}`.
pub fn dijkstra(
    grid: &CostGrid<'_>,
    start: Coord,
    budget: i32,
    passable: impl Fn(Coord) -> bool,
) -> ReachableSet {
    let mut out = ReachableSet {
        budget,
        ..ReachableSet::default()
    };
    out.costs.insert(start, 0);

    let mut heap = BinaryHeap::new();
    let mut order: u64 = 0;
    heap.push(Reverse((0, order, start)));

    while let Some(Reverse((cost, _, pos))) = heap.pop() {
        if out.costs.get(&pos).copied().unwrap_or(i32::MAX) < cost {
            continue;
        }
        for next in pos.neighbors() {
            if !grid.enterable(next) || !passable(next) {
                continue;
            }
            let next_cost = cost + grid.cost(next);
            if next_cost > budget {
                continue;
            }
            if next_cost < out.costs.get(&next).copied().unwrap_or(i32::MAX) {
                out.costs.insert(next, next_cost);
                out.parents.insert(next, pos);
                order += 1;
                heap.push(Reverse((next_cost, order, next)));
            }
        }
    }
    out
}

/// Heuristic scale. Costs are multiplied by this so the cross-product
/// tie-break term stays integral at one-thousandth of a tile.
const H_SCALE: i64 = 1000;

fn heuristic(pos: Coord, start: Coord, goal: Coord) -> i64 {
    let manhattan = pos.distance(goal) as i64;
    // Cross product of (pos→goal) with (start→goal) breaks ties in favor
    // of tiles near the straight line between the endpoints.
    let d1x = (pos.x - goal.x) as i64;
    let d1y = (pos.y - goal.y) as i64;
    let d2x = (start.x - goal.x) as i64;
    let d2y = (start.y - goal.y) as i64;
    let cross = (d1x * d2y - d2x * d1y).abs();
    manhattan * H_SCALE + cross
}

/// A* shortest path from `start` to `goal`, inclusive of both endpoints.
///
/// The goal tile is always considered passable for termination purposes
/// even when occupied, so an attack destination can be pathed to. With
/// `adj_good_enough` the search finishes on any tile adjacent to the
/// goal. Nodes whose accumulated cost exceeds `cost_limit` are pruned;
/// returns `None` when no admissible path exists.
pub fn astar(
    grid: &CostGrid<'_>,
    start: Coord,
    goal: Coord,
    passable: impl Fn(Coord) -> bool,
    adj_good_enough: bool,
    cost_limit: i32,
) -> Option<Vec<Coord>> {
    let done = |pos: Coord| pos == goal || (adj_good_enough && pos.is_adjacent(goal));
    if done(start) {
        return Some(vec![start]);
    }

    let mut g_costs: BTreeMap<Coord, i32> = BTreeMap::new();
    g_costs.insert(start, 0);
    let mut parents: BTreeMap<Coord, Coord> = BTreeMap::new();

    // Min-heap on (f, h, insertion order); Reverse flips the max-heap.
    let mut heap = BinaryHeap::new();
    let mut order: u64 = 0;
    heap.push(Reverse((heuristic(start, start, goal), heuristic(start, start, goal), order, start)));

    while let Some(Reverse((_, _, _, pos))) = heap.pop() {
        if done(pos) {
            let mut path = vec![pos];
            let mut cursor = pos;
            while let Some(&parent) = parents.get(&cursor) {
                path.push(parent);
                cursor = parent;
            }
            path.reverse();
            return Some(path);
        }

        let g = g_costs.get(&pos).copied().unwrap_or(i32::MAX);
        for next in pos.neighbors() {
            if !grid.in_bounds(next) {
                continue;
            }
            // The goal is terminal, so occupancy there is irrelevant.
            if next != goal && (!grid.enterable(next) || !passable(next)) {
                continue;
            }
            if next == goal && grid.cost(next) >= crate::EngineConfig::IMPASSABLE && !adj_good_enough
            {
                // Terrain nobody can enter is still a wall even as a goal.
                continue;
            }
            let next_g = g + grid.cost(next).min(crate::EngineConfig::IMPASSABLE);
            if next_g > cost_limit {
                continue;
            }
            if next_g < g_costs.get(&next).copied().unwrap_or(i32::MAX) {
                g_costs.insert(next, next_g);
                parents.insert(next, pos);
                let h = heuristic(next, start, goal);
                order += 1;
                heap.push(Reverse((next_g as i64 * H_SCALE + h, h, order, next)));
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{MovementCostTable, TerrainDef, TilemapDef};

    fn grass_world(width: i32, height: i32) -> (Database, Board) {
        let mut db = Database::default();
        db.terrain.insert(
            Nid::new("grass"),
            TerrainDef {
                nid: Nid::new("grass"),
                ..TerrainDef::default()
            },
        );
        let mut mcost = MovementCostTable::new();
        mcost.set("infantry", "grass", 1);
        db.mcost = mcost;
        let board = Board::from_tilemap(&db, &TilemapDef::filled("m", width, height, "grass"));
        (db, board)
    }

    #[test]
    fn dijkstra_budget_zero_returns_start_only() {
        let (db, board) = grass_world(5, 5);
        let grid = CostGrid::new(&board, &db, Nid::new("infantry"));
        let reach = dijkstra(&grid, Coord::new(2, 2), 0, |_| true);
        assert_eq!(reach.len(), 1);
        assert!(reach.contains(Coord::new(2, 2)));
        assert_eq!(reach.remaining(Coord::new(2, 2)), Some(0));
    }

    #[test]
    fn dijkstra_respects_budget_and_blockers() {
        // 5x5 grass, unit at (0,0) with 5 movement, enemy blocking (2,2).
        let (db, board) = grass_world(5, 5);
        let grid = CostGrid::new(&board, &db, Nid::new("infantry"));
        let enemy = Coord::new(2, 2);
        let reach = dijkstra(&grid, Coord::new(0, 0), 5, |p| p != enemy);

        assert!(!reach.contains(Coord::new(4, 4))); // cost 8
        assert!(!reach.contains(Coord::new(2, 4))); // cost 6 around the block
        assert_eq!(reach.cost_to(Coord::new(1, 2)), Some(3));
        assert_eq!(reach.cost_to(Coord::new(2, 1)), Some(3));
        assert!(!reach.contains(enemy));
        assert_eq!(reach.cost_to(Coord::new(3, 2)), Some(5)); // via (3,1)
    }

    #[test]
    fn dijkstra_never_exceeds_budget() {
        let (db, board) = grass_world(6, 6);
        let grid = CostGrid::new(&board, &db, Nid::new("infantry"));
        let start = Coord::new(0, 0);
        let reach = dijkstra(&grid, start, 4, |_| true);
        for tile in reach.tiles() {
            assert!(reach.cost_to(tile).unwrap() <= 4);
            assert!(start.distance(tile) <= 4);
        }
    }

    #[test]
    fn dijkstra_paths_reconstruct() {
        let (db, board) = grass_world(5, 5);
        let grid = CostGrid::new(&board, &db, Nid::new("infantry"));
        let reach = dijkstra(&grid, Coord::new(0, 0), 4, |_| true);
        let path = reach.path_to(Coord::new(2, 2)).unwrap();
        assert_eq!(path.first(), Some(&Coord::new(0, 0)));
        assert_eq!(path.last(), Some(&Coord::new(2, 2)));
        assert_eq!(path.len(), 5);
        for pair in path.windows(2) {
            assert!(pair[0].is_adjacent(pair[1]));
        }
    }

    #[test]
    fn astar_trivial_and_blocked() {
        let (db, board) = grass_world(5, 5);
        let grid = CostGrid::new(&board, &db, Nid::new("infantry"));

        let same = astar(&grid, Coord::new(1, 1), Coord::new(1, 1), |_| true, false, 99);
        assert_eq!(same, Some(vec![Coord::new(1, 1)]));

        // Wall off the right half.
        let blocked = astar(
            &grid,
            Coord::new(0, 0),
            Coord::new(4, 0),
            |p| p.x < 2,
            false,
            99,
        );
        assert_eq!(blocked, None);
    }

    #[test]
    fn astar_goal_is_passable_even_when_occupied() {
        let (db, board) = grass_world(5, 5);
        let grid = CostGrid::new(&board, &db, Nid::new("infantry"));
        let goal = Coord::new(3, 0);
        // Predicate excludes the goal tile (an enemy stands there).
        let path = astar(&grid, Coord::new(0, 0), goal, |p| p != goal, false, 99).unwrap();
        assert_eq!(path.last(), Some(&goal));
        assert_eq!(path.len(), 4);
    }

    #[test]
    fn astar_adjacent_termination() {
        let (db, board) = grass_world(5, 5);
        let grid = CostGrid::new(&board, &db, Nid::new("infantry"));
        let goal = Coord::new(4, 4);
        let path = astar(&grid, Coord::new(0, 4), goal, |p| p != goal, true, 99).unwrap();
        let end = *path.last().unwrap();
        assert!(end.is_adjacent(goal));
        assert_eq!(path.len(), 4); // (0,4) (1,4) (2,4) (3,4)
    }

    #[test]
    fn astar_cost_limit_prunes() {
        let (db, board) = grass_world(9, 1);
        let grid = CostGrid::new(&board, &db, Nid::new("infantry"));
        let path = astar(&grid, Coord::new(0, 0), Coord::new(8, 0), |_| true, false, 4);
        assert_eq!(path, None);
        let ok = astar(&grid, Coord::new(0, 0), Coord::new(4, 0), |_| true, false, 4);
        assert!(ok.is_some());
    }

    #[test]
    fn astar_prefers_straight_lines() {
        let (db, board) = grass_world(7, 7);
        let grid = CostGrid::new(&board, &db, Nid::new("infantry"));
        // Straight horizontal corridor: the tie-break keeps y fixed.
        let path = astar(&grid, Coord::new(0, 3), Coord::new(6, 3), |_| true, false, 99).unwrap();
        assert!(path.iter().all(|p| p.y == 3));
    }
}
