//! The spatial data model: terrain tiles, unit occupancy, fog masks.
//!
//! A unit's `position` field is the authoritative location; the board's
//! unit grid and position index are a reverse index kept in sync by the
//! context-level placement operations.

pub mod fog;

use std::collections::BTreeMap;

use crate::common::{Coord, Nid};
use crate::data::{Database, Region, TilemapDef};
use crate::error::{EngineError, ErrorSeverity};

/// Spatial operation failures.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum BoardError {
    #[error("position {0} is out of bounds")]
    InvalidPosition(Coord),

    #[error("tile {0} is already occupied")]
    TileOccupied(Coord),

    #[error("unit {0} is not on the board")]
    UnitNotPlaced(Nid),
}

impl EngineError for BoardError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            BoardError::InvalidPosition(_) => ErrorSeverity::Validation,
            BoardError::TileOccupied(_) => ErrorSeverity::Recoverable,
            BoardError::UnitNotPlaced(_) => ErrorSeverity::Validation,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            BoardError::InvalidPosition(_) => "invalid_position",
            BoardError::TileOccupied(_) => "tile_occupied",
            BoardError::UnitNotPlaced(_) => "unit_not_placed",
        }
    }
}

/// A single grid cell: terrain reference and opacity for line of sight.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Tile {
    pub terrain: Nid,
    pub opaque: bool,
}

/// Per-team visibility mask. Absent teams see everything.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FogMask {
    visible: Vec<bool>,
}

/// Grid of tiles plus the dynamic unit occupancy index.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Board {
    width: i32,
    height: i32,
    tiles: Vec<Tile>,
    unit_grid: Vec<Option<Nid>>,
    positions: BTreeMap<Nid, Coord>,
    fog: BTreeMap<Nid, FogMask>,
    /// Fog of war active for this level.
    pub fog_active: bool,
    pub regions: Vec<Region>,
}

impl Board {
    /// Builds a board from a tilemap definition, resolving tile opacity
    /// from the terrain registry. Unknown terrain nids stay transparent.
    pub fn from_tilemap(db: &Database, tilemap: &TilemapDef) -> Self {
        let tiles = tilemap
            .terrain
            .iter()
            .map(|nid| Tile {
                terrain: nid.clone(),
                opaque: db.terrain(nid).map(|t| t.opaque).unwrap_or(false),
            })
            .collect();
        Self {
            width: tilemap.width,
            height: tilemap.height,
            tiles,
            unit_grid: vec![None; (tilemap.width * tilemap.height) as usize],
            positions: BTreeMap::new(),
            fog: BTreeMap::new(),
            fog_active: false,
            regions: Vec::new(),
        }
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn in_bounds(&self, pos: Coord) -> bool {
        pos.x >= 0 && pos.y >= 0 && pos.x < self.width && pos.y < self.height
    }

    fn index(&self, pos: Coord) -> Option<usize> {
        self.in_bounds(pos)
            .then(|| (pos.y * self.width + pos.x) as usize)
    }

    /// Terrain nid at a tile; out-of-bounds reads return `None`.
    pub fn terrain(&self, pos: Coord) -> Option<&Nid> {
        self.index(pos).map(|i| &self.tiles[i].terrain)
    }

    pub fn tile(&self, pos: Coord) -> Option<&Tile> {
        self.index(pos).map(|i| &self.tiles[i])
    }

    /// Replaces terrain at a tile (terrain-change events).
    pub fn set_terrain(&mut self, db: &Database, pos: Coord, terrain: Nid) -> Result<(), BoardError> {
        let idx = self.index(pos).ok_or(BoardError::InvalidPosition(pos))?;
        self.tiles[idx].opaque = db.terrain(&terrain).map(|t| t.opaque).unwrap_or(false);
        self.tiles[idx].terrain = terrain;
        Ok(())
    }

    /// Movement cost for a movement group entering a tile.
    pub fn movement_cost(&self, db: &Database, group: &Nid, pos: Coord) -> i32 {
        match self.terrain(pos) {
            Some(terrain) => db.mcost.cost(group, terrain),
            None => crate::EngineConfig::IMPASSABLE,
        }
    }

    /// Unit nid occupying a tile; out-of-bounds reads return `None`.
    pub fn get_unit(&self, pos: Coord) -> Option<&Nid> {
        self.index(pos).and_then(|i| self.unit_grid[i].as_ref())
    }

    pub fn is_occupied(&self, pos: Coord) -> bool {
        self.get_unit(pos).is_some()
    }

    /// Position of a unit on the board, if placed.
    pub fn position_of(&self, unit: &Nid) -> Option<Coord> {
        self.positions.get(unit).copied()
    }

    /// Places a unit on a tile. Fails on out-of-bounds writes and on
    /// occupied tiles unless the occupant is the same unit.
    pub fn set_unit(&mut self, pos: Coord, unit: Nid) -> Result<(), BoardError> {
        let idx = self.index(pos).ok_or(BoardError::InvalidPosition(pos))?;
        if let Some(occupant) = &self.unit_grid[idx] {
            if *occupant != unit {
                return Err(BoardError::TileOccupied(pos));
            }
            return Ok(());
        }
        if let Some(old) = self.positions.insert(unit.clone(), pos) {
            if let Some(old_idx) = self.index(old) {
                self.unit_grid[old_idx] = None;
            }
        }
        self.unit_grid[idx] = Some(unit);
        Ok(())
    }

    /// Removes a unit from the board. No-op when the unit is not placed.
    pub fn remove_unit(&mut self, unit: &Nid) {
        if let Some(pos) = self.positions.remove(unit) {
            if let Some(idx) = self.index(pos) {
                self.unit_grid[idx] = None;
            }
        }
    }

    /// Moves a placed unit to a new tile, enforcing the occupancy rules.
    pub fn move_unit(&mut self, unit: &Nid, to: Coord) -> Result<(), BoardError> {
        if !self.positions.contains_key(unit) {
            return Err(BoardError::UnitNotPlaced(unit.clone()));
        }
        self.set_unit(to, unit.clone())
    }

    /// Iterates placed units in grid scan order (the deterministic "board
    /// order" consumed by the AI turn).
    pub fn units_in_board_order(&self) -> impl Iterator<Item = (Coord, &Nid)> {
        self.unit_grid.iter().enumerate().filter_map(|(i, cell)| {
            cell.as_ref().map(|nid| {
                (
                    Coord::new(i as i32 % self.width, i as i32 / self.width),
                    nid,
                )
            })
        })
    }

    // ------------------------------------------------------------------
    // Fog of war
    // ------------------------------------------------------------------

    /// Whether a team sees a tile. Teams without a mask see everything,
    /// as does everyone when fog is inactive.
    pub fn fog_visible(&self, team: &Nid, pos: Coord) -> bool {
        if !self.fog_active {
            return true;
        }
        let Some(idx) = self.index(pos) else {
            return false;
        };
        match self.fog.get(team) {
            Some(mask) => mask.visible.get(idx).copied().unwrap_or(false),
            None => true,
        }
    }

    pub(crate) fn set_fog_mask(&mut self, team: Nid, mask: FogMask) {
        self.fog.insert(team, mask);
    }

    pub(crate) fn blank_mask(&self) -> FogMask {
        FogMask {
            visible: vec![false; self.tiles.len()],
        }
    }

    pub(crate) fn mark_visible(&self, mask: &mut FogMask, pos: Coord) {
        if let Some(idx) = self.index(pos) {
            mask.visible[idx] = true;
        }
    }

    /// Regions of a given kind containing a tile.
    pub fn regions_at(&self, pos: Coord) -> impl Iterator<Item = &Region> {
        self.regions.iter().filter(move |r| r.contains(pos))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{MovementCostTable, TerrainDef};

    fn flat_board(width: i32, height: i32) -> (Database, Board) {
        let mut db = Database::default();
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
        let tilemap = TilemapDef::filled("map", width, height, "plains");
        let board = Board::from_tilemap(&db, &tilemap);
        (db, board)
    }

    #[test]
    fn set_and_move_maintain_both_indices() {
        let (_, mut board) = flat_board(4, 4);
        let unit = Nid::new("eirika");

        board.set_unit(Coord::new(1, 1), unit.clone()).unwrap();
        assert_eq!(board.get_unit(Coord::new(1, 1)), Some(&unit));
        assert_eq!(board.position_of(&unit), Some(Coord::new(1, 1)));

        board.move_unit(&unit, Coord::new(2, 3)).unwrap();
        assert_eq!(board.get_unit(Coord::new(1, 1)), None);
        assert_eq!(board.get_unit(Coord::new(2, 3)), Some(&unit));
        assert_eq!(board.position_of(&unit), Some(Coord::new(2, 3)));
    }

    #[test]
    fn move_back_restores_board() {
        let (_, mut board) = flat_board(4, 4);
        let unit = Nid::new("seth");
        board.set_unit(Coord::new(0, 0), unit.clone()).unwrap();
        let snapshot = board.clone();

        board.move_unit(&unit, Coord::new(3, 3)).unwrap();
        board.move_unit(&unit, Coord::new(0, 0)).unwrap();
        assert_eq!(board, snapshot);
    }

    #[test]
    fn occupied_tile_rejects_other_units() {
        let (_, mut board) = flat_board(4, 4);
        board.set_unit(Coord::new(1, 1), Nid::new("a")).unwrap();

        let err = board.set_unit(Coord::new(1, 1), Nid::new("b")).unwrap_err();
        assert_eq!(err, BoardError::TileOccupied(Coord::new(1, 1)));

        // Same unit is fine
        board.set_unit(Coord::new(1, 1), Nid::new("a")).unwrap();
    }

    #[test]
    fn out_of_bounds_semantics() {
        let (_, mut board) = flat_board(2, 2);
        assert_eq!(board.terrain(Coord::new(5, 0)), None);
        assert_eq!(board.get_unit(Coord::new(-1, 0)), None);
        let err = board.set_unit(Coord::new(2, 0), Nid::new("a")).unwrap_err();
        assert_eq!(err, BoardError::InvalidPosition(Coord::new(2, 0)));
    }

    #[test]
    fn movement_cost_reads_the_table() {
        let (db, board) = flat_board(2, 2);
        let group = Nid::new("infantry");
        assert_eq!(board.movement_cost(&db, &group, Coord::new(0, 0)), 1);
        assert!(board.movement_cost(&db, &group, Coord::new(9, 9)) >= 99);
    }
}
