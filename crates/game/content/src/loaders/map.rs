//! Tilemap and movement-cost loaders.
//!
//! Tilemaps use a sparse RON format: a default terrain plus explicit
//! overrides, matching how editors export them. The movement cost table
//! is the M×N grid over movement groups × terrain.

use std::path::Path;

use emblem_core::{MovementCostTable, Nid, TilemapDef};
use serde::{Deserialize, Serialize};

use crate::loaders::{LoadResult, parse_ron};

/// Sparse tilemap format for RON files.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct TilemapRon {
    nid: String,
    dimensions: (i32, i32),
    default_terrain: String,
    /// (x, y, terrain) overrides on top of the default fill.
    tiles: Vec<(i32, i32, String)>,
}

/// Loader for tilemap collections.
pub struct TilemapLoader;

impl TilemapLoader {
    /// Loads every tilemap in one RON file.
    pub fn load(path: &Path) -> LoadResult<Vec<TilemapDef>> {
        let raw: Vec<TilemapRon> = parse_ron(path)?;
        Ok(raw.into_iter().map(Self::build).collect())
    }

    fn build(raw: TilemapRon) -> TilemapDef {
        let (width, height) = raw.dimensions;
        let mut def = TilemapDef::filled(raw.nid, width, height, raw.default_terrain);
        for (x, y, terrain) in raw.tiles {
            if x >= 0 && y >= 0 && x < width && y < height {
                def.terrain[(y * width + x) as usize] = Nid::new(terrain);
            } else {
                tracing::warn!(%x, %y, "tile override out of bounds, skipping");
            }
        }
        def
    }
}

/// Grid format for the movement cost table.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct McostRon {
    groups: Vec<String>,
    terrains: Vec<String>,
    /// `costs[group_idx][terrain_idx]`.
    costs: Vec<Vec<i32>>,
}

/// Loader for the movement cost grid.
pub struct McostLoader;

impl McostLoader {
    pub fn load(path: &Path) -> LoadResult<MovementCostTable> {
        let raw: McostRon = parse_ron(path)?;
        let mut table = MovementCostTable::new();
        for (gi, group) in raw.groups.iter().enumerate() {
            let Some(row) = raw.costs.get(gi) else {
                tracing::warn!(%group, "missing cost row, group is impassable everywhere");
                continue;
            };
            for (ti, terrain) in raw.terrains.iter().enumerate() {
                let cost = row.get(ti).copied().unwrap_or(emblem_core::EngineConfig::IMPASSABLE);
                table.set(group.as_str(), terrain.as_str(), cost);
            }
        }
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn tilemap_overrides_apply() {
        let file = write_temp(
            r#"[
                (
                    nid: "m1",
                    dimensions: (3, 2),
                    default_terrain: "plains",
                    tiles: [(1, 0, "forest"), (9, 9, "forest")],
                ),
            ]"#,
        );
        let maps = TilemapLoader::load(file.path()).unwrap();
        assert_eq!(maps.len(), 1);
        let map = &maps[0];
        assert_eq!(map.terrain[1], Nid::new("forest"));
        assert_eq!(map.terrain[0], Nid::new("plains"));
        assert_eq!(map.terrain.len(), 6);
    }

    #[test]
    fn mcost_grid_round_trip() {
        let file = write_temp(
            r#"(
                groups: ["infantry", "cavalry"],
                terrains: ["plains", "forest"],
                costs: [
                    [1, 2],
                    [1, 3],
                ],
            )"#,
        );
        let table = McostLoader::load(file.path()).unwrap();
        assert_eq!(table.cost(&Nid::new("cavalry"), &Nid::new("forest")), 3);
        assert_eq!(table.cost(&Nid::new("infantry"), &Nid::new("plains")), 1);
    }
}
