//! Assembles a [`Database`] from a project data directory.

use std::collections::BTreeMap;
use std::path::Path;

use emblem_core::{
    ClassDef, Constants, Database, DifficultyMode, FactionDef, ItemPrefab, LevelPrefab, Nid,
    SkillPrefab, SupportPrefab, TeamDef, TerrainDef, UnitPrefab, WeaponRankDef, WeaponTypeDef,
};

use crate::loaders::level::{EventLoader, LevelLoader};
use crate::loaders::map::{McostLoader, TilemapLoader};
use crate::loaders::{LoadResult, load_or_default};

/// One-stop loader for a whole data directory.
///
/// Expected layout (all files optional except `constants.ron`):
/// ```text
/// data/
///   constants.ron     difficulties.ron  teams.ron      factions.ron
///   classes.ron       items.ron         skills.ron     units.ron
///   terrain.ron       tilemaps.ron      weapons.ron    ranks.ron
///   mcost.ron         levels.ron        events.ron     supports.ron
/// ```
pub struct ContentFactory;

impl ContentFactory {
    pub fn load_database(dir: impl AsRef<Path>) -> LoadResult<Database> {
        let dir = dir.as_ref();
        let mut db = Database::default();

        db.constants = crate::loaders::parse_ron::<Constants>(&dir.join("constants.ron"))?;
        db.difficulties = load_or_default::<Vec<DifficultyMode>>(&dir.join("difficulties.ron"))?;
        db.teams = load_or_default::<Vec<TeamDef>>(&dir.join("teams.ron"))?;
        db.factions = keyed(load_or_default::<Vec<FactionDef>>(&dir.join("factions.ron"))?, |f| {
            f.nid.clone()
        });
        db.classes = keyed(load_or_default::<Vec<ClassDef>>(&dir.join("classes.ron"))?, |c| {
            c.nid.clone()
        });
        db.items = keyed(load_or_default::<Vec<ItemPrefab>>(&dir.join("items.ron"))?, |i| {
            i.nid.clone()
        });
        db.skills = keyed(load_or_default::<Vec<SkillPrefab>>(&dir.join("skills.ron"))?, |s| {
            s.nid.clone()
        });
        db.units = keyed(load_or_default::<Vec<UnitPrefab>>(&dir.join("units.ron"))?, |u| {
            u.nid.clone()
        });
        db.terrain = keyed(load_or_default::<Vec<TerrainDef>>(&dir.join("terrain.ron"))?, |t| {
            t.nid.clone()
        });

        let tilemap_path = dir.join("tilemaps.ron");
        if tilemap_path.exists() {
            db.tilemaps = keyed(TilemapLoader::load(&tilemap_path)?, |t| t.nid.clone());
        } else {
            tracing::warn!("no tilemaps.ron; levels will fail to load");
        }

        db.weapon_types = keyed(
            load_or_default::<Vec<WeaponTypeDef>>(&dir.join("weapons.ron"))?,
            |w| w.nid.clone(),
        );
        db.weapon_ranks = load_or_default::<Vec<WeaponRankDef>>(&dir.join("ranks.ron"))?;

        let mcost_path = dir.join("mcost.ron");
        if mcost_path.exists() {
            db.mcost = McostLoader::load(&mcost_path)?;
        } else {
            tracing::warn!("no mcost.ron; all terrain is impassable");
        }

        let levels_path = dir.join("levels.ron");
        if levels_path.exists() {
            let levels = LevelLoader::validate(LevelLoader::load(&levels_path)?, &db);
            db.level_order = levels.iter().map(|l| l.nid.clone()).collect();
            db.levels = keyed(levels, |l| l.nid.clone());
        }

        let events_path = dir.join("events.ron");
        if events_path.exists() {
            db.events = EventLoader::load(&events_path)?;
        }
        db.supports = load_or_default::<Vec<SupportPrefab>>(&dir.join("supports.ron"))?;

        tracing::info!(
            classes = db.classes.len(),
            items = db.items.len(),
            units = db.units.len(),
            levels = db.levels.len(),
            events = db.events.len(),
            "database loaded"
        );
        Ok(db)
    }
}

fn keyed<T>(values: Vec<T>, key: impl Fn(&T) -> Nid) -> BTreeMap<Nid, T> {
    values.into_iter().map(|v| (key(&v), v)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn loads_minimal_project() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("constants.ron"),
            r#"(
                title: "Test Campaign",
                game_nid: "testgame",
                turnwheel_uses: 3,
                turnwheel_enabled: true,
            )"#,
        )
        .unwrap();
        fs::write(
            dir.path().join("teams.ron"),
            r#"[
                (nid: "player", name: "Player", player_control: true, allies: []),
                (nid: "enemy", name: "Enemy", player_control: false, allies: []),
            ]"#,
        )
        .unwrap();

        let db = ContentFactory::load_database(dir.path()).unwrap();
        assert_eq!(db.constants.game_nid, Nid::new("testgame"));
        assert_eq!(db.teams.len(), 2);
        assert!(db.classes.is_empty());
    }

    #[test]
    fn missing_constants_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ContentFactory::load_database(dir.path()).is_err());
    }
}
