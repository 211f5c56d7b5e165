//! Level and event registry loaders with reference validation.

use std::path::Path;

use emblem_core::{Database, EventPrefab, LevelPrefab};

use crate::loaders::{LoadResult, parse_ron};

/// Loader for the campaign's level prefabs.
pub struct LevelLoader;

impl LevelLoader {
    /// Loads the level list in campaign order.
    pub fn load(path: &Path) -> LoadResult<Vec<LevelPrefab>> {
        parse_ron(path)
    }

    /// Drops levels whose tilemap is unknown; a bad level must not take
    /// the whole campaign down.
    pub fn validate(levels: Vec<LevelPrefab>, db: &Database) -> Vec<LevelPrefab> {
        levels
            .into_iter()
            .filter(|level| {
                let known = db.tilemaps.contains_key(&level.tilemap);
                if !known {
                    tracing::warn!(
                        level = %level.nid,
                        tilemap = %level.tilemap,
                        "level references unknown tilemap, dropping"
                    );
                }
                known
            })
            .collect()
    }
}

/// Loader for event prefabs. Source lines are parsed lazily at
/// activation; here only the shape is read.
pub struct EventLoader;

impl EventLoader {
    pub fn load(path: &Path) -> LoadResult<Vec<EventPrefab>> {
        parse_ron(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn event_registry_parses() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(
            br#"[
                (
                    nid: "intro",
                    trigger: "level_start",
                    level_nid: Some("ch1"),
                    condition: "",
                    only_once: true,
                    priority: 10,
                    source: ["speak;Hero;We move at dawn."],
                ),
            ]"#,
        )
        .unwrap();
        let events = EventLoader::load(file.path()).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].trigger, "level_start");
        assert!(events[0].only_once);
    }
}
