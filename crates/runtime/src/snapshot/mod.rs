//! Full-world snapshots.
//!
//! A snapshot is a plain, self-contained record of the live world.
//! Items are flattened into a keyed list (`"{unit}_{item}_{slot+1}"` for
//! inventories, `"convoy_{party}_{item}_{idx}"` for convoys) so a
//! restored world can be rebuilt without consulting unit internals;
//! rescue links are stored as peer nids and resolved in a second pass.

pub mod build;
pub mod restore;

pub use build::build;
pub use restore::restore;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use emblem_core::{
    Components, Coord, LogEntry, Memory, Nid, Objective, Overworld, Records, Region, RngMode,
    RoamInfo, Stats, UnitFlags, UnitStatus, Value,
};

/// One unit, every runtime field included.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UnitRecord {
    pub nid: Nid,
    pub name: String,
    pub team: Nid,
    pub class: Nid,
    pub level: i32,
    pub exp: i32,
    pub stats: Stats,
    pub current_hp: i32,
    pub growths: Stats,
    /// Item keys into [`SnapshotRecord::items`], in slot order.
    pub items: Vec<String>,
    /// Skill nids; instances live in [`SnapshotRecord::skills`].
    pub skills: Vec<Nid>,
    pub wexp: BTreeMap<Nid, i32>,
    pub position: Option<Coord>,
    pub flags: UnitFlags,
    /// Peer nids, relinked in a second pass after all units exist.
    pub rescuing: Option<Nid>,
    pub rescued_by: Option<Nid>,
    pub statuses: Vec<UnitStatus>,
    pub party: Nid,
    pub portrait: Nid,
    pub affinity: Nid,
    pub ai: Option<Nid>,
    pub persistent: bool,
}

/// One item with its full component map, so serialized-over-database
/// overrides (spent uses, editor tweaks) survive.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ItemRecord {
    pub key: String,
    /// Live uid, preserved so action-log references stay valid.
    pub uid: u32,
    pub nid: Nid,
    pub name: String,
    pub icon: Nid,
    pub uses: Option<i32>,
    pub max_uses: Option<i32>,
    pub droppable: bool,
    pub owner: Option<Nid>,
    pub components: Components,
}

/// One skill instance with its persistent per-unit data.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SkillRecord {
    pub key: String,
    pub owner: Nid,
    pub nid: Nid,
    pub name: String,
    pub icon: Nid,
    pub components: Components,
    pub data: BTreeMap<String, Value>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PartyRecord {
    pub nid: Nid,
    pub name: String,
    pub leader: Nid,
    pub money: i32,
    pub bexp: i32,
    /// Item keys into [`SnapshotRecord::items`].
    pub convoy: Vec<String>,
}

/// The live level: board terrain as it currently stands (terrain-change
/// events included) plus regions and the mutable objective.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LevelRecord {
    pub nid: Nid,
    pub width: i32,
    pub height: i32,
    /// Terrain per tile, row-major, as currently mutated.
    pub terrain: Vec<Nid>,
    pub regions: Vec<Region>,
    pub fog_active: bool,
    pub objective: Objective,
}

/// The whole world, self-contained.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SnapshotRecord {
    pub units: Vec<UnitRecord>,
    pub items: Vec<ItemRecord>,
    pub skills: Vec<SkillRecord>,
    pub level: Option<LevelRecord>,
    pub turn_count: i32,
    pub playtime: u64,
    pub game_vars: BTreeMap<String, Value>,
    pub level_vars: BTreeMap<String, Value>,
    pub current_mode: Nid,
    pub parties: Vec<PartyRecord>,
    pub current_party: Nid,
    /// State machine stack names only, bottom to top.
    pub state_stack: Vec<String>,
    pub active_ai_groups: Vec<Nid>,
    pub records: Records,
    pub supports: BTreeMap<String, i32>,
    pub market_items: Vec<Nid>,
    pub base_convos: BTreeMap<String, bool>,
    pub talk_options: Vec<(Nid, Nid)>,
    pub fog_state: bool,
    pub roam_info: Option<RoamInfo>,
    pub overworld_registry: Overworld,
    pub memory: Memory,
    /// Only-once events already consumed this playthrough.
    pub completed_events: Vec<Nid>,
    pub action_log: Vec<LogEntry>,
    pub turnwheel_uses: i32,
    pub team_index: usize,
    pub rng_state: u64,
    pub rng_mode: RngMode,
    pub next_item_uid: u32,
}

/// Deterministic key for an item sitting in a unit's inventory slot.
pub fn unit_item_key(unit: &Nid, item: &Nid, slot: usize) -> String {
    format!("{unit}_{item}_{}", slot + 1)
}

/// Deterministic key for a convoy item.
pub fn convoy_item_key(party: &Nid, item: &Nid, idx: usize) -> String {
    format!("convoy_{party}_{item}_{idx}")
}

/// Key for an item bound to neither a unit nor a convoy (kept alive for
/// the action log).
pub fn orphan_item_key(uid: u32) -> String {
    format!("orphan_{uid}")
}
