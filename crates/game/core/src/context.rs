//! The game context: the single-owner world record.
//!
//! Every top-level container (units, items, board, variable stores,
//! event stack, action log) lives here, and state hooks receive
//! `&mut GameContext` instead of reaching for globals. Sub-systems
//! borrow read-only views (the pathfinder borrows the board, the
//! condition evaluator borrows the variable stores).

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::action_log::ActionLog;
use crate::board::{Board, BoardError, fog};
use crate::common::{Coord, Nid, Value};
use crate::data::{Database, Objective, WinKind};
use crate::error::{EngineError, ErrorSeverity};
use crate::events::{EventManager, VarView, triggers};
use crate::item::{Item, ItemUid, Skill};
use crate::machine::TransitionQueue;
use crate::party::Party;
use crate::records::{Overworld, Records, RoamInfo, SupportState};
use crate::rng::{GameRng, RngMode};
use crate::turn::PhaseController;
use crate::unit::{Unit, UnitFlags};

/// World-level operation failures: bad references into the registries or
/// the live maps.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum WorldError {
    #[error("unknown unit {0}")]
    UnknownUnit(Nid),

    #[error("unknown unit prefab {0}")]
    UnknownUnitPrefab(Nid),

    #[error("unknown class {0}")]
    UnknownClass(Nid),

    #[error("unknown level {0}")]
    UnknownLevel(Nid),

    #[error("unknown tilemap {0}")]
    UnknownTilemap(Nid),

    #[error("unknown item prefab {0}")]
    UnknownItem(Nid),

    #[error("inventory of {0} is full")]
    InventoryFull(Nid),

    #[error(transparent)]
    Board(#[from] BoardError),
}

impl EngineError for WorldError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            WorldError::UnknownUnit(_) | WorldError::InventoryFull(_) => ErrorSeverity::Validation,
            WorldError::Board(err) => err.severity(),
            _ => ErrorSeverity::Recoverable,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            WorldError::UnknownUnit(_) => "unknown_unit",
            WorldError::UnknownUnitPrefab(_) => "unknown_unit_prefab",
            WorldError::UnknownClass(_) => "unknown_class",
            WorldError::UnknownLevel(_) => "unknown_level",
            WorldError::UnknownTilemap(_) => "unknown_tilemap",
            WorldError::UnknownItem(_) => "unknown_item",
            WorldError::InventoryFull(_) => "inventory_full",
            WorldError::Board(err) => err.error_code(),
        }
    }
}

/// Cross-state hand-off memory. States stage intents here for the state
/// they transition to; the whole struct persists in snapshots.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Memory {
    /// Unit picked in the free state.
    pub selected_unit: Option<Nid>,
    /// Pre-move position, restored when the menu is cancelled.
    pub move_origin: Option<Coord>,
    /// Path chosen in the move state, consumed by the movement state.
    pub chosen_path: Option<Vec<Coord>>,
    /// State pushed after the movement animation completes.
    pub follow_up_state: Option<String>,
    /// Combat target staged by the targeting state.
    pub target: Option<Nid>,
    /// Weapon staged for the attack.
    pub weapon: Option<ItemUid>,
    /// Persistent highlight toggled by INFO in the free state.
    pub info_unit: Option<Nid>,
    /// Movement left for a canto re-entry into the move state.
    pub canto_budget: Option<i32>,
    /// Level queued by event finalization.
    pub next_level: Option<Nid>,
}

/// The one live world instance.
pub struct GameContext {
    pub db: Arc<Database>,
    pub board: Board,
    pub units: BTreeMap<Nid, Unit>,
    pub items: BTreeMap<ItemUid, Item>,
    next_item_uid: u32,
    pub parties: BTreeMap<Nid, Party>,
    pub current_party: Nid,
    pub current_level: Option<Nid>,
    pub objective: Objective,
    pub turn_count: i32,
    pub phase: PhaseController,
    pub game_vars: BTreeMap<String, Value>,
    pub level_vars: BTreeMap<String, Value>,
    /// Difficulty mode nid.
    pub mode: Nid,
    pub rng: GameRng,
    pub rng_mode: RngMode,
    pub events: EventManager,
    pub action_log: ActionLog,
    pub records: Records,
    pub supports: SupportState,
    pub overworld: Overworld,
    pub roam_info: Option<RoamInfo>,
    pub market_items: Vec<Nid>,
    /// Base conversation name → already seen.
    pub base_convos: BTreeMap<String, bool>,
    /// Pairs that may Talk this level.
    pub talk_options: Vec<(Nid, Nid)>,
    pub ai_groups: Vec<Nid>,
    pub memory: Memory,
    /// Deferred state transitions drained by the state machine.
    pub transitions: TransitionQueue,
    /// Sound cues for the host; drained each frame, ignorable.
    pub sounds: Vec<Nid>,
    /// Map animation cues (nid, tile) for the host; ignorable.
    pub anims: Vec<(Nid, Coord)>,
    pub cursor: Coord,
    pub playtime_ms: u64,
}

impl GameContext {
    pub fn new(db: Arc<Database>) -> Self {
        let phase = PhaseController::new(db.teams.iter().map(|t| t.nid.clone()).collect());
        let action_log = ActionLog::new(db.constants.turnwheel_uses);
        let events = EventManager::new(db.events.clone());
        Self {
            db,
            board: Board::default(),
            units: BTreeMap::new(),
            items: BTreeMap::new(),
            next_item_uid: 1,
            parties: BTreeMap::new(),
            current_party: Nid::default(),
            current_level: None,
            objective: Objective::default(),
            turn_count: 0,
            phase,
            game_vars: BTreeMap::new(),
            level_vars: BTreeMap::new(),
            mode: Nid::default(),
            rng: GameRng::default(),
            rng_mode: RngMode::default(),
            events,
            action_log,
            records: Records::default(),
            supports: SupportState::default(),
            overworld: Overworld::default(),
            roam_info: None,
            market_items: Vec::new(),
            base_convos: BTreeMap::new(),
            talk_options: Vec::new(),
            ai_groups: Vec::new(),
            memory: Memory::default(),
            transitions: TransitionQueue::default(),
            sounds: Vec::new(),
            anims: Vec::new(),
            cursor: Coord::ORIGIN,
            playtime_ms: 0,
        }
    }

    pub fn with_seed(db: Arc<Database>, seed: u64) -> Self {
        let mut ctx = Self::new(db);
        ctx.rng = GameRng::from_seed(seed);
        ctx
    }

    // ------------------------------------------------------------------
    // Lookups
    // ------------------------------------------------------------------

    pub fn unit(&self, nid: &Nid) -> Option<&Unit> {
        self.units.get(nid)
    }

    pub fn unit_mut(&mut self, nid: &Nid) -> Option<&mut Unit> {
        self.units.get_mut(nid)
    }

    pub fn item(&self, uid: ItemUid) -> Option<&Item> {
        self.items.get(&uid)
    }

    pub fn item_mut(&mut self, uid: ItemUid) -> Option<&mut Item> {
        self.items.get_mut(&uid)
    }

    /// Units on a team, in nid order.
    pub fn team_units(&self, team: &Nid) -> Vec<Nid> {
        self.units
            .values()
            .filter(|u| u.team == *team && !u.is_dead())
            .map(|u| u.nid.clone())
            .collect()
    }

    /// The first player-controlled team.
    pub fn player_team(&self) -> Nid {
        self.db
            .teams
            .iter()
            .find(|t| t.player_control)
            .map(|t| t.nid.clone())
            .unwrap_or_default()
    }

    /// Team whose fog mask the surface is drawn with.
    pub fn viewing_team(&self) -> Nid {
        self.player_team()
    }

    pub fn current_team(&self) -> Nid {
        self.phase.current_team().clone()
    }

    /// Whether the active phase belongs to a player-controlled team.
    pub fn is_player_phase(&self) -> bool {
        self.db
            .team(self.phase.current_team())
            .map(|t| t.player_control)
            .unwrap_or(false)
    }

    /// The weapon a unit would attack with: the first wielded weapon in
    /// inventory order.
    pub fn equipped_weapon(&self, unit: &Unit) -> Option<ItemUid> {
        unit.items
            .iter()
            .copied()
            .find(|uid| self.item(*uid).map(Item::is_weapon).unwrap_or(false))
    }

    /// All weapons a unit carries, in inventory order.
    pub fn weapons_of(&self, unit: &Unit) -> Vec<ItemUid> {
        unit.items
            .iter()
            .copied()
            .filter(|uid| self.item(*uid).map(Item::is_weapon).unwrap_or(false))
            .collect()
    }

    // ------------------------------------------------------------------
    // Item lifecycle
    // ------------------------------------------------------------------

    /// Instantiates an item prefab into the central map.
    pub fn create_item(&mut self, nid: &Nid) -> Result<ItemUid, WorldError> {
        let prefab = self
            .db
            .item(nid)
            .ok_or_else(|| WorldError::UnknownItem(nid.clone()))?;
        let uid = ItemUid(self.next_item_uid);
        self.next_item_uid += 1;
        self.items.insert(uid, Item::from_prefab(uid, prefab));
        Ok(uid)
    }

    /// Restores a serialized item, keeping the uid allocator ahead of it.
    pub fn adopt_item(&mut self, item: Item) {
        self.next_item_uid = self.next_item_uid.max(item.uid.0 + 1);
        self.items.insert(item.uid, item);
    }

    /// Puts an item into a unit's inventory, updating ownership.
    pub fn give_item(&mut self, unit_nid: &Nid, uid: ItemUid) -> Result<(), WorldError> {
        let unit = self
            .units
            .get_mut(unit_nid)
            .ok_or_else(|| WorldError::UnknownUnit(unit_nid.clone()))?;
        if unit.items.is_full() {
            return Err(WorldError::InventoryFull(unit_nid.clone()));
        }
        unit.items.push(uid);
        if let Some(item) = self.items.get_mut(&uid) {
            item.owner = Some(unit_nid.clone());
        }
        Ok(())
    }

    /// Moves an item into a party's convoy, clearing ownership.
    pub fn send_to_convoy(&mut self, party_nid: &Nid, uid: ItemUid) {
        if let Some(item) = self.items.get_mut(&uid) {
            item.owner = None;
        }
        if let Some(party) = self.parties.get_mut(party_nid) {
            party.convoy.push(uid);
        }
    }

    /// Removes a broken item from its owner's inventory while keeping it
    /// in the world map, so the action log can restore it on rewind.
    /// Returns the owner and slot it was removed from. Orphaned items are
    /// swept at level teardown.
    pub fn unbind_item(&mut self, uid: ItemUid) -> Option<(Nid, usize)> {
        let owner = self.items.get(&uid)?.owner.clone()?;
        let unit = self.units.get_mut(&owner)?;
        let slot = unit.items.iter().position(|&i| i == uid)?;
        unit.items.remove(slot);
        if let Some(item) = self.items.get_mut(&uid) {
            item.owner = None;
        }
        Some((owner, slot))
    }

    /// Reinserts a previously unbound item at its old slot.
    pub fn rebind_item(&mut self, uid: ItemUid, owner: &Nid, slot: usize) {
        if let Some(unit) = self.units.get_mut(owner) {
            if !unit.items.contains(&uid) && !unit.items.is_full() {
                unit.items.insert(slot.min(unit.items.len()), uid);
            }
        }
        if let Some(item) = self.items.get_mut(&uid) {
            item.owner = Some(owner.clone());
        }
    }

    /// Drops a broken item from its owner's inventory and the world.
    pub fn destroy_item(&mut self, uid: ItemUid) {
        if let Some(item) = self.items.remove(&uid) {
            if let Some(owner) = item.owner {
                if let Some(unit) = self.units.get_mut(&owner) {
                    unit.items.retain(|i| *i != uid);
                }
            } else {
                for party in self.parties.values_mut() {
                    party.convoy.retain(|&i| i != uid);
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Placement (board + unit.position stay in lockstep)
    // ------------------------------------------------------------------

    pub fn place_unit(&mut self, nid: &Nid, pos: Coord) -> Result<(), WorldError> {
        if !self.units.contains_key(nid) {
            return Err(WorldError::UnknownUnit(nid.clone()));
        }
        self.board.set_unit(pos, nid.clone())?;
        if let Some(unit) = self.units.get_mut(nid) {
            unit.position = Some(pos);
        }
        self.refresh_fog();
        Ok(())
    }

    pub fn remove_from_board(&mut self, nid: &Nid) {
        self.board.remove_unit(nid);
        if let Some(unit) = self.units.get_mut(nid) {
            unit.position = None;
        }
        self.refresh_fog();
    }

    pub fn move_unit(&mut self, nid: &Nid, to: Coord) -> Result<(), WorldError> {
        self.board.move_unit(nid, to)?;
        if let Some(unit) = self.units.get_mut(nid) {
            unit.position = Some(to);
        }
        self.refresh_fog();
        Ok(())
    }

    pub fn refresh_fog(&mut self) {
        if self.board.fog_active {
            let db = Arc::clone(&self.db);
            fog::recompute(&mut self.board, &db, &self.units);
        }
    }

    // ------------------------------------------------------------------
    // Unit spawning
    // ------------------------------------------------------------------

    /// Instantiates a unit prefab with its kit onto a team. Difficulty
    /// enemy bonuses apply to non-player-controlled teams.
    pub fn spawn_unit(&mut self, prefab_nid: &Nid, team: &Nid) -> Result<Nid, WorldError> {
        let db = Arc::clone(&self.db);
        let prefab = db
            .unit(prefab_nid)
            .ok_or_else(|| WorldError::UnknownUnitPrefab(prefab_nid.clone()))?;
        let class = db
            .class(&prefab.class)
            .ok_or_else(|| WorldError::UnknownClass(prefab.class.clone()))?;

        let mut unit = Unit::from_prefab(prefab, class, team.clone());
        unit.party = self.current_party.clone();

        let player_controlled = db.team(team).map(|t| t.player_control).unwrap_or(false);
        if !player_controlled {
            if let Some(mode) = db.difficulty(&self.mode) {
                unit.stats = unit.stats.plus(&mode.enemy_bonus);
                unit.current_hp = unit.stats.hp;
            }
        }

        for skill_nid in class.skills.iter().chain(prefab.skills.iter()) {
            match db.skill(skill_nid) {
                Some(skill) => unit.skills.push(Skill::from_prefab(skill)),
                None => {
                    tracing::warn!(unit = %prefab_nid, skill = %skill_nid, "unknown skill, skipping")
                }
            }
        }

        let nid = unit.nid.clone();
        self.units.insert(nid.clone(), unit);

        for item_nid in &prefab.items {
            match self.create_item(item_nid) {
                Ok(uid) => {
                    if let Err(err) = self.give_item(&nid, uid) {
                        tracing::warn!(unit = %nid, %err, "could not give starting item");
                        self.destroy_item(uid);
                    }
                }
                Err(err) => tracing::warn!(unit = %nid, %err, "unknown starting item, skipping"),
            }
        }
        Ok(nid)
    }

    // ------------------------------------------------------------------
    // Level lifecycle
    // ------------------------------------------------------------------

    /// Loads a level: rebuilds the board, spawns its units, installs the
    /// objective and regions, and fires `level_start`. Units that
    /// reference missing prefabs are skipped with a warning; persistent
    /// player units survive from the previous level.
    pub fn load_level(&mut self, level_nid: &Nid) -> Result<(), WorldError> {
        let db = Arc::clone(&self.db);
        let level = db
            .level(level_nid)
            .ok_or_else(|| WorldError::UnknownLevel(level_nid.clone()))?;
        let tilemap = db
            .tilemap(&level.tilemap)
            .ok_or_else(|| WorldError::UnknownTilemap(level.tilemap.clone()))?;

        self.teardown_level();

        self.board = Board::from_tilemap(&db, tilemap);
        self.board.regions = level.regions.clone();
        self.board.fog_active = level.fog;
        self.current_level = Some(level_nid.clone());
        self.objective = level.objective.clone();
        self.current_party = level.party.clone();
        self.parties
            .entry(level.party.clone())
            .or_insert_with(|| Party::new(level.party.clone(), "Party", ""));
        self.turn_count = 1;
        self.phase.reset();

        for spec in &level.units {
            let nid = if self.units.contains_key(&spec.unit) {
                // A persistent unit carried over; just re-team it.
                if let Some(unit) = self.units.get_mut(&spec.unit) {
                    unit.team = spec.team.clone();
                }
                spec.unit.clone()
            } else {
                match self.spawn_unit(&spec.unit, &spec.team) {
                    Ok(nid) => nid,
                    Err(err) => {
                        tracing::warn!(%err, "skipping level unit");
                        continue;
                    }
                }
            };
            if let Some(unit) = self.units.get_mut(&nid) {
                unit.ai = spec.ai.clone();
                unit.flags.remove(UnitFlags::DEAD);
            }
            if let Some(pos) = spec.position {
                if let Err(err) = self.place_unit(&nid, pos) {
                    tracing::warn!(unit = %nid, %err, "could not place level unit");
                }
            }
        }

        self.roam_info = level.roam.then(|| {
            let unit = level.roam_unit.clone().unwrap_or_default();
            let pos = self
                .units
                .get(&unit)
                .and_then(|u| u.position)
                .map(crate::common::RoamPos::from_tile)
                .unwrap_or_default();
            RoamInfo { unit, pos }
        });

        self.refresh_fog();
        self.trigger_event(triggers::LEVEL_START);
        Ok(())
    }

    /// Removes level-local state. Persistent player-team units survive;
    /// their board positions are cleared.
    pub fn teardown_level(&mut self) {
        let player_team = self.player_team();
        let keep: Vec<Nid> = self
            .units
            .values()
            .filter(|u| u.persistent && u.team == player_team && !u.is_dead())
            .map(|u| u.nid.clone())
            .collect();

        let dropped: Vec<Nid> = self
            .units
            .keys()
            .filter(|nid| !keep.contains(nid))
            .cloned()
            .collect();
        for nid in dropped {
            if let Some(unit) = self.units.remove(&nid) {
                for uid in unit.items {
                    self.items.remove(&uid);
                }
            }
        }
        for nid in keep {
            if let Some(unit) = self.units.get_mut(&nid) {
                unit.position = None;
                unit.reset_turn_flags();
                unit.rescuing = None;
                unit.rescued_by = None;
                unit.statuses.clear();
            }
        }

        self.board = Board::default();
        self.level_vars.clear();
        self.talk_options.clear();
        self.ai_groups.clear();
        self.roam_info = None;
        self.current_level = None;
        self.events.clear();
    }

    // ------------------------------------------------------------------
    // Events and variables
    // ------------------------------------------------------------------

    pub fn var_view(&self) -> VarView<'_> {
        VarView {
            game_vars: &self.game_vars,
            level_vars: &self.level_vars,
            turn_count: self.turn_count,
        }
    }

    /// Fires a trigger: matching, condition-passing prefabs are pushed
    /// onto the event stack (highest priority on top). Returns how many
    /// fired; the caller decides whether to enter the `event` state.
    pub fn trigger_event(&mut self, trigger: &str) -> usize {
        let level = self.current_level.clone();
        let candidates = self.events.candidates(trigger, level.as_ref());

        let mut passing: Vec<usize> = Vec::new();
        for idx in candidates {
            let Some(prefab) = self.events.prefab(idx) else {
                continue;
            };
            let condition = prefab.condition.clone();
            if crate::events::condition::evaluate(&condition, &self.var_view()) {
                passing.push(idx);
            }
        }
        // Reverse so the highest-priority event ends up on top of the
        // LIFO stack and runs first.
        for idx in passing.iter().rev() {
            self.events.activate(*idx);
        }
        passing.len()
    }

    pub fn play_sound(&mut self, nid: Nid) {
        self.sounds.push(nid);
    }

    // ------------------------------------------------------------------
    // Win / loss evaluation
    // ------------------------------------------------------------------

    /// Evaluated after each combat and each turn advance.
    pub fn check_win_condition(&self) -> bool {
        if self
            .level_vars
            .get("_win_game")
            .map(Value::truthy)
            .unwrap_or(false)
        {
            return true;
        }
        match self.objective.kind {
            WinKind::Rout => {
                let player = self.player_team();
                !self.units.values().any(|u| {
                    !u.is_dead() && u.position.is_some() && self.db.are_hostile(&player, &u.team)
                })
            }
            WinKind::Seize => self
                .level_vars
                .get("_seized")
                .map(Value::truthy)
                .unwrap_or(false),
            WinKind::Scripted => false,
        }
    }

    pub fn check_loss_condition(&self) -> bool {
        if self
            .level_vars
            .get("_lose_game")
            .map(Value::truthy)
            .unwrap_or(false)
        {
            return true;
        }
        if self.current_level.is_none() {
            return false;
        }
        let player = self.player_team();
        let leader = self
            .parties
            .get(&self.current_party)
            .map(|p| p.leader.clone())
            .unwrap_or_default();
        if !leader.is_empty() {
            if let Some(unit) = self.units.get(&leader) {
                if unit.is_dead() {
                    return true;
                }
            }
        }
        !self
            .units
            .values()
            .any(|u| u.team == player && !u.is_dead())
    }

    /// Uid allocator floor, exposed for snapshot restore.
    pub fn set_next_item_uid(&mut self, next: u32) {
        self.next_item_uid = next;
    }

    pub fn next_item_uid(&self) -> u32 {
        self.next_item_uid
    }
}
