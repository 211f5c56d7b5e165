//! Slot management on top of the save store.
//!
//! Slots are keyed `"{game_nid}-{slot}"` with a companion
//! `"{game_nid}-{slot}.meta"` JSON record for the load menu. The
//! quick-save lives at `"{game_nid}-suspend"` and is deleted after its
//! first successful load.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use emblem_core::{Database, GameContext, StateMachine};

use crate::error::{Result, StoreError};
use crate::snapshot::{self, SnapshotRecord};
use crate::store::SaveStore;

/// What kind of save a slot holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SaveKind {
    /// Manual save from a save point or the prep screen.
    Manual,
    /// Automatic start-of-chapter save.
    Auto,
    /// Mid-battle quick-save.
    Suspend,
}

/// Companion metadata shown in the load menu without decoding the full
/// snapshot.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SaveMetadata {
    pub playtime: u64,
    pub realtime: DateTime<Utc>,
    pub version: String,
    pub title: String,
    pub mode: String,
    pub level_nid: Option<String>,
    pub level_title: Option<String>,
    pub kind: SaveKind,
    pub display_name: String,
}

/// High-level save/load operations bound to one game nid.
pub struct SaveManager<S: SaveStore> {
    store: S,
    game_nid: String,
}

impl<S: SaveStore> SaveManager<S> {
    pub fn new(store: S, game_nid: impl Into<String>) -> Self {
        Self {
            store,
            game_nid: game_nid.into(),
        }
    }

    fn slot_key(&self, slot: &str) -> String {
        format!("{}-{}", self.game_nid, slot)
    }

    fn suspend_key(&self) -> String {
        format!("{}-suspend", self.game_nid)
    }

    /// Serializes the world into a slot and writes its metadata.
    pub fn save_slot(
        &mut self,
        ctx: &GameContext,
        machine: &StateMachine,
        slot: &str,
        kind: SaveKind,
    ) -> Result<()> {
        let key = if kind == SaveKind::Suspend {
            self.suspend_key()
        } else {
            self.slot_key(slot)
        };
        let snap = snapshot::build(ctx, machine.stack_names());
        self.write_snapshot(&key, &snap, ctx, kind)?;
        tracing::info!(%key, "saved");
        Ok(())
    }

    fn write_snapshot(
        &mut self,
        key: &str,
        snap: &SnapshotRecord,
        ctx: &GameContext,
        kind: SaveKind,
    ) -> Result<()> {
        let payload =
            bincode::serialize(snap).map_err(|e| StoreError::Encode(e.to_string()))?;
        self.store.put(key, &payload)?;

        let level_title = ctx
            .current_level
            .as_ref()
            .and_then(|nid| ctx.db.level(nid))
            .map(|l| l.name.clone());
        let meta = SaveMetadata {
            playtime: ctx.playtime_ms,
            realtime: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_owned(),
            title: ctx.db.constants.title.clone(),
            mode: ctx.mode.to_string(),
            level_nid: ctx.current_level.as_ref().map(|n| n.to_string()),
            level_title,
            kind,
            display_name: level_title_or(ctx),
        };
        let meta_payload =
            serde_json::to_vec(&meta).map_err(|e| StoreError::Encode(e.to_string()))?;
        self.store.put(&format!("{key}.meta"), &meta_payload)
    }

    /// Loads a slot, rebuilding the world and reseeding the machine
    /// stack. Returns `None` when the slot is empty.
    pub fn load_slot(
        &self,
        db: Arc<Database>,
        machine: &mut StateMachine,
        slot: &str,
    ) -> Result<Option<GameContext>> {
        self.load_key(db, machine, &self.slot_key(slot))
    }

    /// Loads the quick-save and deletes it after the first success.
    pub fn load_suspend(
        &mut self,
        db: Arc<Database>,
        machine: &mut StateMachine,
    ) -> Result<Option<GameContext>> {
        let key = self.suspend_key();
        let loaded = self.load_key(db, machine, &key)?;
        if loaded.is_some() {
            self.store.delete(&key)?;
            self.store.delete(&format!("{key}.meta"))?;
        }
        Ok(loaded)
    }

    fn load_key(
        &self,
        db: Arc<Database>,
        machine: &mut StateMachine,
        key: &str,
    ) -> Result<Option<GameContext>> {
        let Some(payload) = self.store.get(key)? else {
            return Ok(None);
        };
        let snap: SnapshotRecord =
            bincode::deserialize(&payload).map_err(|e| StoreError::Decode(e.to_string()))?;
        let (ctx, stack) = snapshot::restore(db, &snap);
        machine.seed_stack(&stack);
        tracing::info!(%key, "loaded");
        Ok(Some(ctx))
    }

    /// Metadata for every saved slot, in key order.
    pub fn list_saves(&self) -> Result<Vec<(String, SaveMetadata)>> {
        let mut out = Vec::new();
        for key in self.store.list_keys()? {
            let Some(slot_key) = key.strip_suffix(".meta") else {
                continue;
            };
            if !slot_key.starts_with(&self.game_nid) {
                continue;
            }
            let Some(payload) = self.store.get(&key)? else {
                continue;
            };
            match serde_json::from_slice::<SaveMetadata>(&payload) {
                Ok(meta) => out.push((slot_key.to_owned(), meta)),
                Err(err) => tracing::warn!(%key, %err, "unreadable save metadata, skipping"),
            }
        }
        Ok(out)
    }

    pub fn delete_slot(&mut self, slot: &str) -> Result<()> {
        let key = self.slot_key(slot);
        self.store.delete(&key)?;
        self.store.delete(&format!("{key}.meta"))
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

fn level_title_or(ctx: &GameContext) -> String {
    ctx.current_level
        .as_ref()
        .and_then(|nid| ctx.db.level(nid))
        .map(|l| l.name.clone())
        .unwrap_or_else(|| ctx.db.constants.title.clone())
}
