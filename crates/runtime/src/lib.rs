//! Persistence layer for the tactics engine.
//!
//! `emblem-runtime` owns everything that outlives a session: the
//! ordered key-value save store (file-backed or in-memory), full-world
//! snapshot construction and restoration, and slot management with
//! metadata and the suspend quick-save.

pub mod error;
pub mod save;
pub mod snapshot;
pub mod store;

pub use error::{RestoreError, StoreError};
pub use save::{SaveKind, SaveManager, SaveMetadata};
pub use snapshot::{
    ItemRecord, LevelRecord, PartyRecord, SkillRecord, SnapshotRecord, UnitRecord, build, restore,
};
pub use store::{FileSaveStore, MemorySaveStore, SaveStore};
