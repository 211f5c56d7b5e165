//! Deterministic runtime core of a grid-tactics engine.
//!
//! `emblem-core` defines the canonical rules: the board, pathfinding,
//! combat resolution, the stack-based state machine with its concrete
//! game states, the event interpreter, the turn controller, and the
//! reversible action log. All mutation flows through state hooks that
//! receive the single [`GameContext`]; supporting crates depend on the
//! types re-exported here. Rendering, raw input, audio, and storage all
//! live outside; the core consumes an abstract button stream and emits
//! typed draw ops and sound cues.

pub mod action_log;
pub mod ai;
pub mod board;
pub mod combat;
pub mod common;
pub mod config;
pub mod context;
pub mod data;
pub mod driver;
pub mod error;
pub mod events;
pub mod input;
pub mod item;
pub mod machine;
pub mod party;
pub mod path;
pub mod records;
pub mod rng;
pub mod states;
pub mod surface;
pub mod turn;
pub mod turnwheel;
pub mod unit;

pub use action_log::{ActionLog, LogEntry, UnitSnap};
pub use ai::{AiAction, next_action};
pub use board::{Board, BoardError, FogMask, Tile};
pub use combat::{
    CombatError, CombatOutcome, CombatPhase, CombatSolver, Side, Strike, StrikeKind, TriangleEdge,
    plan_strikes, resolve, validate,
};
pub use common::{Coord, Nid, RoamPos, Value};
pub use config::EngineConfig;
pub use context::{GameContext, Memory, WorldError};
pub use data::{
    ClassDef, Components, Constants, Database, DifficultyMode, FactionDef, ItemPrefab, LevelPrefab,
    LevelUnitSpec, MovementCostTable, Objective, Region, RegionKind, SkillPrefab, StatKind, Stats,
    SupportPrefab, TeamDef, TerrainDef, TilemapDef, UnitGroup, UnitPrefab, WeaponRankDef,
    WeaponTypeDef, WinKind, component_keys,
};
pub use driver::Driver;
pub use error::{EngineError, ErrorSeverity};
pub use events::{
    Dialog, EventCommand, EventInstance, EventManager, EventPrefab, EventStatus, ScriptError,
    VarView, triggers,
};
pub use input::{Button, InputEvent};
pub use item::{Item, ItemUid, Skill};
pub use machine::{Flow, State, StateMachine, TempOp, TransitionQueue};
pub use party::Party;
pub use path::{CostGrid, ReachableSet, astar, dijkstra};
pub use records::{Overworld, Records, RoamInfo, SupportState};
pub use rng::{GameRng, RngMode};
pub use surface::{DrawOp, Surface};
pub use turn::{PhaseChange, PhaseController};
pub use unit::{Unit, UnitFlags, UnitStatus};
