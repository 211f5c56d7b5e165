//! Engine-wide tuning constants.
//!
//! Everything here is a compile-time balance or pacing knob. Data-driven
//! values (growth rates, movement costs, wexp thresholds) live in the
//! [`crate::data::Database`] instead.

/// Central configuration for engine limits and pacing.
pub struct EngineConfig;

impl EngineConfig {
    /// Inventory capacity per unit.
    pub const MAX_ITEMS: usize = 5;

    /// Attack-speed differential required for a follow-up strike.
    pub const FOLLOW_UP_THRESHOLD: i32 = 4;

    /// Damage multiplier on a critical strike.
    pub const CRIT_MULTIPLIER: i32 = 3;

    /// Maximum experience gained from a single combat.
    pub const EXP_PER_COMBAT_CAP: i32 = 99;

    /// Experience required for a level-up.
    pub const EXP_PER_LEVEL: i32 = 100;

    /// Weapon experience granted per landed strike.
    pub const WEXP_PER_STRIKE: i32 = 2;

    /// Maximum state-machine re-entries within one wall-clock frame.
    pub const FRAME_REPEAT_CAP: usize = 4;

    /// Milliseconds of simulated time per frame tick.
    pub const FRAME_MS: u32 = 33;

    /// Simulation ticks consumed by one combat strike animation.
    pub const STRIKE_TICKS: u32 = 20;

    /// Simulation ticks consumed by one HP-change animation.
    pub const HP_CHANGE_TICKS: u32 = 10;

    /// Simulation ticks for the phase-change banner.
    pub const BANNER_TICKS: u32 = 30;

    /// Simulation ticks per tile of movement animation.
    pub const MOVE_TICKS_PER_TILE: u32 = 4;

    /// Simulation ticks for a screen transition requested by an event.
    pub const TRANSITION_TICKS: u32 = 15;

    /// Movement cost at or above which terrain is impassable.
    pub const IMPASSABLE: i32 = 99;

    /// Default vision radius in fog of war when a class defines none.
    pub const DEFAULT_SIGHT_RANGE: i32 = 3;

    /// Sub-tile movement speed (tiles per frame) in the roam sub-mode.
    pub const ROAM_SPEED: f32 = 0.25;

    /// Support points granted to an eligible adjacent pair at turn end.
    pub const SUPPORT_POINTS_PER_TURN: i32 = 1;
}
