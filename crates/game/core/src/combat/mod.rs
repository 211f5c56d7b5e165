//! Combat resolution pipeline.
//!
//! Split in three layers: pure calculations ([`calc`]), up-front strike
//! resolution against the RNG stream ([`resolve`]), and the tick-driven
//! playback/application machine ([`solver`]).

pub mod calc;
pub mod resolve;
pub mod solver;

pub use calc::TriangleEdge;
pub use resolve::{
    CombatError, CombatOutcome, Side, Strike, StrikeKind, plan_strikes, resolve, validate,
};
pub use solver::{CombatPhase, CombatSolver};
