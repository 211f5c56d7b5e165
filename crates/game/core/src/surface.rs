//! The opaque output surface.
//!
//! Rendering is out of scope for the core; states composite typed draw
//! operations onto a [`Surface`] and the host rasterizes them however it
//! likes. Tests inspect the op list directly.

use crate::common::{Coord, Nid};

/// One drawing instruction. The set is intentionally coarse: enough for
/// a host to render and for tests to assert on, nothing more.
#[derive(Clone, Debug, PartialEq)]
pub enum DrawOp {
    /// The tile map with unit sprites, fog applied for the viewing team.
    Map { viewing_team: Nid },
    Cursor(Coord),
    /// Blue movement range.
    MoveRange(Vec<Coord>),
    /// Red attack range.
    AttackRange(Vec<Coord>),
    /// Movement path arrow.
    PathArrow(Vec<Coord>),
    Menu {
        options: Vec<String>,
        cursor: usize,
    },
    Dialog {
        speaker: String,
        text: String,
    },
    Portrait {
        nid: Nid,
        position: String,
    },
    Banner(String),
    /// Combat HP bars and strike flashes.
    CombatHud {
        attacker: Nid,
        defender: Nid,
        attacker_hp: i32,
        defender_hp: i32,
    },
    UnitInfo(Nid),
    Minimap,
    Text(String),
    /// Full-screen fade used by event transitions.
    Transition {
        progress_pct: i32,
    },
}

/// Draw-op sink passed through the state stack each frame.
#[derive(Clone, Debug, Default)]
pub struct Surface {
    ops: Vec<DrawOp>,
}

impl Surface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears the accumulated ops; the driver calls this once per frame.
    pub fn clear(&mut self) {
        self.ops.clear();
    }

    pub fn push(&mut self, op: DrawOp) {
        self.ops.push(op);
    }

    pub fn ops(&self) -> &[DrawOp] {
        &self.ops
    }

    /// Whether any op satisfies the predicate; test helper.
    pub fn contains(&self, pred: impl Fn(&DrawOp) -> bool) -> bool {
        self.ops.iter().any(pred)
    }
}
