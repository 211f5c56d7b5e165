//! Turn and phase rotation.
//!
//! Teams rotate in registry order; wrapping increments the turn counter.
//! Advancing a phase resets the incoming team's per-turn flags, ticks
//! status effects (damage over time, duration expiry), accrues support
//! points when a player phase ends, and fires the turn triggers.

use crate::action_log::{LogEntry, UnitSnap};
use crate::common::Nid;
use crate::config::EngineConfig;
use crate::context::GameContext;
use crate::events::triggers;
use crate::unit::Unit;

/// Ordered team rotation with the current index.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PhaseController {
    teams: Vec<Nid>,
    index: usize,
    fallback: Nid,
}

impl PhaseController {
    pub fn new(teams: Vec<Nid>) -> Self {
        Self {
            teams,
            index: 0,
            fallback: Nid::default(),
        }
    }

    pub fn current_team(&self) -> &Nid {
        self.teams.get(self.index).unwrap_or(&self.fallback)
    }

    pub fn team_index(&self) -> usize {
        self.index
    }

    pub fn set_team_index(&mut self, index: usize) {
        if index < self.teams.len().max(1) {
            self.index = index;
        }
    }

    pub fn reset(&mut self) {
        self.index = 0;
    }

    /// Moves to the next team. Returns `true` when the rotation wrapped,
    /// i.e. a new turn began.
    pub fn advance(&mut self) -> bool {
        if self.teams.is_empty() {
            return false;
        }
        self.index = (self.index + 1) % self.teams.len();
        self.index == 0
    }

    pub fn teams(&self) -> &[Nid] {
        &self.teams
    }
}

/// Result of one phase advance, consumed by the turn-change state.
#[derive(Clone, Debug, PartialEq)]
pub struct PhaseChange {
    pub team: Nid,
    pub wrapped: bool,
    pub turn_count: i32,
}

fn snap(unit: &Unit) -> UnitSnap {
    UnitSnap {
        nid: unit.nid.clone(),
        hp: unit.current_hp,
        exp: unit.exp,
        level: unit.level,
        stats: unit.stats,
        flags: unit.flags,
        position: unit.position,
        statuses: unit.statuses.clone(),
    }
}

impl GameContext {
    /// Rotates to the next phase and prepares the incoming team.
    pub fn advance_phase(&mut self) -> PhaseChange {
        if self.is_player_phase() {
            self.accrue_supports();
        }

        let turn_count_before = self.turn_count;
        let team_index_before = self.phase.team_index();

        let wrapped = self.phase.advance();
        if wrapped {
            self.turn_count += 1;
        }
        let team = self.current_team();

        let members = self.team_units(&team);
        let units_before: Vec<UnitSnap> = members
            .iter()
            .filter_map(|nid| self.units.get(nid))
            .map(snap)
            .collect();

        for nid in &members {
            self.begin_phase_for(nid);
        }

        let units_after: Vec<UnitSnap> = members
            .iter()
            .filter_map(|nid| self.units.get(nid))
            .map(snap)
            .collect();

        self.action_log.record(LogEntry::TurnAdvance {
            turn_count_before,
            turn_count_after: self.turn_count,
            team_index_before,
            team_index_after: self.phase.team_index(),
            units_before,
            units_after,
        });

        self.trigger_event(triggers::TURN_CHANGE);
        self.trigger_event(triggers::PHASE_CHANGE);
        if wrapped {
            self.trigger_event(triggers::TURN_START);
        }

        PhaseChange {
            team,
            wrapped,
            turn_count: self.turn_count,
        }
    }

    /// Per-unit phase start: reset action flags, apply damage over time,
    /// decrement durations, drop expired effects. DoT deaths remove the
    /// unit from the board and fire `unit_death`.
    fn begin_phase_for(&mut self, nid: &Nid) {
        let mut died = false;
        if let Some(unit) = self.units.get_mut(nid) {
            unit.reset_turn_flags();

            let dot: i32 = unit.statuses.iter().map(|s| s.dot).sum();
            if dot > 0 {
                died = unit.take_damage(dot);
            } else if dot < 0 {
                unit.heal(-dot);
            }

            for status in &mut unit.statuses {
                if status.duration > 0 {
                    status.duration -= 1;
                }
            }
            unit.statuses.retain(|s| s.duration != 0);
        }
        if died {
            self.remove_from_board(nid);
            self.trigger_event(triggers::UNIT_DEATH);
        }
    }

    /// Grants support points to adjacent pairs with a defined support.
    fn accrue_supports(&mut self) {
        let player = self.player_team();
        let placed: Vec<(Nid, crate::common::Coord)> = self
            .units
            .values()
            .filter(|u| u.team == player && !u.is_dead())
            .filter_map(|u| u.position.map(|p| (u.nid.clone(), p)))
            .collect();

        for (i, (a, pa)) in placed.iter().enumerate() {
            for (b, pb) in placed.iter().skip(i + 1) {
                if pa.is_adjacent(*pb) && self.db.supports.iter().any(|s| s.pairs(a, b)) {
                    self.supports
                        .add_points(a, b, EngineConfig::SUPPORT_POINTS_PER_TURN);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Board;
    use crate::common::Coord;
    use crate::data::{TilemapDef, UnitPrefab};
    use crate::unit::{UnitFlags, UnitStatus};
    use std::sync::Arc;

    fn ctx_with_two_teams() -> GameContext {
        let mut db = crate::context::tests::test_db();
        db.units.insert(
            Nid::new("bandit"),
            UnitPrefab {
                nid: Nid::new("bandit"),
                name: "Bandit".into(),
                class: Nid::new("fighter"),
                level: 1,
                ..UnitPrefab::default()
            },
        );
        let mut ctx = GameContext::new(Arc::new(db));
        ctx.board = Board::from_tilemap(&ctx.db, &TilemapDef::filled("m", 5, 5, "plains"));
        ctx.turn_count = 1;
        let hero = ctx.spawn_unit(&Nid::new("hero"), &Nid::new("player")).unwrap();
        ctx.place_unit(&hero, Coord::new(0, 0)).unwrap();
        let bandit = ctx.spawn_unit(&Nid::new("bandit"), &Nid::new("enemy")).unwrap();
        ctx.place_unit(&bandit, Coord::new(4, 4)).unwrap();
        ctx
    }

    #[test]
    fn rotation_wraps_and_counts_turns() {
        let mut ctx = ctx_with_two_teams();
        assert_eq!(ctx.current_team(), "player");

        let change = ctx.advance_phase();
        assert_eq!(change.team, "enemy");
        assert!(!change.wrapped);
        assert_eq!(ctx.turn_count, 1);

        let change = ctx.advance_phase();
        assert_eq!(change.team, "player");
        assert!(change.wrapped);
        assert_eq!(ctx.turn_count, 2);
    }

    #[test]
    fn phase_start_resets_flags() {
        let mut ctx = ctx_with_two_teams();
        let hero = Nid::new("hero");
        ctx.unit_mut(&hero).unwrap().flags.insert(UnitFlags::FINISHED);

        ctx.advance_phase(); // enemy phase
        assert!(ctx.unit(&hero).unwrap().is_finished());
        ctx.advance_phase(); // back to player
        assert!(!ctx.unit(&hero).unwrap().is_finished());
    }

    #[test]
    fn dot_ticks_and_expires() {
        let mut ctx = ctx_with_two_teams();
        let bandit = Nid::new("bandit");
        ctx.unit_mut(&bandit).unwrap().statuses.push(UnitStatus {
            nid: Nid::new("poison"),
            dot: 3,
            duration: 2,
        });

        let hp = ctx.unit(&bandit).unwrap().current_hp;
        ctx.advance_phase(); // enemy phase begins, poison ticks
        let unit = ctx.unit(&bandit).unwrap();
        assert_eq!(unit.current_hp, hp - 3);
        assert_eq!(unit.statuses[0].duration, 1);

        ctx.advance_phase();
        ctx.advance_phase(); // enemy phase again, second and final tick
        let unit = ctx.unit(&bandit).unwrap();
        assert_eq!(unit.current_hp, hp - 6);
        assert!(unit.statuses.is_empty());
    }

    #[test]
    fn dot_death_removes_from_board() {
        let mut ctx = ctx_with_two_teams();
        let bandit = Nid::new("bandit");
        {
            let unit = ctx.unit_mut(&bandit).unwrap();
            unit.current_hp = 2;
            unit.statuses.push(UnitStatus {
                nid: Nid::new("poison"),
                dot: 5,
                duration: 3,
            });
        }
        ctx.advance_phase();
        let unit = ctx.unit(&bandit).unwrap();
        assert!(unit.is_dead());
        assert_eq!(unit.position, None);
        assert_eq!(ctx.board.get_unit(Coord::new(4, 4)), None);
    }
}
