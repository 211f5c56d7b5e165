//! Tick-driven combat playback and world application.
//!
//! [`resolve`](super::resolve::resolve) precomputes every strike; the
//! solver steps through them on a fixed tick budget so the combat state
//! can animate, then [`CombatSolver::apply_results`] commits the outcome
//! to the world exactly once.

use crate::EngineConfig;
use crate::action_log::{LogEntry, UnitSnap};
use crate::common::Nid;
use crate::context::GameContext;
use crate::events::triggers;
use crate::item::ItemUid;
use crate::unit::Unit;

use super::resolve::{CombatOutcome, Side, Strike};

/// Playback phase of one combat.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CombatPhase {
    Init,
    /// Winding up strike `i`.
    Strike(usize),
    /// Applying strike `i`'s HP change.
    HpChange(usize),
    Done,
}

/// Owns a resolved combat while it plays out frame by frame.
pub struct CombatSolver {
    outcome: CombatOutcome,
    attack_weapon: ItemUid,
    defense_weapon: Option<ItemUid>,
    phase: CombatPhase,
    ticks: u32,
    applied: bool,
}

impl CombatSolver {
    pub fn new(
        outcome: CombatOutcome,
        attack_weapon: ItemUid,
        defense_weapon: Option<ItemUid>,
    ) -> Self {
        Self {
            outcome,
            attack_weapon,
            defense_weapon,
            phase: CombatPhase::Init,
            ticks: 0,
            applied: false,
        }
    }

    pub fn outcome(&self) -> &CombatOutcome {
        &self.outcome
    }

    pub fn phase(&self) -> CombatPhase {
        self.phase
    }

    pub fn is_done(&self) -> bool {
        self.phase == CombatPhase::Done
    }

    fn next_strike(&self, from: usize) -> Option<usize> {
        self.outcome.strikes[from..]
            .iter()
            .position(|s| !s.skipped)
            .map(|offset| from + offset)
    }

    pub fn current_strike(&self) -> Option<&Strike> {
        match self.phase {
            CombatPhase::Strike(i) | CombatPhase::HpChange(i) => self.outcome.strikes.get(i),
            _ => None,
        }
    }

    /// HP shown for a side once every strike up to `upto` has landed.
    fn hp_shown(&self, side: Side, upto: usize) -> i32 {
        self.outcome.strikes[..upto]
            .iter()
            .filter(|s| !s.skipped && s.side == side.other())
            .last()
            .map(|s| s.target_hp_after)
            .unwrap_or(i32::MAX)
    }

    /// Displayed HP pair (attacker, defender) for the combat HUD, capped
    /// by the live units' pre-combat HP.
    pub fn displayed_hp(&self, attacker: &Unit, defender: &Unit) -> (i32, i32) {
        let upto = match self.phase {
            CombatPhase::Init => 0,
            CombatPhase::Strike(i) => i,
            CombatPhase::HpChange(i) => i + 1,
            CombatPhase::Done => self.outcome.strikes.len(),
        };
        (
            self.hp_shown(Side::Attacker, upto).min(attacker.current_hp),
            self.hp_shown(Side::Defender, upto).min(defender.current_hp),
        )
    }

    /// Advances the playback clock one tick. Returns `true` when the
    /// whole sequence has played out.
    pub fn tick(&mut self) -> bool {
        match self.phase {
            CombatPhase::Init => {
                self.phase = match self.next_strike(0) {
                    Some(i) => CombatPhase::Strike(i),
                    None => CombatPhase::Done,
                };
                self.ticks = 0;
            }
            CombatPhase::Strike(i) => {
                self.ticks += 1;
                if self.ticks >= EngineConfig::STRIKE_TICKS {
                    self.phase = CombatPhase::HpChange(i);
                    self.ticks = 0;
                }
            }
            CombatPhase::HpChange(i) => {
                self.ticks += 1;
                if self.ticks >= EngineConfig::HP_CHANGE_TICKS {
                    self.phase = match self.next_strike(i + 1) {
                        Some(next) => CombatPhase::Strike(next),
                        None => CombatPhase::Done,
                    };
                    self.ticks = 0;
                }
            }
            CombatPhase::Done => {}
        }
        self.is_done()
    }

    /// Commits the outcome to the world. Idempotent: the second and
    /// later calls are no-ops.
    pub fn apply_results(&mut self, ctx: &mut GameContext) {
        if self.applied {
            return;
        }
        self.applied = true;

        let attacker_nid = self.outcome.attacker.clone();
        let defender_nid = self.outcome.defender.clone();

        let attacker_before = ctx.unit(&attacker_nid).map(unit_snap);
        let defender_before = ctx.unit(&defender_nid).map(unit_snap);

        // Weapon uses: one per executed strike, per side.
        let mut weapon_uses: Vec<(ItemUid, Option<i32>, Option<i32>)> = Vec::new();
        let mut broken: Vec<(ItemUid, Nid, usize)> = Vec::new();
        for (side, weapon) in [
            (Side::Attacker, Some(self.attack_weapon)),
            (Side::Defender, self.defense_weapon),
        ] {
            let Some(uid) = weapon else { continue };
            let struck = self
                .outcome
                .strikes
                .iter()
                .filter(|s| !s.skipped && s.side == side)
                .count() as i32;
            if struck == 0 {
                continue;
            }
            let before = ctx.item(uid).and_then(|i| i.uses);
            let mut broke = false;
            if let Some(item) = ctx.item_mut(uid) {
                for _ in 0..struck {
                    broke |= item.expend();
                }
            }
            let after = ctx.item(uid).and_then(|i| i.uses);
            weapon_uses.push((uid, before, after));
            if broke {
                if let Some((owner, slot)) = ctx.unbind_item(uid) {
                    broken.push((uid, owner, slot));
                }
            }
        }

        // HP, deaths, and board removal.
        let mut deaths: Vec<Nid> = Vec::new();
        if let Some(unit) = ctx.unit_mut(&defender_nid) {
            let dealt = unit.current_hp - self.outcome.defender_hp_after;
            unit.current_hp = self.outcome.defender_hp_after;
            if self.outcome.defender_dead {
                unit.flags.insert(crate::unit::UnitFlags::DEAD);
                deaths.push(defender_nid.clone());
            }
            ctx.records.note_damage(&attacker_nid, dealt);
        }
        if let Some(unit) = ctx.unit_mut(&attacker_nid) {
            let dealt = unit.current_hp - self.outcome.attacker_hp_after;
            unit.current_hp = self.outcome.attacker_hp_after;
            if self.outcome.attacker_dead {
                unit.flags.insert(crate::unit::UnitFlags::DEAD);
                deaths.push(attacker_nid.clone());
            }
            ctx.records.note_damage(&defender_nid, dealt);
        }

        // Experience, level-ups, and weapon rank progress.
        if self.outcome.exp_gained > 0 {
            let weapon_type = ctx.item(self.attack_weapon).and_then(|i| i.weapon_type());
            if let Some(unit) = ctx.unit_mut(&attacker_nid) {
                let mut total = unit.exp + self.outcome.exp_gained;
                for gains in &self.outcome.level_ups {
                    total -= EngineConfig::EXP_PER_LEVEL;
                    unit.level += 1;
                    for (kind, gain) in gains {
                        unit.stats.add(*kind, *gain);
                        if *kind == crate::data::StatKind::Hp {
                            unit.current_hp += gain;
                        }
                    }
                }
                unit.exp = total.max(0);
                if let Some(wtype) = weapon_type {
                    *unit.wexp.entry(wtype).or_default() += self.outcome.wexp_gained;
                }
            }
        }

        if self.outcome.defender_dead {
            ctx.records.note_kill(&attacker_nid);
            self.drop_spoils(ctx, &defender_nid, &attacker_nid);
        }
        if self.outcome.attacker_dead {
            ctx.records.note_kill(&defender_nid);
        }

        for nid in &deaths {
            self.release_passenger(ctx, nid);
            ctx.remove_from_board(nid);
        }

        let attacker_after = ctx.unit(&attacker_nid).map(unit_snap);
        let defender_after = ctx.unit(&defender_nid).map(unit_snap);
        if let (Some(ab), Some(aa), Some(db_), Some(da)) =
            (attacker_before, attacker_after, defender_before, defender_after)
        {
            ctx.action_log.record(LogEntry::Attack {
                attacker_before: ab,
                attacker_after: aa,
                defender_before: db_,
                defender_after: da,
                weapon_uses,
                broken,
            });
        }

        for _ in &deaths {
            ctx.trigger_event(triggers::UNIT_DEATH);
        }
    }

    /// Droppable items of a dead defender go to the killer, overflowing
    /// into the convoy.
    fn drop_spoils(&self, ctx: &mut GameContext, dead: &Nid, killer: &Nid) {
        let drops: Vec<ItemUid> = ctx
            .unit(dead)
            .map(|u| {
                u.items
                    .iter()
                    .copied()
                    .filter(|uid| ctx.item(*uid).map(|i| i.droppable).unwrap_or(false))
                    .collect()
            })
            .unwrap_or_default();

        for uid in drops {
            if let Some(unit) = ctx.unit_mut(dead) {
                unit.items.retain(|i| *i != uid);
            }
            if ctx.give_item(killer, uid).is_err() {
                let party = ctx.current_party.clone();
                ctx.send_to_convoy(&party, uid);
            }
        }
    }

    /// A dying carrier releases its passenger onto the carrier's tile.
    fn release_passenger(&self, ctx: &mut GameContext, carrier: &Nid) {
        let Some(passenger_nid) = ctx.unit(carrier).and_then(|u| u.rescuing.clone()) else {
            return;
        };
        let tile = ctx.unit(carrier).and_then(|u| u.position);
        if let Some(unit) = ctx.unit_mut(carrier) {
            unit.rescuing = None;
        }
        if let Some(passenger) = ctx.unit_mut(&passenger_nid) {
            passenger.rescued_by = None;
        }
        if let Some(tile) = tile {
            // The carrier is about to leave this tile; place after removal.
            ctx.remove_from_board(carrier);
            if ctx.place_unit(&passenger_nid, tile).is_err() {
                tracing::warn!(passenger = %passenger_nid, "no room to release passenger");
            }
        }
    }
}

fn unit_snap(unit: &Unit) -> UnitSnap {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::resolve::StrikeKind;

    fn strike(side: Side, damage: i32, hp_after: i32) -> Strike {
        Strike {
            side,
            kind: StrikeKind::Normal,
            skipped: false,
            hit: true,
            crit: false,
            damage,
            target_hp_after: hp_after,
        }
    }

    fn outcome() -> CombatOutcome {
        CombatOutcome {
            attacker: Nid::new("a"),
            defender: Nid::new("d"),
            strikes: vec![strike(Side::Attacker, 3, 17), strike(Side::Defender, 2, 18)],
            attacker_hp_after: 18,
            defender_hp_after: 17,
            ..CombatOutcome::default()
        }
    }

    #[test]
    fn playback_walks_strike_then_hp_phases() {
        let mut solver = CombatSolver::new(outcome(), ItemUid(1), Some(ItemUid(2)));
        assert_eq!(solver.phase(), CombatPhase::Init);

        solver.tick();
        assert_eq!(solver.phase(), CombatPhase::Strike(0));

        for _ in 0..EngineConfig::STRIKE_TICKS {
            solver.tick();
        }
        assert_eq!(solver.phase(), CombatPhase::HpChange(0));

        for _ in 0..EngineConfig::HP_CHANGE_TICKS {
            solver.tick();
        }
        assert_eq!(solver.phase(), CombatPhase::Strike(1));

        let total = EngineConfig::STRIKE_TICKS + EngineConfig::HP_CHANGE_TICKS;
        let mut done = false;
        for _ in 0..total {
            done = solver.tick();
        }
        assert!(done);
        assert!(solver.is_done());
    }

    #[test]
    fn skipped_strikes_are_not_played() {
        let mut out = outcome();
        out.strikes[1].skipped = true;
        let mut solver = CombatSolver::new(out, ItemUid(1), None);
        solver.tick();
        assert_eq!(solver.phase(), CombatPhase::Strike(0));
        for _ in 0..(EngineConfig::STRIKE_TICKS + EngineConfig::HP_CHANGE_TICKS) {
            solver.tick();
        }
        assert!(solver.is_done());
    }
}
