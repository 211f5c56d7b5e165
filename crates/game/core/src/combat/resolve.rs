//! Strike planning and combat resolution.
//!
//! [`resolve`] runs a whole combat up front against the RNG stream and
//! returns the ordered strike results plus aggregate outcome. The solver
//! then animates the precomputed sequence; nothing is rolled during
//! animation.

use std::collections::BTreeMap;

use crate::EngineConfig;
use crate::board::Board;
use crate::common::Nid;
use crate::data::{Database, StatKind, Stats};
use crate::error::{EngineError, ErrorSeverity};
use crate::item::Item;
use crate::rng::{GameRng, RngMode};
use crate::unit::Unit;

use super::calc;

/// Validation failures surfaced before combat starts.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum CombatError {
    #[error("attacker has no usable weapon")]
    NoWeapon,

    #[error("target at distance {distance} is outside weapon range {min}-{max}")]
    OutOfRange { distance: i32, min: i32, max: i32 },
}

impl EngineError for CombatError {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Validation
    }

    fn error_code(&self) -> &'static str {
        match self {
            CombatError::NoWeapon => "no_weapon",
            CombatError::OutOfRange { .. } => "out_of_range",
        }
    }
}

/// Which combatant delivers a strike.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Side {
    Attacker,
    Defender,
}

impl Side {
    pub fn other(self) -> Side {
        match self {
            Side::Attacker => Side::Defender,
            Side::Defender => Side::Attacker,
        }
    }
}

/// Why a strike exists in the sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StrikeKind {
    Normal,
    Brave,
    FollowUp,
}

/// One resolved strike.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Strike {
    pub side: Side,
    pub kind: StrikeKind,
    /// Skipped strikes (a combatant already died) never rolled.
    pub skipped: bool,
    pub hit: bool,
    pub crit: bool,
    pub damage: i32,
    /// Target HP after this strike was applied.
    pub target_hp_after: i32,
}

/// Aggregate result of a resolved combat.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CombatOutcome {
    pub attacker: Nid,
    pub defender: Nid,
    pub strikes: Vec<Strike>,
    pub attacker_hp_after: i32,
    pub defender_hp_after: i32,
    pub attacker_dead: bool,
    pub defender_dead: bool,
    /// Experience the attacker earned (player teams only).
    pub exp_gained: i32,
    /// Stat gains per level gained, in order.
    pub level_ups: Vec<BTreeMap<StatKind, i32>>,
    /// Weapon experience for the attacker's weapon type.
    pub wexp_gained: i32,
}

/// Checks a proposed attack before anything is mutated.
pub fn validate(attack_weapon: Option<&Item>, distance: i32) -> Result<(), CombatError> {
    let weapon = attack_weapon.ok_or(CombatError::NoWeapon)?;
    if !weapon.is_weapon() {
        return Err(CombatError::NoWeapon);
    }
    if !weapon.in_range(distance) {
        return Err(CombatError::OutOfRange {
            distance,
            min: weapon.components.min_range(),
            max: weapon.components.max_range(),
        });
    }
    Ok(())
}

/// Plans the strike sequence:
/// attacker, attacker brave, defender counter (with its own brave),
/// then follow-ups for whichever side is fast enough.
pub fn plan_strikes(
    attacker_speed: i32,
    defender_speed: i32,
    defender_counters: bool,
    attacker_brave: bool,
    defender_brave: bool,
) -> Vec<(Side, StrikeKind)> {
    let mut plan = vec![(Side::Attacker, StrikeKind::Normal)];
    if attacker_brave {
        plan.push((Side::Attacker, StrikeKind::Brave));
    }
    if defender_counters {
        plan.push((Side::Defender, StrikeKind::Normal));
        if defender_brave {
            plan.push((Side::Defender, StrikeKind::Brave));
        }
    }
    if attacker_speed - defender_speed >= EngineConfig::FOLLOW_UP_THRESHOLD {
        plan.push((Side::Attacker, StrikeKind::FollowUp));
    }
    if defender_counters && defender_speed - attacker_speed >= EngineConfig::FOLLOW_UP_THRESHOLD {
        plan.push((Side::Defender, StrikeKind::FollowUp));
    }
    plan
}

/// Resolves a full combat against the RNG stream.
///
/// The defender counters iff they hold a weapon whose range covers the
/// board distance between the two units. Once a combatant dies the
/// remaining strikes involving them are recorded as skipped.
pub fn resolve(
    db: &Database,
    board: &Board,
    attacker: &Unit,
    attack_weapon: &Item,
    defender: &Unit,
    defense_weapon: Option<&Item>,
    mode: RngMode,
    rng: &mut GameRng,
) -> Result<CombatOutcome, CombatError> {
    let distance = match (attacker.position, defender.position) {
        (Some(a), Some(d)) => a.distance(d),
        _ => 1,
    };
    validate(Some(attack_weapon), distance)?;

    let defender_counters = defense_weapon
        .map(|w| w.is_weapon() && w.in_range(distance))
        .unwrap_or(false);
    let counter_weapon = defender_counters.then_some(defense_weapon).flatten();

    let atk_edge = calc::triangle(db, attack_weapon, counter_weapon);
    let def_edge = counter_weapon
        .map(|w| calc::triangle(db, w, Some(attack_weapon)))
        .unwrap_or(calc::TriangleEdge::Neutral);

    let plan = plan_strikes(
        calc::attack_speed(attacker, Some(attack_weapon)),
        calc::attack_speed(defender, defense_weapon),
        defender_counters,
        attack_weapon.components.is_brave(),
        counter_weapon.map(|w| w.components.is_brave()).unwrap_or(false),
    );

    let mut atk_hp = attacker.current_hp;
    let mut def_hp = defender.current_hp;
    let mut strikes = Vec::with_capacity(plan.len());
    let mut attacker_landed = 0u32;

    for (side, kind) in plan {
        if atk_hp <= 0 || def_hp <= 0 {
            strikes.push(Strike {
                side,
                kind,
                skipped: true,
                hit: false,
                crit: false,
                damage: 0,
                target_hp_after: if side == Side::Attacker { def_hp } else { atk_hp },
            });
            continue;
        }

        let (striker, weapon, target, target_weapon, edge) = match (side, counter_weapon) {
            (Side::Attacker, _) => (attacker, attack_weapon, defender, counter_weapon, atk_edge),
            (Side::Defender, Some(w)) => (defender, w, attacker, Some(attack_weapon), def_edge),
            (Side::Defender, None) => {
                // Planner never schedules this; treat as a skipped strike.
                tracing::error!("defender strike planned without a counter weapon");
                strikes.push(Strike {
                    side,
                    kind,
                    skipped: true,
                    hit: false,
                    crit: false,
                    damage: 0,
                    target_hp_after: atk_hp,
                });
                continue;
            }
        };

        let chance = calc::hit_chance(db, board, striker, weapon, target, target_weapon, edge);
        let hit = rng.hit_roll(mode) < chance;
        let mut crit = false;
        let mut damage = 0;
        if hit {
            let crit_chance = calc::crit_chance(striker, weapon, target);
            crit = rng.crit_roll(mode) < crit_chance;
            damage = calc::strike_damage(db, board, striker, weapon, target, edge);
            if crit {
                damage *= EngineConfig::CRIT_MULTIPLIER;
            }
        }

        let target_hp = match side {
            Side::Attacker => {
                def_hp = (def_hp - damage).max(0);
                def_hp
            }
            Side::Defender => {
                atk_hp = (atk_hp - damage).max(0);
                atk_hp
            }
        };
        if side == Side::Attacker && hit {
            attacker_landed += 1;
        }

        strikes.push(Strike {
            side,
            kind,
            skipped: false,
            hit,
            crit,
            damage,
            target_hp_after: target_hp,
        });
    }

    let defender_dead = def_hp <= 0;
    let attacker_dead = atk_hp <= 0;

    let mut outcome = CombatOutcome {
        attacker: attacker.nid.clone(),
        defender: defender.nid.clone(),
        strikes,
        attacker_hp_after: atk_hp,
        defender_hp_after: def_hp,
        attacker_dead,
        defender_dead,
        exp_gained: 0,
        level_ups: Vec::new(),
        wexp_gained: 0,
    };

    let player_attacker = db
        .team(&attacker.team)
        .map(|t| t.player_control)
        .unwrap_or(false);
    if player_attacker && !attacker_dead {
        let mut exp = if attacker_landed > 0 { 1 } else { 0 };
        if defender_dead {
            exp += (20 + (defender.level - attacker.level)).max(1);
        }
        exp = exp.min(EngineConfig::EXP_PER_COMBAT_CAP);
        outcome.exp_gained = exp;
        outcome.wexp_gained = attacker_landed as i32 * EngineConfig::WEXP_PER_STRIKE;

        // Level-ups roll growths immediately so the RNG stream order is
        // independent of when results are applied.
        let mut total = attacker.exp + exp;
        let mut stats = attacker.stats;
        while total >= EngineConfig::EXP_PER_LEVEL {
            total -= EngineConfig::EXP_PER_LEVEL;
            outcome
                .level_ups
                .push(roll_level_up(&attacker.growths, &mut stats, rng));
        }
    }

    Ok(outcome)
}

/// Rolls one level-up: each stat gains a point when a percentile roll
/// lands under its growth rate. Stats are iterated in declaration order
/// so the stream stays deterministic.
fn roll_level_up(
    growths: &Stats,
    stats: &mut Stats,
    rng: &mut GameRng,
) -> BTreeMap<StatKind, i32> {
    let mut gains = BTreeMap::new();
    for kind in <StatKind as strum::IntoEnumIterator>::iter() {
        let growth = growths.get(kind);
        if growth > 0 && rng.percent() < growth {
            stats.add(kind, 1);
            gains.insert(kind, 1);
        }
    }
    gains
}
