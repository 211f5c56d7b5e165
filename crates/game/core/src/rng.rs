//! Deterministic random number stream.
//!
//! The game context owns exactly one stream; every roll (hit, crit,
//! growth) consumes from it in a fixed order, so a given seed and input
//! stream always reproduce the same battle.
//!
//! The generator is PCG-XSH-RR: a 64-bit LCG step with a permuted 32-bit
//! output. Small state, fast, and passes the usual statistical batteries.

/// Hit-roll interpretation mode.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RngMode {
    /// Average of two percentile rolls; biases toward displayed hit rates.
    #[default]
    TrueHit,
    /// Single percentile roll.
    Classic,
    /// Deterministic roll of 50; no randomness.
    Fixed,
}

/// The single explicit RNG stream.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GameRng {
    state: u64,
}

impl GameRng {
    const MULTIPLIER: u64 = 6364136223846793005;
    const INCREMENT: u64 = 1442695040888963407;

    pub fn from_seed(seed: u64) -> Self {
        let mut rng = Self {
            state: seed.wrapping_add(Self::INCREMENT),
        };
        rng.step();
        rng
    }

    #[inline]
    fn step(&mut self) {
        self.state = self
            .state
            .wrapping_mul(Self::MULTIPLIER)
            .wrapping_add(Self::INCREMENT);
    }

    /// Advances the stream and permutes the state into 32 output bits.
    pub fn next_u32(&mut self) -> u32 {
        let state = self.state;
        self.step();
        let xorshifted = (((state >> 18) ^ state) >> 27) as u32;
        let rot = (state >> 59) as u32;
        xorshifted.rotate_right(rot)
    }

    /// Percentile roll in `0..=99`.
    pub fn percent(&mut self) -> i32 {
        (self.next_u32() % 100) as i32
    }

    /// Uniform value in `0..bound` (bound ≥ 1).
    pub fn below(&mut self, bound: u32) -> u32 {
        self.next_u32() % bound.max(1)
    }

    /// Hit roll under the given mode. Always consumes the same number of
    /// stream values per mode so replays stay aligned.
    pub fn hit_roll(&mut self, mode: RngMode) -> i32 {
        match mode {
            RngMode::TrueHit => {
                let a = self.percent();
                let b = self.percent();
                (a + b) / 2
            }
            RngMode::Classic => self.percent(),
            RngMode::Fixed => 50,
        }
    }

    /// Crit roll: a single percentile, deterministic in fixed mode.
    pub fn crit_roll(&mut self, mode: RngMode) -> i32 {
        match mode {
            RngMode::Fixed => 50,
            _ => self.percent(),
        }
    }

    /// Raw state, exposed for snapshot persistence.
    pub fn state(&self) -> u64 {
        self.state
    }

    pub fn from_state(state: u64) -> Self {
        Self { state }
    }
}

impl Default for GameRng {
    fn default() -> Self {
        Self::from_seed(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_sequence() {
        let mut a = GameRng::from_seed(42);
        let mut b = GameRng::from_seed(42);
        for _ in 0..64 {
            assert_eq!(a.next_u32(), b.next_u32());
        }
    }

    #[test]
    fn different_seeds_diverge() {
        let mut a = GameRng::from_seed(1);
        let mut b = GameRng::from_seed(2);
        let same = (0..16).filter(|_| a.next_u32() == b.next_u32()).count();
        assert!(same < 4);
    }

    #[test]
    fn percent_is_bounded() {
        let mut rng = GameRng::from_seed(7);
        for _ in 0..1000 {
            let roll = rng.percent();
            assert!((0..100).contains(&roll));
        }
    }

    #[test]
    fn fixed_mode_rolls_fifty_without_consuming() {
        let mut rng = GameRng::from_seed(9);
        let state = rng.state();
        assert_eq!(rng.hit_roll(RngMode::Fixed), 50);
        assert_eq!(rng.state(), state);
    }

    #[test]
    fn state_round_trip_resumes_stream() {
        let mut rng = GameRng::from_seed(3);
        rng.percent();
        let state = rng.state();
        let mut resumed = GameRng::from_state(state);
        assert_eq!(rng.next_u32(), resumed.next_u32());
    }
}
