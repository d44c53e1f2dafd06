//! Deterministic random number generation.
//!
//! Shuffles and coin flips are the only randomness in the engine; amount
//! and target resolution are fully deterministic. The RNG state is
//! serializable so a suspended game checkpoints exactly.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Deterministic game RNG.
///
/// Uses ChaCha8 for speed with a serializable word-position state.
#[derive(Clone, Debug)]
pub struct GameRng {
    inner: ChaCha8Rng,
    seed: u64,
}

impl GameRng {
    /// Create a new RNG with the given seed.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            inner: ChaCha8Rng::seed_from_u64(seed),
            seed,
        }
    }

    /// Flip a coin: true = heads.
    pub fn coin_flip(&mut self) -> bool {
        self.inner.gen_bool(0.5)
    }

    /// Flip `count` coins and return the number of heads.
    pub fn coin_flips(&mut self, count: u32) -> u32 {
        (0..count).filter(|_| self.coin_flip()).count() as u32
    }

    /// Generate a random usize in the given range.
    pub fn gen_range_usize(&mut self, range: std::ops::Range<usize>) -> usize {
        self.inner.gen_range(range)
    }

    /// Shuffle a slice in place.
    pub fn shuffle<T>(&mut self, slice: &mut [T]) {
        use rand::seq::SliceRandom;
        slice.shuffle(&mut self.inner);
    }

    /// Get the current state for serialization.
    #[must_use]
    pub fn state(&self) -> GameRngState {
        GameRngState {
            seed: self.seed,
            word_pos: self.inner.get_word_pos(),
        }
    }

    /// Restore from a saved state.
    #[must_use]
    pub fn from_state(state: &GameRngState) -> Self {
        let mut inner = ChaCha8Rng::seed_from_u64(state.seed);
        inner.set_word_pos(state.word_pos);
        Self {
            inner,
            seed: state.seed,
        }
    }
}

impl Serialize for GameRng {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.state().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for GameRng {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let state = GameRngState::deserialize(deserializer)?;
        Ok(GameRng::from_state(&state))
    }
}

/// Serializable RNG state for checkpointing.
///
/// Uses the ChaCha8 word position for O(1) capture regardless of how many
/// random numbers have been generated.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameRngState {
    /// Original seed.
    pub seed: u64,
    /// ChaCha8 word position (128-bit counter).
    pub word_pos: u128,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_determinism() {
        let mut rng1 = GameRng::new(42);
        let mut rng2 = GameRng::new(42);

        for _ in 0..100 {
            assert_eq!(rng1.coin_flip(), rng2.coin_flip());
        }
    }

    #[test]
    fn test_shuffle_deterministic() {
        let mut a: Vec<u32> = (0..20).collect();
        let mut b: Vec<u32> = (0..20).collect();

        GameRng::new(7).shuffle(&mut a);
        GameRng::new(7).shuffle(&mut b);

        assert_eq!(a, b);
    }

    #[test]
    fn test_state_roundtrip() {
        let mut rng = GameRng::new(13);
        rng.coin_flips(17);

        let state = rng.state();
        let mut restored = GameRng::from_state(&state);

        for _ in 0..50 {
            assert_eq!(rng.coin_flip(), restored.coin_flip());
        }
    }

    #[test]
    fn test_coin_flips_bounded() {
        let mut rng = GameRng::new(1);
        let heads = rng.coin_flips(10);
        assert!(heads <= 10);
    }
}
