//! Dice sources.
//!
//! The engine never rolls dice itself during a turn: it asks for a roll and
//! waits for the result. A [`DiceSource`] produces that result.

use crate::player::PlayerId;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::VecDeque;

/// Produces dice totals for a player
pub trait DiceSource: Send {
    /// Roll `dice` dice with `faces` faces and return the total
    fn roll(&mut self, player: PlayerId, dice: u32, faces: u32) -> u32;
}

/// Fair dice backed by a seeded RNG
#[derive(Debug, Clone)]
pub struct RandomDice {
    rng: ChaCha8Rng,
}

impl RandomDice {
    pub fn new() -> Self {
        Self {
            rng: ChaCha8Rng::from_entropy(),
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomDice {
    fn default() -> Self {
        Self::new()
    }
}

impl DiceSource for RandomDice {
    fn roll(&mut self, _player: PlayerId, dice: u32, faces: u32) -> u32 {
        (0..dice.max(1)).map(|_| self.rng.gen_range(1..=faces.max(1))).sum()
    }
}

/// Replays a fixed list of totals, then falls back to the lowest legal total.
/// Useful for tests and replays.
#[derive(Debug, Clone, Default)]
pub struct ScriptedDice {
    totals: VecDeque<u32>,
}

impl ScriptedDice {
    pub fn new(totals: impl IntoIterator<Item = u32>) -> Self {
        Self {
            totals: totals.into_iter().collect(),
        }
    }

    /// Queue another total
    pub fn push(&mut self, total: u32) {
        self.totals.push_back(total);
    }

    /// Totals not yet used
    pub fn remaining(&self) -> usize {
        self.totals.len()
    }
}

impl DiceSource for ScriptedDice {
    fn roll(&mut self, _player: PlayerId, dice: u32, _faces: u32) -> u32 {
        // Out of script: lowest legal total
        self.totals.pop_front().unwrap_or(dice)
    }
}
