//! Random sources for weighted variant selection

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::domain::experiment::RandomSource;

/// Draws from the thread-local generator
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn draw(&mut self) -> f64 {
        rand::thread_rng().gen_range(0.0..1.0)
    }
}

/// Deterministic generator seeded up front
///
/// The same seed yields the same sequence of assignments, which makes
/// simulations and demos reproducible.
#[derive(Debug, Clone)]
pub struct SeededRandom {
    rng: StdRng,
}

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl RandomSource for SeededRandom {
    fn draw(&mut self) -> f64 {
        self.rng.gen_range(0.0..1.0)
    }
}
