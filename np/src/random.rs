//! Injectable random source
//!
//! Every random decision in a cycle (country fallback, candidate pick, place
//! pick, stay length, coordinate jitter) draws from one `Dice`. Tests seed it
//! so outcomes are deterministic.

use std::sync::{Mutex, MutexGuard};

use rand::rngs::StdRng;
use rand::seq::{IndexedRandom, SliceRandom};
use rand::{Rng, SeedableRng};
use tracing::debug;

/// Shared, seedable random source
pub struct Dice {
    rng: Mutex<StdRng>,
}

impl Dice {
    /// Deterministic source for tests and reproducible runs
    pub fn seeded(seed: u64) -> Self {
        debug!(seed, "Dice::seeded: called");
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Source seeded from the operating system
    pub fn from_entropy() -> Self {
        debug!("Dice::from_entropy: called");
        Self {
            rng: Mutex::new(StdRng::from_os_rng()),
        }
    }

    fn rng(&self) -> MutexGuard<'_, StdRng> {
        // A poisoned lock still holds a usable generator
        self.rng.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Uniform pick from a slice; None when empty
    pub fn pick<'a, T>(&self, items: &'a [T]) -> Option<&'a T> {
        items.choose(&mut *self.rng())
    }

    /// Uniform index into a collection of `len` items; None when empty
    pub fn index(&self, len: usize) -> Option<usize> {
        if len == 0 {
            return None;
        }
        Some(self.rng().random_range(0..len))
    }

    /// Uniform integer in `[low, high]`; bounds are swapped if reversed
    pub fn range(&self, low: u32, high: u32) -> u32 {
        let (low, high) = if low <= high { (low, high) } else { (high, low) };
        self.rng().random_range(low..=high)
    }

    /// Uniform float in `[-magnitude, magnitude]`
    pub fn offset(&self, magnitude: f64) -> f64 {
        if magnitude <= 0.0 {
            return 0.0;
        }
        self.rng().random_range(-magnitude..=magnitude)
    }

    /// Shuffle in place
    pub fn shuffle<T>(&self, items: &mut [T]) {
        items.shuffle(&mut *self.rng());
    }
}

impl Default for Dice {
    fn default() -> Self {
        Self::from_entropy()
    }
}

impl std::fmt::Debug for Dice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dice").finish_non_exhaustive()
    }
}
