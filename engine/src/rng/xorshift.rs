//! xorshift64* random number generator
//!
//! Same seed → same sequence. The engine reseeds its generator on `start()`
//! when a seed is configured, which makes Monte Carlo runs repeatable.

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Deterministic random number generator using xorshift64*
///
/// # Example
/// ```
/// use scenario_engine_core::RngManager;
///
/// let mut rng = RngManager::new(12345);
/// let value = rng.next();
/// let bearing = rng.range(0, 360); // [0, 360)
/// assert!((0..360).contains(&bearing));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RngManager {
    state: u64,
}

impl RngManager {
    /// Create a new RNG with given seed
    ///
    /// A zero seed is replaced with 1, since xorshift never leaves state 0.
    pub fn new(seed: u64) -> Self {
        Self {
            state: Self::nonzero(seed),
        }
    }

    /// Create an RNG seeded from the system clock
    ///
    /// Used when no seed is configured; runs will not be repeatable.
    pub fn from_entropy() -> Self {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0x9E37_79B9_7F4A_7C15);
        Self::new(nanos)
    }

    /// Restart the sequence from `seed`
    ///
    /// # Example
    /// ```
    /// use scenario_engine_core::RngManager;
    ///
    /// let mut rng = RngManager::new(7);
    /// let first = rng.next();
    /// rng.next();
    /// rng.reseed(7);
    /// assert_eq!(rng.next(), first);
    /// ```
    pub fn reseed(&mut self, seed: u64) {
        self.state = Self::nonzero(seed);
    }

    /// Generate next random u64 value
    pub fn next(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(0x2545F4914F6CDD1D)
    }

    /// Generate random value in range [min, max)
    ///
    /// # Panics
    /// Panics if min >= max
    pub fn range(&mut self, min: i64, max: i64) -> i64 {
        assert!(min < max, "min must be less than max");

        let value = self.next();
        let range_size = max.abs_diff(min);
        min.wrapping_add((value % range_size) as i64)
    }

    /// Generate random f64 in range [0.0, 1.0)
    pub fn next_f64(&mut self) -> f64 {
        let value = self.next();
        (value >> 11) as f64 * (1.0 / ((1u64 << 53) as f64))
    }

    /// Returns true with the given probability
    pub fn chance(&mut self, probability: f64) -> bool {
        self.next_f64() < probability
    }

    /// Get current RNG state (for replay)
    pub fn get_state(&self) -> u64 {
        self.state
    }

    fn nonzero(seed: u64) -> u64 {
        if seed == 0 {
            1
        } else {
            seed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_seed_converted_to_nonzero() {
        let rng = RngManager::new(0);
        assert_ne!(rng.get_state(), 0, "Zero seed should be converted to 1");

        let mut other = RngManager::new(99);
        other.reseed(0);
        assert_eq!(other.get_state(), 1);
    }

    #[test]
    #[should_panic(expected = "min must be less than max")]
    fn test_range_invalid_bounds() {
        let mut rng = RngManager::new(12345);
        rng.range(100, 50);
    }

    #[test]
    fn test_range_handles_negative_bounds() {
        let mut rng = RngManager::new(31);
        for _ in 0..500 {
            let v = rng.range(-10, 10);
            assert!((-10..10).contains(&v));
        }
    }

    #[test]
    fn test_chance_extremes() {
        let mut rng = RngManager::new(5);
        for _ in 0..100 {
            assert!(!rng.chance(0.0));
            assert!(rng.chance(1.0));
        }
    }
}
