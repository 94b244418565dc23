//! Deterministic random number source.
//!
//! Nothing in the kernel may call a platform RNG. A session owns exactly
//! one [`SessionRng`], seeded from the session seed string, and every
//! chance outcome draws from it. Each draw is logged so the verification
//! tracker can fold it into the hash chain in draw order.

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::math::{unit_interval, Fixed};

/// Domain tag mixed into seed derivation.
const SEED_DOMAIN: &[u8] = b"pdoom/seed/v1";

/// A single logged draw.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RngDraw {
    /// Position of this draw in the session's draw sequence, from 0.
    pub index: u64,
    /// Turn the draw was taken on.
    pub turn: u32,
    /// What the draw decided (e.g. `event:ai_winter`, `rival:Apex`).
    pub purpose: String,
    /// Raw 64-bit value.
    pub value: u64,
}

/// Derive the 32-byte ChaCha seed for a seed string.
#[must_use]
pub fn derive_seed(seed: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(SEED_DOMAIN);
    hasher.update((seed.len() as u64).to_le_bytes());
    hasher.update(seed.as_bytes());
    hasher.finalize().into()
}

/// Seeded, logging RNG owned by the game state.
#[derive(Debug, Clone)]
pub struct SessionRng {
    inner: ChaCha8Rng,
    turn: u32,
    draw_count: u64,
    pending: Vec<RngDraw>,
}

impl SessionRng {
    /// Create the RNG for a session seed.
    #[must_use]
    pub fn from_seed_str(seed: &str) -> Self {
        Self {
            inner: ChaCha8Rng::from_seed(derive_seed(seed)),
            turn: 0,
            draw_count: 0,
            pending: Vec::new(),
        }
    }

    /// Set the turn stamped on subsequent draws.
    pub fn set_turn(&mut self, turn: u32) {
        self.turn = turn;
    }

    /// Total number of draws taken so far.
    #[must_use]
    pub const fn draw_count(&self) -> u64 {
        self.draw_count
    }

    /// Draws not yet handed to the verification tracker.
    #[must_use]
    pub fn pending(&self) -> &[RngDraw] {
        &self.pending
    }

    /// Hand over the logged draws, oldest first.
    pub fn take_draws(&mut self) -> Vec<RngDraw> {
        std::mem::take(&mut self.pending)
    }

    /// Draw a raw u64 (full range).
    pub fn next_u64(&mut self, purpose: impl Into<String>) -> u64 {
        let value = self.inner.next_u64();
        self.pending.push(RngDraw {
            index: self.draw_count,
            turn: self.turn,
            purpose: purpose.into(),
            value,
        });
        self.draw_count += 1;
        value
    }

    /// Roll a fixed-point value in `[0, 1)`.
    pub fn roll(&mut self, purpose: impl Into<String>) -> Fixed {
        unit_interval(self.next_u64(purpose))
    }

    /// Bernoulli trial: returns true with probability `p`.
    ///
    /// `p >= 1` always succeeds and `p <= 0` always fails, but a draw is
    /// taken either way so the draw sequence does not depend on `p`.
    pub fn chance(&mut self, p: Fixed, purpose: impl Into<String>) -> bool {
        self.roll(purpose) < p
    }

    /// Roll an integer in `[0, n)`. `n == 0` yields 0.
    pub fn below(&mut self, n: u64, purpose: impl Into<String>) -> u64 {
        let value = self.next_u64(purpose);
        if n == 0 {
            0
        } else {
            value % n
        }
    }

    /// Pick an index from non-negative weights.
    ///
    /// Returns `None` when all weights are zero; a draw is still taken.
    pub fn weighted_index(
        &mut self,
        weights: &[Fixed],
        purpose: impl Into<String>,
    ) -> Option<usize> {
        let roll = self.roll(purpose);
        let total = weights
            .iter()
            .filter(|w| **w > Fixed::ZERO)
            .fold(Fixed::ZERO, |acc, w| acc.saturating_add(*w));
        if total <= Fixed::ZERO {
            return None;
        }
        let target = roll.saturating_mul(total);
        let mut cumulative = Fixed::ZERO;
        let mut last_positive = None;
        for (i, w) in weights.iter().enumerate() {
            if *w <= Fixed::ZERO {
                continue;
            }
            cumulative = cumulative.saturating_add(*w);
            last_positive = Some(i);
            if target < cumulative {
                return Some(i);
            }
        }
        last_positive
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_stream() {
        let mut a = SessionRng::from_seed_str("test-001");
        let mut b = SessionRng::from_seed_str("test-001");
        for _ in 0..32 {
            assert_eq!(a.next_u64("t"), b.next_u64("t"));
        }
    }

    #[test]
    fn test_different_seed_different_stream() {
        let mut a = SessionRng::from_seed_str("test-001");
        let mut b = SessionRng::from_seed_str("test-002");
        let sa: Vec<u64> = (0..4).map(|_| a.next_u64("t")).collect();
        let sb: Vec<u64> = (0..4).map(|_| b.next_u64("t")).collect();
        assert_ne!(sa, sb);
    }

    #[test]
    fn test_draws_are_logged_in_order() {
        let mut rng = SessionRng::from_seed_str("log");
        rng.set_turn(3);
        rng.next_u64("first");
        rng.chance(Fixed::from_num(0.5), "second");
        let draws = rng.take_draws();
        assert_eq!(draws.len(), 2);
        assert_eq!(draws[0].index, 0);
        assert_eq!(draws[1].index, 1);
        assert_eq!(draws[1].purpose, "second");
        assert_eq!(draws[0].turn, 3);
        assert!(rng.pending().is_empty());
        assert_eq!(rng.draw_count(), 2);
    }

    #[test]
    fn test_chance_extremes_still_draw() {
        let mut rng = SessionRng::from_seed_str("extremes");
        assert!(rng.chance(Fixed::ONE, "always"));
        assert!(!rng.chance(Fixed::ZERO, "never"));
        assert_eq!(rng.draw_count(), 2);
    }

    #[test]
    fn test_below_range() {
        let mut rng = SessionRng::from_seed_str("below");
        for _ in 0..100 {
            assert!(rng.below(5, "d5") < 5);
        }
        assert_eq!(rng.below(0, "zero"), 0);
    }

    #[test]
    fn test_weighted_index_skips_zero_weights() {
        let mut rng = SessionRng::from_seed_str("weights");
        let weights = [Fixed::ZERO, Fixed::ONE, Fixed::ZERO];
        for _ in 0..50 {
            assert_eq!(rng.weighted_index(&weights, "w"), Some(1));
        }
        assert_eq!(rng.weighted_index(&[Fixed::ZERO], "none"), None);
    }

    #[test]
    fn test_derive_seed_is_stable() {
        assert_eq!(derive_seed("abc"), derive_seed("abc"));
        assert_ne!(derive_seed("abc"), derive_seed("abd"));
    }
}
