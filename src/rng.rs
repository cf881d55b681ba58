//! Seedable random source for mine placement and fallback probes.
//!
//! Uses the `rand` crate with `SmallRng` (xoshiro256++) which is fast and
//! works with WASM. Entropy is sourced from `getrandom` (browser crypto API).

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// A seedable RNG wrapper.
///
/// Seed it for deterministic replay of guesses, or create it from system entropy.
pub struct ProbeRng {
    inner: SmallRng,
}

impl ProbeRng {
    /// Create from system entropy (browser crypto.getRandomValues or OS).
    pub fn new() -> Self {
        Self {
            inner: SmallRng::from_os_rng(),
        }
    }

    /// Create with a specific seed for deterministic behavior.
    pub fn from_seed(seed: u64) -> Self {
        Self {
            inner: SmallRng::seed_from_u64(seed),
        }
    }

    /// Seeded when `seed` is given, entropy-backed otherwise.
    pub fn from_optional_seed(seed: Option<u64>) -> Self {
        seed.map_or_else(Self::new, Self::from_seed)
    }

    /// Generate a random usize in [0, max).
    #[inline(always)]
    pub fn gen_range(&mut self, max: usize) -> usize {
        self.inner.random_range(0..max)
    }

    /// Pick one element uniformly, `None` for an empty slice.
    pub fn choose<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        if items.is_empty() {
            None
        } else {
            items.get(self.gen_range(items.len()))
        }
    }
}

impl Default for ProbeRng {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_deterministic() {
        let mut rng1 = ProbeRng::from_seed(42);
        let mut rng2 = ProbeRng::from_seed(42);
        for _ in 0..100 {
            assert_eq!(rng1.gen_range(1000), rng2.gen_range(1000));
        }
    }

    #[test]
    fn test_range_bounds() {
        let mut rng = ProbeRng::from_seed(123);
        for _ in 0..1000 {
            assert!(rng.gen_range(10) < 10);
        }
    }

    #[test]
    fn test_choose() {
        let mut rng = ProbeRng::from_optional_seed(Some(7));
        let empty: [u8; 0] = [];
        assert!(rng.choose(&empty).is_none());
        let items = [(0usize, 1usize), (2, 3)];
        for _ in 0..20 {
            assert!(items.contains(rng.choose(&items).unwrap()));
        }
    }
}
