//! RNG module - 7-bag piece set generation
//!
//! Implements the "7-bag" randomization used in modern Tetris: each bag holds
//! one of each kind, shuffled. A generated set is several bags back to back,
//! which keeps droughts short for every player sharing the set.
//!
//! Also provides a simple LCG so matches can be replayed from a seed.

use crate::types::{PieceKind, PIECE_SET_LEN};

/// Simple LCG (Linear Congruential Generator) RNG
/// Uses constants from Numerical Recipes
#[derive(Debug, Clone)]
pub struct SimpleRng {
    state: u32,
}

impl SimpleRng {
    pub fn new(seed: u32) -> Self {
        // Avoid 0 seed which would produce all zeros
        let state = if seed == 0 { 1 } else { seed };
        Self { state }
    }

    pub fn next_u32(&mut self) -> u32 {
        self.state = self.state.wrapping_mul(1664525).wrapping_add(1013904223);
        self.state
    }

    /// Generate random value in range [0, max)
    ///
    /// Scales from the high bits; the low bits of a power-of-two LCG cycle
    /// with short periods.
    pub fn next_range(&mut self, max: u32) -> u32 {
        ((u64::from(self.next_u32()) * u64::from(max)) >> 32) as u32
    }

    /// Shuffle a slice using Fisher-Yates
    pub fn shuffle<T>(&mut self, slice: &mut [T]) {
        for i in (1..slice.len()).rev() {
            let j = self.next_range((i + 1) as u32) as usize;
            slice.swap(i, j);
        }
    }

    pub fn state(&self) -> u32 {
        self.state
    }
}

/// Produces piece sets made of shuffled 7-bags
#[derive(Debug, Clone)]
pub struct BagGenerator {
    rng: SimpleRng,
    set_len: usize,
}

impl BagGenerator {
    pub fn new(seed: u32) -> Self {
        Self::with_set_len(seed, PIECE_SET_LEN)
    }

    /// `set_len` is rounded up to a whole number of bags.
    pub fn with_set_len(seed: u32, set_len: usize) -> Self {
        Self {
            rng: SimpleRng::new(seed),
            set_len: set_len.max(1),
        }
    }

    fn bag(&mut self) -> [PieceKind; 7] {
        let mut bag = PieceKind::ALL;
        self.rng.shuffle(&mut bag);
        bag
    }

    /// Generate the next set
    pub fn next_set(&mut self) -> Vec<PieceKind> {
        let bags = self.set_len.div_ceil(PieceKind::ALL.len());
        let mut set = Vec::with_capacity(bags * PieceKind::ALL.len());
        for _ in 0..bags {
            set.extend_from_slice(&self.bag());
        }
        set
    }
}

impl Default for BagGenerator {
    fn default() -> Self {
        Self::new(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rng_deterministic() {
        let mut rng1 = SimpleRng::new(12345);
        let mut rng2 = SimpleRng::new(12345);

        for _ in 0..100 {
            assert_eq!(rng1.next_u32(), rng2.next_u32());
        }
    }

    #[test]
    fn test_rng_different_seeds() {
        let mut rng1 = SimpleRng::new(12345);
        let mut rng2 = SimpleRng::new(54321);
        assert_ne!(rng1.next_u32(), rng2.next_u32());
    }

    #[test]
    fn test_zero_seed_is_usable() {
        let mut rng = SimpleRng::new(0);
        assert_ne!(rng.next_u32(), 0);
    }

    #[test]
    fn test_small_ranges_do_not_cycle_with_the_low_bits() {
        let mut rng = SimpleRng::new(1);
        let draws: Vec<u32> = (0..256).map(|_| rng.next_range(32)).collect();
        assert!(draws.iter().all(|&d| d < 32));
        assert_ne!(draws[..32], draws[32..64]);
        assert_ne!(draws[..64], draws[64..128]);
    }

    #[test]
    fn test_set_is_made_of_complete_bags() {
        let mut gen = BagGenerator::new(7);
        let set = gen.next_set();
        assert_eq!(set.len(), PIECE_SET_LEN);

        for bag in set.chunks(7) {
            for kind in PieceKind::ALL {
                assert!(bag.contains(&kind), "bag missing {kind:?}");
            }
        }
    }

    #[test]
    fn test_set_len_rounds_up_to_bags() {
        let mut gen = BagGenerator::with_set_len(3, 10);
        assert_eq!(gen.next_set().len(), 14);
    }

    #[test]
    fn test_same_seed_same_sets() {
        let mut a = BagGenerator::new(99);
        let mut b = BagGenerator::new(99);
        assert_eq!(a.next_set(), b.next_set());
        assert_eq!(a.next_set(), b.next_set());
    }
}
