//! Entropy sources for epoch shuffling.
//!
//! Any `rand::RngCore` can drive an `EpochGenerator`. The generator stores
//! it by value, so a pseudo-random source with a fixed seed reproduces the
//! same infinite sequence of epochs. `StdRng` is the default; the
//! `LinearCongruential` generator here is a much cheaper alternative when
//! statistical quality matters less than speed.

use rand::{RngCore, SeedableRng};

/// Multiplier from Steele & Vigna, "Computationally easy, spectrally good
/// multipliers for congruential pseudorandom number generators" (2020).
const MULTIPLIER: u64 = 0xaf25_1af3_b0f0_25b5;
const INCREMENT: u64 = 1;

/// A 64-bit linear congruential generator.
///
/// Instances created with the same seed produce the same sequence from
/// `next_u64()`. Not suitable for anything security related.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinearCongruential {
    last_value: u64,
}

impl LinearCongruential {
    pub fn new(seed: u64) -> Self {
        Self { last_value: seed }
    }
}

impl Default for LinearCongruential {
    fn default() -> Self {
        Self::new(0)
    }
}

impl RngCore for LinearCongruential {
    fn next_u32(&mut self) -> u32 {
        // High bits of an LCG are the better-distributed ones.
        (self.next_u64() >> 32) as u32
    }

    fn next_u64(&mut self) -> u64 {
        self.last_value = self
            .last_value
            .wrapping_mul(MULTIPLIER)
            .wrapping_add(INCREMENT);
        self.last_value
    }

    fn fill_bytes(&mut self, dst: &mut [u8]) {
        for chunk in dst.chunks_mut(8) {
            let bytes = self.next_u64().to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }
}

impl SeedableRng for LinearCongruential {
    type Seed = [u8; 8];

    fn from_seed(seed: Self::Seed) -> Self {
        Self::new(u64::from_le_bytes(seed))
    }
}
