//! Seeded random streams for replayable drops
//!
//! `SeededRandom` is a 32-bit mix generator (mulberry32). Each instance owns
//! its stream, so two generators built from the same seed always agree.

use rand::RngCore;

/// Deterministic 32-bit generator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeededRandom {
    state: u32,
}

impl SeededRandom {
    pub fn new(seed: u32) -> Self {
        Self { state: seed }
    }
}

impl RngCore for SeededRandom {
    fn next_u32(&mut self) -> u32 {
        self.state = self.state.wrapping_add(0x6d2b_79f5);
        let t = self.state;
        let mut r = (t ^ (t >> 15)).wrapping_mul(t | 1);
        r ^= r.wrapping_add((r ^ (r >> 7)).wrapping_mul(r | 61));
        r ^ (r >> 14)
    }

    fn next_u64(&mut self) -> u64 {
        let hi = self.next_u32() as u64;
        let lo = self.next_u32() as u64;
        (hi << 32) | lo
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chunk in dest.chunks_mut(4) {
            let bytes = self.next_u32().to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }
}

/// Uniform draw in [0, 1) from 32 bits of any generator
#[inline]
pub fn unit<R: RngCore + ?Sized>(rng: &mut R) -> f64 {
    rng.next_u32() as f64 / 4_294_967_296.0
}

/// Candidate seed for test mode attempt `attempt` (wrapping 32-bit mix)
pub fn make_test_seed(base: u32, rows: u32, target_index: usize, attempt: u64) -> u32 {
    base.wrapping_add(rows.wrapping_mul(0x1f12_3bb5))
        .wrapping_add((target_index as u32).wrapping_mul(0x9e37_79b9))
        .wrapping_add((attempt as u32).wrapping_mul(0x85eb_ca6b))
}
