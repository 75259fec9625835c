//! Explicit, seedable random source.
//!
//! The rounded-corner effect searches for a colour absent from the image by
//! drawing random RGB triples. The generator is passed in by the caller so a
//! fixed seed reproduces the same key colour on every run.

/// Minimal linear congruential generator (MINSTD parameters).
#[derive(Debug, Clone)]
pub struct SimpleRng {
    state: u64,
}

impl SimpleRng {
    const MODULUS: u64 = 2_147_483_647;

    pub fn new(seed: u64) -> Self {
        // Zero (mod 2^31 - 1) is a fixed point of the recurrence.
        let state = seed % Self::MODULUS;
        SimpleRng {
            state: if state == 0 { 1 } else { state },
        }
    }

    /// Generate next random u32 in `1..2^31 - 1`.
    pub fn next_u32(&mut self) -> u32 {
        self.state = self.state.wrapping_mul(48271) % Self::MODULUS;
        self.state as u32
    }

    /// Generate a random byte.
    #[inline]
    pub fn next_u8(&mut self) -> u8 {
        // The low bits of an LCG are its weakest; take bits 15..23.
        (self.next_u32() >> 15) as u8
    }
}

impl Default for SimpleRng {
    fn default() -> Self {
        SimpleRng::new(0x5eed)
    }
}
