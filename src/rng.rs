//! Seeded linear-congruential generator for reproducible optimizer runs.
//!
//! `state = (state * 1103515245 + 12345) & 0x7fffffff`, output `state / 0x7fffffff`.
//!
//! The product is formed in double precision and reduced modulo 2^32 before
//! masking. Above 2^53 that rounding changes the sequence, and stored runs
//! depend on it, so do not switch to exact integer arithmetic.
//!
//! One generator per optimizer call; never share it across calls.

const MULTIPLIER: f64 = 1_103_515_245.0;
const INCREMENT: f64 = 12_345.0;
const MODULUS_32: f64 = 4_294_967_296.0;
const MASK: u32 = 0x7fff_ffff;

#[derive(Debug, Clone)]
pub struct SeededRng {
    state: f64,
}

impl SeededRng {
    pub fn new(seed: u32) -> Self {
        Self {
            state: f64::from(seed),
        }
    }

    /// Next value in `[0.0, 1.0]` (both ends reachable).
    pub fn next_f64(&mut self) -> f64 {
        let product = self.state * MULTIPLIER + INCREMENT;
        let wrapped = product.rem_euclid(MODULUS_32);
        // `wrapped` is an integer-valued double below 2^32.
        let masked = (wrapped as u64 as u32) & MASK;
        self.state = f64::from(masked);
        self.state / f64::from(MASK)
    }

    /// Uniform index in `0..len`. `len` must be non-zero.
    pub fn next_index(&mut self, len: usize) -> usize {
        debug_assert!(len > 0);
        let i = (self.next_f64() * len as f64).floor() as usize;
        i.min(len.saturating_sub(1))
    }
}
