//! Seeded pseudo-random numbers for tests and benchmarks.

/// A splitmix64 generator
///
/// Datasets built from the same seed are identical from run to run, which
/// keeps accuracy tests reproducible.
#[derive(Debug, Clone, Copy)]
pub struct Xorshift {
    seed: u64,
}

impl Xorshift {
    /// Create a new Xorshift from `seed`
    pub fn new(seed: u64) -> Xorshift {
        Xorshift { seed }
    }

    /// Next value, uniformly distributed over the u64 range
    pub fn next_val(&mut self) -> u64 {
        // implementation inspired by
        // https://github.com/astocko/xorshift/blob/master/src/splitmix64.rs
        use std::num::Wrapping as w;

        let mut z = w(self.seed) + w(0x9E37_79B9_7F4A_7C15_u64);
        let nxt_seed = z.0;
        z = (z ^ (z >> 30)) * w(0xBF58_476D_1CE4_E5B9_u64);
        z = (z ^ (z >> 27)) * w(0x94D0_49BB_1331_11EB_u64);
        self.seed = nxt_seed;
        (z ^ (z >> 31)).0
    }

    /// Next value, uniformly distributed over [0, 1)
    pub fn next_f64(&mut self) -> f64 {
        (self.next_val() >> 11) as f64 / ((1u64 << 53) as f64)
    }
}
