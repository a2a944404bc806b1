//! An f64 with atomic addition.
//!
//! There is no native atomic float. The value is kept as its bit pattern in an
//! `AtomicU64` and additions retry a compare-and-swap until they land.
use std::sync::atomic::{AtomicU64, Ordering};

/// An f64 which may be shared between threads
///
/// # Examples
/// ```
/// use summary_quantiles::atomic::AtomicF64;
///
/// let sum = AtomicF64::new(0.0);
/// sum.add(1.5);
/// sum.add(2.5);
/// assert_eq!(4.0, sum.get());
/// ```
#[derive(Debug, Default)]
pub struct AtomicF64 {
    bits: AtomicU64,
}

impl AtomicF64 {
    /// Create a new AtomicF64 holding `v`
    pub fn new(v: f64) -> AtomicF64 {
        AtomicF64 {
            bits: AtomicU64::new(v.to_bits()),
        }
    }

    /// The current value
    pub fn get(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Relaxed))
    }

    /// Overwrite the current value
    pub fn set(&self, v: f64) {
        self.bits.store(v.to_bits(), Ordering::Relaxed);
    }

    /// Add `v`, returning the previous value
    pub fn add(&self, v: f64) -> f64 {
        let mut current = self.bits.load(Ordering::Relaxed);
        loop {
            let new = (f64::from_bits(current) + v).to_bits();
            match self
                .bits
                .compare_exchange_weak(current, new, Ordering::Relaxed, Ordering::Relaxed)
            {
                Ok(prev) => return f64::from_bits(prev),
                Err(actual) => current = actual,
            }
        }
    }
}
