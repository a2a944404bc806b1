//! Error-bound policies for the biased quantiles algorithm.
//!
//! Cormode, Korn, Muthukrishnan and Srivastava parameterize their algorithm
//! by an invariant function `f(r, n)`: the maximum uncertainty, in ranks, that
//! a sample sitting at rank `r` of a stream of `n` items may carry. Choosing
//! `f` trades memory for accuracy at the ranks a user cares about.
//!
//!   * low-biased: `f = 2εr`, tight near the minimum
//!   * high-biased: `f = 2ε(n - r)`, tight near the maximum
//!   * targeted: tight only around a set of known quantiles
//!
//! The functions are pure and are re-evaluated on every insertion and
//! compression step, since `n` moves as data arrives.
use std::f64;

use crate::error::{Error, Result};

/// A quantile of interest paired with the absolute error it may carry.
#[derive(Debug, Copy, Clone, PartialEq)]
#[cfg_attr(feature = "serde_support", derive(Serialize, Deserialize))]
pub struct Target {
    quantile: f64,
    epsilon: f64,
}

impl Target {
    /// Create a new Target
    ///
    /// Both `quantile` and `epsilon` must lie in [0, 1].
    ///
    /// # Examples
    /// ```
    /// use summary_quantiles::invariant::Target;
    ///
    /// assert!(Target::new(0.99, 0.001).is_ok());
    /// assert!(Target::new(1.5, 0.001).is_err());
    /// assert!(Target::new(0.5, -0.1).is_err());
    /// ```
    pub fn new(quantile: f64, epsilon: f64) -> Result<Target> {
        if !(quantile >= 0.0 && quantile <= 1.0) {
            return Err(Error::InvalidQuantile(quantile));
        }
        if !(epsilon >= 0.0 && epsilon <= 1.0) {
            return Err(Error::InvalidEpsilon(epsilon));
        }
        Ok(Target { quantile, epsilon })
    }

    /// The targeted quantile
    pub fn quantile(&self) -> f64 {
        self.quantile
    }

    /// The absolute error permitted at the targeted quantile
    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    // Targets at 0 or 1 divide by zero. Away from the targeted rank the bound
    // is infinite; at it, or with no tolerated error, 0/0 means exact.
    fn bound(&self, n: f64, r: f64) -> f64 {
        let f = if self.quantile * n <= r {
            (2.0 * self.epsilon * r) / self.quantile
        } else {
            (2.0 * self.epsilon * (n - r)) / (1.0 - self.quantile)
        };
        if f.is_nan() {
            0.0
        } else {
            f
        }
    }
}

/// The invariant a sample stream maintains between its samples.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde_support", derive(Serialize, Deserialize))]
pub enum Invariant {
    /// Error grows with rank. Suited to accurate low quantiles, p1 say.
    LowBiased(f64),
    /// Error shrinks with rank. Suited to accurate high quantiles, p99 say.
    HighBiased(f64),
    /// Error is tight only around the given targets. With no targets every
    /// sample may merge with its neighbours.
    Targeted(Vec<Target>),
}

impl Invariant {
    /// Build a targeted invariant from `(quantile, epsilon)` pairs.
    ///
    /// # Examples
    /// ```
    /// use summary_quantiles::invariant::Invariant;
    ///
    /// let inv = Invariant::targeted(&[(0.5, 0.05), (0.99, 0.001)]).unwrap();
    /// assert!(inv.bound(1000, 990.0) < inv.bound(1000, 500.0));
    /// ```
    pub fn targeted(pairs: &[(f64, f64)]) -> Result<Invariant> {
        let targets = pairs
            .iter()
            .map(|&(q, e)| Target::new(q, e))
            .collect::<Result<Vec<Target>>>()?;
        Ok(Invariant::Targeted(targets))
    }

    /// Maximum permissible uncertainty at rank `r` in a stream holding `n`
    /// items.
    ///
    /// # Examples
    /// ```
    /// use summary_quantiles::invariant::Invariant;
    ///
    /// assert_eq!(Invariant::LowBiased(0.01).bound(1000, 100.0), 2.0);
    /// assert_eq!(Invariant::HighBiased(0.01).bound(1000, 900.0), 2.0);
    /// ```
    pub fn bound(&self, n: u64, r: f64) -> f64 {
        let n = n as f64;
        match *self {
            Invariant::LowBiased(epsilon) => 2.0 * epsilon * r,
            Invariant::HighBiased(epsilon) => 2.0 * epsilon * (n - r),
            Invariant::Targeted(ref targets) => targets
                .iter()
                .fold(f64::MAX, |m, t| m.min(t.bound(n, r))),
        }
    }
}
