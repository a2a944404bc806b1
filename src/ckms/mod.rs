//! This is an implementation of the algorithm presented in Cormode, Korn,
//! Muthukrishnan, Srivastava's paper "Effective Computation of Biased Quantiles
//! over Data Streams". The ambition here is to approximate quantiles on a
//! stream of data without having a boatload of information kept in memory.
//!
//! We follow the 'batch' method of the paper. Values are not inserted one at a
//! time; callers buffer them, sort them and hand the sorted run to
//! `SampleStream::insert_sorted`, which merges the run into the samples in a
//! single forward pass and then runs the COMPRESS operation. All three
//! invariants of the paper are supported, see the `invariant` module.
//!
//! A `SampleStream` has no notion of time. Decay is the business of
//! `stream::QuantileStream`, which keeps a ring of these.
use std::f64;
use std::slice;
use std::sync::Arc;

use crate::invariant::Invariant;

mod entry;

pub use self::entry::Entry;

/// A structure to provide approximate quantile queries in bounded memory and
/// with bounded error.
#[derive(Clone, Debug)]
pub struct SampleStream {
    n: u64,

    // This is the S(n) of the above paper. The outlined implementation uses a
    // linked list but we prefer a Vec for reasons of cache locality at the
    // cost of worse computational complexity on insertion.
    samples: Vec<Entry>,

    invariant: Arc<Invariant>,
}

impl SampleStream {
    /// Create a new SampleStream
    ///
    /// The invariant is shared, read-only, between every stream that wishes
    /// to use it.
    ///
    /// # Examples
    /// ```
    /// use std::sync::Arc;
    /// use summary_quantiles::ckms::SampleStream;
    /// use summary_quantiles::invariant::Invariant;
    ///
    /// let stream = SampleStream::new(Arc::new(Invariant::HighBiased(0.01)));
    /// assert!(stream.is_empty());
    /// assert!(stream.query(0.99).is_nan());
    /// ```
    pub fn new(invariant: Arc<Invariant>) -> SampleStream {
        SampleStream {
            n: 0,
            samples: Vec::new(),
            invariant,
        }
    }

    /// The invariant this stream maintains
    pub fn invariant(&self) -> &Invariant {
        &self.invariant
    }

    /// Insert an ascending run of values
    ///
    /// `values` must be sorted. Each value is placed before the first sample
    /// that exceeds it and given the loosest uncertainty the invariant permits
    /// at that rank. Values larger than every sample are appended exactly.
    /// Compression follows the whole run.
    ///
    /// # Examples
    /// ```
    /// use std::sync::Arc;
    /// use summary_quantiles::ckms::SampleStream;
    /// use summary_quantiles::invariant::Invariant;
    ///
    /// let mut stream = SampleStream::new(Arc::new(Invariant::LowBiased(0.01)));
    /// stream.insert_sorted(&[1.0, 2.0, 3.0]);
    /// stream.insert_sorted(&[1.5, 2.5]);
    /// assert_eq!(stream.count(), 5);
    /// assert_eq!(stream.query(0.0), 1.0);
    /// assert_eq!(stream.query(1.0), 3.0);
    /// ```
    pub fn insert_sorted(&mut self, values: &[f64]) {
        let mut r: u64 = 0;
        let mut i = 0;
        for &v in values {
            let mut inserted = false;
            while i < self.samples.len() {
                let cur = self.samples[i];
                if cur.v > v {
                    let f = self.invariant.bound(self.n, r as f64).floor() - 1.0;
                    self.samples.insert(
                        i,
                        Entry {
                            v,
                            g: 1,
                            delta: f.max(0.0) as u64,
                        },
                    );
                    i += 1;
                    inserted = true;
                    break;
                }
                r += cur.g;
                i += 1;
            }
            if !inserted {
                self.samples.push(Entry { v, g: 1, delta: 0 });
                i += 1;
            }
            self.n += 1;
            r += 1;
        }
        self.compress();
    }

    /// Merge adjacent samples whose combined uncertainty satisfies the
    /// invariant
    ///
    /// Samples are visited from the highest value down. A lower neighbour is
    /// folded into its upper neighbour, which keeps its value and delta.
    pub fn compress(&mut self) {
        let len = self.samples.len();
        if len < 2 {
            return;
        }

        // Kept samples are packed against the back of the Vec; `w` is the
        // sample currently absorbing its lower neighbours.
        let mut w = len - 1;
        let mut r = (self.n as f64) - 1.0 - (self.samples[w].g as f64);
        for i in (0..len - 1).rev() {
            let c = self.samples[i];
            let x = self.samples[w];
            let lhs = (c.g as f64) + (x.g as f64) + (x.delta as f64);
            if lhs <= self.invariant.bound(self.n, r) {
                self.samples[w].g += c.g;
            } else {
                w -= 1;
                self.samples[w] = c;
            }
            r -= c.g as f64;
        }
        self.samples.drain(..w);
    }

    /// Query the stream for an approximate quantile
    ///
    /// Argument q is valid 0. <= q <= 1.0 and is not checked. An empty stream
    /// has no quantiles and answers NaN.
    ///
    /// # Examples
    /// ```
    /// use std::sync::Arc;
    /// use summary_quantiles::ckms::SampleStream;
    /// use summary_quantiles::invariant::Invariant;
    ///
    /// let mut stream = SampleStream::new(Arc::new(Invariant::LowBiased(0.01)));
    /// let data: Vec<f64> = (0..1000).map(|i| i as f64).collect();
    /// stream.insert_sorted(&data);
    ///
    /// let median = stream.query(0.5);
    /// assert!((median - 500.0).abs() <= 5.0);
    /// ```
    pub fn query(&self, q: f64) -> f64 {
        if self.samples.is_empty() {
            return f64::NAN;
        }

        let mut t = (q * (self.n as f64)).ceil();
        t += (self.invariant.bound(self.n, t) / 2.0).ceil();

        let mut prev = &self.samples[0];
        let mut r: u64 = 0;
        for cur in &self.samples[1..] {
            r += prev.g;
            if ((r + cur.g) as f64) + (cur.delta as f64) > t {
                return prev.v;
            }
            prev = cur;
        }
        prev.v
    }

    /// Drop every sample
    pub fn reset(&mut self) {
        self.samples.clear();
        self.n = 0;
    }

    /// Total number of values inserted since the last reset
    pub fn count(&self) -> u64 {
        self.n
    }

    /// Number of samples currently stored
    ///
    /// This value will fluctuate as compression happens.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// True if nothing has been inserted since the last reset
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Iterate the stored samples in ascending order of value
    pub fn iter(&self) -> slice::Iter<Entry> {
        self.samples.iter()
    }
}
