//! 'summary' pairs a decaying `QuantileStream` with an exact count and sum of
//! every observation, the shape of a summary metric.
//!
//! Count and sum never decay. Quantiles are reported for a fixed set of
//! objectives, each a quantile and the absolute error tolerated there, and
//! reflect only the current window. A `SummaryVec` holds one `Summary` per
//! combination of label values, created on first access.
//!
//! # Examples
//!
//! ```
//! use summary_quantiles::summary::{Config, Summary};
//!
//! let config = Config::default()
//!     .objective(0.5, 0.05).unwrap()
//!     .objective(0.99, 0.001).unwrap();
//! let summary = Summary::new(config).unwrap();
//! for i in 1..101 {
//!     summary.observe(i as f64);
//! }
//!
//! let snapshot = summary.collect();
//! assert_eq!(snapshot.sample_count, 100);
//! assert_eq!(snapshot.sample_sum, 5050.0);
//! assert_eq!(snapshot.quantiles[0].quantile, 0.5);
//! assert_eq!(snapshot.quantiles[1].quantile, 0.99);
//! ```
use std::cmp;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use quanta::Clock;

use crate::atomic::AtomicF64;
use crate::error::{Error, Result};
use crate::invariant::{Invariant, Target};
use crate::stream::{self, QuantileStream};

/// Default window over which quantiles are computed.
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(10 * 60);
/// Default number of age buckets the window decays through.
pub const DEFAULT_AGE_BUCKETS: u32 = 5;
/// Default number of observations buffered between flushes.
pub const DEFAULT_BUFFER_CAPACITY: usize = 500;

/// Label name summaries reserve for their quantiles.
pub const QUANTILE_LABEL: &str = "quantile";

/// Construction parameters of a `Summary`
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde_support", derive(Serialize, Deserialize))]
pub struct Config {
    /// Quantiles to report, with their tolerated error
    pub objectives: Vec<Target>,
    /// Observations older than this no longer affect quantiles
    pub max_age: Duration,
    /// Number of steps `max_age` decays through
    pub age_buckets: u32,
    /// Number of observations buffered between flushes
    pub buffer_capacity: usize,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            objectives: Vec::new(),
            max_age: DEFAULT_MAX_AGE,
            age_buckets: DEFAULT_AGE_BUCKETS,
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
        }
    }
}

impl Config {
    /// Add a reported quantile, tolerating `epsilon` absolute error
    pub fn objective(mut self, quantile: f64, epsilon: f64) -> Result<Config> {
        self.objectives.push(Target::new(quantile, epsilon)?);
        Ok(self)
    }

    /// Set the maximum age
    pub fn max_age(mut self, max_age: Duration) -> Config {
        self.max_age = max_age;
        self
    }

    /// Set the number of age buckets
    pub fn age_buckets(mut self, age_buckets: u32) -> Config {
        self.age_buckets = age_buckets;
        self
    }

    /// Set the buffer capacity
    pub fn buffer_capacity(mut self, buffer_capacity: usize) -> Config {
        self.buffer_capacity = buffer_capacity;
        self
    }

    /// Check the configuration without building anything
    ///
    /// # Examples
    /// ```
    /// use std::time::Duration;
    /// use summary_quantiles::Error;
    /// use summary_quantiles::summary::Config;
    ///
    /// assert!(Config::default().validate().is_ok());
    /// assert_eq!(
    ///     Err(Error::InvalidAgeBuckets),
    ///     Config::default().age_buckets(0).validate()
    /// );
    /// ```
    pub fn validate(&self) -> Result<()> {
        for t in &self.objectives {
            Target::new(t.quantile(), t.epsilon())?;
        }
        if self.buffer_capacity == 0 {
            return Err(Error::InvalidBufferCapacity);
        }
        stream::rotation_interval(self.max_age, self.age_buckets)?;
        Ok(())
    }
}

/// A reported quantile
#[derive(Debug, Copy, Clone, PartialEq)]
#[cfg_attr(feature = "serde_support", derive(Serialize, Deserialize))]
pub struct Quantile {
    /// The objective's quantile
    pub quantile: f64,
    /// Its approximate value over the current window, NaN if the window is
    /// empty
    pub value: f64,
}

/// Point-in-time state of a `Summary`
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde_support", derive(Serialize, Deserialize))]
pub struct SummarySnapshot {
    /// Observations ever recorded
    pub sample_count: u64,
    /// Sum of observations ever recorded
    pub sample_sum: f64,
    /// One entry per objective, ascending by quantile
    pub quantiles: Vec<Quantile>,
}

/// Exact count and sum, approximate decaying quantiles
#[derive(Debug)]
pub struct Summary {
    stream: QuantileStream,
    objectives: Vec<f64>,
    count: AtomicU64,
    sum: AtomicF64,
}

impl Summary {
    /// Create a new Summary on the wall clock
    pub fn new(config: Config) -> Result<Summary> {
        Summary::with_clock(config, Clock::new())
    }

    /// Create a new Summary on the given clock
    pub fn with_clock(config: Config, clock: Clock) -> Result<Summary> {
        config.validate()?;
        let mut objectives: Vec<f64> = config.objectives.iter().map(|t| t.quantile()).collect();
        objectives.sort_by(|a, b| a.partial_cmp(b).unwrap_or(cmp::Ordering::Equal));
        objectives.dedup();

        let stream = QuantileStream::with_clock(
            config.buffer_capacity,
            config.max_age,
            config.age_buckets,
            Invariant::Targeted(config.objectives),
            clock,
        )?;
        Ok(Summary {
            stream,
            objectives,
            count: AtomicU64::new(0),
            sum: AtomicF64::new(0.0),
        })
    }

    /// Record an observation
    ///
    /// NaN is ignored altogether and counts toward nothing.
    pub fn observe(&self, v: f64) {
        if v.is_nan() {
            return;
        }
        self.stream.append(v);
        self.count.fetch_add(1, Ordering::Relaxed);
        self.sum.add(v);
    }

    /// Observations ever recorded
    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    /// Sum of observations ever recorded
    pub fn sum(&self) -> f64 {
        self.sum.get()
    }

    /// Approximate quantile over the current window
    ///
    /// `q` need not be an objective but is only as accurate as the objectives
    /// around it allow. It is valid 0. <= q <= 1.0 and is not checked.
    pub fn quantile(&self, q: f64) -> f64 {
        self.stream.flush();
        self.stream.query(q)
    }

    /// Flush and report count, sum and every objective
    pub fn collect(&self) -> SummarySnapshot {
        self.stream.flush();
        let quantiles = self.objectives
            .iter()
            .map(|&quantile| Quantile {
                quantile,
                value: self.stream.query(quantile),
            })
            .collect();
        SummarySnapshot {
            sample_count: self.count(),
            sample_sum: self.sum(),
            quantiles,
        }
    }

    /// Forget everything, count and sum included
    pub fn reset(&self) {
        self.stream.reset();
        self.count.store(0, Ordering::Relaxed);
        self.sum.set(0.0);
    }
}

/// A family of summaries, one per combination of label values
#[derive(Debug)]
pub struct SummaryVec {
    label_names: Vec<String>,
    config: Config,
    clock: Clock,
    children: RwLock<HashMap<Vec<String>, Arc<Summary>>>,
}

impl SummaryVec {
    /// Create a new SummaryVec on the wall clock
    ///
    /// # Examples
    /// ```
    /// use summary_quantiles::summary::{Config, SummaryVec};
    ///
    /// let config = Config::default().objective(0.9, 0.01).unwrap();
    /// let family = SummaryVec::new(&["method"], config).unwrap();
    /// family.with_label_values(&["GET"]).unwrap().observe(0.25);
    /// family.with_label_values(&["GET"]).unwrap().observe(0.75);
    /// family.with_label_values(&["POST"]).unwrap().observe(1.0);
    ///
    /// let collected = family.collect();
    /// assert_eq!(collected.len(), 2);
    /// assert_eq!(collected[0].0, vec!["GET".to_string()]);
    /// assert_eq!(collected[0].1.sample_count, 2);
    /// ```
    pub fn new(label_names: &[&str], config: Config) -> Result<SummaryVec> {
        SummaryVec::with_clock(label_names, config, Clock::new())
    }

    /// Create a new SummaryVec whose children share the given clock
    pub fn with_clock(
        label_names: &[&str],
        config: Config,
        clock: Clock,
    ) -> Result<SummaryVec> {
        config.validate()?;
        if let Some(name) = label_names.iter().find(|n| **n == QUANTILE_LABEL) {
            return Err(Error::ReservedLabel((*name).to_string()));
        }
        Ok(SummaryVec {
            label_names: label_names.iter().map(|s| (*s).to_string()).collect(),
            config,
            clock,
            children: RwLock::new(HashMap::new()),
        })
    }

    /// The label names children are keyed by
    pub fn label_names(&self) -> &[String] {
        &self.label_names
    }

    /// The child for `values`, created if this is its first access
    pub fn with_label_values(&self, values: &[&str]) -> Result<Arc<Summary>> {
        let key = self.key(values)?;
        if let Some(child) = self.children.read().get(&key) {
            return Ok(Arc::clone(child));
        }

        let mut children = self.children.write();
        match children.entry(key) {
            Entry::Occupied(e) => Ok(Arc::clone(e.get())),
            Entry::Vacant(e) => {
                debug!("new summary child {:?}", e.key());
                let child = Summary::with_clock(self.config.clone(), self.clock.clone())?;
                Ok(Arc::clone(e.insert(Arc::new(child))))
            }
        }
    }

    /// Drop the child for `values`, returning it if it existed
    pub fn remove_label_values(&self, values: &[&str]) -> Result<Option<Arc<Summary>>> {
        let key = self.key(values)?;
        Ok(self.children.write().remove(&key))
    }

    /// Snapshot every child, ordered by label values
    pub fn collect(&self) -> Vec<(Vec<String>, SummarySnapshot)> {
        let children: Vec<(Vec<String>, Arc<Summary>)> = self.children
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), Arc::clone(v)))
            .collect();
        let mut res: Vec<(Vec<String>, SummarySnapshot)> = children
            .into_iter()
            .map(|(k, v)| (k, v.collect()))
            .collect();
        res.sort_by(|a, b| a.0.cmp(&b.0));
        res
    }

    fn key(&self, values: &[&str]) -> Result<Vec<String>> {
        if values.len() != self.label_names.len() {
            return Err(Error::InconsistentCardinality {
                expected: self.label_names.len(),
                found: values.len(),
            });
        }
        Ok(values.iter().map(|s| (*s).to_string()).collect())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::f64;

    fn p50_p99() -> Config {
        Config::default()
            .objective(0.99, 0.001)
            .unwrap()
            .objective(0.5, 0.05)
            .unwrap()
    }

    #[test]
    fn defaults() {
        let config = Config::default();
        assert!(config.objectives.is_empty());
        assert_eq!(Duration::from_secs(600), config.max_age);
        assert_eq!(5, config.age_buckets);
        assert_eq!(500, config.buffer_capacity);
    }

    #[test]
    fn config_validation() {
        assert_eq!(
            Err(Error::InvalidBufferCapacity),
            Config::default().buffer_capacity(0).validate()
        );
        assert_eq!(
            Err(Error::InvalidMaxAge),
            Config::default().max_age(Duration::from_secs(0)).validate()
        );
        assert_eq!(
            Err(Error::InvalidMaxAge),
            Config::default()
                .max_age(Duration::from_secs(u64::MAX))
                .age_buckets(1)
                .validate()
        );
        assert_eq!(
            Some(Error::InvalidQuantile(1.01)),
            Config::default().objective(1.01, 0.01).err()
        );
        assert!(Summary::new(Config::default().age_buckets(0)).is_err());
    }

    #[test]
    fn count_and_sum_are_exact() {
        let summary = Summary::new(p50_p99()).unwrap();
        for i in 0..10_000 {
            summary.observe(i as f64);
        }
        assert_eq!(10_000, summary.count());
        assert_eq!(49_995_000.0, summary.sum());
    }

    #[test]
    fn nan_counts_toward_nothing() {
        let summary = Summary::new(p50_p99()).unwrap();
        summary.observe(f64::NAN);
        summary.observe(1.0);
        assert_eq!(1, summary.count());
        assert_eq!(1.0, summary.sum());
        assert_eq!(1.0, summary.quantile(0.5));
    }

    #[test]
    fn collect_reports_objectives_in_order() {
        let summary = Summary::new(p50_p99()).unwrap();
        for i in 1..1001 {
            summary.observe(i as f64);
        }
        let snapshot = summary.collect();
        assert_eq!(1000, snapshot.sample_count);
        assert_eq!(500_500.0, snapshot.sample_sum);
        assert_eq!(2, snapshot.quantiles.len());
        assert_eq!(0.5, snapshot.quantiles[0].quantile);
        assert_eq!(0.99, snapshot.quantiles[1].quantile);
        assert!((snapshot.quantiles[0].value - 500.0).abs() <= 100.0);
        assert!((snapshot.quantiles[1].value - 990.0).abs() <= 2.0);
    }

    #[test]
    fn empty_window_reports_nan() {
        let summary = Summary::new(p50_p99()).unwrap();
        let snapshot = summary.collect();
        assert_eq!(0, snapshot.sample_count);
        assert!(snapshot.quantiles.iter().all(|q| q.value.is_nan()));
    }

    #[test]
    fn count_survives_decay() {
        let (clock, mock) = Clock::mock();
        let config = p50_p99().max_age(Duration::from_secs(60));
        let summary = Summary::with_clock(config, clock).unwrap();
        summary.observe(3.0);
        summary.observe(4.0);
        let median = summary.quantile(0.5);
        assert!(median >= 3.0 && median <= 4.0, "median: {}", median);

        mock.increment(Duration::from_secs(120));
        let snapshot = summary.collect();
        assert_eq!(2, snapshot.sample_count);
        assert_eq!(7.0, snapshot.sample_sum);
        assert!(snapshot.quantiles[0].value.is_nan());
    }

    #[test]
    fn reset_clears_everything() {
        let summary = Summary::new(p50_p99()).unwrap();
        summary.observe(2.0);
        summary.reset();
        let snapshot = summary.collect();
        assert_eq!(0, snapshot.sample_count);
        assert_eq!(0.0, snapshot.sample_sum);
        assert!(snapshot.quantiles[1].value.is_nan());
    }

    #[test]
    fn duplicate_objectives_report_once() {
        let config = p50_p99().objective(0.5, 0.01).unwrap();
        let summary = Summary::new(config).unwrap();
        assert_eq!(2, summary.collect().quantiles.len());
    }

    #[test]
    fn family_children_are_shared() {
        let family = SummaryVec::new(&["method", "code"], p50_p99()).unwrap();
        let a = family.with_label_values(&["GET", "200"]).unwrap();
        let b = family.with_label_values(&["GET", "200"]).unwrap();
        assert!(Arc::ptr_eq(&a, &b));

        a.observe(1.0);
        b.observe(2.0);
        assert_eq!(2, a.count());
        assert_eq!(
            &["method".to_string(), "code".to_string()][..],
            family.label_names()
        );
    }

    #[test]
    fn family_label_cardinality() {
        let family = SummaryVec::new(&["method"], p50_p99()).unwrap();
        assert_eq!(
            Some(Error::InconsistentCardinality {
                expected: 1,
                found: 2
            }),
            family.with_label_values(&["GET", "200"]).err()
        );
        assert!(family.with_label_values(&[]).is_err());
    }

    #[test]
    fn family_reserves_quantile_label() {
        assert_eq!(
            Some(Error::ReservedLabel("quantile".to_string())),
            SummaryVec::new(&["path", "quantile"], p50_p99()).err()
        );
    }

    #[test]
    fn family_remove_and_collect() {
        let family = SummaryVec::new(&["path"], p50_p99()).unwrap();
        family.with_label_values(&["/b"]).unwrap().observe(1.0);
        family.with_label_values(&["/a"]).unwrap().observe(2.0);
        family.with_label_values(&["/c"]).unwrap().observe(3.0);

        let removed = family.remove_label_values(&["/c"]).unwrap();
        assert_eq!(Some(1), removed.map(|s| s.count()));
        assert!(family.remove_label_values(&["/c"]).unwrap().is_none());

        let collected = family.collect();
        let labels: Vec<&str> = collected.iter().map(|c| c.0[0].as_str()).collect();
        assert_eq!(vec!["/a", "/b"], labels);
        assert_eq!(2.0, collected[0].1.sample_sum);
    }
}
