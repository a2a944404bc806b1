//! A decaying, thread-safe front end to `SampleStream`.
//!
//! Writers append raw observations to a small fixed-capacity buffer. When the
//! buffer fills, or when the next rotation boundary passes, the buffer is
//! sorted and folded into a ring of `SampleStream`s, the age buckets. Every
//! bucket receives every batch; buckets are reset round-robin, one per
//! `max_age / age_buckets`, so each covers a different trailing window. The
//! head bucket is the one that has been accumulating longest and is the one
//! queries are answered from. At steady state it holds between
//! `max_age * (1 - 1/age_buckets)` and `max_age` of history.
//!
//! Folding the same batches into overlapping buckets is not something the
//! biased quantiles paper accounts for. The error bound of the invariant is not
//! claimed to hold tight across rotations.
//!
//! Observations are visible to `query` only once flushed. Call `flush` for a
//! point-in-time read.
use std::cmp::Ordering as CmpOrdering;
use std::convert::TryFrom;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use quanta::{Clock, Instant};

use crate::ckms::SampleStream;
use crate::error::{Error, Result};
use crate::invariant::Invariant;

#[derive(Debug)]
struct AgeBuckets {
    streams: Vec<SampleStream>,
    head: usize,
}

/// Approximate quantiles over a decaying window, safe to share between
/// threads
#[derive(Debug)]
pub struct QuantileStream {
    // Lock order is scratch, then buffer, then buckets. Appenders only ever
    // take the buffer.
    buffer: Mutex<Vec<f64>>,
    scratch: Mutex<Vec<f64>>,
    buckets: RwLock<AgeBuckets>,

    // Mirrors of buffer length and the next rotation, readable without a lock
    // so the hot path can tell whether a flush is due. Times are nanoseconds
    // since `origin`, saturating at u64::MAX.
    buffered: AtomicUsize,
    next_rotation: AtomicU64,

    capacity: usize,
    max_age: Duration,
    interval: u64,
    origin: Instant,
    invariant: Arc<Invariant>,
    clock: Clock,
}

impl QuantileStream {
    /// Create a new QuantileStream on the wall clock
    ///
    /// `capacity` raw observations are buffered between flushes. History
    /// older than `max_age` decays away in `age_buckets` steps.
    ///
    /// # Examples
    /// ```
    /// use std::time::Duration;
    /// use summary_quantiles::invariant::Invariant;
    /// use summary_quantiles::stream::QuantileStream;
    ///
    /// let max_age = Duration::from_secs(60);
    /// assert!(QuantileStream::new(500, max_age, 5, Invariant::LowBiased(0.01)).is_ok());
    /// assert!(QuantileStream::new(0, max_age, 5, Invariant::LowBiased(0.01)).is_err());
    /// assert!(QuantileStream::new(500, max_age, 0, Invariant::LowBiased(0.01)).is_err());
    /// ```
    pub fn new(
        capacity: usize,
        max_age: Duration,
        age_buckets: u32,
        invariant: Invariant,
    ) -> Result<QuantileStream> {
        QuantileStream::with_clock(
            capacity,
            max_age,
            age_buckets,
            invariant,
            Clock::new(),
        )
    }

    /// Create a new QuantileStream on the given clock
    ///
    /// A mocked clock makes decay deterministic.
    ///
    /// # Examples
    /// ```
    /// use std::time::Duration;
    /// use quanta::Clock;
    /// use summary_quantiles::invariant::Invariant;
    /// use summary_quantiles::stream::QuantileStream;
    ///
    /// let (clock, mock) = Clock::mock();
    /// let max_age = Duration::from_secs(60);
    /// let stream = QuantileStream::with_clock(10, max_age, 6, Invariant::LowBiased(0.01), clock)
    ///     .unwrap();
    /// stream.append(1.0);
    /// stream.flush();
    /// assert_eq!(stream.count(), 1);
    ///
    /// mock.increment(Duration::from_secs(61));
    /// stream.flush();
    /// assert!(stream.query(0.5).is_nan());
    /// ```
    pub fn with_clock(
        capacity: usize,
        max_age: Duration,
        age_buckets: u32,
        invariant: Invariant,
        clock: Clock,
    ) -> Result<QuantileStream> {
        if capacity == 0 {
            return Err(Error::InvalidBufferCapacity);
        }
        let interval = rotation_interval(max_age, age_buckets)?;

        let invariant = Arc::new(invariant);
        let streams = (0..age_buckets)
            .map(|_| SampleStream::new(Arc::clone(&invariant)))
            .collect();
        debug!(
            "new quantile stream: capacity {} max_age {:?} age_buckets {}",
            capacity, max_age, age_buckets
        );

        Ok(QuantileStream {
            buffer: Mutex::new(Vec::with_capacity(capacity)),
            scratch: Mutex::new(Vec::with_capacity(capacity)),
            buckets: RwLock::new(AgeBuckets { streams, head: 0 }),
            buffered: AtomicUsize::new(0),
            next_rotation: AtomicU64::new(interval),
            capacity,
            max_age,
            interval,
            origin: clock.now(),
            invariant,
            clock,
        })
    }

    /// Record an observation
    ///
    /// NaN observations are ignored. The observation is buffered and becomes
    /// visible to `query` after the next flush.
    pub fn append(&self, v: f64) {
        if v.is_nan() {
            return;
        }
        loop {
            if self.flush_due() {
                self.flush_if_due();
            }
            let mut buffer = self.buffer.lock();
            if buffer.len() < self.capacity && !self.rotation_due(self.elapsed()) {
                buffer.push(v);
                self.buffered.store(buffer.len(), Ordering::Release);
                return;
            }
        }
    }

    /// Fold every buffered observation into the age buckets
    ///
    /// Rotation boundaries passed since the last flush are rolled forward
    /// first, even when nothing is buffered.
    pub fn flush(&self) {
        let mut scratch = self.scratch.lock();
        self.flush_into(&mut scratch);
    }

    /// Query the head bucket for an approximate quantile
    ///
    /// Argument q is valid 0. <= q <= 1.0 and is not checked. NaN signals that
    /// the current window holds no data.
    pub fn query(&self, q: f64) -> f64 {
        let buckets = self.buckets.read();
        buckets.streams[buckets.head].query(q)
    }

    /// Number of observations in the current window
    ///
    /// Buffered observations are not counted until flushed.
    pub fn count(&self) -> u64 {
        let buckets = self.buckets.read();
        buckets.streams[buckets.head].count()
    }

    /// Discard all history, buffered or not
    pub fn reset(&self) {
        let _scratch = self.scratch.lock();
        let mut buffer = self.buffer.lock();
        let mut buckets = self.buckets.write();

        buffer.clear();
        self.buffered.store(0, Ordering::Release);
        for stream in buckets.streams.iter_mut() {
            stream.reset();
        }
        buckets.head = 0;
        self.next_rotation
            .store(self.elapsed().saturating_add(self.interval), Ordering::Release);
    }

    /// Maximum number of buffered observations
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// The age past which observations decay
    pub fn max_age(&self) -> Duration {
        self.max_age
    }

    /// Number of age buckets in the ring
    pub fn age_buckets(&self) -> usize {
        self.buckets.read().streams.len()
    }

    /// The invariant shared by every age bucket
    pub fn invariant(&self) -> &Invariant {
        &self.invariant
    }

    fn elapsed(&self) -> u64 {
        let since = self.clock.now().saturating_duration_since(self.origin);
        u64::try_from(since.as_nanos()).unwrap_or(u64::MAX)
    }

    fn rotation_due(&self, now: u64) -> bool {
        now > self.next_rotation.load(Ordering::Acquire)
    }

    fn flush_due(&self) -> bool {
        self.buffered.load(Ordering::Acquire) >= self.capacity || self.rotation_due(self.elapsed())
    }

    // Writers racing to flush the same full buffer queue on the scratch lock.
    // All but the first find nothing left to do.
    fn flush_if_due(&self) {
        let mut scratch = self.scratch.lock();
        if self.flush_due() {
            self.flush_into(&mut scratch);
        }
    }

    fn flush_into(&self, scratch: &mut Vec<f64>) {
        {
            let mut buffer = self.buffer.lock();
            buffer.sort_unstable_by(|a, b| a.partial_cmp(b).unwrap_or(CmpOrdering::Equal));
            scratch.clear();
            scratch.extend_from_slice(&buffer);
            buffer.clear();
            self.buffered.store(0, Ordering::Release);
        }
        trace!("flushing {} observations", scratch.len());
        self.populate(scratch);
    }

    fn populate(&self, batch: &[f64]) {
        let now = self.elapsed();
        let mut buckets = self.buckets.write();

        let next = self.next_rotation.load(Ordering::Acquire);
        if now > next {
            // Every boundary strictly before now resets the head and hands
            // the title to the next oldest bucket.
            let passed = (now - next - 1) / self.interval + 1;
            let len = buckets.streams.len();
            let head = buckets.head;
            for i in 0..(passed.min(len as u64) as usize) {
                buckets.streams[(head + i) % len].reset();
            }
            buckets.head = (head + (passed % len as u64) as usize) % len;
            let advance = passed.saturating_mul(self.interval);
            self.next_rotation
                .store(next.saturating_add(advance), Ordering::Release);
            debug!("rotated {} age buckets, head is now {}", passed, buckets.head);
        }

        if !batch.is_empty() {
            for stream in buckets.streams.iter_mut() {
                stream.insert_sorted(batch);
            }
        }
    }
}

/// Nanoseconds between rotations of `age_buckets` buckets spanning `max_age`
pub(crate) fn rotation_interval(max_age: Duration, age_buckets: u32) -> Result<u64> {
    if age_buckets == 0 {
        return Err(Error::InvalidAgeBuckets);
    }
    match u64::try_from((max_age / age_buckets).as_nanos()) {
        Ok(0) | Err(_) => Err(Error::InvalidMaxAge),
        Ok(interval) => Ok(interval),
    }
}
