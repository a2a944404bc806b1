//! This crate provides approximate quantiles over decaying windows of a data
//! stream, in a bounded amount of memory.
//!
//! It is the statistical core of a summary metric. Observations are buffered
//! by a [`QuantileStream`](stream/struct.QuantileStream.html), sorted in
//! batches and folded into a ring of compressed sample streams, one per age
//! bucket. Quantile queries are answered from the oldest bucket, which covers
//! the configured maximum age.
//!
//! The error each sample stream tolerates is set by an
//! [`Invariant`](invariant/enum.Invariant.html): tight near low ranks, tight
//! near high ranks, or tight only around a set of targeted quantiles.
//!
//! # Examples
//!
//! ```
//! use std::time::Duration;
//! use summary_quantiles::invariant::Invariant;
//! use summary_quantiles::stream::QuantileStream;
//!
//! let stream = QuantileStream::new(
//!     500,
//!     Duration::from_secs(600),
//!     5,
//!     Invariant::LowBiased(0.01),
//! ).unwrap();
//! for i in 0..1000 {
//!     stream.append(i as f64);
//! }
//! stream.flush();
//!
//! let median = stream.query(0.5);
//! assert!((median - 500.0).abs() <= 5.0);
//! ```
#![deny(missing_docs, missing_copy_implementations, missing_debug_implementations,
        unstable_features, unused_import_braces)]

#[cfg(test)]
#[macro_use]
extern crate quickcheck;

#[cfg(feature = "serde_support")]
#[macro_use]
extern crate serde_derive;

#[macro_use]
extern crate log;

pub mod atomic;
pub mod ckms;
mod error;
pub mod invariant;
pub mod stream;
pub mod summary;
#[doc(hidden)]
pub mod util;

pub use crate::error::{Error, Result};
