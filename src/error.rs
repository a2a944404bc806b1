/// Construction errors
///
/// Nothing in this crate fails once it has been built. Queries over empty
/// windows yield NaN. Everything that can go wrong goes wrong when a stream,
/// summary or objective is constructed, and is signalled with this
/// enumeration.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// The raw observation buffer must hold at least one value.
    #[error("buffer capacity must be positive")]
    InvalidBufferCapacity,
    /// At least one age bucket is required.
    #[error("age bucket count must be positive")]
    InvalidAgeBuckets,
    /// The maximum age, divided by the number of age buckets, must be a
    /// positive duration.
    #[error("max age must be positive and at least one nanosecond per age bucket")]
    InvalidMaxAge,
    /// Quantiles live in [0, 1].
    #[error("quantile {0} is outside of [0, 1]")]
    InvalidQuantile(f64),
    /// Allowed errors live in [0, 1].
    #[error("epsilon {0} is outside of [0, 1]")]
    InvalidEpsilon(f64),
    /// A summary family was asked for a child with the wrong number of label
    /// values.
    #[error("expected {expected} label values, found {found}")]
    InconsistentCardinality {
        /// Number of label names the family was created with.
        expected: usize,
        /// Number of label values supplied.
        found: usize,
    },
    /// Summaries emit a `quantile` label of their own.
    #[error("label name {0:?} is reserved")]
    ReservedLabel(String),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
