/// A single sample of a `SampleStream`
///
/// `g` is the number of raw observations the sample stands in for, `delta`
/// the rank uncertainty introduced by not recording those observations
/// exactly.
#[derive(Debug, Clone, Copy)]
pub struct Entry {
    /// Sampled value
    pub v: f64,
    /// Width, in observations
    pub g: u64,
    /// Rank uncertainty
    pub delta: u64,
}
