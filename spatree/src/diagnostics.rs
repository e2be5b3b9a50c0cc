/// Capability recording the work performed by the search primitives.
///
/// Counters are plain accumulators without any synchronisation. When searching from multiple
/// threads, use one counter per thread and [`merge`](ComputationsCounter::merge) them afterwards.
pub trait ComputationsCounter {
    /// Records one distance computation, between two points or between regions.
    fn record_distance_computation(&mut self);

    /// Records one comparison between distances.
    fn record_comparison(&mut self);

    /// Adds the counts of `other` to this counter.
    fn merge(&mut self, other: &Self);
}

/// Counter accumulating the number of distance computations and comparisons.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Counter {
    /// Number of distance computations recorded.
    pub distance_computations: usize,
    /// Number of comparisons recorded.
    pub comparisons: usize,
}

impl Counter {
    /// Creates a new [`Counter`] with every count set to zero.
    #[inline]
    pub const fn new() -> Self {
        Self {
            distance_computations: 0,
            comparisons: 0,
        }
    }

    /// Total number of recorded operations.
    #[inline]
    pub const fn total(&self) -> usize {
        self.distance_computations + self.comparisons
    }
}

impl ComputationsCounter for Counter {
    #[inline]
    fn record_distance_computation(&mut self) {
        self.distance_computations += 1;
    }

    #[inline]
    fn record_comparison(&mut self) {
        self.comparisons += 1;
    }

    #[inline]
    fn merge(&mut self, other: &Self) {
        self.distance_computations += other.distance_computations;
        self.comparisons += other.comparisons;
    }
}

/// Counter that records nothing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NoCounter;

impl ComputationsCounter for NoCounter {
    #[inline]
    fn record_distance_computation(&mut self) {}

    #[inline]
    fn record_comparison(&mut self) {}

    #[inline]
    fn merge(&mut self, _: &Self) {}
}
