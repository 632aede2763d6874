//! Half-open index intervals and fixed-width partitioning.

use std::ops::Range;

/// Half-open interval `[lo, hi)` of job indices.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Interval {
    /// inclusive lower bound
    pub lo: usize,
    /// exclusive upper bound
    pub hi: usize,
}

impl Interval {
    /// Create an interval `[lo, hi)`.
    #[inline]
    #[must_use]
    pub const fn new(lo: usize, hi: usize) -> Self {
        Self { lo, hi }
    }

    /// Length of the interval.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.hi.saturating_sub(self.lo)
    }

    /// Whether the interval holds no indices.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// As a slice range.
    #[inline]
    #[must_use]
    pub const fn range(&self) -> Range<usize> {
        self.lo..self.hi
    }
}

/// Split `[0, n)` into consecutive chunks of at most `width` indices.
///
/// Yields `ceil(n / width)` intervals in ascending order; only the last may
/// be short. `width == 0` is treated as 1.
pub fn partition(n: usize, width: usize) -> impl Iterator<Item = Interval> {
    let width = width.max(1);
    (0..n)
        .step_by(width)
        .map(move |lo| Interval::new(lo, lo.saturating_add(width).min(n)))
}
