//! Half-open position ranges.
//!
//! Every range in Tabula is `[start, end)`. A range with `start == end` is a
//! *point*: it covers nothing but still names a location, which is how
//! structural diffs express where a deleted block used to be or where an
//! inserted block goes.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A half-open `[start, end)` range of positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct PositionRange {
    /// First position covered (inclusive).
    pub start: usize,
    /// One past the last position covered (exclusive).
    pub end: usize,
}

impl PositionRange {
    /// Create a range. `end` is raised to `start` if it is smaller.
    #[inline]
    pub const fn new(start: usize, end: usize) -> Self {
        let end = if end < start { start } else { end };
        Self { start, end }
    }

    /// A collapsed range at `at`.
    #[inline]
    pub const fn point(at: usize) -> Self {
        Self { start: at, end: at }
    }

    /// Number of positions covered.
    #[inline]
    pub const fn len(&self) -> usize {
        self.end - self.start
    }

    /// True for a collapsed range.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// True if `position` lies inside the range.
    #[inline]
    pub const fn contains(&self, position: usize) -> bool {
        position >= self.start && position < self.end
    }

    /// Iterate the covered positions.
    #[inline]
    pub fn iter(&self) -> std::ops::Range<usize> {
        self.start..self.end
    }
}

impl From<std::ops::Range<usize>> for PositionRange {
    fn from(r: std::ops::Range<usize>) -> Self {
        Self::new(r.start, r.end)
    }
}

impl fmt::Display for PositionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// Coalesce positions into maximal contiguous ranges.
///
/// Input order and duplicates do not matter; the output is sorted.
pub fn coalesce(positions: impl IntoIterator<Item = usize>) -> Vec<PositionRange> {
    let mut sorted: Vec<usize> = positions.into_iter().collect();
    sorted.sort_unstable();
    sorted.dedup();

    let mut ranges: Vec<PositionRange> = Vec::new();
    for p in sorted {
        match ranges.last_mut() {
            Some(last) if last.end == p => last.end = p + 1,
            _ => ranges.push(PositionRange::new(p, p + 1)),
        }
    }
    ranges
}
