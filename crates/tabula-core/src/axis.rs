#![forbid(unsafe_code)]

//! Grid axes.

use serde::{Deserialize, Serialize};

/// The dimension an operation applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    /// Columns: positions run left to right.
    #[default]
    Column,
    /// Rows: positions run top to bottom.
    Row,
}

impl Axis {
    /// Both axes, columns first.
    pub const ALL: [Axis; 2] = [Axis::Column, Axis::Row];

    /// Slot of this axis in per-axis arrays.
    #[inline]
    pub const fn slot(self) -> usize {
        match self {
            Self::Column => 0,
            Self::Row => 1,
        }
    }

    /// True for the column axis (a horizontal structure change).
    #[inline]
    pub const fn is_horizontal(self) -> bool {
        matches!(self, Self::Column)
    }

    /// The other axis.
    #[inline]
    pub const fn cross(self) -> Self {
        match self {
            Self::Column => Self::Row,
            Self::Row => Self::Column,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slots_are_distinct() {
        assert_eq!(Axis::Column.slot(), 0);
        assert_eq!(Axis::Row.slot(), 1);
    }

    #[test]
    fn cross_swaps() {
        assert_eq!(Axis::Column.cross(), Axis::Row);
        assert_eq!(Axis::Row.cross().cross(), Axis::Row);
        assert!(Axis::Column.is_horizontal());
        assert!(!Axis::Row.is_horizontal());
    }
}
