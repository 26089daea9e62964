//! Error taxonomy.
//!
//! Most failures in a grid are recovered locally: an out-of-range lookup
//! returns `None`, an out-of-range hide is skipped, a bad size is clamped.
//! [`GridError`] exists for the callers that do want to know, through the
//! `try_*` accessors, and for the one condition that is logged as fatal.

use thiserror::Error;

use crate::Axis;

/// Errors surfaced by the grid engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GridError {
    /// A position or index outside the current bounds of a layer.
    #[error("{axis:?} position {position} out of range (count {count})")]
    OutOfRange {
        /// Axis of the request.
        axis: Axis,
        /// The offending position or index.
        position: usize,
        /// The extent it was checked against.
        count: usize,
    },

    /// A configuration value that had to be clamped or rejected.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Minimum sizes could not be satisfied inside the available space.
    #[error(
        "percentage sizing did not converge: {required}px of minimums and fixed sizes exceed {available}px"
    )]
    CascadeDidNotConverge {
        /// Space the fixed and minimum sizes need.
        required: u64,
        /// Space that was available.
        available: u32,
    },
}

impl GridError {
    /// Build an [`GridError::OutOfRange`] unless `position < count`.
    pub fn check(axis: Axis, position: usize, count: usize) -> Result<usize, Self> {
        if position < count {
            Ok(position)
        } else {
            Err(Self::OutOfRange {
                axis,
                position,
                count,
            })
        }
    }
}
