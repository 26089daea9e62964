#![forbid(unsafe_code)]

//! Size allocation for one grid dimension.
//!
//! # Role in Tabula
//! `tabula-layout` turns size requests into pixel extents. A
//! [`SizeAllocator`] owns every per-position sizing decision of one axis:
//! default and overridden pixel sizes, percentage sizing, minimum sizes,
//! resizability, DPI scaling, and which positions are excluded from sizing
//! because a layer above hides them.
//!
//! # Percentage sizing
//! When percentage sizing is on, [`SizeAllocator::calculate_percentages`]
//! records the available space and the resolved sizes always sum to it
//! exactly: truncation leftovers are handed out one pixel at a time in
//! position order. See [`percentage`] for the algorithm.
//!
//! # Caching
//! Cumulative offsets come from an [`AggregateCache`] prefix table that is
//! invalidated from the first affected position on each mutation and
//! rebuilt lazily on the next query.

pub mod aggregate;
pub mod allocator;
pub mod config;
pub mod percentage;
pub mod state;

pub use aggregate::{AggregateCache, AggregateCacheStats};
pub use allocator::SizeAllocator;
pub use config::{AxisSizing, ConfigError, SizingConfig};
pub use state::{AxisState, LayoutState, PositionedEntry, SizeEntry};
