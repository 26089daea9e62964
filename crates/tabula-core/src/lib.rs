#![forbid(unsafe_code)]

//! Core: coordinates, ranges, data-source notifications, and errors.
//!
//! # Role in Tabula
//! `tabula-core` holds the vocabulary every other crate speaks: which
//! [`Axis`] an operation targets, half-open [`PositionRange`]s, the
//! [`DataSource`] the bottom of a layer stack reads its counts from, the
//! [`IndexChange`] notifications that data source emits, and the
//! [`GridError`] taxonomy.
//!
//! # Positions and indexes
//! A *position* is a 0-based, contiguous coordinate local to one layer. An
//! *index* is the stable identity of a row or column in the data source and
//! survives hide/show and reorder. Lookups that can miss return `Option`;
//! `None` is the out-of-range sentinel.

pub mod axis;
pub mod change;
pub mod dpi;
pub mod error;
pub mod range;

pub use axis::Axis;
pub use change::{ChangeKind, DataSource, IndexChange, SharedDimensions};
pub use dpi::{BASE_DPI, DpiConverter};
pub use error::GridError;
pub use range::{PositionRange, coalesce};
