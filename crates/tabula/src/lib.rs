#![forbid(unsafe_code)]

//! Tabula public facade crate.
//!
//! Re-exports the types most callers need from the internal crates and
//! offers a prelude.
//!
//! ```rust,ignore
//! use tabula::prelude::*;
//!
//! let dims = SharedDimensions::new(12, 10_000);
//! let mut grid = LayerStack::standard(dims.clone(), &SizingConfig::default());
//! grid.execute(Command::Hide { axis: Axis::Column, positions: vec![3] });
//! let x = grid.start_pixel(Axis::Column, 4);
//! ```

// --- Core re-exports -------------------------------------------------------

pub use tabula_core::{
    Axis, BASE_DPI, ChangeKind, DataSource, DpiConverter, GridError, IndexChange, PositionRange,
    SharedDimensions, coalesce,
};

// --- Layout re-exports -----------------------------------------------------

pub use tabula_layout::{
    AggregateCache, AxisSizing, AxisState, ConfigError, LayoutState, PositionedEntry,
    SizeAllocator, SizeEntry, SizingConfig,
};

// --- Layer re-exports ------------------------------------------------------

pub use tabula_layer::{
    Band, Command, CommandOutcome, DataLayer, DiffKind, HideShowLayer, LabelPrecompute, Layer,
    LayerEvent, LayerStack, PositionIndexTranslator, ReorderLayer, StackView, StructuralDiff,
    StructuralEvent, ViewportLayer, diff,
};

// --- Crate namespaces ------------------------------------------------------

pub use tabula_layer as layer;
pub use tabula_layout as layout;

/// Everything needed to build and drive a standard grid.
pub mod prelude {
    pub use crate::{
        Axis, Command, DataSource, GridError, IndexChange, LayerEvent, LayerStack, LayoutState,
        PositionRange, SharedDimensions, SizingConfig, StructuralDiff,
    };
}
