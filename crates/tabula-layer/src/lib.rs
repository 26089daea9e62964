#![forbid(unsafe_code)]

//! Layers: translators, structural diffs, and the layer stack.
//!
//! # Role in Tabula
//! A grid view is a stack of layers. The bottom [`DataLayer`] reads extents
//! from the data source and owns the size allocators. Above it a
//! [`ReorderLayer`] permutes entries, a [`HideShowLayer`] filters them, and
//! a [`ViewportLayer`] exposes the scrolled window. Each of these maps its
//! positions onto the layer below through a [`PositionIndexTranslator`] or
//! a plain offset.
//!
//! Mutations are [`Command`]s walked down the [`LayerStack`]; their effects
//! come back up as [`LayerEvent`]s whose [`StructuralDiff`]s are
//! re-expressed in each layer's position space on the way.
//!
//! # Threading
//! Everything here runs on the owning thread except [`LabelPrecompute`],
//! which computes row shading bands on a worker.

pub mod command;
pub mod data_layer;
pub mod diff;
pub mod event;
pub mod hide_show;
pub mod label_precompute;
pub mod layer;
pub mod reorder;
pub mod stack;
pub mod translator;
pub mod viewport;

pub use command::Command;
pub use data_layer::DataLayer;
pub use diff::{DiffKind, PositionMap, StructuralDiff, TranslatorChain};
pub use event::{LayerEvent, StructuralEvent};
pub use hide_show::HideShowLayer;
pub use label_precompute::{Band, LabelPrecompute, compute_bands};
pub use layer::{CommandOutcome, Layer, StackView};
pub use reorder::ReorderLayer;
pub use stack::{DATA_LEVEL, HIDE_SHOW_LEVEL, LayerStack, REORDER_LEVEL, VIEWPORT_LEVEL};
pub use translator::PositionIndexTranslator;
pub use viewport::ViewportLayer;
