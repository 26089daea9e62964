#![forbid(unsafe_code)]

//! The layer abstraction.
//!
//! A [`Layer`] transforms positions of the layer below it into its own
//! positions. Layers never own or point at each other: the stack passes
//! each call a [`StackView`] over the layers underneath, so a layer reads
//! the layer below through a borrow that ends with the call.
//!
//! # Role in Tabula
//! Queries walk down: a layer maps its position to an underlying position
//! and asks the view. Commands walk down through [`Layer::handle`] until a
//! layer consumes them. Events walk up through [`Layer::on_event`], each
//! layer updating itself before re-expressing the event in its own space.

use tabula_core::{Axis, GridError, IndexChange};
use tabula_layout::LayoutState;

use crate::command::Command;
use crate::event::LayerEvent;
use crate::translator::PositionIndexTranslator;

/// Result of offering a command to a layer.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandOutcome {
    /// Not handled here; pass this (converted) command to the layer below.
    Forward(Command),
    /// Handled. `follow_up` runs from the layer below before `event`
    /// travels up from this layer.
    Consumed {
        event: Option<LayerEvent>,
        follow_up: Option<Command>,
    },
    /// Not handled and nothing below can handle it.
    Ignored,
}

impl CommandOutcome {
    /// Handled with an event and nothing else.
    #[must_use]
    pub fn emit(event: impl Into<LayerEvent>) -> Self {
        Self::Consumed {
            event: Some(event.into()),
            follow_up: None,
        }
    }

    /// Handled without any visible effect.
    #[must_use]
    pub fn done() -> Self {
        Self::Consumed {
            event: None,
            follow_up: None,
        }
    }
}

/// One transformation in a layer stack.
pub trait Layer {
    /// Name for logs.
    fn name(&self) -> &'static str;

    /// Called once when the layer is pushed onto a stack, so it can take
    /// its initial state from the layers below.
    fn attach(&mut self, _below: StackView<'_>) {}

    /// Number of positions along `axis`.
    fn position_count(&self, axis: Axis, below: StackView<'_>) -> usize;

    /// Position in the layer below of local `position`.
    fn underlying_position(&self, axis: Axis, position: usize, below: StackView<'_>)
    -> Option<usize>;

    /// Local position of the layer below's `underlying` position.
    fn local_position(&self, axis: Axis, underlying: usize, below: StackView<'_>) -> Option<usize>;

    /// Where a collapsed point at `underlying` lands locally.
    fn local_insertion_point(&self, axis: Axis, underlying: usize, below: StackView<'_>) -> usize {
        if let Some(p) = self.local_position(axis, underlying, below) {
            return p;
        }
        let count = self.position_count(axis, below);
        (0..count)
            .take_while(|&p| {
                self.underlying_position(axis, p, below)
                    .is_some_and(|u| u < underlying)
            })
            .count()
    }

    /// Data index shown at `position`.
    fn index_by_position(&self, axis: Axis, position: usize, below: StackView<'_>) -> Option<usize> {
        let underlying = self.underlying_position(axis, position, below)?;
        below.index_by_position(axis, underlying)
    }

    /// Local position of data `index`, if visible here.
    fn position_by_index(&self, axis: Axis, index: usize, below: StackView<'_>) -> Option<usize> {
        let underlying = below.position_by_index(axis, index)?;
        self.local_position(axis, underlying, below)
    }

    /// Size of `position` in device pixels.
    fn size(&self, axis: Axis, position: usize, below: StackView<'_>) -> u32 {
        self.underlying_position(axis, position, below)
            .map_or(0, |u| below.size(axis, u))
    }

    /// Pixel offset of `position` from this layer's origin.
    fn start_pixel(&self, axis: Axis, position: usize, below: StackView<'_>) -> u64;

    /// Offer `command` to this layer.
    fn handle(&mut self, command: Command, below: StackView<'_>) -> CommandOutcome;

    /// Update for an event from the layer below and re-express it, or
    /// swallow it by returning `None`.
    fn on_event(&mut self, event: LayerEvent, below: StackView<'_>) -> Option<LayerEvent>;

    /// React to a data-source change. Only the bottom layer implements this.
    fn on_data_change(&mut self, _axis: Axis, _change: IndexChange) -> Option<LayerEvent> {
        None
    }

    /// This layer's translator for `axis`, if it has one.
    fn translator(&self, _axis: Axis) -> Option<&PositionIndexTranslator> {
        None
    }

    /// Contribute to persisted state.
    fn save_state(&self, _state: &mut LayoutState) {}

    /// Restore from persisted state. Returns commands for the layers below.
    fn restore_state(&mut self, _state: &LayoutState, _below: StackView<'_>) -> Vec<Command> {
        Vec::new()
    }
}

/// Read access to the layers below a given layer, bottom first.
#[derive(Clone, Copy)]
pub struct StackView<'a> {
    layers: &'a [Box<dyn Layer>],
}

impl std::fmt::Debug for StackView<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.layers.iter().map(|l| l.name()))
            .finish()
    }
}

impl<'a> StackView<'a> {
    /// View over `layers`; the last one is the top.
    #[must_use]
    pub fn new(layers: &'a [Box<dyn Layer>]) -> Self {
        Self { layers }
    }

    /// View with no layers.
    #[must_use]
    pub fn empty() -> Self {
        Self { layers: &[] }
    }

    /// Number of layers in the view.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.layers.len()
    }

    /// True when there is nothing below.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// The top layer and the view beneath it.
    fn split(&self) -> Option<(&'a dyn Layer, StackView<'a>)> {
        let (top, rest) = self.layers.split_last()?;
        Some((top.as_ref(), StackView { layers: rest }))
    }

    /// View truncated to the lowest `depth` layers.
    #[must_use]
    pub fn truncated(&self, depth: usize) -> Self {
        Self {
            layers: &self.layers[..depth.min(self.layers.len())],
        }
    }

    /// Position count of the top layer.
    #[must_use]
    pub fn position_count(&self, axis: Axis) -> usize {
        self.split()
            .map_or(0, |(top, below)| top.position_count(axis, below))
    }

    /// Data index at `position` of the top layer.
    #[must_use]
    pub fn index_by_position(&self, axis: Axis, position: usize) -> Option<usize> {
        let (top, below) = self.split()?;
        top.index_by_position(axis, position, below)
    }

    /// Top-layer position of data `index`.
    #[must_use]
    pub fn position_by_index(&self, axis: Axis, index: usize) -> Option<usize> {
        let (top, below) = self.split()?;
        top.position_by_index(axis, index, below)
    }

    /// Underlying position of `position` in the layer below the top.
    #[must_use]
    pub fn underlying_position(&self, axis: Axis, position: usize) -> Option<usize> {
        let (top, below) = self.split()?;
        top.underlying_position(axis, position, below)
    }

    /// Size of `position` of the top layer.
    #[must_use]
    pub fn size(&self, axis: Axis, position: usize) -> u32 {
        self.split()
            .map_or(0, |(top, below)| top.size(axis, position, below))
    }

    /// Start pixel of `position` of the top layer.
    #[must_use]
    pub fn start_pixel(&self, axis: Axis, position: usize) -> u64 {
        self.split()
            .map_or(0, |(top, below)| top.start_pixel(axis, position, below))
    }

    /// Data indexes of the top layer in position order.
    #[must_use]
    pub fn indexes(&self, axis: Axis) -> Vec<usize> {
        let count = self.position_count(axis);
        (0..count)
            .filter_map(|p| self.index_by_position(axis, p))
            .collect()
    }

    /// [`index_by_position`](Self::index_by_position), failing with
    /// [`GridError::OutOfRange`].
    pub fn try_index_by_position(&self, axis: Axis, position: usize) -> Result<usize, GridError> {
        let count = self.position_count(axis);
        GridError::check(axis, position, count)?;
        self.index_by_position(axis, position)
            .ok_or(GridError::OutOfRange {
                axis,
                position,
                count,
            })
    }

    /// [`size`](Self::size), failing with [`GridError::OutOfRange`].
    pub fn try_size(&self, axis: Axis, position: usize) -> Result<u32, GridError> {
        GridError::check(axis, position, self.position_count(axis))?;
        Ok(self.size(axis, position))
    }
}
