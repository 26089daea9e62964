#![forbid(unsafe_code)]

//! Reorder layer.
//!
//! Presents the entries of the layer below in a user-chosen order. Its
//! translators hold data indexes; nothing is ever hidden here. Because the
//! order differs from the layer below, pixel offsets are summed locally in
//! an [`AggregateCache`] that is dropped on every change.

use std::cell::RefCell;

use tabula_core::{Axis, PositionRange, coalesce};
use tabula_layout::AggregateCache;

use crate::command::Command;
use crate::diff;
use crate::event::{LayerEvent, StructuralEvent};
use crate::layer::{CommandOutcome, Layer, StackView};
use crate::translator::PositionIndexTranslator;

/// Layer that reorders the entries below it.
#[derive(Debug, Default)]
pub struct ReorderLayer {
    translators: [PositionIndexTranslator; 2],
    offsets: [RefCell<AggregateCache>; 2],
}

impl ReorderLayer {
    /// Empty layer; it picks up the order below when pushed onto a stack.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Data indexes of `axis` in their current order.
    #[must_use]
    pub fn order(&self, axis: Axis) -> &[usize] {
        self.translators[axis.slot()].full_order()
    }

    fn translator_mut(&mut self, axis: Axis) -> &mut PositionIndexTranslator {
        &mut self.translators[axis.slot()]
    }

    fn invalidate(&mut self, axis: Axis) {
        self.offsets[axis.slot()].get_mut().clear();
    }

    fn resync(&mut self, axis: Axis, below: StackView<'_>) -> Vec<diff::StructuralDiff> {
        let before = self.translators[axis.slot()].visible_indexes().to_vec();
        self.translator_mut(axis).reconcile(below.indexes(axis));
        diff::diff_sequences(&before, self.translators[axis.slot()].visible_indexes())
    }
}

impl Layer for ReorderLayer {
    fn name(&self) -> &'static str {
        "reorder"
    }

    fn attach(&mut self, below: StackView<'_>) {
        for axis in Axis::ALL {
            self.translator_mut(axis).reconcile(below.indexes(axis));
            self.invalidate(axis);
        }
    }

    fn position_count(&self, axis: Axis, _below: StackView<'_>) -> usize {
        self.translators[axis.slot()].len()
    }

    fn underlying_position(&self, axis: Axis, position: usize, below: StackView<'_>) -> Option<usize> {
        let index = self.translators[axis.slot()].index_by_position(position)?;
        below.position_by_index(axis, index)
    }

    fn local_position(&self, axis: Axis, underlying: usize, below: StackView<'_>) -> Option<usize> {
        let index = below.index_by_position(axis, underlying)?;
        self.translators[axis.slot()].position_by_index(index)
    }

    fn index_by_position(&self, axis: Axis, position: usize, _below: StackView<'_>) -> Option<usize> {
        self.translators[axis.slot()].index_by_position(position)
    }

    fn position_by_index(&self, axis: Axis, index: usize, _below: StackView<'_>) -> Option<usize> {
        self.translators[axis.slot()].position_by_index(index)
    }

    fn start_pixel(&self, axis: Axis, position: usize, below: StackView<'_>) -> u64 {
        let end = position.min(self.position_count(axis, below));
        self.offsets[axis.slot()]
            .borrow_mut()
            .offset(end, |p| self.size(axis, p, below))
    }

    fn handle(&mut self, command: Command, below: StackView<'_>) -> CommandOutcome {
        let axis = command.axis();
        if let Command::Reorder { from, to, .. } = command {
            return match self.translator_mut(axis).reorder(from, to) {
                Some(diffs) => {
                    self.invalidate(axis);
                    CommandOutcome::emit(StructuralEvent::with_diffs(axis, diffs))
                }
                None => CommandOutcome::done(),
            };
        }
        let end = below.position_count(axis);
        match command.map_positions(|p| self.underlying_position(axis, p, below), |_| end) {
            Some(forwarded) => CommandOutcome::Forward(forwarded),
            None => CommandOutcome::Ignored,
        }
    }

    fn on_event(&mut self, event: LayerEvent, below: StackView<'_>) -> Option<LayerEvent> {
        let axis = event.axis();
        self.invalidate(axis);
        match event {
            LayerEvent::Structural(StructuralEvent {
                index_change: Some(change),
                ..
            }) => {
                let slot = axis.slot();
                let before: Vec<Option<usize>> = self.translators[slot]
                    .visible_indexes()
                    .iter()
                    .map(|&index| change.map_index(index))
                    .collect();
                self.translator_mut(axis).handle_structural_change(&change);
                let after: Vec<Option<usize>> = self.translators[slot]
                    .visible_indexes()
                    .iter()
                    .map(|&index| Some(index))
                    .collect();
                Some(LayerEvent::Structural(StructuralEvent {
                    axis,
                    diffs: Some(diff::diff_sequences(&before, &after)),
                    index_change: Some(change),
                }))
            }
            LayerEvent::Structural(event) => {
                let diffs = self.resync(axis, below);
                Some(LayerEvent::Structural(StructuralEvent {
                    axis,
                    diffs: event.diffs.map(|_| diffs),
                    index_change: None,
                }))
            }
            LayerEvent::Visual { range, .. } => {
                let local = coalesce(
                    range
                        .iter()
                        .filter_map(|u| self.local_position(axis, u, below)),
                );
                let (first, last) = (local.first()?, local.last()?);
                Some(LayerEvent::Visual {
                    axis,
                    range: PositionRange::new(first.start, last.end),
                })
            }
        }
    }

    fn translator(&self, axis: Axis) -> Option<&PositionIndexTranslator> {
        Some(&self.translators[axis.slot()])
    }
}
