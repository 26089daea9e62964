#![forbid(unsafe_code)]

//! Bottom layer: data extents and sizes.
//!
//! The data layer's positions are data indexes. It reads its extents from a
//! [`DataSource`] and owns one [`SizeAllocator`] per axis, which makes it the
//! only layer that handles sizing commands.

use tabula_core::{Axis, ChangeKind, DataSource, IndexChange, PositionRange, coalesce};
use tabula_layout::{AxisState, LayoutState, SizeAllocator, SizingConfig};
use tracing::debug;

use crate::command::Command;
use crate::diff::StructuralDiff;
use crate::event::{LayerEvent, StructuralEvent};
use crate::layer::{CommandOutcome, Layer, StackView};

/// Layer over a [`DataSource`].
pub struct DataLayer {
    source: Box<dyn DataSource>,
    allocators: [SizeAllocator; 2],
}

impl std::fmt::Debug for DataLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataLayer")
            .field("columns", &self.source.column_count())
            .field("rows", &self.source.row_count())
            .finish_non_exhaustive()
    }
}

impl DataLayer {
    /// Data layer with default sizing.
    #[must_use]
    pub fn new(source: impl DataSource + 'static) -> Self {
        Self::with_config(source, &SizingConfig::default())
    }

    /// Data layer whose allocators carry `config`.
    #[must_use]
    pub fn with_config(source: impl DataSource + 'static, config: &SizingConfig) -> Self {
        Self {
            source: Box::new(source),
            allocators: [
                config.build_allocator(Axis::Column),
                config.build_allocator(Axis::Row),
            ],
        }
    }

    /// Allocator of `axis`.
    #[must_use]
    pub fn allocator(&self, axis: Axis) -> &SizeAllocator {
        &self.allocators[axis.slot()]
    }

    /// Mutable allocator of `axis`. Changes made through it are not
    /// announced to the layers above.
    pub fn allocator_mut(&mut self, axis: Axis) -> &mut SizeAllocator {
        &mut self.allocators[axis.slot()]
    }

    fn count(&self, axis: Axis) -> usize {
        self.source.count(axis)
    }

    fn everything(&self, axis: Axis) -> LayerEvent {
        LayerEvent::Visual {
            axis,
            range: PositionRange::new(0, self.count(axis)),
        }
    }

    /// Visual event for a change at `position`: just that position in pixel
    /// mode, everything when percentage sizing redistributes space.
    fn changed_at(&self, axis: Axis, position: usize) -> LayerEvent {
        if self.allocator(axis).uses_percentages() {
            self.everything(axis)
        } else {
            LayerEvent::Visual {
                axis,
                range: PositionRange::new(position, position + 1),
            }
        }
    }
}

impl Layer for DataLayer {
    fn name(&self) -> &'static str {
        "data"
    }

    fn position_count(&self, axis: Axis, _below: StackView<'_>) -> usize {
        self.count(axis)
    }

    fn underlying_position(&self, axis: Axis, position: usize, _below: StackView<'_>) -> Option<usize> {
        (position < self.count(axis)).then_some(position)
    }

    fn local_position(&self, axis: Axis, underlying: usize, _below: StackView<'_>) -> Option<usize> {
        (underlying < self.count(axis)).then_some(underlying)
    }

    fn index_by_position(&self, axis: Axis, position: usize, _below: StackView<'_>) -> Option<usize> {
        (position < self.count(axis)).then_some(position)
    }

    fn position_by_index(&self, axis: Axis, index: usize, _below: StackView<'_>) -> Option<usize> {
        (index < self.count(axis)).then_some(index)
    }

    fn size(&self, axis: Axis, position: usize, _below: StackView<'_>) -> u32 {
        if position < self.count(axis) {
            self.allocator(axis).get_size(position)
        } else {
            0
        }
    }

    fn start_pixel(&self, axis: Axis, position: usize, _below: StackView<'_>) -> u64 {
        self.allocator(axis)
            .get_aggregate_size(position.min(self.count(axis)))
    }

    fn handle(&mut self, command: Command, _below: StackView<'_>) -> CommandOutcome {
        match command {
            Command::Resize {
                axis,
                position,
                size,
            } => {
                if position >= self.count(axis) {
                    return CommandOutcome::done();
                }
                if self.allocator_mut(axis).set_size(position, size) {
                    CommandOutcome::emit(self.changed_at(axis, position))
                } else {
                    CommandOutcome::done()
                }
            }
            Command::SetPercentage {
                axis,
                position,
                percentage,
            } => {
                if position >= self.count(axis) {
                    return CommandOutcome::done();
                }
                self.allocator_mut(axis).set_percentage(position, percentage);
                CommandOutcome::emit(self.changed_at(axis, position))
            }
            Command::ClientAreaResized { axis, available } => {
                let count = self.count(axis);
                let allocator = self.allocator_mut(axis);
                allocator.calculate_percentages(available, count);
                if allocator.uses_percentages() {
                    CommandOutcome::emit(self.everything(axis))
                } else {
                    CommandOutcome::done()
                }
            }
            Command::ResetSizes { axis } => {
                self.allocator_mut(axis).reset();
                CommandOutcome::emit(self.everything(axis))
            }
            Command::SizingVisibility {
                axis,
                hidden,
                shown,
            } => {
                let changed: Vec<usize> = hidden.iter().chain(&shown).copied().collect();
                let allocator = self.allocator_mut(axis);
                allocator.set_hidden(hidden);
                allocator.set_shown(shown);
                if allocator.uses_percentages() {
                    return CommandOutcome::emit(self.everything(axis));
                }
                let ranges = coalesce(changed);
                match (ranges.first(), ranges.last()) {
                    (Some(first), Some(last)) => CommandOutcome::emit(LayerEvent::Visual {
                        axis,
                        range: PositionRange::new(first.start, last.end),
                    }),
                    _ => CommandOutcome::done(),
                }
            }
            other => {
                debug!(message = "data.unhandled", command = other.name());
                CommandOutcome::Ignored
            }
        }
    }

    fn on_event(&mut self, event: LayerEvent, _below: StackView<'_>) -> Option<LayerEvent> {
        Some(event)
    }

    fn on_data_change(&mut self, axis: Axis, change: IndexChange) -> Option<LayerEvent> {
        if change.is_noop() {
            return None;
        }
        self.allocator_mut(axis).handle_structural_change(&change);
        let range = PositionRange::new(change.at, change.at + change.count);
        let diff = match change.kind {
            ChangeKind::Insert => StructuralDiff::add(change.at, range),
            ChangeKind::Delete => StructuralDiff::delete(range, change.at),
        };
        debug!(
            message = "data.change",
            axis = ?axis,
            kind = ?change.kind,
            at = change.at,
            count = change.count
        );
        Some(LayerEvent::Structural(StructuralEvent {
            axis,
            diffs: Some(vec![diff]),
            index_change: Some(change),
        }))
    }

    fn save_state(&self, state: &mut LayoutState) {
        for axis in Axis::ALL {
            let slot = state.axis_mut(axis);
            let hidden = std::mem::take(&mut slot.hidden);
            *slot = AxisState::new(hidden, self.allocator(axis).entries());
        }
    }

    fn restore_state(&mut self, state: &LayoutState, _below: StackView<'_>) -> Vec<Command> {
        for axis in Axis::ALL {
            self.allocator_mut(axis)
                .restore_entries(state.axis(axis).entries());
        }
        Vec::new()
    }
}
