#![forbid(unsafe_code)]

//! Hide/show layer.
//!
//! Mirrors the order of the layer below and filters out hidden entries.
//! Each translator's full order equals the data indexes of the layer below
//! in position order, so a full-order rank *is* an underlying position.
//!
//! # Role in Tabula
//! Hide and show commands stop here. The layer emits a structural event in
//! its own space and sends a [`Command::SizingVisibility`] down so the
//! sizing layer can hand the space of hidden entries to the rest.

use rustc_hash::FxHashSet;
use tabula_core::{Axis, PositionRange, coalesce};
use tabula_layout::LayoutState;
use tracing::{debug, trace};

use crate::command::Command;
use crate::diff;
use crate::event::{LayerEvent, StructuralEvent};
use crate::layer::{CommandOutcome, Layer, StackView};
use crate::translator::PositionIndexTranslator;

/// Layer that hides entries of the layer below.
#[derive(Debug, Default)]
pub struct HideShowLayer {
    translators: [PositionIndexTranslator; 2],
}

impl HideShowLayer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Hidden data indexes of `axis`, ascending.
    #[must_use]
    pub fn hidden_indexes(&self, axis: Axis) -> Vec<usize> {
        self.translators[axis.slot()].hidden_indexes()
    }

    /// True if data `index` is hidden on `axis`.
    #[must_use]
    pub fn is_hidden(&self, axis: Axis, index: usize) -> bool {
        self.translators[axis.slot()].is_hidden(index)
    }

    fn axis_translator(&self, axis: Axis) -> &PositionIndexTranslator {
        &self.translators[axis.slot()]
    }

    fn translator_mut(&mut self, axis: Axis) -> &mut PositionIndexTranslator {
        &mut self.translators[axis.slot()]
    }

    /// Run `change` against the translator and turn the visible difference
    /// into a consumed outcome.
    fn apply(
        &mut self,
        axis: Axis,
        change: impl FnOnce(&mut PositionIndexTranslator) -> Vec<usize>,
        hiding: bool,
    ) -> CommandOutcome {
        let before = self.axis_translator(axis).visible_indexes().to_vec();
        let changed = change(self.translator_mut(axis));
        if changed.is_empty() {
            return CommandOutcome::done();
        }
        let diffs = diff::diff_sequences(&before, self.axis_translator(axis).visible_indexes());
        debug!(
            message = "hide_show.apply",
            axis = ?axis,
            hiding,
            changed = changed.len(),
            visible = self.axis_translator(axis).len()
        );
        let (hidden, shown) = if hiding {
            (changed, Vec::new())
        } else {
            (Vec::new(), changed)
        };
        CommandOutcome::Consumed {
            event: Some(StructuralEvent::with_diffs(axis, diffs).into()),
            follow_up: Some(Command::SizingVisibility {
                axis,
                hidden,
                shown,
            }),
        }
    }
}

impl Layer for HideShowLayer {
    fn name(&self) -> &'static str {
        "hide_show"
    }

    fn attach(&mut self, below: StackView<'_>) {
        for axis in Axis::ALL {
            self.translator_mut(axis).sync_order(below.indexes(axis));
        }
    }

    fn position_count(&self, axis: Axis, _below: StackView<'_>) -> usize {
        self.axis_translator(axis).len()
    }

    fn underlying_position(&self, axis: Axis, position: usize, _below: StackView<'_>) -> Option<usize> {
        self.axis_translator(axis).underlying_position(position)
    }

    fn local_position(&self, axis: Axis, underlying: usize, _below: StackView<'_>) -> Option<usize> {
        self.axis_translator(axis).local_position(underlying)
    }

    fn local_insertion_point(&self, axis: Axis, underlying: usize, _below: StackView<'_>) -> usize {
        self.axis_translator(axis).insertion_point(underlying)
    }

    fn index_by_position(&self, axis: Axis, position: usize, _below: StackView<'_>) -> Option<usize> {
        self.axis_translator(axis).index_by_position(position)
    }

    fn position_by_index(&self, axis: Axis, index: usize, _below: StackView<'_>) -> Option<usize> {
        self.axis_translator(axis).position_by_index(index)
    }

    fn start_pixel(&self, axis: Axis, position: usize, below: StackView<'_>) -> u64 {
        match self.underlying_position(axis, position, below) {
            Some(underlying) => below.start_pixel(axis, underlying),
            None => below.start_pixel(axis, below.position_count(axis)),
        }
    }

    fn handle(&mut self, command: Command, below: StackView<'_>) -> CommandOutcome {
        match command {
            Command::Hide { axis, positions } => {
                self.apply(axis, |t| t.hide(positions), true)
            }
            Command::Show { axis, indexes } => self.apply(axis, |t| t.show(indexes), false),
            Command::ShowAll { axis } => self.apply(axis, PositionIndexTranslator::show_all, false),
            Command::ShowAdjacent {
                axis,
                position,
                toward_start,
                cascade,
            } => self.apply(
                axis,
                |t| t.show_adjacent(position, toward_start, cascade),
                false,
            ),
            other => {
                let axis = other.axis();
                let end = below.position_count(axis);
                match other.map_positions(|p| self.underlying_position(axis, p, below), |_| end) {
                    Some(forwarded) => CommandOutcome::Forward(forwarded),
                    None => CommandOutcome::Ignored,
                }
            }
        }
    }

    fn on_event(&mut self, event: LayerEvent, below: StackView<'_>) -> Option<LayerEvent> {
        let axis = event.axis();
        match event {
            LayerEvent::Structural(StructuralEvent {
                index_change: Some(change),
                ..
            }) => {
                let before: Vec<Option<usize>> = self
                    .axis_translator(axis)
                    .visible_indexes()
                    .iter()
                    .map(|&index| change.map_index(index))
                    .collect();
                let translator = self.translator_mut(axis);
                translator.handle_structural_change(&change);
                translator.sync_order(below.indexes(axis));
                let after: Vec<Option<usize>> = self
                    .axis_translator(axis)
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
            LayerEvent::Structural(StructuralEvent {
                diffs: Some(diffs), ..
            }) if diff::is_reorder(&diffs) => {
                let before = self.axis_translator(axis).clone();
                self.translator_mut(axis).sync_order(below.indexes(axis));
                let after = self.axis_translator(axis);
                if before.visible_indexes() == after.visible_indexes() {
                    trace!(message = "hide_show.reorder_hidden_only", axis = ?axis);
                    return None;
                }
                let converted = diff::convert(&diffs, &before, after);
                let replayed = diff::replay_moves(before.visible_indexes(), &converted);
                let diffs = if replayed.as_deref() == Some(after.visible_indexes()) {
                    converted
                } else {
                    diff::diff_sequences(before.visible_indexes(), after.visible_indexes())
                };
                Some(StructuralEvent::with_diffs(axis, diffs).into())
            }
            LayerEvent::Structural(StructuralEvent { diffs, .. }) => {
                let before = self.axis_translator(axis).visible_indexes().to_vec();
                self.translator_mut(axis).sync_order(below.indexes(axis));
                let after = self.axis_translator(axis).visible_indexes();
                Some(LayerEvent::Structural(StructuralEvent {
                    axis,
                    diffs: diffs.map(|_| diff::diff_sequences(&before, after)),
                    index_change: None,
                }))
            }
            LayerEvent::Visual { range, .. } => {
                let translator = self.axis_translator(axis);
                let local = coalesce(range.iter().filter_map(|u| translator.local_position(u)));
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

    fn save_state(&self, state: &mut LayoutState) {
        for axis in Axis::ALL {
            state.axis_mut(axis).hidden = self.hidden_indexes(axis);
        }
    }

    fn restore_state(&mut self, state: &LayoutState, _below: StackView<'_>) -> Vec<Command> {
        let mut commands = Vec::new();
        for axis in Axis::ALL {
            let previous: FxHashSet<usize> = self.hidden_indexes(axis).into_iter().collect();
            let translator = self.translator_mut(axis);
            translator.set_hidden_indexes(state.axis(axis).hidden.iter().copied());
            let now = translator.hidden_indexes();
            let current: FxHashSet<usize> = now.iter().copied().collect();
            let hidden: Vec<usize> = now
                .iter()
                .copied()
                .filter(|index| !previous.contains(index))
                .collect();
            let mut shown: Vec<usize> = previous
                .into_iter()
                .filter(|index| !current.contains(index))
                .collect();
            shown.sort_unstable();
            if !hidden.is_empty() || !shown.is_empty() {
                commands.push(Command::SizingVisibility {
                    axis,
                    hidden,
                    shown,
                });
            }
        }
        commands
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_layer::DataLayer;
    use crate::diff::StructuralDiff;
    use crate::reorder::ReorderLayer;
    use tabula_core::SharedDimensions;

    fn below(columns: usize) -> Vec<Box<dyn Layer>> {
        let mut layers: Vec<Box<dyn Layer>> = vec![Box::new(DataLayer::new(
            SharedDimensions::new(columns, 1),
        ))];
        let mut reorder = ReorderLayer::new();
        reorder.attach(StackView::new(&layers));
        layers.push(Box::new(reorder));
        layers
    }

    fn attached(layers: &[Box<dyn Layer>]) -> HideShowLayer {
        let mut layer = HideShowLayer::new();
        layer.attach(StackView::new(layers));
        layer
    }

    fn r(start: usize, end: usize) -> PositionRange {
        PositionRange::new(start, end)
    }

    #[test]
    fn hide_consumes_and_sends_sizing_down() {
        let layers = below(5);
        let mut layer = attached(&layers);
        let outcome = layer.handle(
            Command::Hide {
                axis: Axis::Column,
                positions: vec![1, 2],
            },
            StackView::new(&layers),
        );
        assert_eq!(
            outcome,
            CommandOutcome::Consumed {
                event: Some(
                    StructuralEvent::with_diffs(
                        Axis::Column,
                        vec![StructuralDiff::delete(r(1, 3), 1)]
                    )
                    .into()
                ),
                follow_up: Some(Command::SizingVisibility {
                    axis: Axis::Column,
                    hidden: vec![1, 2],
                    shown: Vec::new(),
                }),
            }
        );
        assert_eq!(layer.hidden_indexes(Axis::Column), vec![1, 2]);
        assert_eq!(layer.position_count(Axis::Column, StackView::new(&layers)), 3);
    }

    #[test]
    fn start_pixel_skips_hidden() {
        let layers = below(4);
        let mut layer = attached(&layers);
        let view = StackView::new(&layers);
        layer.handle(
            Command::Hide {
                axis: Axis::Column,
                positions: vec![0],
            },
            view,
        );
        assert_eq!(layer.start_pixel(Axis::Column, 0, view), 100);
        assert_eq!(layer.start_pixel(Axis::Column, 3, view), 400);
    }

    #[test]
    fn show_of_visible_index_does_nothing() {
        let layers = below(3);
        let mut layer = attached(&layers);
        let outcome = layer.handle(
            Command::Show {
                axis: Axis::Column,
                indexes: vec![1],
            },
            StackView::new(&layers),
        );
        assert_eq!(outcome, CommandOutcome::done());
    }

    #[test]
    fn resize_is_mapped_past_hidden_entries() {
        let layers = below(4);
        let mut layer = attached(&layers);
        let view = StackView::new(&layers);
        layer.handle(
            Command::Hide {
                axis: Axis::Column,
                positions: vec![0, 1],
            },
            view,
        );
        let outcome = layer.handle(
            Command::Resize {
                axis: Axis::Column,
                position: 0,
                size: 30,
            },
            view,
        );
        assert_eq!(
            outcome,
            CommandOutcome::Forward(Command::Resize {
                axis: Axis::Column,
                position: 2,
                size: 30,
            })
        );
    }

    #[test]
    fn visual_range_is_clipped_to_visible() {
        let layers = below(5);
        let mut layer = attached(&layers);
        let view = StackView::new(&layers);
        layer.handle(
            Command::Hide {
                axis: Axis::Column,
                positions: vec![2],
            },
            view,
        );
        let event = layer.on_event(
            LayerEvent::Visual {
                axis: Axis::Column,
                range: r(2, 3),
            },
            view,
        );
        assert_eq!(event, None);
        let event = layer.on_event(
            LayerEvent::Visual {
                axis: Axis::Column,
                range: r(1, 4),
            },
            view,
        );
        assert_eq!(
            event,
            Some(LayerEvent::Visual {
                axis: Axis::Column,
                range: r(1, 3),
            })
        );
    }

    #[test]
    fn save_and_restore_hidden() {
        let layers = below(4);
        let mut layer = attached(&layers);
        let view = StackView::new(&layers);
        layer.handle(
            Command::Hide {
                axis: Axis::Row,
                positions: vec![0],
            },
            view,
        );
        let mut state = LayoutState::default();
        layer.save_state(&mut state);
        assert_eq!(state.rows.hidden, vec![0]);

        let mut fresh = attached(&layers);
        let commands = fresh.restore_state(&state, view);
        assert!(fresh.is_hidden(Axis::Row, 0));
        assert_eq!(
            commands,
            vec![Command::SizingVisibility {
                axis: Axis::Row,
                hidden: vec![0],
                shown: Vec::new(),
            }]
        );
    }
}
