#![forbid(unsafe_code)]

//! Layer stack.
//!
//! Layers live in one arena, bottom first; the layer at level *i* reads the
//! layers `0..i` through a [`StackView`]. No layer owns or points at
//! another, so the stack hands out exactly one mutable layer at a time via
//! `split_at_mut`.
//!
//! # Role in Tabula
//! [`LayerStack::execute`] offers a command to the top layer and walks it
//! down until some layer consumes it. Events produced along the way travel
//! up from the consuming layer: each layer above updates itself first and
//! then re-expresses the event in its own space. Listeners see the event as
//! it leaves the top layer.

use std::fmt;

use tabula_core::{Axis, DataSource, GridError, IndexChange};
use tabula_layout::{LayoutState, SizingConfig};
use tracing::{debug, trace};

use crate::command::Command;
use crate::data_layer::DataLayer;
use crate::diff::{self, PositionMap, StructuralDiff};
use crate::event::{LayerEvent, StructuralEvent};
use crate::hide_show::HideShowLayer;
use crate::layer::{CommandOutcome, Layer, StackView};
use crate::reorder::ReorderLayer;
use crate::viewport::ViewportLayer;

/// Level of the data layer in a [`LayerStack::standard`] stack.
pub const DATA_LEVEL: usize = 0;
/// Level of the reorder layer in a [`LayerStack::standard`] stack.
pub const REORDER_LEVEL: usize = 1;
/// Level of the hide/show layer in a [`LayerStack::standard`] stack.
pub const HIDE_SHOW_LEVEL: usize = 2;
/// Level of the viewport layer in a [`LayerStack::standard`] stack.
pub const VIEWPORT_LEVEL: usize = 3;

type Listener = Box<dyn FnMut(&LayerEvent)>;

/// Ordered layers plus the listeners of the top layer.
#[derive(Default)]
pub struct LayerStack {
    layers: Vec<Box<dyn Layer>>,
    listeners: Vec<Listener>,
}

impl fmt::Debug for LayerStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LayerStack")
            .field("layers", &self.view())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl LayerStack {
    /// Empty stack.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Data, reorder, hide/show and viewport layers over `source`.
    #[must_use]
    pub fn standard(source: impl DataSource + 'static, config: &SizingConfig) -> Self {
        let mut stack = Self::new();
        stack.push(DataLayer::with_config(source, config));
        stack.push(ReorderLayer::new());
        stack.push(HideShowLayer::new());
        stack.push(ViewportLayer::new());
        stack
    }

    /// Put `layer` on top. It is attached to the current layers first.
    pub fn push(&mut self, layer: impl Layer + 'static) {
        let mut layer: Box<dyn Layer> = Box::new(layer);
        layer.attach(StackView::new(&self.layers));
        debug!(
            message = "stack.push",
            layer = layer.name(),
            level = self.layers.len()
        );
        self.layers.push(layer);
    }

    /// Number of layers.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.layers.len()
    }

    /// Layer at `level`.
    #[must_use]
    pub fn layer(&self, level: usize) -> Option<&dyn Layer> {
        self.layers.get(level).map(|layer| &**layer)
    }

    /// View with `level` on top.
    #[must_use]
    pub fn view_at(&self, level: usize) -> StackView<'_> {
        StackView::new(&self.layers).truncated(level + 1)
    }

    /// View of the whole stack.
    #[must_use]
    pub fn view(&self) -> StackView<'_> {
        StackView::new(&self.layers)
    }

    /// Register a listener for events leaving the top layer.
    pub fn subscribe(&mut self, listener: impl FnMut(&LayerEvent) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    // ── Commands and events ─────────────────────────────────────────────

    /// Offer `command` to the top layer. Returns `true` if some layer
    /// consumed it.
    pub fn execute(&mut self, command: Command) -> bool {
        match self.layers.len().checked_sub(1) {
            Some(top) => self.dispatch(top, command),
            None => false,
        }
    }

    /// Apply a data-source change that has already happened. The data
    /// layer shifts its state and the resulting event travels up.
    pub fn apply_data_change(&mut self, axis: Axis, change: IndexChange) {
        let Some(data) = self.layers.first_mut() else {
            return;
        };
        if let Some(event) = data.on_data_change(axis, change) {
            self.propagate(DATA_LEVEL, event);
        }
    }

    fn dispatch(&mut self, mut level: usize, mut command: Command) -> bool {
        loop {
            let (below, rest) = self.layers.split_at_mut(level);
            let Some(layer) = rest.first_mut() else {
                return false;
            };
            debug!(
                message = "stack.command",
                command = command.name(),
                layer = layer.name(),
                level
            );
            match layer.handle(command, StackView::new(below)) {
                CommandOutcome::Forward(next) => {
                    let Some(lower) = level.checked_sub(1) else {
                        trace!(message = "stack.unhandled", command = next.name());
                        return false;
                    };
                    level = lower;
                    command = next;
                }
                CommandOutcome::Consumed { event, follow_up } => {
                    if let Some(follow_up) = follow_up {
                        let name = follow_up.name();
                        let handled = level
                            .checked_sub(1)
                            .is_some_and(|lower| self.dispatch(lower, follow_up));
                        if !handled {
                            debug!(message = "stack.follow_up_unhandled", command = name, level);
                        }
                    }
                    if let Some(event) = event {
                        self.propagate(level, event);
                    }
                    return true;
                }
                CommandOutcome::Ignored => return false,
            }
        }
    }

    /// Send `event`, emitted by the layer at `from`, through every layer
    /// above it and on to the listeners.
    fn propagate(&mut self, from: usize, event: LayerEvent) {
        let mut event = event;
        for level in from + 1..self.layers.len() {
            let (below, rest) = self.layers.split_at_mut(level);
            let Some(layer) = rest.first_mut() else {
                break;
            };
            match layer.on_event(event, StackView::new(below)) {
                Some(next) => event = next,
                None => {
                    trace!(message = "stack.event_absorbed", layer = layer.name(), level);
                    return;
                }
            }
        }
        for listener in &mut self.listeners {
            listener(&event);
        }
    }

    // ── Top-level queries ───────────────────────────────────────────────

    /// Positions of the top layer.
    #[must_use]
    pub fn position_count(&self, axis: Axis) -> usize {
        self.view().position_count(axis)
    }

    /// Data index at top-level `position`.
    #[must_use]
    pub fn index_by_position(&self, axis: Axis, position: usize) -> Option<usize> {
        self.view().index_by_position(axis, position)
    }

    /// Top-level position of data `index`.
    #[must_use]
    pub fn position_by_index(&self, axis: Axis, index: usize) -> Option<usize> {
        self.view().position_by_index(axis, index)
    }

    /// Size in pixels of top-level `position`.
    #[must_use]
    pub fn size(&self, axis: Axis, position: usize) -> u32 {
        self.view().size(axis, position)
    }

    /// Start pixel of top-level `position`.
    #[must_use]
    pub fn start_pixel(&self, axis: Axis, position: usize) -> u64 {
        self.view().start_pixel(axis, position)
    }

    /// Data indexes shown by the top layer, in position order.
    #[must_use]
    pub fn indexes(&self, axis: Axis) -> Vec<usize> {
        self.view().indexes(axis)
    }

    /// Data indexes hidden by any layer, ascending.
    #[must_use]
    pub fn hidden_indexes(&self, axis: Axis) -> Vec<usize> {
        let mut hidden: Vec<usize> = self
            .layers
            .iter()
            .filter_map(|layer| layer.translator(axis))
            .flat_map(|translator| translator.hidden_indexes())
            .collect();
        hidden.sort_unstable();
        hidden.dedup();
        hidden
    }

    /// [`index_by_position`](Self::index_by_position), failing with
    /// [`GridError::OutOfRange`].
    pub fn try_index_by_position(&self, axis: Axis, position: usize) -> Result<usize, GridError> {
        self.view().try_index_by_position(axis, position)
    }

    /// [`size`](Self::size), failing with [`GridError::OutOfRange`].
    pub fn try_size(&self, axis: Axis, position: usize) -> Result<u32, GridError> {
        self.view().try_size(axis, position)
    }

    // ── Diff conversion ─────────────────────────────────────────────────

    /// Re-express `diffs` given in the space of level `from` in the space
    /// of level `to` (`from <= to`), using the current state of the layers
    /// in between for both before and after ranges.
    #[must_use]
    pub fn convert_to_local(
        &self,
        diffs: &[StructuralDiff],
        axis: Axis,
        from: usize,
        to: usize,
    ) -> Vec<StructuralDiff> {
        let to = to.min(self.layers.len().saturating_sub(1));
        if from >= to {
            return diffs.to_vec();
        }
        let map = LevelMap {
            layers: &self.layers,
            axis,
            from,
            to,
        };
        diff::convert(diffs, &map, &map)
    }

    // ── Persistence ─────────────────────────────────────────────────────

    /// Collect the persisted state of every layer.
    #[must_use]
    pub fn save_state(&self) -> LayoutState {
        let mut state = LayoutState::default();
        for layer in &self.layers {
            layer.save_state(&mut state);
        }
        state
    }

    /// Restore `state` bottom up, then ask everyone to refresh.
    pub fn restore_state(&mut self, state: &LayoutState) {
        for level in 0..self.layers.len() {
            let (below, rest) = self.layers.split_at_mut(level);
            let Some(layer) = rest.first_mut() else {
                break;
            };
            let commands = layer.restore_state(state, StackView::new(below));
            if let Some(lower) = level.checked_sub(1) {
                for command in commands {
                    self.dispatch(lower, command);
                }
            }
        }
        debug!(
            message = "stack.restore",
            hidden_columns = state.columns.hidden.len(),
            hidden_rows = state.rows.hidden.len()
        );
        for axis in Axis::ALL {
            self.propagate(DATA_LEVEL, StructuralEvent::refresh(axis).into());
        }
    }
}

/// Positions of one level mapped up to another through the layers'
/// `local_position`.
struct LevelMap<'a> {
    layers: &'a [Box<dyn Layer>],
    axis: Axis,
    from: usize,
    to: usize,
}

impl PositionMap for LevelMap<'_> {
    fn map_position(&self, position: usize) -> Option<usize> {
        (self.from + 1..=self.to).try_fold(position, |p, level| {
            let layer = self.layers.get(level)?;
            layer.local_position(self.axis, p, StackView::new(&self.layers[..level]))
        })
    }

    fn map_point(&self, position: usize) -> usize {
        (self.from + 1..=self.to).fold(position, |p, level| match self.layers.get(level) {
            Some(layer) => {
                layer.local_insertion_point(self.axis, p, StackView::new(&self.layers[..level]))
            }
            None => p,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use tabula_core::{PositionRange, SharedDimensions};

    fn stack(columns: usize, rows: usize) -> LayerStack {
        LayerStack::standard(SharedDimensions::new(columns, rows), &SizingConfig::default())
    }

    #[test]
    fn standard_stack_has_four_levels() {
        let stack = stack(3, 2);
        assert_eq!(stack.depth(), 4);
        assert_eq!(stack.layer(DATA_LEVEL).map(|l| l.name()), Some("data"));
        assert_eq!(stack.layer(REORDER_LEVEL).map(|l| l.name()), Some("reorder"));
        assert_eq!(stack.layer(HIDE_SHOW_LEVEL).map(|l| l.name()), Some("hide_show"));
        assert_eq!(stack.layer(VIEWPORT_LEVEL).map(|l| l.name()), Some("viewport"));
        assert_eq!(stack.indexes(Axis::Column), vec![0, 1, 2]);
        assert_eq!(stack.start_pixel(Axis::Row, 2), 40);
    }

    #[test]
    fn empty_stack_ignores_everything() {
        let mut stack = LayerStack::new();
        assert!(!stack.execute(Command::ShowAll { axis: Axis::Row }));
        assert_eq!(stack.position_count(Axis::Row), 0);
        assert!(stack.try_size(Axis::Row, 0).is_err());
    }

    #[test]
    fn listeners_see_top_level_events() {
        let mut stack = stack(5, 1);
        let seen: Rc<RefCell<Vec<LayerEvent>>> = Rc::default();
        let sink = Rc::clone(&seen);
        stack.subscribe(move |event| sink.borrow_mut().push(event.clone()));

        assert!(stack.execute(Command::Hide {
            axis: Axis::Column,
            positions: vec![1],
        }));
        let events = seen.borrow();
        assert!(events.iter().any(|e| e.diffs()
            == Some(&[StructuralDiff::delete(PositionRange::new(1, 2), 1)][..])));
    }

    #[test]
    fn unhandled_command_reports_false() {
        let mut stack = stack(2, 2);
        assert!(!stack.execute(Command::Resize {
            axis: Axis::Column,
            position: 9,
            size: 10,
        }));
    }
}
