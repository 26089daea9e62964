#![forbid(unsafe_code)]

//! Viewport layer.
//!
//! Exposes the window of the layer below that starts at a scroll origin and
//! fits in the client area. Positions are relative to the origin; pixels
//! are relative to the origin's start pixel.
//!
//! The origin follows structural changes: entries removed in front of it
//! pull it back, entries inserted in front of it push it on, so the same
//! entry stays first where possible. Entries inserted exactly at the origin
//! become the new first entries.

use tabula_core::{Axis, PositionRange};
use tracing::debug;

use crate::command::Command;
use crate::diff::{DiffKind, StructuralDiff};
use crate::event::{LayerEvent, StructuralEvent};
use crate::layer::{CommandOutcome, Layer, StackView};

/// Scrolling window over the layer below.
#[derive(Debug, Default, Clone)]
pub struct ViewportLayer {
    origins: [usize; 2],
    extents: [Option<u32>; 2],
}

impl ViewportLayer {
    /// Viewport at origin zero with an unbounded extent.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// First underlying position shown on `axis`.
    #[must_use]
    pub fn origin(&self, axis: Axis) -> usize {
        self.origins[axis.slot()]
    }

    /// Client-area extent of `axis` in pixels, once known.
    #[must_use]
    pub fn extent(&self, axis: Axis) -> Option<u32> {
        self.extents[axis.slot()]
    }

    /// Limit the window to `extent` pixels. `None` shows everything from
    /// the origin on.
    pub fn set_extent(&mut self, axis: Axis, extent: Option<u32>) {
        self.extents[axis.slot()] = extent;
    }

    fn clamp_origin(origin: usize, total: usize) -> usize {
        origin.min(total.saturating_sub(1))
    }

    /// Origin after `diffs`, given in the layer below's before/after space.
    fn follow(origin: usize, diffs: &[StructuralDiff]) -> usize {
        let removed = diffs
            .iter()
            .filter(|d| d.kind == DiffKind::Delete)
            .map(|d| d.before.end.min(origin).saturating_sub(d.before.start))
            .sum::<usize>();
        let mut next = origin - removed.min(origin);
        let mut adds: Vec<PositionRange> = diffs
            .iter()
            .filter(|d| d.kind == DiffKind::Add)
            .map(|d| d.after)
            .collect();
        adds.sort_unstable_by_key(|r| r.start);
        for added in adds {
            if added.start < next {
                next += added.len();
            }
        }
        next
    }

    fn shift(range: PositionRange, origin: usize) -> PositionRange {
        PositionRange::new(
            range.start.saturating_sub(origin),
            range.end.saturating_sub(origin),
        )
    }

    /// Diffs re-expressed relative to the old and new origin. Parts in
    /// front of the window are dropped.
    fn localize(diffs: &[StructuralDiff], old: usize, new: usize) -> Vec<StructuralDiff> {
        diffs
            .iter()
            .filter_map(|d| {
                let local = match d.kind {
                    DiffKind::Delete => {
                        StructuralDiff::delete(Self::shift(d.before, old), d.after.start.saturating_sub(new))
                    }
                    DiffKind::Add => {
                        StructuralDiff::add(d.before.start.saturating_sub(old), Self::shift(d.after, new))
                    }
                };
                (!local.is_empty()).then_some(local)
            })
            .collect()
    }
}

impl Layer for ViewportLayer {
    fn name(&self) -> &'static str {
        "viewport"
    }

    fn position_count(&self, axis: Axis, below: StackView<'_>) -> usize {
        let total = below.position_count(axis);
        let origin = self.origin(axis).min(total);
        let Some(extent) = self.extent(axis) else {
            return total - origin;
        };
        let base = below.start_pixel(axis, origin);
        let limit = base + u64::from(extent);
        // First position at or after the origin that starts past the extent.
        let (mut lo, mut hi) = (origin, total);
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if below.start_pixel(axis, mid) < limit {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        lo - origin
    }

    fn underlying_position(&self, axis: Axis, position: usize, below: StackView<'_>) -> Option<usize> {
        (position < self.position_count(axis, below)).then(|| self.origin(axis) + position)
    }

    fn local_position(&self, axis: Axis, underlying: usize, below: StackView<'_>) -> Option<usize> {
        let local = underlying.checked_sub(self.origin(axis))?;
        (local < self.position_count(axis, below)).then_some(local)
    }

    fn local_insertion_point(&self, axis: Axis, underlying: usize, below: StackView<'_>) -> usize {
        underlying
            .saturating_sub(self.origin(axis))
            .min(self.position_count(axis, below))
    }

    fn start_pixel(&self, axis: Axis, position: usize, below: StackView<'_>) -> u64 {
        let origin = self.origin(axis);
        let end = origin + position.min(self.position_count(axis, below));
        below.start_pixel(axis, end) - below.start_pixel(axis, origin)
    }

    fn handle(&mut self, command: Command, below: StackView<'_>) -> CommandOutcome {
        match command {
            Command::Scroll { axis, origin } => {
                let origin = Self::clamp_origin(origin, below.position_count(axis));
                if origin == self.origin(axis) {
                    return CommandOutcome::done();
                }
                self.origins[axis.slot()] = origin;
                debug!(message = "viewport.scroll", axis = ?axis, origin);
                CommandOutcome::emit(LayerEvent::Visual {
                    axis,
                    range: PositionRange::new(0, self.position_count(axis, below)),
                })
            }
            Command::ClientAreaResized { axis, available } => {
                self.set_extent(axis, Some(available));
                CommandOutcome::Forward(command)
            }
            other => {
                let axis = other.axis();
                let end = self.origin(axis) + self.position_count(axis, below);
                match other.map_positions(|p| self.underlying_position(axis, p, below), |_| end) {
                    Some(forwarded) => CommandOutcome::Forward(forwarded),
                    None => CommandOutcome::Ignored,
                }
            }
        }
    }

    fn on_event(&mut self, event: LayerEvent, below: StackView<'_>) -> Option<LayerEvent> {
        let axis = event.axis();
        let total = below.position_count(axis);
        match event {
            LayerEvent::Structural(StructuralEvent {
                diffs,
                index_change,
                ..
            }) => {
                let old = self.origin(axis);
                let new = match &diffs {
                    Some(diffs) => Self::follow(old, diffs),
                    None => old,
                };
                let new = Self::clamp_origin(new, total);
                if new != old {
                    debug!(message = "viewport.origin_follow", axis = ?axis, from = old, to = new);
                }
                self.origins[axis.slot()] = new;
                Some(LayerEvent::Structural(StructuralEvent {
                    axis,
                    diffs: diffs.map(|d| Self::localize(&d, old, new)),
                    index_change,
                }))
            }
            LayerEvent::Visual { range, .. } => {
                self.origins[axis.slot()] = Self::clamp_origin(self.origin(axis), total);
                let origin = self.origin(axis);
                let count = self.position_count(axis, below);
                let start = range.start.max(origin);
                let end = range.end.min(origin + count);
                (start < end).then(|| LayerEvent::Visual {
                    axis,
                    range: PositionRange::new(start - origin, end - origin),
                })
            }
        }
    }
}
