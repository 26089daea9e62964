//! Commands travelling down a layer stack.
//!
//! Positions in a command are local to the layer currently handling it.
//! A layer that does not consume a command converts those positions to its
//! underlying layer's space before forwarding. Indexes never need
//! converting.

use tabula_core::Axis;

/// A discrete operation on the grid.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Hide the entries at `positions`.
    Hide { axis: Axis, positions: Vec<usize> },
    /// Show hidden `indexes`.
    Show { axis: Axis, indexes: Vec<usize> },
    /// Show every hidden index.
    ShowAll { axis: Axis },
    /// Reveal hidden entries next to the entry at `position`.
    ShowAdjacent {
        axis: Axis,
        position: usize,
        toward_start: bool,
        cascade: bool,
    },
    /// Move the entries at `from` in front of the entry at `to`.
    Reorder {
        axis: Axis,
        from: Vec<usize>,
        to: usize,
    },
    /// Resize the entry at `position` to `size` logical pixels.
    Resize {
        axis: Axis,
        position: usize,
        size: u32,
    },
    /// Pin the entry at `position` to a percentage of the available space.
    SetPercentage {
        axis: Axis,
        position: usize,
        percentage: f64,
    },
    /// The space available to percentage sizing changed.
    ClientAreaResized { axis: Axis, available: u32 },
    /// Drop every per-position size override.
    ResetSizes { axis: Axis },
    /// Move the viewport so that `origin` is its first position.
    Scroll { axis: Axis, origin: usize },
    /// Exclude or include data indexes in sizing. Sent down by hide/show
    /// layers so that percentage space is redistributed.
    SizingVisibility {
        axis: Axis,
        hidden: Vec<usize>,
        shown: Vec<usize>,
    },
}

impl Command {
    /// Axis the command targets.
    #[must_use]
    pub fn axis(&self) -> Axis {
        match self {
            Self::Hide { axis, .. }
            | Self::Show { axis, .. }
            | Self::ShowAll { axis }
            | Self::ShowAdjacent { axis, .. }
            | Self::Reorder { axis, .. }
            | Self::Resize { axis, .. }
            | Self::SetPercentage { axis, .. }
            | Self::ClientAreaResized { axis, .. }
            | Self::ResetSizes { axis }
            | Self::Scroll { axis, .. }
            | Self::SizingVisibility { axis, .. } => *axis,
        }
    }

    /// Short name for logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Hide { .. } => "hide",
            Self::Show { .. } => "show",
            Self::ShowAll { .. } => "show_all",
            Self::ShowAdjacent { .. } => "show_adjacent",
            Self::Reorder { .. } => "reorder",
            Self::Resize { .. } => "resize",
            Self::SetPercentage { .. } => "set_percentage",
            Self::ClientAreaResized { .. } => "client_area_resized",
            Self::ResetSizes { .. } => "reset_sizes",
            Self::Scroll { .. } => "scroll",
            Self::SizingVisibility { .. } => "sizing_visibility",
        }
    }

    /// The same command with every local position passed through `map`.
    /// Positions that map to nothing are dropped; a single-position command
    /// whose position maps to nothing becomes `None`.
    ///
    /// `Reorder::to` may equal the position count; `map_end` supplies its
    /// underlying value in that case.
    #[must_use]
    pub fn map_positions(
        self,
        map: impl Fn(usize) -> Option<usize>,
        map_end: impl Fn(usize) -> usize,
    ) -> Option<Self> {
        Some(match self {
            Self::Hide { axis, positions } => Self::Hide {
                axis,
                positions: positions.into_iter().filter_map(&map).collect(),
            },
            Self::ShowAdjacent {
                axis,
                position,
                toward_start,
                cascade,
            } => Self::ShowAdjacent {
                axis,
                position: map(position)?,
                toward_start,
                cascade,
            },
            Self::Reorder { axis, from, to } => Self::Reorder {
                axis,
                from: from.into_iter().filter_map(&map).collect(),
                to: map(to).unwrap_or_else(|| map_end(to)),
            },
            Self::Resize {
                axis,
                position,
                size,
            } => Self::Resize {
                axis,
                position: map(position)?,
                size,
            },
            Self::SetPercentage {
                axis,
                position,
                percentage,
            } => Self::SetPercentage {
                axis,
                position: map(position)?,
                percentage,
            },
            Self::Scroll { axis, origin } => Self::Scroll {
                axis,
                origin: map(origin).unwrap_or_else(|| map_end(origin)),
            },
            other => other,
        })
    }
}
