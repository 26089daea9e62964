//! Events travelling up a layer stack.

use tabula_core::{Axis, IndexChange, PositionRange};

use crate::diff::StructuralDiff;

/// Positions were added, removed or moved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuralEvent {
    /// Which structure changed.
    pub axis: Axis,
    /// Diffs in the emitting layer's position space. `None` asks listeners
    /// to refresh everything.
    pub diffs: Option<Vec<StructuralDiff>>,
    /// The data-source change behind the event, if any.
    pub index_change: Option<IndexChange>,
}

impl StructuralEvent {
    /// Event carrying `diffs`.
    #[must_use]
    pub fn with_diffs(axis: Axis, diffs: Vec<StructuralDiff>) -> Self {
        Self {
            axis,
            diffs: Some(diffs),
            index_change: None,
        }
    }

    /// Event asking for a full refresh.
    #[must_use]
    pub fn refresh(axis: Axis) -> Self {
        Self {
            axis,
            diffs: None,
            index_change: None,
        }
    }

    /// True for horizontal (column) structure changes.
    #[must_use]
    pub fn is_horizontal(&self) -> bool {
        self.axis.is_horizontal()
    }
}

/// Notification emitted by a layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayerEvent {
    Structural(StructuralEvent),
    /// Sizes or the visible window changed; positions did not.
    Visual { axis: Axis, range: PositionRange },
}

impl LayerEvent {
    /// Axis the event concerns.
    #[must_use]
    pub fn axis(&self) -> Axis {
        match self {
            Self::Structural(event) => event.axis,
            Self::Visual { axis, .. } => *axis,
        }
    }

    /// Diffs of a structural event.
    #[must_use]
    pub fn diffs(&self) -> Option<&[StructuralDiff]> {
        match self {
            Self::Structural(event) => event.diffs.as_deref(),
            Self::Visual { .. } => None,
        }
    }
}

impl From<StructuralEvent> for LayerEvent {
    fn from(event: StructuralEvent) -> Self {
        Self::Structural(event)
    }
}
