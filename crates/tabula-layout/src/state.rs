//! Persistable layout state.
//!
//! [`LayoutState`] captures what a user changed: which indexes are hidden and
//! which positions carry size overrides. It is plain serde data; the text
//! format is the caller's choice.

use serde::{Deserialize, Serialize};
use tabula_core::Axis;

/// Per-position size overrides, as stored by
/// [`SizeAllocator::entries`](crate::SizeAllocator::entries).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SizeEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percentage: Option<f64>,
    /// The percentage was set explicitly rather than derived from a resize.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub percentage_pinned: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resizable: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percentage_sizing: Option<bool>,
}

/// A [`SizeEntry`] tagged with its position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionedEntry {
    pub position: usize,
    #[serde(flatten)]
    pub entry: SizeEntry,
}

/// Hidden indexes and size overrides of one axis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AxisState {
    /// Hidden indexes, ascending.
    pub hidden: Vec<usize>,
    /// Size overrides, ascending by position.
    pub sizes: Vec<PositionedEntry>,
}

impl AxisState {
    /// Build from hidden indexes and allocator entries.
    #[must_use]
    pub fn new(
        hidden: impl IntoIterator<Item = usize>,
        sizes: impl IntoIterator<Item = (usize, SizeEntry)>,
    ) -> Self {
        let mut hidden: Vec<usize> = hidden.into_iter().collect();
        hidden.sort_unstable();
        hidden.dedup();
        let mut sizes: Vec<PositionedEntry> = sizes
            .into_iter()
            .map(|(position, entry)| PositionedEntry { position, entry })
            .collect();
        sizes.sort_by_key(|e| e.position);
        Self { hidden, sizes }
    }

    /// Size overrides as `(position, entry)` pairs.
    pub fn entries(&self) -> impl Iterator<Item = (usize, SizeEntry)> + '_ {
        self.sizes.iter().map(|e| (e.position, e.entry.clone()))
    }
}

/// Persisted layout of a grid.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutState {
    pub columns: AxisState,
    pub rows: AxisState,
}

impl LayoutState {
    /// State of `axis`.
    #[must_use]
    pub fn axis(&self, axis: Axis) -> &AxisState {
        match axis {
            Axis::Column => &self.columns,
            Axis::Row => &self.rows,
        }
    }

    /// Mutable state of `axis`.
    pub fn axis_mut(&mut self, axis: Axis) -> &mut AxisState {
        match axis {
            Axis::Column => &mut self.columns,
            Axis::Row => &mut self.rows,
        }
    }

    /// Serialize to JSON.
    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parse from JSON.
    pub fn from_json_str(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn axis_state_sorts_and_dedups() {
        let state = AxisState::new(
            [4, 1, 4],
            [
                (
                    7,
                    SizeEntry {
                        size: Some(30),
                        ..SizeEntry::default()
                    },
                ),
                (
                    2,
                    SizeEntry {
                        min_size: Some(5),
                        ..SizeEntry::default()
                    },
                ),
            ],
        );
        assert_eq!(state.hidden, vec![1, 4]);
        let positions: Vec<usize> = state.entries().map(|(p, _)| p).collect();
        assert_eq!(positions, vec![2, 7]);
    }

    #[test]
    fn empty_fields_are_omitted() {
        let entry = PositionedEntry {
            position: 3,
            entry: SizeEntry {
                size: Some(40),
                ..SizeEntry::default()
            },
        };
        let json = serde_json::to_string(&entry).unwrap();
        assert_eq!(json, r#"{"position":3,"size":40}"#);
    }

    #[test]
    fn json_round_trip() {
        let mut state = LayoutState::default();
        *state.axis_mut(Axis::Column) = AxisState::new(
            [0, 3],
            [(
                1,
                SizeEntry {
                    percentage: Some(25.0),
                    percentage_pinned: true,
                    ..SizeEntry::default()
                },
            )],
        );
        state.rows.hidden = vec![9];
        let json = state.to_json_string().unwrap();
        assert_eq!(LayoutState::from_json_str(&json).unwrap(), state);
    }

    #[test]
    fn missing_sections_default() {
        let state = LayoutState::from_json_str(r#"{"rows":{"hidden":[2]}}"#).unwrap();
        assert!(state.columns.hidden.is_empty());
        assert_eq!(state.axis(Axis::Row).hidden, vec![2]);
    }
}
