//! Data-source interface and structural change notifications.
//!
//! The data source owns index validity. It reports how many columns and rows
//! exist and announces inserts and deletes as [`IndexChange`]s, expressed in
//! index space. Layers apply those changes to their own state before passing
//! the re-expressed event further up.

use std::cell::Cell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::Axis;

/// What happened to a run of indexes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    /// `count` new indexes now start at `at`; old indexes `>= at` moved up.
    Insert,
    /// Indexes `at..at + count` are gone; greater indexes moved down.
    Delete,
}

/// A structural change reported by the data source, in index space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IndexChange {
    /// Insert or delete.
    pub kind: ChangeKind,
    /// First affected index.
    pub at: usize,
    /// Number of indexes inserted or deleted.
    pub count: usize,
}

impl IndexChange {
    /// `count` indexes inserted at `at`.
    #[must_use]
    pub const fn insert(at: usize, count: usize) -> Self {
        Self {
            kind: ChangeKind::Insert,
            at,
            count,
        }
    }

    /// `count` indexes deleted starting at `at`.
    #[must_use]
    pub const fn delete(at: usize, count: usize) -> Self {
        Self {
            kind: ChangeKind::Delete,
            at,
            count,
        }
    }

    /// Identity after the change of an index that existed before it.
    ///
    /// Returns `None` for deleted indexes.
    #[inline]
    #[must_use]
    pub const fn map_index(&self, index: usize) -> Option<usize> {
        match self.kind {
            ChangeKind::Insert => {
                if index >= self.at {
                    Some(index + self.count)
                } else {
                    Some(index)
                }
            }
            ChangeKind::Delete => {
                if index < self.at {
                    Some(index)
                } else if index < self.at + self.count {
                    None
                } else {
                    Some(index - self.count)
                }
            }
        }
    }

    /// The indexes this change introduces (empty for deletes).
    #[must_use]
    pub fn inserted(&self) -> std::ops::Range<usize> {
        match self.kind {
            ChangeKind::Insert => self.at..self.at + self.count,
            ChangeKind::Delete => self.at..self.at,
        }
    }

    /// True when nothing is inserted or deleted.
    #[inline]
    #[must_use]
    pub const fn is_noop(&self) -> bool {
        self.count == 0
    }
}

/// The underlying data a layer stack presents.
///
/// Only the extents are needed here; cell values belong to the caller. After
/// a source changes its extents it must notify the stack with the matching
/// [`IndexChange`].
pub trait DataSource {
    /// Number of columns.
    fn column_count(&self) -> usize;

    /// Number of rows.
    fn row_count(&self) -> usize;

    /// Extent along `axis`.
    fn count(&self, axis: Axis) -> usize {
        match axis {
            Axis::Column => self.column_count(),
            Axis::Row => self.row_count(),
        }
    }
}

/// Column/row counts behind a shared handle.
///
/// Clones share the same cells, so a caller can keep one handle, hand another
/// to the data layer, and grow or shrink the grid before announcing the
/// change.
#[derive(Debug, Clone, Default)]
pub struct SharedDimensions {
    columns: Rc<Cell<usize>>,
    rows: Rc<Cell<usize>>,
}

impl SharedDimensions {
    /// Dimensions with the given extents.
    #[must_use]
    pub fn new(columns: usize, rows: usize) -> Self {
        Self {
            columns: Rc::new(Cell::new(columns)),
            rows: Rc::new(Cell::new(rows)),
        }
    }

    /// Overwrite the extent of `axis`.
    pub fn set(&self, axis: Axis, count: usize) {
        match axis {
            Axis::Column => self.columns.set(count),
            Axis::Row => self.rows.set(count),
        }
    }

    /// Apply `change` to the extent of `axis` and return it for forwarding.
    pub fn apply(&self, axis: Axis, change: IndexChange) -> IndexChange {
        let current = self.count(axis);
        let next = match change.kind {
            ChangeKind::Insert => current + change.count,
            ChangeKind::Delete => current.saturating_sub(change.count),
        };
        self.set(axis, next);
        change
    }
}

impl DataSource for SharedDimensions {
    fn column_count(&self) -> usize {
        self.columns.get()
    }

    fn row_count(&self) -> usize {
        self.rows.get()
    }
}
