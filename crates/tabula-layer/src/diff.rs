#![forbid(unsafe_code)]

//! Structural diffs.
//!
//! A [`StructuralDiff`] describes one step of a position-space
//! transformation. DELETE entries name the removed range in *before* space;
//! ADD entries name the inserted range in *after* space. The other range of
//! each entry is a collapsed point saying where the block was or goes.
//!
//! Diff lists are ordered deletes first, then adds, each ascending, and are
//! lossless: [`replay`] applied to the before state rebuilds the after state.
//!
//! A reorder is one DELETE per maximal contiguous source run plus a single
//! ADD for the destination block. For reorder DELETEs the `after` point is
//! the block's position once every moved entry has been taken out, which is
//! also where [`replay_moves`] expects it.

use std::hash::Hash;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tabula_core::{PositionRange, coalesce};

use crate::translator::PositionIndexTranslator;

/// Kind of a structural diff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffKind {
    Delete,
    Add,
}

/// One DELETE or ADD step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StructuralDiff {
    pub kind: DiffKind,
    pub before: PositionRange,
    pub after: PositionRange,
}

impl StructuralDiff {
    /// `removed` (before space) disappears; it used to sit at `at` in after
    /// space.
    #[must_use]
    pub const fn delete(removed: PositionRange, at: usize) -> Self {
        Self {
            kind: DiffKind::Delete,
            before: removed,
            after: PositionRange::point(at),
        }
    }

    /// `inserted` (after space) appears at `at` in before space.
    #[must_use]
    pub const fn add(at: usize, inserted: PositionRange) -> Self {
        Self {
            kind: DiffKind::Add,
            before: PositionRange::point(at),
            after: inserted,
        }
    }

    /// Number of positions removed or inserted.
    #[must_use]
    pub const fn len(&self) -> usize {
        match self.kind {
            DiffKind::Delete => self.before.len(),
            DiffKind::Add => self.after.len(),
        }
    }

    /// True if the step touches no positions.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn sort_key(&self) -> (DiffKind, usize) {
        match self.kind {
            DiffKind::Delete => (self.kind, self.before.start),
            DiffKind::Add => (self.kind, self.after.start),
        }
    }
}

/// Diffs turning `before` into `after`, two sequences of unique keys.
///
/// Deleted runs become DELETEs and new runs become ADDs. When the keys
/// present on both sides appear in a different relative order the result
/// is a full replacement: everything deleted, everything added.
pub fn diff_sequences<K: Hash + Eq + Copy>(before: &[K], after: &[K]) -> Vec<StructuralDiff> {
    let after_pos: FxHashMap<K, usize> = after.iter().enumerate().map(|(p, &k)| (k, p)).collect();
    let before_pos: FxHashMap<K, usize> =
        before.iter().enumerate().map(|(p, &k)| (k, p)).collect();

    let survivors_in_order = before
        .iter()
        .filter_map(|k| after_pos.get(k))
        .try_fold(None::<usize>, |last, &p| match last {
            Some(l) if l >= p => Err(()),
            _ => Ok(Some(p)),
        })
        .is_ok();
    if !survivors_in_order {
        return full_replacement(before.len(), after.len());
    }

    let mut diffs = Vec::new();
    let deleted = (0..before.len()).filter(|&p| !after_pos.contains_key(&before[p]));
    for run in coalesce(deleted) {
        let at = before[run.end..]
            .iter()
            .find_map(|k| after_pos.get(k).copied())
            .unwrap_or(after.len());
        diffs.push(StructuralDiff::delete(run, at));
    }
    let added = (0..after.len()).filter(|&p| !before_pos.contains_key(&after[p]));
    for run in coalesce(added) {
        let at = after[run.end..]
            .iter()
            .find_map(|k| before_pos.get(k).copied())
            .unwrap_or(before.len());
        diffs.push(StructuralDiff::add(at, run));
    }
    diffs
}

/// DELETE everything, ADD everything.
#[must_use]
pub fn full_replacement(before_len: usize, after_len: usize) -> Vec<StructuralDiff> {
    let mut diffs = Vec::with_capacity(2);
    if before_len > 0 {
        diffs.push(StructuralDiff::delete(PositionRange::new(0, before_len), 0));
    }
    if after_len > 0 {
        diffs.push(StructuralDiff::add(0, PositionRange::new(0, after_len)));
    }
    diffs
}

/// Diffs for moving the entries at `from_positions` into one block in
/// front of `to_position` (both in before space).
#[must_use]
pub fn reorder_diffs(from_positions: &[usize], to_position: usize) -> Vec<StructuralDiff> {
    let mut moved = from_positions.to_vec();
    moved.sort_unstable();
    moved.dedup();
    let moved_before = |p: usize| moved.partition_point(|&m| m < p);

    let mut diffs: Vec<StructuralDiff> = coalesce(moved.iter().copied())
        .into_iter()
        .map(|run| StructuralDiff::delete(run, run.start - moved_before(run.start)))
        .collect();
    let start = to_position - moved_before(to_position);
    diffs.push(StructuralDiff::add(
        to_position,
        PositionRange::new(start, start + moved.len()),
    ));
    diffs
}

/// True for the shape [`reorder_diffs`] produces: at least one DELETE,
/// exactly one ADD, as many positions added as deleted.
#[must_use]
pub fn is_reorder(diffs: &[StructuralDiff]) -> bool {
    let (mut adds, mut added, mut deletes, mut deleted) = (0usize, 0usize, 0usize, 0usize);
    for diff in diffs {
        match diff.kind {
            DiffKind::Add => {
                adds += 1;
                added += diff.after.len();
            }
            DiffKind::Delete => {
                deletes += 1;
                deleted += diff.before.len();
            }
        }
    }
    adds == 1 && deletes >= 1 && added == deleted && added > 0
}

/// Apply `diffs` to `before`: DELETE ranges are removed, ADD ranges are
/// filled with `fill(after_position)`.
pub fn replay<T: Clone>(
    before: &[T],
    diffs: &[StructuralDiff],
    mut fill: impl FnMut(usize) -> T,
) -> Vec<T> {
    let mut out = before.to_vec();
    let mut deletes: Vec<PositionRange> = diffs
        .iter()
        .filter(|d| d.kind == DiffKind::Delete)
        .map(|d| d.before)
        .collect();
    deletes.sort_unstable_by(|a, b| b.start.cmp(&a.start));
    for range in deletes {
        if range.end <= out.len() {
            out.drain(range.start..range.end);
        }
    }

    let mut adds: Vec<PositionRange> = diffs
        .iter()
        .filter(|d| d.kind == DiffKind::Add)
        .map(|d| d.after)
        .collect();
    adds.sort_unstable_by_key(|r| r.start);
    for range in adds {
        let at = range.start.min(out.len());
        out.splice(at..at, range.iter().map(&mut fill));
    }
    out
}

/// Apply a reorder: the DELETE ranges, in order, form the block that is
/// inserted at the ADD position. `None` if `diffs` is not a reorder or does
/// not fit `before`.
pub fn replay_moves<T: Clone>(before: &[T], diffs: &[StructuralDiff]) -> Option<Vec<T>> {
    if !is_reorder(diffs) {
        return None;
    }
    let mut runs: Vec<PositionRange> = diffs
        .iter()
        .filter(|d| d.kind == DiffKind::Delete)
        .map(|d| d.before)
        .collect();
    runs.sort_unstable_by_key(|r| r.start);
    if runs.last().is_some_and(|r| r.end > before.len()) {
        return None;
    }

    let mut block = Vec::new();
    let mut rest = Vec::with_capacity(before.len());
    let mut runs_iter = runs.iter().peekable();
    for (p, item) in before.iter().enumerate() {
        while runs_iter.peek().is_some_and(|r| r.end <= p) {
            runs_iter.next();
        }
        if runs_iter.peek().is_some_and(|r| r.contains(p)) {
            block.push(item.clone());
        } else {
            rest.push(item.clone());
        }
    }

    let target = diffs.iter().find(|d| d.kind == DiffKind::Add)?.after.start;
    if target > rest.len() {
        return None;
    }
    rest.splice(target..target, block);
    Some(rest)
}

/// Maps positions of one space into another.
pub trait PositionMap {
    /// Where `position` lands, if it is present in the target space.
    fn map_position(&self, position: usize) -> Option<usize>;

    /// Where a collapsed point at `position` lands.
    fn map_point(&self, position: usize) -> usize;
}

impl PositionMap for PositionIndexTranslator {
    fn map_position(&self, position: usize) -> Option<usize> {
        self.local_position(position)
    }

    fn map_point(&self, position: usize) -> usize {
        self.insertion_point(position)
    }
}

/// Translators applied in sequence, lowest first.
#[derive(Debug, Clone, Copy)]
pub struct TranslatorChain<'a>(pub &'a [&'a PositionIndexTranslator]);

impl PositionMap for TranslatorChain<'_> {
    fn map_position(&self, position: usize) -> Option<usize> {
        self.0
            .iter()
            .try_fold(position, |p, t| t.local_position(p))
    }

    fn map_point(&self, position: usize) -> usize {
        self.0.iter().fold(position, |p, t| t.insertion_point(p))
    }
}

/// Re-express `diffs` through position maps. Before-space ranges use
/// `before`, after-space ranges use `after`.
///
/// Ranges are mapped position by position and coalesced again, so one
/// range may split into several diffs. Diffs whose range maps to nothing
/// are dropped.
pub fn convert(
    diffs: &[StructuralDiff],
    before: &impl PositionMap,
    after: &impl PositionMap,
) -> Vec<StructuralDiff> {
    let mut out = Vec::new();
    for diff in diffs {
        match diff.kind {
            DiffKind::Delete => {
                let at = after.map_point(diff.after.start);
                for run in coalesce(diff.before.iter().filter_map(|p| before.map_position(p))) {
                    out.push(StructuralDiff::delete(run, at));
                }
            }
            DiffKind::Add => {
                let at = before.map_point(diff.before.start);
                for run in coalesce(diff.after.iter().filter_map(|p| after.map_position(p))) {
                    out.push(StructuralDiff::add(at, run));
                }
            }
        }
    }
    out.sort_by_key(StructuralDiff::sort_key);
    out
}

/// Re-express `diffs` through a chain of translators, lowest first, using
/// their current state for both spaces.
pub fn convert_to_local(
    diffs: &[StructuralDiff],
    translators: &[&PositionIndexTranslator],
) -> Vec<StructuralDiff> {
    let chain = TranslatorChain(translators);
    convert(diffs, &chain, &chain)
}
