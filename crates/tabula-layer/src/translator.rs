#![forbid(unsafe_code)]

//! Position ↔ index translation for one layer.
//!
//! A [`PositionIndexTranslator`] keeps the *full order* of the indexes a
//! layer presents (its underlying sequence) and the subset of them that is
//! hidden. The visible sequence is always the full order with the hidden
//! entries skipped, so showing an index puts it back exactly where it was
//! relative to its neighbours no matter how hides, shows and reorders were
//! interleaved.
//!
//! # Underlying positions
//!
//! The `underlying_position`, `local_position` and `insertion_point` helpers
//! treat a rank in the full order as a position in the layer below. That
//! holds for a translator that mirrors the layer below (hide/show). A
//! reordering translator maps through the layer below instead.
//!
//! # Invariants
//!
//! - every index appears once in the full order;
//! - hidden ∪ visible = full order, and the two are disjoint;
//! - `position_by_index(index_by_position(p)) == Some(p)` for all visible `p`.

use rustc_hash::{FxHashMap, FxHashSet};
use tabula_core::{ChangeKind, IndexChange};
use tracing::debug;

use crate::diff::{self, StructuralDiff};

/// Bidirectional position ↔ index map with hidden-set tracking.
#[derive(Debug, Clone, Default)]
pub struct PositionIndexTranslator {
    order: Vec<usize>,
    rank: FxHashMap<usize, usize>,
    visible: Vec<usize>,
    positions: FxHashMap<usize, usize>,
    hidden: FxHashSet<usize>,
}

impl PositionIndexTranslator {
    /// Translator over `order` with nothing hidden. Repeated indexes keep
    /// their first occurrence.
    #[must_use]
    pub fn new(order: impl IntoIterator<Item = usize>) -> Self {
        let mut translator = Self::default();
        translator.set_order(order);
        translator.rebuild();
        translator
    }

    /// Translator over `0..count`.
    #[must_use]
    pub fn identity(count: usize) -> Self {
        Self::new(0..count)
    }

    // ── Lookups ─────────────────────────────────────────────────────────

    /// Number of visible positions.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.visible.len()
    }

    /// True when every index is hidden or there are none.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.visible.is_empty()
    }

    /// Index shown at `position`.
    #[inline]
    #[must_use]
    pub fn index_by_position(&self, position: usize) -> Option<usize> {
        self.visible.get(position).copied()
    }

    /// Position of `index`, if it is visible.
    #[inline]
    #[must_use]
    pub fn position_by_index(&self, index: usize) -> Option<usize> {
        self.positions.get(&index).copied()
    }

    /// Visible indexes in position order.
    #[must_use]
    pub fn visible_indexes(&self) -> &[usize] {
        &self.visible
    }

    /// Every index, hidden or not, in full order.
    #[must_use]
    pub fn full_order(&self) -> &[usize] {
        &self.order
    }

    /// Hidden indexes, ascending.
    #[must_use]
    pub fn hidden_indexes(&self) -> Vec<usize> {
        let mut hidden: Vec<usize> = self.hidden.iter().copied().collect();
        hidden.sort_unstable();
        hidden
    }

    /// True if `index` is present and hidden.
    #[must_use]
    pub fn is_hidden(&self, index: usize) -> bool {
        self.hidden.contains(&index)
    }

    /// True if `index` is present, hidden or not.
    #[must_use]
    pub fn contains(&self, index: usize) -> bool {
        self.rank.contains_key(&index)
    }

    /// Rank of `index` in the full order.
    #[must_use]
    pub fn rank_of(&self, index: usize) -> Option<usize> {
        self.rank.get(&index).copied()
    }

    /// Full-order rank of the entry visible at `position`.
    #[must_use]
    pub fn underlying_position(&self, position: usize) -> Option<usize> {
        self.index_by_position(position)
            .and_then(|index| self.rank_of(index))
    }

    /// Visible position of the entry at full-order rank `underlying`.
    #[must_use]
    pub fn local_position(&self, underlying: usize) -> Option<usize> {
        self.order
            .get(underlying)
            .and_then(|index| self.position_by_index(*index))
    }

    /// Number of visible entries ranked before `underlying`: where an entry
    /// at that rank is, or would be shown.
    #[must_use]
    pub fn insertion_point(&self, underlying: usize) -> usize {
        self.visible
            .partition_point(|index| self.rank.get(index).is_some_and(|&r| r < underlying))
    }

    // ── Hide / show ─────────────────────────────────────────────────────

    /// Hide the entries at `positions`. Returns the newly hidden indexes in
    /// position order.
    ///
    /// Every position is resolved before anything is removed, so the
    /// positions all refer to the current state. Out-of-range and repeated
    /// positions are ignored.
    pub fn hide(&mut self, positions: impl IntoIterator<Item = usize>) -> Vec<usize> {
        let mut targets: Vec<usize> = positions
            .into_iter()
            .filter(|&p| p < self.visible.len())
            .collect();
        targets.sort_unstable();
        targets.dedup();
        let hidden: Vec<usize> = targets.into_iter().map(|p| self.visible[p]).collect();
        if hidden.is_empty() {
            return hidden;
        }
        self.hidden.extend(hidden.iter().copied());
        self.rebuild();
        debug!(
            message = "translator.hide",
            count = hidden.len(),
            visible = self.visible.len()
        );
        hidden
    }

    /// Show hidden `indexes`. Returns the indexes that were actually shown,
    /// in full order.
    pub fn show(&mut self, indexes: impl IntoIterator<Item = usize>) -> Vec<usize> {
        let mut shown: Vec<usize> = indexes
            .into_iter()
            .filter(|index| self.hidden.remove(index))
            .collect();
        if shown.is_empty() {
            return shown;
        }
        shown.sort_unstable_by_key(|index| self.rank.get(index).copied());
        self.rebuild();
        debug!(
            message = "translator.show",
            count = shown.len(),
            visible = self.visible.len()
        );
        shown
    }

    /// Show every hidden index.
    pub fn show_all(&mut self) -> Vec<usize> {
        let all: Vec<usize> = self.hidden.iter().copied().collect();
        self.show(all)
    }

    /// Show the hidden entries directly next to the entry at `position`.
    ///
    /// Looks at the full-order rank just before (`toward_start`) or after
    /// the anchor. A hidden entry there is shown; with `cascade` the walk
    /// continues while the next rank is hidden too. A visible entry ends the
    /// walk, so hidden entries separated from the anchor by a visible one
    /// are left alone.
    pub fn show_adjacent(
        &mut self,
        position: usize,
        toward_start: bool,
        cascade: bool,
    ) -> Vec<usize> {
        let Some(rank) = self.underlying_position(position) else {
            return Vec::new();
        };
        let mut reveal = Vec::new();
        let mut cursor = rank;
        loop {
            let next = if toward_start {
                cursor.checked_sub(1)
            } else {
                Some(cursor + 1)
            };
            let Some(next) = next else { break };
            let Some(&index) = self.order.get(next) else {
                break;
            };
            if !self.hidden.contains(&index) {
                break;
            }
            reveal.push(index);
            cursor = next;
            if !cascade {
                break;
            }
        }
        self.show(reveal)
    }

    /// Replace the hidden set, for restoring persisted state. Unknown
    /// indexes are ignored.
    pub fn set_hidden_indexes(&mut self, indexes: impl IntoIterator<Item = usize>) {
        self.hidden = indexes
            .into_iter()
            .filter(|index| self.rank.contains_key(index))
            .collect();
        self.rebuild();
    }

    // ── Reorder ─────────────────────────────────────────────────────────

    /// Move the visible entries at `from_positions` so that they form one
    /// block in front of the entry at `to_position`, or at the end when
    /// `to_position == len()`.
    ///
    /// The moved entries keep their relative order. Hidden entries keep
    /// their place relative to the entries that did not move. Returns
    /// `None` when nothing valid moved or the visible order is unchanged.
    pub fn reorder(
        &mut self,
        from_positions: impl IntoIterator<Item = usize>,
        to_position: usize,
    ) -> Option<Vec<StructuralDiff>> {
        let len = self.visible.len();
        if to_position > len {
            return None;
        }
        let mut moved: Vec<usize> = from_positions.into_iter().filter(|&p| p < len).collect();
        moved.sort_unstable();
        moved.dedup();
        if moved.is_empty() {
            return None;
        }

        let block: Vec<usize> = moved.iter().map(|&p| self.visible[p]).collect();
        let moving: FxHashSet<usize> = block.iter().copied().collect();
        let anchor = self.visible[to_position..]
            .iter()
            .find(|index| !moving.contains(index))
            .copied();

        let mut order: Vec<usize> = self
            .order
            .iter()
            .copied()
            .filter(|index| !moving.contains(index))
            .collect();
        let at = match anchor {
            Some(anchor) => order
                .iter()
                .position(|&index| index == anchor)
                .unwrap_or(order.len()),
            None => self
                .visible
                .iter()
                .rev()
                .find(|index| !moving.contains(index))
                .and_then(|last| order.iter().position(|index| index == last))
                .map_or(0, |p| p + 1),
        };
        order.splice(at..at, block);

        let unchanged = order
            .iter()
            .filter(|index| !self.hidden.contains(index))
            .eq(self.visible.iter());
        if unchanged {
            return None;
        }

        self.set_order(order);
        self.rebuild();
        debug!(
            message = "translator.reorder",
            moved = moved.len(),
            to = to_position
        );
        Some(diff::reorder_diffs(&moved, to_position))
    }

    // ── Structural changes ──────────────────────────────────────────────

    /// Apply a data-source insert or delete, expressed in index space.
    ///
    /// Deleted indexes disappear whether hidden or not and greater indexes
    /// shift down. Inserted indexes are visible and land directly in front
    /// of the entry that held `at` before the insert, or at the end.
    pub fn handle_structural_change(&mut self, change: &IndexChange) {
        if change.is_noop() {
            return;
        }
        let mut order: Vec<usize> = self
            .order
            .iter()
            .filter_map(|&index| change.map_index(index))
            .collect();
        self.hidden = self
            .hidden
            .iter()
            .filter_map(|&index| change.map_index(index))
            .collect();

        if change.kind == ChangeKind::Insert {
            let holder = change.at + change.count;
            let at = order
                .iter()
                .position(|&index| index == holder)
                .unwrap_or(order.len());
            order.splice(at..at, change.inserted());
        }

        self.set_order(order);
        self.rebuild();
        debug!(
            message = "translator.structural_change",
            kind = ?change.kind,
            at = change.at,
            count = change.count,
            visible = self.visible.len()
        );
    }

    /// Replace the full order, keeping the hidden flag of indexes that are
    /// still present.
    pub fn sync_order(&mut self, order: impl IntoIterator<Item = usize>) {
        self.set_order(order);
        let rank = &self.rank;
        self.hidden.retain(|index| rank.contains_key(index));
        self.rebuild();
    }

    /// Keep this translator's order for indexes still present in `order`
    /// and append the newly present ones in the order given.
    pub fn reconcile(&mut self, order: impl IntoIterator<Item = usize>) {
        let incoming: Vec<usize> = order.into_iter().collect();
        let present: FxHashSet<usize> = incoming.iter().copied().collect();
        let mut next: Vec<usize> = self
            .order
            .iter()
            .copied()
            .filter(|index| present.contains(index))
            .collect();
        next.extend(
            incoming
                .into_iter()
                .filter(|index| !self.rank.contains_key(index)),
        );
        self.sync_order(next);
    }

    // ── Internals ───────────────────────────────────────────────────────

    fn set_order(&mut self, order: impl IntoIterator<Item = usize>) {
        self.order.clear();
        self.rank.clear();
        for index in order {
            if let std::collections::hash_map::Entry::Vacant(slot) = self.rank.entry(index) {
                slot.insert(self.order.len());
                self.order.push(index);
            }
        }
    }

    fn rebuild(&mut self) {
        self.visible.clear();
        self.positions.clear();
        for &index in &self.order {
            if !self.hidden.contains(&index) {
                self.positions.insert(index, self.visible.len());
                self.visible.push(index);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::{self, DiffKind};

    fn visible(t: &PositionIndexTranslator) -> Vec<usize> {
        t.visible_indexes().to_vec()
    }

    fn assert_consistent(t: &PositionIndexTranslator) {
        for (p, &index) in t.visible_indexes().iter().enumerate() {
            assert_eq!(t.position_by_index(index), Some(p));
            assert!(!t.is_hidden(index));
        }
        assert_eq!(t.len() + t.hidden_indexes().len(), t.full_order().len());
    }

    #[test]
    fn identity_lookups() {
        let t = PositionIndexTranslator::identity(4);
        assert_eq!(t.index_by_position(2), Some(2));
        assert_eq!(t.position_by_index(3), Some(3));
        assert_eq!(t.index_by_position(4), None);
        assert_eq!(t.position_by_index(9), None);
    }

    #[test]
    fn hide_resolves_positions_first() {
        let mut t = PositionIndexTranslator::identity(6);
        let hidden = t.hide([1, 2, 2, 10]);
        assert_eq!(hidden, vec![1, 2]);
        assert_eq!(visible(&t), vec![0, 3, 4, 5]);
        assert_eq!(t.position_by_index(1), None);
        assert_eq!(t.position_by_index(4), Some(2));
        assert_consistent(&t);
    }

    #[test]
    fn hide_everything_is_legal() {
        let mut t = PositionIndexTranslator::identity(3);
        t.hide(0..3);
        assert!(t.is_empty());
        assert_eq!(t.hidden_indexes(), vec![0, 1, 2]);
        assert_eq!(t.show_all(), vec![0, 1, 2]);
        assert_eq!(visible(&t), vec![0, 1, 2]);
    }

    #[test]
    fn show_restores_original_slot() {
        let mut t = PositionIndexTranslator::identity(6);
        t.hide([4]);
        t.hide([1]);
        t.hide([0]);
        assert_eq!(visible(&t), vec![2, 3, 5]);
        assert_eq!(t.show([4, 0]), vec![0, 4]);
        assert_eq!(visible(&t), vec![0, 2, 3, 4, 5]);
        t.show([1]);
        assert_eq!(visible(&t), (0..6).collect::<Vec<_>>());
    }

    #[test]
    fn show_ignores_visible_and_unknown() {
        let mut t = PositionIndexTranslator::identity(3);
        assert!(t.show([0, 42]).is_empty());
        assert_eq!(visible(&t), vec![0, 1, 2]);
    }

    #[test]
    fn show_after_reorder_uses_reordered_neighbours() {
        let mut t = PositionIndexTranslator::identity(5);
        t.hide([2]);
        // [0, 1, 3, 4] -> move index 4 to the front.
        t.reorder([3], 0);
        assert_eq!(visible(&t), vec![4, 0, 1, 3]);
        t.show([2]);
        assert_eq!(visible(&t), vec![4, 0, 1, 2, 3]);
        assert_consistent(&t);
    }

    #[test]
    fn show_adjacent_reveals_one() {
        let mut t = PositionIndexTranslator::identity(10);
        t.hide([3, 4]);
        // visible: 0 1 2 5 6 7 8 9
        assert_eq!(t.show_adjacent(2, false, false), vec![3]);
        assert!(t.is_hidden(4));
    }

    #[test]
    fn show_adjacent_cascade_stops_at_visible() {
        let mut t = PositionIndexTranslator::identity(10);
        t.hide([3, 4]);
        t.hide([5]); // index 7
        assert_eq!(t.show_adjacent(2, false, true), vec![3, 4]);
        assert!(t.is_hidden(7));
        assert_consistent(&t);
    }

    #[test]
    fn show_adjacent_toward_start() {
        let mut t = PositionIndexTranslator::identity(6);
        t.hide([1, 2]);
        // visible: 0 3 4 5; anchor index 3 at position 1.
        assert_eq!(t.show_adjacent(1, true, false), vec![2]);
        // visible: 0 2 3 4 5; anchor index 2 at position 1.
        assert_eq!(t.show_adjacent(1, true, true), vec![1]);
        assert_eq!(visible(&t), (0..6).collect::<Vec<_>>());
    }

    #[test]
    fn show_adjacent_ignores_hidden_beyond_visible_neighbour() {
        let mut t = PositionIndexTranslator::identity(6);
        t.hide([4]);
        // visible: 0 1 2 3 5; anchor index 2 has visible neighbour 3.
        assert!(t.show_adjacent(2, false, true).is_empty());
        assert!(t.is_hidden(4));
    }

    #[test]
    fn show_adjacent_interleaved_hides_are_contiguous() {
        let mut t = PositionIndexTranslator::identity(8);
        // Two unrelated callers hide neighbouring indexes.
        t.hide([5]);
        t.hide([4]);
        // visible: 0 1 2 3 6 7
        assert_eq!(t.show_adjacent(4, true, false), vec![5]);
        assert_eq!(t.show_adjacent(3, false, true), vec![4]);
        assert!(t.hidden_indexes().is_empty());
    }

    #[test]
    fn show_adjacent_out_of_range_is_noop() {
        let mut t = PositionIndexTranslator::identity(3);
        t.hide([2]);
        assert!(t.show_adjacent(5, false, true).is_empty());
        assert!(t.show_adjacent(0, true, true).is_empty());
    }

    #[test]
    fn reorder_single_forward() {
        let mut t = PositionIndexTranslator::identity(5);
        let diffs = t.reorder([1], 4).unwrap();
        assert_eq!(visible(&t), vec![0, 2, 3, 1, 4]);
        assert!(diff::is_reorder(&diffs));
        let replayed = diff::replay_moves(&[0, 1, 2, 3, 4], &diffs).unwrap();
        assert_eq!(replayed, visible(&t));
    }

    #[test]
    fn reorder_non_contiguous_backward() {
        let mut t = PositionIndexTranslator::identity(6);
        let diffs = t.reorder([4, 2], 1).unwrap();
        assert_eq!(visible(&t), vec![0, 2, 4, 1, 3, 5]);
        let deletes = diffs.iter().filter(|d| d.kind == DiffKind::Delete).count();
        assert_eq!(deletes, 2);
        assert_eq!(
            diff::replay_moves(&[0, 1, 2, 3, 4, 5], &diffs).unwrap(),
            visible(&t)
        );
    }

    #[test]
    fn reorder_to_end() {
        let mut t = PositionIndexTranslator::identity(4);
        t.reorder([0], 4).unwrap();
        assert_eq!(visible(&t), vec![1, 2, 3, 0]);
    }

    #[test]
    fn reorder_noop_cases() {
        let mut t = PositionIndexTranslator::identity(4);
        assert!(t.reorder([1], 1).is_none());
        assert!(t.reorder([1], 2).is_none());
        assert!(t.reorder([1, 2], 3).is_none());
        assert!(t.reorder([9], 0).is_none());
        assert!(t.reorder([0], 5).is_none());
        assert_eq!(visible(&t), vec![0, 1, 2, 3]);
    }

    #[test]
    fn reorder_keeps_hidden_next_to_unmoved_neighbours() {
        let mut t = PositionIndexTranslator::identity(5);
        t.hide([1]);
        // visible: 0 2 3 4; move index 0 to the end.
        t.reorder([0], 4).unwrap();
        assert_eq!(visible(&t), vec![2, 3, 4, 0]);
        assert_eq!(t.full_order(), &[1, 2, 3, 4, 0]);
        t.show([1]);
        assert_eq!(visible(&t), vec![1, 2, 3, 4, 0]);
    }

    #[test]
    fn delete_shifts_and_drops_hidden() {
        let mut t = PositionIndexTranslator::identity(8);
        t.hide([2, 6]);
        t.handle_structural_change(&IndexChange::delete(1, 2));
        // 1 and 2 gone; 3.. shift down by 2; hidden 6 becomes 4.
        assert_eq!(visible(&t), vec![0, 1, 2, 3, 5]);
        assert_eq!(t.hidden_indexes(), vec![4]);
        assert_consistent(&t);
    }

    #[test]
    fn insert_lands_before_previous_holder() {
        let mut t = PositionIndexTranslator::identity(4);
        t.reorder([0], 4).unwrap();
        // visible: 1 2 3 0
        t.handle_structural_change(&IndexChange::insert(1, 2));
        // old 1 is now 3; new 1, 2 go in front of it.
        assert_eq!(visible(&t), vec![1, 2, 3, 4, 5, 0]);
        assert_consistent(&t);
    }

    #[test]
    fn insert_at_end_appends_and_is_visible() {
        let mut t = PositionIndexTranslator::identity(3);
        t.hide([2]);
        t.handle_structural_change(&IndexChange::insert(3, 2));
        assert_eq!(visible(&t), vec![0, 1, 3, 4]);
        assert_eq!(t.hidden_indexes(), vec![2]);
    }

    #[test]
    fn sync_order_keeps_hidden_flags() {
        let mut t = PositionIndexTranslator::identity(4);
        t.hide([1]);
        t.sync_order([3, 1, 0]);
        assert_eq!(visible(&t), vec![3, 0]);
        assert_eq!(t.hidden_indexes(), vec![1]);
    }

    #[test]
    fn reconcile_keeps_own_order() {
        let mut t = PositionIndexTranslator::identity(4);
        t.reorder([3], 0).unwrap();
        t.reconcile([0, 1, 3, 4]);
        assert_eq!(visible(&t), vec![3, 0, 1, 4]);
    }

    #[test]
    fn rank_helpers_for_mirrors() {
        let mut t = PositionIndexTranslator::identity(6);
        t.hide([1, 2]);
        assert_eq!(t.underlying_position(1), Some(3));
        assert_eq!(t.local_position(3), Some(1));
        assert_eq!(t.local_position(2), None);
        assert_eq!(t.insertion_point(2), 1);
        assert_eq!(t.insertion_point(6), 4);
    }

    #[test]
    fn set_hidden_indexes_restores() {
        let mut t = PositionIndexTranslator::identity(5);
        t.set_hidden_indexes([4, 0, 99]);
        assert_eq!(visible(&t), vec![1, 2, 3]);
        assert_eq!(t.hidden_indexes(), vec![0, 4]);
    }
}
