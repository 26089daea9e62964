#![forbid(unsafe_code)]

//! Per-dimension size allocation.
//!
//! A [`SizeAllocator`] answers "how wide is column `p`" and "where does
//! column `p` start" for one axis of the data layer. Its positions are the
//! data layer's positions, which are data indexes.
//!
//! # Resolution order
//!
//! [`SizeAllocator::get_size`] resolves:
//!
//! 1. excluded (hidden above) → 0;
//! 2. percentage sizing active and covered by the last
//!    [`calculate_percentages`](SizeAllocator::calculate_percentages) → the
//!    resolved share (see [`crate::percentage`]);
//! 3. explicit pixel override, else per-position default, else the global
//!    default, clamped to the minimum and DPI up-scaled.
//!
//! Configured values are logical pixels; everything returned is device
//! pixels.
//!
//! # Resizing in percentage mode
//!
//! Resizing a dynamic position moves pixels to or from its neighbours rather
//! than from the whole row: the nearest dynamic neighbours after it absorb
//! the change first, then the ones before it, each stopping at its own
//! minimum. The new sizes are stored as derived percentages so they survive
//! the next change of available space. Percentages set explicitly through
//! [`SizeAllocator::set_percentage`] are pinned and never absorb a
//! neighbour's resize.
//!
//! A position raised to its minimum is fixed for that resolution pass only;
//! resizing it still goes through the neighbour path. A resize that arrives
//! before the first [`calculate_percentages`](SizeAllocator::calculate_percentages)
//! is held as pending and turned into a derived percentage of the default
//! layout once the space is known.

use std::cell::RefCell;
use std::collections::BTreeSet;

use rustc_hash::{FxHashMap, FxHashSet};
use tabula_core::{ChangeKind, DpiConverter, GridError, IndexChange};
use tracing::{debug, trace, warn};

use crate::aggregate::AggregateCache;
use crate::percentage::{self, Resolution, Slot};
use crate::state::SizeEntry;

/// A stored percentage.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Percentage {
    value: f64,
    /// Set explicitly; excluded from neighbour redistribution.
    pinned: bool,
}

/// Space recorded by the last `calculate_percentages`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Space {
    available: u32,
    count: usize,
}

/// Size engine for one axis.
#[derive(Debug, Clone)]
pub struct SizeAllocator {
    default_size: u32,
    default_sizes: FxHashMap<usize, u32>,
    sizes: FxHashMap<usize, u32>,
    /// Percentage-mode resizes made before any space was recorded.
    pending: FxHashMap<usize, u32>,
    percentages: FxHashMap<usize, Percentage>,
    default_min_size: u32,
    min_sizes: FxHashMap<usize, u32>,
    default_resizable: bool,
    resizable: FxHashMap<usize, bool>,
    percentage_sizing: bool,
    percentage_sizing_at: FxHashMap<usize, bool>,
    excluded: FxHashSet<usize>,
    dpi: DpiConverter,
    space: Option<Space>,
    resolution: RefCell<Option<Resolution>>,
    aggregate: RefCell<AggregateCache>,
}

impl SizeAllocator {
    /// Allocator where every position defaults to `default_size` logical
    /// pixels, resizable, no minimum, no percentage sizing.
    #[must_use]
    pub fn new(default_size: u32) -> Self {
        Self {
            default_size,
            default_sizes: FxHashMap::default(),
            sizes: FxHashMap::default(),
            pending: FxHashMap::default(),
            percentages: FxHashMap::default(),
            default_min_size: 0,
            min_sizes: FxHashMap::default(),
            default_resizable: true,
            resizable: FxHashMap::default(),
            percentage_sizing: false,
            percentage_sizing_at: FxHashMap::default(),
            excluded: FxHashSet::default(),
            dpi: DpiConverter::default(),
            space: None,
            resolution: RefCell::new(None),
            aggregate: RefCell::new(AggregateCache::new()),
        }
    }

    // ── Defaults ────────────────────────────────────────────────────────

    /// Global default size in logical pixels.
    #[must_use]
    pub fn default_size(&self) -> u32 {
        self.default_size
    }

    /// Change the global default size.
    pub fn set_default_size(&mut self, size: u32) {
        self.default_size = size;
        self.invalidate_all();
    }

    /// Default size for one position, overriding the global default.
    pub fn set_default_size_at(&mut self, position: usize, size: u32) {
        self.default_sizes.insert(position, size);
        self.invalidate_from(position);
    }

    /// Default size of `position` in logical pixels.
    #[must_use]
    pub fn default_size_at(&self, position: usize) -> u32 {
        self.default_sizes
            .get(&position)
            .copied()
            .unwrap_or(self.default_size)
    }

    // ── Minimums and resizability ───────────────────────────────────────

    /// Minimum applied to positions without their own.
    pub fn set_default_min_size(&mut self, min: u32) {
        self.default_min_size = min;
        self.invalidate_all();
    }

    /// Minimum size of one position.
    pub fn set_min_size(&mut self, position: usize, min: u32) {
        self.min_sizes.insert(position, min);
        self.invalidate_from(position);
    }

    /// Minimum of `position` in logical pixels.
    #[must_use]
    pub fn min_size(&self, position: usize) -> u32 {
        self.min_sizes
            .get(&position)
            .copied()
            .unwrap_or(self.default_min_size)
    }

    /// Whether positions without their own flag accept resizes.
    pub fn set_default_resizable(&mut self, resizable: bool) {
        self.default_resizable = resizable;
    }

    /// Whether `position` accepts resizes.
    pub fn set_resizable(&mut self, position: usize, resizable: bool) {
        self.resizable.insert(position, resizable);
    }

    /// True if [`set_size`](Self::set_size) may change `position`.
    #[must_use]
    pub fn is_resizable(&self, position: usize) -> bool {
        self.resizable
            .get(&position)
            .copied()
            .unwrap_or(self.default_resizable)
    }

    // ── DPI ─────────────────────────────────────────────────────────────

    /// Change the display density.
    pub fn set_dpi(&mut self, dpi: u32) {
        self.dpi = DpiConverter::new(dpi);
        self.invalidate_all();
    }

    /// The active converter.
    #[must_use]
    pub fn dpi(&self) -> DpiConverter {
        self.dpi
    }

    // ── Percentage sizing ───────────────────────────────────────────────

    /// Turn percentage sizing on or off for the whole axis.
    pub fn set_percentage_sizing(&mut self, enabled: bool) {
        self.percentage_sizing = enabled;
        self.invalidate_all();
    }

    /// Turn percentage sizing on or off for one position.
    pub fn set_percentage_sizing_at(&mut self, position: usize, enabled: bool) {
        self.percentage_sizing_at.insert(position, enabled);
        self.invalidate_all();
    }

    /// Global percentage sizing flag.
    #[must_use]
    pub fn is_percentage_sizing(&self) -> bool {
        self.percentage_sizing
    }

    /// Whether `position` is governed by percentage sizing.
    #[must_use]
    pub fn is_percentage_sized(&self, position: usize) -> bool {
        self.percentage_sizing_at
            .get(&position)
            .copied()
            .unwrap_or(self.percentage_sizing)
    }

    /// True if any position of the axis uses percentage sizing.
    #[must_use]
    pub fn uses_percentages(&self) -> bool {
        self.percentage_sizing || self.percentage_sizing_at.values().any(|&on| on)
    }

    /// Pin `position` to `percentage` of the percentage pool.
    ///
    /// Values outside `0..=100` are clamped.
    pub fn set_percentage(&mut self, position: usize, percentage: f64) {
        let value = if percentage.is_nan() {
            0.0
        } else {
            percentage.clamp(0.0, 100.0)
        };
        if percentage.is_nan() || !(0.0..=100.0).contains(&percentage) {
            let error =
                GridError::InvalidConfiguration(format!("percentage {percentage} at {position}"));
            warn!(message = "size.percentage_clamped", %error, value);
        }
        self.percentages.insert(
            position,
            Percentage {
                value,
                pinned: true,
            },
        );
        self.invalidate_all();
    }

    /// Stored percentage of `position`, pinned or derived.
    #[must_use]
    pub fn percentage(&self, position: usize) -> Option<f64> {
        self.percentages.get(&position).map(|p| p.value)
    }

    /// Record the space percentage sizing divides among `count` positions.
    ///
    /// Resolution happens lazily on the next size query.
    pub fn calculate_percentages(&mut self, available: u32, count: usize) {
        let next = Space { available, count };
        if self.space == Some(next) {
            return;
        }
        trace!(message = "size.space", available, count);
        self.space = Some(next);
        self.settle_pending();
        self.invalidate_all();
    }

    /// Space recorded by the last [`calculate_percentages`](Self::calculate_percentages).
    #[must_use]
    pub fn available_space(&self) -> Option<u32> {
        self.space.map(|s| s.available)
    }

    // ── Exclusion ───────────────────────────────────────────────────────

    /// Exclude positions from sizing: they report 0 and their space is
    /// redistributed in percentage mode.
    pub fn set_hidden(&mut self, positions: impl IntoIterator<Item = usize>) {
        let mut first = None::<usize>;
        for p in positions {
            if self.excluded.insert(p) {
                first = Some(first.map_or(p, |f| f.min(p)));
            }
        }
        if let Some(p) = first {
            self.invalidate_from(p);
        }
    }

    /// Include previously excluded positions again.
    pub fn set_shown(&mut self, positions: impl IntoIterator<Item = usize>) {
        let mut first = None::<usize>;
        for p in positions {
            if self.excluded.remove(&p) {
                first = Some(first.map_or(p, |f| f.min(p)));
            }
        }
        if let Some(p) = first {
            self.invalidate_from(p);
        }
    }

    /// True if `position` is excluded from sizing.
    #[must_use]
    pub fn is_hidden(&self, position: usize) -> bool {
        self.excluded.contains(&position)
    }

    // ── Queries ─────────────────────────────────────────────────────────

    /// Size of `position` in device pixels.
    #[must_use]
    pub fn get_size(&self, position: usize) -> u32 {
        if self.excluded.contains(&position) {
            return 0;
        }
        if let Some(px) = self.resolved_size(position) {
            return px;
        }
        self.pixel_size(position)
    }

    /// Offset of `position` from position 0 in device pixels.
    #[must_use]
    pub fn get_aggregate_size(&self, position: usize) -> u64 {
        self.aggregate
            .borrow_mut()
            .offset(position, |p| self.get_size(p))
    }

    /// Offset and size of `position`.
    #[must_use]
    pub fn extent(&self, position: usize) -> (u64, u32) {
        (self.get_aggregate_size(position), self.get_size(position))
    }

    /// Position containing pixel `offset` among the first `count` positions.
    #[must_use]
    pub fn position_at(&self, offset: u64, count: usize) -> Option<usize> {
        if count == 0 || offset >= self.get_aggregate_size(count) {
            return None;
        }
        // The prefix table is monotonic, so binary search the start edges.
        let (mut lo, mut hi) = (0usize, count);
        while lo + 1 < hi {
            let mid = lo + (hi - lo) / 2;
            if self.get_aggregate_size(mid) <= offset {
                lo = mid;
            } else {
                hi = mid;
            }
        }
        Some(lo)
    }

    // ── Mutation ────────────────────────────────────────────────────────

    /// Resize `position` to `size` logical pixels.
    ///
    /// Returns `false` when nothing changed: the position is not resizable,
    /// or a percentage resize found no neighbour with room to give.
    pub fn set_size(&mut self, position: usize, size: u32) -> bool {
        if !self.is_resizable(position) {
            debug!(message = "size.not_resizable", position);
            return false;
        }
        if let Some(changed) = self.resize_dynamic(position, size) {
            return changed;
        }
        let clamped = size.max(self.min_size(position));
        debug!(message = "size.set", position, size = clamped);
        self.sizes.insert(position, clamped);
        self.invalidate_from(position);
        true
    }

    /// Drop every per-position override.
    pub fn reset(&mut self) {
        self.default_sizes.clear();
        self.sizes.clear();
        self.pending.clear();
        self.percentages.clear();
        self.min_sizes.clear();
        self.resizable.clear();
        self.percentage_sizing_at.clear();
        self.invalidate_all();
    }

    /// Shift per-position state for a data insert or delete.
    pub fn handle_structural_change(&mut self, change: &IndexChange) {
        if change.is_noop() {
            return;
        }
        shift_keys(&mut self.default_sizes, change);
        shift_keys(&mut self.sizes, change);
        shift_keys(&mut self.pending, change);
        shift_keys(&mut self.percentages, change);
        shift_keys(&mut self.min_sizes, change);
        shift_keys(&mut self.resizable, change);
        shift_keys(&mut self.percentage_sizing_at, change);
        self.excluded = self
            .excluded
            .iter()
            .filter_map(|&p| change.map_index(p))
            .collect();
        if let Some(space) = self.space.as_mut() {
            space.count = match change.kind {
                ChangeKind::Insert if change.at <= space.count => {
                    space.count + change.count
                }
                ChangeKind::Insert => space.count,
                ChangeKind::Delete if change.at < space.count => {
                    space.count - change.count.min(space.count - change.at)
                }
                ChangeKind::Delete => space.count,
            };
        }
        self.invalidate_all();
    }

    // ── Persistence accessors ───────────────────────────────────────────

    /// Per-position overrides, ordered by position. Pending percentage-mode
    /// resizes are not included.
    #[must_use]
    pub fn entries(&self) -> Vec<(usize, SizeEntry)> {
        let positions: BTreeSet<usize> = self
            .default_sizes
            .keys()
            .chain(self.sizes.keys())
            .chain(self.percentages.keys())
            .chain(self.min_sizes.keys())
            .chain(self.resizable.keys())
            .chain(self.percentage_sizing_at.keys())
            .copied()
            .collect();
        positions
            .into_iter()
            .map(|p| {
                let pct = self.percentages.get(&p);
                (
                    p,
                    SizeEntry {
                        default_size: self.default_sizes.get(&p).copied(),
                        size: self.sizes.get(&p).copied(),
                        percentage: pct.map(|x| x.value),
                        percentage_pinned: pct.is_some_and(|x| x.pinned),
                        min_size: self.min_sizes.get(&p).copied(),
                        resizable: self.resizable.get(&p).copied(),
                        percentage_sizing: self.percentage_sizing_at.get(&p).copied(),
                    },
                )
            })
            .collect()
    }

    /// Replace every per-position override with `entries`.
    pub fn restore_entries(&mut self, entries: impl IntoIterator<Item = (usize, SizeEntry)>) {
        self.reset();
        for (p, entry) in entries {
            if let Some(v) = entry.default_size {
                self.default_sizes.insert(p, v);
            }
            if let Some(v) = entry.size {
                self.sizes.insert(p, v);
            }
            if let Some(v) = entry.percentage {
                self.percentages.insert(
                    p,
                    Percentage {
                        value: v.clamp(0.0, 100.0),
                        pinned: entry.percentage_pinned,
                    },
                );
            }
            if let Some(v) = entry.min_size {
                self.min_sizes.insert(p, v);
            }
            if let Some(v) = entry.resizable {
                self.resizable.insert(p, v);
            }
            if let Some(v) = entry.percentage_sizing {
                self.percentage_sizing_at.insert(p, v);
            }
        }
        self.invalidate_all();
    }

    // ── Internals ───────────────────────────────────────────────────────

    /// Pixel path: override or default, min-clamped, up-scaled.
    fn pixel_size(&self, position: usize) -> u32 {
        let base = self
            .sizes
            .get(&position)
            .or_else(|| self.pending.get(&position))
            .copied()
            .unwrap_or_else(|| self.default_size_at(position));
        self.dpi.upscale(base.max(self.min_size(position)))
    }

    /// True if `position` takes part in percentage sharing by configuration.
    fn is_dynamic(&self, position: usize) -> bool {
        !self.excluded.contains(&position)
            && self.is_percentage_sized(position)
            && (self.percentages.contains_key(&position) || !self.sizes.contains_key(&position))
    }

    fn is_pinned(&self, position: usize) -> bool {
        self.percentages.get(&position).is_some_and(|p| p.pinned)
    }

    fn slot(&self, position: usize) -> Slot {
        if self.excluded.contains(&position) {
            Slot::Fixed(0)
        } else if self.is_dynamic(position) {
            Slot::Dynamic {
                percentage: self.percentage(position),
                min: self.dpi.upscale(self.min_size(position)),
            }
        } else {
            Slot::Fixed(self.pixel_size(position))
        }
    }

    /// Run `f` against the current resolution, computing it if needed.
    fn with_resolution<R>(&self, f: impl FnOnce(&Resolution) -> R) -> Option<R> {
        let space = self.space?;
        if !self.uses_percentages() {
            return None;
        }
        {
            let mut cached = self.resolution.borrow_mut();
            if cached.is_none() {
                let slots: Vec<Slot> = (0..space.count).map(|p| self.slot(p)).collect();
                let resolution = percentage::resolve_or_fallback(&slots, space.available);
                trace!(
                    message = "size.resolved",
                    count = space.count,
                    available = space.available,
                    pool = resolution.pool
                );
                *cached = Some(resolution);
            }
        }
        self.resolution.borrow().as_ref().map(f)
    }

    fn resolved_size(&self, position: usize) -> Option<u32> {
        self.with_resolution(|r| r.sizes.get(position).copied())
            .flatten()
    }

    /// Percentage-mode resize. `None` when the position is not dynamic and
    /// the pixel path applies instead.
    fn resize_dynamic(&mut self, position: usize, size: u32) -> Option<bool> {
        if !self.is_dynamic(position) {
            return None;
        }
        let Some((current, pool, dynamic)) =
            self.with_resolution(|r| (r.sizes.clone(), r.pool, r.dynamic.clone()))
        else {
            let pending = size.max(self.min_size(position));
            debug!(message = "size.pending", position, size = pending);
            self.pending.insert(position, pending);
            self.invalidate_from(position);
            return Some(true);
        };
        if position >= current.len() {
            return None;
        }
        // Raised to its minimum in this pass: its pixels sit outside the pool.
        let held = !dynamic[position];
        let pool = if held {
            pool.saturating_add(current[position])
        } else {
            pool
        };

        let floor = self.dpi.upscale(self.min_size(position));
        let target = self.dpi.upscale(size).max(floor);
        if self.is_pinned(position) {
            self.percentages.insert(
                position,
                Percentage {
                    value: percentage::to_percentage(pool, target),
                    pinned: true,
                },
            );
            self.invalidate_all();
            return Some(true);
        }

        let before = current[position];
        if target == before {
            return Some(false);
        }
        let neighbours: Vec<usize> = ((position + 1)..current.len())
            .chain((0..position).rev())
            .filter(|&q| dynamic[q] && self.is_dynamic(q) && !self.is_pinned(q))
            .collect();
        let Some(&nearest) = neighbours.first() else {
            debug!(message = "size.no_neighbour", position);
            return Some(false);
        };

        let mut updated: Vec<(usize, u32)> = Vec::new();
        if target > before {
            let wanted = target - before;
            let mut remaining = wanted;
            for &q in &neighbours {
                let room = current[q].saturating_sub(self.dpi.upscale(self.min_size(q)));
                let give = remaining.min(room);
                if give > 0 {
                    updated.push((q, current[q] - give));
                    remaining -= give;
                }
                if remaining == 0 {
                    break;
                }
            }
            let applied = wanted - remaining;
            if applied == 0 {
                debug!(message = "size.neighbours_at_minimum", position);
                return Some(false);
            }
            updated.push((position, before + applied));
        } else {
            updated.push((nearest, current[nearest] + (before - target)));
            updated.push((position, target));
        }
        if held {
            // Derived shares of the smaller pool are restated against the new one.
            let rebased: Vec<(usize, u32)> = (0..current.len())
                .filter(|&q| dynamic[q] && updated.iter().all(|&(u, _)| u != q))
                .filter(|q| self.percentages.get(q).is_some_and(|p| !p.pinned))
                .map(|q| (q, current[q]))
                .collect();
            updated.extend(rebased);
        }

        debug!(
            message = "size.redistributed",
            position,
            from = before,
            to = target,
            touched = updated.len()
        );
        for (q, px) in updated {
            self.percentages.insert(
                q,
                Percentage {
                    value: percentage::to_percentage(pool, px),
                    pinned: false,
                },
            );
        }
        self.invalidate_all();
        Some(true)
    }

    /// Turn pending resizes into derived percentages of the default layout
    /// of the dynamic positions.
    fn settle_pending(&mut self) {
        let Some(space) = self.space else {
            return;
        };
        if self.pending.is_empty() {
            return;
        }
        let total: u64 = (0..space.count)
            .filter(|&p| self.is_dynamic(p))
            .map(|p| u64::from(self.pixel_size(p)))
            .sum();
        let pending = std::mem::take(&mut self.pending);
        let settled = pending.len();
        for (position, px) in pending {
            if position >= space.count || !self.is_dynamic(position) || total == 0 {
                continue;
            }
            let value = (f64::from(self.dpi.upscale(px)) * 100.0 / total as f64).min(100.0);
            let pinned = self.is_pinned(position);
            self.percentages
                .insert(position, Percentage { value, pinned });
        }
        debug!(message = "size.pending_settled", settled, total);
    }

    fn invalidate_from(&mut self, position: usize) {
        if self.uses_percentages() {
            self.invalidate_all();
        } else {
            self.aggregate.get_mut().invalidate_from(position);
        }
    }

    fn invalidate_all(&mut self) {
        *self.resolution.get_mut() = None;
        self.aggregate.get_mut().clear();
    }
}

fn shift_keys<V>(map: &mut FxHashMap<usize, V>, change: &IndexChange) {
    let shifted: FxHashMap<usize, V> = map
        .drain()
        .filter_map(|(k, v)| change.map_index(k).map(|k| (k, v)))
        .collect();
    *map = shifted;
}
