//! Prefix table of cumulative pixel offsets.
//!
//! `offset(p)` is the pixel distance from position 0 to the start edge of
//! position `p`. Entries are filled on demand up to the highest position
//! queried, so a million-row axis that only ever shows its first screen
//! costs a screenful of entries.
//!
//! # Invalidation
//!
//! A size change at position `p` leaves the offsets of `0..=p` intact, so
//! [`AggregateCache::invalidate_from`] truncates just past `p`. Global
//! changes (default size, DPI, percentage space) call
//! [`AggregateCache::clear`].

/// Statistics about prefix-table reuse.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregateCacheStats {
    /// Offsets currently stored.
    pub entries: usize,
    /// Queries answered from stored offsets.
    pub hits: u64,
    /// Queries that had to extend the table.
    pub misses: u64,
}

/// Lazily extended prefix-sum table.
#[derive(Debug, Clone)]
pub struct AggregateCache {
    /// `prefix[i]` = offset of position `i`. Always holds at least `[0]`.
    prefix: Vec<u64>,
    hits: u64,
    misses: u64,
}

impl Default for AggregateCache {
    fn default() -> Self {
        Self::new()
    }
}

impl AggregateCache {
    /// Empty table.
    #[must_use]
    pub fn new() -> Self {
        Self {
            prefix: vec![0],
            hits: 0,
            misses: 0,
        }
    }

    /// Offset of `position`, extending the table with `size_of` as needed.
    pub fn offset(&mut self, position: usize, mut size_of: impl FnMut(usize) -> u32) -> u64 {
        if let Some(&cached) = self.prefix.get(position) {
            self.hits += 1;
            return cached;
        }
        self.misses += 1;
        self.prefix.reserve(position + 1 - self.prefix.len());
        let mut acc = self.prefix.last().copied().unwrap_or(0);
        for p in (self.prefix.len() - 1)..position {
            acc += u64::from(size_of(p));
            self.prefix.push(acc);
        }
        acc
    }

    /// Drop offsets that depend on the size of `position` or later.
    pub fn invalidate_from(&mut self, position: usize) {
        self.prefix.truncate(position + 1);
    }

    /// Drop every offset.
    pub fn clear(&mut self) {
        self.prefix.truncate(1);
    }

    /// Number of stored offsets beyond the origin.
    #[must_use]
    pub fn cached_len(&self) -> usize {
        self.prefix.len() - 1
    }

    /// Reuse statistics.
    #[must_use]
    pub fn stats(&self) -> AggregateCacheStats {
        AggregateCacheStats {
            entries: self.prefix.len(),
            hits: self.hits,
            misses: self.misses,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origin_is_zero() {
        let mut cache = AggregateCache::new();
        assert_eq!(cache.offset(0, |_| 10), 0);
    }

    #[test]
    fn extends_lazily() {
        let mut cache = AggregateCache::new();
        assert_eq!(cache.offset(3, |p| (p as u32 + 1) * 10), 60);
        assert_eq!(cache.cached_len(), 3);
        // Already covered: the closure must not be consulted.
        assert_eq!(cache.offset(2, |_| panic!("recomputed")), 30);
        assert_eq!(cache.stats().hits, 1);
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn invalidate_from_keeps_earlier_offsets() {
        let mut cache = AggregateCache::new();
        cache.offset(5, |_| 10);
        cache.invalidate_from(2);
        assert_eq!(cache.cached_len(), 2);
        assert_eq!(cache.offset(5, |p| if p == 2 { 40 } else { 10 }), 80);
    }

    #[test]
    fn clear_resets_to_origin() {
        let mut cache = AggregateCache::new();
        cache.offset(4, |_| 7);
        cache.clear();
        assert_eq!(cache.cached_len(), 0);
        assert_eq!(cache.offset(4, |_| 1), 4);
    }
}
