//! Percentage resolution.
//!
//! Turns a row of [`Slot`]s into device-pixel sizes that sum to the
//! available space.
//!
//! # Algorithm
//!
//! 1. Fixed slots take their pixel size off the top; the rest is the
//!    *pool*.
//! 2. Dynamic slots with an explicit percentage take that share of the pool.
//!    Dynamic slots without one split `100 - Σexplicit` evenly. An explicit
//!    sum above 100 is scaled down to 100.
//! 3. Each share is truncated to whole pixels.
//! 4. A dynamic slot that lands below its minimum becomes fixed at the
//!    minimum and the pass restarts. Every restart fixes at least one more
//!    slot, so at most `n + 1` passes run.
//! 5. The truncation leftover goes back to the dynamic slots: `leftover / n`
//!    each, then one pixel per slot in position order for the remainder.
//!
//! If fixed sizes and minimums alone exceed the space, resolution fails with
//! [`GridError::CascadeDidNotConverge`] and [`resolve_or_fallback`] shrinks
//! every dynamic slot to its minimum.

use tabula_core::GridError;
use tracing::{error, warn};

/// Absorbs float noise when converting a percentage share back to pixels,
/// so that `px * 100 / pool` percent of `pool` truncates to `px`.
const SHARE_EPSILON: f64 = 1e-6;

/// One position as seen by the resolver. Sizes are device pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Slot {
    /// Takes exactly this many pixels (0 for excluded positions).
    Fixed(u32),
    /// Governed by percentage sizing.
    Dynamic {
        /// Explicit share of 100%, if any.
        percentage: Option<f64>,
        /// Floor in device pixels.
        min: u32,
    },
}

/// Result of a resolution pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    /// Resolved size per slot.
    pub sizes: Vec<u32>,
    /// Pixels shared by the dynamic slots that stayed dynamic.
    pub pool: u32,
    /// True for slots that stayed dynamic (not fixed, not pinned to a minimum).
    pub dynamic: Vec<bool>,
}

impl Resolution {
    /// Sum of all resolved sizes.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.sizes.iter().map(|&s| u64::from(s)).sum()
    }
}

/// Resolve `slots` against `available` pixels.
pub fn resolve(slots: &[Slot], available: u32) -> Result<Resolution, GridError> {
    let n = slots.len();
    // `pinned[i]` holds the forced size of slots fixed up front or pinned to
    // their minimum during the cascade.
    let mut pinned: Vec<Option<u32>> = slots
        .iter()
        .map(|slot| match *slot {
            Slot::Fixed(px) => Some(px),
            Slot::Dynamic { .. } => None,
        })
        .collect();

    for _round in 0..=n {
        let fixed_total: u64 = pinned.iter().flatten().map(|&px| u64::from(px)).sum();
        if fixed_total > u64::from(available) {
            return Err(GridError::CascadeDidNotConverge {
                required: fixed_total,
                available,
            });
        }
        let pool = available - u32::try_from(fixed_total).unwrap_or(available);

        let shares = shares(slots, &pinned);
        let mut sizes = vec![0u32; n];
        let mut violated = false;
        for (i, slot) in slots.iter().enumerate() {
            if let Some(px) = pinned[i] {
                sizes[i] = px;
                continue;
            }
            let share = shares[i];
            sizes[i] = to_pixels(pool, share);
            if let Slot::Dynamic { min, .. } = *slot {
                if sizes[i] < min {
                    pinned[i] = Some(min);
                    violated = true;
                }
            }
        }
        if violated {
            continue;
        }

        let dynamic: Vec<bool> = pinned.iter().map(Option::is_none).collect();
        distribute_leftover(&mut sizes, &dynamic, pool);
        return Ok(Resolution {
            sizes,
            pool,
            dynamic,
        });
    }

    // Each round pins at least one more slot, so the loop only falls through
    // when pinning every slot still violates a minimum.
    let required = pinned.iter().flatten().map(|&px| u64::from(px)).sum();
    Err(GridError::CascadeDidNotConverge {
        required,
        available,
    })
}

/// [`resolve`], logging a failure and shrinking every dynamic slot to its
/// minimum instead.
///
/// On that fallback the sizes sum to the fixed sizes plus the minimums, so
/// [`Resolution::total`] may exceed `available`.
pub fn resolve_or_fallback(slots: &[Slot], available: u32) -> Resolution {
    match resolve(slots, available) {
        Ok(resolution) => resolution,
        Err(err) => {
            error!(message = "percentage.fallback", %err, slots = slots.len());
            let sizes = slots
                .iter()
                .map(|slot| match *slot {
                    Slot::Fixed(px) => px,
                    Slot::Dynamic { min, .. } => min,
                })
                .collect();
            Resolution {
                sizes,
                pool: 0,
                dynamic: vec![false; slots.len()],
            }
        }
    }
}

/// Percentage share of every slot still dynamic under `pinned`.
fn shares(slots: &[Slot], pinned: &[Option<u32>]) -> Vec<f64> {
    let mut explicit_sum = 0.0f64;
    let mut implicit = 0usize;
    for (slot, pin) in slots.iter().zip(pinned) {
        if pin.is_some() {
            continue;
        }
        if let Slot::Dynamic { percentage, .. } = *slot {
            match percentage {
                Some(p) => explicit_sum += p,
                None => implicit += 1,
            }
        }
    }

    let scale = if explicit_sum > 100.0 {
        warn!(message = "percentage.overcommitted", explicit_sum);
        100.0 / explicit_sum
    } else {
        1.0
    };
    let residual = (100.0 - explicit_sum * scale).max(0.0);
    let implicit_share = if implicit > 0 {
        residual / implicit as f64
    } else {
        0.0
    };

    slots
        .iter()
        .zip(pinned)
        .map(|(slot, pin)| match (*slot, pin) {
            (Slot::Dynamic { percentage, .. }, None) => match percentage {
                Some(p) => p * scale,
                None => implicit_share,
            },
            _ => 0.0,
        })
        .collect()
}

/// Truncate `share` percent of `pool` to whole pixels.
#[inline]
pub fn to_pixels(pool: u32, share: f64) -> u32 {
    let px = (f64::from(pool) * share / 100.0 + SHARE_EPSILON).floor();
    if px <= 0.0 {
        0
    } else if px >= f64::from(u32::MAX) {
        u32::MAX
    } else {
        px as u32
    }
}

/// Percentage of `pool` that `px` pixels represent.
#[inline]
pub fn to_percentage(pool: u32, px: u32) -> f64 {
    if pool == 0 {
        0.0
    } else {
        f64::from(px) * 100.0 / f64::from(pool)
    }
}

fn distribute_leftover(sizes: &mut [u32], dynamic: &[bool], pool: u32) {
    let used: u64 = sizes
        .iter()
        .zip(dynamic)
        .filter(|(_, d)| **d)
        .map(|(&s, _)| u64::from(s))
        .sum();
    let count = dynamic.iter().filter(|d| **d).count() as u64;
    if count == 0 || used >= u64::from(pool) {
        return;
    }
    let leftover = u64::from(pool) - used;
    let each = leftover / count;
    let mut extra = leftover % count;
    for (size, _) in sizes.iter_mut().zip(dynamic).filter(|(_, d)| **d) {
        let mut add = each;
        if extra > 0 {
            add += 1;
            extra -= 1;
        }
        *size = size.saturating_add(u32::try_from(add).unwrap_or(u32::MAX));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dynamic(n: usize) -> Vec<Slot> {
        vec![
            Slot::Dynamic {
                percentage: None,
                min: 0
            };
            n
        ]
    }

    #[test]
    fn even_split_is_exact() {
        let res = resolve(&dynamic(10), 1000).unwrap();
        assert!(res.sizes.iter().all(|&s| s == 100));
        assert_eq!(res.total(), 1000);
    }

    #[test]
    fn leftover_goes_to_first_positions() {
        // 100 / 3 = 33.33 -> 33 each, 1 leftover to slot 0.
        let res = resolve(&dynamic(3), 100).unwrap();
        assert_eq!(res.sizes, vec![34, 33, 33]);

        // 500 / 3 -> 166 each, 2 leftover.
        let res = resolve(&dynamic(3), 500).unwrap();
        assert_eq!(res.sizes, vec![167, 167, 166]);
    }

    #[test]
    fn fixed_slots_shrink_the_pool() {
        let slots = vec![
            Slot::Fixed(100),
            Slot::Dynamic {
                percentage: None,
                min: 0,
            },
            Slot::Dynamic {
                percentage: None,
                min: 0,
            },
        ];
        let res = resolve(&slots, 300).unwrap();
        assert_eq!(res.pool, 200);
        assert_eq!(res.sizes, vec![100, 100, 100]);
        assert_eq!(res.dynamic, vec![false, true, true]);
    }

    #[test]
    fn explicit_percentages_take_share_of_hundred() {
        let slots = vec![
            Slot::Dynamic {
                percentage: Some(50.0),
                min: 0,
            },
            Slot::Dynamic {
                percentage: None,
                min: 0,
            },
            Slot::Dynamic {
                percentage: None,
                min: 0,
            },
        ];
        let res = resolve(&slots, 400).unwrap();
        assert_eq!(res.sizes, vec![200, 100, 100]);
    }

    #[test]
    fn overcommitted_explicit_percentages_are_normalised() {
        let slots = vec![
            Slot::Dynamic {
                percentage: Some(80.0),
                min: 0,
            },
            Slot::Dynamic {
                percentage: Some(80.0),
                min: 0,
            },
        ];
        let res = resolve(&slots, 200).unwrap();
        assert_eq!(res.sizes, vec![100, 100]);
    }

    #[test]
    fn minimum_violation_pins_and_restarts() {
        let mut slots = dynamic(4);
        slots[1] = Slot::Dynamic {
            percentage: None,
            min: 40,
        };
        // 100 / 4 = 25 < 40 for slot 1 -> pinned at 40, others share 60.
        let res = resolve(&slots, 100).unwrap();
        assert_eq!(res.sizes, vec![20, 40, 20, 20]);
        assert!(!res.dynamic[1]);
        assert_eq!(res.total(), 100);
    }

    #[test]
    fn minimums_exceeding_space_fail_and_fall_back() {
        let slots = vec![
            Slot::Dynamic {
                percentage: None,
                min: 80,
            },
            Slot::Dynamic {
                percentage: None,
                min: 80,
            },
        ];
        let err = resolve(&slots, 100).unwrap_err();
        assert!(matches!(err, GridError::CascadeDidNotConverge { .. }));
        let res = resolve_or_fallback(&slots, 100);
        assert_eq!(res.sizes, vec![80, 80]);
        assert_eq!(res.total(), 160);
        assert!(res.dynamic.iter().all(|d| !d));
    }

    #[test]
    fn explicit_under_hundred_without_implicit_still_fills() {
        let slots = vec![
            Slot::Dynamic {
                percentage: Some(30.0),
                min: 0,
            },
            Slot::Dynamic {
                percentage: Some(30.0),
                min: 0,
            },
        ];
        // 60 + 60 used, 80 leftover -> 40 each.
        let res = resolve(&slots, 200).unwrap();
        assert_eq!(res.sizes, vec![100, 100]);
    }

    #[test]
    fn percentage_round_trip_through_pixels() {
        let pct = to_percentage(400, 150);
        assert_eq!(to_pixels(400, pct), 150);
        let pct = to_percentage(500, 134);
        assert_eq!(to_pixels(500, pct), 134);
    }
}
