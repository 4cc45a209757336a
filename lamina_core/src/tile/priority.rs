// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-tree tile urgency and the global inputs to every scheduling pass.

use core::cmp::Ordering;

use kurbo::Rect;

/// Time to visible reported when a tile is static or will not become visible
/// within the horizon.
pub const MAX_TIME_TO_VISIBLE_IN_SECONDS: f32 = 1000.0;

/// Which layer tree a priority belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WhichTree {
    /// The tree currently being drawn.
    Active,
    /// The tree being prepared for activation.
    Pending,
}

impl WhichTree {
    /// Both trees, active first.
    pub const ALL: [Self; 2] = [Self::Active, Self::Pending];

    #[inline]
    pub(crate) const fn index(self) -> usize {
        match self {
            Self::Active => 0,
            Self::Pending => 1,
        }
    }
}

/// The resolution a tile's tiling was created at, relative to what the tree
/// currently wants.
///
/// Variants are declared from most to least urgent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TileResolution {
    /// The ideal resolution for the current scale.
    High,
    /// A coarse fallback drawn while high-resolution tiles are missing.
    Low,
    /// Any other resolution; only kept around for reuse.
    NonIdeal,
}

/// How urgently one tree needs a tile.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TilePriority {
    /// The tiling's resolution class.
    pub resolution: TileResolution,
    /// Seconds until the tile becomes visible at the current scroll velocity.
    pub time_to_visible_in_seconds: f32,
    /// Manhattan distance from the tile to the viewport, in screen pixels.
    /// Infinity means the tile is outside the interest area.
    pub distance_to_visible_in_pixels: f32,
    /// Whether the pending tree cannot activate without this tile.
    pub required_for_activation: bool,
}

impl Default for TilePriority {
    fn default() -> Self {
        Self {
            resolution: TileResolution::NonIdeal,
            time_to_visible_in_seconds: f32::INFINITY,
            distance_to_visible_in_pixels: f32::INFINITY,
            required_for_activation: false,
        }
    }
}

impl TilePriority {
    /// Creates a priority that is not required for activation.
    #[must_use]
    pub const fn new(
        resolution: TileResolution,
        time_to_visible_in_seconds: f32,
        distance_to_visible_in_pixels: f32,
    ) -> Self {
        Self {
            resolution,
            time_to_visible_in_seconds,
            distance_to_visible_in_pixels,
            required_for_activation: false,
        }
    }

    /// Returns the priority a tile has when both trees are weighed equally:
    /// the better resolution, the sooner time, the nearer distance.
    #[must_use]
    pub fn combined(active: &Self, pending: &Self) -> Self {
        Self {
            resolution: active.resolution.min(pending.resolution),
            time_to_visible_in_seconds: active
                .time_to_visible_in_seconds
                .min(pending.time_to_visible_in_seconds),
            distance_to_visible_in_pixels: active
                .distance_to_visible_in_pixels
                .min(pending.distance_to_visible_in_pixels),
            required_for_activation: active.required_for_activation
                || pending.required_for_activation,
        }
    }

    /// Total order with the more urgent priority first.
    #[must_use]
    pub fn urgency_cmp(&self, other: &Self) -> Ordering {
        other
            .required_for_activation
            .cmp(&self.required_for_activation)
            .then(self.resolution.cmp(&other.resolution))
            .then(
                self.time_to_visible_in_seconds
                    .total_cmp(&other.time_to_visible_in_seconds),
            )
            .then(
                self.distance_to_visible_in_pixels
                    .total_cmp(&other.distance_to_visible_in_pixels),
            )
    }
}

/// Returns the gap between two rects along x plus the gap along y.
///
/// Rects that merely touch are one pixel apart, so a tile sitting on the edge
/// of the viewport does not count as visible.
#[must_use]
pub fn manhattan_distance(a: Rect, b: Rect) -> f32 {
    let union = a.union(b);
    let x = (union.width() - a.width() - b.width() + 1.0).max(0.0);
    let y = (union.height() - a.height() - b.height() + 1.0).max(0.0);
    #[expect(
        clippy::cast_possible_truncation,
        reason = "screen distances fit comfortably in f32"
    )]
    let distance = (x + y) as f32;
    distance
}

/// Returns the seconds until `current` intersects `target`, extrapolating the
/// motion from `previous` over `time_delta`.
///
/// Returns 0 when they already intersect and
/// [`MAX_TIME_TO_VISIBLE_IN_SECONDS`] when there is no motion or no
/// intersection within that horizon.
#[must_use]
pub fn time_for_bounds_to_intersect(
    previous: Rect,
    current: Rect,
    time_delta: f32,
    target: Rect,
) -> f32 {
    if intersects(current, target) {
        return 0.0;
    }
    if time_delta <= 0.0 {
        return MAX_TIME_TO_VISIBLE_IN_SECONDS;
    }

    // Each edge pair yields the time window in which it overlaps; the rects
    // intersect where all four windows overlap.
    let dt = f64::from(time_delta);
    let mut range = TimeRange {
        start: 0.0,
        end: f64::from(MAX_TIME_TO_VISIBLE_IN_SECONDS),
    };
    range = range.intersect(TimeRange::value_above(previous.x1, current.x1, target.x0, dt));
    range = range.intersect(TimeRange::value_above(-previous.x0, -current.x0, -target.x1, dt));
    range = range.intersect(TimeRange::value_above(previous.y1, current.y1, target.y0, dt));
    range = range.intersect(TimeRange::value_above(-previous.y0, -current.y0, -target.y1, dt));

    if range.is_empty() {
        MAX_TIME_TO_VISIBLE_IN_SECONDS
    } else {
        #[expect(
            clippy::cast_possible_truncation,
            reason = "bounded by MAX_TIME_TO_VISIBLE_IN_SECONDS"
        )]
        let start = range.start as f32;
        start
    }
}

/// Open-interior intersection; rects sharing only an edge do not intersect.
fn intersects(a: Rect, b: Rect) -> bool {
    a.x0 < b.x1 && b.x0 < a.x1 && a.y0 < b.y1 && b.y0 < a.y1
}

#[derive(Clone, Copy, Debug)]
struct TimeRange {
    start: f64,
    end: f64,
}

impl TimeRange {
    const EMPTY: Self = Self {
        start: 0.0,
        end: 0.0,
    };

    /// Times at which a value moving linearly from `previous` to `current`
    /// over `dt` stays above `threshold`.
    fn value_above(previous: f64, current: f64, threshold: f64, dt: f64) -> Self {
        let speed = (current - previous) / dt;
        if speed == 0.0 {
            return if current > threshold {
                Self {
                    start: 0.0,
                    end: f64::INFINITY,
                }
            } else {
                Self::EMPTY
            };
        }
        let crossing = (threshold - current) / speed;
        if speed > 0.0 {
            Self {
                start: crossing.max(0.0),
                end: f64::INFINITY,
            }
        } else {
            Self {
                start: 0.0,
                end: crossing,
            }
        }
    }

    fn intersect(self, other: Self) -> Self {
        Self {
            start: self.start.max(other.start),
            end: self.end.min(other.end),
        }
    }

    fn is_empty(self) -> bool {
        self.start >= self.end
    }
}

/// How much memory the tile manager may hand out.
///
/// Policies are ordered from most to least restrictive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MemoryLimitPolicy {
    /// Every tile is treated as never needed.
    AllowNothing,
    /// Only tiles needed for the current frame.
    AllowAbsoluteMinimum,
    /// Current-frame tiles plus prepaint around the viewport.
    AllowPrepaintOnly,
    /// No restriction; the memory budget is not enforced either.
    ///
    /// Intended for tests and benchmarks, not production frames.
    AllowAnything,
}

/// Which tree's needs win when they disagree.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TreePriority {
    /// Weigh both trees equally.
    SamePriorityForBothTrees,
    /// Favor the active tree so scrolling stays smooth.
    SmoothnessTakesPriority,
    /// Favor the pending tree so new content activates sooner.
    NewContentTakesPriority,
}

/// Host-supplied state that every binning decision in a pass reads.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GlobalState {
    /// Budget for approved tiles.
    pub memory_limit_in_bytes: u64,
    /// Which bins may hold memory at all.
    pub memory_limit_policy: MemoryLimitPolicy,
    /// How the two trees' priorities are weighed.
    pub tree_priority: TreePriority,
}

impl Default for GlobalState {
    fn default() -> Self {
        Self::new(
            0,
            MemoryLimitPolicy::AllowNothing,
            TreePriority::SamePriorityForBothTrees,
        )
    }
}

impl GlobalState {
    /// Creates a global state.
    #[must_use]
    pub const fn new(
        memory_limit_in_bytes: u64,
        memory_limit_policy: MemoryLimitPolicy,
        tree_priority: TreePriority,
    ) -> Self {
        Self {
            memory_limit_in_bytes,
            memory_limit_policy,
            tree_priority,
        }
    }

    /// A budget of `memory_limit_in_bytes` with every bin allowed.
    #[must_use]
    pub const fn with_limit(memory_limit_in_bytes: u64) -> Self {
        Self::new(
            memory_limit_in_bytes,
            MemoryLimitPolicy::AllowAnything,
            TreePriority::SamePriorityForBothTrees,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_priority_is_never_needed() {
        let p = TilePriority::default();
        assert_eq!(p.resolution, TileResolution::NonIdeal);
        assert!(p.distance_to_visible_in_pixels.is_infinite());
        assert!(!p.required_for_activation);
    }

    #[test]
    fn manhattan_distance_of_overlapping_rects_is_zero() {
        let a = Rect::new(0.0, 0.0, 100.0, 100.0);
        let b = Rect::new(50.0, 50.0, 150.0, 150.0);
        assert_eq!(manhattan_distance(a, b), 0.0);
    }

    #[test]
    fn manhattan_distance_counts_touching_edge_as_one_pixel() {
        let a = Rect::new(0.0, 0.0, 100.0, 100.0);
        let b = Rect::new(100.0, 0.0, 200.0, 100.0);
        assert_eq!(manhattan_distance(a, b), 1.0);
    }

    #[test]
    fn manhattan_distance_sums_both_axes() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(30.0, 50.0, 40.0, 60.0);
        // Gaps of 20 and 40, plus one pixel each.
        assert_eq!(manhattan_distance(a, b), 62.0);
    }

    #[test]
    fn time_to_intersect_is_zero_when_already_visible() {
        let r = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert_eq!(time_for_bounds_to_intersect(r, r, 1.0, r), 0.0);
    }

    #[test]
    fn time_to_intersect_extrapolates_motion() {
        let previous = Rect::new(0.0, 0.0, 10.0, 10.0);
        let current = Rect::new(10.0, 0.0, 20.0, 10.0);
        let target = Rect::new(100.0, 0.0, 110.0, 10.0);
        // Moving at 10 px/s, the right edge crosses x = 100 after 8 s.
        let t = time_for_bounds_to_intersect(previous, current, 1.0, target);
        assert!((t - 8.0).abs() < 1e-4, "got {t}");
    }

    #[test]
    fn time_to_intersect_is_max_when_static_or_receding() {
        let target = Rect::new(100.0, 0.0, 110.0, 10.0);
        let here = Rect::new(0.0, 0.0, 10.0, 10.0);
        let behind = Rect::new(-10.0, 0.0, 0.0, 10.0);
        assert_eq!(
            time_for_bounds_to_intersect(here, here, 1.0, target),
            MAX_TIME_TO_VISIBLE_IN_SECONDS
        );
        assert_eq!(
            time_for_bounds_to_intersect(here, behind, 1.0, target),
            MAX_TIME_TO_VISIBLE_IN_SECONDS
        );
        assert_eq!(
            time_for_bounds_to_intersect(behind, here, 0.0, target),
            MAX_TIME_TO_VISIBLE_IN_SECONDS,
            "no elapsed time means no velocity"
        );
    }

    #[test]
    fn combined_takes_best_of_both_trees() {
        let active = TilePriority::new(TileResolution::Low, 2.0, 10.0);
        let mut pending = TilePriority::new(TileResolution::High, 5.0, 3.0);
        pending.required_for_activation = true;
        let c = TilePriority::combined(&active, &pending);
        assert_eq!(c.resolution, TileResolution::High);
        assert_eq!(c.time_to_visible_in_seconds, 2.0);
        assert_eq!(c.distance_to_visible_in_pixels, 3.0);
        assert!(c.required_for_activation);
    }

    #[test]
    fn urgency_prefers_activation_then_resolution_then_time() {
        let base = TilePriority::new(TileResolution::Low, 1.0, 1.0);
        let mut required = TilePriority::new(TileResolution::NonIdeal, 9.0, 9.0);
        required.required_for_activation = true;
        let high = TilePriority::new(TileResolution::High, 9.0, 9.0);
        let sooner = TilePriority::new(TileResolution::Low, 0.5, 50.0);

        assert_eq!(required.urgency_cmp(&base), Ordering::Less);
        assert_eq!(high.urgency_cmp(&base), Ordering::Less);
        assert_eq!(sooner.urgency_cmp(&base), Ordering::Less);
        assert_eq!(base.urgency_cmp(&sooner), Ordering::Greater);
        assert_eq!(base.urgency_cmp(&base), Ordering::Equal);
    }
}
