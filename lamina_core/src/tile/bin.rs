// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Discrete priority classes recomputed for every tile on every pass.

use super::manager::TileManagerSettings;
use super::priority::{MemoryLimitPolicy, TilePriority, TileResolution, TreePriority};

/// Number of [`ManagedTileBin`] variants.
pub const NUM_BINS: usize = 8;

/// A tile's priority class, most urgent first.
///
/// The `*AndActive` variants hold tiles that already have raster work in
/// flight or done; they outrank their plain counterparts so that evicting
/// them is the last resort within a distance class.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ManagedTileBin {
    /// Needed for the current frame and already rasterized.
    NowAndReadyToDraw,
    /// Needed for the current frame.
    Now,
    /// About to scroll into view.
    Soon,
    /// Worth keeping; already has raster work.
    EventuallyAndActive,
    /// Worth rasterizing when nothing more urgent is left.
    Eventually,
    /// Far from the viewport; already has raster work.
    AtLastAndActive,
    /// Far from the viewport.
    AtLast,
    /// No foreseeable use; evicted immediately.
    Never,
}

impl ManagedTileBin {
    /// Every bin, most urgent first.
    pub const ALL: [Self; NUM_BINS] = [
        Self::NowAndReadyToDraw,
        Self::Now,
        Self::Soon,
        Self::EventuallyAndActive,
        Self::Eventually,
        Self::AtLastAndActive,
        Self::AtLast,
        Self::Never,
    ];

    /// Position of the bin in [`ALL`](Self::ALL).
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Returns whether the current frame needs the tile.
    #[inline]
    #[must_use]
    pub const fn is_now(self) -> bool {
        matches!(self, Self::NowAndReadyToDraw | Self::Now)
    }

    /// A short, stable name for diagnostics.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::NowAndReadyToDraw => "now_and_ready_to_draw",
            Self::Now => "now",
            Self::Soon => "soon",
            Self::EventuallyAndActive => "eventually_and_active",
            Self::Eventually => "eventually",
            Self::AtLastAndActive => "at_last_and_active",
            Self::AtLast => "at_last",
            Self::Never => "never",
        }
    }

    /// Inverse of [`index`](Self::index).
    #[must_use]
    pub const fn from_index(index: usize) -> Option<Self> {
        if index < NUM_BINS {
            Some(Self::ALL[index])
        } else {
            None
        }
    }
}

/// Classifies one tree's priority for a tile.
///
/// Pure: identical inputs always yield the identical bin.
#[must_use]
pub fn bin_from_priority(
    priority: &TilePriority,
    tree_priority: TreePriority,
    is_ready_to_draw: bool,
    is_active: bool,
    settings: &TileManagerSettings,
) -> ManagedTileBin {
    let distance = priority.distance_to_visible_in_pixels;
    let time = priority.time_to_visible_in_seconds;

    if distance == f32::INFINITY {
        return ManagedTileBin::Never;
    }

    if time == 0.0
        && (tree_priority == TreePriority::SmoothnessTakesPriority
            || priority.resolution != TileResolution::Low)
    {
        return if is_ready_to_draw {
            ManagedTileBin::NowAndReadyToDraw
        } else {
            ManagedTileBin::Now
        };
    }

    let eventually = if is_active {
        ManagedTileBin::EventuallyAndActive
    } else {
        ManagedTileBin::Eventually
    };

    if priority.resolution == TileResolution::NonIdeal {
        return eventually;
    }

    let max_prepaint_distance = match priority.resolution {
        TileResolution::Low => settings.low_res_max_prepaint_distance_in_pixels,
        TileResolution::High | TileResolution::NonIdeal => {
            settings.max_prepaint_distance_in_pixels
        }
    };
    if distance < settings.backfling_guard_distance_in_pixels
        || (time < settings.prepaint_window_in_seconds && distance <= max_prepaint_distance)
    {
        return ManagedTileBin::Soon;
    }

    if distance > settings.at_last_distance_in_pixels {
        return if is_active {
            ManagedTileBin::AtLastAndActive
        } else {
            ManagedTileBin::AtLast
        };
    }

    eventually
}

/// Clamps a bin to what `policy` allows to hold memory.
#[must_use]
pub const fn apply_memory_policy(bin: ManagedTileBin, policy: MemoryLimitPolicy) -> ManagedTileBin {
    use ManagedTileBin as B;
    match policy {
        MemoryLimitPolicy::AllowNothing => B::Never,
        MemoryLimitPolicy::AllowAbsoluteMinimum => match bin {
            B::NowAndReadyToDraw | B::Now => bin,
            _ => B::Never,
        },
        MemoryLimitPolicy::AllowPrepaintOnly => match bin {
            B::NowAndReadyToDraw | B::Now | B::Soon => bin,
            _ => B::Never,
        },
        MemoryLimitPolicy::AllowAnything => bin,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> TileManagerSettings {
        TileManagerSettings::desktop()
    }

    fn bin(priority: TilePriority, ready: bool, active: bool) -> ManagedTileBin {
        bin_from_priority(
            &priority,
            TreePriority::SamePriorityForBothTrees,
            ready,
            active,
            &settings(),
        )
    }

    #[test]
    fn visible_tiles_are_now() {
        let p = TilePriority::new(TileResolution::High, 0.0, 0.0);
        assert_eq!(bin(p, false, false), ManagedTileBin::Now);
        assert_eq!(bin(p, true, true), ManagedTileBin::NowAndReadyToDraw);
    }

    #[test]
    fn infinite_distance_is_never() {
        assert_eq!(
            bin(TilePriority::default(), true, true),
            ManagedTileBin::Never
        );
        let p = TilePriority::new(TileResolution::High, 0.0, f32::INFINITY);
        assert_eq!(bin(p, false, false), ManagedTileBin::Never);
    }

    #[test]
    fn visible_low_res_waits_unless_smoothness_wins() {
        let p = TilePriority::new(TileResolution::Low, 0.0, 0.0);
        assert_eq!(bin(p, false, false), ManagedTileBin::Soon);
        assert_eq!(
            bin_from_priority(
                &p,
                TreePriority::SmoothnessTakesPriority,
                false,
                false,
                &settings()
            ),
            ManagedTileBin::Now
        );
    }

    #[test]
    fn backfling_guard_and_prepaint_window_are_soon() {
        let guard = TilePriority::new(TileResolution::High, 50.0, 313.0);
        assert_eq!(bin(guard, false, false), ManagedTileBin::Soon);
        let window = TilePriority::new(TileResolution::High, 0.5, 1500.0);
        assert_eq!(bin(window, false, false), ManagedTileBin::Soon);
        let too_far = TilePriority::new(TileResolution::High, 0.5, 2500.0);
        assert_eq!(bin(too_far, false, false), ManagedTileBin::Eventually);
        let low_res_reach = TilePriority::new(TileResolution::Low, 0.5, 2500.0);
        assert_eq!(bin(low_res_reach, false, false), ManagedTileBin::Soon);
    }

    #[test]
    fn non_ideal_is_eventually() {
        let p = TilePriority::new(TileResolution::NonIdeal, 1.0, 315.0);
        assert_eq!(bin(p, false, false), ManagedTileBin::Eventually);
        assert_eq!(bin(p, false, true), ManagedTileBin::EventuallyAndActive);
    }

    #[test]
    fn far_tiles_are_at_last() {
        let p = TilePriority::new(TileResolution::High, 100.0, 9000.0);
        assert_eq!(bin(p, false, false), ManagedTileBin::AtLast);
        assert_eq!(bin(p, true, true), ManagedTileBin::AtLastAndActive);
    }

    #[test]
    fn binning_is_idempotent() {
        let samples = [
            TilePriority::new(TileResolution::High, 0.0, 0.0),
            TilePriority::new(TileResolution::Low, 0.7, 600.0),
            TilePriority::new(TileResolution::NonIdeal, 3.0, 5000.0),
            TilePriority::new(TileResolution::High, 40.0, 12_000.0),
            TilePriority::default(),
        ];
        for p in samples {
            for (ready, active) in [(false, false), (false, true), (true, true)] {
                assert_eq!(bin(p, ready, active), bin(p, ready, active), "{p:?}");
            }
        }
    }

    #[test]
    fn memory_policy_table() {
        use ManagedTileBin as B;
        for b in B::ALL {
            assert_eq!(
                apply_memory_policy(b, MemoryLimitPolicy::AllowNothing),
                B::Never
            );
            assert_eq!(apply_memory_policy(b, MemoryLimitPolicy::AllowAnything), b);
            let minimum = apply_memory_policy(b, MemoryLimitPolicy::AllowAbsoluteMinimum);
            assert_eq!(minimum, if b.is_now() { b } else { B::Never }, "{b:?}");
            let prepaint = apply_memory_policy(b, MemoryLimitPolicy::AllowPrepaintOnly);
            let keeps = b.is_now() || b == B::Soon;
            assert_eq!(prepaint, if keeps { b } else { B::Never }, "{b:?}");
        }
    }

    #[test]
    fn bins_order_most_urgent_first() {
        for pair in ManagedTileBin::ALL.windows(2) {
            assert!(pair[0] < pair[1], "{pair:?}");
        }
        for (i, b) in ManagedTileBin::ALL.into_iter().enumerate() {
            assert_eq!(b.index(), i);
            assert_eq!(ManagedTileBin::from_index(i), Some(b));
        }
        assert_eq!(ManagedTileBin::from_index(NUM_BINS), None);
    }
}
