// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tiles and the memory-budgeted scheduler that decides which to rasterize.
//!
//! Every picture layer's content is split into fixed-size tiles by a
//! [`PictureLayerTiling`]. Each tile carries one [`TilePriority`] per
//! [`WhichTree`]: how soon and how close to the viewport that tree needs it.
//!
//! [`TileManager::manage_tiles`] runs one scheduling pass:
//!
//! 1. Each tree's priority is classified into a [`ManagedTileBin`] by
//!    [`bin_from_priority`] and clamped by the host's [`MemoryLimitPolicy`]
//!    via [`apply_memory_policy`].
//! 2. The [`TreePriority`] picks which tree's bins order the tile; tiles are
//!    sorted by bin, then by priority within a bin.
//! 3. Memory is granted in that order until the budget in [`GlobalState`] is
//!    spent. Tiles whose bins are both `Never` lose their memory outright.
//! 4. Tiles the pending tree needs to activate, but which did not fit, are
//!    recovered by evicting lower-priority tiles only the pending tree wanted.
//! 5. Approved tiles without raster output form the raster queue, most
//!    urgent first.
//!
//! [`MemoryStats`] and [`ManageTilesReport`] describe the outcome.

mod bin;
mod managed;
mod manager;
mod priority;
mod tiling;

pub use bin::{ManagedTileBin, NUM_BINS, apply_memory_policy, bin_from_priority};
pub use managed::{BinPriority, RasterState, Tile, TileId, TileSpec};
pub use manager::{ManageTilesReport, MemoryStats, TileManager, TileManagerSettings};
pub use priority::{
    GlobalState, MAX_TIME_TO_VISIBLE_IN_SECONDS, MemoryLimitPolicy, TilePriority, TileResolution,
    TreePriority, WhichTree, manhattan_distance, time_for_bounds_to_intersect,
};
pub use tiling::PictureLayerTiling;
