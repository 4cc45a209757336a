// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tiles: rectangular raster units of layer content.

use core::fmt;

use kurbo::Rect;
#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _;

use super::bin::ManagedTileBin;
use super::priority::{TilePriority, WhichTree};
use crate::layer::LayerId;

/// A handle to a tile in a [`TileManager`](super::TileManager).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TileId {
    pub(crate) idx: u32,
    pub(crate) generation: u32,
}

impl TileId {
    /// Returns the raw slot index (for diagnostics only).
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.idx
    }

    /// Returns the generation counter.
    #[inline]
    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for TileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TileId({}@gen{})", self.idx, self.generation)
    }
}

/// Raster progress of a tile.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum RasterState {
    /// No content and no raster work in flight.
    #[default]
    Unrasterized,
    /// Queued for, or being handled by, a raster worker.
    Scheduled,
    /// Rasterized and ready to draw.
    Ready,
}

/// Which of a tile's two priority bins to read.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BinPriority {
    /// The bin from the priority of the tree that wins under the current
    /// [`TreePriority`](super::TreePriority).
    High,
    /// The bin from the other tree's priority.
    Low,
}

impl BinPriority {
    #[inline]
    pub(crate) const fn index(self) -> usize {
        match self {
            Self::High => 0,
            Self::Low => 1,
        }
    }
}

/// Parameters for [`TileManager::create_tile`](super::TileManager::create_tile).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TileSpec {
    /// The layer whose content the tile rasterizes.
    pub layer: LayerId,
    /// Pixel rect of the tile in content space (layer space scaled by
    /// `contents_scale`).
    pub content_rect: Rect,
    /// Scale from layer space to content space.
    pub contents_scale: f32,
}

/// A tile and the state the tile manager recomputes for it on every pass.
#[derive(Clone, Debug)]
pub struct Tile {
    pub(crate) layer: LayerId,
    pub(crate) content_rect: Rect,
    pub(crate) contents_scale: f32,
    pub(crate) priority: [TilePriority; 2],
    pub(crate) bin: [ManagedTileBin; 2],
    pub(crate) tree_bin: [ManagedTileBin; 2],
    /// Priority of the tree that won the last pass, with the pending
    /// tree's activation requirement.
    pub(crate) winning: TilePriority,
    pub(crate) raster_state: RasterState,
    pub(crate) approved: bool,
}

impl Tile {
    pub(crate) fn new(spec: &TileSpec) -> Self {
        Self {
            layer: spec.layer,
            content_rect: spec.content_rect,
            contents_scale: spec.contents_scale,
            priority: [TilePriority::default(); 2],
            bin: [ManagedTileBin::Never; 2],
            tree_bin: [ManagedTileBin::Never; 2],
            winning: TilePriority::default(),
            raster_state: RasterState::Unrasterized,
            approved: false,
        }
    }

    /// Returns the layer this tile belongs to.
    #[must_use]
    pub fn layer(&self) -> LayerId {
        self.layer
    }

    /// Returns the tile's pixel rect in content space.
    #[must_use]
    pub fn content_rect(&self) -> Rect {
        self.content_rect
    }

    /// Returns the scale from layer space to content space.
    #[must_use]
    pub fn contents_scale(&self) -> f32 {
        self.contents_scale
    }

    /// Returns the tile's rect in layer space.
    #[must_use]
    pub fn layer_rect(&self) -> Rect {
        self.content_rect
            .scale_from_origin(1.0 / f64::from(self.contents_scale))
    }

    /// Returns the tile's pixel dimensions, rounding partial pixels up.
    #[must_use]
    pub fn pixel_size(&self) -> (u32, u32) {
        #[expect(
            clippy::cast_possible_truncation,
            reason = "tile dimensions are far below u32::MAX"
        )]
        let size = (
            self.content_rect.width().ceil().max(0.0) as u32,
            self.content_rect.height().ceil().max(0.0) as u32,
        );
        size
    }

    /// Returns the memory an RGBA raster of this tile occupies.
    #[must_use]
    pub fn bytes(&self) -> u64 {
        let (w, h) = self.pixel_size();
        4 * u64::from(w) * u64::from(h)
    }

    /// Returns the priority `tree` last reported for this tile.
    #[must_use]
    pub fn priority(&self, tree: WhichTree) -> TilePriority {
        self.priority[tree.index()]
    }

    /// Returns the bin assigned by the last pass.
    #[must_use]
    pub fn bin(&self, which: BinPriority) -> ManagedTileBin {
        self.bin[which.index()]
    }

    /// Returns the bin the last pass derived from `tree`'s priority alone.
    #[must_use]
    pub fn tree_bin(&self, tree: WhichTree) -> ManagedTileBin {
        self.tree_bin[tree.index()]
    }

    /// Returns the priority the last pass sorted this tile by: the winning
    /// tree's priority, required for activation if the pending tree needs it.
    #[must_use]
    pub fn winning_priority(&self) -> TilePriority {
        self.winning
    }

    /// Returns whether the pending tree needs this tile to activate.
    #[must_use]
    pub fn required_for_activation(&self) -> bool {
        self.winning.required_for_activation
    }

    /// Returns the tile's raster progress.
    #[must_use]
    pub fn raster_state(&self) -> RasterState {
        self.raster_state
    }

    /// Returns whether the last pass granted the tile memory.
    #[must_use]
    pub fn is_approved(&self) -> bool {
        self.approved
    }

    /// Drops the tile's raster, or abandons raster work in flight.
    pub(crate) fn evict(&mut self) {
        self.raster_state = RasterState::Unrasterized;
        self.approved = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::LayerStore;

    fn tile(content_rect: Rect, contents_scale: f32) -> Tile {
        let mut store = LayerStore::new();
        let layer = store.create_layer();
        Tile::new(&TileSpec {
            layer,
            content_rect,
            contents_scale,
        })
    }

    #[test]
    fn bytes_are_four_per_pixel() {
        let t = tile(Rect::new(0.0, 0.0, 256.0, 128.0), 1.0);
        assert_eq!(t.pixel_size(), (256, 128));
        assert_eq!(t.bytes(), 4 * 256 * 128);
    }

    #[test]
    fn partial_pixels_round_up() {
        let t = tile(Rect::new(0.0, 0.0, 10.5, 3.2), 1.0);
        assert_eq!(t.pixel_size(), (11, 4));
    }

    #[test]
    fn layer_rect_undoes_contents_scale() {
        let t = tile(Rect::new(256.0, 0.0, 512.0, 256.0), 2.0);
        assert_eq!(t.layer_rect(), Rect::new(128.0, 0.0, 256.0, 128.0));
    }

    #[test]
    fn new_tile_is_never_and_unrasterized() {
        let t = tile(Rect::new(0.0, 0.0, 1.0, 1.0), 1.0);
        assert_eq!(t.bin(BinPriority::High), ManagedTileBin::Never);
        assert_eq!(t.tree_bin(WhichTree::Pending), ManagedTileBin::Never);
        assert_eq!(t.raster_state(), RasterState::Unrasterized);
        assert_eq!(t.winning_priority(), TilePriority::default());
        assert!(!t.is_approved());
    }
}
