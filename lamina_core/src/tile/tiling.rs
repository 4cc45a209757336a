// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Splitting a layer's content into a grid of tiles at one scale.

use alloc::vec::Vec;

use kurbo::{Affine, Rect, Size};
#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _;

use super::manager::TileManager;
use super::managed::{TileId, TileSpec};
use super::priority::{
    TilePriority, TileResolution, WhichTree, manhattan_distance, time_for_bounds_to_intersect,
};
use crate::layer::LayerId;

/// A layer's content at one contents scale, decomposed into tiles registered
/// with a [`TileManager`].
///
/// Tiles are laid out row-major from the top-left; the last row and column
/// are clipped to the content bounds.
#[derive(Clone, Debug)]
pub struct PictureLayerTiling {
    layer: LayerId,
    contents_scale: f32,
    resolution: TileResolution,
    tile_size: u32,
    content_bounds: Size,
    columns: u32,
    rows: u32,
    tiles: Vec<TileId>,
}

impl PictureLayerTiling {
    /// Tiles `layer_bounds` (in layer space) at `contents_scale` and registers
    /// every tile with `manager`.
    ///
    /// # Panics
    ///
    /// Panics if `tile_size` is zero or `contents_scale` is not positive.
    pub fn create(
        manager: &mut TileManager,
        layer: LayerId,
        layer_bounds: Size,
        contents_scale: f32,
        tile_size: u32,
        resolution: TileResolution,
    ) -> Self {
        assert!(tile_size > 0, "tile size must be non-zero");
        assert!(
            contents_scale > 0.0,
            "contents scale must be positive: {contents_scale}"
        );
        let scale = f64::from(contents_scale);
        let content_bounds = Size::new(
            (layer_bounds.width * scale).ceil().max(0.0),
            (layer_bounds.height * scale).ceil().max(0.0),
        );
        let step = f64::from(tile_size);
        #[expect(
            clippy::cast_possible_truncation,
            reason = "grid dimensions are small positive integers"
        )]
        let (columns, rows) = (
            (content_bounds.width / step).ceil() as u32,
            (content_bounds.height / step).ceil() as u32,
        );

        let mut tiles = Vec::with_capacity((columns * rows) as usize);
        for row in 0..rows {
            for column in 0..columns {
                let x0 = f64::from(column) * step;
                let y0 = f64::from(row) * step;
                let content_rect = Rect::new(
                    x0,
                    y0,
                    (x0 + step).min(content_bounds.width),
                    (y0 + step).min(content_bounds.height),
                );
                tiles.push(manager.create_tile(TileSpec {
                    layer,
                    content_rect,
                    contents_scale,
                }));
            }
        }

        Self {
            layer,
            contents_scale,
            resolution,
            tile_size,
            content_bounds,
            columns,
            rows,
            tiles,
        }
    }

    /// Returns the tiled layer.
    #[must_use]
    pub fn layer(&self) -> LayerId {
        self.layer
    }

    /// Returns the scale from layer space to content space.
    #[must_use]
    pub fn contents_scale(&self) -> f32 {
        self.contents_scale
    }

    /// Returns the resolution class of this tiling.
    #[must_use]
    pub fn resolution(&self) -> TileResolution {
        self.resolution
    }

    /// Returns the edge length of a full tile, in content pixels.
    #[must_use]
    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    /// Returns the content-space size being tiled.
    #[must_use]
    pub fn content_bounds(&self) -> Size {
        self.content_bounds
    }

    /// Returns the grid dimensions as `(columns, rows)`.
    #[must_use]
    pub fn grid(&self) -> (u32, u32) {
        (self.columns, self.rows)
    }

    /// Returns every tile, row-major.
    #[must_use]
    pub fn tiles(&self) -> &[TileId] {
        &self.tiles
    }

    /// Returns the tile at a grid position.
    #[must_use]
    pub fn tile_at(&self, column: u32, row: u32) -> Option<TileId> {
        (column < self.columns && row < self.rows)
            .then(|| self.tiles[(row * self.columns + column) as usize])
    }

    /// Recomputes `tree`'s priority for every tile.
    ///
    /// `current_transform` and `last_transform` map layer space to screen
    /// space now and `time_delta` seconds ago; their difference gives the
    /// scroll velocity used to predict time to visible. Tiles beyond the
    /// manager's interest distance get the default, never-needed priority.
    pub fn update_tile_priorities(
        &self,
        manager: &mut TileManager,
        tree: WhichTree,
        current_transform: Affine,
        last_transform: Affine,
        time_delta: f32,
        viewport: Rect,
    ) {
        let interest = manager.settings().interest_distance_in_pixels;
        for &id in &self.tiles {
            let layer_rect = manager.tile(id).layer_rect();
            let current = current_transform.transform_rect_bbox(layer_rect);
            let previous = last_transform.transform_rect_bbox(layer_rect);

            let distance = manhattan_distance(current, viewport);
            let priority = if distance > interest {
                TilePriority::default()
            } else {
                let time = time_for_bounds_to_intersect(previous, current, time_delta, viewport);
                TilePriority {
                    resolution: self.resolution,
                    time_to_visible_in_seconds: time,
                    distance_to_visible_in_pixels: distance,
                    required_for_activation: tree == WhichTree::Pending
                        && self.resolution == TileResolution::High
                        && time == 0.0,
                }
            };
            manager.set_priority(id, tree, priority);
        }
    }

    /// Unregisters every tile from `manager`.
    pub fn destroy(self, manager: &mut TileManager) {
        for id in self.tiles {
            manager.destroy_tile(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::LayerStore;
    use crate::scrollbar::{ScrollbarGeometry, ScrollbarOrientation};
    use crate::tile::{MAX_TIME_TO_VISIBLE_IN_SECONDS, TileManagerSettings};

    fn tiling(manager: &mut TileManager, bounds: Size, scale: f32) -> PictureLayerTiling {
        let layer = LayerStore::new().create_layer();
        PictureLayerTiling::create(manager, layer, bounds, scale, 256, TileResolution::High)
    }

    #[test]
    fn grid_covers_bounds_with_clipped_edges() {
        let mut manager = TileManager::default();
        let t = tiling(&mut manager, Size::new(600.0, 300.0), 1.0);
        assert_eq!(t.grid(), (3, 2));
        assert_eq!(t.tiles().len(), 6);
        assert_eq!(manager.tile_count(), 6);

        let corner = t.tile_at(2, 1).expect("bottom-right tile exists");
        assert_eq!(
            manager.tile(corner).content_rect(),
            Rect::new(512.0, 256.0, 600.0, 300.0)
        );
        assert_eq!(t.tile_at(3, 0), None);
    }

    #[test]
    fn contents_scale_grows_the_grid() {
        let mut manager = TileManager::default();
        let t = tiling(&mut manager, Size::new(300.0, 100.0), 2.0);
        assert_eq!(t.content_bounds(), Size::new(600.0, 200.0));
        assert_eq!(t.grid(), (3, 1));
        let last = t.tile_at(2, 0).expect("third column exists");
        assert_eq!(
            manager.tile(last).layer_rect(),
            Rect::new(256.0, 0.0, 300.0, 100.0)
        );
    }

    #[test]
    fn empty_layer_has_no_tiles() {
        let mut manager = TileManager::default();
        let t = tiling(&mut manager, Size::ZERO, 1.0);
        assert_eq!(t.grid(), (0, 0));
        assert!(t.tiles().is_empty());
    }

    #[test]
    fn priorities_follow_the_viewport() {
        let mut manager = TileManager::default();
        let t = tiling(&mut manager, Size::new(256.0, 256.0 * 4.0), 1.0);
        let viewport = Rect::new(0.0, 0.0, 256.0, 256.0);
        t.update_tile_priorities(
            &mut manager,
            WhichTree::Pending,
            Affine::IDENTITY,
            Affine::IDENTITY,
            0.016,
            viewport,
        );

        let visible = manager.priority(t.tiles()[0], WhichTree::Pending);
        assert_eq!(visible.time_to_visible_in_seconds, 0.0);
        assert_eq!(visible.distance_to_visible_in_pixels, 0.0);
        assert!(visible.required_for_activation);

        let below = manager.priority(t.tiles()[2], WhichTree::Pending);
        assert_eq!(below.distance_to_visible_in_pixels, 257.0);
        assert_eq!(below.time_to_visible_in_seconds, MAX_TIME_TO_VISIBLE_IN_SECONDS);
        assert!(!below.required_for_activation);

        assert_eq!(
            manager.priority(t.tiles()[0], WhichTree::Active),
            TilePriority::default(),
            "the other tree is untouched"
        );
    }

    #[test]
    fn scrolling_predicts_time_to_visible() {
        let mut manager = TileManager::default();
        let t = tiling(&mut manager, Size::new(256.0, 256.0 * 4.0), 1.0);
        let viewport = Rect::new(0.0, 0.0, 256.0, 256.0);
        // Content moved up 100 px in 0.1 s: 1000 px/s.
        t.update_tile_priorities(
            &mut manager,
            WhichTree::Active,
            Affine::translate((0.0, -100.0)),
            Affine::IDENTITY,
            0.1,
            viewport,
        );
        // Tile 2 now spans y 412..668; its top must reach y 256.
        let p = manager.priority(t.tiles()[2], WhichTree::Active);
        assert!((p.time_to_visible_in_seconds - 0.156).abs() < 1e-3, "{p:?}");
        assert!(!p.required_for_activation, "active tree never requires activation");
    }

    #[test]
    fn tiles_past_the_interest_distance_are_never_needed() {
        let mut manager = TileManager::new(crate::tile::TileManagerSettings::low_end_device());
        let t = tiling(&mut manager, Size::new(256.0, 256.0), 1.0);
        t.update_tile_priorities(
            &mut manager,
            WhichTree::Active,
            Affine::translate((0.0, 20_000.0)),
            Affine::translate((0.0, 20_000.0)),
            0.016,
            Rect::new(0.0, 0.0, 256.0, 256.0),
        );
        assert_eq!(
            manager.priority(t.tiles()[0], WhichTree::Active),
            TilePriority::default()
        );
    }

    #[test]
    fn scrollbar_tiling_fits_the_max_texture_size() {
        let mut manager = TileManager::new(TileManagerSettings::low_end_device());
        let max = manager.settings().max_texture_size;
        let bar = ScrollbarGeometry::new(
            ScrollbarOrientation::Vertical,
            Size::new(15.0, 3000.0),
            2.0,
            max,
        );
        assert!(bar.contents_scale() < 2.0, "clamped: {}", bar.contents_scale());

        let t = tiling(&mut manager, bar.bounds(), bar.contents_scale());
        assert_eq!(t.content_bounds(), bar.content_bounds());
        assert!(t.content_bounds().height <= f64::from(max));
        assert_eq!(t.grid(), (1, 16));
    }

    #[test]
    fn destroy_unregisters_tiles() {
        let mut manager = TileManager::default();
        let t = tiling(&mut manager, Size::new(512.0, 512.0), 1.0);
        let first = t.tiles()[0];
        t.destroy(&mut manager);
        assert_eq!(manager.tile_count(), 0);
        assert!(!manager.is_alive(first));
    }

    #[test]
    #[should_panic(expected = "tile size must be non-zero")]
    fn zero_tile_size_panics() {
        let mut manager = TileManager::default();
        let layer = LayerStore::new().create_layer();
        let _ = PictureLayerTiling::create(
            &mut manager,
            layer,
            Size::new(10.0, 10.0),
            1.0,
            0,
            TileResolution::High,
        );
    }
}
