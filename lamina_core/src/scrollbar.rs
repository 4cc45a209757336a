// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Content-space geometry for scrollbar layers.
//!
//! A scrollbar layer rasterizes its track and thumb into textures sized by its
//! content bounds. Those bounds must fit the device's maximum texture size, so
//! the contents scale is clamped before anything is tiled or rasterized, and
//! every part rect is clamped to the resulting content bounds.
//!
//! ```
//! use kurbo::{Rect, Size};
//! use lamina_core::scrollbar::{ScrollbarGeometry, ScrollbarOrientation};
//!
//! let bar = ScrollbarGeometry::new(
//!     ScrollbarOrientation::Vertical,
//!     Size::new(15.0, 600.0),
//!     2.0,
//!     8192,
//! );
//! assert_eq!(bar.contents_scale(), 2.0);
//! assert_eq!(bar.content_bounds(), Size::new(30.0, 1200.0));
//! assert_eq!(bar.origin_thumb_rect(100.0, 15.0), Rect::new(0.0, 0.0, 30.0, 200.0));
//! ```

use kurbo::{Point, Rect, Size};
#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _;

/// The axis a scrollbar scrolls along.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ScrollbarOrientation {
    /// Scrolls along x; the thumb's length is its width.
    Horizontal,
    /// Scrolls along y; the thumb's length is its height.
    Vertical,
}

/// Returns the content bounds of `bounds` at `scale`, rounding partial
/// pixels up.
#[must_use]
pub fn content_bounds_for_scale(bounds: Size, scale: f32) -> Size {
    let scale = f64::from(scale);
    Size::new(
        (bounds.width * scale).ceil().max(0.0),
        (bounds.height * scale).ceil().max(0.0),
    )
}

/// Returns `scale`, reduced if needed so that the content bounds of `bounds`
/// fit within `max_texture_size` on both axes.
///
/// The longer scaled axis is rescaled to one pixel under the maximum.
#[must_use]
pub fn clamp_scale_to_max_texture_size(scale: f32, bounds: Size, max_texture_size: u32) -> f32 {
    let scaled = content_bounds_for_scale(bounds, scale);
    let max = f64::from(max_texture_size);
    if scaled.width <= max && scaled.height <= max {
        return scale;
    }
    let longer = if scaled.width > scaled.height {
        bounds.width
    } else {
        bounds.height
    };
    #[expect(
        clippy::cast_possible_truncation,
        reason = "texture-limited scales are small positive numbers"
    )]
    let clamped = (f64::from(max_texture_size.saturating_sub(1)) / longer) as f32;
    clamped
}

/// A scrollbar layer's scale, content bounds, and part rects.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScrollbarGeometry {
    orientation: ScrollbarOrientation,
    bounds: Size,
    contents_scale: f32,
    content_bounds: Size,
}

impl ScrollbarGeometry {
    /// Computes the geometry of a scrollbar layer with `bounds` (layer space)
    /// drawn at `ideal_contents_scale`, clamped to `max_texture_size`.
    ///
    /// # Panics
    ///
    /// Panics if `ideal_contents_scale` is not positive or `max_texture_size`
    /// is zero.
    #[must_use]
    pub fn new(
        orientation: ScrollbarOrientation,
        bounds: Size,
        ideal_contents_scale: f32,
        max_texture_size: u32,
    ) -> Self {
        assert!(
            ideal_contents_scale > 0.0,
            "contents scale must be positive: {ideal_contents_scale}"
        );
        assert!(max_texture_size > 0, "max texture size must be non-zero");
        let contents_scale =
            clamp_scale_to_max_texture_size(ideal_contents_scale, bounds, max_texture_size);
        Self {
            orientation,
            bounds,
            contents_scale,
            content_bounds: content_bounds_for_scale(bounds, contents_scale),
        }
    }

    /// Returns the scroll axis.
    #[must_use]
    pub fn orientation(&self) -> ScrollbarOrientation {
        self.orientation
    }

    /// Returns the layer-space bounds.
    #[must_use]
    pub fn bounds(&self) -> Size {
        self.bounds
    }

    /// Returns the scale actually used, after clamping.
    #[must_use]
    pub fn contents_scale(&self) -> f32 {
        self.contents_scale
    }

    /// Returns the content-space size of the layer.
    #[must_use]
    pub fn content_bounds(&self) -> Size {
        self.content_bounds
    }

    /// Scales a layer-space rect to the enclosing content-space rect.
    ///
    /// The rect may be in the coordinates of the containing layer, so it is
    /// not intersected with the bounds; only its size is clamped to the
    /// content bounds.
    #[must_use]
    pub fn layer_rect_to_content_rect(&self, layer_rect: Rect) -> Rect {
        let expanded = layer_rect
            .scale_from_origin(f64::from(self.contents_scale))
            .expand();
        let size = Size::new(
            expanded.width().min(self.content_bounds.width),
            expanded.height().min(self.content_bounds.height),
        );
        Rect::from_origin_size(expanded.origin(), size)
    }

    /// Returns the content rect of the track for a layer placed at
    /// `location` in its parent.
    #[must_use]
    pub fn track_content_rect(&self, location: Point) -> Rect {
        self.layer_rect_to_content_rect(Rect::from_origin_size(location, self.bounds))
    }

    /// Returns the content rect of a thumb at the origin, laid out along the
    /// scroll axis.
    #[must_use]
    pub fn origin_thumb_rect(&self, thumb_length: f64, thumb_thickness: f64) -> Rect {
        let size = match self.orientation {
            ScrollbarOrientation::Horizontal => Size::new(thumb_length, thumb_thickness),
            ScrollbarOrientation::Vertical => Size::new(thumb_thickness, thumb_length),
        };
        self.layer_rect_to_content_rect(Rect::from_origin_size(Point::ORIGIN, size))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scale_within_limit_is_kept() {
        let bounds = Size::new(15.0, 800.0);
        assert_eq!(clamp_scale_to_max_texture_size(2.0, bounds, 4096), 2.0);
        // Exactly at the limit still fits.
        assert_eq!(clamp_scale_to_max_texture_size(4.0, Size::new(15.0, 1024.0), 4096), 4.0);
    }

    #[test]
    fn tall_scrollbar_clamps_on_height() {
        let bounds = Size::new(15.0, 3000.0);
        let scale = clamp_scale_to_max_texture_size(2.0, bounds, 4096);
        assert!((scale - 4095.0 / 3000.0).abs() < 1e-6, "got {scale}");

        let bar = ScrollbarGeometry::new(ScrollbarOrientation::Vertical, bounds, 2.0, 4096);
        assert_eq!(bar.contents_scale(), scale);
        assert!(bar.content_bounds().height <= 4096.0, "{:?}", bar.content_bounds());
        assert!(bar.content_bounds().width <= 4096.0);
    }

    #[test]
    fn wide_scrollbar_clamps_on_width() {
        let bounds = Size::new(5000.0, 20.0);
        let scale = clamp_scale_to_max_texture_size(1.0, bounds, 4096);
        assert!((scale - 4095.0 / 5000.0).abs() < 1e-6, "got {scale}");

        let bar = ScrollbarGeometry::new(ScrollbarOrientation::Horizontal, bounds, 1.0, 4096);
        assert!(bar.content_bounds().width <= 4096.0, "{:?}", bar.content_bounds());
    }

    #[test]
    fn thumb_rect_follows_orientation_and_encloses() {
        let bar = ScrollbarGeometry::new(
            ScrollbarOrientation::Vertical,
            Size::new(15.0, 100.0),
            1.5,
            8192,
        );
        assert_eq!(bar.content_bounds(), Size::new(23.0, 150.0));
        // 15 x 40 scaled by 1.5 is 22.5 x 60, enclosed to 23 x 60.
        assert_eq!(bar.origin_thumb_rect(40.0, 15.0), Rect::new(0.0, 0.0, 23.0, 60.0));

        let bar = ScrollbarGeometry::new(
            ScrollbarOrientation::Horizontal,
            Size::new(100.0, 15.0),
            1.0,
            8192,
        );
        assert_eq!(bar.origin_thumb_rect(40.0, 15.0), Rect::new(0.0, 0.0, 40.0, 15.0));
    }

    #[test]
    fn thumb_rect_is_clamped_to_content_bounds() {
        let bar = ScrollbarGeometry::new(
            ScrollbarOrientation::Horizontal,
            Size::new(100.0, 10.0),
            1.0,
            8192,
        );
        assert_eq!(
            bar.origin_thumb_rect(150.0, 12.0),
            Rect::new(0.0, 0.0, 100.0, 10.0)
        );
    }

    #[test]
    fn track_rect_keeps_its_offset() {
        let bar = ScrollbarGeometry::new(
            ScrollbarOrientation::Vertical,
            Size::new(15.0, 300.0),
            2.0,
            8192,
        );
        assert_eq!(
            bar.track_content_rect(Point::new(5.0, 10.0)),
            Rect::new(10.0, 20.0, 40.0, 620.0)
        );
    }

    #[test]
    #[should_panic(expected = "max texture size must be non-zero")]
    fn zero_max_texture_size_panics() {
        let _ = ScrollbarGeometry::new(
            ScrollbarOrientation::Vertical,
            Size::new(15.0, 100.0),
            1.0,
            0,
        );
    }
}
