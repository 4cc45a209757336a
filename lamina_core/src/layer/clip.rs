// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Clip shapes applied to a layer and its descendants.

use kurbo::{Point, Rect, RoundedRect, Shape};

/// A shape, in the layer's local space, that clips the layer's content and
/// every descendant.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ClipShape {
    /// An axis-aligned rectangle.
    Rect(Rect),
    /// A rectangle with rounded corners.
    RoundedRect(RoundedRect),
}

impl ClipShape {
    /// Returns whether `point` (in the clipping layer's local space) survives
    /// the clip.
    #[must_use]
    pub fn contains(&self, point: Point) -> bool {
        match self {
            Self::Rect(rect) => rect.contains(point),
            Self::RoundedRect(rounded) => rounded.contains(point),
        }
    }

    /// Returns the axis-aligned bounds of the clip.
    #[must_use]
    pub fn bounds(&self) -> Rect {
        match self {
            Self::Rect(rect) => *rect,
            Self::RoundedRect(rounded) => rounded.rect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounded_clip_excludes_corner() {
        let clip = ClipShape::RoundedRect(RoundedRect::new(0.0, 0.0, 100.0, 100.0, 20.0));
        assert!(clip.contains(Point::new(50.0, 50.0)));
        assert!(
            !clip.contains(Point::new(1.0, 1.0)),
            "corner lies outside the rounded radius"
        );
        assert_eq!(clip.bounds(), Rect::new(0.0, 0.0, 100.0, 100.0));
    }
}
