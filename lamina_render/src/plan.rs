// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Render plan: the passes and draw items for one frame.

use alloc::vec::Vec;

use kurbo::{Affine, Rect};
use lamina_core::iterator::{IterationOrder, LayerIterator, VisitRole};
use lamina_core::layer::{ClipShape, ContentId, LayerId, LayerStore, RenderSurfaceList};

/// A single draw command inside a [`RenderPass`].
///
/// Items are in back-to-front order within their pass.
#[derive(Clone, Debug, PartialEq)]
pub enum RenderItem {
    /// Draw a layer's own content.
    Layer {
        /// The drawing layer.
        layer: LayerId,
        /// The content to draw.
        content: ContentId,
        /// Layer space to world space.
        world_transform: Affine,
        /// Layer-space rect covered by the content.
        bounds: Rect,
        /// Opacity relative to the pass's surface.
        opacity: f32,
        /// The layer's own clip, in layer space.
        clip: Option<ClipShape>,
    },
    /// Composite the output of an earlier pass.
    Surface {
        /// Index of the nested surface.
        surface: usize,
        /// The layer owning the nested surface.
        owner: LayerId,
        /// World-space rect covered by the surface's content.
        content_rect: Rect,
        /// Opacity applied when compositing.
        opacity: f32,
    },
}

/// The draw items that render into one surface.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderPass {
    /// Index of the surface this pass renders.
    pub surface: usize,
    /// The layer owning the surface.
    pub owner: LayerId,
    /// World-space rect the pass must cover.
    pub content_rect: Rect,
    /// Draw items, back to front.
    pub items: Vec<RenderItem>,
}

/// Every pass needed to draw one frame.
///
/// Passes are ordered so each one comes before the pass that composites it;
/// the root surface's pass is last.
#[derive(Clone, Debug, Default)]
pub struct RenderPlan {
    passes: Vec<RenderPass>,
    open: Vec<RenderPass>,
}

impl RenderPlan {
    /// Creates an empty plan.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Plans a frame from an evaluated store and its surface list.
    #[must_use]
    pub fn build(store: &LayerStore, surfaces: &RenderSurfaceList) -> Self {
        let mut plan = Self::new();
        plan.build_into(store, surfaces);
        plan
    }

    /// Like [`build`](Self::build), but reuses this plan's pass vector.
    pub fn build_into(&mut self, store: &LayerStore, surfaces: &RenderSurfaceList) {
        self.clear();
        let list = surfaces.surfaces();
        for visit in LayerIterator::begin(surfaces, IterationOrder::BackToFront) {
            let s = visit.target_surface;
            match visit.role {
                VisitRole::TargetSurface => {
                    self.close_until(list[s].target);
                    self.open.push(RenderPass {
                        surface: s,
                        owner: list[s].owner,
                        content_rect: list[s].content_rect,
                        items: Vec::new(),
                    });
                }
                VisitRole::ContributingSurface => {
                    self.close_until(Some(s));
                    let Some(nested) = surfaces.surface_of(visit.layer) else {
                        continue;
                    };
                    self.push_item(RenderItem::Surface {
                        surface: nested,
                        owner: visit.layer,
                        content_rect: list[nested].content_rect,
                        opacity: list[nested].draw_opacity,
                    });
                }
                VisitRole::Itself => {
                    self.close_until(Some(s));
                    let Some(content) = store.content(visit.layer) else {
                        continue;
                    };
                    self.push_item(RenderItem::Layer {
                        layer: visit.layer,
                        content,
                        world_transform: store.world_transform(visit.layer),
                        bounds: store.bounds(visit.layer).to_rect(),
                        opacity: surfaces.layer_draw_opacity(visit.layer),
                        clip: store.clip(visit.layer),
                    });
                }
            }
        }
        self.close_until(None);
    }

    /// Clears the plan for reuse.
    pub fn clear(&mut self) {
        self.passes.clear();
        self.open.clear();
    }

    /// Returns the passes in execution order.
    #[must_use]
    pub fn passes(&self) -> &[RenderPass] {
        &self.passes
    }

    /// Returns whether the plan draws nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }

    /// Returns the total number of draw items across all passes.
    #[must_use]
    pub fn item_count(&self) -> usize {
        self.passes.iter().map(|p| p.items.len()).sum()
    }

    /// Finishes open passes until `surface` is the innermost one.
    fn close_until(&mut self, surface: Option<usize>) {
        while let Some(top) = self.open.last() {
            if Some(top.surface) == surface {
                break;
            }
            if let Some(done) = self.open.pop() {
                self.passes.push(done);
            }
        }
    }

    fn push_item(&mut self, item: RenderItem) {
        if let Some(pass) = self.open.last_mut() {
            pass.items.push(item);
        }
    }
}
