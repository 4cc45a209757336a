// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Partitioning an evaluated layer tree into render surfaces.

use alloc::vec;
use alloc::vec::Vec;

use kurbo::Rect;

use super::id::{INVALID, LayerId};
use super::store::LayerStore;
use crate::iterator::RenderSurfaceTree;

/// An off-screen target that a subtree draws into before being composited
/// into its target surface.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderSurface {
    /// The layer that owns this surface.
    pub owner: LayerId,
    /// Index of the surface this one contributes to, `None` for the root.
    pub target: Option<usize>,
    /// Ordered layer list, back to front.
    ///
    /// Holds the owner if it draws content, every drawable descendant that
    /// targets this surface, and the owners of nested surfaces.
    pub layers: Vec<LayerId>,
    /// Opacity applied when compositing this surface into its target.
    pub draw_opacity: f32,
    /// World-space bounds of everything drawn into the surface.
    pub content_rect: Rect,
}

/// The render surfaces of one layer tree, root surface first.
///
/// Rebuild it whenever [`FrameChanges::surfaces_changed`] is set. It holds no
/// traversal state, so any number of
/// [`LayerIterator`](crate::iterator::LayerIterator)s can walk it at once.
///
/// [`FrameChanges::surfaces_changed`]: super::FrameChanges::surfaces_changed
#[derive(Clone, Debug, Default)]
pub struct RenderSurfaceList {
    surfaces: Vec<RenderSurface>,
    /// Per slot: the surface owned by the layer, or [`INVALID`].
    owned: Vec<u32>,
    /// Per slot: the surface the layer's descendants draw into, or [`INVALID`].
    subtree_target: Vec<u32>,
    /// Per slot: opacity relative to the target surface.
    draw_opacity: Vec<f32>,
}

impl RenderSurfaceList {
    /// Builds the surface list for the subtree rooted at `root`.
    ///
    /// The store must have been [evaluated](LayerStore::evaluate).
    ///
    /// # Panics
    ///
    /// Panics if `root` is stale.
    #[must_use]
    pub fn build(store: &LayerStore, root: LayerId) -> Self {
        let mut list = Self::default();
        list.build_into(store, root);
        list
    }

    /// Like [`build`](Self::build), but reuses this list's allocations.
    ///
    /// # Panics
    ///
    /// Panics if `root` is stale.
    pub fn build_into(&mut self, store: &LayerStore, root: LayerId) {
        store.validate(root);
        self.surfaces.clear();
        let slots = store.len as usize;
        self.owned.clear();
        self.owned.resize(slots, INVALID);
        self.subtree_target.clear();
        self.subtree_target.resize(slots, INVALID);
        self.draw_opacity.clear();
        self.draw_opacity.resize(slots, 1.0);

        if store.effective_hidden[root.idx as usize] {
            return;
        }

        let mut idx = root.idx;
        while idx != INVALID {
            let i = idx as usize;
            if idx != root.idx && store.flags[i].hidden {
                idx = store.next_in_subtree(root.idx, idx, false);
                continue;
            }
            let id = LayerId {
                idx,
                generation: store.generation[i],
            };
            let parent = store.parent[i];
            let (parent_target, parent_opacity) = if idx == root.idx {
                (INVALID, 1.0)
            } else {
                (
                    self.subtree_target[parent as usize],
                    self.draw_opacity[parent as usize],
                )
            };

            if idx == root.idx || owns_surface(store, idx) {
                let s = self.surfaces.len();
                #[expect(
                    clippy::cast_possible_truncation,
                    reason = "surface count is bounded by the u32 layer slot count"
                )]
                let s32 = s as u32;
                let target = (parent_target != INVALID).then_some(parent_target as usize);
                if let Some(t) = target {
                    self.surfaces[t].layers.push(id);
                }
                self.surfaces.push(RenderSurface {
                    owner: id,
                    target,
                    layers: Vec::new(),
                    draw_opacity: parent_opacity * store.local_opacity[i],
                    content_rect: Rect::ZERO,
                });
                if store.content[i].is_some() {
                    self.surfaces[s].layers.push(id);
                }
                self.owned[i] = s32;
                self.subtree_target[i] = s32;
                self.draw_opacity[i] = 1.0;
            } else {
                if store.content[i].is_some() {
                    self.surfaces[parent_target as usize].layers.push(id);
                }
                self.subtree_target[i] = parent_target;
                self.draw_opacity[i] = parent_opacity * store.local_opacity[i];
            }
            idx = store.next_in_subtree(root.idx, idx, true);
        }

        self.prune_empty_surfaces();
        self.compute_content_rects(store);
    }

    /// Returns the number of surfaces.
    #[must_use]
    pub fn len(&self) -> usize {
        self.surfaces.len()
    }

    /// Returns whether the list holds no surfaces (the root was hidden).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.surfaces.is_empty()
    }

    /// Returns the surfaces, root first.
    #[must_use]
    pub fn surfaces(&self) -> &[RenderSurface] {
        &self.surfaces
    }

    /// Returns the surface owned by `layer`, if any.
    #[must_use]
    pub fn surface_of(&self, layer: LayerId) -> Option<usize> {
        let s = *self.owned.get(layer.idx as usize)?;
        (s != INVALID && self.surfaces[s as usize].owner == layer).then_some(s as usize)
    }

    /// Returns the opacity `layer` draws with inside its target surface.
    ///
    /// Translucent ancestors that own no surface are folded in here; those
    /// that own one apply through [`RenderSurface::draw_opacity`] instead.
    #[must_use]
    pub fn layer_draw_opacity(&self, layer: LayerId) -> f32 {
        self.draw_opacity
            .get(layer.idx as usize)
            .copied()
            .unwrap_or(1.0)
    }

    /// Drops non-root surfaces that ended up with nothing to draw.
    ///
    /// Surfaces are created parent first, so walking backwards lets an emptied
    /// parent cascade in the same pass.
    fn prune_empty_surfaces(&mut self) {
        let mut removed = vec![false; self.surfaces.len()];
        for s in (1..self.surfaces.len()).rev() {
            if !self.surfaces[s].layers.is_empty() {
                continue;
            }
            removed[s] = true;
            let owner = self.surfaces[s].owner;
            if let Some(t) = self.surfaces[s].target {
                self.surfaces[t].layers.retain(|&l| l != owner);
            }
            self.owned[owner.idx as usize] = INVALID;
        }
        if !removed.contains(&true) {
            return;
        }

        let mut remap = vec![INVALID; self.surfaces.len()];
        let mut next = 0_u32;
        for (s, gone) in removed.iter().enumerate() {
            if !gone {
                remap[s] = next;
                next += 1;
            }
        }
        let mut s = 0;
        self.surfaces.retain(|_| {
            let keep = !removed[s];
            s += 1;
            keep
        });
        for surface in &mut self.surfaces {
            surface.target = surface.target.map(|t| remap[t] as usize);
        }
        for owned in &mut self.owned {
            if *owned != INVALID {
                *owned = remap[*owned as usize];
            }
        }
    }

    /// Unions world bounds bottom-up; nested surfaces come after their target.
    fn compute_content_rects(&mut self, store: &LayerStore) {
        for s in (0..self.surfaces.len()).rev() {
            let mut rect: Option<Rect> = None;
            for &layer in &self.surfaces[s].layers {
                let nested = self.surface_of(layer).filter(|&n| n != s);
                let r = match nested {
                    Some(n) => self.surfaces[n].content_rect,
                    None => store.world_bounds(layer),
                };
                rect = Some(rect.map_or(r, |acc| acc.union(r)));
            }
            self.surfaces[s].content_rect = rect.unwrap_or(Rect::ZERO);
        }
    }
}

fn owns_surface(store: &LayerStore, idx: u32) -> bool {
    let i = idx as usize;
    store.flags[i].isolate || (store.local_opacity[i] < 1.0 && store.first_child[i] != INVALID)
}

impl RenderSurfaceTree for RenderSurfaceList {
    type Layer = LayerId;
    type Surface = RenderSurface;

    fn surface_count(&self) -> usize {
        self.surfaces.len()
    }

    fn surface(&self, surface: usize) -> &RenderSurface {
        &self.surfaces[surface]
    }

    fn surface_layer(&self, surface: usize) -> LayerId {
        self.surfaces[surface].owner
    }

    fn surface_layers(&self, surface: usize) -> &[LayerId] {
        &self.surfaces[surface].layers
    }

    fn render_surface_of(&self, layer: LayerId) -> Option<usize> {
        self.surface_of(layer)
    }
}
