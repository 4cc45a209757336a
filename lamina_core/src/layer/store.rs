// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Struct-of-arrays layer storage with allocation, topology, and property management.

use alloc::vec::Vec;

use kurbo::{Affine, Rect, Size};
use understory_dirty::{CycleHandling, DirtyTracker, EagerPolicy};

use super::clip::ClipShape;
use super::id::{ContentId, INVALID, LayerId};
use super::traverse::Children;
use crate::dirty;

/// Per-layer boolean flags.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct LayerFlags {
    /// Hides the layer and its entire subtree. Hidden layers never reach a
    /// render surface's layer list.
    pub hidden: bool,
    /// Forces the layer to own a render surface, isolating its subtree
    /// (e.g. for blending or filters applied to the group as a whole).
    pub isolate: bool,
}

/// Struct-of-arrays storage for all layers.
///
/// Layers are addressed by [`LayerId`] handles. Each layer occupies a slot in
/// parallel arrays; destroyed slots are recycled through a free list and
/// generation counters reject stale handles.
#[derive(Debug)]
pub struct LayerStore {
    // -- Topology --
    pub(crate) parent: Vec<u32>,
    pub(crate) first_child: Vec<u32>,
    pub(crate) next_sibling: Vec<u32>,
    pub(crate) prev_sibling: Vec<u32>,

    // -- Local properties --
    pub(crate) local_transform: Vec<Affine>,
    pub(crate) local_opacity: Vec<f32>,
    pub(crate) bounds: Vec<Size>,
    pub(crate) clip: Vec<Option<ClipShape>>,
    pub(crate) content: Vec<Option<ContentId>>,
    pub(crate) flags: Vec<LayerFlags>,

    // -- Computed by evaluate --
    pub(crate) world_transform: Vec<Affine>,
    pub(crate) effective_opacity: Vec<f32>,
    pub(crate) effective_hidden: Vec<bool>,

    // -- Allocation --
    pub(crate) generation: Vec<u32>,
    pub(crate) alive: Vec<bool>,
    pub(crate) free_list: Vec<u32>,
    pub(crate) len: u32,

    pub(crate) dirty: DirtyTracker<u32>,

    pub(crate) traversal_order: Vec<u32>,
    pub(crate) traversal_dirty: bool,

    pub(crate) pending_added: Vec<u32>,
    pub(crate) pending_removed: Vec<u32>,
}

impl Default for LayerStore {
    fn default() -> Self {
        Self::new()
    }
}

impl LayerStore {
    /// Creates an empty layer store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            parent: Vec::new(),
            first_child: Vec::new(),
            next_sibling: Vec::new(),
            prev_sibling: Vec::new(),
            local_transform: Vec::new(),
            local_opacity: Vec::new(),
            bounds: Vec::new(),
            clip: Vec::new(),
            content: Vec::new(),
            flags: Vec::new(),
            world_transform: Vec::new(),
            effective_opacity: Vec::new(),
            effective_hidden: Vec::new(),
            generation: Vec::new(),
            alive: Vec::new(),
            free_list: Vec::new(),
            len: 0,
            dirty: DirtyTracker::with_cycle_handling(CycleHandling::Error),
            traversal_order: Vec::new(),
            traversal_dirty: true,
            pending_added: Vec::new(),
            pending_removed: Vec::new(),
        }
    }

    /// Returns the number of live layers.
    #[must_use]
    pub fn layer_count(&self) -> usize {
        self.len as usize - self.free_list.len()
    }

    // -- Allocation API --

    /// Creates a new layer and returns its handle.
    ///
    /// The layer starts detached, with an identity transform, full opacity,
    /// empty bounds, no clip, no content and default flags.
    pub fn create_layer(&mut self) -> LayerId {
        let idx = match self.free_list.pop() {
            Some(idx) => {
                let i = idx as usize;
                self.generation[i] += 1;
                self.alive[i] = true;
                self.reset_slot(i);
                idx
            }
            None => {
                let idx = self.len;
                self.len += 1;
                self.parent.push(INVALID);
                self.first_child.push(INVALID);
                self.next_sibling.push(INVALID);
                self.prev_sibling.push(INVALID);
                self.local_transform.push(Affine::IDENTITY);
                self.local_opacity.push(1.0);
                self.bounds.push(Size::ZERO);
                self.clip.push(None);
                self.content.push(None);
                self.flags.push(LayerFlags::default());
                self.world_transform.push(Affine::IDENTITY);
                self.effective_opacity.push(1.0);
                self.effective_hidden.push(false);
                self.generation.push(0);
                self.alive.push(true);
                idx
            }
        };

        self.traversal_dirty = true;
        self.pending_added.push(idx);
        self.dirty.mark(idx, dirty::TOPOLOGY);

        LayerId {
            idx,
            generation: self.generation[idx as usize],
        }
    }

    /// Destroys a layer, freeing its slot for reuse.
    ///
    /// # Panics
    ///
    /// Panics if the layer has children (remove them first) or if the handle
    /// is stale.
    pub fn destroy_layer(&mut self, id: LayerId) {
        self.validate(id);
        let idx = id.idx;
        assert!(
            self.first_child[idx as usize] == INVALID,
            "cannot destroy layer with children"
        );

        if self.parent[idx as usize] != INVALID {
            let p = self.parent[idx as usize];
            self.unlink_from_parent(idx);
            self.dirty.mark(p, dirty::TOPOLOGY);
        }
        self.dirty.remove_key(idx);

        self.generation[idx as usize] += 1;
        self.alive[idx as usize] = false;
        self.free_list.push(idx);
        self.traversal_dirty = true;
        self.pending_removed.push(idx);
    }

    /// Returns whether the given handle refers to a live layer.
    #[must_use]
    pub fn is_alive(&self, id: LayerId) -> bool {
        id.idx < self.len
            && self.alive[id.idx as usize]
            && self.generation[id.idx as usize] == id.generation
    }

    // -- Topology API --

    /// Adds `child` as the last (front-most) child of `parent`.
    ///
    /// # Panics
    ///
    /// Panics if either handle is stale, or if `child` already has a parent.
    pub fn add_child(&mut self, parent: LayerId, child: LayerId) {
        self.validate(parent);
        self.validate(child);
        assert!(
            self.parent[child.idx as usize] == INVALID,
            "child already has a parent"
        );
        self.link_last_child(parent.idx, child.idx);
    }

    /// Detaches `child` from its current parent.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale or the layer has no parent.
    pub fn remove_from_parent(&mut self, child: LayerId) {
        self.validate(child);
        let c = child.idx;
        let p = self.parent[c as usize];
        assert!(p != INVALID, "layer has no parent");
        self.detach(c, p);
    }

    /// Moves `child` under `new_parent`, as its last child.
    ///
    /// # Panics
    ///
    /// Panics if either handle is stale.
    pub fn reparent(&mut self, child: LayerId, new_parent: LayerId) {
        self.validate(child);
        self.validate(new_parent);
        let old = self.parent[child.idx as usize];
        if old != INVALID {
            self.detach(child.idx, old);
        }
        self.link_last_child(new_parent.idx, child.idx);
    }

    /// Inserts `child` directly behind `sibling` in paint order.
    ///
    /// # Panics
    ///
    /// Panics if handles are stale, `child` already has a parent, or `sibling`
    /// has no parent.
    pub fn insert_before(&mut self, child: LayerId, sibling: LayerId) {
        self.validate(child);
        self.validate(sibling);
        let c = child.idx;
        let s = sibling.idx;
        assert!(
            self.parent[c as usize] == INVALID,
            "child already has a parent"
        );
        let p = self.parent[s as usize];
        assert!(p != INVALID, "sibling has no parent");

        let prev = self.prev_sibling[s as usize];
        self.parent[c as usize] = p;
        self.next_sibling[c as usize] = s;
        self.prev_sibling[c as usize] = prev;
        if prev == INVALID {
            self.first_child[p as usize] = c;
        } else {
            self.next_sibling[prev as usize] = c;
        }
        self.prev_sibling[s as usize] = c;

        self.attach_dirty_edges(c, p);
    }

    /// Returns the parent of a layer, if any.
    #[must_use]
    pub fn parent(&self, id: LayerId) -> Option<LayerId> {
        self.validate(id);
        self.handle_at(self.parent[id.idx as usize])
    }

    /// Returns an iterator over the direct children of a layer, back to front.
    #[must_use]
    pub fn children(&self, id: LayerId) -> Children<'_> {
        self.validate(id);
        Children::new(self, self.first_child[id.idx as usize])
    }

    /// Returns whether the layer has at least one child.
    #[must_use]
    pub fn has_children(&self, id: LayerId) -> bool {
        self.validate(id);
        self.first_child[id.idx as usize] != INVALID
    }

    /// Returns every live layer without a parent, in slot order.
    #[must_use]
    pub fn roots(&self) -> Vec<LayerId> {
        (0..self.len)
            .filter(|&idx| self.alive[idx as usize] && self.parent[idx as usize] == INVALID)
            .map(|idx| LayerId {
                idx,
                generation: self.generation[idx as usize],
            })
            .collect()
    }

    // -- Property getters --

    /// Returns the local transform of a layer.
    #[must_use]
    pub fn local_transform(&self, id: LayerId) -> Affine {
        self.validate(id);
        self.local_transform[id.idx as usize]
    }

    /// Returns the local opacity of a layer.
    #[must_use]
    pub fn local_opacity(&self, id: LayerId) -> f32 {
        self.validate(id);
        self.local_opacity[id.idx as usize]
    }

    /// Returns the size of the layer's content, in local space.
    #[must_use]
    pub fn bounds(&self, id: LayerId) -> Size {
        self.validate(id);
        self.bounds[id.idx as usize]
    }

    /// Returns the clip shape of a layer.
    #[must_use]
    pub fn clip(&self, id: LayerId) -> Option<ClipShape> {
        self.validate(id);
        self.clip[id.idx as usize]
    }

    /// Returns the paint content of a layer.
    #[must_use]
    pub fn content(&self, id: LayerId) -> Option<ContentId> {
        self.validate(id);
        self.content[id.idx as usize]
    }

    /// Returns whether the layer has content to draw.
    #[must_use]
    pub fn draws_content(&self, id: LayerId) -> bool {
        self.content(id).is_some()
    }

    /// Returns the flags of a layer.
    #[must_use]
    pub fn flags(&self, id: LayerId) -> LayerFlags {
        self.validate(id);
        self.flags[id.idx as usize]
    }

    /// Returns the computed world transform of a layer.
    ///
    /// Only valid after [`evaluate`](Self::evaluate) has been called.
    #[must_use]
    pub fn world_transform(&self, id: LayerId) -> Affine {
        self.validate(id);
        self.world_transform[id.idx as usize]
    }

    /// Returns the layer's bounds mapped to world space (axis-aligned).
    ///
    /// Only valid after [`evaluate`](Self::evaluate) has been called.
    #[must_use]
    pub fn world_bounds(&self, id: LayerId) -> Rect {
        self.validate(id);
        let i = id.idx as usize;
        self.world_transform[i].transform_rect_bbox(self.bounds[i].to_rect())
    }

    /// Returns the computed effective opacity of a layer.
    ///
    /// Only valid after [`evaluate`](Self::evaluate) has been called.
    #[must_use]
    pub fn effective_opacity(&self, id: LayerId) -> f32 {
        self.validate(id);
        self.effective_opacity[id.idx as usize]
    }

    /// Returns whether the layer is hidden by its own flag or an ancestor's.
    ///
    /// Only valid after [`evaluate`](Self::evaluate) has been called.
    #[must_use]
    pub fn effective_hidden(&self, id: LayerId) -> bool {
        self.validate(id);
        self.effective_hidden[id.idx as usize]
    }

    // -- Mutation API (auto-marks dirty) --

    /// Sets the local transform of a layer.
    pub fn set_transform(&mut self, id: LayerId, transform: Affine) {
        self.validate(id);
        self.local_transform[id.idx as usize] = transform;
        self.dirty.mark_with(id.idx, dirty::TRANSFORM, &EagerPolicy);
    }

    /// Sets the local opacity of a layer.
    ///
    /// Crossing 1.0 can promote or demote the layer's render surface, so the
    /// layer's topology channel is marked as well.
    pub fn set_opacity(&mut self, id: LayerId, opacity: f32) {
        self.validate(id);
        let old = self.local_opacity[id.idx as usize];
        self.local_opacity[id.idx as usize] = opacity;
        self.dirty.mark_with(id.idx, dirty::OPACITY, &EagerPolicy);
        if (old < 1.0) != (opacity < 1.0) {
            self.dirty.mark(id.idx, dirty::TOPOLOGY);
        }
    }

    /// Sets the content size of a layer.
    pub fn set_bounds(&mut self, id: LayerId, bounds: Size) {
        self.validate(id);
        self.bounds[id.idx as usize] = bounds;
        self.dirty.mark(id.idx, dirty::CONTENT);
    }

    /// Sets the clip shape of a layer.
    pub fn set_clip(&mut self, id: LayerId, clip: Option<ClipShape>) {
        self.validate(id);
        self.clip[id.idx as usize] = clip;
        self.dirty.mark(id.idx, dirty::CLIP);
    }

    /// Sets the paint content of a layer.
    pub fn set_content(&mut self, id: LayerId, content: Option<ContentId>) {
        self.validate(id);
        self.content[id.idx as usize] = content;
        self.dirty.mark(id.idx, dirty::CONTENT);
    }

    /// Sets the flags of a layer.
    pub fn set_flags(&mut self, id: LayerId, flags: LayerFlags) {
        self.validate(id);
        self.flags[id.idx as usize] = flags;
        // Hidden propagates like a transform; isolation changes surfaces.
        self.dirty.mark_with(id.idx, dirty::TRANSFORM, &EagerPolicy);
        self.dirty.mark(id.idx, dirty::TOPOLOGY);
    }

    // -- Internal helpers --

    /// Panics if the handle is stale.
    pub(crate) fn validate(&self, id: LayerId) {
        assert!(
            self.is_alive(id),
            "stale LayerId: {id:?} (current gen: {})",
            if id.idx < self.len {
                self.generation[id.idx as usize]
            } else {
                u32::MAX
            }
        );
    }

    /// Builds a handle for a raw slot, or `None` for [`INVALID`].
    pub(crate) fn handle_at(&self, idx: u32) -> Option<LayerId> {
        (idx != INVALID).then(|| LayerId {
            idx,
            generation: self.generation[idx as usize],
        })
    }

    fn reset_slot(&mut self, i: usize) {
        self.parent[i] = INVALID;
        self.first_child[i] = INVALID;
        self.next_sibling[i] = INVALID;
        self.prev_sibling[i] = INVALID;
        self.local_transform[i] = Affine::IDENTITY;
        self.local_opacity[i] = 1.0;
        self.bounds[i] = Size::ZERO;
        self.clip[i] = None;
        self.content[i] = None;
        self.flags[i] = LayerFlags::default();
        self.world_transform[i] = Affine::IDENTITY;
        self.effective_opacity[i] = 1.0;
        self.effective_hidden[i] = false;
    }

    /// Appends `c` to `p`'s child list and wires up dirty dependencies.
    fn link_last_child(&mut self, p: u32, c: u32) {
        self.parent[c as usize] = p;
        self.next_sibling[c as usize] = INVALID;
        self.prev_sibling[c as usize] = INVALID;

        let mut last = self.first_child[p as usize];
        if last == INVALID {
            self.first_child[p as usize] = c;
        } else {
            while self.next_sibling[last as usize] != INVALID {
                last = self.next_sibling[last as usize];
            }
            self.next_sibling[last as usize] = c;
            self.prev_sibling[c as usize] = last;
        }

        self.attach_dirty_edges(c, p);
    }

    fn attach_dirty_edges(&mut self, c: u32, p: u32) {
        // Inherited channels: the child depends on its parent.
        let _ = self.dirty.add_dependency(c, p, dirty::TRANSFORM);
        let _ = self.dirty.add_dependency(c, p, dirty::OPACITY);
        self.mark_subtree_inherited_dirty(c);
        self.traversal_dirty = true;
        self.dirty.mark(p, dirty::TOPOLOGY);
    }

    fn detach(&mut self, c: u32, p: u32) {
        self.unlink_from_parent(c);
        self.dirty.remove_dependency(c, p, dirty::TRANSFORM);
        self.dirty.remove_dependency(c, p, dirty::OPACITY);
        self.mark_subtree_inherited_dirty(c);
        self.traversal_dirty = true;
        self.dirty.mark(p, dirty::TOPOLOGY);
    }

    /// Removes `idx` from its parent's child list without touching dirty state.
    fn unlink_from_parent(&mut self, idx: u32) {
        let p = self.parent[idx as usize];
        let prev = self.prev_sibling[idx as usize];
        let next = self.next_sibling[idx as usize];

        if prev == INVALID {
            self.first_child[p as usize] = next;
        } else {
            self.next_sibling[prev as usize] = next;
        }
        if next != INVALID {
            self.prev_sibling[next as usize] = prev;
        }

        self.parent[idx as usize] = INVALID;
        self.prev_sibling[idx as usize] = INVALID;
        self.next_sibling[idx as usize] = INVALID;
    }

    fn mark_subtree_inherited_dirty(&mut self, idx: u32) {
        self.dirty.mark_with(idx, dirty::TRANSFORM, &EagerPolicy);
        self.dirty.mark_with(idx, dirty::OPACITY, &EagerPolicy);
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use super::*;

    #[test]
    fn create_and_destroy() {
        let mut store = LayerStore::new();
        let id = store.create_layer();
        assert!(store.is_alive(id));
        assert_eq!(store.layer_count(), 1);
        store.destroy_layer(id);
        assert!(!store.is_alive(id));
        assert_eq!(store.layer_count(), 0);
    }

    #[test]
    fn reused_slot_gets_new_generation() {
        let mut store = LayerStore::new();
        let first = store.create_layer();
        store.destroy_layer(first);
        let second = store.create_layer();
        assert!(!store.is_alive(first));
        assert!(store.is_alive(second));
        assert_eq!(first.index(), second.index());
        assert_ne!(first.generation(), second.generation());
    }

    #[test]
    fn reused_slot_starts_from_defaults() {
        let mut store = LayerStore::new();
        let first = store.create_layer();
        store.set_opacity(first, 0.25);
        store.set_bounds(first, Size::new(10.0, 10.0));
        store.destroy_layer(first);
        let second = store.create_layer();
        assert_eq!(store.local_opacity(second), 1.0);
        assert_eq!(store.bounds(second), Size::ZERO);
    }

    #[test]
    fn children_are_back_to_front() {
        let mut store = LayerStore::new();
        let parent = store.create_layer();
        let back = store.create_layer();
        let front = store.create_layer();
        store.add_child(parent, back);
        store.add_child(parent, front);

        assert_eq!(store.parent(back), Some(parent));
        let kids: Vec<_> = store.children(parent).collect();
        assert_eq!(kids, vec![back, front]);
        assert!(store.has_children(parent));
        assert!(!store.has_children(back));
    }

    #[test]
    fn remove_from_parent_detaches() {
        let mut store = LayerStore::new();
        let parent = store.create_layer();
        let child = store.create_layer();
        store.add_child(parent, child);

        store.remove_from_parent(child);
        assert_eq!(store.parent(child), None);
        assert!(store.children(parent).next().is_none());
    }

    #[test]
    fn insert_before_places_child_behind_sibling() {
        let mut store = LayerStore::new();
        let parent = store.create_layer();
        let a = store.create_layer();
        let b = store.create_layer();
        let c = store.create_layer();

        store.add_child(parent, b);
        store.add_child(parent, c);
        store.insert_before(a, b);

        let kids: Vec<_> = store.children(parent).collect();
        assert_eq!(kids, vec![a, b, c]);
    }

    #[test]
    fn reparent_moves_between_parents() {
        let mut store = LayerStore::new();
        let p1 = store.create_layer();
        let p2 = store.create_layer();
        let child = store.create_layer();

        store.add_child(p1, child);
        store.reparent(child, p2);
        assert_eq!(store.parent(child), Some(p2));
        assert!(store.children(p1).next().is_none());
    }

    #[test]
    fn roots_excludes_children_and_dead_layers() {
        let mut store = LayerStore::new();
        let a = store.create_layer();
        let b = store.create_layer();
        let c = store.create_layer();
        let dead = store.create_layer();
        store.add_child(a, c);
        store.destroy_layer(dead);

        assert_eq!(store.roots(), vec![a, b]);
    }

    #[test]
    #[should_panic(expected = "cannot destroy layer with children")]
    fn destroy_with_children_panics() {
        let mut store = LayerStore::new();
        let parent = store.create_layer();
        let child = store.create_layer();
        store.add_child(parent, child);
        store.destroy_layer(parent);
    }

    #[test]
    #[should_panic(expected = "child already has a parent")]
    fn double_add_panics() {
        let mut store = LayerStore::new();
        let p1 = store.create_layer();
        let p2 = store.create_layer();
        let child = store.create_layer();
        store.add_child(p1, child);
        store.add_child(p2, child);
    }

    #[test]
    #[should_panic(expected = "stale LayerId")]
    fn destroyed_handle_panics_on_set_transform() {
        let mut store = LayerStore::new();
        let id = store.create_layer();
        store.destroy_layer(id);
        store.set_transform(id, Affine::IDENTITY);
    }

    #[test]
    #[should_panic(expected = "stale LayerId")]
    fn destroyed_handle_panics_on_parent() {
        let mut store = LayerStore::new();
        let id = store.create_layer();
        store.destroy_layer(id);
        let _ = store.parent(id);
    }

    #[test]
    fn set_bounds_reports_content_change() {
        let mut store = LayerStore::new();
        let id = store.create_layer();
        let _ = store.evaluate();

        store.set_bounds(id, Size::new(256.0, 256.0));
        let changes = store.evaluate();
        assert!(
            changes.content.contains(&id.idx),
            "bounds changes ride the content channel"
        );
    }

    #[test]
    fn opacity_crossing_one_reports_topology_change() {
        let mut store = LayerStore::new();
        let id = store.create_layer();
        let _ = store.evaluate();

        store.set_opacity(id, 0.9);
        assert!(store.evaluate().surfaces_changed);
        store.set_opacity(id, 0.5);
        assert!(
            !store.evaluate().surfaces_changed,
            "staying below 1.0 keeps surface membership"
        );
    }

    #[test]
    fn world_bounds_follow_transform() {
        let mut store = LayerStore::new();
        let id = store.create_layer();
        store.set_bounds(id, Size::new(10.0, 20.0));
        store.set_transform(id, Affine::translate((5.0, 5.0)));
        let _ = store.evaluate();
        assert_eq!(store.world_bounds(id), Rect::new(5.0, 5.0, 15.0, 25.0));
    }
}
