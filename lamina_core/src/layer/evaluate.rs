// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Frame evaluation and change tracking.
//!
//! Evaluation drains each dirty channel and recomputes what depends on it:
//!
//! 1. **TRANSFORM**: `world_transform = parent_world * local_transform` and
//!    `effective_hidden = parent_effective_hidden || flags.hidden`.
//! 2. **OPACITY**: `effective_opacity = parent_effective * local_opacity`.
//! 3. **CLIP** / **CONTENT**: collected only; consumers read current values
//!    from the store.
//! 4. **TOPOLOGY**: any drained key means render-surface membership may have
//!    changed, reported as [`FrameChanges::surfaces_changed`].
//!
//! Propagating channels are drained with `affected().deterministic()`, which
//! yields parents before children, so each layer reads an up-to-date parent.

use alloc::vec::Vec;

use kurbo::Affine;

use super::id::INVALID;
use super::store::LayerStore;
use crate::dirty;

/// The set of changes produced by a single [`LayerStore::evaluate`] call.
///
/// Fields hold raw slot indices so consumers can index the store's arrays.
#[derive(Clone, Debug, Default)]
pub struct FrameChanges {
    /// Layers whose world transform was recomputed.
    pub transforms: Vec<u32>,
    /// Layers whose effective opacity was recomputed.
    pub opacities: Vec<u32>,
    /// Layers whose clip shape changed.
    pub clips: Vec<u32>,
    /// Layers whose content or bounds changed.
    pub content: Vec<u32>,
    /// Layers that became effectively hidden.
    pub hidden: Vec<u32>,
    /// Layers that stopped being effectively hidden.
    pub unhidden: Vec<u32>,
    /// Layers added since the last evaluate.
    pub added: Vec<u32>,
    /// Layers removed since the last evaluate.
    pub removed: Vec<u32>,
    /// Whether the traversal order was rebuilt.
    pub topology_changed: bool,
    /// Whether the render-surface list must be rebuilt.
    pub surfaces_changed: bool,
}

impl FrameChanges {
    /// Clears all change lists.
    pub fn clear(&mut self) {
        self.transforms.clear();
        self.opacities.clear();
        self.clips.clear();
        self.content.clear();
        self.hidden.clear();
        self.unhidden.clear();
        self.added.clear();
        self.removed.clear();
        self.topology_changed = false;
        self.surfaces_changed = false;
    }
}

impl LayerStore {
    /// Evaluates the layer tree, recomputing dirty properties and returning
    /// the set of changes.
    pub fn evaluate(&mut self) -> FrameChanges {
        let mut changes = FrameChanges::default();
        self.evaluate_into(&mut changes);
        changes
    }

    /// Like [`evaluate`](Self::evaluate), but reuses a caller-provided buffer.
    pub fn evaluate_into(&mut self, changes: &mut FrameChanges) {
        changes.clear();

        if self.traversal_dirty {
            self.rebuild_traversal_order();
            changes.topology_changed = true;
            self.traversal_dirty = false;
        }

        let dirty_transforms: Vec<u32> = self
            .dirty
            .drain(dirty::TRANSFORM)
            .affected()
            .deterministic()
            .run()
            .collect();
        for &idx in &dirty_transforms {
            let i = idx as usize;
            let p = self.parent[i];
            let (parent_world, parent_hidden) = if p == INVALID {
                (Affine::IDENTITY, false)
            } else {
                (
                    self.world_transform[p as usize],
                    self.effective_hidden[p as usize],
                )
            };
            self.world_transform[i] = parent_world * self.local_transform[i];

            let hidden = parent_hidden || self.flags[i].hidden;
            if hidden != self.effective_hidden[i] {
                if hidden {
                    changes.hidden.push(idx);
                } else {
                    changes.unhidden.push(idx);
                }
                self.effective_hidden[i] = hidden;
            }
        }
        changes.transforms = dirty_transforms;

        let dirty_opacities: Vec<u32> = self
            .dirty
            .drain(dirty::OPACITY)
            .affected()
            .deterministic()
            .run()
            .collect();
        for &idx in &dirty_opacities {
            let i = idx as usize;
            let p = self.parent[i];
            let parent_opacity = if p == INVALID {
                1.0
            } else {
                self.effective_opacity[p as usize]
            };
            self.effective_opacity[i] = parent_opacity * self.local_opacity[i];
        }
        changes.opacities = dirty_opacities;

        changes.clips = self
            .dirty
            .drain(dirty::CLIP)
            .deterministic()
            .run()
            .collect();

        changes.content = self
            .dirty
            .drain(dirty::CONTENT)
            .deterministic()
            .run()
            .collect();

        changes.surfaces_changed = self
            .dirty
            .drain(dirty::TOPOLOGY)
            .deterministic()
            .run()
            .count()
            > 0;

        core::mem::swap(&mut self.pending_added, &mut changes.added);
        core::mem::swap(&mut self.pending_removed, &mut changes.removed);
    }

    /// Returns the current traversal order (depth-first pre-order over every
    /// root, roots in slot order).
    ///
    /// Only valid after [`evaluate`](Self::evaluate) has been called.
    #[must_use]
    pub fn traversal_order(&self) -> &[u32] {
        &self.traversal_order
    }

    fn rebuild_traversal_order(&mut self) {
        self.traversal_order.clear();
        for root in 0..self.len {
            if !self.alive[root as usize] || self.parent[root as usize] != INVALID {
                continue;
            }
            let mut idx = root;
            while idx != INVALID {
                self.traversal_order.push(idx);
                idx = self.next_in_subtree(root, idx, true);
            }
        }
    }
}
