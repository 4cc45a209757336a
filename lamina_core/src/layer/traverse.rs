// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Sibling-chain and subtree walks over the layer tree.

use super::id::{INVALID, LayerId};
use super::store::LayerStore;

/// An iterator over the direct children of a layer, back to front.
///
/// Created by [`LayerStore::children`].
#[derive(Debug)]
pub struct Children<'a> {
    store: &'a LayerStore,
    current: u32,
}

impl<'a> Children<'a> {
    pub(crate) fn new(store: &'a LayerStore, first: u32) -> Self {
        Self {
            store,
            current: first,
        }
    }
}

impl Iterator for Children<'_> {
    type Item = LayerId;

    fn next(&mut self) -> Option<LayerId> {
        let idx = self.current;
        let id = self.store.handle_at(idx)?;
        self.current = self.store.next_sibling[idx as usize];
        Some(id)
    }
}

impl LayerStore {
    /// Returns the slot that follows `idx` in a depth-first pre-order walk of
    /// the subtree rooted at `root`, or [`INVALID`] once the walk is done.
    ///
    /// With `descend == false` the children of `idx` are skipped. The walk
    /// follows parent and sibling links only, so it needs no stack.
    pub(crate) fn next_in_subtree(&self, root: u32, idx: u32, descend: bool) -> u32 {
        if descend {
            let first = self.first_child[idx as usize];
            if first != INVALID {
                return first;
            }
        }
        let mut cur = idx;
        while cur != root {
            let next = self.next_sibling[cur as usize];
            if next != INVALID {
                return next;
            }
            cur = self.parent[cur as usize];
        }
        INVALID
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec::Vec;

    use super::*;

    #[test]
    fn subtree_walk_is_pre_order_and_stays_inside_root() {
        let mut store = LayerStore::new();
        let outside = store.create_layer();
        let root = store.create_layer();
        let a = store.create_layer();
        let a1 = store.create_layer();
        let b = store.create_layer();
        store.add_child(outside, root);
        store.add_child(root, a);
        store.add_child(a, a1);
        store.add_child(root, b);
        let trailing = store.create_layer();
        store.add_child(outside, trailing);

        let mut seen = Vec::new();
        let mut idx = root.idx;
        while idx != INVALID {
            seen.push(idx);
            idx = store.next_in_subtree(root.idx, idx, true);
        }
        assert_eq!(seen, [root.idx, a.idx, a1.idx, b.idx]);
    }

    #[test]
    fn subtree_walk_can_skip_children() {
        let mut store = LayerStore::new();
        let root = store.create_layer();
        let a = store.create_layer();
        let a1 = store.create_layer();
        let b = store.create_layer();
        store.add_child(root, a);
        store.add_child(a, a1);
        store.add_child(root, b);

        assert_eq!(store.next_in_subtree(root.idx, a.idx, false), b.idx);
        assert_eq!(store.next_in_subtree(root.idx, b.idx, true), INVALID);
    }
}
