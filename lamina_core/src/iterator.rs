// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Non-recursive iteration over a layer tree partitioned into render surfaces.
//!
//! A [`LayerIterator`] visits every element of a [`RenderSurfaceTree`] once,
//! in one of two orders:
//!
//! - [`IterationOrder::BackToFront`] (paint order): a surface announces itself
//!   through its *target* slot before its layers, and a nested surface is
//!   entered right after the layer that owns it is met as a *contributing*
//!   surface.
//! - [`IterationOrder::FrontToBack`] (hit-test order): the exact reverse.
//!
//! Each step lands on one of three roles ([`VisitRole`]):
//!
//! ```text
//!   surface 0 (root)          BackToFront           FrontToBack
//!   ├── child1 ─► surface 1   T0  target  root      child2
//!   │   ├── gc1a              C   contrib child1    gc1b
//!   │   └── gc1b              T1  target  child1    gc1a
//!   └── child2                    gc1a              T1
//!                                 gc1b              C
//!                                 child2            T0
//! ```
//!
//! Return points live on an iterator-owned stack stored inline for nesting up
//! to eight surfaces deep. Trees are only borrowed, so several iterators can
//! walk the same tree at once.

use core::fmt;

use smallvec::SmallVec;

/// Read access to a layer tree grouped into render surfaces.
///
/// Surface `0` is the root surface. Every other surface's owning layer
/// appears in exactly one other surface's layer list.
pub trait RenderSurfaceTree {
    /// Layer handle type.
    type Layer: Copy + PartialEq + fmt::Debug;
    /// Per-surface data exposed through
    /// [`LayerIterator::target_render_surface`].
    type Surface;

    /// Returns the number of surfaces.
    fn surface_count(&self) -> usize;

    /// Returns surface `surface`.
    fn surface(&self, surface: usize) -> &Self::Surface;

    /// Returns the layer that owns surface `surface`.
    fn surface_layer(&self, surface: usize) -> Self::Layer;

    /// Returns the ordered layer list of surface `surface`, back to front.
    fn surface_layers(&self, surface: usize) -> &[Self::Layer];

    /// Returns the surface owned by `layer`, if it owns one.
    fn render_surface_of(&self, layer: Self::Layer) -> Option<usize>;
}

/// Direction of a walk.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum IterationOrder {
    /// Paint order.
    BackToFront,
    /// Hit-test order.
    FrontToBack,
}

/// What the current position of a [`LayerIterator`] represents.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VisitRole {
    /// The owner of the surface being iterated, standing for the surface.
    TargetSurface,
    /// A layer in the target surface's list that owns a nested surface.
    ContributingSurface,
    /// A layer drawing its own content into the target surface.
    Itself,
}

/// A snapshot of one iterator step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LayerVisit<L> {
    /// The layer at this step.
    pub layer: L,
    /// What the layer stands for at this step.
    pub role: VisitRole,
    /// The surface being iterated.
    pub target_surface: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Position {
    Finished,
    AtTargetSurface { surface: usize },
    AtLayer { surface: usize, index: usize },
}

/// A contributing position to come back to after leaving a nested surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Frame {
    surface: usize,
    index: usize,
}

/// A cursor over a [`RenderSurfaceTree`].
///
/// Drive it with [`advance`](Self::advance) and compare against
/// [`end`](Self::end), or use it as an [`Iterator`] of [`LayerVisit`]s.
pub struct LayerIterator<'a, T: RenderSurfaceTree + ?Sized> {
    tree: &'a T,
    order: IterationOrder,
    position: Position,
    stack: SmallVec<[Frame; 8]>,
}

impl<T: RenderSurfaceTree + ?Sized> Clone for LayerIterator<'_, T> {
    fn clone(&self) -> Self {
        Self {
            tree: self.tree,
            order: self.order,
            position: self.position,
            stack: self.stack.clone(),
        }
    }
}

impl<T: RenderSurfaceTree + ?Sized> fmt::Debug for LayerIterator<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LayerIterator")
            .field("order", &self.order)
            .field("position", &self.position)
            .field("depth", &self.stack.len())
            .finish_non_exhaustive()
    }
}

impl<T: RenderSurfaceTree + ?Sized> PartialEq for LayerIterator<'_, T> {
    fn eq(&self, other: &Self) -> bool {
        self.order == other.order && self.position == other.position && self.stack == other.stack
    }
}

impl<'a, T: RenderSurfaceTree + ?Sized> LayerIterator<'a, T> {
    /// Positions a new iterator at the first element in `order`.
    ///
    /// A tree with no surfaces yields an iterator that is already finished.
    #[must_use]
    pub fn begin(tree: &'a T, order: IterationOrder) -> Self {
        let mut it = Self::end(tree, order);
        if tree.surface_count() == 0 {
            return it;
        }
        match order {
            IterationOrder::BackToFront => {
                it.position = Position::AtTargetSurface { surface: 0 };
            }
            IterationOrder::FrontToBack => it.enter_from_front(0),
        }
        it
    }

    /// Returns a finished iterator.
    #[must_use]
    pub fn end(tree: &'a T, order: IterationOrder) -> Self {
        Self {
            tree,
            order,
            position: Position::Finished,
            stack: SmallVec::new(),
        }
    }

    /// Returns the walk direction.
    #[must_use]
    pub fn order(&self) -> IterationOrder {
        self.order
    }

    /// Returns whether the walk is over.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.position == Position::Finished
    }

    /// Moves to the next element.
    ///
    /// # Panics
    ///
    /// Panics if the iterator is already finished.
    pub fn advance(&mut self) {
        assert!(!self.is_finished(), "advanced a finished LayerIterator");
        match self.order {
            IterationOrder::BackToFront => self.advance_back_to_front(),
            IterationOrder::FrontToBack => self.advance_front_to_back(),
        }
    }

    fn advance_back_to_front(&mut self) {
        match self.position {
            Position::Finished => {}
            Position::AtTargetSurface { surface } => self.settle_forward(surface, 0),
            Position::AtLayer { surface, index } => {
                if let Some(nested) = self.contributing_surface_at(surface, index) {
                    self.stack.push(Frame { surface, index });
                    self.position = Position::AtTargetSurface { surface: nested };
                } else {
                    self.settle_forward(surface, index + 1);
                }
            }
        }
    }

    /// Lands on `(surface, index)`, popping out of every exhausted surface.
    fn settle_forward(&mut self, mut surface: usize, mut index: usize) {
        loop {
            if index < self.tree.surface_layers(surface).len() {
                self.position = Position::AtLayer { surface, index };
                return;
            }
            match self.stack.pop() {
                Some(frame) => {
                    surface = frame.surface;
                    index = frame.index + 1;
                }
                None => {
                    self.position = Position::Finished;
                    return;
                }
            }
        }
    }

    fn advance_front_to_back(&mut self) {
        match self.position {
            Position::Finished => {}
            Position::AtLayer { surface, index: 0 } => {
                self.position = Position::AtTargetSurface { surface };
            }
            Position::AtLayer { surface, index } => self.go_to_highest_in_subtree(surface, index - 1),
            Position::AtTargetSurface { .. } => {
                self.position = match self.stack.pop() {
                    Some(Frame { surface, index }) => Position::AtLayer { surface, index },
                    None => Position::Finished,
                };
            }
        }
    }

    /// Positions on the front-most element of `surface`.
    fn enter_from_front(&mut self, surface: usize) {
        match self.tree.surface_layers(surface).len() {
            0 => self.position = Position::AtTargetSurface { surface },
            len => self.go_to_highest_in_subtree(surface, len - 1),
        }
    }

    /// Descends from `(surface, index)` through contributing surfaces until
    /// the front-most element below it.
    fn go_to_highest_in_subtree(&mut self, mut surface: usize, mut index: usize) {
        while let Some(nested) = self.contributing_surface_at(surface, index) {
            self.stack.push(Frame { surface, index });
            let len = self.tree.surface_layers(nested).len();
            if len == 0 {
                self.position = Position::AtTargetSurface { surface: nested };
                return;
            }
            surface = nested;
            index = len - 1;
        }
        self.position = Position::AtLayer { surface, index };
    }

    fn contributing_surface_at(&self, surface: usize, index: usize) -> Option<usize> {
        let layer = self.tree.surface_layers(surface)[index];
        self.tree
            .render_surface_of(layer)
            .filter(|&owned| owned != surface)
    }

    fn expect_surface(&self) -> usize {
        match self.position {
            Position::AtTargetSurface { surface } | Position::AtLayer { surface, .. } => surface,
            Position::Finished => panic!("queried a finished LayerIterator"),
        }
    }

    /// Returns whether the position stands for the target surface itself.
    #[must_use]
    pub fn current_layer_represents_target_render_surface(&self) -> bool {
        matches!(self.position, Position::AtTargetSurface { .. })
    }

    /// Returns whether the position is a layer that owns a nested surface
    /// contributing to the target surface.
    #[must_use]
    pub fn current_layer_represents_contributing_render_surface(&self) -> bool {
        match self.position {
            Position::AtLayer { surface, index } => {
                self.contributing_surface_at(surface, index).is_some()
            }
            _ => false,
        }
    }

    /// Returns whether the position is a layer drawing its own content.
    #[must_use]
    pub fn current_layer_represents_itself(&self) -> bool {
        matches!(self.position, Position::AtLayer { .. })
            && !self.current_layer_represents_contributing_render_surface()
    }

    /// Returns the index of the surface being iterated.
    ///
    /// # Panics
    ///
    /// Panics if the iterator is finished.
    #[must_use]
    pub fn target_render_surface_index(&self) -> usize {
        self.expect_surface()
    }

    /// Returns the surface being iterated.
    ///
    /// # Panics
    ///
    /// Panics if the iterator is finished.
    #[must_use]
    pub fn target_render_surface(&self) -> &'a T::Surface {
        self.tree.surface(self.expect_surface())
    }

    /// Returns the layer that owns the surface being iterated.
    ///
    /// # Panics
    ///
    /// Panics if the iterator is finished.
    #[must_use]
    pub fn target_render_surface_layer(&self) -> T::Layer {
        self.tree.surface_layer(self.expect_surface())
    }

    /// Returns the layer list of the surface being iterated.
    ///
    /// # Panics
    ///
    /// Panics if the iterator is finished.
    #[must_use]
    pub fn target_render_surface_children(&self) -> &'a [T::Layer] {
        self.tree.surface_layers(self.expect_surface())
    }

    /// Returns the layer at the current position.
    ///
    /// At a target slot this is the surface's owner.
    ///
    /// # Panics
    ///
    /// Panics if the iterator is finished.
    #[must_use]
    pub fn current_layer(&self) -> T::Layer {
        match self.position {
            Position::AtTargetSurface { surface } => self.tree.surface_layer(surface),
            Position::AtLayer { surface, index } => self.tree.surface_layers(surface)[index],
            Position::Finished => panic!("queried a finished LayerIterator"),
        }
    }

    /// Returns the current step as a [`LayerVisit`].
    ///
    /// # Panics
    ///
    /// Panics if the iterator is finished.
    #[must_use]
    pub fn visit(&self) -> LayerVisit<T::Layer> {
        let role = if self.current_layer_represents_target_render_surface() {
            VisitRole::TargetSurface
        } else if self.current_layer_represents_contributing_render_surface() {
            VisitRole::ContributingSurface
        } else {
            VisitRole::Itself
        };
        LayerVisit {
            layer: self.current_layer(),
            role,
            target_surface: self.expect_surface(),
        }
    }
}

impl<T: RenderSurfaceTree + ?Sized> Iterator for LayerIterator<'_, T> {
    type Item = LayerVisit<T::Layer>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.is_finished() {
            return None;
        }
        let visit = self.visit();
        self.advance();
        Some(visit)
    }
}

impl<T: RenderSurfaceTree + ?Sized> core::iter::FusedIterator for LayerIterator<'_, T> {}
