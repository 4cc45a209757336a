// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Hit testing in front-to-back order.

use alloc::vec::Vec;

use kurbo::{Affine, Point};
use lamina_core::iterator::{IterationOrder, LayerIterator, VisitRole};
use lamina_core::layer::{LayerId, LayerStore, RenderSurfaceList};

/// Returns the top-most drawable layer under `point` (in world space).
///
/// A layer is hit when the point falls inside its bounds and survives its own
/// clip and every ancestor's clip. Layers with a non-invertible world
/// transform are never hit.
#[must_use]
pub fn hit_test(store: &LayerStore, surfaces: &RenderSurfaceList, point: Point) -> Option<LayerId> {
    hits(store, surfaces, point).next()
}

/// Returns every drawable layer under `point`, top-most first.
#[must_use]
pub fn hit_test_all(store: &LayerStore, surfaces: &RenderSurfaceList, point: Point) -> Vec<LayerId> {
    hits(store, surfaces, point).collect()
}

fn hits<'a>(
    store: &'a LayerStore,
    surfaces: &'a RenderSurfaceList,
    point: Point,
) -> impl Iterator<Item = LayerId> + 'a {
    LayerIterator::begin(surfaces, IterationOrder::FrontToBack)
        .filter(|visit| visit.role == VisitRole::Itself)
        .map(|visit| visit.layer)
        .filter(move |&layer| store.draws_content(layer) && contains(store, layer, point))
}

fn contains(store: &LayerStore, layer: LayerId, point: Point) -> bool {
    let Some(local) = to_local(store.world_transform(layer), point) else {
        return false;
    };
    if !store.bounds(layer).to_rect().contains(local) {
        return false;
    }
    let mut current = Some(layer);
    while let Some(id) = current {
        if let Some(clip) = store.clip(id) {
            match to_local(store.world_transform(id), point) {
                Some(p) if clip.contains(p) => {}
                _ => return false,
            }
        }
        current = store.parent(id);
    }
    true
}

fn to_local(world: Affine, point: Point) -> Option<Point> {
    let det = world.determinant();
    (det != 0.0 && det.is_finite()).then(|| world.inverse() * point)
}

#[cfg(test)]
mod tests {
    use kurbo::{Rect, Size};
    use lamina_core::layer::{ClipShape, ContentId, LayerFlags};

    use super::*;

    fn drawable(store: &mut LayerStore, parent: LayerId, rect: Rect) -> LayerId {
        let id = store.create_layer();
        store.set_content(id, Some(ContentId(id.index())));
        store.set_bounds(id, rect.size());
        store.set_transform(id, Affine::translate(rect.origin().to_vec2()));
        store.add_child(parent, id);
        id
    }

    fn scene() -> (LayerStore, LayerId) {
        let mut store = LayerStore::new();
        let root = store.create_layer();
        store.set_bounds(root, Size::new(200.0, 200.0));
        (store, root)
    }

    #[test]
    fn top_most_layer_wins() {
        let (mut store, root) = scene();
        let back = drawable(&mut store, root, Rect::new(0.0, 0.0, 100.0, 100.0));
        let front = drawable(&mut store, root, Rect::new(50.0, 50.0, 150.0, 150.0));
        let _ = store.evaluate();
        let surfaces = RenderSurfaceList::build(&store, root);

        assert_eq!(hit_test(&store, &surfaces, Point::new(75.0, 75.0)), Some(front));
        assert_eq!(hit_test(&store, &surfaces, Point::new(25.0, 25.0)), Some(back));
        assert_eq!(hit_test(&store, &surfaces, Point::new(175.0, 20.0)), None);
        assert_eq!(
            hit_test_all(&store, &surfaces, Point::new(75.0, 75.0)),
            [front, back]
        );
    }

    #[test]
    fn layers_inside_nested_surfaces_are_found_in_paint_order() {
        let (mut store, root) = scene();
        let under = drawable(&mut store, root, Rect::new(0.0, 0.0, 200.0, 200.0));
        let group = store.create_layer();
        store.add_child(root, group);
        store.set_flags(
            group,
            LayerFlags {
                isolate: true,
                ..LayerFlags::default()
            },
        );
        store.set_transform(group, Affine::translate((20.0, 20.0)));
        let inner = drawable(&mut store, group, Rect::new(0.0, 0.0, 10.0, 10.0));
        let _ = store.evaluate();
        let surfaces = RenderSurfaceList::build(&store, root);
        assert_eq!(surfaces.len(), 2);

        assert_eq!(hit_test(&store, &surfaces, Point::new(25.0, 25.0)), Some(inner));
        assert_eq!(hit_test(&store, &surfaces, Point::new(5.0, 5.0)), Some(under));
    }

    #[test]
    fn ancestor_clip_rejects_points() {
        let (mut store, root) = scene();
        let clipper = store.create_layer();
        store.add_child(root, clipper);
        store.set_transform(clipper, Affine::translate((10.0, 10.0)));
        store.set_clip(clipper, Some(ClipShape::Rect(Rect::new(0.0, 0.0, 30.0, 30.0))));
        let child = drawable(&mut store, clipper, Rect::new(0.0, 0.0, 100.0, 100.0));
        let _ = store.evaluate();
        let surfaces = RenderSurfaceList::build(&store, root);

        assert_eq!(hit_test(&store, &surfaces, Point::new(20.0, 20.0)), Some(child));
        assert_eq!(
            hit_test(&store, &surfaces, Point::new(60.0, 60.0)),
            None,
            "inside the child but outside the parent's clip"
        );
    }

    #[test]
    fn degenerate_transform_is_never_hit() {
        let (mut store, root) = scene();
        let flat = drawable(&mut store, root, Rect::new(0.0, 0.0, 100.0, 100.0));
        store.set_transform(flat, Affine::scale_non_uniform(1.0, 0.0));
        let _ = store.evaluate();
        let surfaces = RenderSurfaceList::build(&store, root);

        assert_eq!(hit_test(&store, &surfaces, Point::new(10.0, 0.0)), None);
    }

    #[test]
    fn hidden_layers_are_not_hit() {
        let (mut store, root) = scene();
        let under = drawable(&mut store, root, Rect::new(0.0, 0.0, 100.0, 100.0));
        let over = drawable(&mut store, root, Rect::new(0.0, 0.0, 100.0, 100.0));
        store.set_flags(
            over,
            LayerFlags {
                hidden: true,
                ..LayerFlags::default()
            },
        );
        let _ = store.evaluate();
        let surfaces = RenderSurfaceList::build(&store, root);

        assert_eq!(hit_test(&store, &surfaces, Point::new(50.0, 50.0)), Some(under));
    }
}
