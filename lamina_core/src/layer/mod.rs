// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Layer tree data model.
//!
//! A *layer* is a node in a compositing tree. Each layer has:
//!
//! - An identity ([`LayerId`]): a generational handle that becomes stale when
//!   the layer is destroyed.
//! - Topology: parent, first-child, and sibling links forming an ordered tree.
//!   Later siblings paint in front of earlier ones.
//! - **Local properties** set by the host: [`transform`](LayerStore::set_transform),
//!   [`opacity`](LayerStore::set_opacity), [`bounds`](LayerStore::set_bounds),
//!   [`clip`](LayerStore::set_clip), [`content`](LayerStore::set_content), and
//!   [`flags`](LayerStore::set_flags).
//! - **Computed properties** produced by [`evaluate`](LayerStore::evaluate):
//!   `world_transform`, `effective_opacity` and `effective_hidden`.
//!
//! After evaluation, [`RenderSurfaceList::build`] partitions the tree into
//! render surfaces. A layer owns a surface when it is the root of the build,
//! when it is isolated, or when it is translucent and has children; every
//! drawable layer lands in exactly one surface's layer list.

mod clip;
mod evaluate;
mod id;
mod store;
mod surface;
mod traverse;

pub use clip::ClipShape;
pub use evaluate::FrameChanges;
pub use id::{ContentId, INVALID, LayerId};
pub use store::{LayerFlags, LayerStore};
pub use surface::{RenderSurface, RenderSurfaceList};
pub use traverse::Children;
