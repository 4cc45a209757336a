// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Render-pass planning and hit testing for lamina.
//!
//! This crate turns an evaluated [`LayerStore`] and its
//! [`RenderSurfaceList`] into the two walks a compositor needs every frame:
//!
//! - [`RenderPlan`]: one [`RenderPass`] per render surface, built in paint
//!   order, with every pass placed before the pass that composites it.
//! - [`hit_test`]: the top-most drawable layer under a point, found in
//!   hit-test order.
//!
//! Both are driven by [`LayerIterator`](lamina_core::iterator::LayerIterator).
//!
//! [`LayerStore`]: lamina_core::layer::LayerStore
//! [`RenderSurfaceList`]: lamina_core::layer::RenderSurfaceList

#![no_std]
#![cfg_attr(docsrs, feature(doc_cfg))]

extern crate alloc;

mod hit;
mod plan;

pub use hit::{hit_test, hit_test_all};
pub use plan::{RenderItem, RenderPass, RenderPlan};
