// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Layer iteration over render surfaces and priority-binned tile scheduling.
//!
//! `lamina_core` is the traversal and scheduling heart of a compositor. It is
//! `no_std` compatible (with `alloc`), stores layers in struct-of-arrays form
//! addressed by generational handles, and performs every per-frame pass
//! without recursion.
//!
//! # Architecture
//!
//! A frame flows through the crate like this:
//!
//! ```text
//!   host mutations ──► LayerStore::evaluate() ──► RenderSurfaceList::build()
//!                                                        │
//!                       ┌────────────────────────────────┘
//!                       ▼
//!                 LayerIterator (back-to-front / front-to-back)
//!                       │
//!   PictureLayerTiling::update_tile_priorities() ──► TileManager::manage_tiles()
//!                                                        │
//!                                                        ▼
//!                                  bins, approvals, raster queue, MemoryStats
//! ```
//!
//! **[`layer`]** — Struct-of-arrays layer tree with generational handles, and
//! the [`RenderSurfaceList`](layer::RenderSurfaceList) that partitions an
//! evaluated tree into render-surface subtrees.
//!
//! **[`dirty`]** — Multi-channel dirty tracking via `understory_dirty`.
//!
//! **[`iterator`]** — [`LayerIterator`](iterator::LayerIterator), a
//! non-recursive walk over any [`RenderSurfaceTree`](iterator::RenderSurfaceTree)
//! in paint order or hit-test order.
//!
//! **[`scrollbar`]** — Contents scale and part rects for scrollbar layers,
//! clamped to the device's maximum texture size.
//!
//! **[`tile`]** — Tiles, per-tree [`TilePriority`](tile::TilePriority), the
//! [`ManagedTileBin`](tile::ManagedTileBin) classification, layer tilings, and
//! the [`TileManager`](tile::TileManager) that authorizes raster work under a
//! memory budget.
//!
//! **[`trace`]** — [`TraceSink`](trace::TraceSink) trait and event types for
//! scheduling-pass instrumentation, with a zero-overhead
//! [`Tracer`](trace::Tracer) wrapper.
//!
//! # Crate features
//!
//! - `std` (disabled by default): Enables `std` support in dependencies.
//! - `trace` (disabled by default): Enables `Tracer` method bodies (one branch
//!   per call site).
//! - `trace-rich` (disabled by default, implies `trace`): Gates per-tile
//!   decision events.

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;

pub mod dirty;
pub mod iterator;
pub mod layer;
pub mod scrollbar;
pub mod tile;
pub mod trace;
