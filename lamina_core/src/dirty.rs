// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Dirty-tracking channel constants.
//!
//! The layer store uses multi-channel dirty tracking (via [`understory_dirty`])
//! so that evaluation only touches layers whose inputs changed.
//!
//! # Propagation semantics
//!
//! - **Propagating** — [`TRANSFORM`] and [`OPACITY`] use
//!   [`EagerPolicy`](understory_dirty::EagerPolicy) and carry child-to-parent
//!   dependency edges, so marking a layer also marks its descendants. Hidden
//!   flag changes ride on [`TRANSFORM`] so one drain recomputes world
//!   transforms and effective hidden state together.
//!
//! - **Local-only** — [`CLIP`] and [`CONTENT`] mark only the mutated layer.
//!   Bounds changes are reported through [`CONTENT`] since both invalidate
//!   the layer's tiling.
//!
//! - **Structural** — [`TOPOLOGY`] is marked on create/destroy and on every
//!   parent/child change. Render-surface membership depends on topology, so
//!   a topology change is the signal to rebuild the
//!   [`RenderSurfaceList`](crate::layer::RenderSurfaceList).

use understory_dirty::Channel;

/// Transform or hidden flag changed.
pub const TRANSFORM: Channel = Channel::new(0);

/// Opacity changed. May also promote or demote a render surface.
pub const OPACITY: Channel = Channel::new(1);

/// Clip shape changed.
pub const CLIP: Channel = Channel::new(2);

/// Content or bounds changed; the layer's tiles need re-rasterization.
pub const CONTENT: Channel = Channel::new(3);

/// Tree topology changed.
pub const TOPOLOGY: Channel = Channel::new(4);
