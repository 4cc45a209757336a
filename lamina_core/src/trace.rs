// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracing and diagnostics for tile-management passes.
//!
//! [`TraceSink`] has one method per event emitted by
//! [`TileManager::manage_tiles`](crate::tile::TileManager::manage_tiles). All
//! method bodies default to no-ops, so implementing only the events you care
//! about is fine.
//!
//! [`Tracer`] wraps an optional `&mut dyn TraceSink`. When the `trace` feature
//! is **off**, every `Tracer` method compiles to nothing. When **on**, each
//! method performs a single `Option` branch before dispatching.
//!
//! # Crate features
//!
//! - `trace` — enables the `Tracer` method bodies (one branch per call).
//! - `trace-rich` (implies `trace`) — gates per-tile [`TileDecision`] events
//!   and the corresponding `TraceSink` method.

use crate::tile::{GlobalState, NUM_BINS};
#[cfg(feature = "trace-rich")]
use crate::tile::ManagedTileBin;

// ---------------------------------------------------------------------------
// Event structs
// ---------------------------------------------------------------------------

/// Emitted when a pass starts, before any tile is re-binned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ManageTilesBeginEvent {
    /// Monotonic pass counter, starting at 1.
    pub pass: u64,
    /// Number of live tiles.
    pub tile_count: usize,
    /// The global state the pass reads.
    pub global_state: GlobalState,
}

/// Emitted after every tile has been binned and sorted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BinsAssignedEvent {
    /// Pass counter.
    pub pass: u64,
    /// Tiles per high-priority bin, indexed by
    /// [`ManagedTileBin::index`](crate::tile::ManagedTileBin::index).
    pub bin_counts: [usize; NUM_BINS],
}

/// Emitted after memory has been assigned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MemoryAssignedEvent {
    /// Pass counter.
    pub pass: u64,
    /// Bytes held by approved tiles.
    pub bytes_allocated: u64,
    /// The budget for this pass.
    pub bytes_limit: u64,
    /// Bytes of `Now` tiles that did not fit.
    pub bytes_over_in_now_bin: u64,
    /// Tiles granted memory.
    pub tiles_approved: usize,
    /// Tiles refused memory.
    pub tiles_oomed: usize,
    /// Activation-critical tiles approved by evicting lower priority ones.
    pub tiles_recovered: usize,
    /// Length of the raster queue.
    pub raster_queue_len: usize,
}

/// The outcome for one tile in a pass.
#[cfg(feature = "trace-rich")]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TileDecision {
    /// Slot index of the tile.
    pub tile_index: u32,
    /// High-priority bin.
    pub high_bin: ManagedTileBin,
    /// Low-priority bin.
    pub low_bin: ManagedTileBin,
    /// Whether the tile was granted memory.
    pub approved: bool,
    /// The tile's memory cost.
    pub bytes: u64,
}

// ---------------------------------------------------------------------------
// TraceSink trait
// ---------------------------------------------------------------------------

/// Receives trace events from tile-management passes.
///
/// All methods have default no-op implementations.
pub trait TraceSink {
    /// Called when a pass starts.
    fn on_manage_tiles_begin(&mut self, e: &ManageTilesBeginEvent) {
        _ = e;
    }

    /// Called once every tile has a bin.
    fn on_bins_assigned(&mut self, e: &BinsAssignedEvent) {
        _ = e;
    }

    /// Called once memory has been assigned.
    fn on_memory_assigned(&mut self, e: &MemoryAssignedEvent) {
        _ = e;
    }

    /// Called with every tile's outcome, in priority order (requires
    /// `trace-rich` feature).
    #[cfg(feature = "trace-rich")]
    fn on_tile_decisions(&mut self, pass: u64, decisions: &[TileDecision]) {
        _ = (pass, decisions);
    }
}

// ---------------------------------------------------------------------------
// NoopSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {}

// ---------------------------------------------------------------------------
// Tracer wrapper
// ---------------------------------------------------------------------------

/// Thin wrapper around an optional [`TraceSink`].
///
/// When the `trace` feature is **off**, every method compiles to nothing. When
/// **on**, each method checks the inner `Option` (one branch) before
/// dispatching to the sink.
pub struct Tracer<'a> {
    #[cfg(feature = "trace")]
    sink: Option<&'a mut dyn TraceSink>,
    #[cfg(not(feature = "trace"))]
    _marker: core::marker::PhantomData<&'a mut dyn TraceSink>,
}

impl core::fmt::Debug for Tracer<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tracer").finish_non_exhaustive()
    }
}

impl<'a> Tracer<'a> {
    /// Creates a tracer that dispatches to the given sink.
    #[inline]
    #[must_use]
    pub fn new(sink: &'a mut dyn TraceSink) -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: Some(sink) }
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = sink;
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Creates a tracer that discards all events.
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: None }
        }
        #[cfg(not(feature = "trace"))]
        {
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Returns whether events reach a sink.
    ///
    /// Lets callers skip building event payloads nobody will read.
    #[inline]
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        #[cfg(feature = "trace")]
        {
            self.sink.is_some()
        }
        #[cfg(not(feature = "trace"))]
        {
            false
        }
    }

    /// Emits a [`ManageTilesBeginEvent`].
    #[inline]
    pub fn manage_tiles_begin(&mut self, e: &ManageTilesBeginEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_manage_tiles_begin(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`BinsAssignedEvent`].
    #[inline]
    pub fn bins_assigned(&mut self, e: &BinsAssignedEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_bins_assigned(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`MemoryAssignedEvent`].
    #[inline]
    pub fn memory_assigned(&mut self, e: &MemoryAssignedEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_memory_assigned(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits per-tile decisions (requires `trace-rich` feature).
    #[cfg(feature = "trace-rich")]
    #[inline]
    pub fn tile_decisions(&mut self, pass: u64, decisions: &[TileDecision]) {
        if let Some(s) = &mut self.sink {
            s.on_tile_decisions(pass, decisions);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tile::{MemoryLimitPolicy, TreePriority};

    fn sample_begin() -> ManageTilesBeginEvent {
        ManageTilesBeginEvent {
            pass: 3,
            tile_count: 12,
            global_state: GlobalState::new(
                1 << 20,
                MemoryLimitPolicy::AllowPrepaintOnly,
                TreePriority::SmoothnessTakesPriority,
            ),
        }
    }

    #[test]
    fn noop_sink_compiles() {
        let mut sink = NoopSink;
        sink.on_manage_tiles_begin(&sample_begin());
        sink.on_bins_assigned(&BinsAssignedEvent {
            pass: 3,
            bin_counts: [0; NUM_BINS],
        });
    }

    #[test]
    fn tracer_none_does_nothing() {
        let mut tracer = Tracer::none();
        assert!(!tracer.is_enabled());
        tracer.manage_tiles_begin(&sample_begin());
    }

    #[cfg(feature = "trace")]
    #[test]
    fn tracer_dispatches_to_sink() {
        use alloc::vec::Vec;

        struct RecordingSink {
            passes: Vec<u64>,
        }
        impl TraceSink for RecordingSink {
            fn on_manage_tiles_begin(&mut self, e: &ManageTilesBeginEvent) {
                self.passes.push(e.pass);
            }
        }

        let mut sink = RecordingSink { passes: Vec::new() };
        let mut tracer = Tracer::new(&mut sink);
        assert!(tracer.is_enabled());
        tracer.manage_tiles_begin(&sample_begin());
        drop(tracer);
        assert_eq!(sink.passes, &[3]);
    }
}
