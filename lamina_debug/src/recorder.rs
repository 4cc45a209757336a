// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compact binary event recording and decoding.
//!
//! [`RecorderSink`] implements [`TraceSink`] and encodes events into a
//! `Vec<u8>` as fixed-size little-endian records, each stamped with the
//! microseconds elapsed since the recorder was created. [`decode`] reads them
//! back as an iterator of [`RecordedEvent`].
//!
//! Per-tile decisions ([`on_tile_decisions`](TraceSink::on_tile_decisions))
//! store only totals.

use std::time::Instant;

use lamina_core::tile::{GlobalState, MemoryLimitPolicy, NUM_BINS, TreePriority};
use lamina_core::trace::{
    BinsAssignedEvent, ManageTilesBeginEvent, MemoryAssignedEvent, TileDecision, TraceSink,
};

// ---------------------------------------------------------------------------
// Event type discriminants
// ---------------------------------------------------------------------------

const TAG_MANAGE_TILES_BEGIN: u8 = 1;
const TAG_BINS_ASSIGNED: u8 = 2;
const TAG_MEMORY_ASSIGNED: u8 = 3;
const TAG_TILE_DECISIONS_SUMMARY: u8 = 4;

// ---------------------------------------------------------------------------
// RecorderSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that encodes events into a compact binary buffer.
#[derive(Debug)]
pub struct RecorderSink {
    buf: Vec<u8>,
    origin: Instant,
}

impl Default for RecorderSink {
    fn default() -> Self {
        Self::new()
    }
}

impl RecorderSink {
    /// Creates an empty recorder whose clock starts now.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buf: Vec::new(),
            origin: Instant::now(),
        }
    }

    /// Returns a view of the recorded bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consumes the recorder and returns the recorded bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    // -- encoding helpers --------------------------------------------------

    fn write_header(&mut self, tag: u8, pass: u64) {
        let elapsed = u64::try_from(self.origin.elapsed().as_micros()).unwrap_or(u64::MAX);
        self.write_u8(tag);
        self.write_u64(elapsed);
        self.write_u64(pass);
    }

    fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    /// Writes a count, saturating at `u32::MAX`.
    fn write_count(&mut self, v: usize) {
        self.write_u32(u32::try_from(v).unwrap_or(u32::MAX));
    }

    fn write_policy(&mut self, p: MemoryLimitPolicy) {
        self.write_u8(match p {
            MemoryLimitPolicy::AllowNothing => 0,
            MemoryLimitPolicy::AllowAbsoluteMinimum => 1,
            MemoryLimitPolicy::AllowPrepaintOnly => 2,
            MemoryLimitPolicy::AllowAnything => 3,
        });
    }

    fn write_tree_priority(&mut self, p: TreePriority) {
        self.write_u8(match p {
            TreePriority::SamePriorityForBothTrees => 0,
            TreePriority::SmoothnessTakesPriority => 1,
            TreePriority::NewContentTakesPriority => 2,
        });
    }
}

impl TraceSink for RecorderSink {
    fn on_manage_tiles_begin(&mut self, e: &ManageTilesBeginEvent) {
        self.write_header(TAG_MANAGE_TILES_BEGIN, e.pass);
        self.write_count(e.tile_count);
        self.write_u64(e.global_state.memory_limit_in_bytes);
        self.write_policy(e.global_state.memory_limit_policy);
        self.write_tree_priority(e.global_state.tree_priority);
    }

    fn on_bins_assigned(&mut self, e: &BinsAssignedEvent) {
        self.write_header(TAG_BINS_ASSIGNED, e.pass);
        for &count in &e.bin_counts {
            self.write_count(count);
        }
    }

    fn on_memory_assigned(&mut self, e: &MemoryAssignedEvent) {
        self.write_header(TAG_MEMORY_ASSIGNED, e.pass);
        self.write_u64(e.bytes_allocated);
        self.write_u64(e.bytes_limit);
        self.write_u64(e.bytes_over_in_now_bin);
        self.write_count(e.tiles_approved);
        self.write_count(e.tiles_oomed);
        self.write_count(e.tiles_recovered);
        self.write_count(e.raster_queue_len);
    }

    fn on_tile_decisions(&mut self, pass: u64, decisions: &[TileDecision]) {
        self.write_header(TAG_TILE_DECISIONS_SUMMARY, pass);
        self.write_count(decisions.len());
        self.write_count(decisions.iter().filter(|d| d.approved).count());
        self.write_u64(
            decisions
                .iter()
                .filter(|d| d.approved)
                .map(|d| d.bytes)
                .sum(),
        );
    }
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

/// A decoded event from a binary recording.
#[derive(Clone, Debug)]
pub enum RecordedEvent {
    /// A [`ManageTilesBeginEvent`].
    ManageTilesBegin {
        /// Microseconds since the recorder was created.
        at_us: u64,
        /// The event.
        event: ManageTilesBeginEvent,
    },
    /// A [`BinsAssignedEvent`].
    BinsAssigned {
        /// Microseconds since the recorder was created.
        at_us: u64,
        /// The event.
        event: BinsAssignedEvent,
    },
    /// A [`MemoryAssignedEvent`].
    MemoryAssigned {
        /// Microseconds since the recorder was created.
        at_us: u64,
        /// The event.
        event: MemoryAssignedEvent,
    },
    /// Totals of one pass's per-tile decisions.
    TileDecisionsSummary {
        /// Microseconds since the recorder was created.
        at_us: u64,
        /// Pass counter.
        pass: u64,
        /// Number of decisions.
        count: u32,
        /// Number of approved tiles.
        approved: u32,
        /// Bytes held by approved tiles.
        approved_bytes: u64,
    },
}

impl RecordedEvent {
    /// Returns the record's timestamp in microseconds.
    #[must_use]
    pub fn at_us(&self) -> u64 {
        match self {
            Self::ManageTilesBegin { at_us, .. }
            | Self::BinsAssigned { at_us, .. }
            | Self::MemoryAssigned { at_us, .. }
            | Self::TileDecisionsSummary { at_us, .. } => *at_us,
        }
    }

    /// Returns the pass the record belongs to.
    #[must_use]
    pub fn pass(&self) -> u64 {
        match self {
            Self::ManageTilesBegin { event, .. } => event.pass,
            Self::BinsAssigned { event, .. } => event.pass,
            Self::MemoryAssigned { event, .. } => event.pass,
            Self::TileDecisionsSummary { pass, .. } => *pass,
        }
    }
}

/// Decodes a byte slice produced by [`RecorderSink`] into an iterator of
/// [`RecordedEvent`].
///
/// Iteration stops at the first unknown tag or truncated record.
pub fn decode(bytes: &[u8]) -> DecodeIter<'_> {
    DecodeIter {
        data: bytes,
        pos: 0,
    }
}

/// Iterator over decoded events.
#[derive(Debug)]
pub struct DecodeIter<'a> {
    data: &'a [u8],
    pos: usize,
}

impl DecodeIter<'_> {
    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn read_u8(&mut self) -> Option<u8> {
        if self.remaining() < 1 {
            return None;
        }
        let v = self.data[self.pos];
        self.pos += 1;
        Some(v)
    }

    fn read_u32(&mut self) -> Option<u32> {
        if self.remaining() < 4 {
            return None;
        }
        let v = u32::from_le_bytes(self.data[self.pos..self.pos + 4].try_into().ok()?);
        self.pos += 4;
        Some(v)
    }

    fn read_u64(&mut self) -> Option<u64> {
        if self.remaining() < 8 {
            return None;
        }
        let v = u64::from_le_bytes(self.data[self.pos..self.pos + 8].try_into().ok()?);
        self.pos += 8;
        Some(v)
    }

    fn read_count(&mut self) -> Option<usize> {
        usize::try_from(self.read_u32()?).ok()
    }

    fn read_policy(&mut self) -> Option<MemoryLimitPolicy> {
        Some(match self.read_u8()? {
            0 => MemoryLimitPolicy::AllowNothing,
            1 => MemoryLimitPolicy::AllowAbsoluteMinimum,
            2 => MemoryLimitPolicy::AllowPrepaintOnly,
            _ => MemoryLimitPolicy::AllowAnything,
        })
    }

    fn read_tree_priority(&mut self) -> Option<TreePriority> {
        Some(match self.read_u8()? {
            0 => TreePriority::SamePriorityForBothTrees,
            1 => TreePriority::SmoothnessTakesPriority,
            _ => TreePriority::NewContentTakesPriority,
        })
    }

    fn decode_manage_tiles_begin(&mut self, at_us: u64, pass: u64) -> Option<RecordedEvent> {
        let tile_count = self.read_count()?;
        let memory_limit_in_bytes = self.read_u64()?;
        let memory_limit_policy = self.read_policy()?;
        let tree_priority = self.read_tree_priority()?;
        Some(RecordedEvent::ManageTilesBegin {
            at_us,
            event: ManageTilesBeginEvent {
                pass,
                tile_count,
                global_state: GlobalState::new(
                    memory_limit_in_bytes,
                    memory_limit_policy,
                    tree_priority,
                ),
            },
        })
    }

    fn decode_bins_assigned(&mut self, at_us: u64, pass: u64) -> Option<RecordedEvent> {
        let mut bin_counts = [0; NUM_BINS];
        for count in &mut bin_counts {
            *count = self.read_count()?;
        }
        Some(RecordedEvent::BinsAssigned {
            at_us,
            event: BinsAssignedEvent { pass, bin_counts },
        })
    }

    fn decode_memory_assigned(&mut self, at_us: u64, pass: u64) -> Option<RecordedEvent> {
        Some(RecordedEvent::MemoryAssigned {
            at_us,
            event: MemoryAssignedEvent {
                pass,
                bytes_allocated: self.read_u64()?,
                bytes_limit: self.read_u64()?,
                bytes_over_in_now_bin: self.read_u64()?,
                tiles_approved: self.read_count()?,
                tiles_oomed: self.read_count()?,
                tiles_recovered: self.read_count()?,
                raster_queue_len: self.read_count()?,
            },
        })
    }

    fn decode_tile_decisions_summary(&mut self, at_us: u64, pass: u64) -> Option<RecordedEvent> {
        Some(RecordedEvent::TileDecisionsSummary {
            at_us,
            pass,
            count: self.read_u32()?,
            approved: self.read_u32()?,
            approved_bytes: self.read_u64()?,
        })
    }
}

impl Iterator for DecodeIter<'_> {
    type Item = RecordedEvent;

    fn next(&mut self) -> Option<Self::Item> {
        let tag = self.read_u8()?;
        let at_us = self.read_u64()?;
        let pass = self.read_u64()?;
        match tag {
            TAG_MANAGE_TILES_BEGIN => self.decode_manage_tiles_begin(at_us, pass),
            TAG_BINS_ASSIGNED => self.decode_bins_assigned(at_us, pass),
            TAG_MEMORY_ASSIGNED => self.decode_memory_assigned(at_us, pass),
            TAG_TILE_DECISIONS_SUMMARY => self.decode_tile_decisions_summary(at_us, pass),
            _ => None, // unknown tag → stop iteration
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use lamina_core::tile::ManagedTileBin;

    fn sample_begin() -> ManageTilesBeginEvent {
        ManageTilesBeginEvent {
            pass: 7,
            tile_count: 1500,
            global_state: GlobalState::new(
                64 << 20,
                MemoryLimitPolicy::AllowAbsoluteMinimum,
                TreePriority::NewContentTakesPriority,
            ),
        }
    }

    fn sample_memory() -> MemoryAssignedEvent {
        MemoryAssignedEvent {
            pass: 7,
            bytes_allocated: 48 << 20,
            bytes_limit: 64 << 20,
            bytes_over_in_now_bin: 4096,
            tiles_approved: 190,
            tiles_oomed: 3,
            tiles_recovered: 1,
            raster_queue_len: 40,
        }
    }

    #[test]
    fn begin_event_keeps_global_state() {
        let mut rec = RecorderSink::new();
        let orig = sample_begin();
        rec.on_manage_tiles_begin(&orig);

        let events: Vec<_> = decode(rec.as_bytes()).collect();
        assert_eq!(events.len(), 1);
        match &events[0] {
            RecordedEvent::ManageTilesBegin { event, .. } => assert_eq!(*event, orig),
            other => panic!("expected ManageTilesBegin, got {other:?}"),
        }
    }

    #[test]
    fn full_pass_decodes_in_order() {
        let mut rec = RecorderSink::new();
        rec.on_manage_tiles_begin(&sample_begin());
        let mut bin_counts = [0; NUM_BINS];
        bin_counts[ManagedTileBin::Soon.index()] = 12;
        rec.on_bins_assigned(&BinsAssignedEvent { pass: 7, bin_counts });
        let decision = |approved, bytes| TileDecision {
            tile_index: 1,
            high_bin: ManagedTileBin::Soon,
            low_bin: ManagedTileBin::Never,
            approved,
            bytes,
        };
        rec.on_tile_decisions(7, &[decision(true, 100), decision(false, 50), decision(true, 8)]);
        rec.on_memory_assigned(&sample_memory());

        let events: Vec<_> = decode(rec.as_bytes()).collect();
        assert_eq!(events.len(), 4);
        assert!(events.iter().all(|e| e.pass() == 7));
        assert!(
            events.windows(2).all(|w| w[0].at_us() <= w[1].at_us()),
            "timestamps are monotonic"
        );
        match &events[1] {
            RecordedEvent::BinsAssigned { event, .. } => {
                assert_eq!(event.bin_counts[ManagedTileBin::Soon.index()], 12);
            }
            other => panic!("expected BinsAssigned, got {other:?}"),
        }
        match &events[2] {
            RecordedEvent::TileDecisionsSummary {
                count,
                approved,
                approved_bytes,
                ..
            } => {
                assert_eq!((*count, *approved, *approved_bytes), (3, 2, 108));
            }
            other => panic!("expected TileDecisionsSummary, got {other:?}"),
        }
        match &events[3] {
            RecordedEvent::MemoryAssigned { event, .. } => assert_eq!(*event, sample_memory()),
            other => panic!("expected MemoryAssigned, got {other:?}"),
        }
    }

    #[test]
    fn truncated_record_stops_decoding() {
        let mut rec = RecorderSink::new();
        rec.on_manage_tiles_begin(&sample_begin());
        rec.on_memory_assigned(&sample_memory());
        let bytes = rec.into_bytes();

        let events: Vec<_> = decode(&bytes[..bytes.len() - 3]).collect();
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], RecordedEvent::ManageTilesBegin { .. }));
    }

    #[test]
    fn empty_buffer_decodes_to_nothing() {
        let events: Vec<_> = decode(&[]).collect();
        assert!(events.is_empty());
    }
}
