// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable trace output.
//!
//! [`PrettyPrintSink`] implements [`TraceSink`] and writes one line per event
//! to a [`Write`](std::io::Write) destination (default: stderr).

use std::io::Write;

use lamina_core::tile::{ManagedTileBin, MemoryLimitPolicy, TreePriority};
use lamina_core::trace::{
    BinsAssignedEvent, ManageTilesBeginEvent, MemoryAssignedEvent, TileDecision, TraceSink,
};

/// Writes human-readable trace lines to a [`Write`](std::io::Write) destination.
pub struct PrettyPrintSink<W: Write = Box<dyn Write>> {
    writer: W,
}

impl<W: Write> std::fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrettyPrintSink").finish_non_exhaustive()
    }
}

impl PrettyPrintSink {
    /// Creates a sink that writes to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self {
            writer: Box::new(std::io::stderr()),
        }
    }

    /// Creates a sink that writes to a boxed writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write>) -> Self {
        Self { writer }
    }
}

impl<W: Write> PrettyPrintSink<W> {
    /// Creates a sink that writes to the given destination.
    #[must_use]
    pub fn with_writer(writer: W) -> Self {
        Self { writer }
    }

    /// Consumes the sink and returns the destination.
    #[must_use]
    pub fn into_inner(self) -> W {
        self.writer
    }
}

fn policy_name(policy: MemoryLimitPolicy) -> &'static str {
    match policy {
        MemoryLimitPolicy::AllowNothing => "nothing",
        MemoryLimitPolicy::AllowAbsoluteMinimum => "minimum",
        MemoryLimitPolicy::AllowPrepaintOnly => "prepaint",
        MemoryLimitPolicy::AllowAnything => "anything",
    }
}

fn tree_priority_name(priority: TreePriority) -> &'static str {
    match priority {
        TreePriority::SamePriorityForBothTrees => "same",
        TreePriority::SmoothnessTakesPriority => "smoothness",
        TreePriority::NewContentTakesPriority => "new_content",
    }
}

fn kib(bytes: u64) -> f64 {
    bytes as f64 / 1024.0
}

impl<W: Write> TraceSink for PrettyPrintSink<W> {
    fn on_manage_tiles_begin(&mut self, e: &ManageTilesBeginEvent) {
        let _ = writeln!(
            self.writer,
            "[begin] pass={} tiles={} limit={:.1}KiB policy={} tree={}",
            e.pass,
            e.tile_count,
            kib(e.global_state.memory_limit_in_bytes),
            policy_name(e.global_state.memory_limit_policy),
            tree_priority_name(e.global_state.tree_priority),
        );
    }

    fn on_bins_assigned(&mut self, e: &BinsAssignedEvent) {
        let mut line = format!("[bins] pass={}", e.pass);
        for bin in ManagedTileBin::ALL {
            let count = e.bin_counts[bin.index()];
            if count > 0 {
                line.push_str(&format!(" {}={count}", bin.name()));
            }
        }
        let _ = writeln!(self.writer, "{line}");
    }

    fn on_memory_assigned(&mut self, e: &MemoryAssignedEvent) {
        let _ = writeln!(
            self.writer,
            "[memory] pass={} used={:.1}/{:.1}KiB over_now={:.1}KiB \
             approved={} oomed={} recovered={} raster={}",
            e.pass,
            kib(e.bytes_allocated),
            kib(e.bytes_limit),
            kib(e.bytes_over_in_now_bin),
            e.tiles_approved,
            e.tiles_oomed,
            e.tiles_recovered,
            e.raster_queue_len,
        );
    }

    fn on_tile_decisions(&mut self, pass: u64, decisions: &[TileDecision]) {
        let approved = decisions.iter().filter(|d| d.approved).count();
        let _ = writeln!(
            self.writer,
            "[tiles] pass={pass} decisions={} approved={approved}",
            decisions.len(),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lamina_core::tile::{GlobalState, NUM_BINS};

    fn output(sink: PrettyPrintSink<Vec<u8>>) -> String {
        String::from_utf8(sink.into_inner()).unwrap()
    }

    #[test]
    fn pretty_print_begin() {
        let mut sink = PrettyPrintSink::with_writer(Vec::<u8>::new());
        sink.on_manage_tiles_begin(&ManageTilesBeginEvent {
            pass: 4,
            tile_count: 120,
            global_state: GlobalState::new(
                2048,
                MemoryLimitPolicy::AllowPrepaintOnly,
                TreePriority::SmoothnessTakesPriority,
            ),
        });
        let output = output(sink);
        assert!(output.starts_with("[begin]"), "got: {output}");
        assert!(output.contains("pass=4"), "got: {output}");
        assert!(output.contains("limit=2.0KiB"), "got: {output}");
        assert!(output.contains("policy=prepaint"), "got: {output}");
    }

    #[test]
    fn pretty_print_bins_skips_empty() {
        let mut sink = PrettyPrintSink::with_writer(Vec::<u8>::new());
        let mut bin_counts = [0; NUM_BINS];
        bin_counts[ManagedTileBin::Now.index()] = 3;
        bin_counts[ManagedTileBin::Never.index()] = 9;
        sink.on_bins_assigned(&BinsAssignedEvent { pass: 1, bin_counts });
        let output = output(sink);
        assert_eq!(output, "[bins] pass=1 now=3 never=9\n");
    }

    #[test]
    fn pretty_print_decisions_counts_approvals() {
        let mut sink = PrettyPrintSink::with_writer(Vec::<u8>::new());
        let decision = |approved| TileDecision {
            tile_index: 0,
            high_bin: ManagedTileBin::Soon,
            low_bin: ManagedTileBin::Never,
            approved,
            bytes: 64,
        };
        sink.on_tile_decisions(2, &[decision(true), decision(false), decision(true)]);
        let output = output(sink);
        assert!(output.contains("decisions=3 approved=2"), "got: {output}");
    }
}
