// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Chrome Trace Event Format exporter.
//!
//! [`export`] reads recorded bytes from a [`RecorderSink`](super::recorder::RecorderSink)
//! and writes [Chrome Trace Event Format][spec] JSON to the given writer.
//!
//! Each pass becomes a `manage_tiles` duration slice (begin to memory
//! assignment) with bin occupancy and memory use as counter tracks.
//!
//! [spec]: https://docs.google.com/document/d/1CvAClvFfyA5R-PhYUmn5OOQtYMH4h6I0nSsKchNAySU

use std::io::{self, Write};

use serde_json::{Map, Value, json};

use lamina_core::tile::ManagedTileBin;

use crate::recorder::{RecordedEvent, decode};

/// Exports recorded events as Chrome Trace Event Format JSON.
///
/// The output is a complete JSON array of trace event objects, suitable for
/// loading into `chrome://tracing` or [Perfetto](https://ui.perfetto.dev/).
pub fn export(bytes: &[u8], writer: &mut dyn Write) -> io::Result<()> {
    let mut events: Vec<Value> = Vec::new();

    for recorded in decode(bytes) {
        let ts = recorded.at_us();
        match recorded {
            RecordedEvent::ManageTilesBegin { event, .. } => {
                events.push(json!({
                    "ph": "B",
                    "name": "manage_tiles",
                    "cat": "TileManager",
                    "ts": ts,
                    "pid": 0,
                    "tid": 0,
                    "args": {
                        "pass": event.pass,
                        "tile_count": event.tile_count,
                        "memory_limit_in_bytes": event.global_state.memory_limit_in_bytes,
                        "memory_limit_policy": format!("{:?}", event.global_state.memory_limit_policy),
                        "tree_priority": format!("{:?}", event.global_state.tree_priority),
                    }
                }));
            }
            RecordedEvent::BinsAssigned { event, .. } => {
                let mut args = Map::new();
                for bin in ManagedTileBin::ALL {
                    args.insert(bin.name().into(), json!(event.bin_counts[bin.index()]));
                }
                events.push(json!({
                    "ph": "C",
                    "name": "bins",
                    "cat": "TileManager",
                    "ts": ts,
                    "pid": 0,
                    "tid": 0,
                    "args": args,
                }));
            }
            RecordedEvent::MemoryAssigned { event, .. } => {
                events.push(json!({
                    "ph": "C",
                    "name": "memory",
                    "cat": "TileManager",
                    "ts": ts,
                    "pid": 0,
                    "tid": 0,
                    "args": {
                        "bytes_allocated": event.bytes_allocated,
                        "bytes_over_in_now_bin": event.bytes_over_in_now_bin,
                    }
                }));
                events.push(json!({
                    "ph": "E",
                    "name": "manage_tiles",
                    "cat": "TileManager",
                    "ts": ts,
                    "pid": 0,
                    "tid": 0,
                    "args": {
                        "pass": event.pass,
                        "bytes_limit": event.bytes_limit,
                        "tiles_approved": event.tiles_approved,
                        "tiles_oomed": event.tiles_oomed,
                        "tiles_recovered": event.tiles_recovered,
                        "raster_queue_len": event.raster_queue_len,
                    }
                }));
            }
            RecordedEvent::TileDecisionsSummary {
                pass,
                count,
                approved,
                approved_bytes,
                ..
            } => {
                events.push(json!({
                    "ph": "i",
                    "name": "TileDecisions",
                    "cat": "Rich",
                    "ts": ts,
                    "pid": 0,
                    "tid": 0,
                    "s": "t",
                    "args": {
                        "pass": pass,
                        "count": count,
                        "approved": approved,
                        "approved_bytes": approved_bytes,
                    }
                }));
            }
        }
    }

    serde_json::to_writer_pretty(writer, &events)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recorder::RecorderSink;
    use lamina_core::tile::{GlobalState, NUM_BINS};
    use lamina_core::trace::{
        BinsAssignedEvent, ManageTilesBeginEvent, MemoryAssignedEvent, TraceSink,
    };

    #[test]
    fn export_produces_valid_json() {
        let mut rec = RecorderSink::new();
        rec.on_manage_tiles_begin(&ManageTilesBeginEvent {
            pass: 1,
            tile_count: 10,
            global_state: GlobalState::with_limit(1 << 20),
        });
        let mut bin_counts = [0; NUM_BINS];
        bin_counts[ManagedTileBin::Now.index()] = 10;
        rec.on_bins_assigned(&BinsAssignedEvent { pass: 1, bin_counts });
        rec.on_memory_assigned(&MemoryAssignedEvent {
            pass: 1,
            bytes_allocated: 4096,
            bytes_limit: 1 << 20,
            bytes_over_in_now_bin: 0,
            tiles_approved: 10,
            tiles_oomed: 0,
            tiles_recovered: 0,
            raster_queue_len: 10,
        });

        let mut out = Vec::new();
        export(rec.as_bytes(), &mut out).unwrap();
        let json_str = String::from_utf8(out).unwrap();

        // Should parse as a JSON array.
        let parsed: Vec<Value> = serde_json::from_str(&json_str).unwrap();
        assert_eq!(parsed.len(), 4);

        assert_eq!(parsed[0]["ph"], "B");
        assert_eq!(parsed[0]["name"], "manage_tiles");
        assert_eq!(parsed[0]["args"]["memory_limit_policy"], "AllowAnything");

        assert_eq!(parsed[1]["ph"], "C");
        assert_eq!(parsed[1]["args"]["now"], 10);
        assert_eq!(parsed[1]["args"]["never"], 0);

        assert_eq!(parsed[2]["name"], "memory");
        assert_eq!(parsed[3]["ph"], "E");
        assert_eq!(parsed[3]["args"]["raster_queue_len"], 10);
    }

    #[test]
    fn export_empty_recording() {
        let mut out = Vec::new();
        export(&[], &mut out).unwrap();
        let json_str = String::from_utf8(out).unwrap();
        let parsed: Vec<Value> = serde_json::from_str(&json_str).unwrap();
        assert!(parsed.is_empty());
    }
}
