// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Simulated scroll that exercises the tile scheduler and the diagnostics
//! pipeline.
//!
//! A tall layer is tiled at high and low resolution, next to a scrollbar
//! tiled at its texture-clamped scale, and scrolled for 60 frames. Every frame updates both trees' tile priorities, runs a
//! `manage_tiles` pass traced to a
//! [`PrettyPrintSink`](lamina_debug::pretty::PrettyPrintSink) and a
//! [`RecorderSink`](lamina_debug::recorder::RecorderSink), and pretends to
//! rasterize a few queued tiles. A Chrome trace JSON file is written at the
//! end.

use std::fs::File;
use std::io::BufWriter;

use kurbo::{Affine, Point, Rect, Size};
use lamina_core::layer::{ContentId, LayerStore, RenderSurfaceList};
use lamina_core::scrollbar::{ScrollbarGeometry, ScrollbarOrientation};
use lamina_core::tile::{
    GlobalState, MemoryLimitPolicy, PictureLayerTiling, TileManager, TileManagerSettings,
    TileResolution, TreePriority, WhichTree,
};
use lamina_core::trace::{
    BinsAssignedEvent, ManageTilesBeginEvent, MemoryAssignedEvent, TileDecision, TraceSink,
    Tracer,
};
use lamina_debug::pretty::PrettyPrintSink;
use lamina_debug::recorder::RecorderSink;
use lamina_render::{RenderPlan, hit_test};

const FRAME_COUNT: u32 = 60;
const FRAME_SECONDS: f32 = 1.0 / 60.0;
const SCROLL_PER_FRAME: f64 = 40.0;
const TILE_SIZE: u32 = 256;
const VIEWPORT: Rect = Rect::new(0.0, 0.0, 800.0, 600.0);
const PAGE_HEIGHT: f64 = 12_000.0;
const SCROLLBAR_THICKNESS: f64 = 15.0;
/// Device pixel ratio the scrollbar is rasterized at.
const DEVICE_SCALE: f32 = 2.0;
/// Raster workers finish this many tiles per frame.
const RASTER_PER_FRAME: usize = 6;

/// Forwards every event to two sinks.
struct Tee<'a> {
    first: &'a mut dyn TraceSink,
    second: &'a mut dyn TraceSink,
}

impl TraceSink for Tee<'_> {
    fn on_manage_tiles_begin(&mut self, e: &ManageTilesBeginEvent) {
        self.first.on_manage_tiles_begin(e);
        self.second.on_manage_tiles_begin(e);
    }

    fn on_bins_assigned(&mut self, e: &BinsAssignedEvent) {
        self.first.on_bins_assigned(e);
        self.second.on_bins_assigned(e);
    }

    fn on_memory_assigned(&mut self, e: &MemoryAssignedEvent) {
        self.first.on_memory_assigned(e);
        self.second.on_memory_assigned(e);
    }

    fn on_tile_decisions(&mut self, pass: u64, decisions: &[TileDecision]) {
        self.first.on_tile_decisions(pass, decisions);
        self.second.on_tile_decisions(pass, decisions);
    }
}

fn main() {
    // -- layers ------------------------------------------------------------
    let mut store = LayerStore::new();
    let root = store.create_layer();
    store.set_bounds(root, VIEWPORT.size());
    let page = store.create_layer();
    store.add_child(root, page);
    store.set_bounds(page, Size::new(VIEWPORT.width(), PAGE_HEIGHT));
    store.set_content(page, Some(ContentId(1)));
    let scrollbar = store.create_layer();
    store.add_child(root, scrollbar);
    store.set_bounds(scrollbar, Size::new(SCROLLBAR_THICKNESS, VIEWPORT.height()));
    store.set_content(scrollbar, Some(ContentId(2)));
    let scrollbar_transform = Affine::translate((VIEWPORT.width() - SCROLLBAR_THICKNESS, 0.0));
    store.set_transform(scrollbar, scrollbar_transform);

    // -- tilings -----------------------------------------------------------
    let mut manager = TileManager::new(TileManagerSettings::desktop());
    manager.set_global_state(GlobalState::new(
        24 << 20,
        MemoryLimitPolicy::AllowPrepaintOnly,
        TreePriority::SmoothnessTakesPriority,
    ));
    let high = PictureLayerTiling::create(
        &mut manager,
        page,
        store.bounds(page),
        1.0,
        TILE_SIZE,
        TileResolution::High,
    );
    let low = PictureLayerTiling::create(
        &mut manager,
        page,
        store.bounds(page),
        0.25,
        TILE_SIZE,
        TileResolution::Low,
    );
    let bar = ScrollbarGeometry::new(
        ScrollbarOrientation::Vertical,
        store.bounds(scrollbar),
        DEVICE_SCALE,
        manager.settings().max_texture_size,
    );
    let bar_tiling = PictureLayerTiling::create(
        &mut manager,
        scrollbar,
        bar.bounds(),
        bar.contents_scale(),
        TILE_SIZE,
        TileResolution::High,
    );
    let thumb_length = VIEWPORT.height() * VIEWPORT.height() / PAGE_HEIGHT;
    println!(
        "tiled page into {} high-res and {} low-res tiles, scrollbar into {} \
         (scale {}, thumb {:?})",
        high.tiles().len(),
        low.tiles().len(),
        bar_tiling.tiles().len(),
        bar.contents_scale(),
        bar.origin_thumb_rect(thumb_length, SCROLLBAR_THICKNESS)
    );

    // -- sinks -------------------------------------------------------------
    let mut pretty = PrettyPrintSink::new(Box::new(std::io::stdout()));
    let mut recorder = RecorderSink::new();

    // -- simulated scroll --------------------------------------------------
    let mut scroll = 0.0;
    for frame in 0..FRAME_COUNT {
        let last = Affine::translate((0.0, -scroll));
        if frame > 0 {
            scroll += SCROLL_PER_FRAME;
        }
        let current = Affine::translate((0.0, -scroll));
        store.set_transform(page, current);
        let _ = store.evaluate();

        for tree in WhichTree::ALL {
            for tiling in [&high, &low] {
                tiling.update_tile_priorities(
                    &mut manager,
                    tree,
                    current,
                    last,
                    FRAME_SECONDS,
                    VIEWPORT,
                );
            }
            bar_tiling.update_tile_priorities(
                &mut manager,
                tree,
                scrollbar_transform,
                scrollbar_transform,
                FRAME_SECONDS,
                VIEWPORT,
            );
        }

        let report = {
            let mut tee = Tee {
                first: &mut pretty,
                second: &mut recorder,
            };
            let mut tracer = Tracer::new(&mut tee);
            manager.manage_tiles(&mut tracer)
        };

        let finished: Vec<_> = manager
            .tiles_that_need_to_be_rasterized()
            .iter()
            .take(RASTER_PER_FRAME)
            .copied()
            .collect();
        for id in finished {
            manager.did_finish_raster(id);
        }

        if report.memory.bytes_over_in_now_bin > 0 {
            println!(
                "frame {frame}: {} bytes of visible tiles did not fit",
                report.memory.bytes_over_in_now_bin
            );
        }
    }

    // -- draw and hit test the final frame ---------------------------------
    let surfaces = RenderSurfaceList::build(&store, root);
    let plan = RenderPlan::build(&store, &surfaces);
    let center = Point::new(VIEWPORT.width() / 2.0, VIEWPORT.height() / 2.0);
    println!(
        "final frame: {} passes, {} items, hit at {center:?} = {:?}",
        plan.passes().len(),
        plan.item_count(),
        hit_test(&store, &surfaces, center)
    );
    println!(
        "memory ever exceeded: {}",
        manager.ever_exceeded_memory_budget()
    );

    high.destroy(&mut manager);
    low.destroy(&mut manager);
    bar_tiling.destroy(&mut manager);

    // -- export Chrome trace -----------------------------------------------
    let path = "trace.json";
    let file = File::create(path).expect("failed to create trace.json");
    let mut writer = BufWriter::new(file);
    lamina_debug::chrome::export(recorder.as_bytes(), &mut writer)
        .expect("failed to write Chrome trace");

    println!("Wrote {path} ({FRAME_COUNT} frames)");
}
