// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Measures `manage_tiles` passes per second.
//!
//! Tiles are split evenly between the now, soon and eventually bins, with the
//! remainder never needed. Before each pass every `100 / churn`-th tile is
//! rotated to the next bin (now, soon, eventually, never, now again), so a
//! churn of 10% re-prioritizes one tile in ten. Each scenario runs a few
//! warm-up passes, then measures for a fixed wall-clock budget and prints the
//! pass rate.

use std::time::{Duration, Instant};

use kurbo::Rect;
use lamina_core::layer::LayerStore;
use lamina_core::tile::{
    GlobalState, MemoryLimitPolicy, NUM_BINS, TileId, TileManager, TileManagerSettings,
    TilePriority, TileResolution, TileSpec, TreePriority, WhichTree,
};
use lamina_core::trace::Tracer;

const TILE_COUNTS: [u32; 3] = [100, 1000, 10_000];
const CHURN_PERCENT: [u32; 3] = [0, 10, 100];
const WARMUP_RUNS: u64 = 5;
const TIME_CHECK_INTERVAL: u64 = 10;
const TIME_LIMIT: Duration = Duration::from_millis(2000);
const TILE_EDGE: u32 = 256;
const COLUMNS: u32 = 16;

/// The bins a tile cycles through as its priority churns.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Bin {
    Now,
    Soon,
    Eventually,
    Never,
}

impl Bin {
    fn priority(self) -> TilePriority {
        match self {
            Self::Now => TilePriority::new(TileResolution::High, 0.0, 0.0),
            Self::Soon => TilePriority::new(TileResolution::High, 0.5, 300.0),
            Self::Eventually => TilePriority::new(TileResolution::NonIdeal, 1.0, 315.0),
            Self::Never => TilePriority::default(),
        }
    }

    fn rotated(self) -> Self {
        match self {
            Self::Now => Self::Soon,
            Self::Soon => Self::Eventually,
            Self::Eventually => Self::Never,
            Self::Never => Self::Now,
        }
    }
}

fn set_bin(manager: &mut TileManager, id: TileId, bin: Bin) {
    for tree in WhichTree::ALL {
        manager.set_priority(id, tree, bin.priority());
    }
}

fn setup(count: u32) -> (TileManager, Vec<(TileId, Bin)>) {
    let mut store = LayerStore::new();
    let layer = store.create_layer();
    let mut manager = TileManager::new(TileManagerSettings::desktop());
    let tile_bytes = 4 * u64::from(TILE_EDGE) * u64::from(TILE_EDGE);
    manager.set_global_state(GlobalState::new(
        10_000 * tile_bytes,
        MemoryLimitPolicy::AllowAnything,
        TreePriority::SmoothnessTakesPriority,
    ));

    #[expect(
        clippy::cast_possible_truncation,
        reason = "NUM_BINS is a small constant"
    )]
    let per_bin = count / NUM_BINS as u32;
    let edge = f64::from(TILE_EDGE);
    let tiles = (0..count)
        .map(|i| {
            let bin = match i / per_bin.max(1) {
                0 => Bin::Now,
                1 => Bin::Soon,
                2 => Bin::Eventually,
                _ => Bin::Never,
            };
            let x = f64::from(i % COLUMNS) * edge;
            let y = f64::from(i / COLUMNS) * edge;
            let id = manager.create_tile(TileSpec {
                layer,
                content_rect: Rect::new(x, y, x + edge, y + edge),
                contents_scale: 1.0,
            });
            set_bin(&mut manager, id, bin);
            (id, bin)
        })
        .collect();
    (manager, tiles)
}

fn measure(count: u32, churn_percent: u32) -> f64 {
    let (mut manager, mut tiles) = setup(count);
    let step = (100 / churn_percent.max(1)) as usize;

    let mut runs = 0_u64;
    let mut start = None;
    loop {
        if churn_percent > 0 {
            for (id, bin) in tiles.iter_mut().step_by(step) {
                *bin = bin.rotated();
                set_bin(&mut manager, *id, *bin);
            }
        }
        let report = manager.manage_tiles(&mut Tracer::none());
        std::hint::black_box(report);

        runs += 1;
        if runs == WARMUP_RUNS {
            start = Some(Instant::now());
        }
        if let Some(start) = start
            && runs % TIME_CHECK_INTERVAL == 0
            && start.elapsed() >= TIME_LIMIT
        {
            return (runs - WARMUP_RUNS) as f64 / start.elapsed().as_secs_f64();
        }
    }
}

fn main() {
    println!("{:>8} {:>7} {:>12}", "tiles", "churn", "runs/s");
    for churn in CHURN_PERCENT {
        for count in TILE_COUNTS {
            let rate = measure(count, churn);
            println!("{count:>8} {churn:>6}% {rate:>12.1}");
        }
    }
}
