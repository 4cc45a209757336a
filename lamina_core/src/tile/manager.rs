// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The tile manager: per-pass binning, ordering, and memory assignment.

use alloc::vec::Vec;
use core::cmp::Ordering;

use super::bin::{ManagedTileBin, NUM_BINS, apply_memory_policy, bin_from_priority};
use super::managed::{BinPriority, RasterState, Tile, TileId, TileSpec};
use super::priority::{GlobalState, MemoryLimitPolicy, TilePriority, TreePriority, WhichTree};
#[cfg(feature = "trace-rich")]
use crate::trace::TileDecision;
use crate::trace::{BinsAssignedEvent, ManageTilesBeginEvent, MemoryAssignedEvent, Tracer};

/// Distance and time thresholds that drive [`bin_from_priority`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TileManagerSettings {
    /// Tiles visible within this many seconds are prepainted.
    pub prepaint_window_in_seconds: f32,
    /// Tiles nearer than this are always prepainted, covering a fling that
    /// reverses direction.
    pub backfling_guard_distance_in_pixels: f32,
    /// Farthest high-resolution tile the prepaint window reaches.
    pub max_prepaint_distance_in_pixels: f32,
    /// Farthest low-resolution tile the prepaint window reaches.
    pub low_res_max_prepaint_distance_in_pixels: f32,
    /// Tiles farther than this land in the `AtLast` bins.
    pub at_last_distance_in_pixels: f32,
    /// Tilings give tiles farther than this the default (never needed)
    /// priority.
    pub interest_distance_in_pixels: f32,
    /// Largest texture edge the device can allocate, in pixels. Layers that
    /// rasterize into a single texture, such as scrollbars, clamp their
    /// contents scale to it.
    pub max_texture_size: u32,
}

impl Default for TileManagerSettings {
    fn default() -> Self {
        Self::desktop()
    }
}

impl TileManagerSettings {
    /// Thresholds for desktop-class devices.
    #[must_use]
    pub const fn desktop() -> Self {
        Self {
            prepaint_window_in_seconds: 1.0,
            backfling_guard_distance_in_pixels: 314.0,
            max_prepaint_distance_in_pixels: 2000.0,
            low_res_max_prepaint_distance_in_pixels: 4000.0,
            at_last_distance_in_pixels: 8000.0,
            interest_distance_in_pixels: 16_000.0,
            max_texture_size: 8192,
        }
    }

    /// Tighter thresholds for memory-constrained devices.
    #[must_use]
    pub const fn low_end_device() -> Self {
        Self {
            prepaint_window_in_seconds: 0.5,
            backfling_guard_distance_in_pixels: 314.0,
            max_prepaint_distance_in_pixels: 1000.0,
            low_res_max_prepaint_distance_in_pixels: 2000.0,
            at_last_distance_in_pixels: 4000.0,
            interest_distance_in_pixels: 8000.0,
            max_texture_size: 4096,
        }
    }
}

/// Memory accounting from the last pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MemoryStats {
    /// Budget the pass ran with.
    pub bytes_limit: u64,
    /// Bytes held by approved tiles. Never above `bytes_limit` unless the
    /// policy was [`MemoryLimitPolicy::AllowAnything`].
    pub bytes_allocated: u64,
    /// Bytes of every tile whose high bin is a `Now` bin.
    pub bytes_required_for_now: u64,
    /// Bytes of every tile not `Never` in both bins.
    pub bytes_nice_to_have: u64,
    /// Bytes of `Now` tiles that did not fit in the budget.
    pub bytes_over_in_now_bin: u64,
}

/// Summary of one [`TileManager::manage_tiles`] pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ManageTilesReport {
    /// Pass counter, starting at 1.
    pub pass: u64,
    /// Tiles per high-priority bin.
    pub bin_counts: [usize; NUM_BINS],
    /// Memory accounting.
    pub memory: MemoryStats,
    /// Tiles granted memory.
    pub tiles_approved: usize,
    /// Tiles refused memory.
    pub tiles_oomed: usize,
    /// Activation-critical tiles approved by evicting lower priority tiles.
    pub tiles_recovered: usize,
    /// Length of the raster queue.
    pub raster_queue_len: usize,
}

/// Decides, once per pass, which tiles may hold raster memory.
///
/// Tiles are registered with [`create_tile`](Self::create_tile) and carry one
/// [`TilePriority`] per tree, updated by the host between passes. Each call to
/// [`manage_tiles`](Self::manage_tiles):
///
/// 1. bins every tile from its priorities and the [`GlobalState`];
/// 2. sorts tiles most urgent first;
/// 3. walks the sorted tiles granting memory until the budget runs out.
///
/// Afterwards each tile's bin and approval are queryable, and
/// [`tiles_that_need_to_be_rasterized`](Self::tiles_that_need_to_be_rasterized)
/// lists approved tiles lacking content, in priority order.
#[derive(Debug)]
pub struct TileManager {
    settings: TileManagerSettings,
    global_state: GlobalState,

    tiles: Vec<Tile>,
    generation: Vec<u32>,
    alive: Vec<bool>,
    free_list: Vec<u32>,

    /// Live tiles, most urgent first, as of the last pass.
    sorted: Vec<TileId>,
    /// Per slot: position in `sorted`.
    rank: Vec<u32>,
    raster_queue: Vec<TileId>,

    memory_stats: MemoryStats,
    ever_exceeded_memory_budget: bool,
    pass: u64,
}

impl Default for TileManager {
    fn default() -> Self {
        Self::new(TileManagerSettings::default())
    }
}

impl TileManager {
    /// Creates a tile manager with an empty budget.
    #[must_use]
    pub fn new(settings: TileManagerSettings) -> Self {
        Self {
            settings,
            global_state: GlobalState::default(),
            tiles: Vec::new(),
            generation: Vec::new(),
            alive: Vec::new(),
            free_list: Vec::new(),
            sorted: Vec::new(),
            rank: Vec::new(),
            raster_queue: Vec::new(),
            memory_stats: MemoryStats::default(),
            ever_exceeded_memory_budget: false,
            pass: 0,
        }
    }

    /// Returns the settings.
    #[must_use]
    pub fn settings(&self) -> &TileManagerSettings {
        &self.settings
    }

    /// Sets the state the next pass reads.
    pub fn set_global_state(&mut self, state: GlobalState) {
        self.global_state = state;
    }

    /// Returns the state the next pass reads.
    #[must_use]
    pub fn global_state(&self) -> GlobalState {
        self.global_state
    }

    // -- Tile lifecycle --

    /// Registers a tile. It starts unrasterized with default priorities on
    /// both trees.
    ///
    /// # Panics
    ///
    /// Panics if the rect is empty or the scale is not positive.
    pub fn create_tile(&mut self, spec: TileSpec) -> TileId {
        assert!(
            spec.content_rect.width() > 0.0 && spec.content_rect.height() > 0.0,
            "tile content rect must be non-empty: {:?}",
            spec.content_rect
        );
        assert!(
            spec.contents_scale > 0.0,
            "contents scale must be positive: {}",
            spec.contents_scale
        );
        let tile = Tile::new(&spec);
        let idx = match self.free_list.pop() {
            Some(idx) => {
                let i = idx as usize;
                self.generation[i] += 1;
                self.alive[i] = true;
                self.tiles[i] = tile;
                idx
            }
            None => {
                #[expect(
                    clippy::cast_possible_truncation,
                    reason = "tile count is bounded well below u32::MAX"
                )]
                let idx = self.tiles.len() as u32;
                self.tiles.push(tile);
                self.generation.push(0);
                self.alive.push(true);
                idx
            }
        };
        TileId {
            idx,
            generation: self.generation[idx as usize],
        }
    }

    /// Unregisters a tile, abandoning its raster.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    pub fn destroy_tile(&mut self, id: TileId) {
        self.validate(id);
        let i = id.idx as usize;
        self.tiles[i].evict();
        self.generation[i] += 1;
        self.alive[i] = false;
        self.free_list.push(id.idx);
        self.raster_queue.retain(|&queued| queued != id);
    }

    /// Returns whether the handle refers to a live tile.
    #[must_use]
    pub fn is_alive(&self, id: TileId) -> bool {
        (id.idx as usize) < self.tiles.len()
            && self.alive[id.idx as usize]
            && self.generation[id.idx as usize] == id.generation
    }

    /// Returns the number of live tiles.
    #[must_use]
    pub fn tile_count(&self) -> usize {
        self.tiles.len() - self.free_list.len()
    }

    // -- Inputs --

    /// Records `tree`'s priority for a tile, read by the next pass.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    pub fn set_priority(&mut self, id: TileId, tree: WhichTree, priority: TilePriority) {
        self.validate(id);
        self.tiles[id.idx as usize].priority[tree.index()] = priority;
    }

    /// Returns `tree`'s priority for a tile.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    #[must_use]
    pub fn priority(&self, id: TileId, tree: WhichTree) -> TilePriority {
        self.tile(id).priority(tree)
    }

    /// Reports that a raster worker finished a scheduled tile.
    ///
    /// Returns `false` and changes nothing if the tile was not scheduled,
    /// e.g. because it was evicted while the work was in flight.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    pub fn did_finish_raster(&mut self, id: TileId) -> bool {
        self.validate(id);
        let tile = &mut self.tiles[id.idx as usize];
        if tile.raster_state != RasterState::Scheduled {
            return false;
        }
        tile.raster_state = RasterState::Ready;
        self.raster_queue.retain(|&queued| queued != id);
        true
    }

    // -- Outputs --

    /// Returns a tile.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    #[must_use]
    pub fn tile(&self, id: TileId) -> &Tile {
        self.validate(id);
        &self.tiles[id.idx as usize]
    }

    /// Returns the high-priority bin from the last pass.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    #[must_use]
    pub fn bin(&self, id: TileId) -> ManagedTileBin {
        self.tile(id).bin(BinPriority::High)
    }

    /// Returns whether the last pass granted the tile memory.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    #[must_use]
    pub fn is_approved(&self, id: TileId) -> bool {
        self.tile(id).is_approved()
    }

    /// Returns approved tiles that still need raster work, most urgent first.
    #[must_use]
    pub fn tiles_that_need_to_be_rasterized(&self) -> &[TileId] {
        &self.raster_queue
    }

    /// Returns live tiles in the order the last pass sorted them.
    ///
    /// Tiles created since that pass are not included, even when they reuse
    /// the slot of a tile destroyed since.
    pub fn tiles_in_priority_order(&self) -> impl Iterator<Item = TileId> + '_ {
        self.sorted.iter().copied().filter(|&id| self.is_alive(id))
    }

    /// Returns memory accounting from the last pass.
    #[must_use]
    pub fn memory_stats(&self) -> MemoryStats {
        self.memory_stats
    }

    /// Returns whether any pass so far failed to fit its `Now` tiles.
    #[must_use]
    pub fn ever_exceeded_memory_budget(&self) -> bool {
        self.ever_exceeded_memory_budget
    }

    // -- The pass --

    /// Re-bins, sorts, and assigns memory to every live tile.
    pub fn manage_tiles(&mut self, tracer: &mut Tracer<'_>) -> ManageTilesReport {
        self.pass += 1;
        let pass = self.pass;
        tracer.manage_tiles_begin(&ManageTilesBeginEvent {
            pass,
            tile_count: self.tile_count(),
            global_state: self.global_state,
        });

        let bin_counts = self.assign_bins();
        self.sort_tiles();
        tracer.bins_assigned(&BinsAssignedEvent { pass, bin_counts });

        let outcome = self.assign_memory();
        self.memory_stats = outcome.stats;
        self.ever_exceeded_memory_budget |= outcome.stats.bytes_over_in_now_bin > 0;

        let report = ManageTilesReport {
            pass,
            bin_counts,
            memory: outcome.stats,
            tiles_approved: outcome.approved,
            tiles_oomed: outcome.oomed,
            tiles_recovered: outcome.recovered,
            raster_queue_len: self.raster_queue.len(),
        };
        tracer.memory_assigned(&MemoryAssignedEvent {
            pass,
            bytes_allocated: report.memory.bytes_allocated,
            bytes_limit: report.memory.bytes_limit,
            bytes_over_in_now_bin: report.memory.bytes_over_in_now_bin,
            tiles_approved: report.tiles_approved,
            tiles_oomed: report.tiles_oomed,
            tiles_recovered: report.tiles_recovered,
            raster_queue_len: report.raster_queue_len,
        });

        #[cfg(feature = "trace-rich")]
        if tracer.is_enabled() {
            let decisions: Vec<TileDecision> = self
                .sorted
                .iter()
                .map(|id| {
                    let tile = &self.tiles[id.idx as usize];
                    TileDecision {
                        tile_index: id.idx,
                        high_bin: tile.bin(BinPriority::High),
                        low_bin: tile.bin(BinPriority::Low),
                        approved: tile.approved,
                        bytes: tile.bytes(),
                    }
                })
                .collect();
            tracer.tile_decisions(pass, &decisions);
        }

        report
    }

    fn assign_bins(&mut self) -> [usize; NUM_BINS] {
        let GlobalState {
            memory_limit_policy: policy,
            tree_priority,
            ..
        } = self.global_state;
        let settings = self.settings;
        let mut counts = [0; NUM_BINS];

        for (i, tile) in self.tiles.iter_mut().enumerate() {
            if !self.alive[i] {
                continue;
            }
            let active = tile.priority[WhichTree::Active.index()];
            let pending = tile.priority[WhichTree::Pending.index()];
            let (high, low) = match tree_priority {
                TreePriority::SamePriorityForBothTrees => {
                    let both = TilePriority::combined(&active, &pending);
                    (both, both)
                }
                TreePriority::SmoothnessTakesPriority => (active, pending),
                TreePriority::NewContentTakesPriority => (pending, active),
            };

            let is_ready = tile.raster_state == RasterState::Ready;
            let is_active = tile.raster_state != RasterState::Unrasterized;
            let bin_of = |p: &TilePriority| {
                apply_memory_policy(
                    bin_from_priority(p, tree_priority, is_ready, is_active, &settings),
                    policy,
                )
            };

            tile.bin = [bin_of(&high), bin_of(&low)];
            tile.tree_bin = [bin_of(&active), bin_of(&pending)];
            tile.winning = TilePriority {
                required_for_activation: pending.required_for_activation,
                ..high
            };

            counts[tile.bin[BinPriority::High.index()].index()] += 1;
        }
        counts
    }

    fn sort_tiles(&mut self) {
        self.sorted.clear();
        #[expect(
            clippy::cast_possible_truncation,
            reason = "tile slots are created with u32 indices"
        )]
        let slots = self.tiles.len() as u32;
        let alive = &self.alive;
        let generation = &self.generation;
        self.sorted.extend(
            (0..slots)
                .filter(|&idx| alive[idx as usize])
                .map(|idx| TileId {
                    idx,
                    generation: generation[idx as usize],
                }),
        );

        let tiles = &self.tiles;
        self.sorted.sort_unstable_by(|a, b| {
            compare_tiles(&tiles[a.idx as usize], &tiles[b.idx as usize])
                .then(a.idx.cmp(&b.idx))
        });

        self.rank.clear();
        self.rank.resize(self.tiles.len(), u32::MAX);
        for (position, id) in self.sorted.iter().enumerate() {
            #[expect(
                clippy::cast_possible_truncation,
                reason = "positions are bounded by the u32 slot count"
            )]
            let position = position as u32;
            self.rank[id.idx as usize] = position;
        }
    }

    fn assign_memory(&mut self) -> MemoryOutcome {
        let limit = self.global_state.memory_limit_in_bytes;
        let unlimited = self.global_state.memory_limit_policy == MemoryLimitPolicy::AllowAnything;
        let mut out = MemoryOutcome {
            stats: MemoryStats {
                bytes_limit: limit,
                ..MemoryStats::default()
            },
            approved: 0,
            oomed: 0,
            recovered: 0,
        };
        let mut higher_priority_tile_oomed = false;
        let mut oomed_for_activation = Vec::new();
        self.raster_queue.clear();

        for &id in &self.sorted {
            let tile = &mut self.tiles[id.idx as usize];
            tile.approved = false;
            let high = tile.bin[BinPriority::High.index()];
            let low = tile.bin[BinPriority::Low.index()];
            if high == ManagedTileBin::Never && low == ManagedTileBin::Never {
                tile.evict();
                continue;
            }

            let bytes = tile.bytes();
            out.stats.bytes_nice_to_have += bytes;
            if high.is_now() {
                out.stats.bytes_required_for_now += bytes;
            }

            if !unlimited && bytes > limit.saturating_sub(out.stats.bytes_allocated) {
                tile.evict();
                if high.is_now() {
                    out.stats.bytes_over_in_now_bin += bytes;
                }
                if tile.tree_bin[WhichTree::Pending.index()].is_now() {
                    oomed_for_activation.push(id);
                }
                // A large tile that does not fit must not let smaller, less
                // urgent tiles start raster work ahead of it.
                higher_priority_tile_oomed = true;
                out.oomed += 1;
                continue;
            }

            out.stats.bytes_allocated += bytes;
            tile.approved = true;
            out.approved += 1;
            if tile.raster_state == RasterState::Ready || higher_priority_tile_oomed {
                continue;
            }
            tile.raster_state = RasterState::Scheduled;
            self.raster_queue.push(id);
        }

        if !oomed_for_activation.is_empty() {
            self.recover_tiles_for_activation(&oomed_for_activation, &mut out);
        }
        out
    }

    /// Evicts tiles only the active tree might want, lowest priority first,
    /// to make room for pending-tree `Now` tiles that did not fit.
    fn recover_tiles_for_activation(&mut self, oomed: &[TileId], out: &mut MemoryOutcome) {
        let limit = out.stats.bytes_limit;
        let needed: u64 = oomed
            .iter()
            .map(|id| self.tiles[id.idx as usize].bytes())
            .sum();

        for id in self.sorted.iter().rev() {
            if limit.saturating_sub(out.stats.bytes_allocated) >= needed {
                break;
            }
            let tile = &mut self.tiles[id.idx as usize];
            if !tile.approved
                || tile.tree_bin[WhichTree::Pending.index()] != ManagedTileBin::Never
                || tile.tree_bin[WhichTree::Active.index()].is_now()
            {
                continue;
            }
            out.stats.bytes_allocated -= tile.bytes();
            out.approved -= 1;
            tile.evict();
        }

        for &id in oomed {
            let tile = &mut self.tiles[id.idx as usize];
            let bytes = tile.bytes();
            if bytes > limit.saturating_sub(out.stats.bytes_allocated) {
                continue;
            }
            out.stats.bytes_allocated += bytes;
            if tile.bin[BinPriority::High.index()].is_now() {
                out.stats.bytes_over_in_now_bin -= bytes;
            }
            tile.approved = true;
            tile.raster_state = RasterState::Scheduled;
            out.approved += 1;
            out.oomed -= 1;
            out.recovered += 1;
            self.raster_queue.push(id);
        }

        let tiles = &self.tiles;
        let rank = &self.rank;
        self.raster_queue
            .retain(|id| tiles[id.idx as usize].approved);
        self.raster_queue
            .sort_unstable_by_key(|id| rank[id.idx as usize]);
    }

    fn validate(&self, id: TileId) {
        assert!(
            self.is_alive(id),
            "stale TileId: {id:?} (current gen: {})",
            self.generation
                .get(id.idx as usize)
                .copied()
                .unwrap_or(u32::MAX)
        );
    }
}

#[derive(Clone, Copy, Debug)]
struct MemoryOutcome {
    stats: MemoryStats,
    approved: usize,
    oomed: usize,
    recovered: usize,
}

/// Most urgent first: bins, then the winning priority's urgency, then
/// position so ties break top-left first.
fn compare_tiles(a: &Tile, b: &Tile) -> Ordering {
    let hi = BinPriority::High.index();
    let lo = BinPriority::Low.index();
    a.bin[hi]
        .cmp(&b.bin[hi])
        .then(a.bin[lo].cmp(&b.bin[lo]))
        .then_with(|| a.winning.urgency_cmp(&b.winning))
        .then(a.content_rect.y0.total_cmp(&b.content_rect.y0))
        .then(a.content_rect.x0.total_cmp(&b.content_rect.x0))
}
