//! Tile store - the shared depth/coverage buffer.
//!
//! Tiles are stored bin-major: every rasterizer bin owns one contiguous run
//! of tiles (row-major inside the bin). [`TileStore::bins_mut`] splits the
//! storage into disjoint `&mut` views, so bins rasterize in parallel without
//! locks.
//!
//! ```text
//!  tile grid (cols x rows)          storage
//! ┌──────┬──────┬──────┐
//! │ bin0 │ bin1 │ bin2 │   [ bin0 tiles | bin1 tiles | bin2 tiles | ... ]
//! ├──────┼──────┼──────┤
//! │ bin3 │ bin4 │ bin5 │
//! └──────┴──────┴──────┘
//! ```
//!
//! Bin boundaries are `b * n / bins`, so every tile lands in exactly one bin
//! even when the tile count is not a multiple of the bin count.

use glam::{UVec4, Vec4};

use crate::config::MocConfig;
use crate::constants::{FULL_MASK, SUB_TILES_PER_TILE};
use crate::depth::DepthPolicy;
use crate::error::MocResult;
use crate::types::{Tile, TileGrid, TileRange};

/// Merge one rasterized `(bitmask, z)` result into a tile, per sub-tile.
///
/// 1. A fully covered sub-tile ignores anything not strictly nearer.
/// 2. A full incoming mask that is nearer replaces depth and mask.
/// 3. Otherwise masks are ORed and the depth becomes the farther of the two
///    (or the incoming depth when the sub-tile was empty).
///
/// Sub-tiles with an empty incoming mask are left untouched.
#[inline]
pub fn merge_tile(tile: &mut Tile, bitmask: UVec4, z: Vec4, policy: &DepthPolicy) {
  for i in 0..SUB_TILES_PER_TILE {
    let incoming = bitmask[i];
    if incoming == 0 {
      continue;
    }
    let stored_mask = tile.bitmask[i];
    let stored_z = tile.z[i];
    let incoming_z = z[i];

    if stored_mask == FULL_MASK && !policy.is_nearer(incoming_z, stored_z) {
      continue;
    }

    if incoming == FULL_MASK && policy.is_nearer(incoming_z, stored_z) {
      tile.z[i] = incoming_z;
      tile.bitmask[i] = FULL_MASK;
      continue;
    }

    tile.z[i] = if stored_mask == 0 {
      incoming_z
    } else {
      policy.farthest(stored_z, incoming_z)
    };
    tile.bitmask[i] = stored_mask | incoming;
  }
}

/// Bin-partitioned grid of [`Tile`]s.
pub struct TileStore {
  grid: TileGrid,
  policy: DepthPolicy,
  bin_cols: u32,
  bin_rows: u32,
  /// Tile column where each bin column starts (+ trailing `grid.cols`).
  col_starts: Vec<u32>,
  /// Tile row where each bin row starts (+ trailing `grid.rows`).
  row_starts: Vec<u32>,
  /// Bin column owning each tile column.
  col_bin: Vec<u32>,
  /// Bin row owning each tile row.
  row_bin: Vec<u32>,
  /// Storage offset of each bin (+ trailing total).
  bin_offsets: Vec<usize>,
  tiles: Vec<Tile>,
}

impl TileStore {
  /// Create a cleared store.
  ///
  /// # Panics
  /// Debug-asserts a non-empty grid and `1 <= bins <= tiles` on both axes.
  pub fn new(grid: TileGrid, bin_cols: u32, bin_rows: u32, policy: DepthPolicy) -> Self {
    debug_assert!(grid.cols > 0 && grid.rows > 0, "tile grid must not be empty");
    debug_assert!(bin_cols >= 1 && bin_cols <= grid.cols);
    debug_assert!(bin_rows >= 1 && bin_rows <= grid.rows);

    let col_starts = partition(grid.cols, bin_cols);
    let row_starts = partition(grid.rows, bin_rows);
    let col_bin = owner_table(&col_starts);
    let row_bin = owner_table(&row_starts);

    let mut bin_offsets = Vec::with_capacity((bin_cols * bin_rows) as usize + 1);
    let mut offset = 0usize;
    for by in 0..bin_rows as usize {
      for bx in 0..bin_cols as usize {
        bin_offsets.push(offset);
        let w = (col_starts[bx + 1] - col_starts[bx]) as usize;
        let h = (row_starts[by + 1] - row_starts[by]) as usize;
        offset += w * h;
      }
    }
    bin_offsets.push(offset);
    debug_assert_eq!(offset, grid.tile_count());

    Self {
      grid,
      policy,
      bin_cols,
      bin_rows,
      col_starts,
      row_starts,
      col_bin,
      row_bin,
      bin_offsets,
      tiles: vec![Tile::cleared(&policy); grid.tile_count()],
    }
  }

  /// Validate `config` and create a store for it.
  pub fn from_config(config: &MocConfig) -> MocResult<Self> {
    config.validate()?;
    Ok(Self::new(
      config.tile_grid(),
      config.bin_cols,
      config.bin_rows,
      config.depth,
    ))
  }

  #[inline]
  pub fn grid(&self) -> TileGrid {
    self.grid
  }

  #[inline]
  pub fn policy(&self) -> &DepthPolicy {
    &self.policy
  }

  #[inline]
  pub fn bin_count(&self) -> usize {
    (self.bin_cols * self.bin_rows) as usize
  }

  /// Tile range owned by bin `bin` (row-major bin order).
  pub fn bin_range(&self, bin: usize) -> TileRange {
    let bx = bin % self.bin_cols as usize;
    let by = bin / self.bin_cols as usize;
    TileRange::new(
      self.col_starts[bx],
      self.row_starts[by],
      self.col_starts[bx + 1] - 1,
      self.row_starts[by + 1] - 1,
    )
  }

  /// Reset every tile to empty.
  pub fn clear(&mut self) {
    self.tiles.fill(Tile::cleared(&self.policy));
  }

  /// Storage index of tile `(x, y)`.
  #[inline]
  fn index(&self, x: u32, y: u32) -> usize {
    debug_assert!(x < self.grid.cols && y < self.grid.rows);
    let bx = self.col_bin[x as usize] as usize;
    let by = self.row_bin[y as usize] as usize;
    let bin = by * self.bin_cols as usize + bx;
    let local_x = (x - self.col_starts[bx]) as usize;
    let local_y = (y - self.row_starts[by]) as usize;
    let bin_width = (self.col_starts[bx + 1] - self.col_starts[bx]) as usize;
    self.bin_offsets[bin] + local_y * bin_width + local_x
  }

  #[inline]
  pub fn get(&self, x: u32, y: u32) -> Tile {
    self.tiles[self.index(x, y)]
  }

  /// Merge a rasterized result into tile `(x, y)`.
  #[inline]
  pub fn merge(&mut self, x: u32, y: u32, bitmask: UVec4, z: Vec4) {
    let idx = self.index(x, y);
    merge_tile(&mut self.tiles[idx], bitmask, z, &self.policy);
  }

  /// Split storage into one mutable view per bin.
  pub fn bins_mut(&mut self) -> Vec<BinTilesMut<'_>> {
    let ranges: Vec<TileRange> = (0..self.bin_count()).map(|b| self.bin_range(b)).collect();
    let policy = self.policy;
    let mut rest: &mut [Tile] = &mut self.tiles;
    let mut bins = Vec::with_capacity(ranges.len());
    for range in ranges {
      let (head, tail) = std::mem::take(&mut rest).split_at_mut(range.tile_count());
      bins.push(BinTilesMut {
        range,
        tiles: head,
        policy,
      });
      rest = tail;
    }
    bins
  }

  /// Copy of every tile in row-major order (diagnostics / visualization).
  pub fn to_row_major(&self) -> Vec<Tile> {
    let mut out = Vec::with_capacity(self.grid.tile_count());
    for y in 0..self.grid.rows {
      for x in 0..self.grid.cols {
        out.push(self.get(x, y));
      }
    }
    out
  }

  /// Number of tiles with any coverage.
  pub fn covered_tile_count(&self) -> usize {
    self.tiles.iter().filter(|t| !t.is_empty()).count()
  }
}

/// Exclusive mutable view of one bin's tiles, addressed in grid coordinates.
pub struct BinTilesMut<'a> {
  range: TileRange,
  tiles: &'a mut [Tile],
  policy: DepthPolicy,
}

impl BinTilesMut<'_> {
  #[inline]
  pub fn range(&self) -> TileRange {
    self.range
  }

  #[inline]
  fn index(&self, x: u32, y: u32) -> usize {
    debug_assert!(self.range.contains(x, y), "tile ({x}, {y}) outside bin");
    ((y - self.range.min_y) * self.range.width() + (x - self.range.min_x)) as usize
  }

  #[inline]
  pub fn get(&self, x: u32, y: u32) -> Tile {
    self.tiles[self.index(x, y)]
  }

  #[inline]
  pub fn merge(&mut self, x: u32, y: u32, bitmask: UVec4, z: Vec4) {
    let idx = self.index(x, y);
    merge_tile(&mut self.tiles[idx], bitmask, z, &self.policy);
  }

  /// Overwrite tile `(x, y)`.
  #[inline]
  pub fn set(&mut self, x: u32, y: u32, tile: Tile) {
    let idx = self.index(x, y);
    self.tiles[idx] = tile;
  }
}

/// Start of each of `parts` slices over `0..n`, plus a trailing `n`.
fn partition(n: u32, parts: u32) -> Vec<u32> {
  (0..=parts)
    .map(|b| (b as u64 * n as u64 / parts as u64) as u32)
    .collect()
}

/// Invert a partition: owning part for every element.
fn owner_table(starts: &[u32]) -> Vec<u32> {
  let mut owners = Vec::with_capacity(starts.last().copied().unwrap_or(0) as usize);
  for (part, window) in starts.windows(2).enumerate() {
    for _ in window[0]..window[1] {
      owners.push(part as u32);
    }
  }
  owners
}

#[cfg(test)]
#[path = "tile_store_test.rs"]
mod tile_store_test;
