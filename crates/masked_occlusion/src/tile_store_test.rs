use std::collections::HashSet;

use super::*;

const LOWER_HALF: u32 = 0x0000_FFFF;
const UPPER_HALF: u32 = 0xFFFF_0000;

fn standard() -> DepthPolicy {
  DepthPolicy::STANDARD_GL
}

fn tile_with(mask: u32, z: f32) -> Tile {
  Tile {
    z: Vec4::splat(z),
    bitmask: UVec4::splat(mask),
  }
}

// =========================================================================
// Merge rule
// =========================================================================

#[test]
fn test_full_nearer_replaces() {
  let mut tile = tile_with(FULL_MASK, 5.0);
  merge_tile(&mut tile, UVec4::splat(FULL_MASK), Vec4::splat(2.0), &standard());
  assert_eq!(tile, tile_with(FULL_MASK, 2.0));
}

#[test]
fn test_full_farther_is_ignored() {
  let mut tile = tile_with(FULL_MASK, 5.0);
  merge_tile(&mut tile, UVec4::splat(FULL_MASK), Vec4::splat(8.0), &standard());
  assert_eq!(tile, tile_with(FULL_MASK, 5.0));
}

#[test]
fn test_partial_farther_on_full_is_ignored() {
  let mut tile = tile_with(FULL_MASK, 5.0);
  merge_tile(&mut tile, UVec4::splat(LOWER_HALF), Vec4::splat(9.0), &standard());
  assert_eq!(tile, tile_with(FULL_MASK, 5.0));
}

#[test]
fn test_partial_halves_accumulate() {
  let mut tile = Tile::cleared(&standard());
  merge_tile(&mut tile, UVec4::splat(LOWER_HALF), Vec4::splat(0.3), &standard());
  assert_eq!(tile, tile_with(LOWER_HALF, 0.3));

  merge_tile(&mut tile, UVec4::splat(UPPER_HALF), Vec4::splat(0.6), &standard());
  assert_eq!(tile, tile_with(FULL_MASK, 0.6));
}

#[test]
fn test_merge_is_idempotent() {
  let policy = standard();
  for (mask, z) in [(LOWER_HALF, 0.4), (FULL_MASK, 0.7), (0x0F0F_0F0F, 0.2)] {
    let mut once = Tile::cleared(&policy);
    merge_tile(&mut once, UVec4::splat(mask), Vec4::splat(z), &policy);
    let mut twice = once;
    merge_tile(&mut twice, UVec4::splat(mask), Vec4::splat(z), &policy);
    assert_eq!(once, twice, "mask {mask:#x} z {z}");
  }
}

#[test]
fn test_empty_incoming_sub_tile_untouched() {
  let mut tile = tile_with(LOWER_HALF, 0.3);
  merge_tile(
    &mut tile,
    UVec4::new(0, UPPER_HALF, 0, 0),
    Vec4::splat(0.9),
    &standard(),
  );
  assert_eq!(tile.z, Vec4::new(0.3, 0.9, 0.3, 0.3));
  assert_eq!(tile.bitmask, UVec4::new(LOWER_HALF, FULL_MASK, LOWER_HALF, LOWER_HALF));
}

#[test]
fn test_sub_tiles_merge_independently() {
  let mut tile = Tile::cleared(&standard());
  merge_tile(
    &mut tile,
    UVec4::new(FULL_MASK, LOWER_HALF, 0, FULL_MASK),
    Vec4::new(0.1, 0.2, 0.3, 0.4),
    &standard(),
  );
  assert_eq!(tile.bitmask, UVec4::new(FULL_MASK, LOWER_HALF, 0, FULL_MASK));
  assert_eq!(tile.z, Vec4::new(0.1, 0.2, 1.0, 0.4));
}

#[test]
fn test_reversed_merge_mirrors_standard() {
  let policy = DepthPolicy::REVERSED_ZERO_TO_ONE;

  let mut tile = tile_with(FULL_MASK, 0.5);
  merge_tile(&mut tile, UVec4::splat(FULL_MASK), Vec4::splat(0.8), &policy);
  assert_eq!(tile, tile_with(FULL_MASK, 0.8), "larger depth is nearer");

  merge_tile(&mut tile, UVec4::splat(FULL_MASK), Vec4::splat(0.2), &policy);
  assert_eq!(tile, tile_with(FULL_MASK, 0.8));

  let mut tile = Tile::cleared(&policy);
  merge_tile(&mut tile, UVec4::splat(LOWER_HALF), Vec4::splat(0.7), &policy);
  merge_tile(&mut tile, UVec4::splat(UPPER_HALF), Vec4::splat(0.4), &policy);
  assert_eq!(tile, tile_with(FULL_MASK, 0.4), "farthest is the smaller depth");
}

// =========================================================================
// Store layout
// =========================================================================

#[test]
fn test_bins_partition_grid_with_remainder() {
  let grid = TileGrid { cols: 30, rows: 5 };
  let store = TileStore::new(grid, 4, 2, standard());

  let mut seen = HashSet::new();
  for bin in 0..store.bin_count() {
    let range = store.bin_range(bin);
    for y in range.min_y..=range.max_y {
      for x in range.min_x..=range.max_x {
        assert!(seen.insert((x, y)), "tile ({x}, {y}) in two bins");
      }
    }
  }
  assert_eq!(seen.len(), grid.tile_count());

  let widths: Vec<u32> = (0..4).map(|b| store.bin_range(b).width()).collect();
  assert_eq!(widths.iter().sum::<u32>(), 30);
  assert!(widths.iter().all(|&w| w == 7 || w == 8));
}

#[test]
fn test_get_and_merge_address_same_tile() {
  let grid = TileGrid { cols: 7, rows: 3 };
  let mut store = TileStore::new(grid, 3, 2, standard());
  store.merge(5, 2, UVec4::splat(FULL_MASK), Vec4::splat(0.25));

  for y in 0..grid.rows {
    for x in 0..grid.cols {
      let tile = store.get(x, y);
      if (x, y) == (5, 2) {
        assert_eq!(tile, tile_with(FULL_MASK, 0.25));
      } else {
        assert!(tile.is_empty(), "tile ({x}, {y}) should be empty");
      }
    }
  }
}

#[test]
fn test_bin_views_write_through() {
  let grid = TileGrid { cols: 9, rows: 4 };
  let mut store = TileStore::new(grid, 2, 2, standard());

  for mut bin in store.bins_mut() {
    let range = bin.range();
    let marker = (range.min_x * 10 + range.min_y) as f32 / 100.0;
    for y in range.min_y..=range.max_y {
      for x in range.min_x..=range.max_x {
        bin.set(x, y, tile_with(FULL_MASK, marker));
      }
    }
  }

  for bin in 0..store.bin_count() {
    let range = store.bin_range(bin);
    let marker = (range.min_x * 10 + range.min_y) as f32 / 100.0;
    assert_eq!(store.get(range.max_x, range.max_y).z.x, marker);
  }
  assert_eq!(store.covered_tile_count(), grid.tile_count());
}

#[test]
fn test_clear_resets_everything() {
  let grid = TileGrid { cols: 4, rows: 4 };
  let mut store = TileStore::new(grid, 2, 1, standard());
  store.merge(0, 0, UVec4::splat(FULL_MASK), Vec4::splat(0.1));
  store.merge(3, 3, UVec4::splat(LOWER_HALF), Vec4::splat(0.5));
  store.clear();
  assert_eq!(store.covered_tile_count(), 0);
  assert!(store.to_row_major().iter().all(|t| *t == Tile::cleared(&standard())));
}

#[test]
fn test_row_major_export_order() {
  let grid = TileGrid { cols: 5, rows: 2 };
  let mut store = TileStore::new(grid, 2, 1, standard());
  store.merge(3, 1, UVec4::splat(FULL_MASK), Vec4::splat(0.5));
  let tiles = store.to_row_major();
  assert_eq!(tiles.len(), 10);
  assert!(!tiles[1 * 5 + 3].is_empty());
  assert_eq!(tiles.iter().filter(|t| !t.is_empty()).count(), 1);
}

#[test]
fn test_from_config_validates() {
  let config = MocConfig::with_resolution(33, 4);
  assert!(TileStore::from_config(&config).is_err());

  let store = TileStore::from_config(&MocConfig::default()).unwrap();
  assert_eq!(store.bin_count(), 4);
  assert_eq!(store.grid().cols, 30);
}
