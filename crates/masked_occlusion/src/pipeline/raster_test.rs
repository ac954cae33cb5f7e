use glam::Vec3;

use super::*;
use crate::constants::FULL_MASK;
use crate::pipeline::setup::setup_triangle;
use crate::pipeline::transform::ScreenTriangle;
use crate::types::{FrontFace, Tile, TileGrid};

const GRID: TileGrid = TileGrid { cols: 6, rows: 5 };

fn setup(t: &ScreenTriangle, policy: &DepthPolicy) -> TriangleSetup {
  setup_triangle(t, GRID, policy, FrontFace::CounterClockwise)
}

fn flat_tri(a: (f32, f32), b: (f32, f32), c: (f32, f32), z: f32) -> ScreenTriangle {
  [
    Vec3::new(a.0, a.1, z),
    Vec3::new(b.0, b.1, z),
    Vec3::new(c.0, c.1, z),
  ]
}

/// Two CCW triangles covering the axis-aligned pixel rectangle.
fn rect(x0: f32, y0: f32, x1: f32, y1: f32, z: f32) -> [ScreenTriangle; 2] {
  [
    flat_tri((x0, y0), (x1, y0), (x1, y1), z),
    flat_tri((x0, y0), (x1, y1), (x0, y1), z),
  ]
}

fn bit(col: u32, row: u32) -> u32 {
  1 << (row * 8 + col)
}

#[test]
fn test_pack_rows_layout() {
  assert_eq!(pack_rows([0x01, 0, 0, 0]), bit(0, 0));
  assert_eq!(pack_rows([0, 0, 0, 0x80]), bit(7, 3));
  assert_eq!(pack_rows([0xFF; 4]), FULL_MASK);
}

#[test]
fn test_right_triangle_coverage() {
  let policy = DepthPolicy::STANDARD_GL;
  let tri = setup(&flat_tri((0.0, 0.0), (8.0, 0.0), (0.0, 4.0), 0.5), &policy);
  let (mask, z) = rasterize_tile(&tri, 0, 0, &policy).unwrap();

  assert_eq!(mask.x, 0x0107_1F7F);
  assert_eq!(mask.y, 0);
  assert_eq!(mask.z, 0);
  assert_eq!(mask.w, 0);
  assert_eq!(z.x, 0.5);
}

#[test]
fn test_tile_outside_triangle_is_none() {
  let policy = DepthPolicy::STANDARD_GL;
  let tri = setup(&flat_tri((0.0, 0.0), (8.0, 0.0), (0.0, 4.0), 0.5), &policy);
  assert!(rasterize_tile(&tri, 1, 0, &policy).is_none());
  assert!(rasterize_tile(&tri, 0, 1, &policy).is_none());
}

#[test]
fn test_rect_halves_cover_tile_exactly_once() {
  let policy = DepthPolicy::STANDARD_GL;
  let [a, b] = rect(0.0, 0.0, 32.0, 4.0, 0.3);
  let (ma, _) = rasterize_tile(&setup(&a, &policy), 0, 0, &policy).unwrap();
  let (mb, _) = rasterize_tile(&setup(&b, &policy), 0, 0, &policy).unwrap();

  assert_eq!(ma & mb, UVec4::ZERO, "shared diagonal claimed twice");
  assert_eq!(ma | mb, UVec4::splat(FULL_MASK));
}

#[test]
fn test_rect_edges_inclusive_left_exclusive_right() {
  let policy = DepthPolicy::STANDARD_GL;
  let mut store = TileStore::new(GRID, 1, 1, policy);
  let triangles: Vec<_> = rect(8.0, 0.0, 16.0, 4.0, 0.5)
    .iter()
    .map(|t| setup(t, &policy))
    .collect();
  rasterize_bins(&mut store, &triangles);

  let tile = store.get(0, 0);
  assert_eq!(tile.bitmask, UVec4::new(0, FULL_MASK, 0, 0));
  assert!(store.get(1, 0).is_empty());
}

#[test]
fn test_flat_edge_limits_rows() {
  let policy = DepthPolicy::STANDARD_GL;
  // Flat bottom at y = 2: rows 0 and 1 stay empty.
  let tri = setup(&flat_tri((0.0, 2.0), (32.0, 2.0), (0.0, 40.0), 0.5), &policy);
  let (mask, _) = rasterize_tile(&tri, 0, 0, &policy).unwrap();
  for m in mask.to_array() {
    assert_eq!(m & 0xFFFF, 0);
  }
  assert_eq!(mask.x, 0xFFFF_0000);
}

#[test]
fn test_depth_bound_is_conservative() {
  let policy = DepthPolicy::STANDARD_GL;
  let t = [
    Vec3::new(0.0, 0.0, 0.2),
    Vec3::new(64.0, 0.0, 0.6),
    Vec3::new(0.0, 16.0, 0.4),
  ];
  let tri = setup(&t, &policy);
  let plane = tri.plane;

  for ty in 0..4 {
    for tx in 0..2 {
      let Some((mask, z)) = rasterize_tile(&tri, tx, ty, &policy) else {
        continue;
      };
      for sub in 0..4 {
        assert!(z[sub] <= tri.z_farthest + 1e-6);
        for row in 0..4 {
          for col in 0..8 {
            if mask[sub] & bit(col, row) == 0 {
              continue;
            }
            let px = (tx * 32 + sub as u32 * 8 + col) as f32 + 0.5;
            let py = (ty * 4 + row) as f32 + 0.5;
            assert!(
              plane.at(px, py) <= z[sub] + 1e-6,
              "pixel ({px}, {py}) deeper than its sub-tile bound"
            );
          }
        }
      }
    }
  }
}

#[test]
fn test_bins_match_single_bin() {
  let policy = DepthPolicy::STANDARD_GL;
  let screen = [
    flat_tri((3.0, 1.0), (150.0, 6.0), (40.0, 19.0), 0.4),
    flat_tri((100.0, 0.0), (190.0, 12.0), (120.0, 20.0), 0.2),
    flat_tri((-20.0, -5.0), (60.0, 2.0), (10.0, 30.0), 0.7),
  ];
  let triangles: Vec<_> = screen.iter().map(|t| setup(t, &policy)).collect();

  let mut single = TileStore::new(GRID, 1, 1, policy);
  let mut binned = TileStore::new(GRID, 4, 3, policy);
  let written_single = rasterize_bins(&mut single, &triangles);
  let written_binned = rasterize_bins(&mut binned, &triangles);

  assert_eq!(written_single, written_binned);
  assert_eq!(single.to_row_major(), binned.to_row_major());
  assert!(single.covered_tile_count() > 0);
}

#[test]
fn test_rejected_triangle_writes_nothing() {
  let policy = DepthPolicy::STANDARD_GL;
  // Clockwise: back-facing for the default convention.
  let tri = setup(&flat_tri((0.0, 0.0), (0.0, 30.0), (150.0, 0.0), 0.5), &policy);
  let mut store = TileStore::new(GRID, 2, 1, policy);
  assert_eq!(rasterize_bins(&mut store, &[tri]), 0);
  assert!(store.to_row_major().iter().all(Tile::is_empty));
}

#[test]
fn test_reversed_depth_mirrors_masks() {
  let standard = DepthPolicy::STANDARD_GL;
  let reversed = DepthPolicy::REVERSED_ZERO_TO_ONE;
  let t = [
    Vec3::new(0.0, 0.0, 0.2),
    Vec3::new(64.0, 0.0, 0.6),
    Vec3::new(0.0, 16.0, 0.4),
  ];
  let mirrored = t.map(|v| Vec3::new(v.x, v.y, 1.0 - v.z));

  let a = setup(&t, &standard);
  let b = setup(&mirrored, &reversed);
  for ty in 0..4 {
    for tx in 0..2 {
      let ra = rasterize_tile(&a, tx, ty, &standard);
      let rb = rasterize_tile(&b, tx, ty, &reversed);
      match (ra, rb) {
        (None, None) => {}
        (Some((ma, za)), Some((mb, zb))) => {
          assert_eq!(ma, mb);
          assert!((za - (Vec4::ONE - zb)).abs().max_element() < 1e-5);
        }
        _ => panic!("coverage differs at tile ({tx}, {ty})"),
      }
    }
  }
}
