//! Bin rasterizer.
//!
//! The tile grid is split into bins (see [`TileStore::bins_mut`]). One task
//! per bin walks every set-up triangle and rasterizes the part of its tile
//! range that falls inside the bin. Bins never share tiles, so writes need no
//! synchronization.
//!
//! Per tile the edge intercepts for all four scanlines are evaluated at once
//! (one `Vec4` lane per row) and turned into 8-bit row masks for each 8-wide
//! sub-tile.

use glam::{UVec4, Vec4};
use rayon::prelude::*;

use super::setup::{EdgeSetup, FlatEdge, TriangleSetup};
use crate::constants::{ROW_MASK, SUB_TILES_PER_TILE, SUB_TILE_HEIGHT, SUB_TILE_WIDTH, TILE_HEIGHT, TILE_WIDTH};
use crate::depth::DepthPolicy;
use crate::tile_store::{BinTilesMut, TileStore};

/// Pixel-center offsets of the four rows of a tile.
const ROW_CENTERS: Vec4 = Vec4::new(0.5, 1.5, 2.5, 3.5);

/// Sub-tile index per lane.
const SUB_TILE_LANES: Vec4 = Vec4::new(0.0, 1.0, 2.0, 3.0);

/// Pack four 8-bit row masks (row 0 first) into a sub-tile mask.
#[inline]
pub fn pack_rows(rows: [u32; 4]) -> u32 {
  rows[0] | (rows[1] << 8) | (rows[2] << 16) | (rows[3] << 24)
}

/// Row masks of one edge for the sub-tile starting at pixel column `x0`.
///
/// `first_inside` holds, per row, the first pixel column whose center is at
/// or right of the edge.
#[inline]
fn edge_row_masks(first_inside: Vec4, x0: f32, is_right: bool) -> [u32; 4] {
  let shift = (first_inside - Vec4::splat(x0))
    .clamp(Vec4::ZERO, Vec4::splat(SUB_TILE_WIDTH as f32))
    .as_uvec4()
    .to_array();
  shift.map(|s| {
    if is_right {
      // columns [0, s)
      (1u32 << s) - 1
    } else {
      // columns [s, 8)
      (ROW_MASK << s) & ROW_MASK
    }
  })
}

#[inline]
fn first_inside_column(edge: &EdgeSetup, row_y: Vec4) -> Vec4 {
  let x = Vec4::splat(edge.origin.x) + (row_y - Vec4::splat(edge.origin.y)) * edge.inv_slope;
  (x - Vec4::splat(0.5)).ceil()
}

#[inline]
fn flat_edge_mask(flat: &FlatEdge, row_y: Vec4) -> u32 {
  pack_rows(row_y.to_array().map(|y| if flat.contains(y) { ROW_MASK } else { 0 }))
}

/// Per-lane nearer of two depth vectors.
#[inline]
fn nearest4(a: Vec4, b: Vec4, policy: &DepthPolicy) -> Vec4 {
  if policy.is_reversed() {
    a.max(b)
  } else {
    a.min(b)
  }
}

/// Coverage masks and far depth bounds of one triangle over tile `(x, y)`.
///
/// Returns `None` when the triangle covers no pixel center in the tile.
pub fn rasterize_tile(
  tri: &TriangleSetup,
  tile_x: u32,
  tile_y: u32,
  policy: &DepthPolicy,
) -> Option<(UVec4, Vec4)> {
  let x0 = (tile_x * TILE_WIDTH) as f32;
  let y0 = (tile_y * TILE_HEIGHT) as f32;
  let row_y = Vec4::splat(y0) + ROW_CENTERS;

  let mut masks = [u32::MAX; SUB_TILES_PER_TILE];

  if let Some(flat) = &tri.flat {
    let rows = flat_edge_mask(flat, row_y);
    if rows == 0 {
      return None;
    }
    for mask in &mut masks {
      *mask &= rows;
    }
  }

  for edge in tri.active_edges() {
    let first_inside = first_inside_column(edge, row_y);
    for (i, mask) in masks.iter_mut().enumerate() {
      let sub_x0 = x0 + (i as u32 * SUB_TILE_WIDTH) as f32;
      *mask &= pack_rows(edge_row_masks(first_inside, sub_x0, edge.is_right));
    }
  }

  let bitmask = UVec4::from_array(masks);
  if bitmask == UVec4::ZERO {
    return None;
  }

  // Farthest plane value over each sub-tile rectangle, capped by the
  // farthest vertex.
  let plane = &tri.plane;
  let step_x = plane.dzdx * SUB_TILE_WIDTH as f32;
  let step_y = plane.dzdy * SUB_TILE_HEIGHT as f32;
  let base = plane.at(x0, y0) + policy.farthest(step_x, 0.0) + policy.farthest(step_y, 0.0);
  let z = Vec4::splat(base) + SUB_TILE_LANES * step_x;
  let z = nearest4(z, Vec4::splat(tri.z_farthest), policy);

  Some((bitmask, z))
}

/// Rasterize all triangles that touch one bin.
pub fn rasterize_bin(bin: &mut BinTilesMut<'_>, triangles: &[TriangleSetup], policy: &DepthPolicy) -> usize {
  let bin_range = bin.range();
  let mut written = 0;
  for tri in triangles {
    let Some(range) = tri.tile_range.and_then(|r| r.intersect(&bin_range)) else {
      continue;
    };
    for ty in range.min_y..=range.max_y {
      for tx in range.min_x..=range.max_x {
        if let Some((bitmask, z)) = rasterize_tile(tri, tx, ty, policy) {
          bin.merge(tx, ty, bitmask, z);
          written += 1;
        }
      }
    }
  }
  written
}

/// Rasterize every triangle into the store, one parallel task per bin.
/// Returns the number of tile merges performed.
#[cfg_attr(feature = "profiling", tracing::instrument(skip_all, name = "moc::rasterize_bins"))]
pub fn rasterize_bins(store: &mut TileStore, triangles: &[TriangleSetup]) -> usize {
  let policy = *store.policy();
  store
    .bins_mut()
    .into_par_iter()
    .map(|mut bin| rasterize_bin(&mut bin, triangles, &policy))
    .sum()
}

#[cfg(test)]
#[path = "raster_test.rs"]
mod raster_test;
