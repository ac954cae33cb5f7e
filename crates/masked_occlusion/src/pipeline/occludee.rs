//! Occludee test.
//!
//! Each object's bounding box is projected to a pixel rectangle plus its
//! nearest depth. The object is hidden only if, in every sub-tile its
//! rectangle touches, the stored coverage contains the whole footprint and
//! the stored depth bound is nearer than the object's nearest point.

use glam::{Mat4, UVec2, UVec4, Vec2, Vec3};
use rayon::prelude::*;

use crate::constants::{ROW_MASK, SUB_TILES_PER_TILE, SUB_TILE_WIDTH, TILE_HEIGHT, TILE_WIDTH};
use crate::depth::DepthPolicy;
use crate::tile_store::TileStore;
use crate::types::Aabb;

/// Screen footprint of a box: inclusive pixel rectangle and nearest depth.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScreenRect {
  pub min: UVec2,
  pub max: UVec2,
  pub nearest_depth: f32,
}

/// Project a box to screen space.
///
/// Returns `None` when any corner is on or behind the eye plane; such boxes
/// are always treated as visible.
pub fn project_bounds(
  aabb: &Aabb,
  view_projection: &Mat4,
  viewport: UVec2,
  policy: &DepthPolicy,
) -> Option<ScreenRect> {
  let size = viewport.as_vec2();
  let mut min = Vec2::splat(f32::MAX);
  let mut max = Vec2::splat(f32::MIN);
  let mut nearest = policy.far();

  for corner in aabb.corners() {
    let clip = *view_projection * corner.extend(1.0);
    if !(clip.w > 0.0) {
      return None;
    }
    let ndc: Vec3 = clip.truncate() / clip.w;
    let screen = (ndc.truncate() * 0.5 + Vec2::splat(0.5)) * size;
    min = min.min(screen);
    max = max.max(screen);
    nearest = policy.nearest(nearest, policy.to_unit_depth(ndc.z));
  }

  let limit = (viewport - UVec2::ONE).as_vec2();
  Some(ScreenRect {
    min: min.floor().clamp(Vec2::ZERO, limit).as_uvec2(),
    max: max.floor().clamp(Vec2::ZERO, limit).as_uvec2(),
    nearest_depth: nearest,
  })
}

/// Coverage of the pixel rectangle `[x0, x1] x [y0, y1]` (tile-local,
/// inclusive) in the sub-tile bit layout.
pub fn footprint_mask(x0: u32, x1: u32, y0: u32, y1: u32) -> UVec4 {
  debug_assert!(x0 <= x1 && x1 < TILE_WIDTH && y0 <= y1 && y1 < TILE_HEIGHT);
  let width = x1 - x0 + 1;
  let columns: u32 = if width == 32 { u32::MAX } else { ((1u32 << width) - 1) << x0 };

  let mut rows = 0u32;
  for row in y0..=y1 {
    rows |= ROW_MASK << (row * 8);
  }

  let mut mask = [0u32; SUB_TILES_PER_TILE];
  for (i, sub) in mask.iter_mut().enumerate() {
    let column_byte = (columns >> (i as u32 * SUB_TILE_WIDTH)) & ROW_MASK;
    // replicate the column byte on every row, keep the selected rows
    *sub = column_byte.wrapping_mul(0x0101_0101) & rows;
  }
  UVec4::from_array(mask)
}

/// `true` when the whole rectangle is provably behind stored coverage.
pub fn is_occluded(rect: &ScreenRect, tiles: &TileStore) -> bool {
  let policy = tiles.policy();
  let tile_min = UVec2::new(rect.min.x / TILE_WIDTH, rect.min.y / TILE_HEIGHT);
  let tile_max = UVec2::new(rect.max.x / TILE_WIDTH, rect.max.y / TILE_HEIGHT);

  for ty in tile_min.y..=tile_max.y {
    let tile_y0 = ty * TILE_HEIGHT;
    let y0 = rect.min.y.max(tile_y0) - tile_y0;
    let y1 = rect.max.y.min(tile_y0 + TILE_HEIGHT - 1) - tile_y0;

    for tx in tile_min.x..=tile_max.x {
      let tile_x0 = tx * TILE_WIDTH;
      let x0 = rect.min.x.max(tile_x0) - tile_x0;
      let x1 = rect.max.x.min(tile_x0 + TILE_WIDTH - 1) - tile_x0;

      let footprint = footprint_mask(x0, x1, y0, y1);
      let tile = tiles.get(tx, ty);
      for i in 0..SUB_TILES_PER_TILE {
        let bits = footprint[i];
        if bits == 0 {
          continue;
        }
        let covered = (tile.bitmask[i] & bits) == bits;
        if !covered || !policy.is_nearer(tile.z[i], rect.nearest_depth) {
          return false;
        }
      }
    }
  }
  true
}

/// Statistics from the occludee pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OccludeeStats {
  /// Objects tested against the tile store.
  pub tested: usize,
  /// Objects newly marked hidden.
  pub occluded: usize,
}

/// Test every object that is neither frustum-culled nor an active occluder.
///
/// `bounds` and `hidden` are index-aligned (occluders first). `is_active`
/// reports whether object `i` is an active occluder this frame.
#[cfg_attr(feature = "profiling", tracing::instrument(skip_all, name = "moc::test_occludees"))]
pub fn test_occludees(
  bounds: &[Aabb],
  hidden: &mut [bool],
  is_active: impl Fn(usize) -> bool + Sync,
  view_projection: &Mat4,
  tiles: &TileStore,
) -> OccludeeStats {
  debug_assert_eq!(bounds.len(), hidden.len());
  let grid = tiles.grid();
  let viewport = UVec2::new(grid.pixel_width(), grid.pixel_height());
  let policy = *tiles.policy();

  hidden
    .par_iter_mut()
    .zip(bounds.par_iter())
    .enumerate()
    .map(|(i, (hidden, aabb))| {
      if *hidden || is_active(i) {
        return OccludeeStats::default();
      }
      let occluded = project_bounds(aabb, view_projection, viewport, &policy)
        .is_some_and(|rect| is_occluded(&rect, tiles));
      *hidden = occluded;
      OccludeeStats {
        tested: 1,
        occluded: occluded as usize,
      }
    })
    .reduce(OccludeeStats::default, |a, b| OccludeeStats {
      tested: a.tested + b.tested,
      occluded: a.occluded + b.occluded,
    })
}

#[cfg(test)]
#[path = "occludee_test.rs"]
mod occludee_test;
