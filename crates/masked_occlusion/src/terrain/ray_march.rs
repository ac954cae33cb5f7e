//! Terrain ray marching into the tile store.
//!
//! The march buffer has one sample per 4x4 pixel block
//! (`tile_cols * 8` by `tile_rows`). Only half the samples are marched, in a
//! checkerboard; [`TerrainRaymarcher::write_tiles`] fills each sub-tile from
//! the farthest of its unsampled sample's neighbours.
//!
//! ```text
//!   row 1 │ . x . x . x . x
//!   row 0 │ x . x . x . x .      x = marched, . = interpolated
//!           └─┬─┘
//!           one sub-tile (8 pixels = 2 samples)
//! ```
//!
//! Work is split into bins of [`RAY_BIN_WIDTH`] sample columns. A bin marches
//! its rows bottom-up and stops once a whole row misses without landing in a
//! hole; everything above is left at the far depth.

use std::sync::Arc;

use glam::{Mat4, Vec3};
use rayon::prelude::*;

use super::heightfield::Heightfield;
use crate::config::RayMarchConfig;
use crate::constants::{FULL_MASK, RAY_BIN_WIDTH, RAY_SAMPLES_PER_TILE, SUB_TILES_PER_TILE};
use crate::depth::DepthPolicy;
use crate::tile_store::TileStore;
use crate::types::{CameraFrame, Tile, TileGrid};

/// Upper bound on steps per ray.
const MAX_RAY_STEPS: usize = 4096;

/// Result of marching one ray.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RayHit {
  /// Unit depth of the first point under the surface.
  Depth(f32),
  /// Left the terrain, climbed above it, or passed the far plane.
  Miss,
  /// Came down inside a hole.
  Hole,
}

/// Per-frame ray setup shared by every bin.
struct MarchContext<'a> {
  heightfield: &'a Heightfield,
  settings: RayMarchConfig,
  view_projection: Mat4,
  policy: DepthPolicy,
  /// Near-plane point at the bottom-left buffer corner, and per-sample steps.
  near_corner: Vec3,
  near_right: Vec3,
  near_up: Vec3,
  /// Same on the mid-depth plane, used for ray directions.
  mid_corner: Vec3,
  mid_right: Vec3,
  mid_up: Vec3,
}

impl MarchContext<'_> {
  fn cast(&self, x: usize, y: usize) -> RayHit {
    let (sx, sy) = (x as f32 + 0.5, y as f32 + 0.5);
    let start = self.near_corner + self.near_right * sx + self.near_up * sy;
    let target = self.mid_corner + self.mid_right * sx + self.mid_up * sy;
    let dir = (target - start).normalize_or_zero();
    if dir == Vec3::ZERO {
      return RayHit::Miss;
    }

    let field = self.heightfield;
    let ceiling = field.max_height();
    let mut step = self.settings.start_step;
    let mut t = 0.0;

    for _ in 0..MAX_RAY_STEPS {
      t += step;
      step = (step + self.settings.step_increment).min(self.settings.max_step);
      let p = start + dir * t;

      if p.y > ceiling && dir.y >= 0.0 {
        return RayHit::Miss;
      }
      let Some(ground) = field.height_at(p.x, p.z) else {
        if field.is_leaving(p, dir) || (p.y < field.origin().y && dir.y <= 0.0) {
          return RayHit::Miss;
        }
        continue;
      };
      if p.y > ground {
        continue;
      }
      if field.is_hole(p.x, p.z) {
        return RayHit::Hole;
      }

      let clip = self.view_projection * p.extend(1.0);
      if !(clip.w > 0.0) {
        return RayHit::Miss;
      }
      let depth = self.policy.to_unit_depth(clip.z / clip.w);
      return if self.policy.in_range(depth) {
        RayHit::Depth(depth)
      } else {
        RayHit::Miss
      };
    }
    RayHit::Miss
  }

  /// March one bin of sample columns (column-major, `height` per column).
  fn march_bin(&self, columns: &mut [f32], first_x: usize, height: usize) {
    columns.fill(self.policy.far());
    let width = columns.len() / height;

    for y in 0..height {
      let mut touched = false;
      for c in 0..width {
        let x = first_x + c;
        if (x + y) % 2 != 0 {
          continue;
        }
        match self.cast(x, y) {
          RayHit::Depth(depth) => {
            columns[c * height + y] = depth;
            touched = true;
          }
          RayHit::Hole => touched = true,
          RayHit::Miss => {}
        }
      }
      if !touched {
        break;
      }
    }
  }
}

/// Ray-marched terrain depth for one culling system.
pub struct TerrainRaymarcher {
  heightfield: Arc<Heightfield>,
  settings: RayMarchConfig,
  grid: TileGrid,
  width: usize,
  height: usize,
  /// Column-major unit depths, far where nothing was hit.
  depths: Vec<f32>,
}

impl TerrainRaymarcher {
  /// `heightfield` is marched as given; downsample it beforehand. Samples
  /// start at `policy`'s far plane, so tiles written before the first
  /// [`march`](Self::march) are empty.
  pub fn new(
    heightfield: Arc<Heightfield>,
    settings: RayMarchConfig,
    grid: TileGrid,
    policy: &DepthPolicy,
  ) -> Self {
    let width = (grid.cols * RAY_SAMPLES_PER_TILE) as usize;
    let height = grid.rows as usize;
    Self {
      heightfield,
      settings,
      grid,
      width,
      height,
      depths: vec![policy.far(); width * height],
    }
  }

  #[inline]
  pub fn heightfield(&self) -> &Arc<Heightfield> {
    &self.heightfield
  }

  /// Sample depth at buffer position `(x, y)`.
  #[inline]
  pub fn depth(&self, x: usize, y: usize) -> f32 {
    self.depths[x * self.height + y]
  }

  /// Ray march every checkerboard sample for `camera`.
  #[cfg_attr(feature = "profiling", tracing::instrument(skip_all, name = "moc::terrain_march"))]
  pub fn march(&mut self, camera: &CameraFrame, policy: &DepthPolicy) {
    let view_projection = camera.view_projection();
    let inverse = view_projection.inverse();
    let near_ndc = policy.to_ndc_depth(policy.near());
    let mid_ndc = policy.to_ndc_depth(0.5);

    let (w, h) = (self.width as f32, self.height as f32);
    let plane = |ndc_z: f32| {
      let corner = inverse.project_point3(Vec3::new(-1.0, -1.0, ndc_z));
      let right = (inverse.project_point3(Vec3::new(1.0, -1.0, ndc_z)) - corner) / w;
      let up = (inverse.project_point3(Vec3::new(-1.0, 1.0, ndc_z)) - corner) / h;
      (corner, right, up)
    };
    let (near_corner, near_right, near_up) = plane(near_ndc);
    let (mid_corner, mid_right, mid_up) = plane(mid_ndc);

    let context = MarchContext {
      heightfield: &self.heightfield,
      settings: self.settings,
      view_projection,
      policy: *policy,
      near_corner,
      near_right,
      near_up,
      mid_corner,
      mid_right,
      mid_up,
    };

    let height = self.height;
    self
      .depths
      .par_chunks_mut(height * RAY_BIN_WIDTH)
      .enumerate()
      .for_each(|(bin, columns)| context.march_bin(columns, bin * RAY_BIN_WIDTH, height));
  }

  /// Farthest marched neighbour of sample `(x, y)`, far when it has none.
  fn neighbor_depth(&self, x: usize, y: usize, policy: &DepthPolicy) -> f32 {
    let mut depth: Option<f32> = None;
    let mut visit = |nx: usize, ny: usize| {
      if nx < self.width && ny < self.height {
        let d = self.depth(nx, ny);
        depth = Some(depth.map_or(d, |current| policy.farthest(current, d)));
      }
    };
    if x > 0 {
      visit(x - 1, y);
    }
    visit(x + 1, y);
    if y > 0 {
      visit(x, y - 1);
    }
    visit(x, y + 1);
    depth.unwrap_or(policy.far())
  }

  /// Interpolated terrain tile at `(tile_x, tile_y)`.
  pub fn interpolate_tile(&self, tile_x: u32, tile_y: u32, policy: &DepthPolicy) -> Tile {
    let mut tile = Tile::cleared(policy);
    let y = tile_y as usize;
    let offset = if y % 2 == 0 { 1 } else { 0 };
    for sub in 0..SUB_TILES_PER_TILE {
      let x = (tile_x * RAY_SAMPLES_PER_TILE) as usize + 2 * sub + offset;
      let depth = self.neighbor_depth(x, y, policy);
      if !policy.is_far(depth) {
        tile.z[sub] = depth;
        tile.bitmask[sub] = FULL_MASK;
      }
    }
    tile
  }

  /// Overwrite every tile of `tiles` with the interpolated terrain.
  #[cfg_attr(feature = "profiling", tracing::instrument(skip_all, name = "moc::terrain_write"))]
  pub fn write_tiles(&self, tiles: &mut TileStore) {
    debug_assert_eq!(tiles.grid(), self.grid);
    let policy = *tiles.policy();
    tiles.bins_mut().into_par_iter().for_each(|mut bin| {
      let range = bin.range();
      for ty in range.min_y..=range.max_y {
        for tx in range.min_x..=range.max_x {
          bin.set(tx, ty, self.interpolate_tile(tx, ty, &policy));
        }
      }
    });
  }
}

#[cfg(test)]
#[path = "ray_march_test.rs"]
mod ray_march_test;
