//! Square heightfield with optional holes.
//!
//! Heights are normalized to `[0, 1]` and stored row-major (`z * N + x`).
//! World height of a sample is `origin.y + h * size.y`.

use glam::{Vec2, Vec3};

use crate::error::{MocError, MocResult};

#[derive(Clone, Debug, PartialEq)]
struct HoleMask {
  resolution: usize,
  /// `true` = no terrain surface in this cell.
  cells: Vec<bool>,
}

/// Terrain height samples over an axis-aligned xz rectangle.
#[derive(Clone, Debug, PartialEq)]
pub struct Heightfield {
  resolution: usize,
  heights: Vec<f32>,
  /// World extent: x, max height, z.
  size: Vec3,
  origin: Vec3,
  holes: Option<HoleMask>,
}

impl Heightfield {
  pub fn new(resolution: usize, heights: Vec<f32>, size: Vec3, origin: Vec3) -> MocResult<Self> {
    if resolution < 2 {
      return Err(MocError::HeightfieldResolution(resolution));
    }
    let expected = resolution * resolution;
    if heights.len() != expected {
      return Err(MocError::HeightfieldSize {
        expected,
        actual: heights.len(),
      });
    }
    Ok(Self {
      resolution,
      heights,
      size,
      origin,
      holes: None,
    })
  }

  /// Heightfield with every sample at the same normalized height.
  pub fn flat(resolution: usize, height: f32, size: Vec3, origin: Vec3) -> MocResult<Self> {
    Self::new(resolution, vec![height; resolution * resolution], size, origin)
  }

  /// Attach a hole mask (`resolution x resolution` cells, row-major).
  pub fn with_holes(mut self, resolution: usize, cells: Vec<bool>) -> MocResult<Self> {
    let expected = resolution * resolution;
    if resolution == 0 || cells.len() != expected {
      return Err(MocError::HeightfieldSize {
        expected,
        actual: cells.len(),
      });
    }
    self.holes = Some(HoleMask { resolution, cells });
    Ok(self)
  }

  #[inline]
  pub fn resolution(&self) -> usize {
    self.resolution
  }

  #[inline]
  pub fn size(&self) -> Vec3 {
    self.size
  }

  #[inline]
  pub fn origin(&self) -> Vec3 {
    self.origin
  }

  /// Highest world y the surface can reach.
  #[inline]
  pub fn max_height(&self) -> f32 {
    self.origin.y + self.size.y
  }

  /// World distance between neighbouring samples along x and z.
  #[inline]
  pub fn spacing(&self) -> Vec2 {
    Vec2::new(self.size.x, self.size.z) / (self.resolution - 1) as f32
  }

  /// World height of sample `(x, z)`.
  #[inline]
  pub fn sample(&self, x: usize, z: usize) -> f32 {
    self.origin.y + self.heights[z * self.resolution + x] * self.size.y
  }

  /// `true` when `(x, z)` lies over the heightfield.
  #[inline]
  pub fn contains_xz(&self, x: f32, z: f32) -> bool {
    x >= self.origin.x
      && z >= self.origin.z
      && x <= self.origin.x + self.size.x
      && z <= self.origin.z + self.size.z
  }

  /// `true` when a point outside the xz bounds moves further out along `dir`.
  pub fn is_leaving(&self, p: Vec3, dir: Vec3) -> bool {
    let max_x = self.origin.x + self.size.x;
    let max_z = self.origin.z + self.size.z;
    (p.x < self.origin.x && dir.x <= 0.0)
      || (p.x > max_x && dir.x >= 0.0)
      || (p.z < self.origin.z && dir.z <= 0.0)
      || (p.z > max_z && dir.z >= 0.0)
  }

  /// Lowest world height of the cell containing `(x, z)`, or `None` outside
  /// the bounds. Taking the cell minimum keeps the marched surface at or
  /// below the sampled one.
  pub fn height_at(&self, x: f32, z: f32) -> Option<f32> {
    if !self.contains_xz(x, z) {
      return None;
    }
    let local = (Vec2::new(x - self.origin.x, z - self.origin.z) / self.spacing()).floor();
    let last_cell = self.resolution - 2;
    let cx = (local.x as usize).min(last_cell);
    let cz = (local.y as usize).min(last_cell);

    let h = self
      .sample(cx, cz)
      .min(self.sample(cx + 1, cz))
      .min(self.sample(cx, cz + 1))
      .min(self.sample(cx + 1, cz + 1));
    Some(h)
  }

  /// `true` when `(x, z)` falls in a hole cell.
  pub fn is_hole(&self, x: f32, z: f32) -> bool {
    let Some(holes) = &self.holes else {
      return false;
    };
    let n = holes.resolution;
    let cell = |value: f32, origin: f32, extent: f32| {
      let t = (value - origin) / extent * n as f32;
      (t.max(0.0) as usize).min(n - 1)
    };
    let hx = cell(x, self.origin.x, self.size.x);
    let hz = cell(z, self.origin.z, self.size.z);
    holes.cells[hz * n + hx]
  }

  /// Coarser copy for ray marching.
  ///
  /// Each output sample is the minimum of the source samples within one
  /// output spacing of it, so no cell of the result rises above the source
  /// surface. Extents, origin and holes are kept.
  pub fn downsampled(&self, factor: u32) -> Heightfield {
    let factor = factor as usize;
    if factor <= 1 {
      return self.clone();
    }
    let src = self.resolution;
    let dst = ((src - 1).div_ceil(factor) + 1).max(2);
    let ratio = (src - 1) as f32 / (dst - 1) as f32;
    let last = (src - 1) as f32;

    let block = |i: usize| {
      let lo = ((i as f32 - 1.0) * ratio).floor().max(0.0) as usize;
      let hi = ((i + 1) as f32 * ratio).ceil().min(last) as usize;
      lo..=hi
    };

    let mut heights = Vec::with_capacity(dst * dst);
    for j in 0..dst {
      for i in 0..dst {
        let mut lowest = f32::MAX;
        for z in block(j) {
          for x in block(i) {
            lowest = lowest.min(self.heights[z * src + x]);
          }
        }
        heights.push(lowest);
      }
    }

    Heightfield {
      resolution: dst,
      heights,
      size: self.size,
      origin: self.origin,
      holes: self.holes.clone(),
    }
  }
}

#[cfg(test)]
#[path = "heightfield_test.rs"]
mod heightfield_test;
